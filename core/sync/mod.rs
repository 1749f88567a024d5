//! Synchronization primitives
//!
//! This module provides synchronization primitives usable from both
//! interrupt and worker context.

pub mod spinlock;

// Re-export SpinLock for convenience
pub use spinlock::{SpinLock, SpinLockGuard, SpinLockIrqGuard};
