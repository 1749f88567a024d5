//! Utility functions and helpers
//!
//! Small helpers shared by the driver code: alignment checks and bounded
//! spin-waiting.

pub mod backoff;

pub use self::backoff::Backoff;

/// Check if `addr` is a multiple of `align`
#[macro_export]
macro_rules! is_aligned {
    ($addr:expr, $align:expr) => {
        ($addr % $align == 0)
    };
}

/// Spin for a number of iterations
#[inline]
pub fn spin(iterations: u32) {
    for _ in 0..iterations {
        ::core::hint::spin_loop();
    }
}
