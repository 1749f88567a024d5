//! Device drivers module
//!
//! Service interfaces the drivers consume (clocks, platform devices) and the
//! remote processor driver itself.

pub mod clock;
pub mod platform;
pub mod remoteproc;

pub use clock::{Clock, ClockProvider};
pub use platform::PlatformDevice;
