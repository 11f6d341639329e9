//! Token Lifecycle
//!
//! Expiry decoding, the lifecycle manager and its scheduler, and the expiry warning
//! banner state.

pub mod decode;
pub mod manager;
pub mod scheduler;
pub mod warning;

pub use decode::decode_expiry;
#[cfg(test)]
pub(crate) use decode::test_jwt;

pub use manager::{
    lifecycle_manager, LifecycleManager, LifecycleManagerBuilder, DEFAULT_TICK_INTERVAL,
};
pub use scheduler::SchedulerHandle;
pub use warning::{
    BannerCall, BannerSink, ExpiryWarning, LoggingBannerSink, MockBannerSink, WarningTransition,
};
