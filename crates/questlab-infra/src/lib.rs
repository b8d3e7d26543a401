//! QuestLab Infrastructure Library
//!
//! This crate provides shared infrastructure components used by QuestLab callers:
//! - Rate limiting (sliding window, per action and client)
//! - Telemetry initialization
//! - Error response serialization

#[cfg(feature = "observability-basic")]
pub mod telemetry;

pub mod error;

#[cfg(feature = "rate-limit")]
pub mod rate_limit;

// Re-export commonly used types
#[cfg(feature = "observability-basic")]
pub use telemetry::{init_telemetry, shutdown_telemetry};

pub use error::{log_error, ErrorResponse};

#[cfg(feature = "rate-limit")]
pub use rate_limit::{
    ActionRateLimiter, Clock, InMemoryStore, ManualClock, RateLimitStore, RateLimiter,
    SystemClock,
};
