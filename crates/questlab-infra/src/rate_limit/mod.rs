//! Rate limiting service
//!
//! Sliding-window limiter: each key owns a bucket of attempt timestamps, and
//! entries older than the window are pruned before every read or write. State is
//! process-local and lost on restart; deployments running several processes get
//! one independent budget per process.

pub use clock::{Clock, ManualClock, SystemClock};
pub use limiter::{ActionRateLimiter, RateLimiter};
pub use store::{InMemoryStore, RateLimitStore};

mod clock;
mod limiter;
mod store;
