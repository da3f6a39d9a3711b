//! Policy engine — pacing and retry for vault calls.
//!
//! Applied per attempt, in order:
//! ```text
//! Request → [RateLimiter] → [Transport] → on transient failure → [RetryPolicy] → again
//! ```

pub mod rate_limiter;
pub mod retry;

pub use rate_limiter::{RateLimiter, RateLimiterConfig};
pub use retry::{RetryConfig, RetryPolicy};
