//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request on a protected route:
//!     → net::client_ip (derive per-client key)
//!     → rate_limit.rs (refuse if blocked)
//!     → handler runs
//!     → rate_limit.rs (record failure or reset on success)
//! ```
//!
//! # Design Decisions
//! - Limiters are explicit values held in `AppState`, never globals
//! - Blocking is per process; replicas do not share counts

pub mod rate_limit;

pub use rate_limit::{AttemptOutcome, CleanupHandle, CleanupTask, LimiterSnapshot, RateLimiter};
