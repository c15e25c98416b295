//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Limiters and handlers produce:
//!     → logging.rs (structured log events)
//!     → metrics.rs (counters, gauges)
//!
//! Consumers:
//!     → Log aggregation (stdout)
//!     → Metrics endpoint (Prometheus scrape)
//! ```
//!
//! # Design Decisions
//! - Request ID flows through the trace span of every request
//! - Metrics are cheap (atomic increments)

pub mod logging;
pub mod metrics;
