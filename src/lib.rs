//! Storefront guard: attempt rate limiting for the storefront's login and
//! public order routes.

pub mod admin;
pub mod config;
pub mod http;
pub mod lifecycle;
pub mod net;
pub mod observability;
pub mod orders;
pub mod security;

pub use config::GuardConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use security::{AttemptOutcome, RateLimiter};
