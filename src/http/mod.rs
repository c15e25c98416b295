//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware, connect info)
//!     → net::client_ip (derive the rate-limit key)
//!     → handlers.rs (limiter check → work → limiter update)
//!     → error.rs (map failures to status + JSON body)
//!     → Send to client
//! ```

pub mod error;
pub mod handlers;
pub mod server;

pub use error::ApiError;
pub use server::{AppState, HttpServer};
