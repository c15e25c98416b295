//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML, optional)
//!     → loader.rs (parse, deserialize, env overrides)
//!     → validation.rs (semantic checks)
//!     → GuardConfig (validated, immutable)
//!     → limiters and handlers built once at startup
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; limiter settings never change at runtime
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use schema::{
    AdminConfig, ApiConfig, CleanupConfig, GuardConfig, LimiterConfig, ListenerConfig,
    ObservabilityConfig, TimeoutConfig,
};
