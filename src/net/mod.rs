//! Network-facing helpers.
//!
//! # Design Decisions
//! - Client identity is best effort: proxy headers first, socket peer last
//! - Values are trusted as sent; deploy behind a proxy that sets them

pub mod client_ip;

pub use client_ip::{client_key, ClientKey};
