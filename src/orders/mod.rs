//! Order intake for the public write route.
//!
//! Orders are kept in memory and handed off for manual bank transfer over
//! WhatsApp; no payment processing happens here.

pub mod store;
pub mod types;

pub use store::OrderStore;
pub use types::{NewOrder, Order, OrderItem, OrderStatus};
