//! Order submission types.

use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};
use uuid::Uuid;

/// A line in an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItem {
    pub product_id: String,
    pub quantity: u32,
}

/// Order as submitted by a storefront customer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewOrder {
    pub customer_name: String,
    /// WhatsApp number used for the payment hand-off.
    pub phone: String,
    pub items: Vec<OrderItem>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl NewOrder {
    /// Reject submissions the back office cannot act on.
    pub fn validate(&self) -> Result<(), String> {
        if self.customer_name.trim().is_empty() {
            return Err("customer_name is required".into());
        }
        if self.phone.trim().is_empty() {
            return Err("phone is required".into());
        }
        if self.items.is_empty() {
            return Err("order must contain at least one item".into());
        }
        if let Some(item) = self.items.iter().find(|i| i.product_id.trim().is_empty()) {
            return Err(format!("item with quantity {} has no product_id", item.quantity));
        }
        if let Some(item) = self.items.iter().find(|i| i.quantity == 0) {
            return Err(format!("quantity for {} must be at least 1", item.product_id));
        }
        Ok(())
    }
}

/// Where an order is in the manual payment flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    /// Waiting for the bank transfer to be confirmed over WhatsApp.
    AwaitingPayment,
}

/// A stored order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub id: Uuid,
    pub status: OrderStatus,
    /// Creation time, seconds since epoch.
    pub created_at: u64,
    #[serde(flatten)]
    pub details: NewOrder,
}

impl Order {
    pub fn new(details: NewOrder) -> Self {
        let created_at = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs();
        Self {
            id: Uuid::new_v4(),
            status: OrderStatus::AwaitingPayment,
            created_at,
            details,
        }
    }
}
