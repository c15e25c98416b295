//! In-memory order storage.

use dashmap::DashMap;
use std::sync::Arc;
use uuid::Uuid;

use crate::orders::types::{NewOrder, Order};

/// A thread-safe store for submitted orders.
///
/// Cloning shares the underlying map. Contents are lost on restart.
#[derive(Debug, Clone, Default)]
pub struct OrderStore {
    inner: Arc<DashMap<Uuid, Order>>,
}

impl OrderStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a validated submission and return the stored order.
    pub fn insert(&self, details: NewOrder) -> Order {
        let order = Order::new(details);
        self.inner.insert(order.id, order.clone());
        tracing::info!(order_id = %order.id, items = order.details.items.len(), "Order stored");
        order
    }

    pub fn get(&self, id: &Uuid) -> Option<Order> {
        self.inner.get(id).map(|r| r.value().clone())
    }

    pub fn count(&self) -> usize {
        self.inner.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orders::types::{OrderItem, OrderStatus};

    #[test]
    fn test_store_operations() {
        let store = OrderStore::new();
        assert_eq!(store.count(), 0);

        let order = store.insert(NewOrder {
            customer_name: "Budi".into(),
            phone: "0812".into(),
            items: vec![OrderItem { product_id: "sku-9".into(), quantity: 1 }],
            notes: Some("gift wrap".into()),
        });

        let fetched = store.get(&order.id).unwrap();
        assert_eq!(fetched.status, OrderStatus::AwaitingPayment);
        assert_eq!(fetched.details.notes.as_deref(), Some("gift wrap"));

        // Clones share state
        let shared = store.clone();
        assert_eq!(shared.count(), 1);
        assert!(shared.get(&Uuid::new_v4()).is_none());
    }
}
