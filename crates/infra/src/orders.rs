//! Read-only access to orders owned by another system.

use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use rma_returns::{Order, OrderId};

/// Port to the order system.
pub trait OrderDirectory: Send + Sync {
    fn find_order(&self, order_id: OrderId) -> Option<Order>;
}

impl<O> OrderDirectory for Arc<O>
where
    O: OrderDirectory + ?Sized,
{
    fn find_order(&self, order_id: OrderId) -> Option<Order> {
        (**self).find_order(order_id)
    }
}

/// In-memory order directory for tests/dev and seeded deployments.
#[derive(Debug, Default)]
pub struct InMemoryOrderDirectory {
    orders: RwLock<HashMap<OrderId, Order>>,
}

impl InMemoryOrderDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_orders(orders: impl IntoIterator<Item = Order>) -> Self {
        let directory = Self::new();
        for order in orders {
            directory.insert(order);
        }
        directory
    }

    /// Insert or replace an order.
    pub fn insert(&self, order: Order) {
        self.write().insert(order.id, order);
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    // Every write is a single map insert, so a poisoned lock still guards a
    // consistent map.
    fn read(&self) -> RwLockReadGuard<'_, HashMap<OrderId, Order>> {
        self.orders.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<OrderId, Order>> {
        self.orders.write().unwrap_or_else(|e| e.into_inner())
    }
}

impl OrderDirectory for InMemoryOrderDirectory {
    fn find_order(&self, order_id: OrderId) -> Option<Order> {
        self.read().get(&order_id).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rma_core::AggregateId;

    fn order(number: &str) -> Order {
        Order {
            id: OrderId::new(AggregateId::new()),
            number: number.to_string(),
            user_id: None,
            shipments: Vec::new(),
        }
    }

    #[test]
    fn finds_inserted_orders_only() {
        let a = order("R1");
        let directory = InMemoryOrderDirectory::from_orders([a.clone()]);

        assert_eq!(directory.find_order(a.id), Some(a));
        assert_eq!(directory.find_order(OrderId::new(AggregateId::new())), None);
        assert_eq!(directory.len(), 1);
    }

    #[test]
    fn insert_replaces_existing_order() {
        let directory = Arc::new(InMemoryOrderDirectory::new());
        let mut a = order("R1");
        directory.insert(a.clone());
        a.number = "R1-renumbered".to_string();
        directory.insert(a.clone());

        assert_eq!(directory.find_order(a.id).map(|o| o.number), Some("R1-renumbered".to_string()));
        assert_eq!(directory.len(), 1);
    }

    #[test]
    fn poisoned_lock_still_serves_orders() {
        let a = order("R1");
        let directory = Arc::new(InMemoryOrderDirectory::from_orders([a.clone()]));

        let poisoner = Arc::clone(&directory);
        let result = std::thread::spawn(move || {
            let _guard = poisoner.orders.write().unwrap();
            panic!("writer died holding the lock");
        })
        .join();
        assert!(result.is_err());
        assert!(directory.orders.is_poisoned());

        assert_eq!(directory.find_order(a.id), Some(a));
        directory.insert(order("R2"));
        assert_eq!(directory.len(), 2);
    }
}
