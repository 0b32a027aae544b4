use std::path::{Path, PathBuf};
use std::sync::Arc;

use thiserror::Error;

use rma_infra::{
    InMemoryOrderDirectory, InMemoryReturnAuthorizationStore, OrderDirectory, PageLimits,
    ReturnAuthorizationService, ReturnAuthorizationStore,
};
use rma_returns::Order;

/// Return authorization use cases as wired for the HTTP layer.
pub type ReturnsService =
    ReturnAuthorizationService<Arc<dyn ReturnAuthorizationStore>, Arc<dyn OrderDirectory>>;

#[derive(Debug, Error)]
pub enum SeedError {
    #[error("failed to read seed orders from {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse seed orders in {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Shared application state handed to handlers.
pub struct AppServices {
    pub returns: ReturnsService,
    orders: Arc<InMemoryOrderDirectory>,
}

impl AppServices {
    /// In-memory store and order directory.
    pub fn in_memory(limits: PageLimits) -> Self {
        let orders = Arc::new(InMemoryOrderDirectory::new());
        let store: Arc<dyn ReturnAuthorizationStore> = Arc::new(InMemoryReturnAuthorizationStore::new());
        let directory: Arc<dyn OrderDirectory> = orders.clone();

        Self {
            returns: ReturnAuthorizationService::new(store, directory, limits),
            orders,
        }
    }

    /// Make orders visible to the service (insert or replace).
    pub fn seed_orders(&self, orders: impl IntoIterator<Item = Order>) {
        for order in orders {
            self.orders.insert(order);
        }
    }
}

impl std::fmt::Debug for AppServices {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppServices")
            .field("orders", &self.orders.len())
            .finish_non_exhaustive()
    }
}

/// Read a JSON array of orders.
pub fn load_seed_orders(path: &Path) -> Result<Vec<Order>, SeedError> {
    let raw = std::fs::read_to_string(path).map_err(|source| SeedError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&raw).map_err(|source| SeedError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rma_core::AggregateId;
    use rma_returns::OrderId;

    #[test]
    fn seeded_orders_are_visible_to_the_service() {
        let services = AppServices::in_memory(PageLimits::default());
        let order = Order {
            id: OrderId::new(AggregateId::new()),
            number: "R1".to_string(),
            user_id: None,
            shipments: Vec::new(),
        };
        services.seed_orders([order.clone()]);
        assert_eq!(services.returns.orders().find_order(order.id), Some(order));
    }

    #[test]
    fn missing_seed_file_is_a_read_error() {
        let err = load_seed_orders(Path::new("/nonexistent/orders.json")).unwrap_err();
        assert!(matches!(err, SeedError::Read { .. }));
    }

    #[test]
    fn seed_file_parses_orders() {
        let path = std::env::temp_dir().join(format!("rma-seed-{}.json", AggregateId::new()));
        let id = AggregateId::new();
        std::fs::write(
            &path,
            format!(
                r#"[{{"id":"{id}","number":"R9","shipments":[{{"number":"H1","stock_location_id":1,
                   "inventory_units":[{{"id":1,"variant_id":2,"state":"shipped"}}]}}]}}]"#
            ),
        )
        .unwrap();

        let orders = load_seed_orders(&path).unwrap();
        std::fs::remove_file(&path).ok();
        assert_eq!(orders.len(), 1);
        assert!(orders[0].has_shipped_units());
    }
}
