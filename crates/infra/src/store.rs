//! Return authorization persistence.
//!
//! The store holds the current state of each return authorization (not its
//! event history). Writes are optimistic: `save` states the version the
//! caller loaded and is rejected if another writer got there first.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use thiserror::Error;

use rma_core::{AggregateRoot, ExpectedVersion};
use rma_returns::{
    InventoryUnitId, InventoryUnitState, OrderId, ReturnAuthorization, ReturnAuthorizationId,
};

use crate::query::{Page, StoreQuery};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("return authorization not found")]
    NotFound,

    /// Stale version, duplicate id, or an inventory unit already held elsewhere.
    #[error("conflict: {0}")]
    Conflict(String),

    #[error("invalid record: {0}")]
    InvalidRecord(String),

    #[error("store lock poisoned")]
    Poisoned,
}

/// Order-scoped return authorization repository.
pub trait ReturnAuthorizationStore: Send + Sync {
    /// Next human-facing reference (`RA` + 9 digits). Never repeats.
    fn next_number(&self) -> String;

    /// Insert a freshly authorized record.
    fn create(&self, record: ReturnAuthorization) -> Result<ReturnAuthorization, StoreError>;

    /// Fetch a record of `order_id`. Records of other orders are `NotFound`.
    fn find(
        &self,
        order_id: OrderId,
        id: ReturnAuthorizationId,
    ) -> Result<ReturnAuthorization, StoreError>;

    /// Filter and paginate the order's records in insertion order.
    fn list(
        &self,
        order_id: OrderId,
        query: &StoreQuery,
    ) -> Result<Page<ReturnAuthorization>, StoreError>;

    /// Replace a record, provided it is still at `expected` version.
    fn save(
        &self,
        record: ReturnAuthorization,
        expected: ExpectedVersion,
    ) -> Result<ReturnAuthorization, StoreError>;

    /// Remove a record together with its inventory unit associations.
    ///
    /// Units the record had already received stay claimed: the order still
    /// lists them as shipped, but they must not be returned a second time.
    fn delete(&self, order_id: OrderId, id: ReturnAuthorizationId) -> Result<(), StoreError>;

    /// Units held by the order's return authorizations, other than `except`,
    /// plus units received by since-deleted authorizations.
    fn claimed_units(
        &self,
        order_id: OrderId,
        except: Option<ReturnAuthorizationId>,
    ) -> Result<HashSet<InventoryUnitId>, StoreError>;
}

impl<S> ReturnAuthorizationStore for Arc<S>
where
    S: ReturnAuthorizationStore + ?Sized,
{
    fn next_number(&self) -> String {
        (**self).next_number()
    }

    fn create(&self, record: ReturnAuthorization) -> Result<ReturnAuthorization, StoreError> {
        (**self).create(record)
    }

    fn find(
        &self,
        order_id: OrderId,
        id: ReturnAuthorizationId,
    ) -> Result<ReturnAuthorization, StoreError> {
        (**self).find(order_id, id)
    }

    fn list(
        &self,
        order_id: OrderId,
        query: &StoreQuery,
    ) -> Result<Page<ReturnAuthorization>, StoreError> {
        (**self).list(order_id, query)
    }

    fn save(
        &self,
        record: ReturnAuthorization,
        expected: ExpectedVersion,
    ) -> Result<ReturnAuthorization, StoreError> {
        (**self).save(record, expected)
    }

    fn delete(&self, order_id: OrderId, id: ReturnAuthorizationId) -> Result<(), StoreError> {
        (**self).delete(order_id, id)
    }

    fn claimed_units(
        &self,
        order_id: OrderId,
        except: Option<ReturnAuthorizationId>,
    ) -> Result<HashSet<InventoryUnitId>, StoreError> {
        (**self).claimed_units(order_id, except)
    }
}

#[derive(Debug, Default)]
struct Records {
    by_id: HashMap<ReturnAuthorizationId, ReturnAuthorization>,
    /// Insertion order per order.
    by_order: HashMap<OrderId, Vec<ReturnAuthorizationId>>,
    /// Units received by deleted records.
    returned: HashMap<OrderId, HashSet<InventoryUnitId>>,
}

impl Records {
    fn of_order(&self, order_id: OrderId) -> impl Iterator<Item = &ReturnAuthorization> {
        self.by_order
            .get(&order_id)
            .into_iter()
            .flatten()
            .filter_map(|id| self.by_id.get(id))
    }

    fn ensure_units_free(&self, order_id: OrderId, record: &ReturnAuthorization) -> Result<(), StoreError> {
        let mine: HashSet<InventoryUnitId> = record.inventory_units().iter().map(|u| u.id).collect();
        if mine.is_empty() {
            return Ok(());
        }
        let returned = self.returned.get(&order_id);
        if let Some(unit) = mine.iter().find(|id| returned.is_some_and(|r| r.contains(id))) {
            return Err(StoreError::Conflict(format!("inventory unit {unit} was already returned")));
        }
        for other in self.of_order(order_id).filter(|r| r.id_typed() != record.id_typed()) {
            if let Some(unit) = other.inventory_units().iter().find(|u| mine.contains(&u.id)) {
                return Err(StoreError::Conflict(format!(
                    "inventory unit {} is already held by return authorization {}",
                    unit.id,
                    other.number()
                )));
            }
        }
        Ok(())
    }
}

/// In-memory store for tests/dev.
///
/// One lock guards every record so a `save` (version check, unit exclusivity
/// check, replace) is a single atomic step.
#[derive(Debug)]
pub struct InMemoryReturnAuthorizationStore {
    inner: RwLock<Records>,
    sequence: AtomicU64,
}

impl InMemoryReturnAuthorizationStore {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(Records::default()),
            sequence: AtomicU64::new(0),
        }
    }
}

impl Default for InMemoryReturnAuthorizationStore {
    fn default() -> Self {
        Self::new()
    }
}

fn order_of(record: &ReturnAuthorization) -> Result<OrderId, StoreError> {
    record
        .order_id()
        .ok_or_else(|| StoreError::InvalidRecord("return authorization has no order".to_string()))
}

impl ReturnAuthorizationStore for InMemoryReturnAuthorizationStore {
    fn next_number(&self) -> String {
        let n = self.sequence.fetch_add(1, Ordering::SeqCst) + 1;
        format!("RA{n:09}")
    }

    fn create(&self, record: ReturnAuthorization) -> Result<ReturnAuthorization, StoreError> {
        let order_id = order_of(&record)?;
        let mut records = self.inner.write().map_err(|_| StoreError::Poisoned)?;

        if records.by_id.contains_key(&record.id_typed()) {
            return Err(StoreError::Conflict(format!(
                "return authorization {} already exists",
                record.id_typed()
            )));
        }
        records.ensure_units_free(order_id, &record)?;

        records
            .by_order
            .entry(order_id)
            .or_default()
            .push(record.id_typed());
        records.by_id.insert(record.id_typed(), record.clone());
        Ok(record)
    }

    fn find(
        &self,
        order_id: OrderId,
        id: ReturnAuthorizationId,
    ) -> Result<ReturnAuthorization, StoreError> {
        let records = self.inner.read().map_err(|_| StoreError::Poisoned)?;
        records
            .by_id
            .get(&id)
            .filter(|r| r.order_id() == Some(order_id))
            .cloned()
            .ok_or(StoreError::NotFound)
    }

    fn list(
        &self,
        order_id: OrderId,
        query: &StoreQuery,
    ) -> Result<Page<ReturnAuthorization>, StoreError> {
        let records = self.inner.read().map_err(|_| StoreError::Poisoned)?;
        let matching: Vec<&ReturnAuthorization> = records
            .of_order(order_id)
            .filter(|r| query.matches(r))
            .collect();

        let total_count = matching.len() as u64;
        let items = matching
            .into_iter()
            .skip(query.offset())
            .take(query.per_page as usize)
            .cloned()
            .collect();

        Ok(Page {
            items,
            total_count,
            current_page: query.page,
            per_page: query.per_page,
        })
    }

    fn save(
        &self,
        record: ReturnAuthorization,
        expected: ExpectedVersion,
    ) -> Result<ReturnAuthorization, StoreError> {
        let order_id = order_of(&record)?;
        let mut records = self.inner.write().map_err(|_| StoreError::Poisoned)?;

        let current = records
            .by_id
            .get(&record.id_typed())
            .filter(|r| r.order_id() == Some(order_id))
            .ok_or(StoreError::NotFound)?;

        expected
            .check(current.version())
            .map_err(|e| StoreError::Conflict(e.to_string()))?;
        if record.version() <= current.version() {
            return Err(StoreError::Conflict(format!(
                "record version {} does not advance stored version {}",
                record.version(),
                current.version()
            )));
        }
        records.ensure_units_free(order_id, &record)?;

        records.by_id.insert(record.id_typed(), record.clone());
        Ok(record)
    }

    fn delete(&self, order_id: OrderId, id: ReturnAuthorizationId) -> Result<(), StoreError> {
        let mut records = self.inner.write().map_err(|_| StoreError::Poisoned)?;

        let belongs = records
            .by_id
            .get(&id)
            .is_some_and(|r| r.order_id() == Some(order_id));
        if !belongs {
            return Err(StoreError::NotFound);
        }

        if let Some(removed) = records.by_id.remove(&id) {
            let received: Vec<InventoryUnitId> = removed
                .inventory_units()
                .iter()
                .filter(|u| u.state == InventoryUnitState::Returned)
                .map(|u| u.id)
                .collect();
            if !received.is_empty() {
                records.returned.entry(order_id).or_default().extend(received);
            }
        }
        if let Some(ids) = records.by_order.get_mut(&order_id) {
            ids.retain(|x| *x != id);
        }
        Ok(())
    }

    fn claimed_units(
        &self,
        order_id: OrderId,
        except: Option<ReturnAuthorizationId>,
    ) -> Result<HashSet<InventoryUnitId>, StoreError> {
        let records = self.inner.read().map_err(|_| StoreError::Poisoned)?;
        let mut claimed: HashSet<InventoryUnitId> = records
            .of_order(order_id)
            .filter(|r| Some(r.id_typed()) != except)
            .flat_map(|r| r.inventory_units().iter().map(|u| u.id))
            .collect();
        if let Some(returned) = records.returned.get(&order_id) {
            claimed.extend(returned.iter().copied());
        }
        Ok(claimed)
    }
}
