//! Return authorization use cases.
//!
//! Every operation follows the same order:
//!
//! ```text
//! resolve order (NotFound) -> capability -> gate -> store / state machine
//! ```
//!
//! The gate runs before the record is looked up, so a denied caller learns
//! nothing about which return authorizations exist.

use chrono::Utc;
use rust_decimal::Decimal;
use thiserror::Error;

use rma_auth::{AccessDenied, Action, Principal, authorize};
use rma_core::{Aggregate, AggregateId, AggregateRoot, DomainError, ExpectedVersion, Money};
use rma_events::Event;
use rma_returns::{
    AddVariant, Amend, Authorize, Cancel, InventoryUnit, InventoryUnitState, Order, OrderId,
    Receive, ReturnAuthorization, ReturnAuthorizationCommand, ReturnAuthorizationEvent,
    ReturnAuthorizationId, StockLocationId, VariantId,
};

use crate::orders::OrderDirectory;
use crate::query::{Page, PageLimits, QueryTranslator};
use crate::store::{ReturnAuthorizationStore, StoreError};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ServiceError {
    #[error("unauthorized")]
    Unauthorized,

    #[error("not found")]
    NotFound,

    #[error("{0}")]
    UnprocessableState(String),

    #[error("{0}")]
    InvalidTransition(String),

    #[error("{0}")]
    InvalidInput(String),

    #[error("{0}")]
    Conflict(String),

    /// Storage failure unrelated to the request.
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<DomainError> for ServiceError {
    fn from(value: DomainError) -> Self {
        match value {
            DomainError::Validation(msg) | DomainError::InvalidId(msg) => ServiceError::InvalidInput(msg),
            DomainError::Unprocessable(msg) => ServiceError::UnprocessableState(msg),
            e @ DomainError::InvalidTransition { .. } => ServiceError::InvalidTransition(e.to_string()),
            DomainError::NotFound => ServiceError::NotFound,
            DomainError::Conflict(msg) => ServiceError::Conflict(msg),
        }
    }
}

impl From<AccessDenied> for ServiceError {
    fn from(value: AccessDenied) -> Self {
        match value {
            AccessDenied::Unauthorized => ServiceError::Unauthorized,
            AccessDenied::NotFound => ServiceError::NotFound,
        }
    }
}

impl From<StoreError> for ServiceError {
    fn from(value: StoreError) -> Self {
        match value {
            StoreError::NotFound => ServiceError::NotFound,
            StoreError::Conflict(msg) => ServiceError::Conflict(msg),
            e @ (StoreError::InvalidRecord(_) | StoreError::Poisoned) => ServiceError::Internal(e.to_string()),
        }
    }
}

/// Input of `create`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct NewReturnAuthorization {
    pub reason: String,
    /// Defaults to zero.
    pub amount: Option<Decimal>,
    /// Defaults to the first stock location that shipped units of the order.
    pub stock_location_id: Option<StockLocationId>,
}

/// Input of `update`; absent fields are left untouched.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ReturnAuthorizationChanges {
    pub reason: Option<String>,
    pub amount: Option<Decimal>,
}

#[derive(Debug)]
pub struct ReturnAuthorizationService<S, O> {
    store: S,
    orders: O,
    translator: QueryTranslator,
}

impl<S, O> ReturnAuthorizationService<S, O> {
    pub fn new(store: S, orders: O, limits: PageLimits) -> Self {
        Self {
            store,
            orders,
            translator: QueryTranslator::new(limits),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn orders(&self) -> &O {
        &self.orders
    }
}

impl<S, O> ReturnAuthorizationService<S, O>
where
    S: ReturnAuthorizationStore,
    O: OrderDirectory,
{
    /// Filtered, paginated list of the order's return authorizations.
    ///
    /// `params` are raw query-string pairs (`page`, `per_page`, `q[...]`).
    pub fn index<K, V>(
        &self,
        principal: &Principal,
        order_id: OrderId,
        params: &[(K, V)],
    ) -> Result<Page<ReturnAuthorization>, ServiceError>
    where
        K: AsRef<str>,
        V: AsRef<str>,
    {
        self.resolve(principal, order_id, Action::Index)?;
        let query = self.translator.translate(params)?;
        Ok(self.store.list(order_id, &query)?)
    }

    pub fn show(
        &self,
        principal: &Principal,
        order_id: OrderId,
        id: ReturnAuthorizationId,
    ) -> Result<ReturnAuthorization, ServiceError> {
        self.resolve(principal, order_id, Action::Show)?;
        Ok(self.store.find(order_id, id)?)
    }

    pub fn create(
        &self,
        principal: &Principal,
        order_id: OrderId,
        input: NewReturnAuthorization,
    ) -> Result<ReturnAuthorization, ServiceError> {
        let order = self.resolve(principal, order_id, Action::Create)?;

        if !order.has_shipped_units() {
            return Err(ServiceError::UnprocessableState(format!(
                "order {} has no shipped inventory units to return",
                order.number
            )));
        }
        let amount = match input.amount {
            Some(value) => Money::new(value)?,
            None => Money::zero(),
        };
        let stock_location_id = match input.stock_location_id.or_else(|| default_stock_location(&order)) {
            Some(id) => id,
            None => {
                return Err(ServiceError::UnprocessableState(
                    "order has no stock location with shipped units".to_string(),
                ));
            }
        };

        let id = ReturnAuthorizationId::new(AggregateId::new());
        let mut record = ReturnAuthorization::empty(id);
        let command = ReturnAuthorizationCommand::Authorize(Authorize {
            order_id,
            return_authorization_id: id,
            number: self.store.next_number(),
            reason: input.reason,
            amount,
            stock_location_id,
            occurred_at: Utc::now(),
        });
        let events = record.handle(&command)?;
        for event in &events {
            record.apply(event);
        }

        let created = self.store.create(record)?;
        log_committed(order_id, &created, &events);
        Ok(created)
    }

    pub fn update(
        &self,
        principal: &Principal,
        order_id: OrderId,
        id: ReturnAuthorizationId,
        changes: ReturnAuthorizationChanges,
    ) -> Result<ReturnAuthorization, ServiceError> {
        self.resolve(principal, order_id, Action::Update)?;
        let amount = changes.amount.map(Money::new).transpose()?;

        self.execute(order_id, id, |_| {
            Ok(ReturnAuthorizationCommand::Amend(Amend {
                order_id,
                reason: changes.reason,
                amount,
                occurred_at: Utc::now(),
            }))
        })
    }

    /// Sets the number of associated units of `variant_id` to `quantity`.
    pub fn add(
        &self,
        principal: &Principal,
        order_id: OrderId,
        id: ReturnAuthorizationId,
        variant_id: VariantId,
        quantity: u32,
    ) -> Result<ReturnAuthorization, ServiceError> {
        let order = self.resolve(principal, order_id, Action::Add)?;

        self.execute(order_id, id, |record| {
            let returnable = self.returnable_for(&order, record)?;
            Ok(ReturnAuthorizationCommand::AddVariant(AddVariant {
                order_id,
                variant_id,
                quantity,
                returnable,
                occurred_at: Utc::now(),
            }))
        })
    }

    pub fn receive(
        &self,
        principal: &Principal,
        order_id: OrderId,
        id: ReturnAuthorizationId,
    ) -> Result<ReturnAuthorization, ServiceError> {
        self.resolve(principal, order_id, Action::Receive)?;
        self.execute(order_id, id, |_| {
            Ok(ReturnAuthorizationCommand::Receive(Receive {
                order_id,
                occurred_at: Utc::now(),
            }))
        })
    }

    pub fn cancel(
        &self,
        principal: &Principal,
        order_id: OrderId,
        id: ReturnAuthorizationId,
    ) -> Result<ReturnAuthorization, ServiceError> {
        self.resolve(principal, order_id, Action::Cancel)?;
        self.execute(order_id, id, |_| {
            Ok(ReturnAuthorizationCommand::Cancel(Cancel {
                order_id,
                occurred_at: Utc::now(),
            }))
        })
    }

    /// Removes the record. Units it held become returnable again unless it
    /// had already received them.
    pub fn destroy(
        &self,
        principal: &Principal,
        order_id: OrderId,
        id: ReturnAuthorizationId,
    ) -> Result<(), ServiceError> {
        self.resolve(principal, order_id, Action::Destroy)?;
        self.store.delete(order_id, id)?;
        tracing::info!(
            order_id = %order_id,
            return_authorization_id = %id,
            "return authorization destroyed"
        );
        Ok(())
    }

    /// Units that could still be associated with this return authorization.
    pub fn returnable_inventory(
        &self,
        principal: &Principal,
        order_id: OrderId,
        id: ReturnAuthorizationId,
    ) -> Result<Vec<InventoryUnit>, ServiceError> {
        let order = self.resolve(principal, order_id, Action::Show)?;
        let record = self.store.find(order_id, id)?;
        self.returnable_for(&order, &record)
    }

    fn resolve(&self, principal: &Principal, order_id: OrderId, action: Action) -> Result<Order, ServiceError> {
        let Some(order) = self.orders.find_order(order_id) else {
            tracing::debug!(order_id = %order_id, action = %action, "order not found");
            return Err(ServiceError::NotFound);
        };

        let capability = principal.capability_over(order.user_id);
        if let Err(denied) = authorize(capability, action) {
            tracing::debug!(
                user_id = %principal.user_id,
                order_id = %order_id,
                action = %action,
                is_admin = capability.is_admin,
                owns_order = capability.owns_order,
                ?denied,
                "return authorization access denied"
            );
            return Err(denied.into());
        }
        Ok(order)
    }

    fn returnable_for(&self, order: &Order, record: &ReturnAuthorization) -> Result<Vec<InventoryUnit>, ServiceError> {
        let Some(stock_location_id) = record.stock_location_id() else {
            return Ok(Vec::new());
        };
        let claimed = self.store.claimed_units(order.id, Some(record.id_typed()))?;
        Ok(order.returnable_inventory(stock_location_id, &claimed))
    }

    /// Load, decide, apply, save (optimistic on the loaded version).
    fn execute<F>(
        &self,
        order_id: OrderId,
        id: ReturnAuthorizationId,
        command: F,
    ) -> Result<ReturnAuthorization, ServiceError>
    where
        F: FnOnce(&ReturnAuthorization) -> Result<ReturnAuthorizationCommand, ServiceError>,
    {
        let mut record = self.store.find(order_id, id)?;
        let expected = ExpectedVersion::at(record.version());

        let command = command(&record)?;
        let events = record.handle(&command)?;
        if events.is_empty() {
            return Ok(record);
        }
        for event in &events {
            record.apply(event);
        }

        let saved = self.store.save(record, expected)?;
        log_committed(order_id, &saved, &events);
        Ok(saved)
    }
}

fn default_stock_location(order: &Order) -> Option<StockLocationId> {
    order
        .shipments
        .iter()
        .find(|s| s.inventory_units.iter().any(|u| u.state == InventoryUnitState::Shipped))
        .map(|s| s.stock_location_id)
}

fn log_committed(order_id: OrderId, record: &ReturnAuthorization, events: &[ReturnAuthorizationEvent]) {
    for event in events {
        tracing::info!(
            event_type = %event.qualified_type(),
            order_id = %order_id,
            return_authorization_id = %record.id_typed(),
            number = record.number(),
            version = record.version(),
            "return authorization event committed"
        );
    }
}
