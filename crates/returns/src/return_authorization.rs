use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use rma_core::{Aggregate, AggregateId, AggregateRoot, DomainError, Money};
use rma_events::Event;

use crate::order::{InventoryUnit, InventoryUnitId, InventoryUnitState, OrderId, StockLocationId, VariantId};

/// Return authorization identifier (scoped to an order via `order_id`).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReturnAuthorizationId(pub AggregateId);

impl ReturnAuthorizationId {
    pub fn new(id: AggregateId) -> Self {
        Self(id)
    }
}

impl core::fmt::Display for ReturnAuthorizationId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// Return authorization lifecycle.
///
/// `Received` and `Canceled` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReturnAuthorizationState {
    Authorized,
    Received,
    Canceled,
}

/// State-machine edges that can be requested explicitly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Receive,
    Cancel,
}

impl Transition {
    pub fn as_str(self) -> &'static str {
        match self {
            Transition::Receive => "receive",
            Transition::Cancel => "cancel",
        }
    }
}

impl ReturnAuthorizationState {
    pub fn as_str(self) -> &'static str {
        match self {
            ReturnAuthorizationState::Authorized => "authorized",
            ReturnAuthorizationState::Received => "received",
            ReturnAuthorizationState::Canceled => "canceled",
        }
    }

    pub fn is_terminal(self) -> bool {
        !matches!(self, ReturnAuthorizationState::Authorized)
    }

    /// Transition table. Preconditions beyond the edge itself are checked by
    /// the aggregate.
    pub fn transition(self, transition: Transition) -> Result<Self, DomainError> {
        use ReturnAuthorizationState::*;

        match (self, transition) {
            (Authorized, Transition::Receive) => Ok(Received),
            (Authorized, Transition::Cancel) => Ok(Canceled),
            (from, t) => Err(DomainError::invalid_transition(from.as_str(), t.as_str())),
        }
    }
}

impl core::fmt::Display for ReturnAuthorizationState {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl core::str::FromStr for ReturnAuthorizationState {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "authorized" => Ok(ReturnAuthorizationState::Authorized),
            "received" => Ok(ReturnAuthorizationState::Received),
            "canceled" => Ok(ReturnAuthorizationState::Canceled),
            other => Err(DomainError::validation(format!(
                "unknown return authorization state '{other}'"
            ))),
        }
    }
}

/// Inventory unit held by a return authorization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssociatedUnit {
    pub id: InventoryUnitId,
    pub variant_id: VariantId,
    /// `Shipped` while awaiting return, `Returned` once received.
    pub state: InventoryUnitState,
}

/// Aggregate root: ReturnAuthorization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReturnAuthorization {
    id: ReturnAuthorizationId,
    order_id: Option<OrderId>,
    number: String,
    reason: String,
    amount: Money,
    state: ReturnAuthorizationState,
    stock_location_id: Option<StockLocationId>,
    inventory_units: Vec<AssociatedUnit>,
    created_at: Option<DateTime<Utc>>,
    updated_at: Option<DateTime<Utc>>,
    version: u64,
    created: bool,
}

impl ReturnAuthorization {
    /// Create an empty, not-yet-created aggregate instance.
    pub fn empty(id: ReturnAuthorizationId) -> Self {
        Self {
            id,
            order_id: None,
            number: String::new(),
            reason: String::new(),
            amount: Money::zero(),
            state: ReturnAuthorizationState::Authorized,
            stock_location_id: None,
            inventory_units: Vec::new(),
            created_at: None,
            updated_at: None,
            version: 0,
            created: false,
        }
    }

    pub fn id_typed(&self) -> ReturnAuthorizationId {
        self.id
    }

    pub fn order_id(&self) -> Option<OrderId> {
        self.order_id
    }

    pub fn number(&self) -> &str {
        &self.number
    }

    pub fn reason(&self) -> &str {
        &self.reason
    }

    pub fn amount(&self) -> Money {
        self.amount
    }

    pub fn state(&self) -> ReturnAuthorizationState {
        self.state
    }

    pub fn stock_location_id(&self) -> Option<StockLocationId> {
        self.stock_location_id
    }

    pub fn inventory_units(&self) -> &[AssociatedUnit] {
        &self.inventory_units
    }

    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        self.created_at
    }

    pub fn updated_at(&self) -> Option<DateTime<Utc>> {
        self.updated_at
    }

    pub fn is_created(&self) -> bool {
        self.created
    }

    pub fn is_modifiable(&self) -> bool {
        self.created && !self.state.is_terminal()
    }

    fn units_of(&self, variant_id: VariantId) -> impl Iterator<Item = &AssociatedUnit> {
        self.inventory_units
            .iter()
            .filter(move |u| u.variant_id == variant_id)
    }
}

impl AggregateRoot for ReturnAuthorization {
    type Id = ReturnAuthorizationId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// Command: Authorize (create).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Authorize {
    pub order_id: OrderId,
    pub return_authorization_id: ReturnAuthorizationId,
    pub number: String,
    pub reason: String,
    pub amount: Money,
    pub stock_location_id: StockLocationId,
    pub occurred_at: DateTime<Utc>,
}

/// Command: Amend (update reason and/or amount).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Amend {
    pub order_id: OrderId,
    pub reason: Option<String>,
    pub amount: Option<Money>,
    pub occurred_at: DateTime<Utc>,
}

/// Command: AddVariant.
///
/// Sets the number of associated units of `variant_id` to `quantity`, drawing
/// new units from `returnable` or releasing surplus ones.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddVariant {
    pub order_id: OrderId,
    pub variant_id: VariantId,
    pub quantity: u32,
    /// Returnable inventory computed for this authorization at command time.
    pub returnable: Vec<InventoryUnit>,
    pub occurred_at: DateTime<Utc>,
}

/// Command: Receive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Receive {
    pub order_id: OrderId,
    pub occurred_at: DateTime<Utc>,
}

/// Command: Cancel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cancel {
    pub order_id: OrderId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReturnAuthorizationCommand {
    Authorize(Authorize),
    Amend(Amend),
    AddVariant(AddVariant),
    Receive(Receive),
    Cancel(Cancel),
}

/// Event: Authorized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Authorized {
    pub order_id: OrderId,
    pub return_authorization_id: ReturnAuthorizationId,
    pub number: String,
    pub reason: String,
    pub amount: Money,
    pub stock_location_id: StockLocationId,
    pub occurred_at: DateTime<Utc>,
}

/// Event: Amended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Amended {
    pub order_id: OrderId,
    pub reason: Option<String>,
    pub amount: Option<Money>,
    pub occurred_at: DateTime<Utc>,
}

/// Event: UnitsAssociated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitsAssociated {
    pub order_id: OrderId,
    pub variant_id: VariantId,
    pub unit_ids: Vec<InventoryUnitId>,
    pub occurred_at: DateTime<Utc>,
}

/// Event: UnitsReleased.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitsReleased {
    pub order_id: OrderId,
    pub variant_id: VariantId,
    pub unit_ids: Vec<InventoryUnitId>,
    pub occurred_at: DateTime<Utc>,
}

/// Event: Received.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Received {
    pub order_id: OrderId,
    pub unit_ids: Vec<InventoryUnitId>,
    pub occurred_at: DateTime<Utc>,
}

/// Event: Canceled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Canceled {
    pub order_id: OrderId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReturnAuthorizationEvent {
    Authorized(Authorized),
    Amended(Amended),
    UnitsAssociated(UnitsAssociated),
    UnitsReleased(UnitsReleased),
    Received(Received),
    Canceled(Canceled),
}

impl Event for ReturnAuthorizationEvent {
    fn event_type(&self) -> &'static str {
        match self {
            ReturnAuthorizationEvent::Authorized(_) => "returns.authorization.authorized",
            ReturnAuthorizationEvent::Amended(_) => "returns.authorization.amended",
            ReturnAuthorizationEvent::UnitsAssociated(_) => "returns.authorization.units_associated",
            ReturnAuthorizationEvent::UnitsReleased(_) => "returns.authorization.units_released",
            ReturnAuthorizationEvent::Received(_) => "returns.authorization.received",
            ReturnAuthorizationEvent::Canceled(_) => "returns.authorization.canceled",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            ReturnAuthorizationEvent::Authorized(e) => e.occurred_at,
            ReturnAuthorizationEvent::Amended(e) => e.occurred_at,
            ReturnAuthorizationEvent::UnitsAssociated(e) => e.occurred_at,
            ReturnAuthorizationEvent::UnitsReleased(e) => e.occurred_at,
            ReturnAuthorizationEvent::Received(e) => e.occurred_at,
            ReturnAuthorizationEvent::Canceled(e) => e.occurred_at,
        }
    }
}

impl Aggregate for ReturnAuthorization {
    type Command = ReturnAuthorizationCommand;
    type Event = ReturnAuthorizationEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            ReturnAuthorizationEvent::Authorized(e) => {
                self.id = e.return_authorization_id;
                self.order_id = Some(e.order_id);
                self.number = e.number.clone();
                self.reason = e.reason.clone();
                self.amount = e.amount;
                self.state = ReturnAuthorizationState::Authorized;
                self.stock_location_id = Some(e.stock_location_id);
                self.inventory_units.clear();
                self.created_at = Some(e.occurred_at);
                self.created = true;
            }
            ReturnAuthorizationEvent::Amended(e) => {
                if let Some(reason) = &e.reason {
                    self.reason = reason.clone();
                }
                if let Some(amount) = e.amount {
                    self.amount = amount;
                }
            }
            ReturnAuthorizationEvent::UnitsAssociated(e) => {
                self.inventory_units
                    .extend(e.unit_ids.iter().map(|id| AssociatedUnit {
                        id: *id,
                        variant_id: e.variant_id,
                        state: InventoryUnitState::Shipped,
                    }));
            }
            ReturnAuthorizationEvent::UnitsReleased(e) => {
                self.inventory_units.retain(|u| !e.unit_ids.contains(&u.id));
            }
            ReturnAuthorizationEvent::Received(e) => {
                for unit in &mut self.inventory_units {
                    if e.unit_ids.contains(&unit.id) {
                        unit.state = InventoryUnitState::Returned;
                    }
                }
                self.state = ReturnAuthorizationState::Received;
            }
            ReturnAuthorizationEvent::Canceled(_) => {
                self.state = ReturnAuthorizationState::Canceled;
            }
        }

        self.updated_at = Some(event.occurred_at());

        // Deterministic version tracking: +1 per applied event.
        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            ReturnAuthorizationCommand::Authorize(cmd) => self.handle_authorize(cmd),
            ReturnAuthorizationCommand::Amend(cmd) => self.handle_amend(cmd),
            ReturnAuthorizationCommand::AddVariant(cmd) => self.handle_add_variant(cmd),
            ReturnAuthorizationCommand::Receive(cmd) => self.handle_receive(cmd),
            ReturnAuthorizationCommand::Cancel(cmd) => self.handle_cancel(cmd),
        }
    }
}

impl ReturnAuthorization {
    fn ensure_order(&self, order_id: OrderId) -> Result<(), DomainError> {
        if !self.created {
            return Err(DomainError::not_found());
        }
        // A record of another order is indistinguishable from a missing one.
        if self.order_id != Some(order_id) {
            return Err(DomainError::not_found());
        }
        Ok(())
    }

    fn ensure_modifiable(&self, what: &str) -> Result<(), DomainError> {
        if !self.is_modifiable() {
            return Err(DomainError::validation(format!(
                "cannot change {what} of a {} return authorization",
                self.state
            )));
        }
        Ok(())
    }

    fn handle_authorize(&self, cmd: &Authorize) -> Result<Vec<ReturnAuthorizationEvent>, DomainError> {
        if self.created {
            return Err(DomainError::conflict("return authorization already exists"));
        }
        if cmd.return_authorization_id != self.id {
            return Err(DomainError::invalid_id("return_authorization_id mismatch"));
        }
        if cmd.number.trim().is_empty() {
            return Err(DomainError::validation("number must not be empty"));
        }

        Ok(vec![ReturnAuthorizationEvent::Authorized(Authorized {
            order_id: cmd.order_id,
            return_authorization_id: cmd.return_authorization_id,
            number: cmd.number.clone(),
            reason: cmd.reason.clone(),
            amount: cmd.amount,
            stock_location_id: cmd.stock_location_id,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_amend(&self, cmd: &Amend) -> Result<Vec<ReturnAuthorizationEvent>, DomainError> {
        self.ensure_order(cmd.order_id)?;
        self.ensure_modifiable("the reason or amount")?;

        if cmd.reason.is_none() && cmd.amount.is_none() {
            return Err(DomainError::validation("nothing to update: provide reason and/or amount"));
        }

        Ok(vec![ReturnAuthorizationEvent::Amended(Amended {
            order_id: cmd.order_id,
            reason: cmd.reason.clone(),
            amount: cmd.amount,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_add_variant(&self, cmd: &AddVariant) -> Result<Vec<ReturnAuthorizationEvent>, DomainError> {
        self.ensure_order(cmd.order_id)?;
        self.ensure_modifiable("the inventory units")?;

        let held: Vec<InventoryUnitId> = self.units_of(cmd.variant_id).map(|u| u.id).collect();
        let wanted = cmd.quantity as usize;

        if wanted == 0 && held.is_empty() {
            return Err(DomainError::validation("quantity must be positive"));
        }

        if wanted > held.len() {
            let needed = wanted - held.len();
            let picked: Vec<InventoryUnitId> = cmd
                .returnable
                .iter()
                .filter(|u| {
                    u.variant_id == cmd.variant_id
                        && u.state == InventoryUnitState::Shipped
                        && !held.contains(&u.id)
                })
                .map(|u| u.id)
                .take(needed)
                .collect();

            if picked.len() < needed {
                return Err(DomainError::unprocessable(format!(
                    "only {} returnable unit(s) of variant {} available, {} requested",
                    held.len() + picked.len(),
                    cmd.variant_id,
                    wanted
                )));
            }

            return Ok(vec![ReturnAuthorizationEvent::UnitsAssociated(UnitsAssociated {
                order_id: cmd.order_id,
                variant_id: cmd.variant_id,
                unit_ids: picked,
                occurred_at: cmd.occurred_at,
            })]);
        }

        if wanted < held.len() {
            let surplus = held.len() - wanted;
            return Ok(vec![ReturnAuthorizationEvent::UnitsReleased(UnitsReleased {
                order_id: cmd.order_id,
                variant_id: cmd.variant_id,
                unit_ids: held.into_iter().take(surplus).collect(),
                occurred_at: cmd.occurred_at,
            })]);
        }

        Ok(Vec::new())
    }

    fn handle_receive(&self, cmd: &Receive) -> Result<Vec<ReturnAuthorizationEvent>, DomainError> {
        self.ensure_order(cmd.order_id)?;
        self.state.transition(Transition::Receive)?;

        if self.inventory_units.is_empty() {
            return Err(DomainError::unprocessable(
                "cannot receive a return authorization without inventory units",
            ));
        }

        Ok(vec![ReturnAuthorizationEvent::Received(Received {
            order_id: cmd.order_id,
            unit_ids: self.inventory_units.iter().map(|u| u.id).collect(),
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_cancel(&self, cmd: &Cancel) -> Result<Vec<ReturnAuthorizationEvent>, DomainError> {
        self.ensure_order(cmd.order_id)?;
        self.state.transition(Transition::Cancel)?;

        Ok(vec![ReturnAuthorizationEvent::Canceled(Canceled {
            order_id: cmd.order_id,
            occurred_at: cmd.occurred_at,
        })])
    }
}
