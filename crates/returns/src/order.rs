//! Orders as seen by the returns module.
//!
//! Orders, shipments and inventory units are owned elsewhere; this module only
//! reads them to decide which units can be returned.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use rma_core::{AggregateId, UserId};

/// Order identifier.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderId(pub AggregateId);

impl OrderId {
    pub fn new(id: AggregateId) -> Self {
        Self(id)
    }
}

impl core::fmt::Display for OrderId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

macro_rules! numeric_id {
    ($(#[$meta:meta])* $t:ident) => {
        $(#[$meta])*
        #[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $t(pub u64);

        impl core::fmt::Display for $t {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                core::fmt::Display::fmt(&self.0, f)
            }
        }
    };
}

numeric_id!(
    /// Stock location (warehouse) identifier.
    StockLocationId
);
numeric_id!(
    /// Product variant identifier.
    VariantId
);
numeric_id!(
    /// Identifier of a single tracked inventory unit.
    InventoryUnitId
);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InventoryUnitState {
    OnHand,
    Backordered,
    Shipped,
    Returned,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryUnit {
    pub id: InventoryUnitId,
    pub variant_id: VariantId,
    pub state: InventoryUnitState,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Shipment {
    pub number: String,
    pub stock_location_id: StockLocationId,
    #[serde(default)]
    pub inventory_units: Vec<InventoryUnit>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub number: String,
    /// Owning user; `None` for guest checkouts.
    #[serde(default)]
    pub user_id: Option<UserId>,
    #[serde(default)]
    pub shipments: Vec<Shipment>,
}

impl Order {
    pub fn inventory_units(&self) -> impl Iterator<Item = &InventoryUnit> {
        self.shipments.iter().flat_map(|s| s.inventory_units.iter())
    }

    pub fn has_shipped_units(&self) -> bool {
        self.inventory_units()
            .any(|u| u.state == InventoryUnitState::Shipped)
    }

    /// Shipped units at `stock_location_id` that are not in `claimed`.
    ///
    /// `claimed` holds units already associated with other return
    /// authorizations of this order. Order of shipments, then units, is kept.
    pub fn returnable_inventory(
        &self,
        stock_location_id: StockLocationId,
        claimed: &HashSet<InventoryUnitId>,
    ) -> Vec<InventoryUnit> {
        self.shipments
            .iter()
            .filter(|s| s.stock_location_id == stock_location_id)
            .flat_map(|s| s.inventory_units.iter())
            .filter(|u| u.state == InventoryUnitState::Shipped && !claimed.contains(&u.id))
            .cloned()
            .collect()
    }
}
