use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use rma_infra::{NewReturnAuthorization, Page, ReturnAuthorizationChanges};
use rma_returns::{
    AssociatedUnit, InventoryUnit, InventoryUnitId, InventoryUnitState, ReturnAuthorization,
    ReturnAuthorizationState, StockLocationId, VariantId,
};

// -------------------------
// Request DTOs
// -------------------------

#[derive(Debug, Deserialize)]
pub struct CreateReturnAuthorizationRequest {
    #[serde(default)]
    pub reason: String,
    /// Decimal string or JSON number.
    pub amount: Option<Decimal>,
    pub stock_location_id: Option<StockLocationId>,
}

impl From<CreateReturnAuthorizationRequest> for NewReturnAuthorization {
    fn from(body: CreateReturnAuthorizationRequest) -> Self {
        Self {
            reason: body.reason,
            amount: body.amount,
            stock_location_id: body.stock_location_id,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct UpdateReturnAuthorizationRequest {
    pub reason: Option<String>,
    pub amount: Option<Decimal>,
}

impl From<UpdateReturnAuthorizationRequest> for ReturnAuthorizationChanges {
    fn from(body: UpdateReturnAuthorizationRequest) -> Self {
        Self {
            reason: body.reason,
            amount: body.amount,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct AddInventoryRequest {
    pub variant_id: VariantId,
    pub quantity: u32,
}

// -------------------------
// Response DTOs
// -------------------------

#[derive(Debug, Serialize)]
pub struct InventoryUnitResponse {
    pub id: InventoryUnitId,
    pub variant_id: VariantId,
    pub state: InventoryUnitState,
}

impl From<&AssociatedUnit> for InventoryUnitResponse {
    fn from(u: &AssociatedUnit) -> Self {
        Self {
            id: u.id,
            variant_id: u.variant_id,
            state: u.state,
        }
    }
}

impl From<&InventoryUnit> for InventoryUnitResponse {
    fn from(u: &InventoryUnit) -> Self {
        Self {
            id: u.id,
            variant_id: u.variant_id,
            state: u.state,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ReturnAuthorizationResponse {
    pub id: String,
    pub number: String,
    pub reason: String,
    /// Two-place decimal string, e.g. `"19.99"`.
    pub amount: String,
    pub state: ReturnAuthorizationState,
    pub order_id: Option<String>,
    pub stock_location_id: Option<StockLocationId>,
    pub inventory_units: Vec<InventoryUnitResponse>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl From<&ReturnAuthorization> for ReturnAuthorizationResponse {
    fn from(ra: &ReturnAuthorization) -> Self {
        Self {
            id: ra.id_typed().to_string(),
            number: ra.number().to_string(),
            reason: ra.reason().to_string(),
            amount: ra.amount().to_string(),
            state: ra.state(),
            order_id: ra.order_id().map(|id| id.to_string()),
            stock_location_id: ra.stock_location_id(),
            inventory_units: ra.inventory_units().iter().map(Into::into).collect(),
            created_at: ra.created_at(),
            updated_at: ra.updated_at(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ReturnAuthorizationListResponse {
    pub legacy_return_authorizations: Vec<ReturnAuthorizationResponse>,
    pub count: usize,
    pub total_count: u64,
    pub current_page: u32,
    pub per_page: u32,
    pub pages: u64,
}

impl From<&Page<ReturnAuthorization>> for ReturnAuthorizationListResponse {
    fn from(page: &Page<ReturnAuthorization>) -> Self {
        Self {
            legacy_return_authorizations: page.items.iter().map(Into::into).collect(),
            count: page.count(),
            total_count: page.total_count,
            current_page: page.current_page,
            per_page: page.per_page,
            pages: page.pages(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ReturnableInventoryResponse {
    pub inventory_units: Vec<InventoryUnitResponse>,
}
