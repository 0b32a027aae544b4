//! `/orders/:order_id/return_authorizations` resource.

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, rejection::QueryRejection, Extension, Path, Query},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get, put},
    Json, Router,
};
use serde::Deserialize;

use rma_core::AggregateId;
use rma_returns::{OrderId, ReturnAuthorizationId};

use crate::app::services::AppServices;
use crate::app::{dto, errors};
use crate::context::PrincipalContext;

const COLLECTION: &str = "/orders/:order_id/return_authorizations";

pub fn router() -> Router {
    Router::new()
        .route(COLLECTION, get(index).post(create))
        .route(
            &format!("{COLLECTION}/:id"),
            get(show).put(update).delete(destroy),
        )
        .route(&format!("{COLLECTION}/:id/add"), put(add))
        .route(&format!("{COLLECTION}/:id/receive"), delete(receive))
        .route(&format!("{COLLECTION}/:id/cancel"), delete(cancel))
        .route(
            &format!("{COLLECTION}/:id/returnable_inventory"),
            get(returnable_inventory),
        )
}

#[derive(Debug, Deserialize)]
pub struct OrderPath {
    order_id: String,
}

#[derive(Debug, Deserialize)]
pub struct MemberPath {
    order_id: String,
    id: String,
}

fn parse_order_id(raw: &str) -> Result<OrderId, Response> {
    raw.parse::<AggregateId>()
        .map(OrderId::new)
        .map_err(|_| errors::json_error(StatusCode::BAD_REQUEST, "invalid_id", "invalid order id"))
}

impl MemberPath {
    fn parse(&self) -> Result<(OrderId, ReturnAuthorizationId), Response> {
        let order_id = parse_order_id(&self.order_id)?;
        let id = self
            .id
            .parse::<AggregateId>()
            .map(ReturnAuthorizationId::new)
            .map_err(|_| {
                errors::json_error(StatusCode::BAD_REQUEST, "invalid_id", "invalid return authorization id")
            })?;
        Ok((order_id, id))
    }
}

fn entity(status: StatusCode, ra: &rma_returns::ReturnAuthorization) -> Response {
    (status, Json(dto::ReturnAuthorizationResponse::from(ra))).into_response()
}

pub async fn index(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(path): Path<OrderPath>,
    params: Result<Query<Vec<(String, String)>>, QueryRejection>,
) -> Response {
    let order_id = match parse_order_id(&path.order_id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let Query(params) = match params {
        Ok(q) => q,
        Err(e) => return errors::invalid_input(e.body_text()),
    };

    match services.returns.index(principal.principal(), order_id, &params) {
        Ok(page) => Json(dto::ReturnAuthorizationListResponse::from(&page)).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn show(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(path): Path<MemberPath>,
) -> Response {
    let (order_id, id) = match path.parse() {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match services.returns.show(principal.principal(), order_id, id) {
        Ok(ra) => entity(StatusCode::OK, &ra),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn create(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(path): Path<OrderPath>,
    body: Result<Json<dto::CreateReturnAuthorizationRequest>, JsonRejection>,
) -> Response {
    let order_id = match parse_order_id(&path.order_id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let Json(body) = match body {
        Ok(b) => b,
        Err(e) => return errors::invalid_input(e.body_text()),
    };

    match services.returns.create(principal.principal(), order_id, body.into()) {
        Ok(ra) => entity(StatusCode::CREATED, &ra),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn update(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(path): Path<MemberPath>,
    body: Result<Json<dto::UpdateReturnAuthorizationRequest>, JsonRejection>,
) -> Response {
    let (order_id, id) = match path.parse() {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let Json(body) = match body {
        Ok(b) => b,
        Err(e) => return errors::invalid_input(e.body_text()),
    };

    match services.returns.update(principal.principal(), order_id, id, body.into()) {
        Ok(ra) => entity(StatusCode::OK, &ra),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn add(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(path): Path<MemberPath>,
    body: Result<Json<dto::AddInventoryRequest>, JsonRejection>,
) -> Response {
    let (order_id, id) = match path.parse() {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let Json(body) = match body {
        Ok(b) => b,
        Err(e) => return errors::invalid_input(e.body_text()),
    };

    match services
        .returns
        .add(principal.principal(), order_id, id, body.variant_id, body.quantity)
    {
        Ok(ra) => entity(StatusCode::OK, &ra),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn receive(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(path): Path<MemberPath>,
) -> Response {
    let (order_id, id) = match path.parse() {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match services.returns.receive(principal.principal(), order_id, id) {
        Ok(ra) => entity(StatusCode::OK, &ra),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn cancel(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(path): Path<MemberPath>,
) -> Response {
    let (order_id, id) = match path.parse() {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match services.returns.cancel(principal.principal(), order_id, id) {
        Ok(ra) => entity(StatusCode::OK, &ra),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn destroy(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(path): Path<MemberPath>,
) -> Response {
    let (order_id, id) = match path.parse() {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match services.returns.destroy(principal.principal(), order_id, id) {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn returnable_inventory(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(path): Path<MemberPath>,
) -> Response {
    let (order_id, id) = match path.parse() {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match services
        .returns
        .returnable_inventory(principal.principal(), order_id, id)
    {
        Ok(units) => Json(dto::ReturnableInventoryResponse {
            inventory_units: units.iter().map(Into::into).collect(),
        })
        .into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}
