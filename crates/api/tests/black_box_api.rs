use chrono::{Duration as ChronoDuration, Utc};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use reqwest::StatusCode;
use serde_json::{json, Value};

use rma_api::app::services::AppServices;
use rma_api::config::ApiConfig;
use rma_auth::{JwtClaims, Role};
use rma_core::{AggregateId, UserId};
use rma_returns::{
    InventoryUnit, InventoryUnitId, InventoryUnitState, Order, OrderId, Shipment, StockLocationId,
    VariantId,
};

const JWT_SECRET: &str = "test-secret";

struct TestServer {
    base_url: String,
    handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    async fn spawn(orders: Vec<Order>) -> Self {
        // Same router as prod, bound to an ephemeral port.
        let config = ApiConfig::for_tests(JWT_SECRET);
        let services = AppServices::in_memory(config.page_limits);
        services.seed_orders(orders);
        let app = rma_api::app::build_app_with(&config, services);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind ephemeral port");
        let addr = listener.local_addr().unwrap();
        let base_url = format!("http://{}", addr);

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self { base_url, handle }
    }

    fn collection(&self, order_id: OrderId) -> String {
        format!("{}/orders/{}/return_authorizations", self.base_url, order_id)
    }

    fn member(&self, order_id: OrderId, id: &str) -> String {
        format!("{}/{}", self.collection(order_id), id)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

fn mint_jwt(sub: UserId, roles: Vec<Role>) -> String {
    let now = Utc::now();
    let claims = JwtClaims {
        sub,
        roles,
        issued_at: now,
        expires_at: now + ChronoDuration::minutes(10),
    };

    jsonwebtoken::encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(JWT_SECRET.as_bytes()),
    )
    .expect("failed to encode jwt")
}

fn shipped(id: u64, variant: u64) -> InventoryUnit {
    InventoryUnit {
        id: InventoryUnitId(id),
        variant_id: VariantId(variant),
        state: InventoryUnitState::Shipped,
    }
}

fn order_owned_by(owner: UserId) -> Order {
    Order {
        id: OrderId::new(AggregateId::new()),
        number: "R100200300".to_string(),
        user_id: Some(owner),
        shipments: vec![Shipment {
            number: "H100".to_string(),
            stock_location_id: StockLocationId(1),
            inventory_units: vec![shipped(1, 10), shipped(2, 10), shipped(3, 20)],
        }],
    }
}

struct Actors {
    admin: String,
    owner: String,
    stranger: String,
}

fn actors(owner: UserId) -> Actors {
    Actors {
        admin: mint_jwt(UserId::new(), vec![Role::admin()]),
        owner: mint_jwt(owner, vec![Role::new("user")]),
        stranger: mint_jwt(UserId::new(), vec![Role::new("user")]),
    }
}

async fn create(client: &reqwest::Client, srv: &TestServer, order_id: OrderId, token: &str, reason: &str) -> Value {
    let res = client
        .post(srv.collection(order_id))
        .bearer_auth(token)
        .json(&json!({ "reason": reason, "amount": "10.00", "stock_location_id": 1 }))
        .send()
        .await
        .unwrap();
    let status = res.status();
    let body: Value = res.json().await.unwrap();
    assert_eq!(status, StatusCode::CREATED, "create failed: {body}");
    body
}

#[tokio::test]
async fn auth_required_for_protected_endpoints() {
    let srv = TestServer::spawn(Vec::new()).await;
    let client = reqwest::Client::new();

    let res = client.get(format!("{}/health", srv.base_url)).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let res = client.get(format!("{}/whoami", srv.base_url)).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let res = client
        .get(format!("{}/whoami", srv.base_url))
        .bearer_auth("not-a-jwt")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"], "unauthorized");
}

#[tokio::test]
async fn principal_is_derived_from_token() {
    let srv = TestServer::spawn(Vec::new()).await;
    let user = UserId::new();
    let token = mint_jwt(user, vec![Role::admin()]);

    let res = reqwest::Client::new()
        .get(format!("{}/whoami", srv.base_url))
        .bearer_auth(token)
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["user_id"].as_str().unwrap(), user.to_string());
    assert_eq!(body["is_admin"], true);
    assert!(body["roles"].as_array().unwrap().iter().any(|r| r == "admin"));
}

#[tokio::test]
async fn admin_lifecycle_create_update_add_receive() {
    let owner = UserId::new();
    let order = order_owned_by(owner);
    let srv = TestServer::spawn(vec![order.clone()]).await;
    let who = actors(owner);
    let client = reqwest::Client::new();

    let created = create(&client, &srv, order.id, &who.admin, "damaged in transit").await;
    let id = created["id"].as_str().unwrap().to_string();
    assert_eq!(created["state"], "authorized");
    assert_eq!(created["number"].as_str().unwrap().len(), 11);
    assert_eq!(created["inventory_units"], json!([]));

    // Receiving without units fails and leaves the state alone.
    let res = client
        .delete(format!("{}/receive", srv.member(order.id, &id)))
        .bearer_auth(&who.admin)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let res = client
        .put(srv.member(order.id, &id))
        .bearer_auth(&who.admin)
        .json(&json!({ "amount": "19.99" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let res = client
        .get(srv.member(order.id, &id))
        .bearer_auth(&who.admin)
        .send()
        .await
        .unwrap();
    let shown: Value = res.json().await.unwrap();
    assert_eq!(shown["amount"], "19.99");
    assert_eq!(shown["reason"], "damaged in transit");
    assert_eq!(shown["state"], "authorized");

    let res = client
        .put(format!("{}/add", srv.member(order.id, &id)))
        .bearer_auth(&who.admin)
        .json(&json!({ "variant_id": 10, "quantity": 1 }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let added: Value = res.json().await.unwrap();
    assert_eq!(added["inventory_units"].as_array().unwrap().len(), 1);

    let res = client
        .delete(format!("{}/receive", srv.member(order.id, &id)))
        .bearer_auth(&who.admin)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let received: Value = res.json().await.unwrap();
    assert_eq!(received["state"], "received");
    assert_eq!(received["inventory_units"][0]["state"], "returned");

    // Terminal: no further transitions or edits.
    let res = client
        .delete(format!("{}/cancel", srv.member(order.id, &id)))
        .bearer_auth(&who.admin)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"], "invalid_transition");

    let res = client
        .put(srv.member(order.id, &id))
        .bearer_auth(&who.admin)
        .json(&json!({ "reason": "changed my mind" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn access_rules_for_owner_and_strangers() {
    let owner = UserId::new();
    let order = order_owned_by(owner);
    let srv = TestServer::spawn(vec![order.clone()]).await;
    let who = actors(owner);
    let client = reqwest::Client::new();

    let created = create(&client, &srv, order.id, &who.admin, "damage").await;
    let id = created["id"].as_str().unwrap().to_string();
    let missing = AggregateId::new().to_string();

    for token in [&who.owner, &who.stranger] {
        let res = client.get(srv.collection(order.id)).bearer_auth(token).send().await.unwrap();
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
        let res = client.get(srv.member(order.id, &id)).bearer_auth(token).send().await.unwrap();
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    }

    // Owner writes look like missing records, existing or not.
    for target in [&id, &missing] {
        let res = client
            .put(srv.member(order.id, target))
            .bearer_auth(&who.owner)
            .json(&json!({ "amount": "19.99" }))
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::NOT_FOUND);

        let res = client
            .delete(srv.member(order.id, target))
            .bearer_auth(&who.owner)
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
    }

    let res = client
        .put(srv.member(order.id, &id))
        .bearer_auth(&who.stranger)
        .json(&json!({ "amount": "19.99" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let res = client.get(srv.member(order.id, &id)).bearer_auth(&who.admin).send().await.unwrap();
    let shown: Value = res.json().await.unwrap();
    assert_eq!(shown["amount"], "10.00");
}

#[tokio::test]
async fn listing_paginates_and_filters() {
    let owner = UserId::new();
    let order = order_owned_by(owner);
    let srv = TestServer::spawn(vec![order.clone()]).await;
    let who = actors(owner);
    let client = reqwest::Client::new();

    create(&client, &srv, order.id, &who.admin, "damaged box").await;
    create(&client, &srv, order.id, &who.admin, "wrong size").await;

    let res = client
        .get(srv.collection(order.id))
        .bearer_auth(&who.admin)
        .query(&[("per_page", "1")])
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let page: Value = res.json().await.unwrap();
    assert_eq!(page["count"], 1);
    assert_eq!(page["current_page"], 1);
    assert_eq!(page["pages"], 2);
    let first = &page["legacy_return_authorizations"][0];
    for field in ["id", "reason", "amount", "state"] {
        assert!(!first[field].is_null(), "missing {field}");
    }

    let res = client
        .get(srv.collection(order.id))
        .bearer_auth(&who.admin)
        .query(&[("q[reason_cont]", "damage")])
        .send()
        .await
        .unwrap();
    let page: Value = res.json().await.unwrap();
    assert_eq!(page["count"], 1);
    assert_eq!(page["legacy_return_authorizations"][0]["reason"], "damaged box");

    let res = client
        .get(srv.collection(order.id))
        .bearer_auth(&who.admin)
        .query(&[("q[colour_eq]", "red")])
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn cancel_destroy_and_returnable_inventory() {
    let owner = UserId::new();
    let order = order_owned_by(owner);
    let srv = TestServer::spawn(vec![order.clone()]).await;
    let who = actors(owner);
    let client = reqwest::Client::new();

    let a = create(&client, &srv, order.id, &who.admin, "a").await;
    let b = create(&client, &srv, order.id, &who.admin, "b").await;
    let (a, b) = (a["id"].as_str().unwrap().to_string(), b["id"].as_str().unwrap().to_string());

    let res = client
        .put(format!("{}/add", srv.member(order.id, &a)))
        .bearer_auth(&who.admin)
        .json(&json!({ "variant_id": 10, "quantity": 2 }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let res = client
        .get(format!("{}/returnable_inventory", srv.member(order.id, &b)))
        .bearer_auth(&who.admin)
        .send()
        .await
        .unwrap();
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["inventory_units"], json!([{ "id": 3, "variant_id": 20, "state": "shipped" }]));

    let res = client
        .delete(format!("{}/cancel", srv.member(order.id, &b)))
        .bearer_auth(&who.admin)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let canceled: Value = res.json().await.unwrap();
    assert_eq!(canceled["state"], "canceled");

    let res = client.delete(srv.member(order.id, &a)).bearer_auth(&who.admin).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::NO_CONTENT);

    let res = client.get(srv.member(order.id, &a)).bearer_auth(&who.admin).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    let res = client.delete(srv.member(order.id, &a)).bearer_auth(&who.admin).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    let res = client
        .get(format!("{}/returnable_inventory", srv.member(order.id, &b)))
        .bearer_auth(&who.admin)
        .send()
        .await
        .unwrap();
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["inventory_units"].as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn unknown_order_is_not_found() {
    let srv = TestServer::spawn(Vec::new()).await;
    let token = mint_jwt(UserId::new(), vec![Role::admin()]);

    let res = reqwest::Client::new()
        .get(srv.collection(OrderId::new(AggregateId::new())))
        .bearer_auth(token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"], "not_found");
}
