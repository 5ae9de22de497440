//! Integration tests driving the real provider clients, catalog
//! aggregator, checkout orchestrator, and HTTP surface against in-process
//! mock provider servers bound to random ports.

use std::sync::{Arc, Mutex};

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Form, Json, Router};
use rust_decimal::Decimal;
use serde_json::{json, Value};

use driftwear_storefront::catalog::CatalogAggregator;
use driftwear_storefront::checkout::{
    CheckoutForm, CheckoutOrchestrator, CheckoutState, RedirectSubmission, TokenSubmission,
};
use driftwear_storefront::config::{FulfillmentConfig, StoreConfig};
use driftwear_storefront::domain::aggregates::{Cart, Product, Variant};
use driftwear_storefront::domain::value_objects::Money;
use driftwear_storefront::providers::fulfillment::FulfillmentClient;
use driftwear_storefront::providers::redirect::RedirectCheckoutClient;
use driftwear_storefront::providers::token::TokenPaymentClient;
use driftwear_storefront::server::{router, AppState};

async fn spawn(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind mock server");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("mock server");
    });
    format!("http://{addr}")
}

fn filled_form() -> CheckoutForm {
    CheckoutForm {
        first_name: "Ada".into(),
        last_name: "Lovelace".into(),
        email: "ada@example.com".into(),
        address: "1 Engine Way".into(),
        city: "London".into(),
        state: "LN".into(),
        zip: "E1 6AN".into(),
        country: "GB".into(),
    }
}

fn cart_with_two_lines() -> Cart {
    let tee = Variant::new(
        10,
        "Harbor Tee - Black - M",
        Money::usd(Decimal::new(1999, 2)),
        Some("TEE-BLK-M".into()),
        vec![],
    );
    let tee_product = Product::new(1, "Harbor Tee", "http://img/tee.png", vec![tee.clone()]);
    let cap = Variant::new(
        20,
        "Drift Cap - One Size",
        Money::usd(Decimal::new(950, 2)),
        None,
        vec![],
    );
    let cap_product = Product::new(2, "Drift Cap", "http://img/cap.png", vec![cap.clone()]);

    let mut cart = Cart::new();
    cart.add_item_with_quantity(&tee_product, &tee, 2);
    cart.add_item_with_quantity(&cap_product, &cap, 3);
    cart
}

// ---------------------------------------------------------------------------
// Mock fulfillment provider
// ---------------------------------------------------------------------------

#[derive(Clone, Default)]
struct FulfillmentMock {
    /// Product id whose detail call answers 500.
    fail_detail_for: Option<i64>,
    /// Override for the order endpoint: (status, body).
    order_failure: Option<(u16, Value)>,
}

fn fulfillment_router(mock: FulfillmentMock) -> Router {
    Router::new()
        .route("/store/products", get(mock_list))
        .route("/store/products/:id", get(mock_detail))
        .route("/orders", post(mock_order))
        .with_state(mock)
}

async fn mock_list() -> Json<Value> {
    Json(json!({
        "result": [
            { "id": 1, "name": "Harbor Tee", "thumbnail_url": "http://img/tee.png" },
            { "id": 2, "name": "Drift Cap", "thumbnail_url": "http://img/cap.png" }
        ]
    }))
}

async fn mock_detail(
    State(mock): State<FulfillmentMock>,
    Path(id): Path<i64>,
) -> (StatusCode, Json<Value>) {
    if mock.fail_detail_for == Some(id) {
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": { "message": "detail unavailable" } })),
        );
    }
    let detail = match id {
        1 => json!({
            "result": {
                "product": { "id": 1, "name": "Harbor Tee", "thumbnail_url": "http://img/tee.png" },
                "variants": [
                    { "id": 10, "name": "Harbor Tee - Black - S", "retail_price": "19.99", "sku": "TEE-BLK-S" },
                    { "id": 11, "name": "Harbor Tee - Black - M", "retail_price": "19.99", "sku": "TEE-BLK-M" }
                ]
            }
        }),
        _ => json!({
            "result": {
                "product": { "id": 2, "name": "Drift Cap", "thumbnail_url": "http://img/cap.png" },
                "variants": [
                    { "id": 20, "name": "Drift Cap - One Size", "retail_price": "9.50" }
                ]
            }
        }),
    };
    (StatusCode::OK, Json(detail))
}

async fn mock_order(State(mock): State<FulfillmentMock>, Json(body): Json<Value>) -> (StatusCode, Json<Value>) {
    if let Some((status, payload)) = &mock.order_failure {
        return (
            StatusCode::from_u16(*status).expect("mock status"),
            Json(payload.clone()),
        );
    }
    assert!(body["recipient"]["name"].is_string());
    assert!(body["items"].as_array().is_some_and(|items| !items.is_empty()));
    (
        StatusCode::OK,
        Json(json!({ "result": { "id": 1234, "status": "draft" } })),
    )
}

// ---------------------------------------------------------------------------
// Mock token payment provider
// ---------------------------------------------------------------------------

#[derive(Clone, Default)]
struct TokenMock {
    /// Capture answers HTTP 200 with an embedded error payload.
    capture_embedded_error: bool,
    /// Last order-create body, for asserting the amount breakdown.
    created: Arc<Mutex<Option<Value>>>,
}

fn token_router(mock: TokenMock) -> Router {
    Router::new()
        .route("/v1/oauth2/token", post(mock_oauth))
        .route("/v2/checkout/orders", post(mock_create_order))
        .route("/v2/checkout/orders/:id/capture", post(mock_capture))
        .with_state(mock)
}

async fn mock_oauth() -> Json<Value> {
    Json(json!({ "access_token": "test-token", "token_type": "Bearer" }))
}

async fn mock_create_order(State(mock): State<TokenMock>, Json(body): Json<Value>) -> Json<Value> {
    *mock.created.lock().expect("created lock") = Some(body);
    Json(json!({ "id": "X1", "status": "CREATED" }))
}

async fn mock_capture(State(mock): State<TokenMock>, Path(id): Path<String>) -> Json<Value> {
    if mock.capture_embedded_error {
        Json(json!({ "error": { "message": "capture declined" } }))
    } else {
        Json(json!({ "id": id, "status": "COMPLETED" }))
    }
}

// ---------------------------------------------------------------------------
// Mock redirect payment provider
// ---------------------------------------------------------------------------

fn redirect_router(seen: Arc<Mutex<Option<Vec<(String, String)>>>>) -> Router {
    Router::new().route(
        "/v1/checkout/sessions",
        post(move |Form(params): Form<Vec<(String, String)>>| {
            let seen = seen.clone();
            async move {
                *seen.lock().expect("params lock") = Some(params);
                Json(json!({
                    "id": "cs_test_1",
                    "url": "https://pay.example.com/cs_test_1"
                }))
            }
        }),
    )
}

// ---------------------------------------------------------------------------
// Catalog aggregation
// ---------------------------------------------------------------------------

#[tokio::test]
async fn catalog_fetch_preserves_list_order_and_parses_facets() {
    let base = spawn(fulfillment_router(FulfillmentMock::default())).await;
    let client = FulfillmentClient::new(reqwest::Client::new(), &base, "test-key");
    let catalog = CatalogAggregator::new(client)
        .fetch_catalog()
        .await
        .expect("catalog");

    assert_eq!(catalog.len(), 2);
    assert_eq!(catalog[0].name, "Harbor Tee");
    assert_eq!(catalog[1].name, "Drift Cap");

    let m = &catalog[0].variants[1];
    assert_eq!(m.facets.size.as_deref(), Some("M"));
    assert_eq!(m.facets.color.as_deref(), Some("Black"));
    assert_eq!(m.retail_price, Money::usd(Decimal::new(1999, 2)));
}

#[tokio::test]
async fn catalog_fetch_fails_fast_on_single_detail_failure() {
    let base = spawn(fulfillment_router(FulfillmentMock {
        fail_detail_for: Some(2),
        ..Default::default()
    }))
    .await;
    let client = FulfillmentClient::new(reqwest::Client::new(), &base, "test-key");
    let err = CatalogAggregator::new(client)
        .fetch_catalog()
        .await
        .expect_err("one failing detail fails the aggregation");
    assert_eq!(err.to_string(), "detail unavailable");
}

// ---------------------------------------------------------------------------
// Checkout paths
// ---------------------------------------------------------------------------

#[tokio::test]
async fn fulfillment_checkout_success_clears_cart() {
    let base = spawn(fulfillment_router(FulfillmentMock::default())).await;
    let client = FulfillmentClient::new(reqwest::Client::new(), &base, "test-key");

    let mut cart = cart_with_two_lines();
    let mut orchestrator = CheckoutOrchestrator::new();
    let state = orchestrator.submit(&mut cart, &filled_form(), &client).await;

    match state {
        CheckoutState::Success { .. } => {}
        other => panic!("expected Success, got {other:?}"),
    }
    assert!(cart.is_empty());
}

#[tokio::test]
async fn fulfillment_402_surfaces_provider_message_and_keeps_cart() {
    let base = spawn(fulfillment_router(FulfillmentMock {
        order_failure: Some((402, json!({ "error": { "message": "insufficient funds" } }))),
        ..Default::default()
    }))
    .await;
    let client = FulfillmentClient::new(reqwest::Client::new(), &base, "test-key");

    let mut cart = cart_with_two_lines();
    let mut orchestrator = CheckoutOrchestrator::new();
    let state = orchestrator.submit(&mut cart, &filled_form(), &client).await;

    match state {
        CheckoutState::Failed { message } => assert_eq!(message, "insufficient funds"),
        other => panic!("expected Failed, got {other:?}"),
    }
    assert_eq!(cart.line_count(), 2);
}

#[tokio::test]
async fn token_checkout_amount_breakdown_agrees_to_the_cent() {
    let mock = TokenMock::default();
    let created = mock.created.clone();
    let base = spawn(token_router(mock)).await;
    let client = TokenPaymentClient::new(reqwest::Client::new(), &base, "client-id", "secret");

    let mut cart = cart_with_two_lines();
    let mut orchestrator = CheckoutOrchestrator::new();
    let submission = TokenSubmission {
        client,
        return_url: "http://localhost:8080/success".into(),
        cancel_url: "http://localhost:8080/?canceled=true".into(),
    };
    let state = orchestrator
        .submit(&mut cart, &filled_form(), &submission)
        .await;
    assert!(matches!(state, CheckoutState::Success { .. }));
    assert!(cart.is_empty());

    let body = created.lock().expect("created lock").clone().expect("order body");
    let unit = &body["purchase_units"][0];
    // 19.99 * 2 + 9.50 * 3
    assert_eq!(unit["amount"]["value"], "68.48");
    assert_eq!(unit["amount"]["breakdown"]["item_total"]["value"], "68.48");
    assert_eq!(unit["items"].as_array().expect("items").len(), 2);
}

#[tokio::test]
async fn token_capture_error_in_200_body_is_a_failure() {
    let base = spawn(token_router(TokenMock {
        capture_embedded_error: true,
        ..Default::default()
    }))
    .await;
    let client = TokenPaymentClient::new(reqwest::Client::new(), &base, "client-id", "secret");

    let mut cart = cart_with_two_lines();
    let mut orchestrator = CheckoutOrchestrator::new();
    let submission = TokenSubmission {
        client,
        return_url: "http://localhost:8080/success".into(),
        cancel_url: "http://localhost:8080/?canceled=true".into(),
    };
    let state = orchestrator
        .submit(&mut cart, &filled_form(), &submission)
        .await;

    match state {
        CheckoutState::Failed { message } => assert_eq!(message, "capture declined"),
        other => panic!("expected Failed, got {other:?}"),
    }
    assert_eq!(cart.line_count(), 2);
}

#[tokio::test]
async fn redirect_checkout_hands_off_to_session_url() {
    let seen = Arc::new(Mutex::new(None));
    let base = spawn(redirect_router(seen.clone())).await;
    let client = RedirectCheckoutClient::new(reqwest::Client::new(), &base, "sk_test");

    let mut cart = cart_with_two_lines();
    let mut orchestrator = CheckoutOrchestrator::new();
    let submission = RedirectSubmission {
        client,
        success_url: "http://localhost:8080/success?session_id={CHECKOUT_SESSION_ID}".into(),
        cancel_url: "http://localhost:8080/?canceled=true".into(),
    };
    let state = orchestrator
        .submit(&mut cart, &filled_form(), &submission)
        .await;

    match state {
        CheckoutState::Success { outcome } => {
            let rendered = serde_json::to_value(outcome).expect("outcome json");
            assert_eq!(rendered["type"], "redirectRequired");
            assert_eq!(rendered["url"], "https://pay.example.com/cs_test_1");
            assert_eq!(rendered["sessionId"], "cs_test_1");
        }
        other => panic!("expected Success, got {other:?}"),
    }
    assert!(cart.is_empty());

    let params = seen.lock().expect("params lock").clone().expect("form params");
    let get = |key: &str| {
        params
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.clone())
    };
    assert_eq!(get("customer_email").as_deref(), Some("ada@example.com"));
    assert_eq!(
        get("line_items[0][price_data][unit_amount]").as_deref(),
        Some("1999")
    );
    assert_eq!(get("line_items[1][quantity]").as_deref(), Some("3"));
}

// ---------------------------------------------------------------------------
// Service surface end to end
// ---------------------------------------------------------------------------

#[tokio::test]
async fn cart_endpoints_drive_a_full_checkout() {
    let provider_base = spawn(fulfillment_router(FulfillmentMock::default())).await;
    let config = StoreConfig::with_providers(
        Some(FulfillmentConfig {
            api_key: "test-key".into(),
            api_url: provider_base,
        }),
        None,
        None,
        "http://localhost:8080",
    );
    let app_base = spawn(router(AppState::new(config))).await;
    let http = reqwest::Client::new();

    // add two units of one variant
    let added: Value = http
        .post(format!("{app_base}/api/cart/alice/items"))
        .json(&json!({
            "product": { "id": 1, "name": "Harbor Tee", "thumbnailUrl": "http://img/tee.png" },
            "variant": { "id": 10, "name": "Harbor Tee - Black - M", "retailPrice": "19.99" },
            "quantity": 2
        }))
        .send()
        .await
        .expect("add item")
        .json()
        .await
        .expect("add item body");
    assert_eq!(added["itemCount"], 2);
    assert_eq!(added["lines"][0]["lineId"], "1-10");
    assert_eq!(added["total"], "39.98");

    // adding the same variant merges rather than duplicating
    let merged: Value = http
        .post(format!("{app_base}/api/cart/alice/items"))
        .json(&json!({
            "product": { "id": 1, "name": "Harbor Tee", "thumbnailUrl": "http://img/tee.png" },
            "variant": { "id": 10, "name": "Harbor Tee - Black - M", "retailPrice": "19.99" }
        }))
        .send()
        .await
        .expect("merge item")
        .json()
        .await
        .expect("merge body");
    assert_eq!(merged["lines"].as_array().expect("lines").len(), 1);
    assert_eq!(merged["lines"][0]["quantity"], 3);

    // checkout through the fulfillment path
    let checkout: Value = http
        .post(format!("{app_base}/api/cart/alice/checkout"))
        .json(&json!({
            "method": "fulfillment",
            "form": {
                "firstName": "Ada", "lastName": "Lovelace",
                "email": "ada@example.com", "address": "1 Engine Way",
                "city": "London", "state": "LN", "zip": "E1 6AN"
            }
        }))
        .send()
        .await
        .expect("checkout")
        .json()
        .await
        .expect("checkout body");
    assert_eq!(checkout["status"], "success");
    assert_eq!(checkout["outcome"]["type"], "orderPlaced");
    assert_eq!(checkout["outcome"]["orderId"], "1234");

    // the cart was cleared by the successful submission
    let cart: Value = http
        .get(format!("{app_base}/api/cart/alice"))
        .send()
        .await
        .expect("get cart")
        .json()
        .await
        .expect("cart body");
    assert_eq!(cart["itemCount"], 0);
    assert!(cart["lines"].as_array().expect("lines").is_empty());
}

#[tokio::test]
async fn missing_credentials_surface_as_configuration_error() {
    let config = StoreConfig::with_providers(None, None, None, "http://localhost:8080");
    let app_base = spawn(router(AppState::new(config))).await;

    let response = reqwest::Client::new()
        .post(format!("{app_base}/api/orders"))
        .json(&json!({
            "recipient": {
                "name": "Ada Lovelace", "address1": "1 Engine Way", "city": "London",
                "state_code": "LN", "country_code": "GB", "zip": "E1 6AN",
                "email": "ada@example.com"
            },
            "items": [{ "variantId": 10, "quantity": 1 }]
        }))
        .send()
        .await
        .expect("orders call");
    assert_eq!(response.status(), 500);
    let body: Value = response.json().await.expect("error body");
    assert_eq!(body["error"], "fulfillment API key not configured");
}
