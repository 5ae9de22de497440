//! HTTP surface of the storefront.
//!
//! Routes mirror the storefront's browser-facing API: catalog reads, the
//! three submission paths, and a session-keyed cart with a checkout
//! endpoint that drives the orchestrator. Public request/response JSON is
//! camelCase; provider wire shapes stay inside the provider clients.

use std::collections::HashMap;
use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::sync::{Mutex, RwLock};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::catalog::{CatalogAggregator, FetchError};
use crate::checkout::{
    CheckoutForm, CheckoutOrchestrator, CheckoutState, PaymentProvider, RedirectSubmission,
    TokenSubmission,
};
use crate::config::StoreConfig;
use crate::domain::aggregates::{Cart, CartLine, PriceRange, Product, Variant};
use crate::domain::selection::{select_variant, FacetChoice, FacetIndex};
use crate::domain::value_objects::Money;
use crate::providers::fulfillment::{FulfillmentClient, OrderConfirmation, OrderRequest};
use crate::providers::redirect::RedirectCheckoutClient;
use crate::providers::token::TokenPaymentClient;
use crate::providers::{PaymentLineItem, ProviderError};

#[derive(Clone)]
pub struct AppState {
    config: Arc<StoreConfig>,
    http: reqwest::Client,
    sessions: Arc<RwLock<HashMap<String, Arc<Mutex<Session>>>>>,
}

/// Everything the service holds for one browser session: the cart plus the
/// checkout attempt state. Guarded by one mutex so each request is a
/// single atomic step over the pair.
#[derive(Default)]
struct Session {
    cart: Cart,
    checkout: CheckoutOrchestrator,
}

impl AppState {
    pub fn new(config: StoreConfig) -> Self {
        Self {
            config: Arc::new(config),
            http: reqwest::Client::new(),
            sessions: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    fn fulfillment_client(&self) -> Result<FulfillmentClient, ProviderError> {
        let cfg = self.config.fulfillment()?;
        Ok(FulfillmentClient::new(
            self.http.clone(),
            &cfg.api_url,
            &cfg.api_key,
        ))
    }

    fn redirect_client(&self) -> Result<RedirectCheckoutClient, ProviderError> {
        let cfg = self.config.redirect()?;
        Ok(RedirectCheckoutClient::new(
            self.http.clone(),
            &cfg.api_url,
            &cfg.secret_key,
        ))
    }

    fn token_client(&self) -> Result<TokenPaymentClient, ProviderError> {
        let cfg = self.config.token()?;
        Ok(TokenPaymentClient::new(
            self.http.clone(),
            &cfg.api_url,
            &cfg.client_id,
            &cfg.client_secret,
        ))
    }

    async fn session(&self, key: &str) -> Arc<Mutex<Session>> {
        let mut sessions = self.sessions.write().await;
        sessions
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(Session::default())))
            .clone()
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/products", get(list_products))
        .route("/api/products/:id/options", get(product_options))
        .route("/api/orders", post(create_order))
        .route("/api/checkout/session", post(create_checkout_session))
        .route("/api/payments/order", post(create_payment_order))
        .route("/api/payments/capture", post(capture_payment))
        .route("/api/cart/:session", get(get_cart).delete(clear_cart))
        .route("/api/cart/:session/items", post(add_cart_item))
        .route(
            "/api/cart/:session/items/:line_id",
            axum::routing::patch(change_cart_quantity).delete(remove_cart_item),
        )
        .route("/api/cart/:session/checkout", post(checkout_cart))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// API failures render as `{"error": message}` with a non-2xx status.
struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn not_found(message: &str) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            message: message.to_string(),
        }
    }

    fn bad_request(message: String) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message,
        }
    }
}

impl From<ProviderError> for ApiError {
    fn from(err: ProviderError) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: err.to_string(),
        }
    }
}

impl From<FetchError> for ApiError {
    fn from(err: FetchError) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: err.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "healthy", "service": "driftwear-storefront" }))
}

#[derive(Serialize)]
struct ProductsResponse {
    products: Vec<Product>,
}

async fn list_products(State(s): State<AppState>) -> Result<Json<ProductsResponse>, ApiError> {
    let aggregator = CatalogAggregator::new(s.fulfillment_client()?);
    let products = aggregator.fetch_catalog().await?;
    Ok(Json(ProductsResponse { products }))
}

#[derive(Deserialize)]
struct OptionsQuery {
    size: Option<String>,
    color: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct OptionsResponse {
    product_id: i64,
    price_range: Option<PriceRange>,
    sizes: Vec<FacetChoice>,
    colors: Vec<FacetChoice>,
    variant: Option<Variant>,
}

/// Facet choices for one product, with the variant the chosen facets
/// resolve to. The catalog is re-fetched per call; there is no cache.
async fn product_options(
    State(s): State<AppState>,
    Path(id): Path<i64>,
    Query(query): Query<OptionsQuery>,
) -> Result<Json<OptionsResponse>, ApiError> {
    let aggregator = CatalogAggregator::new(s.fulfillment_client()?);
    let catalog = aggregator.fetch_catalog().await?;
    let product = catalog
        .into_iter()
        .find(|p| p.id == id)
        .ok_or_else(|| ApiError::not_found("product not found"))?;

    let index = FacetIndex::build(&product.variants);
    let variant =
        select_variant(&product, query.size.as_deref(), query.color.as_deref()).cloned();
    Ok(Json(OptionsResponse {
        product_id: product.id,
        price_range: product.price_range(),
        sizes: index.sizes().to_vec(),
        colors: index.colors().to_vec(),
        variant,
    }))
}

#[derive(Serialize)]
struct OrderCreatedResponse {
    order: OrderConfirmation,
}

async fn create_order(
    State(s): State<AppState>,
    Json(order): Json<OrderRequest>,
) -> Result<Json<OrderCreatedResponse>, ApiError> {
    let client = s.fulfillment_client()?;
    let confirmation = client.create_order(&order).await?;
    tracing::info!(order_id = confirmation.id, "fulfillment order created");
    Ok(Json(OrderCreatedResponse {
        order: confirmation,
    }))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CheckoutSessionRequest {
    items: Vec<CartLine>,
    customer_email: String,
    /// Captured again on the hosted page; accepted here for parity with
    /// the browser payload.
    #[serde(default)]
    #[allow(dead_code)]
    shipping_address: Option<serde_json::Value>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SessionResponse {
    session_id: String,
    url: String,
}

async fn create_checkout_session(
    State(s): State<AppState>,
    Json(req): Json<CheckoutSessionRequest>,
) -> Result<Json<SessionResponse>, ApiError> {
    let client = s.redirect_client()?;
    let items =
        PaymentLineItem::from_lines(&req.items).map_err(|e| ApiError::bad_request(e.to_string()))?;
    let session = client
        .create_session(
            &items,
            &req.customer_email,
            &s.config.success_url(),
            &s.config.cancel_url(),
        )
        .await?;
    Ok(Json(SessionResponse {
        session_id: session.id,
        url: session.url,
    }))
}

#[derive(Deserialize)]
struct PaymentOrderRequest {
    items: Vec<CartLine>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PaymentOrderResponse {
    order_id: String,
}

async fn create_payment_order(
    State(s): State<AppState>,
    Json(req): Json<PaymentOrderRequest>,
) -> Result<Json<PaymentOrderResponse>, ApiError> {
    let client = s.token_client()?;
    let items =
        PaymentLineItem::from_lines(&req.items).map_err(|e| ApiError::bad_request(e.to_string()))?;
    let order_id = client
        .create_order(&items, &s.config.return_url(), &s.config.cancel_url())
        .await?;
    Ok(Json(PaymentOrderResponse { order_id }))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CaptureRequest {
    order_id: String,
}

async fn capture_payment(
    State(s): State<AppState>,
    Json(req): Json<CaptureRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let client = s.token_client()?;
    let capture = client.capture_order(&req.order_id).await?;
    Ok(Json(capture))
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CartView {
    lines: Vec<CartLine>,
    total: Money,
    item_count: u32,
}

impl From<&Cart> for CartView {
    fn from(cart: &Cart) -> Self {
        Self {
            lines: cart.lines().to_vec(),
            total: cart.total(),
            item_count: cart.item_count(),
        }
    }
}

async fn get_cart(State(s): State<AppState>, Path(session): Path<String>) -> Json<CartView> {
    let session = s.session(&session).await;
    let guard = session.lock().await;
    Json(CartView::from(&guard.cart))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AddItemRequest {
    product: Product,
    variant: Variant,
    #[serde(default = "default_quantity")]
    quantity: u32,
}

fn default_quantity() -> u32 {
    1
}

async fn add_cart_item(
    State(s): State<AppState>,
    Path(session): Path<String>,
    Json(req): Json<AddItemRequest>,
) -> (StatusCode, Json<CartView>) {
    let session = s.session(&session).await;
    let mut guard = session.lock().await;
    guard
        .cart
        .add_item_with_quantity(&req.product, &req.variant, req.quantity);
    (StatusCode::CREATED, Json(CartView::from(&guard.cart)))
}

#[derive(Deserialize)]
struct QuantityDelta {
    delta: i64,
}

async fn change_cart_quantity(
    State(s): State<AppState>,
    Path((session, line_id)): Path<(String, String)>,
    Json(req): Json<QuantityDelta>,
) -> Json<CartView> {
    let session = s.session(&session).await;
    let mut guard = session.lock().await;
    guard.cart.change_quantity(&line_id, req.delta);
    Json(CartView::from(&guard.cart))
}

async fn remove_cart_item(
    State(s): State<AppState>,
    Path((session, line_id)): Path<(String, String)>,
) -> Json<CartView> {
    let session = s.session(&session).await;
    let mut guard = session.lock().await;
    guard.cart.remove_item(&line_id);
    Json(CartView::from(&guard.cart))
}

async fn clear_cart(State(s): State<AppState>, Path(session): Path<String>) -> StatusCode {
    let session = s.session(&session).await;
    let mut guard = session.lock().await;
    guard.cart.clear();
    StatusCode::NO_CONTENT
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CheckoutRequest {
    form: CheckoutForm,
    method: PaymentMethod,
}

#[derive(Clone, Copy, Debug, Deserialize)]
#[serde(rename_all = "lowercase")]
enum PaymentMethod {
    Fulfillment,
    Redirect,
    Token,
}

/// Run one checkout attempt for the session cart. The session lock is held
/// for the whole attempt, so the in-flight guard is structural: a second
/// submit waits and then sees the terminal state of the first.
async fn checkout_cart(
    State(s): State<AppState>,
    Path(session): Path<String>,
    Json(req): Json<CheckoutRequest>,
) -> Result<Json<CheckoutState>, ApiError> {
    let provider: Box<dyn PaymentProvider> = match req.method {
        PaymentMethod::Fulfillment => Box::new(s.fulfillment_client()?),
        PaymentMethod::Redirect => Box::new(RedirectSubmission {
            client: s.redirect_client()?,
            success_url: s.config.success_url(),
            cancel_url: s.config.cancel_url(),
        }),
        PaymentMethod::Token => Box::new(TokenSubmission {
            client: s.token_client()?,
            return_url: s.config.return_url(),
            cancel_url: s.config.cancel_url(),
        }),
    };

    let session = s.session(&session).await;
    let mut guard = session.lock().await;
    let Session { cart, checkout } = &mut *guard;
    let state = checkout.submit(cart, &req.form, provider.as_ref()).await.clone();
    if matches!(state, CheckoutState::Success { .. }) {
        // Terminal success is acknowledged immediately on this surface.
        checkout.finish();
    }
    Ok(Json(state))
}
