// 🌐 REST API (axum)
//
// Every route locks the shared Inventory for the duration of one request, so
// requests inside one process are serialized. Responses use the envelope
// {success, data, error}.

use crate::error::InventoryError;
use crate::inventory::{Inventory, InventorySummary};
use crate::ledger::{Expense, LedgerTotals, Sale};
use crate::lookup::{Lookup, Resolution};
use crate::product::{NewProduct, Product, ProductId};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post, put},
    Router,
};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, MutexGuard};
use tower_http::cors::CorsLayer;
use tracing::{error, warn};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub inventory: Arc<Mutex<Inventory>>,
}

impl AppState {
    pub fn new(inventory: Inventory) -> Self {
        Self {
            inventory: Arc::new(Mutex::new(inventory)),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, Inventory>, ApiError> {
        self.inventory.lock().map_err(|_| ApiError::LockPoisoned)
    }
}

/// API Response wrapper
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn fail(message: impl Into<String>, data: Option<T>) -> Self {
        Self {
            success: false,
            data,
            error: Some(message.into()),
        }
    }
}

// ============================================================================
// Errors
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Inventory(#[from] InventoryError),

    #[error("Inventory state is unavailable")]
    LockPoisoned,
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::Inventory(e) => match e {
                InventoryError::NotFound(_) | InventoryError::NameNotFound(_) => {
                    StatusCode::NOT_FOUND
                }
                InventoryError::DuplicateId(_) => StatusCode::CONFLICT,
                InventoryError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
                _ => StatusCode::UNPROCESSABLE_ENTITY,
            },
            ApiError::LockPoisoned => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(error = %self, "request failed");
        } else {
            warn!(error = %self, %status, "request rejected");
        }

        (status, Json(ApiResponse::<()>::fail(self.to_string(), None))).into_response()
    }
}

type ApiResult<T> = Result<Json<ApiResponse<T>>, ApiError>;

fn ok<T>(data: T) -> ApiResult<T> {
    Ok(Json(ApiResponse::ok(data)))
}

// ============================================================================
// Request bodies & query strings
// ============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusFilter {
    Active,
    Expired,
}

#[derive(Debug, Deserialize)]
pub struct ProductQuery {
    pub status: Option<StatusFilter>,
}

#[derive(Debug, Deserialize)]
pub struct NameQuery {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct LookupQuery {
    pub q: String,
}

#[derive(Debug, Deserialize)]
pub struct SellRequest {
    pub quantity: f64,
    #[serde(default)]
    pub bill_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct PurchaseRequest {
    pub quantity: f64,
    #[serde(default)]
    pub unit_cost: Option<f64>,
    #[serde(default)]
    pub supplier: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AdjustRequest {
    pub delta: f64,
}

#[derive(Debug, Deserialize)]
pub struct PriceRequest {
    pub price: f64,
}

#[derive(Debug, Serialize)]
pub struct ReportResponse {
    pub inventory: InventorySummary,
    pub ledger: LedgerTotals,
}

// ============================================================================
// API Handlers
// ============================================================================

/// GET /api/health - Health check
async fn health_check() -> impl IntoResponse {
    Json(ApiResponse::ok("OK"))
}

/// GET /api/products - All products, optionally ?status=active|expired
async fn list_products(
    State(state): State<AppState>,
    Query(query): Query<ProductQuery>,
) -> ApiResult<Vec<Product>> {
    let inventory = state.lock()?;
    let products = match query.status {
        None => inventory.products().cloned().collect(),
        Some(StatusFilter::Active) => inventory.active().into_iter().cloned().collect(),
        Some(StatusFilter::Expired) => inventory.expired().into_iter().cloned().collect(),
    };
    ok(products)
}

/// POST /api/products - Add a product
async fn create_product(
    State(state): State<AppState>,
    Json(new): Json<NewProduct>,
) -> Result<(StatusCode, Json<ApiResponse<Product>>), ApiError> {
    let mut inventory = state.lock()?;
    let product = inventory.add(new)?.clone();
    Ok((StatusCode::CREATED, Json(ApiResponse::ok(product))))
}

/// DELETE /api/products?name= - Delete every product with this name
async fn delete_by_name(
    State(state): State<AppState>,
    Query(query): Query<NameQuery>,
) -> ApiResult<Vec<Product>> {
    let mut inventory = state.lock()?;
    ok(inventory.delete_by_name(&query.name)?)
}

/// GET /api/products/:id
async fn get_product(
    State(state): State<AppState>,
    Path(id): Path<ProductId>,
) -> ApiResult<Product> {
    let inventory = state.lock()?;
    let product = inventory.get(id).cloned().ok_or(InventoryError::NotFound(id))?;
    ok(product)
}

/// DELETE /api/products/:id
async fn delete_product(
    State(state): State<AppState>,
    Path(id): Path<ProductId>,
) -> ApiResult<Product> {
    let mut inventory = state.lock()?;
    ok(inventory.delete(id)?)
}

/// POST /api/products/:id/sell
async fn sell_product(
    State(state): State<AppState>,
    Path(id): Path<ProductId>,
    Json(req): Json<SellRequest>,
) -> ApiResult<Sale> {
    let mut inventory = state.lock()?;
    ok(inventory.sell(id, req.quantity, req.bill_id)?)
}

/// POST /api/products/:id/purchase
async fn purchase_product(
    State(state): State<AppState>,
    Path(id): Path<ProductId>,
    Json(req): Json<PurchaseRequest>,
) -> ApiResult<Expense> {
    let mut inventory = state.lock()?;
    ok(inventory.purchase(id, req.quantity, req.unit_cost, req.supplier)?)
}

/// POST /api/products/:id/adjust - Stock correction, no ledger entry
async fn adjust_product(
    State(state): State<AppState>,
    Path(id): Path<ProductId>,
    Json(req): Json<AdjustRequest>,
) -> ApiResult<Product> {
    let mut inventory = state.lock()?;
    ok(inventory.adjust_quantity(id, req.delta)?.clone())
}

/// PUT /api/products/:id/price
async fn update_price(
    State(state): State<AppState>,
    Path(id): Path<ProductId>,
    Json(req): Json<PriceRequest>,
) -> ApiResult<Product> {
    let mut inventory = state.lock()?;
    ok(inventory.update_price(id, req.price)?.clone())
}

/// GET /api/lookup?q= - ID or name; 409 with candidates when a name is shared
async fn lookup(
    State(state): State<AppState>,
    Query(query): Query<LookupQuery>,
) -> Result<Response, ApiError> {
    let inventory = state.lock()?;

    let Some(parsed) = Lookup::parse(&query.q) else {
        let body = ApiResponse::<Vec<Product>>::fail("Query cannot be empty", None);
        return Ok((StatusCode::BAD_REQUEST, Json(body)).into_response());
    };

    let response = match inventory.resolve(&parsed) {
        Resolution::NotFound => {
            let body = ApiResponse::<Vec<Product>>::fail(format!("No product found for {}", parsed), None);
            (StatusCode::NOT_FOUND, Json(body)).into_response()
        }
        Resolution::Unique(id) => {
            let product: Vec<Product> = inventory.get(id).cloned().into_iter().collect();
            (StatusCode::OK, Json(ApiResponse::ok(product))).into_response()
        }
        Resolution::Ambiguous(ids) => {
            let candidates: Vec<Product> =
                ids.iter().filter_map(|id| inventory.get(*id).cloned()).collect();
            let body = ApiResponse::fail(
                format!("Multiple products found for {}; choose one by ID", parsed),
                Some(candidates),
            );
            (StatusCode::CONFLICT, Json(body)).into_response()
        }
    };
    Ok(response)
}

/// GET /api/sales
async fn list_sales(State(state): State<AppState>) -> ApiResult<Vec<Sale>> {
    let inventory = state.lock()?;
    ok(inventory.sales()?)
}

/// GET /api/expenses
async fn list_expenses(State(state): State<AppState>) -> ApiResult<Vec<Expense>> {
    let inventory = state.lock()?;
    ok(inventory.expenses()?)
}

/// GET /api/summary - Stock overview plus ledger totals
async fn summary(State(state): State<AppState>) -> ApiResult<ReportResponse> {
    let inventory = state.lock()?;
    ok(ReportResponse {
        inventory: inventory.summary()?,
        ledger: inventory.ledger_totals()?,
    })
}

// ============================================================================
// Router
// ============================================================================

pub fn router(state: AppState) -> Router {
    let api_routes = Router::new()
        .route("/health", get(health_check))
        .route(
            "/products",
            get(list_products).post(create_product).delete(delete_by_name),
        )
        .route("/products/:id", get(get_product).delete(delete_product))
        .route("/products/:id/sell", post(sell_product))
        .route("/products/:id/purchase", post(purchase_product))
        .route("/products/:id/adjust", post(adjust_product))
        .route("/products/:id/price", put(update_price))
        .route("/lookup", get(lookup))
        .route("/sales", get(list_sales))
        .route("/expenses", get(list_expenses))
        .route("/summary", get(summary))
        .with_state(state);

    Router::new()
        .nest("/api", api_routes)
        .layer(CorsLayer::permissive())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inventory::Clock;
    use crate::store::MemoryStore;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use chrono::NaiveDate;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    fn app() -> Router {
        let today = NaiveDate::from_ymd_opt(2026, 10, 16).unwrap();
        let clock: Clock = Box::new(move || today);
        let inventory = Inventory::open_with_clock(Box::new(MemoryStore::new()), clock).unwrap();
        router(AppState::new(inventory))
    }

    async fn call(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let request = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(json) => request
                .header("content-type", "application/json")
                .body(Body::from(json.to_string())),
            None => request.body(Body::empty()),
        }
        .unwrap();

        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    fn rice(id: u32) -> Value {
        json!({
            "id": id,
            "name": "rice",
            "price": 50.0,
            "quantity": 10.0,
            "measurement": "kg",
            "expiry": "01-01-2030"
        })
    }

    #[tokio::test]
    async fn test_health() {
        let app = app();
        let (status, body) = call(&app, "GET", "/api/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"], "OK");
    }

    #[tokio::test]
    async fn test_create_and_get() {
        let app = app();
        let (status, body) = call(&app, "POST", "/api/products", Some(rice(1))).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["data"]["Name"], "Rice");

        let (status, body) = call(&app, "POST", "/api/products", Some(rice(1))).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["success"], false);

        let (status, body) = call(&app, "GET", "/api/products/1", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["Measurement Category"], "Kilograms");

        let (status, _) = call(&app, "GET", "/api/products/2", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_sell_and_oversell() {
        let app = app();
        call(&app, "POST", "/api/products", Some(rice(1))).await;

        let (status, body) = call(
            &app,
            "POST",
            "/api/products/1/sell",
            Some(json!({"quantity": 12.0})),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert!(body["error"].as_str().unwrap().contains("only 10 in stock"));

        let (status, body) = call(
            &app,
            "POST",
            "/api/products/1/sell",
            Some(json!({"quantity": 4.0, "bill_id": "B-1"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["revenue"], 200.0);

        let (_, body) = call(&app, "GET", "/api/sales", None).await;
        assert_eq!(body["data"].as_array().unwrap().len(), 1);

        let (_, body) = call(&app, "GET", "/api/products/1", None).await;
        assert_eq!(body["data"]["Quantity"], 6.0);
    }

    #[tokio::test]
    async fn test_purchase_adjust_and_price() {
        let app = app();
        call(&app, "POST", "/api/products", Some(rice(1))).await;

        let (status, body) = call(
            &app,
            "POST",
            "/api/products/1/purchase",
            Some(json!({"quantity": 5.0, "unit_cost": 40.0, "supplier": "Mill"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["total_cost"], 200.0);

        let (_, body) = call(&app, "POST", "/api/products/1/adjust", Some(json!({"delta": -1.5}))).await;
        assert_eq!(body["data"]["Quantity"], 13.5);

        let (status, _) = call(&app, "PUT", "/api/products/1/price", Some(json!({"price": 0.0}))).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

        let (_, body) = call(&app, "PUT", "/api/products/1/price", Some(json!({"price": 55.0}))).await;
        assert_eq!(body["data"]["Price"], 55.0);

        let (_, body) = call(&app, "GET", "/api/summary", None).await;
        assert_eq!(body["data"]["inventory"]["active_products"], 1);
        assert_eq!(body["data"]["ledger"]["cost"], 200.0);
    }

    #[tokio::test]
    async fn test_oversized_values_are_rejected_and_server_keeps_serving() {
        let app = app();
        call(&app, "POST", "/api/products", Some(rice(1))).await;

        let (status, body) = call(
            &app,
            "POST",
            "/api/products/1/purchase",
            Some(json!({"quantity": 1e15, "unit_cost": 1e15})),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert!(body["error"].as_str().unwrap().contains("exceeds the maximum"));

        let (status, _) = call(&app, "PUT", "/api/products/1/price", Some(json!({"price": 1e20}))).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

        let (status, body) = call(&app, "GET", "/api/summary", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["inventory"]["active_stock_value"], 500.0);
        assert_eq!(body["data"]["ledger"]["expenses_count"], 0);
    }

    #[tokio::test]
    async fn test_lookup_and_bulk_delete() {
        let app = app();
        call(&app, "POST", "/api/products", Some(rice(1))).await;
        call(&app, "POST", "/api/products", Some(rice(2))).await;

        let (status, body) = call(&app, "GET", "/api/lookup?q=RICE", None).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["data"].as_array().unwrap().len(), 2);

        let (status, body) = call(&app, "GET", "/api/lookup?q=2", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"][0]["ID"], 2);

        let (status, _) = call(&app, "GET", "/api/lookup?q=sugar", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, body) = call(&app, "DELETE", "/api/products?name=rice", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"].as_array().unwrap().len(), 2);

        let (status, _) = call(&app, "DELETE", "/api/products?name=rice", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_status_filter() {
        let app = app();
        call(&app, "POST", "/api/products", Some(rice(1))).await;
        let mut old = rice(2);
        old["expiry"] = json!("01-01-2020");
        call(&app, "POST", "/api/products", Some(old)).await;

        let (_, body) = call(&app, "GET", "/api/products?status=expired", None).await;
        let expired = body["data"].as_array().unwrap();
        assert_eq!(expired.len(), 1);
        assert_eq!(expired[0]["Expiry Date"], "expired");

        let (_, body) = call(&app, "GET", "/api/products?status=active", None).await;
        assert_eq!(body["data"].as_array().unwrap().len(), 1);

        let (_, body) = call(&app, "GET", "/api/products", None).await;
        assert_eq!(body["data"].as_array().unwrap().len(), 2);

        let (status, _) = call(&app, "DELETE", "/api/products/2", None).await;
        assert_eq!(status, StatusCode::OK);
    }
}
