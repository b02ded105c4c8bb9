//! HTTP route handlers.
//!
//! # Route Structure
//!
//! ```text
//! GET    /health                   - Liveness
//! GET    /health/ready             - Store reachability
//!
//! # Products
//! GET    /products                 - All products, or a search page when query parameters are given
//! POST   /products                 - Create
//! GET    /products/:id             - Product detail
//! PUT    /products/:id             - Full replacement
//! DELETE /products/:id             - Delete
//! GET    /products/category/:id    - Products of one category
//!
//! # Categories
//! GET    /categories               - Category listing
//! POST   /categories               - Create
//!
//! # Cart (requires bearer token)
//! GET    /cart                     - Current cart
//! DELETE /cart                     - Clear
//! POST   /cart/items               - Add item
//! PUT    /cart/items/:itemId       - Set quantity
//! DELETE /cart/items/:itemId       - Remove item
//! ```

pub mod cart;
pub mod categories;
pub mod products;

use axum::{extract::State, http::StatusCode, response::IntoResponse, routing::get, Json, Router};
use serde_json::json;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::state::AppState;

/// Builds the full application router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/health/ready", get(ready))
        .merge(products::routes())
        .merge(categories::routes())
        .merge(cart::routes(state.clone()))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn health() -> impl IntoResponse {
    Json(json!({ "status": "healthy", "service": "opensase-catalog" }))
}

async fn ready(State(state): State<AppState>) -> impl IntoResponse {
    match state.catalog().ping().await {
        Ok(()) => (StatusCode::OK, Json(json!({ "status": "ready" }))),
        Err(err) => {
            tracing::warn!(error = %err, "Readiness check failed");
            (StatusCode::SERVICE_UNAVAILABLE, Json(json!({ "status": "unavailable" })))
        }
    }
}
