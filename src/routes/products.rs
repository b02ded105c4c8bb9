//! Product catalog handlers.

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};

use crate::domain::aggregates::{Product, ProductInput};
use crate::domain::query::SearchParams;
use crate::error::Result;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/products", get(list_products).post(create_product))
        .route("/products/:id", get(get_product).put(update_product).delete(delete_product))
        .route("/products/category/:category_id", get(list_by_category))
}

/// GET /products
///
/// Without query parameters this is the plain newest-first listing; any
/// parameter switches to the paginated search response.
async fn list_products(
    State(state): State<AppState>,
    params: std::result::Result<Query<SearchParams>, QueryRejection>,
) -> Result<Response> {
    let Query(params) = params?;
    if params.is_empty() {
        return Ok(Json(state.catalog().list_all().await?).into_response());
    }
    Ok(Json(state.catalog().search(params).await?).into_response())
}

async fn get_product(State(state): State<AppState>, Path(id): Path<String>) -> Result<Json<Product>> {
    Ok(Json(state.catalog().get(&id).await?))
}

async fn list_by_category(State(state): State<AppState>, Path(category_id): Path<String>) -> Result<Json<Vec<Product>>> {
    Ok(Json(state.catalog().list_by_category(&category_id).await?))
}

async fn create_product(
    State(state): State<AppState>,
    payload: std::result::Result<Json<ProductInput>, JsonRejection>,
) -> Result<(StatusCode, Json<Product>)> {
    let Json(input) = payload?;
    let product = state.catalog().create(input).await?;
    Ok((StatusCode::CREATED, Json(product)))
}

async fn update_product(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: std::result::Result<Json<ProductInput>, JsonRejection>,
) -> Result<Json<Product>> {
    let Json(input) = payload?;
    Ok(Json(state.catalog().update(&id, input).await?))
}

async fn delete_product(State(state): State<AppState>, Path(id): Path<String>) -> Result<StatusCode> {
    state.catalog().delete(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}
