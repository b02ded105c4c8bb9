use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};

use crate::domain::aggregates::{Category, CategoryInput};
use crate::error::Result;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new().route("/categories", get(list_categories).post(create_category))
}

async fn list_categories(State(state): State<AppState>) -> Result<Json<Vec<Category>>> {
    Ok(Json(state.catalog().list_categories().await?))
}

async fn create_category(
    State(state): State<AppState>,
    payload: std::result::Result<Json<CategoryInput>, JsonRejection>,
) -> Result<(StatusCode, Json<Category>)> {
    let Json(input) = payload?;
    let category = state.catalog().create_category(input).await?;
    Ok((StatusCode::CREATED, Json(category)))
}
