//! Cart handlers. Every route runs behind [`require_auth`]; the cart owner is
//! always the authenticated caller.

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    middleware,
    routing::{get, post, put},
    Json, Router,
};

use crate::auth::{require_auth, AuthUser};
use crate::domain::aggregates::{AddItemRequest, Cart, UpdateItemRequest};
use crate::error::Result;
use crate::state::AppState;

pub fn routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/cart", get(get_cart).delete(clear_cart))
        .route("/cart/items", post(add_item))
        .route("/cart/items/:item_id", put(update_item).delete(remove_item))
        .route_layer(middleware::from_fn_with_state(state, require_auth))
}

async fn get_cart(State(state): State<AppState>, AuthUser(user): AuthUser) -> Result<Json<Cart>> {
    Ok(Json(state.carts().get(user).await?))
}

async fn add_item(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    payload: std::result::Result<Json<AddItemRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Cart>)> {
    let Json(request) = payload?;
    let cart = state.carts().add(user, request).await?;
    Ok((StatusCode::CREATED, Json(cart)))
}

async fn update_item(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(item_id): Path<String>,
    payload: std::result::Result<Json<UpdateItemRequest>, JsonRejection>,
) -> Result<Json<Cart>> {
    let Json(request) = payload?;
    Ok(Json(state.carts().update_item(user, &item_id, request).await?))
}

async fn remove_item(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(item_id): Path<String>,
) -> Result<Json<Cart>> {
    Ok(Json(state.carts().remove_item(user, &item_id).await?))
}

async fn clear_cart(State(state): State<AppState>, AuthUser(user): AuthUser) -> Result<StatusCode> {
    state.carts().clear(user).await?;
    Ok(StatusCode::NO_CONTENT)
}
