//! End-to-end tests through the axum router over the in-memory store.

use std::sync::Arc;

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use chrono::Duration;
use secrecy::SecretString;
use serde_json::{json, Value};
use tower::ServiceExt;

use opensase_catalog::auth::TokenVerifier;
use opensase_catalog::domain::value_objects::UserId;
use opensase_catalog::store::MemoryStore;
use opensase_catalog::{create_router, AppState};

const SECRET: &str = "k3J9x2Lq8Vw4Zr7Tn1Pm5Hs6Yd0Fb2Gc";

struct TestApp {
    router: Router,
    tokens: TokenVerifier,
}

impl TestApp {
    fn new() -> Self {
        let tokens = TokenVerifier::new(SecretString::from(SECRET.to_string()));
        let state = AppState::new(Arc::new(MemoryStore::new()), tokens.clone(), 100);
        Self { router: create_router(state), tokens }
    }

    fn token_for(&self, user: UserId) -> String { self.tokens.issue(user, Duration::hours(1)) }

    async fn send(&self, method: Method, uri: &str, token: Option<&str>, body: Option<Value>) -> (StatusCode, Value) {
        let mut request = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            request = request.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let body = match body {
            Some(json) => {
                request = request.header(header::CONTENT_TYPE, "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };

        let response = self.router.clone().oneshot(request.body(body).unwrap()).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json = if bytes.is_empty() { Value::Null } else { serde_json::from_slice(&bytes).unwrap() };
        (status, json)
    }

    async fn create_product(&self, body: Value) -> Value {
        let (status, product) = self.send(Method::POST, "/products", None, Some(body)).await;
        assert_eq!(status, StatusCode::CREATED, "{product}");
        product
    }
}

fn product(name: &str, price: f64) -> Value {
    json!({ "Product_Name": name, "Price": price, "Main_Image": format!("https://cdn.example.com/{name}.jpg") })
}

#[tokio::test]
async fn test_health() {
    let app = TestApp::new();
    let (status, body) = app.send(Method::GET, "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    let (status, _) = app.send(Method::GET, "/health/ready", None, None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_search_price_window_second_page() {
    let app = TestApp::new();
    app.create_product(product("cheap", 50.0)).await;
    for i in 0..12 {
        app.create_product(product(&format!("p{i}"), 100.0 + 36.0 * f64::from(i))).await;
    }
    app.create_product(product("pricey", 600.0)).await;

    let (status, body) =
        app.send(Method::GET, "/products?minPrice=100&maxPrice=500&page=2&limit=5", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["pagination"], json!({ "total": 12, "page": 2, "limit": 5, "totalPages": 3 }));

    // Newest first: ranks 6-10 of p11..p0
    let names: Vec<&str> = body["products"].as_array().unwrap().iter().map(|p| p["Product_Name"].as_str().unwrap()).collect();
    assert_eq!(names, ["p6", "p5", "p4", "p3", "p2"]);
}

#[tokio::test]
async fn test_search_single_bound_and_sort() {
    let app = TestApp::new();
    for price in [10.0, 200.0, 150.0, 99.99] {
        app.create_product(product(&format!("item-{price}"), price)).await;
    }

    let (_, body) = app.send(Method::GET, "/products?minPrice=100&sortBy=Price&sortOrder=asc", None, None).await;
    let prices: Vec<f64> = body["products"].as_array().unwrap().iter().map(|p| p["Price"].as_f64().unwrap()).collect();
    assert_eq!(prices, [150.0, 200.0]);

    let (_, body) = app.send(Method::GET, "/products?maxPrice=100", None, None).await;
    assert_eq!(body["pagination"]["total"], 2);
}

#[tokio::test]
async fn test_search_text_is_literal_and_case_insensitive() {
    let app = TestApp::new();
    app.create_product(product("Desk Lamp", 20.0)).await;
    app.create_product(product("lamp (50%)", 25.0)).await;
    app.create_product(product("Chair", 30.0)).await;

    let (_, body) = app.send(Method::GET, "/products?search=LAMP", None, None).await;
    assert_eq!(body["pagination"]["total"], 2);
    let (_, body) = app.send(Method::GET, "/products?search=50%25", None, None).await;
    assert_eq!(body["pagination"]["total"], 1);
}

#[tokio::test]
async fn test_invalid_search_params() {
    let app = TestApp::new();
    for uri in ["/products?page=0", "/products?limit=abc", "/products?sortBy=secret", "/products?categoryId=7", "/products?minPrice=low"] {
        let (status, body) = app.send(Method::GET, uri, None, None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{uri}");
        assert!(body["message"].is_string());
    }
}

#[tokio::test]
async fn test_plain_listing_without_params() {
    let app = TestApp::new();
    app.create_product(product("first", 1.0)).await;
    app.create_product(product("second", 2.0)).await;
    let (status, body) = app.send(Method::GET, "/products", None, None).await;
    assert_eq!(status, StatusCode::OK);
    let names: Vec<&str> = body.as_array().unwrap().iter().map(|p| p["Product_Name"].as_str().unwrap()).collect();
    assert_eq!(names, ["second", "first"]);
}

#[tokio::test]
async fn test_create_requires_main_image() {
    let app = TestApp::new();
    let (status, body) = app.send(Method::POST, "/products", None, Some(json!({ "Product_Name": "Lamp", "Price": 10 }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Main image URL is required");

    let (_, body) = app.send(Method::GET, "/products", None, None).await;
    assert_eq!(body, json!([]));
}

#[tokio::test]
async fn test_malformed_body_is_validation_error() {
    let app = TestApp::new();
    let (status, _) = app.send(Method::POST, "/products", None, Some(json!({ "Price": "ten" }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_category_population_and_filter() {
    let app = TestApp::new();
    let (status, category) = app.send(Method::POST, "/categories", None, Some(json!({ "Category_Name": "Lighting" }))).await;
    assert_eq!(status, StatusCode::CREATED);
    let category_id = category["_id"].as_str().unwrap();

    let mut lamp = product("lamp", 10.0);
    lamp["CategoryID"] = json!(category_id);
    let lamp = app.create_product(lamp).await;
    app.create_product(product("chair", 20.0)).await;
    assert_eq!(lamp["CategoryID"]["Category_Name"], "Lighting");

    let (status, body) = app.send(Method::GET, &format!("/products/category/{category_id}"), None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 1);
    assert_eq!(body[0]["_id"], lamp["_id"]);

    let (_, body) = app.send(Method::GET, &format!("/products?categoryId={category_id}"), None, None).await;
    assert_eq!(body["pagination"]["total"], 1);

    let (_, categories) = app.send(Method::GET, "/categories", None, None).await;
    assert_eq!(categories[0]["Category_Name"], "Lighting");
}

#[tokio::test]
async fn test_get_update_delete_product() {
    let app = TestApp::new();
    let mut body = product("lamp", 10.0);
    body["Stock"] = json!(4);
    let created = app.create_product(body).await;
    let uri = format!("/products/{}", created["_id"].as_str().unwrap());

    let (status, fetched) = app.send(Method::GET, &uri, None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched["Stock"], 4);

    // Full replacement clears omitted fields
    let (status, updated) = app.send(Method::PUT, &uri, None, Some(json!({ "Product_Name": "Desk lamp" }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["Product_Name"], "Desk lamp");
    assert!(updated["Stock"].is_null());
    assert!(updated["Main_Image"].is_null());

    let (status, _) = app.send(Method::DELETE, &uri, None, None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = app.send(Method::GET, &uri, None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = app.send(Method::DELETE, &uri, None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_update_missing_product_is_not_found() {
    let app = TestApp::new();
    let uri = format!("/products/{}", UserId::generate());
    let (status, _) = app.send(Method::PUT, &uri, None, Some(product("ghost", 1.0))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = app.send(Method::GET, "/products/not-an-id", None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_cart_requires_token() {
    let app = TestApp::new();
    let (status, body) = app.send(Method::GET, "/cart", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(body["message"].is_string());

    let (status, _) = app.send(Method::GET, "/cart", Some("forged.123.abcd"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let expired = app.tokens.issue(UserId::generate(), Duration::hours(-1));
    let (status, _) = app.send(Method::DELETE, "/cart", Some(&expired), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_add_same_product_twice_merges() {
    let app = TestApp::new();
    let product_id = app.create_product(product("lamp", 10.0)).await["_id"].clone();
    let token = app.token_for(UserId::generate());

    let (status, _) = app.send(Method::POST, "/cart/items", Some(&token), Some(json!({ "productId": product_id, "quantity": 2 }))).await;
    assert_eq!(status, StatusCode::CREATED);
    let (_, cart) = app.send(Method::POST, "/cart/items", Some(&token), Some(json!({ "productId": product_id, "quantity": 3 }))).await;

    let items = cart["items"].as_array().unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["quantity"], 5);
    assert_eq!(items[0]["product"]["Product_Name"], "lamp");
}

#[tokio::test]
async fn test_add_defaults_quantity_and_checks_stock() {
    let app = TestApp::new();
    let mut body = product("lamp", 10.0);
    body["Stock"] = json!(1);
    let product_id = app.create_product(body).await["_id"].clone();
    let token = app.token_for(UserId::generate());

    let (status, cart) = app.send(Method::POST, "/cart/items", Some(&token), Some(json!({ "productId": product_id }))).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(cart["items"][0]["quantity"], 1);

    let (status, _) = app.send(Method::POST, "/cart/items", Some(&token), Some(json!({ "productId": product_id }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app.send(Method::POST, "/cart/items", Some(&token), Some(json!({ "productId": UserId::generate() }))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_oversized_quantities_rejected() {
    let app = TestApp::new();
    let product_id = app.create_product(product("lamp", 10.0)).await["_id"].clone();
    let token = app.token_for(UserId::generate());

    let body = json!({ "productId": product_id, "quantity": 3_000_000_000u64 });
    let (status, _) = app.send(Method::POST, "/cart/items", Some(&token), Some(body)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let body = json!({ "productId": product_id, "quantity": 2_000_000_000 });
    let (status, cart) = app.send(Method::POST, "/cart/items", Some(&token), Some(body.clone())).await;
    assert_eq!(status, StatusCode::CREATED);
    let item_uri = format!("/cart/items/{}", cart["items"][0]["_id"].as_str().unwrap());

    let (status, error) = app.send(Method::POST, "/cart/items", Some(&token), Some(body)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(!error["message"].as_str().unwrap().contains("available"));

    let (status, _) = app.send(Method::PUT, &item_uri, Some(&token), Some(json!({ "quantity": 3_000_000_000u64 }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, cart) = app.send(Method::GET, "/cart", Some(&token), None).await;
    assert_eq!(cart["items"][0]["quantity"], 2_000_000_000);
}

#[tokio::test]
async fn test_rejected_add_keeps_existing_empty_cart() {
    let app = TestApp::new();
    let lamp = app.create_product(product("lamp", 10.0)).await["_id"].clone();
    let mut body = product("desk", 90.0);
    body["Stock"] = json!(1);
    let desk = app.create_product(body).await["_id"].clone();
    let token = app.token_for(UserId::generate());

    let (_, cart) = app.send(Method::POST, "/cart/items", Some(&token), Some(json!({ "productId": lamp }))).await;
    let item_uri = format!("/cart/items/{}", cart["items"][0]["_id"].as_str().unwrap());
    let (status, _) = app.send(Method::DELETE, &item_uri, Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) =
        app.send(Method::POST, "/cart/items", Some(&token), Some(json!({ "productId": desk, "quantity": 2 }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, cart) = app.send(Method::GET, "/cart", Some(&token), None).await;
    assert_eq!(cart["items"], json!([]));
    assert!(!cart["updatedAt"].is_null());
}

#[tokio::test]
async fn test_update_and_remove_items() {
    let app = TestApp::new();
    let product_id = app.create_product(product("lamp", 10.0)).await["_id"].clone();
    let token = app.token_for(UserId::generate());
    let (_, cart) = app.send(Method::POST, "/cart/items", Some(&token), Some(json!({ "productId": product_id }))).await;
    let item_uri = format!("/cart/items/{}", cart["items"][0]["_id"].as_str().unwrap());

    let (status, cart) = app.send(Method::PUT, &item_uri, Some(&token), Some(json!({ "quantity": 7 }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(cart["items"][0]["quantity"], 7);

    let (status, _) = app.send(Method::PUT, &item_uri, Some(&token), Some(json!({ "quantity": 0 }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, cart) = app.send(Method::DELETE, &item_uri, Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(cart["items"], json!([]));

    let (status, _) = app.send(Method::DELETE, &item_uri, Some(&token), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_clear_empty_cart_succeeds() {
    let app = TestApp::new();
    let token = app.token_for(UserId::generate());
    let (status, _) = app.send(Method::DELETE, "/cart", Some(&token), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, cart) = app.send(Method::GET, "/cart", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(cart["items"], json!([]));
}

#[tokio::test]
async fn test_carts_are_isolated_per_user() {
    let app = TestApp::new();
    let product_id = app.create_product(product("lamp", 10.0)).await["_id"].clone();
    let alice = app.token_for(UserId::generate());
    let bob = app.token_for(UserId::generate());

    let (_, cart) = app.send(Method::POST, "/cart/items", Some(&alice), Some(json!({ "productId": product_id }))).await;
    let item_uri = format!("/cart/items/{}", cart["items"][0]["_id"].as_str().unwrap());

    let (_, bobs_cart) = app.send(Method::GET, "/cart", Some(&bob), None).await;
    assert_eq!(bobs_cart["items"], json!([]));
    let (status, _) = app.send(Method::DELETE, &item_uri, Some(&bob), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = app.send(Method::PUT, &item_uri, Some(&bob), Some(json!({ "quantity": 2 }))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, alices_cart) = app.send(Method::GET, "/cart", Some(&alice), None).await;
    assert_eq!(alices_cart["items"][0]["quantity"], 1);
}
