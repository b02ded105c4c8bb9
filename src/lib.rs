//! OpenSASE Catalog
//!
//! Product catalog and shopping cart service for the OpenSASE e-commerce
//! platform.
//!
//! ## Features
//! - Product catalog with search, price filters, sorting and pagination
//! - Categories populated into product reads
//! - Per-user carts with quantity merge and stock checks
//! - `PostgreSQL` or in-memory storage

pub mod auth;
pub mod config;
pub mod domain;
pub mod error;
pub mod routes;
pub mod services;
pub mod state;
pub mod store;

pub use config::CatalogConfig;
pub use error::{AppError, Result};
pub use routes::create_router;
pub use state::AppState;
