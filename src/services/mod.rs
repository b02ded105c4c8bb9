//! Business logic services.
//!
//! - `catalog` - Product listing, search, create/replace/delete and categories
//! - `cart` - Per-user cart mutations with merge and stock checks
//!
//! Services hold a store handle and return [`AppError`](crate::error::AppError)
//! so handlers stay thin.

pub mod cart;
pub mod catalog;

pub use cart::CartService;
pub use catalog::CatalogService;
