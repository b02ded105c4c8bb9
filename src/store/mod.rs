//! Document store abstraction.
//!
//! The catalog and cart services only talk to these traits. Two backends
//! implement them:
//!
//! - [`postgres::PgStore`] keeps products, categories and carts in `PostgreSQL`
//!   (JSONB and array columns for the document-shaped fields).
//! - [`memory::MemoryStore`] keeps everything in concurrent maps, for local
//!   development and tests.
//!
//! Category population is a join the store performs at read time; cart
//! increments are atomic in both backends.

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::aggregates::{Cart, CartError, Category, CategoryInput, Product, ProductInput};
use crate::domain::query::{ProductFilter, ProductQuery};
use crate::domain::value_objects::{LineItemId, ProductId, Quantity, UserId};

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

/// Failures of the underlying store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Schema migration failed.
    #[error("migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// Stored data does not fit the domain model.
    #[error("data corruption: {0}")]
    DataCorruption(String),
}

/// Outcomes of a cart mutation other than success.
#[derive(Debug, Error)]
pub enum CartStoreError {
    #[error("product not found")]
    ProductNotFound,

    #[error("cart item not found")]
    ItemNotFound,

    #[error("only {available} in stock")]
    InsufficientStock { available: u32 },

    #[error("cart quantity exceeds {}", Quantity::MAX)]
    QuantityTooLarge,

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl From<CartError> for CartStoreError {
    fn from(err: CartError) -> Self {
        match err {
            CartError::ItemNotFound => Self::ItemNotFound,
            CartError::InsufficientStock { available } => Self::InsufficientStock { available },
            CartError::QuantityTooLarge => Self::QuantityTooLarge,
        }
    }
}

#[async_trait]
pub trait CatalogStore: Send + Sync {
    /// Filtered, sorted and optionally paginated products with categories populated.
    async fn find_products(&self, query: &ProductQuery) -> Result<Vec<Product>, StoreError>;

    async fn count_products(&self, filter: &ProductFilter) -> Result<u64, StoreError>;

    async fn get_product(&self, id: ProductId) -> Result<Option<Product>, StoreError>;

    async fn insert_product(&self, input: ProductInput) -> Result<Product, StoreError>;

    /// Full replacement. `None` when no product has this id.
    async fn replace_product(&self, id: ProductId, input: ProductInput) -> Result<Option<Product>, StoreError>;

    /// Returns false when no product has this id.
    async fn delete_product(&self, id: ProductId) -> Result<bool, StoreError>;

    async fn list_categories(&self) -> Result<Vec<Category>, StoreError>;

    async fn insert_category(&self, input: CategoryInput) -> Result<Category, StoreError>;

    /// Cheap round-trip used by the readiness probe.
    async fn ping(&self) -> Result<(), StoreError>;
}

#[async_trait]
pub trait CartStore: Send + Sync {
    /// `None` when the user has no cart.
    async fn get_cart(&self, user: UserId) -> Result<Option<Cart>, StoreError>;

    /// Atomically adds `quantity` of a product, creating the cart and line as
    /// needed and enforcing the product's stock.
    async fn add_item(&self, user: UserId, product_id: ProductId, quantity: Quantity) -> Result<Cart, CartStoreError>;

    async fn set_item_quantity(&self, user: UserId, item_id: LineItemId, quantity: Quantity) -> Result<Cart, CartStoreError>;

    async fn remove_item(&self, user: UserId, item_id: LineItemId) -> Result<Cart, CartStoreError>;

    /// Deletes the cart. Succeeds when there is none.
    async fn clear_cart(&self, user: UserId) -> Result<(), StoreError>;
}
