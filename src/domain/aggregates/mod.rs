//! Aggregates module
pub mod cart;
pub mod category;
pub mod product;

pub use cart::{AddItemRequest, Cart, CartError, CartLine, ProductSummary, UpdateItemRequest};
pub use category::{Category, CategoryInput};
pub use product::{CategoryRef, Product, ProductError, ProductInput, ProductStatus};
