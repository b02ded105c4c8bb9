//! Cart Aggregate
//!
//! One cart per user. Lines are kept in insertion order and a product appears
//! on at most one line.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use validator::Validate;
use crate::domain::value_objects::{LineItemId, ProductId, Quantity, UserId};

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Cart {
    user: UserId,
    items: Vec<CartLine>,
    updated_at: Option<DateTime<Utc>>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLine {
    #[serde(rename = "_id")]
    pub id: LineItemId,
    pub product_id: ProductId,
    pub quantity: Quantity,
    /// Populated at read time; `None` once the product has been deleted.
    pub product: Option<ProductSummary>,
}

/// Product fields shown next to a cart line.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ProductSummary {
    #[serde(rename = "_id")]
    pub id: ProductId,
    #[serde(rename = "Product_Name")]
    pub name: Option<String>,
    #[serde(rename = "Price")]
    pub price: Option<Decimal>,
    #[serde(rename = "Main_Image")]
    pub main_image: Option<String>,
}

fn default_quantity() -> u32 {
    1
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct AddItemRequest {
    pub product_id: ProductId,
    #[serde(default = "default_quantity")]
    #[validate(range(min = 1, max = 2147483647, message = "Quantity must be between 1 and 2147483647"))]
    pub quantity: u32,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct UpdateItemRequest {
    #[validate(range(min = 1, max = 2147483647, message = "Quantity must be between 1 and 2147483647"))]
    pub quantity: u32,
}

impl Cart {
    /// The state of a user that has no cart document.
    pub fn empty(user: UserId) -> Self { Self { user, items: vec![], updated_at: None } }

    pub fn from_parts(user: UserId, items: Vec<CartLine>, updated_at: DateTime<Utc>) -> Self {
        Self { user, items, updated_at: Some(updated_at) }
    }

    pub fn user(&self) -> UserId { self.user }
    pub fn items(&self) -> &[CartLine] { &self.items }
    pub fn items_mut(&mut self) -> &mut [CartLine] { &mut self.items }
    pub fn is_empty(&self) -> bool { self.items.is_empty() }
    pub fn line_for(&self, product_id: ProductId) -> Option<&CartLine> { self.items.iter().find(|i| i.product_id == product_id) }

    /// Merges `quantity` of a product into the cart. An existing line is
    /// incremented, otherwise a line is appended. `stock` of `None` means the
    /// product is not stock-limited.
    pub fn add_item(&mut self, product_id: ProductId, quantity: Quantity, stock: Option<u32>) -> Result<&CartLine, CartError> {
        let position = match self.items.iter().position(|i| i.product_id == product_id) {
            Some(position) => {
                let line = &mut self.items[position];
                let merged = line.quantity.checked_add(quantity).ok_or(CartError::QuantityTooLarge)?;
                check_stock(merged, stock)?;
                line.quantity = merged;
                position
            }
            None => {
                check_stock(quantity, stock)?;
                self.items.push(CartLine { id: LineItemId::generate(), product_id, quantity, product: None });
                self.items.len() - 1
            }
        };
        self.touch();
        Ok(&self.items[position])
    }

    /// Overwrites the quantity of one line.
    pub fn update_quantity(&mut self, item_id: LineItemId, quantity: Quantity, stock: Option<u32>) -> Result<&CartLine, CartError> {
        let position = self.items.iter().position(|i| i.id == item_id).ok_or(CartError::ItemNotFound)?;
        check_stock(quantity, stock)?;
        self.items[position].quantity = quantity;
        self.touch();
        Ok(&self.items[position])
    }

    pub fn remove_item(&mut self, item_id: LineItemId) -> Result<(), CartError> {
        let before = self.items.len();
        self.items.retain(|i| i.id != item_id);
        if self.items.len() == before { return Err(CartError::ItemNotFound); }
        self.touch();
        Ok(())
    }

    pub fn product_of(&self, item_id: LineItemId) -> Option<ProductId> {
        self.items.iter().find(|i| i.id == item_id).map(|i| i.product_id)
    }

    fn touch(&mut self) { self.updated_at = Some(Utc::now()); }
}

fn check_stock(quantity: Quantity, stock: Option<u32>) -> Result<(), CartError> {
    match stock {
        Some(available) if quantity.value() > available => Err(CartError::InsufficientStock { available }),
        _ => Ok(()),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)] pub enum CartError { ItemNotFound, InsufficientStock { available: u32 }, QuantityTooLarge }
impl std::error::Error for CartError {}
impl std::fmt::Display for CartError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ItemNotFound => write!(f, "Cart item not found"),
            Self::InsufficientStock { available } => write!(f, "Only {available} in stock"),
            Self::QuantityTooLarge => write!(f, "Cart quantity must not exceed {}", Quantity::MAX),
        }
    }
}
