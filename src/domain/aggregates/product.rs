//! Product Aggregate
//!
//! Field names on the wire follow the catalog's document layout
//! (`Product_Name`, `Main_Image`, ...), so existing clients keep working.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use validator::{Validate, ValidationError, ValidationErrors};
use crate::domain::value_objects::{CategoryId, ProductId};

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Product {
    #[serde(rename = "_id")]
    pub id: ProductId,
    #[serde(rename = "Product_Name")]
    pub name: Option<String>,
    /// Populated category reference; `None` when unset or the category no longer exists.
    #[serde(rename = "CategoryID")]
    pub category: Option<CategoryRef>,
    #[serde(rename = "Description")]
    pub description: Option<String>,
    #[serde(rename = "Price")]
    pub price: Option<Decimal>,
    #[serde(rename = "Specifications")]
    pub specifications: Option<Value>,
    #[serde(rename = "Stock")]
    pub stock: Option<u32>,
    #[serde(rename = "Main_Image")]
    pub main_image: Option<String>,
    #[serde(rename = "List_Image")]
    pub list_image: Option<Vec<String>>,
    #[serde(rename = "Status")]
    pub status: Option<ProductStatus>,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
    #[serde(rename = "updatedAt")]
    pub updated_at: DateTime<Utc>,
}

/// Category projection embedded in listed products.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct CategoryRef {
    #[serde(rename = "_id")]
    pub id: CategoryId,
    #[serde(rename = "Category_Name")]
    pub name: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProductStatus { Active, Inactive }

impl ProductStatus {
    pub fn as_str(&self) -> &'static str {
        match self { Self::Active => "active", Self::Inactive => "inactive" }
    }
    pub fn parse(value: &str) -> Option<Self> {
        match value { "active" => Some(Self::Active), "inactive" => Some(Self::Inactive), _ => None }
    }
}

/// Request body for both create and full-replacement update.
///
/// Every field is optional on the wire. On update an omitted field overwrites
/// the stored value with null.
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Validate)]
pub struct ProductInput {
    #[serde(rename = "Product_Name")]
    pub name: Option<String>,
    #[serde(rename = "CategoryID")]
    pub category_id: Option<CategoryId>,
    #[serde(rename = "Description")]
    pub description: Option<String>,
    #[serde(rename = "Price")]
    #[validate(custom = "non_negative_price")]
    pub price: Option<Decimal>,
    #[serde(rename = "Specifications")]
    #[validate(custom = "specification_object")]
    pub specifications: Option<Value>,
    #[serde(rename = "Stock")]
    #[validate(range(max = 2147483647, message = "Stock is out of range"))]
    pub stock: Option<u32>,
    #[serde(rename = "Main_Image")]
    pub main_image: Option<String>,
    #[serde(rename = "List_Image")]
    pub list_image: Option<Vec<String>>,
    #[serde(rename = "Status")]
    pub status: Option<ProductStatus>,
}

fn non_negative_price(price: &Decimal) -> Result<(), ValidationError> {
    if price.is_sign_negative() && !price.is_zero() {
        let mut err = ValidationError::new("non_negative");
        err.message = Some("Price must not be negative".into());
        return Err(err);
    }
    Ok(())
}

fn specification_object(spec: &Value) -> Result<(), ValidationError> {
    if !spec.is_object() {
        let mut err = ValidationError::new("object");
        err.message = Some("Specifications must be a key-value object".into());
        return Err(err);
    }
    Ok(())
}

impl ProductInput {
    /// Checks a create request. The primary image is mandatory only here.
    pub fn validate_for_create(&self) -> Result<(), ProductError> {
        if self.main_image.as_deref().map_or(true, |url| url.trim().is_empty()) {
            return Err(ProductError::MissingMainImage);
        }
        self.validate_fields()
    }

    pub fn validate_for_update(&self) -> Result<(), ProductError> { self.validate_fields() }

    fn validate_fields(&self) -> Result<(), ProductError> {
        self.validate().map_err(|e| ProductError::Invalid(first_message(&e)))
    }
}

impl Product {
    /// Builds a new product from a create request, returning the category
    /// reference the store has to populate.
    pub fn create(input: ProductInput, now: DateTime<Utc>) -> (Self, Option<CategoryId>) {
        let mut product = Self {
            id: ProductId::generate(), name: None, category: None, description: None, price: None,
            specifications: None, stock: None, main_image: None, list_image: None, status: None,
            created_at: now, updated_at: now,
        };
        let category_id = product.replace_with(input, now);
        (product, category_id)
    }

    /// Overwrites every field with the request values, including absent ones.
    /// The populated category is cleared; the returned id is what the store
    /// resolves on read.
    pub fn replace_with(&mut self, input: ProductInput, now: DateTime<Utc>) -> Option<CategoryId> {
        self.name = input.name;
        self.category = None;
        self.description = input.description;
        self.price = input.price;
        self.specifications = input.specifications;
        self.stock = input.stock;
        self.main_image = input.main_image;
        self.list_image = input.list_image;
        self.status = input.status;
        self.updated_at = now;
        input.category_id
    }
}

fn first_message(errors: &ValidationErrors) -> String {
    errors
        .field_errors()
        .into_iter()
        .flat_map(|(field, errs)| errs.iter().map(move |e| (field, e)))
        .map(|(field, e)| e.message.as_ref().map_or_else(|| format!("Invalid {field}"), ToString::to_string))
        .next()
        .unwrap_or_else(|| "Invalid product".to_string())
}

#[derive(Debug, Clone, PartialEq, Eq)] pub enum ProductError { MissingMainImage, Invalid(String) }
impl std::error::Error for ProductError {}
impl std::fmt::Display for ProductError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingMainImage => write!(f, "Main image URL is required"),
            Self::Invalid(msg) => write!(f, "{msg}"),
        }
    }
}
