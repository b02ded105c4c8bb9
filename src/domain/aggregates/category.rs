//! Category Aggregate

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;
use crate::domain::value_objects::CategoryId;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Category {
    #[serde(rename = "_id")]
    pub id: CategoryId,
    #[serde(rename = "Category_Name")]
    pub name: String,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CategoryInput {
    #[serde(rename = "Category_Name")]
    #[validate(length(min = 1, max = 200, message = "Category name is required"))]
    pub name: String,
}

impl Category {
    pub fn create(input: CategoryInput, now: DateTime<Utc>) -> Self {
        Self { id: CategoryId::generate(), name: input.name.trim().to_string(), created_at: now }
    }
}
