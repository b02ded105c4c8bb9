//! Catalog query construction.
//!
//! Request parameters are turned into a [`ProductQuery`]: one filter made of
//! only the supplied clauses, a sort specification and an optional page. The
//! stores translate it into SQL or evaluate it in memory.

use std::cmp::Ordering;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::aggregates::Product;
use crate::domain::value_objects::CategoryId;

pub const DEFAULT_PAGE: u32 = 1;
pub const DEFAULT_PAGE_SIZE: u32 = 10;

/// Raw search parameters as they appear in the query string.
///
/// Everything is kept as text so malformed values surface as validation
/// errors instead of extractor rejections. Empty values count as absent.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchParams {
    pub page: Option<String>,
    pub limit: Option<String>,
    pub search: Option<String>,
    pub category_id: Option<String>,
    pub min_price: Option<String>,
    pub max_price: Option<String>,
    pub sort_by: Option<String>,
    pub sort_order: Option<String>,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum QueryError {
    #[error("Invalid {0}: expected a positive integer")]
    InvalidNumber(&'static str),
    #[error("Invalid {0}: expected a number")]
    InvalidPrice(&'static str),
    #[error("Invalid category id")]
    InvalidCategory,
    #[error("Unsupported sort field: {0}")]
    InvalidSortField(String),
    #[error("Invalid sort order: {0}")]
    InvalidSortOrder(String),
}

fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

impl SearchParams {
    /// True when no parameter was supplied, i.e. a plain listing was requested.
    pub fn is_empty(&self) -> bool {
        [&self.page, &self.limit, &self.search, &self.category_id, &self.min_price, &self.max_price, &self.sort_by, &self.sort_order]
            .into_iter()
            .all(|v| present(v).is_none())
    }

    /// Builds the query, applying defaults and capping the page size at `max_page_size`.
    pub fn into_query(self, max_page_size: u32) -> Result<ProductQuery, QueryError> {
        let number = parse_positive(present(&self.page), "page")?.unwrap_or(DEFAULT_PAGE);
        let size = parse_positive(present(&self.limit), "limit")?.unwrap_or(DEFAULT_PAGE_SIZE).min(max_page_size.max(1));

        let category = present(&self.category_id)
            .map(|c| c.parse::<CategoryId>().map_err(|_| QueryError::InvalidCategory))
            .transpose()?;

        let filter = ProductFilter {
            name_contains: present(&self.search).map(str::to_string),
            category,
            price: PriceRange {
                min: parse_price(present(&self.min_price), "minPrice")?,
                max: parse_price(present(&self.max_price), "maxPrice")?,
            },
        };

        let sort = SortSpec {
            field: present(&self.sort_by).map(SortField::from_param).transpose()?.unwrap_or_default(),
            order: present(&self.sort_order).map(SortOrder::from_param).transpose()?.unwrap_or_default(),
        };

        Ok(ProductQuery { filter, sort, page: Some(Page { number, size }) })
    }
}

fn parse_positive(value: Option<&str>, name: &'static str) -> Result<Option<u32>, QueryError> {
    value
        .map(|v| v.parse::<u32>().ok().filter(|n| *n >= 1).ok_or(QueryError::InvalidNumber(name)))
        .transpose()
}

fn parse_price(value: Option<&str>, name: &'static str) -> Result<Option<Decimal>, QueryError> {
    value
        .map(|v| v.parse::<Decimal>().map_err(|_| QueryError::InvalidPrice(name)))
        .transpose()
}

/// Conjunction of the supplied filter clauses. An empty filter matches everything.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct ProductFilter {
    /// Case-insensitive literal substring of the product name.
    pub name_contains: Option<String>,
    pub category: Option<CategoryId>,
    pub price: PriceRange,
}

/// Inclusive price bounds; either side may be open.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PriceRange {
    pub min: Option<Decimal>,
    pub max: Option<Decimal>,
}

impl PriceRange {
    pub fn is_open(&self) -> bool { self.min.is_none() && self.max.is_none() }

    /// A product without a price never satisfies a bounded range.
    pub fn contains(&self, price: Option<Decimal>) -> bool {
        if self.is_open() { return true; }
        let Some(price) = price else { return false };
        self.min.map_or(true, |min| price >= min) && self.max.map_or(true, |max| price <= max)
    }
}

impl ProductFilter {
    pub fn by_category(category: CategoryId) -> Self { Self { category: Some(category), ..Self::default() } }

    /// Evaluates the filter against a product whose stored category reference is `category`.
    pub fn matches(&self, product: &Product, category: Option<CategoryId>) -> bool {
        let name_ok = self.name_contains.as_ref().map_or(true, |needle| {
            product.name.as_ref().is_some_and(|name| name.to_lowercase().contains(&needle.to_lowercase()))
        });
        let category_ok = self.category.map_or(true, |wanted| category == Some(wanted));
        name_ok && category_ok && self.price.contains(product.price)
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SortField {
    #[default]
    CreatedAt,
    UpdatedAt,
    Price,
    Name,
    Stock,
}

impl SortField {
    pub fn from_param(value: &str) -> Result<Self, QueryError> {
        match value {
            "createdAt" | "created_at" => Ok(Self::CreatedAt),
            "updatedAt" | "updated_at" => Ok(Self::UpdatedAt),
            "Price" | "price" => Ok(Self::Price),
            "Product_Name" | "name" => Ok(Self::Name),
            "Stock" | "stock" => Ok(Self::Stock),
            other => Err(QueryError::InvalidSortField(other.to_string())),
        }
    }

    /// Column name in the `products` table.
    pub fn column(&self) -> &'static str {
        match self {
            Self::CreatedAt => "created_at",
            Self::UpdatedAt => "updated_at",
            Self::Price => "price",
            Self::Name => "product_name",
            Self::Stock => "stock",
        }
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl SortOrder {
    pub fn from_param(value: &str) -> Result<Self, QueryError> {
        match value.to_ascii_lowercase().as_str() {
            "asc" | "ascending" | "1" => Ok(Self::Asc),
            "desc" | "descending" | "-1" => Ok(Self::Desc),
            _ => Err(QueryError::InvalidSortOrder(value.to_string())),
        }
    }

    pub fn sql(&self) -> &'static str {
        match self { Self::Asc => "ASC", Self::Desc => "DESC" }
    }

    fn apply(&self, ordering: Ordering) -> Ordering {
        match self { Self::Asc => ordering, Self::Desc => ordering.reverse() }
    }
}

/// Sort specification; null values always sort last.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SortSpec {
    pub field: SortField,
    pub order: SortOrder,
}

impl SortSpec {
    /// Newest first, the order of every plain listing.
    pub fn newest_first() -> Self { Self::default() }

    pub fn compare(&self, a: &Product, b: &Product) -> Ordering {
        match self.field {
            SortField::CreatedAt => self.order.apply(a.created_at.cmp(&b.created_at)),
            SortField::UpdatedAt => self.order.apply(a.updated_at.cmp(&b.updated_at)),
            SortField::Price => self.nulls_last(a.price.as_ref(), b.price.as_ref()),
            SortField::Name => self.nulls_last(a.name.as_ref(), b.name.as_ref()),
            SortField::Stock => self.nulls_last(a.stock.as_ref(), b.stock.as_ref()),
        }
    }

    fn nulls_last<T: Ord>(&self, a: Option<&T>, b: Option<&T>) -> Ordering {
        match (a, b) {
            (Some(a), Some(b)) => self.order.apply(a.cmp(b)),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    /// 1-based page number
    pub number: u32,
    pub size: u32,
}

impl Page {
    pub fn offset(&self) -> u64 { u64::from(self.number.saturating_sub(1)) * u64::from(self.size) }
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct ProductQuery {
    pub filter: ProductFilter,
    pub sort: SortSpec,
    /// `None` fetches every match.
    pub page: Option<Page>,
}

impl ProductQuery {
    /// Unpaginated, newest first.
    pub fn all(filter: ProductFilter) -> Self { Self { filter, sort: SortSpec::newest_first(), page: None } }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub total: u64,
    pub page: u32,
    pub limit: u32,
    pub total_pages: u64,
}

impl Pagination {
    pub fn new(total: u64, page: Page) -> Self {
        Self { total, page: page.number, limit: page.size, total_pages: total.div_ceil(u64::from(page.size.max(1))) }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ProductPage {
    pub products: Vec<Product>,
    pub pagination: Pagination,
}
