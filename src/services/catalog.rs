use std::sync::Arc;

use tracing::{debug, info, instrument};
use validator::Validate;

use crate::domain::aggregates::{Category, CategoryInput, Product, ProductInput};
use crate::domain::query::{Pagination, ProductFilter, ProductPage, ProductQuery, SearchParams};
use crate::domain::value_objects::{CategoryId, ProductId};
use crate::error::{AppError, Result};
use crate::store::CatalogStore;

const PRODUCT_NOT_FOUND: &str = "Product not found";

#[derive(Clone)]
pub struct CatalogService {
    store: Arc<dyn CatalogStore>,
    max_page_size: u32,
}

/// Path identifiers that do not parse cannot name an existing product.
fn product_id(raw: &str) -> Result<ProductId> {
    raw.parse().map_err(|_| AppError::not_found(PRODUCT_NOT_FOUND))
}

impl CatalogService {
    pub fn new(store: Arc<dyn CatalogStore>, max_page_size: u32) -> Self { Self { store, max_page_size } }

    /// Every product, newest first.
    pub async fn list_all(&self) -> Result<Vec<Product>> {
        Ok(self.store.find_products(&ProductQuery::all(ProductFilter::default())).await?)
    }

    #[instrument(skip(self))]
    pub async fn get(&self, id: &str) -> Result<Product> {
        let id = product_id(id)?;
        self.store.get_product(id).await?.ok_or_else(|| AppError::not_found(PRODUCT_NOT_FOUND))
    }

    #[instrument(skip(self))]
    pub async fn list_by_category(&self, category_id: &str) -> Result<Vec<Product>> {
        let category: CategoryId = category_id.parse().map_err(|_| AppError::validation("Invalid category id"))?;
        Ok(self.store.find_products(&ProductQuery::all(ProductFilter::by_category(category))).await?)
    }

    /// Filtered, sorted page of products together with the total match count.
    #[instrument(skip(self, params))]
    pub async fn search(&self, params: SearchParams) -> Result<ProductPage> {
        let query = params.into_query(self.max_page_size)?;
        let page = query.page.ok_or_else(|| AppError::Internal("search query without a page".into()))?;

        let (total, products) =
            tokio::try_join!(self.store.count_products(&query.filter), self.store.find_products(&query))?;
        debug!(total, page = page.number, limit = page.size, "Product search");

        Ok(ProductPage { products, pagination: Pagination::new(total, page) })
    }

    #[instrument(skip(self, input))]
    pub async fn create(&self, input: ProductInput) -> Result<Product> {
        input.validate_for_create()?;
        let product = self.store.insert_product(input).await?;
        info!(product_id = %product.id, "Product created");
        Ok(product)
    }

    /// Full replacement: fields absent from `input` are cleared.
    #[instrument(skip(self, input))]
    pub async fn update(&self, id: &str, input: ProductInput) -> Result<Product> {
        let id = product_id(id)?;
        input.validate_for_update()?;
        let product = self.store.replace_product(id, input).await?.ok_or_else(|| AppError::not_found(PRODUCT_NOT_FOUND))?;
        info!(product_id = %id, "Product replaced");
        Ok(product)
    }

    #[instrument(skip(self))]
    pub async fn delete(&self, id: &str) -> Result<()> {
        let id = product_id(id)?;
        if !self.store.delete_product(id).await? {
            return Err(AppError::not_found(PRODUCT_NOT_FOUND));
        }
        info!(product_id = %id, "Product deleted");
        Ok(())
    }

    pub async fn list_categories(&self) -> Result<Vec<Category>> {
        Ok(self.store.list_categories().await?)
    }

    #[instrument(skip(self, input))]
    pub async fn create_category(&self, input: CategoryInput) -> Result<Category> {
        input.validate()?;
        if input.name.trim().is_empty() {
            return Err(AppError::validation("Category name is required"));
        }
        let category = self.store.insert_category(input).await?;
        info!(category_id = %category.id, "Category created");
        Ok(category)
    }

    pub async fn ping(&self) -> Result<()> {
        Ok(self.store.ping().await?)
    }
}
