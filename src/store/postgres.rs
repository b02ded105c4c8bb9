//! `PostgreSQL` store.
//!
//! Filters are built with `QueryBuilder` so only the supplied clauses reach
//! the statement and every value is bound. Category and product population
//! are `LEFT JOIN`s at read time.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use secrecy::{ExposeSecret, SecretString};
use sqlx::postgres::PgPoolOptions;
use sqlx::{FromRow, PgPool, Postgres, QueryBuilder};

use super::{CartStore, CartStoreError, CatalogStore, StoreError};
use crate::domain::aggregates::{Cart, CartLine, Category, CategoryInput, CategoryRef, Product, ProductInput, ProductStatus, ProductSummary};
use crate::domain::query::{ProductFilter, ProductQuery};
use crate::domain::value_objects::{CategoryId, LineItemId, ProductId, Quantity, UserId};

const PRODUCT_COLUMNS: &str = "p.id, p.product_name, p.category_id, c.name AS category_name, p.description, p.price, \
     p.specifications, p.stock, p.main_image, p.list_image, p.status, p.created_at, p.updated_at";

const PRODUCT_WRITE_COLUMNS: &str =
    "product_name, category_id, description, price, specifications, stock, main_image, list_image, status";

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Connects a pool with the given size limit.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Database` if the connection cannot be established.
    pub async fn connect(database_url: &SecretString, max_connections: u32) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(Duration::from_secs(10))
            .connect(database_url.expose_secret())
            .await?;
        Ok(Self { pool })
    }

    pub async fn migrate(&self) -> Result<(), StoreError> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }

    async fn load_cart(&self, user: UserId) -> Result<Option<Cart>, StoreError> {
        let updated_at: Option<DateTime<Utc>> = sqlx::query_scalar("SELECT updated_at FROM carts WHERE user_id = $1")
            .bind(user)
            .fetch_optional(&self.pool)
            .await?;
        let Some(updated_at) = updated_at else { return Ok(None) };

        let rows = sqlx::query_as::<_, CartLineRow>(
            r#"
            SELECT ci.id, ci.product_id, ci.quantity,
                   p.id AS summary_id, p.product_name, p.price, p.main_image
            FROM cart_items ci
            LEFT JOIN products p ON p.id = ci.product_id
            WHERE ci.user_id = $1
            ORDER BY ci.position
            "#,
        )
        .bind(user)
        .fetch_all(&self.pool)
        .await?;

        let items = rows.into_iter().map(CartLine::try_from).collect::<Result<Vec<_>, _>>()?;
        Ok(Some(Cart::from_parts(user, items, updated_at)))
    }

    async fn loaded_cart(&self, user: UserId) -> Result<Cart, CartStoreError> {
        Ok(self.load_cart(user).await?.unwrap_or_else(|| Cart::empty(user)))
    }

    async fn stock_of(&self, product_id: ProductId) -> Result<Option<u32>, CartStoreError> {
        let row: Option<Option<i32>> = sqlx::query_scalar("SELECT stock FROM products WHERE id = $1")
            .bind(product_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(StoreError::from)?;
        let stock = row.ok_or(CartStoreError::ProductNotFound)?;
        stock
            .map(|s| u32::try_from(s).map_err(|_| StoreError::DataCorruption(format!("negative stock on product {product_id}"))))
            .transpose()
            .map_err(CartStoreError::from)
    }

    async fn touch_cart(&self, user: UserId) -> Result<(), StoreError> {
        sqlx::query("UPDATE carts SET updated_at = NOW() WHERE user_id = $1").bind(user).execute(&self.pool).await?;
        Ok(())
    }
}

/// Appends ` WHERE ...` with one bound clause per supplied filter field.
fn push_filter(qb: &mut QueryBuilder<'_, Postgres>, filter: &ProductFilter) {
    let mut keyword = " WHERE ";
    if let Some(needle) = &filter.name_contains {
        qb.push(keyword).push("p.product_name ILIKE ").push_bind(format!("%{}%", escape_like(needle))).push(" ESCAPE '\\'");
        keyword = " AND ";
    }
    if let Some(category) = filter.category {
        qb.push(keyword).push("p.category_id = ").push_bind(category);
        keyword = " AND ";
    }
    if let Some(min) = filter.price.min {
        qb.push(keyword).push("p.price >= ").push_bind(min);
        keyword = " AND ";
    }
    if let Some(max) = filter.price.max {
        qb.push(keyword).push("p.price <= ").push_bind(max);
    }
}

/// Makes the search term literal inside a `LIKE` pattern.
fn escape_like(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len());
    for ch in term.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}

fn to_i32(value: u32, what: &str) -> Result<i32, StoreError> {
    i32::try_from(value).map_err(|_| StoreError::DataCorruption(format!("{what} out of range: {value}")))
}

fn quantity_param(quantity: Quantity) -> Result<i32, CartStoreError> {
    i32::try_from(quantity.value()).map_err(|_| CartStoreError::QuantityTooLarge)
}

/// Why a guarded merge wrote no row: the sum overflowed or stock ran out.
fn rejected_merge(existing: Option<i32>, requested: Quantity, stock: Option<u32>) -> CartStoreError {
    let current = existing.and_then(|q| Quantity::try_from(q).ok());
    match current.map(|q| q.checked_add(requested)) {
        Some(None) => CartStoreError::QuantityTooLarge,
        _ => CartStoreError::InsufficientStock { available: stock.unwrap_or(0) },
    }
}

/// Binds the writable product columns in `PRODUCT_WRITE_COLUMNS` order.
fn push_product_values(qb: &mut QueryBuilder<'_, Postgres>, input: ProductInput) -> Result<(), StoreError> {
    let stock = input.stock.map(|s| to_i32(s, "stock")).transpose()?;
    let mut values = qb.separated(", ");
    values.push_bind(input.name);
    values.push_bind(input.category_id);
    values.push_bind(input.description);
    values.push_bind(input.price);
    values.push_bind(input.specifications);
    values.push_bind(stock);
    values.push_bind(input.main_image);
    values.push_bind(input.list_image);
    values.push_bind(input.status.map(|s| s.as_str()));
    Ok(())
}

#[derive(FromRow)]
struct ProductRow {
    id: ProductId,
    product_name: Option<String>,
    category_id: Option<CategoryId>,
    category_name: Option<String>,
    description: Option<String>,
    price: Option<Decimal>,
    specifications: Option<serde_json::Value>,
    stock: Option<i32>,
    main_image: Option<String>,
    list_image: Option<Vec<String>>,
    status: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<ProductRow> for Product {
    type Error = StoreError;

    fn try_from(row: ProductRow) -> Result<Self, Self::Error> {
        let stock = row
            .stock
            .map(|s| u32::try_from(s).map_err(|_| StoreError::DataCorruption(format!("negative stock on product {}", row.id))))
            .transpose()?;
        let status = row
            .status
            .as_deref()
            .map(|s| ProductStatus::parse(s).ok_or_else(|| StoreError::DataCorruption(format!("unknown status {s:?} on product {}", row.id))))
            .transpose()?;
        let category = match (row.category_id, row.category_name) {
            (Some(id), Some(name)) => Some(CategoryRef { id, name }),
            _ => None,
        };

        Ok(Self {
            id: row.id,
            name: row.product_name,
            category,
            description: row.description,
            price: row.price,
            specifications: row.specifications,
            stock,
            main_image: row.main_image,
            list_image: row.list_image,
            status,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(FromRow)]
struct CartLineRow {
    id: LineItemId,
    product_id: ProductId,
    quantity: i32,
    summary_id: Option<ProductId>,
    product_name: Option<String>,
    price: Option<Decimal>,
    main_image: Option<String>,
}

impl TryFrom<CartLineRow> for CartLine {
    type Error = StoreError;

    fn try_from(row: CartLineRow) -> Result<Self, Self::Error> {
        let quantity = Quantity::try_from(row.quantity)
            .map_err(|_| StoreError::DataCorruption(format!("non-positive quantity on cart item {}", row.id)))?;
        Ok(Self {
            id: row.id,
            product_id: row.product_id,
            quantity,
            product: row.summary_id.map(|id| ProductSummary { id, name: row.product_name, price: row.price, main_image: row.main_image }),
        })
    }
}

#[derive(FromRow)]
struct CategoryRow {
    id: CategoryId,
    name: String,
    created_at: DateTime<Utc>,
}

impl From<CategoryRow> for Category {
    fn from(row: CategoryRow) -> Self {
        Self { id: row.id, name: row.name, created_at: row.created_at }
    }
}

#[async_trait]
impl CatalogStore for PgStore {
    async fn find_products(&self, query: &ProductQuery) -> Result<Vec<Product>, StoreError> {
        let mut qb = QueryBuilder::<Postgres>::new(format!(
            "SELECT {PRODUCT_COLUMNS} FROM products p LEFT JOIN categories c ON c.id = p.category_id"
        ));
        push_filter(&mut qb, &query.filter);

        let direction = query.sort.order.sql();
        qb.push(format!(" ORDER BY p.{} {direction} NULLS LAST, p.id {direction}", query.sort.field.column()));

        if let Some(page) = query.page {
            qb.push(" LIMIT ").push_bind(i64::from(page.size));
            qb.push(" OFFSET ").push_bind(i64::try_from(page.offset()).unwrap_or(i64::MAX));
        }

        let rows = qb.build_query_as::<ProductRow>().fetch_all(&self.pool).await?;
        rows.into_iter().map(Product::try_from).collect()
    }

    async fn count_products(&self, filter: &ProductFilter) -> Result<u64, StoreError> {
        let mut qb = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM products p");
        push_filter(&mut qb, filter);
        let count = qb.build_query_scalar::<i64>().fetch_one(&self.pool).await?;
        u64::try_from(count).map_err(|_| StoreError::DataCorruption(format!("negative count {count}")))
    }

    async fn get_product(&self, id: ProductId) -> Result<Option<Product>, StoreError> {
        let row = sqlx::query_as::<_, ProductRow>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products p LEFT JOIN categories c ON c.id = p.category_id WHERE p.id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(Product::try_from).transpose()
    }

    async fn insert_product(&self, input: ProductInput) -> Result<Product, StoreError> {
        let mut qb = QueryBuilder::<Postgres>::new(format!("WITH p AS (INSERT INTO products (id, {PRODUCT_WRITE_COLUMNS}) VALUES ("));
        qb.push_bind(ProductId::generate()).push(", ");
        push_product_values(&mut qb, input)?;
        qb.push(format!(") RETURNING *) SELECT {PRODUCT_COLUMNS} FROM p LEFT JOIN categories c ON c.id = p.category_id"));

        let row = qb.build_query_as::<ProductRow>().fetch_one(&self.pool).await?;
        Product::try_from(row)
    }

    async fn replace_product(&self, id: ProductId, input: ProductInput) -> Result<Option<Product>, StoreError> {
        let mut qb = QueryBuilder::<Postgres>::new(format!("WITH p AS (UPDATE products SET ({PRODUCT_WRITE_COLUMNS}) = ROW("));
        push_product_values(&mut qb, input)?;
        qb.push("), updated_at = NOW() WHERE id = ").push_bind(id);
        qb.push(format!(" RETURNING *) SELECT {PRODUCT_COLUMNS} FROM p LEFT JOIN categories c ON c.id = p.category_id"));

        let row = qb.build_query_as::<ProductRow>().fetch_optional(&self.pool).await?;
        row.map(Product::try_from).transpose()
    }

    async fn delete_product(&self, id: ProductId) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM products WHERE id = $1").bind(id).execute(&self.pool).await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_categories(&self) -> Result<Vec<Category>, StoreError> {
        let rows = sqlx::query_as::<_, CategoryRow>("SELECT id, name, created_at FROM categories ORDER BY name")
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(Category::from).collect())
    }

    async fn insert_category(&self, input: CategoryInput) -> Result<Category, StoreError> {
        let category = Category::create(input, Utc::now());
        let row = sqlx::query_as::<_, CategoryRow>(
            "INSERT INTO categories (id, name, created_at) VALUES ($1, $2, $3) RETURNING id, name, created_at",
        )
        .bind(category.id)
        .bind(&category.name)
        .bind(category.created_at)
        .fetch_one(&self.pool)
        .await?;
        Ok(row.into())
    }

    async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

#[async_trait]
impl CartStore for PgStore {
    async fn get_cart(&self, user: UserId) -> Result<Option<Cart>, StoreError> {
        self.load_cart(user).await
    }

    async fn add_item(&self, user: UserId, product_id: ProductId, quantity: Quantity) -> Result<Cart, CartStoreError> {
        let stock = self.stock_of(product_id).await?;
        let requested = quantity_param(quantity)?;

        let mut tx = self.pool.begin().await.map_err(StoreError::from)?;
        sqlx::query("INSERT INTO carts (user_id) VALUES ($1) ON CONFLICT (user_id) DO UPDATE SET updated_at = NOW()")
            .bind(user)
            .execute(&mut *tx)
            .await
            .map_err(StoreError::from)?;

        // Single statement: concurrent adds of the same product merge instead
        // of overwriting each other, and the stock guard sees the merged value.
        let merged: Option<i32> = sqlx::query_scalar(
            r#"
            INSERT INTO cart_items (id, user_id, product_id, quantity)
            SELECT $1, $2, $3, $4
            WHERE $4 <= COALESCE((SELECT stock FROM products WHERE id = $3), $4)
            ON CONFLICT (user_id, product_id) DO UPDATE
                SET quantity = cart_items.quantity + EXCLUDED.quantity
                WHERE cart_items.quantity::BIGINT + EXCLUDED.quantity <= COALESCE(
                    (SELECT stock FROM products WHERE id = EXCLUDED.product_id),
                    2147483647)
            RETURNING quantity
            "#,
        )
        .bind(LineItemId::generate())
        .bind(user)
        .bind(product_id)
        .bind(requested)
        .fetch_optional(&mut *tx)
        .await
        .map_err(StoreError::from)?;

        if merged.is_none() {
            let existing: Option<i32> =
                sqlx::query_scalar("SELECT quantity FROM cart_items WHERE user_id = $1 AND product_id = $2")
                    .bind(user)
                    .bind(product_id)
                    .fetch_optional(&mut *tx)
                    .await
                    .map_err(StoreError::from)?;
            tx.rollback().await.map_err(StoreError::from)?;
            return Err(rejected_merge(existing, quantity, stock));
        }
        tx.commit().await.map_err(StoreError::from)?;

        self.loaded_cart(user).await
    }

    async fn set_item_quantity(&self, user: UserId, item_id: LineItemId, quantity: Quantity) -> Result<Cart, CartStoreError> {
        let product_id: ProductId = sqlx::query_scalar("SELECT product_id FROM cart_items WHERE id = $1 AND user_id = $2")
            .bind(item_id)
            .bind(user)
            .fetch_optional(&self.pool)
            .await
            .map_err(StoreError::from)?
            .ok_or(CartStoreError::ItemNotFound)?;
        let stock = self.stock_of(product_id).await?;
        let requested = quantity_param(quantity)?;

        let result = sqlx::query(
            r#"
            UPDATE cart_items SET quantity = $3
            WHERE id = $1 AND user_id = $2
              AND $3 <= COALESCE((SELECT stock FROM products WHERE id = cart_items.product_id), $3)
            "#,
        )
        .bind(item_id)
        .bind(user)
        .bind(requested)
        .execute(&self.pool)
        .await
        .map_err(StoreError::from)?;

        if result.rows_affected() == 0 {
            return Err(match stock {
                Some(available) if quantity.value() > available => CartStoreError::InsufficientStock { available },
                _ => CartStoreError::ItemNotFound,
            });
        }
        self.touch_cart(user).await?;
        self.loaded_cart(user).await
    }

    async fn remove_item(&self, user: UserId, item_id: LineItemId) -> Result<Cart, CartStoreError> {
        let result = sqlx::query("DELETE FROM cart_items WHERE id = $1 AND user_id = $2")
            .bind(item_id)
            .bind(user)
            .execute(&self.pool)
            .await
            .map_err(StoreError::from)?;
        if result.rows_affected() == 0 {
            return Err(CartStoreError::ItemNotFound);
        }
        self.touch_cart(user).await?;
        self.loaded_cart(user).await
    }

    async fn clear_cart(&self, user: UserId) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM carts WHERE user_id = $1").bind(user).execute(&self.pool).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::query::PriceRange;

    #[test]
    fn test_escape_like() {
        assert_eq!(escape_like("50%_off\\"), "50\\%\\_off\\\\");
        assert_eq!(escape_like("lamp"), "lamp");
    }

    #[test]
    fn test_rejected_merge_cause() {
        let q = |v| Quantity::new(v).unwrap();
        assert!(matches!(rejected_merge(Some(2_000_000_000), q(2_000_000_000), None), CartStoreError::QuantityTooLarge));
        assert!(matches!(
            rejected_merge(Some(2), q(2), Some(3)),
            CartStoreError::InsufficientStock { available: 3 }
        ));
        assert!(matches!(rejected_merge(None, q(5), Some(1)), CartStoreError::InsufficientStock { available: 1 }));
    }

    #[test]
    fn test_filter_only_supplied_clauses() {
        let mut qb = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM products p");
        push_filter(&mut qb, &ProductFilter::default());
        assert_eq!(qb.sql(), "SELECT COUNT(*) FROM products p");

        let mut qb = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM products p");
        let filter = ProductFilter {
            name_contains: None,
            category: None,
            price: PriceRange { min: Some(Decimal::from(100)), max: None },
        };
        push_filter(&mut qb, &filter);
        assert_eq!(qb.sql(), "SELECT COUNT(*) FROM products p WHERE p.price >= $1");
    }

    #[test]
    fn test_filter_combines_clauses() {
        let mut qb = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM products p");
        let filter = ProductFilter {
            name_contains: Some("lamp".into()),
            category: Some(CategoryId::generate()),
            price: PriceRange { min: Some(Decimal::from(1)), max: Some(Decimal::from(9)) },
        };
        push_filter(&mut qb, &filter);
        assert_eq!(
            qb.sql(),
            "SELECT COUNT(*) FROM products p WHERE p.product_name ILIKE $1 ESCAPE '\\' AND p.category_id = $2 \
             AND p.price >= $3 AND p.price <= $4"
        );
    }
}
