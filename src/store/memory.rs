//! In-memory store backed by `DashMap`.
//!
//! Each cart is mutated under its map entry lock, so concurrent adds for the
//! same user serialize and no increment is lost. Guards on one map are never
//! held while another map is accessed.

use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;

use super::{CartStore, CartStoreError, CatalogStore, StoreError};
use crate::domain::aggregates::{Cart, Category, CategoryInput, CategoryRef, Product, ProductInput, ProductSummary};
use crate::domain::query::{ProductFilter, ProductQuery, SortOrder};
use crate::domain::value_objects::{CategoryId, LineItemId, ProductId, Quantity, UserId};

struct StoredProduct {
    /// Insertion sequence, the tie-breaker for equal sort keys.
    seq: u64,
    category_id: Option<CategoryId>,
    product: Product,
}

#[derive(Default)]
pub struct MemoryStore {
    products: DashMap<ProductId, StoredProduct>,
    categories: DashMap<CategoryId, Category>,
    carts: DashMap<UserId, Cart>,
    seq: AtomicU64,
}

impl MemoryStore {
    pub fn new() -> Self { Self::default() }

    fn populate(&self, mut product: Product, category_id: Option<CategoryId>) -> Product {
        product.category = category_id.and_then(|id| {
            self.categories.get(&id).map(|c| CategoryRef { id, name: c.name.clone() })
        });
        product
    }

    fn populate_cart(&self, mut cart: Cart) -> Cart {
        for line in cart.items_mut() {
            line.product = self.products.get(&line.product_id).map(|stored| {
                let p = &stored.product;
                ProductSummary { id: p.id, name: p.name.clone(), price: p.price, main_image: p.main_image.clone() }
            });
        }
        cart
    }

    fn stock_of(&self, product_id: ProductId) -> Result<Option<u32>, CartStoreError> {
        self.products
            .get(&product_id)
            .map(|stored| stored.product.stock)
            .ok_or(CartStoreError::ProductNotFound)
    }
}

#[async_trait]
impl CatalogStore for MemoryStore {
    async fn find_products(&self, query: &ProductQuery) -> Result<Vec<Product>, StoreError> {
        let mut matches: Vec<(u64, Option<CategoryId>, Product)> = self
            .products
            .iter()
            .filter(|entry| query.filter.matches(&entry.product, entry.category_id))
            .map(|entry| (entry.seq, entry.category_id, entry.product.clone()))
            .collect();

        let sort = query.sort;
        matches.sort_by(|(seq_a, _, a), (seq_b, _, b)| {
            sort.compare(a, b).then_with(|| match sort.order {
                SortOrder::Asc => seq_a.cmp(seq_b),
                SortOrder::Desc => seq_b.cmp(seq_a),
            })
        });

        let (skip, take) = match query.page {
            Some(page) => (usize::try_from(page.offset()).unwrap_or(usize::MAX), page.size as usize),
            None => (0, usize::MAX),
        };

        Ok(matches
            .into_iter()
            .skip(skip)
            .take(take)
            .map(|(_, category_id, product)| self.populate(product, category_id))
            .collect())
    }

    async fn count_products(&self, filter: &ProductFilter) -> Result<u64, StoreError> {
        let count = self.products.iter().filter(|e| filter.matches(&e.product, e.category_id)).count();
        Ok(count as u64)
    }

    async fn get_product(&self, id: ProductId) -> Result<Option<Product>, StoreError> {
        let found = self.products.get(&id).map(|e| (e.product.clone(), e.category_id));
        Ok(found.map(|(product, category_id)| self.populate(product, category_id)))
    }

    async fn insert_product(&self, input: ProductInput) -> Result<Product, StoreError> {
        let (product, category_id) = Product::create(input, Utc::now());
        let seq = self.seq.fetch_add(1, Ordering::Relaxed);
        self.products.insert(product.id, StoredProduct { seq, category_id, product: product.clone() });
        Ok(self.populate(product, category_id))
    }

    async fn replace_product(&self, id: ProductId, input: ProductInput) -> Result<Option<Product>, StoreError> {
        let replaced = self.products.get_mut(&id).map(|mut stored| {
            stored.category_id = stored.product.replace_with(input, Utc::now());
            (stored.product.clone(), stored.category_id)
        });
        Ok(replaced.map(|(product, category_id)| self.populate(product, category_id)))
    }

    async fn delete_product(&self, id: ProductId) -> Result<bool, StoreError> {
        Ok(self.products.remove(&id).is_some())
    }

    async fn list_categories(&self) -> Result<Vec<Category>, StoreError> {
        let mut categories: Vec<Category> = self.categories.iter().map(|c| c.value().clone()).collect();
        categories.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(categories)
    }

    async fn insert_category(&self, input: CategoryInput) -> Result<Category, StoreError> {
        let category = Category::create(input, Utc::now());
        self.categories.insert(category.id, category.clone());
        Ok(category)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

#[async_trait]
impl CartStore for MemoryStore {
    async fn get_cart(&self, user: UserId) -> Result<Option<Cart>, StoreError> {
        let cart = self.carts.get(&user).map(|c| c.value().clone());
        Ok(cart.map(|c| self.populate_cart(c)))
    }

    async fn add_item(&self, user: UserId, product_id: ProductId, quantity: Quantity) -> Result<Cart, CartStoreError> {
        let stock = self.stock_of(product_id)?;

        let mut created = false;
        let result = {
            let mut cart = self.carts.entry(user).or_insert_with(|| {
                created = true;
                Cart::empty(user)
            });
            let added = cart.add_item(product_id, quantity, stock).map(|_| ());
            added.map(|()| cart.clone())
        };

        match result {
            Ok(cart) => Ok(self.populate_cart(cart)),
            Err(err) => {
                // Only the cart this call inserted is discarded; an existing
                // empty cart keeps its timestamp.
                if created {
                    self.carts.remove_if(&user, |_, cart| cart.is_empty());
                }
                Err(err.into())
            }
        }
    }

    async fn set_item_quantity(&self, user: UserId, item_id: LineItemId, quantity: Quantity) -> Result<Cart, CartStoreError> {
        let product_id = self
            .carts
            .get(&user)
            .and_then(|cart| cart.product_of(item_id))
            .ok_or(CartStoreError::ItemNotFound)?;
        let stock = self.stock_of(product_id)?;

        let cart = {
            let mut cart = self.carts.get_mut(&user).ok_or(CartStoreError::ItemNotFound)?;
            cart.update_quantity(item_id, quantity, stock)?;
            cart.clone()
        };
        Ok(self.populate_cart(cart))
    }

    async fn remove_item(&self, user: UserId, item_id: LineItemId) -> Result<Cart, CartStoreError> {
        let cart = {
            let mut cart = self.carts.get_mut(&user).ok_or(CartStoreError::ItemNotFound)?;
            cart.remove_item(item_id)?;
            cart.clone()
        };
        Ok(self.populate_cart(cart))
    }

    async fn clear_cart(&self, user: UserId) -> Result<(), StoreError> {
        self.carts.remove(&user);
        Ok(())
    }
}
