//! Application state shared across handlers.

use std::sync::Arc;

use crate::auth::TokenVerifier;
use crate::services::{CartService, CatalogService};
use crate::store::{CartStore, CatalogStore};

/// Cheaply cloneable via `Arc`.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    catalog: CatalogService,
    carts: CartService,
    tokens: TokenVerifier,
}

impl AppState {
    /// Builds the state over one store serving both catalog and carts.
    pub fn new<S>(store: Arc<S>, tokens: TokenVerifier, max_page_size: u32) -> Self
    where
        S: CatalogStore + CartStore + 'static,
    {
        let catalog_store: Arc<dyn CatalogStore> = store.clone();
        let cart_store: Arc<dyn CartStore> = store;
        Self {
            inner: Arc::new(AppStateInner {
                catalog: CatalogService::new(catalog_store, max_page_size),
                carts: CartService::new(cart_store),
                tokens,
            }),
        }
    }

    #[must_use]
    pub fn catalog(&self) -> &CatalogService {
        &self.inner.catalog
    }

    #[must_use]
    pub fn carts(&self) -> &CartService {
        &self.inner.carts
    }

    #[must_use]
    pub fn tokens(&self) -> &TokenVerifier {
        &self.inner.tokens
    }
}
