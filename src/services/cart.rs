use std::sync::Arc;

use tracing::{info, instrument};
use validator::Validate;

use crate::domain::aggregates::{AddItemRequest, Cart, UpdateItemRequest};
use crate::domain::value_objects::{LineItemId, Quantity, UserId};
use crate::error::{AppError, Result};
use crate::store::CartStore;

const ITEM_NOT_FOUND: &str = "Cart item not found";

#[derive(Clone)]
pub struct CartService {
    store: Arc<dyn CartStore>,
}

fn item_id(raw: &str) -> Result<LineItemId> {
    raw.parse().map_err(|_| AppError::not_found(ITEM_NOT_FOUND))
}

fn quantity(value: u32) -> Result<Quantity> {
    Quantity::new(value).map_err(|err| AppError::validation(err.to_string()))
}

impl CartService {
    pub fn new(store: Arc<dyn CartStore>) -> Self { Self { store } }

    /// The user's cart; an empty cart when none exists yet.
    pub async fn get(&self, user: UserId) -> Result<Cart> {
        Ok(self.store.get_cart(user).await?.unwrap_or_else(|| Cart::empty(user)))
    }

    #[instrument(skip(self, request), fields(user_id = %user, product_id = %request.product_id))]
    pub async fn add(&self, user: UserId, request: AddItemRequest) -> Result<Cart> {
        request.validate()?;
        let cart = self.store.add_item(user, request.product_id, quantity(request.quantity)?).await?;
        info!(quantity = request.quantity, "Item added to cart");
        Ok(cart)
    }

    #[instrument(skip(self, request), fields(user_id = %user))]
    pub async fn update_item(&self, user: UserId, item: &str, request: UpdateItemRequest) -> Result<Cart> {
        request.validate()?;
        let quantity = quantity(request.quantity)?;
        let item = item_id(item)?;
        Ok(self.store.set_item_quantity(user, item, quantity).await?)
    }

    #[instrument(skip(self), fields(user_id = %user))]
    pub async fn remove_item(&self, user: UserId, item: &str) -> Result<Cart> {
        let item = item_id(item)?;
        Ok(self.store.remove_item(user, item).await?)
    }

    #[instrument(skip(self), fields(user_id = %user))]
    pub async fn clear(&self, user: UserId) -> Result<()> {
        self.store.clear_cart(user).await?;
        info!("Cart cleared");
        Ok(())
    }
}
