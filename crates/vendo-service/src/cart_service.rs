//! # Cart Workflow
//!
//! Adds, re-prices and cancels cart lines for a user.
//!
//! ## Cart Operations Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Cart Operations                                      │
//! │                                                                         │
//! │  Operation              Checks (in order)              Store call       │
//! │  ─────────              ─────────────────              ──────────       │
//! │                                                                         │
//! │  add_item ───────────► ids, qty 1..=20                                 │
//! │                        user, product exist                              │
//! │                        lock(user)                                       │
//! │                        active cart (or create)                          │
//! │                        no line for product ──────────► add_item         │
//! │                                                                         │
//! │  update_quantity ────► ids, qty, cart exists                           │
//! │                        lock(user), line exists                          │
//! │                        line not canceled, cart Active ► update_item     │
//! │                                                                         │
//! │  cancel_item ────────► cart Active, line not canceled ► update_item     │
//! │                                                                         │
//! │  cancel_cart ────────► Active → Canceled ────────────► update           │
//! │                                                                         │
//! │  NOTE: every write runs while holding the user's lock.                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::sync::Arc;

use tokio::sync::OwnedMutexGuard;
use tracing::{debug, info, warn};

use vendo_core::validation::{validate_id, validate_quantity};
use vendo_core::{Cart, CartItem, CoreError};

use crate::error::{ServiceError, ServiceResult};
use crate::locks::UserLocks;
use crate::ports::{CartRepository, ProductLookup, UserLookup};

pub struct CartService {
    products: Arc<dyn ProductLookup>,
    users: Arc<dyn UserLookup>,
    carts: Arc<dyn CartRepository>,
    locks: Arc<UserLocks>,
}

impl CartService {
    pub fn new(
        products: Arc<dyn ProductLookup>,
        users: Arc<dyn UserLookup>,
        carts: Arc<dyn CartRepository>,
        locks: Arc<UserLocks>,
    ) -> Self {
        CartService {
            products,
            users,
            carts,
            locks,
        }
    }

    /// Adds `quantity` units of a product to the user's active cart,
    /// creating the cart on first use.
    ///
    /// The unit price is taken from the product at this moment.
    pub async fn add_item(&self, user_id: i64, product_id: i64, quantity: i64) -> ServiceResult<Cart> {
        validate_id("user_id", user_id)?;
        validate_id("product_id", product_id)?;
        let quantity = validate_quantity(quantity)?;

        debug!(user_id, product_id, quantity, "Adding item to cart");

        self.users
            .user(user_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("User", user_id))?;
        let product = self
            .products
            .product(product_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Product", product_id))?;

        let _guard = self.locks.lock(user_id).await;

        let mut cart = self.active_or_new_cart(user_id).await?;
        let line = CartItem::priced(product.id, product.price, quantity)?;
        let pending = cart.add_item(line)?.clone();

        let stored = self.carts.add_item(&pending).await?;
        info!(
            cart_id = cart.id,
            product_id,
            quantity,
            discount = %stored.discount,
            total = %stored.total_amount,
            "Item added to cart"
        );

        if let Some(last) = cart.items.last_mut() {
            *last = stored;
        }
        Ok(cart)
    }

    /// Sets a new quantity on an existing line and re-prices it.
    pub async fn update_item_quantity(
        &self,
        cart_id: i64,
        product_id: i64,
        quantity: i64,
    ) -> ServiceResult<Cart> {
        validate_id("cart_id", cart_id)?;
        validate_id("product_id", product_id)?;
        let quantity = validate_quantity(quantity)?;

        debug!(cart_id, product_id, quantity, "Updating cart item quantity");

        let (_guard, mut cart) = self.locked_cart(cart_id).await?;

        let line = cart
            .item(product_id)
            .ok_or_else(|| ServiceError::not_found("Cart item", product_id))?;
        if line.is_canceled() {
            return Err(CoreError::already_canceled("Cart item", line.id).into());
        }

        let (updated, matched) = cart.update_item_quantity(product_id, quantity)?;
        if matched.cleared_stale_discount {
            warn!(
                cart_id,
                product_id,
                quantity,
                "Discount no longer earned at this quantity, cleared"
            );
        }

        self.carts.update_item(&updated).await?;
        info!(
            cart_id,
            product_id,
            quantity,
            discount = %updated.discount,
            "Cart item re-priced"
        );
        Ok(cart)
    }

    /// Cancels one line. The line keeps its slot; the product cannot be
    /// added to this cart again.
    pub async fn cancel_item(&self, cart_id: i64, product_id: i64) -> ServiceResult<Cart> {
        validate_id("cart_id", cart_id)?;
        validate_id("product_id", product_id)?;

        let (_guard, mut cart) = self.locked_cart(cart_id).await?;

        let canceled = cart.cancel_item(product_id)?;
        self.carts.update_item(&canceled).await?;

        info!(cart_id, product_id, "Cart item canceled");
        Ok(cart)
    }

    /// `Active → Canceled`.
    pub async fn cancel_cart(&self, cart_id: i64) -> ServiceResult<Cart> {
        validate_id("cart_id", cart_id)?;

        let (_guard, mut cart) = self.locked_cart(cart_id).await?;

        cart.cancel()?;
        let cart = self.carts.update(&cart).await?;

        info!(cart_id, user_id = cart.user_id, "Cart canceled");
        Ok(cart)
    }

    pub async fn get_cart(&self, cart_id: i64) -> ServiceResult<Cart> {
        validate_id("cart_id", cart_id)?;
        self.carts
            .cart(cart_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Cart", cart_id))
    }

    /// The user's active cart, if they have one.
    pub async fn active_cart(&self, user_id: i64) -> ServiceResult<Option<Cart>> {
        validate_id("user_id", user_id)?;
        Ok(self.carts.active_cart_for_user(user_id).await?)
    }

    // =========================================================================
    // Helpers
    // =========================================================================

    /// Must be called with the user's lock held.
    async fn active_or_new_cart(&self, user_id: i64) -> ServiceResult<Cart> {
        if let Some(cart) = self.carts.active_cart_for_user(user_id).await? {
            return Ok(cart);
        }

        match self.carts.create(&Cart::new(user_id)).await {
            Ok(cart) => {
                info!(cart_id = cart.id, user_id, "Cart created");
                Ok(cart)
            }
            // Another process won the race; use its cart
            Err(e) if e.is_conflict() => self
                .carts
                .active_cart_for_user(user_id)
                .await?
                .ok_or_else(|| ServiceError::Conflict(e.to_string())),
            Err(e) => Err(e.into()),
        }
    }

    /// Locks the cart owner and returns the cart as read under the lock.
    async fn locked_cart(&self, cart_id: i64) -> ServiceResult<(OwnedMutexGuard<()>, Cart)> {
        let owner = self
            .carts
            .cart(cart_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Cart", cart_id))?
            .user_id;

        let guard = self.locks.lock(owner).await;
        let cart = self
            .carts
            .cart(cart_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Cart", cart_id))?;
        Ok((guard, cart))
    }
}
