//! Client-side shopping cart.
//!
//! The cart never touches the server until checkout. [`Cart`] is the plain
//! ordered list; [`CartStore`] owns one together with a [`CartStorage`]
//! backend and mirrors every change to it, the way a browser tab mirrors its
//! cart to local storage. Callers hold the store explicitly and pass it where
//! it is needed.

use std::{
    path::{Path, PathBuf},
    sync::Mutex,
};

use anyhow::Context;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    catalog::{CatalogRef, CatalogSource},
    dto::orders::{DeliveryInfo, OrderLineRequest, PlaceOrderRequest},
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLine {
    pub product_id: Uuid,
    pub source: CatalogSource,
    pub quantity: u32,
}

impl CartLine {
    pub fn item(&self) -> CatalogRef {
        CatalogRef::new(self.source, self.product_id)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Cart {
    lines: Vec<CartLine>,
}

impl Cart {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn quantity_of(&self, item: CatalogRef) -> u32 {
        self.position(item).map_or(0, |i| self.lines[i].quantity)
    }

    pub fn total_quantity(&self) -> u32 {
        self.lines.iter().map(|line| line.quantity).sum()
    }

    /// Add `quantity` units, merging into an existing line for the same item.
    pub fn add_to_cart(&mut self, item: CatalogRef, quantity: u32) {
        if quantity == 0 {
            return;
        }
        match self.position(item) {
            Some(i) => {
                let line = &mut self.lines[i];
                line.quantity = line.quantity.saturating_add(quantity);
            }
            None => self.lines.push(CartLine {
                product_id: item.id(),
                source: item.source(),
                quantity,
            }),
        }
    }

    /// Set the quantity of an existing line. Zero removes it. Returns false
    /// when the item is not in the cart.
    pub fn update_quantity(&mut self, item: CatalogRef, quantity: u32) -> bool {
        let Some(i) = self.position(item) else {
            return false;
        };
        if quantity == 0 {
            self.lines.remove(i);
        } else {
            self.lines[i].quantity = quantity;
        }
        true
    }

    /// Shift an existing line by `delta`; driving it to zero or below drops
    /// the line. Returns false when the item is not in the cart.
    pub fn change_quantity(&mut self, item: CatalogRef, delta: i64) -> bool {
        let Some(i) = self.position(item) else {
            return false;
        };
        let next = i64::from(self.lines[i].quantity) + delta;
        if next <= 0 {
            self.lines.remove(i);
        } else {
            self.lines[i].quantity = u32::try_from(next).unwrap_or(u32::MAX);
        }
        true
    }

    pub fn remove_from_cart(&mut self, item: CatalogRef) -> bool {
        let before = self.lines.len();
        self.lines.retain(|line| line.item() != item);
        self.lines.len() != before
    }

    pub fn clear(&mut self) {
        self.lines.clear();
    }

    /// Checkout payload for `POST /api/orders`.
    pub fn to_order_request(&self, delivery_info: DeliveryInfo) -> PlaceOrderRequest {
        let carts = self
            .lines
            .iter()
            .map(|line| OrderLineRequest {
                product_id: line.product_id,
                quantity: i32::try_from(line.quantity).unwrap_or(i32::MAX),
                source: line.source.to_string(),
            })
            .collect();
        PlaceOrderRequest {
            delivery_info,
            carts,
        }
    }

    fn position(&self, item: CatalogRef) -> Option<usize> {
        self.lines.iter().position(|line| line.item() == item)
    }
}

pub trait CartStorage {
    fn load(&self) -> anyhow::Result<Option<Cart>>;
    fn save(&self, cart: &Cart) -> anyhow::Result<()>;
    fn clear(&self) -> anyhow::Result<()>;
}

/// Keeps the last saved cart in memory. Useful for tests and headless clients.
#[derive(Debug, Default)]
pub struct MemoryCartStorage {
    saved: Mutex<Option<Cart>>,
}

impl MemoryCartStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_cart(cart: Cart) -> Self {
        Self {
            saved: Mutex::new(Some(cart)),
        }
    }

    pub fn saved(&self) -> Option<Cart> {
        self.saved.lock().ok().and_then(|guard| guard.clone())
    }
}

impl CartStorage for MemoryCartStorage {
    fn load(&self) -> anyhow::Result<Option<Cart>> {
        Ok(self.saved())
    }

    fn save(&self, cart: &Cart) -> anyhow::Result<()> {
        let mut guard = self
            .saved
            .lock()
            .map_err(|_| anyhow::anyhow!("cart storage lock poisoned"))?;
        *guard = Some(cart.clone());
        Ok(())
    }

    fn clear(&self) -> anyhow::Result<()> {
        let mut guard = self
            .saved
            .lock()
            .map_err(|_| anyhow::anyhow!("cart storage lock poisoned"))?;
        *guard = None;
        Ok(())
    }
}

/// Persists the cart as a JSON document on disk.
#[derive(Debug, Clone)]
pub struct JsonFileCartStorage {
    path: PathBuf,
}

impl JsonFileCartStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl CartStorage for JsonFileCartStorage {
    fn load(&self) -> anyhow::Result<Option<Cart>> {
        let raw = match std::fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(err) => {
                return Err(err).with_context(|| format!("read {}", self.path.display()));
            }
        };
        let cart = serde_json::from_str(&raw)
            .with_context(|| format!("parse cart from {}", self.path.display()))?;
        Ok(Some(cart))
    }

    fn save(&self, cart: &Cart) -> anyhow::Result<()> {
        let raw = serde_json::to_string(cart)?;
        std::fs::write(&self.path, raw).with_context(|| format!("write {}", self.path.display()))
    }

    fn clear(&self) -> anyhow::Result<()> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err).with_context(|| format!("remove {}", self.path.display())),
        }
    }
}

/// A cart bound to its storage. Storage failures are logged and never undo
/// the in-memory change.
pub struct CartStore<S: CartStorage> {
    cart: Cart,
    storage: S,
}

impl<S: CartStorage> CartStore<S> {
    /// Restore the saved cart, starting empty when nothing usable is stored.
    pub fn open(storage: S) -> Self {
        let cart = match storage.load() {
            Ok(saved) => saved.unwrap_or_default(),
            Err(err) => {
                tracing::warn!(error = %err, "discarding unreadable saved cart");
                Cart::default()
            }
        };
        Self { cart, storage }
    }

    pub fn cart(&self) -> &Cart {
        &self.cart
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn add_to_cart(&mut self, item: CatalogRef, quantity: u32) {
        self.cart.add_to_cart(item, quantity);
        self.persist();
    }

    pub fn update_quantity(&mut self, item: CatalogRef, quantity: u32) -> bool {
        let changed = self.cart.update_quantity(item, quantity);
        if changed {
            self.persist();
        }
        changed
    }

    pub fn change_quantity(&mut self, item: CatalogRef, delta: i64) -> bool {
        let changed = self.cart.change_quantity(item, delta);
        if changed {
            self.persist();
        }
        changed
    }

    pub fn remove_from_cart(&mut self, item: CatalogRef) -> bool {
        let changed = self.cart.remove_from_cart(item);
        if changed {
            self.persist();
        }
        changed
    }

    /// Drop the cart after the server accepted the order.
    pub fn complete_order(&mut self) {
        self.cart.clear();
        if let Err(err) = self.storage.clear() {
            tracing::warn!(error = %err, "failed to clear saved cart");
        }
    }

    fn persist(&self) {
        if let Err(err) = self.storage.save(&self.cart) {
            tracing::warn!(error = %err, "failed to save cart");
        }
    }
}
