//! In-memory store.
//!
//! Backs the test suite and local development without `PostgreSQL`. One mutex
//! guards all state, so every trait method is a single critical section and
//! the conditional primitives (`upsert_cart_item`, `consume_reset_token`)
//! are atomic by construction. The lock is never held across an await.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;

use threadline_core::{CartItemId, Email, ItemId, OrderId, PermissionSet, UserId};

use super::{Store, StoreError};
use crate::models::{CartItem, CartLine, Item, ItemDraft, ItemPatch, Order, OrderDraft, User};

/// In-memory [`Store`] implementation.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

#[derive(Default)]
struct Inner {
    next_user: i32,
    next_item: i32,
    next_cart_item: i32,
    next_order: i32,
    users: BTreeMap<UserId, UserRecord>,
    items: BTreeMap<ItemId, Item>,
    cart_items: BTreeMap<CartItemId, CartItem>,
    orders: BTreeMap<OrderId, Order>,
}

struct UserRecord {
    user: User,
    password_hash: String,
    reset_token: Option<String>,
    reset_token_expiry: Option<DateTime<Utc>>,
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }

    async fn create_user(
        &self,
        name: &str,
        email: &Email,
        password_hash: &str,
        permissions: &PermissionSet,
    ) -> Result<User, StoreError> {
        let mut inner = self.inner.lock();
        if inner.users.values().any(|r| &r.user.email == email) {
            return Err(StoreError::Conflict("email already exists".to_owned()));
        }
        inner.next_user += 1;
        let user = User {
            id: UserId::new(inner.next_user),
            name: name.to_owned(),
            email: email.clone(),
            permissions: permissions.clone(),
            created_at: Utc::now(),
        };
        inner.users.insert(
            user.id,
            UserRecord {
                user: user.clone(),
                password_hash: password_hash.to_owned(),
                reset_token: None,
                reset_token_expiry: None,
            },
        );
        Ok(user)
    }

    async fn user_by_id(&self, id: UserId) -> Result<Option<User>, StoreError> {
        Ok(self.inner.lock().users.get(&id).map(|r| r.user.clone()))
    }

    async fn user_by_email(&self, email: &Email) -> Result<Option<User>, StoreError> {
        Ok(self
            .inner
            .lock()
            .users
            .values()
            .find(|r| &r.user.email == email)
            .map(|r| r.user.clone()))
    }

    async fn password_hash_by_email(
        &self,
        email: &Email,
    ) -> Result<Option<(User, String)>, StoreError> {
        Ok(self
            .inner
            .lock()
            .users
            .values()
            .find(|r| &r.user.email == email)
            .map(|r| (r.user.clone(), r.password_hash.clone())))
    }

    async fn set_reset_token(
        &self,
        user_id: UserId,
        token: &str,
        expiry: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let mut inner = self.inner.lock();
        let record = inner.users.get_mut(&user_id).ok_or(StoreError::NotFound)?;
        record.reset_token = Some(token.to_owned());
        record.reset_token_expiry = Some(expiry);
        Ok(())
    }

    async fn consume_reset_token(
        &self,
        token: &str,
        now: DateTime<Utc>,
        new_password_hash: &str,
    ) -> Result<Option<User>, StoreError> {
        let mut inner = self.inner.lock();
        let record = inner.users.values_mut().find(|r| {
            r.reset_token.as_deref() == Some(token)
                && r.reset_token_expiry.is_some_and(|expiry| expiry >= now)
        });
        let Some(record) = record else {
            return Ok(None);
        };
        record.password_hash = new_password_hash.to_owned();
        record.reset_token = None;
        record.reset_token_expiry = None;
        Ok(Some(record.user.clone()))
    }

    async fn update_permissions(
        &self,
        user_id: UserId,
        permissions: &PermissionSet,
    ) -> Result<User, StoreError> {
        let mut inner = self.inner.lock();
        let record = inner.users.get_mut(&user_id).ok_or(StoreError::NotFound)?;
        record.user.permissions = permissions.clone();
        Ok(record.user.clone())
    }

    async fn create_item(&self, owner: UserId, draft: &ItemDraft) -> Result<Item, StoreError> {
        let mut inner = self.inner.lock();
        inner.next_item += 1;
        let item = Item {
            id: ItemId::new(inner.next_item),
            title: draft.title.clone(),
            description: draft.description.clone(),
            price: draft.price,
            image: draft.image.clone(),
            owner,
            created_at: Utc::now(),
        };
        inner.items.insert(item.id, item.clone());
        Ok(item)
    }

    async fn item_by_id(&self, id: ItemId) -> Result<Option<Item>, StoreError> {
        Ok(self.inner.lock().items.get(&id).cloned())
    }

    async fn update_item(&self, id: ItemId, patch: &ItemPatch) -> Result<Item, StoreError> {
        let mut inner = self.inner.lock();
        let item = inner.items.get_mut(&id).ok_or(StoreError::NotFound)?;
        if let Some(title) = &patch.title {
            item.title.clone_from(title);
        }
        if let Some(description) = &patch.description {
            item.description.clone_from(description);
        }
        if let Some(price) = patch.price {
            item.price = price;
        }
        if let Some(image) = &patch.image {
            item.image = Some(image.clone());
        }
        Ok(item.clone())
    }

    async fn delete_item(&self, id: ItemId) -> Result<(), StoreError> {
        let mut inner = self.inner.lock();
        inner.items.remove(&id).ok_or(StoreError::NotFound)?;
        // Mirror the FK cascade: cart rows for a deleted item go with it
        inner.cart_items.retain(|_, c| c.item_id != id);
        Ok(())
    }

    async fn upsert_cart_item(
        &self,
        user_id: UserId,
        item_id: ItemId,
    ) -> Result<CartItem, StoreError> {
        let mut inner = self.inner.lock();
        if let Some(existing) = inner
            .cart_items
            .values_mut()
            .find(|c| c.user_id == user_id && c.item_id == item_id)
        {
            existing.quantity += 1;
            return Ok(existing.clone());
        }
        inner.next_cart_item += 1;
        let cart_item = CartItem {
            id: CartItemId::new(inner.next_cart_item),
            user_id,
            item_id,
            quantity: 1,
        };
        inner.cart_items.insert(cart_item.id, cart_item.clone());
        Ok(cart_item)
    }

    async fn cart_item_by_id(&self, id: CartItemId) -> Result<Option<CartItem>, StoreError> {
        Ok(self.inner.lock().cart_items.get(&id).cloned())
    }

    async fn delete_cart_item(&self, id: CartItemId) -> Result<(), StoreError> {
        self.inner
            .lock()
            .cart_items
            .remove(&id)
            .ok_or(StoreError::NotFound)?;
        Ok(())
    }

    async fn cart_for_user(&self, user_id: UserId) -> Result<Vec<CartLine>, StoreError> {
        let inner = self.inner.lock();
        inner
            .cart_items
            .values()
            .filter(|c| c.user_id == user_id)
            .map(|c| {
                let item = inner.items.get(&c.item_id).cloned().ok_or_else(|| {
                    StoreError::DataCorruption(format!("cart row {} references missing item", c.id))
                })?;
                Ok(CartLine {
                    cart_item: c.clone(),
                    item,
                })
            })
            .collect()
    }

    async fn create_order(&self, draft: &OrderDraft) -> Result<Order, StoreError> {
        let mut inner = self.inner.lock();
        inner.next_order += 1;
        let order = Order {
            id: OrderId::new(inner.next_order),
            user_id: draft.user_id,
            items: draft.items.clone(),
            total: draft.total,
            charge_id: draft.charge_id.clone(),
            created_at: Utc::now(),
        };
        inner.orders.insert(order.id, order.clone());
        inner.cart_items.retain(|_, c| c.user_id != draft.user_id);
        Ok(order)
    }

    async fn order_by_id(&self, id: OrderId) -> Result<Option<Order>, StoreError> {
        Ok(self.inner.lock().orders.get(&id).cloned())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::Duration;
    use threadline_core::Price;

    fn store() -> MemoryStore {
        MemoryStore::new()
    }

    async fn seed_user(store: &MemoryStore, email: &str) -> User {
        store
            .create_user(
                "Test User",
                &Email::parse(email).unwrap(),
                "$argon2id$fake",
                &PermissionSet::signup_default(),
            )
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn duplicate_email_conflicts() {
        let store = store();
        seed_user(&store, "a@example.com").await;
        let err = store
            .create_user(
                "Other",
                &Email::parse("a@example.com").unwrap(),
                "hash",
                &PermissionSet::signup_default(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
    }

    #[tokio::test]
    async fn upsert_creates_then_increments() {
        let store = store();
        let user = seed_user(&store, "a@example.com").await;
        let item = store
            .create_item(
                user.id,
                &ItemDraft {
                    title: "Jacket".into(),
                    description: String::new(),
                    price: Price::from_minor_units(1000).unwrap(),
                    image: None,
                },
            )
            .await
            .unwrap();

        let first = store.upsert_cart_item(user.id, item.id).await.unwrap();
        assert_eq!(first.quantity, 1);
        let second = store.upsert_cart_item(user.id, item.id).await.unwrap();
        assert_eq!(second.id, first.id);
        assert_eq!(second.quantity, 2);

        let cart = store.cart_for_user(user.id).await.unwrap();
        assert_eq!(cart.len(), 1);
    }

    #[tokio::test]
    async fn consume_reset_token_is_single_use() {
        let store = store();
        let user = seed_user(&store, "a@example.com").await;
        let expiry = Utc::now() + Duration::hours(1);
        store
            .set_reset_token(user.id, "token-1", expiry)
            .await
            .unwrap();

        let consumed = store
            .consume_reset_token("token-1", Utc::now(), "new-hash")
            .await
            .unwrap();
        assert!(consumed.is_some());

        let replayed = store
            .consume_reset_token("token-1", Utc::now(), "other-hash")
            .await
            .unwrap();
        assert!(replayed.is_none());
    }

    #[tokio::test]
    async fn consume_reset_token_respects_expiry_boundary() {
        let store = store();
        let user = seed_user(&store, "a@example.com").await;
        let expiry = Utc::now();
        store
            .set_reset_token(user.id, "token-1", expiry)
            .await
            .unwrap();

        // At the boundary the interval is closed: still valid
        let at_expiry = store
            .consume_reset_token("token-1", expiry, "new-hash")
            .await
            .unwrap();
        assert!(at_expiry.is_some());
    }

    #[tokio::test]
    async fn create_order_clears_cart() {
        let store = store();
        let user = seed_user(&store, "a@example.com").await;
        let item = store
            .create_item(
                user.id,
                &ItemDraft {
                    title: "Jacket".into(),
                    description: String::new(),
                    price: Price::from_minor_units(1000).unwrap(),
                    image: None,
                },
            )
            .await
            .unwrap();
        store.upsert_cart_item(user.id, item.id).await.unwrap();

        let order = store
            .create_order(&OrderDraft {
                user_id: user.id,
                items: vec![],
                total: Price::from_minor_units(1000).unwrap(),
                charge_id: "ch_test".into(),
            })
            .await
            .unwrap();
        assert_eq!(order.charge_id, "ch_test");
        assert!(store.cart_for_user(user.id).await.unwrap().is_empty());
    }
}
