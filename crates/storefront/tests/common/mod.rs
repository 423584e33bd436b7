//! Shared fixtures for the integration suite.
//!
//! Everything runs against `MemoryStore` plus scripted doubles for the two
//! external collaborators: a gateway that succeeds, declines or goes
//! ambiguous on command, and a mailer that records what it was asked to
//! send.

#![allow(dead_code)] // not every test file uses every fixture

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use secrecy::SecretString;

use threadline_core::{CartItemId, CurrencyCode, Email, ItemId, OrderId, PermissionSet, Price, UserId};

use threadline_storefront::config::{GatewayConfig, MailerConfig, StorefrontConfig};
use threadline_storefront::middleware::RequestContext;
use threadline_storefront::models::{CartItem, CartLine, Item, ItemDraft, ItemPatch, Order, OrderDraft, User};
use threadline_storefront::services::auth::AccountService;
use threadline_storefront::services::mailer::{Mailer, MailerError};
use threadline_storefront::services::payment::{Charge, PaymentError, PaymentGateway};
use threadline_storefront::state::AppState;
use threadline_storefront::store::memory::MemoryStore;
use threadline_storefront::store::{Store, StoreError};

/// What the scripted gateway should do with the next charge.
#[derive(Debug, Clone)]
pub enum GatewayScript {
    Succeed,
    Decline(String),
    Ambiguous(String),
}

/// A recorded charge attempt.
#[derive(Debug, Clone)]
pub struct ChargeAttempt {
    pub amount: Price,
    pub currency: CurrencyCode,
    pub token: String,
    pub idempotency_key: String,
}

/// Scripted payment gateway double.
pub struct TestGateway {
    script: Mutex<GatewayScript>,
    charges: Mutex<Vec<ChargeAttempt>>,
    counter: AtomicU32,
}

impl TestGateway {
    pub fn succeeding() -> Self {
        Self::scripted(GatewayScript::Succeed)
    }

    pub fn scripted(script: GatewayScript) -> Self {
        Self {
            script: Mutex::new(script),
            charges: Mutex::new(Vec::new()),
            counter: AtomicU32::new(0),
        }
    }

    pub fn set_script(&self, script: GatewayScript) {
        *self.script.lock() = script;
    }

    pub fn attempts(&self) -> Vec<ChargeAttempt> {
        self.charges.lock().clone()
    }
}

#[async_trait]
impl PaymentGateway for TestGateway {
    async fn charge(
        &self,
        amount: Price,
        currency: CurrencyCode,
        payment_token: &str,
        idempotency_key: &str,
    ) -> Result<Charge, PaymentError> {
        self.charges.lock().push(ChargeAttempt {
            amount,
            currency,
            token: payment_token.to_owned(),
            idempotency_key: idempotency_key.to_owned(),
        });

        match self.script.lock().clone() {
            GatewayScript::Succeed => {
                let n = self.counter.fetch_add(1, Ordering::SeqCst) + 1;
                Ok(Charge {
                    id: format!("ch_test_{n}"),
                    amount,
                })
            }
            GatewayScript::Decline(reason) => Err(PaymentError::Declined { reason }),
            GatewayScript::Ambiguous(reason) => Err(PaymentError::Ambiguous { reason }),
        }
    }
}

/// Mailer double that records every send.
#[derive(Default)]
pub struct RecordingMailer {
    pub sent: Mutex<Vec<(String, String)>>,
}

impl RecordingMailer {
    /// The reset token embedded in the most recent notification.
    pub fn last_token(&self) -> String {
        let sent = self.sent.lock();
        let (_, url) = sent.last().expect("no reset mail was sent");
        url.split("token=")
            .nth(1)
            .map(str::to_owned)
            .expect("reset url carries no token")
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send_password_reset(&self, to: &Email, reset_url: &str) -> Result<(), MailerError> {
        self.sent
            .lock()
            .push((to.as_str().to_owned(), reset_url.to_owned()));
        Ok(())
    }
}

/// Store wrapper whose `create_order` can be made to fail, for driving the
/// charge-succeeded-but-persistence-failed path. Everything else delegates.
pub struct OrderFailStore {
    pub inner: MemoryStore,
    pub fail_create_order: AtomicBool,
}

impl OrderFailStore {
    pub fn new() -> Self {
        Self {
            inner: MemoryStore::new(),
            fail_create_order: AtomicBool::new(false),
        }
    }
}

#[async_trait]
impl Store for OrderFailStore {
    async fn ping(&self) -> Result<(), StoreError> {
        self.inner.ping().await
    }

    async fn create_user(
        &self,
        name: &str,
        email: &Email,
        password_hash: &str,
        permissions: &PermissionSet,
    ) -> Result<User, StoreError> {
        self.inner
            .create_user(name, email, password_hash, permissions)
            .await
    }

    async fn user_by_id(&self, id: UserId) -> Result<Option<User>, StoreError> {
        self.inner.user_by_id(id).await
    }

    async fn user_by_email(&self, email: &Email) -> Result<Option<User>, StoreError> {
        self.inner.user_by_email(email).await
    }

    async fn password_hash_by_email(
        &self,
        email: &Email,
    ) -> Result<Option<(User, String)>, StoreError> {
        self.inner.password_hash_by_email(email).await
    }

    async fn set_reset_token(
        &self,
        user_id: UserId,
        token: &str,
        expiry: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        self.inner.set_reset_token(user_id, token, expiry).await
    }

    async fn consume_reset_token(
        &self,
        token: &str,
        now: DateTime<Utc>,
        new_password_hash: &str,
    ) -> Result<Option<User>, StoreError> {
        self.inner
            .consume_reset_token(token, now, new_password_hash)
            .await
    }

    async fn update_permissions(
        &self,
        user_id: UserId,
        permissions: &PermissionSet,
    ) -> Result<User, StoreError> {
        self.inner.update_permissions(user_id, permissions).await
    }

    async fn create_item(&self, owner: UserId, draft: &ItemDraft) -> Result<Item, StoreError> {
        self.inner.create_item(owner, draft).await
    }

    async fn item_by_id(&self, id: ItemId) -> Result<Option<Item>, StoreError> {
        self.inner.item_by_id(id).await
    }

    async fn update_item(&self, id: ItemId, patch: &ItemPatch) -> Result<Item, StoreError> {
        self.inner.update_item(id, patch).await
    }

    async fn delete_item(&self, id: ItemId) -> Result<(), StoreError> {
        self.inner.delete_item(id).await
    }

    async fn upsert_cart_item(
        &self,
        user_id: UserId,
        item_id: ItemId,
    ) -> Result<CartItem, StoreError> {
        self.inner.upsert_cart_item(user_id, item_id).await
    }

    async fn cart_item_by_id(&self, id: CartItemId) -> Result<Option<CartItem>, StoreError> {
        self.inner.cart_item_by_id(id).await
    }

    async fn delete_cart_item(&self, id: CartItemId) -> Result<(), StoreError> {
        self.inner.delete_cart_item(id).await
    }

    async fn cart_for_user(&self, user_id: UserId) -> Result<Vec<CartLine>, StoreError> {
        self.inner.cart_for_user(user_id).await
    }

    async fn create_order(&self, draft: &OrderDraft) -> Result<Order, StoreError> {
        if self.fail_create_order.load(Ordering::SeqCst) {
            return Err(StoreError::Database(sqlx::Error::PoolClosed));
        }
        self.inner.create_order(draft).await
    }

    async fn order_by_id(&self, id: OrderId) -> Result<Option<Order>, StoreError> {
        self.inner.order_by_id(id).await
    }
}

/// A config suitable for tests; nothing in it reaches the network.
pub fn test_config() -> StorefrontConfig {
    StorefrontConfig {
        database_url: SecretString::from("postgres://localhost/test"),
        host: "127.0.0.1".parse().expect("valid host"),
        port: 0,
        base_url: "http://localhost:3000".to_owned(),
        session_secret: SecretString::from("k9$Xp2!mQ7wR4#nT8vL1zB5&cF3*hJ6d"),
        gateway: GatewayConfig {
            secret_key: SecretString::from("sk_test_4eC39HqLyjWDarjtT1zdp7dc"),
            currency: CurrencyCode::USD,
        },
        mailer: Some(MailerConfig {
            api_url: "http://localhost:0/mail".to_owned(),
            api_key: SecretString::from("mk_9f8e7d6c5b4a39281706f5e4d3c2b1a0"),
        }),
        sentry_dsn: None,
    }
}

/// App state over a fresh `MemoryStore` and a succeeding gateway.
pub fn test_state() -> (AppState, Arc<MemoryStore>, Arc<TestGateway>, Arc<RecordingMailer>) {
    let store = Arc::new(MemoryStore::new());
    let gateway = Arc::new(TestGateway::succeeding());
    let mailer = Arc::new(RecordingMailer::default());
    let state = AppState::new(
        test_config(),
        store.clone(),
        gateway.clone(),
        mailer.clone(),
    );
    (state, store, gateway, mailer)
}

/// Sign up a user directly against the store and hand back a context.
pub async fn signed_up_user(store: &dyn Store, name: &str, email: &str) -> RequestContext {
    let service = AccountService::new(store);
    let user = service
        .signup(name, email, "a perfectly fine password")
        .await
        .expect("signup failed");
    RequestContext::for_user(user)
}

/// Create an item owned by the context's user.
pub async fn listed_item(store: &dyn Store, ctx: &RequestContext, title: &str, price: i64) -> Item {
    store
        .create_item(
            ctx.user.as_ref().expect("anonymous context").id,
            &ItemDraft {
                title: title.to_owned(),
                description: format!("{title} description"),
                price: Price::from_minor_units(price).expect("valid price"),
                image: None,
            },
        )
        .await
        .expect("item creation failed")
}

/// Grant a permission set directly in the store (bypasses authorization,
/// which is exactly what a fixture should do).
pub async fn grant_permissions(store: &dyn Store, ctx: &RequestContext, set: PermissionSet) -> RequestContext {
    let user = store
        .update_permissions(ctx.user.as_ref().expect("anonymous context").id, &set)
        .await
        .expect("permission grant failed");
    RequestContext::for_user(user)
}
