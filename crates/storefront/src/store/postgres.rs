//! `PostgreSQL` store implementation.
//!
//! Queries are runtime-checked sqlx with manual row mapping into domain
//! types. The two conditional primitives are expressed in SQL so their
//! atomicity comes from the database:
//!
//! - cart upsert: `INSERT .. ON CONFLICT (user_id, item_id) DO UPDATE SET
//!   quantity = cart_items.quantity + 1 RETURNING ..`
//! - reset consumption: `UPDATE .. WHERE reset_token = $1 AND
//!   reset_token_expiry >= $2` (zero rows affected means the token lost)

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};

use threadline_core::{CartItemId, Email, ItemId, OrderId, PermissionSet, Price, UserId};

use super::{Store, StoreError};
use crate::models::{CartItem, CartLine, Item, ItemDraft, ItemPatch, Order, OrderDraft, User};

/// `PostgreSQL`-backed [`Store`].
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Wrap a connection pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Run embedded migrations.
    ///
    /// # Errors
    ///
    /// Returns `MigrateError` if a migration fails to apply.
    pub async fn migrate(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await
    }
}

// =============================================================================
// Row mapping
// =============================================================================

fn map_user(row: &PgRow) -> Result<User, StoreError> {
    let email: String = row.try_get("email")?;
    let email = Email::parse(&email)
        .map_err(|e| StoreError::DataCorruption(format!("invalid email in database: {e}")))?;
    let tags: Vec<String> = row.try_get("permissions")?;
    let permissions = PermissionSet::from_strings(&tags)
        .map_err(|e| StoreError::DataCorruption(format!("invalid permission tag: {e}")))?;

    Ok(User {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        email,
        permissions,
        created_at: row.try_get("created_at")?,
    })
}

fn map_item(row: &PgRow) -> Result<Item, StoreError> {
    Ok(Item {
        id: row.try_get("id")?,
        title: row.try_get("title")?,
        description: row.try_get("description")?,
        price: row.try_get("price")?,
        image: row.try_get("image")?,
        owner: row.try_get("owner")?,
        created_at: row.try_get("created_at")?,
    })
}

fn map_cart_item(row: &PgRow) -> Result<CartItem, StoreError> {
    Ok(CartItem {
        id: row.try_get("id")?,
        user_id: row.try_get("user_id")?,
        item_id: row.try_get("item_id")?,
        quantity: row.try_get("quantity")?,
    })
}

const USER_COLUMNS: &str = "id, name, email, permissions, created_at";

#[async_trait]
impl Store for PgStore {
    async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").fetch_one(&self.pool).await?;
        Ok(())
    }

    async fn create_user(
        &self,
        name: &str,
        email: &Email,
        password_hash: &str,
        permissions: &PermissionSet,
    ) -> Result<User, StoreError> {
        let row = sqlx::query(&format!(
            "INSERT INTO users (name, email, password_hash, permissions)
             VALUES ($1, $2, $3, $4)
             RETURNING {USER_COLUMNS}"
        ))
        .bind(name)
        .bind(email)
        .bind(password_hash)
        .bind(permissions.to_strings())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(ref db_err) = e
                && db_err.is_unique_violation()
            {
                return StoreError::Conflict("email already exists".to_owned());
            }
            StoreError::Database(e)
        })?;

        map_user(&row)
    }

    async fn user_by_id(&self, id: UserId) -> Result<Option<User>, StoreError> {
        let row = sqlx::query(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(map_user).transpose()
    }

    async fn user_by_email(&self, email: &Email) -> Result<Option<User>, StoreError> {
        let row = sqlx::query(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(map_user).transpose()
    }

    async fn password_hash_by_email(
        &self,
        email: &Email,
    ) -> Result<Option<(User, String)>, StoreError> {
        let row = sqlx::query(&format!(
            "SELECT {USER_COLUMNS}, password_hash FROM users WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };
        let user = map_user(&row)?;
        let password_hash: String = row.try_get("password_hash")?;
        Ok(Some((user, password_hash)))
    }

    async fn set_reset_token(
        &self,
        user_id: UserId,
        token: &str,
        expiry: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let result = sqlx::query(
            "UPDATE users SET reset_token = $1, reset_token_expiry = $2 WHERE id = $3",
        )
        .bind(token)
        .bind(expiry)
        .bind(user_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    async fn consume_reset_token(
        &self,
        token: &str,
        now: DateTime<Utc>,
        new_password_hash: &str,
    ) -> Result<Option<User>, StoreError> {
        // Compare-and-clear: the WHERE clause makes concurrent consumers of
        // the same token race for a single matched row.
        let row = sqlx::query(&format!(
            "UPDATE users
             SET password_hash = $1, reset_token = NULL, reset_token_expiry = NULL
             WHERE reset_token = $2 AND reset_token_expiry >= $3
             RETURNING {USER_COLUMNS}"
        ))
        .bind(new_password_hash)
        .bind(token)
        .bind(now)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(map_user).transpose()
    }

    async fn update_permissions(
        &self,
        user_id: UserId,
        permissions: &PermissionSet,
    ) -> Result<User, StoreError> {
        let row = sqlx::query(&format!(
            "UPDATE users SET permissions = $1 WHERE id = $2 RETURNING {USER_COLUMNS}"
        ))
        .bind(permissions.to_strings())
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(map_user).transpose()?.ok_or(StoreError::NotFound)
    }

    async fn create_item(&self, owner: UserId, draft: &ItemDraft) -> Result<Item, StoreError> {
        let row = sqlx::query(
            "INSERT INTO items (title, description, price, image, owner)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING id, title, description, price, image, owner, created_at",
        )
        .bind(&draft.title)
        .bind(&draft.description)
        .bind(draft.price)
        .bind(&draft.image)
        .bind(owner)
        .fetch_one(&self.pool)
        .await?;

        map_item(&row)
    }

    async fn item_by_id(&self, id: ItemId) -> Result<Option<Item>, StoreError> {
        let row = sqlx::query(
            "SELECT id, title, description, price, image, owner, created_at
             FROM items WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(map_item).transpose()
    }

    async fn update_item(&self, id: ItemId, patch: &ItemPatch) -> Result<Item, StoreError> {
        let row = sqlx::query(
            "UPDATE items
             SET title = COALESCE($1, title),
                 description = COALESCE($2, description),
                 price = COALESCE($3, price),
                 image = COALESCE($4, image)
             WHERE id = $5
             RETURNING id, title, description, price, image, owner, created_at",
        )
        .bind(&patch.title)
        .bind(&patch.description)
        .bind(patch.price)
        .bind(&patch.image)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(map_item).transpose()?.ok_or(StoreError::NotFound)
    }

    async fn delete_item(&self, id: ItemId) -> Result<(), StoreError> {
        let result = sqlx::query("DELETE FROM items WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    async fn upsert_cart_item(
        &self,
        user_id: UserId,
        item_id: ItemId,
    ) -> Result<CartItem, StoreError> {
        // Atomic create-or-increment; the unique (user_id, item_id) constraint
        // routes concurrent inserts into the DO UPDATE arm.
        let row = sqlx::query(
            "INSERT INTO cart_items (user_id, item_id, quantity)
             VALUES ($1, $2, 1)
             ON CONFLICT (user_id, item_id)
             DO UPDATE SET quantity = cart_items.quantity + 1
             RETURNING id, user_id, item_id, quantity",
        )
        .bind(user_id)
        .bind(item_id)
        .fetch_one(&self.pool)
        .await?;

        map_cart_item(&row)
    }

    async fn cart_item_by_id(&self, id: CartItemId) -> Result<Option<CartItem>, StoreError> {
        let row = sqlx::query("SELECT id, user_id, item_id, quantity FROM cart_items WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(map_cart_item).transpose()
    }

    async fn delete_cart_item(&self, id: CartItemId) -> Result<(), StoreError> {
        let result = sqlx::query("DELETE FROM cart_items WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    async fn cart_for_user(&self, user_id: UserId) -> Result<Vec<CartLine>, StoreError> {
        let rows = sqlx::query(
            "SELECT c.id AS cart_id, c.user_id, c.item_id, c.quantity,
                    i.id, i.title, i.description, i.price, i.image, i.owner, i.created_at
             FROM cart_items c
             JOIN items i ON i.id = c.item_id
             WHERE c.user_id = $1
             ORDER BY c.id",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| {
                let cart_item = CartItem {
                    id: row.try_get("cart_id")?,
                    user_id: row.try_get("user_id")?,
                    item_id: row.try_get("item_id")?,
                    quantity: row.try_get("quantity")?,
                };
                let item = map_item(row)?;
                Ok(CartLine { cart_item, item })
            })
            .collect()
    }

    async fn create_order(&self, draft: &OrderDraft) -> Result<Order, StoreError> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query(
            "INSERT INTO orders (user_id, total, charge_id)
             VALUES ($1, $2, $3)
             RETURNING id, created_at",
        )
        .bind(draft.user_id)
        .bind(draft.total)
        .bind(&draft.charge_id)
        .fetch_one(&mut *tx)
        .await?;

        let order_id: OrderId = row.try_get("id")?;
        let created_at: DateTime<Utc> = row.try_get("created_at")?;

        for item in &draft.items {
            sqlx::query(
                "INSERT INTO order_items (order_id, item_id, title, description, image, price, quantity)
                 VALUES ($1, $2, $3, $4, $5, $6, $7)",
            )
            .bind(order_id)
            .bind(item.item_id)
            .bind(&item.title)
            .bind(&item.description)
            .bind(&item.image)
            .bind(item.price)
            .bind(item.quantity)
            .execute(&mut *tx)
            .await?;
        }

        sqlx::query("DELETE FROM cart_items WHERE user_id = $1")
            .bind(draft.user_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(Order {
            id: order_id,
            user_id: draft.user_id,
            items: draft.items.clone(),
            total: draft.total,
            charge_id: draft.charge_id.clone(),
            created_at,
        })
    }

    async fn order_by_id(&self, id: OrderId) -> Result<Option<Order>, StoreError> {
        let row = sqlx::query(
            "SELECT id, user_id, total, charge_id, created_at FROM orders WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let item_rows = sqlx::query(
            "SELECT item_id, title, description, image, price, quantity
             FROM order_items WHERE order_id = $1 ORDER BY id",
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await?;

        let items = item_rows
            .iter()
            .map(|r| {
                Ok(crate::models::OrderItem {
                    item_id: r.try_get("item_id")?,
                    title: r.try_get("title")?,
                    description: r.try_get("description")?,
                    image: r.try_get("image")?,
                    price: r.try_get::<Price, _>("price")?,
                    quantity: r.try_get("quantity")?,
                })
            })
            .collect::<Result<Vec<_>, StoreError>>()?;

        Ok(Some(Order {
            id: row.try_get("id")?,
            user_id: row.try_get("user_id")?,
            items,
            total: row.try_get("total")?,
            charge_id: row.try_get("charge_id")?,
            created_at: row.try_get("created_at")?,
        }))
    }
}
