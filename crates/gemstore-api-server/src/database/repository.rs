use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use tracing::{debug, info};
use uuid::Uuid;

use super::{Category, DbPool, LedgerEntry, Product, Stone, Store, User, Vendor};
use crate::utils::error::ApiError;

pub struct Repository {
    pub pool: DbPool,
}

impl Repository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Ensure all tables and uniqueness constraints exist.
    ///
    /// The unique index on products.sku is the backstop that turns a lost
    /// allocation race into a retryable conflict instead of a duplicate SKU.
    pub async fn ensure_schema(&self) -> Result<(), ApiError> {
        let pool = self.pool.get_pool();

        sqlx::query(
            r#"CREATE TABLE IF NOT EXISTS users (
                id UUID PRIMARY KEY,
                username TEXT NOT NULL,
                password_hash TEXT NOT NULL,
                created_at TIMESTAMP WITH TIME ZONE NOT NULL DEFAULT NOW(),
                CONSTRAINT uq_users_username UNIQUE (username)
            )"#,
        )
        .execute(pool)
        .await?;

        sqlx::query(
            r#"CREATE TABLE IF NOT EXISTS vendors (
                id UUID PRIMARY KEY,
                first_name TEXT NOT NULL,
                last_name TEXT,
                status TEXT NOT NULL DEFAULT 'active',
                created_at TIMESTAMP WITH TIME ZONE NOT NULL DEFAULT NOW(),
                updated_at TIMESTAMP WITH TIME ZONE NOT NULL DEFAULT NOW()
            )"#,
        )
        .execute(pool)
        .await?;

        sqlx::query(
            r#"CREATE TABLE IF NOT EXISTS categories (
                id UUID PRIMARY KEY,
                name TEXT NOT NULL,
                description TEXT,
                created_at TIMESTAMP WITH TIME ZONE NOT NULL DEFAULT NOW(),
                updated_at TIMESTAMP WITH TIME ZONE NOT NULL DEFAULT NOW()
            )"#,
        )
        .execute(pool)
        .await?;

        sqlx::query(
            r#"CREATE TABLE IF NOT EXISTS stones (
                id UUID PRIMARY KEY,
                name TEXT NOT NULL,
                status TEXT NOT NULL DEFAULT 'active',
                created_at TIMESTAMP WITH TIME ZONE NOT NULL DEFAULT NOW(),
                updated_at TIMESTAMP WITH TIME ZONE NOT NULL DEFAULT NOW()
            )"#,
        )
        .execute(pool)
        .await?;

        sqlx::query(
            r#"CREATE TABLE IF NOT EXISTS stores (
                id UUID PRIMARY KEY,
                name TEXT NOT NULL,
                address TEXT NOT NULL,
                phone TEXT,
                status TEXT NOT NULL DEFAULT 'active',
                created_at TIMESTAMP WITH TIME ZONE NOT NULL DEFAULT NOW(),
                updated_at TIMESTAMP WITH TIME ZONE NOT NULL DEFAULT NOW()
            )"#,
        )
        .execute(pool)
        .await?;

        sqlx::query(
            r#"CREATE TABLE IF NOT EXISTS products (
                id UUID PRIMARY KEY,
                name TEXT NOT NULL,
                description TEXT NOT NULL DEFAULT '',
                price NUMERIC(12, 2) NOT NULL,
                quantity INT NOT NULL DEFAULT 0,
                category_id UUID NOT NULL REFERENCES categories(id),
                stone_id UUID REFERENCES stones(id),
                vendor_id UUID NOT NULL REFERENCES vendors(id),
                status TEXT NOT NULL DEFAULT 'active',
                images TEXT[] NOT NULL DEFAULT '{}',
                sku TEXT NOT NULL,
                created_at TIMESTAMP WITH TIME ZONE NOT NULL DEFAULT NOW(),
                updated_at TIMESTAMP WITH TIME ZONE NOT NULL DEFAULT NOW()
            )"#,
        )
        .execute(pool)
        .await?;

        sqlx::query(
            r#"CREATE UNIQUE INDEX IF NOT EXISTS uq_products_sku ON products(sku)"#,
        )
        .execute(pool)
        .await?;

        sqlx::query(
            r#"CREATE TABLE IF NOT EXISTS ledger_entries (
                id UUID PRIMARY KEY,
                name TEXT NOT NULL,
                amount NUMERIC(14, 2) NOT NULL,
                entry_date TIMESTAMP WITH TIME ZONE NOT NULL,
                created_at TIMESTAMP WITH TIME ZONE NOT NULL DEFAULT NOW()
            )"#,
        )
        .execute(pool)
        .await?;

        sqlx::query(
            r#"CREATE TABLE IF NOT EXISTS audit_logs (
                id BIGSERIAL PRIMARY KEY,
                actor_id UUID,
                action TEXT NOT NULL,
                entity TEXT NOT NULL,
                entity_id TEXT,
                status TEXT NOT NULL,
                detail TEXT,
                created_at TIMESTAMP WITH TIME ZONE NOT NULL
            )"#,
        )
        .execute(pool)
        .await?;

        info!("Database schema ensured");
        Ok(())
    }

    // ============ USERS ============

    pub async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, ApiError> {
        let user = sqlx::query_as::<_, User>(
            r#"SELECT id, username, password_hash, created_at
               FROM users
               WHERE LOWER(username) = LOWER($1)"#,
        )
        .bind(username)
        .fetch_optional(self.pool.get_pool())
        .await?;

        Ok(user)
    }

    pub async fn find_user(&self, id: Uuid) -> Result<Option<User>, ApiError> {
        let user = sqlx::query_as::<_, User>(
            r#"SELECT id, username, password_hash, created_at FROM users WHERE id = $1"#,
        )
        .bind(id)
        .fetch_optional(self.pool.get_pool())
        .await?;

        Ok(user)
    }

    pub async fn create_user(&self, username: &str, password_hash: &str) -> Result<User, ApiError> {
        let user = sqlx::query_as::<_, User>(
            r#"INSERT INTO users (id, username, password_hash)
               VALUES ($1, $2, $3)
               RETURNING id, username, password_hash, created_at"#,
        )
        .bind(Uuid::new_v4())
        .bind(username)
        .bind(password_hash)
        .fetch_one(self.pool.get_pool())
        .await
        .map_err(|e| match &e {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                ApiError::Conflict(format!("Username already exists: {}", username))
            }
            _ => e.into(),
        })?;

        info!("User created: {}", user.username);
        Ok(user)
    }

    // ============ VENDORS ============

    pub async fn list_vendors(&self) -> Result<Vec<Vendor>, ApiError> {
        let vendors = sqlx::query_as::<_, Vendor>(
            r#"SELECT id, first_name, last_name, status, created_at, updated_at
               FROM vendors
               ORDER BY created_at DESC"#,
        )
        .fetch_all(self.pool.get_pool())
        .await?;

        Ok(vendors)
    }

    pub async fn find_vendor(&self, id: Uuid) -> Result<Option<Vendor>, ApiError> {
        let vendor = sqlx::query_as::<_, Vendor>(
            r#"SELECT id, first_name, last_name, status, created_at, updated_at
               FROM vendors
               WHERE id = $1"#,
        )
        .bind(id)
        .fetch_optional(self.pool.get_pool())
        .await?;

        Ok(vendor)
    }

    pub async fn create_vendor(
        &self,
        first_name: &str,
        last_name: Option<&str>,
        status: &str,
    ) -> Result<Vendor, ApiError> {
        let vendor = sqlx::query_as::<_, Vendor>(
            r#"INSERT INTO vendors (id, first_name, last_name, status)
               VALUES ($1, $2, $3, $4)
               RETURNING id, first_name, last_name, status, created_at, updated_at"#,
        )
        .bind(Uuid::new_v4())
        .bind(first_name)
        .bind(last_name)
        .bind(status)
        .fetch_one(self.pool.get_pool())
        .await?;

        Ok(vendor)
    }

    pub async fn update_vendor(
        &self,
        id: Uuid,
        first_name: &str,
        last_name: Option<&str>,
        status: &str,
    ) -> Result<Vendor, ApiError> {
        let vendor = sqlx::query_as::<_, Vendor>(
            r#"UPDATE vendors
               SET first_name = $2, last_name = $3, status = $4, updated_at = NOW()
               WHERE id = $1
               RETURNING id, first_name, last_name, status, created_at, updated_at"#,
        )
        .bind(id)
        .bind(first_name)
        .bind(last_name)
        .bind(status)
        .fetch_one(self.pool.get_pool())
        .await?;

        Ok(vendor)
    }

    pub async fn set_vendor_status(&self, id: Uuid, status: &str) -> Result<Vendor, ApiError> {
        let vendor = sqlx::query_as::<_, Vendor>(
            r#"UPDATE vendors
               SET status = $2, updated_at = NOW()
               WHERE id = $1
               RETURNING id, first_name, last_name, status, created_at, updated_at"#,
        )
        .bind(id)
        .bind(status)
        .fetch_one(self.pool.get_pool())
        .await?;

        Ok(vendor)
    }

    // ============ PRODUCTS ============

    pub async fn list_products(&self) -> Result<Vec<Product>, ApiError> {
        let products = sqlx::query_as::<_, Product>(
            r#"SELECT id, name, description, price, quantity, category_id, stone_id,
                      vendor_id, status, images, sku, created_at, updated_at
               FROM products
               ORDER BY created_at DESC"#,
        )
        .fetch_all(self.pool.get_pool())
        .await?;

        Ok(products)
    }

    pub async fn find_product(&self, id: Uuid) -> Result<Option<Product>, ApiError> {
        let product = sqlx::query_as::<_, Product>(
            r#"SELECT id, name, description, price, quantity, category_id, stone_id,
                      vendor_id, status, images, sku, created_at, updated_at
               FROM products
               WHERE id = $1"#,
        )
        .bind(id)
        .fetch_optional(self.pool.get_pool())
        .await?;

        Ok(product)
    }

    /// Highest existing SKU for a prefix, by the reference's lexicographic
    /// descending sort over `^<prefix>\d{4}$` matches.
    pub async fn find_latest_sku(&self, pattern: &str) -> Result<Option<String>, ApiError> {
        let sku = sqlx::query_scalar::<_, String>(
            r#"SELECT sku FROM products WHERE sku ~ $1 ORDER BY sku DESC LIMIT 1"#,
        )
        .bind(pattern)
        .fetch_optional(self.pool.get_pool())
        .await?;

        debug!("Latest SKU for pattern {}: {:?}", pattern, sku);
        Ok(sku)
    }

    pub async fn insert_product(&self, product: &Product) -> Result<Product, ApiError> {
        let inserted = sqlx::query_as::<_, Product>(
            r#"INSERT INTO products (
                id, name, description, price, quantity, category_id, stone_id,
                vendor_id, status, images, sku, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            RETURNING id, name, description, price, quantity, category_id, stone_id,
                      vendor_id, status, images, sku, created_at, updated_at"#,
        )
        .bind(product.id)
        .bind(&product.name)
        .bind(&product.description)
        .bind(product.price)
        .bind(product.quantity)
        .bind(product.category_id)
        .bind(product.stone_id)
        .bind(product.vendor_id)
        .bind(&product.status)
        .bind(&product.images)
        .bind(&product.sku)
        .bind(product.created_at)
        .bind(product.updated_at)
        .fetch_one(self.pool.get_pool())
        .await
        .map_err(|e| match &e {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                ApiError::Conflict(format!("Duplicate SKU: {}", product.sku))
            }
            _ => e.into(),
        })?;

        Ok(inserted)
    }

    /// Full-row update. The SKU column is deliberately absent: once
    /// assigned it is never rewritten.
    pub async fn update_product(&self, product: &Product) -> Result<Product, ApiError> {
        let updated = sqlx::query_as::<_, Product>(
            r#"UPDATE products
               SET name = $2, description = $3, price = $4, quantity = $5,
                   category_id = $6, stone_id = $7, vendor_id = $8, status = $9,
                   images = $10, updated_at = NOW()
               WHERE id = $1
               RETURNING id, name, description, price, quantity, category_id, stone_id,
                         vendor_id, status, images, sku, created_at, updated_at"#,
        )
        .bind(product.id)
        .bind(&product.name)
        .bind(&product.description)
        .bind(product.price)
        .bind(product.quantity)
        .bind(product.category_id)
        .bind(product.stone_id)
        .bind(product.vendor_id)
        .bind(&product.status)
        .bind(&product.images)
        .fetch_one(self.pool.get_pool())
        .await?;

        Ok(updated)
    }

    pub async fn delete_product(&self, id: Uuid) -> Result<bool, ApiError> {
        let result = sqlx::query(r#"DELETE FROM products WHERE id = $1"#)
            .bind(id)
            .execute(self.pool.get_pool())
            .await?;

        Ok(result.rows_affected() > 0)
    }

    // ============ STONES ============

    pub async fn list_stones(&self) -> Result<Vec<Stone>, ApiError> {
        let stones = sqlx::query_as::<_, Stone>(
            r#"SELECT id, name, status, created_at, updated_at
               FROM stones
               ORDER BY name ASC"#,
        )
        .fetch_all(self.pool.get_pool())
        .await?;

        Ok(stones)
    }

    pub async fn find_stone(&self, id: Uuid) -> Result<Option<Stone>, ApiError> {
        let stone = sqlx::query_as::<_, Stone>(
            r#"SELECT id, name, status, created_at, updated_at FROM stones WHERE id = $1"#,
        )
        .bind(id)
        .fetch_optional(self.pool.get_pool())
        .await?;

        Ok(stone)
    }

    pub async fn create_stone(&self, name: &str, status: &str) -> Result<Stone, ApiError> {
        let stone = sqlx::query_as::<_, Stone>(
            r#"INSERT INTO stones (id, name, status)
               VALUES ($1, $2, $3)
               RETURNING id, name, status, created_at, updated_at"#,
        )
        .bind(Uuid::new_v4())
        .bind(name)
        .bind(status)
        .fetch_one(self.pool.get_pool())
        .await?;

        Ok(stone)
    }

    pub async fn update_stone(&self, id: Uuid, name: &str, status: &str) -> Result<Stone, ApiError> {
        let stone = sqlx::query_as::<_, Stone>(
            r#"UPDATE stones
               SET name = $2, status = $3, updated_at = NOW()
               WHERE id = $1
               RETURNING id, name, status, created_at, updated_at"#,
        )
        .bind(id)
        .bind(name)
        .bind(status)
        .fetch_one(self.pool.get_pool())
        .await?;

        Ok(stone)
    }

    pub async fn delete_stone(&self, id: Uuid) -> Result<bool, ApiError> {
        let result = sqlx::query(r#"DELETE FROM stones WHERE id = $1"#)
            .bind(id)
            .execute(self.pool.get_pool())
            .await?;

        Ok(result.rows_affected() > 0)
    }

    // ============ CATEGORIES ============

    pub async fn list_categories(&self) -> Result<Vec<Category>, ApiError> {
        let categories = sqlx::query_as::<_, Category>(
            r#"SELECT id, name, description, created_at, updated_at
               FROM categories
               ORDER BY name ASC"#,
        )
        .fetch_all(self.pool.get_pool())
        .await?;

        Ok(categories)
    }

    pub async fn find_category(&self, id: Uuid) -> Result<Option<Category>, ApiError> {
        let category = sqlx::query_as::<_, Category>(
            r#"SELECT id, name, description, created_at, updated_at
               FROM categories
               WHERE id = $1"#,
        )
        .bind(id)
        .fetch_optional(self.pool.get_pool())
        .await?;

        Ok(category)
    }

    pub async fn create_category(
        &self,
        name: &str,
        description: Option<&str>,
    ) -> Result<Category, ApiError> {
        let category = sqlx::query_as::<_, Category>(
            r#"INSERT INTO categories (id, name, description)
               VALUES ($1, $2, $3)
               RETURNING id, name, description, created_at, updated_at"#,
        )
        .bind(Uuid::new_v4())
        .bind(name)
        .bind(description)
        .fetch_one(self.pool.get_pool())
        .await?;

        Ok(category)
    }

    pub async fn update_category(
        &self,
        id: Uuid,
        name: &str,
        description: Option<&str>,
    ) -> Result<Category, ApiError> {
        let category = sqlx::query_as::<_, Category>(
            r#"UPDATE categories
               SET name = $2, description = $3, updated_at = NOW()
               WHERE id = $1
               RETURNING id, name, description, created_at, updated_at"#,
        )
        .bind(id)
        .bind(name)
        .bind(description)
        .fetch_one(self.pool.get_pool())
        .await?;

        Ok(category)
    }

    pub async fn delete_category(&self, id: Uuid) -> Result<bool, ApiError> {
        let result = sqlx::query(r#"DELETE FROM categories WHERE id = $1"#)
            .bind(id)
            .execute(self.pool.get_pool())
            .await?;

        Ok(result.rows_affected() > 0)
    }

    // ============ STORES ============

    pub async fn list_stores(&self) -> Result<Vec<Store>, ApiError> {
        let stores = sqlx::query_as::<_, Store>(
            r#"SELECT id, name, address, phone, status, created_at, updated_at
               FROM stores
               ORDER BY name ASC"#,
        )
        .fetch_all(self.pool.get_pool())
        .await?;

        Ok(stores)
    }

    pub async fn find_store(&self, id: Uuid) -> Result<Option<Store>, ApiError> {
        let store = sqlx::query_as::<_, Store>(
            r#"SELECT id, name, address, phone, status, created_at, updated_at
               FROM stores
               WHERE id = $1"#,
        )
        .bind(id)
        .fetch_optional(self.pool.get_pool())
        .await?;

        Ok(store)
    }

    pub async fn create_store(
        &self,
        name: &str,
        address: &str,
        phone: Option<&str>,
        status: &str,
    ) -> Result<Store, ApiError> {
        let store = sqlx::query_as::<_, Store>(
            r#"INSERT INTO stores (id, name, address, phone, status)
               VALUES ($1, $2, $3, $4, $5)
               RETURNING id, name, address, phone, status, created_at, updated_at"#,
        )
        .bind(Uuid::new_v4())
        .bind(name)
        .bind(address)
        .bind(phone)
        .bind(status)
        .fetch_one(self.pool.get_pool())
        .await?;

        Ok(store)
    }

    pub async fn update_store(
        &self,
        id: Uuid,
        name: &str,
        address: &str,
        phone: Option<&str>,
        status: &str,
    ) -> Result<Store, ApiError> {
        let store = sqlx::query_as::<_, Store>(
            r#"UPDATE stores
               SET name = $2, address = $3, phone = $4, status = $5, updated_at = NOW()
               WHERE id = $1
               RETURNING id, name, address, phone, status, created_at, updated_at"#,
        )
        .bind(id)
        .bind(name)
        .bind(address)
        .bind(phone)
        .bind(status)
        .fetch_one(self.pool.get_pool())
        .await?;

        Ok(store)
    }

    pub async fn delete_store(&self, id: Uuid) -> Result<bool, ApiError> {
        let result = sqlx::query(r#"DELETE FROM stores WHERE id = $1"#)
            .bind(id)
            .execute(self.pool.get_pool())
            .await?;

        Ok(result.rows_affected() > 0)
    }

    // ============ LEDGER ============

    pub async fn list_ledger_entries(&self) -> Result<Vec<LedgerEntry>, ApiError> {
        let entries = sqlx::query_as::<_, LedgerEntry>(
            r#"SELECT id, name, amount, entry_date, created_at
               FROM ledger_entries
               ORDER BY entry_date DESC"#,
        )
        .fetch_all(self.pool.get_pool())
        .await?;

        Ok(entries)
    }

    pub async fn find_ledger_entry(&self, id: Uuid) -> Result<Option<LedgerEntry>, ApiError> {
        let entry = sqlx::query_as::<_, LedgerEntry>(
            r#"SELECT id, name, amount, entry_date, created_at
               FROM ledger_entries
               WHERE id = $1"#,
        )
        .bind(id)
        .fetch_optional(self.pool.get_pool())
        .await?;

        Ok(entry)
    }

    pub async fn insert_ledger_entry(
        &self,
        name: &str,
        amount: Decimal,
        entry_date: DateTime<Utc>,
    ) -> Result<LedgerEntry, ApiError> {
        let entry = sqlx::query_as::<_, LedgerEntry>(
            r#"INSERT INTO ledger_entries (id, name, amount, entry_date)
               VALUES ($1, $2, $3, $4)
               RETURNING id, name, amount, entry_date, created_at"#,
        )
        .bind(Uuid::new_v4())
        .bind(name)
        .bind(amount)
        .bind(entry_date)
        .fetch_one(self.pool.get_pool())
        .await?;

        Ok(entry)
    }

    pub async fn update_ledger_entry(
        &self,
        id: Uuid,
        name: &str,
        amount: Decimal,
        entry_date: DateTime<Utc>,
    ) -> Result<LedgerEntry, ApiError> {
        let entry = sqlx::query_as::<_, LedgerEntry>(
            r#"UPDATE ledger_entries
               SET name = $2, amount = $3, entry_date = $4
               WHERE id = $1
               RETURNING id, name, amount, entry_date, created_at"#,
        )
        .bind(id)
        .bind(name)
        .bind(amount)
        .bind(entry_date)
        .fetch_one(self.pool.get_pool())
        .await?;

        Ok(entry)
    }

    pub async fn delete_ledger_entry(&self, id: Uuid) -> Result<bool, ApiError> {
        let result = sqlx::query(r#"DELETE FROM ledger_entries WHERE id = $1"#)
            .bind(id)
            .execute(self.pool.get_pool())
            .await?;

        Ok(result.rows_affected() > 0)
    }

    // ============ DASHBOARD ============

    pub async fn count_table(&self, table: &str) -> Result<i64, ApiError> {
        // Table names come from a fixed internal list, never from input.
        let count = sqlx::query_scalar::<_, i64>(&format!("SELECT COUNT(*) FROM {}", table))
            .fetch_one(self.pool.get_pool())
            .await?;

        Ok(count)
    }

    pub async fn ledger_total(&self) -> Result<Decimal, ApiError> {
        let total = sqlx::query_scalar::<_, Decimal>(
            r#"SELECT COALESCE(SUM(amount), 0) FROM ledger_entries"#,
        )
        .fetch_one(self.pool.get_pool())
        .await?;

        Ok(total)
    }
}
