//! `SqliteDatabase` is the concrete, SQLite-backed implementation of [`OrderStore`].
use std::fmt::Debug;

use log::*;
use sqlx::SqlitePool;

use super::{db_url, new_pool, orders, run_migrations};
use crate::{
    db_types::Order,
    traits::{OrderStore, OrderStoreError},
};

#[derive(Clone)]
pub struct SqliteDatabase {
    url: String,
    pool: SqlitePool,
}

impl Debug for SqliteDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "SqliteDatabase ({:?})", self.pool)
    }
}

impl OrderStore for SqliteDatabase {
    /// Takes a normalized order aggregate, and in a single atomic transaction,
    /// * inserts the order root, or overwrites every column of the existing root with the same `order_uid`,
    /// * removes whatever delivery, payment and item rows the previous version of the order had,
    /// * inserts the delivery, payment and items of this version.
    ///
    /// If any statement fails the transaction is rolled back when it is dropped, and nothing is written.
    async fn upsert_order(&self, order: &Order) -> Result<(), OrderStoreError> {
        let mut tx = self.pool.begin().await?;
        orders::upsert_order(order, &mut tx).await?;
        tx.commit().await?;
        debug!("🗃️ Order {} has been saved in the DB", order.order_uid);
        Ok(())
    }

    async fn fetch_order(&self, order_uid: &str) -> Result<Option<Order>, OrderStoreError> {
        let mut tx = self.pool.begin().await?;
        let order = orders::fetch_order_by_uid(order_uid, &mut tx).await?;
        tx.commit().await?;
        Ok(order)
    }

    async fn fetch_all_order_uids(&self) -> Result<Vec<String>, OrderStoreError> {
        let mut conn = self.pool.acquire().await?;
        orders::fetch_all_order_uids(&mut conn).await
    }

    async fn close(&mut self) -> Result<(), OrderStoreError> {
        self.pool.close().await;
        Ok(())
    }
}

impl SqliteDatabase {
    /// Creates a new database API object using the url in `ORDERS_DATABASE_URL`.
    pub async fn new(max_connections: u32) -> Result<Self, OrderStoreError> {
        let url = db_url();
        SqliteDatabase::new_with_url(url.as_str(), max_connections).await
    }

    pub async fn new_with_url(url: &str, max_connections: u32) -> Result<Self, OrderStoreError> {
        trace!("🗃️ Creating new database connection pool with url {url}");
        let pool = new_pool(url, max_connections).await?;
        let url = url.to_string();
        Ok(Self { url, pool })
    }

    /// The URL of the database
    pub fn url(&self) -> &str {
        self.url.as_str()
    }

    /// Returns a reference to the database connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Applies any outstanding schema migrations.
    pub async fn migrate(&self) -> Result<(), OrderStoreError> {
        run_migrations(&self.pool).await
    }

    /// The number of item rows attached to the given order.
    pub async fn item_count(&self, order_uid: &str) -> Result<i64, OrderStoreError> {
        let mut conn = self.pool.acquire().await?;
        orders::count_items(order_uid, &mut conn).await
    }
}
