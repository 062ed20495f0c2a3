use thiserror::Error;

use crate::db_types::Order;

/// The `OrderStore` trait defines the behaviour of the relational home of order aggregates.
///
/// Implementations must give the following guarantees:
/// * [`upsert_order`](OrderStore::upsert_order) is atomic. Either the order root and all of its present sub-entities
///   are committed, or nothing is.
/// * Upserts replace. After an upsert, the store holds exactly the delivery, payment and items of the upserted
///   aggregate, with nothing left over from earlier versions.
/// * Readers never observe a partially written aggregate.
#[allow(async_fn_in_trait)]
pub trait OrderStore: Clone {
    /// Persists the order aggregate in a single transaction, replacing any existing version with the same
    /// `order_uid`. The aggregate is expected to be normalized already (see [`Order::normalize`]).
    async fn upsert_order(&self, order: &Order) -> Result<(), OrderStoreError>;

    /// Fetches the full aggregate for the given identifier. Returns `None` if there is no such order.
    async fn fetch_order(&self, order_uid: &str) -> Result<Option<Order>, OrderStoreError>;

    /// Returns a snapshot of every known order identifier. Orders upserted while the snapshot is being taken may or
    /// may not be included.
    async fn fetch_all_order_uids(&self) -> Result<Vec<String>, OrderStoreError>;

    /// Closes the underlying connections.
    async fn close(&mut self) -> Result<(), OrderStoreError> {
        Ok(())
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum OrderStoreError {
    #[error("We have an internal database engine (configuration/uptime etc.) error: {0}")]
    DatabaseError(String),
    #[error("The order violates a database constraint: {0}")]
    ConstraintViolation(String),
    #[error("Could not apply database migrations: {0}")]
    MigrationError(String),
}

impl From<sqlx::Error> for OrderStoreError {
    fn from(e: sqlx::Error) -> Self {
        use sqlx::error::ErrorKind;
        match e.as_database_error().map(|db| db.kind()) {
            Some(ErrorKind::UniqueViolation) |
            Some(ErrorKind::ForeignKeyViolation) |
            Some(ErrorKind::NotNullViolation) |
            Some(ErrorKind::CheckViolation) => OrderStoreError::ConstraintViolation(e.to_string()),
            _ => OrderStoreError::DatabaseError(e.to_string()),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for OrderStoreError {
    fn from(e: sqlx::migrate::MigrateError) -> Self {
        OrderStoreError::MigrationError(e.to_string())
    }
}
