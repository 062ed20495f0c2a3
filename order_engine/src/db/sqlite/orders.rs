use chrono::{DateTime, Utc};
use log::trace;
use sqlx::{FromRow, QueryBuilder, Sqlite, SqliteConnection};

use crate::{
    db_types::{Delivery, Item, Order, Payment},
    traits::OrderStoreError,
};

// SQLite caps the number of bound parameters per statement, so items are inserted in batches.
const ITEM_BATCH_SIZE: usize = 64;

#[derive(Debug, Clone, FromRow)]
struct OrderRow {
    order_uid: String,
    track_number: String,
    entry: String,
    locale: String,
    internal_signature: String,
    customer_id: String,
    delivery_service: String,
    shardkey: String,
    sm_id: i64,
    date_created: String,
    oof_shard: String,
}

impl From<OrderRow> for Order {
    fn from(row: OrderRow) -> Self {
        Self {
            order_uid: row.order_uid,
            track_number: row.track_number,
            entry: row.entry,
            delivery: None,
            payment: None,
            items: Vec::new(),
            locale: row.locale,
            internal_signature: row.internal_signature,
            customer_id: row.customer_id,
            delivery_service: row.delivery_service,
            shardkey: row.shardkey,
            sm_id: row.sm_id,
            date_created: row.date_created,
            oof_shard: row.oof_shard,
        }
    }
}

#[derive(Debug, Clone, FromRow)]
struct PaymentRow {
    transaction_id: String,
    order_uid: String,
    request_id: String,
    currency: String,
    provider: String,
    amount: i64,
    paid_at: Option<DateTime<Utc>>,
    bank: String,
    delivery_cost: i64,
    goods_total: i64,
    custom_fee: i64,
}

impl From<PaymentRow> for Payment {
    fn from(row: PaymentRow) -> Self {
        Self {
            transaction: row.transaction_id,
            order_uid: row.order_uid,
            request_id: row.request_id,
            currency: row.currency,
            provider: row.provider,
            amount: row.amount,
            payment_dt: row.paid_at.map(|t| t.timestamp()),
            paid_at: row.paid_at,
            bank: row.bank,
            delivery_cost: row.delivery_cost,
            goods_total: row.goods_total,
            custom_fee: row.custom_fee,
        }
    }
}

/// Writes the order aggregate: the root row is inserted, or overwritten if the `order_uid` already exists, and the
/// sub-entities are replaced wholesale.
///
/// This is not atomic. Call it inside a transaction, passing `&mut tx` as the connection argument.
pub async fn upsert_order(order: &Order, conn: &mut SqliteConnection) -> Result<(), OrderStoreError> {
    upsert_order_root(order, conn).await?;
    delete_sub_entities(&order.order_uid, conn).await?;
    if let Some(delivery) = &order.delivery {
        insert_delivery(delivery, conn).await?;
    }
    if let Some(payment) = &order.payment {
        insert_payment(payment, conn).await?;
    }
    insert_items(&order.items, conn).await?;
    trace!("🗃️ Order {} written with {} items", order.order_uid, order.items.len());
    Ok(())
}

async fn upsert_order_root(order: &Order, conn: &mut SqliteConnection) -> Result<(), OrderStoreError> {
    sqlx::query(
        r#"
            INSERT INTO orders (
                order_uid,
                track_number,
                entry,
                locale,
                internal_signature,
                customer_id,
                delivery_service,
                shardkey,
                sm_id,
                date_created,
                oof_shard
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            ON CONFLICT (order_uid) DO UPDATE SET
                track_number = excluded.track_number,
                entry = excluded.entry,
                locale = excluded.locale,
                internal_signature = excluded.internal_signature,
                customer_id = excluded.customer_id,
                delivery_service = excluded.delivery_service,
                shardkey = excluded.shardkey,
                sm_id = excluded.sm_id,
                date_created = excluded.date_created,
                oof_shard = excluded.oof_shard,
                updated_at = CURRENT_TIMESTAMP;
        "#,
    )
    .bind(&order.order_uid)
    .bind(&order.track_number)
    .bind(&order.entry)
    .bind(&order.locale)
    .bind(&order.internal_signature)
    .bind(&order.customer_id)
    .bind(&order.delivery_service)
    .bind(&order.shardkey)
    .bind(order.sm_id)
    .bind(&order.date_created)
    .bind(&order.oof_shard)
    .execute(conn)
    .await?;
    Ok(())
}

async fn delete_sub_entities(order_uid: &str, conn: &mut SqliteConnection) -> Result<(), OrderStoreError> {
    for table in ["items", "payment", "delivery"] {
        let res = sqlx::query(&format!("DELETE FROM {table} WHERE order_uid = $1"))
            .bind(order_uid)
            .execute(&mut *conn)
            .await?;
        if res.rows_affected() > 0 {
            trace!("🗃️ Replaced {} {table} rows for order {order_uid}", res.rows_affected());
        }
    }
    Ok(())
}

async fn insert_delivery(delivery: &Delivery, conn: &mut SqliteConnection) -> Result<(), OrderStoreError> {
    sqlx::query(
        r#"
            INSERT INTO delivery (order_uid, name, phone, zip, city, address, region, email)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8);
        "#,
    )
    .bind(&delivery.order_uid)
    .bind(&delivery.name)
    .bind(&delivery.phone)
    .bind(&delivery.zip)
    .bind(&delivery.city)
    .bind(&delivery.address)
    .bind(&delivery.region)
    .bind(&delivery.email)
    .execute(conn)
    .await?;
    Ok(())
}

async fn insert_payment(payment: &Payment, conn: &mut SqliteConnection) -> Result<(), OrderStoreError> {
    sqlx::query(
        r#"
            INSERT INTO payment (
                transaction_id,
                order_uid,
                request_id,
                currency,
                provider,
                amount,
                paid_at,
                bank,
                delivery_cost,
                goods_total,
                custom_fee
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11);
        "#,
    )
    .bind(&payment.transaction)
    .bind(&payment.order_uid)
    .bind(&payment.request_id)
    .bind(&payment.currency)
    .bind(&payment.provider)
    .bind(payment.amount)
    .bind(payment.paid_at)
    .bind(&payment.bank)
    .bind(payment.delivery_cost)
    .bind(payment.goods_total)
    .bind(payment.custom_fee)
    .execute(conn)
    .await?;
    Ok(())
}

async fn insert_items(items: &[Item], conn: &mut SqliteConnection) -> Result<(), OrderStoreError> {
    for batch in items.chunks(ITEM_BATCH_SIZE) {
        let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new(
            "INSERT INTO items (chrt_id, order_uid, track_number, price, rid, name, sale, size, total_price, nm_id, \
             brand, status) ",
        );
        builder.push_values(batch, |mut row, item| {
            row.push_bind(item.chrt_id)
                .push_bind(&item.order_uid)
                .push_bind(&item.track_number)
                .push_bind(item.price)
                .push_bind(&item.rid)
                .push_bind(&item.name)
                .push_bind(item.sale)
                .push_bind(&item.size)
                .push_bind(item.total_price)
                .push_bind(item.nm_id)
                .push_bind(&item.brand)
                .push_bind(item.status);
        });
        trace!("🗃️ Executing query: {}", builder.sql());
        builder.build().execute(&mut *conn).await?;
    }
    Ok(())
}

/// Returns the full order aggregate for `order_uid`, or `None` if the order does not exist.
///
/// Run this inside a transaction if you need the root and its sub-entities to come from the same snapshot.
pub async fn fetch_order_by_uid(
    order_uid: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, OrderStoreError> {
    let row = sqlx::query_as::<_, OrderRow>(
        r#"
            SELECT
                order_uid,
                track_number,
                entry,
                locale,
                internal_signature,
                customer_id,
                delivery_service,
                shardkey,
                sm_id,
                date_created,
                oof_shard
            FROM orders
            WHERE order_uid = $1;
        "#,
    )
    .bind(order_uid)
    .fetch_optional(&mut *conn)
    .await?;
    let mut order = match row {
        Some(row) => Order::from(row),
        None => return Ok(None),
    };
    order.delivery = sqlx::query_as::<_, Delivery>(
        "SELECT order_uid, name, phone, zip, city, address, region, email FROM delivery WHERE order_uid = $1",
    )
    .bind(order_uid)
    .fetch_optional(&mut *conn)
    .await?;
    order.payment = sqlx::query_as::<_, PaymentRow>(
        r#"
            SELECT
                transaction_id,
                order_uid,
                request_id,
                currency,
                provider,
                amount,
                paid_at,
                bank,
                delivery_cost,
                goods_total,
                custom_fee
            FROM payment
            WHERE order_uid = $1;
        "#,
    )
    .bind(order_uid)
    .fetch_optional(&mut *conn)
    .await?
    .map(Payment::from);
    order.items = sqlx::query_as::<_, Item>(
        r#"
            SELECT chrt_id, order_uid, track_number, price, rid, name, sale, size, total_price, nm_id, brand, status
            FROM items
            WHERE order_uid = $1
            ORDER BY rowid ASC;
        "#,
    )
    .bind(order_uid)
    .fetch_all(&mut *conn)
    .await?;
    Ok(Some(order))
}

/// Returns every order identifier in the store, oldest first.
pub async fn fetch_all_order_uids(conn: &mut SqliteConnection) -> Result<Vec<String>, OrderStoreError> {
    let uids = sqlx::query_scalar::<_, String>("SELECT order_uid FROM orders ORDER BY id ASC")
        .fetch_all(conn)
        .await?;
    trace!("🗃️ {} order ids fetched", uids.len());
    Ok(uids)
}

/// Counts the item rows attached to `order_uid`, whatever their state.
pub async fn count_items(order_uid: &str, conn: &mut SqliteConnection) -> Result<i64, OrderStoreError> {
    let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM items WHERE order_uid = $1")
        .bind(order_uid)
        .fetch_one(conn)
        .await?;
    Ok(count)
}
