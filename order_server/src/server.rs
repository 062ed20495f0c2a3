use std::time::Duration;

use actix_web::{dev::Server, http::KeepAlive, middleware::Logger, web, App, HttpServer};
use log::*;
use order_engine::{
    CacheWarmer,
    IngestSummary,
    OrderCache,
    OrderReader,
    OrderStore,
    OrderWriter,
    RedisOrderCache,
    SqliteDatabase,
};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::{
    config::ServerConfig,
    errors::ServerError,
    ingest_worker::{join_order_ingestor, INGESTOR_SHUTDOWN_GRACE},
    routes::{health, missing_order_id, IngestOrderRoute, OrderByIdRoute},
};

/// Boots the service and runs it until the HTTP server stops (e.g. on SIGINT or SIGTERM).
///
/// 1. Connect to the database and bring the schema up to date.
/// 2. Connect to the cache.
/// 3. Restore the cache from the database, unless configured not to. A failed restore is not fatal.
/// 4. Start the stream ingest worker.
/// 5. Serve HTTP.
///
/// Failing to reach the database or the cache at boot is fatal. On the way out, the ingest worker is asked to stop
/// and given a bounded amount of time to do so, and then the cache and database connections are closed.
pub async fn run_server(config: ServerConfig) -> Result<(), ServerError> {
    let mut db = SqliteDatabase::new_with_url(&config.database_url, config.db_max_connections)
        .await
        .map_err(|e| ServerError::InitializeError(e.to_string()))?;
    db.migrate().await?;
    let cache = RedisOrderCache::connect(&config.cache).await.map_err(|e| ServerError::InitializeError(e.to_string()))?;
    if config.skip_cache_warmup {
        info!("🔥️ Cache warm-up is disabled");
    } else {
        match CacheWarmer::new(db.clone(), cache.clone()).restore().await {
            Ok(summary) => info!("🔥️ Cache warm-up done. {summary}"),
            Err(e) => warn!("🔥️ Could not restore the cache from the database. Continuing with a cold cache. {e}"),
        }
    }
    let shutdown = CancellationToken::new();
    let writer = OrderWriter::new(db.clone(), cache.clone()).with_write_through(config.cache_write_through);
    let worker = start_ingest_worker(&config, writer, shutdown.clone())?;

    let srv = create_server_instance(config, db.clone(), cache.clone())?;
    let result = srv.await.map_err(|e| ServerError::Unspecified(e.to_string()));
    info!("💻️ HTTP server has stopped. Shutting down.");

    shutdown.cancel();
    if let Some(worker) = worker {
        join_order_ingestor(worker, INGESTOR_SHUTDOWN_GRACE).await;
    }
    if let Err(e) = cache.close().await {
        warn!("⚡️ Error closing the cache connection. {e}");
    }
    if let Err(e) = db.close().await {
        warn!("🗃️ Error closing the database pool. {e}");
    }
    result
}

#[cfg(feature = "kafka")]
fn start_ingest_worker(
    config: &ServerConfig,
    writer: OrderWriter<SqliteDatabase, RedisOrderCache>,
    shutdown: CancellationToken,
) -> Result<Option<JoinHandle<IngestSummary>>, ServerError> {
    let source = crate::kafka::KafkaEventSource::new(&config.kafka)
        .map_err(|e| ServerError::InitializeError(e.to_string()))?;
    Ok(Some(crate::ingest_worker::start_order_ingestor(source, writer, shutdown)))
}

#[cfg(not(feature = "kafka"))]
fn start_ingest_worker(
    _config: &ServerConfig,
    _writer: OrderWriter<SqliteDatabase, RedisOrderCache>,
    _shutdown: CancellationToken,
) -> Result<Option<JoinHandle<IngestSummary>>, ServerError> {
    warn!("📨️ Built without Kafka support. Orders can only be ingested through POST /orders.");
    Ok(None)
}

pub fn create_server_instance<B, C>(config: ServerConfig, db: B, cache: C) -> Result<Server, ServerError>
where
    B: OrderStore + Send + Sync + 'static,
    C: OrderCache + Send + Sync + 'static,
{
    let reader = OrderReader::new(db.clone(), cache.clone()).with_store_timeout(config.store_timeout);
    let writer = OrderWriter::new(db, cache).with_write_through(config.cache_write_through);
    let srv = HttpServer::new(move || {
        App::new()
            .wrap(Logger::new("%t (%D ms) %s %a %{Host}i %U").log_target("orders::access_log"))
            .app_data(web::Data::new(reader.clone()))
            .app_data(web::Data::new(writer.clone()))
            .service(health)
            .service(missing_order_id)
            .service(OrderByIdRoute::<B, C>::new())
            .service(IngestOrderRoute::<B, C>::new())
    })
    .keep_alive(KeepAlive::Timeout(Duration::from_secs(600)))
    .bind((config.host.as_str(), config.port))?
    .run();
    Ok(srv)
}
