//! Server configuration
//!
//! Every setting is read from an `ORDERS_*` environment variable (a `.env` file is loaded first, if present). A
//! missing or unparseable value is logged and replaced with the default.
use std::{env, time::Duration};

use log::*;
use order_common::{
    helpers::{parse_boolean_flag, parse_millis},
    Secret,
};
use order_engine::{
    cache::{DEFAULT_CACHE_OP_TIMEOUT, DEFAULT_CACHE_TTL},
    order_api::DEFAULT_STORE_TIMEOUT,
    RedisCacheConfig,
};

const DEFAULT_ORDERS_HOST: &str = "127.0.0.1";
const DEFAULT_ORDERS_PORT: u16 = 8081;
const DEFAULT_DATABASE_URL: &str = "sqlite://data/orders.db";
const DEFAULT_DB_MAX_CONNECTIONS: u32 = 10;
const DEFAULT_KAFKA_BROKERS: &str = "localhost:9092";
const DEFAULT_KAFKA_TOPIC: &str = "orders";
const DEFAULT_KAFKA_GROUP_ID: &str = "order-group";
const DEFAULT_REDIS_ADDRESS: &str = "localhost:6379";

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    pub db_max_connections: u32,
    pub kafka: KafkaConfig,
    pub cache: RedisCacheConfig,
    /// Upper bound for a single store read on the lookup path.
    pub store_timeout: Duration,
    /// If true, every ingested order also refreshes its cache entry. If false, updates to cached orders only become
    /// visible once the old entry expires.
    pub cache_write_through: bool,
    /// If true, the cache is not restored from the store at boot.
    pub skip_cache_warmup: bool,
}

#[derive(Clone, Debug)]
pub struct KafkaConfig {
    /// Comma-separated `host:port` list of bootstrap brokers.
    pub brokers: String,
    pub topic: String,
    pub group_id: String,
}

impl Default for KafkaConfig {
    fn default() -> Self {
        Self {
            brokers: DEFAULT_KAFKA_BROKERS.to_string(),
            topic: DEFAULT_KAFKA_TOPIC.to_string(),
            group_id: DEFAULT_KAFKA_GROUP_ID.to_string(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_ORDERS_HOST.to_string(),
            port: DEFAULT_ORDERS_PORT,
            database_url: DEFAULT_DATABASE_URL.to_string(),
            db_max_connections: DEFAULT_DB_MAX_CONNECTIONS,
            kafka: KafkaConfig::default(),
            cache: RedisCacheConfig { address: DEFAULT_REDIS_ADDRESS.to_string(), ..Default::default() },
            store_timeout: DEFAULT_STORE_TIMEOUT,
            cache_write_through: true,
            skip_cache_warmup: false,
        }
    }
}

impl ServerConfig {
    pub fn new(host: &str, port: u16) -> Self {
        Self { host: host.to_string(), port, ..Default::default() }
    }

    pub fn from_env_or_default() -> Self {
        let host = env::var("ORDERS_HOST").ok().unwrap_or_else(|| DEFAULT_ORDERS_HOST.into());
        let port = env::var("ORDERS_PORT")
            .map(|s| {
                s.parse::<u16>().unwrap_or_else(|e| {
                    error!(
                        "🪛️ {s} is not a valid port for ORDERS_PORT. {e} Using the default, {DEFAULT_ORDERS_PORT}, \
                         instead."
                    );
                    DEFAULT_ORDERS_PORT
                })
            })
            .ok()
            .unwrap_or(DEFAULT_ORDERS_PORT);
        let database_url = env::var("ORDERS_DATABASE_URL").ok().unwrap_or_else(|| {
            warn!("🪛️ ORDERS_DATABASE_URL is not set. Using the default, {DEFAULT_DATABASE_URL}.");
            DEFAULT_DATABASE_URL.to_string()
        });
        let db_max_connections = env::var("ORDERS_DB_MAX_CONNECTIONS")
            .ok()
            .and_then(|s| {
                s.parse::<u32>()
                    .map_err(|e| {
                        error!("🪛️ {s} is not a valid value for ORDERS_DB_MAX_CONNECTIONS. {e}");
                    })
                    .ok()
            })
            .filter(|&n| n > 0)
            .unwrap_or(DEFAULT_DB_MAX_CONNECTIONS);
        let kafka = KafkaConfig::from_env_or_defaults();
        let cache = configure_cache();
        let store_timeout = duration_from_env_millis("ORDERS_STORE_TIMEOUT_MS", DEFAULT_STORE_TIMEOUT);
        let cache_write_through = parse_boolean_flag(env::var("ORDERS_CACHE_WRITE_THROUGH").ok(), true);
        if !cache_write_through {
            warn!(
                "🪛️ Cache write-through is disabled. Updates to cached orders will be served stale until the cache \
                 entry expires."
            );
        }
        let skip_cache_warmup = parse_boolean_flag(env::var("ORDERS_SKIP_CACHE_WARMUP").ok(), false);
        Self {
            host,
            port,
            database_url,
            db_max_connections,
            kafka,
            cache,
            store_timeout,
            cache_write_through,
            skip_cache_warmup,
        }
    }
}

impl KafkaConfig {
    pub fn from_env_or_defaults() -> Self {
        let brokers = env::var("ORDERS_KAFKA_BROKERS").ok().unwrap_or_else(|| {
            info!("🪛️ ORDERS_KAFKA_BROKERS is not set. Using {DEFAULT_KAFKA_BROKERS}.");
            DEFAULT_KAFKA_BROKERS.to_string()
        });
        let topic = env::var("ORDERS_KAFKA_TOPIC").ok().unwrap_or_else(|| DEFAULT_KAFKA_TOPIC.to_string());
        let group_id = env::var("ORDERS_KAFKA_GROUP_ID").ok().unwrap_or_else(|| DEFAULT_KAFKA_GROUP_ID.to_string());
        Self { brokers, topic, group_id }
    }
}

fn configure_cache() -> RedisCacheConfig {
    let address = env::var("ORDERS_REDIS_ADDRESS").ok().unwrap_or_else(|| {
        info!("🪛️ ORDERS_REDIS_ADDRESS is not set. Using {DEFAULT_REDIS_ADDRESS}.");
        DEFAULT_REDIS_ADDRESS.to_string()
    });
    let password = Secret::new(env::var("ORDERS_REDIS_PASSWORD").ok().unwrap_or_default());
    let ttl = cache_ttl_from_hours(env::var("ORDERS_CACHE_TTL_HOURS").ok());
    let op_timeout = duration_from_env_millis("ORDERS_CACHE_TIMEOUT_MS", DEFAULT_CACHE_OP_TIMEOUT);
    RedisCacheConfig { address, password, ttl, op_timeout, ..Default::default() }
}

fn cache_ttl_from_hours(value: Option<String>) -> Duration {
    let Some(s) = value else {
        return DEFAULT_CACHE_TTL;
    };
    let hours = match s.trim().parse::<u64>() {
        Ok(h) if h > 0 => h,
        Ok(_) => {
            error!("🪛️ ORDERS_CACHE_TTL_HOURS must be at least 1. Using the default, {DEFAULT_CACHE_TTL:?}.");
            return DEFAULT_CACHE_TTL;
        },
        Err(e) => {
            error!("🪛️ {s} is not a valid number of hours for ORDERS_CACHE_TTL_HOURS. {e}");
            return DEFAULT_CACHE_TTL;
        },
    };
    match hours.checked_mul(60 * 60) {
        Some(secs) => Duration::from_secs(secs),
        None => {
            error!("🪛️ {s} hours is too long for ORDERS_CACHE_TTL_HOURS. Using the default, {DEFAULT_CACHE_TTL:?}.");
            DEFAULT_CACHE_TTL
        },
    }
}

fn duration_from_env_millis(name: &str, default: Duration) -> Duration {
    match env::var(name) {
        Ok(s) => parse_millis(&s).filter(|d| !d.is_zero()).unwrap_or_else(|| {
            error!("🪛️ {s} is not a valid number of milliseconds for {name}. Using the default, {default:?}.");
            default
        }),
        Err(_) => default,
    }
}
