//! Request handler definitions
//!
//! Define each route and it handler here.
//! Handlers that are more than a line or two MUST go into a separate module. Keep this module neat and tidy 🙏
//!
//! A note about performance:
//! Since each worker thread processes its requests sequentially, handlers which block the current thread will cause the
//! current worker to stop processing new requests. Any long, non-cpu-bound operation (e.g. database or cache calls)
//! must be awaited, never blocked on:
//!
//! ```nocompile
//!     async fn my_handler() -> impl Responder {
//!         tokio::time::sleep(Duration::from_secs(5)).await; // <-- Ok. Worker thread will handle other requests here
//!     }
//! ```
use actix_web::{get, web, HttpResponse, Responder};
use bytes::Bytes;
use log::*;
use order_engine::{OrderCache, OrderReader, OrderStore, OrderWriter};
use serde_json::json;

use crate::errors::ServerError;

// Web-actix cannot handle generics in handlers, so it's implemented manually using the `route!` macro
#[macro_export]
macro_rules! route {
    ($name:ident => $method:ident $path:literal impl $($bounds:ty),+) => {
        paste::paste! { pub struct [<$name:camel Route>]< $( [< T $bounds:camel> ],)+ >( $( core::marker::PhantomData<fn() -> [< T $bounds:camel> ] >,)+ );}
        paste::paste! { impl< $( [< T $bounds:camel> ],)+ > [<$name:camel Route>]< $( [< T $bounds:camel> ],)+ > {
            #[allow(clippy::new_without_default)]
            pub fn new() -> Self {
                Self($( core::marker::PhantomData::<fn() -> [< T $bounds:camel> ] >,)+)
            }
        }}
        paste::paste! { impl<$( [< T $bounds:camel >] , )+> actix_web::dev::HttpServiceFactory for [<$name:camel Route>]<$([<T $bounds:camel>],)+>
        where
            $([<T $bounds:camel>]: $bounds + 'static,)+
        {
            fn register(self, config: &mut actix_web::dev::AppService) {
                let res = actix_web::Resource::new($path)
                    .name(stringify!($name))
                    .guard(actix_web::guard::$method())
                    .to($name::< $( [< T $bounds:camel >], )+>);
                actix_web::dev::HttpServiceFactory::register(res, config);
            }
        }}
    };
}

// ----------------------------------------------   Health  ----------------------------------------------------
#[get("/health")]
pub async fn health() -> impl Responder {
    trace!("💻️ Received health check request");
    HttpResponse::Ok().body("👍️\n")
}

//----------------------------------------------   Orders  ----------------------------------------------------
route!(order_by_id => Get "/order/{order_uid}" impl OrderStore, OrderCache);
/// Route handler for the order lookup endpoint
///
/// Returns the full order aggregate (order, delivery, payment and items) as JSON. Lookups go through the cache, and
/// fall back to the store on a miss.
///
/// * 200: the order
/// * 400: the order id is blank
/// * 404: there is no such order
/// * 500/503: the store failed or timed out
pub async fn order_by_id<B, C>(
    path: web::Path<String>,
    api: web::Data<OrderReader<B, C>>,
) -> Result<HttpResponse, ServerError>
where
    B: OrderStore,
    C: OrderCache,
{
    let order_uid = path.into_inner();
    let order_uid = order_uid.trim();
    if order_uid.is_empty() {
        return Err(ServerError::InvalidRequestPath("order_uid must not be empty".into()));
    }
    debug!("💻️ GET order {order_uid}");
    let order = api.get_order(order_uid).await.map_err(|e| {
        debug!("💻️ Could not fetch order {order_uid}. {e}");
        ServerError::from(e)
    })?;
    match order {
        Some(order) => Ok(HttpResponse::Ok().json(order)),
        None => Err(ServerError::NoRecordFound(format!("Order {order_uid} does not exist"))),
    }
}

/// `GET /order/` has no id to look up. Without this handler actix would answer with a bare 404.
#[get("/order/")]
pub async fn missing_order_id() -> Result<HttpResponse, ServerError> {
    Err(ServerError::InvalidRequestPath("order_uid must not be empty".into()))
}

route!(ingest_order => Post "/orders" impl OrderStore, OrderCache);
/// Route handler for direct order ingestion
///
/// Accepts the same JSON payload that producers publish on the order stream, and persists it through the same write
/// path. An order without an `order_uid` is assigned one, which is returned in the response.
///
/// * 201: `{"order_uid": "..."}`
/// * 400: the payload is not a valid order, or the order breaks a data constraint
/// * 500: the store failed
pub async fn ingest_order<B, C>(body: Bytes, api: web::Data<OrderWriter<B, C>>) -> Result<HttpResponse, ServerError>
where
    B: OrderStore,
    C: OrderCache,
{
    trace!("💻️ Received order payload of {} bytes", body.len());
    let order = api.ingest(&body).await.map_err(|e| {
        debug!("💻️ Order was not ingested. {e}");
        ServerError::from(e)
    })?;
    info!("💻️ Order {} ingested over HTTP", order.order_uid);
    Ok(HttpResponse::Created().json(json!({ "order_uid": order.order_uid })))
}
