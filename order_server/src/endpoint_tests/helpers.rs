use actix_web::{body::MessageBody, dev::ServiceResponse, http::StatusCode, test, test::TestRequest, web, web::ServiceConfig, App};
use log::debug;
use order_engine::{MemoryOrderCache, OrderReader, OrderWriter};

use super::mocks::MockStore;
use crate::routes::{health, missing_order_id, IngestOrderRoute, OrderByIdRoute};

/// Registers the order routes. Lookups are served from `reader_store`, ingestion goes to `writer_store`, and both
/// share `cache`.
pub fn configure_orders(
    reader_store: MockStore,
    writer_store: MockStore,
    cache: MemoryOrderCache,
) -> impl FnOnce(&mut ServiceConfig) {
    move |cfg: &mut ServiceConfig| {
        cfg.app_data(web::Data::new(OrderReader::new(reader_store, cache.clone())))
            .app_data(web::Data::new(OrderWriter::new(writer_store, cache)))
            .service(health)
            .service(missing_order_id)
            .service(OrderByIdRoute::<MockStore, MemoryOrderCache>::new())
            .service(IngestOrderRoute::<MockStore, MemoryOrderCache>::new());
    }
}

pub async fn get_request<F>(path: &str, configure: F) -> (StatusCode, String)
where F: FnOnce(&mut ServiceConfig) {
    let service = test::init_service(App::new().configure(configure)).await;
    debug!("Making request");
    let res = test::call_service(&service, TestRequest::get().uri(path).to_request()).await;
    into_parts(res).await
}

pub async fn post_request<F>(path: &str, body: &str, configure: F) -> (StatusCode, String)
where F: FnOnce(&mut ServiceConfig) {
    let service = test::init_service(App::new().configure(configure)).await;
    let req = TestRequest::post()
        .uri(path)
        .insert_header(("Content-Type", "application/json"))
        .set_payload(body.to_string())
        .to_request();
    debug!("Making request");
    let res = test::call_service(&service, req).await;
    into_parts(res).await
}

pub async fn into_parts<B: MessageBody>(res: ServiceResponse<B>) -> (StatusCode, String) {
    let status = res.status();
    let body = test::read_body(res).await;
    (status, String::from_utf8_lossy(&body).into_owned())
}
