use std::env;

use dotenvy::dotenv;
use log::info;
use order_server::{cli::handle_command_line_args, config::ServerConfig, server::run_server};

const DEFAULT_LOG_LEVEL: &str = "info";

#[actix_web::main]
async fn main() {
    dotenv().ok();
    let log_level = env::var("ORDERS_LOG_LEVEL").unwrap_or_else(|_| DEFAULT_LOG_LEVEL.into());
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level)).init();
    if handle_command_line_args() {
        return;
    }
    let config = ServerConfig::from_env_or_default();

    info!("🚀️ Starting server on {}:{}", config.host, config.port);
    match run_server(config).await {
        Ok(_) => println!("Bye!"),
        Err(e) => eprintln!("{e}"),
    }
}
