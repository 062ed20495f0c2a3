use std::{env, env::VarError};

/// There's no real CLI for the server, so just do quick 'n dirty
pub fn handle_command_line_args() -> bool {
    let has_cli_args = env::args().count() > 1;
    if has_cli_args {
        // We don't expect any CLI args, so always print the help
        display_readme();
        display_envs();
    }
    has_cli_args
}

fn display_readme() {
    const README: &str = include_str!("./cli-help.txt");
    println!("\n{README}\n");
}

fn display_envs() {
    // Be explicit about which envars to print, so as to avoid accidentally exposing secrets
    const DISPLAY_ENVS: [&str; 15] = [
        "RUST_LOG",
        "ORDERS_LOG_LEVEL",
        "ORDERS_HOST",
        "ORDERS_PORT",
        "ORDERS_DATABASE_URL",
        "ORDERS_DB_MAX_CONNECTIONS",
        "ORDERS_KAFKA_BROKERS",
        "ORDERS_KAFKA_TOPIC",
        "ORDERS_KAFKA_GROUP_ID",
        "ORDERS_REDIS_ADDRESS",
        "ORDERS_CACHE_TTL_HOURS",
        "ORDERS_CACHE_TIMEOUT_MS",
        "ORDERS_STORE_TIMEOUT_MS",
        "ORDERS_CACHE_WRITE_THROUGH",
        "ORDERS_SKIP_CACHE_WARMUP",
    ];

    println!("Current environment values (EXCLUDING variables that contain secrets):");
    DISPLAY_ENVS.iter().for_each(|&name| {
        let val = match env::var(name) {
            Ok(s) => s,
            Err(VarError::NotPresent) => "Not set".into(),
            Err(VarError::NotUnicode(s)) => format!("Invalid value: {}", s.to_string_lossy()),
        };
        println!("  {name:<35} {val:<15}");
    })
}
