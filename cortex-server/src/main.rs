use actix_web::{web, App, HttpServer};
use cortex::{Store, StoreConfig};
use std::sync::Mutex;

mod handlers;

/// Shared application state. The mutex serializes every request's
/// read-modify-write against the store.
pub struct AppState {
    pub store: Mutex<Store>,
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    env_logger::init();
    log::info!("Starting Cortex server");

    let db_path = std::env::var("CORTEX_DB_PATH").unwrap_or_else(|_| "cortex.db".to_string());
    let host = std::env::var("CORTEX_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
    let port: u16 = std::env::var("CORTEX_PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(8080);
    let lenient = std::env::var("CORTEX_LENIENT")
        .map(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
        .unwrap_or(false);

    let mut config = StoreConfig::at(&db_path);
    if lenient {
        config = config.lenient();
    }

    log::info!("Opening store at: {db_path}");
    let store = Store::open(config).map_err(|e| {
        std::io::Error::new(std::io::ErrorKind::Other, format!("Failed to open store: {e}"))
    })?;

    let state = web::Data::new(AppState {
        store: Mutex::new(store),
    });

    log::info!("Listening on {host}:{port}");
    HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .configure(handlers::configure)
    })
    .bind((host.as_str(), port))?
    .run()
    .await
}
