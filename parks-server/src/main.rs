use parks::config::ParksConfig;
use parks::errors::{ErrorKind, ParksError, ParksResult};
use parks::service::ParkService;
use parks_mongo_adapter::MongoModule;
use parks_server::{build_router, spawn_initialization, AppState, ServerConfig};
use std::process;
use tokio::net::TcpListener;

#[tokio::main]
async fn main() {
    colog::init();
    if let Err(err) = run().await {
        log::error!("parks-server stopped: {}", err);
        process::exit(1);
    }
}

async fn run() -> ParksResult<()> {
    let config = ParksConfig::from_env()?;
    let server_config = ServerConfig::from_env()?;

    let service = ParkService::builder()
        .load_module(MongoModule::from_parks_config(&config).build()?)
        .config(config)
        .build()?;
    log::info!("Using {:?}", service);

    // seeding runs in the background; a failure there is not fatal
    let _ = spawn_initialization(service.clone());

    let state = AppState::new(service.clone()).with_request_timeout(server_config.request_timeout);
    let app = build_router(state);

    let bind_addr = server_config.bind_addr();
    let listener = TcpListener::bind(&bind_addr).await.map_err(|e| {
        ParksError::new(
            &format!("cannot bind {}: {}", bind_addr, e),
            ErrorKind::ConfigError,
        )
    })?;
    log::info!("parks-server listening on {}", bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| ParksError::new(&format!("server error: {}", e), ErrorKind::InternalError))?;

    log::info!("Shutting down");
    tokio::task::spawn_blocking(move || service.shutdown())
        .await
        .map_err(|e| ParksError::new(&e.to_string(), ErrorKind::InternalError))??;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        log::warn!("Cannot listen for shutdown signal: {}", err);
        std::future::pending::<()>().await;
    }
}
