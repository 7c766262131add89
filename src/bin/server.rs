use log::{debug, error, info};
use std::sync::Arc;

use transcript_relay::config::ServerConfig;
use transcript_relay::core::RelayServer;
use transcript_relay::handlers::routes;

#[tokio::main]
async fn main() {
    // Initialize env before logging so RUST_LOG may come from .env
    let dotenv = dotenvy::dotenv();

    // Initialize logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    match dotenv {
        Ok(path) => info!("Environment variables loaded from {}", path.display()),
        Err(e) => debug!("No .env file loaded: {}", e),
    };

    let config = match ServerConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    info!(
        "Configuration: host={}, port={}, static_dir={}, single_room={}",
        config.host, config.port, config.static_dir, config.single_room_membership
    );

    let addr = match config.socket_addr() {
        Ok(addr) => addr,
        Err(e) => {
            error!("{}", e);
            std::process::exit(1);
        }
    };

    let server = Arc::new(RelayServer::from_config(&config));
    let routes = routes(server.clone(), &config);

    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for shutdown signal: {}", e);
            std::future::pending::<()>().await;
        }
        info!("Shutdown signal received");
    };

    match warp::serve(routes).try_bind_with_graceful_shutdown(addr, shutdown) {
        Ok((bound, running)) => {
            info!("Server is running on {}", bound);
            running.await;
        }
        Err(e) => {
            error!("Failed to bind {}: {}", addr, e);
            std::process::exit(1);
        }
    }

    if let Err(e) = server.shutdown() {
        error!("Failed to release rooms: {}", e);
    }
    info!("Server stopped");
}
