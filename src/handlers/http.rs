//! HTTP surface: WebSocket upgrade, liveness probe and static assets

use serde_json::json;
use std::convert::Infallible;
use warp::{Filter, Rejection, Reply};

use crate::config::ServerConfig;
use crate::constants::{HEALTH_PATH, WS_PATH};
use crate::core::message_handler::MessageHandler;
use crate::core::server::SharedRelayServer;
use crate::handlers::websocket::handle_ws_client;

/// Build the full route tree served by the relay
pub fn routes(
    server: SharedRelayServer,
    config: &ServerConfig,
) -> impl Filter<Extract = (impl Reply,), Error = Rejection> + Clone {
    let handler = MessageHandler::new(server).with_max_message_size(config.max_message_size);

    let ws_route = warp::path(WS_PATH)
        .and(warp::path::end())
        .and(warp::ws())
        .and(with_handler(handler))
        .map(|ws: warp::ws::Ws, handler: MessageHandler| {
            log::debug!("New websocket connection");
            ws.on_upgrade(move |socket| handle_ws_client(socket, handler))
        });

    let health_route = warp::path(HEALTH_PATH)
        .and(warp::path::end())
        .and(warp::get())
        .map(|| warp::reply::json(&json!({ "status": "ok" })));

    let static_route = warp::get().and(warp::fs::dir(config.static_dir.clone()));

    let cors = warp::cors()
        .allow_any_origin()
        .allow_methods(vec!["GET", "POST"]);

    ws_route.or(health_route).or(static_route).with(cors)
}

// Helper function to include the message handler in request
fn with_handler(
    handler: MessageHandler,
) -> impl Filter<Extract = (MessageHandler,), Error = Infallible> + Clone {
    warp::any().map(move || handler.clone())
}
