use actix_web::{web, App, HttpServer};
use log::info;
use std::sync::Arc;

mod config;
mod game;
mod models;
mod mover;
mod routes;
mod storage;
mod websocket;

use crate::config::AppConfig;
use crate::models::AppState;
use crate::mover::{HttpMoveService, MoveService};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenvy::dotenv().ok();

    // Initialize logger
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let config = AppConfig::from_env();
    info!("Starting Gambitron server at http://{}", config.bind_addr);
    info!("Using mover endpoint {}", config.mover_url);

    let mover: Arc<dyn MoveService> = Arc::new(HttpMoveService::new(config.mover_url.clone()));
    let bind_addr = config.bind_addr.clone();
    let app_state = web::Data::new(AppState::new(config, mover));

    // Start HTTP server
    HttpServer::new(move || {
        App::new()
            .app_data(app_state.clone())
            .configure(routes::configure_routes)
    })
    .bind(bind_addr)?
    .run()
    .await
}
