use std::io;
use std::sync::Arc;

use actix_web::{web, App, HttpServer};
use env_logger::Builder;
use log::info;

use twitter_feed::config::{self, Config, StorageBackend};
use twitter_feed::db;
use twitter_feed::handlers::{self, AppState};
use twitter_feed::store::{MemoryStore, ScyllaStore, Store};

#[actix_web::main]
async fn main() -> io::Result<()> {
    let log_level = config::log_level().map_err(io::Error::other)?;
    Builder::new()
        .filter_level(log_level)
        .format_timestamp_secs()
        .init();

    let config = Config::load().map_err(io::Error::other)?;

    info!("Starting Twitter feed backend...");
    info!("Configuration: {:?}", config);

    let store: Arc<dyn Store> = match config.storage {
        StorageBackend::Scylla => {
            let session = db::create_session(&config)
                .await
                .map_err(io::Error::other)?;
            db::ensure_schema(&session, &config)
                .await
                .map_err(io::Error::other)?;
            info!("Connected to ScyllaDB");
            Arc::new(ScyllaStore::new(Arc::new(session)))
        }
        StorageBackend::Memory => {
            info!("Using in-memory storage");
            Arc::new(MemoryStore::new())
        }
    };

    let state = web::Data::new(AppState {
        store,
        page: config.page,
    });

    HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .configure(handlers::configure)
    })
    .workers(config.workers)
    .bind(&config.bind_addr)?
    .run()
    .await
}
