use std::io::Error;
use std::sync::Arc;

use actix_web::middleware::Logger;
use actix_web::{web, App, HttpServer};
use env_logger::{Builder, Env};
use log::info;

use microblog::auth::BcryptHasher;
use microblog::config::Config;
use microblog::{db, AppState};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    Builder::from_env(Env::default().default_filter_or("info"))
        .format_timestamp_secs()
        .init();

    let config = Config::try_parse().map_err(Error::other)?;

    info!("Starting microblog backend...");
    let store = db::open(&config).map_err(Error::other)?;
    info!("Opened {} store", config.backend);

    let state = AppState::new(store, Arc::new(BcryptHasher::new(config.bcrypt_cost)));

    info!(
        "Listening on {}:{} with {} workers",
        config.host, config.port, config.workers
    );
    HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .app_data(web::Data::new(state.clone()))
            .configure(microblog::configure)
    })
    .workers(config.workers)
    .bind((config.host.as_str(), config.port))?
    .run()
    .await
}
