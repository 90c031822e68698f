mod auth;
mod availability;
mod booking;
mod config;
mod display;
mod models;
mod routes;
mod state;
mod store;
mod templates;

use std::sync::Arc;

use actix_files::Files;
use actix_web::{middleware, web, App, HttpServer};

use crate::{
    auth::AdminAccount,
    config::{Config, StoreConfig},
    state::AppState,
    store::{rest::RestStore, sqlite::SqliteStore, RecordStore},
};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    if let Err(err) = run().await {
        eprintln!("Startup error: {err}");
        std::process::exit(1);
    }
    Ok(())
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .init();

    let config = Config::from_env()?;

    let store: Arc<dyn RecordStore> = match &config.store {
        StoreConfig::Rest {
            base_url,
            api_key,
            timeout,
        } => {
            log::info!("Using hosted records at {base_url}");
            Arc::new(RestStore::new(base_url, api_key, *timeout)?)
        }
        StoreConfig::Sqlite { database_url } => {
            log::info!("Using local SQLite records at {database_url}");
            Arc::new(SqliteStore::connect(database_url).await?)
        }
    };

    let admin = AdminAccount::from_secret(&config.admin_user, &config.admin_secret)
        .map_err(|err| format!("invalid admin credential: {err}"))?;

    let state = AppState {
        store,
        admin,
        fetch_failure: config.fetch_failure,
    };

    let address = format!("0.0.0.0:{}", config.port);
    log::info!("Starting Gaven's Barber Shop on http://{address}");

    let static_dir = config.static_dir.clone();
    HttpServer::new(move || {
        App::new()
            .app_data(web::Data::new(state.clone()))
            .wrap(middleware::Logger::default())
            .service(Files::new("/static", &static_dir).prefer_utf8(true))
            .configure(routes::public::configure)
            .configure(routes::admin::configure)
    })
    .bind(address)?
    .run()
    .await?;

    Ok(())
}
