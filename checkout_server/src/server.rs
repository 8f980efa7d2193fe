use std::{sync::Arc, time::Duration};

use actix_web::{dev::Server, http::KeepAlive, middleware::Logger, web, App, HttpServer};
use checkout_engine::{
    events::{EventHandlers, EventProducers},
    processors::ProcessorRegistry,
    traits::WalletManagement,
    CheckoutApi,
    SqliteDatabase,
};
use log::*;

use crate::{
    analytics::SalesCounters,
    config::ServerConfig,
    errors::ServerError,
    routes::configure_routes,
    wallets::UnavailableWallets,
};

pub async fn run_server(config: ServerConfig) -> Result<(), ServerError> {
    let db = SqliteDatabase::new_with_url(&config.database_url, config.max_connections)
        .await
        .map_err(|e| ServerError::InitializeError(e.to_string()))?;
    if config.auto_migrate {
        db.migrate().await.map_err(|e| ServerError::InitializeError(e.to_string()))?;
    }
    let counters = Arc::new(SalesCounters::default());
    let handlers = EventHandlers::new(config.event_buffer_size, counters.hooks());
    let producers = handlers.producers();
    handlers.start_handlers();
    let srv = create_server_instance(config, db, producers)?;
    let result = srv.await.map_err(|e| ServerError::Unspecified(e.to_string()));
    info!("💻️ Server stopped. {counters}");
    result
}

pub fn create_server_instance(
    config: ServerConfig,
    db: SqliteDatabase,
    producers: EventProducers,
) -> Result<Server, ServerError> {
    let wallets: Arc<dyn WalletManagement> = Arc::new(UnavailableWallets);
    let processors = ProcessorRegistry::with_gateways(config.gateways.clone(), Arc::clone(&wallets));
    let srv = HttpServer::new(move || {
        let api = CheckoutApi::new(db.clone(), processors.clone(), Arc::clone(&wallets), producers.clone());
        App::new()
            .wrap(Logger::new("%t (%D ms) %s %a %{Host}i %U").log_target("checkout::access_log"))
            .app_data(web::Data::new(api))
            .configure(configure_routes::<SqliteDatabase>)
    })
    .keep_alive(KeepAlive::Timeout(Duration::from_secs(600)))
    .bind((config.host.as_str(), config.port))?
    .run();
    Ok(srv)
}
