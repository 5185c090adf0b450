// src/main.rs

use std::sync::Arc;
use std::time::Duration;

use actix_web::{web as actix_data, App, HttpServer};
use sqlx::PgPool;
use tracing::Level;
use tracing_subscriber::fmt::format::FmtSpan;

use printworks::config::AppConfig;
use printworks::fulfillment::{FulfillmentOrchestrator, PaymentEventProcessor};
use printworks::services::designs::PgDesignRegistry;
use printworks::services::email::{BrevoNotifier, LogOnlyNotifier, OrderNotifier};
use printworks::services::printify::PrintifyClient;
use printworks::services::stripe::StripeClient;
use printworks::state::AppState;
use printworks::store::PgOrderStore;
use printworks::web::routes::configure_app_routes;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
  tracing_subscriber::fmt()
    .with_max_level(Level::INFO)
    .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
    .with_span_events(FmtSpan::CLOSE)
    .init();

  tracing::info!("Starting printworks fulfillment server...");

  let app_config = match AppConfig::from_env() {
    Ok(cfg) => Arc::new(cfg),
    Err(e) => {
      tracing::error!(error = %e, "Failed to load application configuration.");
      panic!("Configuration error: {}", e);
    }
  };

  let db_pool = match PgPool::connect(&app_config.database_url).await {
    Ok(pool) => {
      tracing::info!("Successfully connected to the database.");
      pool
    }
    Err(e) => {
      tracing::error!(error = %e, "Failed to connect to the database.");
      panic!("Database connection error: {}", e);
    }
  };

  let provider_timeout = Duration::from_secs(app_config.provider_timeout_secs);

  let store = Arc::new(PgOrderStore::new(db_pool.clone()));
  let designs = Arc::new(PgDesignRegistry::new(db_pool));

  let gateway = Arc::new(
    StripeClient::new(
      app_config.stripe_secret_key.clone(),
      app_config.stripe_webhook_secret.clone(),
      provider_timeout,
    )
    .expect("Failed to build Stripe client"),
  );
  let provider = Arc::new(
    PrintifyClient::new(
      app_config.printify_api_token.clone(),
      app_config.printify_shop_id.clone(),
      provider_timeout,
    )
    .expect("Failed to build Printify client"),
  );

  let notifier: Arc<dyn OrderNotifier> = if app_config.brevo_api_key.is_some() {
    Arc::new(
      BrevoNotifier::new(
        app_config.brevo_api_key.clone(),
        app_config.notification_sender.clone(),
        provider_timeout,
      )
      .expect("Failed to build Brevo client"),
    )
  } else {
    tracing::warn!("BREVO_API_KEY not set; order confirmations will be logged only.");
    Arc::new(LogOnlyNotifier)
  };

  let orchestrator = Arc::new(FulfillmentOrchestrator::new(
    store.clone(),
    provider,
    designs,
    app_config.fulfillment_settings(),
  ));
  let events = Arc::new(PaymentEventProcessor::new(
    gateway,
    store.clone(),
    notifier,
    orchestrator.clone(),
  ));

  let app_state = AppState {
    store,
    events,
    orchestrator,
    config: app_config.clone(),
  };

  let server_address = format!("{}:{}", app_config.server_host, app_config.server_port);
  tracing::info!("Attempting to bind server to {}...", server_address);

  HttpServer::new(move || {
    App::new()
      .app_data(actix_data::Data::new(app_state.clone()))
      .wrap(tracing_actix_web::TracingLogger::default())
      .configure(configure_app_routes)
  })
  .bind(&server_address)?
  .run()
  .await
}
