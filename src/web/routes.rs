// src/web/routes.rs

use actix_web::web;

async fn health_check_handler() -> actix_web::HttpResponse {
  actix_web::HttpResponse::Ok().json(serde_json::json!({ "status": "ok" }))
}

// Called in `main.rs` (and by the endpoint tests) to configure the Actix App.
pub fn configure_app_routes(cfg: &mut web::ServiceConfig) {
  cfg.service(
    web::scope("/api/v1")
      .route("/health", web::get().to(health_check_handler))
      // Webhook Routes
      .service(web::scope("/webhooks").route(
        "/stripe",
        web::post().to(crate::web::handlers::webhook_handlers::stripe_webhook_handler),
      ))
      // Order Routes
      .service(
        web::scope("/orders")
          .route(
            "",
            web::get().to(crate::web::handlers::order_handlers::list_orders_handler),
          )
          .route(
            "/free",
            web::post().to(crate::web::handlers::order_handlers::create_free_orders_handler),
          )
          .route(
            "/{order_id}/approve",
            web::post().to(crate::web::handlers::order_handlers::approve_order_handler),
          ),
      ),
  );
}
