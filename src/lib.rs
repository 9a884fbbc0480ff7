pub mod application;
pub mod config;
pub mod db;
pub mod domain;
pub mod errors;
pub mod handlers;
pub mod infrastructure;
pub mod openapi;
pub mod schema;

use std::sync::Arc;

use actix_web::{middleware::Logger, web, App, HttpServer};
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};

use application::order_service::OrderService;
use application::payment_orchestrator::PaymentOrchestrator;
use application::retry::RetryPolicy;
use application::webhook_processor::WebhookProcessor;
use domain::errors::DomainError;
use domain::ports::{CouponLedger, Notifier, OrderRepository, PaymentGateway};

pub use db::{create_pool, DbPool};

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

/// Run any pending Diesel migrations against the pool's database.
pub fn run_migrations(pool: &DbPool) -> Result<(), DomainError> {
    let mut conn = pool.get()?;
    conn.run_pending_migrations(MIGRATIONS)
        .map_err(|e| DomainError::Internal(format!("migrations failed: {}", e)))?;
    Ok(())
}

pub type SharedRepo = Arc<dyn OrderRepository>;
pub type SharedGateway = Arc<dyn PaymentGateway>;
pub type SharedCoupons = Arc<dyn CouponLedger>;
pub type SharedNotifier = Arc<dyn Notifier>;

/// Services shared by every worker.
#[derive(Clone)]
pub struct AppState {
    pub orders: Arc<OrderService<SharedRepo, SharedNotifier>>,
    pub payments: Arc<PaymentOrchestrator<SharedRepo, SharedGateway>>,
    pub webhooks: Arc<WebhookProcessor<SharedRepo, SharedCoupons, SharedNotifier>>,
}

impl AppState {
    pub fn new(
        repo: SharedRepo,
        gateway: SharedGateway,
        coupons: SharedCoupons,
        notifier: SharedNotifier,
        attach_retry: RetryPolicy,
    ) -> Self {
        Self {
            orders: Arc::new(OrderService::new(repo.clone(), notifier.clone())),
            payments: Arc::new(PaymentOrchestrator::new(repo.clone(), gateway, attach_retry)),
            webhooks: Arc::new(WebhookProcessor::new(repo, coupons, notifier)),
        }
    }
}

/// Route table, shared by the server and the HTTP tests.
pub fn routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/orders")
            .route("", web::post().to(handlers::orders::create_order))
            .route("/{id}", web::get().to(handlers::orders::get_order))
            .route("/{id}/advance", web::post().to(handlers::orders::advance_status))
            .route(
                "/{id}/complete-pickup",
                web::post().to(handlers::orders::complete_pickup),
            ),
    )
    .service(
        web::scope("/payments")
            .route("/qrph", web::post().to(handlers::payments::create_qrph_payment))
            .route(
                "/{orderId}/status",
                web::get().to(handlers::payments::payment_status),
            ),
    )
    .route(
        "/webhooks/paymongo",
        web::post().to(handlers::webhooks::paymongo_webhook),
    );
}

/// Build and return an actix-web `Server` bound to `host:port`.
///
/// The caller is responsible for `.await`-ing (or `tokio::spawn`-ing) the
/// returned server.
pub fn build_server(
    state: AppState,
    host: &str,
    port: u16,
) -> std::io::Result<actix_web::dev::Server> {
    Ok(HttpServer::new(move || {
        App::new()
            .app_data(web::Data::new(state.clone()))
            .wrap(Logger::default())
            .configure(routes)
            .service(openapi::swagger_ui())
    })
    .bind((host.to_string(), port))?
    .run())
}
