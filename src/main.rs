use std::sync::Arc;

use dotenvy::dotenv;
use qrph_checkout::config::AppConfig;
use qrph_checkout::infrastructure::coupon_ledger::DieselCouponLedger;
use qrph_checkout::infrastructure::notifier::{HttpNotifier, LogNotifier};
use qrph_checkout::infrastructure::order_repo::DieselOrderRepository;
use qrph_checkout::infrastructure::paymongo::PaymongoClient;
use qrph_checkout::{build_server, create_pool, run_migrations, AppState, SharedNotifier};

fn startup_error(context: &str, e: impl std::fmt::Display) -> std::io::Error {
    std::io::Error::other(format!("{}: {}", context, e))
}

fn main() -> std::io::Result<()> {
    dotenv().ok();
    env_logger::init_from_env(env_logger::Env::default().default_filter_or("info"));

    let config = AppConfig::from_env().map_err(|e| startup_error("configuration", e))?;

    let pool = create_pool(&config.database_url).map_err(|e| startup_error("database pool", e))?;
    run_migrations(&pool).map_err(|e| startup_error("migrations", e))?;

    let gateway = PaymongoClient::new(
        config.paymongo_base_url.clone(),
        config.paymongo_secret_key.clone(),
        config.gateway_timeout,
    )
    .map_err(|e| startup_error("gateway client", e))?;

    let notifier: SharedNotifier = match &config.notify_webhook_url {
        Some(url) => Arc::new(
            HttpNotifier::new(
                url.clone(),
                config.staff_alert_email.clone(),
                config.gateway_timeout,
            )
            .map_err(|e| startup_error("notifier", e))?,
        ),
        None => {
            log::warn!("NOTIFY_WEBHOOK_URL not set; notifications will only be logged");
            Arc::new(LogNotifier)
        }
    };

    let state = AppState::new(
        Arc::new(DieselOrderRepository::new(pool.clone())),
        Arc::new(gateway),
        Arc::new(DieselCouponLedger::new(pool)),
        notifier,
        config.attach_retry,
    );

    log::info!(
        "Starting server at http://{}:{} (gateway {}, attach retries {})",
        config.host,
        config.port,
        config.paymongo_base_url,
        config.attach_retry.max_retries
    );

    // The blocking gateway client is built above, outside any async runtime.
    actix_web::rt::System::new()
        .block_on(async move { build_server(state, &config.host, config.port)?.await })
}
