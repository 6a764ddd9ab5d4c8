mod bootstrap;
mod chains;
mod config;
mod error;
mod refund;
mod wallet;

use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::refund::RefundScheduler;

// Initialize logging and tracing
fn init_tracing() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,htlc_refunder=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    init_tracing();

    info!("🚀 Starting HTLC refunder");

    let config = config::Config::from_env()?;
    info!(
        refund_schedule = ?config.refund_schedule,
        report_schedule = ?config.offset_report_schedule,
        "Configuration loaded"
    );

    let orchestrator = bootstrap::initialize_orchestrator(&config).await?;

    let scheduler = RefundScheduler::new(
        config.refund_schedule,
        config.offset_report_schedule,
        orchestrator.clone(),
    );
    let handles = scheduler.start();

    info!("⏰ Refund scheduler started");

    tokio::signal::ctrl_c().await?;
    warn!("🛑 Shutdown requested, stopping scheduler");

    for handle in handles {
        handle.abort();
    }
    orchestrator.report_offsets();

    info!("👋 Refunder stopped");

    Ok(())
}
