// Payment Monitor - confirms pending bank-transfer payments
// Polls each monitored bank account's history on a schedule and settles
// matched payments through the reconciliation engine

use actix_web::{web, App, HttpResponse, HttpServer, Responder};
use anyhow::{anyhow, Context};
use payment_reconciler::{metrics, BankClient, ReconciliationEngine};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio_cron_scheduler::{Job, JobScheduler};
use tracing::{error, info, warn};

mod config;
mod pg_store;

use config::Config;
use pg_store::PgStore;

type Engine = ReconciliationEngine<PgStore, BankClient>;

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    info!("🏦 Payment Monitor starting...");

    // Load configuration
    let config = Config::from_env()?;

    let pool = PgPoolOptions::new()
        .max_connections(config.max_db_connections)
        .connect(&config.database_url)
        .await
        .context("Failed to connect to database")?;

    let source = BankClient::new(&config.reconciler)?;
    let engine = Arc::new(ReconciliationEngine::new(
        PgStore::new(pool),
        source,
        config.reconciler.clone(),
    ));

    info!("✅ Reconciliation engine initialized");

    // Start scheduled reconciliation job
    let _scheduler = start_reconciliation_job(engine, &config.schedule).await?;

    // Start HTTP server for health checks
    let server_port = config.server_port;
    info!("🚀 Starting HTTP server on port {}", server_port);

    HttpServer::new(|| {
        App::new()
            .route("/health", web::get().to(health_check))
            .route("/metrics", web::get().to(metrics_endpoint))
    })
    .bind(("0.0.0.0", server_port))?
    .run()
    .await?;

    Ok(())
}

async fn health_check() -> impl Responder {
    HttpResponse::Ok().json(serde_json::json!({
        "status": "healthy",
        "service": "payment-monitor",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

async fn metrics_endpoint() -> impl Responder {
    HttpResponse::Ok()
        .content_type("text/plain; version=0.0.4")
        .body(metrics::gather())
}

async fn start_reconciliation_job(engine: Arc<Engine>, schedule: &str) -> anyhow::Result<JobScheduler> {
    let scheduler = JobScheduler::new()
        .await
        .map_err(|e| anyhow!("Failed to create scheduler: {}", e))?;

    // The engine assumes passes never overlap; a tick that fires while the
    // previous pass is still running is skipped
    let running = Arc::new(Mutex::new(()));

    let job = Job::new_async(schedule, move |_uuid, _lock| {
        let engine = engine.clone();
        let running = running.clone();
        Box::pin(async move {
            let Ok(_guard) = running.try_lock() else {
                warn!("⏳ Previous reconciliation pass still running, skipping tick");
                return;
            };

            info!("🔄 Running reconciliation pass...");
            let summary = engine.run_pass().await;
            match &summary.error {
                Some(e) => error!("Reconciliation pass failed: {}", e),
                None => info!(
                    "✅ Pass complete: checked={}, updated={}, deleted={}",
                    summary.checked, summary.updated, summary.deleted
                ),
            }
        })
    })
    .map_err(|e| anyhow!("Invalid schedule {:?}: {}", schedule, e))?;

    scheduler
        .add(job)
        .await
        .map_err(|e| anyhow!("Failed to add reconciliation job: {}", e))?;

    scheduler
        .start()
        .await
        .map_err(|e| anyhow!("Failed to start scheduler: {}", e))?;

    info!("✅ Reconciliation job scheduled ({})", schedule);

    Ok(scheduler)
}
