//! Outreach API Server
//!
//! Automates event invitations to talents: batched sends with per-promoter
//! throttling, followups and thank-you messages, LLM interpretation of
//! replies and a trust ledger between talents and promoters.
//! Uses hexagonal (ports & adapters) architecture for clean separation of concerns.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use axum::{
    middleware,
    routing::{delete, get, patch, post},
    Json, Router,
};
use sea_orm::Database;
use serde::Serialize;
use tower_governor::governor::GovernorConfigBuilder;
use tower_governor::key_extractor::PeerIpKeyExtractor;
use tower_governor::GovernorLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod adapters;
mod app;
mod auth;
mod config;
mod domain;
mod entity;
mod error;
mod handlers;

#[cfg(test)]
mod test_utils;

use adapters::{
    ConfiguredDispatcher, OpenAiClient, PostgresCampaignRepository, PostgresInvitationRepository,
    PostgresMessageRepository, PostgresSpintaxTemplateRepository, PostgresTalentRepository,
    PostgresTrustRepository,
};
use app::{
    CadenceScheduler, CampaignStatsService, InvitationService, OutreachService,
    ReplyProcessingService, SchedulerSettings, StagePipeline, TrustLedgerService,
};
use config::Config;
use domain::entities::Stage;

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub invitation_service: Arc<
        InvitationService<
            PostgresCampaignRepository,
            PostgresTalentRepository,
            PostgresInvitationRepository,
            PostgresMessageRepository,
            PostgresTrustRepository,
        >,
    >,
    pub stats_service:
        Arc<CampaignStatsService<PostgresInvitationRepository, PostgresMessageRepository>>,
    pub trust_ledger: Arc<TrustLedgerService<PostgresTrustRepository>>,
    pub config: Config,
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
    }
    tracing::info!("Shutdown signal received");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,outreach_api=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Outreach API...");

    // Load configuration
    let config = Config::from_env()?;

    // Connect to PostgreSQL
    tracing::info!("Connecting to database...");
    let db = Database::connect(&config.database_url)
        .await
        .context("Failed to connect to database")?;
    tracing::info!("Database connected");

    // Create adapters
    let campaign_repo = Arc::new(PostgresCampaignRepository::new(db.clone()));
    let talent_repo = Arc::new(PostgresTalentRepository::new(db.clone()));
    let invitation_repo = Arc::new(PostgresInvitationRepository::new(db.clone()));
    let message_repo = Arc::new(PostgresMessageRepository::new(db.clone()));
    let template_repo = Arc::new(PostgresSpintaxTemplateRepository::new(db.clone()));
    let trust_repo = Arc::new(PostgresTrustRepository::new(db.clone()));

    if config.openai_api_key.is_none() {
        tracing::warn!("OPENAI_API_KEY not set - replies will stay queued until it is configured");
    }
    let llm_client = Arc::new(OpenAiClient::new(
        config.openai_base_url.clone(),
        config.openai_api_key.clone(),
        config.openai_model.clone(),
    ));
    let dispatcher = Arc::new(ConfiguredDispatcher::from_config(&config));

    // Create application services
    let trust_ledger = Arc::new(TrustLedgerService::new(trust_repo.clone()));

    let invitation_service = Arc::new(InvitationService::new(
        campaign_repo.clone(),
        talent_repo.clone(),
        invitation_repo.clone(),
        message_repo.clone(),
        trust_repo.clone(),
    ));

    let stats_service = Arc::new(CampaignStatsService::new(
        invitation_repo.clone(),
        message_repo.clone(),
    ));

    let settings = SchedulerSettings::default().with_tick_secs(config.scheduler_tick_secs);

    let outreach_service = Arc::new(OutreachService::new(
        campaign_repo.clone(),
        talent_repo.clone(),
        invitation_repo.clone(),
        message_repo.clone(),
        template_repo.clone(),
        dispatcher.clone(),
        settings.clone(),
    ));

    let reply_service = Arc::new(ReplyProcessingService::new(
        invitation_repo.clone(),
        message_repo.clone(),
        trust_ledger.clone(),
        llm_client.clone(),
    ));

    // Start the cadence scheduler
    let scheduler = if config.scheduler_enabled {
        let mut scheduler = CadenceScheduler::new(settings.tick);
        for stage in Stage::ALL {
            scheduler = scheduler.with_pipeline(Arc::new(StagePipeline::new(
                stage,
                outreach_service.clone(),
            )));
        }
        Some(scheduler.with_pipeline(reply_service).start())
    } else {
        tracing::info!("Scheduler disabled");
        None
    };

    // Create app state
    let state = AppState {
        invitation_service,
        stats_service,
        trust_ledger,
        config: config.clone(),
    };

    // Rate limiting config: 5 req/sec sustained, burst of 20
    // Uses PeerIpKeyExtractor to get the listener's IP from the socket connection
    let governor_config = Arc::new(
        GovernorConfigBuilder::default()
            .key_extractor(PeerIpKeyExtractor)
            .per_second(5)
            .burst_size(20)
            .finish()
            .context("Failed to build governor config")?,
    );

    // Rate-limited routes (inbound channel callbacks, signature verified)
    let rate_limited_routes = Router::new()
        .route("/inbound/replies", post(handlers::record_reply))
        .layer(GovernorLayer {
            config: governor_config,
        });

    // Build router
    let app = Router::new()
        // Health check (no auth)
        .route("/health", get(health))
        .merge(rate_limited_routes)
        // Promoter-scoped routes
        .merge(
            Router::new()
                .route(
                    "/campaign-invitations/mark-attended",
                    patch(handlers::mark_attended),
                )
                .route(
                    "/campaign-invitations/mark-followup",
                    patch(handlers::mark_followup),
                )
                .route(
                    "/campaign-invitations/campaign/:campaign_id",
                    get(handlers::list_invitations).post(handlers::add_talents),
                )
                .route(
                    "/campaign-invitations/campaign/:campaign_id/:invitation_id",
                    delete(handlers::remove_invitation),
                )
                .route(
                    "/campaigns/:campaign_id/batches/:batch/can-start",
                    get(handlers::can_start_batch),
                )
                .route(
                    "/campaigns/:campaign_id/stats",
                    get(handlers::campaign_stats),
                )
                .route(
                    "/campaigns/:campaign_id/recommendations",
                    get(handlers::recommend_talents),
                )
                .route("/trust/:talent_id", get(handlers::get_trust_state))
                .route(
                    "/trust/:talent_id/adjustments",
                    post(handlers::adjust_trust),
                )
                .route_layer(middleware::from_fn(auth::promoter_middleware)),
        )
        // Middleware
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .context("Server error")?;

    // Let in-flight ticks finish before exiting
    if let Some(handle) = scheduler {
        tracing::info!("Draining scheduler...");
        handle.shutdown().await;
    }

    tracing::info!("Outreach API stopped");
    Ok(())
}
