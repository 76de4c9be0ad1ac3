use crate::{
    axum_http::{default_routers, routers},
    config::config_model::{BackendServer, DotEnvyConfig},
};
use anyhow::{Context, Result};
use axum::{
    Router,
    http::{
        HeaderValue,
        header::{
            ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_METHODS,
            ACCESS_CONTROL_ALLOW_ORIGIN,
        },
    },
    routing::get,
};
use crates::{
    infra::{
        db::postgres::postgres_connection::PgPoolSquad,
        identity::supabase_auth::SupabaseAuthClient,
    },
    payments::stripe_client::StripeClient,
};
use std::{net::SocketAddr, sync::Arc, time::Duration};
use tokio::net::TcpListener;
use tower_http::{
    limit::RequestBodyLimitLayer, set_header::SetResponseHeaderLayer, trace::TraceLayer,
};
use tracing::info;

const CORS_ALLOW_HEADERS: &str = "authorization, x-client-info, apikey, content-type";
const CORS_ALLOW_METHODS: &str = "POST, OPTIONS";

pub async fn start(config: Arc<DotEnvyConfig>, db_pool: Arc<PgPoolSquad>) -> Result<()> {
    let upstream_timeout = Duration::from_secs(config.backend_server.timeout);

    let identity = SupabaseAuthClient::new(
        &config.supabase.project_url,
        config.supabase.api_key.clone(),
        upstream_timeout,
    )?;
    let stripe_client = StripeClient::new(
        config.stripe.secret_key.clone(),
        config.stripe.api_base.clone(),
        upstream_timeout,
    )?;

    let api = routers::subscription_cancellation::routes(
        Arc::clone(&db_pool),
        Arc::new(identity),
        Arc::new(stripe_client),
    );
    let app = build_app(api, &config.backend_server)?;

    let addr = SocketAddr::from(([0, 0, 0, 0], config.backend_server.port));
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;

    info!("Server is running on port {}", config.backend_server.port);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

/// Wraps the API routes with the health check, fallback and the shared middleware stack.
/// CORS headers are permissive for every origin; browsers call the endpoint directly.
/// `SERVER_TIMEOUT` bounds the upstream calls only, so a slow provider still ends in a JSON error.
pub fn build_app(api: Router, server: &BackendServer) -> Result<Router> {
    let body_limit: usize = server
        .body_limit
        .checked_mul(1024 * 1024)
        .and_then(|bytes| usize::try_from(bytes).ok())
        .context("SERVER_BODY_LIMIT is too large")?;

    let app = Router::new()
        .merge(api)
        .route("/health-check", get(default_routers::health_check))
        .fallback(default_routers::not_found)
        .layer(RequestBodyLimitLayer::new(body_limit))
        .layer(SetResponseHeaderLayer::overriding(
            ACCESS_CONTROL_ALLOW_ORIGIN,
            HeaderValue::from_static("*"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            ACCESS_CONTROL_ALLOW_HEADERS,
            HeaderValue::from_static(CORS_ALLOW_HEADERS),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            ACCESS_CONTROL_ALLOW_METHODS,
            HeaderValue::from_static(CORS_ALLOW_METHODS),
        ))
        .layer(TraceLayer::new_for_http());

    Ok(app)
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %err, "Failed to install CTRL+C signal handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                tracing::error!(error = %err, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received ctrl+C signal"),
        _ = terminate => info!("Received terminate signal"),
    }
}
