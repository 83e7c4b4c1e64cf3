use std::net::{IpAddr, SocketAddr};
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use axum::extract::{ConnectInfo, Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use governor::clock::DefaultClock;
use governor::state::keyed::DefaultKeyedStateStore;
use governor::{Quota, RateLimiter};
use serde::Deserialize;
use serde_json::json;
use tracing::{error, info};

use crate::config::Config;
use crate::fetch::Fetcher;
use crate::merge::Analyzer;

type IpLimiter = RateLimiter<IpAddr, DefaultKeyedStateStore<IpAddr>, DefaultClock>;

/// How often stale per-IP limiter state is dropped.
const LIMITER_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

#[derive(Clone)]
struct AppState {
    cfg: Arc<Config>,
    limiter: Arc<IpLimiter>,
}

/// Run the HTTP API until the process is stopped. The scraping pipeline is
/// blocking, so each request hands off to the blocking thread pool.
pub async fn run(cfg: Config) -> Result<()> {
    let per_minute = NonZeroU32::new(cfg.rate_limit_per_min.max(1))
        .context("rate limit must be positive")?;
    let state = AppState {
        cfg: Arc::new(cfg),
        limiter: Arc::new(RateLimiter::keyed(Quota::per_minute(per_minute))),
    };

    let app = Router::new()
        .route("/health", get(health))
        .route("/api/slate", get(slate))
        .route("/api/player/:name", get(player))
        .with_state(state.clone());

    // Keyed limiter state grows with distinct client IPs; sweep it so the
    // map stays bounded over the process lifetime.
    let sweeper = state.limiter.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(LIMITER_SWEEP_INTERVAL);
        loop {
            interval.tick().await;
            sweeper.retain_recent();
        }
    });

    let addr = SocketAddr::from(([0, 0, 0, 0], state.cfg.port));
    info!(%addr, "listening");
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    .context("server exited")
}

/// Liveness probe. Exempt from rate limiting.
async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

/// Optional manual match URL override for the slate operation, used before
/// team discovery when the caller already knows the roster page.
#[derive(Debug, Deserialize)]
struct SlateParams {
    match_url: Option<String>,
}

async fn slate(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    Query(params): Query<SlateParams>,
) -> Response {
    if let Some(rejection) = check_rate(&state, addr.ip()) {
        return rejection;
    }

    let cfg = state.cfg.clone();
    let match_url = params
        .match_url
        .map(|u| u.trim().to_string())
        .filter(|u| !u.is_empty());
    let result = tokio::task::spawn_blocking(move || {
        let fetcher = Fetcher::new(&cfg.fetch, &cfg.stats_base_url)?;
        Analyzer::new(&fetcher, &cfg).analyze_slate(match_url.as_deref())
    })
    .await;

    match result {
        Ok(Ok(analysis)) => Json(analysis).into_response(),
        Ok(Err(err)) => {
            error!(error = %err, "slate analysis failed");
            (
                StatusCode::BAD_GATEWAY,
                Json(json!({
                    "error": err.to_string(),
                    "players": [],
                    "groups": [],
                })),
            )
                .into_response()
        }
        Err(err) => join_failure(err),
    }
}

async fn player(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    Path(name): Path<String>,
) -> Response {
    if let Some(rejection) = check_rate(&state, addr.ip()) {
        return rejection;
    }
    let name = name.trim().to_string();
    if name.is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "player name is required" })),
        )
            .into_response();
    }

    let cfg = state.cfg.clone();
    let result = tokio::task::spawn_blocking(move || {
        let fetcher = Fetcher::new(&cfg.fetch, &cfg.stats_base_url)?;
        anyhow::Ok(Analyzer::new(&fetcher, &cfg).analyze_player(&name))
    })
    .await;

    match result {
        Ok(Ok(report)) => Json(report).into_response(),
        Ok(Err(err)) => {
            error!(error = %err, "player analysis failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": err.to_string() })),
            )
                .into_response()
        }
        Err(err) => join_failure(err),
    }
}

fn check_rate(state: &AppState, ip: IpAddr) -> Option<Response> {
    if state.limiter.check_key(&ip).is_ok() {
        return None;
    }
    info!(%ip, "rate limit exceeded");
    Some(
        (
            StatusCode::TOO_MANY_REQUESTS,
            Json(json!({ "error": "rate limit exceeded, try again shortly" })),
        )
            .into_response(),
    )
}

fn join_failure(err: tokio::task::JoinError) -> Response {
    error!(error = %err, "blocking task failed");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "error": "internal error" })),
    )
        .into_response()
}
