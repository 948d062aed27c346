use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use axum::{
    Json, Router,
    http::StatusCode,
    routing::{get, post},
};
use cut_grouper::config::{EngineConfig, Limits, Strategy};
use cut_grouper::logging;
use cut_grouper::solver::Solver;
use cut_grouper::types::{Group, GroupRow, Piece, Solution, deserialize_u32_from_number};
use serde::{Deserialize, Serialize};
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;

#[derive(Deserialize, Serialize)]
struct GroupRequest {
    #[serde(deserialize_with = "deserialize_u32_from_number")]
    min_width: u32,
    #[serde(deserialize_with = "deserialize_u32_from_number")]
    max_width: u32,
    #[serde(default)]
    tolerance: u64,
    #[serde(default = "default_max_partner")]
    max_partner: usize,
    #[serde(default)]
    strategy: Strategy,
    #[serde(default)]
    limits: Option<Limits>,
    /// Cancel the run after this many milliseconds and return what is done.
    #[serde(default)]
    timeout_ms: Option<u64>,
    pieces: Vec<PieceRequest>,
}

#[derive(Deserialize, Serialize)]
struct PieceRequest {
    #[serde(deserialize_with = "deserialize_u32_from_number")]
    id: u32,
    #[serde(deserialize_with = "deserialize_u32_from_number")]
    width: u32,
    #[serde(deserialize_with = "deserialize_u32_from_number")]
    length: u32,
    #[serde(deserialize_with = "deserialize_u32_from_number")]
    qty: u32,
}

fn default_max_partner() -> usize {
    3
}

#[derive(Serialize)]
struct GroupResponse {
    groups: Vec<Group>,
    rows: Vec<GroupRow>,
    residual: Vec<Piece>,
    group_count: usize,
    utilization_percent: f64,
    cancelled: bool,
}

impl From<Solution> for GroupResponse {
    fn from(solution: Solution) -> Self {
        Self {
            rows: solution.rows(),
            group_count: solution.group_count(),
            utilization_percent: solution.utilization_percent(),
            cancelled: solution.cancelled,
            groups: solution.groups,
            residual: solution.residual,
        }
    }
}

fn validate_pieces(pieces: Vec<PieceRequest>) -> Result<Vec<Piece>, String> {
    let mut seen = std::collections::BTreeSet::new();
    pieces
        .into_iter()
        .map(|p| {
            if p.width == 0 || p.length == 0 {
                return Err(format!("piece {}: dimensions must be non-zero", p.id));
            }
            if !seen.insert(p.id) {
                return Err(format!("duplicate piece id {}", p.id));
            }
            Ok(Piece::new(p.id, p.width, p.length, p.qty))
        })
        .collect()
}

async fn group(
    Json(req): Json<GroupRequest>,
) -> Result<Json<GroupResponse>, (StatusCode, String)> {
    tracing::info!(
        body = serde_json::to_string(&req).unwrap_or_default(),
        "POST /group"
    );

    let mut config = EngineConfig::new(req.min_width, req.max_width, req.tolerance, req.max_partner)
        .with_strategy(req.strategy);
    if let Some(limits) = req.limits {
        config = config.with_limits(limits);
    }
    config
        .validate()
        .map_err(|e| (StatusCode::BAD_REQUEST, e.to_string()))?;

    let pieces = validate_pieces(req.pieces).map_err(|e| (StatusCode::BAD_REQUEST, e))?;

    let cancelled = Arc::new(AtomicBool::new(false));
    let timer = req.timeout_ms.map(|ms| {
        let flag = cancelled.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(ms)).await;
            flag.store(true, Ordering::Relaxed);
        })
    });

    let solver = Solver::new(config, pieces).with_cancellation(cancelled);
    let result = tokio::task::spawn_blocking(move || solver.solve()).await;
    if let Some(timer) = timer {
        timer.abort();
    }

    let solution = result.map_err(|e| {
        tracing::error!(error = %e, "solver task failed");
        (StatusCode::INTERNAL_SERVER_ERROR, "solver task failed".to_string())
    })?;

    Ok(Json(solution.into()))
}

#[tokio::main]
async fn main() {
    let _sentry = sentry::init(sentry::ClientOptions {
        dsn: std::env::var("SENTRY_DSN").ok().and_then(|dsn| dsn.parse().ok()),
        release: sentry::release_name!(),
        ..Default::default()
    });

    let log_path = std::env::var("LOG_FILE").unwrap_or_else(|_| "development.log".to_string());
    if let Err(e) = logging::init_file(&log_path) {
        eprintln!("failed to open {log_path}: {e}");
        std::process::exit(1);
    }

    let port = std::env::var("PORT").unwrap_or_else(|_| "3001".to_string());
    let addr = format!("0.0.0.0:{port}");

    let app = Router::new()
        .route("/up", get(|| async { "ok" }))
        .route("/group", post(group))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        );

    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(l) => l,
        Err(e) => {
            eprintln!("failed to bind {addr}: {e}");
            std::process::exit(1);
        }
    };
    eprintln!("Listening on {addr}");
    if let Err(e) = axum::serve(listener, app).await {
        eprintln!("server error: {e}");
        std::process::exit(1);
    }
}
