//! API routes: accounting runs, sites, constants.
//!
//! The accounting run executes on the blocking pool under a deadline;
//! elapsed deadlines surface as the timeout flavor of the fetch fault.

use crate::accounting::engine::{AccountingRun, CarbonEngine, EngineConfig};
use crate::accounting::fault::AccountingFault;
use crate::accounting::summary::Summary;
use crate::accounting::window::Window;
use crate::store::constants::{ConstantsDoc, KeyPath};
use crate::store::{DataStore, SqliteStore};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
    routing::get,
    Router,
};
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<SqliteStore>,
    pub engine_config: EngineConfig,
    pub accounting_deadline: Duration,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/sites", get(list_sites))
        .route("/api/accounting", get(run_accounting))
        .route(
            "/api/constants/:group",
            get(get_constants).put(put_constant),
        )
        .with_state(state)
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    timestamp: String,
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        timestamp: Utc::now().to_rfc3339(),
    })
}

async fn list_sites(
    State(state): State<AppState>,
) -> Result<Json<Vec<String>>, (StatusCode, String)> {
    let sites = state
        .store
        .list_sites()
        .map_err(|e| (StatusCode::BAD_GATEWAY, e.to_string()))?;
    Ok(Json(sites))
}

#[derive(Debug, Deserialize)]
pub struct AccountingQuery {
    pub site: String,
    /// First reporting-timezone day of the window.
    pub start: NaiveDate,
    /// Last reporting-timezone day of the window, inclusive.
    pub end: NaiveDate,
}

#[derive(Debug, Serialize)]
pub struct AccountingResponse {
    pub site: String,
    pub summary: Summary,
    #[serde(flatten)]
    pub run: AccountingRun,
    pub timestamp: String,
}

async fn run_accounting(
    State(state): State<AppState>,
    Query(query): Query<AccountingQuery>,
) -> Result<Json<AccountingResponse>, (StatusCode, String)> {
    if query.end < query.start {
        return Err((
            StatusCode::BAD_REQUEST,
            "end date precedes start date".to_string(),
        ));
    }

    let window = Window::reporting_days(
        query.start,
        query.end,
        state.engine_config.reporting_offset,
    );

    let site = query.site.clone();
    let store = Arc::clone(&state.store);
    let engine_config = state.engine_config.clone();
    let run_site = site.clone();

    let task = tokio::task::spawn_blocking(move || {
        let engine = CarbonEngine::new(store.as_ref(), engine_config);
        engine.run(&run_site, &window)
    });

    let result = match tokio::time::timeout(state.accounting_deadline, task).await {
        Err(_) => Err(AccountingFault::timeout(format!(
            "accounting run for {site} exceeded {}s",
            state.accounting_deadline.as_secs()
        ))),
        Ok(Err(join_err)) => {
            return Err((StatusCode::INTERNAL_SERVER_ERROR, join_err.to_string()))
        }
        Ok(Ok(run)) => run,
    };

    match result {
        Ok(run) => Ok(Json(AccountingResponse {
            site,
            summary: run.summary(),
            run,
            timestamp: Utc::now().to_rfc3339(),
        })),
        Err(fault) => {
            warn!(site, %fault, "accounting run aborted");
            Err((fault_status(&fault), fault.to_string()))
        }
    }
}

/// Data faults are the operator's to fix (422); storage trouble is a gateway
/// problem (502/504).
fn fault_status(fault: &AccountingFault) -> StatusCode {
    if fault.is_timeout() {
        StatusCode::GATEWAY_TIMEOUT
    } else if fault.is_fetch() {
        StatusCode::BAD_GATEWAY
    } else {
        StatusCode::UNPROCESSABLE_ENTITY
    }
}

async fn get_constants(
    State(state): State<AppState>,
    Path(group): Path<String>,
) -> Result<Json<ConstantsDoc>, (StatusCode, String)> {
    let doc = state
        .store
        .site_constants(&group)
        .map_err(|e| (StatusCode::BAD_GATEWAY, e.to_string()))?;
    Ok(Json(doc))
}

#[derive(Debug, Deserialize)]
pub struct ConstantUpdate {
    pub path: String,
    pub value: f64,
}

#[derive(Debug, Serialize)]
pub struct ConstantUpdated {
    pub group: String,
    pub path: String,
    pub value: f64,
}

async fn put_constant(
    State(state): State<AppState>,
    Path(group): Path<String>,
    Json(update): Json<ConstantUpdate>,
) -> Result<Json<ConstantUpdated>, (StatusCode, String)> {
    let path: KeyPath = update
        .path
        .parse()
        .map_err(|e: crate::store::constants::InvalidKeyPath| {
            (StatusCode::BAD_REQUEST, e.to_string())
        })?;

    state
        .store
        .set_constant(&group, &path, update.value)
        .map_err(|e| (StatusCode::BAD_GATEWAY, e.to_string()))?;

    Ok(Json(ConstantUpdated {
        group,
        path: path.to_string(),
        value: update.value,
    }))
}
