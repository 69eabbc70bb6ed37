use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::admin::AdminState;
use crate::audit::AccessLogEntry;
use crate::security::RateLimits;
use crate::share::model::{check_limits, ShareValidationError};
use crate::share::{NewShare, ShareRecord, ShareStatus, StoreError};

#[derive(Debug, thiserror::Error)]
pub enum AdminError {
    #[error(transparent)]
    Invalid(#[from] ShareValidationError),
    #[error("share not found")]
    NotFound,
    #[error("store failure: {0}")]
    Store(#[from] StoreError),
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

impl IntoResponse for AdminError {
    fn into_response(self) -> Response {
        let status = match &self {
            AdminError::Invalid(_) => StatusCode::BAD_REQUEST,
            AdminError::NotFound => StatusCode::NOT_FOUND,
            AdminError::Store(e) => {
                tracing::error!(error = %e, "Admin store operation failed");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        (status, Json(ErrorBody { error: self.to_string() })).into_response()
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemStatus {
    pub version: &'static str,
    pub status: &'static str,
    pub share_count: usize,
    /// `None` when the counter backend cannot report it.
    pub tracked_counter_keys: Option<usize>,
    pub cached_share_limits: usize,
}

#[derive(Debug, Deserialize)]
pub struct StatusUpdate {
    pub status: ShareStatus,
}

#[derive(Debug, Deserialize)]
pub struct LogQuery {
    pub limit: Option<usize>,
}

const DEFAULT_LOG_LIMIT: usize = 100;

pub async fn get_status(State(state): State<AdminState>) -> Result<Json<SystemStatus>, AdminError> {
    Ok(Json(SystemStatus {
        version: env!("CARGO_PKG_VERSION"),
        status: "operational",
        share_count: state.shares.count().await?,
        tracked_counter_keys: state.counters.tracked_keys(),
        cached_share_limits: state.limits_cache.len(),
    }))
}

pub async fn create_share(
    State(state): State<AdminState>,
    Json(request): Json<NewShare>,
) -> Result<(StatusCode, Json<ShareRecord>), AdminError> {
    let record = request.into_record(&state.share_defaults, Utc::now())?;
    state.shares.put(record.clone()).await?;
    state.limits_cache.remember(&record);
    tracing::info!(share = %record.token, mailbox = %record.mailbox, "Share created");
    Ok((StatusCode::CREATED, Json(record)))
}

pub async fn set_share_status(
    State(state): State<AdminState>,
    Path(token): Path<String>,
    Json(update): Json<StatusUpdate>,
) -> Result<Json<ShareRecord>, AdminError> {
    let record = state
        .shares
        .set_status(&token, update.status)
        .await?
        .ok_or(AdminError::NotFound)?;
    state.limits_cache.remember(&record);
    tracing::info!(share = %token, status = ?update.status, "Share status changed");
    Ok(Json(record))
}

pub async fn update_share_limits(
    State(state): State<AdminState>,
    Path(token): Path<String>,
    Json(limits): Json<RateLimits>,
) -> Result<Json<ShareRecord>, AdminError> {
    check_limits(limits)?;
    let record = state
        .shares
        .update_limits(&token, limits)
        .await?
        .ok_or(AdminError::NotFound)?;
    state.limits_cache.remember(&record);
    tracing::info!(
        share = %token,
        per_second = limits.per_second,
        per_minute = limits.per_minute,
        "Share rate limits updated"
    );
    Ok(Json(record))
}

pub async fn get_access_log(
    State(state): State<AdminState>,
    Query(query): Query<LogQuery>,
) -> Json<Vec<AccessLogEntry>> {
    Json(state.access_log.recent(query.limit.unwrap_or(DEFAULT_LOG_LIMIT)))
}
