pub mod auth;
pub mod handlers;

use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, post, put},
    Router,
};

use crate::audit::MemorySink;
use crate::guard::ShareLimitsCache;
use crate::security::CounterStore;
use crate::share::{ShareDefaults, ShareRecordStore};
use self::auth::admin_auth_middleware;
use self::handlers::*;

/// State shared by the owner-management routes.
#[derive(Clone)]
pub struct AdminState {
    pub shares: Arc<dyn ShareRecordStore>,
    pub limits_cache: ShareLimitsCache,
    pub counters: Arc<dyn CounterStore>,
    pub access_log: MemorySink,
    pub share_defaults: ShareDefaults,
    pub api_key: Arc<str>,
}

pub fn setup_admin_router(state: AdminState) -> Router {
    Router::new()
        .route("/admin/status", get(get_status))
        .route("/admin/shares", post(create_share))
        .route("/admin/shares/{token}/status", put(set_share_status))
        .route("/admin/shares/{token}/limits", put(update_share_limits))
        .route("/admin/access-log", get(get_access_log))
        .layer(middleware::from_fn_with_state(state.clone(), admin_auth_middleware))
        .with_state(state)
}
