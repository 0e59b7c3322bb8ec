//! Admin API, served on its own listener.
//!
//! # Endpoints
//! - `GET /admin/status`: version, strategy, alive backend count
//! - `GET /admin/backends`: per-backend health and in-flight requests
//!
//! All endpoints require `Authorization: Bearer <api_key>`.

pub mod auth;
pub mod handlers;

use std::sync::Arc;

use axum::{middleware, routing::get, Router};

use crate::load_balancer::BackendPool;

use self::auth::admin_auth_middleware;
use self::handlers::{get_backends, get_status};

/// State shared by admin handlers.
#[derive(Clone)]
pub struct AdminState {
    pub pool: Arc<BackendPool>,
    pub api_key: Arc<str>,
}

pub fn setup_admin_router(state: AdminState) -> Router {
    Router::new()
        .route("/admin/status", get(get_status))
        .route("/admin/backends", get(get_backends))
        .layer(middleware::from_fn_with_state(state.clone(), admin_auth_middleware))
        .with_state(state)
}
