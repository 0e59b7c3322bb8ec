use axum::{extract::State, Json};
use serde::Serialize;

use crate::admin::AdminState;
use crate::load_balancer::Strategy;

#[derive(Debug, Serialize)]
pub struct SystemStatus {
    pub version: &'static str,
    pub strategy: Strategy,
    pub alive_backends: usize,
    pub total_backends: usize,
}

#[derive(Debug, Serialize)]
pub struct BackendStatus {
    pub address: String,
    pub alive: bool,
    pub connections: usize,
}

pub async fn get_status(State(state): State<AdminState>) -> Json<SystemStatus> {
    Json(SystemStatus {
        version: env!("CARGO_PKG_VERSION"),
        strategy: state.pool.strategy(),
        alive_backends: state.pool.alive_count(),
        total_backends: state.pool.backends().len(),
    })
}

pub async fn get_backends(State(state): State<AdminState>) -> Json<Vec<BackendStatus>> {
    let statuses = state
        .pool
        .backends()
        .iter()
        .map(|b| BackendStatus {
            address: b.url().to_string(),
            alive: b.is_alive(),
            connections: b.connection_count(),
        })
        .collect();

    Json(statuses)
}
