use std::time::Duration;

use actix_web::{HttpResponse, get, web};
use serde::Deserialize;
use statusboard::{DEFAULT_PORT, DEFAULT_TIMEOUT_MS, ProbeReport};
use tracing::debug;

use crate::error::AppError;
use crate::state::AppState;

macros_utils::routes! {
    route check_status_route,
}

/// Upper bound for a caller supplied timeout
const MAX_TIMEOUT_MS: u64 = 30_000;

#[derive(Debug, Deserialize)]
pub struct CheckStatusQuery {
    address: Option<String>,
    /// Milliseconds
    timeout: Option<u64>,
    port: Option<u16>,
}

/// Probe an arbitrary address once
#[get("/api/check-status")]
pub async fn check_status_route(
    state: web::Data<AppState>,
    query: web::Query<CheckStatusQuery>,
) -> Result<HttpResponse, AppError> {
    let query = query.into_inner();
    let address = query
        .address
        .map(|address| address.trim().to_string())
        .filter(|address| !address.is_empty())
        .ok_or(AppError::MissingAddress)?;
    if address.starts_with('-') {
        return Err(AppError::InvalidAddress(address));
    }

    let port = query.port.unwrap_or(DEFAULT_PORT);
    let timeout = Duration::from_millis(query.timeout.unwrap_or(DEFAULT_TIMEOUT_MS).clamp(1, MAX_TIMEOUT_MS));

    let outcome = state.prober.probe(&address, port, timeout).await;
    debug!(%address, port, status = %outcome.status, "on-demand check");

    Ok(HttpResponse::Ok().json(ProbeReport::new(address, port, &outcome)))
}
