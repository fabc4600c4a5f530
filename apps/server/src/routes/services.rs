use actix_web::{HttpResponse, get, post, web};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::json;
use statusboard::{OverallStatus, ServiceState, ServiceStatus, StatusSnapshot, format_duration};

use crate::error::AppError;
use crate::state::AppState;

macros_utils::routes! {
    route services_route,
    route service_route,
    route refresh_route,
}

/// Service state as shown on the dashboard
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ServiceView {
    #[serde(flatten)]
    state: ServiceState,
    /// "down for" badge, only while offline
    #[serde(skip_serializing_if = "Option::is_none")]
    downtime_label: Option<String>,
}

impl From<ServiceState> for ServiceView {
    fn from(state: ServiceState) -> Self {
        let downtime_label = (state.status == ServiceStatus::Offline && state.is_down())
            .then(|| format_duration(state.current_downtime_duration_sec));
        Self { state, downtime_label }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct DashboardView {
    services: Vec<ServiceView>,
    last_updated_at: DateTime<Utc>,
    is_refreshing: bool,
    overall: OverallStatus,
}

impl From<StatusSnapshot> for DashboardView {
    fn from(snapshot: StatusSnapshot) -> Self {
        Self {
            services: snapshot.services.into_iter().map(ServiceView::from).collect(),
            last_updated_at: snapshot.last_updated_at,
            is_refreshing: snapshot.is_refreshing,
            overall: snapshot.overall,
        }
    }
}

/// Every service with the shared refresh metadata
#[get("/api/services")]
pub async fn services_route(state: web::Data<AppState>) -> HttpResponse {
    HttpResponse::Ok().json(DashboardView::from(state.monitor.snapshot().await))
}

/// One service by id
#[get("/api/services/{id}")]
pub async fn service_route(state: web::Data<AppState>, id: web::Path<String>) -> Result<HttpResponse, AppError> {
    let id = id.into_inner();
    let service = state.monitor.service(&id).await.ok_or(AppError::ServiceNotFound(id))?;
    Ok(HttpResponse::Ok().json(ServiceView::from(service)))
}

/// Probe every service now
///
/// Answers 202 without waiting when a refresh is already running.
#[post("/api/refresh")]
pub async fn refresh_route(state: web::Data<AppState>) -> HttpResponse {
    if state.monitor.refresh_all().await {
        HttpResponse::Ok().json(DashboardView::from(state.monitor.snapshot().await))
    } else {
        HttpResponse::Accepted().json(json!({ "refreshing": true }))
    }
}

#[cfg(test)]
mod tests {
    use actix_web::{App, http::StatusCode, test};
    use serde_json::Value;

    use crate::state::testing::app_state;

    #[actix_web::test]
    async fn test_services_lists_initial_state() {
        let (state, _dir) = app_state();
        let app = test::init_service(App::new().app_data(state).configure(super::routes)).await;

        let body: Value =
            test::call_and_read_body_json(&app, test::TestRequest::get().uri("/api/services").to_request()).await;

        assert_eq!(body["overall"], "disruption");
        assert_eq!(body["isRefreshing"], false);
        assert!(body["lastUpdatedAt"].is_string());

        let services = body["services"].as_array().unwrap();
        assert_eq!(services.len(), 2);
        assert_eq!(services[0]["id"], "web-server");
        assert_eq!(services[0]["status"], "unknown");
        assert_eq!(services[0]["uptime"], 100.0);
        assert_eq!(services[0]["history"].as_array().unwrap().len(), 25);
        assert!(services[0].get("downtimeLabel").is_none());
    }

    #[actix_web::test]
    async fn test_unknown_service_is_404() {
        let (state, _dir) = app_state();
        let app = test::init_service(App::new().app_data(state).configure(super::routes)).await;

        let response =
            test::call_service(&app, test::TestRequest::get().uri("/api/services/nope").to_request()).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let body: Value = test::read_body_json(response).await;
        assert_eq!(body["error"], "Service not found: nope");
    }

    #[actix_web::test]
    async fn test_refresh_confirms_after_three_rounds() {
        let (state, _dir) = app_state();
        let app = test::init_service(App::new().app_data(state).configure(super::routes)).await;

        let mut body = Value::Null;
        for _ in 0..3 {
            let response =
                test::call_service(&app, test::TestRequest::post().uri("/api/refresh").to_request()).await;
            assert_eq!(response.status(), StatusCode::OK);
            body = test::read_body_json(response).await;
        }

        assert_eq!(body["services"][0]["status"], "online");
        assert_eq!(body["services"][0]["responseTimeMs"], 7);
        // unknown to offline opens no downtime episode
        assert_eq!(body["services"][1]["status"], "offline");
        assert!(body["services"][1].get("downtimeLabel").is_none());

        let service: Value = test::call_and_read_body_json(
            &app,
            test::TestRequest::get().uri("/api/services/web-server").to_request(),
        )
        .await;
        assert_eq!(service["checkCount"], 1);
        assert_eq!(service["uptime"], 100.0);
    }
}
