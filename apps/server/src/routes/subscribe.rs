use actix_web::{HttpResponse, post, web};
use serde::{Deserialize, Serialize};
use statusboard::{SubscribeOutcome, SubscriptionError};
use tracing::error;

use crate::state::AppState;

macros_utils::routes! {
    route subscribe_route,
}

#[derive(Debug, Deserialize)]
pub struct SubscribeForm {
    email: Option<String>,
}

#[derive(Debug, Serialize)]
struct SubscribeReply {
    success: bool,
    message: String,
}

impl SubscribeReply {
    fn new(success: bool, message: impl Into<String>) -> Self {
        Self { success, message: message.into() }
    }
}

/// Subscribe an email address to status updates
#[post("/api/subscribe")]
pub async fn subscribe_route(state: web::Data<AppState>, form: web::Form<SubscribeForm>) -> HttpResponse {
    let email = form.into_inner().email.unwrap_or_default();

    match state.subscriptions.subscribe(&email).await {
        Ok(SubscribeOutcome::Added) | Ok(SubscribeOutcome::AlreadySubscribed) => HttpResponse::Ok().json(
            SubscribeReply::new(true, format!("{} is now subscribed to status updates", email.trim())),
        ),
        Err(SubscriptionError::InvalidEmail) => {
            HttpResponse::BadRequest().json(SubscribeReply::new(false, "Invalid or missing email address"))
        }
        Err(err) => {
            error!(error = %err, "failed to store subscription");
            HttpResponse::InternalServerError()
                .json(SubscribeReply::new(false, "Could not save the subscription. Please try again."))
        }
    }
}

#[cfg(test)]
mod tests {
    use actix_web::{App, http::StatusCode, test};
    use serde_json::Value;

    use crate::state::testing::app_state;

    #[actix_web::test]
    async fn test_subscribe_stores_once() {
        let (state, _dir) = app_state();
        let app = test::init_service(App::new().app_data(state.clone()).configure(super::routes)).await;

        for _ in 0..2 {
            let request = test::TestRequest::post()
                .uri("/api/subscribe")
                .set_form([("email", "ops@example.com")])
                .to_request();
            let response = test::call_service(&app, request).await;
            assert_eq!(response.status(), StatusCode::OK);

            let body: Value = test::read_body_json(response).await;
            assert_eq!(body["success"], true);
        }

        assert_eq!(state.subscriptions.subscribers().await.unwrap(), vec!["ops@example.com"]);
    }

    #[actix_web::test]
    async fn test_subscribe_rejects_invalid_email() {
        let (state, _dir) = app_state();
        let app = test::init_service(App::new().app_data(state).configure(super::routes)).await;

        let request = test::TestRequest::post()
            .uri("/api/subscribe")
            .set_form([("email", "not-an-email")])
            .to_request();
        let response = test::call_service(&app, request).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body: Value = test::read_body_json(response).await;
        assert_eq!(body["success"], false);

        let request = test::TestRequest::post()
            .uri("/api/subscribe")
            .set_form([("name", "nobody")])
            .to_request();
        let response = test::call_service(&app, request).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
