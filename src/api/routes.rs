use std::sync::Arc;

use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use tracing::debug;

use crate::aggregator::Aggregator;
use crate::error::AppError;
use crate::message::{Request, Response};
use crate::store::KvStore;

pub struct ApiState<S> {
    pub aggregator: Arc<Aggregator<S>>,
}

impl<S> Clone for ApiState<S> {
    fn clone(&self) -> Self {
        Self {
            aggregator: Arc::clone(&self.aggregator),
        }
    }
}

pub fn router<S: KvStore + 'static>(state: ApiState<S>) -> Router {
    Router::new()
        .route("/message", post(handle_message::<S>))
        .route("/health", get(health))
        .with_state(state)
}

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// The body is parsed by hand so that any unrecognizable message maps to 400
/// through `AppError::Json`, rather than axum's own rejection codes.
async fn handle_message<S: KvStore + 'static>(
    State(state): State<ApiState<S>>,
    body: String,
) -> Result<Json<Response>, AppError> {
    let request: Request = serde_json::from_str(&body)?;
    debug!(action = request.action(), "Message received");
    Ok(Json(state.aggregator.handle(request).await))
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

/// Serves `aggregator` on an ephemeral local port and returns its base URL.
#[cfg(test)]
pub(crate) async fn spawn_test_server<S: KvStore + 'static>(aggregator: Arc<Aggregator<S>>) -> String {
    let app = router(ApiState { aggregator });
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    format!("http://{addr}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;
    use axum::response::IntoResponse;

    use crate::aggregator::WriteDiscipline;
    use crate::store::MemoryStore;

    fn state() -> ApiState<MemoryStore> {
        ApiState {
            aggregator: Arc::new(Aggregator::new(MemoryStore::new(), WriteDiscipline::Unserialized)),
        }
    }

    #[tokio::test]
    async fn track_then_stats_through_handler() {
        let state = state();
        let body = r#"{"action":"trackActivity","data":{"type":"listing_viewed","marketplace":"ebay","url":"https://www.ebay.com/itm/1"}}"#;
        let Json(resp) = handle_message(State(state.clone()), body.to_string()).await.unwrap();
        let json = serde_json::to_value(resp).unwrap();
        assert_eq!(json, serde_json::json!({ "accepted": true, "totalActivities": 1 }));

        let Json(resp) = handle_message(State(state), r#"{"action":"getStats"}"#.to_string())
            .await
            .unwrap();
        let json = serde_json::to_value(resp).unwrap();
        assert_eq!(json["totalActivities"], 1);
        assert_eq!(json["recentActivities"][0]["marketplace"], "ebay");
    }

    #[tokio::test]
    async fn missing_fields_are_a_rejected_event_not_a_bad_request() {
        let body = r#"{"action":"trackActivity","data":{"url":"https://www.ozon.ru/"}}"#;
        let Json(resp) = handle_message(State(state()), body.to_string()).await.unwrap();
        let json = serde_json::to_value(resp).unwrap();
        assert_eq!(json["accepted"], false);
    }

    #[tokio::test]
    async fn undecodable_event_payloads_are_refused_not_bad_requests() {
        let state = state();
        let bodies = [
            r#"{"action":"trackActivity"}"#,
            r#"{"action":"trackActivity","data":{"type":7,"marketplace":"ebay"}}"#,
            r#"{"action":"trackActivity","data":{"type":"listings_viewed","marketplace":"ebay","count":-1}}"#,
            r#"{"action":"trackActivity","data":{"type":"listings_viewed","marketplace":"ebay","listings":[{"title":"x"}]}}"#,
            r#"{"action":"trackActivity","data":{"type":"listing_viewed","marketplace":"ebay","url":null}}"#,
        ];
        for body in bodies {
            let Json(resp) = handle_message(State(state.clone()), body.to_string())
                .await
                .unwrap_or_else(|e| panic!("{body} was not answered: {e}"));
            let json = serde_json::to_value(resp).unwrap();
            assert_eq!(json, serde_json::json!({ "accepted": false, "totalActivities": 0 }), "{body}");
        }

        let Json(resp) = handle_message(State(state), r#"{"action":"getStats","data":{}}"#.to_string())
            .await
            .unwrap();
        let json = serde_json::to_value(resp).unwrap();
        assert_eq!(json["totalActivities"], 0);
    }

    #[tokio::test]
    async fn unrecognized_message_is_bad_request() {
        let err = handle_message(State(state()), "{\"action\":\"nope\"}".to_string())
            .await
            .unwrap_err();
        assert_eq!(err.into_response().status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn health_over_http() {
        let base = spawn_test_server(state().aggregator).await;
        let resp = reqwest::get(format!("{base}/health")).await.unwrap();
        assert!(resp.status().is_success());
        let body: serde_json::Value = resp.json().await.unwrap();
        assert_eq!(body["status"], "ok");
    }
}
