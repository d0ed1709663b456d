pub mod health;

use axum::{
    routing::{get, post},
    Router,
};

use crate::feedback::handlers;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Feedback API
        .route("/api/feedback/annotate", post(handlers::handle_annotate))
        .route("/api/feedback/rewrite", post(handlers::handle_rewrite))
        .route("/api/feedback/process", post(handlers::handle_process))
        // Interview simulator webhook
        .route("/api/sim/feedback", post(handlers::handle_simulation_feedback))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    use axum::{
        body::{to_bytes, Body},
        http::{Request, StatusCode},
    };
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use crate::config::Config;
    use crate::feedback::orchestrator::RewriteOrchestrator;
    use crate::feedback::prompts::RubricPromptBuilder;
    use crate::llm_client::FakeLlmClient;

    fn app(sim_secret: Option<&str>) -> Router {
        let secret = sim_secret.map(str::to_string);
        let config = Config::from_lookup(|key| match key {
            "LLM_MODE" => Some("fake".to_string()),
            "SIM_SHARED_SECRET" => secret.clone(),
            _ => None,
        })
        .unwrap();
        let orchestrator = RewriteOrchestrator::new(
            Arc::new(FakeLlmClient),
            Arc::new(RubricPromptBuilder),
            config.rewrite_max_parallel,
            Duration::from_secs(1),
        );
        build_router(AppState {
            orchestrator,
            config,
        })
    }

    async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    fn post_json(uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn feedback_body() -> Value {
        json!({
            "apiVersion": "1.0",
            "sessionId": "s1",
            "jdKeywords": ["Kafka"],
            "qas": [
                {"qid": "q1", "question": "Q1", "answer": "저는 열심히 했다"},
                {"qid": "q2", "answer": "Kafka 컨슈머 재시도 로직을 도입해 오류율 40%→10%로 낮췄습니다"}
            ]
        })
    }

    #[tokio::test]
    async fn test_health() {
        let request = Request::builder().uri("/health").body(Body::empty()).unwrap();
        let (status, body) = send(app(None), request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
        assert_eq!(body["service"], "feedback-api");
    }

    #[tokio::test]
    async fn test_annotate_returns_annotations_without_rewrite() {
        let (status, body) = send(app(None), post_json("/api/feedback/annotate", feedback_body())).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["apiVersion"], "1.0");
        assert_eq!(body["sessionId"], "s1");
        assert_eq!(body["checklist"].as_array().unwrap().len(), 3);
        let first = &body["items"][0];
        assert_eq!(first["qid"], "q1");
        assert_eq!(first["annotations"].as_array().unwrap().len(), 3);
        assert_eq!(first["rewrite"], "");
        assert_eq!(first["jdInsert"], json!([]));
        let vague = first["annotations"]
            .as_array()
            .unwrap()
            .iter()
            .find(|a| a["category"] == "vague")
            .unwrap();
        assert_eq!(vague["span"], json!({"start": 7, "end": 9, "text": "했다"}));
        assert!(body["items"][1]["annotations"].as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_process_rewrites_flagged_items_only() {
        let (status, body) = send(app(None), post_json("/api/feedback/process", feedback_body())).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["items"][0]["rewrite"], "FAKE");
        assert_eq!(body["items"][0]["jdInsert"], json!(["fake"]));
        assert_eq!(
            body["items"][1]["rewrite"],
            "Kafka 컨슈머 재시도 로직을 도입해 오류율 40%→10%로 낮췄습니다"
        );
    }

    #[tokio::test]
    async fn test_rewrite_uses_supplied_annotations() {
        let annotated = send(app(None), post_json("/api/feedback/annotate", feedback_body())).await.1;
        let request = post_json(
            "/api/feedback/rewrite",
            json!({"response": annotated, "jdKeywords": ["Kafka"]}),
        );

        let (status, body) = send(app(None), request).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["items"][0]["rewrite"], "FAKE");
        assert_eq!(body["items"][0]["annotations"].as_array().unwrap().len(), 3);
        assert!(body["items"][1]["jdInsert"].as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_invalid_request_returns_400_envelope() {
        let mut body = feedback_body();
        body["qas"] = json!([]);

        let (status, body) = send(app(None), post_json("/api/feedback/annotate", body)).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "BAD_REQUEST");
        assert!(body["error"]["message"].as_str().unwrap().contains("qas"));
    }

    #[tokio::test]
    async fn test_simulation_without_secret_configured() {
        let payload = json!({
            "entries": [{"answer": "저는 열심히 했다", "askedAt": 1}],
            "jdKeywords": ["Kafka"],
            "meta": {"source": "sim"}
        });

        let (status, body) = send(app(None), post_json("/api/sim/feedback", payload)).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["sessionId"], "sim_unknown");
        assert_eq!(body["items"][0]["qid"], "q1");
        assert_eq!(body["items"][0]["rewrite"], "FAKE");
    }

    #[tokio::test]
    async fn test_simulation_secret_is_enforced() {
        let payload = json!({"sessionId": "sim-1", "entries": []});

        let (status, body) = send(app(Some("s3cret")), post_json("/api/sim/feedback", payload.clone())).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"]["code"], "UNAUTHORIZED");

        let mut request = post_json("/api/sim/feedback", payload);
        request
            .headers_mut()
            .insert(handlers::SIM_SECRET_HEADER, "s3cret".parse().unwrap());
        let (status, body) = send(app(Some("s3cret")), request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["sessionId"], "sim-1");
    }
}
