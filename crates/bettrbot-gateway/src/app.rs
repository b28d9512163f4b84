use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use bettrbot_agent::Coach;
use bettrbot_core::config::BettrConfig;
use tower_http::{
    cors::{Any, CorsLayer},
    services::ServeDir,
    trace::TraceLayer,
};

/// Shared state handed to every handler as `Arc<AppState>`.
pub struct AppState {
    pub config: BettrConfig,
    /// Sole owner of the per-user conversation store.
    pub coach: Coach,
}

impl AppState {
    pub fn new(config: BettrConfig, coach: Coach) -> Self {
        Self { config, coach }
    }
}

/// Assemble the full Axum router.
pub fn build_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let static_files = ServeDir::new(&state.config.gateway.static_dir);

    Router::new()
        .route("/", get(crate::http::ui::ui_handler))
        .route("/chat/", post(crate::http::chat::chat_handler))
        .route("/chat", post(crate::http::chat::chat_handler))
        .route("/test-gemini", get(crate::http::probe::probe_handler))
        .route("/health", get(crate::http::health::health_handler))
        .nest_service("/static", static_files)
        .with_state(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use axum::{
        body::{to_bytes, Body},
        http::{Request, StatusCode},
    };
    use bettrbot_agent::provider::{ChatRequest, ChatResponse, LlmProvider, ProviderError};
    use bettrbot_agent::{AgentRuntime, Coach};
    use bettrbot_sessions::Turn;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    struct Fixed(&'static str);

    #[async_trait]
    impl LlmProvider for Fixed {
        fn name(&self) -> &str {
            "fixed"
        }
        async fn send(&self, req: &ChatRequest) -> Result<ChatResponse, ProviderError> {
            Ok(ChatResponse {
                content: self.0.to_string(),
                model: req.model.clone(),
                tokens_in: 1,
                tokens_out: 1,
                stop_reason: "STOP".to_string(),
            })
        }
    }

    struct Down {
        models: Option<Vec<String>>,
    }

    #[async_trait]
    impl LlmProvider for Down {
        fn name(&self) -> &str {
            "down"
        }
        async fn send(&self, _req: &ChatRequest) -> Result<ChatResponse, ProviderError> {
            Err(ProviderError::Api {
                status: 503,
                message: "overloaded".to_string(),
            })
        }
        async fn list_models(&self) -> Result<Vec<String>, ProviderError> {
            self.models
                .clone()
                .ok_or_else(|| ProviderError::Unavailable("no listing".to_string()))
        }
    }

    fn state(provider: impl LlmProvider + 'static) -> Arc<AppState> {
        let config = BettrConfig::default();
        let runtime = AgentRuntime::new(Box::new(provider), config.agent.model.clone());
        let coach = Coach::new(runtime, &config.agent);
        Arc::new(AppState::new(config, coach))
    }

    async fn post_chat(router: &Router, body: String) -> (StatusCode, Value) {
        post_json(router, "/chat/", body).await
    }

    async fn post_json(router: &Router, uri: &str, body: String) -> (StatusCode, Value) {
        let resp = router
            .clone()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri(uri)
                    .header("content-type", "application/json")
                    .body(Body::from(body))
                    .unwrap(),
            )
            .await
            .unwrap();
        let status = resp.status();
        let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    async fn get_json(router: &Router, uri: &str) -> (StatusCode, Value) {
        let resp = router
            .clone()
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = resp.status();
        let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn chat_quick_reply() {
        let router = build_router(state(Fixed("- unused")));

        let (status, body) =
            post_chat(&router, json!({"user_id": "u-1", "text": " Hi "}).to_string()).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body,
            json!({"response": "Hello! How can I help you today?", "is_escalated": false})
        );
    }

    #[tokio::test]
    async fn chat_without_trailing_slash_shares_history() {
        let state = state(Fixed("- ok"));
        let router = build_router(Arc::clone(&state));

        let (status, body) = post_json(
            &router,
            "/chat",
            json!({"user_id": "u-1", "text": "thanks"}).to_string(),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body["response"],
            "You're welcome! Is there anything else I can help you with?"
        );

        post_chat(&router, json!({"user_id": "u-1", "text": "hey"}).to_string()).await;
        assert_eq!(state.coach.history("u-1").map(|h| h.len()), Some(5));
    }

    #[tokio::test]
    async fn chat_returns_cleaned_provider_text() {
        let router = build_router(state(Fixed("**- Listen first.**\n- Then *respond*.")));

        let (status, body) = post_chat(
            &router,
            json!({"user_id": "u-1", "text": "how do I handle criticism?"}).to_string(),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["response"], "- Listen first. - Then respond.");
    }

    #[tokio::test]
    async fn chat_provider_failure_is_still_ok() {
        let router = build_router(state(Down { models: None }));

        let (status, body) = post_chat(
            &router,
            json!({"user_id": "u-1", "text": "how do I handle criticism?"}).to_string(),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body,
            json!({
                "response": "I'm having trouble responding. Could you try again?",
                "is_escalated": false
            })
        );
    }

    #[tokio::test]
    async fn empty_text_rejected_without_touching_store() {
        let state = state(Fixed("- ok"));
        let router = build_router(Arc::clone(&state));

        let (status, body) =
            post_chat(&router, json!({"user_id": "new", "text": "   "}).to_string()).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["detail"], "Message cannot be empty");
        assert!(state.coach.history("new").is_none());

        post_chat(&router, json!({"user_id": "known", "text": "hello"}).to_string()).await;
        let before: Vec<Turn> = state.coach.history("known").expect("history");
        let (status, _) =
            post_chat(&router, json!({"user_id": "known", "text": ""}).to_string()).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(state.coach.history("known"), Some(before));
    }

    #[tokio::test]
    async fn bad_user_id_and_malformed_body_are_400() {
        let router = build_router(state(Fixed("- ok")));

        let (status, body) = post_chat(&router, json!({"text": "hello"}).to_string()).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["detail"], "Invalid user ID");

        let (status, body) = post_chat(&router, "{not json".to_string()).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["detail"].is_string());
    }

    #[tokio::test]
    async fn probe_success() {
        let router = build_router(state(Fixed("Hello, Gemini is working!")));

        let (status, body) = get_json(&router, "/test-gemini").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "success");
        assert_eq!(
            body["message"],
            "Successfully connected using: models/gemini-2.5-flash"
        );
        assert_eq!(body["response"], "Hello, Gemini is working!");
    }

    #[tokio::test]
    async fn probe_failure_lists_models() {
        let router = build_router(state(Down {
            models: Some(vec!["models/gemini-2.5-flash".to_string()]),
        }));
        let (_, body) = get_json(&router, "/test-gemini").await;
        assert_eq!(body["status"], "error");
        assert_eq!(body["message"], "API error (503): overloaded");
        assert_eq!(body["available_models"], json!(["models/gemini-2.5-flash"]));
    }

    #[tokio::test]
    async fn probe_failure_degrades_model_list() {
        let router = build_router(state(Down { models: None }));
        let (_, body) = get_json(&router, "/test-gemini").await;
        assert_eq!(body["available_models"], json!(["Unable to fetch model list"]));
    }

    #[tokio::test]
    async fn health_counts_conversations() {
        let state = state(Fixed("- ok"));
        let router = build_router(Arc::clone(&state));
        post_chat(&router, json!({"user_id": "a", "text": "hi"}).to_string()).await;
        post_chat(&router, json!({"user_id": "b", "text": "hi"}).to_string()).await;

        let (status, body) = get_json(&router, "/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
        assert_eq!(body["conversations"], 2);
    }

    #[tokio::test]
    async fn index_page_is_served() {
        let router = build_router(state(Fixed("- ok")));
        let resp = router
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        assert!(String::from_utf8_lossy(&bytes).contains("/chat/"));
    }
}
