//! BTA Web Server
//!
//! Axum HTTP API: report uploads (synchronous and queued), job status and
//! results, analysis history, users, and a WebSocket feed of job events.

pub mod error;
pub mod routes;
pub mod state;
pub mod websocket;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use std::future::Future;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

pub use error::{ApiError, ApiResult};
pub use state::AppState;

/// Create the application router.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(routes::health::root))
        // Analysis
        .route("/analyze", post(routes::analyze::analyze))
        .route("/analyze/async", post(routes::analyze::analyze_async))
        .route("/status/{task_id}", get(routes::jobs::get_status))
        .route("/results/{task_id}", get(routes::jobs::get_result))
        // History
        .route("/history/{user_id}", get(routes::history::get_history))
        .route("/analyses/{id}", get(routes::history::get_analysis))
        // Users
        .route("/users", post(routes::users::create_user))
        .route("/users/{user_id}", get(routes::users::get_user))
        .route("/ws", get(websocket::ws_handler))
        .layer(DefaultBodyLimit::max(state.upload_limit))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Serve the API on `host:port` until `shutdown` resolves.
pub async fn run_server(
    state: AppState,
    host: &str,
    port: u16,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> anyhow::Result<()> {
    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind((host, port)).await?;
    tracing::info!("Web server listening on http://{}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use bta_core::report::ReportReader;
    use bta_core::{AnalysisRunner, AnalysisService, BtaError, BtaResult};
    use bta_llm::{ChatMessage, ChatModel, LlmError, LlmResult};
    use bta_queue::{JobQueue, MemoryQueue};
    use std::path::Path;
    use std::sync::Arc;
    use std::time::Duration;
    use tower::ServiceExt;

    const BOUNDARY: &str = "bta-test-boundary";
    const PDF: &[u8] = b"%PDF-1.4\n%test\n";

    struct CannedModel;

    #[async_trait]
    impl ChatModel for CannedModel {
        async fn complete(&self, messages: &[ChatMessage], _temperature: f32) -> LlmResult<String> {
            Ok(format!("Reviewed {} messages. Please see your clinician.", messages.len()))
        }

        fn model_name(&self) -> &str {
            "canned"
        }
    }

    struct FailingModel;

    #[async_trait]
    impl ChatModel for FailingModel {
        async fn complete(
            &self,
            _messages: &[ChatMessage],
            _temperature: f32,
        ) -> LlmResult<String> {
            Err(LlmError::Api {
                status: 503,
                body: "model overloaded".into(),
            })
        }

        fn model_name(&self) -> &str {
            "failing"
        }
    }

    const REPORT: &str = "Hemoglobin 14.1 g/dL\nPlatelets 250 x10^9/L\n";

    /// Returns fixed text; an empty one reads as a scanned PDF with no text layer.
    struct FixedReader(&'static str);

    #[async_trait]
    impl ReportReader for FixedReader {
        async fn read(&self, path: &Path) -> BtaResult<String> {
            if !path.exists() {
                return Err(BtaError::ReportUnreadable("missing".into()));
            }
            if self.0.is_empty() {
                return Err(BtaError::EmptyReport);
            }
            Ok(self.0.into())
        }
    }

    struct TestApp {
        router: Router,
        service: Arc<AnalysisService>,
        queue: Arc<MemoryQueue>,
        _dir: tempfile::TempDir,
    }

    fn setup_test_app_with(
        model: Arc<dyn ChatModel>,
        reader: Arc<dyn ReportReader>,
        upload_limit: usize,
    ) -> TestApp {
        let dir = tempfile::tempdir().unwrap();
        let runner = AnalysisRunner::new(model, reader, 10_000);
        let queue = Arc::new(MemoryQueue::new());
        let service = Arc::new(AnalysisService::new(
            Arc::new(runner),
            Arc::new(bta_db::init_memory_pool().unwrap()),
            queue.clone(),
            bta_queue::create_broadcast_channel(),
            dir.path().join("data"),
        ));
        let router = create_router(AppState::new(service.clone(), upload_limit));
        TestApp {
            router,
            service,
            queue,
            _dir: dir,
        }
    }

    fn setup_test_app_with_limit(upload_limit: usize) -> TestApp {
        setup_test_app_with(Arc::new(CannedModel), Arc::new(FixedReader(REPORT)), upload_limit)
    }

    fn setup_test_app() -> TestApp {
        setup_test_app_with_limit(1024 * 1024)
    }

    fn multipart_body(file: Option<&[u8]>, fields: &[(&str, &str)]) -> Vec<u8> {
        let mut body = Vec::new();
        for (name, value) in fields {
            body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
            body.extend_from_slice(
                format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n")
                    .as_bytes(),
            );
        }
        if let Some(bytes) = file {
            body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
            body.extend_from_slice(
                b"Content-Disposition: form-data; name=\"file\"; filename=\"blood.pdf\"\r\n\
                  Content-Type: application/pdf\r\n\r\n",
            );
            body.extend_from_slice(bytes);
            body.extend_from_slice(b"\r\n");
        }
        body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
        body
    }

    fn upload_request(uri: &str, body: Vec<u8>) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(body))
            .unwrap()
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    async fn json_body(response: axum::response::Response) -> serde_json::Value {
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&body).unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let app = setup_test_app();
        let response = app.router.oneshot(get("/")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json = json_body(response).await;
        assert_eq!(json["message"], "Blood Test Report Analyser API is running");
    }

    #[tokio::test]
    async fn test_analyze_sync() {
        let app = setup_test_app();
        let body = multipart_body(
            Some(PDF),
            &[("analysis_type", "Nutrition"), ("user_id", "alice"), ("query", "  ")],
        );
        let response = app
            .router
            .clone()
            .oneshot(upload_request("/analyze", body))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let json = json_body(response).await;
        assert_eq!(json["status"], "success");
        assert_eq!(json["analysis_type"], "nutrition");
        assert_eq!(json["query"], "Summarise my Blood Test Report");
        assert_eq!(json["file_processed"], "blood.pdf");
        assert!(!json["creative_analysis"].as_str().unwrap().is_empty());

        let id = json["analysis_id"].as_i64().unwrap();
        let response = app
            .router
            .oneshot(get(&format!("/analyses/{id}")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await["user_id"], "alice");
    }

    #[tokio::test]
    async fn test_unknown_analysis_type_is_400() {
        let app = setup_test_app();
        let body = multipart_body(Some(PDF), &[("analysis_type", "horoscope")]);
        let response = app
            .router
            .oneshot(upload_request("/analyze", body))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json = json_body(response).await;
        assert!(json["detail"].as_str().unwrap().contains("horoscope"));
    }

    #[tokio::test]
    async fn test_missing_file_and_non_pdf_are_400() {
        let app = setup_test_app();
        let response = app
            .router
            .clone()
            .oneshot(upload_request("/analyze", multipart_body(None, &[("query", "hi")])))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = app
            .router
            .oneshot(upload_request("/analyze", multipart_body(Some(b"plain text"), &[])))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_upload_too_large_is_413() {
        let app = setup_test_app_with_limit(256);
        let mut big = PDF.to_vec();
        big.resize(4096, b'0');
        let response = app
            .router
            .oneshot(upload_request("/analyze", multipart_body(Some(&big), &[])))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    }

    #[tokio::test]
    async fn test_async_lifecycle() {
        let app = setup_test_app();
        let body = multipart_body(Some(PDF), &[("analysis_type", "exercise"), ("user_id", "bob")]);
        let response = app
            .router
            .clone()
            .oneshot(upload_request("/analyze/async", body))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::ACCEPTED);
        let json = json_body(response).await;
        assert_eq!(json["status"], "pending");
        let task_id = json["task_id"].as_str().unwrap().to_string();

        let response = app
            .router
            .clone()
            .oneshot(get(&format!("/status/{task_id}")))
            .await
            .unwrap();
        assert_eq!(json_body(response).await["status"], "pending");

        let response = app
            .router
            .clone()
            .oneshot(get(&format!("/results/{task_id}")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CONFLICT);

        let job = app
            .queue
            .dequeue(Duration::from_millis(100))
            .await
            .unwrap()
            .unwrap();
        app.service.process_job(job).await.unwrap();

        let response = app
            .router
            .clone()
            .oneshot(get(&format!("/status/{task_id}")))
            .await
            .unwrap();
        assert_eq!(json_body(response).await["status"], "success");

        let response = app
            .router
            .clone()
            .oneshot(get(&format!("/results/{task_id}")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json = json_body(response).await;
        assert_eq!(json["analysis_type"], "exercise");
        assert!(!json["result"].as_str().unwrap().is_empty());

        let response = app.router.oneshot(get("/history/bob")).await.unwrap();
        let json = json_body(response).await;
        assert_eq!(json["count"], 1);
        assert_eq!(json["analyses"][0]["status"], "completed");
    }

    #[tokio::test]
    async fn test_unknown_task_is_404() {
        let app = setup_test_app();
        let response = app.router.clone().oneshot(get("/status/nope")).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert!(json_body(response).await["detail"].is_string());

        let response = app.router.oneshot(get("/results/nope")).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_history_only_returns_that_user() {
        let app = setup_test_app();
        for user in ["carol", "carol", "dave"] {
            let body = multipart_body(Some(PDF), &[("user_id", user)]);
            let response = app
                .router
                .clone()
                .oneshot(upload_request("/analyze", body))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::OK);
        }

        let response = app.router.clone().oneshot(get("/history/carol")).await.unwrap();
        let json = json_body(response).await;
        assert_eq!(json["count"], 2);
        for record in json["analyses"].as_array().unwrap() {
            assert_eq!(record["user_id"], "carol");
        }

        let response = app
            .router
            .oneshot(get("/history/carol?limit=1"))
            .await
            .unwrap();
        assert_eq!(json_body(response).await["count"], 1);
    }

    #[tokio::test]
    async fn test_users() {
        let app = setup_test_app();
        let create = || {
            Request::builder()
                .method("POST")
                .uri("/users")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(r#"{"user_id":"erin","email":"erin@example.com"}"#))
                .unwrap()
        };

        let response = app.router.clone().oneshot(create()).await.unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        assert_eq!(json_body(response).await["total_analyses"], 0);

        let response = app.router.clone().oneshot(create()).await.unwrap();
        assert_eq!(response.status(), StatusCode::CONFLICT);

        let response = app.router.clone().oneshot(get("/users/erin")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await["email"], "erin@example.com");

        let response = app.router.oneshot(get("/users/nobody")).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_missing_analysis_is_404() {
        let app = setup_test_app();
        let response = app.router.oneshot(get("/analyses/999")).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_report_without_text_is_422() {
        let app =
            setup_test_app_with(Arc::new(CannedModel), Arc::new(FixedReader("")), 1024 * 1024);
        let body = multipart_body(Some(PDF), &[("user_id", "frank")]);
        let response = app
            .router
            .clone()
            .oneshot(upload_request("/analyze", body))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let json = json_body(response).await;
        assert!(json["detail"].as_str().unwrap().contains("no extractable text"));

        let response = app.router.oneshot(get("/history/frank")).await.unwrap();
        let json = json_body(response).await;
        assert_eq!(json["count"], 1);
        assert_eq!(json["analyses"][0]["status"], "failed");
    }

    #[tokio::test]
    async fn test_failed_job_results_are_500() {
        let app = setup_test_app_with(
            Arc::new(FailingModel),
            Arc::new(FixedReader(REPORT)),
            1024 * 1024,
        );
        let body = multipart_body(Some(PDF), &[("user_id", "gina")]);
        let response = app
            .router
            .clone()
            .oneshot(upload_request("/analyze/async", body))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::ACCEPTED);
        let task_id = json_body(response).await["task_id"].as_str().unwrap().to_string();

        let job = app
            .queue
            .dequeue(Duration::from_millis(100))
            .await
            .unwrap()
            .unwrap();
        app.service.process_job(job).await.unwrap();

        let response = app
            .router
            .clone()
            .oneshot(get(&format!("/status/{task_id}")))
            .await
            .unwrap();
        assert_eq!(json_body(response).await["status"], "failure");

        let response = app
            .router
            .oneshot(get(&format!("/results/{task_id}")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let json = json_body(response).await;
        assert!(json["detail"].as_str().unwrap().contains("model overloaded"));
    }
}
