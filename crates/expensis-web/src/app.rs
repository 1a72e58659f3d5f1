use std::sync::Arc;

use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use tower_http::cors::CorsLayer;

use crate::handlers;
use crate::state::AppState;

/// Room for multipart boundaries and part headers on top of the file cap.
const MULTIPART_HEADROOM: usize = 64 * 1024;

/// Build the application router. Every route is also served under `/api`.
pub fn router(state: Arc<AppState>) -> Router {
    let body_limit = state.max_upload_bytes + MULTIPART_HEADROOM;
    let routes = Router::new()
        .route("/analyze", post(handlers::analyze::analyze))
        .route("/parse-pdf", post(handlers::parse_pdf::parse_pdf))
        .route("/health", get(handlers::health::health));

    Router::new()
        .merge(routes.clone())
        .nest("/api", routes)
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{Body, to_bytes};
    use axum::http::{Request, StatusCode, header};
    use serde_json::{Value, json};
    use tower::ServiceExt;

    use expensis_core::StatementExtractor;
    use expensis_core::backend::mock::{MockOcr, MockPdfBackend};
    use expensis_core::llm::mock::MockCompletion;
    use expensis_core::{Analyzer, CompletionClient};

    const BOUNDARY: &str = "expensis-test-boundary";

    const EXTRACTED: &str = r#"[{"дата": "2024-01-15", "сумма": -1500, "операция": "Покупка", "детали": "Ашан"}]"#;

    fn scripted_llm() -> MockCompletion {
        MockCompletion::new("[]")
            .when("Извлеки все транзакции", EXTRACTED)
            .when(
                "Классифицируй",
                r#"[{"transactionIndex": 0, "category": "Продукты", "subcategory": "", "confidence": 0.9}]"#,
            )
            .when("Спрогнозируй", r#"{"trends": "рост"}"#)
    }

    fn app_with(pdf: MockPdfBackend, llm: MockCompletion, limit: usize) -> Router {
        let llm: Arc<dyn CompletionClient> = Arc::new(llm);
        let state = Arc::new(AppState {
            extractor: StatementExtractor::new(
                Arc::new(pdf),
                Arc::new(MockOcr::new("15.01.2024 Ашан -1500")),
                llm.clone(),
            ),
            analyzer: Analyzer::new(llm),
            max_upload_bytes: limit,
        });
        router(state)
    }

    fn app() -> Router {
        app_with(
            MockPdfBackend::with_text("15.01.2024 Ашан -1500"),
            scripted_llm(),
            10 * 1024 * 1024,
        )
    }

    fn json_request(uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn multipart_request(uri: &str, field: &str, content_type: &str, data: &[u8]) -> Request<Body> {
        let mut body = Vec::new();
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{field}\"; filename=\"statement.pdf\"\r\nContent-Type: {content_type}\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(data);
        body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());

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

    async fn body_json(response: axum::response::Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn health_is_served_at_root_and_under_api() {
        for uri in ["/health", "/api/health"] {
            let response = app()
                .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::OK);
            let body = body_json(response).await;
            assert_eq!(body["status"], "ok");
            assert!(body["message"].is_string());
        }
    }

    #[tokio::test]
    async fn analyze_returns_envelope_with_statistics() {
        let statement = json!([
            {"дата": "2024-01-15", "сумма": -1500, "операция": "Покупка", "детали": "Ашан"},
            {"дата": "2024-01-17", "сумма": 50000, "операция": "Поступление", "детали": "Зарплата"}
        ]);
        let response = app()
            .oneshot(json_request("/api/analyze", json!({ "statement": statement })))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["success"], true);
        let data = &body["data"];
        assert_eq!(data["statistics"]["totalIncome"], 50000.0);
        assert_eq!(data["statistics"]["totalExpenses"], 1500.0);
        assert_eq!(data["statistics"]["categories"]["Продукты"], 1500.0);
        assert_eq!(data["forecast"]["trends"], "рост");
        assert_eq!(data["statement"][1]["operationType"], "Поступление");
    }

    #[tokio::test]
    async fn analyze_rejects_bad_statements() {
        let cases = [
            json!({}),
            json!({ "statement": "нет" }),
            json!({ "statement": [] }),
            json!({ "statement": [{ "дата": "2024-01-15", "сумма": 1 }] }),
        ];
        for body in cases {
            let response = app()
                .oneshot(json_request("/analyze", body))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::BAD_REQUEST);
            assert!(body_json(response).await["error"].is_string());
        }
    }

    #[tokio::test]
    async fn analyze_rejects_malformed_json() {
        let request = Request::builder()
            .method("POST")
            .uri("/analyze")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{not json"))
            .unwrap();
        let response = app().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn analyze_upstream_failure_is_500_with_details() {
        let llm = MockCompletion::new("[]").fail_when("Классифицируй", 401, "invalid key");
        let app = app_with(MockPdfBackend::with_text(""), llm, 1024 * 1024);
        let statement = json!([{"дата": "2024-01-15", "сумма": -1, "операция": "x", "детали": "y"}]);

        let response = app
            .oneshot(json_request("/analyze", json!({ "statement": statement })))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = body_json(response).await;
        assert!(body["details"].as_str().unwrap().contains("401"));
    }

    #[tokio::test]
    async fn parse_pdf_extracts_text_statement() {
        let response = app()
            .oneshot(multipart_request(
                "/api/parse-pdf",
                "pdf",
                "application/pdf",
                b"%PDF-1.7 fake",
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        let data = &body["data"];
        assert_eq!(data["method"], "text");
        assert_eq!(data["transactionsCount"], 1);
        assert_eq!(data["statement"][0]["amount"], -1500.0);
        assert_eq!(data["extractedText"], "15.01.2024 Ашан -1500");
    }

    #[tokio::test]
    async fn parse_pdf_falls_back_to_ocr() {
        let app = app_with(MockPdfBackend::scanned(5), scripted_llm(), 1024 * 1024);
        let response = app
            .oneshot(multipart_request("/parse-pdf", "pdf", "application/pdf", b"%PDF-1.7"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["data"]["method"], "ocr");
    }

    #[tokio::test]
    async fn parse_pdf_requires_the_pdf_field() {
        let response = app()
            .oneshot(multipart_request("/parse-pdf", "file", "application/pdf", b"%PDF-1.7"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn parse_pdf_requires_pdf_mime_type() {
        let response = app()
            .oneshot(multipart_request("/parse-pdf", "pdf", "text/plain", b"hello"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn parse_pdf_malformed_document_is_400() {
        let app = app_with(MockPdfBackend::malformed(), scripted_llm(), 1024 * 1024);
        let response = app
            .oneshot(multipart_request("/parse-pdf", "pdf", "application/pdf", b"junk"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn parse_pdf_without_transactions_is_400() {
        let llm = MockCompletion::new("Транзакций не найдено.");
        let app = app_with(MockPdfBackend::with_text("пусто"), llm, 1024 * 1024);
        let response = app
            .oneshot(multipart_request("/parse-pdf", "pdf", "application/pdf", b"%PDF-1.7"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn oversized_upload_is_413() {
        let app = app_with(MockPdfBackend::with_text("x"), scripted_llm(), 1024);
        let data = vec![b'a'; 4096];
        let response = app
            .oneshot(multipart_request("/parse-pdf", "pdf", "application/pdf", &data))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    }

    #[tokio::test]
    async fn upload_at_the_cap_is_accepted() {
        let mut data = b"%PDF-1.7 ".to_vec();
        data.resize(1024, b'a');

        let app = app_with(MockPdfBackend::with_text("15.01.2024 Ашан -1500"), scripted_llm(), 1024);
        let response = app
            .clone()
            .oneshot(multipart_request("/parse-pdf", "pdf", "application/pdf", &data))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        data.push(b'a');
        let response = app
            .oneshot(multipart_request("/parse-pdf", "pdf", "application/pdf", &data))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    }
}
