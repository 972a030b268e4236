//! HTTP surface tests for the gateway
//!
//! Drives the full router end to end with tower's `oneshot`.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::response::Response;
use axum::Router;
use tower::ServiceExt;

use shunt_gateway::GatewayServer;
use shunt_store::RuleDb;

const BOUNDARY: &str = "shunt-test-boundary";

async fn test_gateway() -> (Router, tempfile::TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let db = Arc::new(RuleDb::new(dir.path().join("gateway.db")).unwrap());
    db.seed_default_models().await.unwrap();
    let server = GatewayServer::new(
        "127.0.0.1:0".parse().unwrap(),
        db,
        dir.path().join("uploads"),
    );
    (server.router(), dir)
}

fn form_request(uri: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/x-www-form-urlencoded")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn upload_request(filename: &str, content: &[u8]) -> Request<Body> {
    let mut body = Vec::new();
    body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
    body.extend_from_slice(
        format!("Content-Disposition: form-data; name=\"file\"; filename=\"{filename}\"\r\n\r\n")
            .as_bytes(),
    );
    body.extend_from_slice(content);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());

    Request::builder()
        .method("POST")
        .uri("/upload/")
        .header(
            "content-type",
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .unwrap()
}

async fn body_json(response: Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_home_page_returns_html() {
    let (router, _dir) = test_gateway().await;

    let response = router
        .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let html = String::from_utf8(body.to_vec()).unwrap();
    assert!(html.contains("<!DOCTYPE html>"));
    assert!(html.contains("Shunt Gateway"));
}

#[tokio::test]
async fn test_admin_page_returns_html() {
    let (router, _dir) = test_gateway().await;

    let response = router
        .oneshot(
            Request::builder()
                .uri("/admin")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let html = String::from_utf8(body.to_vec()).unwrap();
    assert!(html.contains("Shunt Admin"));
}

#[tokio::test]
async fn test_models_lists_seeded_names() {
    let (router, _dir) = test_gateway().await;

    let response = router
        .oneshot(
            Request::builder()
                .uri("/models")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(
        body,
        serde_json::json!(["openai/gpt-3.5", "anthropic/claude-v1", "gemini/gemini-alpha"])
    );
}

#[tokio::test]
async fn test_chat_passes_through_without_rules() {
    let (router, _dir) = test_gateway().await;

    let response = router
        .oneshot(form_request(
            "/v1/chat/completions",
            "provider=openai&model=openai%2Fgpt-3.5&prompt=hello+there",
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["provider"], "openai");
    assert_eq!(body["model"], "openai/gpt-3.5");
    assert_eq!(
        body["response"],
        "OpenAI: Processed your prompt with advanced language understanding."
    );
}

#[tokio::test]
async fn test_chat_rejects_unknown_model() {
    let (router, _dir) = test_gateway().await;

    let response = router
        .oneshot(form_request(
            "/v1/chat/completions",
            "provider=mistral&model=mistral%2Fmedium&prompt=hello",
        ))
        .await
        .unwrap();

    // The error travels in the payload, not the status line
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body, serde_json::json!({"error": "Model not supported"}));
}

#[tokio::test]
async fn test_chat_missing_field_is_client_error() {
    let (router, _dir) = test_gateway().await;

    let response = router
        .oneshot(form_request(
            "/v1/chat/completions",
            "provider=openai&model=openai%2Fgpt-3.5",
        ))
        .await
        .unwrap();

    assert!(response.status().is_client_error());
}

#[tokio::test]
async fn test_prompt_rule_redirects_matching_chat() {
    let (router, _dir) = test_gateway().await;

    let response = router
        .clone()
        .oneshot(form_request(
            "/admin/add_regex",
            "original_model=openai%2Fgpt-3.5&regex_pattern=weather&redirect_model=gemini%2Fgemini-alpha",
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(response.headers().get("location").unwrap(), "/admin");

    let response = router
        .oneshot(form_request(
            "/v1/chat/completions",
            "provider=openai&model=openai%2Fgpt-3.5&prompt=what+is+the+Weather+today",
        ))
        .await
        .unwrap();

    let body = body_json(response).await;
    assert_eq!(body["provider"], "openai");
    assert_eq!(body["model"], "gemini/gemini-alpha");
    assert_eq!(
        body["response"],
        "Gemini: Your request has been processed using next-gen AI."
    );
}

#[tokio::test]
async fn test_first_matching_rule_wins() {
    let (router, _dir) = test_gateway().await;

    for body in [
        "original_model=openai%2Fgpt-3.5&regex_pattern=weather&redirect_model=anthropic%2Fclaude-v1",
        "original_model=openai%2Fgpt-3.5&regex_pattern=weather&redirect_model=gemini%2Fgemini-alpha",
    ] {
        let response = router
            .clone()
            .oneshot(form_request("/admin/add_regex", body))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
    }

    let response = router
        .oneshot(form_request(
            "/v1/chat/completions",
            "provider=openai&model=openai%2Fgpt-3.5&prompt=weather+report",
        ))
        .await
        .unwrap();

    let body = body_json(response).await;
    assert_eq!(body["model"], "anthropic/claude-v1");
}

#[tokio::test]
async fn test_add_regex_rejects_invalid_pattern() {
    let (router, _dir) = test_gateway().await;

    let response = router
        .clone()
        .oneshot(form_request(
            "/admin/add_regex",
            "original_model=openai%2Fgpt-3.5&regex_pattern=%5Bunclosed&redirect_model=gemini%2Fgemini-alpha",
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

    // Nothing was stored
    let response = router
        .oneshot(
            Request::builder()
                .uri("/admin/rules")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let body = body_json(response).await;
    assert_eq!(body, serde_json::json!([]));
}

#[tokio::test]
async fn test_prompt_rules_listed_in_insertion_order() {
    let (router, _dir) = test_gateway().await;

    for body in [
        "original_model=openai%2Fgpt-3.5&regex_pattern=alpha&redirect_model=anthropic%2Fclaude-v1",
        "original_model=openai%2Fgpt-3.5&regex_pattern=beta&redirect_model=gemini%2Fgemini-alpha",
    ] {
        router
            .clone()
            .oneshot(form_request("/admin/add_regex", body))
            .await
            .unwrap();
    }

    let response = router
        .oneshot(
            Request::builder()
                .uri("/admin/rules")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    let body = body_json(response).await;
    let rules = body.as_array().unwrap();
    assert_eq!(rules.len(), 2);
    assert_eq!(rules[0]["regex_pattern"], "alpha");
    assert_eq!(rules[1]["regex_pattern"], "beta");
    assert!(rules[0]["id"].as_i64().unwrap() < rules[1]["id"].as_i64().unwrap());
}

#[tokio::test]
async fn test_upload_with_rule_routes_file() {
    let (router, dir) = test_gateway().await;

    let response = router
        .clone()
        .oneshot(form_request(
            "/admin/add_file_routing",
            "file_type=pdf&redirect_provider=anthropic&redirect_model=anthropic%2Fclaude-v1",
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);

    let content = b"%PDF-1.4 minimal";
    let response = router
        .oneshot(upload_request("report.PDF", content))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["filename"], "report.PDF");
    assert_eq!(body["provider"], "anthropic");
    assert_eq!(body["model"], "anthropic/claude-v1");
    assert_eq!(
        body["response"],
        "anthropic: File processed with AI model anthropic/claude-v1."
    );

    let saved = std::fs::read(dir.path().join("uploads").join("report.PDF")).unwrap();
    assert_eq!(saved, content);
}

#[tokio::test]
async fn test_upload_without_rule_is_generic() {
    let (router, dir) = test_gateway().await;

    let response = router
        .oneshot(upload_request("notes.txt", b"plain text"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["filename"], "notes.txt");
    assert_eq!(body["response"], "File uploaded successfully.");
    assert!(body.get("provider").is_none());
    assert!(body.get("model").is_none());

    assert!(dir.path().join("uploads").join("notes.txt").exists());
}

#[tokio::test]
async fn test_upload_missing_file_field() {
    let (router, _dir) = test_gateway().await;

    let mut body = Vec::new();
    body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
    body.extend_from_slice(b"Content-Disposition: form-data; name=\"other\"\r\n\r\nvalue\r\n");
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());

    let request = Request::builder()
        .method("POST")
        .uri("/upload/")
        .header(
            "content-type",
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .unwrap();

    let response = router.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_duplicate_file_rule_conflict() {
    let (router, _dir) = test_gateway().await;

    let response = router
        .clone()
        .oneshot(form_request(
            "/admin/add_file_routing",
            "file_type=pdf&redirect_provider=anthropic&redirect_model=anthropic%2Fclaude-v1",
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);

    // Same type in a different case is still a duplicate
    let response = router
        .clone()
        .oneshot(form_request(
            "/admin/add_file_routing",
            "file_type=PDF&redirect_provider=openai&redirect_model=openai%2Fgpt-3.5",
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let response = router
        .oneshot(
            Request::builder()
                .uri("/admin/file_rules")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let body = body_json(response).await;
    let rules = body.as_array().unwrap();
    assert_eq!(rules.len(), 1);
    assert_eq!(rules[0]["file_type"], "pdf");
    assert_eq!(rules[0]["redirect_provider"], "anthropic");
}

#[tokio::test]
async fn test_status_reports_counts() {
    let (router, _dir) = test_gateway().await;

    let response = router
        .oneshot(
            Request::builder()
                .uri("/api/status")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["models"], 3);
    assert_eq!(body["prompt_rules"], 0);
    assert_eq!(body["file_rules"], 0);
}
