//! Integration tests for the toolsmith synthesis service.
//!
//! The completion API is replaced by a scripted spy provider; storage is a
//! real SQLite file in a temporary directory.

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{Request, StatusCode},
    routing::{get, post},
    Router,
};
use serde_json::{json, Value};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;
use toolsmith::{
    handlers::{
        delete_tool_handler, health_handler, list_tools_handler, ready_handler, root_handler,
        send_handler,
    },
    AppError, AppState, CompletionProvider, GenerationAdapter, GenerationRequest, PromptBuilder,
    SqliteToolRepository, SynthesisOrchestrator,
};
use tower::ServiceExt;

const REVERSE_STRING: &str = r#"{"human_readable_function_title":"String Reverser","function_title":"reverseString","function_description":"Reverses the input text.","code":"function reverseString(s){return s.split('').reverse().join('');}","inputs":[{"type":"text","human_readable_title":"Text to reverse"}],"output":"Reversed string"}"#;

/// Replays queued responses and counts every call.
struct SpyProvider {
    responses: Mutex<VecDeque<Result<Option<String>, AppError>>>,
    calls: AtomicUsize,
}

impl SpyProvider {
    fn with_responses(responses: Vec<Result<Option<String>, AppError>>) -> Arc<Self> {
        Arc::new(Self {
            responses: Mutex::new(responses.into()),
            calls: AtomicUsize::new(0),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CompletionProvider for SpyProvider {
    async fn complete(&self, _request: &GenerationRequest) -> toolsmith::Result<Option<String>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Ok(None))
    }
}

fn build_orchestrator(
    dir: &TempDir,
    schema_version: u32,
    provider: Arc<SpyProvider>,
) -> SynthesisOrchestrator {
    let url = format!("sqlite://{}", dir.path().join("tools.db").display());
    let repository = SqliteToolRepository::open(&url).unwrap();
    SynthesisOrchestrator::new(
        PromptBuilder::new(schema_version).unwrap(),
        GenerationAdapter::new(provider, Duration::from_secs(5)),
        Arc::new(repository),
    )
}

fn v3_candidate(name: &str) -> String {
    json!({
        "human_readable_function_title": format!("{} tool", name),
        "function_title": name,
        "function_description": "Test tool.",
        "code": format!("function {}(u){{ return u; }}", name),
        "inputs": [
            {"type": "select", "human_readable_title": "Unit",
             "options": [{"label": "Kilograms", "value": "kg"}, {"label": "Pounds", "value": "lb"}]}
        ],
        "output": 1,
        "tool_type": "Measurement",
        "requires_manual_run": false
    })
    .to_string()
}

/// Helper to create a test router with every endpoint.
fn create_test_app(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(root_handler))
        .route("/send", post(send_handler))
        .route("/tools", get(list_tools_handler).delete(delete_tool_handler))
        .route("/health", get(health_handler))
        .route("/ready", get(ready_handler))
        .with_state(state)
}

/// Helper to make a JSON request to the router.
async fn json_request(
    app: Router,
    method: &str,
    uri: &str,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let req = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.oneshot(req).await.unwrap();
    let status = response.status();

    let body_bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body: Value = serde_json::from_slice(&body_bytes).unwrap_or(json!({}));

    (status, body)
}

// ============================================================================
// Health Endpoint Tests
// ============================================================================

#[tokio::test]
async fn test_health_endpoint_returns_200() {
    let app = Router::new().route("/health", get(health_handler));
    let (status, body) = json_request(app, "GET", "/health", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
async fn test_root_and_ready() {
    let dir = TempDir::new().unwrap();
    let state = Arc::new(AppState::with_orchestrator(build_orchestrator(
        &dir,
        3,
        SpyProvider::with_responses(vec![]),
    )));

    let (status, body) = json_request(create_test_app(state.clone()), "GET", "/", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Tool synthesis service is running");

    let (status, body) = json_request(create_test_app(state), "GET", "/ready", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ready");
}

// ============================================================================
// Orchestrator Tests
// ============================================================================

#[tokio::test]
async fn test_blank_query_never_reaches_the_model() {
    let dir = TempDir::new().unwrap();
    let spy = SpyProvider::with_responses(vec![Ok(Some(REVERSE_STRING.to_string()))]);
    let orchestrator = build_orchestrator(&dir, 1, spy.clone());

    for query in ["", "   ", "\t\n"] {
        let err = orchestrator.synthesize(query).await.unwrap_err();
        assert!(matches!(err, AppError::InvalidQueryError(_)));
    }

    assert_eq!(spy.calls(), 0);
    assert!(orchestrator.list_tools().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_reverse_string_scenario() {
    let dir = TempDir::new().unwrap();
    let spy = SpyProvider::with_responses(vec![Ok(Some(REVERSE_STRING.to_string()))]);
    let orchestrator = build_orchestrator(&dir, 1, spy.clone());

    let record = orchestrator
        .synthesize("generate a tool that reverses a string")
        .await
        .unwrap();

    assert_eq!(spy.calls(), 1);
    assert!(record.id > 0);
    assert_eq!(record.function_name, "reverseString");
    assert_eq!(record.human_readable_title, "String Reverser");
    assert_eq!(record.output, "Reversed string");
    assert_eq!(record.schema_version, 1);
    assert_eq!(record.inputs.len(), 1);
    assert_eq!(record.inputs[0].kind.as_str(), "text");
    assert!(record.inputs[0].options.is_none());

    let wire = serde_json::to_value(&record).unwrap();
    assert_eq!(wire["function_title"], "reverseString");
    assert!(wire["inputs"][0].get("options").is_none());
    assert!(wire.get("tool_type").is_none());
}

#[tokio::test]
async fn test_list_after_two_creates_and_one_delete() {
    let dir = TempDir::new().unwrap();
    let spy = SpyProvider::with_responses(vec![
        Ok(Some(v3_candidate("convertWeight"))),
        Ok(Some(v3_candidate("convertLength"))),
    ]);
    let orchestrator = build_orchestrator(&dir, 3, spy);

    let first = orchestrator.synthesize("convert weights").await.unwrap();
    let second = orchestrator.synthesize("convert lengths").await.unwrap();
    assert_ne!(first.id, second.id);

    assert!(orchestrator.delete_tool(first.id).await.unwrap());

    let remaining = orchestrator.list_tools().await.unwrap();
    assert_eq!(remaining, vec![second]);
    assert_eq!(remaining[0].function_name, "convertLength");
    assert_eq!(remaining[0].output, "1");
}

#[tokio::test]
async fn test_failures_leave_storage_untouched() {
    let dir = TempDir::new().unwrap();
    let spy = SpyProvider::with_responses(vec![
        Err(AppError::GenerationUnavailableError("connection refused".into())),
        Ok(None),
        Ok(Some(REVERSE_STRING.to_string())), // v3 requires tool_type
    ]);
    let orchestrator = build_orchestrator(&dir, 3, spy.clone());

    assert!(matches!(
        orchestrator.synthesize("a").await,
        Err(AppError::GenerationUnavailableError(_))
    ));
    assert!(matches!(
        orchestrator.synthesize("b").await,
        Err(AppError::GenerationUnavailableError(_))
    ));
    assert!(matches!(
        orchestrator.synthesize("c").await,
        Err(AppError::MalformedOutputError(_))
    ));

    assert_eq!(spy.calls(), 3);
    assert!(orchestrator.list_tools().await.unwrap().is_empty());
}

// ============================================================================
// HTTP Boundary Tests
// ============================================================================

#[tokio::test]
async fn test_send_list_delete_over_http() {
    let dir = TempDir::new().unwrap();
    let spy = SpyProvider::with_responses(vec![Ok(Some(v3_candidate("convertWeight")))]);
    let state = Arc::new(AppState::with_orchestrator(build_orchestrator(&dir, 3, spy)));

    let (status, created) = json_request(
        create_test_app(state.clone()),
        "POST",
        "/send",
        Some(json!({"query": "convert kilograms to pounds"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(created["function_title"], "convertWeight");
    assert_eq!(created["tool_type"], "Measurement");
    assert_eq!(created["requires_manual_run"], false);
    assert_eq!(created["inputs"][0]["options"][1]["value"], "lb");
    let id = created["id"].as_i64().unwrap();

    let (status, listed) = json_request(create_test_app(state.clone()), "GET", "/tools", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(listed.as_array().unwrap().len(), 1);
    assert_eq!(listed[0]["id"], id);

    let (status, body) = json_request(
        create_test_app(state.clone()),
        "DELETE",
        "/tools",
        Some(json!({"id": id + 1000})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Tool not found");

    let (status, body) = json_request(
        create_test_app(state.clone()),
        "DELETE",
        "/tools",
        Some(json!({"id": id})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Deleted successfully");

    let (_, listed) = json_request(create_test_app(state), "GET", "/tools", None).await;
    assert_eq!(listed, json!([]));
}

#[tokio::test]
async fn test_send_error_statuses() {
    let dir = TempDir::new().unwrap();
    let spy = SpyProvider::with_responses(vec![
        Ok(Some("not json at all".to_string())),
        Err(AppError::GenerationUnavailableError("timeout".into())),
    ]);
    let state = Arc::new(AppState::with_orchestrator(build_orchestrator(
        &dir,
        3,
        spy.clone(),
    )));

    let (status, body) =
        json_request(create_test_app(state.clone()), "POST", "/send", Some(json!({}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], 400);
    assert_eq!(spy.calls(), 0);

    let (status, _) = json_request(
        create_test_app(state.clone()),
        "POST",
        "/send",
        Some(json!({"query": "make a tool"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);

    let (status, body) = json_request(
        create_test_app(state),
        "POST",
        "/send",
        Some(json!({"query": "make a tool"})),
    )
    .await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert!(body["error"].as_str().unwrap().contains("timeout"));
}

#[tokio::test]
async fn test_null_or_mistyped_query_is_a_json_400() {
    let dir = TempDir::new().unwrap();
    let spy = SpyProvider::with_responses(vec![Ok(Some(v3_candidate("convertWeight")))]);
    let state = Arc::new(AppState::with_orchestrator(build_orchestrator(
        &dir,
        3,
        spy.clone(),
    )));

    for body in [json!({"query": null}), json!({"query": 5}), json!([])] {
        let (status, response) =
            json_request(create_test_app(state.clone()), "POST", "/send", Some(body)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(response["code"], 400);
        assert!(response["error"].is_string());
    }

    assert_eq!(spy.calls(), 0);
}

#[tokio::test]
async fn test_delete_without_integer_id_finds_nothing() {
    let dir = TempDir::new().unwrap();
    let spy = SpyProvider::with_responses(vec![Ok(Some(v3_candidate("convertWeight")))]);
    let orchestrator = build_orchestrator(&dir, 3, spy);
    let record = orchestrator.synthesize("convert weights").await.unwrap();
    let state = Arc::new(AppState::with_orchestrator(orchestrator));

    for body in [json!({}), json!({"id": null}), json!({"id": record.id.to_string()})] {
        let (status, response) =
            json_request(create_test_app(state.clone()), "DELETE", "/tools", Some(body)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(response["message"], "Tool not found");
    }

    let (_, listed) = json_request(create_test_app(state), "GET", "/tools", None).await;
    assert_eq!(listed.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_ready_reports_unreachable_storage() {
    let dir = TempDir::new().unwrap();
    let state = Arc::new(AppState::with_orchestrator(build_orchestrator(
        &dir,
        3,
        SpyProvider::with_responses(vec![]),
    )));

    std::fs::remove_dir_all(dir.path()).unwrap();

    let (status, body) = json_request(create_test_app(state), "GET", "/ready", None).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["status"], "not_ready");
}
