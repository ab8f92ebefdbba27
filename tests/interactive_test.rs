//! Tests for the interactive terminal session

use std::sync::Arc;

use prompt_enhancer::app::EnhancerApp;
use prompt_enhancer::category::{CategoryCatalog, CategoryDefinition};
use prompt_enhancer::config::{Config, ConfigOptions};
use prompt_enhancer::enhancer::EnhancementClient;
use prompt_enhancer::interactive::{handle_line, run};
use prompt_enhancer::service::ReqwestTransport;
use prompt_enhancer::session::EntryTag;
use prompt_enhancer::utils::ManualClock;
use tempfile::TempDir;
use wiremock::matchers::{body_string_contains, method};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn completion_body(content: &str) -> serde_json::Value {
    serde_json::json!({
        "choices": [{"message": {"role": "assistant", "content": content}}]
    })
}

async fn mock_server() -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(body_string_contains("a cat"))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion_body("A fluffy cat")))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion_body("Enhanced")))
        .mount(&server)
        .await;
    server
}

fn create_app(server: &MockServer) -> EnhancerApp {
    let config = Config::new(ConfigOptions {
        base_url: Some(server.uri()),
        timeout_secs: Some(5),
        rate_limit: Some(0),
        ..Default::default()
    })
    .unwrap();
    let catalog = Arc::new(
        CategoryCatalog::new(vec![
            CategoryDefinition::new("image", "You write image prompts.", Vec::new()),
            CategoryDefinition::new("code", "You clarify programming tasks.", Vec::new()),
        ])
        .unwrap(),
    );
    let transport = Arc::new(ReqwestTransport::new(&config).unwrap());
    let client = EnhancementClient::with_parts(
        config,
        catalog,
        transport,
        Arc::new(ManualClock::new()),
    );
    EnhancerApp::new(Arc::new(client), "test-token", 10)
}

/// Feed one line and return what was printed
fn send(app: &mut EnhancerApp, line: &str) -> (bool, String) {
    let mut out = Vec::new();
    let keep_going = handle_line(app, line, &mut out).unwrap();
    (keep_going, String::from_utf8(out).unwrap())
}

async fn settle(app: &mut EnhancerApp) {
    while let Some(completion) = app.next_completion().await {
        app.apply(completion);
    }
}

#[tokio::test]
async fn test_type_switches_category() {
    let server = mock_server().await;
    let mut app = create_app(&server);

    let (_, out) = send(&mut app, ":type code");
    assert_eq!(out, "Category 'code' active. Ready.\n");
    assert_eq!(app.active_category(), "code");

    let (_, out) = send(&mut app, ":type music");
    assert_eq!(out, "Unknown category: music\n");
    assert_eq!(app.active_category(), "code");

    let (_, out) = send(&mut app, ":types");
    assert_eq!(out, "  image\n* code\n");
}

#[tokio::test]
async fn test_prompt_then_copy_and_history() {
    let server = mock_server().await;
    let mut app = create_app(&server);

    let (_, out) = send(&mut app, ":copy");
    assert_eq!(out, "No result to copy in this category.\n");

    let (keep_going, out) = send(&mut app, "a cat");
    assert!(keep_going);
    assert_eq!(out, "Enhancing 'image' prompt...\n");
    settle(&mut app).await;

    let (_, out) = send(&mut app, ":copy");
    assert_eq!(out, "A fluffy cat\n");

    let (_, out) = send(&mut app, ":history");
    assert_eq!(out, "  1. A fluffy cat...\n");

    let (_, out) = send(&mut app, ":show");
    assert!(out.contains("] Original Prompt: a cat\n\n"));
    assert!(out.ends_with("Enhanced Result:\nA fluffy cat\n\n"));

    // switching shows the other category's (empty) log
    let (_, out) = send(&mut app, ":type code");
    assert_eq!(out, "Category 'code' active. Ready.\n");
    let (_, out) = send(&mut app, ":copy");
    assert_eq!(out, "No result to copy in this category.\n");
}

#[tokio::test]
async fn test_clear_command() {
    let server = mock_server().await;
    let mut app = create_app(&server);

    send(&mut app, "a cat");
    settle(&mut app).await;

    let (_, out) = send(&mut app, ":clear");
    assert_eq!(out, "History for 'image' cleared.\n");
    assert!(app.active_session().unwrap().is_empty());

    let (_, out) = send(&mut app, ":history");
    assert_eq!(out, "No enhanced prompts in the category 'image'.\n");
}

#[tokio::test]
async fn test_export_command() {
    let server = mock_server().await;
    let mut app = create_app(&server);
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("image.txt");
    let export_line = format!(":export {}", path.display());

    let (_, out) = send(&mut app, ":export");
    assert_eq!(out, "Usage: :export <path>\n");

    let (_, out) = send(&mut app, &export_line);
    assert_eq!(out, "There is no history to export in category 'image'\n");
    assert!(!path.exists());

    send(&mut app, "a cat");
    settle(&mut app).await;

    let (_, out) = send(&mut app, &export_line);
    assert_eq!(out, format!("History exported to {}\n", path.display()));
    let content = std::fs::read_to_string(&path).unwrap();
    assert!(content.ends_with("Enhanced Result:\nA fluffy cat"));
}

#[tokio::test]
async fn test_unknown_command_blank_line_and_quit() {
    let server = mock_server().await;
    let mut app = create_app(&server);

    let (keep_going, out) = send(&mut app, ":frobnicate");
    assert!(keep_going);
    assert_eq!(out, "Unknown command :frobnicate, try :help\n");

    let (keep_going, out) = send(&mut app, "");
    assert!(keep_going);
    assert!(out.is_empty());
    assert!(app.active_session().unwrap().is_empty());

    let (_, out) = send(&mut app, ":help");
    assert!(out.starts_with("Commands:\n"));

    assert!(!send(&mut app, ":quit").0);
    assert!(!send(&mut app, ":q").0);
}

#[tokio::test]
async fn test_session_survives_invalid_utf8_line() {
    let server = mock_server().await;
    let app = create_app(&server);
    let input: &[u8] = b"caf\xe9 au lait\n:types\n";
    let mut out = Vec::new();

    run(app, input, &mut out).await.unwrap();

    let out = String::from_utf8(out).unwrap();
    assert!(out.contains("Enhancing 'image' prompt...\n"));
    assert!(out.contains("* image\n  code\n"));
    // end of input waits for the pending request
    assert!(out.contains("Prompt 'image' enhanced successfully.\nEnhanced Result:\nEnhanced\n"));
}

#[tokio::test]
async fn test_session_records_replaced_characters() {
    let server = mock_server().await;
    let mut app = create_app(&server);

    let mut input: &[u8] = b"caf\xe9\n";
    let mut buf = Vec::new();
    let line = prompt_enhancer::interactive::read_line_lossy(&mut input, &mut buf)
        .await
        .unwrap()
        .unwrap();
    send(&mut app, &line);

    let entries = app.active_session().unwrap().entries();
    assert_eq!(entries[0].tag, EntryTag::User);
    assert_eq!(entries[0].message, "Original Prompt: caf\u{FFFD}");
}
