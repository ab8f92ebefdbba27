//! Tests for the application controller and its worker pool

use std::sync::Arc;
use std::time::{Duration, Instant};

use prompt_enhancer::app::{EnhancerApp, WORKER_COUNT};
use prompt_enhancer::category::{CategoryCatalog, CategoryDefinition};
use prompt_enhancer::config::{Config, ConfigOptions};
use prompt_enhancer::enhancer::{EnhanceError, EnhancementClient};
use prompt_enhancer::service::ReqwestTransport;
use prompt_enhancer::session::{EntryTag, SessionError};
use prompt_enhancer::utils::ManualClock;
use wiremock::matchers::{body_string_contains, method};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn completion_body(content: &str) -> serde_json::Value {
    serde_json::json!({
        "choices": [{"message": {"role": "assistant", "content": content}}]
    })
}

fn create_app(server: &MockServer, max_history: usize) -> EnhancerApp {
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
    EnhancerApp::new(Arc::new(client), "test-token", max_history)
}

/// Drain every pending completion into the store
async fn drain(app: &mut EnhancerApp) -> usize {
    let mut applied = 0;
    while let Some(completion) = app.next_completion().await {
        app.apply(completion);
        applied += 1;
    }
    applied
}

#[tokio::test]
async fn test_first_category_selected() {
    let server = MockServer::start().await;
    let mut app = create_app(&server, 10);

    assert_eq!(app.active_category(), "image");
    assert_eq!(app.store().categories(), ["image", "code"]);

    assert!(matches!(
        app.select_category("music"),
        Err(SessionError::UnknownCategory(_))
    ));
    assert_eq!(app.active_category(), "image");

    app.select_category("code").unwrap();
    assert_eq!(app.active_category(), "code");
}

#[tokio::test]
async fn test_submit_records_prompt_then_result() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion_body("A vivid cat")))
        .expect(1)
        .mount(&server)
        .await;

    let mut app = create_app(&server, 10);
    app.submit("  a cat  ").unwrap();

    // the prompt is logged before the request completes
    let entries = app.active_session().unwrap().entries();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].tag, EntryTag::User);
    assert_eq!(entries[0].message, "Original Prompt: a cat");
    assert_eq!(app.in_flight(), 1);

    let completion = app.next_completion().await.unwrap();
    let update = app.apply(completion);

    assert_eq!(update.category, "image");
    assert!(update.is_active);
    assert_eq!(update.result, Ok("A vivid cat".to_string()));
    assert_eq!(app.in_flight(), 0);
    assert_eq!(app.last_result(), Some("A vivid cat"));
    assert_eq!(app.result_history().unwrap().len(), 1);
    assert!(app.next_completion().await.is_none());
}

#[tokio::test]
async fn test_blank_prompt_rejected() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion_body("unused")))
        .expect(0)
        .mount(&server)
        .await;

    let mut app = create_app(&server, 10);

    assert!(matches!(app.submit(" \n\t"), Err(EnhanceError::InvalidInput(_))));
    assert!(app.active_session().unwrap().is_empty());
    assert_eq!(app.in_flight(), 0);
}

#[tokio::test]
async fn test_completion_lands_in_originating_category() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(body_string_contains("a sunset"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(completion_body("A golden sunset"))
                .set_delay(Duration::from_millis(100)),
        )
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(body_string_contains("parse json"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let mut app = create_app(&server, 10);
    app.submit("a sunset").unwrap();
    app.select_category("code").unwrap();
    app.submit("parse json").unwrap();

    let mut updates = Vec::new();
    while let Some(completion) = app.next_completion().await {
        updates.push(app.apply(completion));
    }
    assert_eq!(updates.len(), 2);

    let image_update = updates.iter().find(|u| u.category == "image").unwrap();
    assert!(!image_update.is_active);
    assert_eq!(image_update.result, Ok("A golden sunset".to_string()));

    let code_update = updates.iter().find(|u| u.category == "code").unwrap();
    assert!(code_update.is_active);
    assert_eq!(code_update.result, Err(EnhanceError::AuthenticationFailed));

    let store = app.store();
    assert_eq!(store.last_result("image"), Some("A golden sunset"));
    assert_eq!(store.last_result("code"), None);
    let code_entries = store.session("code").unwrap().entries();
    assert_eq!(code_entries.len(), 2);
    assert_eq!(code_entries[1].tag, EntryTag::Error);
}

#[tokio::test]
async fn test_worker_pool_bounds_concurrency() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(completion_body("ok"))
                .set_delay(Duration::from_millis(300)),
        )
        .expect(3)
        .mount(&server)
        .await;

    let mut app = create_app(&server, 10);
    let started = Instant::now();
    for i in 0..=WORKER_COUNT {
        app.submit(&format!("prompt {}", i)).unwrap();
    }
    assert_eq!(app.in_flight(), WORKER_COUNT + 1);

    assert_eq!(drain(&mut app).await, WORKER_COUNT + 1);

    // two waves: the third request waits for a free worker
    assert!(started.elapsed() >= Duration::from_millis(600));
    assert_eq!(app.result_history().unwrap().len(), WORKER_COUNT + 1);
}

#[tokio::test]
async fn test_history_bound_applies_through_app() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion_body("same")))
        .mount(&server)
        .await;

    let mut app = create_app(&server, 2);
    for i in 0..3 {
        app.submit(&format!("prompt {}", i)).unwrap();
        drain(&mut app).await;
    }

    assert_eq!(app.result_history().unwrap().len(), 2);

    app.clear_active().unwrap();
    assert!(app.result_history().unwrap().is_empty());
    assert_eq!(app.last_result(), None);
}

#[tokio::test]
async fn test_export_active() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion_body("Better")))
        .mount(&server)
        .await;

    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("image.txt");
    let mut app = create_app(&server, 10);

    assert!(matches!(
        app.export_active(&path),
        Err(SessionError::EmptyHistory(_))
    ));

    app.submit("good").unwrap();
    drain(&mut app).await;
    app.export_active(&path).unwrap();

    let content = std::fs::read_to_string(&path).unwrap();
    assert!(content.contains("Original Prompt: good"));
    assert!(content.ends_with("Enhanced Result:\nBetter"));
}

#[tokio::test]
async fn test_shutdown_abandons_pending_work() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(completion_body("never seen"))
                .set_delay(Duration::from_secs(10)),
        )
        .mount(&server)
        .await;

    let mut app = create_app(&server, 10);
    app.submit("slow").unwrap();

    let started = Instant::now();
    app.shutdown();
    assert!(started.elapsed() < Duration::from_secs(5));
}
