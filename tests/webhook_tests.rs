//! Integration tests for the webhook surface.
//!
//! Each test spins up a real Axum server on a random port and exercises
//! the transport contract and command flows with stub gateway and
//! provider implementations plus an in-memory store.

use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use secrecy::SecretString;
use tokio::net::TcpListener;

use arcana::commands::{help, reading, togglebot};
use arcana::config::Config;
use arcana::error::{GatewayError, ProviderError};
use arcana::gateway::{Gateway, MemberRole};
use arcana::providers::{FailoverReader, Orientation, ReadingProvider, TarotReading};
use arcana::store::{LibSqlStore, ReadingStore};
use arcana::webhook::{AppState, SECRET_HEADER, webhook_routes};

const CHAT: i64 = 1001;
const USER: i64 = 42;

// ── Stubs ───────────────────────────────────────────────────────────

/// Gateway stub that records everything it is asked to send.
struct StubGateway {
    messages: Mutex<Vec<(i64, String)>>,
    photos: Mutex<Vec<(i64, String, String)>>,
    role: MemberRole,
    fail_photos: bool,
}

impl StubGateway {
    fn with_role(role: MemberRole) -> Arc<Self> {
        Arc::new(Self {
            messages: Mutex::new(Vec::new()),
            photos: Mutex::new(Vec::new()),
            role,
            fail_photos: false,
        })
    }

    fn failing_photos(role: MemberRole) -> Arc<Self> {
        Arc::new(Self {
            messages: Mutex::new(Vec::new()),
            photos: Mutex::new(Vec::new()),
            role,
            fail_photos: true,
        })
    }

    fn sent_messages(&self) -> Vec<String> {
        self.messages
            .lock()
            .unwrap()
            .iter()
            .map(|(_, text)| text.clone())
            .collect()
    }

    fn sent_photos(&self) -> Vec<(String, String)> {
        self.photos
            .lock()
            .unwrap()
            .iter()
            .map(|(_, photo, caption)| (photo.clone(), caption.clone()))
            .collect()
    }
}

#[async_trait]
impl Gateway for StubGateway {
    async fn send_message(&self, chat_id: i64, text: &str) -> Result<(), GatewayError> {
        self.messages
            .lock()
            .unwrap()
            .push((chat_id, text.to_string()));
        Ok(())
    }

    async fn send_photo(
        &self,
        chat_id: i64,
        photo: &str,
        caption: &str,
    ) -> Result<(), GatewayError> {
        if self.fail_photos {
            return Err(GatewayError::Http("stub photo failure".to_string()));
        }
        self.photos
            .lock()
            .unwrap()
            .push((chat_id, photo.to_string(), caption.to_string()));
        Ok(())
    }

    async fn member_role(&self, _chat_id: i64, _user_id: i64) -> Result<MemberRole, GatewayError> {
        Ok(self.role)
    }

    async fn upload_photo(&self, _chat_id: i64, _url: &str) -> Result<String, GatewayError> {
        Ok("stub-file-id".to_string())
    }
}

/// Provider stub that always returns the same reading.
struct ScriptedProvider {
    reading: TarotReading,
    calls: AtomicU32,
}

impl ScriptedProvider {
    fn the_fool() -> Arc<Self> {
        Self::with_card("The Fool", Orientation::Upright, "New beginnings")
    }

    fn with_card(card: &str, orientation: Orientation, interpretation: &str) -> Arc<Self> {
        Arc::new(Self {
            reading: TarotReading {
                card: card.to_string(),
                orientation,
                interpretation: interpretation.to_string(),
            },
            calls: AtomicU32::new(0),
        })
    }

    fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ReadingProvider for ScriptedProvider {
    fn name(&self) -> &'static str {
        "stub"
    }

    async fn draw(&self, _question: &str) -> Result<TarotReading, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.reading.clone())
    }
}

/// Provider stub that always fails.
struct FailingProvider {
    calls: AtomicU32,
}

impl FailingProvider {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicU32::new(0),
        })
    }
}

#[async_trait]
impl ReadingProvider for FailingProvider {
    fn name(&self) -> &'static str {
        "broken"
    }

    async fn draw(&self, _question: &str) -> Result<TarotReading, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(ProviderError::RequestFailed {
            provider: "broken".to_string(),
            reason: "stub failure".to_string(),
        })
    }
}

// ── Harness ─────────────────────────────────────────────────────────

fn test_config(webhook_secret: Option<&str>, designated_chat: Option<i64>) -> Arc<Config> {
    Arc::new(Config {
        bot_token: SecretString::from("test-token"),
        webhook_secret: webhook_secret.map(|s| s.to_string()),
        designated_chat,
        groq_api_key: SecretString::from("test-groq"),
        groq_model: "test-model".to_string(),
        anthropic_api_key: SecretString::from("test-anthropic"),
        anthropic_model: "test-model".to_string(),
        image_base_url: "https://cards.example.com".to_string(),
        admin_chat: None,
        db_path: ":memory:".to_string(),
        bind_addr: "127.0.0.1:0".to_string(),
        daily_limit: 3,
    })
}

async fn new_state(
    config: Arc<Config>,
    gateway: Arc<dyn Gateway>,
    provider: Arc<dyn ReadingProvider>,
) -> (AppState, Arc<LibSqlStore>) {
    let store = Arc::new(LibSqlStore::new_memory().await.unwrap());
    let state = AppState {
        config,
        gateway,
        store: Arc::clone(&store) as Arc<dyn ReadingStore>,
        reader: Arc::new(FailoverReader::new(vec![provider])),
    };
    (state, store)
}

/// Start a server for the given state, return its port.
async fn start_server(state: AppState) -> u16 {
    let app = webhook_routes(state);
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    // Give the server a moment to start accepting connections.
    tokio::time::sleep(Duration::from_millis(50)).await;
    port
}

fn update(chat_id: i64, user_id: i64, text: &str) -> serde_json::Value {
    serde_json::json!({
        "message": {
            "chat": { "id": chat_id, "type": "group" },
            "from": { "id": user_id },
            "text": text,
        }
    })
}

async fn post_update(port: u16, body: &serde_json::Value) -> reqwest::Response {
    reqwest::Client::new()
        .post(format!("http://127.0.0.1:{port}/webhook"))
        .json(body)
        .send()
        .await
        .unwrap()
}

// ── Transport contract ──────────────────────────────────────────────

#[tokio::test]
async fn non_post_is_method_not_allowed() {
    let gateway = StubGateway::with_role(MemberRole::Member);
    let (state, _store) = new_state(test_config(None, None), gateway, ScriptedProvider::the_fool()).await;
    let port = start_server(state).await;

    let resp = reqwest::get(format!("http://127.0.0.1:{port}/webhook"))
        .await
        .unwrap();
    assert_eq!(resp.status(), reqwest::StatusCode::METHOD_NOT_ALLOWED);
}

#[tokio::test]
async fn missing_or_wrong_secret_is_unauthorized() {
    let gateway = StubGateway::with_role(MemberRole::Member);
    let (state, _store) = new_state(
        test_config(Some("hunter2"), None),
        gateway.clone(),
        ScriptedProvider::the_fool(),
    )
    .await;
    let port = start_server(state).await;
    let body = update(CHAT, USER, "/help");

    let resp = post_update(port, &body).await;
    assert_eq!(resp.status(), reqwest::StatusCode::UNAUTHORIZED);

    let resp = reqwest::Client::new()
        .post(format!("http://127.0.0.1:{port}/webhook"))
        .header(SECRET_HEADER, "wrong")
        .json(&body)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), reqwest::StatusCode::UNAUTHORIZED);
    assert!(gateway.sent_messages().is_empty());

    let resp = reqwest::Client::new()
        .post(format!("http://127.0.0.1:{port}/webhook"))
        .header(SECRET_HEADER, "hunter2")
        .json(&body)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), reqwest::StatusCode::OK);
    assert_eq!(gateway.sent_messages(), vec![help::HELP_TEXT.to_string()]);
}

#[tokio::test]
async fn non_designated_chat_is_silently_acknowledged() {
    let gateway = StubGateway::with_role(MemberRole::Member);
    let (state, _store) = new_state(
        test_config(None, Some(999)),
        gateway.clone(),
        ScriptedProvider::the_fool(),
    )
    .await;
    let port = start_server(state).await;

    let resp = post_update(port, &update(CHAT, USER, "/help")).await;
    assert_eq!(resp.status(), reqwest::StatusCode::OK);
    assert!(gateway.sent_messages().is_empty());
}

#[tokio::test]
async fn empty_and_unknown_text_route_to_help() {
    let gateway = StubGateway::with_role(MemberRole::Member);
    let (state, _store) = new_state(test_config(None, None), gateway.clone(), ScriptedProvider::the_fool()).await;
    let port = start_server(state).await;

    post_update(port, &update(CHAT, USER, "")).await;
    post_update(port, &update(CHAT, USER, "what do you do?")).await;

    let messages = gateway.sent_messages();
    assert_eq!(messages.len(), 2);
    assert!(messages.iter().all(|m| m == help::HELP_TEXT));
}

#[tokio::test]
async fn message_without_text_routes_to_help() {
    let gateway = StubGateway::with_role(MemberRole::Member);
    let (state, _store) = new_state(test_config(None, None), gateway.clone(), ScriptedProvider::the_fool()).await;
    let port = start_server(state).await;

    let body = serde_json::json!({
        "message": {
            "chat": { "id": CHAT, "type": "group" },
            "from": { "id": USER },
        }
    });
    let resp = post_update(port, &body).await;
    assert_eq!(resp.status(), reqwest::StatusCode::OK);
    assert_eq!(gateway.sent_messages(), vec![help::HELP_TEXT.to_string()]);
}

#[tokio::test]
async fn bad_secret_wins_over_malformed_body() {
    let gateway = StubGateway::with_role(MemberRole::Member);
    let (state, _store) = new_state(
        test_config(Some("hunter2"), None),
        gateway.clone(),
        ScriptedProvider::the_fool(),
    )
    .await;
    let port = start_server(state).await;
    let client = reqwest::Client::new();

    let resp = client
        .post(format!("http://127.0.0.1:{port}/webhook"))
        .header(SECRET_HEADER, "wrong")
        .body("not json")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), reqwest::StatusCode::UNAUTHORIZED);

    // With a valid secret the garbage body is acknowledged, not retried.
    let resp = client
        .post(format!("http://127.0.0.1:{port}/webhook"))
        .header(SECRET_HEADER, "hunter2")
        .body("not json")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), reqwest::StatusCode::OK);
    assert!(gateway.sent_messages().is_empty());
}

// ── /togglebot ──────────────────────────────────────────────────────

#[tokio::test]
async fn togglebot_from_non_admin_is_rejected() {
    let gateway = StubGateway::with_role(MemberRole::Member);
    let (state, store) = new_state(test_config(None, None), gateway.clone(), ScriptedProvider::the_fool()).await;
    let port = start_server(state).await;

    post_update(port, &update(CHAT, USER, "/togglebot")).await;

    assert_eq!(
        gateway.sent_messages(),
        vec![togglebot::MSG_ADMINS_ONLY.to_string()]
    );
    assert!(store.bot_state().await.unwrap().enabled);
}

#[tokio::test]
async fn togglebot_from_admin_flips_and_restores() {
    let gateway = StubGateway::with_role(MemberRole::Administrator);
    let (state, store) = new_state(test_config(None, None), gateway.clone(), ScriptedProvider::the_fool()).await;
    let port = start_server(state).await;

    post_update(port, &update(CHAT, USER, "/togglebot")).await;
    assert!(!store.bot_state().await.unwrap().enabled);

    post_update(port, &update(CHAT, USER, "/togglebot")).await;
    assert!(store.bot_state().await.unwrap().enabled);

    assert_eq!(
        gateway.sent_messages(),
        vec![
            togglebot::MSG_NOW_DISABLED.to_string(),
            togglebot::MSG_NOW_ENABLED.to_string(),
        ]
    );
}

// ── /reading ────────────────────────────────────────────────────────

#[tokio::test]
async fn reading_without_question_prompts_usage() {
    let gateway = StubGateway::with_role(MemberRole::Member);
    let provider = ScriptedProvider::the_fool();
    let (state, store) = new_state(test_config(None, None), gateway.clone(), provider.clone()).await;
    let port = start_server(state).await;

    post_update(port, &update(CHAT, USER, "/reading")).await;

    assert_eq!(gateway.sent_messages(), vec![reading::MSG_USAGE.to_string()]);
    assert_eq!(provider.calls(), 0);
    assert_eq!(store.usage(&USER.to_string(), &today()).await.unwrap(), 0);
}

#[tokio::test]
async fn reading_when_disabled_is_rejected() {
    let gateway = StubGateway::with_role(MemberRole::Member);
    let provider = ScriptedProvider::the_fool();
    let (state, store) = new_state(test_config(None, None), gateway.clone(), provider.clone()).await;
    store.toggle_bot().await.unwrap();
    let port = start_server(state).await;

    post_update(port, &update(CHAT, USER, "/reading Will it rain?")).await;

    assert_eq!(
        gateway.sent_messages(),
        vec![reading::MSG_DISABLED.to_string()]
    );
    assert_eq!(provider.calls(), 0);
}

#[tokio::test]
async fn reading_rate_limits_non_admins() {
    let gateway = StubGateway::with_role(MemberRole::Member);
    let provider = ScriptedProvider::the_fool();
    let (state, store) = new_state(test_config(None, None), gateway.clone(), provider.clone()).await;

    let user_key = USER.to_string();
    for _ in 0..3 {
        store.increment_usage(&user_key, &today()).await.unwrap();
    }
    let port = start_server(state).await;

    post_update(port, &update(CHAT, USER, "/reading Will I get the job?")).await;

    assert_eq!(
        gateway.sent_messages(),
        vec![reading::MSG_RATE_LIMITED.to_string()]
    );
    // Rejected before the provider was ever consulted, and without
    // consuming another slot.
    assert_eq!(provider.calls(), 0);
    assert_eq!(store.usage(&user_key, &today()).await.unwrap(), 3);
}

#[tokio::test]
async fn reading_happy_path_delivers_photo_and_counts_usage() {
    let gateway = StubGateway::with_role(MemberRole::Member);
    let provider = ScriptedProvider::the_fool();
    let (state, store) = new_state(test_config(None, None), gateway.clone(), provider.clone()).await;

    let user_key = USER.to_string();
    store.increment_usage(&user_key, &today()).await.unwrap();
    store.increment_usage(&user_key, &today()).await.unwrap();
    let port = start_server(state).await;

    let resp = post_update(port, &update(CHAT, USER, "/reading Will I get the job?")).await;
    assert_eq!(resp.status(), reqwest::StatusCode::OK);

    assert_eq!(
        gateway.sent_messages(),
        vec![reading::MSG_SHUFFLING.to_string()]
    );
    let photos = gateway.sent_photos();
    assert_eq!(photos.len(), 1);
    let (photo, caption) = &photos[0];
    assert_eq!(
        photo,
        "https://cards.example.com/tarot-images/The_Fool_Upright.jpg"
    );
    assert!(caption.contains("The Fool (upright)"));
    assert!(caption.contains("New beginnings"));

    assert_eq!(provider.calls(), 1);
    assert_eq!(store.usage(&user_key, &today()).await.unwrap(), 3);
}

#[tokio::test]
async fn reading_prefers_provisioned_file_id() {
    let gateway = StubGateway::with_role(MemberRole::Member);
    let (state, store) = new_state(test_config(None, None), gateway.clone(), ScriptedProvider::the_fool()).await;
    store
        .set_image_ref("The Fool", Orientation::Upright, "file-abc")
        .await
        .unwrap();
    let port = start_server(state).await;

    post_update(port, &update(CHAT, USER, "/reading Will I get the job?")).await;

    let photos = gateway.sent_photos();
    assert_eq!(photos.len(), 1);
    assert_eq!(photos[0].0, "file-abc");
}

#[tokio::test]
async fn reading_falls_back_to_text_when_photo_fails() {
    let gateway = StubGateway::failing_photos(MemberRole::Member);
    let (state, store) = new_state(test_config(None, None), gateway.clone(), ScriptedProvider::the_fool()).await;
    let port = start_server(state).await;

    post_update(port, &update(CHAT, USER, "/reading Will I get the job?")).await;

    let messages = gateway.sent_messages();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0], reading::MSG_SHUFFLING);
    assert!(messages[1].contains("The Fool (upright)"));
    assert!(messages[1].contains("New beginnings"));
    // The text fallback still counts as a delivered reading.
    assert_eq!(store.usage(&USER.to_string(), &today()).await.unwrap(), 1);
}

#[tokio::test]
async fn reading_generation_failure_does_not_consume_a_slot() {
    let gateway = StubGateway::with_role(MemberRole::Member);
    let provider = FailingProvider::new();
    let (state, store) = new_state(test_config(None, None), gateway.clone(), provider.clone()).await;
    let port = start_server(state).await;

    let resp = post_update(port, &update(CHAT, USER, "/reading Will I get the job?")).await;
    // Internal failure, but the transport still sees success.
    assert_eq!(resp.status(), reqwest::StatusCode::OK);

    let messages = gateway.sent_messages();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0], reading::MSG_SHUFFLING);
    assert_eq!(messages[1], reading::MSG_GENERATION_FAILED);
    assert_eq!(store.usage(&USER.to_string(), &today()).await.unwrap(), 0);
}

#[tokio::test]
async fn reading_with_unknown_card_reports_it_without_consuming_a_slot() {
    let gateway = StubGateway::with_role(MemberRole::Member);
    let provider = ScriptedProvider::with_card("The Crab", Orientation::Upright, "Sideways progress");
    let (state, store) = new_state(test_config(None, None), gateway.clone(), provider.clone()).await;

    let user_key = USER.to_string();
    store.increment_usage(&user_key, &today()).await.unwrap();
    let port = start_server(state).await;

    let resp = post_update(port, &update(CHAT, USER, "/reading Will I get the job?")).await;
    assert_eq!(resp.status(), reqwest::StatusCode::OK);

    let messages = gateway.sent_messages();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0], reading::MSG_SHUFFLING);
    // The diagnostic names the card and orientation we could not resolve.
    assert!(messages[1].contains("The Crab (upright)"));
    assert!(gateway.sent_photos().is_empty());
    assert_eq!(provider.calls(), 1);
    assert_eq!(store.usage(&user_key, &today()).await.unwrap(), 1);
}

#[tokio::test]
async fn admin_bypasses_rate_limit_and_is_not_counted() {
    let gateway = StubGateway::with_role(MemberRole::Creator);
    let provider = ScriptedProvider::the_fool();
    let (state, store) = new_state(test_config(None, None), gateway.clone(), provider.clone()).await;

    let user_key = USER.to_string();
    for _ in 0..3 {
        store.increment_usage(&user_key, &today()).await.unwrap();
    }
    let port = start_server(state).await;

    post_update(port, &update(CHAT, USER, "/reading One more?")).await;

    assert_eq!(gateway.sent_photos().len(), 1);
    assert_eq!(provider.calls(), 1);
    assert_eq!(store.usage(&user_key, &today()).await.unwrap(), 3);
}

fn today() -> String {
    chrono::Utc::now().format("%Y-%m-%d").to_string()
}
