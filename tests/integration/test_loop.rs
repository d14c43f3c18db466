//! End-to-end tests for the hwwatch poll loop.
//!
//! The review API and the Telegram Bot API are replaced by in-process axum
//! servers; the real reqwest clients talk to them over loopback. Time is
//! driven by a fake scheduler so no test waits on the retry period.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, post};
use axum::{Json, Router};
use hwwatch_client::{build_http_client, ReviewApiClient, TelegramNotifier};
use hwwatch_core::{
    Config, IterationOutcome, MalformedKind, PollLoop, Scheduler, StatusErrorKind, WatchError,
    STARTUP_MESSAGE,
};
use serde_json::{json, Value};

const START: i64 = 1_700_000_000;
const PRACTICUM_TOKEN: &str = "practicum-oauth-token";
const TELEGRAM_TOKEN: &str = "123456:telegram-secret";
const CHAT_ID: &str = "4242";
const STATUSES_PATH: &str = "/api/user_api/homework_statuses/";

// ============================================================================
// Fake review API
// ============================================================================

/// A request seen by the fake review API.
#[derive(Debug, Clone)]
struct ReviewRequest {
    authorization: Option<String>,
    from_date: Option<String>,
}

/// Scripted answers; the last one repeats once the script runs out.
#[derive(Default)]
struct ReviewApi {
    answers: Mutex<VecDeque<(StatusCode, String)>>,
    requests: Mutex<Vec<ReviewRequest>>,
}

impl ReviewApi {
    fn scripted(answers: impl IntoIterator<Item = (StatusCode, String)>) -> Arc<Self> {
        Arc::new(Self {
            answers: Mutex::new(answers.into_iter().collect()),
            requests: Mutex::default(),
        })
    }

    fn requests(&self) -> Vec<ReviewRequest> {
        self.requests.lock().expect("lock poisoned").clone()
    }
}

async fn statuses_handler(
    State(api): State<Arc<ReviewApi>>,
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
) -> (StatusCode, String) {
    api.requests
        .lock()
        .expect("lock poisoned")
        .push(ReviewRequest {
            authorization: headers
                .get("authorization")
                .and_then(|v| v.to_str().ok())
                .map(str::to_string),
            from_date: query.get("from_date").cloned(),
        });

    let mut answers = api.answers.lock().expect("lock poisoned");
    if answers.len() > 1 {
        answers.pop_front().expect("non-empty script")
    } else {
        answers
            .front()
            .cloned()
            .unwrap_or((StatusCode::NOT_FOUND, String::new()))
    }
}

fn ok(body: &Value) -> (StatusCode, String) {
    (StatusCode::OK, body.to_string())
}

// ============================================================================
// Fake Telegram Bot API
// ============================================================================

/// Records delivered messages; answers `ok: false` while `reject` is set.
#[derive(Default)]
struct BotApi {
    messages: Mutex<Vec<Value>>,
    paths: Mutex<Vec<String>>,
    reject: Mutex<Option<String>>,
}

impl BotApi {
    fn texts(&self) -> Vec<String> {
        self.messages
            .lock()
            .expect("lock poisoned")
            .iter()
            .filter_map(|m| m["text"].as_str().map(str::to_string))
            .collect()
    }

    fn reject_with(&self, description: Option<&str>) {
        *self.reject.lock().expect("lock poisoned") = description.map(str::to_string);
    }
}

async fn send_message_handler(
    State(bot): State<Arc<BotApi>>,
    Path(bot_path): Path<String>,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    bot.paths.lock().expect("lock poisoned").push(bot_path);

    if let Some(description) = bot.reject.lock().expect("lock poisoned").clone() {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({"ok": false, "error_code": 400, "description": description})),
        );
    }

    bot.messages.lock().expect("lock poisoned").push(body);
    (StatusCode::OK, Json(json!({"ok": true, "result": {}})))
}

// ============================================================================
// Fake scheduler
// ============================================================================

/// Fixed clock; sleeps are recorded and return immediately.
#[derive(Clone, Default)]
struct FakeScheduler {
    sleeps: Arc<Mutex<Vec<Duration>>>,
}

impl FakeScheduler {
    fn sleeps(&self) -> Vec<Duration> {
        self.sleeps.lock().expect("lock poisoned").clone()
    }
}

#[async_trait]
impl Scheduler for FakeScheduler {
    fn now(&self) -> i64 {
        START
    }

    async fn sleep(&self, period: Duration) {
        self.sleeps.lock().expect("lock poisoned").push(period);
        tokio::task::yield_now().await;
    }
}

// ============================================================================
// Harness
// ============================================================================

struct Harness {
    review: Arc<ReviewApi>,
    bot: Arc<BotApi>,
    scheduler: FakeScheduler,
    endpoint: String,
    poll_loop: PollLoop<ReviewApiClient, TelegramNotifier, FakeScheduler>,
}

/// Spawns both fake services on one loopback listener and builds a poll
/// loop wired to them through the real clients.
async fn spawn_harness(answers: impl IntoIterator<Item = (StatusCode, String)>) -> Harness {
    let review = ReviewApi::scripted(answers);
    let bot = Arc::new(BotApi::default());

    let router = Router::new()
        .route(
            STATUSES_PATH,
            get(statuses_handler).with_state(Arc::clone(&review)),
        )
        .route(
            "/telegram/:bot/sendMessage",
            post(send_message_handler).with_state(Arc::clone(&bot)),
        );

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind");
    let addr = listener.local_addr().expect("Failed to get local addr");
    tokio::spawn(async move {
        axum::serve(listener, router).await.expect("Server failed");
    });

    let mut config = Config::new(PRACTICUM_TOKEN, TELEGRAM_TOKEN, CHAT_ID);
    config.endpoint = format!("http://{addr}{STATUSES_PATH}");
    config.telegram_api_url = format!("http://{addr}/telegram");
    config.http_timeout_secs = 5;
    config.validate().expect("Test config should be valid");

    let http = build_http_client(&config).expect("Failed to build HTTP client");
    let source = ReviewApiClient::from_config(http.clone(), &config);
    let notifier = TelegramNotifier::from_config(http, &config);
    let scheduler = FakeScheduler::default();

    let poll_loop = PollLoop::new(source, notifier, scheduler.clone(), config.retry_period());

    Harness {
        review,
        bot,
        scheduler,
        endpoint: config.endpoint,
        poll_loop,
    }
}

fn failed(outcome: IterationOutcome) -> (WatchError, bool) {
    match outcome {
        IterationOutcome::Failed { error, reported } => (error, reported),
        other => panic!("Expected a failed iteration, got: {other:?}"),
    }
}

// ============================================================================
// Tests
// ============================================================================

/// A status change is delivered and the cursor advances to `current_date`.
#[tokio::test]
async fn test_status_change_is_delivered() {
    let mut h = spawn_harness([ok(&json!({
        "homeworks": [{
            "homework_name": "Project 1",
            "status": "approved",
            "lesson_name": "Python Basics"
        }],
        "current_date": START + 600
    }))])
    .await;

    let outcome = h.poll_loop.tick().await;

    assert_eq!(outcome, IterationOutcome::Notified { cursor: START + 600 });
    assert_eq!(h.poll_loop.cursor(), START + 600);
    assert_eq!(
        h.bot.texts(),
        vec![
            "Review status changed for \"Project 1\".\nPython Basics\n\
             The work has been reviewed: the reviewer liked everything. Hooray!"
                .to_string()
        ]
    );

    let messages = h.bot.messages.lock().expect("lock poisoned").clone();
    assert_eq!(messages[0]["chat_id"], CHAT_ID);
    assert_eq!(
        h.bot.paths.lock().expect("lock poisoned").clone(),
        vec![format!("bot{TELEGRAM_TOKEN}")]
    );
}

/// The review API receives the OAuth header and the cursor as `from_date`.
#[tokio::test]
async fn test_review_request_carries_token_and_cursor() {
    let mut h = spawn_harness([
        ok(&json!({
            "homeworks": [{"homework_name": "hw.zip", "status": "reviewing"}],
            "current_date": START + 600
        })),
        ok(&json!({"homeworks": [], "current_date": START + 1200})),
    ])
    .await;

    h.poll_loop.tick().await;
    h.poll_loop.tick().await;

    let requests = h.review.requests();
    assert_eq!(requests.len(), 2);
    for request in &requests {
        assert_eq!(
            request.authorization.as_deref(),
            Some(format!("OAuth {PRACTICUM_TOKEN}").as_str())
        );
    }
    assert_eq!(requests[0].from_date.as_deref(), Some("1700000000"));
    assert_eq!(requests[1].from_date.as_deref(), Some("1700000600"));
}

/// An empty `homeworks` list sends nothing and keeps the cursor.
#[tokio::test]
async fn test_no_new_status() {
    let mut h = spawn_harness([ok(&json!({"homeworks": [], "current_date": START + 600}))]).await;

    let outcome = h.poll_loop.tick().await;

    assert_eq!(outcome, IterationOutcome::NoNewStatus);
    assert_eq!(h.poll_loop.cursor(), START);
    assert!(h.bot.texts().is_empty());
}

/// A non-200 answer is reported once; repeats of the same failure are not.
#[tokio::test]
async fn test_endpoint_failure_reported_once() {
    let mut h = spawn_harness([(StatusCode::INTERNAL_SERVER_ERROR, String::new())]).await;

    let (error, reported) = failed(h.poll_loop.tick().await);
    assert_eq!(error, WatchError::endpoint_unavailable(h.endpoint.clone(), 500));
    assert!(reported);

    let (_, reported) = failed(h.poll_loop.tick().await);
    assert!(!reported);

    let texts = h.bot.texts();
    assert_eq!(texts.len(), 1);
    assert!(texts[0].starts_with("Program failure: "));
    assert!(texts[0].contains("HTTP 500"));
    assert_eq!(h.poll_loop.cursor(), START);
}

/// An unknown status value is reported and the cursor does not move.
#[tokio::test]
async fn test_unrecognized_status_reported() {
    let mut h = spawn_harness([ok(&json!({
        "homeworks": [{"homework_name": "Project 2", "status": "pending"}],
        "current_date": START + 600
    }))])
    .await;

    let (error, reported) = failed(h.poll_loop.tick().await);

    assert_eq!(
        error,
        WatchError::invalid_status(StatusErrorKind::Unrecognized("pending".to_string()))
    );
    assert!(reported);
    assert_eq!(h.poll_loop.cursor(), START);
    assert_eq!(
        h.bot.texts(),
        vec!["Program failure: Invalid homework record: unrecognized status value 'pending'"
            .to_string()]
    );
}

/// A body that is not JSON surfaces as a decode failure.
#[tokio::test]
async fn test_non_json_body_is_decode_failure() {
    let mut h = spawn_harness([(StatusCode::OK, "<html>maintenance</html>".to_string())]).await;

    let (error, reported) = failed(h.poll_loop.tick().await);

    assert!(
        matches!(error, WatchError::DecodeFailure { .. }),
        "Expected DecodeFailure, got: {error:?}"
    );
    assert!(reported);
}

/// A non-string status on the newest entry is an invalid status, and a
/// broken older entry does not block delivery of the newest one.
#[tokio::test]
async fn test_only_newest_entry_is_checked() {
    let mut h = spawn_harness([
        ok(&json!({
            "homeworks": [{"homework_name": "Project 2", "status": 7}],
            "current_date": START + 600
        })),
        ok(&json!({
            "homeworks": [
                {"homework_name": "Project 2", "status": "approved"},
                {"homework_name": "Old", "status": "approved", "lesson_name": 12}
            ],
            "current_date": START + 600
        })),
    ])
    .await;

    let (error, reported) = failed(h.poll_loop.tick().await);
    assert_eq!(
        error,
        WatchError::invalid_status(StatusErrorKind::Unrecognized("7".to_string()))
    );
    assert!(reported);

    let outcome = h.poll_loop.tick().await;
    assert_eq!(outcome, IterationOutcome::Notified { cursor: START + 600 });
    assert_eq!(h.bot.texts().len(), 2);
}

/// A response without `homeworks` is a contract violation.
#[tokio::test]
async fn test_missing_homeworks_reported() {
    let mut h = spawn_harness([ok(&json!({"current_date": START + 600}))]).await;

    let (error, _) = failed(h.poll_loop.tick().await);

    assert_eq!(
        error,
        WatchError::malformed(MalformedKind::MissingField("homeworks"))
    );
}

/// A recovered API resets deduplication, so the next identical failure is
/// reported again.
#[tokio::test]
async fn test_recovery_resets_deduplication() {
    let mut h = spawn_harness([
        (StatusCode::SERVICE_UNAVAILABLE, String::new()),
        ok(&json!({"homeworks": [], "current_date": START})),
        (StatusCode::SERVICE_UNAVAILABLE, String::new()),
    ])
    .await;

    assert!(failed(h.poll_loop.tick().await).1);
    assert_eq!(h.poll_loop.tick().await, IterationOutcome::NoNewStatus);
    assert!(failed(h.poll_loop.tick().await).1);

    assert_eq!(h.bot.texts().len(), 2);
}

/// A rejected `sendMessage` keeps the cursor so the change is retried, and
/// the failure is not reported through the failing channel.
#[tokio::test]
async fn test_telegram_rejection_keeps_cursor() {
    let mut h = spawn_harness([ok(&json!({
        "homeworks": [{"homework_name": "Project 3", "status": "rejected"}],
        "current_date": START + 600
    }))])
    .await;
    h.bot.reject_with(Some("Bad Request: chat not found"));

    let (error, reported) = failed(h.poll_loop.tick().await);

    assert!(
        matches!(&error, WatchError::NotifyFailure { message } if message.contains("chat not found")),
        "Expected NotifyFailure, got: {error:?}"
    );
    assert!(!error.to_string().contains("telegram-secret"));
    assert!(!reported);
    assert_eq!(h.poll_loop.cursor(), START);

    // Delivery recovers on the next iteration with the same cursor
    h.bot.reject_with(None);
    let outcome = h.poll_loop.tick().await;

    assert_eq!(outcome, IterationOutcome::Notified { cursor: START + 600 });
    assert_eq!(h.bot.texts().len(), 1);
    assert_eq!(h.review.requests()[1].from_date.as_deref(), Some("1700000000"));
}

/// The startup announcement goes through the real notifier.
#[tokio::test]
async fn test_announce() {
    let h = spawn_harness([ok(&json!({"homeworks": [], "current_date": START}))]).await;

    assert!(h.poll_loop.announce().await);
    assert_eq!(h.bot.texts(), vec![STARTUP_MESSAGE.to_string()]);
}

/// The loop sleeps for the retry period after every iteration and stops on
/// shutdown.
#[tokio::test]
async fn test_run_until_shutdown() {
    let mut h = spawn_harness([ok(&json!({"homeworks": [], "current_date": START}))]).await;
    let scheduler = h.scheduler.clone();

    let shutdown = async move {
        while scheduler.sleeps().len() < 3 {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    };

    tokio::time::timeout(Duration::from_secs(10), h.poll_loop.run_until(shutdown))
        .await
        .expect("Poll loop did not stop");

    let sleeps = h.scheduler.sleeps();
    assert!(sleeps.len() >= 3);
    assert!(sleeps.iter().all(|d| *d == Duration::from_secs(600)));
    assert!(h.review.requests().len() >= 3);
    assert!(h.bot.texts().is_empty());
}
