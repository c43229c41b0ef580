//! End-to-end tests for the streaming turn job.
//!
//! These exercise the full pipeline — prompt building, streaming, tool
//! dispatch, persistence, and event publication — against an in-memory
//! store and scripted providers.

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use namecard_assistant::TurnRunner;
use namecard_core::error::ProviderError;
use namecard_core::event::{ChatEvent, ChatHub};
use namecard_core::message::Role;
use namecard_core::provider::{CompletionRequest, Provider, StreamChunk, ToolInvocation};
use namecard_core::store::CardStore;
use namecard_store::{InMemoryStore, seed_demo};

// ── Scripted providers ───────────────────────────────────────────────────

/// Streams pre-scripted chunk sequences, one script per `stream()` call.
struct ScriptedProvider {
    scripts: std::sync::Mutex<VecDeque<Vec<StreamChunk>>>,
    calls: AtomicUsize,
}

impl ScriptedProvider {
    fn new(scripts: Vec<Vec<StreamChunk>>) -> Self {
        Self {
            scripts: std::sync::Mutex::new(scripts.into()),
            calls: AtomicUsize::new(0),
        }
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl Provider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn stream(
        &self,
        _request: CompletionRequest,
    ) -> Result<
        tokio::sync::mpsc::Receiver<Result<StreamChunk, ProviderError>>,
        ProviderError,
    > {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let script = self
            .scripts
            .lock()
            .unwrap()
            .pop_front()
            .expect("ScriptedProvider exhausted");

        let (tx, rx) = tokio::sync::mpsc::channel(16);
        tokio::spawn(async move {
            for chunk in script {
                if tx.send(Ok(chunk)).await.is_err() {
                    return;
                }
            }
        });
        Ok(rx)
    }
}

/// Always fails at `stream()` with a fixed error; counts invocations.
struct FailingProvider {
    error: ProviderError,
    calls: AtomicUsize,
}

impl FailingProvider {
    fn new(error: ProviderError) -> Self {
        Self {
            error,
            calls: AtomicUsize::new(0),
        }
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl Provider for FailingProvider {
    fn name(&self) -> &str {
        "failing"
    }

    async fn stream(
        &self,
        _request: CompletionRequest,
    ) -> Result<
        tokio::sync::mpsc::Receiver<Result<StreamChunk, ProviderError>>,
        ProviderError,
    > {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(self.error.clone())
    }
}

// ── Fixture ──────────────────────────────────────────────────────────────

struct Fixture {
    store: Arc<dyn CardStore>,
    hub: Arc<ChatHub>,
    session_id: i64,
    li_id: i64,
}

/// Seed the demo team and open a session against 张伟's card.
async fn fixture() -> Fixture {
    let store: Arc<dyn CardStore> = Arc::new(InMemoryStore::new());
    let (_org_id, approved) = seed_demo(store.as_ref()).await.unwrap();
    let session = store.create_session(approved[0]).await.unwrap();
    Fixture {
        store,
        hub: Arc::new(ChatHub::default()),
        session_id: session.id,
        li_id: approved[1],
    }
}

fn drain(rx: &mut tokio::sync::broadcast::Receiver<ChatEvent>) -> Vec<ChatEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

// ── E2E: plain streaming turn ────────────────────────────────────────────

#[tokio::test]
async fn streams_chunks_and_persists_assistant_message() {
    let fx = fixture().await;
    let provider = Arc::new(ScriptedProvider::new(vec![vec![
        StreamChunk::text("您好"),
        StreamChunk::text("，我是"),
        StreamChunk::text("张伟的名片助手。"),
        StreamChunk::finished(vec![]),
    ]]));
    let runner = TurnRunner::new(
        provider.clone(),
        fx.store.clone(),
        fx.hub.clone(),
        "mock-model",
    );

    let mut rx = fx.hub.subscribe(fx.session_id);
    runner.run(fx.session_id, "你好").await;

    let events = drain(&mut rx);

    let chunks: Vec<&str> = events
        .iter()
        .filter_map(|e| match e {
            ChatEvent::AssistantChunk { chunk } => Some(chunk.as_str()),
            _ => None,
        })
        .collect();
    assert_eq!(chunks, vec!["您好", "，我是", "张伟的名片助手。"]);

    let done: Vec<&ChatEvent> = events
        .iter()
        .filter(|e| matches!(e, ChatEvent::AssistantDone { .. }))
        .collect();
    assert_eq!(done.len(), 1, "exactly one assistant-done event");

    let ChatEvent::AssistantDone { id, content, .. } = done[0] else {
        unreachable!()
    };
    assert_eq!(content, "您好，我是张伟的名片助手。");

    // Exactly two persisted messages: the visitor's and the assistant's
    let messages = fx.store.recent_messages(fx.session_id, 10).await.unwrap();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0].role, Role::User);
    assert_eq!(messages[0].content, "你好");
    assert_eq!(messages[1].role, Role::Assistant);
    assert_eq!(messages[1].content, "您好，我是张伟的名片助手。");
    assert_eq!(messages[1].id, *id);

    assert_eq!(provider.calls(), 1);
}

// ── E2E: tool round with member card ─────────────────────────────────────

#[tokio::test]
async fn recommendation_publishes_tool_call_and_member_card() {
    let fx = fixture().await;
    let arguments = format!(r#"{{"profile_id": {}, "reason": "专业对口"}}"#, fx.li_id);
    let provider = Arc::new(ScriptedProvider::new(vec![
        vec![StreamChunk::finished(vec![ToolInvocation {
            id: "call_1".into(),
            name: "recommend_team_member".into(),
            arguments,
        }])],
        vec![
            StreamChunk::text("为您推荐李娜。"),
            StreamChunk::finished(vec![]),
        ],
    ]));
    let runner = TurnRunner::new(
        provider.clone(),
        fx.store.clone(),
        fx.hub.clone(),
        "mock-model",
    );

    let mut rx = fx.hub.subscribe(fx.session_id);
    runner.run(fx.session_id, "有懂合同法的律师吗？").await;

    let events = drain(&mut rx);
    let kinds: Vec<&str> = events.iter().map(|e| e.event_type()).collect();
    assert_eq!(
        kinds,
        vec!["tool-call", "member-card", "assistant-chunk", "assistant-done"]
    );

    let ChatEvent::ToolCall { tool_name, arguments } = &events[0] else {
        unreachable!()
    };
    assert_eq!(tool_name, "recommend_team_member");
    assert_eq!(arguments["reason"], serde_json::json!("专业对口"));

    let ChatEvent::MemberCard { profile, reason } = &events[1] else {
        unreachable!()
    };
    assert_eq!(profile["id"], serde_json::json!(fx.li_id));
    assert_eq!(profile["full_name"], serde_json::json!("李娜"));
    assert_eq!(reason, "专业对口");

    // Two provider rounds: tool call, then the final text
    assert_eq!(provider.calls(), 2);

    let messages = fx.store.recent_messages(fx.session_id, 10).await.unwrap();
    assert_eq!(messages.last().unwrap().content, "为您推荐李娜。");
}

#[tokio::test]
async fn failed_recommendation_yields_no_member_card() {
    let fx = fixture().await;
    let provider = Arc::new(ScriptedProvider::new(vec![
        vec![StreamChunk::finished(vec![ToolInvocation {
            id: "call_1".into(),
            name: "recommend_team_member".into(),
            // id 999 does not exist; dispatch answers with a structured error
            arguments: r#"{"profile_id": 999, "reason": "x"}"#.into(),
        }])],
        vec![
            StreamChunk::text("抱歉，没有找到合适的成员。"),
            StreamChunk::finished(vec![]),
        ],
    ]));
    let runner = TurnRunner::new(provider, fx.store.clone(), fx.hub.clone(), "mock-model");

    let mut rx = fx.hub.subscribe(fx.session_id);
    runner.run(fx.session_id, "推荐个人").await;

    let events = drain(&mut rx);
    assert!(events.iter().any(|e| e.event_type() == "tool-call"));
    assert!(
        !events.iter().any(|e| e.event_type() == "member-card"),
        "failed recommendation must not publish a card"
    );
    assert!(events.iter().any(|e| e.event_type() == "assistant-done"));
}

// ── Failure paths ────────────────────────────────────────────────────────

#[tokio::test]
async fn unknown_session_publishes_prompt_error_without_calling_provider() {
    let fx = fixture().await;
    let provider = Arc::new(FailingProvider::new(ProviderError::Network("unused".into())));
    let runner = TurnRunner::new(
        provider.clone(),
        fx.store.clone(),
        fx.hub.clone(),
        "mock-model",
    );

    let mut rx = fx.hub.subscribe(999);
    runner.run(999, "你好").await;

    let events = drain(&mut rx);
    assert_eq!(events.len(), 1);
    let ChatEvent::Error { message } = &events[0] else {
        panic!("expected error event, got {events:?}");
    };
    assert_eq!(message, "处理消息时出现错误,请重试。");
    assert_eq!(provider.calls(), 0, "prompt failures are not retried");
}

#[tokio::test(start_paused = true)]
async fn api_errors_retry_twice_then_apologize() {
    let fx = fixture().await;
    let provider = Arc::new(FailingProvider::new(ProviderError::ApiError {
        status_code: 502,
        message: "bad gateway".into(),
    }));
    let runner = TurnRunner::new(
        provider.clone(),
        fx.store.clone(),
        fx.hub.clone(),
        "mock-model",
    );

    let mut rx = fx.hub.subscribe(fx.session_id);
    runner.run(fx.session_id, "你好").await;

    assert_eq!(provider.calls(), 2);

    let events = drain(&mut rx);
    assert_eq!(events.len(), 1);
    let ChatEvent::Error { message } = &events[0] else {
        panic!("expected error event, got {events:?}");
    };
    assert_eq!(message, "抱歉,我遇到了一些问题,请稍后再试。");

    // The visitor's message was persisted once; no assistant message exists
    let messages = fx.store.recent_messages(fx.session_id, 10).await.unwrap();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].role, Role::User);
}

#[tokio::test(start_paused = true)]
async fn timeouts_retry_three_times() {
    let fx = fixture().await;
    let provider = Arc::new(FailingProvider::new(ProviderError::Timeout(
        "read timed out".into(),
    )));
    let runner = TurnRunner::new(
        provider.clone(),
        fx.store.clone(),
        fx.hub.clone(),
        "mock-model",
    );

    let mut rx = fx.hub.subscribe(fx.session_id);
    runner.run(fx.session_id, "你好").await;

    assert_eq!(provider.calls(), 3);
    let events = drain(&mut rx);
    assert!(matches!(events.as_slice(), [ChatEvent::Error { .. }]));
}
