//! Chat event broadcasting — the per-session pub/sub channel.
//!
//! A turn job publishes typed [`ChatEvent`]s while it streams; the browser
//! client subscribes to the session's channel and renders them. The hub is an
//! explicit value injected into the job, not a process-wide singleton, and
//! publishing is fire-and-forget: no subscriber is not an error.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::RwLock;
use tokio::sync::broadcast;

/// Events published on a session's channel during one conversational turn.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ChatEvent {
    /// The model requested a tool call.
    ToolCall {
        tool_name: String,
        arguments: serde_json::Value,
    },

    /// A successful `recommend_team_member` produced a card to render.
    MemberCard {
        profile: serde_json::Value,
        reason: String,
    },

    /// A partial text fragment from the model, in arrival order.
    AssistantChunk { chunk: String },

    /// The turn finished; the assistant message was persisted.
    AssistantDone {
        id: i64,
        content: String,
        created_at: String,
    },

    /// The turn failed; `message` is a short localized user-facing string.
    Error { message: String },
}

impl ChatEvent {
    /// Wire event name, used as the SSE event type.
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::ToolCall { .. } => "tool-call",
            Self::MemberCard { .. } => "member-card",
            Self::AssistantChunk { .. } => "assistant-chunk",
            Self::AssistantDone { .. } => "assistant-done",
            Self::Error { .. } => "error",
        }
    }
}

/// The broadcast channel name for a session, as clients know it.
pub fn channel_name(session_id: i64) -> String {
    format!("profile_chat_{session_id}")
}

/// A registry of per-session broadcast channels.
///
/// Channels are created on first subscription and pruned once the last
/// subscriber is gone. Publishing to a session nobody is watching is a no-op.
pub struct ChatHub {
    capacity: usize,
    channels: RwLock<HashMap<i64, broadcast::Sender<ChatEvent>>>,
}

impl ChatHub {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            channels: RwLock::new(HashMap::new()),
        }
    }

    /// Publish an event to a session's channel. Fire-and-forget.
    pub fn publish(&self, session_id: i64, event: ChatEvent) {
        let dropped = {
            let channels = self.channels.read().expect("hub lock poisoned");
            match channels.get(&session_id) {
                Some(tx) => tx.send(event).is_err(),
                None => return,
            }
        };

        // Last subscriber went away; drop the channel so the map stays bounded.
        if dropped {
            let mut channels = self.channels.write().expect("hub lock poisoned");
            if let Some(tx) = channels.get(&session_id)
                && tx.receiver_count() == 0
            {
                channels.remove(&session_id);
            }
        }
    }

    /// Subscribe to a session's channel, creating it if needed.
    pub fn subscribe(&self, session_id: i64) -> broadcast::Receiver<ChatEvent> {
        let mut channels = self.channels.write().expect("hub lock poisoned");
        channels
            .entry(session_id)
            .or_insert_with(|| broadcast::channel(self.capacity).0)
            .subscribe()
    }

    /// Number of live session channels (for diagnostics).
    pub fn channel_count(&self) -> usize {
        self.channels.read().expect("hub lock poisoned").len()
    }
}

impl Default for ChatHub {
    fn default() -> Self {
        Self::new(256)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn channel_name_format() {
        assert_eq!(channel_name(42), "profile_chat_42");
    }

    #[test]
    fn event_serializes_with_kebab_case_tag() {
        let event = ChatEvent::AssistantChunk { chunk: "您好".into() };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains(r#""type":"assistant-chunk""#));
        assert!(json.contains(r#""chunk":"您好""#));

        let event = ChatEvent::MemberCard {
            profile: serde_json::json!({"id": 1}),
            reason: "专业对口".into(),
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains(r#""type":"member-card""#));
    }

    #[test]
    fn event_type_names() {
        assert_eq!(
            ChatEvent::ToolCall {
                tool_name: "x".into(),
                arguments: serde_json::Value::Null
            }
            .event_type(),
            "tool-call"
        );
        assert_eq!(
            ChatEvent::Error { message: "x".into() }.event_type(),
            "error"
        );
    }

    #[tokio::test]
    async fn publish_subscribe_roundtrip() {
        let hub = ChatHub::default();
        let mut rx = hub.subscribe(1);

        hub.publish(1, ChatEvent::AssistantChunk { chunk: "你".into() });
        hub.publish(1, ChatEvent::AssistantChunk { chunk: "好".into() });

        match rx.recv().await.unwrap() {
            ChatEvent::AssistantChunk { chunk } => assert_eq!(chunk, "你"),
            other => panic!("unexpected event: {other:?}"),
        }
        match rx.recv().await.unwrap() {
            ChatEvent::AssistantChunk { chunk } => assert_eq!(chunk, "好"),
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn publish_without_subscribers_is_noop() {
        let hub = ChatHub::default();
        hub.publish(9, ChatEvent::Error { message: "无人订阅".into() });
        assert_eq!(hub.channel_count(), 0);
    }

    #[tokio::test]
    async fn sessions_are_isolated() {
        let hub = ChatHub::default();
        let mut rx_a = hub.subscribe(1);
        let mut rx_b = hub.subscribe(2);

        hub.publish(1, ChatEvent::AssistantChunk { chunk: "a".into() });

        assert!(rx_a.recv().await.is_ok());
        assert!(matches!(
            rx_b.try_recv(),
            Err(broadcast::error::TryRecvError::Empty)
        ));
    }

    #[tokio::test]
    async fn dead_channel_is_pruned_on_publish() {
        let hub = ChatHub::default();
        let rx = hub.subscribe(5);
        assert_eq!(hub.channel_count(), 1);
        drop(rx);

        hub.publish(5, ChatEvent::AssistantChunk { chunk: "x".into() });
        assert_eq!(hub.channel_count(), 0);
    }
}
