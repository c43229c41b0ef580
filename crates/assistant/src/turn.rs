//! The streaming turn job — one visitor prompt, one assistant answer.
//!
//! A turn moves through `building-prompt → streaming → finalizing`. The
//! prompt phase is never retried; the streaming phase is re-run per the
//! [`retry`](crate::retry) table. Every outcome, success or failure, is
//! reported on the session's broadcast channel.

use std::sync::Arc;
use tracing::{debug, error, info, warn};

use namecard_core::error::{Error, StoreError};
use namecard_core::event::{ChatEvent, ChatHub, channel_name};
use namecard_core::message::Role;
use namecard_core::profile::Profile;
use namecard_core::provider::{
    CompletionRequest, PromptMessage, Provider, ToolDefinition,
};
use namecard_core::store::CardStore;

use crate::{prompt, retry, tools};

/// How many prior messages are replayed as context.
pub const HISTORY_LIMIT: usize = 10;

/// Published when prompt building fails; not retried.
const PROMPT_FAILED_MESSAGE: &str = "处理消息时出现错误,请重试。";
/// Published when streaming fails after all retry attempts.
const TURN_FAILED_MESSAGE: &str = "抱歉,我遇到了一些问题,请稍后再试。";

/// Executes conversational turns against a session's assistant.
///
/// One runner is shared by all sessions; turns carry no state between
/// invocations beyond what the store holds.
pub struct TurnRunner {
    provider: Arc<dyn Provider>,
    store: Arc<dyn CardStore>,
    hub: Arc<ChatHub>,
    model: String,
    temperature: f32,
    max_tokens: u32,
    max_tool_rounds: u32,
}

/// Everything the streaming phase needs, captured once so retries are
/// idempotent: the user message is persisted exactly once and the history
/// snapshot never includes it.
struct TurnSetup {
    session_id: i64,
    profile: Profile,
    system_prompt: String,
    tools: Vec<ToolDefinition>,
    history: Vec<PromptMessage>,
    prompt: String,
}

impl TurnRunner {
    pub fn new(
        provider: Arc<dyn Provider>,
        store: Arc<dyn CardStore>,
        hub: Arc<ChatHub>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            provider,
            store,
            hub,
            model: model.into(),
            temperature: 0.7,
            max_tokens: 2000,
            max_tool_rounds: 8,
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn with_max_tool_rounds(mut self, rounds: u32) -> Self {
        self.max_tool_rounds = rounds;
        self
    }

    /// Run one turn. Never returns an error: every failure is converted into
    /// a published `error` event on the session's channel.
    pub async fn run(&self, session_id: i64, user_prompt: &str) {
        info!(
            channel = %channel_name(session_id),
            prompt_len = user_prompt.len(),
            "Starting assistant turn"
        );

        // ── building-prompt ──
        let setup = match self.prepare(session_id, user_prompt).await {
            Ok(setup) => setup,
            Err(e) => {
                error!(session_id, error = %e, "Prompt building failed");
                self.publish_error(session_id, PROMPT_FAILED_MESSAGE);
                return;
            }
        };

        // ── streaming / finalizing, with retry ──
        let mut attempt = 1;
        loop {
            match self.stream_turn(&setup).await {
                Ok(()) => return,
                Err(e) => match retry::backoff_after(&e, attempt) {
                    Some(wait) => {
                        warn!(
                            session_id,
                            attempt,
                            wait_secs = wait.as_secs(),
                            error = %e,
                            "Turn failed, re-running"
                        );
                        attempt += 1;
                        tokio::time::sleep(wait).await;
                    }
                    None => {
                        error!(session_id, attempt, error = %e, "Turn failed permanently");
                        self.publish_error(session_id, TURN_FAILED_MESSAGE);
                        return;
                    }
                },
            }
        }
    }

    /// Load the session, build the prompt, snapshot history, and persist the
    /// user message. Failures here are terminal for the turn.
    async fn prepare(&self, session_id: i64, user_prompt: &str) -> Result<TurnSetup, Error> {
        let session = self
            .store
            .session(session_id)
            .await?
            .ok_or(StoreError::SessionNotFound(session_id))?;
        let profile = self
            .store
            .profile(session.profile_id)
            .await?
            .ok_or(StoreError::ProfileNotFound(session.profile_id))?;

        let organization = match profile.organization_id {
            Some(org_id) => self.store.organization(org_id).await?,
            None => None,
        };
        let team_count = match profile.organization_id {
            Some(org_id) => self.store.approved_members(org_id).await?.len(),
            None => 0,
        };

        let system_prompt = prompt::system_prompt(&profile, organization.as_ref(), team_count);
        let tools = prompt::tool_definitions();

        // Snapshot history before persisting the new user message so a
        // retried stream phase sees the same context.
        let history: Vec<PromptMessage> = self
            .store
            .recent_messages(session_id, HISTORY_LIMIT)
            .await?
            .iter()
            .map(PromptMessage::from)
            .collect();

        self.store
            .append_message(session_id, Role::User, user_prompt)
            .await?;

        Ok(TurnSetup {
            session_id,
            profile,
            system_prompt,
            tools,
            history,
            prompt: user_prompt.to_string(),
        })
    }

    /// The streaming phase: forward fragments and tool calls as events,
    /// then persist and announce the assistant message.
    async fn stream_turn(&self, setup: &TurnSetup) -> Result<(), Error> {
        let mut messages = Vec::with_capacity(setup.history.len() + 2);
        messages.push(PromptMessage::system(&setup.system_prompt));
        messages.extend(setup.history.iter().cloned());
        messages.push(PromptMessage::user(&setup.prompt));

        let mut full_content = String::new();

        for round in 0..self.max_tool_rounds {
            let request = CompletionRequest {
                model: self.model.clone(),
                messages: messages.clone(),
                temperature: self.temperature,
                max_tokens: Some(self.max_tokens),
                tools: setup.tools.clone(),
            };

            let mut rx = self.provider.stream(request).await?;

            let mut round_text = String::new();
            let mut tool_calls = Vec::new();
            while let Some(chunk) = rx.recv().await {
                let chunk = chunk?;
                if let Some(fragment) = chunk.content {
                    full_content.push_str(&fragment);
                    round_text.push_str(&fragment);
                    self.hub
                        .publish(setup.session_id, ChatEvent::AssistantChunk { chunk: fragment });
                }
                if chunk.done {
                    tool_calls = chunk.tool_calls;
                    break;
                }
            }

            if tool_calls.is_empty() {
                break;
            }

            debug!(
                session_id = setup.session_id,
                round,
                count = tool_calls.len(),
                "Executing tool calls"
            );

            messages.push(PromptMessage::assistant_with_calls(
                round_text,
                tool_calls.clone(),
            ));

            for call in &tool_calls {
                let arguments: serde_json::Value =
                    serde_json::from_str(&call.arguments).unwrap_or_default();
                info!(tool = %call.name, session_id = setup.session_id, "Tool called");

                self.hub.publish(
                    setup.session_id,
                    ChatEvent::ToolCall {
                        tool_name: call.name.clone(),
                        arguments: arguments.clone(),
                    },
                );

                let result =
                    tools::dispatch(self.store.as_ref(), &setup.profile, &call.name, &arguments)
                        .await;

                // A successful recommendation additionally pushes the card
                // itself, independent of the generic tool result.
                if tools::ToolKind::from_name(&call.name)
                    == Some(tools::ToolKind::RecommendTeamMember)
                    && let Some((card, reason)) = member_card_from_result(&result)
                {
                    self.hub
                        .publish(setup.session_id, ChatEvent::MemberCard { profile: card, reason });
                }

                messages.push(PromptMessage::tool_result(&call.id, &result));
            }
        }

        // ── finalizing ──
        let message = self
            .store
            .append_message(setup.session_id, Role::Assistant, &full_content)
            .await?;

        self.hub.publish(
            setup.session_id,
            ChatEvent::AssistantDone {
                id: message.id,
                content: message.content,
                created_at: message.created_at.to_rfc3339(),
            },
        );

        Ok(())
    }

    fn publish_error(&self, session_id: i64, message: &str) {
        self.hub.publish(
            session_id,
            ChatEvent::Error {
                message: message.into(),
            },
        );
    }
}

/// Extract the card payload from a successful `recommend_team_member` result.
fn member_card_from_result(result: &str) -> Option<(serde_json::Value, String)> {
    let value: serde_json::Value = serde_json::from_str(result).ok()?;
    if value["success"] != serde_json::Value::Bool(true) {
        return None;
    }
    let card = value.get("profile")?.clone();
    let reason = value["reason"].as_str().unwrap_or_default().to_string();
    Some((card, reason))
}
