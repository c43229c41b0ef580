//! # Namecard Core
//!
//! Domain types, traits, and error definitions for the namecard assistant
//! platform. This crate has **zero framework dependencies** — it defines the
//! domain model that all other crates implement against.
//!
//! ## Design Philosophy
//!
//! Every subsystem boundary is a trait here: the LLM backend (`Provider`),
//! persistence (`CardStore`), and the per-session broadcast hub (`ChatHub`)
//! are all injected into the crates that use them. Implementations live in
//! their respective crates, so the dependency graph points inward on core.

pub mod error;
pub mod event;
pub mod message;
pub mod profile;
pub mod provider;
pub mod store;

// Re-export key types at crate root for ergonomics
pub use error::{Error, ProviderError, Result, StoreError, WechatError};
pub use event::{ChatEvent, ChatHub, channel_name};
pub use message::{ChatMessage, ChatSession, Role};
pub use profile::{CaseStudy, Honor, Organization, Profile, ProfileStats, ProfileStatus};
pub use provider::{
    CompletionRequest, PromptMessage, PromptRole, Provider, StreamChunk, ToolDefinition,
    ToolInvocation,
};
pub use store::CardStore;
