//! CardStore trait — the abstraction over persistence.
//!
//! Backends (in-memory, SQLite) live in the `namecard-store` crate. The
//! assistant and gateway only ever see this trait.

use async_trait::async_trait;

use crate::error::StoreError;
use crate::message::{ChatMessage, ChatSession, Role};
use crate::profile::{Organization, Profile};

/// Persistence operations the platform needs.
///
/// Insert methods take entities with `id == 0` and return them with the
/// store-assigned id filled in.
#[async_trait]
pub trait CardStore: Send + Sync {
    /// A human-readable backend name (e.g., "in_memory", "sqlite").
    fn name(&self) -> &str;

    async fn insert_organization(&self, org: Organization) -> Result<Organization, StoreError>;

    async fn insert_profile(&self, profile: Profile) -> Result<Profile, StoreError>;

    async fn profile(&self, id: i64) -> Result<Option<Profile>, StoreError>;

    async fn organization(&self, id: i64) -> Result<Option<Organization>, StoreError>;

    /// Approved profiles of an organization, ordered by id.
    async fn approved_members(&self, organization_id: i64) -> Result<Vec<Profile>, StoreError>;

    async fn create_session(&self, profile_id: i64) -> Result<ChatSession, StoreError>;

    async fn session(&self, id: i64) -> Result<Option<ChatSession>, StoreError>;

    /// The most recent `limit` messages of a session, oldest-first.
    async fn recent_messages(
        &self,
        session_id: i64,
        limit: usize,
    ) -> Result<Vec<ChatMessage>, StoreError>;

    /// Append one message to a session. Messages are never updated or deleted.
    async fn append_message(
        &self,
        session_id: i64,
        role: Role,
        content: &str,
    ) -> Result<ChatMessage, StoreError>;
}
