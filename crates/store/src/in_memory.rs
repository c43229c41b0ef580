//! In-memory backend — useful for testing and ephemeral sessions.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use namecard_core::error::StoreError;
use namecard_core::message::{ChatMessage, ChatSession, Role};
use namecard_core::profile::{Organization, Profile};
use namecard_core::store::CardStore;

/// A store that keeps everything in process memory.
pub struct InMemoryStore {
    inner: Arc<RwLock<Inner>>,
}

#[derive(Default)]
struct Inner {
    organizations: HashMap<i64, Organization>,
    profiles: HashMap<i64, Profile>,
    sessions: HashMap<i64, ChatSession>,
    messages: Vec<ChatMessage>,
    next_organization_id: i64,
    next_profile_id: i64,
    next_session_id: i64,
    next_message_id: i64,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RwLock::new(Inner::default())),
        }
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CardStore for InMemoryStore {
    fn name(&self) -> &str {
        "in_memory"
    }

    async fn insert_organization(&self, mut org: Organization) -> Result<Organization, StoreError> {
        let mut inner = self.inner.write().await;
        inner.next_organization_id += 1;
        org.id = inner.next_organization_id;
        inner.organizations.insert(org.id, org.clone());
        Ok(org)
    }

    async fn insert_profile(&self, mut profile: Profile) -> Result<Profile, StoreError> {
        let mut inner = self.inner.write().await;
        inner.next_profile_id += 1;
        profile.id = inner.next_profile_id;
        inner.profiles.insert(profile.id, profile.clone());
        Ok(profile)
    }

    async fn profile(&self, id: i64) -> Result<Option<Profile>, StoreError> {
        Ok(self.inner.read().await.profiles.get(&id).cloned())
    }

    async fn organization(&self, id: i64) -> Result<Option<Organization>, StoreError> {
        Ok(self.inner.read().await.organizations.get(&id).cloned())
    }

    async fn approved_members(&self, organization_id: i64) -> Result<Vec<Profile>, StoreError> {
        let inner = self.inner.read().await;
        let mut members: Vec<Profile> = inner
            .profiles
            .values()
            .filter(|p| p.organization_id == Some(organization_id) && p.is_approved())
            .cloned()
            .collect();
        members.sort_by_key(|p| p.id);
        Ok(members)
    }

    async fn create_session(&self, profile_id: i64) -> Result<ChatSession, StoreError> {
        let mut inner = self.inner.write().await;
        if !inner.profiles.contains_key(&profile_id) {
            return Err(StoreError::ProfileNotFound(profile_id));
        }
        inner.next_session_id += 1;
        let session = ChatSession {
            id: inner.next_session_id,
            profile_id,
            created_at: Utc::now(),
        };
        inner.sessions.insert(session.id, session.clone());
        Ok(session)
    }

    async fn session(&self, id: i64) -> Result<Option<ChatSession>, StoreError> {
        Ok(self.inner.read().await.sessions.get(&id).cloned())
    }

    async fn recent_messages(
        &self,
        session_id: i64,
        limit: usize,
    ) -> Result<Vec<ChatMessage>, StoreError> {
        let inner = self.inner.read().await;
        let session_messages: Vec<ChatMessage> = inner
            .messages
            .iter()
            .filter(|m| m.session_id == session_id)
            .cloned()
            .collect();
        let skip = session_messages.len().saturating_sub(limit);
        Ok(session_messages.into_iter().skip(skip).collect())
    }

    async fn append_message(
        &self,
        session_id: i64,
        role: Role,
        content: &str,
    ) -> Result<ChatMessage, StoreError> {
        let mut inner = self.inner.write().await;
        if !inner.sessions.contains_key(&session_id) {
            return Err(StoreError::SessionNotFound(session_id));
        }
        inner.next_message_id += 1;
        let message = ChatMessage {
            id: inner.next_message_id,
            session_id,
            role,
            content: content.into(),
            created_at: Utc::now(),
        };
        inner.messages.push(message.clone());
        Ok(message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use namecard_core::profile::ProfileStatus;

    async fn store_with_team() -> (InMemoryStore, Organization) {
        let store = InMemoryStore::new();
        let org = store
            .insert_organization(Organization::new("人脉主页", 1))
            .await
            .unwrap();

        let mut zhang = Profile::new("张伟", "高级合伙人").with_organization(org.id);
        zhang.approve();
        store.insert_profile(zhang).await.unwrap();

        let mut li = Profile::new("李娜", "律师").with_organization(org.id);
        li.approve();
        store.insert_profile(li).await.unwrap();

        // Pending member must not show up in team listings
        let wang = Profile::new("王强", "实习律师").with_organization(org.id);
        store.insert_profile(wang).await.unwrap();

        (store, org)
    }

    #[tokio::test]
    async fn insert_assigns_ids() {
        let store = InMemoryStore::new();
        let org = store
            .insert_organization(Organization::new("人脉主页", 1))
            .await
            .unwrap();
        assert_eq!(org.id, 1);

        let profile = store
            .insert_profile(Profile::new("张伟", "高级合伙人"))
            .await
            .unwrap();
        assert_eq!(profile.id, 1);
        assert_eq!(store.profile(1).await.unwrap().unwrap().full_name, "张伟");
    }

    #[tokio::test]
    async fn approved_members_excludes_pending() {
        let (store, org) = store_with_team().await;
        let members = store.approved_members(org.id).await.unwrap();
        assert_eq!(members.len(), 2);
        assert!(members.iter().all(|m| m.status == ProfileStatus::Approved));
    }

    #[tokio::test]
    async fn session_requires_profile() {
        let store = InMemoryStore::new();
        let err = store.create_session(99).await.unwrap_err();
        assert!(matches!(err, StoreError::ProfileNotFound(99)));
    }

    #[tokio::test]
    async fn append_requires_session() {
        let store = InMemoryStore::new();
        let err = store.append_message(7, Role::User, "你好").await.unwrap_err();
        assert!(matches!(err, StoreError::SessionNotFound(7)));
    }

    #[tokio::test]
    async fn recent_messages_returns_tail_oldest_first() {
        let (store, _) = store_with_team().await;
        let session = store.create_session(1).await.unwrap();

        for i in 0..15 {
            store
                .append_message(session.id, Role::User, &format!("消息{i}"))
                .await
                .unwrap();
        }

        let recent = store.recent_messages(session.id, 10).await.unwrap();
        assert_eq!(recent.len(), 10);
        assert_eq!(recent.first().unwrap().content, "消息5");
        assert_eq!(recent.last().unwrap().content, "消息14");
    }

    #[tokio::test]
    async fn messages_are_scoped_to_session() {
        let (store, _) = store_with_team().await;
        let a = store.create_session(1).await.unwrap();
        let b = store.create_session(2).await.unwrap();

        store.append_message(a.id, Role::User, "A 的消息").await.unwrap();
        store.append_message(b.id, Role::User, "B 的消息").await.unwrap();

        let messages = store.recent_messages(a.id, 10).await.unwrap();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].content, "A 的消息");
    }
}
