//! SQLite backend — the production default.
//!
//! One database file, four tables: `organizations`, `profiles`,
//! `chat_sessions`, `chat_messages`. Structured card fields
//! (specializations, stats, case studies, honors) are stored as JSON text.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{Row, SqlitePool};
use std::str::FromStr;
use tracing::{debug, info};

use namecard_core::error::StoreError;
use namecard_core::message::{ChatMessage, ChatSession, Role};
use namecard_core::profile::{Organization, Profile, ProfileStats, ProfileStatus};
use namecard_core::store::CardStore;

/// A persistent SQLite-backed card store.
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Open (or create) the database at `path` and run migrations.
    pub async fn new(path: &str) -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::from_str(path)
            .map_err(|e| StoreError::Storage(format!("Invalid SQLite path: {e}")))?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .pragma("foreign_keys", "ON");

        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .connect_with(options)
            .await
            .map_err(|e| StoreError::Storage(format!("Failed to open SQLite: {e}")))?;

        let store = Self { pool };
        store.run_migrations().await?;
        info!("SQLite card store initialized at {path}");
        Ok(store)
    }

    async fn run_migrations(&self) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS organizations (
                id            INTEGER PRIMARY KEY AUTOINCREMENT,
                name          TEXT NOT NULL,
                admin_user_id INTEGER NOT NULL,
                invite_token  TEXT UNIQUE NOT NULL,
                created_at    TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::Storage(format!("organizations table: {e}")))?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS profiles (
                id              INTEGER PRIMARY KEY AUTOINCREMENT,
                slug            TEXT UNIQUE NOT NULL,
                full_name       TEXT NOT NULL,
                title           TEXT NOT NULL,
                company         TEXT,
                department      TEXT,
                bio             TEXT,
                specializations TEXT NOT NULL DEFAULT '[]',
                stats           TEXT NOT NULL DEFAULT '{}',
                phone           TEXT,
                email           TEXT,
                location        TEXT,
                avatar_url      TEXT,
                status          TEXT NOT NULL DEFAULT 'pending',
                organization_id INTEGER REFERENCES organizations(id),
                case_studies    TEXT NOT NULL DEFAULT '[]',
                honors          TEXT NOT NULL DEFAULT '[]',
                created_at      TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::Storage(format!("profiles table: {e}")))?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS chat_sessions (
                id         INTEGER PRIMARY KEY AUTOINCREMENT,
                profile_id INTEGER NOT NULL REFERENCES profiles(id),
                created_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::Storage(format!("chat_sessions table: {e}")))?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS chat_messages (
                id         INTEGER PRIMARY KEY AUTOINCREMENT,
                session_id INTEGER NOT NULL REFERENCES chat_sessions(id),
                role       TEXT NOT NULL,
                content    TEXT NOT NULL,
                created_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::Storage(format!("chat_messages table: {e}")))?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_chat_messages_session ON chat_messages(session_id)",
        )
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::Storage(format!("chat_messages index: {e}")))?;

        Ok(())
    }

    fn row_to_organization(row: &sqlx::sqlite::SqliteRow) -> Result<Organization, StoreError> {
        Ok(Organization {
            id: column(row, "id")?,
            name: column(row, "name")?,
            admin_user_id: column(row, "admin_user_id")?,
            invite_token: column(row, "invite_token")?,
            created_at: parse_timestamp(&column::<String>(row, "created_at")?),
        })
    }

    fn row_to_profile(row: &sqlx::sqlite::SqliteRow) -> Result<Profile, StoreError> {
        let specializations: Vec<String> =
            serde_json::from_str(&column::<String>(row, "specializations")?).unwrap_or_default();
        let stats: ProfileStats =
            serde_json::from_str(&column::<String>(row, "stats")?).unwrap_or_default();
        let case_studies =
            serde_json::from_str(&column::<String>(row, "case_studies")?).unwrap_or_default();
        let honors = serde_json::from_str(&column::<String>(row, "honors")?).unwrap_or_default();
        let status = ProfileStatus::parse(&column::<String>(row, "status")?)
            .unwrap_or(ProfileStatus::Pending);

        Ok(Profile {
            id: column(row, "id")?,
            slug: column(row, "slug")?,
            full_name: column(row, "full_name")?,
            title: column(row, "title")?,
            company: column(row, "company")?,
            department: column(row, "department")?,
            bio: column(row, "bio")?,
            specializations,
            stats,
            phone: column(row, "phone")?,
            email: column(row, "email")?,
            location: column(row, "location")?,
            avatar_url: column(row, "avatar_url")?,
            status,
            organization_id: column(row, "organization_id")?,
            case_studies,
            honors,
            created_at: parse_timestamp(&column::<String>(row, "created_at")?),
        })
    }

    fn row_to_session(row: &sqlx::sqlite::SqliteRow) -> Result<ChatSession, StoreError> {
        Ok(ChatSession {
            id: column(row, "id")?,
            profile_id: column(row, "profile_id")?,
            created_at: parse_timestamp(&column::<String>(row, "created_at")?),
        })
    }

    fn row_to_message(row: &sqlx::sqlite::SqliteRow) -> Result<ChatMessage, StoreError> {
        let role = Role::parse(&column::<String>(row, "role")?).unwrap_or(Role::User);
        Ok(ChatMessage {
            id: column(row, "id")?,
            session_id: column(row, "session_id")?,
            role,
            content: column(row, "content")?,
            created_at: parse_timestamp(&column::<String>(row, "created_at")?),
        })
    }
}

fn column<'r, T: sqlx::Decode<'r, sqlx::Sqlite> + sqlx::Type<sqlx::Sqlite>>(
    row: &'r sqlx::sqlite::SqliteRow,
    name: &str,
) -> Result<T, StoreError> {
    row.try_get(name)
        .map_err(|e| StoreError::Storage(format!("{name} column: {e}")))
}

fn parse_timestamp(raw: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

#[async_trait]
impl CardStore for SqliteStore {
    fn name(&self) -> &str {
        "sqlite"
    }

    async fn insert_organization(&self, mut org: Organization) -> Result<Organization, StoreError> {
        let result = sqlx::query(
            r#"
            INSERT INTO organizations (name, admin_user_id, invite_token, created_at)
            VALUES (?1, ?2, ?3, ?4)
            "#,
        )
        .bind(&org.name)
        .bind(org.admin_user_id)
        .bind(&org.invite_token)
        .bind(org.created_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::Storage(format!("INSERT organization: {e}")))?;

        org.id = result.last_insert_rowid();
        debug!(id = org.id, name = %org.name, "Inserted organization");
        Ok(org)
    }

    async fn insert_profile(&self, mut profile: Profile) -> Result<Profile, StoreError> {
        let specializations = serde_json::to_string(&profile.specializations)
            .map_err(|e| StoreError::Storage(format!("specializations serialization: {e}")))?;
        let stats = serde_json::to_string(&profile.stats)
            .map_err(|e| StoreError::Storage(format!("stats serialization: {e}")))?;
        let case_studies = serde_json::to_string(&profile.case_studies)
            .map_err(|e| StoreError::Storage(format!("case_studies serialization: {e}")))?;
        let honors = serde_json::to_string(&profile.honors)
            .map_err(|e| StoreError::Storage(format!("honors serialization: {e}")))?;

        let result = sqlx::query(
            r#"
            INSERT INTO profiles (
                slug, full_name, title, company, department, bio,
                specializations, stats, phone, email, location, avatar_url,
                status, organization_id, case_studies, honors, created_at
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17)
            "#,
        )
        .bind(&profile.slug)
        .bind(&profile.full_name)
        .bind(&profile.title)
        .bind(&profile.company)
        .bind(&profile.department)
        .bind(&profile.bio)
        .bind(&specializations)
        .bind(&stats)
        .bind(&profile.phone)
        .bind(&profile.email)
        .bind(&profile.location)
        .bind(&profile.avatar_url)
        .bind(profile.status.as_str())
        .bind(profile.organization_id)
        .bind(&case_studies)
        .bind(&honors)
        .bind(profile.created_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::Storage(format!("INSERT profile: {e}")))?;

        profile.id = result.last_insert_rowid();
        debug!(id = profile.id, name = %profile.full_name, "Inserted profile");
        Ok(profile)
    }

    async fn profile(&self, id: i64) -> Result<Option<Profile>, StoreError> {
        let row = sqlx::query("SELECT * FROM profiles WHERE id = ?1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StoreError::Storage(format!("SELECT profile: {e}")))?;
        row.as_ref().map(Self::row_to_profile).transpose()
    }

    async fn organization(&self, id: i64) -> Result<Option<Organization>, StoreError> {
        let row = sqlx::query("SELECT * FROM organizations WHERE id = ?1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StoreError::Storage(format!("SELECT organization: {e}")))?;
        row.as_ref().map(Self::row_to_organization).transpose()
    }

    async fn approved_members(&self, organization_id: i64) -> Result<Vec<Profile>, StoreError> {
        let rows = sqlx::query(
            "SELECT * FROM profiles WHERE organization_id = ?1 AND status = 'approved' ORDER BY id",
        )
        .bind(organization_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StoreError::Storage(format!("SELECT members: {e}")))?;
        rows.iter().map(Self::row_to_profile).collect()
    }

    async fn create_session(&self, profile_id: i64) -> Result<ChatSession, StoreError> {
        if self.profile(profile_id).await?.is_none() {
            return Err(StoreError::ProfileNotFound(profile_id));
        }

        let created_at = Utc::now();
        let result = sqlx::query(
            "INSERT INTO chat_sessions (profile_id, created_at) VALUES (?1, ?2)",
        )
        .bind(profile_id)
        .bind(created_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::Storage(format!("INSERT session: {e}")))?;

        Ok(ChatSession {
            id: result.last_insert_rowid(),
            profile_id,
            created_at,
        })
    }

    async fn session(&self, id: i64) -> Result<Option<ChatSession>, StoreError> {
        let row = sqlx::query("SELECT * FROM chat_sessions WHERE id = ?1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StoreError::Storage(format!("SELECT session: {e}")))?;
        row.as_ref().map(Self::row_to_session).transpose()
    }

    async fn recent_messages(
        &self,
        session_id: i64,
        limit: usize,
    ) -> Result<Vec<ChatMessage>, StoreError> {
        // Take the newest `limit` rows, then flip back to oldest-first.
        let rows = sqlx::query(
            r#"
            SELECT * FROM (
                SELECT * FROM chat_messages WHERE session_id = ?1 ORDER BY id DESC LIMIT ?2
            ) ORDER BY id ASC
            "#,
        )
        .bind(session_id)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StoreError::Storage(format!("SELECT messages: {e}")))?;
        rows.iter().map(Self::row_to_message).collect()
    }

    async fn append_message(
        &self,
        session_id: i64,
        role: Role,
        content: &str,
    ) -> Result<ChatMessage, StoreError> {
        if self.session(session_id).await?.is_none() {
            return Err(StoreError::SessionNotFound(session_id));
        }

        let created_at = Utc::now();
        let result = sqlx::query(
            "INSERT INTO chat_messages (session_id, role, content, created_at) VALUES (?1, ?2, ?3, ?4)",
        )
        .bind(session_id)
        .bind(role.as_str())
        .bind(content)
        .bind(created_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::Storage(format!("INSERT message: {e}")))?;

        Ok(ChatMessage {
            id: result.last_insert_rowid(),
            session_id,
            role,
            content: content.into(),
            created_at,
        })
    }
}
