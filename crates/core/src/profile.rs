//! Profile and Organization domain types.
//!
//! A `Profile` is one person's public card — the mutable projection visitors
//! see and the assistant answers questions about. Profiles belong to at most
//! one `Organization`, which groups cards under a single admin and a single
//! invite token.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Membership lifecycle of a profile inside its organization.
///
/// Created as `Pending` at signup/invite time; an organization admin moves it
/// to `Approved` or `Rejected`. Only approved profiles appear in team listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProfileStatus {
    Pending,
    Approved,
    Rejected,
}

impl ProfileStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "approved" => Some(Self::Approved),
            "rejected" => Some(Self::Rejected),
            _ => None,
        }
    }
}

/// Aggregate stats shown on a card.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProfileStats {
    #[serde(default)]
    pub years_experience: u32,

    #[serde(default)]
    pub cases_handled: u32,

    #[serde(default)]
    pub clients_served: u32,

    /// Percentage in [0, 100].
    #[serde(default)]
    pub success_rate: f32,
}

/// A published case study on a card.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaseStudy {
    pub title: String,
    pub category: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,

    pub description: String,
}

/// An honor or award listed on a card.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Honor {
    pub title: String,
    pub organization: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,

    pub description: String,
}

/// A person's public card record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Profile {
    /// Store-assigned id (0 until inserted).
    pub id: i64,

    /// URL slug for the public card page.
    pub slug: String,

    pub full_name: String,
    pub title: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub department: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,

    /// Free-text specialization tags, e.g. "知识产权", "合同法".
    #[serde(default)]
    pub specializations: Vec<String>,

    #[serde(default)]
    pub stats: ProfileStats,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,

    pub status: ProfileStatus,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub organization_id: Option<i64>,

    #[serde(default)]
    pub case_studies: Vec<CaseStudy>,

    #[serde(default)]
    pub honors: Vec<Honor>,

    pub created_at: DateTime<Utc>,
}

impl Profile {
    /// Create a new pending profile with a generated slug.
    pub fn new(full_name: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: 0,
            slug: Uuid::new_v4().simple().to_string()[..8].to_string(),
            full_name: full_name.into(),
            title: title.into(),
            company: None,
            department: None,
            bio: None,
            specializations: Vec::new(),
            stats: ProfileStats::default(),
            phone: None,
            email: None,
            location: None,
            avatar_url: None,
            status: ProfileStatus::Pending,
            organization_id: None,
            case_studies: Vec::new(),
            honors: Vec::new(),
            created_at: Utc::now(),
        }
    }

    /// Attach this profile to an organization.
    pub fn with_organization(mut self, organization_id: i64) -> Self {
        self.organization_id = Some(organization_id);
        self
    }

    pub fn approve(&mut self) {
        self.status = ProfileStatus::Approved;
    }

    pub fn reject(&mut self) {
        self.status = ProfileStatus::Rejected;
    }

    pub fn is_approved(&self) -> bool {
        self.status == ProfileStatus::Approved
    }

    /// Split a raw specialization string on the separators card owners
    /// actually type: "、", ",", ",".
    pub fn parse_specializations(raw: &str) -> Vec<String> {
        raw.split(['、', ',', ','])
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from)
            .collect()
    }
}

/// A tenant grouping profiles under one admin and one invite token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Organization {
    /// Store-assigned id (0 until inserted).
    pub id: i64,

    pub name: String,

    /// The single admin user reference.
    pub admin_user_id: i64,

    /// Unique invite token, generated once at creation and never rotated.
    pub invite_token: String,

    pub created_at: DateTime<Utc>,
}

impl Organization {
    pub fn new(name: impl Into<String>, admin_user_id: i64) -> Self {
        Self {
            id: 0,
            name: name.into(),
            admin_user_id,
            invite_token: Uuid::new_v4().simple().to_string(),
            created_at: Utc::now(),
        }
    }
}
