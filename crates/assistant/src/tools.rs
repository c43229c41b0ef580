//! The three read-only queries the model can call.
//!
//! Dispatch is a closed enum, not a string-keyed registry: adding a tool
//! means adding a variant, and the compiler checks every match. The dispatch
//! contract is that it always returns a JSON string — lookup failures, bad
//! arguments, and storage errors all become structured `{"error": …}`
//! payloads the model can read, never an `Err` to the caller.

use serde::Serialize;
use serde_json::Value;
use tracing::warn;

use namecard_core::error::StoreError;
use namecard_core::profile::{Profile, ProfileStats};
use namecard_core::store::CardStore;

/// Team listings never return more than this many members.
pub const MAX_TEAM_MEMBERS: usize = 10;

/// Case study / honor descriptions are clipped to this many characters.
const DESCRIPTION_LIMIT: usize = 200;
/// Bios in team listings are clipped harder.
const BIO_LIMIT: usize = 100;

/// The closed set of callable tools.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolKind {
    GetProfileInfo,
    GetTeamMembers,
    RecommendTeamMember,
}

impl ToolKind {
    pub fn name(&self) -> &'static str {
        match self {
            Self::GetProfileInfo => "get_profile_info",
            Self::GetTeamMembers => "get_team_members",
            Self::RecommendTeamMember => "recommend_team_member",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "get_profile_info" => Some(Self::GetProfileInfo),
            "get_team_members" => Some(Self::GetTeamMembers),
            "recommend_team_member" => Some(Self::RecommendTeamMember),
            _ => None,
        }
    }
}

/// Execute one tool call on behalf of `requester` and return the JSON result.
pub async fn dispatch(
    store: &dyn CardStore,
    requester: &Profile,
    tool_name: &str,
    arguments: &Value,
) -> String {
    let Some(kind) = ToolKind::from_name(tool_name) else {
        return error_payload(&format!("Unknown tool: {tool_name}"));
    };

    let result = match kind {
        ToolKind::GetProfileInfo => Ok(get_profile_info(requester, arguments)),
        ToolKind::GetTeamMembers => get_team_members(store, requester, arguments).await,
        ToolKind::RecommendTeamMember => recommend_team_member(store, requester, arguments).await,
    };

    result.unwrap_or_else(|e| {
        warn!(tool = tool_name, error = %e, "Tool query failed");
        error_payload("工具执行失败,请重试")
    })
}

fn error_payload(message: &str) -> String {
    serde_json::json!({ "error": message }).to_string()
}

fn truncate_chars(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let mut clipped: String = s.chars().take(max).collect();
    clipped.push('…');
    clipped
}

// --- get_profile_info ---

fn get_profile_info(profile: &Profile, arguments: &Value) -> String {
    let mut result = serde_json::json!({
        "full_name": profile.full_name,
        "title": profile.title,
        "company": profile.company,
        "department": profile.department,
        "bio": profile.bio,
        "specializations": profile.specializations,
        "stats": profile.stats,
        "contact": {
            "phone": profile.phone,
            "email": profile.email,
            "location": profile.location,
        },
    });

    if arguments["include_cases"].as_bool().unwrap_or(false) {
        let cases: Vec<Value> = profile
            .case_studies
            .iter()
            .take(3)
            .map(|cs| {
                serde_json::json!({
                    "title": cs.title,
                    "category": cs.category,
                    "date": cs.date,
                    "description": truncate_chars(&cs.description, DESCRIPTION_LIMIT),
                })
            })
            .collect();
        result["case_studies"] = Value::Array(cases);
    }

    if arguments["include_honors"].as_bool().unwrap_or(false) {
        let honors: Vec<Value> = profile
            .honors
            .iter()
            .take(3)
            .map(|h| {
                serde_json::json!({
                    "title": h.title,
                    "organization": h.organization,
                    "date": h.date,
                    "description": truncate_chars(&h.description, DESCRIPTION_LIMIT),
                })
            })
            .collect();
        result["honors"] = Value::Array(honors);
    }

    result.to_string()
}

// --- get_team_members ---

#[derive(Serialize)]
struct TeamMemberEntry {
    id: i64,
    full_name: String,
    title: String,
    department: Option<String>,
    specializations: Vec<String>,
    years_experience: u32,
    bio: Option<String>,
}

async fn get_team_members(
    store: &dyn CardStore,
    requester: &Profile,
    arguments: &Value,
) -> Result<String, StoreError> {
    let Some(organization_id) = requester.organization_id else {
        return Ok(error_payload("该专业人士暂未加入任何组织"));
    };

    let mut members = store.approved_members(organization_id).await?;
    members.retain(|m| m.id != requester.id);

    if let Some(keyword) = arguments["specialization"].as_str()
        && !keyword.is_empty()
    {
        members.retain(|m| m.specializations.iter().any(|s| s.contains(keyword)));
    }

    let limit = arguments["limit"]
        .as_u64()
        .map(|n| n as usize)
        .unwrap_or(MAX_TEAM_MEMBERS)
        .min(MAX_TEAM_MEMBERS);
    members.truncate(limit);

    let entries: Vec<TeamMemberEntry> = members
        .into_iter()
        .map(|m| TeamMemberEntry {
            id: m.id,
            full_name: m.full_name,
            title: m.title,
            department: m.department,
            specializations: m.specializations,
            years_experience: m.stats.years_experience,
            bio: m.bio.as_deref().map(|b| truncate_chars(b, BIO_LIMIT)),
        })
        .collect();

    Ok(serde_json::to_string(&entries).unwrap_or_else(|_| "[]".into()))
}

// --- recommend_team_member ---

/// The card payload rendered by the `member-card` event.
#[derive(Serialize)]
struct MemberCard {
    id: i64,
    slug: String,
    full_name: String,
    title: String,
    department: Option<String>,
    specializations: Vec<String>,
    stats: ProfileStats,
    avatar_url: Option<String>,
}

async fn recommend_team_member(
    store: &dyn CardStore,
    requester: &Profile,
    arguments: &Value,
) -> Result<String, StoreError> {
    let reason = arguments["reason"].as_str().unwrap_or_default().to_string();

    let recommended = match arguments["profile_id"].as_i64() {
        Some(id) => store.profile(id).await?,
        None => None,
    };
    let Some(recommended) = recommended else {
        return Ok(error_payload("未找到该团队成员"));
    };

    // Cross-organization recommendation is rejected; profiles without an
    // organization are never recommendable.
    let same_org = matches!(
        (requester.organization_id, recommended.organization_id),
        (Some(a), Some(b)) if a == b
    );
    if !same_org {
        return Ok(error_payload("该成员不在同一组织"));
    }

    let mut specializations = recommended.specializations;
    specializations.truncate(3);

    let card = MemberCard {
        id: recommended.id,
        slug: recommended.slug,
        full_name: recommended.full_name,
        title: recommended.title,
        department: recommended.department,
        specializations,
        stats: recommended.stats,
        avatar_url: recommended.avatar_url,
    };

    Ok(serde_json::json!({
        "success": true,
        "profile": card,
        "reason": reason,
    })
    .to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use namecard_core::profile::Organization;
    use namecard_core::store::CardStore;
    use namecard_store::InMemoryStore;

    async fn team_fixture() -> (InMemoryStore, Profile, Profile) {
        let store = InMemoryStore::new();
        let org = store
            .insert_organization(Organization::new("人脉主页", 1))
            .await
            .unwrap();

        let mut zhang = Profile::new("张伟", "高级合伙人").with_organization(org.id);
        zhang.specializations = vec!["知识产权".into(), "专利诉讼".into()];
        zhang.approve();
        let zhang = store.insert_profile(zhang).await.unwrap();

        let mut li = Profile::new("李娜", "合伙人").with_organization(org.id);
        li.specializations = vec![
            "合同法".into(),
            "公司治理".into(),
            "并购重组".into(),
            "税务筹划".into(),
        ];
        li.approve();
        let li = store.insert_profile(li).await.unwrap();

        (store, zhang, li)
    }

    fn parsed(result: &str) -> Value {
        serde_json::from_str(result).expect("tool results are always valid JSON")
    }

    #[tokio::test]
    async fn unknown_tool_returns_error_payload() {
        let (store, zhang, _) = team_fixture().await;
        let result = dispatch(&store, &zhang, "delete_everything", &Value::Null).await;
        assert_eq!(
            parsed(&result)["error"],
            serde_json::json!("Unknown tool: delete_everything")
        );
    }

    #[tokio::test]
    async fn profile_info_basic_fields() {
        let (store, zhang, _) = team_fixture().await;
        let result = dispatch(&store, &zhang, "get_profile_info", &serde_json::json!({})).await;
        let value = parsed(&result);
        assert_eq!(value["full_name"], "张伟");
        assert!(value.get("case_studies").is_none());
        assert!(value.get("honors").is_none());
    }

    #[tokio::test]
    async fn profile_info_caps_and_truncates_cases() {
        let (store, mut zhang, _) = team_fixture().await;
        for i in 0..5 {
            zhang.case_studies.push(namecard_core::profile::CaseStudy {
                title: format!("案例{i}"),
                category: "专利诉讼".into(),
                date: None,
                description: "详".repeat(500),
            });
        }

        let result = dispatch(
            &store,
            &zhang,
            "get_profile_info",
            &serde_json::json!({"include_cases": true}),
        )
        .await;
        let cases = parsed(&result)["case_studies"].as_array().unwrap().clone();
        assert_eq!(cases.len(), 3);
        let description = cases[0]["description"].as_str().unwrap();
        assert!(description.chars().count() <= DESCRIPTION_LIMIT + 1);
    }

    #[tokio::test]
    async fn team_members_requires_organization() {
        let (store, _, _) = team_fixture().await;
        let loner = Profile::new("散人", "顾问");
        let result = dispatch(&store, &loner, "get_team_members", &serde_json::json!({})).await;
        assert_eq!(
            parsed(&result)["error"],
            serde_json::json!("该专业人士暂未加入任何组织")
        );
    }

    #[tokio::test]
    async fn team_members_excludes_requester() {
        let (store, zhang, li) = team_fixture().await;
        let result = dispatch(&store, &zhang, "get_team_members", &serde_json::json!({})).await;
        let members = parsed(&result);
        let members = members.as_array().unwrap();
        assert_eq!(members.len(), 1);
        assert_eq!(members[0]["id"], serde_json::json!(li.id));
    }

    #[tokio::test]
    async fn team_members_filters_by_specialization_substring() {
        let (store, zhang, li) = team_fixture().await;

        let result = dispatch(
            &store,
            &zhang,
            "get_team_members",
            &serde_json::json!({"specialization": "合同"}),
        )
        .await;
        let members = parsed(&result);
        assert_eq!(members.as_array().unwrap()[0]["id"], serde_json::json!(li.id));

        let result = dispatch(
            &store,
            &zhang,
            "get_team_members",
            &serde_json::json!({"specialization": "刑事辩护"}),
        )
        .await;
        assert!(parsed(&result).as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn team_members_caps_at_ten() {
        let store = InMemoryStore::new();
        let org = store
            .insert_organization(Organization::new("大所", 1))
            .await
            .unwrap();
        let mut requester = Profile::new("发起人", "合伙人").with_organization(org.id);
        requester.approve();
        let requester = store.insert_profile(requester).await.unwrap();

        for i in 0..15 {
            let mut member = Profile::new(format!("成员{i}"), "律师").with_organization(org.id);
            member.approve();
            store.insert_profile(member).await.unwrap();
        }

        // A huge requested limit is still clamped
        let result = dispatch(
            &store,
            &requester,
            "get_team_members",
            &serde_json::json!({"limit": 50}),
        )
        .await;
        let members = parsed(&result);
        let members = members.as_array().unwrap();
        assert_eq!(members.len(), MAX_TEAM_MEMBERS);
        assert!(members.iter().all(|m| m["id"] != serde_json::json!(requester.id)));

        // A smaller requested limit is honored
        let result = dispatch(
            &store,
            &requester,
            "get_team_members",
            &serde_json::json!({"limit": 3}),
        )
        .await;
        assert_eq!(parsed(&result).as_array().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn recommend_unknown_profile_fails() {
        let (store, zhang, _) = team_fixture().await;
        let result = dispatch(
            &store,
            &zhang,
            "recommend_team_member",
            &serde_json::json!({"profile_id": 999, "reason": "x"}),
        )
        .await;
        assert_eq!(parsed(&result)["error"], serde_json::json!("未找到该团队成员"));
    }

    #[tokio::test]
    async fn recommend_rejects_cross_organization() {
        let (store, zhang, _) = team_fixture().await;
        let other_org = store
            .insert_organization(Organization::new("别家", 2))
            .await
            .unwrap();
        let mut outsider = Profile::new("外人", "律师").with_organization(other_org.id);
        outsider.approve();
        let outsider = store.insert_profile(outsider).await.unwrap();

        let result = dispatch(
            &store,
            &zhang,
            "recommend_team_member",
            &serde_json::json!({"profile_id": outsider.id, "reason": "不该成功"}),
        )
        .await;
        let value = parsed(&result);
        assert_eq!(value["error"], serde_json::json!("该成员不在同一组织"));
        assert!(value.get("success").is_none());
    }

    #[tokio::test]
    async fn recommend_rejects_organization_less_profiles() {
        let (store, _, li) = team_fixture().await;
        let loner = store.insert_profile(Profile::new("散人", "顾问")).await.unwrap();

        // Requester without an organization
        let result = dispatch(
            &store,
            &loner,
            "recommend_team_member",
            &serde_json::json!({"profile_id": li.id, "reason": "x"}),
        )
        .await;
        assert_eq!(parsed(&result)["error"], serde_json::json!("该成员不在同一组织"));
    }

    #[tokio::test]
    async fn recommend_success_payload_shape() {
        let (store, zhang, li) = team_fixture().await;

        let result = dispatch(
            &store,
            &zhang,
            "recommend_team_member",
            &serde_json::json!({"profile_id": li.id, "reason": "专业对口"}),
        )
        .await;
        let value = parsed(&result);
        assert_eq!(value["success"], serde_json::json!(true));
        assert_eq!(value["reason"], serde_json::json!("专业对口"));

        let card = &value["profile"];
        assert_eq!(card["id"], serde_json::json!(li.id));
        assert_eq!(card["full_name"], "李娜");
        assert!(card["slug"].is_string());
        assert!(card["stats"]["years_experience"].is_u64());
        // Card shows at most 3 specializations even when the profile lists more
        assert_eq!(card["specializations"].as_array().unwrap().len(), 3);
    }

    #[test]
    fn truncate_respects_char_boundaries() {
        let clipped = truncate_chars(&"很".repeat(300), 200);
        assert_eq!(clipped.chars().count(), 201);
        assert!(clipped.ends_with('…'));
        assert_eq!(truncate_chars("短", 200), "短");
    }
}
