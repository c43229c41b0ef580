//! System prompt and tool descriptors for the card assistant.
//!
//! Pure functions of the profile: no I/O, no side effects. The prompt casts
//! the assistant as an introducer, not a professional advisor.

use namecard_core::profile::{Organization, Profile};
use namecard_core::provider::ToolDefinition;

/// Render the assistant's system prompt for one profile.
///
/// Missing optional fields fall back to fixed placeholder text rather than
/// leaking empty interpolations into the prompt.
pub fn system_prompt(
    profile: &Profile,
    organization: Option<&Organization>,
    team_count: usize,
) -> String {
    let name = &profile.full_name;
    let company = profile.company.as_deref().unwrap_or("未设置");
    let department = profile.department.as_deref().unwrap_or("未设置");
    let bio = profile.bio.as_deref().unwrap_or("暂无简介");
    let organization_info = match organization {
        Some(org) => format!("所属组织：{}", org.name),
        None => "暂无组织信息".to_string(),
    };
    let specializations = profile.specializations.join("、");

    format!(
        "你是{name}的**智能名片助手**，负责协助访客了解{name}和团队的基本信息。

## 📋 你的身份定位：
- 你是一个**名片助手**，不是专业顾问或咨询师
- 你的作用是**介绍和引荐**，而不是提供专业意见或解决方案
- 你可以介绍专业背景，但**不要**提供具体的专业建议、法律意见或技术方案

## 👤 专业人士信息：
- 姓名：{name}
- 职位：{title}
- 公司：{company}
- 部门：{department}
- {organization_info}
- 专业领域：{specializations}
- 简介：{bio}
- 执业年限：{years}年
- 成功案例：{cases}个
- 服务客户：{clients}位

## 👥 团队信息：
- 团队成员数量：{team_count}人

## ✅ 你应该做的：
1. **介绍背景**：介绍{name}的专业背景、经验和擅长领域
2. **了解需求**：询问访客的需求，了解他们想要什么样的帮助
3. **推荐联系**：根据访客需求，推荐合适的团队成员
4. **使用工具**：
   - 使用 `get_profile_info` 获取详细的个人信息
   - 使用 `get_team_members` 查看团队成员列表
   - 使用 `recommend_team_member` 推荐最合适的团队成员

## ❌ 你不应该做的：
1. **不要提供专业咨询**：不要回答具体的专业问题（如法律咨询、技术方案等）
2. **不要做承诺**：不要承诺能处理什么案件或提供什么服务
3. **不要自称专家**：不要说\"我可以帮您\"、\"我们可以处理\"，而应该说\"{name}擅长这个领域，我可以为您推荐\"
4. **不要直接回答专业问题**：遇到专业问题时，应该说\"这是一个专业问题，建议您直接联系{name}或相关专家\"

## 💬 回答风格：
- 简洁友好，重点突出
- 使用 Markdown 格式（标题、列表、加粗等）
- 主动询问访客需求
- 及时推荐合适的人选
- 始终记住：你是**引荐者**，不是**服务提供者**

## 📝 对话示例：
**错误示例❌**：
访客：\"你们能处理知识产权案件吗？\"
你：\"当然可以！我们团队在知识产权领域有丰富的经验...\"

**正确示例✅**：
访客：\"你们能处理知识产权案件吗？\"
你：\"感谢您的咨询！{name}的团队确实有知识产权方面的专业人士。让我为您查看一下团队中谁最合适为您提供帮助。您方便简单描述一下您的需求吗？\"
[然后使用 get_team_members 查看团队，再用 recommend_team_member 推荐]",
        title = profile.title,
        years = profile.stats.years_experience,
        cases = profile.stats.cases_handled,
        clients = profile.stats.clients_served,
    )
}

/// The fixed set of three tools the assistant can call.
pub fn tool_definitions() -> Vec<ToolDefinition> {
    vec![
        ToolDefinition {
            name: "get_profile_info".into(),
            description: "获取当前专业人士的详细信息，包括案例、荣誉等".into(),
            parameters: serde_json::json!({
                "type": "object",
                "properties": {
                    "include_cases": {
                        "type": "boolean",
                        "description": "是否包含案例研究"
                    },
                    "include_honors": {
                        "type": "boolean",
                        "description": "是否包含荣誉奖项"
                    }
                }
            }),
        },
        ToolDefinition {
            name: "get_team_members".into(),
            description: "获取所属组织的团队成员列表，可以按专业领域筛选".into(),
            parameters: serde_json::json!({
                "type": "object",
                "properties": {
                    "specialization": {
                        "type": "string",
                        "description": "筛选特定专业领域的成员，例如\"知识产权\"、\"合同法\"等"
                    },
                    "limit": {
                        "type": "integer",
                        "description": "返回的成员数量限制，默认10"
                    }
                }
            }),
        },
        ToolDefinition {
            name: "recommend_team_member".into(),
            description: "推荐一个团队成员给访客，系统会展示该成员的名片。只有在确定推荐某位成员时才调用此工具。".into(),
            parameters: serde_json::json!({
                "type": "object",
                "properties": {
                    "profile_id": {
                        "type": "integer",
                        "description": "要推荐的团队成员的 profile_id"
                    },
                    "reason": {
                        "type": "string",
                        "description": "推荐理由，简短说明为什么推荐这位成员"
                    }
                },
                "required": ["profile_id", "reason"]
            }),
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use namecard_core::profile::ProfileStats;

    fn sample_profile() -> Profile {
        let mut profile = Profile::new("张伟", "高级合伙人");
        profile.specializations = vec!["知识产权".into(), "专利诉讼".into()];
        profile.stats = ProfileStats {
            years_experience: 12,
            cases_handled: 320,
            clients_served: 180,
            success_rate: 95.0,
        };
        profile
    }

    #[test]
    fn prompt_contains_profile_fields() {
        let profile = sample_profile();
        let prompt = system_prompt(&profile, None, 0);

        assert!(prompt.contains("张伟"));
        assert!(prompt.contains("高级合伙人"));
        assert!(prompt.contains("知识产权、专利诉讼"));
        assert!(prompt.contains("执业年限：12年"));
        assert!(prompt.contains("成功案例：320个"));
        assert!(prompt.contains("团队成员数量：0人"));
    }

    #[test]
    fn prompt_falls_back_for_missing_fields() {
        let profile = sample_profile();
        let prompt = system_prompt(&profile, None, 0);

        assert!(prompt.contains("公司：未设置"));
        assert!(prompt.contains("部门：未设置"));
        assert!(prompt.contains("暂无简介"));
        assert!(prompt.contains("暂无组织信息"));
    }

    #[test]
    fn prompt_names_organization_when_present() {
        let profile = sample_profile();
        let org = Organization::new("人脉主页", 1);
        let prompt = system_prompt(&profile, Some(&org), 5);

        assert!(prompt.contains("所属组织：人脉主页"));
        assert!(prompt.contains("团队成员数量：5人"));
        assert!(!prompt.contains("暂无组织信息"));
    }

    #[test]
    fn exactly_three_tools() {
        let tools = tool_definitions();
        assert_eq!(tools.len(), 3);
        let names: Vec<&str> = tools.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(
            names,
            vec!["get_profile_info", "get_team_members", "recommend_team_member"]
        );
    }

    #[test]
    fn recommend_tool_requires_profile_id_and_reason() {
        let tools = tool_definitions();
        let recommend = tools.iter().find(|t| t.name == "recommend_team_member").unwrap();
        let required = recommend.parameters["required"].as_array().unwrap();
        assert!(required.contains(&serde_json::json!("profile_id")));
        assert!(required.contains(&serde_json::json!("reason")));
    }

    #[test]
    fn prompt_is_deterministic() {
        let profile = sample_profile();
        assert_eq!(system_prompt(&profile, None, 3), system_prompt(&profile, None, 3));
    }
}
