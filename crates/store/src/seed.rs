//! Demo seed data — a default organization with a small team.
//!
//! Used by `namecard serve --seed-demo` and by tests that want a populated
//! store without hand-building profiles.

use namecard_core::error::StoreError;
use namecard_core::profile::{CaseStudy, Honor, Organization, Profile, ProfileStats};
use namecard_core::store::CardStore;
use tracing::info;

/// Seed a default organization and three member profiles.
///
/// Returns the ids of the organization and the approved members
/// (张伟, 李娜); the third member (王强) stays pending.
pub async fn seed_demo(store: &dyn CardStore) -> Result<(i64, Vec<i64>), StoreError> {
    let org = store
        .insert_organization(Organization::new("人脉主页", 1))
        .await?;

    let mut zhang = Profile::new("张伟", "高级合伙人").with_organization(org.id);
    zhang.company = Some("明衡律师事务所".into());
    zhang.department = Some("知识产权部".into());
    zhang.bio = Some("专注知识产权诉讼十余年，代理多起具有行业影响力的专利纠纷案件。".into());
    zhang.specializations = Profile::parse_specializations("知识产权、专利诉讼、商标维权");
    zhang.stats = ProfileStats {
        years_experience: 12,
        cases_handled: 320,
        clients_served: 180,
        success_rate: 95.0,
    };
    zhang.email = Some("zhangwei@example.com".into());
    zhang.location = Some("北京".into());
    zhang.case_studies.push(CaseStudy {
        title: "某科技公司专利侵权案".into(),
        category: "专利诉讼".into(),
        date: Some("2024-06".into()),
        description: "代理原告获得全额赔偿，确立了行业内对等同侵权认定的参考标准。".into(),
    });
    zhang.honors.push(Honor {
        title: "年度知识产权律师".into(),
        organization: "全国律协".into(),
        date: Some("2023".into()),
        description: "因在专利诉讼领域的突出表现获评年度知识产权律师。".into(),
    });
    zhang.approve();
    let zhang = store.insert_profile(zhang).await?;

    let mut li = Profile::new("李娜", "合伙人").with_organization(org.id);
    li.company = Some("明衡律师事务所".into());
    li.department = Some("公司业务部".into());
    li.bio = Some("擅长公司治理与并购交易，服务多家上市公司。".into());
    li.specializations = Profile::parse_specializations("合同法、公司治理、并购重组");
    li.stats = ProfileStats {
        years_experience: 9,
        cases_handled: 210,
        clients_served: 120,
        success_rate: 92.0,
    };
    li.location = Some("上海".into());
    li.approve();
    let li = store.insert_profile(li).await?;

    let mut wang = Profile::new("王强", "执业律师").with_organization(org.id);
    wang.specializations = Profile::parse_specializations("劳动仲裁");
    wang.stats = ProfileStats {
        years_experience: 3,
        cases_handled: 40,
        clients_served: 35,
        success_rate: 88.0,
    };
    store.insert_profile(wang).await?;

    info!(
        organization = org.id,
        invite_token = %org.invite_token,
        "Seeded demo organization"
    );

    Ok((org.id, vec![zhang.id, li.id]))
}
