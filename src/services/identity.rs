//! 身份字段填写 - 业务能力层
//!
//! 姓名 / 邮箱 / 电话 / 简历直接取自个人资料，不经过分层解析。

use anyhow::Result;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::infrastructure::{ControlProbe, FormPage};
use crate::models::ApplicantProfile;
use crate::services::field_scanner::stable_locator;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentityRole {
    FirstName,
    LastName,
    FullName,
    PreferredName,
    Email,
    Phone,
    Resume,
}

const MARKERS: &[(&str, IdentityRole)] = &[
    ("first_name", IdentityRole::FirstName),
    ("last_name", IdentityRole::LastName),
    ("full_name", IdentityRole::FullName),
    ("preferred_name", IdentityRole::PreferredName),
    ("email", IdentityRole::Email),
    ("phone", IdentityRole::Phone),
    ("resume", IdentityRole::Resume),
];

/// 按 id / name 标记和 input 类型判断是否为身份字段
pub fn identity_role(probe: &ControlProbe) -> Option<IdentityRole> {
    let id = probe.id.to_lowercase();
    let name = probe.name.to_lowercase();
    MARKERS
        .iter()
        .find(|(marker, _)| id.contains(marker) || name.contains(marker))
        .map(|(_, role)| *role)
        .or(match probe.input_type.as_str() {
            "email" => Some(IdentityRole::Email),
            "tel" => Some(IdentityRole::Phone),
            _ => None,
        })
}

pub struct IdentityFiller {
    profile: Arc<ApplicantProfile>,
    resume: Option<PathBuf>,
}

impl IdentityFiller {
    pub fn new(profile: Arc<ApplicantProfile>, resume: Option<PathBuf>) -> Self {
        Self { profile, resume }
    }

    fn value_for(&self, role: IdentityRole) -> Option<String> {
        let contact = &self.profile.contact;
        let value = match role {
            IdentityRole::FirstName | IdentityRole::PreferredName => contact.first_name.clone(),
            IdentityRole::LastName => contact.last_name.clone(),
            IdentityRole::FullName => contact.display_name(),
            IdentityRole::Email => contact.email.clone(),
            IdentityRole::Phone => contact.phone.clone(),
            IdentityRole::Resume => return None,
        };
        (!value.trim().is_empty()).then_some(value)
    }

    /// 填写所有空着的身份字段，返回填写数量
    pub async fn fill(&self, page: &dyn FormPage) -> Result<usize> {
        let mut filled = 0;
        for probe in page.probe_controls().await? {
            let Some(role) = identity_role(&probe) else {
                continue;
            };
            let Some(selector) = stable_locator(&probe) else {
                continue;
            };

            if role == IdentityRole::Resume {
                if probe.input_type != "file" {
                    continue;
                }
                match &self.resume {
                    Some(path) => {
                        if page.upload_file(&selector, path).await? {
                            info!("📎 已上传简历: {}", path.display());
                            filled += 1;
                        } else {
                            warn!("⚠️ 简历上传控件不可用: {}", selector);
                        }
                    }
                    None => debug!("未配置简历路径，跳过上传"),
                }
                continue;
            }

            if !probe.visible || probe.tag == "select" {
                continue;
            }
            if page.read_value(&selector).await?.is_some() {
                debug!("身份字段 {} 已有值，跳过", selector);
                continue;
            }
            if let Some(value) = self.value_for(role) {
                if page.fill(&selector, &value).await? {
                    filled += 1;
                }
            }
        }
        Ok(filled)
    }
}
