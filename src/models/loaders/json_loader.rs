use crate::error::LoadError;
use crate::models::profile::ApplicantProfile;
use anyhow::Result;
use std::path::Path;
use tokio::fs;

/// 加载申请人资料，缺少必要字段时报错
pub async fn load_profile(path: &Path) -> Result<ApplicantProfile> {
    if !path.exists() {
        return Err(LoadError::NotFound {
            path: path.to_path_buf(),
        }
        .into());
    }

    let content = fs::read_to_string(path)
        .await
        .map_err(|source| LoadError::ReadFailed {
            path: path.to_path_buf(),
            source,
        })?;

    let profile: ApplicantProfile =
        serde_json::from_str(&content).map_err(|source| LoadError::JsonParseFailed {
            path: path.to_path_buf(),
            source,
        })?;

    let missing = profile.missing_fields();
    if !missing.is_empty() {
        return Err(LoadError::IncompleteProfile { missing }.into());
    }

    if profile.work_authorization.require_visa_sponsorship.is_none() {
        tracing::warn!("⚠️ 个人资料未填写签证担保信息，相关问题可能无法自动回答");
    }

    tracing::info!("成功加载个人资料: {}", profile.contact.display_name());
    Ok(profile)
}
