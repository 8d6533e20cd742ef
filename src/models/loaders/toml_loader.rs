use crate::error::LoadError;
use crate::models::job::{JobList, JobRef};
use crate::models::rules::ResolverConfig;
use anyhow::Result;
use std::path::Path;
use tokio::fs;

/// 读取并解析 TOML 文件
async fn read_toml<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let content = fs::read_to_string(path).await.map_err(|source| {
        if source.kind() == std::io::ErrorKind::NotFound {
            LoadError::NotFound {
                path: path.to_path_buf(),
            }
        } else {
            LoadError::ReadFailed {
                path: path.to_path_buf(),
                source,
            }
        }
    })?;

    let value = toml::from_str(&content).map_err(|source| LoadError::TomlParseFailed {
        path: path.to_path_buf(),
        source,
    })?;

    Ok(value)
}

/// 加载待申请职位，按匹配分数排序
pub async fn load_jobs(path: &Path) -> Result<Vec<JobRef>> {
    let list: JobList = read_toml(path).await?;
    let jobs = list.ranked();
    tracing::info!(
        "成功加载 {} 个职位: {}",
        jobs.len(),
        path.file_name().unwrap_or_default().to_string_lossy()
    );
    Ok(jobs)
}

/// 加载预设答案配置；文件不存在时使用内置默认规则
pub async fn load_resolver_config(path: &Path) -> Result<ResolverConfig> {
    if !path.exists() {
        tracing::warn!("答案配置不存在: {}，使用内置默认规则", path.display());
        return Ok(ResolverConfig::default());
    }
    let config: ResolverConfig = read_toml(path).await?;
    tracing::info!("成功加载 {} 条预设答案规则", config.rules.len());
    Ok(config)
}
