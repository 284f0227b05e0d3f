use anyhow::{Context, Result};
use std::path::Path;
use tokio::fs;

/// 从文本文件读取候选人定义
///
/// 返回去掉首尾空白的原始文本，解析交给上传环节。
pub async fn load_contest_file(path: &Path) -> Result<String> {
    let content = fs::read_to_string(path)
        .await
        .with_context(|| format!("无法读取候选人文件: {}", path.display()))?;

    let text = content.trim().to_string();
    if text.is_empty() {
        anyhow::bail!("候选人文件为空: {}", path.display());
    }

    tracing::info!(
        "成功读取候选人文件 ({} 行): {}",
        text.lines().count(),
        path.file_name().unwrap_or_default().to_string_lossy()
    );

    Ok(text)
}
