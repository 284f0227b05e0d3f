//! 分析任务上下文
//!
//! 封装"我正在分析哪个任务的哪张图片"这一信息

use std::fmt::Display;
use std::path::PathBuf;

/// 分析任务上下文
#[derive(Debug, Clone)]
pub struct AnalysisCtx {
    /// 任务ID，同时是会话日志的文件名
    pub job_id: String,

    /// 上传图片的ID（仅用于日志显示）
    pub image_file_id: String,

    /// 图片在磁盘上的路径
    pub image_path: PathBuf,
}

impl AnalysisCtx {
    pub fn new(job_id: String, image_file_id: String, image_path: PathBuf) -> Self {
        Self {
            job_id,
            image_file_id,
            image_path,
        }
    }
}

impl Display for AnalysisCtx {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[Job {} 图片#{}]", self.job_id, self.image_file_id)
    }
}
