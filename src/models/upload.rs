use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// 已上传的选票图片
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadedImage {
    pub file_id: String,
    pub original_filename: String,
    /// 磁盘上的文件名（`<file_id>.<ext>`）
    pub filename: String,
    pub filepath: PathBuf,
    pub size: u64,
    pub uploaded_at: DateTime<Local>,
}

impl UploadedImage {
    pub fn receipt(&self) -> ImageUploadReceipt {
        ImageUploadReceipt {
            file_id: self.file_id.clone(),
            filename: self.original_filename.clone(),
            size: self.size,
            uploaded_at: self.uploaded_at,
        }
    }
}

/// 上传图片的回执
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageUploadReceipt {
    pub file_id: String,
    pub filename: String,
    pub size: u64,
    pub uploaded_at: DateTime<Local>,
}

/// 健康检查
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    pub timestamp: DateTime<Local>,
}
