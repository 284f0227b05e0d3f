use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

/// 一场选举（或公投问题）
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ContestDataset {
    pub title: String,
    pub candidates: Vec<String>,
    pub reporting_units: String,
    pub vote_for: u32,
}

impl ContestDataset {
    pub fn new(title: impl Into<String>, vote_for: u32) -> Self {
        Self {
            title: title.into(),
            candidates: Vec::new(),
            reporting_units: String::new(),
            vote_for,
        }
    }
}

/// 已上传的候选人数据
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContestUpload {
    pub data_id: String,
    pub raw_text: String,
    pub contests: Vec<ContestDataset>,
    pub uploaded_at: DateTime<Local>,
}

impl ContestUpload {
    pub fn receipt(&self) -> ContestUploadReceipt {
        ContestUploadReceipt {
            data_id: self.data_id.clone(),
            contest_count: self.contests.len(),
            contests: self.contests.iter().map(|c| c.title.clone()).collect(),
            uploaded_at: self.uploaded_at,
        }
    }
}

/// 上传候选人数据的回执
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContestUploadReceipt {
    pub data_id: String,
    pub contest_count: usize,
    pub contests: Vec<String>,
    pub uploaded_at: DateTime<Local>,
}

/// 只校验、不保存
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContestValidation {
    pub valid: bool,
    pub contest_count: usize,
    pub preview: Vec<ContestDataset>,
}
