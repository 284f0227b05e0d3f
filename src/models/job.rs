//! 分析任务及其生命周期状态机
//!
//! ```text
//! queued ──start──▶ processing(10) ──▶ processing(30) ──▶ processing(80) ──▶ completed(100)
//!    │                  │
//!    └──────fail────────┴──────────────────────────────▶ error(0)
//! ```

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{AppError, AppResult};
use crate::models::findings::Findings;

/// 任务状态
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Queued,
    Processing,
    Completed,
    Error,
}

impl JobStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Error)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            JobStatus::Queued => "queued",
            JobStatus::Processing => "processing",
            JobStatus::Completed => "completed",
            JobStatus::Error => "error",
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 处理中的进度检查点
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Checkpoint {
    /// 开始编码图片（queued → processing）
    Encoding,
    /// 发送给视觉模型
    Sending,
    /// 解析模型返回
    ParsingResults,
}

impl Checkpoint {
    pub fn progress(self) -> u8 {
        match self {
            Checkpoint::Encoding => 10,
            Checkpoint::Sending => 30,
            Checkpoint::ParsingResults => 80,
        }
    }

    pub fn message(self) -> &'static str {
        match self {
            Checkpoint::Encoding => "Encoding image for analysis...",
            Checkpoint::Sending => "Sending to OpenAI for visual analysis...",
            Checkpoint::ParsingResults => "Processing analysis results...",
        }
    }
}

/// 分析完成后的结果
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisResults {
    pub raw_analysis: String,
    pub findings: Findings,
    pub completed_at: DateTime<Local>,
}

/// 一次选票分析任务
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub job_id: String,
    pub status: JobStatus,
    pub image_file_id: String,
    pub contest_data_id: String,
    pub created_at: DateTime<Local>,
    pub progress: u8,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub results: Option<AnalysisResults>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_type: Option<String>,
}

impl Job {
    pub fn new(
        job_id: impl Into<String>,
        image_file_id: impl Into<String>,
        contest_data_id: impl Into<String>,
    ) -> Self {
        Self {
            job_id: job_id.into(),
            status: JobStatus::Queued,
            image_file_id: image_file_id.into(),
            contest_data_id: contest_data_id.into(),
            created_at: Local::now(),
            progress: 0,
            message: "Analysis queued for OpenAI processing...".to_string(),
            results: None,
            error: None,
            error_type: None,
        }
    }

    /// 推进到下一个检查点
    ///
    /// `Encoding` 只能从 queued 进入；其余检查点要求 processing 且进度严格递增。
    pub fn advance(&mut self, checkpoint: Checkpoint) -> AppResult<()> {
        let allowed = match checkpoint {
            Checkpoint::Encoding => self.status == JobStatus::Queued,
            _ => self.status == JobStatus::Processing && self.progress < checkpoint.progress(),
        };
        if !allowed {
            return Err(AppError::invalid_transition(
                &self.job_id,
                format!("{}({})", self.status, self.progress),
                format!("processing({})", checkpoint.progress()),
            ));
        }

        self.status = JobStatus::Processing;
        self.progress = checkpoint.progress();
        self.message = checkpoint.message().to_string();
        Ok(())
    }

    pub fn complete(&mut self, results: AnalysisResults) -> AppResult<()> {
        if self.status != JobStatus::Processing {
            return Err(AppError::invalid_transition(
                &self.job_id,
                self.status,
                JobStatus::Completed,
            ));
        }

        self.status = JobStatus::Completed;
        self.progress = 100;
        self.message = "Analysis completed successfully".to_string();
        self.results = Some(results);
        Ok(())
    }

    /// 失败是终态，进度归零
    pub fn fail(&mut self, error: impl Into<String>, error_type: impl Into<String>) -> AppResult<()> {
        if self.status.is_terminal() {
            return Err(AppError::invalid_transition(
                &self.job_id,
                self.status,
                JobStatus::Error,
            ));
        }

        let error = error.into();
        self.status = JobStatus::Error;
        self.progress = 0;
        self.message = format!("Analysis failed: {}", error);
        self.error = Some(error);
        self.error_type = Some(error_type.into());
        Ok(())
    }

    pub fn has_results(&self) -> bool {
        self.results.is_some()
    }

    pub fn status_view(&self) -> JobStatusView {
        JobStatusView {
            job_id: self.job_id.clone(),
            status: self.status,
            progress: self.progress,
            message: self.message.clone(),
            created_at: self.created_at,
            has_results: self.has_results(),
        }
    }
}

/// 状态查询的返回
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobStatusView {
    pub job_id: String,
    pub status: JobStatus,
    pub progress: u8,
    pub message: String,
    pub created_at: DateTime<Local>,
    pub has_results: bool,
}

/// 结果查询的返回
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobResultsView {
    pub job_id: String,
    pub status: JobStatus,
    pub results: AnalysisResults,
    pub created_at: DateTime<Local>,
    pub completed_at: DateTime<Local>,
}

/// 提交任务的回执
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmittedJob {
    pub job_id: String,
    pub status: JobStatus,
    pub message: String,
}
