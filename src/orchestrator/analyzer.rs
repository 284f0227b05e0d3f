//! 选票分析服务 - 编排层
//!
//! ## 职责
//!
//! 对外的唯一入口：上传、提交、查询都经过这里。
//!
//! - 持有任务存储、上传存储、会话日志和分析流程
//! - 每次提交 `tokio::spawn` 一个独立任务，不限并发、不可取消
//! - 查询只读快照，不等待任务进度

use std::path::Path;
use std::sync::Arc;

use chrono::Local;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::Config;
use crate::error::{AppError, AppResult, NotFoundError, ValidationError};
use crate::infrastructure::{JobStore, UploadStore};
use crate::models::contest::{ContestUpload, ContestUploadReceipt, ContestValidation};
use crate::models::job::{Job, JobResultsView, JobStatus, JobStatusView, SubmittedJob};
use crate::models::session_log::SessionLogView;
use crate::models::upload::{HealthStatus, ImageUploadReceipt, UploadedImage};
use crate::parsers::parse_contest_text;
use crate::services::session_logger::SessionLogger;
use crate::services::vision_service::{OpenAiVision, VisionModel};
use crate::workflow::{AnalysisCtx, AnalysisFlow};

const PNG_SIGNATURE: &[u8] = b"\x89PNG\r\n\x1a\n";

/// 选票分析服务
pub struct BallotAnalyzer<M: VisionModel> {
    config: Config,
    jobs: JobStore,
    uploads: UploadStore,
    logger: SessionLogger,
    flow: Arc<AnalysisFlow<M>>,
}

impl BallotAnalyzer<OpenAiVision> {
    /// 使用配置里的 OpenAI 兼容接口
    pub fn from_config(config: Config) -> Self {
        let model = OpenAiVision::new(&config);
        Self::new(config, model)
    }
}

impl<M: VisionModel> BallotAnalyzer<M> {
    pub fn new(config: Config, model: M) -> Self {
        let jobs = JobStore::new();
        let logger = SessionLogger::new(&config.sessions_dir);
        let flow = AnalysisFlow::new(&config, Arc::new(model), jobs.clone(), logger.clone());

        Self {
            config,
            jobs,
            uploads: UploadStore::new(),
            logger,
            flow: Arc::new(flow),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn health(&self) -> HealthStatus {
        HealthStatus {
            status: "healthy".to_string(),
            timestamp: Local::now(),
        }
    }

    /// 上传选票图片
    ///
    /// 校验顺序：文件名 → 扩展名 → 大小 → PNG 文件头。
    pub async fn upload_image(
        &self,
        original_filename: &str,
        bytes: &[u8],
    ) -> AppResult<ImageUploadReceipt> {
        if original_filename.trim().is_empty() {
            return Err(ValidationError::EmptyFilename.into());
        }

        let extension = self.allowed_extension(original_filename)?;

        let size = bytes.len() as u64;
        if size > self.config.max_content_length {
            return Err(ValidationError::FileTooLarge {
                size,
                limit: self.config.max_content_length,
            }
            .into());
        }

        if extension == "png" && !bytes.starts_with(PNG_SIGNATURE) {
            return Err(ValidationError::InvalidImage("missing PNG signature".to_string()).into());
        }

        let file_id = Uuid::new_v4().to_string();
        let filename = format!("{}.{}", file_id, extension);
        let folder = Path::new(&self.config.upload_folder);
        let filepath = folder.join(&filename);

        tokio::fs::create_dir_all(folder)
            .await
            .map_err(|e| AppError::file_write_failed(&self.config.upload_folder, e))?;
        tokio::fs::write(&filepath, bytes)
            .await
            .map_err(|e| AppError::file_write_failed(filepath.display().to_string(), e))?;

        let image = UploadedImage {
            file_id,
            original_filename: original_filename.to_string(),
            filename,
            filepath,
            size,
            uploaded_at: Local::now(),
        };
        let receipt = image.receipt();

        info!(
            "📥 图片已上传: {} → {} ({} 字节)",
            image.original_filename, image.file_id, size
        );
        self.uploads.insert_image(image).await;

        Ok(receipt)
    }

    /// 读取本地文件后按上传处理
    ///
    /// 文件名和大小先用元数据校验，超限的文件不读进内存。
    pub async fn upload_image_file(&self, path: impl AsRef<Path>) -> AppResult<ImageUploadReceipt> {
        let path = path.as_ref();
        let path_str = path.display().to_string();
        let filename = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default();

        if filename.trim().is_empty() {
            return Err(ValidationError::EmptyFilename.into());
        }
        self.allowed_extension(filename)?;

        let size = tokio::fs::metadata(path)
            .await
            .map_err(|e| AppError::file_read_failed(&path_str, e))?
            .len();
        if size > self.config.max_content_length {
            return Err(ValidationError::FileTooLarge {
                size,
                limit: self.config.max_content_length,
            }
            .into());
        }

        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| AppError::file_read_failed(&path_str, e))?;

        self.upload_image(filename, &bytes).await
    }

    pub async fn image(&self, file_id: &str) -> AppResult<UploadedImage> {
        self.uploads
            .image(file_id)
            .await
            .ok_or_else(|| NotFoundError::Image(file_id.to_string()).into())
    }

    /// 上传候选人文本
    pub async fn upload_contests(&self, text: &str) -> AppResult<ContestUploadReceipt> {
        let text = text.trim();
        if text.is_empty() {
            return Err(ValidationError::EmptyContestText.into());
        }

        let upload = ContestUpload {
            data_id: Uuid::new_v4().to_string(),
            raw_text: text.to_string(),
            contests: parse_contest_text(text),
            uploaded_at: Local::now(),
        };
        let receipt = upload.receipt();

        info!(
            "📥 候选人数据已上传: {} ({} 场选举)",
            upload.data_id,
            upload.contests.len()
        );
        self.uploads.insert_contests(upload).await;

        Ok(receipt)
    }

    /// 只解析不保存；解析本身不会失败
    pub fn validate_contests(&self, text: &str) -> ContestValidation {
        let contests = parse_contest_text(text.trim());
        ContestValidation {
            valid: true,
            contest_count: contests.len(),
            preview: contests,
        }
    }

    /// 提交分析任务
    ///
    /// 返回时任务处于 queued，分析在后台任务里进行。
    pub async fn submit(
        &self,
        image_file_id: &str,
        contest_data_id: &str,
    ) -> AppResult<SubmittedJob> {
        let image = self.image(image_file_id).await?;
        if self.uploads.contests(contest_data_id).await.is_none() {
            return Err(NotFoundError::ContestData(contest_data_id.to_string()).into());
        }

        let job_id = Uuid::new_v4().to_string();
        self.jobs
            .insert(Job::new(&job_id, image_file_id, contest_data_id))
            .await;

        let ctx = AnalysisCtx::new(job_id.clone(), image.file_id, image.filepath);
        let flow = Arc::clone(&self.flow);
        tokio::spawn(async move {
            flow.run(&ctx).await;
        });

        info!("🗳️ 已提交分析任务 {}", job_id);

        Ok(SubmittedJob {
            job_id,
            status: JobStatus::Queued,
            message: format!(
                "Analysis job started - processing with {}",
                self.flow.model().model_name()
            ),
        })
    }

    pub async fn status(&self, job_id: &str) -> AppResult<JobStatusView> {
        let job = self.job(job_id).await?;
        Ok(job.status_view())
    }

    /// 只有 completed 的任务有结果
    pub async fn results(&self, job_id: &str) -> AppResult<JobResultsView> {
        let job = self.job(job_id).await?;

        let (JobStatus::Completed, Some(results)) = (job.status, job.results) else {
            debug!("任务 {} 尚未完成 ({})", job_id, job.status);
            return Err(AppError::NotCompleted {
                job_id: job.job_id,
                status: job.status.to_string(),
            });
        };

        Ok(JobResultsView {
            job_id: job.job_id,
            status: job.status,
            completed_at: results.completed_at,
            results,
            created_at: job.created_at,
        })
    }

    /// 会话日志
    pub async fn logs(&self, job_id: &str) -> AppResult<SessionLogView> {
        let logs = self.logger.read_entries(job_id).await?;

        Ok(SessionLogView {
            job_id: job_id.to_string(),
            log_file: self.logger.log_path(job_id).display().to_string(),
            entry_count: logs.len(),
            logs,
        })
    }

    async fn job(&self, job_id: &str) -> AppResult<Job> {
        self.jobs
            .get(job_id)
            .await
            .ok_or_else(|| NotFoundError::Job(job_id.to_string()).into())
    }

    /// 扩展名（小写）在允许列表中才返回
    fn allowed_extension(&self, filename: &str) -> AppResult<String> {
        let extension = filename
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_lowercase())
            .filter(|ext| self.config.allowed_extensions.contains(ext));

        extension.ok_or_else(|| {
            warn!("⚠️ 拒绝上传: {}", filename);
            ValidationError::DisallowedExtension {
                filename: filename.to_string(),
                allowed: self.config.allowed_extensions.join("/").to_uppercase(),
            }
            .into()
        })
    }
}
