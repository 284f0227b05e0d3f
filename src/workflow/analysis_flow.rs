//! 选票分析流程 - 流程层
//!
//! 核心职责：定义"一张选票"的完整分析流程
//!
//! 流程顺序：
//! 1. 读取并编码图片（进度 10）
//! 2. 记录请求 → 调用视觉模型 → 记录返回（进度 30）
//! 3. 解析模型回答（进度 80）
//! 4. 写入结果（进度 100）
//!
//! 任意一步失败：任务转为 error，进度归零，错误写进会话日志。不重试。

use std::sync::Arc;

use chrono::Local;
use serde_json::json;
use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::error::{AppError, AppResult, NotFoundError};
use crate::infrastructure::JobStore;
use crate::models::findings::Findings;
use crate::models::job::{AnalysisResults, Checkpoint, Job};
use crate::models::session_log::SessionEventType;
use crate::parsers::parse_analysis_text;
use crate::services::session_logger::SessionLogger;
use crate::services::vision_service::{
    build_ballot_request, data_uri, encode_image, first_choice_text, image_mime, VisionModel,
    VisionSettings,
};
use crate::utils::logging::truncate_text;
use crate::workflow::analysis_ctx::AnalysisCtx;

/// 选票分析流程
///
/// - 编排单个任务从 queued 到终态的全过程
/// - 任务状态只通过 `JobStore::update` 修改
/// - 失败都收敛成任务状态，不向外抛
pub struct AnalysisFlow<M: VisionModel> {
    model: Arc<M>,
    jobs: JobStore,
    logger: SessionLogger,
    settings: VisionSettings,
    verbose_logging: bool,
}

impl<M: VisionModel> AnalysisFlow<M> {
    pub fn new(config: &Config, model: Arc<M>, jobs: JobStore, logger: SessionLogger) -> Self {
        Self {
            model,
            jobs,
            logger,
            settings: VisionSettings::from_config(config),
            verbose_logging: config.verbose_logging,
        }
    }

    pub fn model(&self) -> &M {
        &self.model
    }

    /// 跑完一个任务，结果写回任务存储
    pub async fn run(&self, ctx: &AnalysisCtx) {
        info!("{} 🚀 开始分析 ({})", ctx, self.model.model_name());

        match self.execute(ctx).await {
            Ok(findings) => info!(
                "{} ✅ 分析完成: {} 个缺失椭圆, {} 个其他问题",
                ctx,
                findings.missing_ovals.len(),
                findings.other_issues.len()
            ),
            Err(e) => self.record_failure(ctx, &e).await,
        }
    }

    async fn execute(&self, ctx: &AnalysisCtx) -> AppResult<Findings> {
        let path_str = ctx.image_path.display().to_string();

        // ========== 1. 读取并编码图片 ==========
        let image_size = tokio::fs::metadata(&ctx.image_path)
            .await
            .map_err(|e| AppError::file_read_failed(&path_str, e))?
            .len();

        self.logger
            .metadata(
                &ctx.job_id,
                json!({
                    "action": "start_analysis",
                    "image_path": path_str,
                    "image_size": image_size,
                }),
            )
            .await;

        self.update_job(ctx, |job| job.advance(Checkpoint::Encoding))
            .await?;

        let bytes = tokio::fs::read(&ctx.image_path)
            .await
            .map_err(|e| AppError::file_read_failed(&path_str, e))?;
        let encoded = encode_image(&bytes);

        self.logger
            .metadata(
                &ctx.job_id,
                json!({ "action": "image_encoded", "base64_length": encoded.len() }),
            )
            .await;
        debug!("{} 图片已编码 ({} 字节)", ctx, bytes.len());

        // ========== 2. 调用视觉模型 ==========
        self.update_job(ctx, |job| job.advance(Checkpoint::Sending))
            .await?;

        let uri = data_uri(image_mime(&ctx.image_path), &encoded);
        let request = build_ballot_request(&self.settings, &uri)?;

        self.logger
            .log_request(
                &ctx.job_id,
                &self.settings.model,
                &request.messages,
                self.settings.max_tokens,
                self.settings.temperature,
            )
            .await;

        info!("{} 📤 发送到视觉模型...", ctx);
        let response = self.model.complete(request).await?;
        self.logger.log_response(&ctx.job_id, &response).await;

        // ========== 3. 解析回答 ==========
        self.update_job(ctx, |job| job.advance(Checkpoint::ParsingResults))
            .await?;

        let analysis = first_choice_text(&response)?;
        if self.verbose_logging {
            info!("{} 模型回答: {}", ctx, truncate_text(&analysis, 200));
        }

        let findings = parse_analysis_text(&analysis);
        self.logger
            .metadata(
                &ctx.job_id,
                json!({
                    "action": "analysis_parsed",
                    "findings_summary": {
                        "missing_ovals_count": findings.missing_ovals.len(),
                        "other_issues_count": findings.other_issues.len(),
                        "total_issues": findings.total_issues,
                    },
                }),
            )
            .await;

        // ========== 4. 写入结果 ==========
        let results = AnalysisResults {
            raw_analysis: analysis,
            findings: findings.clone(),
            completed_at: Local::now(),
        };
        self.update_job(ctx, |job| job.complete(results)).await?;

        self.logger
            .metadata(
                &ctx.job_id,
                json!({ "action": "analysis_completed", "status": "success" }),
            )
            .await;

        Ok(findings)
    }

    async fn update_job(
        &self,
        ctx: &AnalysisCtx,
        f: impl FnOnce(&mut Job) -> AppResult<()>,
    ) -> AppResult<()> {
        self.jobs
            .update(&ctx.job_id, f)
            .await
            .unwrap_or_else(|| Err(NotFoundError::Job(ctx.job_id.clone()).into()))
    }

    async fn record_failure(&self, ctx: &AnalysisCtx, err: &AppError) {
        error!("{} ❌ 分析失败 [{}]: {}", ctx, err.category(), err);

        self.logger
            .log(
                &ctx.job_id,
                SessionEventType::Error,
                json!({
                    "action": "analysis_failed",
                    "error_message": err.to_string(),
                    "error_type": err.category(),
                }),
                None,
            )
            .await;

        match self
            .jobs
            .update(&ctx.job_id, |job| job.fail(err.to_string(), err.category()))
            .await
        {
            Some(Ok(())) => {}
            Some(Err(e)) => warn!("{} ⚠️ 无法标记失败: {}", ctx, e),
            None => warn!("{} ⚠️ 任务已不存在", ctx),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::job::JobStatus;
    use async_openai::types::chat::{CreateChatCompletionRequest, CreateChatCompletionResponse};
    use std::path::PathBuf;
    use uuid::Uuid;

    struct CannedModel {
        answer: &'static str,
    }

    impl VisionModel for CannedModel {
        fn model_name(&self) -> &str {
            "canned"
        }

        async fn complete(
            &self,
            _request: CreateChatCompletionRequest,
        ) -> AppResult<CreateChatCompletionResponse> {
            Ok(serde_json::from_value(json!({
                "id": "chatcmpl-canned",
                "object": "chat.completion",
                "created": 1_700_000_000u32,
                "model": "canned",
                "choices": [{
                    "index": 0,
                    "message": { "role": "assistant", "content": self.answer },
                    "finish_reason": "stop"
                }]
            }))?)
        }
    }

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("{}-{}", name, Uuid::new_v4()))
    }

    async fn setup(answer: &'static str, image_path: PathBuf) -> (AnalysisFlow<CannedModel>, AnalysisCtx) {
        let config = Config::default();
        let jobs = JobStore::new();
        let job_id = Uuid::new_v4().to_string();
        jobs.insert(Job::new(&job_id, "img-1", "data-1")).await;

        let flow = AnalysisFlow::new(
            &config,
            Arc::new(CannedModel { answer }),
            jobs,
            SessionLogger::new(temp_path("sessions")),
        );
        let ctx = AnalysisCtx::new(job_id, "img-1".to_string(), image_path);
        (flow, ctx)
    }

    #[tokio::test]
    async fn test_run_completes_job() {
        let image = temp_path("ballot").with_extension("png");
        tokio::fs::write(&image, b"\x89PNG\r\n\x1a\nfake").await.unwrap();

        let (flow, ctx) = setup("Missing oval for Jane Doe, high confidence.", image).await;
        flow.run(&ctx).await;

        let job = flow.jobs.get(&ctx.job_id).await.unwrap();
        assert_eq!(job.status, JobStatus::Completed);
        assert_eq!(job.progress, 100);

        let results = job.results.unwrap();
        assert_eq!(results.findings.missing_ovals.len(), 1);
        assert_eq!(results.raw_analysis, "Missing oval for Jane Doe, high confidence.");

        let actions: Vec<String> = flow
            .logger
            .read_entries(&ctx.job_id)
            .await
            .unwrap()
            .iter()
            .filter_map(|r| r.entry())
            .map(|e| e.data["action"].as_str().unwrap_or("-").to_string())
            .collect();
        assert_eq!(
            actions,
            vec![
                "start_analysis",
                "image_encoded",
                "-",
                "-",
                "analysis_parsed",
                "analysis_completed"
            ]
        );
    }

    #[tokio::test]
    async fn test_missing_image_fails_from_queued() {
        let (flow, ctx) = setup("irrelevant", temp_path("missing").with_extension("png")).await;
        flow.run(&ctx).await;

        let job = flow.jobs.get(&ctx.job_id).await.unwrap();
        assert_eq!(job.status, JobStatus::Error);
        assert_eq!(job.progress, 0);
        assert_eq!(job.error_type.as_deref(), Some("file"));
        assert!(job.message.starts_with("Analysis failed: "));

        let records = flow.logger.read_entries(&ctx.job_id).await.unwrap();
        let last = records.last().and_then(|r| r.entry()).unwrap();
        assert_eq!(last.event_type, SessionEventType::Error);
        assert_eq!(last.data["error_type"], "file");
    }

    #[tokio::test]
    async fn test_empty_answer_is_llm_failure() {
        let image = temp_path("ballot").with_extension("png");
        tokio::fs::write(&image, b"\x89PNG\r\n\x1a\n").await.unwrap();

        let (flow, ctx) = setup("  ", image).await;
        flow.run(&ctx).await;

        let job = flow.jobs.get(&ctx.job_id).await.unwrap();
        assert_eq!(job.status, JobStatus::Error);
        assert_eq!(job.error_type.as_deref(), Some("llm"));
        assert!(job.results.is_none());
    }
}
