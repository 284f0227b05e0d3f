//! 批量选票处理器 - 编排层
//!
//! ## 职责
//!
//! 本模块是命令行程序的入口，负责把配置里的所有选票跑一遍。
//!
//! ## 核心功能
//!
//! 1. **应用初始化**：启动日志、创建 `BallotAnalyzer`
//! 2. **上传输入**：候选人文本 + 每张选票图片
//! 3. **并发等待**：所有任务一起提交，`join_all` 并发轮询直到终态
//! 4. **全局统计**：汇总完成 / 失败数量和发现的问题
//!
//! ## 设计特点
//!
//! - **顶层编排**：不处理单个任务的细节，交给 `AnalysisFlow`
//! - **只读查询**：通过状态 / 结果查询观察任务，不直接碰任务存储

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use futures::future::join_all;
use tracing::{error, info, warn};

use crate::config::Config;
use crate::models::job::JobStatus;
use crate::models::loaders::load_contest_file;
use crate::orchestrator::analyzer::BallotAnalyzer;
use crate::services::vision_service::{OpenAiVision, VisionModel};
use crate::utils::logging::{log_contests_loaded, log_startup, print_final_stats};

/// 运行统计
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RunStats {
    pub total: usize,
    pub completed: usize,
    pub failed: usize,
    pub total_issues: usize,
}

/// 应用主结构
pub struct App<M: VisionModel = OpenAiVision> {
    config: Config,
    analyzer: BallotAnalyzer<M>,
}

impl App<OpenAiVision> {
    /// 初始化应用
    pub async fn initialize(config: Config) -> Result<Self> {
        if config.openai_api_key.is_empty() {
            warn!("⚠️ OPENAI_API_KEY 未设置，模型调用将会失败");
        }
        let analyzer = BallotAnalyzer::from_config(config.clone());
        Ok(Self::with_analyzer(config, analyzer))
    }
}

impl<M: VisionModel> App<M> {
    pub fn with_analyzer(config: Config, analyzer: BallotAnalyzer<M>) -> Self {
        log_startup(&config.vision_model_name, config.image_paths.len());
        Self { config, analyzer }
    }

    pub fn analyzer(&self) -> &BallotAnalyzer<M> {
        &self.analyzer
    }

    /// 运行应用主逻辑
    pub async fn run(&self) -> Result<RunStats> {
        if self.config.image_paths.is_empty() {
            warn!("⚠️ 没有配置待分析的选票图片（BALLOT_IMAGES），程序结束");
            return Ok(RunStats::default());
        }

        // 上传候选人数据
        let raw_text = load_contest_file(Path::new(&self.config.contest_file))
            .await
            .with_context(|| format!("加载候选人文件失败: {}", self.config.contest_file))?;
        let contests = self.analyzer.upload_contests(&raw_text).await?;
        log_contests_loaded(&contests.data_id, contests.contest_count);

        let mut stats = RunStats {
            total: self.config.image_paths.len(),
            ..Default::default()
        };

        // 上传并提交所有选票
        let mut submitted = Vec::new();
        for path in &self.config.image_paths {
            match self.submit_image(path, &contests.data_id).await {
                Ok(job_id) => submitted.push((path.as_str(), job_id)),
                Err(e) => {
                    error!("[{}] ❌ 提交失败: {:#}", path, e);
                    stats.failed += 1;
                }
            }
        }

        // 并发等待所有任务
        let finished = join_all(
            submitted
                .iter()
                .map(|(path, job_id)| self.wait_and_report(path, job_id)),
        )
        .await;

        for outcome in finished {
            match outcome {
                Some(issues) => {
                    stats.completed += 1;
                    stats.total_issues += issues;
                }
                None => stats.failed += 1,
            }
        }

        print_final_stats(
            stats.completed,
            stats.failed,
            stats.total,
            stats.total_issues,
            &self.config.sessions_dir,
        );

        Ok(stats)
    }

    async fn submit_image(&self, path: &str, data_id: &str) -> Result<String> {
        let receipt = self.analyzer.upload_image_file(path).await?;
        let job = self.analyzer.submit(&receipt.file_id, data_id).await?;
        info!("[{}] 📤 已提交，任务 {}", path, job.job_id);
        Ok(job.job_id)
    }

    /// 轮询到终态；完成时返回问题数
    async fn wait_and_report(&self, path: &str, job_id: &str) -> Option<usize> {
        let interval = Duration::from_millis(self.config.poll_interval_ms);

        loop {
            let status = match self.analyzer.status(job_id).await {
                Ok(status) => status,
                Err(e) => {
                    error!("[{}] ❌ 查询任务失败: {}", path, e);
                    return None;
                }
            };

            match status.status {
                JobStatus::Completed => break,
                JobStatus::Error => {
                    error!("[{}] ❌ {}", path, status.message);
                    return None;
                }
                JobStatus::Queued | JobStatus::Processing => {
                    info!("[{}] ⏳ {}% {}", path, status.progress, status.message);
                    tokio::time::sleep(interval).await;
                }
            }
        }

        let results = match self.analyzer.results(job_id).await {
            Ok(results) => results,
            Err(e) => {
                error!("[{}] ❌ 读取结果失败: {}", path, e);
                return None;
            }
        };

        let findings = &results.results.findings;
        info!("[{}] ✅ {}", path, findings.summary);
        for oval in &findings.missing_ovals {
            warn!(
                "[{}]   🔴 {} (候选人: {}, 选举: {}, 置信度: {:?})",
                path,
                oval.description,
                oval.candidate.as_deref().unwrap_or("-"),
                oval.contest.as_deref().unwrap_or("-"),
                oval.confidence
            );
        }
        for issue in &findings.other_issues {
            info!(
                "[{}]   🟡 {} ({:?}, {:?})",
                path, issue.description, issue.issue_type, issue.severity
            );
        }

        Some(findings.total_issues)
    }
}
