//! # Ballot Proof
//!
//! 选票草稿校对：把选票图片交给视觉模型，找出缺少投票椭圆的候选人
//!
//! ## 架构设计
//!
//! 本系统采用四层架构：
//!
//! ### ① 基础设施层（Infrastructure）
//! - `infrastructure/` - 进程内存储，只暴露读写能力
//! - `JobStore` - job_id → 任务状态
//! - `UploadStore` - 已上传的图片和候选人数据
//!
//! ### ② 业务能力层（Services / Parsers）
//! - `services/` - 描述"我能做什么"，只处理单个任务
//! - `VisionModel` / `OpenAiVision` - 视觉模型调用能力
//! - `SessionLogger` - 会话日志（请求脱敏）能力
//! - `parsers/` - 候选人文本解析、模型回答解析（纯函数）
//!
//! ### ③ 流程层（Workflow）
//! - `workflow/` - 定义"一张选票"的完整分析流程
//! - `AnalysisCtx` - 上下文封装（job_id + 图片）
//! - `AnalysisFlow` - 流程编排（编码 → 调用模型 → 解析 → 写结果）
//!
//! ### ④ 编排层（Orchestration）
//! - `orchestrator/analyzer` - 对外服务入口，提交与查询
//! - `orchestrator/batch_processor` - 命令行批量处理器
//!
//! ## 模块结构

pub mod config;
pub mod error;
pub mod infrastructure;
pub mod logger;
pub mod models;
pub mod orchestrator;
pub mod parsers;
pub mod services;
pub mod utils;
pub mod workflow;

// 重新导出常用类型
pub use config::Config;
pub use error::{AppError, AppResult};
pub use infrastructure::{JobStore, UploadStore};
pub use models::{Findings, Job, JobStatus};
pub use orchestrator::{App, BallotAnalyzer, RunStats};
pub use parsers::{parse_analysis_text, parse_contest_text};
pub use services::{OpenAiVision, SessionLogger, VisionModel};
pub use workflow::{AnalysisCtx, AnalysisFlow};
