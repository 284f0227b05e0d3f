//! 编排层（Orchestration Layer）
//!
//! ## 职责
//!
//! 本层负责任务提交和调度，是整个系统的"指挥中心"。
//!
//! ## 模块划分
//!
//! ### `analyzer` - 选票分析服务
//! - 上传图片 / 候选人数据
//! - 创建任务并 `tokio::spawn` 后台分析
//! - 状态、结果、会话日志查询
//!
//! ### `batch_processor` - 批量选票处理器
//! - 管理命令行程序生命周期（初始化、运行）
//! - 提交配置中的所有选票并并发轮询
//! - 输出全局统计信息
//!
//! ## 层次关系
//!
//! ```text
//! batch_processor (处理 Vec<选票>)
//!     ↓
//! analyzer (提交 / 查询，持有存储)
//!     ↓
//! workflow::AnalysisFlow (处理单个任务)
//!     ↓
//! services (能力层：vision / session log)
//!     ↓
//! infrastructure (基础设施：JobStore / UploadStore)
//! ```

pub mod analyzer;
pub mod batch_processor;

// 重新导出主要类型
pub use analyzer::BallotAnalyzer;
pub use batch_processor::{App, RunStats};
