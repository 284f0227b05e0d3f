pub mod analysis_ctx;
pub mod analysis_flow;

pub use analysis_ctx::AnalysisCtx;
pub use analysis_flow::AnalysisFlow;
