pub mod contest;
pub mod findings;
pub mod job;
pub mod loaders;
pub mod session_log;
pub mod upload;

pub use contest::{ContestDataset, ContestUpload, ContestUploadReceipt, ContestValidation};
pub use findings::{Findings, IssueType, Level, MissingOval, OtherIssue, Sections};
pub use job::{AnalysisResults, Checkpoint, Job, JobResultsView, JobStatus, JobStatusView, SubmittedJob};
pub use loaders::load_contest_file;
pub use session_log::{LogRecord, SessionEventType, SessionLogEntry, SessionLogView};
pub use upload::{HealthStatus, ImageUploadReceipt, UploadedImage};
