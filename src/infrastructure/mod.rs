pub mod job_store;
pub mod upload_store;

pub use job_store::JobStore;
pub use upload_store::UploadStore;
