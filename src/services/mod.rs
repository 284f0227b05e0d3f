pub mod session_logger;
pub mod vision_service;

pub use session_logger::SessionLogger;
pub use vision_service::{OpenAiVision, VisionModel, VisionSettings};
