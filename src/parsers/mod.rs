pub mod analysis_text;
pub mod contest_text;

pub use analysis_text::{parse_analysis_text, strip_markdown};
pub use contest_text::parse_contest_text;
