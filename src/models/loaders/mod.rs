pub mod contest_loader;

pub use contest_loader::load_contest_file;
