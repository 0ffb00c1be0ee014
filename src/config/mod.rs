pub mod env;
mod loader;

pub use env::{AnalysisConfig, AppConfig, DirectoryConfig};
pub use loader::load_config;
