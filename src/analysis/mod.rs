mod client;
mod error;
pub mod response;

pub use client::AnalysisClient;
#[cfg(test)]
pub use client::ANALYZE_PATH;
pub use error::AnalysisError;
