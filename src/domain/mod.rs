pub mod message;
pub mod types;

pub use message::{BusMessage, ElementId};
pub use types::{AnalysisResult, Settings, TrustLabel};
