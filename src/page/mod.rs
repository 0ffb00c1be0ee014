mod document;
mod eligibility;
mod parse;
pub mod render;

pub use document::{ElementState, ProcessingGuard, ResultElement, ResultPage};
pub use eligibility::{eligibility, target, Candidate};
pub use parse::ResultScraper;
