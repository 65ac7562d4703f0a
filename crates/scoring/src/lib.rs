pub mod adapter;
pub mod error;
pub mod fallback;
pub mod llm;
pub mod rubric;

pub use adapter::ScoringAdapter;
pub use error::ScoringError;
pub use rubric::{ScoringInput, ScoringOutput, Tier};
