pub mod bandit;
pub mod feedback;
pub mod orchestrator;
pub mod scorer;
pub mod shutdown;

pub use feedback::FeedbackWorker;
pub use orchestrator::OrchestratorWorker;
pub use scorer::ScorerWorker;
