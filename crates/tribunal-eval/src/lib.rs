pub mod aggregate;
mod history;
mod orchestrator;
pub mod validator;

pub use history::{EvaluationHistory, HISTORY_KEY};
pub use orchestrator::{EvaluationOutcome, Orchestrator, TracingFailureSink};
