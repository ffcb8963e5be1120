pub mod agent;
pub mod multi_agent;
pub mod router;

pub use agent::{AgentError, PromptRunner, RunOutcome, RunStatus, ToolAgent};
pub use multi_agent::MultiAgentCoordinator;
pub use router::{RouteDecision, RouterAgent, RouterCoordinator};
