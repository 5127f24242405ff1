//! 核心编排层：智能体与名册、注册表、单次 run 状态、过程事件、主控循环

pub mod agent;
pub mod builder;
pub mod error;
pub mod events;
pub mod orchestrator;
pub mod registry;
pub mod state;

pub use agent::{Agent, AgentRoster};
pub use builder::{build_with_llm, create_llm_from_config, create_multi_agent};
pub use error::{BuildError, RunError, SchemaError, ToolError};
pub use events::OrchestratorEvent;
pub use orchestrator::{MultiAgent, DEFAULT_MAX_TURNS, MAX_TURNS_REACHED, NO_OUTPUT};
pub use registry::{AgentId, Registry};
pub use state::{RunOutcome, RunState, RunStatus};
