//! The agent runtime: cycle loop, configuration, versioned state
//! persistence, and the per-cycle observability bus.

pub mod agent;
pub mod bus;
pub mod config;
pub mod state;

pub use agent::{AgentStatus, ReccAgent};
pub use bus::ObservabilityBus;
pub use config::AgentConfig;
pub use state::{AgentState, InternalState, Snapshot, StateManager, STATE_VERSION};
