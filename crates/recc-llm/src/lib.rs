//! External collaborator contract for RECC.
//!
//! The agent consumes the language model as an opaque
//! `generate(prompt, reset_history) -> text` call. Failures are
//! recoverable; the calling cycle degrades to an internal behavior.

pub mod anthropic;
pub mod collaborator;
pub mod scripted;

pub use anthropic::AnthropicCollaborator;
pub use collaborator::{CollabError, CollabResult, Collaborator};
pub use scripted::ScriptedCollaborator;
