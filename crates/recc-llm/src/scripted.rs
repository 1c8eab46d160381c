//! A deterministic collaborator test double.
//!
//! Serves responses from a queue, optionally failing on scripted turns.
//! Used by the test harness and by offline runs where no API key is
//! available.

use crate::collaborator::{CollabError, CollabResult, Collaborator};
use std::collections::VecDeque;
use std::sync::Mutex;

/// One scripted turn.
#[derive(Clone, Debug)]
pub enum ScriptedTurn {
    Reply(String),
    Fail(String),
}

pub struct ScriptedCollaborator {
    turns: Mutex<VecDeque<ScriptedTurn>>,
    /// What to answer once the script runs out. `None` means error.
    fallback: Option<String>,
    calls: Mutex<Vec<(String, bool)>>,
}

impl ScriptedCollaborator {
    pub fn new() -> Self {
        Self {
            turns: Mutex::new(VecDeque::new()),
            fallback: None,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Every call answers with the same canned text. Handy for long runs.
    pub fn echoing(fallback: impl Into<String>) -> Self {
        Self {
            turns: Mutex::new(VecDeque::new()),
            fallback: Some(fallback.into()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn push_reply(&self, text: impl Into<String>) {
        self.turns
            .lock()
            .expect("scripted turns poisoned")
            .push_back(ScriptedTurn::Reply(text.into()));
    }

    pub fn push_failure(&self, message: impl Into<String>) {
        self.turns
            .lock()
            .expect("scripted turns poisoned")
            .push_back(ScriptedTurn::Fail(message.into()));
    }

    /// (prompt, reset_history) pairs in call order.
    pub fn calls(&self) -> Vec<(String, bool)> {
        self.calls.lock().expect("scripted calls poisoned").clone()
    }
}

impl Default for ScriptedCollaborator {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl Collaborator for ScriptedCollaborator {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn generate(&self, prompt: &str, reset_history: bool) -> CollabResult<String> {
        self.calls
            .lock()
            .expect("scripted calls poisoned")
            .push((prompt.to_string(), reset_history));

        let next = self
            .turns
            .lock()
            .expect("scripted turns poisoned")
            .pop_front();

        match next {
            Some(ScriptedTurn::Reply(text)) => Ok(text),
            Some(ScriptedTurn::Fail(message)) => Err(CollabError::RequestFailed(message)),
            None => match &self.fallback {
                Some(text) => Ok(text.clone()),
                None => Err(CollabError::Exhausted),
            },
        }
    }
}
