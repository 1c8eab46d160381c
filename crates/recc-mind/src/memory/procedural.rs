//! Procedural memory: learned processing strategies.
//!
//! Each strategy carries keyword affinities and a success estimate.
//! Selection scores every strategy against the focused content and the
//! retrieval outcome; the winner's success estimate moves toward the
//! observed relevance, so strategy weights drift with use.

use super::terms;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// EWMA weight for the success estimate.
const SUCCESS_ALPHA: f64 = 0.9;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Strategy {
    pub name: String,
    pub keywords: Vec<String>,
    /// Running success estimate in [0,1].
    pub success: f64,
    pub uses: u32,
}

/// Which strategy ran and how well it fit.
#[derive(Clone, Debug)]
pub struct StrategyOutcome {
    pub strategy: String,
    pub relevance: f64,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ProceduralMemory {
    strategies: Vec<Strategy>,
}

impl ProceduralMemory {
    /// The four seed strategies every fresh agent starts with.
    pub fn with_defaults() -> Self {
        let seed = |name: &str, keywords: &[&str]| Strategy {
            name: name.to_string(),
            keywords: keywords.iter().map(|k| k.to_string()).collect(),
            success: 0.5,
            uses: 0,
        };
        Self {
            strategies: vec![
                seed("chunking", &["list", "group", "parts", "break", "steps"]),
                seed("association", &["like", "similar", "related", "connect", "between"]),
                seed("repetition", &["again", "recall", "repeat", "remember", "practice"]),
                seed("abstraction", &["pattern", "general", "concept", "structure", "principle"]),
            ],
        }
    }

    pub fn strategies(&self) -> &[Strategy] {
        &self.strategies
    }

    /// Pick and exercise the best-fitting strategy.
    pub fn apply(&mut self, focused: &str, retrieved: usize) -> StrategyOutcome {
        let content = terms(focused);
        let had_retrieval = retrieved > 0;

        let mut best_idx = 0;
        let mut best_score = f64::MIN;
        for (idx, strategy) in self.strategies.iter().enumerate() {
            let hits = strategy
                .keywords
                .iter()
                .filter(|k| content.contains(k.as_str()))
                .count();
            let keyword_fit = hits as f64 / strategy.keywords.len() as f64;
            // Retrieval context favors memory-linking strategies.
            let context = match (strategy.name.as_str(), had_retrieval) {
                ("association" | "abstraction", true) => 0.2,
                ("chunking" | "repetition", false) => 0.1,
                _ => 0.0,
            };
            let score = 0.5 * keyword_fit + 0.3 * strategy.success + context;
            if score > best_score {
                best_score = score;
                best_idx = idx;
            }
        }

        let relevance = best_score.clamp(0.0, 1.0);
        let winner = &mut self.strategies[best_idx];
        winner.uses += 1;
        winner.success = SUCCESS_ALPHA * winner.success + (1.0 - SUCCESS_ALPHA) * relevance;
        debug!(strategy = %winner.name, relevance, "strategy applied");

        StrategyOutcome {
            strategy: winner.name.clone(),
            relevance,
        }
    }

    /// Nudge one strategy's success estimate upward, for adaptations.
    pub fn boost(&mut self, name: &str, delta: f64) {
        if let Some(strategy) = self.strategies.iter_mut().find(|s| s.name == name) {
            strategy.success = (strategy.success + delta).clamp(0.0, 1.0);
        }
    }

    /// Pull success estimates back toward their mean. Applied when the
    /// meta level decides the weighting has drifted unproductively.
    pub fn normalize(&mut self) {
        if self.strategies.is_empty() {
            return;
        }
        let mean =
            self.strategies.iter().map(|s| s.success).sum::<f64>() / self.strategies.len() as f64;
        for strategy in &mut self.strategies {
            strategy.success = 0.5 * strategy.success + 0.5 * mean;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keyword_match_selects_matching_strategy() {
        let mut memory = ProceduralMemory::with_defaults();
        let outcome = memory.apply("general pattern structure emerging", 1);
        assert_eq!(outcome.strategy, "abstraction");
    }

    #[test]
    fn winner_success_moves_toward_relevance() {
        let mut memory = ProceduralMemory::with_defaults();
        let outcome = memory.apply("repeat and recall again and again", 0);
        assert_eq!(outcome.strategy, "repetition");
        let repetition = memory
            .strategies()
            .iter()
            .find(|s| s.name == "repetition")
            .unwrap();
        assert_eq!(repetition.uses, 1);
        assert!(repetition.success != 0.5);
    }

    #[test]
    fn boost_raises_and_clamps() {
        let mut memory = ProceduralMemory::with_defaults();
        memory.boost("chunking", 0.9);
        let chunking = memory
            .strategies()
            .iter()
            .find(|s| s.name == "chunking")
            .unwrap();
        assert_eq!(chunking.success, 1.0);
    }

    #[test]
    fn normalize_pulls_toward_mean() {
        let mut memory = ProceduralMemory::with_defaults();
        memory.boost("chunking", 0.5);
        memory.normalize();
        let spread = memory
            .strategies()
            .iter()
            .map(|s| s.success)
            .fold((f64::MAX, f64::MIN), |(lo, hi), s| (lo.min(s), hi.max(s)));
        assert!(spread.1 - spread.0 < 0.5);
    }
}
