//! Working memory: the attention-weighted short-term buffer.
//!
//! Incoming text is scored for attention, reduced to its informative
//! terms, and held in a small buffer. On overflow the lowest-attention
//! item is evicted. A sliding utilization window drives emergent
//! capacity growth (decided upstream in HybridMemory).

use super::{overlap, terms};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use tracing::debug;

/// How many recent utilization samples feed the growth decision.
const UTILIZATION_WINDOW: usize = 10;
/// Terms kept in a focused reduction.
const FOCUS_TERM_CAP: usize = 16;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct WorkingItem {
    pub content: String,
    pub attention: f64,
    pub cycle: u64,
}

/// What `attend` hands to the next pipeline stage.
#[derive(Clone, Debug)]
pub struct Focused {
    pub content: String,
    pub attention: f64,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct WorkingMemory {
    capacity: usize,
    items: Vec<WorkingItem>,
    utilization: VecDeque<f64>,
    evictions: u64,
}

impl WorkingMemory {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            items: Vec::new(),
            utilization: VecDeque::new(),
            evictions: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn evictions(&self) -> u64 {
        self.evictions
    }

    /// Score and admit one cycle's content, returning the focused
    /// reduction that downstream stages work with.
    pub fn attend(&mut self, text: &str, curiosity: f64, cycle: u64) -> Focused {
        let incoming = terms(text);

        // Novelty against what is already held.
        let max_overlap = self
            .items
            .iter()
            .map(|item| overlap(&incoming, &terms(&item.content)))
            .fold(0.0_f64, f64::max);
        let novelty = 1.0 - max_overlap;

        // Informativeness: fraction of words surviving the term filter.
        let word_count = text.split_whitespace().count().max(1);
        let informativeness = (incoming.len() as f64 / word_count as f64).min(1.0);

        let attention = (0.6 * novelty + 0.3 * informativeness + 0.1 * curiosity).clamp(0.0, 1.0);

        let content: String = incoming
            .iter()
            .take(FOCUS_TERM_CAP)
            .cloned()
            .collect::<Vec<_>>()
            .join(" ");

        self.items.push(WorkingItem {
            content: content.clone(),
            attention,
            cycle,
        });

        while self.items.len() > self.capacity {
            let weakest = self
                .items
                .iter()
                .enumerate()
                .min_by(|(_, a), (_, b)| {
                    a.attention
                        .partial_cmp(&b.attention)
                        .unwrap_or(std::cmp::Ordering::Equal)
                })
                .map(|(i, _)| i)
                .unwrap_or(0);
            let evicted = self.items.remove(weakest);
            self.evictions += 1;
            debug!(
                cycle,
                attention = evicted.attention,
                "working memory evicted weakest item"
            );
        }

        self.utilization
            .push_back(self.items.len() as f64 / self.capacity as f64);
        while self.utilization.len() > UTILIZATION_WINDOW {
            self.utilization.pop_front();
        }

        Focused { content, attention }
    }

    /// Mean utilization over the recent window. Zero before any cycle.
    pub fn recent_utilization(&self) -> f64 {
        if self.utilization.is_empty() {
            return 0.0;
        }
        self.utilization.iter().sum::<f64>() / self.utilization.len() as f64
    }

    /// Expand capacity; returns the new value.
    pub fn grow(&mut self, by: usize) -> usize {
        self.capacity += by;
        // Stale samples would keep re-triggering growth.
        self.utilization.clear();
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overflow_evicts_lowest_attention_item() {
        let mut wm = WorkingMemory::new(2);
        wm.attend("alpha beta gamma delta", 0.5, 0);
        wm.attend("epsilon zeta eta theta", 0.5, 1);
        // Near-duplicate of the first item scores low on novelty.
        wm.attend("alpha beta gamma delta", 0.5, 2);
        assert_eq!(wm.len(), 2);
        assert_eq!(wm.evictions(), 1);
    }

    #[test]
    fn utilization_reaches_one_when_full() {
        let mut wm = WorkingMemory::new(3);
        for cycle in 0..12 {
            wm.attend(&format!("distinct content item {}", cycle), 0.5, cycle);
        }
        assert!(wm.recent_utilization() > 0.99);
    }

    #[test]
    fn grow_raises_capacity_and_resets_window() {
        let mut wm = WorkingMemory::new(2);
        for cycle in 0..5 {
            wm.attend(&format!("thing number {}", cycle), 0.5, cycle);
        }
        assert_eq!(wm.grow(1), 3);
        assert_eq!(wm.recent_utilization(), 0.0);
    }

    #[test]
    fn focused_reduction_drops_stopword_noise() {
        let mut wm = WorkingMemory::new(4);
        let focused = wm.attend("I am at an odd threshold of momentum", 0.5, 0);
        assert!(focused.content.contains("threshold"));
        assert!(!focused.content.contains(" at "));
    }
}
