//! Meta-memory: memory about how memory is performing.
//!
//! Three observation levels: level 1 records per-cycle stage outcomes,
//! level 2 aggregates every `fan_in` level-1 records into a pattern,
//! level 3 aggregates every `fan_in` level-2 patterns into a trend.
//! Adaptation recommendations come out tagged with the level that
//! produced them; higher levels carry higher priority.

use super::ProcessResult;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Per-cycle observation (level 1).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct UsageRecord {
    pub attention: f64,
    pub retrieval_strength: f64,
    pub strategy_relevance: f64,
}

/// Aggregate over a window of level-1 records (level 2).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct UsagePattern {
    pub mean_attention: f64,
    pub mean_retrieval: f64,
    pub mean_relevance: f64,
}

/// Direction over a window of level-2 patterns (level 3).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct UsageTrend {
    /// Signed slope of mean retrieval across the window.
    pub retrieval_slope: f64,
    pub attention_slope: f64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdaptationAction {
    IncreaseChunking,
    ExpandWorkingCapacity,
    ReweightStrategies,
    PromoteAbstraction,
    AddHierarchyLayer,
}

/// A recommended change, tagged with the meta level that produced it.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Adaptation {
    pub level: u8,
    /// Higher levels recommend with higher priority.
    pub priority: f64,
    pub action: AdaptationAction,
    pub description: String,
}

const RECORD_CAP: usize = 64;
const PATTERN_CAP: usize = 32;
const TREND_CAP: usize = 16;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MetaMemory {
    fan_in: usize,
    records: Vec<UsageRecord>,
    patterns: Vec<UsagePattern>,
    trends: Vec<UsageTrend>,
    /// Records seen since the last level-2 aggregation.
    pending_records: usize,
    /// Patterns seen since the last level-3 aggregation.
    pending_patterns: usize,
}

impl MetaMemory {
    pub fn new(fan_in: usize) -> Self {
        Self {
            fan_in: fan_in.max(1),
            records: Vec::new(),
            patterns: Vec::new(),
            trends: Vec::new(),
            pending_records: 0,
            pending_patterns: 0,
        }
    }

    pub fn records(&self) -> &[UsageRecord] {
        &self.records
    }

    pub fn patterns(&self) -> &[UsagePattern] {
        &self.patterns
    }

    pub fn trends(&self) -> &[UsageTrend] {
        &self.trends
    }

    /// Ingest one cycle's pipeline outcome, cascading aggregation
    /// upward when a level's fan-in fills.
    pub fn observe_process(&mut self, result: &ProcessResult) {
        self.records.push(UsageRecord {
            attention: result.attention,
            retrieval_strength: result.retrieval_strength,
            strategy_relevance: result.strategy_relevance,
        });
        truncate_front(&mut self.records, RECORD_CAP);
        self.pending_records += 1;

        if self.pending_records >= self.fan_in {
            self.pending_records = 0;
            let window = &self.records[self.records.len().saturating_sub(self.fan_in)..];
            let n = window.len() as f64;
            self.patterns.push(UsagePattern {
                mean_attention: window.iter().map(|r| r.attention).sum::<f64>() / n,
                mean_retrieval: window.iter().map(|r| r.retrieval_strength).sum::<f64>() / n,
                mean_relevance: window.iter().map(|r| r.strategy_relevance).sum::<f64>() / n,
            });
            truncate_front(&mut self.patterns, PATTERN_CAP);
            self.pending_patterns += 1;
            debug!(patterns = self.patterns.len(), "meta level 2 aggregated");
        }

        if self.pending_patterns >= self.fan_in {
            self.pending_patterns = 0;
            let window = &self.patterns[self.patterns.len().saturating_sub(self.fan_in)..];
            if let (Some(first), Some(last)) = (window.first(), window.last()) {
                self.trends.push(UsageTrend {
                    retrieval_slope: last.mean_retrieval - first.mean_retrieval,
                    attention_slope: last.mean_attention - first.mean_attention,
                });
                truncate_front(&mut self.trends, TREND_CAP);
                debug!(trends = self.trends.len(), "meta level 3 aggregated");
            }
        }
    }

    /// Derive adaptation recommendations from the current three levels.
    /// Sorted by priority, highest first.
    pub fn recommend_adaptations(&self) -> Vec<Adaptation> {
        let mut out = Vec::new();

        // Level 1: immediate tactical signals.
        if let Some(recent) = self.records.last() {
            if recent.attention < 0.3 {
                out.push(Adaptation {
                    level: 1,
                    priority: 0.3,
                    action: AdaptationAction::IncreaseChunking,
                    description: "attention dropped; chunk input harder".into(),
                });
            }
        }

        // Level 2: strategic signals over a window.
        if let Some(pattern) = self.patterns.last() {
            if pattern.mean_relevance < 0.4 {
                out.push(Adaptation {
                    level: 2,
                    priority: 0.6,
                    action: AdaptationAction::ReweightStrategies,
                    description: "strategy relevance weak over window".into(),
                });
            }
            if pattern.mean_attention > 0.8 {
                out.push(Adaptation {
                    level: 2,
                    priority: 0.5,
                    action: AdaptationAction::ExpandWorkingCapacity,
                    description: "sustained high attention load".into(),
                });
            }
        }

        // Level 3: architectural signals from trends.
        if let Some(trend) = self.trends.last() {
            if trend.retrieval_slope < -0.05 {
                out.push(Adaptation {
                    level: 3,
                    priority: 0.9,
                    action: AdaptationAction::AddHierarchyLayer,
                    description: "retrieval declining across windows".into(),
                });
            } else if trend.retrieval_slope > 0.1 {
                out.push(Adaptation {
                    level: 3,
                    priority: 0.7,
                    action: AdaptationAction::PromoteAbstraction,
                    description: "retrieval strengthening; consolidate upward".into(),
                });
            }
        }

        out.sort_by(|a, b| {
            b.priority
                .partial_cmp(&a.priority)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        out
    }
}

fn truncate_front<T>(v: &mut Vec<T>, cap: usize) {
    if v.len() > cap {
        let excess = v.len() - cap;
        v.drain(..excess);
    }
}
