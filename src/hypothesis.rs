//! Causal hypotheses and what the action chain derives from them.
//!
//! A hypothesis is immutable once generated. Refinement never edits it in
//! place: `EvolvedAlpha::derive` produces a new value.

use serde::{Deserialize, Serialize};

use crate::catalog::{EVOLVED_PERSISTENCE, EVOLVED_SUFFIX, SCENARIO_NARRATIVE};

/// A causal edge with a persistence score and the chain of nodes behind it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CausalHypothesis {
    pub edge: String,
    /// In [0, 1]
    pub persistence: f64,
    /// Linear chain, at least two nodes
    pub nodes: Vec<String>,
}

impl CausalHypothesis {
    /// Consecutive node pairs, in display order.
    pub fn links(&self) -> impl Iterator<Item = (&str, &str)> {
        self.nodes
            .windows(2)
            .map(|pair| (pair[0].as_str(), pair[1].as_str()))
    }

    /// Persistence as a whole percentage, e.g. 0.96 -> 96.
    pub fn persistence_pct(&self) -> u32 {
        (self.persistence * 100.0).round() as u32
    }
}

/// A hypothesis after a pass through the evolution factory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvolvedAlpha {
    pub edge: String,
    pub persistence: f64,
    pub nodes: Vec<String>,
    /// Edge of the hypothesis this was derived from
    pub parent_edge: String,
}

impl EvolvedAlpha {
    pub fn derive(parent: &CausalHypothesis) -> Self {
        Self {
            edge: format!("{}{}", parent.edge, EVOLVED_SUFFIX),
            persistence: EVOLVED_PERSISTENCE.max(parent.persistence),
            nodes: parent.nodes.clone(),
            parent_edge: parent.edge.clone(),
        }
    }
}

/// Outcome of a scenario simulation. Independent of the hypothesis content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScenarioReport {
    pub narrative: String,
}

impl ScenarioReport {
    pub fn fixed() -> Self {
        Self {
            narrative: SCENARIO_NARRATIVE.to_string(),
        }
    }
}
