//! Static catalog: tools, metric cards, hypothesis candidates and canned
//! swarm chatter.
//!
//! Everything here is literal data. Nothing in this module is mutated at
//! runtime; the reducer only ever reads from it.

use serde::{Deserialize, Serialize};

use crate::hypothesis::CausalHypothesis;

// =============================================================================
// Revisions
// =============================================================================

/// Which build of the dashboard is being driven.
///
/// - `Classic`: five tools, 8-line terminal, three hypothesis candidates
///   picked at random.
/// - `Extended`: adds the paper-trading tool, 12-line terminal, a single
///   fixed hypothesis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Revision {
    Classic,
    Extended,
}

impl Revision {
    pub fn from_env() -> Self {
        match std::env::var("REVISION").as_deref() {
            Ok("2") | Ok("extended") => Revision::Extended,
            _ => Revision::Classic,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Revision::Classic => "classic",
            Revision::Extended => "extended",
        }
    }

    pub fn log_cap(&self) -> usize {
        match self {
            Revision::Classic => 8,
            Revision::Extended => 12,
        }
    }

    pub fn tools(&self) -> &'static [ToolDescriptor] {
        match self {
            Revision::Classic => &TOOLS[..5],
            Revision::Extended => &TOOLS[..],
        }
    }

    pub fn candidates(&self) -> &'static [CandidateSpec] {
        match self {
            Revision::Classic => &CANDIDATES[..],
            Revision::Extended => &CANDIDATES[2..3],
        }
    }

    pub fn find_tool(&self, id: &str) -> Option<&'static ToolDescriptor> {
        self.tools().iter().find(|t| t.id == id)
    }
}

// =============================================================================
// Tools
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ToolDescriptor {
    pub id: &'static str,
    pub display_name: &'static str,
    pub icon: &'static str,
}

impl ToolDescriptor {
    /// Tab label: first word of the display name.
    pub fn tab_label(&self) -> &'static str {
        self.display_name
            .split_whitespace()
            .next()
            .unwrap_or(self.display_name)
    }
}

pub const DEFAULT_TOOL: &str = "causalforge";
pub const PAPER_TRADING_TOOL: &str = "papertrading";

static TOOLS: [ToolDescriptor; 6] = [
    ToolDescriptor { id: "shadowcrowd", display_name: "ShadowCrowd Oracle", icon: "eye" },
    ToolDescriptor { id: "causalforge", display_name: "CausalForge Engine", icon: "brain" },
    ToolDescriptor { id: "omniverse", display_name: "Financial Omniverse", icon: "globe" },
    ToolDescriptor { id: "evoalpha", display_name: "EvoAlpha Factory", icon: "zap" },
    ToolDescriptor { id: "liquidity", display_name: "Liquidity Teleporter", icon: "target" },
    ToolDescriptor { id: PAPER_TRADING_TOOL, display_name: "Paper Trading Desk", icon: "line-chart" },
];

// =============================================================================
// Metric cards
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetricCard {
    pub label: &'static str,
    pub value: &'static str,
}

pub const METRIC_CARDS: [MetricCard; 4] = [
    MetricCard { label: "PERSISTENCE", value: "94%" },
    MetricCard { label: "TODAY P&L", value: "+4.7%" },
    MetricCard { label: "CROWD RISK", value: "12%" },
    MetricCard { label: "NEW ALPHAS", value: "7" },
];

// =============================================================================
// Hypothesis candidates
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CandidateSpec {
    pub edge: &'static str,
    pub persistence: f64,
    pub nodes: &'static [&'static str],
}

impl CandidateSpec {
    pub fn to_hypothesis(&self) -> CausalHypothesis {
        CausalHypothesis {
            edge: self.edge.to_string(),
            persistence: self.persistence,
            nodes: self.nodes.iter().map(|n| n.to_string()).collect(),
        }
    }
}

static CANDIDATES: [CandidateSpec; 3] = [
    CandidateSpec {
        edge: "Dark-pool flow → ETF redemption",
        persistence: 0.96,
        nodes: &["Dark Pool", "ETF Flow", "Gamma", "Vol Spike", "SPX Return"],
    },
    CandidateSpec {
        edge: "Satellite shipping → Commodity momentum",
        persistence: 0.93,
        nodes: &["Satellite", "Shipping", "Inventory", "Oil", "Returns"],
    },
    CandidateSpec {
        edge: "Options skew → Liquidity cascade",
        persistence: 0.97,
        nodes: &["Options Skew", "HFT Flow", "Liquidity", "Unwind", "Drawdown"],
    },
];

// =============================================================================
// Fixed results
// =============================================================================

pub const SCENARIO_NARRATIVE: &str =
    "14M counterfactuals complete → edge survives 94% of stress regimes";

pub const EVOLVED_PERSISTENCE: f64 = 0.99;
pub const EVOLVED_SUFFIX: &str = " (regime-robust)";

pub const SEED_PNL: f64 = 1_000_000.0;
pub const DEPLOY_PNL_MIN: f64 = -8_000.0;
pub const DEPLOY_PNL_MAX: f64 = 37_000.0;

// =============================================================================
// Terminal seed + chatter
// =============================================================================

/// Lines the terminal shows before anything has been invoked, top to bottom.
pub const SEED_LOG: [&str; 5] = [
    "[14:51:03] CausalForge: New causal edge validated (persistence 0.97)",
    "[14:51:06] ShadowCrowd: 79% crowding detected — anti-crowd active",
    "[14:51:09] EvoAlpha: 5,281 strategies evolved → 134 survivors",
    "[14:51:12] Omniverse: 14M counterfactuals running",
    "[14:51:15] Liquidity Teleporter: Zero-impact path for $312M order",
];

/// (source, message) pairs the idle swarm emits on the chatter timer.
pub const CHATTER: [(&str, &str); 5] = [
    ("CausalForge", "New causal edge validated (persistence 0.97)"),
    ("ShadowCrowd", "79% crowding detected — anti-crowd active"),
    ("EvoAlpha", "5,281 strategies evolved → 134 survivors"),
    ("Omniverse", "14M counterfactuals running"),
    ("Liquidity Teleporter", "Zero-impact path for $312M order"),
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_revision_tool_sets() {
        assert_eq!(Revision::Classic.tools().len(), 5);
        assert_eq!(Revision::Extended.tools().len(), 6);
        assert!(Revision::Classic.find_tool(PAPER_TRADING_TOOL).is_none());
        assert!(Revision::Extended.find_tool(PAPER_TRADING_TOOL).is_some());
        assert!(Revision::Classic.find_tool(DEFAULT_TOOL).is_some());
    }

    #[test]
    fn test_candidates_are_linear_chains() {
        for rev in [Revision::Classic, Revision::Extended] {
            assert!(!rev.candidates().is_empty());
            for c in rev.candidates() {
                assert!(c.nodes.len() >= 2);
                assert!((0.0..=1.0).contains(&c.persistence));
            }
        }
        assert_eq!(Revision::Extended.candidates().len(), 1);
    }

    #[test]
    fn test_tab_label_is_first_word() {
        let tool = Revision::Classic.find_tool("liquidity").unwrap();
        assert_eq!(tool.tab_label(), "Liquidity");
    }

    #[test]
    fn test_seed_log_leads_with_causalforge() {
        assert!(SEED_LOG[0].starts_with("[14:51:03] CausalForge"));
        assert!(SEED_LOG[SEED_LOG.len() - 1].contains("Liquidity Teleporter"));
    }

    #[test]
    fn test_log_caps() {
        assert_eq!(Revision::Classic.log_cap(), 8);
        assert_eq!(Revision::Extended.log_cap(), 12);
    }
}
