//! Dashboard view state with deterministic hashing for replay validation.

use std::collections::BTreeMap;

use rand::Rng;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::events::{ActionKind, Ticket, Timestamp};
use crate::catalog::{Revision, DEFAULT_TOOL, DEPLOY_PNL_MAX, DEPLOY_PNL_MIN, SEED_LOG, SEED_PNL};
use crate::hypothesis::{CausalHypothesis, EvolvedAlpha, ScenarioReport};
use crate::terminal::LogBuffer;

/// Complete view state. Only the reducer mutates it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardState {
    /// Current logical time
    pub now: Timestamp,
    /// Events reduced so far
    pub seq: u64,
    pub revision: Revision,

    pub active_tool: String,
    /// Set while a generate is pending; blocks re-entry
    pub is_generating: bool,

    pub hypothesis: Option<CausalHypothesis>,
    pub scenario: Option<ScenarioReport>,
    pub evolved: Option<EvolvedAlpha>,
    pub equity: EquityCurve,

    pub terminal: LogBuffer,

    /// Actions waiting for their timer, by ticket
    pub pending: BTreeMap<Ticket, PendingAction>,
    pub chatter_ticket: Option<Ticket>,
    pub next_ticket: Ticket,

    pub torn_down: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingAction {
    pub action: ActionKind,
    pub invoked_at: Timestamp,
    /// Hypothesis captured at invocation (evolve only)
    pub basis: Option<CausalHypothesis>,
}

impl DashboardState {
    pub fn new(revision: Revision) -> Self {
        Self {
            now: 0,
            seq: 0,
            revision,
            active_tool: DEFAULT_TOOL.to_string(),
            is_generating: false,
            hypothesis: None,
            scenario: None,
            evolved: None,
            equity: EquityCurve::seeded(),
            terminal: LogBuffer::seeded(revision.log_cap(), SEED_LOG),
            pending: BTreeMap::new(),
            chatter_ticket: None,
            next_ticket: 1,
            torn_down: false,
        }
    }

    pub fn issue_ticket(&mut self) -> Ticket {
        let t = self.next_ticket;
        self.next_ticket += 1;
        t
    }

    pub fn pending_count(&self, action: ActionKind) -> usize {
        self.pending.values().filter(|p| p.action == action).count()
    }

    pub fn is_idle(&self) -> bool {
        self.pending.is_empty()
    }

    /// Fast hash of the replay-relevant fields.
    pub fn hash(&self) -> u64 {
        use std::collections::hash_map::DefaultHasher;
        use std::hash::{Hash, Hasher};

        let mut h = DefaultHasher::new();

        self.now.hash(&mut h);
        self.seq.hash(&mut h);
        self.active_tool.hash(&mut h);
        self.is_generating.hash(&mut h);
        self.torn_down.hash(&mut h);

        if let Some(hyp) = &self.hypothesis {
            hyp.edge.hash(&mut h);
            ((hyp.persistence * 1e8) as i64).hash(&mut h);
        }
        if let Some(evo) = &self.evolved {
            evo.edge.hash(&mut h);
        }
        self.scenario.is_some().hash(&mut h);

        // Equity (quantized to avoid float comparison issues)
        for p in self.equity.points() {
            p.time.hash(&mut h);
            ((p.pnl * 1e4) as i64).hash(&mut h);
        }

        for line in self.terminal.entries() {
            line.hash(&mut h);
        }
        for (ticket, p) in &self.pending {
            ticket.hash(&mut h);
            p.action.hash(&mut h);
        }

        h.finish()
    }

    /// Hex SHA-256 over the JSON form of the state.
    pub fn fingerprint(&self) -> String {
        let encoded = serde_json::to_vec(self).unwrap_or_default();
        hex::encode(Sha256::digest(&encoded))
    }
}

// =============================================================================
// Equity curve
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EquityPoint {
    pub time: u64,
    pub pnl: f64,
}

/// Append-only paper-trading equity series. Never empty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EquityCurve {
    points: Vec<EquityPoint>,
}

impl EquityCurve {
    pub fn seeded() -> Self {
        Self {
            points: vec![EquityPoint { time: 0, pnl: SEED_PNL }],
        }
    }

    pub fn points(&self) -> &[EquityPoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn last(&self) -> EquityPoint {
        self.points
            .last()
            .copied()
            .unwrap_or(EquityPoint { time: 0, pnl: SEED_PNL })
    }

    /// One paper-trading tick: previous pnl plus U[-8000, 37000).
    pub fn deploy<R: Rng + ?Sized>(&mut self, rng: &mut R) -> EquityPoint {
        let prev = self.last();
        let delta = rng.gen_range(DEPLOY_PNL_MIN..DEPLOY_PNL_MAX);
        let point = EquityPoint {
            time: self.points.len() as u64,
            pnl: prev.pnl + delta,
        };
        self.points.push(point);
        point
    }

    /// Deploy ticks applied since the seed point.
    pub fn deploys(&self) -> u64 {
        self.points.len().saturating_sub(1) as u64
    }
}
