//! Pure reducer: (State, Event) -> (State, Vec<Command>)
//!
//! Every view-state transition happens here. Timers, terminal mirrors and
//! structured logs are requested as commands and executed by the driver, so
//! the whole action chain can be replayed without a clock.
//!
//! ## Action lifecycle
//!
//! | Step              | Trigger        | Effect                                   |
//! |-------------------|----------------|------------------------------------------|
//! | Idle → Pending    | `Invoke`       | "started" line, `Schedule` a ticket      |
//! | Pending → Settled | `Timer`        | result stored, "completed" line(s)       |
//! | Pending → dropped | `Teardown`     | `Cancel` for every outstanding ticket    |

use std::fmt;

use rand::Rng;
use serde_json::json;

use super::events::*;
use super::state::*;
use crate::catalog::CHATTER;
use crate::hypothesis::{EvolvedAlpha, ScenarioReport};
use crate::logging::{obj, v_num, v_str, Domain, Level};
use crate::terminal::{self, ClockZone};

/// Delays and clock settings for the reducer
#[derive(Debug, Clone, PartialEq)]
pub struct ReducerConfig {
    pub generate_ms: u64,
    pub simulate_ms: u64,
    pub evolve_ms: u64,
    pub deploy_ms: u64,
    /// 0 disables the idle swarm chatter
    pub chatter_interval_ms: u64,
    pub clock: ClockZone,
}

impl Default for ReducerConfig {
    fn default() -> Self {
        Self {
            generate_ms: 1_800,
            simulate_ms: 1_600,
            evolve_ms: 1_400,
            deploy_ms: 1_200,
            chatter_interval_ms: 0,
            clock: ClockZone::Local,
        }
    }
}

impl ReducerConfig {
    pub fn delay_for(&self, action: ActionKind) -> u64 {
        match action {
            ActionKind::Generate => self.generate_ms,
            ActionKind::Simulate => self.simulate_ms,
            ActionKind::Evolve => self.evolve_ms,
            ActionKind::Deploy => self.deploy_ms,
        }
    }
}

/// Why an event was accepted but had no effect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionRejected {
    /// Evolve needs a settled hypothesis to refine
    EvolveWithoutHypothesis,
    /// Generate is already pending
    GenerateInFlight,
    UnknownTool(String),
    /// The session was torn down
    TornDown,
}

impl fmt::Display for ActionRejected {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActionRejected::EvolveWithoutHypothesis => {
                write!(f, "evolve rejected: no causal hypothesis has been generated")
            }
            ActionRejected::GenerateInFlight => {
                write!(f, "generate rejected: a hypothesis is already being generated")
            }
            ActionRejected::UnknownTool(id) => write!(f, "unknown tool: {}", id),
            ActionRejected::TornDown => write!(f, "session torn down"),
        }
    }
}

impl std::error::Error for ActionRejected {}

/// Result of processing an event
#[derive(Debug)]
pub struct ReducerOutput {
    pub commands: Vec<Command>,
    pub rejected: Option<ActionRejected>,
    pub state_hash: u64,
}

/// Pure reducer function
pub fn reduce<R: Rng + ?Sized>(
    state: &mut DashboardState,
    event: Event,
    cfg: &ReducerConfig,
    rng: &mut R,
) -> ReducerOutput {
    let mut commands = Vec::new();

    // Rejected events leave the state untouched, counters included.
    if let Some(r) = check(state, &event) {
        let level = match r {
            ActionRejected::EvolveWithoutHypothesis | ActionRejected::UnknownTool(_) => Level::Warn,
            ActionRejected::GenerateInFlight | ActionRejected::TornDown => Level::Debug,
        };
        commands.push(Command::Log {
            level,
            domain: Domain::Action,
            event: "rejected",
            fields: obj(&[("event", v_str(event.name())), ("msg", v_str(&r.to_string()))]),
        });
        return ReducerOutput {
            commands,
            rejected: Some(r),
            state_hash: state.hash(),
        };
    }

    state.now = state.now.max(event.timestamp());
    state.seq += 1;

    match event {
        Event::User(UserEvent::Invoke { ts, action }) => {
            handle_invoke(state, ts, action, cfg, &mut commands)
        }
        Event::User(UserEvent::SelectTool { tool, .. }) => handle_select(state, tool, &mut commands),
        Event::Timer { ts, ticket } => handle_timer(state, ts, ticket, cfg, rng, &mut commands),
        Event::Sys(sys_event) => handle_sys_event(state, sys_event, cfg, &mut commands),
    }

    ReducerOutput {
        commands,
        rejected: None,
        state_hash: state.hash(),
    }
}

/// Decide whether `event` is rejected, without touching the state.
fn check(state: &DashboardState, event: &Event) -> Option<ActionRejected> {
    if state.torn_down {
        return Some(ActionRejected::TornDown);
    }
    match event {
        Event::User(UserEvent::Invoke { action: ActionKind::Generate, .. }) if state.is_generating => {
            Some(ActionRejected::GenerateInFlight)
        }
        Event::User(UserEvent::Invoke { action: ActionKind::Evolve, .. })
            if state.hypothesis.is_none() =>
        {
            Some(ActionRejected::EvolveWithoutHypothesis)
        }
        Event::User(UserEvent::SelectTool { tool, .. }) if state.revision.find_tool(tool).is_none() => {
            Some(ActionRejected::UnknownTool(tool.clone()))
        }
        _ => None,
    }
}

fn append(
    state: &mut DashboardState,
    ts: Timestamp,
    clock: ClockZone,
    source: &str,
    message: &str,
    commands: &mut Vec<Command>,
) {
    let line = terminal::line(ts, clock, source, message);
    state.terminal.append(line.clone());
    commands.push(Command::Append { line });
}

fn handle_invoke(
    state: &mut DashboardState,
    ts: Timestamp,
    action: ActionKind,
    cfg: &ReducerConfig,
    commands: &mut Vec<Command>,
) {
    let mut basis = None;
    match action {
        ActionKind::Generate => {
            state.is_generating = true;
            append(
                state,
                ts,
                cfg.clock,
                "Agent Swarm",
                "Thinking... generating causal hypothesis",
                commands,
            );
        }
        ActionKind::Simulate => {
            append(
                state,
                ts,
                cfg.clock,
                "Omniverse",
                "Spinning up counterfactual scenario simulation",
                commands,
            );
        }
        ActionKind::Evolve => {
            basis = state.hypothesis.clone();
            let edge = basis.as_ref().map(|h| h.edge.as_str()).unwrap_or_default();
            let msg = format!("Evolving {} across regimes", edge);
            append(state, ts, cfg.clock, "EvoAlpha", &msg, commands);
        }
        ActionKind::Deploy => {
            append(
                state,
                ts,
                cfg.clock,
                "Paper Desk",
                "Routing alpha to paper trading",
                commands,
            );
        }
    }

    let ticket = state.issue_ticket();
    let delay_ms = cfg.delay_for(action);
    state.pending.insert(
        ticket,
        PendingAction {
            action,
            invoked_at: ts,
            basis,
        },
    );
    commands.push(Command::Schedule { ticket, delay_ms });
    commands.push(Command::Log {
        level: Level::Info,
        domain: Domain::Action,
        event: "pending",
        fields: obj(&[
            ("action", v_str(action.as_str())),
            ("ticket", json!(ticket)),
            ("delay_ms", json!(delay_ms)),
        ]),
    });
    commands.push(Command::Render);
}

fn handle_select(state: &mut DashboardState, tool: String, commands: &mut Vec<Command>) {
    if state.active_tool != tool {
        commands.push(Command::Log {
            level: Level::Debug,
            domain: Domain::View,
            event: "select_tool",
            fields: obj(&[("from", v_str(&state.active_tool)), ("to", v_str(&tool))]),
        });
        state.active_tool = tool;
        commands.push(Command::Render);
    }
}

fn handle_timer<R: Rng + ?Sized>(
    state: &mut DashboardState,
    ts: Timestamp,
    ticket: Ticket,
    cfg: &ReducerConfig,
    rng: &mut R,
    commands: &mut Vec<Command>,
) {
    if let Some(pending) = state.pending.remove(&ticket) {
        settle(state, ts, ticket, pending, cfg, rng, commands);
        return;
    }

    if state.chatter_ticket == Some(ticket) {
        let (source, message) = CHATTER[rng.gen_range(0..CHATTER.len())];
        append(state, ts, cfg.clock, source, message, commands);
        arm_chatter(state, cfg, commands);
        commands.push(Command::Render);
        return;
    }

    // Cancelled or already-settled ticket that raced its cancellation.
    commands.push(Command::Log {
        level: Level::Debug,
        domain: Domain::Timer,
        event: "stale_ticket",
        fields: obj(&[("ticket", json!(ticket))]),
    });
}

fn settle<R: Rng + ?Sized>(
    state: &mut DashboardState,
    ts: Timestamp,
    ticket: Ticket,
    pending: PendingAction,
    cfg: &ReducerConfig,
    rng: &mut R,
    commands: &mut Vec<Command>,
) {
    let action = pending.action;
    let mut fields = obj(&[
        ("action", v_str(action.as_str())),
        ("ticket", json!(ticket)),
        ("latency_ms", json!(ts.saturating_sub(pending.invoked_at))),
    ]);

    match action {
        ActionKind::Generate => {
            let candidates = state.revision.candidates();
            if !candidates.is_empty() {
                let pick = candidates[rng.gen_range(0..candidates.len())].to_hypothesis();
                let validated = format!(
                    "Hypothesis validated → {} (persistence {})",
                    pick.edge, pick.persistence
                );
                let score = format!(
                    "Persistence score: {} • Regime-robust version ready",
                    pick.persistence
                );
                append(state, ts, cfg.clock, "CausalForge", &validated, commands);
                append(state, ts, cfg.clock, "CausalForge", &score, commands);
                fields.insert("edge".to_string(), v_str(&pick.edge));
                fields.insert("persistence".to_string(), v_num(pick.persistence));
                state.hypothesis = Some(pick);
            }
            state.is_generating = false;
        }
        ActionKind::Simulate => {
            let report = ScenarioReport::fixed();
            append(state, ts, cfg.clock, "Omniverse", &report.narrative, commands);
            state.scenario = Some(report);
        }
        ActionKind::Evolve => {
            if let Some(basis) = pending.basis.as_ref() {
                let evolved = EvolvedAlpha::derive(basis);
                let msg = format!(
                    "Evolved → {} (persistence {})",
                    evolved.edge, evolved.persistence
                );
                append(state, ts, cfg.clock, "EvoAlpha", &msg, commands);
                fields.insert("edge".to_string(), v_str(&evolved.edge));
                state.evolved = Some(evolved);
            }
        }
        ActionKind::Deploy => {
            let point = state.equity.deploy(rng);
            let msg = format!("Tick #{} • paper equity ${:.0}", point.time, point.pnl);
            append(state, ts, cfg.clock, "Paper Desk", &msg, commands);
            fields.insert("time".to_string(), json!(point.time));
            fields.insert("pnl".to_string(), v_num(point.pnl));
        }
    }

    commands.push(Command::Log {
        level: Level::Info,
        domain: Domain::Action,
        event: "settled",
        fields,
    });
    commands.push(Command::Render);
}

fn arm_chatter(state: &mut DashboardState, cfg: &ReducerConfig, commands: &mut Vec<Command>) {
    let ticket = state.issue_ticket();
    state.chatter_ticket = Some(ticket);
    commands.push(Command::Schedule {
        ticket,
        delay_ms: cfg.chatter_interval_ms,
    });
}

fn handle_sys_event(
    state: &mut DashboardState,
    event: SysEvent,
    cfg: &ReducerConfig,
    commands: &mut Vec<Command>,
) {
    match event {
        SysEvent::Boot { .. } => {
            if cfg.chatter_interval_ms > 0 && state.chatter_ticket.is_none() {
                arm_chatter(state, cfg, commands);
            }
            commands.push(Command::Log {
                level: Level::Info,
                domain: Domain::System,
                event: "boot",
                fields: obj(&[
                    ("revision", v_str(state.revision.as_str())),
                    ("chatter_ms", json!(cfg.chatter_interval_ms)),
                ]),
            });
            commands.push(Command::Render);
        }
        SysEvent::Teardown { .. } => {
            let mut cancelled = 0u64;
            let pending = std::mem::take(&mut state.pending);
            for ticket in pending.keys() {
                commands.push(Command::Cancel { ticket: *ticket });
                cancelled += 1;
            }
            if let Some(ticket) = state.chatter_ticket.take() {
                commands.push(Command::Cancel { ticket });
                cancelled += 1;
            }
            state.is_generating = false;
            state.torn_down = true;
            commands.push(Command::Log {
                level: Level::Info,
                domain: Domain::System,
                event: "teardown",
                fields: obj(&[
                    ("cancelled", json!(cancelled)),
                    ("dropped_actions", json!(pending.len())),
                ]),
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Revision;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn cfg() -> ReducerConfig {
        ReducerConfig {
            clock: ClockZone::Utc,
            ..Default::default()
        }
    }

    fn scheduled(out: &ReducerOutput) -> Vec<(Ticket, u64)> {
        out.commands
            .iter()
            .filter_map(|c| match c {
                Command::Schedule { ticket, delay_ms } => Some((*ticket, *delay_ms)),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_generate_pending_then_settled() {
        let mut state = DashboardState::new(Revision::Classic);
        let mut rng = StdRng::seed_from_u64(1);
        let cfg = cfg();

        let out = reduce(&mut state, Event::invoke(1_000, ActionKind::Generate), &cfg, &mut rng);
        assert!(out.rejected.is_none());
        assert!(state.is_generating);
        let sched = scheduled(&out);
        assert_eq!(sched.len(), 1);
        assert_eq!(sched[0].1, 1_800);
        assert!(state.terminal.latest().unwrap().contains("Agent Swarm: Thinking"));

        let ticket = sched[0].0;
        reduce(&mut state, Event::Timer { ts: 2_800, ticket }, &cfg, &mut rng);
        assert!(!state.is_generating);
        let hyp = state.hypothesis.clone().unwrap();
        assert!([0.96, 0.93, 0.97].contains(&hyp.persistence));
        assert!(state.terminal.get(1).unwrap().contains(&hyp.edge));
        assert!(state.is_idle());
    }

    #[test]
    fn test_generate_reentry_is_noop() {
        let mut state = DashboardState::new(Revision::Classic);
        let mut rng = StdRng::seed_from_u64(1);
        let cfg = cfg();

        reduce(&mut state, Event::invoke(0, ActionKind::Generate), &cfg, &mut rng);
        let before = state.clone();

        let out = reduce(&mut state, Event::invoke(5, ActionKind::Generate), &cfg, &mut rng);
        assert_eq!(out.rejected, Some(ActionRejected::GenerateInFlight));
        assert!(scheduled(&out).is_empty());
        assert_eq!(state, before);
        assert_eq!(out.state_hash, before.hash());
    }

    #[test]
    fn test_evolve_without_hypothesis_rejected() {
        let mut state = DashboardState::new(Revision::Classic);
        let mut rng = StdRng::seed_from_u64(1);
        let before = state.clone();

        let out = reduce(&mut state, Event::invoke(40, ActionKind::Evolve), &cfg(), &mut rng);
        assert_eq!(out.rejected, Some(ActionRejected::EvolveWithoutHypothesis));
        assert!(scheduled(&out).is_empty());
        assert_eq!(state, before);
        assert_eq!(state.fingerprint(), before.fingerprint());
    }

    #[test]
    fn test_evolve_uses_hypothesis_at_invocation() {
        let mut state = DashboardState::new(Revision::Extended);
        let mut rng = StdRng::seed_from_u64(3);
        let cfg = cfg();

        let out = reduce(&mut state, Event::invoke(0, ActionKind::Generate), &cfg, &mut rng);
        let gen = scheduled(&out)[0].0;
        reduce(&mut state, Event::Timer { ts: 1_800, ticket: gen }, &cfg, &mut rng);

        let out = reduce(&mut state, Event::invoke(2_000, ActionKind::Evolve), &cfg, &mut rng);
        let (evo, delay) = scheduled(&out)[0];
        assert_eq!(delay, 1_400);
        reduce(&mut state, Event::Timer { ts: 3_400, ticket: evo }, &cfg, &mut rng);

        let evolved = state.evolved.clone().unwrap();
        assert_eq!(evolved.parent_edge, "Options skew → Liquidity cascade");
        assert_eq!(evolved.persistence, 0.99);
    }

    #[test]
    fn test_double_deploy_queues_two() {
        let mut state = DashboardState::new(Revision::Extended);
        let mut rng = StdRng::seed_from_u64(9);
        let cfg = cfg();

        let a = scheduled(&reduce(&mut state, Event::invoke(0, ActionKind::Deploy), &cfg, &mut rng))[0].0;
        let b = scheduled(&reduce(&mut state, Event::invoke(1, ActionKind::Deploy), &cfg, &mut rng))[0].0;
        assert_ne!(a, b);
        assert_eq!(state.pending_count(ActionKind::Deploy), 2);

        reduce(&mut state, Event::Timer { ts: 1_200, ticket: a }, &cfg, &mut rng);
        reduce(&mut state, Event::Timer { ts: 1_201, ticket: b }, &cfg, &mut rng);
        assert_eq!(state.equity.len(), 3);
    }

    #[test]
    fn test_simulate_fixed_narrative() {
        let mut state = DashboardState::new(Revision::Classic);
        let mut rng = StdRng::seed_from_u64(2);
        let cfg = cfg();
        let out = reduce(&mut state, Event::invoke(0, ActionKind::Simulate), &cfg, &mut rng);
        let (t, delay) = scheduled(&out)[0];
        assert_eq!(delay, 1_600);
        reduce(&mut state, Event::Timer { ts: 1_600, ticket: t }, &cfg, &mut rng);
        assert_eq!(state.scenario, Some(ScenarioReport::fixed()));
    }

    #[test]
    fn test_teardown_cancels_everything() {
        let mut state = DashboardState::new(Revision::Classic);
        let mut rng = StdRng::seed_from_u64(4);
        let cfg = ReducerConfig {
            chatter_interval_ms: 3_000,
            ..cfg()
        };

        reduce(&mut state, Event::Sys(SysEvent::Boot { ts: 0 }), &cfg, &mut rng);
        let gen = scheduled(&reduce(&mut state, Event::invoke(1, ActionKind::Generate), &cfg, &mut rng))[0].0;
        reduce(&mut state, Event::invoke(2, ActionKind::Deploy), &cfg, &mut rng);

        let out = reduce(&mut state, Event::Sys(SysEvent::Teardown { ts: 3 }), &cfg, &mut rng);
        let cancelled = out
            .commands
            .iter()
            .filter(|c| matches!(c, Command::Cancel { .. }))
            .count();
        assert_eq!(cancelled, 3);
        assert!(state.pending.is_empty());
        assert!(state.chatter_ticket.is_none());
        assert!(!state.is_generating);

        // A timer that slipped past cancellation changes nothing.
        let before = state.clone();
        let out = reduce(&mut state, Event::Timer { ts: 1_801, ticket: gen }, &cfg, &mut rng);
        assert_eq!(out.rejected, Some(ActionRejected::TornDown));
        assert_eq!(state, before);
    }

    #[test]
    fn test_chatter_rearms() {
        let mut state = DashboardState::new(Revision::Classic);
        let mut rng = StdRng::seed_from_u64(5);
        let cfg = ReducerConfig {
            chatter_interval_ms: 2_500,
            ..cfg()
        };

        let out = reduce(&mut state, Event::Sys(SysEvent::Boot { ts: 0 }), &cfg, &mut rng);
        let (first, delay) = scheduled(&out)[0];
        assert_eq!(delay, 2_500);

        let before = state.terminal.appended();
        let out = reduce(&mut state, Event::Timer { ts: 2_500, ticket: first }, &cfg, &mut rng);
        assert_eq!(state.terminal.appended(), before + 1);
        let (second, _) = scheduled(&out)[0];
        assert_ne!(first, second);
        assert_eq!(state.chatter_ticket, Some(second));
    }

    #[test]
    fn test_stale_ticket_ignored() {
        let mut state = DashboardState::new(Revision::Classic);
        let mut rng = StdRng::seed_from_u64(6);
        let before = state.terminal.clone();
        let out = reduce(&mut state, Event::Timer { ts: 10, ticket: 999 }, &cfg(), &mut rng);
        assert!(out.rejected.is_none());
        assert_eq!(state.terminal, before);
    }

    #[test]
    fn test_select_tool() {
        let mut state = DashboardState::new(Revision::Classic);
        let mut rng = StdRng::seed_from_u64(6);
        let out = reduce(&mut state, Event::select(0, "evoalpha"), &cfg(), &mut rng);
        assert!(out.rejected.is_none());
        assert_eq!(state.active_tool, "evoalpha");

        let before = state.clone();
        let out = reduce(&mut state, Event::select(1, "papertrading"), &cfg(), &mut rng);
        assert_eq!(out.rejected, Some(ActionRejected::UnknownTool("papertrading".into())));
        assert_eq!(state, before);
    }

    #[test]
    fn test_seeded_replay_is_deterministic() {
        let run = |seed| {
            let mut state = DashboardState::new(Revision::Classic);
            let mut rng = StdRng::seed_from_u64(seed);
            let cfg = cfg();
            for i in 0..5u64 {
                let out = reduce(&mut state, Event::invoke(i, ActionKind::Deploy), &cfg, &mut rng);
                let t = scheduled(&out)[0].0;
                reduce(&mut state, Event::Timer { ts: i + 1_200, ticket: t }, &cfg, &mut rng);
            }
            state.hash()
        };
        assert_eq!(run(11), run(11));
    }
}
