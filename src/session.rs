//! Virtual-time driver: reduces events and fires timers without a clock.

use rand::Rng;

use crate::catalog::Revision;
use crate::engine::emit_log;
use crate::engine::events::{ActionKind, Command, Event, SysEvent, Timestamp};
use crate::engine::reducer::{reduce, ActionRejected, ReducerConfig};
use crate::engine::state::DashboardState;
use crate::logging::{self, obj, v_str, Domain, Journal, Level};
use crate::scheduler::Scheduler;
use crate::script::ScriptStep;

pub struct Session<R: Rng> {
    state: DashboardState,
    cfg: ReducerConfig,
    rng: R,
    timers: Scheduler,
    now: Timestamp,
    /// Every terminal line appended this session, oldest first
    transcript: Vec<String>,
    rejections: Vec<ActionRejected>,
    renders: u64,
    cancelled: u64,
    journal: Option<Journal>,
}

impl<R: Rng> Session<R> {
    pub fn new(revision: Revision, cfg: ReducerConfig, rng: R, start: Timestamp) -> Self {
        let mut state = DashboardState::new(revision);
        state.now = start;
        Self {
            state,
            cfg,
            rng,
            timers: Scheduler::new(),
            now: start,
            transcript: Vec::new(),
            rejections: Vec::new(),
            renders: 0,
            cancelled: 0,
            journal: None,
        }
    }

    pub fn with_journal(mut self, journal: Journal) -> Self {
        self.journal = Some(journal);
        self
    }

    pub fn state(&self) -> &DashboardState {
        &self.state
    }

    pub fn into_state(self) -> DashboardState {
        self.state
    }

    pub fn now(&self) -> Timestamp {
        self.now
    }

    pub fn transcript(&self) -> &[String] {
        &self.transcript
    }

    pub fn rejections(&self) -> &[ActionRejected] {
        &self.rejections
    }

    pub fn renders(&self) -> u64 {
        self.renders
    }

    pub fn cancelled(&self) -> u64 {
        self.cancelled
    }

    pub fn armed_timers(&self) -> usize {
        self.timers.len()
    }

    pub fn dispatch(&mut self, event: Event) -> Option<ActionRejected> {
        let out = reduce(&mut self.state, event, &self.cfg, &mut self.rng);
        for cmd in &out.commands {
            self.apply(cmd);
        }
        if let Some(r) = &out.rejected {
            self.rejections.push(r.clone());
        }
        out.rejected
    }

    pub fn boot(&mut self) {
        self.dispatch(Event::Sys(SysEvent::Boot { ts: self.now }));
    }

    pub fn invoke(&mut self, action: ActionKind) -> Option<ActionRejected> {
        self.dispatch(Event::invoke(self.now, action))
    }

    pub fn select(&mut self, tool: &str) -> Option<ActionRejected> {
        self.dispatch(Event::select(self.now, tool))
    }

    pub fn teardown(&mut self) {
        self.dispatch(Event::Sys(SysEvent::Teardown { ts: self.now }));
        logging::log_audit("teardown", self.state.seq, self.state.hash(), &self.state.fingerprint());
    }

    /// Move the clock forward, firing due timers at their own due time.
    /// The clock saturates at `u64::MAX`.
    pub fn advance(&mut self, ms: u64) {
        let until = self.now.saturating_add(ms);
        while let Some((at, ticket)) = self.timers.pop_due(until) {
            self.now = self.now.max(at);
            self.dispatch(Event::Timer { ts: self.now, ticket });
        }
        self.now = until;
    }

    /// Fire timers until no action is pending. Chatter alone does not keep
    /// the session busy.
    pub fn settle(&mut self) {
        while !self.state.pending.is_empty() {
            let Some(at) = self.timers.next_due() else {
                break;
            };
            let step = at.saturating_sub(self.now);
            self.advance(step);
        }
    }

    pub fn run_step(&mut self, step: &ScriptStep) -> Option<ActionRejected> {
        match step {
            ScriptStep::Invoke(action) => self.invoke(*action),
            ScriptStep::Select(tool) => self.select(tool),
            ScriptStep::Wait(ms) => {
                self.advance(*ms);
                None
            }
            ScriptStep::Settle => {
                self.settle();
                None
            }
            ScriptStep::Show => None,
            ScriptStep::Quit => {
                self.teardown();
                None
            }
        }
    }

    fn apply(&mut self, cmd: &Command) {
        match cmd {
            Command::Schedule { ticket, delay_ms } => {
                self.timers.schedule(*ticket, self.now.saturating_add(*delay_ms));
            }
            Command::Cancel { ticket } => {
                if self.timers.cancel(*ticket) {
                    self.cancelled += 1;
                }
            }
            Command::Append { line } => {
                self.transcript.push(line.clone());
                if let Some(journal) = self.journal.as_mut() {
                    if let Err(err) = journal.record(line) {
                        logging::log(
                            Level::Warn,
                            Domain::Terminal,
                            "journal_write_failed",
                            obj(&[("error", v_str(&err.to_string()))]),
                        );
                    }
                }
            }
            Command::Render => self.renders += 1,
            Command::Log { .. } => emit_log(cmd),
        }
    }
}
