//! Wall-clock driver on tokio.
//!
//! All reduction happens on the task that calls [`Runtime::run`]. Timers are
//! spawned sleep tasks that post `Event::Timer` back onto the same channel;
//! their join handles are kept per ticket so `Cancel` and shutdown abort
//! them instead of leaving callbacks dangling.
//!
//! Settle requests travel through the same inbox as events, so a request
//! sent after an invoke is answered only once that invoke has completed.

use std::collections::HashMap;

use anyhow::{anyhow, Result};
use rand::Rng;
use serde_json::json;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{sleep, Duration};

use crate::engine::emit_log;
use crate::engine::events::{ActionKind, Command, Event, SysEvent, Ticket, Timestamp};
use crate::engine::reducer::{reduce, ReducerConfig};
use crate::engine::state::DashboardState;
use crate::logging::{self, obj, v_str, Domain, Journal, Level, ProfileScope};

#[derive(Debug)]
enum Inbox {
    Event(Event),
    /// Answered once no action is pending
    WhenIdle(oneshot::Sender<()>),
}

/// Cloneable sender side handed to input sources.
#[derive(Debug, Clone)]
pub struct RuntimeHandle {
    tx: mpsc::UnboundedSender<Inbox>,
    clock: fn() -> Timestamp,
}

impl RuntimeHandle {
    pub fn send(&self, event: Event) -> Result<()> {
        self.tx
            .send(Inbox::Event(event))
            .map_err(|_| anyhow!("runtime stopped"))
    }

    /// Resolves when every action sent before this call has settled.
    /// Chatter does not count as pending. The receiver errors if the
    /// runtime tears down first.
    pub fn settled(&self) -> Result<oneshot::Receiver<()>> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(Inbox::WhenIdle(reply))
            .map_err(|_| anyhow!("runtime stopped"))?;
        Ok(rx)
    }

    pub fn invoke(&self, action: ActionKind) -> Result<()> {
        self.send(Event::invoke((self.clock)(), action))
    }

    pub fn select(&self, tool: &str) -> Result<()> {
        self.send(Event::select((self.clock)(), tool))
    }

    pub fn teardown(&self) -> Result<()> {
        self.send(Event::Sys(SysEvent::Teardown { ts: (self.clock)() }))
    }
}

/// Counters reported at the end of a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunStats {
    pub events: u64,
    pub rejected: u64,
    pub timers_spawned: u64,
    pub timers_cancelled: u64,
}

pub struct Runtime<R: Rng> {
    state: DashboardState,
    cfg: ReducerConfig,
    rng: R,
    clock: fn() -> Timestamp,
    tx: mpsc::UnboundedSender<Inbox>,
    rx: mpsc::UnboundedReceiver<Inbox>,
    timers: HashMap<Ticket, JoinHandle<()>>,
    idle_waiters: Vec<oneshot::Sender<()>>,
    journal: Option<Journal>,
    stats: RunStats,
}

impl<R: Rng> Runtime<R> {
    pub fn new(state: DashboardState, cfg: ReducerConfig, rng: R) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            state,
            cfg,
            rng,
            clock: logging::ts_epoch_ms,
            tx,
            rx,
            timers: HashMap::new(),
            idle_waiters: Vec::new(),
            journal: None,
            stats: RunStats::default(),
        }
    }

    pub fn with_clock(mut self, clock: fn() -> Timestamp) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_journal(mut self, journal: Journal) -> Self {
        self.journal = Some(journal);
        self
    }

    pub fn handle(&self) -> RuntimeHandle {
        RuntimeHandle {
            tx: self.tx.clone(),
            clock: self.clock,
        }
    }

    /// Boot, then reduce events until teardown. `on_render` sees the state
    /// after every event that changed something visible.
    pub async fn run<F>(mut self, mut on_render: F) -> Result<(DashboardState, RunStats)>
    where
        F: FnMut(&DashboardState),
    {
        let boot = Event::Sys(SysEvent::Boot { ts: (self.clock)() });
        self.step(boot, &mut on_render);

        while !self.state.torn_down {
            match self.rx.recv().await {
                Some(Inbox::Event(event)) => self.step(event, &mut on_render),
                Some(Inbox::WhenIdle(reply)) => self.idle_waiters.push(reply),
                None => break,
            }
            if self.state.is_idle() && !self.state.torn_down {
                for reply in self.idle_waiters.drain(..) {
                    let _ = reply.send(());
                }
            }
        }

        self.idle_waiters.clear();
        self.shutdown();
        logging::log_audit(
            "teardown",
            self.state.seq,
            self.state.hash(),
            &self.state.fingerprint(),
        );
        Ok((self.state, self.stats))
    }

    fn step<F: FnMut(&DashboardState)>(&mut self, event: Event, on_render: &mut F) {
        let out = {
            let _scope = ProfileScope::with_context("reduce", &[("event", v_str(event.name()))]);
            reduce(&mut self.state, event, &self.cfg, &mut self.rng)
        };
        self.stats.events += 1;
        if out.rejected.is_some() {
            self.stats.rejected += 1;
        }

        let mut rendered = false;
        for cmd in &out.commands {
            match cmd {
                Command::Schedule { ticket, delay_ms } => self.spawn_timer(*ticket, *delay_ms),
                Command::Cancel { ticket } => self.cancel_timer(*ticket),
                Command::Append { line } => self.mirror(line),
                Command::Render => rendered = true,
                Command::Log { .. } => emit_log(cmd),
            }
        }
        if rendered {
            on_render(&self.state);
        }
    }

    fn spawn_timer(&mut self, ticket: Ticket, delay_ms: u64) {
        self.timers.retain(|_, h| !h.is_finished());
        let tx = self.tx.clone();
        let clock = self.clock;
        let handle = tokio::spawn(async move {
            sleep(Duration::from_millis(delay_ms)).await;
            let _ = tx.send(Inbox::Event(Event::Timer { ts: clock(), ticket }));
        });
        self.timers.insert(ticket, handle);
        self.stats.timers_spawned += 1;
    }

    fn cancel_timer(&mut self, ticket: Ticket) {
        if let Some(handle) = self.timers.remove(&ticket) {
            if !handle.is_finished() {
                handle.abort();
                self.stats.timers_cancelled += 1;
            }
        }
    }

    fn mirror(&mut self, line: &str) {
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

    fn shutdown(&mut self) {
        let mut aborted = 0u64;
        for (_, handle) in self.timers.drain() {
            if !handle.is_finished() {
                handle.abort();
                aborted += 1;
            }
        }
        self.stats.timers_cancelled += aborted;
        logging::log(
            Level::Info,
            Domain::Timer,
            "shutdown",
            obj(&[("aborted", json!(aborted))]),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Revision;
    use crate::terminal::ClockZone;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn fixed_clock() -> Timestamp {
        1_771_080_663_000
    }

    fn runtime(rev: Revision) -> Runtime<StdRng> {
        let cfg = ReducerConfig {
            clock: ClockZone::Utc,
            ..Default::default()
        };
        Runtime::new(DashboardState::new(rev), cfg, StdRng::seed_from_u64(8)).with_clock(fixed_clock)
    }

    #[tokio::test(start_paused = true)]
    async fn test_generate_settles_after_delay() {
        let rt = runtime(Revision::Classic);
        let handle = rt.handle();
        let task = tokio::spawn(rt.run(|_| {}));

        handle.invoke(ActionKind::Generate).unwrap();
        sleep(Duration::from_millis(1_900)).await;
        handle.teardown().unwrap();

        let (state, stats) = task.await.unwrap().unwrap();
        let hyp = state.hypothesis.expect("hypothesis after settlement");
        assert!([0.96, 0.93, 0.97].contains(&hyp.persistence));
        assert!(state.terminal.get(1).unwrap().contains("CausalForge"));
        assert_eq!(stats.timers_spawned, 1);
        assert_eq!(stats.timers_cancelled, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_teardown_while_pending_aborts_timer() {
        let rt = runtime(Revision::Extended);
        let handle = rt.handle();
        let task = tokio::spawn(rt.run(|_| {}));

        handle.invoke(ActionKind::Generate).unwrap();
        handle.invoke(ActionKind::Deploy).unwrap();
        sleep(Duration::from_millis(100)).await;
        handle.teardown().unwrap();

        let (state, stats) = task.await.unwrap().unwrap();
        assert!(state.hypothesis.is_none());
        assert_eq!(state.equity.len(), 1);
        assert!(state.torn_down);
        assert_eq!(stats.timers_cancelled, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_settled_waits_for_queued_actions() {
        let rt = runtime(Revision::Extended);
        let handle = rt.handle();
        let task = tokio::spawn(rt.run(|_| {}));

        handle.invoke(ActionKind::Deploy).unwrap();
        handle.invoke(ActionKind::Generate).unwrap();
        handle.invoke(ActionKind::Deploy).unwrap();
        handle.settled().unwrap().await.unwrap();
        handle.teardown().unwrap();

        let (state, stats) = task.await.unwrap().unwrap();
        assert!(state.hypothesis.is_some());
        assert_eq!(state.equity.len(), 3);
        assert_eq!(stats.timers_cancelled, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_settled_errors_on_teardown() {
        let rt = runtime(Revision::Classic);
        let handle = rt.handle();
        let task = tokio::spawn(rt.run(|_| {}));

        handle.invoke(ActionKind::Generate).unwrap();
        let waiting = handle.settled().unwrap();
        handle.teardown().unwrap();

        assert!(waiting.await.is_err());
        let (state, _) = task.await.unwrap().unwrap();
        assert!(state.hypothesis.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_render_callback_sees_updates() {
        let rt = runtime(Revision::Extended);
        let handle = rt.handle();
        let (seen_tx, mut seen_rx) = mpsc::unbounded_channel();
        let task = tokio::spawn(rt.run(move |s: &DashboardState| {
            let _ = seen_tx.send(s.equity.len());
        }));

        handle.invoke(ActionKind::Deploy).unwrap();
        sleep(Duration::from_millis(1_300)).await;
        handle.teardown().unwrap();
        task.await.unwrap().unwrap();

        let mut lens = Vec::new();
        while let Ok(n) = seen_rx.try_recv() {
            lens.push(n);
        }
        assert_eq!(lens.first(), Some(&1));
        assert_eq!(lens.last(), Some(&2));
    }
}
