use std::io::{self, BufRead};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{anyhow, Result};
use serde_json::json;

use moonshot::config::Config;
use moonshot::engine::state::DashboardState;
use moonshot::logging::{self, obj, v_str, Domain, Journal, Level};
use moonshot::runtime::{Runtime, RuntimeHandle};
use moonshot::script::{parse_line, ScriptStep};
use moonshot::view;

#[tokio::main]
async fn main() -> Result<()> {
    let cfg = Config::from_env();
    let started = Instant::now();

    logging::log(
        Level::Info,
        Domain::System,
        "config",
        obj(&[
            ("revision", v_str(cfg.revision.as_str())),
            ("seed", json!(cfg.seed)),
            ("chatter_ms", json!(cfg.reducer.chatter_interval_ms)),
        ]),
    );

    let mut runtime = Runtime::new(DashboardState::new(cfg.revision), cfg.reducer.clone(), cfg.rng());
    if let Some(dir) = &cfg.journal_dir {
        let journal = Journal::open(dir, logging::run_id())?;
        eprintln!("journal: {}", journal.path().display());
        runtime = runtime.with_journal(journal);
    }

    let handle = runtime.handle();
    let latest = Arc::new(Mutex::new(String::new()));

    let reader_latest = Arc::clone(&latest);
    thread::spawn(move || read_console(handle, reader_latest));

    let render_latest = Arc::clone(&latest);
    let (state, stats) = runtime
        .run(move |state: &DashboardState| {
            let text = view::render(state);
            println!("{}", text);
            if let Ok(mut slot) = render_latest.lock() {
                *slot = text;
            }
        })
        .await?;

    logging::log_session_summary(
        started.elapsed().as_secs(),
        stats.events,
        state.terminal.appended(),
        state.equity.deploys(),
        state.equity.last().pnl,
        stats.timers_cancelled,
    );
    Ok(())
}

/// Blocking stdin loop; runs on its own thread and feeds the runtime.
fn read_console(handle: RuntimeHandle, latest: Arc<Mutex<String>>) {
    let stdin = io::stdin();
    for line in stdin.lock().lines() {
        let Ok(line) = line else { break };
        let step = match parse_line(&line) {
            Ok(Some(step)) => step,
            Ok(None) => continue,
            Err(err) => {
                eprintln!("{}", err);
                continue;
            }
        };
        let sent = match step {
            ScriptStep::Invoke(action) => handle.invoke(action),
            ScriptStep::Select(tool) => handle.select(&tool),
            ScriptStep::Wait(ms) => {
                thread::sleep(Duration::from_millis(ms));
                Ok(())
            }
            // Blocks until every action queued so far has settled.
            ScriptStep::Settle => handle.settled().and_then(|rx| {
                rx.blocking_recv().map_err(|_| anyhow!("runtime stopped"))
            }),
            ScriptStep::Show => {
                if let Ok(text) = latest.lock() {
                    println!("{}", text);
                }
                Ok(())
            }
            ScriptStep::Quit => break,
        };
        if sent.is_err() {
            return;
        }
    }
    let _ = handle.teardown();
}
