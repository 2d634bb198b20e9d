//! Replay a command script in virtual time and print the transcript.
//!
//! Usage: scripted_session [script-file]
//! Without a file the built-in demo chain runs. SEED fixes the RNG.

use anyhow::{Context, Result};
use serde_json::json;

use moonshot::config::Config;
use moonshot::logging::Journal;
use moonshot::script::{demo_script, parse_script, ScriptStep};
use moonshot::session::Session;
use moonshot::view;

const START_TS: u64 = 1_771_080_663_000;

fn main() -> Result<()> {
    let cfg = Config::from_env();
    let src = match std::env::args().nth(1) {
        Some(path) => {
            std::fs::read_to_string(&path).with_context(|| format!("reading {}", path))?
        }
        None => demo_script(cfg.revision),
    };
    let steps = parse_script(&src)?;

    let mut session = Session::new(cfg.revision, cfg.reducer.clone(), cfg.rng(), START_TS);
    if let Some(dir) = &cfg.journal_dir {
        session = session.with_journal(Journal::open(dir, "scripted")?);
    }
    session.boot();

    for step in &steps {
        if let Some(rejected) = session.run_step(step) {
            println!("! {}", rejected);
        }
        if *step == ScriptStep::Show {
            println!("{}", view::render(session.state()));
        }
    }
    if !session.state().torn_down {
        session.teardown();
    }

    println!("--- transcript ({} lines)", session.transcript().len());
    for line in session.transcript() {
        println!("{}", line);
    }

    let state = session.state();
    println!(
        "{}",
        json!({
            "seq": state.seq,
            "hash": format!("{:016x}", state.hash()),
            "fingerprint": state.fingerprint(),
            "state": state,
        })
    );
    Ok(())
}
