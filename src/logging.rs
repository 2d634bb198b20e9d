//! Structured logging for the dashboard engine.
//!
//! Two outputs:
//! 1. Run logs: JSONL records under `LOG_DIR/<run_id>/` (events + trace),
//!    filtered by level and domain.
//! 2. Journal: a per-session mirror of every terminal line, so a session can
//!    be read back after the in-memory buffer has evicted it.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::fs::{create_dir_all, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::process;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, OnceLock};
use std::time::Instant;

// =============================================================================
// Log Levels
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Trace = 0,
    Debug = 1,
    Info = 2,
    Warn = 3,
    Error = 4,
}

impl Level {
    pub fn from_env() -> Self {
        match std::env::var("LOG_LEVEL").as_deref() {
            Ok("trace") => Level::Trace,
            Ok("debug") => Level::Debug,
            Ok("info") => Level::Info,
            Ok("warn") => Level::Warn,
            Ok("error") => Level::Error,
            _ => Level::Info,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Level::Trace => "trace",
            Level::Debug => "debug",
            Level::Info => "info",
            Level::Warn => "warn",
            Level::Error => "error",
        }
    }
}

// =============================================================================
// Log Domains
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Domain {
    Action,   // Invocations, settlements, rejections
    Timer,    // Scheduling, cancellation, stale firings
    Terminal, // Lines appended to the swarm terminal
    View,     // Tool selection, renders
    System,   // Boot, teardown, config
    Profile,  // Reducer timing
    Audit,    // State fingerprints
}

impl Domain {
    pub fn as_str(&self) -> &'static str {
        match self {
            Domain::Action => "action",
            Domain::Timer => "timer",
            Domain::Terminal => "terminal",
            Domain::View => "view",
            Domain::System => "system",
            Domain::Profile => "profile",
            Domain::Audit => "audit",
        }
    }

    pub fn is_enabled(&self) -> bool {
        // LOG_DOMAINS: comma-separated list or "all"
        match std::env::var("LOG_DOMAINS").as_deref() {
            Ok("all") | Err(_) => true,
            Ok(domains) => domains.split(',').any(|d| d.trim() == self.as_str()),
        }
    }
}

// =============================================================================
// Run context
// =============================================================================

static LOG_SEQ: AtomicU64 = AtomicU64::new(0);
static RUN_CONTEXT: OnceLock<RunContext> = OnceLock::new();

fn next_seq() -> u64 {
    LOG_SEQ.fetch_add(1, Ordering::SeqCst)
}

#[derive(Debug)]
struct RunContext {
    run_id: String,
    echo: bool,
    events: Option<Mutex<BufWriter<File>>>,
    trace: Option<Mutex<BufWriter<File>>>,
}

fn open_writer(path: PathBuf) -> Option<Mutex<BufWriter<File>>> {
    match File::create(&path) {
        Ok(f) => Some(Mutex::new(BufWriter::new(f))),
        Err(err) => {
            eprintln!("[log] failed to create {}: {}", path.display(), err);
            None
        }
    }
}

fn ensure_run_context() -> &'static RunContext {
    RUN_CONTEXT.get_or_init(|| {
        let run_id = std::env::var("RUN_ID")
            .unwrap_or_else(|_| format!("r-{}-{}", ts_epoch_ms(), process::id()));
        let echo = matches!(std::env::var("LOG_ECHO").as_deref(), Ok("1") | Ok("true"));
        let base = std::env::var("LOG_DIR").unwrap_or_else(|_| "out/runs".to_string());
        let mut run_dir = PathBuf::from(base);
        run_dir.push(&run_id);
        if let Err(err) = create_dir_all(&run_dir) {
            eprintln!("[log] failed to create run dir: {}", err);
        }

        let _ = std::fs::write(
            run_dir.join("manifest.json"),
            json!({
                "run_id": run_id,
                "ts": ts_now(),
                "pid": process::id(),
                "log_dir": run_dir.to_string_lossy(),
            })
            .to_string(),
        );

        RunContext {
            events: open_writer(run_dir.join("events.jsonl")),
            trace: open_writer(run_dir.join("trace.jsonl")),
            run_id,
            echo,
        }
    })
}

pub fn run_id() -> &'static str {
    &ensure_run_context().run_id
}

fn write_line(writer: &Option<Mutex<BufWriter<File>>>, line: &str) {
    if let Some(writer) = writer {
        if let Ok(mut w) = writer.lock() {
            let _ = writeln!(w, "{}", line);
            let _ = w.flush();
        }
    }
}

// =============================================================================
// Core logging functions
// =============================================================================

/// RFC3339 timestamp with milliseconds
pub fn ts_now() -> String {
    Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}

/// Epoch milliseconds
pub fn ts_epoch_ms() -> u64 {
    Utc::now().timestamp_millis() as u64
}

/// Emit a structured log entry
pub fn log(level: Level, domain: Domain, event: &str, fields: Map<String, Value>) {
    let min_level = Level::from_env();
    if level < min_level || !domain.is_enabled() {
        return;
    }
    emit_record(level, domain.as_str(), event, fields);
}

fn emit_record(level: Level, component: &str, event: &str, mut fields: Map<String, Value>) {
    let ctx = ensure_run_context();

    let msg = fields.remove("msg").unwrap_or(Value::String(String::new()));
    let mut entry = Map::new();
    entry.insert("ts".to_string(), json!(ts_now()));
    entry.insert("run_id".to_string(), json!(ctx.run_id.clone()));
    entry.insert("seq".to_string(), json!(next_seq()));
    entry.insert("lvl".to_string(), json!(level.as_str().to_uppercase()));
    entry.insert("component".to_string(), json!(component));
    entry.insert("event".to_string(), json!(event));
    entry.insert("msg".to_string(), msg);
    entry.insert("data".to_string(), Value::Object(fields));

    let line = Value::Object(entry).to_string();
    match level {
        Level::Trace | Level::Debug => write_line(&ctx.trace, &line),
        _ => write_line(&ctx.events, &line),
    }
    if ctx.echo {
        eprintln!("{}", line);
    }
}

// =============================================================================
// Audit + summary
// =============================================================================

/// Fingerprint of the view state at a point in the session.
pub fn log_audit(event_type: &str, seq: u64, state_hash: u64, fingerprint: &str) {
    log(
        Level::Info,
        Domain::Audit,
        event_type,
        obj(&[
            ("state_seq", json!(seq)),
            ("state_hash", v_str(&format!("{:016x}", state_hash))),
            ("fingerprint", v_str(fingerprint)),
        ]),
    );
}

/// Session summary on teardown
pub fn log_session_summary(
    duration_secs: u64,
    events: u64,
    terminal_lines: u64,
    deploys: u64,
    last_pnl: f64,
    cancelled_timers: u64,
) {
    log(
        Level::Info,
        Domain::System,
        "session_summary",
        obj(&[
            ("duration_secs", json!(duration_secs)),
            ("events", json!(events)),
            ("terminal_lines", json!(terminal_lines)),
            ("deploys", json!(deploys)),
            ("last_pnl", v_num(last_pnl)),
            ("cancelled_timers", json!(cancelled_timers)),
        ]),
    );
}

// =============================================================================
// Helpers
// =============================================================================

pub fn obj(pairs: &[(&str, Value)]) -> Map<String, Value> {
    let mut map = Map::new();
    for (k, v) in pairs {
        map.insert((*k).to_string(), v.clone());
    }
    map
}

pub fn v_str(s: &str) -> Value {
    Value::String(s.to_string())
}

pub fn v_num(n: f64) -> Value {
    json!(n)
}

// =============================================================================
// Profiling Scope
// =============================================================================

/// Emits structured timing on drop.
pub struct ProfileScope {
    label: &'static str,
    context: Option<Map<String, Value>>,
    started: Instant,
}

impl ProfileScope {
    pub fn with_context(label: &'static str, fields: &[(&str, Value)]) -> Self {
        Self {
            label,
            context: Some(obj(fields)),
            started: Instant::now(),
        }
    }
}

impl Drop for ProfileScope {
    fn drop(&mut self) {
        let elapsed_ms = self.started.elapsed().as_secs_f64() * 1000.0;
        let mut fields = self.context.take().unwrap_or_default();
        fields.insert("label".to_string(), v_str(self.label));
        fields.insert("elapsed_ms".to_string(), v_num(elapsed_ms));
        log(Level::Trace, Domain::Profile, "profile", fields);
    }
}

// =============================================================================
// Terminal journal
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JournalRecord {
    pub n: u64,
    pub line: String,
}

/// Append-only JSONL mirror of terminal lines for one session.
#[derive(Debug)]
pub struct Journal {
    path: PathBuf,
    written: u64,
    writer: BufWriter<File>,
}

impl Journal {
    pub fn open(base: &Path, session_id: &str) -> std::io::Result<Self> {
        let mut dir = PathBuf::from(base);
        dir.push(session_id);
        create_dir_all(&dir)?;
        let path = dir.join("terminal.jsonl");
        let file = File::create(&path)?;
        Ok(Self {
            path,
            written: 0,
            writer: BufWriter::new(file),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn written(&self) -> u64 {
        self.written
    }

    pub fn record(&mut self, line: &str) -> std::io::Result<()> {
        let rec = JournalRecord {
            n: self.written,
            line: line.to_string(),
        };
        let encoded = serde_json::to_string(&rec)?;
        writeln!(self.writer, "{}", encoded)?;
        self.writer.flush()?;
        self.written += 1;
        Ok(())
    }
}

/// Read a journal back, skipping malformed lines.
pub fn read_journal(path: &Path) -> std::io::Result<Vec<JournalRecord>> {
    let raw = std::fs::read_to_string(path)?;
    Ok(raw
        .lines()
        .filter_map(|l| serde_json::from_str(l).ok())
        .collect())
}

// =============================================================================
// Tests
// =============================================================================
