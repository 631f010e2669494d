//! Structured logging for the dashboard client.
//!
//! Every record is a single JSON line on stdout. When `LOG_DIR` is set the
//! same lines are also appended to `LOG_DIR/<run_id>/events.jsonl` (info and
//! above) and `trace.jsonl` (trace/debug), so a long-running kiosk session can
//! be inspected after the fact.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use sha2::{Digest, Sha256};
use std::fs::{create_dir_all, File, OpenOptions};
use std::io::{self, BufWriter, Write};
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
    Fatal = 5,
}

impl Level {
    pub fn from_env() -> Self {
        match std::env::var("LOG_LEVEL").as_deref() {
            Ok("trace") => Level::Trace,
            Ok("debug") => Level::Debug,
            Ok("info") => Level::Info,
            Ok("warn") => Level::Warn,
            Ok("error") => Level::Error,
            Ok("fatal") => Level::Fatal,
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
            Level::Fatal => "fatal",
        }
    }
}

// =============================================================================
// Log Domains (categories for filtering)
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Domain {
    Widget,    // Generic fetch-and-render cycles
    Commute,   // Commute snapshot handling and classification
    Map,       // Route map mount/teardown
    Forms,     // Form submissions and item actions
    Dashboard, // Module loading, refresh and reload cycles
    Net,       // HTTP requests against the backend
    System,    // Startup and configuration
}

impl Domain {
    pub fn as_str(&self) -> &'static str {
        match self {
            Domain::Widget => "widget",
            Domain::Commute => "commute",
            Domain::Map => "map",
            Domain::Forms => "forms",
            Domain::Dashboard => "dashboard",
            Domain::Net => "net",
            Domain::System => "system",
        }
    }

    pub fn is_enabled(&self) -> bool {
        // LOG_DOMAINS is a comma-separated list or "all"
        match std::env::var("LOG_DOMAINS").as_deref() {
            Ok("all") | Err(_) => true,
            Ok(domains) => domains.split(',').any(|d| d.trim() == self.as_str()),
        }
    }
}

// =============================================================================
// Sequence counter and run context
// =============================================================================

static LOG_SEQ: AtomicU64 = AtomicU64::new(0);
static RUN_CONTEXT: OnceLock<RunContext> = OnceLock::new();

fn next_seq() -> u64 {
    LOG_SEQ.fetch_add(1, Ordering::SeqCst)
}

#[derive(Debug)]
struct RunContext {
    run_id: String,
    files: Option<RunFiles>,
}

/// Append-only sinks for one run directory.
#[derive(Debug)]
pub struct RunFiles {
    pub dir: PathBuf,
    events: Mutex<BufWriter<File>>,
    trace: Mutex<BufWriter<File>>,
}

impl RunFiles {
    /// Create `<base>/<run_id>/` with a manifest and the two jsonl sinks.
    pub fn open(base: &Path, run_id: &str) -> io::Result<Self> {
        let dir = base.join(run_id);
        create_dir_all(&dir)?;
        std::fs::write(
            dir.join("manifest.json"),
            json!({
                "run_id": run_id,
                "ts": ts_now(),
                "pid": process::id(),
                "log_dir": dir.to_string_lossy(),
            })
            .to_string(),
        )?;
        let open = |name: &str| {
            OpenOptions::new()
                .create(true)
                .append(true)
                .open(dir.join(name))
        };
        Ok(Self {
            events: Mutex::new(BufWriter::new(open("events.jsonl")?)),
            trace: Mutex::new(BufWriter::new(open("trace.jsonl")?)),
            dir,
        })
    }

    fn write(&self, level: Level, line: &str) {
        let sink = match level {
            Level::Trace | Level::Debug => &self.trace,
            _ => &self.events,
        };
        if let Ok(mut w) = sink.lock() {
            let _ = writeln!(w, "{}", line);
            let _ = w.flush();
        }
    }
}

fn ensure_run_context() -> &'static RunContext {
    RUN_CONTEXT.get_or_init(|| {
        let run_id = std::env::var("RUN_ID")
            .unwrap_or_else(|_| format!("r-{}-{}", ts_epoch_ms(), process::id()));
        let files = std::env::var("LOG_DIR").ok().and_then(|base| {
            RunFiles::open(Path::new(&base), &run_id)
                .map_err(|err| eprintln!("[log] failed to open run dir: {}", err))
                .ok()
        });
        RunContext { run_id, files }
    })
}

fn sanitize_fields(mut fields: Map<String, Value>) -> Map<String, Value> {
    let redacted = Value::String("[REDACTED]".to_string());
    for key in ["authorization", "Authorization", "cookie", "token"] {
        if fields.contains_key(key) {
            fields.insert(key.to_string(), redacted.clone());
        }
    }
    fields
}

fn split_fields(mut fields: Map<String, Value>) -> (Map<String, Value>, Map<String, Value>) {
    let mut top = Map::new();
    for key in ["widget", "container", "path", "msg"] {
        if let Some(value) = fields.remove(key) {
            top.insert(key.to_string(), value);
        }
    }
    (top, fields)
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

fn build_record(
    run_id: &str,
    level: Level,
    component: &str,
    event: &str,
    fields: Map<String, Value>,
) -> Value {
    let fields = sanitize_fields(fields);
    let (mut top, data) = split_fields(fields);

    let msg = top.remove("msg").unwrap_or(Value::String(String::new()));
    let mut entry = Map::new();
    entry.insert("ts".to_string(), json!(ts_now()));
    entry.insert("run_id".to_string(), json!(run_id));
    entry.insert("seq".to_string(), json!(next_seq()));
    entry.insert("lvl".to_string(), json!(level.as_str().to_uppercase()));
    entry.insert("component".to_string(), json!(component));
    entry.insert("event".to_string(), json!(event));
    entry.insert("msg".to_string(), msg);
    for (k, v) in top {
        entry.insert(k, v);
    }
    entry.insert("data".to_string(), Value::Object(data));
    Value::Object(entry)
}

fn emit_record(level: Level, component: &str, event: &str, fields: Map<String, Value>) {
    let ctx = ensure_run_context();
    let line = build_record(&ctx.run_id, level, component, event, fields).to_string();
    if let Some(files) = &ctx.files {
        files.write(level, &line);
    }
    println!("{}", line);
}

// =============================================================================
// Domain-Specific Logging Helpers
// =============================================================================

pub fn log_fetch(method: &str, path: &str, status: Option<u16>, elapsed_ms: f64) {
    log(
        Level::Debug,
        Domain::Net,
        "fetch",
        obj(&[
            ("method", v_str(method)),
            ("path", v_str(path)),
            ("status", status.map(|s| json!(s)).unwrap_or(Value::Null)),
            ("elapsed_ms", v_num(elapsed_ms)),
        ]),
    );
}

pub fn log_render(widget: &str, container: &str, outcome: &str, html: &str) {
    log(
        Level::Debug,
        Domain::Widget,
        "render",
        obj(&[
            ("widget", v_str(widget)),
            ("container", v_str(container)),
            ("outcome", v_str(outcome)),
            ("bytes", json!(html.len())),
            ("html_hash", v_str(&content_hash(html))),
        ]),
    );
}

pub fn log_widget_failure(widget: &str, path: &str, error: &str) {
    log(
        Level::Warn,
        Domain::Widget,
        "load_failed",
        obj(&[
            ("widget", v_str(widget)),
            ("path", v_str(path)),
            ("msg", v_str(error)),
        ]),
    );
}

/// Outcome tally for one dashboard pass
pub fn log_cycle_summary(cycle: &str, outcomes: &[(&str, usize)], elapsed_ms: f64) {
    let counts: Map<String, Value> = outcomes
        .iter()
        .map(|(k, v)| (k.to_string(), json!(v)))
        .collect();

    log(
        Level::Info,
        Domain::Dashboard,
        "cycle_summary",
        obj(&[
            ("cycle", v_str(cycle)),
            ("outcomes", Value::Object(counts)),
            ("elapsed_ms", v_num(elapsed_ms)),
        ]),
    );
}

// =============================================================================
// Utility Functions
// =============================================================================

/// Short sha256 fingerprint of rendered content
pub fn content_hash(input: &str) -> String {
    let digest = Sha256::digest(input.as_bytes());
    hex::encode(&digest[..8])
}

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

pub fn v_bool(b: bool) -> Value {
    Value::Bool(b)
}

// =============================================================================
// Profiling Scope
// =============================================================================

/// Timing scope that emits `elapsed_ms` on drop.
pub struct ProfileScope {
    domain: Domain,
    label: &'static str,
    context: Map<String, Value>,
    started: Instant,
}

impl ProfileScope {
    pub fn new(domain: Domain, label: &'static str) -> Self {
        Self::with_context(domain, label, &[])
    }

    pub fn with_context(domain: Domain, label: &'static str, fields: &[(&str, Value)]) -> Self {
        Self {
            domain,
            label,
            context: obj(fields),
            started: Instant::now(),
        }
    }

    pub fn elapsed_ms(&self) -> f64 {
        self.started.elapsed().as_secs_f64() * 1000.0
    }
}

impl Drop for ProfileScope {
    fn drop(&mut self) {
        let mut fields = std::mem::take(&mut self.context);
        fields.insert("label".to_string(), v_str(self.label));
        fields.insert("elapsed_ms".to_string(), v_num(self.elapsed_ms()));
        log(Level::Trace, self.domain, "profile", fields);
    }
}

// =============================================================================
// Tests
// =============================================================================
