//! Per-file ingestion outcomes and the observers that receive them.
//!
//! The pipeline reports every file it touches exactly once: [`IngestionObserver::on_success`]
//! with row counts, or [`IngestionObserver::on_failure`] with a severity. A failure whose
//! severity reaches `IngestionOptions::alert_at_or_above` is also sent to
//! [`IngestionObserver::on_alert`].

use std::fmt;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::error::IngestionError;

use super::decode::IngestionFormat;

/// How bad a reported failure is. Ordered, so it can be compared against an alert threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum IngestionSeverity {
    /// Informational event.
    Info,
    /// Non-fatal event.
    Warning,
    /// The file was rejected, and with it the whole call.
    Error,
    /// The file could not even be read.
    Critical,
}

impl IngestionSeverity {
    /// Severity assigned to a pipeline error. Only I/O failures are critical; everything else
    /// is a problem with the file's content.
    pub fn of(error: &IngestionError) -> Self {
        match error {
            IngestionError::Io(_) => IngestionSeverity::Critical,
            IngestionError::Format { .. }
            | IngestionError::SchemaMismatch { .. }
            | IngestionError::Type { .. }
            | IngestionError::UnknownColumn { .. } => IngestionSeverity::Error,
        }
    }

    fn label(self) -> &'static str {
        match self {
            IngestionSeverity::Info => "info",
            IngestionSeverity::Warning => "warning",
            IngestionSeverity::Error => "error",
            IngestionSeverity::Critical => "critical",
        }
    }
}

impl fmt::Display for IngestionSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Which file an event is about.
#[derive(Debug, Clone)]
pub struct IngestionContext {
    /// Declared file name.
    pub file: String,
    /// Format used for decoding; `None` if it could not be determined.
    pub format: Option<IngestionFormat>,
}

impl IngestionContext {
    /// `csv`, `excel`, or `unknown` when dispatch failed before a format was chosen.
    pub fn format_label(&self) -> &'static str {
        match self.format {
            Some(IngestionFormat::Csv) => "csv",
            Some(IngestionFormat::Excel) => "excel",
            None => "unknown",
        }
    }
}

/// Row counts for one successfully ingested file (summed over sheets).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IngestionStats {
    /// Rows kept after cleaning.
    pub rows: usize,
    /// Rows dropped for lacking a `Code`.
    pub dropped_rows: usize,
}

/// Receives per-file outcomes from the pipeline.
///
/// Every method has a no-op default, so an implementor only overrides what it cares about.
pub trait IngestionObserver: Send + Sync {
    /// Called when a file is ingested successfully.
    fn on_success(&self, _ctx: &IngestionContext, _stats: IngestionStats) {}

    /// Called when a file fails.
    fn on_failure(&self, _ctx: &IngestionContext, _severity: IngestionSeverity, _error: &IngestionError) {}

    /// Called after [`Self::on_failure`] when the severity meets the alert threshold.
    fn on_alert(&self, _ctx: &IngestionContext, _severity: IngestionSeverity, _error: &IngestionError) {}
}

/// Forwards every event to each of its observers, in order.
#[derive(Default)]
pub struct CompositeObserver {
    observers: Vec<Arc<dyn IngestionObserver>>,
}

impl CompositeObserver {
    /// Fan out to `observers`.
    pub fn new(observers: Vec<Arc<dyn IngestionObserver>>) -> Self {
        Self { observers }
    }

    /// Add one more observer.
    pub fn with(mut self, observer: Arc<dyn IngestionObserver>) -> Self {
        self.observers.push(observer);
        self
    }

    /// Number of observers events are forwarded to.
    pub fn len(&self) -> usize {
        self.observers.len()
    }

    /// `true` when events go nowhere.
    pub fn is_empty(&self) -> bool {
        self.observers.is_empty()
    }
}

impl fmt::Debug for CompositeObserver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompositeObserver")
            .field("observers", &self.observers.len())
            .finish()
    }
}

impl IngestionObserver for CompositeObserver {
    fn on_success(&self, ctx: &IngestionContext, stats: IngestionStats) {
        self.observers.iter().for_each(|o| o.on_success(ctx, stats));
    }

    fn on_failure(&self, ctx: &IngestionContext, severity: IngestionSeverity, error: &IngestionError) {
        self.observers.iter().for_each(|o| o.on_failure(ctx, severity, error));
    }

    fn on_alert(&self, ctx: &IngestionContext, severity: IngestionSeverity, error: &IngestionError) {
        self.observers.iter().for_each(|o| o.on_alert(ctx, severity, error));
    }
}

/// One observer callback, rendered as a single `key=value` log line by the text observers.
enum Event<'a> {
    Ingested(IngestionStats),
    Rejected(IngestionSeverity, &'a IngestionError),
    Alert(IngestionSeverity, &'a IngestionError),
}

impl Event<'_> {
    fn render(&self, ctx: &IngestionContext) -> String {
        let (file, format) = (&ctx.file, ctx.format_label());
        match self {
            Event::Ingested(stats) => format!(
                "ingested file={file} format={format} rows={} dropped={}",
                stats.rows, stats.dropped_rows
            ),
            Event::Rejected(severity, error) => {
                format!("rejected file={file} format={format} severity={severity} error={error}")
            }
            Event::Alert(severity, error) => {
                format!("ALERT file={file} format={format} severity={severity} error={error}")
            }
        }
    }
}

/// Prints one line per event to stderr.
#[derive(Debug, Default)]
pub struct StdErrObserver;

impl StdErrObserver {
    fn emit(&self, ctx: &IngestionContext, event: Event<'_>) {
        eprintln!("[lb-budget] {}", event.render(ctx));
    }
}

impl IngestionObserver for StdErrObserver {
    fn on_success(&self, ctx: &IngestionContext, stats: IngestionStats) {
        self.emit(ctx, Event::Ingested(stats));
    }

    fn on_failure(&self, ctx: &IngestionContext, severity: IngestionSeverity, error: &IngestionError) {
        self.emit(ctx, Event::Rejected(severity, error));
    }

    fn on_alert(&self, ctx: &IngestionContext, severity: IngestionSeverity, error: &IngestionError) {
        self.emit(ctx, Event::Alert(severity, error));
    }
}

/// Emits `tracing` events: `info` on success, `warn` on failure, `error` on alert.
#[derive(Debug, Default)]
pub struct TracingObserver;

impl IngestionObserver for TracingObserver {
    fn on_success(&self, ctx: &IngestionContext, stats: IngestionStats) {
        tracing::info!(
            file = %ctx.file,
            format = ctx.format_label(),
            rows = stats.rows,
            dropped_rows = stats.dropped_rows,
            "file ingested"
        );
    }

    fn on_failure(&self, ctx: &IngestionContext, severity: IngestionSeverity, error: &IngestionError) {
        tracing::warn!(file = %ctx.file, format = ctx.format_label(), %severity, %error, "file rejected");
    }

    fn on_alert(&self, ctx: &IngestionContext, severity: IngestionSeverity, error: &IngestionError) {
        tracing::error!(file = %ctx.file, format = ctx.format_label(), %severity, %error, "ingestion alert");
    }
}

/// Appends timestamped event lines to a log file.
///
/// The file is opened on the first event and kept open. Logging is best-effort: if the file
/// cannot be opened or written, the event is lost and the next one retries the open.
#[derive(Debug)]
pub struct FileObserver {
    path: PathBuf,
    handle: Mutex<Option<File>>,
}

impl FileObserver {
    /// Log to `path`, creating it if needed.
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            handle: Mutex::new(None),
        }
    }

    /// Where events are written.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn emit(&self, ctx: &IngestionContext, event: Event<'_>) {
        let line = format!("{} {}", unix_ts(), event.render(ctx));
        let mut slot = self.handle.lock().unwrap_or_else(|e| e.into_inner());
        if slot.is_none() {
            *slot = OpenOptions::new().create(true).append(true).open(&self.path).ok();
        }
        if let Some(file) = slot.as_mut() {
            if writeln!(file, "{line}").is_err() {
                *slot = None;
            }
        }
    }
}

impl IngestionObserver for FileObserver {
    fn on_success(&self, ctx: &IngestionContext, stats: IngestionStats) {
        self.emit(ctx, Event::Ingested(stats));
    }

    fn on_failure(&self, ctx: &IngestionContext, severity: IngestionSeverity, error: &IngestionError) {
        self.emit(ctx, Event::Rejected(severity, error));
    }

    fn on_alert(&self, ctx: &IngestionContext, severity: IngestionSeverity, error: &IngestionError) {
        self.emit(ctx, Event::Alert(severity, error));
    }
}

fn unix_ts() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}
