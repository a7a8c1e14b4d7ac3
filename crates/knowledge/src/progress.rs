//! Progress reporting for ingestion runs.

use std::fmt;
use std::sync::Arc;
use std::time::Instant;

/// Ingestion phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Reading and cleaning source documents
    Load,
    Chunk,
    Embed,
    /// Writing vectors to the index
    Upsert,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Load => "load",
            Phase::Chunk => "chunk",
            Phase::Embed => "embed",
            Phase::Upsert => "upsert",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone)]
pub struct ProgressEvent {
    pub phase: Phase,

    /// Units done so far (documents, chunks, vectors)
    pub current: u64,

    /// Units expected, when known
    pub total: Option<u64>,

    pub message: String,

    /// Seconds since the reporter was created
    pub elapsed_secs: f64,
}

impl ProgressEvent {
    /// Percentage complete, when the total is known.
    pub fn percentage(&self) -> Option<f64> {
        self.total.map(|t| {
            if t > 0 {
                self.current as f64 / t as f64 * 100.0
            } else {
                100.0
            }
        })
    }

    /// One-line rendering, e.g. `[embed] 200/450 (44%) - batch 2`.
    pub fn format_simple(&self) -> String {
        let progress = match self.total {
            Some(total) => format!("{}/{}", self.current, total),
            None => self.current.to_string(),
        };
        let pct = self
            .percentage()
            .map(|p| format!(" ({:.0}%)", p))
            .unwrap_or_default();

        format!("[{}] {}{} - {}", self.phase, progress, pct, self.message)
    }
}

pub type ProgressCallback = Arc<dyn Fn(&ProgressEvent) + Send + Sync>;

/// Emits progress events to an optional callback and to `debug!` logs.
#[derive(Clone)]
pub struct ProgressReporter {
    callback: Option<ProgressCallback>,
    started: Instant,
}

impl Default for ProgressReporter {
    fn default() -> Self {
        Self::noop()
    }
}

impl ProgressReporter {
    pub fn new(callback: ProgressCallback) -> Self {
        Self {
            callback: Some(callback),
            started: Instant::now(),
        }
    }

    /// Reporter that only logs.
    pub fn noop() -> Self {
        Self {
            callback: None,
            started: Instant::now(),
        }
    }

    pub fn emit(&self, phase: Phase, current: u64, total: Option<u64>, message: impl Into<String>) {
        let event = ProgressEvent {
            phase,
            current,
            total,
            message: message.into(),
            elapsed_secs: self.started.elapsed().as_secs_f64(),
        };

        tracing::debug!(
            phase = %event.phase,
            current = event.current,
            total = ?event.total,
            elapsed_secs = event.elapsed_secs,
            "{}",
            event.message
        );

        if let Some(callback) = &self.callback {
            callback(&event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn test_format_simple() {
        let event = ProgressEvent {
            phase: Phase::Embed,
            current: 200,
            total: Some(400),
            message: "batch 2".to_string(),
            elapsed_secs: 1.0,
        };
        assert_eq!(event.format_simple(), "[embed] 200/400 (50%) - batch 2");

        let open_ended = ProgressEvent {
            total: None,
            ..event
        };
        assert_eq!(open_ended.format_simple(), "[embed] 200 - batch 2");
    }

    #[test]
    fn test_zero_total_is_complete() {
        let event = ProgressEvent {
            phase: Phase::Load,
            current: 0,
            total: Some(0),
            message: String::new(),
            elapsed_secs: 0.0,
        };
        assert_eq!(event.percentage(), Some(100.0));
    }

    #[test]
    fn test_callback_receives_events() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let reporter = ProgressReporter::new(Arc::new(move |event: &ProgressEvent| {
            sink.lock().unwrap().push(event.phase);
        }));

        reporter.emit(Phase::Load, 1, Some(2), "docs");
        reporter.emit(Phase::Upsert, 10, None, "vectors");

        assert_eq!(*seen.lock().unwrap(), vec![Phase::Load, Phase::Upsert]);
        ProgressReporter::noop().emit(Phase::Chunk, 1, None, "ignored");
    }
}
