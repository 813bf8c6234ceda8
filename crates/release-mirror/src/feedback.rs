use std::sync::Mutex;

/// Final line of a pass that ran to completion.
pub const COMPLETION_SENTINEL: &str = "all sync tasks complete";

/// One human-readable progress line from a sync pass.
///
/// A pass ends with exactly one terminal line: [`Feedback::Complete`] when
/// every repo was processed, [`Feedback::Aborted`] when the pass gave up.
/// A stream that closes without either is an anomaly, and callers should
/// re-query record state instead of assuming success.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Feedback {
    /// Informational message (progress, status updates).
    Info(String),
    /// Something was skipped but the pass carried on.
    Warning(String),
    /// A repo or asset failed.
    Error(String),
    /// Every repo was processed.
    Complete,
    /// The pass stopped early.
    Aborted(String),
}

impl Feedback {
    pub fn info(msg: impl Into<String>) -> Self {
        Self::Info(msg.into())
    }

    pub fn warning(msg: impl Into<String>) -> Self {
        Self::Warning(msg.into())
    }

    pub fn error(msg: impl Into<String>) -> Self {
        Self::Error(msg.into())
    }

    /// True for the completion and abort sentinels.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Complete | Self::Aborted(_))
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error(_) | Self::Aborted(_))
    }
}

impl std::fmt::Display for Feedback {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Info(msg) => write!(f, "{msg}"),
            Self::Warning(msg) => write!(f, "warning: {msg}"),
            Self::Error(msg) => write!(f, "error: {msg}"),
            Self::Complete => f.write_str(COMPLETION_SENTINEL),
            Self::Aborted(msg) => write!(f, "sync failed: {msg}"),
        }
    }
}

/// Receives progress lines as a pass runs.
pub trait ProgressSink: Send + Sync {
    fn emit(&self, feedback: Feedback);
}

/// Streams progress to a channel, e.g. an HTTP response body. A dropped
/// receiver is ignored so the pass finishes even if the client leaves.
impl ProgressSink for tokio::sync::mpsc::UnboundedSender<Feedback> {
    fn emit(&self, feedback: Feedback) {
        let _ = self.send(feedback);
    }
}

/// Collects progress in memory.
impl ProgressSink for Mutex<Vec<Feedback>> {
    fn emit(&self, feedback: Feedback) {
        self.lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .push(feedback);
    }
}

/// Writes progress to the `tracing` log, for unattended passes.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl ProgressSink for LogSink {
    fn emit(&self, feedback: Feedback) {
        match &feedback {
            Feedback::Info(_) | Feedback::Complete => tracing::info!("{feedback}"),
            Feedback::Warning(_) => tracing::warn!("{feedback}"),
            Feedback::Error(_) | Feedback::Aborted(_) => tracing::error!("{feedback}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_prefixes() {
        assert_eq!(Feedback::info("msg").to_string(), "msg");
        assert_eq!(Feedback::warning("msg").to_string(), "warning: msg");
        assert_eq!(Feedback::error("msg").to_string(), "error: msg");
        assert_eq!(Feedback::Complete.to_string(), COMPLETION_SENTINEL);
        assert_eq!(
            Feedback::Aborted("timed out".into()).to_string(),
            "sync failed: timed out"
        );
    }

    #[test]
    fn terminal_lines() {
        assert!(Feedback::Complete.is_terminal());
        assert!(Feedback::Aborted("x".into()).is_terminal());
        assert!(!Feedback::error("x").is_terminal());
    }

    #[test]
    fn channel_sink_survives_dropped_receiver() {
        let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
        drop(rx);
        tx.emit(Feedback::info("still fine"));
    }

    #[test]
    fn collecting_sink_keeps_order() {
        let sink = Mutex::new(Vec::new());
        sink.emit(Feedback::info("one"));
        sink.emit(Feedback::Complete);

        let lines = sink.into_inner().unwrap();
        assert_eq!(lines, vec![Feedback::info("one"), Feedback::Complete]);
    }
}
