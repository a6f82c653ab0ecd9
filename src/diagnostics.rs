//! Diagnostic lines emitted while a capture runs.
//!
//! Every line goes to the `log` facade and, when registered, to a
//! [`DiagnosticHandler`] callback. Progress lines are only emitted in debug
//! mode and carry the elapsed time of the named timer.

use std::sync::Arc;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagnosticLevel {
    Info,
    Warn,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub level: DiagnosticLevel,
    pub message: String,
}

/// Callback receiving every emitted diagnostic
pub type DiagnosticHandler = Arc<dyn Fn(&Diagnostic) + Send + Sync>;

pub(crate) struct Diagnostics {
    debug: bool,
    timer_label: String,
    started: Instant,
    handler: Option<DiagnosticHandler>,
}

impl Diagnostics {
    pub(crate) fn new(debug: bool, timer_label: &str, handler: Option<DiagnosticHandler>) -> Self {
        Self {
            debug,
            timer_label: timer_label.to_string(),
            started: Instant::now(),
            handler,
        }
    }

    pub(crate) fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// Debug-only progress line, followed by the timer reading
    pub(crate) fn progress(&self, message: &str) {
        if !self.debug {
            return;
        }
        log::info!("{}", message);
        self.forward(DiagnosticLevel::Info, message);
        let timer = format!("{}: {}ms", self.timer_label, self.elapsed().as_millis());
        log::info!("{}", timer);
        self.forward(DiagnosticLevel::Info, &timer);
    }

    pub(crate) fn warn(&self, message: &str) {
        log::warn!("{}", message);
        self.forward(DiagnosticLevel::Warn, message);
    }

    pub(crate) fn error(&self, message: &str) {
        log::error!("{}", message);
        self.forward(DiagnosticLevel::Error, message);
    }

    fn forward(&self, level: DiagnosticLevel, message: &str) {
        if let Some(cb) = &self.handler {
            cb(&Diagnostic {
                level,
                message: message.to_string(),
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    fn collecting() -> (DiagnosticHandler, Arc<Mutex<Vec<Diagnostic>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let handler: DiagnosticHandler = Arc::new(move |d: &Diagnostic| sink.lock().unwrap().push(d.clone()));
        (handler, seen)
    }

    #[test]
    fn progress_is_gated_by_debug() {
        let (handler, seen) = collecting();
        let quiet = Diagnostics::new(false, "timer", Some(handler.clone()));
        quiet.progress("Screenshot init");
        quiet.warn("Screenshots: content was not found");
        {
            let seen = seen.lock().unwrap();
            assert_eq!(seen.len(), 1);
            assert_eq!(seen[0].level, DiagnosticLevel::Warn);
        }

        let loud = Diagnostics::new(true, "shot", Some(handler));
        loud.progress("Screenshot init");
        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 3);
        assert_eq!(seen[1].message, "Screenshot init");
        assert!(seen[2].message.starts_with("shot: ") && seen[2].message.ends_with("ms"));
    }
}
