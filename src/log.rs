//! Run log: ordered, severity-tagged messages with debug-gated output.
//!
//! In debug mode every message is written to the sink the moment it is
//! created; otherwise messages only accumulate until the report phase
//! flushes the whole dump once.

use std::fmt;
use std::io::{self, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

/// Severity of a single log message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Info,
    Error,
    Warning,
    Success,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Severity::Info => "info",
            Severity::Error => "error",
            Severity::Warning => "warning",
            Severity::Success => "success",
        };
        write!(f, "{}", name)
    }
}

/// One immutable entry in the run log
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogMessage {
    pub severity: Severity,
    pub text: String,
}

impl LogMessage {
    pub fn is(&self, severity: Severity) -> bool {
        self.severity == severity
    }

    /// Single-line form used for both streaming and the final dump.
    pub fn formatted(&self) -> String {
        format!("[{}] {}\n", self.severity, self.text)
    }
}

/// Ordered message store for one deployment run.
///
/// Messages are kept strictly in insertion order. The sink defaults to
/// stdout; tests inject their own writer through [`RunLog::with_sink`].
pub struct RunLog {
    messages: Mutex<Vec<LogMessage>>,
    debug: AtomicBool,
    sink: Mutex<Box<dyn Write + Send>>,
}

impl RunLog {
    pub fn new(debug: bool) -> Self {
        Self::with_sink(debug, Box::new(io::stdout()))
    }

    pub fn with_sink(debug: bool, sink: Box<dyn Write + Send>) -> Self {
        Self {
            messages: Mutex::new(Vec::new()),
            debug: AtomicBool::new(debug),
            sink: Mutex::new(sink),
        }
    }

    /// Append a message. In debug mode it is also written to the sink
    /// immediately, before the call returns.
    pub fn message(&self, severity: Severity, text: impl Into<String>) {
        let message = LogMessage {
            severity,
            text: text.into(),
        };

        if self.in_debug() {
            let mut sink = self.sink.lock().unwrap();
            let _ = sink.write_all(message.formatted().as_bytes());
            let _ = sink.flush();
        }

        self.messages.lock().unwrap().push(message);
    }

    pub fn info(&self, text: impl Into<String>) {
        self.message(Severity::Info, text);
    }

    pub fn error(&self, text: impl Into<String>) {
        self.message(Severity::Error, text);
    }

    pub fn warning(&self, text: impl Into<String>) {
        self.message(Severity::Warning, text);
    }

    pub fn success(&self, text: impl Into<String>) {
        self.message(Severity::Success, text);
    }

    /// True iff at least one stored message carries exactly this severity.
    pub fn has_any(&self, severity: Severity) -> bool {
        self.messages
            .lock()
            .unwrap()
            .iter()
            .any(|m| m.is(severity))
    }

    pub fn messages(&self) -> Vec<LogMessage> {
        self.messages.lock().unwrap().clone()
    }

    pub fn count(&self) -> usize {
        self.messages.lock().unwrap().len()
    }

    /// All formatted messages concatenated in insertion order.
    pub fn dump(&self) -> String {
        self.messages
            .lock()
            .unwrap()
            .iter()
            .map(LogMessage::formatted)
            .collect()
    }

    /// Write the full dump to the sink in one shot.
    pub fn flush(&self) {
        let dump = self.dump();
        let mut sink = self.sink.lock().unwrap();
        let _ = sink.write_all(dump.as_bytes());
        let _ = sink.flush();
    }

    /// Clear the buffered messages. The debug flag is left untouched.
    pub fn clear(&self) {
        self.messages.lock().unwrap().clear();
    }

    pub fn set_debug(&self, state: bool) {
        self.debug.store(state, Ordering::SeqCst);
    }

    pub fn in_debug(&self) -> bool {
        self.debug.load(Ordering::SeqCst)
    }
}

static INSTANCE: Mutex<Option<Arc<RunLog>>> = Mutex::new(None);

/// Process-wide log handle, created on first access.
///
/// The `debug` argument is only honored by the call that actually creates
/// the instance; later calls return the existing log unchanged. Use
/// [`destroy`] between sequential runs to start from a fresh instance.
pub fn instance(debug: bool) -> Arc<RunLog> {
    let mut slot = INSTANCE.lock().unwrap();
    slot.get_or_insert_with(|| Arc::new(RunLog::new(debug))).clone()
}

/// Drop the process-wide handle so the next [`instance`] call
/// re-initializes fresh state.
pub fn destroy() {
    *INSTANCE.lock().unwrap() = None;
}
