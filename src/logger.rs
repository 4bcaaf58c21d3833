//! Minimal, allocation-light logging for codec and dispatch diagnostics.
//!
//! The core has no threads and no channel infrastructure of its own, so unlike
//! the wider application this crate was distilled from, there is only one mode:
//! write straight to stderr (for `Fatal`/`Error`) or stdout (everything else).

use std::fmt::{self, Display};

/// Severity level of a log message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Severity {
    Fatal,
    Error,
    Warn,
    Info,
    Debug,
}

impl Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Fatal => write!(f, "[FATAL]"),
            Severity::Error => write!(f, "[ERROR]"),
            Severity::Warn => write!(f, "[WARN]"),
            Severity::Info => write!(f, "[INFO]"),
            Severity::Debug => write!(f, "[DEBUG]"),
        }
    }
}

/// A single structured diagnostic, as handed to a caller-supplied error
/// callback.
#[derive(Debug, Clone, PartialEq)]
pub struct LogMessage {
    pub level: Severity,
    pub path: Option<String>,
    pub msg: String,
}

impl Display for LogMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.path {
            Some(path) => write!(f, "{} {} ({})", self.level, self.msg, path),
            None => write!(f, "{} {}", self.level, self.msg),
        }
    }
}

impl LogMessage {
    pub fn new(level: Severity, msg: impl Into<String>) -> Self {
        LogMessage {
            level,
            path: None,
            msg: msg.into(),
        }
    }

    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    /// Writes this message to stderr (fatal/error) or stdout (everything else).
    pub fn emit(&self) {
        match self.level {
            Severity::Fatal | Severity::Error => eprintln!("{self}"),
            _ => println!("{self}"),
        }
    }
}
