//! Error handling for candidate generation and scanning operations.
//!
//! This module defines a single error type covering the ways generation,
//! lookups and configuration can fail. Generation and lookup errors are
//! always scoped to one pattern or one candidate; none of them aborts a scan.

use std::fmt;

/// Main error type for domain scanning operations.
#[derive(Debug, Clone, PartialEq)]
pub enum ScanError {
    /// A pattern could not be expanded (bad symbol, empty pattern, etc.)
    InvalidPattern { pattern: String, reason: String },

    /// The requested generation mode is not one of `fixed`, `style`, `literal`
    UnknownMode { mode: String },

    /// No lookup server is registered for the candidate's suffix
    NoServer { suffix: String },

    /// Connecting to the lookup server failed or did not finish in time
    Dial { server: String, message: String },

    /// Sending the query line failed
    Write { domain: String, message: String },

    /// Reading the response failed or did not finish in time
    Read { domain: String, message: String },

    /// Configuration errors (invalid settings, bad TOML, etc.)
    ConfigError { message: String },

    /// File I/O errors when reading configuration
    FileError { path: String, message: String },

    /// An operation needed a tokio runtime and none was running
    Runtime { message: String },

    /// Generic internal errors that don't fit other categories
    Internal { message: String },
}

impl ScanError {
    /// Create a new invalid pattern error.
    pub fn invalid_pattern<P: Into<String>, R: Into<String>>(pattern: P, reason: R) -> Self {
        Self::InvalidPattern {
            pattern: pattern.into(),
            reason: reason.into(),
        }
    }

    /// Create a new unknown mode error.
    pub fn unknown_mode<M: Into<String>>(mode: M) -> Self {
        Self::UnknownMode { mode: mode.into() }
    }

    /// Create a new missing server error.
    pub fn no_server<S: Into<String>>(suffix: S) -> Self {
        Self::NoServer {
            suffix: suffix.into(),
        }
    }

    /// Create a new dial error.
    pub fn dial<S: Into<String>, M: Into<String>>(server: S, message: M) -> Self {
        Self::Dial {
            server: server.into(),
            message: message.into(),
        }
    }

    /// Create a new write error.
    pub fn write<D: Into<String>, M: Into<String>>(domain: D, message: M) -> Self {
        Self::Write {
            domain: domain.into(),
            message: message.into(),
        }
    }

    /// Create a new read error.
    pub fn read<D: Into<String>, M: Into<String>>(domain: D, message: M) -> Self {
        Self::Read {
            domain: domain.into(),
            message: message.into(),
        }
    }

    /// Create a new configuration error.
    pub fn config<M: Into<String>>(message: M) -> Self {
        Self::ConfigError {
            message: message.into(),
        }
    }

    /// Create a new file error.
    pub fn file_error<P: Into<String>, M: Into<String>>(path: P, message: M) -> Self {
        Self::FileError {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create a new runtime error.
    pub fn runtime<M: Into<String>>(message: M) -> Self {
        Self::Runtime {
            message: message.into(),
        }
    }

    /// Create a new internal error.
    pub fn internal<M: Into<String>>(message: M) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Short reason tag recorded for a failed candidate.
    pub fn failure_tag(&self) -> &'static str {
        match self {
            Self::NoServer { .. } => "no server for suffix",
            Self::Dial { .. } => "dial",
            Self::Write { .. } => "write",
            Self::Read { .. } => "read",
            Self::InvalidPattern { .. } | Self::UnknownMode { .. } => "generation",
            Self::ConfigError { .. } | Self::FileError { .. } => "config",
            Self::Runtime { .. } | Self::Internal { .. } => "internal",
        }
    }

    /// Whether this error belongs to the per-candidate lookup family.
    pub fn is_protocol_failure(&self) -> bool {
        matches!(
            self,
            Self::NoServer { .. } | Self::Dial { .. } | Self::Write { .. } | Self::Read { .. }
        )
    }
}

impl fmt::Display for ScanError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidPattern { pattern, reason } => {
                write!(f, "Invalid pattern '{}': {}", pattern, reason)
            }
            Self::UnknownMode { mode } => {
                write!(f, "Unknown generation mode '{}'", mode)
            }
            Self::NoServer { suffix } => {
                write!(f, "No WHOIS server for suffix '{}'", suffix)
            }
            Self::Dial { server, message } => {
                write!(f, "Dial to '{}' failed: {}", server, message)
            }
            Self::Write { domain, message } => {
                write!(f, "Write for '{}' failed: {}", domain, message)
            }
            Self::Read { domain, message } => {
                write!(f, "Read for '{}' failed: {}", domain, message)
            }
            Self::ConfigError { message } => {
                write!(f, "Configuration error: {}", message)
            }
            Self::FileError { path, message } => {
                write!(f, "File error at '{}': {}", path, message)
            }
            Self::Runtime { message } => {
                write!(f, "Runtime error: {}", message)
            }
            Self::Internal { message } => {
                write!(f, "Internal error: {}", message)
            }
        }
    }
}

impl std::error::Error for ScanError {}

// Implement From conversions for common error types
impl From<std::io::Error> for ScanError {
    fn from(err: std::io::Error) -> Self {
        Self::Internal {
            message: format!("I/O error: {}", err),
        }
    }
}

impl From<serde_json::Error> for ScanError {
    fn from(err: serde_json::Error) -> Self {
        Self::Internal {
            message: format!("JSON serialization failed: {}", err),
        }
    }
}

impl From<toml::de::Error> for ScanError {
    fn from(err: toml::de::Error) -> Self {
        Self::ConfigError {
            message: format!("Failed to parse TOML configuration: {}", err),
        }
    }
}

impl From<regex::Error> for ScanError {
    fn from(err: regex::Error) -> Self {
        Self::Internal {
            message: format!("Regex error: {}", err),
        }
    }
}
