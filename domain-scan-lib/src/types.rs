//! Core data types for candidate generation and scanning.
//!
//! This module defines the request, configuration, event and snapshot
//! structures shared by the generator, the lookup client and the controller.

use crate::error::ScanError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Default number of concurrent workers per scan.
pub const DEFAULT_CONCURRENCY: usize = 5;

/// Upper bound on workers per scan.
pub const MAX_CONCURRENCY: usize = 100;

/// Default per-check deadline for a single lookup.
pub const DEFAULT_LOOKUP_TIMEOUT: Duration = Duration::from_secs(5);

/// Longest per-check deadline accepted anywhere.
pub const MAX_LOOKUP_TIMEOUT: Duration = Duration::from_secs(3600);

/// Most candidates one generation run may produce.
pub const MAX_CANDIDATES: usize = 5_000_000;

/// Capacity of the bounded work queue between feeder and workers.
pub const DEFAULT_QUEUE_CAPACITY: usize = 100;

/// Capacity of each subscriber's event queue.
pub const DEFAULT_SUBSCRIBER_CAPACITY: usize = 10;

/// Well-known WHOIS port.
pub const WHOIS_PORT: u16 = 43;

/// Pattern used when a request supplies none.
pub const DEFAULT_PATTERN: &str = "AABB";

/// Suffix used when a request supplies none.
pub const DEFAULT_SUFFIX: &str = ".com";

/// How a pattern is expanded into domain bodies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GenerationMode {
    /// Each symbol stands for a fixed alphabet: `A` letters, `B` digits, `C` both
    Fixed,

    /// Each distinct letter is assigned one character from `[a-z0-9]`
    Style,

    /// The pattern is used verbatim as a single body
    Literal,
}

impl GenerationMode {
    /// The case-sensitive token for this mode.
    pub fn as_str(&self) -> &'static str {
        match self {
            GenerationMode::Fixed => "fixed",
            GenerationMode::Style => "style",
            GenerationMode::Literal => "literal",
        }
    }
}

impl FromStr for GenerationMode {
    type Err = ScanError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "fixed" => Ok(GenerationMode::Fixed),
            "style" => Ok(GenerationMode::Style),
            "literal" => Ok(GenerationMode::Literal),
            other => Err(ScanError::unknown_mode(other)),
        }
    }
}

impl fmt::Display for GenerationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Output of a generation run.
#[derive(Debug, Clone, Default)]
pub struct GenerationResult {
    /// Deduplicated, lexicographically sorted candidate domains
    pub candidates: Vec<String>,

    /// Sum of raw body counts across patterns, times the suffix count
    pub estimated_count: usize,

    /// Per-pattern errors; each one skipped only its own pattern
    pub errors: Vec<ScanError>,
}

/// Parameters for one scan session.
///
/// `mode` is kept as the raw token so an unknown mode degrades to skipped
/// patterns instead of a rejected request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanRequest {
    pub mode: String,
    pub patterns: Vec<String>,
    pub suffixes: Vec<String>,
    pub concurrency: usize,
}

impl ScanRequest {
    pub fn new<M: Into<String>>(mode: M, patterns: Vec<String>, suffixes: Vec<String>) -> Self {
        Self {
            mode: mode.into(),
            patterns,
            suffixes,
            concurrency: DEFAULT_CONCURRENCY,
        }
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }

    /// Fill in defaults: trimmed non-empty patterns (or `AABB`), trimmed
    /// non-empty suffixes (or `.com`), and concurrency of at least 1.
    pub fn normalized(&self) -> Self {
        let patterns: Vec<String> = self
            .patterns
            .iter()
            .map(|p| p.trim().to_string())
            .filter(|p| !p.is_empty())
            .collect();
        let suffixes: Vec<String> = self
            .suffixes
            .iter()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        Self {
            mode: self.mode.trim().to_string(),
            patterns: if patterns.is_empty() {
                vec![DEFAULT_PATTERN.to_string()]
            } else {
                patterns
            },
            suffixes: if suffixes.is_empty() {
                vec![DEFAULT_SUFFIX.to_string()]
            } else {
                suffixes
            },
            concurrency: self.concurrency.clamp(1, MAX_CONCURRENCY),
        }
    }
}

impl Default for ScanRequest {
    fn default() -> Self {
        Self::new(GenerationMode::Fixed.as_str(), Vec::new(), Vec::new())
    }
}

/// Engine-level tuning for the controller and its workers.
#[derive(Debug, Clone)]
pub struct ScanConfig {
    /// Deadline for one lookup (dial, write and read together)
    pub lookup_timeout: Duration,

    /// Bound of the feeder -> worker queue
    pub queue_capacity: usize,

    /// Bound of each subscriber's event queue
    pub subscriber_capacity: usize,

    /// Port the lookup servers are dialled on
    pub port: u16,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            lookup_timeout: DEFAULT_LOOKUP_TIMEOUT,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            subscriber_capacity: DEFAULT_SUBSCRIBER_CAPACITY,
            port: WHOIS_PORT,
        }
    }
}

impl ScanConfig {
    /// Set the per-check deadline, capped at [`MAX_LOOKUP_TIMEOUT`].
    pub fn with_lookup_timeout(mut self, timeout: Duration) -> Self {
        self.lookup_timeout = timeout.min(MAX_LOOKUP_TIMEOUT);
        self
    }

    pub fn with_queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity.max(1);
        self
    }

    pub fn with_subscriber_capacity(mut self, capacity: usize) -> Self {
        self.subscriber_capacity = capacity.max(1);
        self
    }

    /// Override the lookup port. Only useful against a local test server.
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }
}

/// Classification of one candidate's lookup.
#[derive(Debug, Clone, PartialEq)]
pub enum LookupOutcome {
    Available,
    Unavailable,
    Failure(ScanError),
}

impl LookupOutcome {
    pub fn is_available(&self) -> bool {
        matches!(self, LookupOutcome::Available)
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, LookupOutcome::Failure(_))
    }
}

/// Lifecycle state of the current scan session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScanState {
    Idle,
    Running,
    Paused,
    Stopped,
    Completed,
    /// A worker task died; the run ended early without a Stop request
    Aborted,
}

impl ScanState {
    /// Running or paused: workers may still take candidates.
    pub fn is_active(self) -> bool {
        matches!(self, ScanState::Running | ScanState::Paused)
    }

    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            ScanState::Stopped | ScanState::Completed | ScanState::Aborted
        )
    }
}

impl fmt::Display for ScanState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ScanState::Idle => "idle",
            ScanState::Running => "running",
            ScanState::Paused => "paused",
            ScanState::Stopped => "stopped",
            ScanState::Completed => "completed",
            ScanState::Aborted => "aborted",
        };
        f.write_str(s)
    }
}

/// Point-in-time copy of the current session's bookkeeping.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanSnapshot {
    pub session_id: u64,
    pub state: ScanState,
    pub done: usize,
    pub total: usize,
    pub available: Vec<String>,
    pub failed: Vec<String>,
}

impl ScanSnapshot {
    pub fn running(&self) -> bool {
        self.state.is_active()
    }

    pub fn paused(&self) -> bool {
        self.state == ScanState::Paused
    }
}

impl Default for ScanSnapshot {
    fn default() -> Self {
        Self {
            session_id: 0,
            state: ScanState::Idle,
            done: 0,
            total: 0,
            available: Vec::new(),
            failed: Vec::new(),
        }
    }
}

/// Kind of a progress event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    /// One candidate finished; payload is `[done/total] domain`
    Scanned,
    /// Payload is the available domain
    Available,
    /// Payload is the failed domain
    Fail,
    /// Terminal: all workers exited after the queue drained
    Complete,
    /// Terminal: all workers exited after Stop
    Stopped,
    /// Terminal: a worker task failed and the rest were stopped
    Aborted,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::Scanned => "scanned",
            EventKind::Available => "available",
            EventKind::Fail => "fail",
            EventKind::Complete => "complete",
            EventKind::Stopped => "stopped",
            EventKind::Aborted => "aborted",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            EventKind::Complete | EventKind::Stopped | EventKind::Aborted
        )
    }
}

impl FromStr for EventKind {
    type Err = ScanError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "scanned" => Ok(EventKind::Scanned),
            "available" => Ok(EventKind::Available),
            "fail" => Ok(EventKind::Fail),
            "complete" => Ok(EventKind::Complete),
            "stopped" => Ok(EventKind::Stopped),
            "aborted" => Ok(EventKind::Aborted),
            other => Err(ScanError::internal(format!("unknown event kind '{}'", other))),
        }
    }
}

/// A progress event, serialized on the wire as `kind:payload`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanEvent {
    pub kind: EventKind,
    pub payload: String,
}

impl ScanEvent {
    pub fn new<P: Into<String>>(kind: EventKind, payload: P) -> Self {
        Self {
            kind,
            payload: payload.into(),
        }
    }

    pub fn scanned(done: usize, total: usize, domain: &str) -> Self {
        Self::new(EventKind::Scanned, format!("[{}/{}] {}", done, total, domain))
    }

    pub fn available(domain: &str) -> Self {
        Self::new(EventKind::Available, domain)
    }

    pub fn fail(domain: &str) -> Self {
        Self::new(EventKind::Fail, domain)
    }

    pub fn complete(done: usize, total: usize) -> Self {
        Self::new(EventKind::Complete, format!("scan complete [{}/{}]", done, total))
    }

    pub fn stopped(done: usize, total: usize) -> Self {
        Self::new(EventKind::Stopped, format!("scan stopped [{}/{}]", done, total))
    }

    pub fn aborted(done: usize, total: usize) -> Self {
        Self::new(EventKind::Aborted, format!("scan aborted [{}/{}]", done, total))
    }

    /// Split a wire string back into an event. The payload may itself contain `:`.
    pub fn parse(line: &str) -> Option<Self> {
        let (kind, payload) = line.split_once(':')?;
        let kind = kind.parse().ok()?;
        Some(Self::new(kind, payload))
    }
}

impl fmt::Display for ScanEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind.as_str(), self.payload)
    }
}
