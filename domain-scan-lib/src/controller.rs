//! Scan controller: lifecycle, worker pool and event emission.
//!
//! `ScanController` owns at most one live session. `start` generates the
//! candidate set, spawns a feeder that pushes candidates into a bounded
//! queue, a pool of workers that drain it through a [`Lookup`], and a
//! watcher that publishes the terminal event once every worker has exited.

use crate::broadcast::{ProgressBroadcaster, Subscription};
use crate::error::ScanError;
use crate::generate::generate_candidates;
use crate::protocols::{Lookup, SuffixRegistry, WhoisClient};
use crate::session::Session;
use crate::types::{
    LookupOutcome, ScanConfig, ScanRequest, ScanSnapshot, ScanState, MAX_CONCURRENCY,
};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio::time::Instant;

type SharedQueue = Arc<tokio::sync::Mutex<mpsc::Receiver<String>>>;

/// What `start` produced, returned before any lookup has run.
#[derive(Debug, Clone)]
pub struct StartSummary {
    pub session_id: u64,

    /// Number of distinct candidates queued
    pub total: usize,

    /// Raw generated count before deduplication
    pub estimated_count: usize,

    /// Workers launched
    pub concurrency: usize,

    /// Patterns that were skipped, one error each
    pub errors: Vec<ScanError>,
}

/// Drives concurrent availability scans.
///
/// # Example
///
/// ```rust,no_run
/// use domain_scan_lib::{ScanConfig, ScanController, ScanRequest};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let controller = ScanController::new(ScanConfig::default());
///     let mut events = controller.subscribe();
///
///     let request = ScanRequest::new("fixed", vec!["BB".into()], vec![".com".into()]);
///     controller.start(&request)?;
///
///     while let Some(event) = events.next_event().await {
///         println!("{}", event);
///         if event.kind.is_terminal() {
///             break;
///         }
///     }
///     Ok(())
/// }
/// ```
pub struct ScanController {
    config: ScanConfig,
    lookup: Arc<dyn Lookup>,
    events: ProgressBroadcaster,
    current: Mutex<Option<Arc<Session>>>,
    next_session: AtomicU64,
}

impl ScanController {
    /// Controller backed by a WHOIS client over the built-in suffix table.
    pub fn new(config: ScanConfig) -> Self {
        let lookup = Self::whois_lookup(&config, SuffixRegistry::new());
        Self::with_lookup(config, lookup)
    }

    /// Controller whose suffix table has extra or replaced server entries.
    pub fn with_servers<I, K, V>(config: ScanConfig, servers: I) -> Result<Self, ScanError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let registry = SuffixRegistry::new().with_overrides(servers)?;
        let lookup = Self::whois_lookup(&config, registry);
        Ok(Self::with_lookup(config, lookup))
    }

    /// Controller driving an arbitrary lookup implementation.
    pub fn with_lookup(config: ScanConfig, lookup: Arc<dyn Lookup>) -> Self {
        let events = ProgressBroadcaster::with_capacity(config.subscriber_capacity);
        Self {
            config,
            lookup,
            events,
            current: Mutex::new(None),
            next_session: AtomicU64::new(1),
        }
    }

    fn whois_lookup(config: &ScanConfig, registry: SuffixRegistry) -> Arc<dyn Lookup> {
        Arc::new(
            WhoisClient::with_registry(Arc::new(registry))
                .with_port(config.port)
                .with_timeout(config.lookup_timeout),
        )
    }

    fn current(&self) -> MutexGuard<'_, Option<Arc<Session>>> {
        self.current
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn session(&self) -> Option<Arc<Session>> {
        self.current().clone()
    }

    pub fn config(&self) -> &ScanConfig {
        &self.config
    }

    /// Generate candidates from `request` and start scanning them.
    ///
    /// Empty pattern or suffix lists fall back to `AABB` and `.com`. Bad
    /// patterns and unknown modes are reported in the summary, not as an
    /// error; if nothing survives, the session completes immediately.
    ///
    /// Any session still running is stopped and detached first: it finishes
    /// its in-flight lookups but publishes nothing further.
    ///
    /// # Errors
    ///
    /// Returns `ScanError::Runtime` when called outside a tokio runtime.
    pub fn start(&self, request: &ScanRequest) -> Result<StartSummary, ScanError> {
        let request = request.normalized();
        let generation = generate_candidates(&request.mode, &request.patterns, &request.suffixes);
        let total = generation.candidates.len();

        let session_id = self.start_candidates(generation.candidates, request.concurrency)?;

        Ok(StartSummary {
            session_id,
            total,
            estimated_count: generation.estimated_count,
            concurrency: request.concurrency,
            errors: generation.errors,
        })
    }

    /// Start scanning an explicit candidate list. Returns the new session id.
    pub fn start_candidates(
        &self,
        candidates: Vec<String>,
        concurrency: usize,
    ) -> Result<u64, ScanError> {
        let runtime = Handle::try_current()
            .map_err(|e| ScanError::runtime(format!("scan needs a tokio runtime: {}", e)))?;
        let concurrency = concurrency.clamp(1, MAX_CONCURRENCY);

        let mut current = self.current();
        if let Some(previous) = current.take() {
            if previous.state().is_active() {
                tracing::info!(session = previous.id(), "replacing active session");
            }
            previous.detach();
        }

        let id = self.next_session.fetch_add(1, Ordering::Relaxed);
        let session = Arc::new(Session::new(id, candidates.len()));
        tracing::info!(
            session = id,
            total = candidates.len(),
            concurrency,
            "scan started"
        );

        let (tx, rx) = mpsc::channel(self.config.queue_capacity.max(1));
        runtime.spawn(feed(Arc::clone(&session), candidates, tx));

        let queue: SharedQueue = Arc::new(tokio::sync::Mutex::new(rx));
        let workers: Vec<_> = (0..concurrency)
            .map(|worker| {
                runtime.spawn(run_worker(
                    worker,
                    Arc::clone(&session),
                    Arc::clone(&queue),
                    Arc::clone(&self.lookup),
                    self.events.clone(),
                    self.config.lookup_timeout,
                ))
            })
            .collect();

        let watched = Arc::clone(&session);
        let events = self.events.clone();
        runtime.spawn(async move {
            for worker in workers {
                if let Err(e) = worker.await {
                    tracing::error!(session = watched.id(), error = %e, "worker task failed");
                    // the remaining workers wind down through the stop latch
                    watched.abort();
                }
            }
            let kind = watched.finish(&events);
            tracing::info!(session = watched.id(), outcome = kind.as_str(), "scan finished");
        });

        *current = Some(session);
        Ok(id)
    }

    /// Pause the running session. Returns `false` if there was nothing to pause.
    pub fn pause(&self) -> bool {
        let paused = self.session().map(|s| s.pause()).unwrap_or(false);
        if paused {
            tracing::info!("scan paused");
        }
        paused
    }

    /// Resume a paused session. Returns `false` if it was not paused.
    pub fn resume(&self) -> bool {
        let resumed = self.session().map(|s| s.resume()).unwrap_or(false);
        if resumed {
            tracing::info!("scan resumed");
        }
        resumed
    }

    /// Stop the current session. Idempotent; in-flight lookups are not cancelled.
    pub fn stop(&self) -> bool {
        let stopped = self.session().map(|s| s.stop()).unwrap_or(false);
        if stopped {
            tracing::info!("scan stop requested");
        }
        stopped
    }

    /// Subscribe to progress events of this and every later session.
    pub fn subscribe(&self) -> Subscription {
        self.events.subscribe()
    }

    pub fn broadcaster(&self) -> &ProgressBroadcaster {
        &self.events
    }

    pub fn state(&self) -> ScanState {
        self.session()
            .map(|s| s.state())
            .unwrap_or(ScanState::Idle)
    }

    /// Copy of the current session's counters and result lists.
    pub fn snapshot(&self) -> ScanSnapshot {
        self.session()
            .map(|s| s.snapshot())
            .unwrap_or_default()
    }

    /// Wait until the current session's workers have all exited.
    ///
    /// Resolves immediately when no session was ever started.
    pub async fn wait(&self) {
        if let Some(session) = self.session() {
            session.finished.wait().await;
        }
    }
}

impl std::fmt::Debug for ScanController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScanController")
            .field("config", &self.config)
            .field("state", &self.state())
            .finish()
    }
}

impl Drop for ScanController {
    fn drop(&mut self) {
        if let Some(session) = self.current().take() {
            session.stop();
        }
    }
}

/// Push every candidate into the work queue, then close it by dropping the sender.
async fn feed(session: Arc<Session>, candidates: Vec<String>, tx: mpsc::Sender<String>) {
    for domain in candidates {
        tokio::select! {
            biased;
            _ = session.stop.wait() => break,
            sent = tx.send(domain) => {
                // every worker is gone
                if sent.is_err() {
                    break;
                }
            }
        }
    }
}

/// Block while paused. Returns `false` when the session was stopped instead.
async fn wait_until_resumed(session: &Session) -> bool {
    tokio::select! {
        biased;
        _ = session.stop.wait() => false,
        _ = session.gate.wait_open() => !session.stop.is_triggered(),
    }
}

async fn next_candidate(session: &Session, queue: &SharedQueue) -> Option<String> {
    tokio::select! {
        biased;
        _ = session.stop.wait() => None,
        domain = async { queue.lock().await.recv().await } => domain,
    }
}

async fn run_worker(
    worker: usize,
    session: Arc<Session>,
    queue: SharedQueue,
    lookup: Arc<dyn Lookup>,
    events: ProgressBroadcaster,
    lookup_timeout: Duration,
) {
    loop {
        if !wait_until_resumed(&session).await {
            break;
        }
        let Some(domain) = next_candidate(&session, &queue).await else {
            break;
        };
        // a pause may have landed while this worker sat on the queue
        if !wait_until_resumed(&session).await {
            break;
        }

        let outcome = match Instant::now().checked_add(lookup_timeout) {
            Some(deadline) => lookup.check(&domain, deadline).await,
            None => LookupOutcome::Failure(ScanError::internal(format!(
                "lookup timeout {:?} is out of range",
                lookup_timeout
            ))),
        };
        let done = session.record(&domain, &outcome, &events);
        tracing::debug!(session = session.id(), worker, %domain, ?outcome, done, total = session.total(), "candidate checked");
    }
    tracing::debug!(session = session.id(), worker, "worker exited");
}
