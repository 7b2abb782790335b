//! One scan session: the counters, result lists and lifecycle flags of a
//! single run, plus the gate and latches its workers synchronize on.
//!
//! All bookkeeping sits behind one mutex that is only ever held for the
//! duration of an update, never across an await. Progress events for a
//! candidate are published while that mutex is held, so the `done` values
//! a subscriber sees are strictly increasing.

use crate::broadcast::ProgressBroadcaster;
use crate::concurrent::{Gate, Latch};
use crate::types::{EventKind, LookupOutcome, ScanEvent, ScanSnapshot, ScanState};
use std::sync::{Mutex, MutexGuard};

#[derive(Debug)]
struct Bookkeeping {
    state: ScanState,
    done: usize,
    available: Vec<String>,
    failed: Vec<String>,
    /// Set once a newer session replaced this one; nothing is published afterwards.
    detached: bool,
}

#[derive(Debug)]
pub(crate) struct Session {
    id: u64,
    total: usize,
    book: Mutex<Bookkeeping>,
    /// Open while running, closed while paused.
    pub(crate) gate: Gate,
    pub(crate) stop: Latch,
    pub(crate) finished: Latch,
}

impl Session {
    pub(crate) fn new(id: u64, total: usize) -> Self {
        Self {
            id,
            total,
            book: Mutex::new(Bookkeeping {
                state: ScanState::Running,
                done: 0,
                available: Vec::new(),
                failed: Vec::new(),
                detached: false,
            }),
            gate: Gate::new_open(),
            stop: Latch::new(),
            finished: Latch::new(),
        }
    }

    fn book(&self) -> MutexGuard<'_, Bookkeeping> {
        self.book.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub(crate) fn id(&self) -> u64 {
        self.id
    }

    pub(crate) fn total(&self) -> usize {
        self.total
    }

    pub(crate) fn state(&self) -> ScanState {
        self.book().state
    }

    pub(crate) fn pause(&self) -> bool {
        let mut book = self.book();
        if book.state != ScanState::Running {
            return false;
        }
        book.state = ScanState::Paused;
        self.gate.close();
        true
    }

    pub(crate) fn resume(&self) -> bool {
        let mut book = self.book();
        if book.state != ScanState::Paused {
            return false;
        }
        book.state = ScanState::Running;
        self.gate.open();
        true
    }

    /// Stop taking new candidates. Lookups already in flight finish normally.
    pub(crate) fn stop(&self) -> bool {
        let mut book = self.book();
        if !book.state.is_active() {
            return false;
        }
        book.state = ScanState::Stopped;
        self.stop.trigger();
        // paused workers must wake up to observe the stop
        self.gate.open();
        true
    }

    /// A worker died. Stop the others and end the run as aborted.
    pub(crate) fn abort(&self) -> bool {
        let mut book = self.book();
        if book.state == ScanState::Aborted {
            return false;
        }
        book.state = ScanState::Aborted;
        self.stop.trigger();
        self.gate.open();
        true
    }

    /// Stop, and suppress every event this session would still publish.
    pub(crate) fn detach(&self) {
        let mut book = self.book();
        book.detached = true;
        if book.state.is_active() {
            book.state = ScanState::Stopped;
        }
        self.stop.trigger();
        self.gate.open();
    }

    /// Record one finished lookup and publish its events.
    ///
    /// Returns the completion count after this candidate.
    pub(crate) fn record(
        &self,
        domain: &str,
        outcome: &LookupOutcome,
        events: &ProgressBroadcaster,
    ) -> usize {
        let mut book = self.book();
        book.done = (book.done + 1).min(self.total);
        match outcome {
            LookupOutcome::Available => book.available.push(domain.to_string()),
            LookupOutcome::Failure(_) => book.failed.push(domain.to_string()),
            LookupOutcome::Unavailable => {}
        }

        if !book.detached {
            events.publish(&ScanEvent::scanned(book.done, self.total, domain));
            match outcome {
                LookupOutcome::Available => {
                    events.publish(&ScanEvent::available(domain));
                }
                LookupOutcome::Failure(_) => {
                    events.publish(&ScanEvent::fail(domain));
                }
                LookupOutcome::Unavailable => {}
            }
        }
        book.done
    }

    /// Called once every worker has exited. Settles the final state,
    /// publishes the terminal event and releases anyone in `wait`.
    pub(crate) fn finish(&self, events: &ProgressBroadcaster) -> EventKind {
        let kind = {
            let mut book = self.book();
            let kind = match book.state {
                ScanState::Stopped => EventKind::Stopped,
                ScanState::Aborted => EventKind::Aborted,
                _ => {
                    book.state = ScanState::Completed;
                    EventKind::Complete
                }
            };

            if !book.detached {
                let event = match kind {
                    EventKind::Stopped => ScanEvent::stopped(book.done, self.total),
                    EventKind::Aborted => ScanEvent::aborted(book.done, self.total),
                    _ => ScanEvent::complete(book.done, self.total),
                };
                events.publish(&event);
            }
            kind
        };

        self.gate.open();
        self.finished.trigger();
        kind
    }

    pub(crate) fn snapshot(&self) -> ScanSnapshot {
        let book = self.book();
        ScanSnapshot {
            session_id: self.id,
            state: book.state,
            done: book.done,
            total: self.total,
            available: book.available.clone(),
            failed: book.failed.clone(),
        }
    }
}
