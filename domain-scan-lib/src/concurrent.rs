//! Synchronization primitives for the scan worker pool.
//!
//! `Gate` is the pause mechanism: a resettable open/closed flag that any
//! number of workers can wait on. `Latch` is the stop signal: it fires once
//! and stays fired. Both are backed by a `tokio::sync::watch` channel, so a
//! waiter that subscribes after the state changed still sees the new value.

use std::sync::Arc;
use tokio::sync::watch;

/// Resettable gate. Waiters block while closed and are all released on open.
#[derive(Debug, Clone)]
pub struct Gate {
    state: Arc<watch::Sender<bool>>,
}

impl Gate {
    /// A gate that starts open.
    pub fn new_open() -> Self {
        let (tx, _) = watch::channel(true);
        Self { state: Arc::new(tx) }
    }

    /// A gate that starts closed.
    pub fn new_closed() -> Self {
        let (tx, _) = watch::channel(false);
        Self { state: Arc::new(tx) }
    }

    pub fn open(&self) {
        self.state.send_replace(true);
    }

    pub fn close(&self) {
        self.state.send_replace(false);
    }

    pub fn is_open(&self) -> bool {
        *self.state.borrow()
    }

    /// Resolve as soon as the gate is open. Returns immediately if it already is.
    pub async fn wait_open(&self) {
        let mut rx = self.state.subscribe();
        loop {
            if *rx.borrow_and_update() {
                return;
            }
            // The sender lives as long as `self`, so this only errs on teardown.
            if rx.changed().await.is_err() {
                return;
            }
        }
    }
}

impl Default for Gate {
    fn default() -> Self {
        Self::new_open()
    }
}

/// One-shot broadcast signal.
#[derive(Debug, Clone)]
pub struct Latch {
    fired: Arc<watch::Sender<bool>>,
}

impl Latch {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(false);
        Self {
            fired: Arc::new(tx),
        }
    }

    /// Fire the latch. Returns `true` only for the call that actually fired it.
    pub fn trigger(&self) -> bool {
        self.fired.send_if_modified(|fired| {
            if *fired {
                false
            } else {
                *fired = true;
                true
            }
        })
    }

    pub fn is_triggered(&self) -> bool {
        *self.fired.borrow()
    }

    /// Resolve once the latch has fired.
    pub async fn wait(&self) {
        let mut rx = self.fired.subscribe();
        loop {
            if *rx.borrow_and_update() {
                return;
            }
            if rx.changed().await.is_err() {
                return;
            }
        }
    }
}

impl Default for Latch {
    fn default() -> Self {
        Self::new()
    }
}
