// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Connection supervision.
//!
//! [`ConnectionSupervisor`] owns the bridge's cached view of broker
//! connectivity. The flag starts out disconnected and is updated from two
//! directions: transport connect/error events set it directly, and a
//! periodic tick reconciles it against the transport's live state to catch
//! transitions that never raised an event. Every publish call reads the
//! cached flag; nothing else mutates it.
//!
//! Transitions are edge-triggered: a log event fires exactly once per
//! observed flip, never again on ticks with unchanged connectivity.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use tokio::task::JoinHandle;

use crate::transport::Transport;

/// Interval between connectivity reconciliation ticks.
const TICK_INTERVAL: Duration = Duration::from_millis(1500);

/// Supervises the bridge's cached connectivity flag.
#[derive(Debug, Default)]
pub struct ConnectionSupervisor {
    /// Cached connectivity. Atomic because publish calls read it from the
    /// coordinator while the tick task writes it.
    connected: AtomicBool,
    /// Handle of the spawned tick task, present while supervision runs.
    tick: Mutex<Option<JoinHandle<()>>>,
}

impl ConnectionSupervisor {
    /// Creates a supervisor in the initial disconnected state.
    #[must_use]
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Returns the cached connectivity flag.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Acquire)
    }

    /// Sets the flag from a transport connect or error event.
    pub fn set_connected(&self, connected: bool) {
        self.reconcile(connected);
    }

    /// Compares the live connectivity against the cached flag, updating it
    /// and logging on mismatch.
    ///
    /// Returns `true` if a transition occurred.
    pub fn reconcile(&self, live: bool) -> bool {
        let previous = self.connected.swap(live, Ordering::AcqRel);
        if previous == live {
            return false;
        }
        if live {
            tracing::info!("connected");
        } else {
            tracing::warn!("not connected");
        }
        true
    }

    /// Starts the periodic reconciliation tick against the transport.
    ///
    /// Performs one immediate check, then one every 1.5 seconds. Starting
    /// again replaces a previously running tick.
    pub fn start<T: Transport>(self: Arc<Self>, transport: Arc<T>) {
        let supervisor = Arc::clone(&self);
        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(TICK_INTERVAL);
            loop {
                interval.tick().await;
                supervisor.reconcile(transport.is_connected());
            }
        });

        if let Some(previous) = self.tick.lock().replace(handle) {
            previous.abort();
        }
    }

    /// Cancels the periodic tick. Safe to call when no tick is scheduled,
    /// and safe to call more than once.
    pub fn shutdown(&self) {
        if let Some(handle) = self.tick.lock().take() {
            handle.abort();
        }
    }
}

impl Drop for ConnectionSupervisor {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicU32;

    use crate::error::ProtocolError;
    use crate::transport::Publication;

    /// Transport stub whose connectivity the test flips at will.
    struct FlippableTransport {
        connected: AtomicBool,
        polls: AtomicU32,
    }

    impl FlippableTransport {
        fn new(connected: bool) -> Arc<Self> {
            Arc::new(Self {
                connected: AtomicBool::new(connected),
                polls: AtomicU32::new(0),
            })
        }
    }

    impl Transport for FlippableTransport {
        fn is_connected(&self) -> bool {
            self.polls.fetch_add(1, Ordering::SeqCst);
            self.connected.load(Ordering::SeqCst)
        }

        async fn subscribe(&self, _topic: &str, _qos: u8) -> Result<(), ProtocolError> {
            Ok(())
        }

        async fn publish(&self, _publication: Publication) -> Result<(), ProtocolError> {
            Ok(())
        }
    }

    #[test]
    fn initial_state_is_disconnected() {
        let supervisor = ConnectionSupervisor::new();
        assert!(!supervisor.is_connected());
    }

    #[test]
    fn reconcile_flips_exactly_once() {
        let supervisor = ConnectionSupervisor::new();

        assert!(supervisor.reconcile(true));
        assert!(supervisor.is_connected());

        // Repeated ticks with unchanged connectivity are silent.
        assert!(!supervisor.reconcile(true));
        assert!(!supervisor.reconcile(true));

        assert!(supervisor.reconcile(false));
        assert!(!supervisor.is_connected());
        assert!(!supervisor.reconcile(false));
    }

    #[test]
    fn set_connected_updates_flag() {
        let supervisor = ConnectionSupervisor::new();
        supervisor.set_connected(true);
        assert!(supervisor.is_connected());
        supervisor.set_connected(false);
        assert!(!supervisor.is_connected());
    }

    #[tokio::test(start_paused = true)]
    async fn tick_reconciles_against_transport() {
        let supervisor = ConnectionSupervisor::new();
        let transport = FlippableTransport::new(false);

        Arc::clone(&supervisor).start(Arc::clone(&transport));
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(!supervisor.is_connected());

        // Transport comes up without raising an event; the next tick
        // catches it.
        transport.connected.store(true, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(1600)).await;
        assert!(supervisor.is_connected());

        transport.connected.store(false, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(1600)).await;
        assert!(!supervisor.is_connected());

        supervisor.shutdown();
    }

    #[tokio::test(start_paused = true)]
    async fn tick_runs_immediately_on_start() {
        let supervisor = ConnectionSupervisor::new();
        let transport = FlippableTransport::new(true);

        Arc::clone(&supervisor).start(Arc::clone(&transport));
        tokio::time::sleep(Duration::from_millis(10)).await;

        assert!(supervisor.is_connected());
        assert!(transport.polls.load(Ordering::SeqCst) >= 1);

        supervisor.shutdown();
    }

    #[tokio::test]
    async fn shutdown_is_idempotent() {
        let supervisor = ConnectionSupervisor::new();

        // Nothing scheduled yet.
        supervisor.shutdown();

        let transport = FlippableTransport::new(false);
        Arc::clone(&supervisor).start(Arc::clone(&transport));
        supervisor.shutdown();
        supervisor.shutdown();
    }
}
