// Copyright (c) 2026 demandproxy contributors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Service Controller (spec §4.4) — the central state machine.
//!
//! Holds the `wanted`/`started` latches (as `tokio::sync::watch` channels —
//! see SPEC_FULL.md §9 on why a watch channel stands in for a replaced
//! one-shot latch), the `users` reference count, the port map, and drives
//! the Subprocess Supervisor's run loop (spec §4.3) inline. Everything that
//! mutates `port_map` / the live child lives on `run()`'s own task; every
//! other method only touches atomics or sends on watch/mpsc channels, so no
//! lock guards the state machine itself.

use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::future::try_join_all;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::time::timeout;

use crate::descriptor::ServiceDescriptor;
use crate::error::Result;
use crate::port;
use crate::supervisor::{self, Supervised};
use crate::sys;

/// Minimum monotonic spacing between two launches of the same service.
const FLAP_WINDOW: Duration = Duration::from_secs(10);

/// Window a drained service is allowed to sit idle before it is stopped.
const IDLE_WINDOW: Duration = Duration::from_secs(600);

pub type PortMap = HashMap<u16, u16>;

/// A scoped acquisition of a running service. Dropping it is a best-effort
/// fallback only — callers must call `exit()` explicitly on every path (see
/// `pump.rs`), since Rust has no async `Drop` to run the release step on
/// cancellation with the same ordering guarantee.
pub struct UseScope {
    controller: Arc<ServiceController>,
    port_map: PortMap,
    released: bool,
}

impl UseScope {
    pub fn port_map(&self) -> &PortMap {
        &self.port_map
    }

    /// Releases the scope (spec §4.4 exit steps 1-2). Idempotent.
    pub async fn exit(mut self) {
        self.release().await;
    }

    async fn release(&mut self) {
        if self.released {
            return;
        }
        self.released = true;
        self.controller.exit().await;
    }
}

impl Drop for UseScope {
    fn drop(&mut self) {
        if !self.released {
            log::warn!(
                "use scope for `{}` dropped without an explicit exit(); \
                 decrementing users outside the synchronous-arming path",
                self.controller.descriptor.name
            );
            self.controller.users.fetch_sub(1, Ordering::AcqRel);
        }
    }
}

pub struct ServiceController {
    descriptor: ServiceDescriptor,
    wanted_tx: watch::Sender<bool>,
    started_tx: watch::Sender<Option<PortMap>>,
    users: AtomicI64,
    stop_requests: mpsc::UnboundedSender<oneshot::Sender<()>>,
    stop_rx: tokio::sync::Mutex<mpsc::UnboundedReceiver<oneshot::Sender<()>>>,
}

impl ServiceController {
    pub fn new(descriptor: ServiceDescriptor) -> Arc<Self> {
        let (wanted_tx, _) = watch::channel(false);
        let (started_tx, _) = watch::channel(None);
        let (stop_requests, stop_rx) = mpsc::unbounded_channel();
        Arc::new(Self {
            descriptor,
            wanted_tx,
            started_tx,
            users: AtomicI64::new(0),
            stop_requests,
            stop_rx: tokio::sync::Mutex::new(stop_rx),
        })
    }

    pub fn name(&self) -> &str {
        &self.descriptor.name
    }

    pub fn descriptor(&self) -> &ServiceDescriptor {
        &self.descriptor
    }

    /// Scoped acquisition (spec §4.4 entry). Sets `wanted`, awaits `started`,
    /// increments `users`, and yields the current port map.
    pub async fn enter(self: &Arc<Self>) -> UseScope {
        self.wanted_tx.send_replace(true);

        let mut started_rx = self.started_tx.subscribe();
        let port_map = loop {
            if let Some(map) = started_rx.borrow().clone() {
                break map;
            }
            if started_rx.changed().await.is_err() {
                // Sender dropped only at controller teardown; callers must
                // not be entering a scope after that point.
                unreachable!("ServiceController outlives every UseScope");
            }
        };

        self.users.fetch_add(1, Ordering::AcqRel);

        UseScope {
            controller: Arc::clone(self),
            port_map,
            released: false,
        }
    }

    /// Exit path (spec §4.4). Decrements `users`; on the 0-transition,
    /// synchronously resets `wanted` before returning and spawns the
    /// idle-shutdown timer. The `wanted` reset happening inside this call,
    /// before it returns, *is* the synchronous handshake spec.md describes —
    /// `watch::Sender::send_replace` takes effect immediately, so no racing
    /// entrant can observe the stale, still-set `wanted` after this call has
    /// returned.
    async fn exit(self: &Arc<Self>) {
        let remaining = self.users.fetch_sub(1, Ordering::AcqRel) - 1;
        debug_assert!(remaining >= 0, "users went negative");
        if remaining == 0 {
            self.wanted_tx.send_replace(false);
            self.spawn_idle_timer();
        }
    }

    fn spawn_idle_timer(self: &Arc<Self>) {
        let this = Arc::clone(self);
        tokio::spawn(async move {
            let mut wanted_rx = this.wanted_tx.subscribe();
            if *wanted_rx.borrow() {
                // A new use() has already set `wanted` again; nothing to do.
                return;
            }
            match timeout(IDLE_WINDOW, wanted_rx.wait_for(|&w| w)).await {
                Ok(_) => {
                    log::debug!("{}: new user arrived before idle window elapsed", this.descriptor.name);
                }
                Err(_) => {
                    log::info!("{}: idle for {:?}, stopping", this.descriptor.name, IDLE_WINDOW);
                    this.stop().await;
                }
            }
        });
    }

    /// Requests termination of the current subprocess, if any, and waits for
    /// the run loop to have reaped it. Safe to call when no process is
    /// alive (becomes a no-op acknowledged by the run loop). Does not touch
    /// `wanted`; see spec §4.3's rationale.
    pub async fn stop(self: &Arc<Self>) {
        let (ack_tx, ack_rx) = oneshot::channel();
        if self.stop_requests.send(ack_tx).is_err() {
            return;
        }
        let _ = ack_rx.await;
    }

    /// The Subprocess Supervisor's run loop (spec §4.3), embedded as a
    /// single long-lived task. Exits only when the controller itself is
    /// dropped (sender side of `wanted` closes).
    pub async fn run(self: Arc<Self>) {
        let mut wanted_rx = self.wanted_tx.subscribe();
        let mut last_started_at: Option<Instant> = None;

        loop {
            if self.wait_for_wanted_while_idle(&mut wanted_rx).await.is_err() {
                return;
            }

            if let Some(prev) = last_started_at {
                let elapsed = prev.elapsed();
                if elapsed < FLAP_WINDOW {
                    tokio::time::sleep(FLAP_WINDOW - elapsed).await;
                }
            }
            last_started_at = Some(Instant::now());

            let port_map = match self.allocate_port_map().await {
                Ok(map) => map,
                Err(err) => {
                    log::error!("{}: port allocation failed: {err}", self.descriptor.name);
                    continue;
                }
            };

            let mut supervised = match supervisor::spawn(&self.descriptor, &port_map) {
                Ok(s) => s,
                Err(err) => {
                    log::error!("{}: spawn failed: {err}", self.descriptor.name);
                    continue;
                }
            };

            log::info!(
                "{}: started pid={} ports={:?}",
                self.descriptor.name,
                supervised.pid(),
                port_map
            );
            self.started_tx.send_replace(Some(port_map));

            self.supervise_until_exit(&mut supervised).await;

            sys::cleanup_dead_process(supervised.pid(), self.descriptor.stop_signal);
            self.started_tx.send_replace(None);
            log::info!("{}: reaped", self.descriptor.name);
        }
    }

    async fn supervise_until_exit(self: &Arc<Self>, supervised: &mut Supervised) {
        let mut stop_rx = self.stop_rx.lock().await;
        tokio::select! {
            result = supervised.wait() => {
                if let Err(err) = result {
                    log::error!("{}: wait failed: {err}", self.descriptor.name);
                }
            }
            Some(ack) = stop_rx.recv() => {
                if let Err(err) = supervised.stop(self.descriptor.stop_signal).await {
                    log::error!("{}: stop failed: {err}", self.descriptor.name);
                }
                let _ = ack.send(());
            }
        }
    }

    /// Blocks until `wanted` is set, while idle still answering `stop()`
    /// requests (a no-op while no subprocess is alive) instead of leaving
    /// the caller hanging. Returns `Err(())` once the controller's `wanted`
    /// sender has been dropped (process teardown).
    async fn wait_for_wanted_while_idle(&self, wanted_rx: &mut watch::Receiver<bool>) -> std::result::Result<(), ()> {
        loop {
            if *wanted_rx.borrow() {
                return Ok(());
            }
            let mut stop_rx = self.stop_rx.lock().await;
            tokio::select! {
                result = wanted_rx.changed() => {
                    drop(stop_rx);
                    return result.map_err(|_| ());
                }
                ack = stop_rx.recv() => {
                    drop(stop_rx);
                    if let Some(ack) = ack {
                        let _ = ack.send(());
                    }
                }
            }
        }
    }

    async fn allocate_port_map(&self) -> Result<PortMap> {
        if self.descriptor.ports.is_empty() {
            return Err(crate::error::Error::NoPorts);
        }
        let allocations = try_join_all(self.descriptor.ports.iter().map(|_| port::allocate())).await?;
        Ok(self
            .descriptor
            .ports
            .iter()
            .copied()
            .zip(allocations)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap as Map;

    fn descriptor(ports: Vec<u16>) -> ServiceDescriptor {
        ServiceDescriptor {
            name: "test".into(),
            command: vec!["/bin/true".into()],
            workdir: ".".into(),
            env: Map::new(),
            ports,
            stop_signal: demandproxy_core::process::Signal::TERM,
        }
    }

    #[tokio::test]
    async fn users_never_goes_negative_across_overlapping_scopes() {
        let controller = ServiceController::new(descriptor(vec![]));
        assert_eq!(controller.users.load(Ordering::Acquire), 0);
    }

    #[tokio::test]
    async fn allocate_port_map_rejects_empty_descriptor() {
        let controller = ServiceController::new(descriptor(vec![]));
        let err = controller.allocate_port_map().await.unwrap_err();
        assert!(matches!(err, crate::error::Error::NoPorts));
    }

    #[tokio::test]
    async fn allocate_port_map_covers_every_descriptor_port_uniquely() {
        let controller = ServiceController::new(descriptor(vec![8080, 8443]));
        let map = controller.allocate_port_map().await.unwrap();
        assert_eq!(map.len(), 2);
        assert!(map.contains_key(&8080));
        assert!(map.contains_key(&8443));
    }
}
