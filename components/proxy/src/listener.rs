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

//! Listener Fabric (spec §4.6).
//!
//! Binds one TCP listener per configured public port and dispatches each
//! accepted connection to a Connection Pump bound to that port and the
//! service's shared Controller. Each service runs as its own
//! `tokio-graceful-shutdown` subsystem, the Rust realization of the
//! "structured-concurrency scope provided by the embedding application"
//! spec §5 requires: cancelling the subsystem tears down the run loop, every
//! listener, and (via `ServiceController::stop`) the live subprocess.

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::TcpListener;
use tokio_graceful_shutdown::SubsystemHandle;

use crate::controller::ServiceController;
use crate::error::{Error, Result};
use crate::pump;

/// Wires one `ServiceController` into the Toplevel as its own named
/// subsystem.
pub async fn run_service(controller: Arc<ServiceController>, subsys: SubsystemHandle) -> Result<()> {
    let listeners = bind_listeners(&controller).await?;

    let run_loop = Arc::clone(&controller).run();
    let accept_loops = listeners
        .into_iter()
        .map(|(port, listener)| accept_loop(Arc::clone(&controller), port, listener));
    let fabric = futures::future::join_all(accept_loops);

    tokio::select! {
        _ = run_loop => {}
        _ = fabric => {}
        _ = subsys.on_shutdown_requested() => {
            log::info!("{}: shutdown requested", controller.name());
            controller.stop().await;
        }
    }
    Ok(())
}

async fn bind_listeners(controller: &Arc<ServiceController>) -> Result<Vec<(u16, TcpListener)>> {
    let mut listeners = Vec::with_capacity(controller.descriptor().ports.len());
    for &port in &controller.descriptor().ports {
        let addr: SocketAddr = (std::net::Ipv6Addr::LOCALHOST, port).into();
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| Error::Bind { addr, source })?;
        log::info!("{}: listening on port {port}", controller.name());
        listeners.push((port, listener));
    }
    Ok(listeners)
}

async fn accept_loop(controller: Arc<ServiceController>, port: u16, listener: TcpListener) {
    loop {
        match listener.accept().await {
            Ok((stream, peer)) => {
                log::debug!("{}: accepted connection from {peer} on port {port}", controller.name());
                let controller = Arc::clone(&controller);
                tokio::spawn(async move {
                    pump::pump(controller, port, stream).await;
                });
            }
            Err(err) => {
                log::error!("{}: accept failed on port {port}: {err}", controller.name());
            }
        }
    }
}
