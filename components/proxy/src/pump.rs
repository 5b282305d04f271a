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

//! Connection Pump (spec §4.5).
//!
//! Per accepted client connection: acquires a `use()` scope, resolves the
//! public port to its backend port, opens the backend connection (retrying
//! connection-refused for up to 20 s), and shuttles bytes bidirectionally
//! until either side closes. The two copy directions share one
//! `CancellationToken` so a broken pipe on either side tears both down.

use std::io::ErrorKind;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::tcp::{ReadHalf, WriteHalf};
use tokio::net::TcpStream;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;

use crate::controller::ServiceController;
use crate::error::{Error, Result};

const CONNECT_RETRY_INTERVAL: Duration = Duration::from_millis(100);
const CONNECT_RETRY_CEILING: Duration = Duration::from_secs(20);

/// Drives one client connection end to end. Never returns an error to the
/// caller: per spec §7, backend failures are logged and the client
/// connection is simply closed, without affecting the Service Controller.
pub async fn pump(controller: Arc<ServiceController>, public_port: u16, mut client: TcpStream) {
    let scope = controller.enter().await;

    let mapped = match scope.port_map().get(&public_port) {
        Some(&mapped) => mapped,
        None => {
            log::error!(
                "{}: public port {public_port} has no entry in the current port map",
                controller.name()
            );
            scope.exit().await;
            return;
        }
    };

    let backend = match connect_with_retry(controller.name(), mapped).await {
        Ok(stream) => stream,
        Err(err) => {
            log::error!(
                "{}: backend unreachable for public_port={public_port} mapped_port={mapped}: {err}",
                controller.name()
            );
            scope.exit().await;
            return;
        }
    };

    copy_bidirectional(client.split(), backend).await;
    let _ = client.shutdown().await;
    scope.exit().await;
}

/// Attempts to connect to `::1:mapped`, retrying on connection-refused every
/// 100 ms until `CONNECT_RETRY_CEILING` elapses. Any other connect error
/// surfaces immediately (spec §4.5 step 3).
async fn connect_with_retry(service: &str, mapped: u16) -> Result<TcpStream> {
    let deadline = Instant::now() + CONNECT_RETRY_CEILING;
    loop {
        match TcpStream::connect(("::1", mapped)).await {
            Ok(stream) => return Ok(stream),
            Err(err) if err.kind() == ErrorKind::ConnectionRefused => {
                if Instant::now() >= deadline {
                    return Err(Error::Connect {
                        service: service.to_string(),
                        source: err,
                    });
                }
                sleep(CONNECT_RETRY_INTERVAL).await;
            }
            Err(err) => {
                return Err(Error::Connect {
                    service: service.to_string(),
                    source: err,
                });
            }
        }
    }
}

/// Runs the two one-way copies under a shared cancellation scope: the first
/// side to hit EOF or a broken pipe cancels the other.
async fn copy_bidirectional(
    (mut client_r, mut client_w): (ReadHalf<'_>, WriteHalf<'_>),
    mut backend: TcpStream,
) {
    let (mut backend_r, mut backend_w) = backend.split();
    let cancel = CancellationToken::new();

    let client_to_backend = one_way_copy(&mut client_r, &mut backend_w, cancel.clone());
    let backend_to_client = one_way_copy(&mut backend_r, &mut client_w, cancel.clone());

    tokio::join!(client_to_backend, backend_to_client);
}

/// Reads from `src` until EOF, forwarding every byte read to `dst` in order.
/// Any I/O error (most commonly a broken pipe during teardown) cancels the
/// shared token and returns; `cancel` being triggered by the sibling copy
/// also ends this one promptly.
async fn one_way_copy<R, W>(src: &mut R, dst: &mut W, cancel: CancellationToken)
where
    R: tokio::io::AsyncRead + Unpin,
    W: tokio::io::AsyncWrite + Unpin,
{
    let mut buf = [0u8; 8192];
    loop {
        let read = tokio::select! {
            _ = cancel.cancelled() => break,
            result = src.read(&mut buf) => result,
        };
        match read {
            Ok(0) => break,
            Ok(n) => {
                if dst.write_all(&buf[..n]).await.is_err() {
                    log::debug!("broken pipe during copy, tearing down pair");
                    break;
                }
            }
            Err(err) => {
                log::debug!("read error during copy, tearing down pair: {err}");
                break;
            }
        }
    }
    let _ = dst.shutdown().await;
    cancel.cancel();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn connect_with_retry_surfaces_non_refused_errors_immediately() {
        // Port 0 never accepts connections and is rejected at the socket
        // layer with something other than connection-refused, so this must
        // not wait out the full 20 s ceiling.
        let result = tokio::time::timeout(Duration::from_secs(1), connect_with_retry("test", 0)).await;
        assert!(result.is_ok(), "should not have waited for the retry ceiling");
    }
}
