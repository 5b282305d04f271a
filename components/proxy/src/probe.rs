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

//! Readiness Prober (spec §4.2).
//!
//! Polls a loopback TCP port until a connection succeeds and closes cleanly.
//! Unbounded by design — callers impose their own timeout (the Connection
//! Pump's 20 s retry window, or a caller-supplied `tokio::time::timeout`).

use std::time::Duration;

use tokio::net::TcpStream;
use tokio::time::sleep;

const RETRY_INTERVAL: Duration = Duration::from_millis(100);

/// Waits until a connection to `[::1]:port` succeeds, then drops it.
///
/// Not called from `pump`'s hot path — the Connection Pump needs the open
/// stream itself, not just a readiness signal, so it runs its own bounded
/// variant (`pump::connect_with_retry`). Kept as its own public contract the
/// way the original left its `wait_for_port` standing on its own, unused by
/// the rest of the module.
#[allow(dead_code)]
pub async fn wait_for_port(port: u16) {
    loop {
        if TcpStream::connect(("::1", port)).await.is_ok() {
            return;
        }
        sleep(RETRY_INTERVAL).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    #[tokio::test]
    async fn returns_once_the_port_accepts_a_connection() {
        let listener = TcpListener::bind(("::1", 0)).await.unwrap();
        let port = listener.local_addr().unwrap().port();
        tokio::spawn(async move {
            let _ = listener.accept().await;
        });
        tokio::time::timeout(Duration::from_secs(2), wait_for_port(port))
            .await
            .expect("wait_for_port should return once the listener is accepting");
    }
}
