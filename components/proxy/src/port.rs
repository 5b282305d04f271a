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

//! Port Allocator (spec §4.1).
//!
//! Returns an OS-assigned ephemeral port that was free on loopback at the
//! moment of the call. The probe socket is closed before the port is handed
//! back, so the result is inherently racy — that race is accepted, see
//! SPEC_FULL.md §9 "Port allocation race".

use std::net::{Ipv6Addr, SocketAddr};

use tokio::net::TcpListener;

use crate::error::{Error, Result};

const PROBE_ADDR: SocketAddr = SocketAddr::new(std::net::IpAddr::V6(Ipv6Addr::LOCALHOST), 0);

/// Binds `[::1]:0`, reads back the OS-assigned port, and drops the listener.
pub async fn allocate() -> Result<u16> {
    let listener = TcpListener::bind(PROBE_ADDR)
        .await
        .map_err(|source| Error::Bind { addr: PROBE_ADDR, source })?;
    let port = listener
        .local_addr()
        .map_err(|source| Error::Bind { addr: PROBE_ADDR, source })?;
    Ok(port.port())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn allocates_a_nonzero_port() {
        let port = allocate().await.unwrap();
        assert_ne!(port, 0);
    }

    #[tokio::test]
    async fn two_allocations_can_be_reused_immediately() {
        // The probe socket is closed before returning, so a second
        // allocation must not hang or error even if it reuses the port.
        let a = allocate().await.unwrap();
        drop(a);
        let b = allocate().await.unwrap();
        assert_ne!(b, 0);
    }
}
