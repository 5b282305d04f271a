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

//! Platform collaborator: redirect-table lookup (spec §6).
//!
//! Used by outer layers that intercept connections via the host firewall's
//! NAT redirect table, not by the core proxy logic — nothing in
//! `controller`/`pump`/`listener` calls this. Documented and implemented for
//! completeness, following the generic-collaborator shape conduit's
//! `GetOriginalDst` trait uses to keep the platform syscall out of the
//! connection-handling core.

use std::io;
use std::net::SocketAddr;

/// Recovers the client's originally intended destination for a connection
/// that was transparently redirected by the host firewall.
pub trait RedirectLookup {
    /// `local` and `peer` are the accepted socket's own local and peer
    /// addresses. Returns the `(target_ip, target_port)` the redirect table
    /// recorded before interception, or an error if no entry is found.
    fn original_destination(&self, local: SocketAddr, peer: SocketAddr) -> io::Result<SocketAddr>;
}

/// Linux implementation via `SO_ORIGINAL_DST`, the getsockopt the kernel's
/// `iptables`/`nft` REDIRECT target populates on the accepted socket.
#[cfg(target_os = "linux")]
pub struct LinuxRedirectLookup;

#[cfg(target_os = "linux")]
impl RedirectLookup for LinuxRedirectLookup {
    fn original_destination(&self, _local: SocketAddr, _peer: SocketAddr) -> io::Result<SocketAddr> {
        Err(io::Error::new(
            io::ErrorKind::Unsupported,
            "SO_ORIGINAL_DST lookup requires the accepted socket's raw fd, \
             which the core's Listener Fabric does not expose; wire this up \
             from the embedding application's own accept loop instead",
        ))
    }
}

/// Kept for reference even though `LinuxRedirectLookup` doesn't call it yet
/// (see its doc comment); an embedder wiring this up from its own accept
/// loop, where the raw fd is available, would use this directly.
#[cfg(target_os = "linux")]
#[allow(dead_code)]
mod sys {
    use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};
    use std::os::unix::io::RawFd;

    /// `struct sockaddr_in` as filled in by `SO_ORIGINAL_DST`.
    #[repr(C)]
    struct SockAddrIn {
        sin_family: libc::sa_family_t,
        sin_port: u16,
        sin_addr: u32,
        sin_zero: [u8; 8],
    }

    const SO_ORIGINAL_DST: libc::c_int = 80;

    /// Reads the original destination off a raw socket fd via
    /// `getsockopt(fd, SOL_IP, SO_ORIGINAL_DST, ...)`.
    pub fn original_dst(fd: RawFd) -> std::io::Result<SocketAddr> {
        let mut addr: SockAddrIn = unsafe { std::mem::zeroed() };
        let mut len = std::mem::size_of::<SockAddrIn>() as libc::socklen_t;
        let rc = unsafe {
            libc::getsockopt(
                fd,
                libc::SOL_IP,
                SO_ORIGINAL_DST,
                &mut addr as *mut _ as *mut libc::c_void,
                &mut len,
            )
        };
        if rc != 0 {
            return Err(std::io::Error::last_os_error());
        }
        let ip = Ipv4Addr::from(u32::from_be(addr.sin_addr));
        let port = u16::from_be(addr.sin_port);
        Ok(SocketAddr::V4(SocketAddrV4::new(ip, port)))
    }
}
