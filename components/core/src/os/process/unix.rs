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

use std::io;

use libc::{self, c_int};

use super::{Pid, Signal};
use crate::error::{Error, Result};

/// Send `sig` to `pid`.
///
/// If `pid` is the root of its own process group (true for every service we
/// spawn, since the supervisor starts children in a new session), the
/// negative of the pid is signalled instead so the whole group is reached
/// and no grandchild is left orphaned. Mirrors the launcher's
/// `Process::pid_to_signal`.
pub fn signal(pid: Pid, sig: Signal) -> Result<()> {
    let target = pid_to_signal(pid);
    let code: c_int = i32::from(sig);
    let rc = unsafe { libc::kill(target, code) };
    if rc != 0 {
        let err = io::Error::last_os_error();
        // ESRCH means the process is already gone; that's not a failure
        // from the caller's point of view (the thing they wanted dead is
        // dead).
        if err.raw_os_error() == Some(libc::ESRCH) {
            return Ok(());
        }
        return Err(Error::Signal { pid, source: err });
    }
    Ok(())
}

/// Whether `pid` currently names a live process.
pub fn is_alive(pid: Pid) -> bool {
    unsafe { libc::kill(pid, 0) == 0 }
}

fn pid_to_signal(pid: Pid) -> Pid {
    let pgid = unsafe { libc::getpgid(pid) };
    if pgid == pid {
        -pid
    } else {
        pid
    }
}
