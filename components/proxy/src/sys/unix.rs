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

use demandproxy_core::process::{Pid, Signal};

/// Best-effort sweep of the child's process group. By the time this runs the
/// supervisor has already waited for the pid itself to exit; this only
/// catches grandchildren the child spawned into its own group (it was
/// launched as its own group leader, see `supervisor::sys::own_process_group`)
/// and left behind. `ESRCH` (group already empty) is expected and silent;
/// anything else is logged at debug, per the "safe to call on an
/// already-exited process" contract.
pub fn cleanup_dead_process(pid: Pid, stop_signal: Signal) {
    let code: i32 = stop_signal.into();
    let rc = unsafe { libc::kill(-pid, code) };
    if rc != 0 {
        let err = std::io::Error::last_os_error();
        if err.raw_os_error() != Some(libc::ESRCH) {
            log::debug!("dead-process cleanup for group {pid} failed: {err}");
        }
    }
}
