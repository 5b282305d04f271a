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

//! Platform collaborator: dead-process cleanup (spec §6).
//!
//! Invoked by the run loop after a child has exited (by any means), taking
//! the pid and the descriptor's graceful signal. Must be safe to call on an
//! already-exited process — on Unix this means tolerating `ESRCH`.

use demandproxy_core::process::{Pid, Signal};

#[cfg(not(windows))]
#[path = "unix.rs"]
mod imp;

#[cfg(windows)]
#[path = "windows.rs"]
mod imp;

/// Reaches into the child's process group and makes sure nothing it left
/// behind survives it. A no-op if the group is already empty.
pub fn cleanup_dead_process(pid: Pid, stop_signal: Signal) {
    imp::cleanup_dead_process(pid, stop_signal);
}
