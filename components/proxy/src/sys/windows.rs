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

/// Windows has no process-group signal sweep; the child was launched under
/// `CREATE_NEW_PROCESS_GROUP` (see `supervisor::sys::own_process_group`) and
/// the supervisor's own `stop()`/`wait()` already reaped it by the time this
/// runs, so there is nothing left to clean up here. Kept as a symmetric
/// no-op so call sites stay platform-agnostic.
pub fn cleanup_dead_process(_pid: Pid, _stop_signal: Signal) {}
