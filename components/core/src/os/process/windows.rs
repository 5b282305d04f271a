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

use winapi::shared::minwindef::FALSE;
use winapi::um::handleapi::CloseHandle;
use winapi::um::processthreadsapi::{OpenProcess, TerminateProcess};
use winapi::um::winnt::{PROCESS_QUERY_LIMITED_INFORMATION, PROCESS_TERMINATE, SYNCHRONIZE};

use super::{Pid, Signal};
use crate::error::{Error, Result};

/// Windows has no signal table; every `Signal` variant maps to the same
/// unconditional `TerminateProcess`. Descriptors that name a graceful
/// `stop_signal` on Windows get the same treatment `habitat_launcher` gives
/// them on this platform.
pub fn signal(pid: Pid, _sig: Signal) -> Result<()> {
    unsafe {
        let handle = OpenProcess(PROCESS_TERMINATE | SYNCHRONIZE, FALSE, pid);
        if handle.is_null() {
            let err = io::Error::last_os_error();
            return Err(Error::Signal { pid, source: err });
        }
        let ok = TerminateProcess(handle, 1);
        CloseHandle(handle);
        if ok == 0 {
            return Err(Error::Signal {
                pid,
                source: io::Error::last_os_error(),
            });
        }
    }
    Ok(())
}

pub fn is_alive(pid: Pid) -> bool {
    unsafe {
        let handle = OpenProcess(PROCESS_QUERY_LIMITED_INFORMATION, FALSE, pid);
        if handle.is_null() {
            return false;
        }
        CloseHandle(handle);
        true
    }
}
