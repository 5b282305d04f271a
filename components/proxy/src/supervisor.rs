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

//! Subprocess Supervisor (spec §4.3).
//!
//! Owns exactly one child process at a time: spawns it with the injected
//! port environment, and on demand terminates it with a graceful signal
//! followed by an unconditional kill if it doesn't exit in time. Embedded
//! inside `ServiceController::run` rather than its own task, mirroring how
//! the teacher embeds `sys::unix::service::Process` inside `Supervisor`.

use std::collections::HashMap;
use std::process::Stdio;
use std::time::Duration;

use demandproxy_core::process::{self, Pid, Signal};
use tokio::process::{Child, Command};
use tokio::time::timeout;

use crate::descriptor::ServiceDescriptor;
use crate::error::{Error, Result};

/// Wall-clock window between sending the graceful signal and escalating to
/// an unconditional kill.
const GRACEFUL_STOP_WINDOW: Duration = Duration::from_secs(5);

/// A live child process, tracked just long enough to signal and reap it.
pub struct Supervised {
    child: Child,
    pid: Pid,
}

impl Supervised {
    pub fn pid(&self) -> Pid {
        self.pid
    }

    /// Awaits the child's exit, regardless of cause. The run loop treats
    /// every exit identically (spec §4.3 step 8-9, §7 "subprocess crash").
    pub async fn wait(&mut self) -> Result<()> {
        self.child.wait().await.map_err(Error::Io)?;
        Ok(())
    }

    /// Sends `stop_signal`; if the process has not exited within
    /// `GRACEFUL_STOP_WINDOW`, escalates to `Signal::KILL`. Waits for exit
    /// either way before returning. Safe to call on an already-exited
    /// process (the dead-process cleanup contract of spec §6).
    pub async fn stop(&mut self, stop_signal: Signal) -> Result<()> {
        if let Err(err) = process::signal(self.pid, stop_signal) {
            log::debug!("stop signal to pid {} failed (likely already exited): {err}", self.pid);
        }

        if timeout(GRACEFUL_STOP_WINDOW, self.child.wait())
            .await
            .is_err()
        {
            log::debug!(
                "pid {} did not exit within {:?} of {}, escalating to KILL",
                self.pid,
                GRACEFUL_STOP_WINDOW,
                stop_signal
            );
            if let Err(err) = process::signal(self.pid, Signal::KILL) {
                log::debug!("kill signal to pid {} failed (likely already exited): {err}", self.pid);
            }
            self.child.wait().await.map_err(Error::Io)?;
        }
        Ok(())
    }
}

/// Spawns `descriptor.command` in `descriptor.workdir`, in its own session,
/// with `descriptor.env` plus one `PORT_<public>` entry per `port_map` pair.
pub fn spawn(descriptor: &ServiceDescriptor, port_map: &HashMap<u16, u16>) -> Result<Supervised> {
    let (program, args) = descriptor
        .command
        .split_first()
        .ok_or_else(|| Error::Spawn {
            command: String::new(),
            source: std::io::Error::new(std::io::ErrorKind::InvalidInput, "empty command"),
        })?;

    let mut cmd = Command::new(program);
    cmd.args(args)
        .current_dir(&descriptor.workdir)
        .envs(&descriptor.env)
        .stdin(Stdio::inherit())
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit())
        .kill_on_drop(false);

    for (&public, &backend) in port_map {
        cmd.env(ServiceDescriptor::port_var(public), backend.to_string());
    }

    sys::own_process_group(&mut cmd);

    let child = cmd.spawn().map_err(|source| Error::Spawn {
        command: descriptor.command.join(" "),
        source,
    })?;
    let pid = child
        .id()
        .ok_or_else(|| Error::Spawn {
            command: descriptor.command.join(" "),
            source: std::io::Error::new(std::io::ErrorKind::Other, "child exited before its pid was observable"),
        })? as Pid;

    Ok(Supervised { child, pid })
}

#[cfg(unix)]
mod sys {
    use tokio::process::Command;

    /// Puts the child in its own process group so a single signal to the
    /// group never reaches this proxy. Mirrors the launcher's `owned_pgid`.
    pub fn own_process_group(cmd: &mut Command) {
        unsafe {
            cmd.pre_exec(|| {
                if libc::setpgid(0, 0) != 0 {
                    return Err(std::io::Error::last_os_error());
                }
                Ok(())
            });
        }
    }
}

#[cfg(windows)]
mod sys {
    use tokio::process::Command;

    /// Windows has no process groups in the Unix sense; `CREATE_NEW_PROCESS_GROUP`
    /// gives the child its own console group instead, which is enough for the
    /// dead-process-cleanup collaborator to target it without affecting us.
    pub fn own_process_group(cmd: &mut Command) {
        const CREATE_NEW_PROCESS_GROUP: u32 = 0x0000_0200;
        cmd.creation_flags(CREATE_NEW_PROCESS_GROUP);
    }
}
