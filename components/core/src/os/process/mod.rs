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

//! Cross-platform process signalling.
//!
//! Mirrors the split the teacher uses for `core::os::process`: a
//! platform-independent `Signal` enum here, with the actual syscalls living
//! under `unix` / `windows`.

use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

#[cfg(not(windows))]
#[path = "unix.rs"]
mod imp;

#[cfg(windows)]
#[path = "windows.rs"]
mod imp;

pub use imp::{is_alive, signal};

/// OS process identifier. `i32` on Unix (a `pid_t`), `u32` on Windows.
#[cfg(not(windows))]
pub type Pid = libc::pid_t;
#[cfg(windows)]
pub type Pid = u32;

/// Signals the core cares about. Only `INT`, `TERM`, and `KILL` are ever sent
/// by demandproxy itself; the rest exist so a descriptor's `stop_signal` can
/// name any of them.
#[allow(non_snake_case)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Signal {
    HUP,
    INT,
    QUIT,
    ILL,
    ABRT,
    FPE,
    KILL,
    USR1,
    SEGV,
    USR2,
    ALRM,
    TERM,
}

impl Default for Signal {
    /// Per the service descriptor contract: graceful termination defaults to
    /// interrupt, not terminate.
    fn default() -> Self {
        Signal::INT
    }
}

impl From<Signal> for i32 {
    fn from(value: Signal) -> i32 {
        match value {
            Signal::HUP => 1,
            Signal::INT => 2,
            Signal::QUIT => 3,
            Signal::ILL => 4,
            Signal::ABRT => 6,
            Signal::FPE => 8,
            Signal::KILL => 9,
            Signal::USR1 => 10,
            Signal::SEGV => 11,
            Signal::USR2 => 12,
            Signal::ALRM => 14,
            Signal::TERM => 15,
        }
    }
}

impl FromStr for Signal {
    type Err = ParseSignalError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "HUP" => Ok(Signal::HUP),
            "INT" => Ok(Signal::INT),
            "QUIT" => Ok(Signal::QUIT),
            "ILL" => Ok(Signal::ILL),
            "ABRT" => Ok(Signal::ABRT),
            "FPE" => Ok(Signal::FPE),
            "KILL" => Ok(Signal::KILL),
            "USR1" => Ok(Signal::USR1),
            "SEGV" => Ok(Signal::SEGV),
            "USR2" => Ok(Signal::USR2),
            "ALRM" => Ok(Signal::ALRM),
            "TERM" => Ok(Signal::TERM),
            other => Err(ParseSignalError(other.to_string())),
        }
    }
}

impl Display for Signal {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        let s = match *self {
            Signal::HUP => "HUP",
            Signal::INT => "INT",
            Signal::QUIT => "QUIT",
            Signal::ILL => "ILL",
            Signal::ABRT => "ABRT",
            Signal::FPE => "FPE",
            Signal::KILL => "KILL",
            Signal::USR1 => "USR1",
            Signal::SEGV => "SEGV",
            Signal::USR2 => "USR2",
            Signal::ALRM => "ALRM",
            Signal::TERM => "TERM",
        };
        write!(f, "{}", s)
    }
}

#[derive(Debug, thiserror::Error)]
#[error("'{0}' is not a recognized signal name")]
pub struct ParseSignalError(String);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signal_round_trips_through_its_name() {
        for sig in [
            Signal::HUP,
            Signal::INT,
            Signal::TERM,
            Signal::KILL,
            Signal::USR1,
        ] {
            assert_eq!(sig, sig.to_string().parse().unwrap());
        }
    }

    #[test]
    fn default_stop_signal_is_interrupt() {
        assert_eq!(Signal::default(), Signal::INT);
    }
}
