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

use std::collections::HashMap;
use std::path::PathBuf;

use serde::Deserialize;

use demandproxy_core::process::Signal;

/// One backing service, as loaded from the descriptor file. Immutable once
/// constructed; the `ServiceController` is the only thing that carries
/// mutable state derived from it.
#[derive(Clone, Debug, Deserialize)]
pub struct ServiceDescriptor {
    /// Identifier for logs; does not need to be unique but should be.
    pub name: String,

    /// argv of the backing executable. `command[0]` is the program.
    pub command: Vec<String>,

    /// Working directory for the child. Defaults to the current directory.
    #[serde(default = "default_workdir")]
    pub workdir: PathBuf,

    /// Base environment the child inherits, in addition to `PORT_<P>`.
    #[serde(default)]
    pub env: HashMap<String, String>,

    /// Public port numbers the service is reachable on, in descriptor order.
    pub ports: Vec<u16>,

    /// Signal sent for graceful termination.
    #[serde(default, with = "signal_name")]
    pub stop_signal: Signal,
}

fn default_workdir() -> PathBuf {
    PathBuf::from(".")
}

impl ServiceDescriptor {
    /// The environment variable name a public port is exposed under, e.g.
    /// `PORT_8080`.
    pub fn port_var(public_port: u16) -> String {
        format!("PORT_{public_port}")
    }
}

/// The on-disk shape of a descriptor file: a bare array of services under a
/// `[[service]]` TOML table, so a file reads as a flat list of entries.
#[derive(Debug, Deserialize)]
pub struct DescriptorFile {
    #[serde(rename = "service", default)]
    pub services: Vec<ServiceDescriptor>,
}

/// (De)serializes a `Signal` from its name (`"TERM"`, `"INT"`, ...) since
/// descriptor authors write signal names, not our internal enum repr.
mod signal_name {
    use std::str::FromStr;

    use serde::{Deserialize, Deserializer};

    use demandproxy_core::process::Signal;

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Signal, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = Option::<String>::deserialize(deserializer)?;
        match raw {
            None => Ok(Signal::default()),
            Some(s) => Signal::from_str(&s).map_err(serde::de::Error::custom),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_minimal_service() {
        let toml = r#"
            [[service]]
            name = "echo"
            command = ["echo-service"]
            ports = [8080]
        "#;
        let file: DescriptorFile = toml::from_str(toml).unwrap();
        assert_eq!(file.services.len(), 1);
        let svc = &file.services[0];
        assert_eq!(svc.name, "echo");
        assert_eq!(svc.ports, vec![8080]);
        assert_eq!(svc.stop_signal, Signal::INT);
    }

    #[test]
    fn parses_full_service() {
        let toml = r#"
            [[service]]
            name = "echo"
            command = ["echo-service", "--verbose"]
            workdir = "/tmp"
            ports = [8080, 8443]
            stop_signal = "TERM"

            [service.env]
            RUST_LOG = "debug"
        "#;
        let file: DescriptorFile = toml::from_str(toml).unwrap();
        let svc = &file.services[0];
        assert_eq!(svc.workdir, PathBuf::from("/tmp"));
        assert_eq!(svc.stop_signal, Signal::TERM);
        assert_eq!(svc.env.get("RUST_LOG").map(String::as_str), Some("debug"));
    }

    #[test]
    fn port_var_formats_as_port_underscore_number() {
        assert_eq!(ServiceDescriptor::port_var(8080), "PORT_8080");
    }
}
