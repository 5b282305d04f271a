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
use std::net::SocketAddr;

use demandproxy_core::Error as CoreError;

pub type Result<T> = std::result::Result<T, Error>;

/// Everything that can go wrong running demandproxy, grouped the way the
/// teacher groups `sup::error::Error`: one flat enum, one variant per
/// failure mode, `thiserror` doing the `Display`/`source` wiring.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("failed to load service descriptor {path}")]
    DescriptorRead {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("malformed service descriptor {path}")]
    DescriptorParse {
        path: String,
        #[source]
        source: toml::de::Error,
    },

    #[error("descriptor names no ports")]
    NoPorts,

    #[error("failed to bind listener on {addr}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: io::Error,
    },

    #[error("failed to spawn backing service `{command}`")]
    Spawn {
        command: String,
        #[source]
        source: io::Error,
    },

    #[error("connection to backing service for `{service}` failed")]
    Connect {
        service: String,
        #[source]
        source: io::Error,
    },

    #[error(transparent)]
    Core(#[from] CoreError),

    #[error(transparent)]
    Io(#[from] io::Error),
}
