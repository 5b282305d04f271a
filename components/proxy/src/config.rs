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

//! Embedder configuration: CLI args plus the on-disk descriptor file.
//!
//! Not part of the core's contract (spec §6 "process surface") — the core
//! library never parses configuration. This lives in the binary crate only,
//! the way the teacher keeps `clap`/TOML handling inside `sup::main` rather
//! than `habitat_core`.

use std::fs;
use std::path::PathBuf;

use clap::Parser;

use crate::descriptor::DescriptorFile;
use crate::error::{Error, Result};

#[derive(Debug, Parser)]
#[command(name = "demandproxy", about = "On-demand local TCP reverse proxy")]
pub struct Args {
    /// Path to a TOML file listing `[[service]]` descriptors.
    #[arg(short, long, value_name = "FILE")]
    pub descriptor: PathBuf,

    /// Log level, passed through to `env_logger` as its default filter.
    #[arg(short = 'v', long, default_value = "info")]
    pub verbosity: String,
}

pub fn load_descriptor_file(path: &PathBuf) -> Result<DescriptorFile> {
    let raw = fs::read_to_string(path).map_err(|source| Error::DescriptorRead {
        path: path.display().to_string(),
        source,
    })?;
    toml::from_str(&raw).map_err(|source| Error::DescriptorParse {
        path: path.display().to_string(),
        source,
    })
}
