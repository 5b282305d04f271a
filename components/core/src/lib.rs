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

//! Process and signal primitives shared between the service controller and
//! the sample embedder binary.
//!
//! This crate intentionally knows nothing about descriptors, ports, or
//! connection handling — it is the narrow OS-facing layer the rest of
//! `demandproxy` builds on, the same way `habitat_core` sits underneath the
//! supervisor and launcher in the teacher repo.

pub mod error;
pub mod os;

pub use error::{Error, Result};
pub use os::process::{self, Pid, Signal};
