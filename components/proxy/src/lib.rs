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

//! demandproxy — an on-demand local TCP reverse proxy.
//!
//! Launches a backing service subprocess the first time a client connects to
//! one of its listening ports, proxies traffic to it, and stops it again
//! after an idle period. See each module for the component it implements.

pub mod config;
pub mod controller;
pub mod descriptor;
pub mod error;
pub mod listener;
pub mod port;
pub mod probe;
pub mod pump;
pub mod redirect;
pub mod supervisor;
pub mod sys;

pub use controller::ServiceController;
pub use descriptor::{DescriptorFile, ServiceDescriptor};
pub use error::{Error, Result};
