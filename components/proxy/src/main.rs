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

use std::process;
use std::sync::Arc;
use std::time::Duration;

use ansi_term::Colour::Red;
use clap::Parser;
use tokio_graceful_shutdown::{SubsystemBuilder, Toplevel};

use demandproxy::config::{self, Args};
use demandproxy::controller::ServiceController;
use demandproxy::listener;

fn main() {
    let args = Args::parse();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(&args.verbosity)).init();

    if let Err(err) = run(args) {
        eprintln!("{}", Red.paint(err.to_string()));
        process::exit(1);
    }
}

fn run(args: Args) -> Result<(), demandproxy::Error> {
    let descriptor_file = config::load_descriptor_file(&args.descriptor)?;
    if descriptor_file.services.is_empty() {
        log::warn!("descriptor file `{}` lists no services", args.descriptor.display());
    }

    // A current-thread runtime, not `rt-multi-thread`: the Service Controller's
    // state machine (`wanted`/`started`/`users`) relies on single-threaded
    // cooperative scheduling with no lock guarding it (see SPEC_FULL.md §5);
    // running it under true parallelism would let `enter()` and `exit()` on
    // different worker threads interleave around the `users` 0-transition and
    // violate the "service must not be killed while a client is attached"
    // guarantee.
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(demandproxy::Error::Io)?;
    runtime.block_on(async move {
        let controllers: Vec<Arc<ServiceController>> = descriptor_file
            .services
            .into_iter()
            .map(ServiceController::new)
            .collect();

        Toplevel::new(|s| async move {
            for controller in controllers {
                let name = controller.name().to_string();
                s.start(SubsystemBuilder::new(name, move |subsys| {
                    listener::run_service(controller, subsys)
                }));
            }
        })
        .catch_signals()
        .handle_shutdown_requests(Duration::from_secs(10))
        .await
        .map_err(|err| demandproxy::Error::Io(std::io::Error::new(std::io::ErrorKind::Other, err.to_string())))
    })
}
