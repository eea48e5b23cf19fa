/*
    Copyright 2025 MydriaTech AB

    Licensed under the Apache License 2.0 with Free world makers exception
    1.0.0 (the "License"); you may not use this file except in compliance with
    the License. You should have obtained a copy of the License with the source
    or binary distribution in file named

        LICENSE-Apache-2.0-with-FWM-Exception-1.0.0

    Unless required by applicable law or agreed to in writing, software
    distributed under the License is distributed on an "AS IS" BASIS,
    WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
    See the License for the specific language governing permissions and
    limitations under the License.
*/

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![doc = include_str!("../README.md")]

use clap::Parser;
use counter_api::rest_api::run_http_server;
pub use counter_core::AppConfig;
pub use counter_core::CounterService;
use counter_core::conf::ApiConfig;
use counter_core::counter::CounterError;
use counter_core::util::ShutdownSignal;
use std::process::ExitCode;
use std::sync::Arc;

/// Command line arguments. These override any other configuration source.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Path to the counter file.
    #[arg(long)]
    file: Option<String>,
    /// Address to listen on in the form `[ip]:port`.
    #[arg(long)]
    listen: Option<String>,
}

impl Args {
    /// Translate arguments to configuration overrides.
    fn config_overrides(&self) -> Result<Vec<(&'static str, String)>, CounterError> {
        let mut overrides = Vec::new();
        if let Some(file) = &self.file {
            overrides.push(("storage.file", file.to_owned()));
        }
        if let Some(listen) = &self.listen {
            let (address, port) = ApiConfig::parse_listen_address(listen)?;
            overrides.push(("api.address", address));
            overrides.push(("api.port", port.to_string()));
        }
        Ok(overrides)
    }
}

/// Application main entrypoint.
fn main() -> ExitCode {
    let args = Args::parse();
    if let Err(e) = init_logger() {
        println!("Failed to initialize logging: {e:?}");
        return ExitCode::FAILURE;
    }
    let app_config = match args
        .config_overrides()
        .and_then(|overrides| AppConfig::new(env!("CARGO_PKG_NAME"), &overrides))
    {
        Ok(app_config) => Arc::new(app_config),
        Err(e) => {
            log::error!("Failed to load configuration: {e}");
            return ExitCode::FAILURE;
        }
    };
    match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime.block_on(run_async(app_config)),
        Err(e) => {
            log::error!("Failed to start async runtime: {e}");
            ExitCode::FAILURE
        }
    }
}

/// Initialize the logging system and apply filters.
fn init_logger() -> Result<(), log::SetLoggerError> {
    env_logger::builder()
        // Set default log level
        .filter_level(log::LevelFilter::Debug)
        // Customize logging for dependencies
        .filter(Some("actix_server::builder"), log::LevelFilter::Warn)
        .filter(Some("actix_http::h1"), log::LevelFilter::Info)
        .filter(Some("mio::poll"), log::LevelFilter::Info)
        .filter(Some("counter_core::fhandler"), log::LevelFilter::Info)
        .write_style(env_logger::fmt::WriteStyle::Auto)
        .target(env_logger::fmt::Target::Stdout)
        .is_test(false)
        .parse_env(
            env_logger::Env::new()
                .filter("LOG_LEVEL")
                .write_style("LOG_STYLE"),
        )
        .try_init()
}

/// Async code entry point.
pub async fn run_async(app_config: Arc<AppConfig>) -> ExitCode {
    let counter = match CounterService::new(&app_config) {
        Ok(counter) => counter,
        Err(e) => {
            log::error!("Unable to start: {e}");
            return ExitCode::FAILURE;
        }
    };
    let shutdown = ShutdownSignal::new();
    let res = match shutdown.trigger_on_termination() {
        Ok(()) => run_http_server(&app_config, &counter, &shutdown)
            .await
            .map_err(|e| log::error!("{e}")),
        Err(e) => {
            log::error!("Unable to listen for termination signals: {e}");
            Err(())
        }
    };
    let released = counter
        .release()
        .map_err(|e| log::error!("Failed to release counter: {e}"));
    if res.is_ok() && released.is_ok() {
        log::info!("Stopped with counter at {}.", counter.read_current());
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}
