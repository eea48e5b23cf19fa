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

//! Parsing of application configuration.

mod api_config;
mod storage_config;

use config::Config;
use config::ConfigBuilder;
use config::ConfigError;
use config::Environment;
use config::File;
use config::builder::BuilderState;
use config::builder::DefaultState;
use serde::Deserialize;
use serde::Serialize;

pub use self::api_config::ApiConfig;
pub use self::storage_config::StorageConfig;
use crate::counter::CounterError;
use crate::counter::CounterErrorKind;

/// Package version reported by Cargo at build time.
const CARGO_PKG_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Static trait for tracking implementations.
trait AppConfigDefaults {
    fn set_defaults<T: BuilderState>(
        config_builder: ConfigBuilder<T>,
        prefix: &str,
    ) -> Result<ConfigBuilder<T>, ConfigError>;
}

/**
Application configration root.

The application name defaults to the Rust package name, but can be overridden
with the environment variable `APP_NAME`.

Configuration will be loaded from

1. the file `{application name}.json` in the current working directory.
2. environment variable overrides in the form
   `{APPLICATION_NAME}_MODULE_CONFIGKEYWITHOUTSPACES`
3. overrides passed by the caller, typically from the command line.
 */
#[derive(Debug, Deserialize, Serialize)]
pub struct AppConfig {
    /// Configuration of the exposed REST API.
    pub api: ApiConfig,
    /// Configuration of counter storage.
    pub storage: StorageConfig,

    /// Lower case application name. Ignored when loading configuration.
    #[serde(skip_deserializing)]
    app_name: String,
}

impl AppConfig {
    /// The application name defaults to the Rust package name, but can be
    /// overridden with the environment variable `APP_NAME`.
    fn read_app_name_lowercase(cargo_pkg_name: &str) -> String {
        std::env::var("APP_NAME")
            .map_err(|e| {
                log::debug!(
                    "Environment variable APP_NAME: {e:?} -> Default app name '{cargo_pkg_name}' will be used."
                );
            })
            .ok()
            .map(|value| value.to_lowercase())
            .unwrap_or(cargo_pkg_name.to_owned())
    }

    /// Lower case application name.
    pub fn app_name_lowercase(&self) -> &str {
        &self.app_name
    }

    /// SemVer application version derived fromt the Rust package version.
    pub fn app_version(&self) -> &'static str {
        CARGO_PKG_VERSION
    }

    /** Creates a new instance pre-populated with defaults, an optional
    configurations file, environment variable overrides and finally the
    `overrides` as `(key, value)` pairs like `("storage.file", "/tmp/c.txt")`.

    Use `env!("CARGO_PKG_NAME")` as `cargo_pkg_name`.
    */
    pub fn new(cargo_pkg_name: &str, overrides: &[(&str, String)]) -> Result<Self, CounterError> {
        let app_name = Self::read_app_name_lowercase(cargo_pkg_name);
        let config_filename = app_name.to_owned() + ".json";
        let config_env_prefix = &app_name.to_uppercase();
        let conf_file = std::env::current_dir()
            .map_err(|e| {
                CounterErrorKind::Configuration
                    .error_with_msg(format!("Unable to resolve working directory: {e}"))
            })?
            .join(config_filename);
        if log::log_enabled!(log::Level::Debug) {
            log::debug!(
                "Will load '{}' configuration if present.",
                conf_file.display()
            );
        }
        let mut app_config: AppConfig =
            Self::build(&conf_file.to_string_lossy(), config_env_prefix, overrides)
                .and_then(Config::try_deserialize)
                .map_err(|e| CounterErrorKind::Configuration.error_with_msg(e.to_string()))?;
        app_config.app_name = app_name;
        app_config.validate()?;
        log::info!("Running with configuration: {app_config:?}");
        Ok(app_config)
    }

    fn build(
        conf_file: &str,
        config_env_prefix: &str,
        overrides: &[(&str, String)],
    ) -> Result<Config, ConfigError> {
        let mut config_builder: ConfigBuilder<DefaultState> = Config::builder();
        config_builder = ApiConfig::set_defaults(config_builder, "api")?;
        config_builder = StorageConfig::set_defaults(config_builder, "storage")?;
        config_builder = config_builder
            .add_source(File::with_name(conf_file).required(false))
            .add_source(Environment::with_prefix(config_env_prefix).separator("_"));
        for (key, value) in overrides {
            config_builder = config_builder.set_override(*key, value.as_str())?;
        }
        config_builder.build()
    }

    /// Reject configurations the service can't run with.
    fn validate(&self) -> Result<(), CounterError> {
        if !self.storage.has_file() {
            return Err(CounterErrorKind::Configuration.error_with_msg("Counter file path is empty."));
        }
        if self.api.bind_address().trim().is_empty() {
            return Err(CounterErrorKind::Configuration.error_with_msg("Listen address is empty."));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn defaults_and_overrides() {
        let app_config = AppConfig::new("counter-conf-test", &[]).unwrap();
        assert_eq!(app_config.app_name_lowercase(), "counter-conf-test");
        assert_eq!(app_config.api.bind_address(), "0.0.0.0");
        assert_eq!(app_config.api.bind_port(), 8080);
        assert_eq!(app_config.storage.file(), Path::new("counter.txt"));
        assert_eq!(
            app_config.storage.lock_file(),
            std::env::temp_dir().join("counter.lock")
        );
        assert_eq!(app_config.storage.staging_dir(), None);

        let app_config = AppConfig::new(
            "counter-conf-test",
            &[
                ("storage.file", "/var/lib/counter/value.txt".to_owned()),
                ("storage.stagingdir", "/var/lib/counter".to_owned()),
                ("api.address", "127.0.0.1".to_owned()),
                ("api.port", "9090".to_owned()),
            ],
        )
        .unwrap();
        assert_eq!(
            app_config.storage.file(),
            Path::new("/var/lib/counter/value.txt")
        );
        assert_eq!(
            app_config.storage.staging_dir(),
            Some(Path::new("/var/lib/counter").to_path_buf())
        );
        assert_eq!(app_config.api.bind_address(), "127.0.0.1");
        assert_eq!(app_config.api.bind_port(), 9090);
    }

    #[test]
    fn empty_counter_file_is_rejected() {
        let res = AppConfig::new("counter-conf-test", &[("storage.file", String::new())]);
        assert_eq!(
            res.unwrap_err().kind(),
            &CounterErrorKind::Configuration
        );
    }
}
