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

//! Parsing of configuration for counter storage.

use super::AppConfigDefaults;
use config::ConfigBuilder;
use config::ConfigError;
use config::builder::BuilderState;
use serde::Deserialize;
use serde::Serialize;
use std::path::Path;
use std::path::PathBuf;

/// Name of the lock file in the OS temporary directory.
const DEFAULT_LOCK_FILE_NAME: &str = "counter.lock";

/// Configuration for counter storage.
#[derive(Debug, Deserialize, Serialize)]
pub struct StorageConfig {
    /// Path to the counter file.
    file: String,
    /// Path to the process exclusivity lock file.
    lockfile: String,
    /// Directory for staging new counter file content.
    stagingdir: String,
}

impl AppConfigDefaults for StorageConfig {
    /// Provide defaults for this part of the configuration
    fn set_defaults<T: BuilderState>(
        config_builder: ConfigBuilder<T>,
        prefix: &str,
    ) -> Result<ConfigBuilder<T>, ConfigError> {
        config_builder
            .set_default(prefix.to_string() + "." + "file", "counter.txt")?
            .set_default(prefix.to_string() + "." + "lockfile", "")?
            .set_default(prefix.to_string() + "." + "stagingdir", "")
    }
}

impl StorageConfig {
    /// Path to the counter file. Defaults to `counter.txt`.
    pub fn file(&self) -> &Path {
        Path::new(&self.file)
    }

    /// Path to the process exclusivity lock file.
    ///
    /// Defaults to `counter.lock` in the OS temporary directory, so all
    /// instances on a host share it.
    pub fn lock_file(&self) -> PathBuf {
        if self.lockfile.is_empty() {
            std::env::temp_dir().join(DEFAULT_LOCK_FILE_NAME)
        } else {
            PathBuf::from(&self.lockfile)
        }
    }

    /// Directory for staging new counter file content, if configured.
    pub fn staging_dir(&self) -> Option<PathBuf> {
        (!self.stagingdir.is_empty()).then(|| PathBuf::from(&self.stagingdir))
    }

    /// Return `true` if a counter file path is set.
    pub(crate) fn has_file(&self) -> bool {
        !self.file.trim().is_empty()
    }
}
