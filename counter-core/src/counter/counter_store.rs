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

//! On-disk checkpoint of the counter.

use super::CounterError;
use super::CounterErrorKind;
use super::CounterValue;
use crate::fhandler;
use std::fs;
use std::io;
use std::path::Path;
use std::path::PathBuf;

/// Name prefix of staged counter files.
const STAGING_PREFIX: &str = "counter";
/// Permissions of the counter file.
const COUNTER_FILE_MODE: u32 = 0o644;

/** Location of the persisted counter and how it is written.

Every write goes through [fhandler::write_atomic], so the counter file always
holds a complete value.
*/
#[derive(Debug, Clone)]
pub struct CounterStore {
    file: PathBuf,
    staging_dir: PathBuf,
}

impl CounterStore {
    /// Return a new instance.
    ///
    /// Without an explicit `staging_dir` the directory of `file` is used,
    /// which keeps the final rename on one filesystem.
    pub fn new<P: AsRef<Path>>(file: P, staging_dir: Option<PathBuf>) -> Self {
        let file = file.as_ref().to_path_buf();
        let staging_dir = staging_dir.unwrap_or_else(|| {
            file.parent()
                .filter(|parent| !parent.as_os_str().is_empty())
                .map(Path::to_path_buf)
                .unwrap_or_else(|| PathBuf::from("."))
        });
        Self { file, staging_dir }
    }

    /// Path of the counter file.
    pub fn file(&self) -> &Path {
        &self.file
    }

    /// Directory where new content is staged before it replaces the file.
    pub fn staging_dir(&self) -> &Path {
        &self.staging_dir
    }

    /// Create the counter file with a zero value unless it already exists.
    ///
    /// Return `true` if the file was created.
    pub fn initialize_if_absent(&self) -> Result<bool, CounterError> {
        match fs::metadata(&self.file) {
            Ok(_) => Ok(false),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                log::info!("Creating counter file '{}'.", self.file.display());
                self.write(CounterValue::ZERO).map_err(|e| {
                    CounterErrorKind::StorageFailure.error_with_msg(format!(
                        "Unable to create file '{}': {e}",
                        self.file.display()
                    ))
                })?;
                Ok(true)
            }
            Err(e) => Err(CounterErrorKind::StorageFailure.error_with_msg(format!(
                "Unable to access file '{}': {e}",
                self.file.display()
            ))),
        }
    }

    /// Read the persisted counter.
    pub fn load(&self) -> Result<CounterValue, CounterError> {
        let content = fs::read(&self.file).map_err(|e| {
            CounterErrorKind::StorageFailure.error_with_msg(format!(
                "Unable to read file '{}': {e}",
                self.file.display()
            ))
        })?;
        CounterValue::from_bytes(&content)
    }

    /// Atomically replace the persisted counter with `value`.
    pub fn persist(&self, value: CounterValue) -> Result<(), CounterError> {
        self.write(value).map_err(|e| {
            CounterErrorKind::PersistenceFailure.error_with_msg(format!(
                "Unable to write file '{}': {e}",
                self.file.display()
            ))
        })
    }

    fn write(&self, value: CounterValue) -> Result<(), Box<dyn std::error::Error>> {
        let content = value.to_bytes()?;
        fhandler::write_atomic(
            &self.staging_dir,
            STAGING_PREFIX,
            &self.file,
            &content,
            COUNTER_FILE_MODE,
        )?;
        Ok(())
    }
}
