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

//! Atomic replacement of file content via a staged temporary file.

use super::FileHandlerError;
use super::rename;
use std::fs;
use std::fs::File;
use std::io::Write;
use std::os::unix::fs::PermissionsExt;
use std::path::Path;
use std::path::PathBuf;
use tempfile::TempPath;

/// Marker in a temporary file name pattern that is replaced by random characters.
const WILDCARD: char = '*';

/** Replace the content of `file` with `content`.

The content is first written and synced to a new temporary file in
`staging_dir`, named from `prefix` (see [write_atomic_tmp]). The temporary file
gets the `permissions` mode bits and is then renamed onto `file`, so a reader
will observe either the previous or the new content in full.

The temporary file is removed on any failure before the rename completed.

When `staging_dir` is on another filesystem than `file`, the rename falls back
to a copy that is **not** atomic. Use a staging directory on the same
filesystem as the target when atomicity matters.
*/
pub fn write_atomic<D: AsRef<Path>, F: AsRef<Path>>(
    staging_dir: D,
    prefix: &str,
    file: F,
    content: &[u8],
    permissions: u32,
) -> Result<(), FileHandlerError> {
    let file = file.as_ref();
    let temp_path = write_temp_file(staging_dir.as_ref(), prefix, content)?;
    fs::set_permissions(&temp_path, fs::Permissions::from_mode(permissions))?;
    rename(&temp_path, file)?;
    // The staged name is gone now and must not be removed again on drop.
    let _ = temp_path.keep();
    sync_parent_dir(file);
    Ok(())
}

/// Same as [write_atomic] using the OS temporary directory for staging.
pub fn write_atomic_tmp_dir<F: AsRef<Path>>(
    prefix: &str,
    file: F,
    content: &[u8],
    permissions: u32,
) -> Result<(), FileHandlerError> {
    write_atomic(std::env::temp_dir(), prefix, file, content, permissions)
}

/** Write `content` to a new file in the OS temporary directory and return its
path.

The last `*` in `prefix` is replaced by random characters. Without a `*`,
`_*` is appended. The file is kept and it is up to the caller to remove it.
*/
pub fn write_atomic_tmp(prefix: &str, content: &[u8]) -> Result<PathBuf, FileHandlerError> {
    let temp_path = write_temp_file(&std::env::temp_dir(), prefix, content)?;
    temp_path.keep().map_err(|e| FileHandlerError::Io(e.error))
}

/// Write and sync `content` to a uniquely named new file in `dir`.
///
/// The returned [TempPath] removes the file when dropped.
fn write_temp_file(dir: &Path, prefix: &str, content: &[u8]) -> Result<TempPath, FileHandlerError> {
    let (name_prefix, name_suffix) = split_name_pattern(prefix);
    let mut temp_file = tempfile::Builder::new()
        .prefix(&name_prefix)
        .suffix(name_suffix)
        .tempfile_in(dir)?;
    temp_file.write_all(content)?;
    temp_file.as_file().sync_all()?;
    Ok(temp_file.into_temp_path())
}

/// Split a name pattern into the parts before and after the random characters.
fn split_name_pattern(pattern: &str) -> (String, &str) {
    match pattern.rsplit_once(WILDCARD) {
        Some((prefix, suffix)) => (prefix.to_owned(), suffix),
        None => (format!("{pattern}_"), ""),
    }
}

/// Flush the directory entry of a renamed file to stable storage.
///
/// The new content is already visible at this point, so failure is only logged.
fn sync_parent_dir(file: &Path) {
    let parent = parent_dir(file);
    if let Err(e) = File::open(parent).and_then(|dir| dir.sync_all()) {
        log::warn!("Unable to sync directory '{}': {e}", parent.display());
    }
}

/// Directory holding `file`. A bare file name lives in the working directory.
fn parent_dir(file: &Path) -> &Path {
    file.parent()
        .filter(|parent| !parent.as_os_str().is_empty())
        .unwrap_or(Path::new("."))
}
