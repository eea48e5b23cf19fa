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

//! Renaming and copying of files and directory trees.

use super::FileHandlerError;
use nix::errno::Errno;
use std::fs;
use std::fs::File;
use std::io;
use std::path::Path;

/** Rename `src` to `dst`.

On a single filesystem this is an atomic metadata operation. When `src` and
`dst` live on different filesystems the rename is emulated by copying `src` to
`dst` and then removing `src`. This fallback is **not** atomic: an observer of
`dst` may see a partially copied file or tree while it runs.

Works for regular files and directories. Symbolic links inside a directory tree
are skipped by the fallback.
*/
pub fn rename<P: AsRef<Path>, Q: AsRef<Path>>(src: P, dst: Q) -> Result<(), FileHandlerError> {
    let src = src.as_ref();
    let dst = dst.as_ref();
    match fs::rename(src, dst) {
        Ok(()) => Ok(()),
        Err(e) if is_cross_device(&e) => {
            log::debug!(
                "Moving '{}' to '{}' crosses filesystems. Falling back to non-atomic copy.",
                src.display(),
                dst.display()
            );
            move_by_copy(src, dst)
        }
        Err(e) => Err(e.into()),
    }
}

/// Return `true` if the error was caused by a rename across filesystems.
///
/// The message text comparison is a last resort for platforms that neither map
/// the condition to [io::ErrorKind::CrossesDevices] nor report `EXDEV`. It is
/// fragile since the text depends on the C library in use.
fn is_cross_device(e: &io::Error) -> bool {
    e.kind() == io::ErrorKind::CrossesDevices
        || e.raw_os_error() == Some(Errno::EXDEV as i32)
        || e.to_string().contains("cross-device link")
}

/// Copy `src` to `dst` and remove `src` afterwards.
///
/// Once the copy succeeded `dst` holds the moved content, so a failure to
/// remove `src` is only logged.
pub(crate) fn move_by_copy(src: &Path, dst: &Path) -> Result<(), FileHandlerError> {
    let removal = if fs::metadata(src)?.is_dir() {
        copy_dir(src, dst)?;
        fs::remove_dir_all(src)
    } else {
        copy_file(src, dst)?;
        fs::remove_file(src)
    };
    if let Err(e) = removal {
        log::warn!(
            "Moved '{}' to '{}', but the source could not be removed: {e}",
            src.display(),
            dst.display()
        );
    }
    Ok(())
}

/** Copy the content of the file `src` to the file `dst`.

`dst` is created if it does not exist and truncated if it does. The copied data
is flushed to stable storage and the permission mode of `src` is applied to
`dst`.
*/
pub fn copy_file<P: AsRef<Path>, Q: AsRef<Path>>(
    src: P,
    dst: Q,
) -> Result<(), FileHandlerError> {
    let src = src.as_ref();
    let dst = dst.as_ref();
    let mut input = File::open(src)?;
    let mut output = File::create(dst)?;
    io::copy(&mut input, &mut output)?;
    output.sync_all()?;
    let permissions = input.metadata()?.permissions();
    fs::set_permissions(dst, permissions)?;
    Ok(())
}

/** Recursively copy the directory tree `src` to `dst`.

`src` must be a directory and `dst` must not exist. Permission modes are
preserved and symbolic links are skipped (neither followed nor recreated).
*/
pub fn copy_dir<P: AsRef<Path>, Q: AsRef<Path>>(src: P, dst: Q) -> Result<(), FileHandlerError> {
    let src = src.as_ref();
    let dst = dst.as_ref();
    let metadata = fs::metadata(src)?;
    if !metadata.is_dir() {
        return Err(FileHandlerError::SourceNotDirectory);
    }
    match fs::symlink_metadata(dst) {
        Ok(_) => return Err(FileHandlerError::DestinationExists),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => return Err(e.into()),
    }
    fs::create_dir_all(dst)?;
    for entry in fs::read_dir(src)? {
        let entry = entry?;
        let file_type = entry.file_type()?;
        let src_path = entry.path();
        let dst_path = dst.join(entry.file_name());
        if file_type.is_symlink() {
            log::trace!("Skipping symbolic link '{}'.", src_path.display());
        } else if file_type.is_dir() {
            copy_dir(&src_path, &dst_path)?;
        } else {
            copy_file(&src_path, &dst_path)?;
        }
    }
    // Applied last so a read-only source directory can still be populated.
    fs::set_permissions(dst, metadata.permissions())?;
    Ok(())
}
