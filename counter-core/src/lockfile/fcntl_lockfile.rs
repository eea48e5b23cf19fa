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

//! POSIX `fcntl` record locks.

use super::LockError;
use super::LockRange;
use super::Locker;
use nix::errno::Errno;
use nix::fcntl::FcntlArg;
use nix::fcntl::fcntl;
use nix::libc;
use std::fs::File;
use std::fs::OpenOptions;
use std::io;
use std::os::fd::AsRawFd;
use std::os::unix::fs::OpenOptionsExt;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;

/// Mode of a lock file created by [FcntlLockfile] before the umask is applied.
const LOCK_FILE_MODE: u32 = 0o666;

/** Advisory lock on a file using POSIX `fcntl` record locks.

Record locks are owned by the process, so they coordinate separate processes
only. Two [FcntlLockfile] instances in the same process never block each other,
and closing any descriptor of the file releases all of the process' locks on
it.

When created with [FcntlLockfile::new], the lock file is created if absent and
opened on the first lock request. The descriptor is closed again on unlock and
on a failed lock request. When created with [FcntlLockfile::from_file] the
caller's file is left open.
*/
pub struct FcntlLockfile {
    path: Option<PathBuf>,
    file: Option<Arc<File>>,
    maintain_file: bool,
    range: LockRange,
}

impl FcntlLockfile {
    /// Return a new instance that will lock the file at `path`.
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: Some(path.as_ref().to_path_buf()),
            file: None,
            maintain_file: true,
            range: LockRange::whole_file(),
        }
    }

    /// Return a new instance that locks an already open file.
    ///
    /// The file must be opened for reading to take read locks and for writing
    /// to take write locks.
    pub fn from_file(file: Arc<File>) -> Self {
        Self {
            path: None,
            file: Some(file),
            maintain_file: false,
            range: LockRange::whole_file(),
        }
    }

    /// Path of the lock file, if created from a path.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Acquire a shared lock on `range` or fail with [LockError::FailedToLock].
    pub fn lock_read_range(&mut self, range: LockRange) -> Result<(), LockError> {
        self.lock(false, false, range)
    }

    /// Acquire an exclusive lock on `range` or fail with [LockError::FailedToLock].
    pub fn lock_write_range(&mut self, range: LockRange) -> Result<(), LockError> {
        self.lock(true, false, range)
    }

    /// Acquire a shared lock on `range`, waiting until it is available.
    pub fn lock_read_range_blocking(&mut self, range: LockRange) -> Result<(), LockError> {
        self.lock(false, true, range)
    }

    /// Acquire an exclusive lock on `range`, waiting until it is available.
    pub fn lock_write_range_blocking(&mut self, range: LockRange) -> Result<(), LockError> {
        self.lock(true, true, range)
    }

    /// Release the lock on `range`.
    pub fn unlock_range(&mut self, range: LockRange) -> Result<(), LockError> {
        let file = self.file.as_ref().ok_or(LockError::NotLocked)?;
        let record = flock_record(libc::F_UNLCK as libc::c_short, &range);
        let res = fcntl(file.as_raw_fd(), FcntlArg::F_SETLK(&record));
        if self.maintain_file {
            self.file = None;
        }
        res.map(|_| ()).map_err(|errno| {
            log::warn!("Unable to release lock: {errno}");
            LockError::Io(io::Error::from(errno))
        })
    }

    /** Return the process identifier of the holder of a lock that conflicts
    with the last requested range.

    `None` is returned when the range is unlocked, when the only locks are held
    by this process or when the lock file doesn't exist.

    A handle created from a path that holds no lock opens the file read-only for
    the query and closes it again. Closing a descriptor drops every lock this
    process holds on the file, so don't query through such a handle while
    another handle in this process holds a lock on the same file.
    */
    pub fn owner(&self) -> Option<u32> {
        let transient;
        let file = match (&self.file, &self.path) {
            (Some(file), _) => file.as_ref(),
            (None, Some(path)) => {
                transient = File::open(path)
                    .map_err(|e| log::debug!("Unable to open '{}': {e}", path.display()))
                    .ok()?;
                &transient
            }
            (None, None) => return None,
        };
        let mut record = flock_record(libc::F_WRLCK as libc::c_short, &self.range);
        if let Err(errno) = fcntl(file.as_raw_fd(), FcntlArg::F_GETLK(&mut record)) {
            log::debug!("Unable to query lock owner: {errno}");
            return None;
        }
        if record.l_type == libc::F_UNLCK as libc::c_short {
            return None;
        }
        u32::try_from(record.l_pid).ok()
    }

    /// Return the open lock file, opening it from the path if needed.
    fn open_file(&mut self) -> Result<Arc<File>, LockError> {
        if let Some(file) = &self.file {
            return Ok(Arc::clone(file));
        }
        let path = self.path.as_ref().ok_or(LockError::NotLocked)?;
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .mode(LOCK_FILE_MODE)
            .open(path)?;
        let file = Arc::new(file);
        self.file = Some(Arc::clone(&file));
        Ok(file)
    }

    fn lock(&mut self, exclusive: bool, blocking: bool, range: LockRange) -> Result<(), LockError> {
        let file = self.open_file()?;
        self.range = range;
        let lock_type = if exclusive {
            libc::F_WRLCK
        } else {
            libc::F_RDLCK
        };
        let record = flock_record(lock_type as libc::c_short, &range);
        let res = loop {
            let arg = if blocking {
                FcntlArg::F_SETLKW(&record)
            } else {
                FcntlArg::F_SETLK(&record)
            };
            match fcntl(file.as_raw_fd(), arg) {
                Err(Errno::EINTR) if blocking => continue,
                res => break res,
            }
        };
        match res {
            Ok(_) => Ok(()),
            Err(errno) => {
                if self.maintain_file {
                    self.file = None;
                }
                match errno {
                    Errno::EAGAIN | Errno::EACCES => Err(LockError::FailedToLock),
                    errno => Err(LockError::Io(io::Error::from(errno))),
                }
            }
        }
    }
}

impl Locker for FcntlLockfile {
    fn lock_read(&mut self) -> Result<(), LockError> {
        self.lock_read_range(LockRange::whole_file())
    }

    fn lock_write(&mut self) -> Result<(), LockError> {
        self.lock_write_range(LockRange::whole_file())
    }

    fn lock_read_blocking(&mut self) -> Result<(), LockError> {
        self.lock_read_range_blocking(LockRange::whole_file())
    }

    fn lock_write_blocking(&mut self) -> Result<(), LockError> {
        self.lock_write_range_blocking(LockRange::whole_file())
    }

    fn unlock(&mut self) -> Result<(), LockError> {
        self.unlock_range(LockRange::whole_file())
    }
}

/// Build the `fcntl` lock description for `range`.
fn flock_record(l_type: libc::c_short, range: &LockRange) -> libc::flock {
    libc::flock {
        l_type,
        l_whence: range.whence.as_raw() as libc::c_short,
        l_start: range.offset as libc::off_t,
        l_len: range.len as libc::off_t,
        l_pid: 0,
        #[cfg(any(target_os = "freebsd", target_os = "dragonfly"))]
        l_sysid: 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lockfile::LockWhence;
    use tempfile::TempDir;

    #[test]
    fn creates_lock_file_and_unlocks() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("counter.lock");
        let mut lockfile = FcntlLockfile::new(&path);

        lockfile.lock_write().unwrap();
        assert!(path.exists());
        assert_eq!(lockfile.path(), Some(path.as_path()));
        lockfile.unlock().unwrap();

        assert!(matches!(lockfile.unlock(), Err(LockError::NotLocked)));
    }

    #[test]
    fn own_lock_has_no_foreign_owner() {
        let dir = TempDir::new().unwrap();
        let mut lockfile = FcntlLockfile::new(dir.path().join("counter.lock"));
        assert_eq!(lockfile.owner(), None);

        lockfile.lock_write_blocking().unwrap();

        assert_eq!(lockfile.owner(), None);
        lockfile.unlock().unwrap();
    }

    #[test]
    fn owner_query_does_not_create_lock_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("counter.lock");
        let lockfile = FcntlLockfile::new(&path);

        assert_eq!(lockfile.owner(), None);
        assert!(!path.exists());
    }

    #[test]
    fn locks_within_a_process_do_not_conflict() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("counter.lock");
        let mut first = FcntlLockfile::new(&path);
        let mut second = FcntlLockfile::new(&path);

        first.lock_read().unwrap();
        second.lock_write().unwrap();
        second.lock_read_blocking().unwrap();

        second.unlock().unwrap();
        first.unlock().unwrap();
    }

    #[test]
    fn caller_supplied_file_stays_open_after_unlock() {
        let dir = TempDir::new().unwrap();
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(dir.path().join("shared.lock"))
            .unwrap();
        let mut lockfile = FcntlLockfile::from_file(Arc::new(file));
        assert_eq!(lockfile.path(), None);

        lockfile
            .lock_write_range(LockRange::new(0, LockWhence::Start, 16))
            .unwrap();
        lockfile
            .unlock_range(LockRange::new(0, LockWhence::Start, 16))
            .unwrap();

        // Still open, so a second round works on the same descriptor.
        lockfile.lock_read().unwrap();
        lockfile.unlock().unwrap();
    }

    #[test]
    fn missing_directory_is_an_io_error() {
        let dir = TempDir::new().unwrap();
        let mut lockfile = FcntlLockfile::new(dir.path().join("missing").join("counter.lock"));

        let res = lockfile.lock_write();

        assert!(matches!(res, Err(LockError::Io(_))));
    }
}
