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

//! Advisory file locking for coordination between processes.

mod fcntl_lockfile;
mod lock_error;
mod lock_range;

pub use self::fcntl_lockfile::FcntlLockfile;
pub use self::lock_error::LockError;
pub use self::lock_range::LockRange;
pub use self::lock_range::LockWhence;

/** File locking capability.

A read (shared) lock may be held by several processes at once, but prevents
other processes from taking a write lock. A write (exclusive) lock prevents
other processes from taking any lock.

The non-blocking variants fail with [LockError::FailedToLock] when the lock is
held incompatibly by another process. The blocking variants wait until the lock
can be granted. There is no timeout.
*/
pub trait Locker: Send {
    /// Acquire a shared lock without waiting.
    fn lock_read(&mut self) -> Result<(), LockError>;

    /// Acquire an exclusive lock without waiting.
    fn lock_write(&mut self) -> Result<(), LockError>;

    /// Acquire a shared lock, waiting until it is available.
    fn lock_read_blocking(&mut self) -> Result<(), LockError>;

    /// Acquire an exclusive lock, waiting until it is available.
    fn lock_write_blocking(&mut self) -> Result<(), LockError>;

    /// Release the lock.
    fn unlock(&mut self) -> Result<(), LockError>;
}
