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

//! Persistent request counter.

mod counter_error;
mod counter_store;
mod counter_value;
mod lifecycle_stage;

pub use self::counter_error::CounterError;
pub use self::counter_error::CounterErrorKind;
pub use self::counter_store::CounterStore;
pub use self::counter_value::CounterValue;
pub use self::lifecycle_stage::LifecycleStage;

use crate::conf::AppConfig;
use crate::lockfile::FcntlLockfile;
use crate::lockfile::Locker;
use crate::util::LogScopeDuration;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::PoisonError;
use std::sync::RwLock;

/// Persist operations slower than this are logged.
const SLOW_PERSIST_MICROS: u64 = 50_000;

/** Persistent request counter.

The in-memory value is authoritative while the process runs and the counter
file is a checkpoint of it. Increments are serialized by a write guard and the
new value is only made visible after it has been written to the counter file,
so memory and file never diverge.

Only one process may serve a counter file. This is enforced by an exclusive
advisory lock that is taken before the counter file is touched and held until
[Self::release].
*/
pub struct CounterService {
    value: RwLock<CounterValue>,
    store: CounterStore,
    locker: Mutex<Option<Box<dyn Locker>>>,
    stage: Mutex<LifecycleStage>,
}

impl CounterService {
    /// Return a new instance using the storage configuration.
    pub fn new(app_config: &AppConfig) -> Result<Arc<Self>, CounterError> {
        let lock_file = app_config.storage.lock_file();
        log::debug!("Will use lock file '{}'.", lock_file.display());
        let store = CounterStore::new(app_config.storage.file(), app_config.storage.staging_dir());
        Self::start(Box::new(FcntlLockfile::new(lock_file)), store)
    }

    /** Acquire the exclusivity lock and load the counter.

    The lock is requested without waiting, so a second instance fails with
    [CounterErrorKind::LockUnavailable] instead of waiting for the first one
    to exit. The counter file is created with a zero value if absent.
    */
    pub fn start(mut locker: Box<dyn Locker>, store: CounterStore) -> Result<Arc<Self>, CounterError> {
        locker.lock_write().map_err(|e| {
            CounterErrorKind::LockUnavailable
                .error_with_msg(format!("Unable to get exclusivity lock: {e}"))
        })?;
        log::debug!(
            "Lifecycle: {} -> {}",
            LifecycleStage::Unstarted,
            LifecycleStage::LockAcquired
        );
        let value = match store.initialize_if_absent().and_then(|_| store.load()) {
            Ok(value) => value,
            Err(e) => {
                if let Err(unlock_err) = locker.unlock() {
                    log::warn!("Unable to release exclusivity lock: {unlock_err}");
                }
                return Err(e);
            }
        };
        log::info!(
            "Loaded counter value {value} from '{}'.",
            store.file().display()
        );
        let service = Self {
            value: RwLock::new(value),
            store,
            locker: Mutex::new(Some(locker)),
            stage: Mutex::new(LifecycleStage::LockAcquired),
        };
        service.advance(LifecycleStage::Initialized);
        Ok(Arc::new(service))
    }

    /// Return the current counter value.
    pub fn read_current(&self) -> u64 {
        self.value
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get()
    }

    /** Increment the counter and persist the new value.

    Return the new value. On failure the counter keeps its previous value both
    in memory and on disk and [CounterErrorKind::PersistenceFailure] is
    returned.

    This blocks on file I/O while holding the write guard.
    */
    pub fn increment_and_persist(&self) -> Result<u64, CounterError> {
        let _scope_duration = LogScopeDuration::new(
            log::Level::Debug,
            module_path!(),
            "increment_and_persist",
            SLOW_PERSIST_MICROS,
        );
        let mut value = self.value.write().unwrap_or_else(PoisonError::into_inner);
        let next = value.checked_next().ok_or_else(|| {
            CounterErrorKind::PersistenceFailure.error_with_msg("Counter is exhausted.")
        })?;
        self.store.persist(next).inspect_err(|e| {
            log::warn!("Increment of counter {} was rolled back: {e}", *value);
        })?;
        *value = next;
        Ok(next.get())
    }

    /// Storage used by this instance.
    pub fn store(&self) -> &CounterStore {
        &self.store
    }

    /// Current lifecycle stage.
    pub fn stage(&self) -> LifecycleStage {
        *self.stage.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Mark that requests are being served.
    pub fn begin_serving(&self) {
        self.advance(LifecycleStage::Serving);
    }

    /// Mark that termination was requested.
    pub fn begin_shutdown(&self) {
        self.advance(LifecycleStage::ShuttingDown);
    }

    /** Release the exclusivity lock.

    Call this once serving has ended. Later calls have no effect.
    */
    pub fn release(&self) -> Result<(), CounterError> {
        let locker = self
            .locker
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        let Some(mut locker) = locker else {
            return Ok(());
        };
        self.advance(LifecycleStage::Stopped);
        locker.unlock().map_err(|e| {
            CounterErrorKind::Unspecified
                .error_with_msg(format!("Unable to release exclusivity lock: {e}"))
        })
    }

    /// Move to `next` unless the lifecycle already is at or beyond it.
    fn advance(&self, next: LifecycleStage) {
        let mut stage = self.stage.lock().unwrap_or_else(PoisonError::into_inner);
        if *stage < next {
            log::debug!("Lifecycle: {} -> {next}", *stage);
            *stage = next;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lockfile::LockError;
    use std::fs;
    use std::path::Path;
    use std::sync::atomic::AtomicUsize;
    use std::sync::atomic::Ordering;
    use tempfile::TempDir;

    fn initialize_env_logger() {
        env_logger::builder()
            .is_test(true)
            .filter_level(log::LevelFilter::Debug)
            .try_init()
            .map_err(|e| {
                log::trace!("Env logger for testing was probably already initialized: {e:?}")
            })
            .ok();
    }

    /// Locker that records how it was used.
    struct RecordingLocker {
        available: bool,
        unlocks: Arc<AtomicUsize>,
    }

    impl Locker for RecordingLocker {
        fn lock_read(&mut self) -> Result<(), LockError> {
            self.lock_write()
        }
        fn lock_write(&mut self) -> Result<(), LockError> {
            if self.available {
                Ok(())
            } else {
                Err(LockError::FailedToLock)
            }
        }
        fn lock_read_blocking(&mut self) -> Result<(), LockError> {
            Ok(())
        }
        fn lock_write_blocking(&mut self) -> Result<(), LockError> {
            Ok(())
        }
        fn unlock(&mut self) -> Result<(), LockError> {
            self.unlocks.fetch_add(1, Ordering::Relaxed);
            Ok(())
        }
    }

    fn start_in(dir: &Path, staging_dir: Option<std::path::PathBuf>) -> Arc<CounterService> {
        let store = CounterStore::new(dir.join("counter.txt"), staging_dir);
        let locker = FcntlLockfile::new(dir.join("counter.lock"));
        CounterService::start(Box::new(locker), store).unwrap()
    }

    #[test]
    fn starts_from_zero_and_persists_increments() {
        initialize_env_logger();
        let dir = TempDir::new().unwrap();
        let service = start_in(dir.path(), None);
        assert_eq!(service.stage(), LifecycleStage::Initialized);
        assert_eq!(service.read_current(), 0);

        assert_eq!(service.increment_and_persist().unwrap(), 1);
        assert_eq!(service.increment_and_persist().unwrap(), 2);

        assert_eq!(service.read_current(), 2);
        assert_eq!(fs::read(service.store().file()).unwrap(), b"2");
        service.release().unwrap();

        let restarted = start_in(dir.path(), None);
        assert_eq!(restarted.read_current(), 2);
        restarted.release().unwrap();
    }

    #[test]
    fn failed_persist_rolls_back() {
        initialize_env_logger();
        let dir = TempDir::new().unwrap();
        let staging = dir.path().join("staging");
        fs::create_dir(&staging).unwrap();
        let service = start_in(dir.path(), Some(staging.clone()));
        service.increment_and_persist().unwrap();
        fs::remove_dir(&staging).unwrap();

        let err = service.increment_and_persist().unwrap_err();

        assert_eq!(err.kind(), &CounterErrorKind::PersistenceFailure);
        assert_eq!(service.read_current(), 1);
        assert_eq!(service.store().load().unwrap().get(), 1);

        fs::create_dir(&staging).unwrap();
        assert_eq!(service.increment_and_persist().unwrap(), 2);
        service.release().unwrap();
    }

    #[test]
    fn concurrent_increments_are_serialized() {
        initialize_env_logger();
        let dir = TempDir::new().unwrap();
        let service = start_in(dir.path(), None);
        let workers = (0..8)
            .map(|_| {
                let service = Arc::clone(&service);
                std::thread::spawn(move || {
                    (0..25)
                        .map(|_| service.increment_and_persist().unwrap())
                        .collect::<Vec<_>>()
                })
            })
            .collect::<Vec<_>>();
        let mut observed = workers
            .into_iter()
            .flat_map(|worker| worker.join().unwrap())
            .collect::<Vec<_>>();
        observed.sort_unstable();

        assert_eq!(observed, (1..=200).collect::<Vec<u64>>());
        assert_eq!(service.read_current(), 200);
        assert_eq!(service.store().load().unwrap().get(), 200);
        service.release().unwrap();
    }

    #[test]
    fn unavailable_lock_fails_before_touching_the_counter_file() {
        let dir = TempDir::new().unwrap();
        let store = CounterStore::new(dir.path().join("counter.txt"), None);
        let locker = RecordingLocker {
            available: false,
            unlocks: Arc::default(),
        };

        let res = CounterService::start(Box::new(locker), store.clone());

        assert_eq!(
            res.err().map(|e| *e.kind()),
            Some(CounterErrorKind::LockUnavailable)
        );
        assert!(!store.file().exists());
    }

    #[test]
    fn malformed_counter_file_releases_the_lock() {
        let dir = TempDir::new().unwrap();
        let store = CounterStore::new(dir.path().join("counter.txt"), None);
        fs::write(store.file(), b"{\"counter\":1}").unwrap();
        let unlocks = Arc::new(AtomicUsize::default());
        let locker = RecordingLocker {
            available: true,
            unlocks: Arc::clone(&unlocks),
        };

        let res = CounterService::start(Box::new(locker), store);

        assert_eq!(
            res.err().map(|e| *e.kind()),
            Some(CounterErrorKind::MalformedContent)
        );
        assert_eq!(unlocks.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn lifecycle_and_single_release() {
        let dir = TempDir::new().unwrap();
        let store = CounterStore::new(dir.path().join("counter.txt"), None);
        let unlocks = Arc::new(AtomicUsize::default());
        let locker = RecordingLocker {
            available: true,
            unlocks: Arc::clone(&unlocks),
        };
        let service = CounterService::start(Box::new(locker), store).unwrap();

        service.begin_serving();
        assert_eq!(service.stage(), LifecycleStage::Serving);
        service.begin_shutdown();
        service.begin_serving();
        assert_eq!(service.stage(), LifecycleStage::ShuttingDown);
        service.release().unwrap();
        service.release().unwrap();

        assert_eq!(service.stage(), LifecycleStage::Stopped);
        assert_eq!(unlocks.load(Ordering::Relaxed), 1);
    }
}
