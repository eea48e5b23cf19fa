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

//! Propagation of a shutdown request to async awaiters.

use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;
use tokio::signal::unix::SignalKind;
use tokio::signal::unix::signal;
use tokio::sync::Semaphore;

/** One-shot shutdown request that any number of tasks can wait for.

Triggered either explicitly or by SIGINT/SIGTERM once
[Self::trigger_on_termination] has been called.
*/
pub struct ShutdownSignal {
    triggered: AtomicBool,
    semaphore: Semaphore,
}

impl ShutdownSignal {
    /// Return a new instance.
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            triggered: AtomicBool::default(),
            semaphore: Semaphore::new(0),
        })
    }

    /// Wait until shutdown has been requested.
    pub async fn wait(&self) {
        let _ = self.semaphore.acquire().await;
    }

    /// Return `true` if shutdown has been requested.
    pub fn is_triggered(&self) -> bool {
        self.triggered.load(Ordering::Relaxed)
    }

    /// Request shutdown and wake all awaiters.
    pub fn trigger(&self) {
        // Only add permits once.
        if !self.triggered.swap(true, Ordering::Relaxed) {
            self.semaphore.add_permits(Semaphore::MAX_PERMITS);
        }
    }

    /// Trigger on SIGTERM or SIGINT from a background task.
    ///
    /// Must be called from within a tokio runtime.
    pub fn trigger_on_termination(self: &Arc<Self>) -> std::io::Result<()> {
        let mut sigint = signal(SignalKind::interrupt())?;
        let mut sigterm = signal(SignalKind::terminate())?;
        let self_clone = Arc::clone(self);
        tokio::spawn(async move {
            tokio::select! {
                _ = sigterm.recv() => {
                    log::debug!("SIGTERM received.")
                },
                _ = sigint.recv() => {
                    log::debug!("SIGINT received.")
                },
            };
            self_clone.trigger();
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn all_awaiters_are_released() {
        let shutdown = ShutdownSignal::new();
        let awaiters = (0..3)
            .map(|_| {
                let shutdown = Arc::clone(&shutdown);
                tokio::spawn(async move { shutdown.wait().await })
            })
            .collect::<Vec<_>>();
        assert!(!shutdown.is_triggered());

        shutdown.trigger();
        shutdown.trigger();

        for awaiter in awaiters {
            tokio::time::timeout(Duration::from_secs(5), awaiter)
                .await
                .unwrap()
                .unwrap();
        }
        assert!(shutdown.is_triggered());
        // Late awaiters return immediately.
        tokio::time::timeout(Duration::from_secs(5), shutdown.wait())
            .await
            .unwrap();
    }
}
