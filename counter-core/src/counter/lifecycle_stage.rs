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

//! Process lifecycle of the counter service.

use std::fmt;

/// Stage of the counter service lifecycle.
///
/// Stages only move forward in declaration order.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord)]
pub enum LifecycleStage {
    /// Nothing acquired yet.
    #[default]
    Unstarted,
    /// The process exclusivity lock is held.
    LockAcquired,
    /// The counter has been loaded from file.
    Initialized,
    /// Requests are being served.
    Serving,
    /// Termination was requested and in-flight requests are completing.
    ShuttingDown,
    /// The process exclusivity lock has been released.
    Stopped,
}

impl fmt::Display for LifecycleStage {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{self:?}")
    }
}
