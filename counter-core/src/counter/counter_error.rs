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

//! Counter service errors.

use std::error::Error;
use std::fmt;

/// Cause of error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CounterErrorKind {
    /// General failure. See message for details.
    Unspecified,
    /// Invalid application configuration.
    Configuration,
    /// The process exclusivity lock could not be obtained.
    LockUnavailable,
    /// The counter file could not be created or read.
    StorageFailure,
    /// The counter file does not contain a valid counter value.
    MalformedContent,
    /// The incremented value could not be serialized or written. The counter
    /// was left unchanged.
    PersistenceFailure,
}

impl CounterErrorKind {
    /// Create a new instance with an error message.
    pub fn error_with_msg<S: AsRef<str>>(self, msg: S) -> CounterError {
        CounterError {
            kind: self,
            msg: Some(msg.as_ref().to_string()),
        }
    }

    /// Create a new instance without an error message.
    pub fn error(self) -> CounterError {
        CounterError {
            kind: self,
            msg: None,
        }
    }
}

impl fmt::Display for CounterErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{self:?}")
    }
}

/** Counter service error.

Create a new instance via [CounterErrorKind].
*/
#[derive(Debug)]
pub struct CounterError {
    kind: CounterErrorKind,
    msg: Option<String>,
}

impl CounterError {
    /// Return the type of error.
    pub fn kind(&self) -> &CounterErrorKind {
        &self.kind
    }
}

impl fmt::Display for CounterError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if let Some(msg) = &self.msg {
            write!(f, "{} {}", self.kind, msg)
        } else {
            write!(f, "{}", self.kind)
        }
    }
}

impl AsRef<CounterError> for CounterError {
    fn as_ref(&self) -> &CounterError {
        self
    }
}

impl Error for CounterError {}
