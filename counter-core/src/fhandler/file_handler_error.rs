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

//! File handler errors.

use std::error::Error;
use std::fmt;
use std::io;

/// Failure of an atomic write, rename or copy operation.
#[derive(Debug)]
pub enum FileHandlerError {
    /// Underlying filesystem error, passed through unchanged.
    Io(io::Error),
    /// The source of a directory copy is not a directory.
    SourceNotDirectory,
    /// The destination of a directory copy already exists.
    DestinationExists,
}

impl FileHandlerError {
    /// Return the underlying I/O error kind if this is a filesystem error.
    pub fn io_kind(&self) -> Option<io::ErrorKind> {
        match self {
            Self::Io(e) => Some(e.kind()),
            _ => None,
        }
    }
}

impl From<io::Error> for FileHandlerError {
    fn from(e: io::Error) -> Self {
        Self::Io(e)
    }
}

impl fmt::Display for FileHandlerError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Io(e) => write!(f, "{e}"),
            Self::SourceNotDirectory => write!(f, "source is not a directory"),
            Self::DestinationExists => write!(f, "destination already exists"),
        }
    }
}

impl Error for FileHandlerError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            _ => None,
        }
    }
}
