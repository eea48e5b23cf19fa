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

//! File handling primitives.
//!
//! A file written with [write_atomic] is never observed half-written: content
//! is staged in a temporary file that is renamed into place once complete.

mod atomic_writer;
mod file_handler_error;
mod file_mover;

pub use self::atomic_writer::*;
pub use self::file_handler_error::FileHandlerError;
pub use self::file_mover::copy_dir;
pub use self::file_mover::copy_file;
pub use self::file_mover::rename;
