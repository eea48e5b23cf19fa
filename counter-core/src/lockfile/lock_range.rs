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

//! Byte range covered by a record lock.

use nix::libc;

/// Origin of [LockRange::offset].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LockWhence {
    /// Relative to the start of the file.
    #[default]
    Start,
    /// Relative to the current file offset.
    Current,
    /// Relative to the end of the file.
    End,
}

impl LockWhence {
    /// Return the `lseek` constant.
    pub(crate) fn as_raw(self) -> libc::c_int {
        match self {
            Self::Start => libc::SEEK_SET,
            Self::Current => libc::SEEK_CUR,
            Self::End => libc::SEEK_END,
        }
    }
}

/** Byte range of a file covered by a record lock.

A `len` of zero extends the range to the end of the file, including any future
growth. The [Default] range covers the whole file.
*/
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LockRange {
    /// First byte of the range relative to `whence`.
    pub offset: i64,
    /// Origin of `offset`.
    pub whence: LockWhence,
    /// Number of bytes, or zero for "to the end of the file".
    pub len: i64,
}

impl LockRange {
    /// Return a new instance.
    pub fn new(offset: i64, whence: LockWhence, len: i64) -> Self {
        Self {
            offset,
            whence,
            len,
        }
    }

    /// Range covering the whole file.
    pub fn whole_file() -> Self {
        Self::default()
    }
}
