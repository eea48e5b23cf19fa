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

//! Counter value and its serialized form.

use super::CounterError;
use super::CounterErrorKind;
use std::fmt;

/** Number of served increment requests.

Serialized as a single JSON integer literal without any envelope.

Content written by floating point writers is accepted when parsing: finite
non-negative numbers are truncated toward zero.
*/
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord)]
pub struct CounterValue(u64);

impl CounterValue {
    /// The initial value of a new counter.
    pub const ZERO: Self = Self(0);

    /// Return a new instance.
    pub fn new(value: u64) -> Self {
        Self(value)
    }

    /// Return the value as an integer.
    pub fn get(self) -> u64 {
        self.0
    }

    /// Return the next value or `None` if the counter is exhausted.
    pub fn checked_next(self) -> Option<Self> {
        self.0.checked_add(1).map(Self)
    }

    /// Serialize to the persisted form.
    pub fn to_bytes(self) -> Result<Vec<u8>, CounterError> {
        serde_json::to_vec(&self.0).map_err(|e| {
            CounterErrorKind::PersistenceFailure
                .error_with_msg(format!("Unable to serialize counter: {e}"))
        })
    }

    /// Parse the persisted form.
    pub fn from_bytes(content: &[u8]) -> Result<Self, CounterError> {
        let number = serde_json::from_slice::<serde_json::Number>(content).map_err(|e| {
            CounterErrorKind::MalformedContent
                .error_with_msg(format!("Unable to parse counter: {e}"))
        })?;
        if let Some(value) = number.as_u64() {
            return Ok(Self(value));
        }
        match number.as_f64() {
            Some(value) if value.is_finite() && value >= 0.0 && value < u64::MAX as f64 => {
                if value.fract() != 0.0 {
                    log::warn!("Fractional counter value {value} will be truncated.");
                }
                Ok(Self(value.trunc() as u64))
            }
            _ => Err(CounterErrorKind::MalformedContent
                .error_with_msg(format!("'{number}' is not a valid counter value."))),
        }
    }
}

impl fmt::Display for CounterValue {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_integers_and_legacy_floats() {
        assert_eq!(CounterValue::from_bytes(b"0").unwrap(), CounterValue::ZERO);
        assert_eq!(CounterValue::from_bytes(b"17\n").unwrap().get(), 17);
        assert_eq!(CounterValue::from_bytes(b"3.0").unwrap().get(), 3);
        assert_eq!(CounterValue::from_bytes(b"3.7").unwrap().get(), 3);
        assert_eq!(CounterValue::from_bytes(b"1e3").unwrap().get(), 1000);
    }

    #[test]
    fn rejects_malformed_content() {
        for content in [&b""[..], b"abc", b"-1", b"-0.5", b"\"1\"", b"[1]", b"1 2", b"1e400"] {
            let err = CounterValue::from_bytes(content).unwrap_err();
            assert_eq!(err.kind(), &CounterErrorKind::MalformedContent, "{content:?}");
        }
    }

    #[test]
    fn serialized_form_is_a_plain_literal() {
        assert_eq!(CounterValue::new(42).to_bytes().unwrap(), b"42");
        let max = CounterValue::new(u64::MAX);
        assert_eq!(CounterValue::from_bytes(&max.to_bytes().unwrap()).unwrap(), max);
    }

    #[test]
    fn next_value_stops_at_the_maximum() {
        assert_eq!(CounterValue::ZERO.checked_next(), Some(CounterValue::new(1)));
        assert_eq!(CounterValue::new(u64::MAX).checked_next(), None);
    }
}
