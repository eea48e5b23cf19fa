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

//! Parsing of configuration for the application's exposed REST API.

use super::AppConfigDefaults;
use crate::counter::CounterError;
use crate::counter::CounterErrorKind;
use config::ConfigBuilder;
use config::ConfigError;
use config::builder::BuilderState;
use serde::Deserialize;
use serde::Serialize;

/// Address used when a listen address has no host part.
const ANY_ADDRESS: &str = "0.0.0.0";

/// Configuration for the application's exposed REST API.
#[derive(Debug, Deserialize, Serialize)]
pub struct ApiConfig {
    /// IP address to bind to.
    address: String,
    /// IP port to bind to.
    port: u16,
}

impl AppConfigDefaults for ApiConfig {
    /// Provide defaults for this part of the configuration
    fn set_defaults<T: BuilderState>(
        config_builder: ConfigBuilder<T>,
        prefix: &str,
    ) -> Result<ConfigBuilder<T>, ConfigError> {
        config_builder
            .set_default(prefix.to_string() + "." + "address", ANY_ADDRESS)?
            .set_default(prefix.to_string() + "." + "port", "8080")
    }
}

impl ApiConfig {
    /// IP address to bind to. Defaults to the IPv4 address `0.0.0.0`.
    pub fn bind_address(&self) -> &str {
        &self.address
    }

    /// IP port to bind to. Defaults to the unpriviliged port `8080`.
    pub fn bind_port(&self) -> u16 {
        self.port
    }

    /** Split a `[ip]:port` listen address into address and port.

    An omitted ip means all IPv4 interfaces, so `:8080` listens on
    `0.0.0.0:8080`. IPv6 addresses may be enclosed in brackets.
    */
    pub fn parse_listen_address(listen: &str) -> Result<(String, u16), CounterError> {
        let invalid = |reason: &str| {
            CounterErrorKind::Configuration
                .error_with_msg(format!("Invalid listen address '{listen}': {reason}"))
        };
        let (host, port) = listen
            .trim()
            .rsplit_once(':')
            .ok_or_else(|| invalid("expected [ip]:port"))?;
        let port = port
            .parse::<u16>()
            .map_err(|e| invalid(&e.to_string()))?;
        let host = host.trim_start_matches('[').trim_end_matches(']');
        let host = if host.is_empty() { ANY_ADDRESS } else { host };
        Ok((host.to_owned(), port))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn listen_address_forms() {
        assert_eq!(
            ApiConfig::parse_listen_address(":8080").unwrap(),
            ("0.0.0.0".to_owned(), 8080)
        );
        assert_eq!(
            ApiConfig::parse_listen_address("127.0.0.1:9000").unwrap(),
            ("127.0.0.1".to_owned(), 9000)
        );
        assert_eq!(
            ApiConfig::parse_listen_address("[::1]:80").unwrap(),
            ("::1".to_owned(), 80)
        );
        for invalid in ["", "8080", "localhost:", "host:99999"] {
            assert_eq!(
                ApiConfig::parse_listen_address(invalid).unwrap_err().kind(),
                &CounterErrorKind::Configuration
            );
        }
    }
}
