// Plug connection configuration and HTTP client construction.
//
// One config type covers both wire surfaces (HNAP control endpoint and the
// legacy my_cgi.cgi scrape) so timeout and addressing stay in one place.

use std::sync::Arc;
use std::time::Duration;

use reqwest::cookie::Jar;
use secrecy::SecretString;
use url::Url;

use crate::error::Error;

/// Username the firmware ships with; almost never changed in the field.
pub const DEFAULT_USERNAME: &str = "admin";

/// Default per-request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Connection settings for one smart plug.
///
/// `address` is the host (or `host:port`) on the local network. The plug
/// only speaks plain HTTP, so no TLS settings exist here.
#[derive(Debug, Clone)]
pub struct PlugConfig {
    pub address: String,
    pub username: String,
    pub password: SecretString,
    /// Older firmware: session credentials persist across calls and the
    /// power meter is read via the `my_cgi.cgi` scrape.
    pub legacy_mode: bool,
    pub timeout: Duration,
}

impl PlugConfig {
    /// Create a config for `address` with the stock `admin` username.
    pub fn new(address: impl Into<String>, password: SecretString) -> Self {
        Self {
            address: address.into(),
            username: DEFAULT_USERNAME.to_owned(),
            password,
            legacy_mode: false,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_username(mut self, username: impl Into<String>) -> Self {
        self.username = username.into();
        self
    }

    pub fn with_legacy_mode(mut self, legacy_mode: bool) -> Self {
        self.legacy_mode = legacy_mode;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// The HNAP control endpoint: `http://{address}/HNAP1/`
    pub(crate) fn control_url(&self) -> Result<Url, Error> {
        Url::parse(&format!("http://{}/HNAP1/", self.address)).map_err(Error::InvalidUrl)
    }

    /// The legacy statistics endpoint: `http://{address}/my_cgi.cgi`
    pub(crate) fn stats_url(&self) -> Result<Url, Error> {
        Url::parse(&format!("http://{}/my_cgi.cgi", self.address)).map_err(Error::InvalidUrl)
    }

    /// Build the `reqwest::Client` used for HNAP calls.
    ///
    /// The jar is shared with the session so the handshake can plant the
    /// `uid` cookie that every signed request must carry.
    pub(crate) fn build_client(&self, jar: Arc<Jar>) -> Result<reqwest::Client, Error> {
        reqwest::Client::builder()
            .timeout(self.timeout)
            .user_agent(concat!("w215-api/", env!("CARGO_PKG_VERSION")))
            .cookie_provider(jar)
            .build()
            .map_err(Error::Transport)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[allow(clippy::unwrap_used)]
    fn urls_from_address() {
        let config = PlugConfig::new("192.168.1.50", SecretString::from("pw".to_owned()));
        assert_eq!(
            config.control_url().unwrap().as_str(),
            "http://192.168.1.50/HNAP1/"
        );
        assert_eq!(
            config.stats_url().unwrap().as_str(),
            "http://192.168.1.50/my_cgi.cgi"
        );
    }

    #[test]
    #[allow(clippy::unwrap_used)]
    fn address_may_carry_a_port() {
        let config = PlugConfig::new("10.0.0.3:8080", SecretString::from("pw".to_owned()));
        assert_eq!(
            config.control_url().unwrap().as_str(),
            "http://10.0.0.3:8080/HNAP1/"
        );
    }

    #[test]
    fn builder_defaults() {
        let config = PlugConfig::new("plug.local", SecretString::from("pw".to_owned()));
        assert_eq!(config.username, DEFAULT_USERNAME);
        assert!(!config.legacy_mode);
        assert_eq!(config.timeout, DEFAULT_TIMEOUT);
    }
}
