// Legacy statistics scrape
//
// Older firmware exposes meter readings through `my_cgi.cgi` instead of
// the power-meter HNAP module: an unauthenticated form POST answered by
// newline-separated `key: value` text. The whole fetch is all-or-nothing;
// one malformed line poisons the mapping, matching the firmware's own
// tooling.

use std::collections::HashMap;

use tracing::debug;
use url::Url;

use crate::config::PlugConfig;
use crate::error::Error;

/// Client for the legacy `my_cgi.cgi` checklist endpoint.
pub struct LegacyStatsClient {
    http: reqwest::Client,
    endpoint: Url,
}

impl LegacyStatsClient {
    /// The scrape is unauthenticated, so this client carries no cookie jar.
    pub fn new(config: &PlugConfig) -> Result<Self, Error> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(concat!("w215-api/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(Error::Transport)?;
        Ok(Self {
            http,
            endpoint: config.stats_url()?,
        })
    }

    /// Fetch the full checklist mapping.
    ///
    /// Transport failure or any malformed line fails the entire fetch.
    pub async fn fetch(&self) -> Option<HashMap<String, String>> {
        match self.try_fetch().await {
            Ok(map) => Some(map),
            Err(e) => {
                debug!(error = %e, "legacy stats fetch failed");
                None
            }
        }
    }

    /// Convenience: fetch and pull out one field.
    pub async fn field(&self, name: &str) -> Option<String> {
        self.fetch().await.and_then(|mut map| map.remove(name))
    }

    async fn try_fetch(&self) -> Result<HashMap<String, String>, Error> {
        debug!("POST {}", self.endpoint);
        let response = self
            .http
            .post(self.endpoint.clone())
            .form(&[("request", "create_chklst")])
            .send()
            .await
            .map_err(Error::Transport)?;
        let body = response.text().await.map_err(Error::Transport)?;
        parse_checklist(&body)
    }
}

/// Split each non-blank line on its first colon, trimming both sides.
///
/// Blank lines (including the one a trailing newline produces) are
/// skipped; a non-blank line without a colon fails the whole parse.
fn parse_checklist(body: &str) -> Result<HashMap<String, String>, Error> {
    let mut map = HashMap::new();
    for line in body.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let (key, value) = line.split_once(':').ok_or_else(|| Error::MalformedStats {
            line: line.to_owned(),
        })?;
        map.insert(key.trim().to_owned(), value.trim().to_owned());
    }
    Ok(map)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn parses_key_value_lines() {
        let map = parse_checklist("Meter Watt: 12.3\nVoltage: 230\n").unwrap();
        assert_eq!(map.get("Meter Watt").map(String::as_str), Some("12.3"));
        assert_eq!(map.get("Voltage").map(String::as_str), Some("230"));
        assert_eq!(map.len(), 2);
    }

    #[test]
    fn splits_on_first_colon_only() {
        let map = parse_checklist("Time: 12:34:56\n").unwrap();
        assert_eq!(map.get("Time").map(String::as_str), Some("12:34:56"));
    }

    #[test]
    fn blank_lines_are_skipped() {
        let map = parse_checklist("\nA: 1\n\n\nB: 2\n").unwrap();
        assert_eq!(map.len(), 2);
    }

    #[test]
    fn malformed_line_fails_the_whole_parse() {
        let result = parse_checklist("A: 1\nno colon here\nB: 2\n");
        assert!(matches!(result, Err(Error::MalformedStats { .. })));
    }

    #[test]
    fn whitespace_is_trimmed_on_both_sides() {
        let map = parse_checklist("  Meter Watt  :   37.5  \n").unwrap();
        assert_eq!(map.get("Meter Watt").map(String::as_str), Some("37.5"));
    }
}
