// HNAP protocol client
//
// Executes one named action per call: ensure a session, sign, POST, parse.
// A transport failure (or a body that is not XML) triggers exactly one
// re-authentication and retry; a second failure is terminal for the call.
// All protocol failures are absorbed into absent results here — the plug
// is best-effort telemetry, not a hard dependency.

use std::sync::Arc;

use chrono::Utc;
use reqwest::cookie::Jar;
use reqwest::header::CONTENT_TYPE;
use tracing::{debug, warn};
use url::Url;

use crate::auth::{AuthSession, Credentials};
use crate::config::PlugConfig;
use crate::error::Error;
use crate::signing::{auth_token, quoted_action_uri};
use crate::soap::{SoapBody, envelope, extract_field};

/// Signed-request executor for the plug's HNAP control endpoint.
pub struct HnapClient {
    http: reqwest::Client,
    endpoint: Url,
    session: AuthSession,
}

impl HnapClient {
    /// Build a client for the configured plug.
    ///
    /// Fails only if the address does not form a valid URL or the HTTP
    /// client cannot be constructed; no network traffic happens here.
    pub fn new(config: &PlugConfig) -> Result<Self, Error> {
        let jar = Arc::new(Jar::default());
        let http = config.build_client(Arc::clone(&jar))?;
        let endpoint = config.control_url()?;
        let session = AuthSession::new(http.clone(), jar, endpoint.clone(), config);
        Ok(Self {
            http,
            endpoint,
            session,
        })
    }

    /// Execute `action` and return the text of the first `response_field`
    /// element in the reply.
    ///
    /// Absent covers the whole failure spectrum: handshake failure,
    /// transport failure after the single retry, a missing field, and a
    /// present-but-empty field. Callers cannot tell these apart; the
    /// protocol itself does not.
    pub async fn call(
        &mut self,
        action: &str,
        response_field: &str,
        body: &SoapBody,
    ) -> Option<String> {
        self.call_raw(action, body)
            .await
            .and_then(|xml| extract_field(&xml, response_field))
    }

    /// Execute `action` and return the full response document.
    ///
    /// The body is guaranteed well-formed XML; used for diagnostics where
    /// the caller wants more than one field.
    pub async fn call_raw(&mut self, action: &str, body: &SoapBody) -> Option<String> {
        match self.try_call_raw(action, body).await {
            Ok(xml) => Some(xml),
            Err(e) => {
                debug!(action, error = %e, "HNAP call failed");
                None
            }
        }
    }

    async fn try_call_raw(&mut self, action: &str, body: &SoapBody) -> Result<String, Error> {
        let mut reauthenticated = false;
        loop {
            // Handshake failure fails the call outright; the retry below
            // only covers failures of the signed exchange itself.
            let credentials = self.session.ensure().await?;
            let result = self.exchange(action, body, &credentials).await;
            self.session.complete_call(result.is_ok());
            match result {
                Ok(xml) => return Ok(xml),
                Err(e) if !reauthenticated => {
                    warn!(action, error = %e, "transport failure, re-authenticating once");
                    reauthenticated = true;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// One signed POST to the control endpoint.
    ///
    /// Err means transport failure or an unparseable body; both count as
    /// transport-level for retry purposes. The session cookie rides along
    /// from the shared jar.
    async fn exchange(
        &self,
        action: &str,
        body: &SoapBody,
        credentials: &Credentials,
    ) -> Result<String, Error> {
        let payload = envelope(action, body);
        let uri = quoted_action_uri(action);
        let token = auth_token(&credentials.private_key, &uri, Utc::now().timestamp());

        debug!(action, "POST {}", self.endpoint);
        let response = self
            .http
            .post(self.endpoint.clone())
            .header(CONTENT_TYPE, "text/xml")
            .header("SOAPAction", uri.as_str())
            .header("HNAP_AUTH", token)
            .body(payload)
            .send()
            .await
            .map_err(Error::Transport)?;

        let text = response.text().await.map_err(Error::Transport)?;
        roxmltree::Document::parse(&text).map_err(|e| Error::Xml {
            message: e.to_string(),
        })?;
        Ok(text)
    }
}
