// Smart plug facade
//
// Thin typed wrappers over the protocol client: each accessor is one HNAP
// action plus response mapping. Numeric readings and the relay state are
// best-effort — a failed read is absent or Unknown, never an error. The
// single hard failure in this surface is asking `set_state` for `Unknown`.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::client::HnapClient;
use crate::config::PlugConfig;
use crate::error::Error;
use crate::soap::{SoapBody, control_parameters, extract_field, module_parameters};
use crate::stats::LegacyStatsClient;

/// Observed relay state of the plug.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SwitchState {
    On,
    Off,
    /// The device answered with something unrecognizable, or not at all.
    Unknown,
}

impl SwitchState {
    /// Map device response text: `true`/`false` case-insensitively, and
    /// anything else — including no response — to `Unknown`.
    fn from_response(text: Option<&str>) -> Self {
        match text {
            Some(t) if t.eq_ignore_ascii_case("true") => Self::On,
            Some(t) if t.eq_ignore_ascii_case("false") => Self::Off,
            Some(t) => {
                warn!(value = t, "unrecognized OPStatus value");
                Self::Unknown
            }
            None => Self::Unknown,
        }
    }
}

/// High-level handle for one D-Link DSP-W215 smart plug.
///
/// Methods take `&mut self`: the session credential is per-instance state
/// and one logical call runs at a time.
pub struct SmartPlug {
    client: HnapClient,
    stats: LegacyStatsClient,
    legacy_mode: bool,
    model_name: String,
    device_settings: Option<String>,
}

impl SmartPlug {
    /// Connect to the plug described by `config`.
    ///
    /// Performs one best-effort `GetDeviceSettings` call to learn the
    /// model name; if that fails the plug is still usable and
    /// [`model_name`](Self::model_name) stays empty. Errors only when the
    /// address cannot form a URL or the HTTP client cannot be built.
    pub async fn connect(config: &PlugConfig) -> Result<Self, Error> {
        let client = HnapClient::new(config)?;
        let stats = LegacyStatsClient::new(config)?;
        let mut plug = Self {
            client,
            stats,
            legacy_mode: config.legacy_mode,
            model_name: String::new(),
            device_settings: None,
        };
        if plug.refresh_device_settings().await.is_none() {
            debug!("initial GetDeviceSettings failed; model name unavailable");
        }
        Ok(plug)
    }

    /// Model name reported by the device, or empty if never retrieved.
    pub fn model_name(&self) -> &str {
        &self.model_name
    }

    /// The last raw device-settings document, for diagnostic use.
    pub fn raw_device_settings(&self) -> Option<&str> {
        self.device_settings.as_deref()
    }

    /// Re-fetch `GetDeviceSettings`, updating the cached document and
    /// model name on success.
    pub async fn refresh_device_settings(&mut self) -> Option<String> {
        let xml = self
            .client
            .call_raw("GetDeviceSettings", &SoapBody::new())
            .await?;
        if let Some(model) = extract_field(&xml, "ModelName") {
            self.model_name = model;
        }
        self.device_settings = Some(xml.clone());
        Some(xml)
    }

    /// Current relay state.
    pub async fn state(&mut self) -> SwitchState {
        let text = self
            .client
            .call("GetSocketSettings", "OPStatus", &module_parameters(1))
            .await;
        SwitchState::from_response(text.as_deref())
    }

    /// Drive the relay to `On` or `Off`.
    ///
    /// Asking for [`SwitchState::Unknown`] is a caller error. A rejected
    /// or lost command is not: the device confirms best-effort, and the
    /// next [`state`](Self::state) read is the source of truth.
    pub async fn set_state(&mut self, state: SwitchState) -> Result<(), Error> {
        let on = match state {
            SwitchState::On => true,
            SwitchState::Off => false,
            SwitchState::Unknown => return Err(Error::InvalidState(state)),
        };
        let body = control_parameters(1, on, self.legacy_mode);
        let result = self
            .client
            .call("SetSocketSettings", "SetSocketSettingsResult", &body)
            .await;
        debug!(
            ?state,
            result = result.as_deref().unwrap_or("<absent>"),
            "set_state"
        );
        Ok(())
    }

    /// Present power draw in watts.
    ///
    /// Legacy firmware reads the meter through the `my_cgi.cgi` scrape;
    /// current firmware through the power-meter HNAP module.
    pub async fn current_consumption(&mut self) -> Option<f64> {
        let text = if self.legacy_mode {
            self.stats.field("Meter Watt").await
        } else {
            self.client
                .call(
                    "GetCurrentPowerConsumption",
                    "CurrentConsumption",
                    &module_parameters(2),
                )
                .await
        };
        parse_number(text.as_deref())
    }

    /// Lifetime energy total in kWh.
    ///
    /// Always absent on legacy firmware: the call is known to misbehave
    /// there, so it is never issued.
    pub async fn total_consumption(&mut self) -> Option<f64> {
        if self.legacy_mode {
            return None;
        }
        let text = self
            .client
            .call(
                "GetPMWarningThreshold",
                "TotalConsumption",
                &module_parameters(2),
            )
            .await;
        parse_number(text.as_deref())
    }

    /// Device temperature in degrees Celsius.
    pub async fn temperature(&mut self) -> Option<f64> {
        let text = self
            .client
            .call(
                "GetCurrentTemperature",
                "CurrentTemperature",
                &module_parameters(3),
            )
            .await;
        parse_number(text.as_deref())
    }
}

/// Locale-independent (period-decimal) float parse.
///
/// Unparsable-but-present text is reported absent, same as no text at
/// all; the device occasionally answers `N/A` where a number belongs.
fn parse_number(text: Option<&str>) -> Option<f64> {
    let raw = text?.trim();
    match raw.parse::<f64>() {
        Ok(value) => Some(value),
        Err(_) => {
            debug!(value = raw, "non-numeric device reading");
            None
        }
    }
}
