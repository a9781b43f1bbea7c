// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Typed responses of the device HTTP API.
//!
//! Field names follow the wire format of the vendor API, documented at
//! <https://homewizard-energy-api.readthedocs.io>.

use serde::{Deserialize, Serialize};

use crate::types::ProductType;

/// Response of the `/api` basic-information endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BasicInfo {
    /// The product type, e.g. `"HWE-SKT"`. New products may report values
    /// this library does not know; they parse as [`ProductType::Other`].
    pub product_type: ProductType,
    /// Fixed vendor product name, not the user-chosen name.
    pub product_name: String,
    /// Serial, also the MAC address without colons.
    pub serial: String,
    /// Firmware version string, e.g. `"3.02"`.
    pub firmware_version: String,
    /// API version, currently `"v1"`.
    pub api_version: String,
}

/// Response of the `/api/v1/state` endpoint.
///
/// Only available on the Energy Socket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwitchState {
    /// True when the relay is on.
    pub power_on: bool,
    /// When true, the relay cannot be switched over the API.
    pub switch_lock: bool,
    /// Brightness of the LED ring, 0 (0%) to 255 (100%).
    pub brightness: u8,
}

/// Partial body for a PUT to the state endpoint.
///
/// Fields that are `None` are omitted and left unchanged on the device.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwitchUpdate {
    /// New relay state.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub power_on: Option<bool>,
    /// New switch-lock state.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub switch_lock: Option<bool>,
    /// New LED-ring brightness.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub brightness: Option<u8>,
}

impl SwitchUpdate {
    /// An update that only changes the relay state.
    #[must_use]
    pub fn power(on: bool) -> Self {
        Self {
            power_on: Some(on),
            ..Self::default()
        }
    }
}

/// Response of the `/api/v1/data` endpoint.
///
/// All datapoints are optional: the API omits fields that are null, and
/// different product types report different subsets.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TelemetryData {
    /// The Wi-Fi network the device is connected to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wifi_ssid: Option<String>,
    /// Wi-Fi signal strength in percent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wifi_strength: Option<f64>,
    /// Power import meter reading for tariff 1 in kWh.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_power_import_t1_kwh: Option<f64>,
    /// Power export meter reading for tariff 1 in kWh.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_power_export_t1_kwh: Option<f64>,
    /// Total active power draw in watts.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active_power_w: Option<f64>,
    /// Active power draw on phase 1 in watts.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active_power_l1_w: Option<f64>,
}

/// Response of the `/api/v1/identify` endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentifyResponse {
    /// Always `"ok"` on success.
    pub identify: String,
}

/// Error body the API answers non-2xx requests with.
///
/// Parsing is best-effort: some failure modes (a reboot mid-request, a proxy)
/// produce non-JSON bodies, so callers fall back to the raw text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiErrorBody {
    /// The error object.
    pub error: ApiErrorDetail,
}

/// The error object inside an [`ApiErrorBody`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiErrorDetail {
    /// Vendor error code, e.g. 202 for "API disabled".
    pub id: i32,
    /// Human-readable description.
    pub description: String,
}

impl ApiErrorBody {
    /// Vendor error code for "API not enabled".
    pub const API_DISABLED: i32 = 202;

    /// Tries to parse a response body as a vendor error object.
    #[must_use]
    pub fn parse(body: &str) -> Option<Self> {
        serde_json::from_str(body).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn basic_info_parses() {
        let json = r#"{
            "product_type": "HWE-SKT",
            "product_name": "Energy Socket",
            "serial": "3c12e7659852",
            "firmware_version": "3.02",
            "api_version": "v1"
        }"#;

        let info: BasicInfo = serde_json::from_str(json).unwrap();
        assert_eq!(info.product_type, ProductType::EnergySocket);
        assert_eq!(info.serial, "3c12e7659852");
        assert_eq!(info.api_version, "v1");
    }

    #[test]
    fn switch_state_parses() {
        let json = r#"{"power_on": true, "switch_lock": false, "brightness": 255}"#;
        let state: SwitchState = serde_json::from_str(json).unwrap();
        assert!(state.power_on);
        assert!(!state.switch_lock);
        assert_eq!(state.brightness, 255);
    }

    #[test]
    fn switch_update_serializes_only_set_fields() {
        let body = serde_json::to_string(&SwitchUpdate::power(true)).unwrap();
        assert_eq!(body, r#"{"power_on":true}"#);
    }

    #[test]
    fn telemetry_tolerates_missing_fields() {
        let data: TelemetryData = serde_json::from_str("{}").unwrap();
        assert_eq!(data.active_power_w, None);

        let data: TelemetryData =
            serde_json::from_str(r#"{"active_power_w": 12.5, "wifi_ssid": "net"}"#).unwrap();
        assert_eq!(data.active_power_w, Some(12.5));
        assert_eq!(data.wifi_ssid.as_deref(), Some("net"));
    }

    #[test]
    fn telemetry_tolerates_unknown_fields() {
        let data: TelemetryData =
            serde_json::from_str(r#"{"active_power_w": 3.0, "total_gas_m3": 1.2}"#).unwrap();
        assert_eq!(data.active_power_w, Some(3.0));
    }

    #[test]
    fn error_body_parses() {
        let body = r#"{"error": {"id": 202, "description": "API not enabled"}}"#;
        let parsed = ApiErrorBody::parse(body).unwrap();
        assert_eq!(parsed.error.id, ApiErrorBody::API_DISABLED);
    }

    #[test]
    fn error_body_parse_is_best_effort() {
        assert!(ApiErrorBody::parse("<html>busy</html>").is_none());
    }
}
