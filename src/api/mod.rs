// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! HTTP client for the device API.
//!
//! Each device exposes a small local REST API:
//!
//! - `GET  /api` - basic information (product type, serial, firmware)
//! - `GET  /api/v1/state` - relay state, switch lock, LED brightness
//! - `PUT  /api/v1/state` - partial state update
//! - `GET  /api/v1/data` - most recent power measurement
//! - `PUT  /api/v1/identify` - blink the status light
//!
//! All calls are request/response on the local network, so every request
//! carries a short bounded timeout; a device that does not answer within it
//! is treated as failed and the caller moves on.

pub mod responses;

pub use responses::{
    ApiErrorBody, ApiErrorDetail, BasicInfo, IdentifyResponse, SwitchState, SwitchUpdate,
    TelemetryData,
};

use std::time::Duration;

use reqwest::{Client, Method, RequestBuilder};
use serde::de::DeserializeOwned;

use crate::error::ApiError;
use crate::types::DeviceEndpoint;

/// HTTP client for a single device.
///
/// The client is cheap to clone and holds the device's base URL; it does not
/// hold any device state.
///
/// # Examples
///
/// ```no_run
/// use wattsock::OutletApi;
///
/// # async fn example() -> Result<(), wattsock::ApiError> {
/// let api = OutletApi::new("http://192.168.1.20")?;
/// let info = api.get_basic_info().await?;
/// println!("found {} ({})", info.product_name, info.serial);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct OutletApi {
    base_url: String,
    api_version: String,
    client: Client,
}

impl OutletApi {
    /// Default request timeout. The device is on the local network, so
    /// anything slower than this counts as a failure.
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(2);

    /// Creates a client for the given base URL with the default timeout.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying HTTP client cannot be created.
    pub fn new(base_url: impl Into<String>) -> Result<Self, ApiError> {
        Self::with_timeout(base_url, Self::DEFAULT_TIMEOUT)
    }

    /// Creates a client with a custom request timeout.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying HTTP client cannot be created.
    pub fn with_timeout(base_url: impl Into<String>, timeout: Duration) -> Result<Self, ApiError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(ApiError::Transport)?;

        Ok(Self {
            base_url: base_url.into(),
            api_version: DeviceEndpoint::DEFAULT_API_VERSION.to_string(),
            client,
        })
    }

    /// Creates a client for a resolved device endpoint.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying HTTP client cannot be created.
    pub fn for_endpoint(endpoint: &DeviceEndpoint, timeout: Duration) -> Result<Self, ApiError> {
        let mut api = Self::with_timeout(endpoint.base_url(), timeout)?;
        api.api_version = endpoint.api_version.clone();
        Ok(api)
    }

    /// Returns the base URL of the device.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn basic_url(&self) -> String {
        format!("{}/api", self.base_url)
    }

    fn state_url(&self) -> String {
        format!("{}/api/{}/state", self.base_url, self.api_version)
    }

    fn data_url(&self) -> String {
        format!("{}/api/{}/data", self.base_url, self.api_version)
    }

    fn identify_url(&self) -> String {
        format!("{}/api/{}/identify", self.base_url, self.api_version)
    }

    /// Returns basic information from the device.
    ///
    /// Used to resolve identity: the serial here is the stable key a device
    /// is tracked under.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError`] on transport failure, a non-2xx response, or an
    /// unparseable body.
    pub async fn get_basic_info(&self) -> Result<BasicInfo, ApiError> {
        self.send(Method::GET, self.basic_url(), None).await
    }

    /// Returns the current relay state of the device.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError`] on transport failure, a non-2xx response, or an
    /// unparseable body.
    pub async fn get_switch_state(&self) -> Result<SwitchState, ApiError> {
        self.send(Method::GET, self.state_url(), None).await
    }

    /// Updates the relay state and returns the resulting full state.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError`] on transport failure, a non-2xx response, or an
    /// unparseable body.
    pub async fn put_switch_state(&self, update: &SwitchUpdate) -> Result<SwitchState, ApiError> {
        let body = serde_json::to_string(update)?;
        self.send(Method::PUT, self.state_url(), Some(body)).await
    }

    /// Returns the most recent power measurement.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError`] on transport failure, a non-2xx response, or an
    /// unparseable body.
    pub async fn get_telemetry(&self) -> Result<TelemetryData, ApiError> {
        self.send(Method::GET, self.data_url(), None).await
    }

    /// Blinks the device's status light so the user can identify it.
    ///
    /// Only available from firmware version 3 onwards; the firmware gate is
    /// enforced by the caller, not here.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError`] on transport failure, a non-2xx response, or an
    /// unparseable body.
    pub async fn identify(&self) -> Result<IdentifyResponse, ApiError> {
        self.send(Method::PUT, self.identify_url(), None).await
    }

    async fn send<T: DeserializeOwned>(
        &self,
        method: Method,
        url: String,
        body: Option<String>,
    ) -> Result<T, ApiError> {
        let method_name = if method == Method::PUT { "PUT" } else { "GET" };

        tracing::debug!(url = %url, method = method_name, "sending API request");

        let mut request: RequestBuilder = self.client.request(method, &url);
        if let Some(body) = body {
            request = request
                .header(reqwest::header::CONTENT_TYPE, "application/json")
                .body(body);
        }

        let response = request.send().await.map_err(ApiError::Transport)?;
        let status = response.status();
        let text = response.text().await.map_err(ApiError::Transport)?;

        if !status.is_success() {
            if let Some(api_error) = ApiErrorBody::parse(&text) {
                tracing::debug!(
                    url = %url,
                    code = api_error.error.id,
                    description = %api_error.error.description,
                    "device reported an API error"
                );
            }

            return Err(ApiError::Response {
                method: method_name,
                url,
                status: status.as_u16(),
                body: text,
            });
        }

        tracing::debug!(url = %url, body = %text, "received API response");

        Ok(serde_json::from_str(&text)?)
    }
}
