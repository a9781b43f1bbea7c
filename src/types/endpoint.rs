// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Mutable network endpoint of a device.

use std::fmt;
use std::net::IpAddr;

use serde::{Deserialize, Serialize};

/// Where a device can currently be reached.
///
/// Unlike [`DeviceIdentity`](super::DeviceIdentity) the endpoint is mutable:
/// devices change IP addresses over their lifetime, and discovery or a
/// configuration pass updates the endpoint of a known identity in place.
///
/// The IP address is used directly instead of the mDNS hostname; resolving
/// `.local` hostnames on every request is too slow for interactive control.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceEndpoint {
    /// IP address of the device, e.g. `192.168.1.20`.
    pub ip: IpAddr,
    /// TCP port of the HTTP API, normally 80.
    pub port: u16,
    /// API version path segment, currently `"v1"`.
    pub api_version: String,
}

impl DeviceEndpoint {
    /// Default API port.
    pub const DEFAULT_PORT: u16 = 80;
    /// Default API version.
    pub const DEFAULT_API_VERSION: &'static str = "v1";

    /// Creates an endpoint with the default API version.
    #[must_use]
    pub fn new(ip: IpAddr, port: u16) -> Self {
        Self {
            ip,
            port,
            api_version: Self::DEFAULT_API_VERSION.to_string(),
        }
    }

    /// Sets the API version.
    #[must_use]
    pub fn with_api_version(mut self, version: impl Into<String>) -> Self {
        self.api_version = version.into();
        self
    }

    /// Returns the base URL, without a trailing slash.
    ///
    /// # Examples
    ///
    /// ```
    /// use wattsock::DeviceEndpoint;
    ///
    /// let endpoint = DeviceEndpoint::new("192.168.1.20".parse().unwrap(), 80);
    /// assert_eq!(endpoint.base_url(), "http://192.168.1.20");
    /// ```
    #[must_use]
    pub fn base_url(&self) -> String {
        if self.port == Self::DEFAULT_PORT {
            format!("http://{}", self.ip)
        } else {
            format!("http://{}:{}", self.ip, self.port)
        }
    }
}

impl fmt::Display for DeviceEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.ip, self.port)
    }
}
