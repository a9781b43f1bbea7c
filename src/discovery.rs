// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! mDNS service-browser input types.
//!
//! Outlets announce themselves on the local network as `_hwenergy._tcp`
//! services, carrying a TXT record that describes the device before any HTTP
//! request is made. The library does not run its own mDNS browser; instead
//! the host feeds [`DiscoveryEvent`]s into the reconciler from whatever
//! browser it already has.
//!
//! # Examples
//!
//! ```
//! use std::collections::BTreeMap;
//! use wattsock::discovery::TxtRecord;
//!
//! let mut txt = BTreeMap::new();
//! txt.insert("api_enabled".to_string(), "1".to_string());
//! txt.insert("path".to_string(), "/api/v1".to_string());
//! txt.insert("serial".to_string(), "3c12e7659852".to_string());
//! txt.insert("product_name".to_string(), "Energy Socket".to_string());
//! txt.insert("product_type".to_string(), "HWE-SKT".to_string());
//!
//! let record = TxtRecord::parse(&txt).unwrap();
//! assert!(record.api_enabled);
//! assert!(record.product_type.is_supported());
//! ```

use std::collections::BTreeMap;
use std::net::IpAddr;

use crate::error::DiscoveryError;
use crate::types::ProductType;

/// mDNS service type outlets announce under.
pub const SERVICE_TYPE: &str = "hwenergy";
/// Transport protocol of the announced service.
pub const SERVICE_PROTOCOL: &str = "tcp";

/// A resolved mDNS service announcement, as produced by the host's browser.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceAnnouncement {
    /// Hostname from the SRV record.
    pub host: String,
    /// Resolved addresses, most preferred first.
    pub addresses: Vec<IpAddr>,
    /// TCP port of the HTTP API.
    pub port: u16,
    /// Key-value pairs from the TXT record.
    pub txt: BTreeMap<String, String>,
}

impl ServiceAnnouncement {
    /// Returns the first resolved address, preferring IPv4.
    #[must_use]
    pub fn primary_address(&self) -> Option<IpAddr> {
        self.addresses
            .iter()
            .find(|addr| addr.is_ipv4())
            .or_else(|| self.addresses.first())
            .copied()
    }
}

/// A change observed by the service browser.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiscoveryEvent {
    /// A service appeared or its records were refreshed.
    Up(ServiceAnnouncement),
    /// A service disappeared from the network.
    Down(ServiceAnnouncement),
}

/// Parsed TXT record of an outlet announcement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxtRecord {
    /// Whether the local HTTP API is switched on in the device settings.
    pub api_enabled: bool,
    /// API base path, e.g. `/api/v1`.
    pub path: String,
    /// Device serial, twelve hex characters.
    pub serial: String,
    /// Human-readable product name.
    pub product_name: String,
    /// Product type code.
    pub product_type: ProductType,
}

impl TxtRecord {
    /// Parses the TXT key-value pairs of an announcement.
    ///
    /// # Errors
    ///
    /// Returns [`DiscoveryError::MissingTxtField`] if a required key is
    /// absent.
    pub fn parse(txt: &BTreeMap<String, String>) -> Result<Self, DiscoveryError> {
        let field = |key: &'static str| {
            txt.get(key)
                .cloned()
                .ok_or(DiscoveryError::MissingTxtField(key))
        };

        Ok(Self {
            api_enabled: field("api_enabled")? == "1",
            path: field("path")?,
            serial: field("serial")?,
            product_name: field("product_name")?,
            product_type: ProductType::from(field("product_type")?),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::{Ipv4Addr, Ipv6Addr};

    fn txt() -> BTreeMap<String, String> {
        [
            ("api_enabled", "1"),
            ("path", "/api/v1"),
            ("serial", "3c12e7659852"),
            ("product_name", "Energy Socket"),
            ("product_type", "HWE-SKT"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
    }

    #[test]
    fn parses_complete_record() {
        let record = TxtRecord::parse(&txt()).unwrap();
        assert!(record.api_enabled);
        assert_eq!(record.path, "/api/v1");
        assert_eq!(record.serial, "3c12e7659852");
        assert_eq!(record.product_type, ProductType::EnergySocket);
    }

    #[test]
    fn api_enabled_requires_exactly_one() {
        let mut fields = txt();
        fields.insert("api_enabled".to_string(), "0".to_string());
        assert!(!TxtRecord::parse(&fields).unwrap().api_enabled);

        fields.insert("api_enabled".to_string(), "true".to_string());
        assert!(!TxtRecord::parse(&fields).unwrap().api_enabled);
    }

    #[test]
    fn missing_field_is_reported() {
        let mut fields = txt();
        fields.remove("serial");
        assert!(matches!(
            TxtRecord::parse(&fields),
            Err(DiscoveryError::MissingTxtField("serial"))
        ));
    }

    #[test]
    fn primary_address_prefers_ipv4() {
        let announcement = ServiceAnnouncement {
            host: "energysocket-659852.local".to_string(),
            addresses: vec![
                IpAddr::V6(Ipv6Addr::LOCALHOST),
                IpAddr::V4(Ipv4Addr::new(192, 168, 1, 20)),
            ],
            port: 80,
            txt: txt(),
        };
        assert_eq!(
            announcement.primary_address(),
            Some(IpAddr::V4(Ipv4Addr::new(192, 168, 1, 20)))
        );
    }

    #[test]
    fn primary_address_empty_is_none() {
        let announcement = ServiceAnnouncement {
            host: "energysocket-659852.local".to_string(),
            addresses: Vec::new(),
            port: 80,
            txt: txt(),
        };
        assert_eq!(announcement.primary_address(), None);
    }
}
