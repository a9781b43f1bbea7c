// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Product-type classification for HomeWizard devices.

use std::fmt;

use serde::{Deserialize, Serialize};

/// The vendor product-type identifier of a device.
///
/// The vendor announces this in the mDNS TXT record and in the basic-info
/// endpoint as a short string like `"HWE-SKT"`. Only the Energy Socket is
/// supported by this library; the other known types are modeled so they can
/// be recognized and skipped during discovery, and unknown future types fall
/// back to [`ProductType::Other`].
///
/// # Examples
///
/// ```
/// use wattsock::ProductType;
///
/// let pt = ProductType::from("HWE-SKT".to_string());
/// assert_eq!(pt, ProductType::EnergySocket);
/// assert!(pt.is_supported());
///
/// let pt = ProductType::from("HWE-P1".to_string());
/// assert!(!pt.is_supported());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ProductType {
    /// Wi-Fi Energy Socket (`HWE-SKT`), the only switchable outlet.
    EnergySocket,
    /// Wi-Fi P1 smart-meter dongle (`HWE-P1`).
    P1Meter,
    /// Wi-Fi water meter (`HWE-WTR`).
    WaterMeter,
    /// Single-phase kWh meter (`SDM230-wifi`).
    KwhMeterPhase1,
    /// Three-phase kWh meter (`SDM630-wifi`).
    KwhMeterPhase3,
    /// A product type this library does not know about.
    Other(String),
}

impl ProductType {
    /// Returns true if this library can manage the device as an outlet.
    ///
    /// Only the Energy Socket has a switchable relay and the state endpoint;
    /// every other product type is skipped during discovery.
    #[must_use]
    pub fn is_supported(&self) -> bool {
        matches!(self, Self::EnergySocket)
    }

    /// Returns the vendor identifier string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::EnergySocket => "HWE-SKT",
            Self::P1Meter => "HWE-P1",
            Self::WaterMeter => "HWE-WTR",
            Self::KwhMeterPhase1 => "SDM230-wifi",
            Self::KwhMeterPhase3 => "SDM630-wifi",
            Self::Other(s) => s,
        }
    }
}

impl From<String> for ProductType {
    fn from(value: String) -> Self {
        match value.as_str() {
            "HWE-SKT" => Self::EnergySocket,
            "HWE-P1" => Self::P1Meter,
            "HWE-WTR" => Self::WaterMeter,
            "SDM230-wifi" => Self::KwhMeterPhase1,
            "SDM630-wifi" => Self::KwhMeterPhase3,
            _ => Self::Other(value),
        }
    }
}

impl From<ProductType> for String {
    fn from(value: ProductType) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for ProductType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
