// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Stable device identity.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::ProductType;

/// The resolved identity of a device.
///
/// An identity is created once, when a device is first resolved through the
/// basic-info endpoint, and is never mutated afterwards. Two devices are the
/// same device iff their [`uuid`](Self::uuid) matches: the uuid is derived
/// deterministically from the vendor serial number, so a device keeps its
/// identity across IP changes, restarts and re-discovery.
///
/// # Examples
///
/// ```
/// use wattsock::{DeviceIdentity, ProductType};
///
/// let identity = DeviceIdentity::new(
///     "3c12e7659852",
///     ProductType::EnergySocket,
///     "Energy Socket",
///     "3.02",
/// );
///
/// // Same serial, same uuid, no matter what else changed.
/// let later = DeviceIdentity::new(
///     "3c12e7659852",
///     ProductType::EnergySocket,
///     "Energy Socket",
///     "4.00",
/// );
/// assert_eq!(identity.uuid(), later.uuid());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceIdentity {
    /// Vendor serial number, e.g. `"3c12e7659852"`. This is also the MAC
    /// address of the device without colons.
    pub serial: String,
    /// The product type, e.g. [`ProductType::EnergySocket`].
    pub product_type: ProductType,
    /// Fixed vendor product name, e.g. `"Energy Socket"`.
    pub product_name: String,
    /// Firmware version string as reported by the device, e.g. `"3.02"`.
    pub firmware_version: String,
}

impl DeviceIdentity {
    /// Creates a new identity.
    #[must_use]
    pub fn new(
        serial: impl Into<String>,
        product_type: ProductType,
        product_name: impl Into<String>,
        firmware_version: impl Into<String>,
    ) -> Self {
        Self {
            serial: serial.into(),
            product_type,
            product_name: product_name.into(),
            firmware_version: firmware_version.into(),
        }
    }

    /// Returns the stable uuid for this identity.
    ///
    /// Derived as a v5 (name-based) uuid over the serial number, so the same
    /// serial always yields the same uuid.
    #[must_use]
    pub fn uuid(&self) -> Uuid {
        Uuid::new_v5(&Uuid::NAMESPACE_DNS, self.serial.as_bytes())
    }

    /// Returns the firmware version as a number, if it parses as one.
    ///
    /// Vendor firmware versions look like `"3.02"`. A version that does not
    /// parse is treated as unknown by callers gating on firmware features.
    #[must_use]
    pub fn firmware_number(&self) -> Option<f64> {
        self.firmware_version.parse().ok()
    }

    /// Returns the default display name, e.g. `"Energy Socket 3c12e7659852"`.
    #[must_use]
    pub fn display_name(&self) -> String {
        format!("{} {}", self.product_name, self.serial)
    }

    /// Returns the model name, e.g. `"Energy Socket (HWE-SKT)"`.
    #[must_use]
    pub fn model_name(&self) -> String {
        format!("{} ({})", self.product_name, self.product_type)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity(serial: &str) -> DeviceIdentity {
        DeviceIdentity::new(serial, ProductType::EnergySocket, "Energy Socket", "3.02")
    }

    #[test]
    fn uuid_is_deterministic() {
        assert_eq!(identity("aabbcc").uuid(), identity("aabbcc").uuid());
    }

    #[test]
    fn uuid_differs_per_serial() {
        assert_ne!(identity("aabbcc").uuid(), identity("aabbcd").uuid());
    }

    #[test]
    fn firmware_number_parses_vendor_format() {
        assert_eq!(identity("s").firmware_number(), Some(3.02));
    }

    #[test]
    fn firmware_number_none_for_garbage() {
        let mut id = identity("s");
        id.firmware_version = "unknown".to_string();
        assert_eq!(id.firmware_number(), None);
    }

    #[test]
    fn display_and_model_names() {
        let id = identity("3c12e7659852");
        assert_eq!(id.display_name(), "Energy Socket 3c12e7659852");
        assert_eq!(id.model_name(), "Energy Socket (HWE-SKT)");
    }
}
