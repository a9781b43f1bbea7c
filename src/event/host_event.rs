// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Events emitted towards the embedding host.

use uuid::Uuid;

use crate::types::DeviceIdentity;

/// A change the host may want to reflect in its accessory model.
#[derive(Debug, Clone, PartialEq)]
pub enum HostEvent {
    /// A device was registered for the first time.
    DeviceAdded {
        /// Stable identifier derived from the serial.
        uuid: Uuid,
        /// Identity read from the device.
        identity: DeviceIdentity,
    },
    /// An already registered device reappeared, possibly with a new address
    /// or firmware.
    DeviceUpdated {
        /// Stable identifier derived from the serial.
        uuid: Uuid,
        /// Refreshed identity.
        identity: DeviceIdentity,
    },
    /// A device was removed from the registry.
    DeviceRemoved {
        /// Stable identifier derived from the serial.
        uuid: Uuid,
    },
    /// The debounced in-use signal changed.
    InUseChanged {
        /// Device the signal belongs to.
        uuid: Uuid,
        /// New value of the signal.
        in_use: bool,
        /// Power reading that accompanied the change, if available.
        active_power_w: Option<f64>,
    },
    /// The relay state changed, observed by polling or a command.
    SwitchChanged {
        /// Device the relay belongs to.
        uuid: Uuid,
        /// New relay state.
        power_on: bool,
    },
}

impl HostEvent {
    /// Returns the device the event concerns.
    #[must_use]
    pub fn uuid(&self) -> Uuid {
        match self {
            Self::DeviceAdded { uuid, .. }
            | Self::DeviceUpdated { uuid, .. }
            | Self::DeviceRemoved { uuid }
            | Self::InUseChanged { uuid, .. }
            | Self::SwitchChanged { uuid, .. } => *uuid,
        }
    }

    /// True for events that add, update or remove a device, as opposed to
    /// runtime state changes.
    #[must_use]
    pub fn is_lifecycle(&self) -> bool {
        matches!(
            self,
            Self::DeviceAdded { .. } | Self::DeviceUpdated { .. } | Self::DeviceRemoved { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ProductType;

    fn identity() -> DeviceIdentity {
        DeviceIdentity::new(
            "3c12e7659852",
            ProductType::EnergySocket,
            "Energy Socket",
            "3.02",
        )
    }

    #[test]
    fn uuid_is_extracted_from_every_variant() {
        let identity = identity();
        let uuid = identity.uuid();

        let events = [
            HostEvent::DeviceAdded {
                uuid,
                identity: identity.clone(),
            },
            HostEvent::DeviceUpdated {
                uuid,
                identity,
            },
            HostEvent::DeviceRemoved { uuid },
            HostEvent::InUseChanged {
                uuid,
                in_use: true,
                active_power_w: Some(6.0),
            },
            HostEvent::SwitchChanged {
                uuid,
                power_on: false,
            },
        ];

        for event in events {
            assert_eq!(event.uuid(), uuid);
        }
    }

    #[test]
    fn lifecycle_classification() {
        let uuid = identity().uuid();
        assert!(HostEvent::DeviceRemoved { uuid }.is_lifecycle());
        assert!(
            !HostEvent::SwitchChanged {
                uuid,
                power_on: true
            }
            .is_lifecycle()
        );
    }
}
