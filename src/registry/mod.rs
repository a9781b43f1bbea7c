// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Device registry.
//!
//! The registry owns every known outlet: its identity, its current endpoint,
//! its runtime state and the poller driving it. All mutations go through one
//! async mutex, so concurrent discovery events and reconciliation passes
//! serialize cleanly.
//!
//! # Examples
//!
//! ```no_run
//! use wattsock::{DeviceEndpoint, Registry};
//!
//! # async fn example() -> wattsock::Result<()> {
//! let registry = Registry::new();
//! let mut events = registry.subscribe();
//!
//! let endpoint = DeviceEndpoint::new("192.168.1.20".parse().unwrap(), 80);
//! let uuid = registry.attach(endpoint, None, None).await?;
//!
//! registry.set_switch(uuid, true).await?;
//! # Ok(())
//! # }
//! ```

mod reconciler;

pub use reconciler::{CachedAccessory, DiscoveryReconciler, Reconciler, StaticReconciler};

use std::collections::{HashMap, HashSet};
use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, broadcast};
use tracing::{debug, info};
use uuid::Uuid;

use crate::api::OutletApi;
use crate::config::OutletInUseConfig;
use crate::error::{Error, Result};
use crate::event::{EventBus, HostEvent};
use crate::hysteresis::InUseDetector;
use crate::poller::OutletPoller;
use crate::state::{RuntimeSnapshot, SharedState};
use crate::types::{DeviceEndpoint, DeviceIdentity};

/// Default cadence of the per-device poll loops.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Tuning knobs of a [`Registry`].
#[derive(Debug, Clone)]
pub struct RegistryOptions {
    /// Cadence of the relay and telemetry poll loops.
    pub poll_interval: Duration,
    /// Per-request timeout towards the device HTTP API.
    pub api_timeout: Duration,
}

impl Default for RegistryOptions {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            api_timeout: OutletApi::DEFAULT_TIMEOUT,
        }
    }
}

#[derive(Debug)]
struct DeviceEntry {
    identity: DeviceIdentity,
    endpoint: DeviceEndpoint,
    config: Option<OutletInUseConfig>,
    display_name: String,
    shared: Arc<SharedState>,
    poller: Arc<OutletPoller>,
}

/// The set of known outlets and their pollers.
#[derive(Debug)]
pub struct Registry {
    devices: Mutex<HashMap<Uuid, DeviceEntry>>,
    events: EventBus,
    options: RegistryOptions,
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl Registry {
    /// Creates an empty registry with default options.
    #[must_use]
    pub fn new() -> Self {
        Self::with_options(RegistryOptions::default())
    }

    /// Creates an empty registry with the given options.
    #[must_use]
    pub fn with_options(options: RegistryOptions) -> Self {
        Self {
            devices: Mutex::new(HashMap::new()),
            events: EventBus::new(),
            options,
        }
    }

    /// Subscribes to lifecycle and state-change events.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<HostEvent> {
        self.events.subscribe()
    }

    /// Resolves a device at `endpoint` and registers it, or refreshes it if
    /// the serial is already known.
    ///
    /// Resolution is one basic-info request. A known serial gets its identity
    /// and endpoint replaced in place and a fresh poller; the last power
    /// reading carries over so a configured in-use detector does not reset to
    /// an arbitrary state.
    ///
    /// # Errors
    ///
    /// An API error when the device cannot be resolved, or
    /// [`Error::UnsupportedDevice`] for products this library does not
    /// control.
    pub async fn attach(
        &self,
        endpoint: DeviceEndpoint,
        display_name: Option<String>,
        config: Option<OutletInUseConfig>,
    ) -> Result<Uuid> {
        let api = Arc::new(OutletApi::for_endpoint(&endpoint, self.options.api_timeout)?);
        let info = api.get_basic_info().await?;

        if !info.product_type.is_supported() {
            return Err(Error::UnsupportedDevice {
                serial: info.serial,
                product_type: info.product_type,
            });
        }

        let identity = DeviceIdentity::new(
            info.serial,
            info.product_type,
            info.product_name,
            info.firmware_version,
        );
        let uuid = identity.uuid();
        let display_name = display_name.unwrap_or_else(|| identity.display_name());

        let mut devices = self.devices.lock().await;
        let initial_power = match devices.get(&uuid) {
            Some(existing) => {
                existing.poller.stop();
                existing.shared.last_power()
            }
            None => None,
        };

        let detector = config
            .as_ref()
            .and_then(|c| InUseDetector::from_config(c, initial_power));
        let shared = Arc::new(SharedState::new(detector));
        let poller = Arc::new(OutletPoller::new(
            &identity,
            api,
            Arc::clone(&shared),
            config.clone(),
            self.events.clone(),
            self.options.poll_interval,
        ));
        poller.start();

        let updated = devices
            .insert(
                uuid,
                DeviceEntry {
                    identity: identity.clone(),
                    endpoint,
                    config,
                    display_name,
                    shared,
                    poller,
                },
            )
            .is_some();
        drop(devices);

        if updated {
            info!(serial = %identity.serial, "device refreshed");
            self.events.publish(HostEvent::DeviceUpdated { uuid, identity });
        } else {
            info!(serial = %identity.serial, "device registered");
            self.events.publish(HostEvent::DeviceAdded { uuid, identity });
        }
        Ok(uuid)
    }

    /// Registers a previously known device without contacting it.
    ///
    /// The device starts with [`NetworkStatus::Unknown`] and its poller
    /// running against the last known endpoint; if it is truly gone the poll
    /// loop marks it offline after a few failures.
    ///
    /// [`NetworkStatus::Unknown`]: crate::NetworkStatus::Unknown
    ///
    /// # Errors
    ///
    /// An API error when the cached endpoint does not form a valid base URL.
    pub async fn restore(&self, cached: CachedAccessory) -> Result<Uuid> {
        let uuid = cached.identity.uuid();
        let mut devices = self.devices.lock().await;
        if devices.contains_key(&uuid) {
            return Ok(uuid);
        }

        let api = Arc::new(OutletApi::for_endpoint(
            &cached.endpoint,
            self.options.api_timeout,
        )?);
        let detector = cached
            .config
            .as_ref()
            .and_then(|c| InUseDetector::from_config(c, None));
        let shared = Arc::new(SharedState::new(detector));
        let poller = Arc::new(OutletPoller::new(
            &cached.identity,
            api,
            Arc::clone(&shared),
            cached.config.clone(),
            self.events.clone(),
            self.options.poll_interval,
        ));
        poller.start();

        let identity = cached.identity.clone();
        devices.insert(
            uuid,
            DeviceEntry {
                display_name: identity.display_name(),
                identity: cached.identity,
                endpoint: cached.endpoint,
                config: cached.config,
                shared,
                poller,
            },
        );
        drop(devices);

        info!(serial = %identity.serial, "device restored from cache");
        self.events.publish(HostEvent::DeviceAdded { uuid, identity });
        Ok(uuid)
    }

    /// Marks the device with the given serial offline.
    ///
    /// Returns false when the serial is unknown.
    pub async fn mark_offline(&self, serial: &str) -> bool {
        let devices = self.devices.lock().await;
        let Some(entry) = devices.values().find(|e| e.identity.serial == serial) else {
            return false;
        };
        entry.shared.mark_offline();
        debug!(serial, "device marked offline");
        true
    }

    /// Marks the device registered at the given address offline.
    ///
    /// Used when a browser down event carries no TXT record to identify the
    /// device by serial. Returns false when no device is registered at that
    /// address.
    pub async fn mark_offline_by_address(&self, address: IpAddr) -> bool {
        let devices = self.devices.lock().await;
        let Some(entry) = devices.values().find(|e| e.endpoint.ip == address) else {
            return false;
        };
        entry.shared.mark_offline();
        debug!(ip = %address, "device marked offline");
        true
    }

    /// Removes a device, stopping its poller.
    ///
    /// Returns false when the uuid is unknown.
    pub async fn remove(&self, uuid: Uuid) -> bool {
        let removed = self.devices.lock().await.remove(&uuid);
        match removed {
            Some(entry) => {
                entry.poller.stop();
                info!(serial = %entry.identity.serial, "device removed");
                self.events.publish(HostEvent::DeviceRemoved { uuid });
                true
            }
            None => false,
        }
    }

    /// Removes every device whose endpoint address is not in `keep`.
    ///
    /// Returns the removed uuids.
    pub async fn remove_unlisted(&self, keep: &HashSet<IpAddr>) -> Vec<Uuid> {
        let mut devices = self.devices.lock().await;
        let stale: Vec<Uuid> = devices
            .iter()
            .filter(|(_, entry)| !keep.contains(&entry.endpoint.ip))
            .map(|(uuid, _)| *uuid)
            .collect();

        for uuid in &stale {
            if let Some(entry) = devices.remove(uuid) {
                entry.poller.stop();
                info!(serial = %entry.identity.serial, "device no longer configured, removing");
            }
        }
        drop(devices);

        for uuid in &stale {
            self.events.publish(HostEvent::DeviceRemoved { uuid: *uuid });
        }
        stale
    }

    /// Switches the relay of a registered device.
    ///
    /// # Errors
    ///
    /// [`Error::DeviceNotFound`], or the command's own errors.
    pub async fn set_switch(&self, uuid: Uuid, on: bool) -> Result<bool> {
        self.poller(uuid).await?.set_switch(on).await
    }

    /// Reads the relay state of a registered device on demand.
    ///
    /// # Errors
    ///
    /// [`Error::DeviceNotFound`], or an API error.
    pub async fn get_switch(&self, uuid: Uuid) -> Result<bool> {
        self.poller(uuid).await?.get_switch().await
    }

    /// Blinks the LED ring of a registered device.
    ///
    /// # Errors
    ///
    /// [`Error::DeviceNotFound`], or the command's own errors.
    pub async fn identify(&self, uuid: Uuid) -> Result<()> {
        self.poller(uuid).await?.identify().await
    }

    /// Returns a snapshot of a device's runtime state.
    pub async fn runtime(&self, uuid: Uuid) -> Option<RuntimeSnapshot> {
        let devices = self.devices.lock().await;
        devices.get(&uuid).map(|entry| entry.shared.snapshot())
    }

    /// Returns the identity of a registered device.
    pub async fn identity(&self, uuid: Uuid) -> Option<DeviceIdentity> {
        let devices = self.devices.lock().await;
        devices.get(&uuid).map(|entry| entry.identity.clone())
    }

    /// Returns the display name of a registered device.
    pub async fn display_name(&self, uuid: Uuid) -> Option<String> {
        let devices = self.devices.lock().await;
        devices.get(&uuid).map(|entry| entry.display_name.clone())
    }

    /// True when the uuid is registered.
    pub async fn contains(&self, uuid: Uuid) -> bool {
        self.devices.lock().await.contains_key(&uuid)
    }

    /// Returns the uuids of all registered devices.
    pub async fn uuids(&self) -> Vec<Uuid> {
        self.devices.lock().await.keys().copied().collect()
    }

    /// Returns the number of registered devices.
    pub async fn len(&self) -> usize {
        self.devices.lock().await.len()
    }

    /// True when no devices are registered.
    pub async fn is_empty(&self) -> bool {
        self.devices.lock().await.is_empty()
    }

    /// Stops every poller. Devices stay registered.
    pub async fn shutdown(&self) {
        let devices = self.devices.lock().await;
        for entry in devices.values() {
            entry.poller.stop();
        }
    }

    async fn poller(&self, uuid: Uuid) -> Result<Arc<OutletPoller>> {
        let devices = self.devices.lock().await;
        devices
            .get(&uuid)
            .map(|entry| Arc::clone(&entry.poller))
            .ok_or(Error::DeviceNotFound)
    }
}
