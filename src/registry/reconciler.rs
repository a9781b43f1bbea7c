// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Keeps the registry in sync with the outside world.
//!
//! Two mutually exclusive modes exist. In discovery mode, mDNS announcements
//! from the host's service browser drive registration, and devices the host
//! cached from a previous run are force-restored after a grace window if the
//! network has not re-announced them. In config mode, a static outlet list is
//! the sole source of truth and discovery input is ignored entirely.

use std::collections::HashSet;
use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::Registry;
use crate::config::{OutletDefinition, OutletInUseConfig, PlatformConfig};
use crate::discovery::{DiscoveryEvent, ServiceAnnouncement, TxtRecord};
use crate::types::DeviceEndpoint;

/// How long discovery mode waits for the network to re-announce cached
/// devices before force-restoring them.
pub const DEFAULT_RESTORE_GRACE: Duration = Duration::from_secs(5);

/// A device remembered from a previous run.
///
/// The host persists these across restarts so devices reappear immediately
/// instead of waiting for the network.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CachedAccessory {
    /// Identity as resolved last time.
    pub identity: crate::types::DeviceIdentity,
    /// Last known endpoint.
    pub endpoint: DeviceEndpoint,
    /// In-use configuration the device ran with.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config: Option<OutletInUseConfig>,
}

/// Drives the registry from mDNS announcements.
#[derive(Debug)]
pub struct DiscoveryReconciler {
    registry: Arc<Registry>,
    cached: Vec<CachedAccessory>,
    grace: Duration,
    seen: HashSet<Uuid>,
}

impl DiscoveryReconciler {
    /// Creates a reconciler with the default restore grace window.
    #[must_use]
    pub fn new(registry: Arc<Registry>, cached: Vec<CachedAccessory>) -> Self {
        Self {
            registry,
            cached,
            grace: DEFAULT_RESTORE_GRACE,
            seen: HashSet::new(),
        }
    }

    /// Overrides the restore grace window.
    #[must_use]
    pub fn with_grace(mut self, grace: Duration) -> Self {
        self.grace = grace;
        self
    }

    /// Consumes announcements until the channel closes.
    ///
    /// Cached devices the network has not re-announced within the grace
    /// window are force-restored; their pollers sort out whether they are
    /// actually reachable.
    pub async fn run(mut self, mut events: mpsc::Receiver<DiscoveryEvent>) {
        let grace = tokio::time::sleep(self.grace);
        tokio::pin!(grace);
        let mut restored = false;

        loop {
            tokio::select! {
                () = &mut grace, if !restored => {
                    restored = true;
                    self.restore_missing().await;
                }
                event = events.recv() => {
                    match event {
                        Some(event) => self.handle_event(event).await,
                        None => break,
                    }
                }
            }
        }
    }

    /// Applies one announcement to the registry.
    pub async fn handle_event(&mut self, event: DiscoveryEvent) {
        match event {
            DiscoveryEvent::Up(announcement) => self.handle_up(&announcement).await,
            DiscoveryEvent::Down(announcement) => self.handle_down(&announcement).await,
        }
    }

    async fn handle_up(&mut self, announcement: &ServiceAnnouncement) {
        let record = match TxtRecord::parse(&announcement.txt) {
            Ok(record) => record,
            Err(error) => {
                warn!(host = %announcement.host, error = %error, "ignoring malformed announcement");
                return;
            }
        };

        if !record.api_enabled {
            info!(
                serial = %record.serial,
                "device found but its local API is disabled, skipping"
            );
            return;
        }
        if !record.product_type.is_supported() {
            debug!(
                serial = %record.serial,
                product_type = %record.product_type,
                "unsupported product type, skipping"
            );
            return;
        }

        let Some(address) = announcement.primary_address() else {
            warn!(host = %announcement.host, "announcement carries no address, skipping");
            return;
        };

        let endpoint = DeviceEndpoint::new(address, announcement.port);
        match self.registry.attach(endpoint, None, None).await {
            Ok(uuid) => {
                self.seen.insert(uuid);
            }
            Err(error) => {
                warn!(
                    serial = %record.serial,
                    error = %error,
                    "could not resolve announced device"
                );
            }
        }
    }

    async fn handle_down(&self, announcement: &ServiceAnnouncement) {
        // Goodbye packets often arrive with an empty TXT payload, so fall
        // back to matching the announced address.
        if let Some(serial) = announcement.txt.get("serial") {
            if self.registry.mark_offline(serial).await {
                info!(serial = %serial, "device left the network");
            }
        } else if let Some(address) = announcement.primary_address() {
            if self.registry.mark_offline_by_address(address).await {
                info!(ip = %address, "device left the network");
            }
        }
    }

    async fn restore_missing(&mut self) {
        let cached = std::mem::take(&mut self.cached);
        for accessory in cached {
            let uuid = accessory.identity.uuid();
            if self.seen.contains(&uuid) || self.registry.contains(uuid).await {
                continue;
            }
            match self.registry.restore(accessory).await {
                Ok(uuid) => {
                    self.seen.insert(uuid);
                }
                Err(error) => warn!(error = %error, "could not restore cached device"),
            }
        }
    }
}

/// Drives the registry from a static outlet list.
#[derive(Debug)]
pub struct StaticReconciler {
    registry: Arc<Registry>,
    outlets: Vec<OutletDefinition>,
    port: u16,
}

impl StaticReconciler {
    #[must_use]
    pub fn new(registry: Arc<Registry>, outlets: Vec<OutletDefinition>) -> Self {
        Self {
            registry,
            outlets,
            port: DeviceEndpoint::DEFAULT_PORT,
        }
    }

    /// Overrides the HTTP API port. The outlet list only carries addresses;
    /// the devices themselves always listen on port 80.
    #[must_use]
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Brings the registry in line with the outlet list.
    ///
    /// Devices not on the list are removed first, so a device whose address
    /// was edited does not linger under its old entry. Unresolvable outlets
    /// are logged and skipped; the next reconciliation retries them.
    pub async fn reconcile(&self) {
        let keep: HashSet<IpAddr> = self
            .outlets
            .iter()
            .filter_map(|outlet| outlet.ipv4().ok().map(IpAddr::V4))
            .collect();
        let removed = self.registry.remove_unlisted(&keep).await;
        if !removed.is_empty() {
            info!(count = removed.len(), "removed outlets no longer configured");
        }

        for outlet in &self.outlets {
            let ip = match outlet.ipv4() {
                Ok(ip) => ip,
                Err(error) => {
                    warn!(name = %outlet.name, error = %error, "skipping outlet");
                    continue;
                }
            };

            let endpoint = DeviceEndpoint::new(IpAddr::V4(ip), self.port);
            if let Err(error) = self
                .registry
                .attach(
                    endpoint,
                    Some(outlet.name.clone()),
                    outlet.outlet_in_use.clone(),
                )
                .await
            {
                warn!(name = %outlet.name, ip = %ip, error = %error, "could not attach outlet");
            }
        }
    }
}

/// The reconciliation mode picked from the platform configuration.
#[derive(Debug)]
pub enum Reconciler {
    /// mDNS announcements drive the registry.
    Discovery(DiscoveryReconciler),
    /// A static outlet list drives the registry.
    Static(StaticReconciler),
}

impl Reconciler {
    /// Picks the mode: a non-empty outlet list means config mode, otherwise
    /// discovery mode with the given cache.
    #[must_use]
    pub fn from_config(
        registry: Arc<Registry>,
        config: &PlatformConfig,
        cached: Vec<CachedAccessory>,
    ) -> Self {
        if config.outlets.is_empty() {
            Self::Discovery(DiscoveryReconciler::new(registry, cached))
        } else {
            Self::Static(StaticReconciler::new(registry, config.outlets.clone()))
        }
    }
}
