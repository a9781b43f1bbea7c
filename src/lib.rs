// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! `WattSock` - A Rust library to manage HomeWizard Energy Sockets.
//!
//! This library keeps a fleet of smart outlets registered, polled and
//! controllable over their local HTTP API.
//!
//! # Supported Features
//!
//! - **Relay control**: Switch outlets on/off, honoring the hardware
//!   switch lock
//! - **Continuous polling**: Relay state and power telemetry per device,
//!   resilient to outages
//! - **In-use detection**: Debounced power-threshold signal per outlet
//! - **Fleet reconciliation**: mDNS-announcement driven, or from a static
//!   outlet list
//! - **Identify**: Blink the LED ring of a device (firmware 3.00+)
//!
//! # Quick Start
//!
//! ## Static outlet list
//!
//! ```no_run
//! use std::sync::Arc;
//! use wattsock::{PlatformConfig, Reconciler, Registry};
//!
//! #[tokio::main]
//! async fn main() -> wattsock::Result<()> {
//!     let config: PlatformConfig = serde_json::from_str(
//!         r#"{"name": "Outlets", "outlets": [{"name": "Washer", "ip": "192.168.1.30"}]}"#,
//!     )
//!     .map_err(wattsock::ApiError::from)?;
//!     config.validate()?;
//!
//!     let registry = Arc::new(Registry::new());
//!     let mut events = registry.subscribe();
//!
//!     if let Reconciler::Static(reconciler) =
//!         Reconciler::from_config(Arc::clone(&registry), &config, Vec::new())
//!     {
//!         reconciler.reconcile().await;
//!     }
//!
//!     while let Ok(event) = events.recv().await {
//!         println!("{event:?}");
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Discovery mode
//!
//! The library does not run an mDNS browser itself; the host feeds
//! announcements from its own browser into the reconciler:
//!
//! ```no_run
//! use std::sync::Arc;
//! use tokio::sync::mpsc;
//! use wattsock::{DiscoveryEvent, DiscoveryReconciler, Registry};
//!
//! #[tokio::main]
//! async fn main() {
//!     let registry = Arc::new(Registry::new());
//!     let (tx, rx) = mpsc::channel::<DiscoveryEvent>(32);
//!
//!     // Cached accessories from a previous run would be passed here.
//!     let reconciler = DiscoveryReconciler::new(Arc::clone(&registry), Vec::new());
//!     tokio::spawn(reconciler.run(rx));
//!
//!     // tx is handed to the host's mDNS browser.
//!     # drop(tx);
//! }
//! ```

pub mod api;
pub mod config;
pub mod discovery;
pub mod error;
pub mod event;
pub mod hysteresis;
mod poller;
pub mod registry;
mod state;
pub mod types;

pub use api::OutletApi;
pub use api::responses::{BasicInfo, SwitchState, SwitchUpdate, TelemetryData};
pub use config::{OutletDefinition, OutletInUseConfig, PlatformConfig};
pub use discovery::{DiscoveryEvent, ServiceAnnouncement, TxtRecord};
pub use error::{ApiError, CommandError, ConfigError, DiscoveryError, Error, Result};
pub use event::{EventBus, HostEvent};
pub use hysteresis::{InUseDetector, Transition};
pub use poller::OutletPoller;
pub use registry::{
    CachedAccessory, DiscoveryReconciler, Reconciler, Registry, RegistryOptions, StaticReconciler,
};
pub use state::{NetworkStatus, RuntimeSnapshot};
pub use types::{DeviceEndpoint, DeviceIdentity, ProductType};
