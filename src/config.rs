// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! User-supplied configuration.
//!
//! Configuration normally arrives pre-validated by the host platform's schema
//! layer; [`PlatformConfig::validate`] re-applies the same rules so the
//! library holds its own invariants when embedded elsewhere.

use std::net::Ipv4Addr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Default in-use threshold in watts.
pub const DEFAULT_THRESHOLD_W: f64 = 5.0;
/// Minimum allowed in-use threshold in watts.
pub const THRESHOLD_MIN_W: f64 = 0.1;
/// Maximum allowed in-use threshold in watts (16 A at 230 V).
pub const THRESHOLD_MAX_W: f64 = 3680.0;

/// Default in-use threshold duration in seconds.
pub const DEFAULT_THRESHOLD_DURATION_S: u64 = 10;
/// Maximum allowed in-use threshold duration in seconds (one day).
pub const THRESHOLD_DURATION_MAX_S: u64 = 86_400;

/// Per-outlet configuration of the debounced in-use signal.
///
/// When `is_active` is false (the default) the in-use signal simply mirrors
/// the relay state. When `is_active` is true the outlet is considered in use
/// once its power draw stays above `threshold` watts for `threshold_duration`
/// seconds, and not in use again once it stays below for the same duration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OutletInUseConfig {
    /// Enables the threshold-based in-use signal.
    #[serde(default)]
    pub is_active: bool,
    /// Power threshold in watts. Required when `is_active` is true.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub threshold: Option<f64>,
    /// How long the draw must stay on one side of the threshold, in seconds.
    /// Required when `is_active` is true.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub threshold_duration: Option<u64>,
    /// Logs every telemetry sample at debug level.
    #[serde(default)]
    pub verbose_logging: bool,
}

impl OutletInUseConfig {
    /// Returns the configured threshold, or the default.
    #[must_use]
    pub fn threshold_w(&self) -> f64 {
        self.threshold.unwrap_or(DEFAULT_THRESHOLD_W)
    }

    /// Returns the configured duration, or the default.
    #[must_use]
    pub fn duration(&self) -> Duration {
        Duration::from_secs(
            self.threshold_duration
                .unwrap_or(DEFAULT_THRESHOLD_DURATION_S),
        )
    }

    fn validate(&self, name: &str) -> Result<(), ConfigError> {
        if let Some(threshold) = self.threshold {
            if !(THRESHOLD_MIN_W..=THRESHOLD_MAX_W).contains(&threshold) {
                return Err(ConfigError::ThresholdOutOfRange {
                    name: name.to_string(),
                    value: threshold,
                    min: THRESHOLD_MIN_W,
                    max: THRESHOLD_MAX_W,
                });
            }
        }

        if let Some(duration) = self.threshold_duration {
            if duration > THRESHOLD_DURATION_MAX_S {
                return Err(ConfigError::DurationOutOfRange {
                    name: name.to_string(),
                    value: duration,
                    max: THRESHOLD_DURATION_MAX_S,
                });
            }
        }

        if self.is_active {
            if self.threshold.is_none() {
                return Err(ConfigError::MissingThreshold {
                    name: name.to_string(),
                });
            }
            if self.threshold_duration.is_none() {
                return Err(ConfigError::MissingThresholdDuration {
                    name: name.to_string(),
                });
            }
        }

        Ok(())
    }
}

/// A statically configured outlet.
///
/// Listing at least one outlet puts the reconciler in config mode: the list
/// becomes the sole source of truth and network discovery is not used.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutletDefinition {
    /// Display name chosen by the user.
    pub name: String,
    /// IPv4 address of the outlet.
    pub ip: String,
    /// Optional in-use signal configuration.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outlet_in_use: Option<OutletInUseConfig>,
}

impl OutletDefinition {
    /// Returns the parsed IPv4 address.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidIp`] if the address does not parse.
    pub fn ipv4(&self) -> Result<Ipv4Addr, ConfigError> {
        self.ip.parse().map_err(|_| ConfigError::InvalidIp {
            name: self.name.clone(),
            ip: self.ip.clone(),
        })
    }

    fn validate(&self) -> Result<(), ConfigError> {
        self.ipv4()?;
        if let Some(in_use) = &self.outlet_in_use {
            in_use.validate(&self.name)?;
        }
        Ok(())
    }
}

/// Top-level platform configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlatformConfig {
    /// Name of the platform instance.
    pub name: String,
    /// Statically configured outlets. Empty means discovery mode.
    #[serde(default)]
    pub outlets: Vec<OutletDefinition>,
}

impl PlatformConfig {
    /// Validates the whole configuration.
    ///
    /// # Errors
    ///
    /// Returns the first [`ConfigError`] encountered.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for outlet in &self.outlets {
            outlet.validate()?;
        }
        Ok(())
    }
}
