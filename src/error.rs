// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Error types for the `wattsock` library.
//!
//! This module provides the error hierarchy for failures across the library:
//! HTTP communication with a device, rejected commands, discovery-record
//! parsing, and configuration validation.

use thiserror::Error;

/// The main error type for this library.
#[derive(Debug, Error)]
pub enum Error {
    /// Error occurred while talking to a device over HTTP.
    #[error("api error: {0}")]
    Api(#[from] ApiError),

    /// A command was rejected before any network call was made.
    #[error("command error: {0}")]
    Command(#[from] CommandError),

    /// Error occurred while interpreting a discovery announcement.
    #[error("discovery error: {0}")]
    Discovery(#[from] DiscoveryError),

    /// Error occurred during configuration validation.
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    /// Device was not found in the registry.
    #[error("device not found")]
    DeviceNotFound,

    /// Device resolved to a product this library does not control.
    #[error("unsupported product type {product_type} on device {serial}")]
    UnsupportedDevice {
        /// Serial of the rejected device.
        serial: String,
        /// Product type the device reported.
        product_type: crate::types::ProductType,
    },
}

/// Errors from the device HTTP API.
///
/// Transport errors (timeouts, refused connections) are transient and are
/// retried by the polling loops simply continuing. Response errors carry the
/// status code and body the device answered with.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The HTTP request itself failed (timeout, connection refused, DNS).
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The device answered with a non-2xx status.
    #[error("{method} {url} failed with status {status}: {body}")]
    Response {
        /// The HTTP method of the failed call.
        method: &'static str,
        /// The full request URL.
        url: String,
        /// The HTTP status code.
        status: u16,
        /// The raw response body.
        body: String,
    },

    /// The response body was not the expected JSON shape.
    #[error("invalid response body: {0}")]
    Parse(#[from] serde_json::Error),
}

impl ApiError {
    /// Returns true if the failure was a request timeout.
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Transport(e) if e.is_timeout())
    }
}

/// Errors for commands that are rejected locally, before any network call.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum CommandError {
    /// The device's switch lock is engaged; the relay cannot be changed over
    /// the API until the user disables the lock in the vendor app.
    #[error(
        "device {serial} is locked; disable the \"Switch lock\" setting in the vendor app first"
    )]
    SwitchLocked {
        /// Serial of the locked device.
        serial: String,
    },

    /// Identify requires a known firmware version, but none was reported.
    #[error("cannot identify device {serial}: firmware version is unknown")]
    FirmwareVersionUnknown {
        /// Serial of the device.
        serial: String,
    },

    /// Identify is only available from firmware version 3 onwards.
    #[error(
        "cannot identify device {serial}: firmware version is {version}, but identify requires 3.00 or later"
    )]
    FirmwareTooOld {
        /// Serial of the device.
        serial: String,
        /// The firmware version the device reported.
        version: f64,
    },
}

/// Errors while interpreting an mDNS service announcement.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DiscoveryError {
    /// A required TXT-record field is absent.
    #[error("missing TXT record field: {0}")]
    MissingTxtField(&'static str),

    /// The announcement carried no usable address.
    #[error("service announcement for {host} has no addresses")]
    NoAddress {
        /// The announced mDNS hostname.
        host: String,
    },
}

/// Errors from configuration validation.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConfigError {
    /// An outlet's IP is not a valid IPv4 address.
    #[error("outlet \"{name}\": \"{ip}\" is not a valid IPv4 address")]
    InvalidIp {
        /// The configured outlet name.
        name: String,
        /// The offending IP string.
        ip: String,
    },

    /// The in-use threshold is outside the supported range.
    #[error("outlet \"{name}\": threshold {value} W is out of range [{min}, {max}]")]
    ThresholdOutOfRange {
        /// The configured outlet name.
        name: String,
        /// The configured threshold.
        value: f64,
        /// Minimum allowed threshold.
        min: f64,
        /// Maximum allowed threshold.
        max: f64,
    },

    /// The in-use threshold duration is outside the supported range.
    #[error("outlet \"{name}\": threshold duration {value} s is out of range [0, {max}]")]
    DurationOutOfRange {
        /// The configured outlet name.
        name: String,
        /// The configured duration in seconds.
        value: u64,
        /// Maximum allowed duration in seconds.
        max: u64,
    },

    /// `outlet_in_use.is_active` is set without a threshold.
    #[error("outlet \"{name}\": a threshold is required when outlet_in_use.is_active is true")]
    MissingThreshold {
        /// The configured outlet name.
        name: String,
    },

    /// `outlet_in_use.is_active` is set without a threshold duration.
    #[error(
        "outlet \"{name}\": a threshold duration is required when outlet_in_use.is_active is true"
    )]
    MissingThresholdDuration {
        /// The configured outlet name.
        name: String,
    },
}

/// A specialized Result type for this library.
pub type Result<T> = std::result::Result<T, Error>;
