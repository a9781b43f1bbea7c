// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Per-device runtime state shared between poll loops and the registry.
//!
//! All mutable runtime data of one outlet lives behind a single mutex, so
//! the relay poll loop, the telemetry loop and on-demand commands always see
//! a consistent picture. Callers outside the crate only ever receive a
//! [`RuntimeSnapshot`].

use std::time::Instant;

use parking_lot::Mutex;

use crate::api::responses::{SwitchState, TelemetryData};
use crate::hysteresis::{InUseDetector, Transition};

/// Consecutive poll failures after which a device is reported offline.
pub(crate) const OFFLINE_AFTER_ERRORS: u32 = 3;

/// Reachability of a device as derived from its poll loop.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum NetworkStatus {
    /// The last poll succeeded.
    Online,
    /// Several consecutive polls failed, or the device left the network.
    Offline,
    /// No poll has completed yet.
    #[default]
    Unknown,
}

/// A point-in-time copy of a device's runtime state.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RuntimeSnapshot {
    /// Last relay state read from the device.
    pub switch_state: Option<SwitchState>,
    /// Last power reading in watts.
    pub active_power_w: Option<f64>,
    /// Current reachability.
    pub network_status: NetworkStatus,
    /// Failures since the last successful poll. Relay and telemetry polls
    /// share this counter; any successful poll clears it.
    pub consecutive_poll_errors: u32,
    /// The debounced in-use signal, or the mirrored relay state when the
    /// threshold signal is disabled.
    pub in_use: bool,
}

/// What changed when a relay state was recorded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct SwitchDelta {
    /// New relay value, if it differs from the previous reading.
    pub power_changed: Option<bool>,
    /// New in-use value, if the mirrored signal flipped.
    pub in_use_changed: Option<bool>,
}

#[derive(Debug)]
struct DeviceRuntime {
    switch_state: Option<SwitchState>,
    active_power_w: Option<f64>,
    network_status: NetworkStatus,
    consecutive_poll_errors: u32,
    in_use: bool,
    detector: Option<InUseDetector>,
}

/// Thread-safe runtime state of one outlet.
#[derive(Debug)]
pub(crate) struct SharedState {
    inner: Mutex<DeviceRuntime>,
}

impl SharedState {
    /// Creates the state for a freshly attached device.
    ///
    /// Without a detector the in-use signal mirrors the relay and starts out
    /// as `true` until the first poll proves otherwise.
    pub fn new(detector: Option<InUseDetector>) -> Self {
        let in_use = detector.as_ref().map_or(true, InUseDetector::is_in_use);
        Self {
            inner: Mutex::new(DeviceRuntime {
                switch_state: None,
                active_power_w: None,
                network_status: NetworkStatus::Unknown,
                consecutive_poll_errors: 0,
                in_use,
                detector,
            }),
        }
    }

    pub fn snapshot(&self) -> RuntimeSnapshot {
        let inner = self.inner.lock();
        RuntimeSnapshot {
            switch_state: inner.switch_state,
            active_power_w: inner.active_power_w,
            network_status: inner.network_status,
            consecutive_poll_errors: inner.consecutive_poll_errors,
            in_use: inner.in_use,
        }
    }

    /// Returns the last known switch-lock flag, if any poll has succeeded.
    pub fn switch_lock(&self) -> Option<bool> {
        self.inner.lock().switch_state.map(|s| s.switch_lock)
    }

    pub fn last_power(&self) -> Option<f64> {
        self.inner.lock().active_power_w
    }

    /// Records a successful relay read and returns what changed.
    ///
    /// Marks the device online and clears the error counter. When no
    /// detector is configured the in-use signal mirrors the relay.
    pub fn record_switch_state(&self, state: SwitchState) -> SwitchDelta {
        let mut inner = self.inner.lock();
        let previous = inner.switch_state.replace(state);
        inner.network_status = NetworkStatus::Online;
        inner.consecutive_poll_errors = 0;

        let mut delta = SwitchDelta::default();
        if previous.map(|p| p.power_on) != Some(state.power_on) {
            delta.power_changed = Some(state.power_on);
        }
        if inner.detector.is_none() && inner.in_use != state.power_on {
            inner.in_use = state.power_on;
            delta.in_use_changed = Some(state.power_on);
        }
        delta
    }

    /// Records a telemetry sample and returns a detector transition, if the
    /// debounced signal flipped.
    ///
    /// A successful telemetry poll proves reachability the same way a relay
    /// poll does: the device is marked online and the error counter cleared.
    pub fn record_telemetry(&self, data: &TelemetryData, now: Instant) -> Option<Transition> {
        let mut inner = self.inner.lock();
        inner.active_power_w = data.active_power_w;
        inner.network_status = NetworkStatus::Online;
        inner.consecutive_poll_errors = 0;
        let sample = data.active_power_w;
        let transition = inner.detector.as_mut()?.observe(sample, now)?;
        inner.in_use = transition.in_use;
        Some(transition)
    }

    /// Records a failed poll, from either loop.
    ///
    /// Returns the new failure count and whether this failure pushed the
    /// device from a non-offline status to offline.
    pub fn record_poll_error(&self) -> (u32, bool) {
        let mut inner = self.inner.lock();
        inner.consecutive_poll_errors += 1;
        let went_offline = inner.consecutive_poll_errors >= OFFLINE_AFTER_ERRORS
            && inner.network_status != NetworkStatus::Offline;
        if went_offline {
            inner.network_status = NetworkStatus::Offline;
        }
        (inner.consecutive_poll_errors, went_offline)
    }

    /// Marks the device offline immediately, e.g. on a browser down event.
    pub fn mark_offline(&self) {
        self.inner.lock().network_status = NetworkStatus::Offline;
    }

    pub fn detector_enabled(&self) -> bool {
        self.inner.lock().detector.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn switch(power_on: bool, switch_lock: bool) -> SwitchState {
        SwitchState {
            power_on,
            switch_lock,
            brightness: 255,
        }
    }

    fn telemetry(power: Option<f64>) -> TelemetryData {
        TelemetryData {
            active_power_w: power,
            ..TelemetryData::default()
        }
    }

    #[test]
    fn starts_unknown_and_assumed_in_use() {
        let state = SharedState::new(None);
        let snapshot = state.snapshot();
        assert_eq!(snapshot.network_status, NetworkStatus::Unknown);
        assert!(snapshot.in_use);
        assert!(snapshot.switch_state.is_none());
    }

    #[test]
    fn detector_initial_sample_sets_in_use() {
        let detector = InUseDetector::new(5.0, Duration::from_secs(10), Some(2.0));
        let state = SharedState::new(Some(detector));
        assert!(!state.snapshot().in_use);
    }

    #[test]
    fn switch_state_mirrors_in_use_without_detector() {
        let state = SharedState::new(None);

        let delta = state.record_switch_state(switch(false, false));
        assert_eq!(delta.power_changed, Some(false));
        assert_eq!(delta.in_use_changed, Some(false));

        // Same reading again reports no change.
        let delta = state.record_switch_state(switch(false, false));
        assert_eq!(delta, SwitchDelta::default());

        let delta = state.record_switch_state(switch(true, false));
        assert_eq!(delta.power_changed, Some(true));
        assert_eq!(delta.in_use_changed, Some(true));
    }

    #[test]
    fn detector_decouples_in_use_from_relay() {
        let detector = InUseDetector::new(5.0, Duration::from_secs(10), Some(6.0));
        let state = SharedState::new(Some(detector));

        let delta = state.record_switch_state(switch(false, false));
        assert_eq!(delta.power_changed, Some(false));
        assert_eq!(delta.in_use_changed, None);
        assert!(state.snapshot().in_use);
    }

    #[test]
    fn errors_accumulate_until_offline() {
        let state = SharedState::new(None);
        assert_eq!(state.record_poll_error(), (1, false));
        assert_eq!(state.record_poll_error(), (2, false));
        assert_eq!(state.record_poll_error(), (3, true));
        // Already offline, no repeated offline transition.
        assert_eq!(state.record_poll_error(), (4, false));
        assert_eq!(state.snapshot().network_status, NetworkStatus::Offline);
    }

    #[test]
    fn successful_poll_clears_errors_and_restores_online() {
        let state = SharedState::new(None);
        for _ in 0..3 {
            state.record_poll_error();
        }
        state.record_switch_state(switch(true, false));

        let snapshot = state.snapshot();
        assert_eq!(snapshot.network_status, NetworkStatus::Online);
        assert_eq!(snapshot.consecutive_poll_errors, 0);
    }

    #[test]
    fn telemetry_drives_detector_transitions() {
        let detector = InUseDetector::new(5.0, Duration::ZERO, Some(2.0));
        let state = SharedState::new(Some(detector));
        let now = Instant::now();

        let transition = state.record_telemetry(&telemetry(Some(9.5)), now).unwrap();
        assert!(transition.in_use);
        let snapshot = state.snapshot();
        assert!(snapshot.in_use);
        assert_eq!(snapshot.active_power_w, Some(9.5));
    }

    #[test]
    fn telemetry_without_detector_only_stores_power() {
        let state = SharedState::new(None);
        let now = Instant::now();
        assert!(state.record_telemetry(&telemetry(Some(3.0)), now).is_none());
        assert_eq!(state.last_power(), Some(3.0));
    }

    #[test]
    fn successful_telemetry_also_clears_errors() {
        let state = SharedState::new(None);
        state.record_poll_error();
        state.record_poll_error();

        state.record_telemetry(&telemetry(Some(3.0)), Instant::now());

        let snapshot = state.snapshot();
        assert_eq!(snapshot.network_status, NetworkStatus::Online);
        assert_eq!(snapshot.consecutive_poll_errors, 0);
    }

    #[test]
    fn missing_telemetry_readings_eventually_drop_in_use() {
        let detector = InUseDetector::new(5.0, Duration::ZERO, Some(9.0));
        let state = SharedState::new(Some(detector));
        assert!(state.snapshot().in_use);

        let transition = state
            .record_telemetry(&telemetry(None), Instant::now())
            .unwrap();
        assert!(!transition.in_use);
        assert_eq!(transition.active_power_w, None);
        assert!(!state.snapshot().in_use);
    }

    #[test]
    fn switch_lock_reflects_last_reading() {
        let state = SharedState::new(None);
        assert_eq!(state.switch_lock(), None);
        state.record_switch_state(switch(true, true));
        assert_eq!(state.switch_lock(), Some(true));
    }
}
