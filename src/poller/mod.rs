// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Per-device polling and command execution.
//!
//! Each registered outlet gets one [`OutletPoller`]. It runs a relay poll
//! loop against the state endpoint and, when the threshold-based in-use
//! signal is configured, a second loop against the telemetry endpoint. Both
//! loops tolerate device outages indefinitely: failures are counted, logged
//! with a throttle, and polling simply continues.
//!
//! Commands (`set_switch`, `get_switch`, `identify`) run on the caller's
//! task, independent of the loops, and share the same runtime state.

use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::api::OutletApi;
use crate::api::responses::{SwitchState, SwitchUpdate};
use crate::config::OutletInUseConfig;
use crate::error::{CommandError, Result};
use crate::event::{EventBus, HostEvent};
use crate::state::SharedState;
use crate::types::DeviceIdentity;

/// Minimum firmware that supports the identify endpoint.
const IDENTIFY_MIN_FIRMWARE: f64 = 3.0;

/// How often a persistently failing poll is logged.
const ERROR_LOG_INTERVAL: Duration = Duration::from_secs(15 * 60);

/// Suppresses repeated error logs from a tight poll loop.
///
/// The first failure after a success is logged; after that, one log line
/// roughly every [`ERROR_LOG_INTERVAL`] while the failures continue.
#[derive(Debug)]
struct ErrorThrottle {
    count: u32,
    every: u32,
}

impl ErrorThrottle {
    /// Sizes the throttle for a loop ticking at `interval`.
    fn for_interval(interval: Duration) -> Self {
        let ticks = ERROR_LOG_INTERVAL.as_millis() / interval.as_millis().max(1);
        Self {
            count: 0,
            every: u32::try_from(ticks).unwrap_or(u32::MAX).max(1),
        }
    }

    /// Records one failure and returns whether it should be logged.
    fn record(&mut self) -> bool {
        self.count += 1;
        if self.count == 1 {
            true
        } else if self.count > self.every {
            self.count = 1;
            true
        } else {
            false
        }
    }

    fn reset(&mut self) {
        self.count = 0;
    }
}

/// Polls one outlet and executes commands against it.
#[derive(Debug)]
pub struct OutletPoller {
    serial: String,
    uuid: Uuid,
    firmware: Option<f64>,
    api: Arc<OutletApi>,
    shared: Arc<SharedState>,
    config: Option<OutletInUseConfig>,
    events: EventBus,
    interval: Duration,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl OutletPoller {
    pub(crate) fn new(
        identity: &DeviceIdentity,
        api: Arc<OutletApi>,
        shared: Arc<SharedState>,
        config: Option<OutletInUseConfig>,
        events: EventBus,
        interval: Duration,
    ) -> Self {
        Self {
            serial: identity.serial.clone(),
            uuid: identity.uuid(),
            firmware: identity.firmware_number(),
            api,
            shared,
            config,
            events,
            interval,
            tasks: Mutex::new(Vec::new()),
        }
    }

    /// Spawns the poll loops. Calling this twice is a no-op.
    pub(crate) fn start(&self) {
        let mut tasks = self.tasks.lock();
        if !tasks.is_empty() {
            return;
        }

        tasks.push(tokio::spawn(state_loop(
            self.serial.clone(),
            self.uuid,
            Arc::clone(&self.api),
            Arc::clone(&self.shared),
            self.events.clone(),
            self.interval,
        )));

        if let Some(config) = self.config.as_ref().filter(|c| c.is_active) {
            tasks.push(tokio::spawn(telemetry_loop(
                self.serial.clone(),
                self.uuid,
                Arc::clone(&self.api),
                Arc::clone(&self.shared),
                self.events.clone(),
                self.interval,
                config.verbose_logging,
            )));
        }
    }

    /// Aborts the poll loops. Safe to call more than once.
    pub(crate) fn stop(&self) {
        for task in self.tasks.lock().drain(..) {
            task.abort();
        }
    }

    /// Switches the relay on or off.
    ///
    /// The last polled switch-lock flag is consulted first: a locked outlet
    /// rejects the command without any network traffic. The device's response
    /// is recorded as the new relay state.
    ///
    /// # Errors
    ///
    /// [`CommandError::SwitchLocked`] when the relay is locked, or an API
    /// error from the request.
    pub async fn set_switch(&self, on: bool) -> Result<bool> {
        if self.shared.switch_lock() == Some(true) {
            return Err(CommandError::SwitchLocked {
                serial: self.serial.clone(),
            }
            .into());
        }

        let state = self.api.put_switch_state(&SwitchUpdate::power(on)).await?;
        if state.switch_lock {
            warn!(
                serial = %self.serial,
                "switch lock engaged while the command was in flight"
            );
        }
        self.apply_switch_state(state);
        Ok(state.power_on)
    }

    /// Reads the relay state from the device right now, bypassing the poll
    /// cadence, and records it.
    ///
    /// # Errors
    ///
    /// An API error from the request.
    pub async fn get_switch(&self) -> Result<bool> {
        let state = self.api.get_switch_state().await?;
        self.apply_switch_state(state);
        Ok(state.power_on)
    }

    /// Blinks the device LED ring.
    ///
    /// Only supported from firmware 3.00 onwards; older or unparseable
    /// versions are rejected without any network traffic.
    ///
    /// # Errors
    ///
    /// [`CommandError::FirmwareVersionUnknown`], [`CommandError::FirmwareTooOld`],
    /// or an API error from the request.
    pub async fn identify(&self) -> Result<()> {
        match self.firmware {
            None => Err(CommandError::FirmwareVersionUnknown {
                serial: self.serial.clone(),
            }
            .into()),
            Some(version) if version < IDENTIFY_MIN_FIRMWARE => Err(CommandError::FirmwareTooOld {
                serial: self.serial.clone(),
                version,
            }
            .into()),
            Some(_) => {
                self.api.identify().await?;
                Ok(())
            }
        }
    }

    pub(crate) fn uuid(&self) -> Uuid {
        self.uuid
    }

    fn apply_switch_state(&self, state: SwitchState) {
        let delta = self.shared.record_switch_state(state);
        publish_switch_delta(
            &self.events,
            self.uuid,
            delta,
            self.shared.last_power(),
        );
    }
}

fn publish_switch_delta(
    events: &EventBus,
    uuid: Uuid,
    delta: crate::state::SwitchDelta,
    last_power: Option<f64>,
) {
    if let Some(power_on) = delta.power_changed {
        events.publish(HostEvent::SwitchChanged { uuid, power_on });
    }
    if let Some(in_use) = delta.in_use_changed {
        events.publish(HostEvent::InUseChanged {
            uuid,
            in_use,
            active_power_w: last_power,
        });
    }
}

async fn state_loop(
    serial: String,
    uuid: Uuid,
    api: Arc<OutletApi>,
    shared: Arc<SharedState>,
    events: EventBus,
    period: Duration,
) {
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut throttle = ErrorThrottle::for_interval(period);

    loop {
        ticker.tick().await;
        match api.get_switch_state().await {
            Ok(state) => {
                throttle.reset();
                let delta = shared.record_switch_state(state);
                publish_switch_delta(&events, uuid, delta, shared.last_power());
            }
            Err(error) => {
                let (failures, went_offline) = shared.record_poll_error();
                if went_offline {
                    warn!(serial = %serial, failures, "device unreachable, marking offline");
                }
                if throttle.record() {
                    warn!(serial = %serial, error = %error, "relay poll failed");
                }
            }
        }
    }
}

async fn telemetry_loop(
    serial: String,
    uuid: Uuid,
    api: Arc<OutletApi>,
    shared: Arc<SharedState>,
    events: EventBus,
    period: Duration,
    verbose: bool,
) {
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut throttle = ErrorThrottle::for_interval(period);

    loop {
        ticker.tick().await;
        match api.get_telemetry().await {
            Ok(data) => {
                throttle.reset();
                if verbose {
                    debug!(serial = %serial, power = ?data.active_power_w, "telemetry sample");
                }
                if let Some(transition) = shared.record_telemetry(&data, Instant::now()) {
                    debug!(
                        serial = %serial,
                        in_use = transition.in_use,
                        power = ?transition.active_power_w,
                        "in-use signal changed"
                    );
                    events.publish(HostEvent::InUseChanged {
                        uuid,
                        in_use: transition.in_use,
                        active_power_w: transition.active_power_w,
                    });
                }
            }
            Err(error) => {
                let (failures, went_offline) = shared.record_poll_error();
                if went_offline {
                    warn!(serial = %serial, failures, "device unreachable, marking offline");
                }
                if throttle.record() {
                    warn!(serial = %serial, error = %error, "telemetry poll failed");
                }
            }
        }
    }
}
