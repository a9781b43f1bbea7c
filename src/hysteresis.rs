// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Debounced power-threshold detection.
//!
//! An outlet is considered *in use* once its measured draw stays strictly
//! above the configured threshold for the full configured duration, and no
//! longer in use once every observation over that duration is not above it.
//! A sample exactly on the threshold, or a telemetry read that carries no
//! power value at all, counts as not above: a device that stops reporting
//! readings eventually flips to not in use. Brief spikes and dips inside
//! the window do not flip the signal.
//!
//! The detector is a pure state machine. The caller supplies the current
//! [`Instant`] with every sample, which keeps it trivially testable and free
//! of timer tasks.
//!
//! # Examples
//!
//! ```
//! use std::time::{Duration, Instant};
//! use wattsock::hysteresis::InUseDetector;
//!
//! let start = Instant::now();
//! let mut detector = InUseDetector::new(5.0, Duration::from_secs(60), Some(2.0));
//! assert!(!detector.is_in_use());
//!
//! // A draw above the threshold arms the timer but does not flip yet.
//! assert!(detector.observe(Some(6.0), start).is_none());
//! assert!(detector.observe(Some(6.0), start + Duration::from_secs(59)).is_none());
//!
//! // Once the full duration has elapsed on the high side, the signal flips.
//! let transition = detector.observe(Some(6.0), start + Duration::from_secs(61));
//! assert!(transition.unwrap().in_use);
//! ```

use std::time::{Duration, Instant};

use crate::config::OutletInUseConfig;

/// A confirmed change of the in-use signal.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transition {
    /// The new value of the signal.
    pub in_use: bool,
    /// The sample that confirmed the change, in watts. `None` when the
    /// signal dropped because readings went missing.
    pub active_power_w: Option<f64>,
}

/// Tracks power samples against a threshold with a debounce window.
#[derive(Debug, Clone)]
pub struct InUseDetector {
    threshold_w: f64,
    duration: Duration,
    in_use: bool,
    crossed_above_at: Option<Instant>,
    crossed_below_at: Option<Instant>,
}

impl InUseDetector {
    /// Creates a detector.
    ///
    /// The initial signal is derived from `initial_power` alone, without
    /// waiting for the debounce window. A missing initial sample starts the
    /// detector in the not-in-use state.
    #[must_use]
    pub fn new(threshold_w: f64, duration: Duration, initial_power: Option<f64>) -> Self {
        Self {
            threshold_w,
            duration,
            in_use: initial_power.is_some_and(|p| p > threshold_w),
            crossed_above_at: None,
            crossed_below_at: None,
        }
    }

    /// Creates a detector from an outlet configuration.
    ///
    /// Returns `None` when the threshold signal is not enabled.
    #[must_use]
    pub fn from_config(config: &OutletInUseConfig, initial_power: Option<f64>) -> Option<Self> {
        config
            .is_active
            .then(|| Self::new(config.threshold_w(), config.duration(), initial_power))
    }

    /// Returns the current debounced signal.
    #[must_use]
    pub fn is_in_use(&self) -> bool {
        self.in_use
    }

    /// Returns the configured threshold in watts.
    #[must_use]
    pub fn threshold_w(&self) -> f64 {
        self.threshold_w
    }

    /// Feeds one telemetry sample into the detector.
    ///
    /// Returns a [`Transition`] only when the signal actually flips. Each
    /// timer is armed once per side and cleared only on a transition or when
    /// the observation flips to the other side.
    pub fn observe(&mut self, sample: Option<f64>, now: Instant) -> Option<Transition> {
        let above = sample.is_some_and(|power| power > self.threshold_w);

        if above {
            self.crossed_below_at = None;
            if self.in_use {
                return None;
            }
            let since = *self.crossed_above_at.get_or_insert(now);
            if now.duration_since(since) >= self.duration {
                self.crossed_above_at = None;
                self.in_use = true;
                return Some(Transition {
                    in_use: true,
                    active_power_w: sample,
                });
            }
        } else {
            self.crossed_above_at = None;
            if !self.in_use {
                return None;
            }
            let since = *self.crossed_below_at.get_or_insert(now);
            if now.duration_since(since) >= self.duration {
                self.crossed_below_at = None;
                self.in_use = false;
                return Some(Transition {
                    in_use: false,
                    active_power_w: sample,
                });
            }
        }

        None
    }
}
