// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Host-facing event stream.
//!
//! The registry and the per-device pollers publish [`HostEvent`]s onto a
//! shared [`EventBus`]. The embedding host subscribes once and translates
//! events into whatever its accessory model needs.

mod event_bus;
mod host_event;

pub use event_bus::EventBus;
pub use host_event::HostEvent;
