// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Shared data model types.
//!
//! This module contains the types that describe a device independently of
//! how it is polled or reconciled: its immutable identity, its mutable
//! network endpoint, and the product-type classification used to decide
//! whether a discovered device is supported.

mod endpoint;
mod identity;
mod product_type;

pub use endpoint::DeviceEndpoint;
pub use identity::DeviceIdentity;
pub use product_type::ProductType;
