// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Device collaborator contract.
//!
//! The bridge does not speak the Tuya wire protocol itself. It consumes a
//! device client through the traits in this module: [`DeviceGateway`] opens
//! per-device handles and fans in state-change events from every live
//! device, [`DeviceHandle`] executes commands against one device.
//!
//! Events are delivered over a single `tokio::sync::broadcast` channel the
//! coordinator subscribes to once, tagged with the emitting device's
//! address. There is no per-device callback registration.

use serde_json::Value;
use tokio::sync::broadcast;

use crate::command::DeviceCommand;
use crate::error::DeviceError;

/// The device property-set map: protocol-defined index → JSON value.
///
/// Backed by `serde_json::Map`, which iterates in sorted key order, so
/// fan-out publication order is deterministic.
pub type DpsMap = serde_json::Map<String, Value>;

/// Identity of one device: id, local key, and network address, plus the
/// device type when the legacy topic notation carried one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceAddress {
    /// Tuya device id.
    pub id: String,
    /// Tuya local key.
    pub key: String,
    /// Device network address.
    pub address: String,
    /// Device type, legacy notation only.
    pub device_type: Option<String>,
}

impl DeviceAddress {
    /// Creates an address without a device type.
    #[must_use]
    pub fn new(
        id: impl Into<String>,
        key: impl Into<String>,
        address: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            key: key.into(),
            address: address.into(),
            device_type: None,
        }
    }

    /// Sets the legacy device type.
    #[must_use]
    pub fn with_device_type(mut self, device_type: impl Into<String>) -> Self {
        self.device_type = Some(device_type.into());
        self
    }

    /// Returns `true` if id, key, and network address are all present.
    ///
    /// Publication is skipped entirely for incomplete addresses; it never
    /// partially succeeds with missing addressing fields.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        !self.id.is_empty() && !self.key.is_empty() && !self.address.is_empty()
    }
}

/// A state-change event emitted by a device.
#[derive(Debug, Clone)]
pub struct DeviceEvent {
    /// The emitting device.
    pub address: DeviceAddress,
    /// Snapshot of the changed property set.
    pub dps: DpsMap,
}

/// Factory and event source for device handles.
///
/// Implementations own the actual protocol clients. The bridge opens a
/// handle per inbound message and registers exactly one global event
/// subscription for all devices.
pub trait DeviceGateway: Send + Sync + 'static {
    /// The per-device handle type.
    type Handle: DeviceHandle;

    /// Opens (or reuses) a handle for the addressed device.
    ///
    /// # Errors
    ///
    /// Returns [`DeviceError`] if the device cannot be reached.
    fn open(
        &self,
        address: &DeviceAddress,
    ) -> impl Future<Output = Result<Self::Handle, DeviceError>> + Send;

    /// Subscribes to state-change events from all live devices.
    fn subscribe(&self) -> broadcast::Receiver<DeviceEvent>;

    /// Disconnects every live device. Called once on bridge teardown.
    fn disconnect_all(&self) -> impl Future<Output = ()> + Send;
}

/// Command execution against a single device.
pub trait DeviceHandle: Send + Sync {
    /// Flips the device's primary switch.
    ///
    /// # Errors
    ///
    /// Returns [`DeviceError`] if the device rejects or times out.
    fn toggle(&self) -> impl Future<Output = Result<(), DeviceError>> + Send;

    /// Applies a set-state or raw command.
    ///
    /// # Errors
    ///
    /// Returns [`DeviceError`] if the device rejects or times out.
    fn set(&self, command: &DeviceCommand) -> impl Future<Output = Result<(), DeviceError>> + Send;

    /// Sets the device color from a lower-cased color string.
    ///
    /// # Errors
    ///
    /// Returns [`DeviceError`] if the device rejects or times out.
    fn set_color(&self, color: &str) -> impl Future<Output = Result<(), DeviceError>> + Send;
}
