// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Bridge between an MQTT broker and Tuya smart-home devices.
//!
//! Clients publish command messages to structured topic paths; the bridge
//! translates topic segments and payloads into device commands, dispatches
//! them, and republishes device state changes back onto the bus.
//!
//! # Topics
//!
//! Inbound (subscribed as `<prefix>#`), two notations:
//!
//! - Current: `<prefix><id>/<key>/<address>/<action>[/<command>]`
//! - Legacy: `<prefix><type>/<id>/<key>/<address>/<action>[/<command>]`
//!   with `<type>` one of `socket`, `lightbulb`
//!
//! where `<action>` is `command` or `color`. Outbound:
//!
//! - `<base>/state`: `"ON"`/`"OFF"` of the primary switch
//! - `<base>/dps`: full device property set as JSON
//! - `<base>/dps/<key>`: one property value per topic
//!
//! # Quick Start
//!
//! ```ignore
//! use std::sync::Arc;
//! use tuya_bridge::{Bridge, BridgeConfig, transport::MqttTransport};
//!
//! #[tokio::main]
//! async fn main() -> tuya_bridge::Result<()> {
//!     let config = BridgeConfig::new("tuya", "192.168.1.50").validate()?;
//!
//!     let (transport, events) = MqttTransport::builder()
//!         .host(config.host.clone())
//!         .port(config.port)
//!         .build()?;
//!
//!     // `gateway` is your Tuya protocol client implementing `DeviceGateway`.
//!     let bridge = Bridge::new(config, Arc::new(transport), events, Arc::new(gateway));
//!     bridge.run().await;
//!     Ok(())
//! }
//! ```
//!
//! The device protocol itself is not implemented here; the bridge consumes
//! it through the [`device::DeviceGateway`] and [`device::DeviceHandle`]
//! traits.

mod bridge;
pub mod command;
mod config;
pub mod device;
pub mod error;
pub mod publisher;
pub mod supervisor;
pub mod topic;
pub mod transport;

pub use bridge::Bridge;
pub use command::{DeviceCommand, normalize};
pub use config::BridgeConfig;
pub use device::{DeviceAddress, DeviceEvent, DeviceGateway, DeviceHandle, DpsMap};
pub use error::{DeviceError, Error, ParseError, ProtocolError, Result};
pub use publisher::StatePublisher;
pub use supervisor::ConnectionSupervisor;
pub use topic::Action;
pub use transport::{MqttTransport, Publication, Transport, TransportEvent};
