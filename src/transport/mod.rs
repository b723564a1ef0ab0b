// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Pub/sub transport contract.
//!
//! The bridge core is written against the [`Transport`] trait; the MQTT
//! implementation in [`mqtt`] adapts it to a rumqttc broker connection.
//! Transport events (connect, reconnect, error, inbound message) reach the
//! coordinator over a `tokio::sync::mpsc` channel handed out when the
//! transport is built.

mod mqtt;

pub use mqtt::{MqttTransport, MqttTransportBuilder};

use crate::error::ProtocolError;

/// One outbound publish: constructed per call, never stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Publication {
    /// Destination topic.
    pub topic: String,
    /// Serialized payload.
    pub payload: String,
    /// QoS level (0-2).
    pub qos: u8,
    /// Retain flag.
    pub retain: bool,
}

/// Events raised by the transport, delivered to the coordinator loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// The broker connection is established (initial connect or reconnect).
    Connected,
    /// The transport is attempting to re-establish a lost connection.
    Reconnecting,
    /// The connection failed or was lost.
    Error(String),
    /// An inbound message on a subscribed topic.
    Message {
        /// Full topic path.
        topic: String,
        /// Message payload decoded as UTF-8.
        payload: String,
    },
}

/// A pub/sub transport the bridge publishes through.
///
/// Implementations are expected to provide at-least-once delivery per the
/// requested QoS and to handle reconnection themselves; the bridge only
/// observes connectivity, it never drives retries.
pub trait Transport: Send + Sync + 'static {
    /// Returns the live connectivity of the underlying connection.
    ///
    /// Readable at any time; the connection supervisor polls this to
    /// reconcile its cached flag.
    fn is_connected(&self) -> bool;

    /// Subscribes to a topic pattern.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError`] if the subscribe request cannot be queued.
    fn subscribe(
        &self,
        topic: &str,
        qos: u8,
    ) -> impl Future<Output = Result<(), ProtocolError>> + Send;

    /// Publishes one message.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError`] if the publish request cannot be queued.
    fn publish(
        &self,
        publication: Publication,
    ) -> impl Future<Output = Result<(), ProtocolError>> + Send;
}

/// Maps a numeric QoS level onto the rumqttc enum.
///
/// Levels above 2 are rejected by [`crate::BridgeConfig::validate`];
/// out-of-range values map to `ExactlyOnce` here.
#[must_use]
pub(crate) fn to_mqtt_qos(qos: u8) -> rumqttc::QoS {
    match qos {
        0 => rumqttc::QoS::AtMostOnce,
        1 => rumqttc::QoS::AtLeastOnce,
        _ => rumqttc::QoS::ExactlyOnce,
    }
}
