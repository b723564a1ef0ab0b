// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! MQTT transport backed by rumqttc.
//!
//! [`MqttTransport`] wraps a rumqttc [`AsyncClient`] plus a background task
//! polling its event loop. Connection state is tracked in an atomic flag and
//! every relevant broker event is forwarded to the coordinator as a
//! [`TransportEvent`]. The event loop keeps polling after errors, which is
//! what makes rumqttc re-establish the connection on its own.
//!
//! # Examples
//!
//! ```no_run
//! use tuya_bridge::transport::MqttTransport;
//!
//! # async fn example() -> tuya_bridge::Result<()> {
//! let (transport, events) = MqttTransport::builder()
//!     .host("192.168.1.50")
//!     .port(1883)
//!     .credentials("user", "password")
//!     .build()?;
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use rumqttc::{AsyncClient, EventLoop, MqttOptions};
use tokio::sync::mpsc;

use crate::error::ProtocolError;

use super::{Publication, Transport, TransportEvent, to_mqtt_qos};

/// Global counter for generating unique client IDs.
static CLIENT_ID_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Capacity of the transport event channel to the coordinator.
const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Delay before the event loop polls again after an error.
const RECONNECT_DELAY: Duration = Duration::from_secs(1);

/// An MQTT broker connection usable as the bridge transport.
///
/// Cheaply cloneable via `Arc`; the event receiver returned by
/// [`MqttTransportBuilder::build`] is handed to the bridge coordinator.
#[derive(Clone)]
pub struct MqttTransport {
    inner: Arc<MqttTransportInner>,
}

struct MqttTransportInner {
    client: AsyncClient,
    connected: AtomicBool,
    host: String,
    port: u16,
}

impl MqttTransport {
    /// Creates a new builder for configuring the broker connection.
    #[must_use]
    pub fn builder() -> MqttTransportBuilder {
        MqttTransportBuilder::default()
    }

    /// Returns the broker host.
    #[must_use]
    pub fn host(&self) -> &str {
        &self.inner.host
    }

    /// Returns the broker port.
    #[must_use]
    pub fn port(&self) -> u16 {
        self.inner.port
    }

    /// Disconnects from the broker.
    ///
    /// # Errors
    ///
    /// Returns error if the disconnect request cannot be queued.
    pub async fn disconnect(&self) -> Result<(), ProtocolError> {
        tracing::info!(
            host = %self.inner.host,
            port = %self.inner.port,
            "disconnecting from MQTT broker"
        );
        self.inner.connected.store(false, Ordering::Release);
        self.inner
            .client
            .disconnect()
            .await
            .map_err(ProtocolError::Mqtt)
    }
}

impl Transport for MqttTransport {
    fn is_connected(&self) -> bool {
        self.inner.connected.load(Ordering::Acquire)
    }

    async fn subscribe(&self, topic: &str, qos: u8) -> Result<(), ProtocolError> {
        tracing::debug!(topic = %topic, qos = qos, "subscribing");
        self.inner
            .client
            .subscribe(topic, to_mqtt_qos(qos))
            .await
            .map_err(ProtocolError::Mqtt)
    }

    async fn publish(&self, publication: Publication) -> Result<(), ProtocolError> {
        tracing::debug!(
            topic = %publication.topic,
            payload = %publication.payload,
            "publishing"
        );
        self.inner
            .client
            .publish(
                &publication.topic,
                to_mqtt_qos(publication.qos),
                publication.retain,
                publication.payload,
            )
            .await
            .map_err(ProtocolError::Mqtt)
    }
}

impl std::fmt::Debug for MqttTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MqttTransport")
            .field("host", &self.inner.host)
            .field("port", &self.inner.port)
            .field("connected", &self.is_connected())
            .finish()
    }
}

/// Builder for an MQTT transport.
#[derive(Debug, Default)]
pub struct MqttTransportBuilder {
    host: String,
    port: Option<u16>,
    credentials: Option<(String, String)>,
    keep_alive: Option<Duration>,
}

impl MqttTransportBuilder {
    /// Sets the broker host address.
    #[must_use]
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    /// Sets the broker port (default: 1883).
    #[must_use]
    pub fn port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    /// Sets authentication credentials.
    #[must_use]
    pub fn credentials(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.credentials = Some((username.into(), password.into()));
        self
    }

    /// Sets the keep-alive interval (default: 30 seconds).
    #[must_use]
    pub fn keep_alive(mut self, duration: Duration) -> Self {
        self.keep_alive = Some(duration);
        self
    }

    /// Builds the transport and spawns its event loop task.
    ///
    /// Returns the transport together with the receiver the coordinator
    /// consumes transport events from. The connection is established in the
    /// background; the first [`TransportEvent::Connected`] signals it.
    ///
    /// # Errors
    ///
    /// Returns error if the host is missing.
    pub fn build(
        self,
    ) -> Result<(MqttTransport, mpsc::Receiver<TransportEvent>), ProtocolError> {
        if self.host.is_empty() {
            return Err(ProtocolError::InvalidAddress(
                "MQTT broker host is required".to_string(),
            ));
        }

        let counter = CLIENT_ID_COUNTER.fetch_add(1, Ordering::Relaxed);
        let client_id = format!("tuya_bridge_{}_{}", std::process::id(), counter);
        let port = self.port.unwrap_or(1883);

        let mut mqtt_options = MqttOptions::new(&client_id, &self.host, port);
        mqtt_options.set_keep_alive(self.keep_alive.unwrap_or(Duration::from_secs(30)));
        mqtt_options.set_clean_session(true);
        if let Some((ref username, ref password)) = self.credentials {
            mqtt_options.set_credentials(username, password);
        }

        let (client, event_loop) = AsyncClient::new(mqtt_options, 10);
        let (event_tx, event_rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);

        let transport = MqttTransport {
            inner: Arc::new(MqttTransportInner {
                client,
                connected: AtomicBool::new(false),
                host: self.host,
                port,
            }),
        };

        let transport_clone = transport.clone();
        tokio::spawn(async move {
            run_event_loop(event_loop, transport_clone, event_tx).await;
        });

        Ok((transport, event_rx))
    }
}

/// Polls the rumqttc event loop and forwards events to the coordinator.
///
/// Runs until the coordinator drops its receiver.
async fn run_event_loop(
    mut event_loop: EventLoop,
    transport: MqttTransport,
    event_tx: mpsc::Sender<TransportEvent>,
) {
    use rumqttc::{Event, Packet};

    let mut was_connected = false;

    loop {
        match event_loop.poll().await {
            Ok(Event::Incoming(Packet::ConnAck(connack))) => {
                tracing::debug!(?connack, "MQTT broker connected");
                transport.inner.connected.store(true, Ordering::Release);
                was_connected = true;
                if event_tx.send(TransportEvent::Connected).await.is_err() {
                    break;
                }
            }
            Ok(Event::Incoming(Packet::Publish(publish))) => {
                let Ok(payload) = String::from_utf8(publish.payload.to_vec()) else {
                    tracing::warn!(topic = %publish.topic, "dropping non-UTF-8 payload");
                    continue;
                };
                let message = TransportEvent::Message {
                    topic: publish.topic,
                    payload,
                };
                if event_tx.send(message).await.is_err() {
                    break;
                }
            }
            Ok(Event::Incoming(Packet::Disconnect)) => {
                tracing::info!("MQTT broker disconnected");
                transport.inner.connected.store(false, Ordering::Release);
            }
            Ok(_) => {}
            Err(e) => {
                transport.inner.connected.store(false, Ordering::Release);
                let event = if was_connected {
                    tracing::warn!(error = %e, "MQTT connection lost, reconnecting");
                    TransportEvent::Reconnecting
                } else {
                    tracing::warn!(error = %e, "MQTT connection failed");
                    TransportEvent::Error(e.to_string())
                };
                if event_tx.send(event).await.is_err() {
                    break;
                }
                // Keep polling: rumqttc reconnects as long as the loop runs.
                tokio::time::sleep(RECONNECT_DELAY).await;
            }
        }
    }

    tracing::debug!("MQTT event loop stopped");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn builder_missing_host_fails() {
        let result = MqttTransportBuilder::default().build();
        assert!(matches!(result, Err(ProtocolError::InvalidAddress(_))));
    }

    #[tokio::test]
    async fn builder_defaults() {
        let (transport, _events) = MqttTransport::builder()
            .host("127.0.0.1")
            .build()
            .unwrap();
        assert_eq!(transport.host(), "127.0.0.1");
        assert_eq!(transport.port(), 1883);
        assert!(!transport.is_connected());
    }

    #[tokio::test]
    async fn builder_with_port_and_credentials() {
        let (transport, _events) = MqttTransport::builder()
            .host("broker.local")
            .port(8883)
            .credentials("user", "pass")
            .keep_alive(Duration::from_secs(60))
            .build()
            .unwrap();
        assert_eq!(transport.port(), 8883);
    }
}
