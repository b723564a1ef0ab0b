// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Bridge coordinator.
//!
//! [`Bridge`] wires the pieces together: inbound transport messages run
//! through the topic grammar and the command normalizer and are dispatched
//! to the addressed device; state-change events from any live device run
//! through the state publisher. Everything is handled on one coordinator
//! loop; an error while handling a single message or event is caught at
//! that handler's boundary and logged, never allowed to stop the loop.
//!
//! # Examples
//!
//! ```no_run
//! use std::sync::Arc;
//! use tuya_bridge::{Bridge, BridgeConfig, transport::MqttTransport};
//! # use tuya_bridge::device::{DeviceAddress, DeviceEvent, DeviceGateway, DeviceHandle};
//! # use tuya_bridge::command::DeviceCommand;
//! # use tuya_bridge::error::DeviceError;
//! # #[derive(Clone)] struct Gateway;
//! # struct Handle;
//! # impl DeviceGateway for Gateway {
//! #     type Handle = Handle;
//! #     async fn open(&self, _: &DeviceAddress) -> Result<Handle, DeviceError> { Ok(Handle) }
//! #     fn subscribe(&self) -> tokio::sync::broadcast::Receiver<DeviceEvent> { unimplemented!() }
//! #     async fn disconnect_all(&self) {}
//! # }
//! # impl DeviceHandle for Handle {
//! #     async fn toggle(&self) -> Result<(), DeviceError> { Ok(()) }
//! #     async fn set(&self, _: &DeviceCommand) -> Result<(), DeviceError> { Ok(()) }
//! #     async fn set_color(&self, _: &str) -> Result<(), DeviceError> { Ok(()) }
//! # }
//!
//! # async fn example(gateway: Gateway) -> tuya_bridge::Result<()> {
//! let config = BridgeConfig::new("tuya", "192.168.1.50").validate()?;
//! let (transport, events) = MqttTransport::builder()
//!     .host(config.host.clone())
//!     .port(config.port)
//!     .build()?;
//!
//! let bridge = Bridge::new(config, Arc::new(transport), events, Arc::new(gateway));
//! bridge.run().await;
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;

use tokio::sync::{broadcast, mpsc};

use crate::command::{self, DeviceCommand};
use crate::config::BridgeConfig;
use crate::device::{DeviceEvent, DeviceGateway, DeviceHandle};
use crate::publisher::{PRIMARY_SWITCH_DPS, StatePublisher, dps_value_is_on};
use crate::supervisor::ConnectionSupervisor;
use crate::topic::{self, Action};
use crate::transport::{Transport, TransportEvent};

/// Coordinates the translation engine and the publication pipeline.
pub struct Bridge<T, D> {
    coordinator: Coordinator<T, D>,
    transport_events: mpsc::Receiver<TransportEvent>,
}

/// The event-handling half of the bridge, separated from the transport
/// event receiver so the coordinator loop can borrow both at once.
struct Coordinator<T, D> {
    config: BridgeConfig,
    transport: Arc<T>,
    devices: Arc<D>,
    supervisor: Arc<ConnectionSupervisor>,
    publisher: StatePublisher<T>,
}

impl<T: Transport, D: DeviceGateway> Bridge<T, D> {
    /// Creates a bridge over a transport and a device gateway.
    ///
    /// `transport_events` is the receiver handed out when the transport was
    /// built; the bridge consumes it until the transport closes it.
    #[must_use]
    pub fn new(
        config: BridgeConfig,
        transport: Arc<T>,
        transport_events: mpsc::Receiver<TransportEvent>,
        devices: Arc<D>,
    ) -> Self {
        let supervisor = ConnectionSupervisor::new();
        let publisher = StatePublisher::new(
            Arc::clone(&transport),
            Arc::clone(&supervisor),
            &config,
        );
        Self {
            coordinator: Coordinator {
                config,
                transport,
                devices,
                supervisor,
                publisher,
            },
            transport_events,
        }
    }

    /// Returns the connection supervisor owning the connectivity flag.
    #[must_use]
    pub fn supervisor(&self) -> Arc<ConnectionSupervisor> {
        Arc::clone(&self.coordinator.supervisor)
    }

    /// Runs the coordinator loop until the transport event channel closes,
    /// then tears down: devices are disconnected and the supervision tick
    /// is cancelled.
    pub async fn run(self) {
        let Self {
            coordinator,
            mut transport_events,
        } = self;

        Arc::clone(&coordinator.supervisor).start(Arc::clone(&coordinator.transport));
        let mut device_events = Some(coordinator.devices.subscribe());

        loop {
            tokio::select! {
                event = transport_events.recv() => {
                    let Some(event) = event else {
                        tracing::info!("transport event channel closed, shutting down");
                        break;
                    };
                    coordinator.handle_transport_event(event).await;
                }
                event = next_device_event(&mut device_events) => {
                    match event {
                        Ok(event) => coordinator.handle_device_event(event).await,
                        Err(broadcast::error::RecvError::Lagged(missed)) => {
                            tracing::warn!(missed = missed, "device event stream lagged");
                        }
                        Err(broadcast::error::RecvError::Closed) => {
                            tracing::warn!("device event stream closed");
                            device_events = None;
                        }
                    }
                }
            }
        }

        coordinator.devices.disconnect_all().await;
        coordinator.supervisor.shutdown();
    }
}

impl<T: Transport, D: DeviceGateway> Coordinator<T, D> {
    async fn handle_transport_event(&self, event: TransportEvent) {
        match event {
            TransportEvent::Connected => {
                self.supervisor.set_connected(true);
                let topic = self.config.subscription_topic();
                match self.transport.subscribe(&topic, self.config.qos).await {
                    Ok(()) => tracing::info!(topic = %topic, "subscribed to command topics"),
                    Err(e) => tracing::error!(topic = %topic, error = %e, "subscribe failed"),
                }
            }
            TransportEvent::Reconnecting => {
                if self.supervisor.is_connected() {
                    tracing::info!("broker connection interrupted, reconnecting");
                } else {
                    tracing::warn!("broker connection could not be established");
                }
            }
            TransportEvent::Error(error) => {
                self.supervisor.set_connected(false);
                tracing::warn!(error = %error, "transport error");
            }
            TransportEvent::Message { topic, payload } => {
                if let Err(e) = self.handle_message(&topic, &payload).await {
                    tracing::warn!(topic = %topic, error = %e, "failed to handle message");
                }
            }
        }
    }

    /// Handles one inbound command message.
    ///
    /// Parse errors, dispatch errors, and unknown actions all surface here
    /// and are logged by the caller; the next message is unaffected.
    async fn handle_message(&self, topic: &str, payload: &str) -> crate::Result<()> {
        let address = topic::parse_address(topic)?;
        let action = topic::parse_action(topic)?;
        tracing::debug!(
            topic = %topic,
            action = %action,
            device = %address.id,
            payload = %payload,
            "received message"
        );

        match action {
            Action::Command => {
                let token = topic::parse_raw_command(topic, payload)?;
                let command = command::normalize(token);
                tracing::debug!(command = %command, "dispatching command");

                let handle = self.devices.open(&address).await?;
                match &command {
                    DeviceCommand::Toggle => handle.toggle().await?,
                    other => handle.set(other).await?,
                }
                tracing::debug!(device = %address.id, "set device status completed");
            }
            Action::Color => {
                let color = payload.to_lowercase();
                tracing::debug!(color = %color, "setting device color");

                let handle = self.devices.open(&address).await?;
                handle.set_color(&color).await?;
                tracing::debug!(device = %address.id, "set device color completed");
            }
        }

        Ok(())
    }

    /// Handles one state-change event from any live device.
    async fn handle_device_event(&self, event: DeviceEvent) {
        tracing::debug!(device = %event.address.id, dps = ?event.dps, "data from device");

        if let Some(value) = event.dps.get(PRIMARY_SWITCH_DPS) {
            self.publisher
                .publish_status(&event.address, dps_value_is_on(value))
                .await;
        }

        self.publisher.publish_dps(&event.address, &event.dps).await;
    }
}

/// Receives the next device event, or stays pending forever once the
/// stream is gone so the select loop keeps serving transport events.
async fn next_device_event(
    events: &mut Option<broadcast::Receiver<DeviceEvent>>,
) -> Result<DeviceEvent, broadcast::error::RecvError> {
    match events {
        Some(receiver) => receiver.recv().await,
        None => std::future::pending().await,
    }
}
