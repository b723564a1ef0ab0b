// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Outbound state publication.
//!
//! [`StatePublisher`] maps a device identity plus an emitted property map
//! onto a deterministic set of outbound publishes:
//!
//! - `<base>/state`: `"ON"`/`"OFF"`, derived from DPS key `"1"`
//! - `<base>/dps`: the whole property map as one JSON object
//! - `<base>/dps/<key>`: each property value JSON-encoded alone
//!
//! where `<base>` is `<prefix>[<type>/]<id>/<key>/<address>`. Publication
//! is skipped entirely (with a diagnostic) while the supervisor's
//! connectivity flag is down or when any addressing field is missing; it
//! never partially succeeds. A failed individual publish is logged and the
//! remaining publishes continue; there is no retry queue.

use std::sync::Arc;

use serde_json::Value;

use crate::config::BridgeConfig;
use crate::device::{DeviceAddress, DpsMap};
use crate::supervisor::ConnectionSupervisor;
use crate::transport::{Publication, Transport};

/// The well-known DPS index of the primary switch.
pub const PRIMARY_SWITCH_DPS: &str = "1";

/// Maps a boolean switch state onto its wire payload.
#[must_use]
pub fn state_payload(on: bool) -> &'static str {
    if on { "ON" } else { "OFF" }
}

/// Publishes device state changes back onto the bus.
#[derive(Debug)]
pub struct StatePublisher<T> {
    transport: Arc<T>,
    supervisor: Arc<ConnectionSupervisor>,
    prefix: String,
    qos: u8,
    retain: bool,
}

impl<T: Transport> StatePublisher<T> {
    /// Creates a publisher bound to a transport and supervisor.
    #[must_use]
    pub fn new(
        transport: Arc<T>,
        supervisor: Arc<ConnectionSupervisor>,
        config: &BridgeConfig,
    ) -> Self {
        Self {
            transport,
            supervisor,
            prefix: config.prefix.clone(),
            qos: config.qos,
            retain: config.retain,
        }
    }

    /// Publishes the primary switch state to `<base>/state`.
    ///
    /// No-op while disconnected or for incomplete addresses.
    pub async fn publish_status(&self, device: &DeviceAddress, on: bool) {
        let Some(base) = self.base_topic(device) else {
            return;
        };

        let topic = format!("{base}/state");
        let payload = state_payload(on);
        tracing::debug!(topic = %topic, payload = %payload, "publishing device status");
        self.send(topic, payload.to_string()).await;
    }

    /// Publishes the full property map to `<base>/dps`, then one publish
    /// per key to `<base>/dps/<key>`, in the map's iteration order.
    ///
    /// No-op while disconnected or for incomplete addresses.
    pub async fn publish_dps(&self, device: &DeviceAddress, dps: &DpsMap) {
        let Some(base) = self.base_topic(device) else {
            return;
        };

        let topic = format!("{base}/dps");
        let payload = Value::Object(dps.clone()).to_string();
        tracing::debug!(topic = %topic, payload = %payload, "publishing device dps");
        self.send(topic, payload).await;

        for (key, value) in dps {
            let topic = format!("{base}/dps/{key}");
            let payload = value.to_string();
            tracing::debug!(topic = %topic, payload = %payload, "publishing device dps value");
            self.send(topic, payload).await;
        }
    }

    /// Builds the base topic for a device, or `None` (with a diagnostic)
    /// when publication must be skipped.
    fn base_topic(&self, device: &DeviceAddress) -> Option<String> {
        if !self.supervisor.is_connected() {
            tracing::debug!(device = %device.id, "skipping publish, broker not connected");
            return None;
        }
        if !device.is_complete() {
            tracing::debug!(
                device = %device.id,
                "skipping publish, device address incomplete"
            );
            return None;
        }

        let mut base = self.prefix.clone();
        if let Some(device_type) = &device.device_type {
            base.push_str(device_type);
            base.push('/');
        }
        base.push_str(&device.id);
        base.push('/');
        base.push_str(&device.key);
        base.push('/');
        base.push_str(&device.address);
        Some(base)
    }

    async fn send(&self, topic: String, payload: String) {
        let publication = Publication {
            topic,
            payload,
            qos: self.qos,
            retain: self.retain,
        };
        if let Err(e) = self.transport.publish(publication).await {
            tracing::warn!(error = %e, "publish failed");
        }
    }
}

/// Returns the on/off interpretation of a DPS value.
///
/// Mirrors the device protocol's loose typing: booleans as-is, nonzero
/// numbers and nonempty strings count as on.
#[must_use]
pub fn dps_value_is_on(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|n| n != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Null => false,
        Value::Array(_) | Value::Object(_) => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use serde_json::json;

    use crate::error::ProtocolError;

    /// Transport stub recording every publication.
    #[derive(Default)]
    struct RecordingTransport {
        published: Mutex<Vec<Publication>>,
    }

    impl Transport for RecordingTransport {
        fn is_connected(&self) -> bool {
            true
        }

        async fn subscribe(&self, _topic: &str, _qos: u8) -> Result<(), ProtocolError> {
            Ok(())
        }

        async fn publish(&self, publication: Publication) -> Result<(), ProtocolError> {
            self.published.lock().push(publication);
            Ok(())
        }
    }

    fn publisher(
        connected: bool,
    ) -> (StatePublisher<RecordingTransport>, Arc<RecordingTransport>) {
        let transport = Arc::new(RecordingTransport::default());
        let supervisor = ConnectionSupervisor::new();
        supervisor.set_connected(connected);
        let config = BridgeConfig::new("tuya", "broker.local");
        let publisher = StatePublisher::new(Arc::clone(&transport), supervisor, &config);
        (publisher, transport)
    }

    fn device() -> DeviceAddress {
        DeviceAddress::new("device123", "secretkey", "10.0.0.4")
    }

    #[tokio::test]
    async fn status_publish() {
        let (publisher, transport) = publisher(true);

        publisher.publish_status(&device(), true).await;

        let published = transport.published.lock();
        assert_eq!(published.len(), 1);
        assert_eq!(published[0].topic, "tuya/device123/secretkey/10.0.0.4/state");
        assert_eq!(published[0].payload, "ON");
        assert_eq!(published[0].qos, 2);
        assert!(!published[0].retain);
    }

    #[tokio::test]
    async fn status_publish_off() {
        let (publisher, transport) = publisher(true);

        publisher.publish_status(&device(), false).await;

        assert_eq!(transport.published.lock()[0].payload, "OFF");
    }

    #[tokio::test]
    async fn legacy_device_type_in_base_topic() {
        let (publisher, transport) = publisher(true);
        let device = device().with_device_type("socket");

        publisher.publish_status(&device, true).await;

        assert_eq!(
            transport.published.lock()[0].topic,
            "tuya/socket/device123/secretkey/10.0.0.4/state"
        );
    }

    #[tokio::test]
    async fn dps_publish_order_is_deterministic() {
        let (publisher, transport) = publisher(true);
        let mut dps = DpsMap::new();
        dps.insert("20".to_string(), json!(5));
        dps.insert("1".to_string(), json!(true));

        publisher.publish_dps(&device(), &dps).await;

        let published = transport.published.lock();
        assert_eq!(published.len(), 3);
        assert_eq!(published[0].topic, "tuya/device123/secretkey/10.0.0.4/dps");
        assert_eq!(published[0].payload, r#"{"1":true,"20":5}"#);
        assert_eq!(
            published[1].topic,
            "tuya/device123/secretkey/10.0.0.4/dps/1"
        );
        assert_eq!(published[1].payload, "true");
        assert_eq!(
            published[2].topic,
            "tuya/device123/secretkey/10.0.0.4/dps/20"
        );
        assert_eq!(published[2].payload, "5");
    }

    #[tokio::test]
    async fn nothing_published_while_disconnected() {
        let (publisher, transport) = publisher(false);
        let mut dps = DpsMap::new();
        dps.insert("1".to_string(), json!(true));

        publisher.publish_status(&device(), true).await;
        publisher.publish_dps(&device(), &dps).await;

        assert!(transport.published.lock().is_empty());
    }

    #[tokio::test]
    async fn nothing_published_for_incomplete_address() {
        let (publisher, transport) = publisher(true);
        let incomplete = DeviceAddress::new("device123", "", "10.0.0.4");
        let mut dps = DpsMap::new();
        dps.insert("1".to_string(), json!(true));

        publisher.publish_status(&incomplete, true).await;
        publisher.publish_dps(&incomplete, &dps).await;

        assert!(transport.published.lock().is_empty());
    }

    #[test]
    fn state_payload_mapping() {
        assert_eq!(state_payload(true), "ON");
        assert_eq!(state_payload(false), "OFF");
    }

    #[test]
    fn dps_value_truthiness() {
        assert!(dps_value_is_on(&json!(true)));
        assert!(!dps_value_is_on(&json!(false)));
        assert!(dps_value_is_on(&json!(1)));
        assert!(!dps_value_is_on(&json!(0)));
        assert!(dps_value_is_on(&json!("on")));
        assert!(!dps_value_is_on(&json!("")));
        assert!(!dps_value_is_on(&json!(null)));
    }
}
