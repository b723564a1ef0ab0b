// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Bridge configuration.
//!
//! [`BridgeConfig`] carries the values the coordinator and the publishers
//! consume: the topic prefix, the QoS level and retain flag applied to every
//! subscription and publish, and the broker connection parameters. Loading
//! the configuration from disk or environment is left to the embedding
//! process; this module only defines the shape and validates it.

use serde::Deserialize;

/// Configuration for the bridge.
///
/// # Examples
///
/// ```
/// use tuya_bridge::BridgeConfig;
///
/// let config = BridgeConfig::new("tuya", "192.168.1.50");
/// assert_eq!(config.prefix, "tuya/");
/// assert_eq!(config.qos, 2);
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct BridgeConfig {
    /// Topic prefix for both the inbound wildcard subscription and all
    /// outbound topics. Normalized to end with `/`.
    pub prefix: String,

    /// MQTT broker host.
    pub host: String,

    /// MQTT broker port.
    #[serde(default = "default_port")]
    pub port: u16,

    /// QoS level (0-2) applied to every subscribe and publish.
    #[serde(default = "default_qos")]
    pub qos: u8,

    /// Retain flag applied to every publish.
    #[serde(default)]
    pub retain: bool,

    /// MQTT broker username, empty for anonymous access.
    #[serde(default)]
    pub username: String,

    /// MQTT broker password.
    #[serde(default)]
    pub password: String,
}

fn default_port() -> u16 {
    1883
}

fn default_qos() -> u8 {
    2
}

impl BridgeConfig {
    /// Creates a configuration with default QoS 2, retain off, and anonymous
    /// broker access.
    #[must_use]
    pub fn new(prefix: impl Into<String>, host: impl Into<String>) -> Self {
        Self {
            prefix: normalize_prefix(prefix.into()),
            host: host.into(),
            port: default_port(),
            qos: default_qos(),
            retain: false,
            username: String::new(),
            password: String::new(),
        }
    }

    /// Validates the configuration and normalizes the topic prefix.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Config`] if the prefix or host is empty, or
    /// if the QoS level is outside 0-2.
    pub fn validate(mut self) -> crate::Result<Self> {
        if self.prefix.is_empty() {
            return Err(crate::Error::Config("topic prefix is required".to_string()));
        }
        if self.host.is_empty() {
            return Err(crate::Error::Config("broker host is required".to_string()));
        }
        if self.qos > 2 {
            return Err(crate::Error::Config(format!(
                "QoS level {} is out of range [0, 2]",
                self.qos
            )));
        }
        self.prefix = normalize_prefix(self.prefix);
        Ok(self)
    }

    /// Returns the wildcard topic the bridge subscribes to.
    #[must_use]
    pub fn subscription_topic(&self) -> String {
        format!("{}#", self.prefix)
    }

    /// Returns the broker credentials, if configured.
    #[must_use]
    pub fn credentials(&self) -> Option<(&str, &str)> {
        if self.username.is_empty() {
            None
        } else {
            Some((self.username.as_str(), self.password.as_str()))
        }
    }
}

/// Ensures the prefix ends with a single `/` so topic concatenation stays
/// purely positional.
fn normalize_prefix(mut prefix: String) -> String {
    if !prefix.is_empty() && !prefix.ends_with('/') {
        prefix.push('/');
    }
    prefix
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_applies_defaults() {
        let config = BridgeConfig::new("tuya", "broker.local");
        assert_eq!(config.port, 1883);
        assert_eq!(config.qos, 2);
        assert!(!config.retain);
        assert!(config.credentials().is_none());
    }

    #[test]
    fn prefix_is_normalized() {
        let config = BridgeConfig::new("tuya", "broker.local");
        assert_eq!(config.prefix, "tuya/");
        assert_eq!(config.subscription_topic(), "tuya/#");

        let config = BridgeConfig::new("tuya/", "broker.local");
        assert_eq!(config.prefix, "tuya/");
    }

    #[test]
    fn validate_rejects_out_of_range_qos() {
        let mut config = BridgeConfig::new("tuya", "broker.local");
        config.qos = 3;
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_empty_host() {
        let config = BridgeConfig::new("tuya", "");
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_normalizes_deserialized_prefix() {
        let config: BridgeConfig =
            serde_json::from_str(r#"{"prefix": "tuya", "host": "broker.local"}"#).unwrap();
        let config = config.validate().unwrap();
        assert_eq!(config.prefix, "tuya/");
        assert_eq!(config.qos, 2);
    }

    #[test]
    fn credentials_present_when_username_set() {
        let mut config = BridgeConfig::new("tuya", "broker.local");
        config.username = "user".to_string();
        config.password = "pass".to_string();
        assert_eq!(config.credentials(), Some(("user", "pass")));
    }
}
