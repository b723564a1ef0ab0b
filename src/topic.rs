// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Topic grammar for inbound command topics.
//!
//! The bridge subscribes to `<prefix>#` and derives device addressing and
//! the requested action purely from topic path positions. Two notations are
//! supported:
//!
//! - **Legacy**: `<prefix>/<type>/<id>/<key>/<address>/<action>[/<command>]`
//!   where `<type>` is `socket` or `lightbulb`.
//! - **Current**: `<prefix>/<id>/<key>/<address>/<action>[/<command>]`.
//!
//! The notation is decided by inspecting segment 1 alone: if it equals
//! `socket` or `lightbulb`, the topic is treated as legacy. A current-
//! notation device whose id is literally `socket` or `lightbulb` is
//! therefore misparsed as legacy. This ambiguity is deliberate; downstream
//! consumers depend on the existing behavior, so it must not be "fixed"
//! here.

use crate::device::DeviceAddress;
use crate::error::ParseError;

/// Device type names that select the legacy notation.
const LEGACY_TYPES: [&str; 2] = ["socket", "lightbulb"];

/// The verb segment of a topic, selecting the bridge behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Dispatch a normalized command to the device.
    Command,
    /// Pass the lower-cased payload to the device as a color string.
    Color,
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Command => write!(f, "command"),
            Self::Color => write!(f, "color"),
        }
    }
}

/// Fixed segment positions for one notation.
struct Layout {
    id: usize,
    key: usize,
    address: usize,
    action: usize,
    command: usize,
    device_type: Option<usize>,
}

/// Legacy layout: `<prefix>/<type>/<id>/<key>/<address>/<action>[/<command>]`.
const LEGACY: Layout = Layout {
    id: 2,
    key: 3,
    address: 4,
    action: 5,
    command: 6,
    device_type: Some(1),
};

/// Current layout: `<prefix>/<id>/<key>/<address>/<action>[/<command>]`.
const CURRENT: Layout = Layout {
    id: 1,
    key: 2,
    address: 3,
    action: 4,
    command: 5,
    device_type: None,
};

/// Returns `true` if segment 1 names a legacy device type.
fn is_legacy_notation(segments: &[&str]) -> bool {
    segments
        .get(1)
        .is_some_and(|s| LEGACY_TYPES.contains(s))
}

fn split(topic: &str) -> Vec<&str> {
    topic.split('/').collect()
}

fn layout(segments: &[&str]) -> &'static Layout {
    if is_legacy_notation(segments) {
        &LEGACY
    } else {
        &CURRENT
    }
}

fn segment<'a>(
    segments: &[&'a str],
    index: usize,
    name: &'static str,
    required: usize,
) -> Result<&'a str, ParseError> {
    let value = *segments.get(index).ok_or(ParseError::TooShort {
        expected: required,
        actual: segments.len(),
    })?;
    if value.is_empty() {
        return Err(ParseError::EmptySegment(name));
    }
    Ok(value)
}

/// Parses the device addressing fields from a topic path.
///
/// # Errors
///
/// Returns [`ParseError`] if the path is shorter than the detected notation
/// requires or any addressing segment is empty. There is no partial result.
///
/// # Examples
///
/// ```
/// use tuya_bridge::topic::parse_address;
///
/// let address = parse_address("tuya/042.../51b.../192.168.1.7/command").unwrap();
/// assert_eq!(address.address, "192.168.1.7");
/// assert!(address.device_type.is_none());
///
/// let address = parse_address("tuya/socket/042.../51b.../192.168.1.7/command").unwrap();
/// assert_eq!(address.device_type.as_deref(), Some("socket"));
/// ```
pub fn parse_address(topic: &str) -> Result<DeviceAddress, ParseError> {
    let segments = split(topic);
    let layout = layout(&segments);
    // The action position must exist even though it is not part of the
    // address, otherwise a truncated path would yield addressing fields
    // taken from the wrong positions.
    let required = layout.action + 1;

    let id = segment(&segments, layout.id, "id", required)?;
    let key = segment(&segments, layout.key, "key", required)?;
    let address = segment(&segments, layout.address, "address", required)?;
    segment(&segments, layout.action, "action", required)?;

    let device_type = match layout.device_type {
        Some(index) => Some(segments[index].to_string()),
        None => None,
    };

    Ok(DeviceAddress {
        id: id.to_string(),
        key: key.to_string(),
        address: address.to_string(),
        device_type,
    })
}

/// Parses the action verb from a topic path.
///
/// # Errors
///
/// Returns [`ParseError::TooShort`] if the action position is missing and
/// [`ParseError::UnknownAction`] if the segment is neither `command` nor
/// `color`.
pub fn parse_action(topic: &str) -> Result<Action, ParseError> {
    let segments = split(topic);
    let layout = layout(&segments);
    let action = segment(&segments, layout.action, "action", layout.action + 1)?;

    match action {
        "command" => Ok(Action::Command),
        "color" => Ok(Action::Color),
        other => Err(ParseError::UnknownAction(other.to_string())),
    }
}

/// Extracts the raw command token for the `command` action.
///
/// The token is the message payload when one is present, falling back to
/// the optional trailing topic segment.
///
/// # Errors
///
/// Returns [`ParseError::MissingCommand`] if neither source carries a token.
pub fn parse_raw_command<'a>(topic: &'a str, payload: &'a str) -> Result<&'a str, ParseError> {
    if !payload.is_empty() {
        return Ok(payload);
    }

    let segments = split(topic);
    let layout = layout(&segments);
    match segments.get(layout.command) {
        Some(token) if !token.is_empty() => Ok(token),
        _ => Err(ParseError::MissingCommand),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn current_notation_address() {
        let address = parse_address("tuya/device123/secretkey/10.0.0.4/command").unwrap();
        assert_eq!(
            address,
            DeviceAddress::new("device123", "secretkey", "10.0.0.4")
        );
    }

    #[test]
    fn legacy_notation_address() {
        let address =
            parse_address("tuya/socket/device123/secretkey/10.0.0.4/command/on").unwrap();
        assert_eq!(address.id, "device123");
        assert_eq!(address.key, "secretkey");
        assert_eq!(address.address, "10.0.0.4");
        assert_eq!(address.device_type.as_deref(), Some("socket"));
    }

    #[test]
    fn legacy_notation_lightbulb() {
        let address =
            parse_address("tuya/lightbulb/device123/secretkey/10.0.0.4/color").unwrap();
        assert_eq!(address.device_type.as_deref(), Some("lightbulb"));
    }

    #[test]
    fn ambiguous_id_parses_as_legacy() {
        // Documented ambiguity: a current-notation device id equal to a
        // legacy type name selects the legacy layout.
        let result = parse_address("tuya/socket/key/10.0.0.4/command");
        assert!(matches!(result, Err(ParseError::TooShort { .. })));
    }

    #[test]
    fn short_topic_fails() {
        let result = parse_address("tuya/device123/secretkey");
        assert_eq!(
            result,
            Err(ParseError::TooShort {
                expected: 5,
                actual: 3,
            })
        );
    }

    #[test]
    fn short_legacy_topic_fails() {
        let result = parse_address("tuya/socket/device123/secretkey/10.0.0.4");
        assert_eq!(
            result,
            Err(ParseError::TooShort {
                expected: 6,
                actual: 5,
            })
        );
    }

    #[test]
    fn empty_segment_fails() {
        let result = parse_address("tuya//secretkey/10.0.0.4/command");
        assert_eq!(result, Err(ParseError::EmptySegment("id")));
    }

    #[test]
    fn action_command_current() {
        let action = parse_action("tuya/device123/secretkey/10.0.0.4/command").unwrap();
        assert_eq!(action, Action::Command);
    }

    #[test]
    fn action_color_current() {
        let action = parse_action("tuya/device123/secretkey/10.0.0.4/color").unwrap();
        assert_eq!(action, Action::Color);
    }

    #[test]
    fn action_command_legacy() {
        let action =
            parse_action("tuya/lightbulb/device123/secretkey/10.0.0.4/command/toggle").unwrap();
        assert_eq!(action, Action::Command);
    }

    #[test]
    fn action_unknown_fails() {
        let result = parse_action("tuya/device123/secretkey/10.0.0.4/dimmer");
        assert_eq!(result, Err(ParseError::UnknownAction("dimmer".to_string())));
    }

    #[test]
    fn raw_command_prefers_payload() {
        let token =
            parse_raw_command("tuya/device123/secretkey/10.0.0.4/command/toggle", "on").unwrap();
        assert_eq!(token, "on");
    }

    #[test]
    fn raw_command_falls_back_to_topic_segment() {
        let token =
            parse_raw_command("tuya/device123/secretkey/10.0.0.4/command/toggle", "").unwrap();
        assert_eq!(token, "toggle");
    }

    #[test]
    fn raw_command_legacy_topic_segment() {
        let token = parse_raw_command(
            "tuya/socket/device123/secretkey/10.0.0.4/command/off",
            "",
        )
        .unwrap();
        assert_eq!(token, "off");
    }

    #[test]
    fn raw_command_missing_everywhere() {
        let result = parse_raw_command("tuya/device123/secretkey/10.0.0.4/command", "");
        assert_eq!(result, Err(ParseError::MissingCommand));
    }

    #[test]
    fn action_display() {
        assert_eq!(Action::Command.to_string(), "command");
        assert_eq!(Action::Color.to_string(), "color");
    }
}
