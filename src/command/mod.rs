// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Command normalization.
//!
//! Raw command tokens arrive either as the message payload or as a trailing
//! topic segment. [`normalize`] turns a token into a [`DeviceCommand`], the
//! closed tagged type handed to the device dispatcher. Decision order, first
//! match wins:
//!
//! 1. `toggle` (ASCII case-insensitive) → [`DeviceCommand::Toggle`]
//! 2. `1` / `0` → [`DeviceCommand::SetState`]
//! 3. syntactically valid JSON → [`DeviceCommand::Raw`]
//! 4. anything else is treated as a human command word: `on` (ASCII
//!    case-insensitive) sets the device on, every other word sets it off
//!
//! Branch 4 always produces a command, so normalization cannot fail.

mod json_scan;

pub use json_scan::is_json;

use serde_json::Value;

/// A normalized command ready for device dispatch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceCommand {
    /// Flip the device's primary switch, whatever its current state.
    Toggle,
    /// Set the primary switch to an explicit state.
    SetState(bool),
    /// Pass an arbitrary JSON value through to the device protocol client.
    Raw(Value),
}

impl DeviceCommand {
    /// Returns `true` for the toggle command, which is dispatched through a
    /// distinct device entry point.
    #[must_use]
    pub fn is_toggle(&self) -> bool {
        matches!(self, Self::Toggle)
    }
}

impl std::fmt::Display for DeviceCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Toggle => write!(f, "toggle"),
            Self::SetState(on) => write!(f, "set({on})"),
            Self::Raw(value) => write!(f, "raw({value})"),
        }
    }
}

/// Normalizes a raw command token into a [`DeviceCommand`].
///
/// # Examples
///
/// ```
/// use tuya_bridge::command::{DeviceCommand, normalize};
///
/// assert_eq!(normalize("toggle"), DeviceCommand::Toggle);
/// assert_eq!(normalize("1"), DeviceCommand::SetState(true));
/// assert_eq!(normalize("on"), DeviceCommand::SetState(true));
/// assert!(matches!(normalize(r#"{"1":true}"#), DeviceCommand::Raw(_)));
/// ```
#[must_use]
pub fn normalize(token: &str) -> DeviceCommand {
    if token.eq_ignore_ascii_case("toggle") {
        return DeviceCommand::Toggle;
    }

    match token {
        "1" => return DeviceCommand::SetState(true),
        "0" => return DeviceCommand::SetState(false),
        _ => {}
    }

    if is_json(token) {
        // The scan guarantees the token parses; fall through to the keyword
        // branch on the off chance serde_json disagrees.
        if let Ok(value) = serde_json::from_str(token) {
            tracing::debug!(token = %token, "command is JSON");
            return DeviceCommand::Raw(value);
        }
    }

    DeviceCommand::SetState(token.eq_ignore_ascii_case("on"))
}
