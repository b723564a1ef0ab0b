// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Error types for the bridge.
//!
//! This module provides the error hierarchy used across the crate: topic
//! parsing, transport communication, device dispatch, and configuration
//! validation. Errors raised while handling a single inbound message or a
//! single device event are caught at the handler boundary and logged; they
//! never propagate out of the coordinator loop.

use thiserror::Error;

/// The main error type for this library.
#[derive(Debug, Error)]
pub enum Error {
    /// Error occurred while parsing an inbound topic path.
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),

    /// Error occurred during transport communication.
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// Error occurred while dispatching to a device.
    #[error("device error: {0}")]
    Device(#[from] DeviceError),

    /// Bridge configuration is invalid.
    #[error("invalid configuration: {0}")]
    Config(String),
}

/// Errors related to topic path parsing.
///
/// Topic parsing is purely positional. A path with fewer segments than the
/// detected notation requires fails here rather than yielding partial data.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// The topic path has fewer segments than the notation requires.
    #[error("topic has {actual} segments, {expected} required")]
    TooShort {
        /// Number of segments the detected notation requires.
        expected: usize,
        /// Number of segments actually present.
        actual: usize,
    },

    /// A required addressing segment is empty.
    #[error("empty topic segment: {0}")]
    EmptySegment(&'static str),

    /// The action segment is neither `command` nor `color`.
    #[error("unknown action: {0}")]
    UnknownAction(String),

    /// Neither the payload nor the topic carries a command token.
    #[error("no command token in payload or topic")]
    MissingCommand,
}

/// Errors related to transport communication.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// MQTT connection or communication failed.
    #[error("MQTT error: {0}")]
    Mqtt(#[from] rumqttc::ClientError),

    /// Connection to the broker failed.
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    /// Invalid broker address.
    #[error("invalid address: {0}")]
    InvalidAddress(String),

    /// Internal channel was closed.
    #[error("channel closed: {0}")]
    ChannelClosed(String),
}

/// Errors related to device dispatch.
#[derive(Debug, Error)]
pub enum DeviceError {
    /// Device handle could not be established.
    #[error("device connection failed: {0}")]
    ConnectionFailed(String),

    /// Command was rejected by the device.
    #[error("command rejected: {0}")]
    CommandRejected(String),

    /// Device did not answer in time.
    #[error("device timed out after {0} ms")]
    Timeout(u64),
}

/// A specialized Result type for this library.
pub type Result<T> = std::result::Result<T, Error>;
