// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Error types for the `megad_lib` library.
//!
//! Errors fall into two groups with different propagation rules:
//!
//! - [`DecodeError`] covers malformed device payloads and missing dual-channel
//!   configuration. These are absorbed by the entity layer, logged, and
//!   projected as an unknown state.
//! - [`ProtocolError`] covers commands that could not be delivered. These are
//!   returned to the caller of the actuation operation and go no further.

use thiserror::Error;

/// The main error type for this library.
#[derive(Debug, Error)]
pub enum Error {
    /// Error occurred during value validation.
    #[error("value error: {0}")]
    Value(#[from] ValueError),

    /// Error occurred while talking to the device.
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// A device payload could not be interpreted.
    #[error("decode error: {0}")]
    Decode(#[from] DecodeError),

    /// The entity kind does not support the requested operation.
    #[error("entity does not support {0}")]
    CapabilityNotSupported(&'static str),

    /// The entity has been removed from the platform.
    #[error("entity has been removed")]
    Removed,

    /// Entity configuration is incomplete or contradictory.
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),
}

/// Errors related to value validation and constraints.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValueError {
    /// A numeric value is outside the allowed range.
    #[error("value {actual} is out of range [{min}, {max}]")]
    OutOfRange {
        /// Minimum allowed value.
        min: u16,
        /// Maximum allowed value.
        max: u16,
        /// The actual value that was provided.
        actual: u16,
    },

    /// A port identifier could not be parsed.
    #[error("invalid port identifier: {0}")]
    InvalidPort(String),

    /// A level range has its bounds reversed or collapsed.
    #[error("invalid level range [{low}, {high}]")]
    InvalidRange {
        /// Lower bound.
        low: u16,
        /// Upper bound.
        high: u16,
    },
}

/// Errors related to delivering commands to the device.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// HTTP request failed.
    #[cfg(feature = "http")]
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Connection to the device failed.
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    /// Request timed out.
    #[error("request timed out after {0} ms")]
    Timeout(u64),

    /// Invalid URL or address.
    #[error("invalid address: {0}")]
    InvalidAddress(String),

    /// The device answered but refused the command.
    #[error("command rejected: {0}")]
    Rejected(String),
}

/// Errors raised while interpreting raw device values.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// The device has not reported a value for this port yet.
    #[error("no value reported")]
    Empty,

    /// A structured value was expected but something else arrived.
    #[error("expected a mapping, got {0}")]
    NotAMapping(String),

    /// The mapping holds no string entry for the configured address.
    #[error("no channel value for address {addr}")]
    MissingChannel {
        /// The address that was looked up.
        addr: String,
    },

    /// A composite value split into fewer elements than required.
    #[error("composite value {0:?} has fewer than 2 elements")]
    WrongLength(String),

    /// The channel index points past the end of the composite value.
    #[error("channel index {index} not present in {value:?}")]
    IndexOutOfRange {
        /// The configured index.
        index: usize,
        /// The composite value.
        value: String,
    },

    /// A scalar token could not be read as a state or level.
    #[error("unrecognised token {0:?}")]
    InvalidToken(String),

    /// A dual-channel port is missing its address configuration.
    #[error("channel index configured without an address")]
    MissingAddress,
}

/// A specialized Result type for this library.
pub type Result<T> = std::result::Result<T, Error>;
