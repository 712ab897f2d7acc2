// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Transport used to reach a MegaD device.
//!
//! The [`Transport`] trait is the outbound half of the device connection:
//! issuing commands and reading ports on demand. Timeouts and retries are the
//! transport's business; the entity layer issues each request once.
//!
//! - [`HttpTransport`]: the device's HTTP API (requires the `http` feature)

#[cfg(feature = "http")]
mod http;

#[cfg(feature = "http")]
pub use http::{HttpConfig, HttpTransport};

use std::future::Future;

use serde_json::Value;

use crate::command::{Command, PortQuery, Priority};
use crate::error::ProtocolError;

/// Trait for transports that can send commands to a MegaD device.
pub trait Transport: Send + Sync + 'static {
    /// Sends a command to the device.
    ///
    /// # Errors
    ///
    /// Returns `ProtocolError` if the command could not be delivered or was
    /// not acknowledged.
    fn request(
        &self,
        command: &Command,
        priority: Priority,
    ) -> impl Future<Output = Result<(), ProtocolError>> + Send;

    /// Reads the current value of a port directly from the device.
    ///
    /// # Errors
    ///
    /// Returns `ProtocolError` if the device could not be queried.
    fn read_port(
        &self,
        port: &str,
        query: PortQuery,
    ) -> impl Future<Output = Result<Value, ProtocolError>> + Send;
}
