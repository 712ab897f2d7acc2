// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! HTTP transport for MegaD devices.

use std::time::Duration;

use reqwest::Client;
use serde_json::{Map, Value};

use crate::command::{Command, PortCmd, PortQuery, Priority};
use crate::error::ProtocolError;
use crate::protocol::Transport;

/// Body returned by the device when the password path is wrong.
const WRONG_PASSWORD: &str = "Unauthorized";

/// Configuration for an HTTP MegaD device.
///
/// # Examples
///
/// ```
/// use megad_lib::protocol::HttpConfig;
/// use std::time::Duration;
///
/// let config = HttpConfig::new("192.168.0.14")
///     .with_port(8080)
///     .with_password("sec")
///     .with_timeout(Duration::from_secs(5));
///
/// assert_eq!(config.base_url(), "http://192.168.0.14:8080/sec/");
/// ```
#[derive(Debug, Clone)]
pub struct HttpConfig {
    host: String,
    port: u16,
    password: String,
    timeout: Duration,
}

impl HttpConfig {
    /// Default HTTP port.
    pub const DEFAULT_PORT: u16 = 80;
    /// Factory default password of the device.
    pub const DEFAULT_PASSWORD: &'static str = "sec";
    /// Default request timeout.
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

    /// Creates a new HTTP configuration for the specified host.
    #[must_use]
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: Self::DEFAULT_PORT,
            password: Self::DEFAULT_PASSWORD.to_string(),
            timeout: Self::DEFAULT_TIMEOUT,
        }
    }

    /// Sets a custom port.
    #[must_use]
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Sets the password path segment.
    #[must_use]
    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.password = password.into();
        self
    }

    /// Sets the request timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Returns the host.
    #[must_use]
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Returns the timeout.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Builds the base URL, including the password segment.
    #[must_use]
    pub fn base_url(&self) -> String {
        let host = self
            .host
            .trim_start_matches("http://")
            .trim_end_matches('/');
        let port_suffix = if self.port == Self::DEFAULT_PORT {
            String::new()
        } else {
            format!(":{}", self.port)
        };
        format!(
            "http://{host}{port_suffix}/{}/",
            urlencoding::encode(&self.password)
        )
    }

    /// Creates an `HttpTransport` from this configuration.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client cannot be created.
    pub fn into_transport(self) -> Result<HttpTransport, ProtocolError> {
        let client = Client::builder()
            .timeout(self.timeout)
            .build()
            .map_err(ProtocolError::Http)?;

        Ok(HttpTransport {
            base_url: self.base_url(),
            client,
        })
    }
}

/// HTTP transport for a MegaD device.
///
/// Commands are sent as query strings on the password-protected root path,
/// e.g. `GET /sec/?cmd=3:1`.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    base_url: String,
    client: Client,
}

impl HttpTransport {
    /// Returns the base URL of the device.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn get(&self, query: &[(&str, String)]) -> Result<String, ProtocolError> {
        tracing::debug!(url = %self.base_url, ?query, "Sending HTTP request");

        let response = self
            .client
            .get(&self.base_url)
            .query(query)
            .send()
            .await
            .map_err(ProtocolError::Http)?;

        if !response.status().is_success() {
            return Err(ProtocolError::ConnectionFailed(format!(
                "HTTP {} - {}",
                response.status().as_u16(),
                response.status().canonical_reason().unwrap_or("Unknown")
            )));
        }

        let body = response.text().await.map_err(ProtocolError::Http)?;
        tracing::debug!(body = %body, "Received HTTP response");

        if body.trim() == WRONG_PASSWORD {
            return Err(ProtocolError::Rejected(body));
        }
        Ok(body)
    }
}

impl Transport for HttpTransport {
    async fn request(&self, command: &Command, priority: Priority) -> Result<(), ProtocolError> {
        tracing::debug!(%command, priority = priority.value(), "Issuing command");
        self.get(&command.to_query()).await.map(|_| ())
    }

    async fn read_port(&self, port: &str, query: PortQuery) -> Result<Value, ProtocolError> {
        let body = self
            .get(&[("pt", port.to_string()), ("cmd", query.cmd.as_str().to_string())])
            .await?;
        Ok(match query.cmd {
            PortCmd::List => parse_channel_list(&body),
            PortCmd::Get if query.convert => parse_scalar(&body),
            PortCmd::Get => Value::String(body.trim().to_string()),
        })
    }
}

/// Parses a scalar port answer, reading numbers as numbers.
fn parse_scalar(body: &str) -> Value {
    let body = body.trim();
    body.parse::<i64>()
        .map_or_else(|_| Value::String(body.to_string()), Value::from)
}

/// Parses a channel listing such as `ff01:ON/OFF;ff02:OFF/OFF`.
fn parse_channel_list(body: &str) -> Value {
    let channels: Map<String, Value> = body
        .trim()
        .split(';')
        .filter_map(|entry| entry.split_once(':'))
        .map(|(addr, value)| (addr.trim().to_string(), Value::String(value.trim().to_string())))
        .collect();
    Value::Object(channels)
}
