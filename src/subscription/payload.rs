// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Parsing of push notifications sent by the device.
//!
//! The device pushes events as HTTP GET requests to the configured server,
//! with the port in `pt` (and `ext` for extension channels) and the event
//! fields as further query parameters: `pt=3&m=1&cnt=4`.

use serde_json::{Map, Value};

use crate::error::ValueError;
use crate::types::{PortAddr, PortId};

/// A decoded push notification.
#[derive(Debug, Clone, PartialEq)]
pub struct PushPayload {
    /// Port that raised the event.
    pub port: PortId,
    /// Remaining query fields, numbers parsed as integers.
    pub fields: Value,
}

impl PushPayload {
    /// Parses a push query string.
    ///
    /// # Errors
    ///
    /// Returns `ValueError::InvalidPort` if `pt` is missing or malformed.
    ///
    /// # Examples
    ///
    /// ```
    /// use megad_lib::subscription::PushPayload;
    /// use serde_json::json;
    ///
    /// let push = PushPayload::from_query("pt=3&ext=1&value=ON").unwrap();
    /// assert_eq!(push.port.to_string(), "3e1");
    /// assert_eq!(push.fields, json!({"value": "ON"}));
    /// ```
    pub fn from_query(query: &str) -> Result<Self, ValueError> {
        let query = query.trim_start_matches('?');
        let mut port = None;
        let mut ext = None;
        let mut fields = Map::new();

        for pair in query.split('&').filter(|p| !p.is_empty()) {
            let (key, raw) = pair.split_once('=').unwrap_or((pair, ""));
            let value = urlencoding::decode(raw)
                .map(std::borrow::Cow::into_owned)
                .unwrap_or_else(|_| raw.to_string());
            match key {
                "pt" => port = Some(value),
                "ext" => ext = Some(value),
                _ => {
                    fields.insert(key.to_string(), field_value(&value));
                }
            }
        }

        let port = port.ok_or_else(|| ValueError::InvalidPort(query.to_string()))?;
        let addr: PortAddr = match ext {
            Some(ext) => format!("{port}e{ext}").parse()?,
            None => port.parse()?,
        };

        Ok(Self {
            port: PortId::Single(addr),
            fields: Value::Object(fields),
        })
    }
}

fn field_value(raw: &str) -> Value {
    raw.parse::<i64>()
        .map_or_else(|_| Value::String(raw.to_string()), Value::from)
}
