// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Entity naming and device registry metadata.

use serde::{Deserialize, Serialize};

use crate::device::ConnectionConfig;
use crate::types::PortId;

/// Integration domain used in identifiers.
pub const DOMAIN: &str = "mega";

/// Manufacturer reported for every device.
pub const MANUFACTURER: &str = "ab-log.ru";

/// Device registry entry grouping an entity under its controller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceInfo {
    /// `(domain, identifier)` pair.
    pub identifiers: (String, String),
    /// Display name.
    pub name: String,
    /// Manufacturer string.
    pub manufacturer: String,
    /// Model string including the port(s) for traceability.
    pub model: String,
    /// Firmware version of the controller.
    pub sw_version: Option<String>,
    /// Parent controller identifier.
    pub via_device: (String, String),
}

impl DeviceInfo {
    /// Builds the registry entry of an entity.
    ///
    /// Composite ports are identified by `suffix`, single ports by their
    /// display name.
    #[must_use]
    pub fn new(config: &ConnectionConfig, port: &PortId, suffix: Option<&str>, name: &str) -> Self {
        let port_name = port.name(config.new_naming());
        let (key, model) = if port.is_composite() {
            (
                suffix.unwrap_or_default().to_string(),
                format!("{} (ports: {port_name})", config.model()),
            )
        } else {
            (port_name.clone(), format!("{} (port: {port_name})", config.model()))
        };

        Self {
            identifiers: (DOMAIN.to_string(), format!("{DOMAIN}_{}_{key}", config.id())),
            name: name.to_string(),
            manufacturer: MANUFACTURER.to_string(),
            model,
            sw_version: config.firmware().map(str::to_string),
            via_device: (DOMAIN.to_string(), config.id().to_string()),
        }
    }
}

/// Derives the unique id `mega_{device}_{port}[_{suffix}]`.
///
/// Composite ports use `mega_{device}_{suffix}`.
#[must_use]
pub fn unique_id(device: &str, port: &PortId, suffix: Option<&str>) -> String {
    match (port.is_composite(), suffix) {
        (true, Some(suffix)) => format!("{DOMAIN}_{device}_{suffix}"),
        (_, Some(suffix)) => format!("{DOMAIN}_{device}_{port}_{suffix}"),
        (_, None) => format!("{DOMAIN}_{device}_{port}"),
    }
}

/// Derives the display name `{device}_{port_name}[_{suffix}]`.
#[must_use]
pub fn display_name(device: &str, port_name: &str, suffix: Option<&str>) -> String {
    match suffix {
        Some(suffix) => format!("{device}_{port_name}_{suffix}"),
        None => format!("{device}_{port_name}"),
    }
}

/// Lowercases a name into an entity id object part.
#[must_use]
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    for c in name.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
        } else if !slug.is_empty() && !slug.ends_with('_') {
            slug.push('_');
        }
    }
    while slug.ends_with('_') {
        slug.pop();
    }
    slug
}
