// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Entity creation parameters.

use std::time::Duration;

use crate::entity::{Customize, EntityKind};
use crate::error::Error;
use crate::types::PortId;

/// Parameters of one port entity.
///
/// # Examples
///
/// ```
/// use megad_lib::entity::{EntityConfig, EntityKind};
/// use megad_lib::types::{DimmerScale, PortId};
/// use std::time::Duration;
///
/// let config = EntityConfig::new(PortId::from(5), EntityKind::Dimmer(DimmerScale::Standard))
///     .with_smooth(Duration::from_secs(2));
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone)]
pub struct EntityConfig {
    pub(crate) port: PortId,
    pub(crate) kind: EntityKind,
    pub(crate) id_suffix: Option<String>,
    pub(crate) name: Option<String>,
    pub(crate) unique_id: Option<String>,
    pub(crate) entity_id: Option<String>,
    pub(crate) customize: Option<Customize>,
    pub(crate) smooth: Option<Duration>,
}

impl EntityConfig {
    /// Creates a configuration for an entity on `port`.
    #[must_use]
    pub fn new(port: PortId, kind: EntityKind) -> Self {
        Self {
            port,
            kind,
            id_suffix: None,
            name: None,
            unique_id: None,
            entity_id: None,
            customize: None,
            smooth: None,
        }
    }

    /// Sets the suffix appended to the derived id and name.
    #[must_use]
    pub fn with_id_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.id_suffix = Some(suffix.into());
        self
    }

    /// Sets the display name instead of deriving it.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Sets the unique id instead of deriving it.
    #[must_use]
    pub fn with_unique_id(mut self, unique_id: impl Into<String>) -> Self {
        self.unique_id = Some(unique_id.into());
        self
    }

    /// Sets the platform entity id instead of deriving it from the name.
    #[must_use]
    pub fn with_entity_id(mut self, entity_id: impl Into<String>) -> Self {
        self.entity_id = Some(entity_id.into());
        self
    }

    /// Uses this overlay instead of resolving one from the user configuration.
    #[must_use]
    pub fn with_customize(mut self, customize: Customize) -> Self {
        self.customize = Some(customize);
        self
    }

    /// Sets the default smoothing time, used when the overlay has none.
    #[must_use]
    pub fn with_smooth(mut self, smooth: Duration) -> Self {
        self.smooth = Some(smooth);
        self
    }

    /// Returns the port.
    #[must_use]
    pub fn port(&self) -> &PortId {
        &self.port
    }

    /// Returns the entity kind.
    #[must_use]
    pub fn kind(&self) -> &EntityKind {
        &self.kind
    }

    /// Checks that composite ports carry a suffix, a name and an overlay.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidConfiguration` naming the missing field.
    pub fn validate(&self) -> Result<(), Error> {
        if !self.port.is_composite() {
            return Ok(());
        }
        let missing = if self.id_suffix.is_none() {
            Some("id suffix")
        } else if self.name.is_none() {
            Some("name")
        } else if self.customize.is_none() {
            Some("customize")
        } else {
            None
        };
        match missing {
            Some(field) => Err(Error::InvalidConfiguration(format!(
                "composite port {} requires {field}",
                self.port
            ))),
            None => Ok(()),
        }
    }
}
