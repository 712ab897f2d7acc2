// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Port addressing types.
//!
//! A MegaD port is addressed by its number. Ports behind an extension board
//! carry a sub-address after an `e` marker, so `"3e2"` is channel 2 of the
//! extender attached to port 3. Virtual entities spanning several channels
//! use a composite list of addresses.

use std::fmt;
use std::str::FromStr;

use crate::error::ValueError;

/// Marker separating the port number from the extension sub-address.
const EXTENSION_MARKER: char = 'e';

/// A single port address, optionally with an extension sub-address.
///
/// # Examples
///
/// ```
/// use megad_lib::types::PortAddr;
///
/// let plain: PortAddr = "3".parse().unwrap();
/// assert_eq!(plain.port(), 3);
/// assert!(!plain.is_extension());
///
/// let ext: PortAddr = "3e2".parse().unwrap();
/// assert_eq!(ext.extension(), Some(2));
/// assert_eq!(ext.name(true), "03e02");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PortAddr {
    port: u16,
    ext: Option<u16>,
}

impl PortAddr {
    /// Creates a plain port address.
    #[must_use]
    pub const fn new(port: u16) -> Self {
        Self { port, ext: None }
    }

    /// Creates an extension port address.
    #[must_use]
    pub const fn extension_of(port: u16, ext: u16) -> Self {
        Self {
            port,
            ext: Some(ext),
        }
    }

    /// Returns the port number.
    #[must_use]
    pub const fn port(&self) -> u16 {
        self.port
    }

    /// Returns the extension sub-address, if any.
    #[must_use]
    pub const fn extension(&self) -> Option<u16> {
        self.ext
    }

    /// Returns `true` if this address is reached through an extension board.
    #[must_use]
    pub const fn is_extension(&self) -> bool {
        self.ext.is_some()
    }

    /// Returns the display name of the port.
    ///
    /// Under the new naming scheme numbers are zero-padded to two digits.
    #[must_use]
    pub fn name(&self, new_naming: bool) -> String {
        match (self.ext, new_naming) {
            (Some(ext), true) => format!("{:02}e{ext:02}", self.port),
            (Some(ext), false) => format!("{}e{ext}", self.port),
            (None, true) => format!("{:02}", self.port),
            (None, false) => self.port.to_string(),
        }
    }
}

impl fmt::Display for PortAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.ext {
            Some(ext) => write!(f, "{}{EXTENSION_MARKER}{ext}", self.port),
            None => write!(f, "{}", self.port),
        }
    }
}

impl FromStr for PortAddr {
    type Err = ValueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ValueError::InvalidPort(s.to_string());
        let s = s.trim();
        match s.split_once(EXTENSION_MARKER) {
            Some((port, ext)) => Ok(Self::extension_of(
                port.parse().map_err(|_| invalid())?,
                ext.parse().map_err(|_| invalid())?,
            )),
            None => Ok(Self::new(s.parse().map_err(|_| invalid())?)),
        }
    }
}

impl From<u16> for PortAddr {
    fn from(port: u16) -> Self {
        Self::new(port)
    }
}

/// Identifier of the port(s) an entity is bound to.
///
/// Immutable after entity creation. Used as the key of the device value
/// cache, the gesture latch and the push registry.
///
/// # Examples
///
/// ```
/// use megad_lib::types::{PortAddr, PortId};
///
/// let single = PortId::from(PortAddr::new(7));
/// assert_eq!(single.to_string(), "7");
///
/// let composite = PortId::Composite(vec![PortAddr::new(1), PortAddr::new(2)]);
/// assert!(composite.is_composite());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PortId {
    /// A single physical port.
    Single(PortAddr),
    /// Several ports driven together by one virtual entity.
    Composite(Vec<PortAddr>),
}

impl PortId {
    /// Returns the single address, or `None` for composite identifiers.
    #[must_use]
    pub fn as_single(&self) -> Option<PortAddr> {
        match self {
            Self::Single(addr) => Some(*addr),
            Self::Composite(_) => None,
        }
    }

    /// Returns `true` for composite identifiers.
    #[must_use]
    pub fn is_composite(&self) -> bool {
        matches!(self, Self::Composite(_))
    }

    /// Returns `true` if this is a single extension-addressed port.
    #[must_use]
    pub fn is_extension(&self) -> bool {
        self.as_single().is_some_and(|addr| addr.is_extension())
    }

    /// Returns all addresses covered by this identifier.
    #[must_use]
    pub fn addrs(&self) -> &[PortAddr] {
        match self {
            Self::Single(addr) => std::slice::from_ref(addr),
            Self::Composite(addrs) => addrs,
        }
    }

    /// Returns the display name, joining composite members with `", "`.
    #[must_use]
    pub fn name(&self, new_naming: bool) -> String {
        self.addrs()
            .iter()
            .map(|addr| addr.name(new_naming))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl fmt::Display for PortId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Single(addr) => write!(f, "{addr}"),
            Self::Composite(addrs) => {
                write!(f, "[")?;
                for (i, addr) in addrs.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{addr}")?;
                }
                write!(f, "]")
            }
        }
    }
}

impl FromStr for PortId {
    type Err = ValueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if let Some(inner) = trimmed.strip_prefix('[').and_then(|r| r.strip_suffix(']')) {
            let addrs = inner
                .split(',')
                .map(str::parse)
                .collect::<Result<Vec<PortAddr>, _>>()?;
            if addrs.is_empty() {
                return Err(ValueError::InvalidPort(s.to_string()));
            }
            return Ok(Self::Composite(addrs));
        }
        trimmed.parse().map(Self::Single)
    }
}

impl From<PortAddr> for PortId {
    fn from(addr: PortAddr) -> Self {
        Self::Single(addr)
    }
}

impl From<u16> for PortId {
    fn from(port: u16) -> Self {
        Self::Single(PortAddr::new(port))
    }
}
