// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Logical commands sent to a MegaD device.
//!
//! The device accepts two command shapes on its HTTP API:
//!
//! - `cmd=<port>:<value>` sets an output directly
//! - `pt=<port>&pwm=<level>[&cnt=<n>]` drives a PWM output, letting the
//!   firmware ramp towards `level`
//!
//! Both may carry an `addr` selecting a channel on a dual-channel port.
//!
//! # Examples
//!
//! ```
//! use megad_lib::command::Command;
//!
//! let cmd = Command::set("3", 1);
//! assert_eq!(cmd.to_query(), vec![("cmd", "3:1".to_string())]);
//!
//! let ramp = Command::pwm("5", 200).with_count(Some(10));
//! assert_eq!(
//!     ramp.to_query(),
//!     vec![("pt", "5".to_string()), ("pwm", "200".to_string()), ("cnt", "10".to_string())]
//! );
//! ```

use std::fmt;

/// Dispatch priority of a command.
///
/// User-initiated commands jump ahead of background traffic such as polling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, PartialOrd, Ord)]
pub enum Priority {
    /// Issued directly in response to a user action.
    Urgent,
    /// Background refresh or ramp stepping.
    #[default]
    Background,
}

impl Priority {
    /// Returns the numeric priority, lower is more urgent.
    #[must_use]
    pub const fn value(&self) -> i8 {
        match self {
            Self::Urgent => -1,
            Self::Background => 0,
        }
    }
}

/// A command addressed to one port.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Sets an output to a value.
    Set {
        /// Command port, e.g. `"3"`, `"3e2"` or `"7A"`.
        port: String,
        /// Value to apply.
        value: u16,
        /// Channel address on dual-channel ports.
        addr: Option<String>,
    },
    /// Drives a PWM output towards a level using the firmware ramp.
    Pwm {
        /// Command port.
        port: String,
        /// Target level.
        level: u16,
        /// Firmware step count; `None` uses the device default.
        count: Option<u32>,
        /// Channel address on dual-channel ports.
        addr: Option<String>,
    },
}

impl Command {
    /// Creates a direct set command.
    #[must_use]
    pub fn set(port: impl Into<String>, value: u16) -> Self {
        Self::Set {
            port: port.into(),
            value,
            addr: None,
        }
    }

    /// Creates a firmware-ramped PWM command.
    #[must_use]
    pub fn pwm(port: impl Into<String>, level: u16) -> Self {
        Self::Pwm {
            port: port.into(),
            level,
            count: None,
            addr: None,
        }
    }

    /// Sets the channel address.
    #[must_use]
    pub fn with_addr(mut self, address: Option<String>) -> Self {
        match &mut self {
            Self::Set { addr, .. } | Self::Pwm { addr, .. } => *addr = address,
        }
        self
    }

    /// Sets the firmware step count of a PWM command.
    ///
    /// Has no effect on set commands.
    #[must_use]
    pub fn with_count(mut self, step_count: Option<u32>) -> Self {
        if let Self::Pwm { count, .. } = &mut self {
            *count = step_count;
        }
        self
    }

    /// Returns the command port.
    #[must_use]
    pub fn port(&self) -> &str {
        match self {
            Self::Set { port, .. } | Self::Pwm { port, .. } => port,
        }
    }

    /// Renders the command as HTTP query parameters.
    #[must_use]
    pub fn to_query(&self) -> Vec<(&'static str, String)> {
        let mut query = match self {
            Self::Set { port, value, .. } => vec![("cmd", format!("{port}:{value}"))],
            Self::Pwm {
                port, level, count, ..
            } => {
                let mut q = vec![("pt", port.clone()), ("pwm", level.to_string())];
                if let Some(count) = count {
                    q.push(("cnt", count.to_string()));
                }
                q
            }
        };
        if let Self::Set {
            addr: Some(addr), ..
        }
        | Self::Pwm {
            addr: Some(addr), ..
        } = self
        {
            query.push(("addr", addr.clone()));
        }
        query
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rendered = self
            .to_query()
            .into_iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join("&");
        f.write_str(&rendered)
    }
}

/// The read command used for a forced port re-read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PortCmd {
    /// Plain port read (`cmd=get`).
    #[default]
    Get,
    /// Channel listing for bus-attached dual-channel chips (`cmd=list`).
    List,
}

impl PortCmd {
    /// Returns the HTTP command name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "get",
            Self::List => "list",
        }
    }
}

/// Parameters of a forced synchronous port re-read.
///
/// Re-reads always go to the device over HTTP.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PortQuery {
    /// Convert the raw answer into the cache shape of the port.
    pub convert: bool,
    /// Read command to use.
    pub cmd: PortCmd,
}

impl PortQuery {
    /// Query used to refresh dual-channel ports after actuation.
    #[must_use]
    pub const fn channel_list() -> Self {
        Self {
            convert: false,
            cmd: PortCmd::List,
        }
    }
}
