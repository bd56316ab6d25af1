// SPDX-FileCopyrightText: 2025 Stanislaw Grams <stanislawgrams@gmail.com>
//
// SPDX-License-Identifier: BSD-2-Clause

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::device::DeviceId;
use crate::error::{DdcError, DdcResult};

/// VCP code of a display control (e.g. 0x10 brightness).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ControlId(pub u8);

impl ControlId {
    /// Narrow a transport-level control number.
    pub fn from_wire(control: u32) -> DdcResult<Self> {
        u8::try_from(control).map(Self).map_err(|_| {
            DdcError::invalid_argument(format!("control {} is out of range (0-255)", control))
        })
    }
}

impl fmt::Display for ControlId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:02x}", self.0)
    }
}

/// Current value and device-reported maximum of a control.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControlReading {
    pub value: u16,
    pub maximum: u16,
}

/// Outcome of a control write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriteAck {
    /// Settle time the display needs before the next operation, when known.
    pub settle: Option<Duration>,
}

/// Notification emitted after a control write completed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControlChanged {
    pub device: DeviceId,
    pub control: ControlId,
    pub value: u16,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_control_from_wire() {
        assert_eq!(ControlId::from_wire(0x10).unwrap(), ControlId(0x10));
        assert_eq!(ControlId::from_wire(255).unwrap(), ControlId(0xff));
        assert!(matches!(
            ControlId::from_wire(256),
            Err(DdcError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_control_display() {
        assert_eq!(ControlId(0x60).to_string(), "0x60");
    }
}
