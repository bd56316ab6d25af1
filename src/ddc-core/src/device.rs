// SPDX-FileCopyrightText: 2025 Stanislaw Grams <stanislawgrams@gmail.com>
//
// SPDX-License-Identifier: BSD-2-Clause

//! Device identifiers and the allow-list applied before any bus access.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::bus::BusDescriptor;
use crate::error::{DdcError, DdcResult};

const DEV_SCHEME: &str = "dev:";
const DEV_I2C_PREFIX: &str = "dev:/dev/i2c-";

/// Human-readable form of the only identifiers the daemon will open.
pub const ALLOWED_DEVICE_FORM: &str = "only 'dev:/dev/i2c-*' devices are allowed";

/// Opaque `<scheme>:<path>` name of a bus endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeviceId(String);

impl DeviceId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Identifier under which an enumerated bus is reported.
    pub fn from_bus(bus: &BusDescriptor) -> Self {
        if bus.is_pci() {
            Self(format!(
                "pci:{:02x}:{:02x}.{}-{}",
                bus.bus, bus.dev, bus.func, bus.i2c_index
            ))
        } else {
            Self(format!("{}{}", DEV_I2C_PREFIX, bus.i2c_index))
        }
    }

    /// True when the identifier has the `dev:/dev/i2c-<digits>` form.
    pub fn is_allowed(&self) -> bool {
        if !self.0.starts_with(DEV_SCHEME) {
            return false;
        }
        match self.0.strip_prefix(DEV_I2C_PREFIX) {
            Some(digits) => !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()),
            None => false,
        }
    }

    /// Check the allow-list and resolve the bus this identifier names.
    pub fn validate(&self) -> DdcResult<BusDescriptor> {
        if !self.is_allowed() {
            return Err(DdcError::invalid_argument(ALLOWED_DEVICE_FORM));
        }
        let digits = &self.0[DEV_I2C_PREFIX.len()..];
        let index: i32 = digits.parse().map_err(|_| {
            DdcError::invalid_argument(format!("i2c adapter index '{}' is out of range", digits))
        })?;
        Ok(BusDescriptor::i2c_dev(index))
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for DeviceId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for DeviceId {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allowed_forms() {
        assert!(DeviceId::from("dev:/dev/i2c-0").is_allowed());
        assert!(DeviceId::from("dev:/dev/i2c-12").is_allowed());
    }

    #[test]
    fn test_rejected_forms() {
        for id in [
            "",
            "dev:",
            "dev:/dev/i2c-",
            "dev:/dev/i2c-1a",
            "dev:/dev/i2c-1/../../sda",
            "dev:/dev/i2c--1",
            "dev:/dev/sda",
            "pci:01:00.0-1",
            "/dev/i2c-1",
            "DEV:/dev/i2c-1",
            "dev:/dev/i2c- 1",
        ] {
            assert!(!DeviceId::from(id).is_allowed(), "{:?} should be rejected", id);
        }
    }

    #[test]
    fn test_validate_resolves_index() {
        let bus = DeviceId::from("dev:/dev/i2c-7").validate().unwrap();
        assert_eq!(bus, BusDescriptor::i2c_dev(7));
    }

    #[test]
    fn test_validate_error_names_allowed_form() {
        let err = DeviceId::from("pci:01:00.0-1").validate().unwrap_err();
        assert_eq!(err, DdcError::InvalidArgument(ALLOWED_DEVICE_FORM.into()));
    }

    #[test]
    fn test_validate_rejects_overflowing_index() {
        let err = DeviceId::from("dev:/dev/i2c-99999999999").validate().unwrap_err();
        assert!(matches!(err, DdcError::InvalidArgument(_)));
    }

    #[test]
    fn test_from_bus() {
        assert_eq!(
            DeviceId::from_bus(&BusDescriptor::i2c_dev(3)).as_str(),
            "dev:/dev/i2c-3"
        );
        let pci = BusDescriptor {
            bus: 1,
            dev: 0x1f,
            func: 2,
            i2c_index: 0,
        };
        assert_eq!(DeviceId::from_bus(&pci).as_str(), "pci:01:1f.2-0");
    }
}
