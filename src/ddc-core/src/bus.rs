// SPDX-FileCopyrightText: 2025 Stanislaw Grams <stanislawgrams@gmail.com>
//
// SPDX-License-Identifier: BSD-2-Clause

use serde::{Deserialize, Serialize};

use crate::error::{DdcError, DdcResult};

/// Capacity of every payload buffer carried between the daemon and the helper.
pub const MAX_PAYLOAD: usize = 256;

/// Addressing tuple for one hardware bus: PCI location plus logical I2C index.
///
/// Plain `/dev/i2c-N` adapters have an all-zero PCI triple.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BusDescriptor {
    pub bus: u16,
    pub dev: u8,
    pub func: u8,
    pub i2c_index: i32,
}

impl BusDescriptor {
    /// Descriptor for a kernel i2c-dev adapter.
    pub fn i2c_dev(index: i32) -> Self {
        Self {
            bus: 0,
            dev: 0,
            func: 0,
            i2c_index: index,
        }
    }

    pub fn is_pci(&self) -> bool {
        self.bus != 0 || self.dev != 0 || self.func != 0
    }
}

/// Direction of a register transfer as seen from the bus master.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    Write,
    Read,
}

/// A single I2C transaction against the currently open bus.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferRequest {
    /// 7-bit slave address.
    pub address: u16,
    pub direction: Direction,
    /// Bytes to read, or the payload length for writes.
    pub length: usize,
    /// Bytes to write; empty for reads.
    pub payload: Vec<u8>,
}

impl TransferRequest {
    pub fn write(address: u16, payload: Vec<u8>) -> DdcResult<Self> {
        check_len(payload.len())?;
        Ok(Self {
            address,
            direction: Direction::Write,
            length: payload.len(),
            payload,
        })
    }

    pub fn read(address: u16, length: usize) -> DdcResult<Self> {
        check_len(length)?;
        Ok(Self {
            address,
            direction: Direction::Read,
            length,
            payload: Vec::new(),
        })
    }
}

pub(crate) fn check_len(len: usize) -> DdcResult<()> {
    if len > MAX_PAYLOAD {
        return Err(DdcError::PayloadTooLarge {
            len,
            max: MAX_PAYLOAD,
        });
    }
    Ok(())
}
