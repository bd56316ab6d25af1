// SPDX-FileCopyrightText: 2025 Stanislaw Grams <stanislawgrams@gmail.com>
//
// SPDX-License-Identifier: BSD-2-Clause

//! Linux i2c-dev backend (`/dev/i2c-N`).
//!
//! The slave address is selected before every transfer; transfers run on
//! the blocking pool.

use std::io;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use ::i2cdev::core::I2CDevice;
use ::i2cdev::linux::{LinuxI2CDevice, LinuxI2CError};
use tracing::debug;

use ddc_core::vcp::DDCCI_ADDR;
use ddc_core::{BusDescriptor, DdcError, DdcResult, DeviceId, Direction, TransferRequest};

use crate::{BusBackend, BusFuture};

pub struct I2cDevBus {
    dev_dir: PathBuf,
    open: Option<Arc<Mutex<LinuxI2CDevice>>>,
}

impl I2cDevBus {
    pub fn new(dev_dir: PathBuf) -> Self {
        Self {
            dev_dir,
            open: None,
        }
    }
}

/// Index of an `i2c-N` directory entry.
fn adapter_index(file_name: &str) -> Option<i32> {
    let digits = file_name.strip_prefix("i2c-")?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

/// Negative errno carried back on the wire.
fn errno_status(err: LinuxI2CError) -> i32 {
    -io::Error::from(err).raw_os_error().unwrap_or(libc::EIO)
}

fn transfer_blocking(
    device: &Mutex<LinuxI2CDevice>,
    request: &TransferRequest,
) -> DdcResult<Vec<u8>> {
    let fail = |err: LinuxI2CError| DdcError::Transfer {
        address: request.address,
        status: errno_status(err),
    };
    let mut device = device
        .lock()
        .map_err(|_| DdcError::channel("i2c device lock poisoned"))?;

    device.set_slave_address(request.address).map_err(fail)?;
    match request.direction {
        Direction::Write => {
            device.write(&request.payload).map_err(fail)?;
            Ok(Vec::new())
        }
        Direction::Read => {
            let mut buf = vec![0u8; request.length];
            device.read(&mut buf).map_err(fail)?;
            Ok(buf)
        }
    }
}

impl BusBackend for I2cDevBus {
    fn name(&self) -> &str {
        "i2cdev"
    }

    fn enumerate<'a>(&'a mut self) -> BusFuture<'a, Vec<BusDescriptor>> {
        Box::pin(async move {
            let mut indexes = Vec::new();
            let mut entries = tokio::fs::read_dir(&self.dev_dir).await?;
            while let Some(entry) = entries.next_entry().await? {
                if let Some(index) = entry.file_name().to_str().and_then(adapter_index) {
                    indexes.push(index);
                }
            }
            indexes.sort_unstable();
            Ok(indexes.into_iter().map(BusDescriptor::i2c_dev).collect())
        })
    }

    fn open<'a>(&'a mut self, bus: BusDescriptor) -> BusFuture<'a, ()> {
        Box::pin(async move {
            let device = DeviceId::from_bus(&bus).to_string();
            if bus.is_pci() {
                return Err(DdcError::Open {
                    device,
                    status: -libc::ENODEV,
                });
            }
            let path = self.dev_dir.join(format!("i2c-{}", bus.i2c_index));
            let handle = LinuxI2CDevice::new(&path, DDCCI_ADDR).map_err(|e| DdcError::Open {
                device: device.clone(),
                status: errno_status(e),
            })?;
            debug!("Opened {}", path.display());
            self.open = Some(Arc::new(Mutex::new(handle)));
            Ok(())
        })
    }

    fn transfer<'a>(&'a mut self, request: TransferRequest) -> BusFuture<'a, Vec<u8>> {
        Box::pin(async move {
            let handle = self.open.clone().ok_or(DdcError::Transfer {
                address: request.address,
                status: -libc::EBADF,
            })?;
            tokio::task::spawn_blocking(move || transfer_blocking(&handle, &request))
                .await
                .map_err(|e| DdcError::channel(format!("transfer task failed: {}", e)))?
        })
    }

    fn close<'a>(&'a mut self) -> BusFuture<'a, ()> {
        self.open = None;
        Box::pin(async { Ok(()) })
    }
}
