// SPDX-FileCopyrightText: 2025 Stanislaw Grams <stanislawgrams@gmail.com>
//
// SPDX-License-Identifier: BSD-2-Clause

//! One open connection to a display's register space.

use tracing::{debug, warn};

use ddc_core::{BusDescriptor, DdcError, DdcResult, DeviceId, Direction, TransferRequest};
use ddc_protocol::wire::{Query, Status};

use crate::channel::{exchange, HelperChannel};

/// Session bound to one device for the duration of one request.
///
/// Must be finished with [`BusSession::close`]; dropping an open session
/// leaves the helper's bus open and is logged.
pub struct BusSession<'c> {
    channel: &'c mut dyn HelperChannel,
    device: DeviceId,
    bus: BusDescriptor,
    open: bool,
}

impl<'c> BusSession<'c> {
    /// Open `device` on the helper. A failed open leaves nothing to close.
    pub async fn open(channel: &'c mut dyn HelperChannel, device: &DeviceId) -> DdcResult<Self> {
        let bus = device.validate()?;
        let answer = exchange(&mut *channel, &Query::Open { bus }).await?;
        if let Status::Failed(status) = answer.status {
            return Err(DdcError::Open {
                device: device.to_string(),
                status,
            });
        }
        debug!("Session opened on {}", device);
        Ok(Self {
            channel,
            device: device.clone(),
            bus,
            open: true,
        })
    }

    pub fn device(&self) -> &DeviceId {
        &self.device
    }

    pub fn bus(&self) -> BusDescriptor {
        self.bus
    }

    /// Perform one transfer; returns the bytes read (empty for writes).
    pub async fn transfer(&mut self, request: TransferRequest) -> DdcResult<Vec<u8>> {
        if !self.open {
            return Err(DdcError::channel("transfer on a closed session"));
        }
        let address = request.address;
        let direction = request.direction;
        let length = request.length;

        let answer = exchange(&mut *self.channel, &Query::Transfer(request)).await?;
        match answer.status {
            Status::Failed(status) => Err(DdcError::Transfer { address, status }),
            Status::Ok(count) => match direction {
                Direction::Write => Ok(Vec::new()),
                Direction::Read if count as usize > length => Err(DdcError::malformed(format!(
                    "helper returned {} bytes for a {}-byte read",
                    count, length
                ))),
                Direction::Read => Ok(answer.payload),
            },
        }
    }

    pub async fn write(&mut self, address: u16, payload: Vec<u8>) -> DdcResult<()> {
        self.transfer(TransferRequest::write(address, payload)?)
            .await
            .map(|_| ())
    }

    pub async fn read(&mut self, address: u16, length: usize) -> DdcResult<Vec<u8>> {
        self.transfer(TransferRequest::read(address, length)?).await
    }

    /// Release the bus.
    ///
    /// Only channel failures are returned; a helper that refuses the close
    /// is logged and otherwise ignored.
    pub async fn close(mut self) -> DdcResult<()> {
        self.open = false;
        let answer = exchange(&mut *self.channel, &Query::Close).await?;
        if !answer.status.is_ok() {
            warn!(
                "Helper failed to close {} (status {})",
                self.device,
                answer.status.raw()
            );
        } else {
            debug!("Session closed on {}", self.device);
        }
        Ok(())
    }
}

impl Drop for BusSession<'_> {
    fn drop(&mut self) {
        if self.open {
            warn!("Session on {} dropped without close", self.device);
        }
    }
}
