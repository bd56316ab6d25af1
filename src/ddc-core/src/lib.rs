// SPDX-FileCopyrightText: 2025 Stanislaw Grams <stanislawgrams@gmail.com>
//
// SPDX-License-Identifier: BSD-2-Clause

pub mod bus;
pub mod control;
pub mod device;
pub mod error;
pub mod events;
pub mod metadata;
pub mod retry;
pub mod vcp;

pub type DynResult<T> = Result<T, Box<dyn std::error::Error + Send + Sync>>;

pub use bus::{BusDescriptor, Direction, TransferRequest, MAX_PAYLOAD};
pub use control::{ControlChanged, ControlId, ControlReading, WriteAck};
pub use device::{DeviceId, ALLOWED_DEVICE_FORM};
pub use error::{DdcError, DdcResult};
pub use metadata::{ControlDb, GroupDb, MonitorDb, SubgroupDb};
