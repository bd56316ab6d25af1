// SPDX-FileCopyrightText: 2025 Stanislaw Grams <stanislawgrams@gmail.com>
//
// SPDX-License-Identifier: BSD-2-Clause

//! Conversions between domain results and service DTOs.

use ddc_core::{ControlChanged, ControlReading, DdcError};

use crate::types::{ErrorKind, ServiceEvent, ServiceResponse, ServiceResult};

pub fn error_kind(err: &DdcError) -> ErrorKind {
    match err {
        DdcError::InvalidArgument(_) => ErrorKind::InvalidArgs,
        DdcError::Open { .. } => ErrorKind::OpenFailed,
        DdcError::Transfer { .. } | DdcError::Reply(_) | DdcError::ReadExhausted { .. } => {
            ErrorKind::ReadFailed
        }
        DdcError::Write { .. } => ErrorKind::WriteFailed,
        DdcError::Unsupported(_) => ErrorKind::Unsupported,
        DdcError::Malformed(_) | DdcError::PayloadTooLarge { .. } => ErrorKind::Protocol,
        DdcError::ChannelPoisoned | DdcError::Channel(_) => ErrorKind::Internal,
    }
}

pub fn error_response(err: &DdcError) -> ServiceResponse {
    ServiceResponse::error(error_kind(err), err.to_string())
}

pub fn reading_response(reading: ControlReading) -> ServiceResponse {
    ServiceResponse::ok(ServiceResult::Control {
        value: reading.value,
        maximum: reading.maximum,
    })
}

pub fn control_changed_event(event: &ControlChanged) -> ServiceEvent {
    ServiceEvent::ControlChanged {
        device: event.device.to_string(),
        control: u32::from(event.control.0),
        value: u32::from(event.value),
    }
}
