// SPDX-FileCopyrightText: 2025 Stanislaw Grams <stanislawgrams@gmail.com>
//
// SPDX-License-Identifier: BSD-2-Clause

use thiserror::Error;

/// Failure of a device-control request.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DdcError {
    /// Request rejected before any bus access.
    #[error("{0}")]
    InvalidArgument(String),

    #[error("DDC/CI at {device} is unusable ({status})")]
    Open { device: String, status: i32 },

    #[error("transfer to 0x{address:02x} failed ({status})")]
    Transfer { address: u16, status: i32 },

    /// The display answered, but the reply frame was not a valid DDC/CI reply.
    #[error("invalid DDC/CI reply: {0}")]
    Reply(String),

    #[error("control 0x{0:02x} is not supported by the display")]
    Unsupported(u8),

    #[error("reading control 0x{control:02x} failed after {attempts} attempts")]
    ReadExhausted { control: u8, attempts: u32 },

    #[error("writing control 0x{control:02x} failed: {reason}")]
    Write { control: u8, reason: String },

    /// Framing violation on the helper channel.
    #[error("malformed helper message: {0}")]
    Malformed(String),

    #[error("payload of {len} bytes exceeds the {max}-byte buffer")]
    PayloadTooLarge { len: usize, max: usize },

    #[error("helper channel is unusable after an earlier framing or I/O failure")]
    ChannelPoisoned,

    #[error("helper channel: {0}")]
    Channel(String),
}

pub type DdcResult<T> = Result<T, DdcError>;

impl DdcError {
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument(message.into())
    }

    pub fn malformed(message: impl Into<String>) -> Self {
        Self::Malformed(message.into())
    }

    pub fn channel(message: impl Into<String>) -> Self {
        Self::Channel(message.into())
    }

    /// Errors worth another attempt on the same session.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transfer { .. } | Self::Reply(_))
    }

    /// Errors after which the helper channel can no longer be trusted.
    pub fn is_fatal_to_channel(&self) -> bool {
        matches!(self, Self::Malformed(_) | Self::Channel(_))
    }
}

impl From<std::io::Error> for DdcError {
    fn from(err: std::io::Error) -> Self {
        Self::Channel(err.to_string())
    }
}
