// SPDX-FileCopyrightText: 2025 Stanislaw Grams <stanislawgrams@gmail.com>
//
// SPDX-License-Identifier: BSD-2-Clause

//! Line codec for the JSON service protocol.

use serde::Serialize;

use crate::types::{ServerLine, ServiceCommand};

/// Parse one client line into a command.
pub fn parse_command(input: &str) -> Result<ServiceCommand, serde_json::Error> {
    serde_json::from_str::<ServiceCommand>(input.trim())
}

/// Parse one line sent by the service (response or notification).
pub fn parse_server_line(input: &str) -> Result<ServerLine, serde_json::Error> {
    serde_json::from_str::<ServerLine>(input.trim_end())
}

/// Serialize a message as a single newline-terminated line.
pub fn to_line<T: Serialize>(message: &T) -> Result<String, serde_json::Error> {
    Ok(serde_json::to_string(message)? + "\n")
}
