// SPDX-FileCopyrightText: 2025 Stanislaw Grams <stanislawgrams@gmail.com>
//
// SPDX-License-Identifier: BSD-2-Clause

//! Wire formats for ddc-rs.
//!
//! `wire` is the fixed-record protocol between the daemon and the privileged
//! helper; `types`, `codec` and `mapping` cover the JSON line protocol spoken
//! to service clients.

pub mod codec;
pub mod mapping;
pub mod types;
pub mod wire;

pub use codec::{parse_command, parse_server_line, to_line};
pub use mapping::{control_changed_event, error_kind, error_response, reading_response};
pub use types::{
    ErrorKind, ServerLine, ServiceCommand, ServiceEvent, ServiceResponse, ServiceResult,
};
pub use wire::{
    decode_answer, decode_query, encode_answer, encode_query, Answer, Query, Status, ANSWER_SIZE,
    QUERY_SIZE,
};
