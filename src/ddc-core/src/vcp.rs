// SPDX-FileCopyrightText: 2025 Stanislaw Grams <stanislawgrams@gmail.com>
//
// SPDX-License-Identifier: BSD-2-Clause

//! DDC/CI VCP feature framing (Get/Set VCP Feature).
//!
//! Host frames start with the source address 0x51 and are checksummed
//! against the display's write address 0x6e. Display replies are checksummed
//! against the virtual host address 0x50.

use crate::control::{ControlId, ControlReading};
use crate::error::{DdcError, DdcResult};

/// 7-bit I2C address of the DDC/CI command channel.
pub const DDCCI_ADDR: u16 = 0x37;

/// Length of a Get VCP Feature reply frame, checksum included.
pub const GET_VCP_REPLY_LEN: usize = 11;

const HOST_SOURCE: u8 = 0x51;
const DISPLAY_WRITE_ADDR: u8 = 0x6e;
const VIRTUAL_HOST: u8 = 0x50;
const LENGTH_FLAG: u8 = 0x80;

const OP_GET_VCP: u8 = 0x01;
const OP_GET_VCP_REPLY: u8 = 0x02;
const OP_SET_VCP: u8 = 0x03;

const RESULT_OK: u8 = 0x00;
const RESULT_UNSUPPORTED: u8 = 0x01;

/// Host-to-display request, as decoded by emulated displays.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VcpRequest {
    Get(ControlId),
    Set(ControlId, u16),
}

fn xor(seed: u8, bytes: &[u8]) -> u8 {
    bytes.iter().fold(seed, |acc, b| acc ^ b)
}

fn host_frame(body: &[u8]) -> Vec<u8> {
    let mut frame = Vec::with_capacity(body.len() + 3);
    frame.push(HOST_SOURCE);
    frame.push(LENGTH_FLAG | body.len() as u8);
    frame.extend_from_slice(body);
    frame.push(xor(DISPLAY_WRITE_ADDR, &frame));
    frame
}

pub fn get_vcp_request(control: ControlId) -> Vec<u8> {
    host_frame(&[OP_GET_VCP, control.0])
}

pub fn set_vcp_request(control: ControlId, value: u16) -> Vec<u8> {
    let [hi, lo] = value.to_be_bytes();
    host_frame(&[OP_SET_VCP, control.0, hi, lo])
}

/// Decode a host request frame.
pub fn parse_request(frame: &[u8]) -> DdcResult<VcpRequest> {
    let (last, head) = frame
        .split_last()
        .ok_or_else(|| DdcError::Reply("empty request".into()))?;
    if head.len() < 3 || head[0] != HOST_SOURCE || head[1] & LENGTH_FLAG == 0 {
        return Err(DdcError::Reply("not a DDC/CI host frame".into()));
    }
    let body_len = (head[1] & !LENGTH_FLAG) as usize;
    if head.len() != body_len + 2 {
        return Err(DdcError::Reply(format!(
            "request length byte says {} but frame carries {}",
            body_len,
            head.len() - 2
        )));
    }
    if xor(DISPLAY_WRITE_ADDR, head) != *last {
        return Err(DdcError::Reply("request checksum mismatch".into()));
    }
    match &head[2..] {
        [OP_GET_VCP, ctrl] => Ok(VcpRequest::Get(ControlId(*ctrl))),
        [OP_SET_VCP, ctrl, hi, lo] => Ok(VcpRequest::Set(
            ControlId(*ctrl),
            u16::from_be_bytes([*hi, *lo]),
        )),
        _ => Err(DdcError::Reply("unsupported request opcode".into())),
    }
}

fn reply_frame(result: u8, control: ControlId, reading: ControlReading) -> Vec<u8> {
    let [max_hi, max_lo] = reading.maximum.to_be_bytes();
    let [cur_hi, cur_lo] = reading.value.to_be_bytes();
    let mut frame = vec![
        DISPLAY_WRITE_ADDR,
        LENGTH_FLAG | 8,
        OP_GET_VCP_REPLY,
        result,
        control.0,
        0x00,
        max_hi,
        max_lo,
        cur_hi,
        cur_lo,
    ];
    frame.push(xor(VIRTUAL_HOST, &frame[1..]));
    frame
}

/// Encode the reply a display sends for a Get VCP Feature request.
pub fn get_vcp_reply(control: ControlId, reading: ControlReading) -> Vec<u8> {
    reply_frame(RESULT_OK, control, reading)
}

/// Reply for a control the display does not implement.
pub fn unsupported_reply(control: ControlId) -> Vec<u8> {
    reply_frame(
        RESULT_UNSUPPORTED,
        control,
        ControlReading {
            value: 0,
            maximum: 0,
        },
    )
}

/// Decode a Get VCP Feature reply for `control`.
pub fn parse_get_vcp_reply(control: ControlId, frame: &[u8]) -> DdcResult<ControlReading> {
    if frame.len() < GET_VCP_REPLY_LEN {
        return Err(DdcError::Reply(format!(
            "reply too short ({} bytes)",
            frame.len()
        )));
    }
    let frame = &frame[..GET_VCP_REPLY_LEN];
    if frame[0] != DISPLAY_WRITE_ADDR || frame[1] != (LENGTH_FLAG | 8) {
        return Err(DdcError::Reply(format!(
            "unexpected reply header {:02x} {:02x}",
            frame[0], frame[1]
        )));
    }
    if xor(VIRTUAL_HOST, &frame[1..GET_VCP_REPLY_LEN - 1]) != frame[GET_VCP_REPLY_LEN - 1] {
        return Err(DdcError::Reply("reply checksum mismatch".into()));
    }
    if frame[2] != OP_GET_VCP_REPLY {
        return Err(DdcError::Reply(format!("unexpected opcode {:02x}", frame[2])));
    }
    if frame[4] != control.0 {
        return Err(DdcError::Reply(format!(
            "reply is for control 0x{:02x}, expected {}",
            frame[4], control
        )));
    }
    match frame[3] {
        RESULT_OK => Ok(ControlReading {
            maximum: u16::from_be_bytes([frame[6], frame[7]]),
            value: u16::from_be_bytes([frame[8], frame[9]]),
        }),
        RESULT_UNSUPPORTED => Err(DdcError::Unsupported(control.0)),
        other => Err(DdcError::Reply(format!("result code {:02x}", other))),
    }
}
