// SPDX-FileCopyrightText: 2025 Stanislaw Grams <stanislawgrams@gmail.com>
//
// SPDX-License-Identifier: BSD-2-Clause

//! Fixed-layout query/answer records exchanged with the privileged helper.
//!
//! All integers are little-endian. Fields that do not apply to a query kind
//! are zero on the wire; decoding never looks at them.
//!
//! Query (280 bytes):
//!
//! | offset | field       | type     |
//! |--------|-------------|----------|
//! | 0      | kind        | i32      |
//! | 4      | bus         | u16      |
//! | 6      | dev         | u8       |
//! | 7      | func        | u8       |
//! | 8      | i2c_index   | i32      |
//! | 12     | address     | i32      |
//! | 16     | flags       | i32      |
//! | 20     | length      | i32      |
//! | 24     | payload     | [u8;256] |
//!
//! Answer (272 bytes): status i32, more_follows i32, bus descriptor (8 bytes),
//! payload [u8;256].

use ddc_core::bus::{BusDescriptor, Direction, TransferRequest, MAX_PAYLOAD};
use ddc_core::{DdcError, DdcResult};

pub const QUERY_SIZE: usize = 24 + MAX_PAYLOAD;
pub const ANSWER_SIZE: usize = 16 + MAX_PAYLOAD;

/// `flags` bit marking a read transfer (matches the kernel's `I2C_M_RD`).
pub const FLAG_READ: i32 = 0x0001;

const KIND_LIST: i32 = 0;
const KIND_OPEN: i32 = 1;
const KIND_DATA: i32 = 2;
const KIND_QUIT: i32 = 3;

const BUS_OFFSET_QUERY: usize = 4;
const BUS_OFFSET_ANSWER: usize = 8;
const QUERY_PAYLOAD: usize = 24;
const ANSWER_PAYLOAD: usize = 16;

/// Daemon-to-helper message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Query {
    /// List every bus the helper can reach.
    Enumerate,
    /// Bind the channel to one bus for subsequent transfers.
    Open { bus: BusDescriptor },
    Transfer(TransferRequest),
    /// Release the bus bound by `Open`.
    Close,
}

/// Status word of an answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    /// Success; bytes read or written for transfers.
    Ok(u32),
    /// The helper reported a failure (raw negative value).
    Failed(i32),
}

impl Status {
    pub fn is_ok(&self) -> bool {
        matches!(self, Status::Ok(_))
    }

    pub fn raw(&self) -> i32 {
        match *self {
            Status::Ok(n) => n as i32,
            Status::Failed(code) => code,
        }
    }
}

/// Helper-to-daemon message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Answer {
    pub status: Status,
    /// Only meaningful for enumeration: another bus answer follows.
    pub more_follows: bool,
    /// Only meaningful for enumeration.
    pub bus: BusDescriptor,
    /// Bytes read; at most `status` bytes long.
    pub payload: Vec<u8>,
}

impl Answer {
    pub fn ok(count: u32) -> Self {
        Self {
            status: Status::Ok(count),
            more_follows: false,
            bus: BusDescriptor::default(),
            payload: Vec::new(),
        }
    }

    pub fn failed() -> Self {
        Self {
            status: Status::Failed(-1),
            ..Self::ok(0)
        }
    }

    pub fn data(payload: Vec<u8>) -> Self {
        Self {
            status: Status::Ok(payload.len() as u32),
            payload,
            ..Self::ok(0)
        }
    }

    /// One enumerated bus; `more_follows` is always set.
    pub fn bus_entry(bus: BusDescriptor) -> Self {
        Self {
            more_follows: true,
            bus,
            ..Self::ok(0)
        }
    }

    /// Terminator of an enumeration sequence.
    pub fn end_of_list() -> Self {
        Self::ok(0)
    }
}

fn put_i32(buf: &mut [u8], offset: usize, value: i32) {
    buf[offset..offset + 4].copy_from_slice(&value.to_le_bytes());
}

fn get_i32(buf: &[u8], offset: usize) -> i32 {
    let mut raw = [0u8; 4];
    raw.copy_from_slice(&buf[offset..offset + 4]);
    i32::from_le_bytes(raw)
}

fn put_bus(buf: &mut [u8], offset: usize, bus: &BusDescriptor) {
    buf[offset..offset + 2].copy_from_slice(&bus.bus.to_le_bytes());
    buf[offset + 2] = bus.dev;
    buf[offset + 3] = bus.func;
    put_i32(buf, offset + 4, bus.i2c_index);
}

fn get_bus(buf: &[u8], offset: usize) -> BusDescriptor {
    BusDescriptor {
        bus: u16::from_le_bytes([buf[offset], buf[offset + 1]]),
        dev: buf[offset + 2],
        func: buf[offset + 3],
        i2c_index: get_i32(buf, offset + 4),
    }
}

fn check_payload(len: usize) -> DdcResult<()> {
    if len > MAX_PAYLOAD {
        return Err(DdcError::PayloadTooLarge {
            len,
            max: MAX_PAYLOAD,
        });
    }
    Ok(())
}

fn check_record(bytes: &[u8], expected: usize, what: &str) -> DdcResult<()> {
    if bytes.len() != expected {
        return Err(DdcError::malformed(format!(
            "{} record is {} bytes, expected {}",
            what,
            bytes.len(),
            expected
        )));
    }
    Ok(())
}

/// Serialize a query into its fixed-size record.
pub fn encode_query(query: &Query) -> DdcResult<Vec<u8>> {
    let mut buf = vec![0u8; QUERY_SIZE];
    match query {
        Query::Enumerate => put_i32(&mut buf, 0, KIND_LIST),
        Query::Open { bus } => {
            put_i32(&mut buf, 0, KIND_OPEN);
            put_bus(&mut buf, BUS_OFFSET_QUERY, bus);
        }
        Query::Transfer(req) => {
            check_payload(req.length)?;
            check_payload(req.payload.len())?;
            put_i32(&mut buf, 0, KIND_DATA);
            put_i32(&mut buf, 12, i32::from(req.address));
            match req.direction {
                Direction::Read => {
                    put_i32(&mut buf, 16, FLAG_READ);
                    put_i32(&mut buf, 20, req.length as i32);
                }
                Direction::Write => {
                    put_i32(&mut buf, 16, 0);
                    put_i32(&mut buf, 20, req.payload.len() as i32);
                    buf[QUERY_PAYLOAD..QUERY_PAYLOAD + req.payload.len()]
                        .copy_from_slice(&req.payload);
                }
            }
        }
        Query::Close => put_i32(&mut buf, 0, KIND_QUIT),
    }
    Ok(buf)
}

/// Parse a query record (helper side).
pub fn decode_query(bytes: &[u8]) -> DdcResult<Query> {
    check_record(bytes, QUERY_SIZE, "query")?;
    match get_i32(bytes, 0) {
        KIND_LIST => Ok(Query::Enumerate),
        KIND_OPEN => Ok(Query::Open {
            bus: get_bus(bytes, BUS_OFFSET_QUERY),
        }),
        KIND_DATA => {
            let address = get_i32(bytes, 12);
            let address = u16::try_from(address)
                .map_err(|_| DdcError::malformed(format!("address {} out of range", address)))?;
            let flags = get_i32(bytes, 16);
            let length = get_i32(bytes, 20);
            let length = usize::try_from(length)
                .map_err(|_| DdcError::malformed(format!("negative length {}", length)))?;
            check_payload(length)?;
            if flags & FLAG_READ != 0 {
                TransferRequest::read(address, length).map(Query::Transfer)
            } else {
                let payload = bytes[QUERY_PAYLOAD..QUERY_PAYLOAD + length].to_vec();
                TransferRequest::write(address, payload).map(Query::Transfer)
            }
        }
        KIND_QUIT => Ok(Query::Close),
        other => Err(DdcError::malformed(format!("unknown query kind {}", other))),
    }
}

/// Serialize an answer into its fixed-size record (helper side).
pub fn encode_answer(answer: &Answer) -> DdcResult<Vec<u8>> {
    check_payload(answer.payload.len())?;
    let mut buf = vec![0u8; ANSWER_SIZE];
    put_i32(&mut buf, 0, answer.status.raw());
    put_i32(&mut buf, 4, i32::from(answer.more_follows));
    put_bus(&mut buf, BUS_OFFSET_ANSWER, &answer.bus);
    buf[ANSWER_PAYLOAD..ANSWER_PAYLOAD + answer.payload.len()].copy_from_slice(&answer.payload);
    Ok(buf)
}

/// Parse an answer record.
pub fn decode_answer(bytes: &[u8]) -> DdcResult<Answer> {
    check_record(bytes, ANSWER_SIZE, "answer")?;
    let raw_status = get_i32(bytes, 0);
    let more_follows = match get_i32(bytes, 4) {
        0 => false,
        1 => true,
        other => {
            return Err(DdcError::malformed(format!(
                "more_follows must be 0 or 1, got {}",
                other
            )))
        }
    };
    let (status, payload) = if raw_status >= 0 {
        let count = raw_status as usize;
        if count > MAX_PAYLOAD {
            return Err(DdcError::malformed(format!(
                "status {} exceeds the payload buffer",
                raw_status
            )));
        }
        (
            Status::Ok(raw_status as u32),
            bytes[ANSWER_PAYLOAD..ANSWER_PAYLOAD + count].to_vec(),
        )
    } else {
        (Status::Failed(raw_status), Vec::new())
    };
    Ok(Answer {
        status,
        more_follows,
        bus: get_bus(bytes, BUS_OFFSET_ANSWER),
        payload,
    })
}
