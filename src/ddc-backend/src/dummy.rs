// SPDX-FileCopyrightText: 2025 Stanislaw Grams <stanislawgrams@gmail.com>
//
// SPDX-License-Identifier: BSD-2-Clause

//! Dummy bus backend for development and testing.
//!
//! Emulates DDC/CI displays in memory and answers VCP requests immediately.
//! No hardware or kernel module required.

use std::collections::BTreeMap;

use ddc_core::vcp::{self, VcpRequest, DDCCI_ADDR};
use ddc_core::{
    BusDescriptor, ControlReading, DdcError, DdcResult, DeviceId, Direction, TransferRequest,
};

use crate::{BusBackend, BusFuture};

const EIO: i32 = -5;
const ENXIO: i32 = -6;

/// One emulated display.
#[derive(Debug, Clone)]
pub struct DummyMonitor {
    bus: BusDescriptor,
    registers: BTreeMap<u8, ControlReading>,
    flaky_reads: u32,
}

impl DummyMonitor {
    /// A display with brightness, contrast, input source and volume.
    pub fn new(bus: BusDescriptor) -> Self {
        Self {
            bus,
            registers: BTreeMap::new(),
            flaky_reads: 0,
        }
        .with_control(0x10, 50, 100)
        .with_control(0x12, 50, 100)
        .with_control(0x60, 0x0f, 0x12)
        .with_control(0x62, 30, 100)
    }

    pub fn with_control(mut self, control: u8, value: u16, maximum: u16) -> Self {
        self.registers
            .insert(control, ControlReading { value, maximum });
        self
    }

    /// Make the next `count` reads fail with an I/O error.
    pub fn with_flaky_reads(mut self, count: u32) -> Self {
        self.flaky_reads = count;
        self
    }

    pub fn bus(&self) -> BusDescriptor {
        self.bus
    }

    pub fn reading(&self, control: u8) -> Option<ControlReading> {
        self.registers.get(&control).copied()
    }

    fn apply(&mut self, request: VcpRequest) -> Option<Vec<u8>> {
        match request {
            VcpRequest::Get(control) => Some(match self.registers.get(&control.0) {
                Some(reading) => vcp::get_vcp_reply(control, *reading),
                None => vcp::unsupported_reply(control),
            }),
            VcpRequest::Set(control, value) => {
                if let Some(reading) = self.registers.get_mut(&control.0) {
                    reading.value = value;
                }
                None
            }
        }
    }
}

/// In-memory bus with a fixed set of displays.
pub struct DummyBus {
    monitors: Vec<DummyMonitor>,
    open: Option<usize>,
    pending_reply: Option<Vec<u8>>,
}

impl DummyBus {
    pub fn new(monitors: Vec<DummyMonitor>) -> Self {
        Self {
            monitors,
            open: None,
            pending_reply: None,
        }
    }

    /// `count` displays on `/dev/i2c-0` .. `/dev/i2c-<count-1>`.
    pub fn with_monitor_count(count: usize) -> Self {
        Self::new(
            (0..count)
                .map(|index| DummyMonitor::new(BusDescriptor::i2c_dev(index as i32)))
                .collect(),
        )
    }

    pub fn monitor(&self, bus: BusDescriptor) -> Option<&DummyMonitor> {
        self.monitors.iter().find(|m| m.bus == bus)
    }

    fn transfer_sync(&mut self, request: TransferRequest) -> DdcResult<Vec<u8>> {
        let address = request.address;
        let fail = |status| DdcError::Transfer { address, status };

        let index = self.open.ok_or_else(|| fail(EIO))?;
        if address != DDCCI_ADDR {
            return Err(fail(ENXIO));
        }
        let monitor = &mut self.monitors[index];

        match request.direction {
            Direction::Write => {
                let parsed = vcp::parse_request(&request.payload).map_err(|_| fail(EIO))?;
                self.pending_reply = monitor.apply(parsed);
                Ok(Vec::new())
            }
            Direction::Read => {
                if monitor.flaky_reads > 0 {
                    monitor.flaky_reads -= 1;
                    return Err(fail(EIO));
                }
                let mut reply = self.pending_reply.take().ok_or_else(|| fail(EIO))?;
                reply.resize(request.length, 0);
                Ok(reply)
            }
        }
    }
}

impl BusBackend for DummyBus {
    fn name(&self) -> &str {
        "dummy"
    }

    fn enumerate<'a>(&'a mut self) -> BusFuture<'a, Vec<BusDescriptor>> {
        let buses = self.monitors.iter().map(|m| m.bus).collect();
        Box::pin(async move { Ok(buses) })
    }

    fn open<'a>(&'a mut self, bus: BusDescriptor) -> BusFuture<'a, ()> {
        let result = match self.monitors.iter().position(|m| m.bus == bus) {
            Some(index) => {
                self.open = Some(index);
                self.pending_reply = None;
                Ok(())
            }
            None => Err(DdcError::Open {
                device: DeviceId::from_bus(&bus).to_string(),
                status: ENXIO,
            }),
        };
        Box::pin(async move { result })
    }

    fn transfer<'a>(&'a mut self, request: TransferRequest) -> BusFuture<'a, Vec<u8>> {
        let result = self.transfer_sync(request);
        Box::pin(async move { result })
    }

    fn close<'a>(&'a mut self) -> BusFuture<'a, ()> {
        self.open = None;
        self.pending_reply = None;
        Box::pin(async { Ok(()) })
    }
}
