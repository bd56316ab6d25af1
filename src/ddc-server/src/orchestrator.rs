// SPDX-FileCopyrightText: 2025 Stanislaw Grams <stanislawgrams@gmail.com>
//
// SPDX-License-Identifier: BSD-2-Clause

//! Entry point for device-control requests.
//!
//! Validates identifiers, serialises access to the helper channel, opens one
//! session per request and always closes it before answering.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use ddc_core::events::{ControlEventEmitter, ControlListener, ListenerId};
use ddc_core::{
    ControlChanged, ControlId, ControlReading, DdcError, DdcResult, DeviceId, MonitorDb,
};
use ddc_protocol::wire::{Query, Status};

use crate::channel::{exchange, receive, HelperChannel};
use crate::config::MonitorConfig;
use crate::engine::ControlEngine;
use crate::session::BusSession;

/// Upper bound on enumeration answers from one helper reply.
const MAX_BUSES: usize = 256;

/// Control metadata by device, with an optional catch-all entry.
#[derive(Debug, Clone, Default)]
pub struct MetadataCatalog {
    by_device: HashMap<DeviceId, MonitorDb>,
    fallback: Option<MonitorDb>,
}

impl MetadataCatalog {
    pub fn from_config(monitors: &[MonitorConfig]) -> Self {
        let mut catalog = Self::default();
        for monitor in monitors {
            match monitor.device.as_deref() {
                Some(device) => {
                    catalog
                        .by_device
                        .insert(DeviceId::from(device), monitor.database());
                }
                None => catalog.fallback = Some(monitor.database()),
            }
        }
        catalog
    }

    pub fn insert(&mut self, device: DeviceId, db: MonitorDb) {
        self.by_device.insert(device, db);
    }

    pub fn for_device(&self, device: &DeviceId) -> Option<&MonitorDb> {
        self.by_device.get(device).or(self.fallback.as_ref())
    }
}

pub struct Orchestrator {
    channel: Mutex<Box<dyn HelperChannel>>,
    engine: ControlEngine,
    catalog: MetadataCatalog,
    honor_write_delay: bool,
    poisoned: AtomicBool,
    events: ControlEventEmitter,
}

impl Orchestrator {
    pub fn new(
        channel: Box<dyn HelperChannel>,
        engine: ControlEngine,
        catalog: MetadataCatalog,
    ) -> Self {
        Self {
            channel: Mutex::new(channel),
            engine,
            catalog,
            honor_write_delay: true,
            poisoned: AtomicBool::new(false),
            events: ControlEventEmitter::new(),
        }
    }

    /// Wait out a control's write delay before releasing the session.
    pub fn with_write_delay(mut self, honor: bool) -> Self {
        self.honor_write_delay = honor;
        self
    }

    pub fn register_listener(&mut self, listener: Arc<dyn ControlListener>) -> ListenerId {
        self.events.register(listener)
    }

    pub fn is_poisoned(&self) -> bool {
        self.poisoned.load(Ordering::Acquire)
    }

    fn check_channel(&self) -> DdcResult<()> {
        if self.is_poisoned() {
            return Err(DdcError::ChannelPoisoned);
        }
        Ok(())
    }

    /// Mark the channel unusable after framing or I/O failures.
    fn track<T>(&self, result: DdcResult<T>) -> DdcResult<T> {
        if let Err(e) = &result {
            if e.is_fatal_to_channel() && !self.poisoned.swap(true, Ordering::AcqRel) {
                error!("Helper channel poisoned: {}", e);
            }
        }
        result
    }

    /// Enumerate every bus the helper reports, in order.
    pub async fn list_devices(&self) -> DdcResult<Vec<DeviceId>> {
        let mut channel = self.channel.lock().await;
        self.check_channel()?;
        let in_flight = InFlight::arm(&self.poisoned);
        let result = enumerate(&mut **channel).await;
        in_flight.disarm();
        self.track(result)
    }

    pub async fn get_control(
        &self,
        device: &DeviceId,
        control: ControlId,
    ) -> DdcResult<ControlReading> {
        device.validate()?;
        let mut channel = self.channel.lock().await;
        self.check_channel()?;

        let in_flight = InFlight::arm(&self.poisoned);
        let opened = BusSession::open(&mut **channel, device).await;
        let reading = match opened {
            Ok(mut session) => {
                let outcome = self.engine.read_control(&mut session, control).await;
                let closed = session.close().await;
                finish(outcome, closed)
            }
            Err(e) => Err(e),
        };
        in_flight.disarm();
        let reading = self.track(reading)?;

        debug!(
            "{} {} = {} (max {})",
            device, control, reading.value, reading.maximum
        );
        Ok(reading)
    }

    /// Write a control and notify listeners once the display took it.
    pub async fn set_control(
        &self,
        device: &DeviceId,
        control: ControlId,
        value: u16,
    ) -> DdcResult<()> {
        device.validate()?;
        let metadata = self.catalog.for_device(device);

        {
            let mut channel = self.channel.lock().await;
            self.check_channel()?;
            let in_flight = InFlight::arm(&self.poisoned);
            let written = match BusSession::open(&mut **channel, device).await {
                Ok(mut session) => {
                    let outcome = self
                        .engine
                        .write_control(&mut session, control, value, metadata)
                        .await;
                    if let Ok(ack) = &outcome {
                        let settle =
                            ack.settle.filter(|d| self.honor_write_delay && !d.is_zero());
                        if let Some(settle) = settle {
                            tokio::time::sleep(settle).await;
                        }
                    }
                    let closed = session.close().await;
                    finish(outcome, closed)
                }
                Err(e) => Err(e),
            };
            in_flight.disarm();
            self.track(written)?;
        }

        info!("{} {} set to {}", device, control, value);
        self.events.notify_control_changed(&ControlChanged {
            device: device.clone(),
            control,
            value,
        });
        Ok(())
    }
}

/// Poisons the channel if a helper exchange is abandoned halfway.
///
/// A request future dropped between a query and its answers (for example by
/// a caller's timeout) leaves unread answers behind and possibly an open bus.
struct InFlight<'a> {
    poisoned: &'a AtomicBool,
    armed: bool,
}

impl<'a> InFlight<'a> {
    fn arm(poisoned: &'a AtomicBool) -> Self {
        Self {
            poisoned,
            armed: true,
        }
    }

    fn disarm(mut self) {
        self.armed = false;
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        if self.armed && !self.poisoned.swap(true, Ordering::AcqRel) {
            warn!("Helper exchange abandoned midway, channel poisoned");
        }
    }
}

async fn enumerate(channel: &mut dyn HelperChannel) -> DdcResult<Vec<DeviceId>> {
    let mut devices = Vec::new();
    let mut answer = exchange(&mut *channel, &Query::Enumerate).await?;
    let mut entries = 0;
    while answer.more_follows {
        entries += 1;
        if entries > MAX_BUSES {
            return Err(DdcError::malformed(format!(
                "helper listed more than {} buses",
                MAX_BUSES
            )));
        }
        match answer.status {
            Status::Ok(_) => devices.push(DeviceId::from_bus(&answer.bus)),
            Status::Failed(status) => warn!("Skipping failed bus entry (status {})", status),
        }
        answer = receive(&mut *channel).await?;
    }
    Ok(devices)
}

/// The request's own error wins unless only the close broke the channel.
fn finish<T>(outcome: DdcResult<T>, closed: DdcResult<()>) -> DdcResult<T> {
    match (outcome, closed) {
        (Ok(value), Ok(())) => Ok(value),
        (Ok(_), Err(close_err)) => Err(close_err),
        (Err(e), Ok(())) => Err(e),
        (Err(e), Err(close_err)) => {
            debug!("Close after failed request also failed: {}", close_err);
            if close_err.is_fatal_to_channel() && !e.is_fatal_to_channel() {
                Err(close_err)
            } else {
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex as StdMutex;
    use std::time::Duration;

    use ddc_backend::{Dispatcher, DummyBus, DummyMonitor};
    use ddc_core::{BusDescriptor, ControlDb, Direction, GroupDb, SubgroupDb};
    use ddc_protocol::wire::Answer;

    use crate::channel::testing::{LoopbackChannel, QueryLog, ScriptedChannel};
    use crate::channel::ChannelFuture;

    const BRIGHTNESS: ControlId = ControlId(0x10);

    #[derive(Default)]
    struct Recorder {
        events: StdMutex<Vec<ControlChanged>>,
    }

    impl ControlListener for Recorder {
        fn on_control_changed(&self, event: &ControlChanged) {
            self.events.lock().unwrap().push(event.clone());
        }
    }

    fn scripted(answers: Vec<Answer>) -> (Orchestrator, QueryLog, Arc<Recorder>) {
        let (channel, log) = ScriptedChannel::new(answers);
        let mut orch = Orchestrator::new(
            Box::new(channel),
            ControlEngine::default(),
            MetadataCatalog::default(),
        );
        let recorder = Arc::new(Recorder::default());
        orch.register_listener(recorder.clone());
        (orch, log, recorder)
    }

    fn loopback(monitors: Vec<DummyMonitor>) -> (Orchestrator, QueryLog) {
        let dispatcher = Dispatcher::new(Box::new(DummyBus::new(monitors)));
        let (channel, log) = LoopbackChannel::new(dispatcher);
        let orch = Orchestrator::new(
            Box::new(channel),
            ControlEngine::default(),
            MetadataCatalog::default(),
        );
        (orch, log)
    }

    fn count(log: &QueryLog, pred: impl Fn(&Query) -> bool) -> usize {
        log.lock().unwrap().iter().filter(|q| pred(q)).count()
    }

    fn opens(log: &QueryLog) -> usize {
        count(log, |q| matches!(q, Query::Open { .. }))
    }

    fn closes(log: &QueryLog) -> usize {
        count(log, |q| matches!(q, Query::Close))
    }

    fn writes(log: &QueryLog) -> usize {
        count(log, |q| {
            matches!(q, Query::Transfer(t) if t.direction == Direction::Write)
        })
    }

    fn input_delay_catalog(device: &str, delay_ms: u64) -> MetadataCatalog {
        let mut catalog = MetadataCatalog::default();
        catalog.insert(
            DeviceId::from(device),
            MonitorDb {
                name: None,
                groups: vec![GroupDb {
                    name: "Input".into(),
                    subgroups: vec![SubgroupDb {
                        name: "Source".into(),
                        controls: vec![ControlDb {
                            name: "input_source".into(),
                            address: 0x60,
                            delay_ms: Some(delay_ms),
                        }],
                    }],
                }],
            },
        );
        catalog
    }

    #[tokio::test]
    async fn test_invalid_device_sends_no_query() {
        let (orch, log, recorder) = scripted(vec![]);
        for bad in [
            "dev:/dev/sda",
            "pci:01:00.0-1",
            "dev:/dev/i2c-",
            "dev:/dev/i2c-1x",
            "/dev/i2c-1",
        ] {
            let device = DeviceId::from(bad);
            assert!(matches!(
                orch.get_control(&device, BRIGHTNESS).await,
                Err(DdcError::InvalidArgument(_))
            ));
            let err = orch.set_control(&device, BRIGHTNESS, 1).await.unwrap_err();
            assert_eq!(err.to_string(), "only 'dev:/dev/i2c-*' devices are allowed");
        }
        assert!(log.lock().unwrap().is_empty());
        assert!(recorder.events.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_list_devices_in_order() {
        let (orch, log, _) = scripted(vec![
            Answer::bus_entry(BusDescriptor::i2c_dev(4)),
            Answer::bus_entry(BusDescriptor {
                bus: 1,
                dev: 0,
                func: 0,
                i2c_index: 2,
            }),
            Answer::end_of_list(),
        ]);
        let devices = orch.list_devices().await.unwrap();
        assert_eq!(
            devices,
            vec![
                DeviceId::from("dev:/dev/i2c-4"),
                DeviceId::from("pci:01:00.0-2")
            ]
        );
        assert_eq!(*log.lock().unwrap(), vec![Query::Enumerate]);
    }

    #[tokio::test]
    async fn test_list_devices_empty() {
        let (orch, _, _) = scripted(vec![Answer::end_of_list()]);
        assert!(orch.list_devices().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_list_devices_is_idempotent() {
        let monitors = vec![
            DummyMonitor::new(BusDescriptor::i2c_dev(1)),
            DummyMonitor::new(BusDescriptor::i2c_dev(6)),
        ];
        let (orch, log) = loopback(monitors);
        let first = orch.list_devices().await.unwrap();
        let second = orch.list_devices().await.unwrap();
        assert_eq!(first, second);
        assert_eq!(
            first,
            vec![
                DeviceId::from("dev:/dev/i2c-1"),
                DeviceId::from("dev:/dev/i2c-6")
            ]
        );
        assert_eq!(count(&log, |q| matches!(q, Query::Enumerate)), 2);
    }

    #[tokio::test]
    async fn test_get_control_end_to_end() {
        let monitor = DummyMonitor::new(BusDescriptor::i2c_dev(2)).with_control(0x10, 75, 100);
        let (orch, log) = loopback(vec![monitor]);
        let reading = orch
            .get_control(&DeviceId::from("dev:/dev/i2c-2"), BRIGHTNESS)
            .await
            .unwrap();
        assert_eq!(
            reading,
            ControlReading {
                value: 75,
                maximum: 100
            }
        );
        assert_eq!(opens(&log), 1);
        assert_eq!(closes(&log), 1);
    }

    #[tokio::test]
    async fn test_get_control_recovers_from_flaky_bus() {
        let monitor = DummyMonitor::new(BusDescriptor::i2c_dev(0)).with_flaky_reads(2);
        let (orch, log) = loopback(vec![monitor]);
        let reading = orch
            .get_control(&DeviceId::from("dev:/dev/i2c-0"), BRIGHTNESS)
            .await
            .unwrap();
        assert_eq!(reading.value, 50);
        assert_eq!(writes(&log), 3);
        assert_eq!(opens(&log), closes(&log));
    }

    #[tokio::test]
    async fn test_get_control_exhaustion_still_closes() {
        let monitor = DummyMonitor::new(BusDescriptor::i2c_dev(0)).with_flaky_reads(10);
        let (orch, log) = loopback(vec![monitor]);
        assert_eq!(
            orch.get_control(&DeviceId::from("dev:/dev/i2c-0"), BRIGHTNESS)
                .await,
            Err(DdcError::ReadExhausted {
                control: 0x10,
                attempts: 3
            })
        );
        assert_eq!(writes(&log), 3);
        assert_eq!(opens(&log), 1);
        assert_eq!(closes(&log), 1);
    }

    #[tokio::test]
    async fn test_get_control_unsupported_closes() {
        let (orch, log) = loopback(vec![DummyMonitor::new(BusDescriptor::i2c_dev(0))]);
        assert_eq!(
            orch.get_control(&DeviceId::from("dev:/dev/i2c-0"), ControlId(0xdf))
                .await,
            Err(DdcError::Unsupported(0xdf))
        );
        assert_eq!(opens(&log), closes(&log));
    }

    #[tokio::test]
    async fn test_open_failure_sends_no_close() {
        let (orch, log) = loopback(vec![DummyMonitor::new(BusDescriptor::i2c_dev(0))]);
        let err = orch
            .get_control(&DeviceId::from("dev:/dev/i2c-9"), BRIGHTNESS)
            .await
            .unwrap_err();
        assert!(matches!(err, DdcError::Open { .. }));
        assert_eq!(opens(&log), 1);
        assert_eq!(closes(&log), 0);
        assert_eq!(writes(&log), 0);
    }

    #[tokio::test]
    async fn test_set_control_writes_once_and_notifies() {
        let (orch, log, recorder) =
            scripted(vec![Answer::ok(0), Answer::ok(7), Answer::ok(0)]);
        let device = DeviceId::from("dev:/dev/i2c-5");
        orch.set_control(&device, BRIGHTNESS, 80).await.unwrap();

        assert_eq!(writes(&log), 1);
        assert_eq!(opens(&log), 1);
        assert_eq!(closes(&log), 1);
        assert_eq!(
            *recorder.events.lock().unwrap(),
            vec![ControlChanged {
                device,
                control: BRIGHTNESS,
                value: 80
            }]
        );
    }

    #[tokio::test]
    async fn test_set_control_failure_does_not_notify() {
        let (orch, log, recorder) =
            scripted(vec![Answer::ok(0), Answer::failed(), Answer::ok(0)]);
        let err = orch
            .set_control(&DeviceId::from("dev:/dev/i2c-5"), BRIGHTNESS, 80)
            .await
            .unwrap_err();
        assert!(matches!(err, DdcError::Write { control: 0x10, .. }));
        assert_eq!(writes(&log), 1);
        assert_eq!(closes(&log), 1);
        assert!(recorder.events.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_set_control_end_to_end() {
        let (orch, _log) = loopback(vec![DummyMonitor::new(BusDescriptor::i2c_dev(3))]);
        let device = DeviceId::from("dev:/dev/i2c-3");
        orch.set_control(&device, ControlId(0x12), 33).await.unwrap();
        let reading = orch.get_control(&device, ControlId(0x12)).await.unwrap();
        assert_eq!(reading.value, 33);
    }

    #[tokio::test(start_paused = true)]
    async fn test_write_delay_holds_session() {
        let (channel, log) =
            ScriptedChannel::new(vec![Answer::ok(0), Answer::ok(7), Answer::ok(0)]);
        let orch = Orchestrator::new(
            Box::new(channel),
            ControlEngine::default(),
            input_delay_catalog("dev:/dev/i2c-1", 200),
        );
        let start = tokio::time::Instant::now();
        orch.set_control(&DeviceId::from("dev:/dev/i2c-1"), ControlId(0x60), 0x11)
            .await
            .unwrap();
        assert!(start.elapsed() >= Duration::from_millis(200));
        assert_eq!(closes(&log), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_write_delay_can_be_disabled() {
        let (channel, _log) =
            ScriptedChannel::new(vec![Answer::ok(0), Answer::ok(7), Answer::ok(0)]);
        let orch = Orchestrator::new(
            Box::new(channel),
            ControlEngine::default(),
            input_delay_catalog("dev:/dev/i2c-1", 200),
        )
        .with_write_delay(false);
        let start = tokio::time::Instant::now();
        orch.set_control(&DeviceId::from("dev:/dev/i2c-1"), ControlId(0x60), 0x11)
            .await
            .unwrap();
        assert!(start.elapsed() < Duration::from_millis(200));
    }

    #[tokio::test]
    async fn test_malformed_answer_poisons_channel() {
        let (orch, log, _) =
            scripted(vec![Answer::ok(0), Answer::ok(5), Answer::data(vec![0; 32])]);
        let device = DeviceId::from("dev:/dev/i2c-1");
        assert!(matches!(
            orch.get_control(&device, BRIGHTNESS).await,
            Err(DdcError::Malformed(_))
        ));
        assert!(orch.is_poisoned());
        let sent = log.lock().unwrap().len();

        assert_eq!(
            orch.get_control(&device, BRIGHTNESS).await,
            Err(DdcError::ChannelPoisoned)
        );
        assert_eq!(orch.list_devices().await, Err(DdcError::ChannelPoisoned));
        assert_eq!(log.lock().unwrap().len(), sent);
    }

    #[tokio::test]
    async fn test_helper_exit_poisons_channel() {
        let (orch, _, _) = scripted(vec![]);
        assert!(matches!(
            orch.list_devices().await,
            Err(DdcError::Channel(_))
        ));
        assert!(orch.is_poisoned());
    }

    /// Loopback helper whose `stall_at`-th answer arrives after `delay`.
    struct SlowChannel {
        inner: LoopbackChannel,
        received: usize,
        stall_at: usize,
        delay: Duration,
    }

    impl HelperChannel for SlowChannel {
        fn send<'a>(&'a mut self, record: &'a [u8]) -> ChannelFuture<'a, ()> {
            self.inner.send(record)
        }

        fn recv<'a>(&'a mut self) -> ChannelFuture<'a, Vec<u8>> {
            Box::pin(async move {
                self.received += 1;
                if self.received == self.stall_at {
                    tokio::time::sleep(self.delay).await;
                }
                self.inner.recv().await
            })
        }
    }

    fn slow_loopback(stall_at: usize, delay: Duration) -> (Orchestrator, QueryLog) {
        let monitor = DummyMonitor::new(BusDescriptor::i2c_dev(0)).with_control(0x10, 40, 100);
        let dispatcher = Dispatcher::new(Box::new(DummyBus::new(vec![monitor])));
        let (inner, log) = LoopbackChannel::new(dispatcher);
        let channel = SlowChannel {
            inner,
            received: 0,
            stall_at,
            delay,
        };
        let orch = Orchestrator::new(
            Box::new(channel),
            ControlEngine::default(),
            MetadataCatalog::default(),
        );
        (orch, log)
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_request_poisons_channel() {
        // Open answers at once, the read reply is late.
        let (orch, log) = slow_loopback(2, Duration::from_millis(300));
        let device = DeviceId::from("dev:/dev/i2c-0");
        let timed_out = tokio::time::timeout(
            Duration::from_millis(100),
            orch.get_control(&device, BRIGHTNESS),
        )
        .await;
        assert!(timed_out.is_err());
        assert!(orch.is_poisoned());
        let sent = log.lock().unwrap().len();

        assert_eq!(
            orch.get_control(&device, BRIGHTNESS).await,
            Err(DdcError::ChannelPoisoned)
        );
        assert_eq!(orch.list_devices().await, Err(DdcError::ChannelPoisoned));
        assert_eq!(log.lock().unwrap().len(), sent);
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_request_that_completes_keeps_channel() {
        let (orch, _) = slow_loopback(2, Duration::from_millis(300));
        let device = DeviceId::from("dev:/dev/i2c-0");
        let reading = tokio::time::timeout(
            Duration::from_secs(5),
            orch.get_control(&device, BRIGHTNESS),
        )
        .await
        .unwrap()
        .unwrap();
        assert_eq!(reading.value, 40);
        assert!(!orch.is_poisoned());
        assert_eq!(
            orch.list_devices().await.unwrap(),
            vec![DeviceId::from("dev:/dev/i2c-0")]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_write_delay_poisons_channel() {
        let (channel, _log) =
            ScriptedChannel::new(vec![Answer::ok(0), Answer::ok(7), Answer::ok(0)]);
        let orch = Orchestrator::new(
            Box::new(channel),
            ControlEngine::default(),
            input_delay_catalog("dev:/dev/i2c-1", 500),
        );
        let timed_out = tokio::time::timeout(
            Duration::from_millis(100),
            orch.set_control(&DeviceId::from("dev:/dev/i2c-1"), ControlId(0x60), 0x11),
        )
        .await;
        assert!(timed_out.is_err());
        assert!(orch.is_poisoned());
    }

    #[tokio::test]
    async fn test_enumeration_is_bounded() {
        let mut answers: Vec<Answer> = (0..=MAX_BUSES as i32)
            .map(|n| Answer::bus_entry(BusDescriptor::i2c_dev(n)))
            .collect();
        answers.push(Answer::end_of_list());
        let (orch, _, _) = scripted(answers);
        assert!(matches!(
            orch.list_devices().await,
            Err(DdcError::Malformed(_))
        ));
        assert!(orch.is_poisoned());
    }

    #[tokio::test]
    async fn test_enumeration_at_limit_succeeds() {
        let mut answers: Vec<Answer> = (0..MAX_BUSES as i32)
            .map(|n| Answer::bus_entry(BusDescriptor::i2c_dev(n)))
            .collect();
        answers.push(Answer::end_of_list());
        let (orch, _, _) = scripted(answers);
        assert_eq!(orch.list_devices().await.unwrap().len(), MAX_BUSES);
        assert!(!orch.is_poisoned());
    }

    #[tokio::test]
    async fn test_failed_bus_entry_is_skipped() {
        let (orch, _, _) = scripted(vec![
            Answer::bus_entry(BusDescriptor::i2c_dev(1)),
            Answer {
                status: Status::Failed(-1),
                more_follows: true,
                bus: BusDescriptor::i2c_dev(2),
                payload: vec![],
            },
            Answer::bus_entry(BusDescriptor::i2c_dev(3)),
            Answer::end_of_list(),
        ]);
        assert_eq!(
            orch.list_devices().await.unwrap(),
            vec![
                DeviceId::from("dev:/dev/i2c-1"),
                DeviceId::from("dev:/dev/i2c-3")
            ]
        );
        assert!(!orch.is_poisoned());
    }

    #[tokio::test]
    async fn test_get_monitors_two_buses() {
        let (orch, _, _) = scripted(vec![
            Answer::bus_entry(BusDescriptor::i2c_dev(0)),
            Answer::bus_entry(BusDescriptor::i2c_dev(1)),
            Answer::end_of_list(),
        ]);
        let devices = orch.list_devices().await.unwrap();
        assert_eq!(devices.len(), 2);
        assert_eq!(devices[0].as_str(), "dev:/dev/i2c-0");
        assert_eq!(devices[1].as_str(), "dev:/dev/i2c-1");
    }

    #[test]
    fn test_catalog_fallback() {
        let catalog = MetadataCatalog::from_config(&[
            MonitorConfig {
                device: Some("dev:/dev/i2c-1".into()),
                name: Some("left".into()),
                groups: Vec::new(),
            },
            MonitorConfig {
                device: None,
                name: Some("any".into()),
                groups: Vec::new(),
            },
        ]);
        let name = |d: &str| {
            catalog
                .for_device(&DeviceId::from(d))
                .and_then(|db| db.name.clone())
        };
        assert_eq!(name("dev:/dev/i2c-1").as_deref(), Some("left"));
        assert_eq!(name("dev:/dev/i2c-2").as_deref(), Some("any"));
    }
}
