// SPDX-FileCopyrightText: 2025 Stanislaw Grams <stanislawgrams@gmail.com>
//
// SPDX-License-Identifier: BSD-2-Clause

//! JSON-over-TCP listener for ddcd.
//!
//! Each line from a client is one `ServiceCommand`; each line back is a
//! `ServiceResponse` or a `ServiceEvent` notification.

use std::net::SocketAddr;
use std::sync::Arc;

use serde::Serialize;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::OwnedWriteHalf;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::{debug, error, info, warn};

use ddc_core::events::ControlListener;
use ddc_core::{ControlChanged, ControlId, DdcError, DdcResult, DeviceId};
use ddc_protocol::codec::{parse_command, to_line};
use ddc_protocol::mapping::{control_changed_event, error_response, reading_response};
use ddc_protocol::types::{ErrorKind, ServiceCommand, ServiceEvent, ServiceResponse, ServiceResult};

use crate::orchestrator::Orchestrator;

/// Forwards control changes to every connected client.
pub struct BroadcastListener {
    tx: broadcast::Sender<ServiceEvent>,
}

impl BroadcastListener {
    pub fn new(tx: broadcast::Sender<ServiceEvent>) -> Self {
        Self { tx }
    }
}

impl ControlListener for BroadcastListener {
    fn on_control_changed(&self, event: &ControlChanged) {
        // No receivers just means no client is connected.
        let _ = self.tx.send(control_changed_event(event));
    }
}

/// Run the JSON TCP listener, accepting client connections.
pub async fn run_listener(
    addr: SocketAddr,
    orchestrator: Arc<Orchestrator>,
    events: broadcast::Sender<ServiceEvent>,
) -> std::io::Result<()> {
    let listener = TcpListener::bind(addr).await?;
    info!("Listening on {}", addr);
    serve(listener, orchestrator, events).await
}

pub async fn serve(
    listener: TcpListener,
    orchestrator: Arc<Orchestrator>,
    events: broadcast::Sender<ServiceEvent>,
) -> std::io::Result<()> {
    loop {
        let (socket, peer) = listener.accept().await?;
        info!("Client connected: {}", peer);

        let orch = Arc::clone(&orchestrator);
        let rx = events.subscribe();
        tokio::spawn(async move {
            if let Err(e) = handle_client(socket, peer, orch, rx).await {
                error!("Client {} error: {:?}", peer, e);
            }
        });
    }
}

async fn write_line<T: Serialize>(writer: &mut OwnedWriteHalf, message: &T) -> std::io::Result<()> {
    let line = to_line(message)?;
    writer.write_all(line.as_bytes()).await?;
    writer.flush().await
}

async fn handle_client(
    socket: TcpStream,
    addr: SocketAddr,
    orchestrator: Arc<Orchestrator>,
    mut events: broadcast::Receiver<ServiceEvent>,
) -> std::io::Result<()> {
    let (reader, mut writer) = socket.into_split();
    let mut lines = BufReader::new(reader).lines();
    let mut events_open = true;

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else {
                    info!("Client {} disconnected", addr);
                    break;
                };
                let trimmed = line.trim();
                if trimmed.is_empty() {
                    continue;
                }

                let response = match parse_command(trimmed) {
                    Ok(cmd) => {
                        debug!("{} -> {:?}", addr, cmd);
                        execute(&orchestrator, cmd).await
                    }
                    Err(e) => {
                        error!("Invalid JSON from {}: {} / {:?}", addr, trimmed, e);
                        ServiceResponse::error(ErrorKind::Protocol, format!("Invalid JSON: {}", e))
                    }
                };
                write_line(&mut writer, &response).await?;
            }
            event = events.recv(), if events_open => match event {
                Ok(event) => write_line(&mut writer, &event).await?,
                Err(RecvError::Lagged(skipped)) => {
                    warn!("Client {} missed {} notifications", addr, skipped);
                }
                Err(RecvError::Closed) => events_open = false,
            },
        }
    }

    Ok(())
}

fn respond<T>(result: DdcResult<T>, ok: impl FnOnce(T) -> ServiceResponse) -> ServiceResponse {
    match result {
        Ok(value) => ok(value),
        Err(e) => {
            debug!("Request failed: {}", e);
            error_response(&e)
        }
    }
}

/// Resolve transport-level arguments, device first.
fn control_args(device: String, control: u32) -> DdcResult<(DeviceId, ControlId)> {
    let device = DeviceId::new(device);
    device.validate()?;
    Ok((device, ControlId::from_wire(control)?))
}

async fn execute(orchestrator: &Orchestrator, cmd: ServiceCommand) -> ServiceResponse {
    match cmd {
        ServiceCommand::GetMonitors => respond(orchestrator.list_devices().await, |devices| {
            ServiceResponse::ok(ServiceResult::Monitors {
                monitors: devices.iter().map(DeviceId::to_string).collect(),
            })
        }),
        ServiceCommand::GetControl { device, control } => {
            let result = match control_args(device, control) {
                Ok((device, control)) => orchestrator.get_control(&device, control).await,
                Err(e) => Err(e),
            };
            respond(result, reading_response)
        }
        ServiceCommand::SetControl {
            device,
            control,
            value,
        } => {
            let result = match control_args(device, control) {
                Ok((device, control)) => match u16::try_from(value) {
                    Ok(value) => orchestrator.set_control(&device, control, value).await,
                    Err(_) => Err(DdcError::invalid_argument(format!(
                        "value {} is out of range (0-65535)",
                        value
                    ))),
                },
                Err(e) => Err(e),
            };
            respond(result, |()| ServiceResponse::ok(ServiceResult::Ack))
        }
    }
}
