// SPDX-FileCopyrightText: 2025 Stanislaw Grams <stanislawgrams@gmail.com>
//
// SPDX-License-Identifier: BSD-2-Clause

use std::time::Duration;

use thiserror::Error;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::time;
use tracing::debug;

use ddc_protocol::codec::{parse_server_line, to_line};
use ddc_protocol::types::{ErrorKind, ServerLine, ServiceCommand, ServiceEvent, ServiceResponse, ServiceResult};

pub const DEFAULT_REMOTE_PORT: u16 = 4590;
const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
const MAX_JSON_LINE_BYTES: usize = 16 * 1024;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("connecting to {addr} failed: {reason}")]
    Connect { addr: String, reason: String },
    #[error("{0} timed out after {1:?}")]
    Timeout(&'static str, Duration),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid message from ddcd: {0}")]
    Protocol(String),
    #[error("connection closed by ddcd")]
    Closed,
    #[error("{message} ({kind:?})")]
    Remote { kind: ErrorKind, message: String },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RemoteEndpoint {
    pub host: String,
    pub port: u16,
}

impl RemoteEndpoint {
    pub fn connect_addr(&self) -> String {
        if self.host.contains(':') && !self.host.starts_with('[') {
            format!("[{}]:{}", self.host, self.port)
        } else {
            format!("{}:{}", self.host, self.port)
        }
    }
}

/// One JSON-lines connection to ddcd.
pub struct Connection {
    reader: BufReader<OwnedReadHalf>,
    writer: OwnedWriteHalf,
    io_timeout: Duration,
}

impl Connection {
    pub async fn connect(endpoint: &RemoteEndpoint, io_timeout: Duration) -> Result<Self, ClientError> {
        let addr = endpoint.connect_addr();
        let stream = time::timeout(CONNECT_TIMEOUT, TcpStream::connect(&addr))
            .await
            .map_err(|_| ClientError::Timeout("connect", CONNECT_TIMEOUT))?
            .map_err(|e| ClientError::Connect {
                addr: addr.clone(),
                reason: e.to_string(),
            })?;
        debug!("Connected to {}", addr);
        Ok(Self::from_stream(stream, io_timeout))
    }

    pub fn from_stream(stream: TcpStream, io_timeout: Duration) -> Self {
        let (reader, writer) = stream.into_split();
        Self {
            reader: BufReader::new(reader),
            writer,
            io_timeout,
        }
    }

    /// Send a command and wait for its response.
    ///
    /// Notifications arriving in the meantime are skipped.
    pub async fn request(&mut self, cmd: &ServiceCommand) -> Result<ServiceResult, ClientError> {
        let line = to_line(cmd).map_err(|e| ClientError::Protocol(e.to_string()))?;
        time::timeout(self.io_timeout, async {
            self.writer.write_all(line.as_bytes()).await?;
            self.writer.flush().await
        })
        .await
        .map_err(|_| ClientError::Timeout("write", self.io_timeout))??;

        loop {
            let line = time::timeout(self.io_timeout, self.next_line())
                .await
                .map_err(|_| ClientError::Timeout("read", self.io_timeout))??;
            match line {
                ServerLine::Response(resp) => return into_result(resp),
                ServerLine::Event(event) => debug!("Skipping notification {:?}", event),
            }
        }
    }

    /// Wait for the next notification, without a timeout.
    pub async fn next_event(&mut self) -> Result<ServiceEvent, ClientError> {
        loop {
            match self.next_line().await? {
                ServerLine::Event(event) => return Ok(event),
                ServerLine::Response(resp) => debug!("Skipping unsolicited response {:?}", resp),
            }
        }
    }

    async fn next_line(&mut self) -> Result<ServerLine, ClientError> {
        loop {
            let line = read_limited_line(&mut self.reader, MAX_JSON_LINE_BYTES)
                .await?
                .ok_or(ClientError::Closed)?;
            if line.trim().is_empty() {
                continue;
            }
            return parse_server_line(&line).map_err(|e| ClientError::Protocol(e.to_string()));
        }
    }
}

fn into_result(resp: ServiceResponse) -> Result<ServiceResult, ClientError> {
    if resp.success {
        return resp
            .result
            .ok_or_else(|| ClientError::Protocol("response without result".into()));
    }
    Err(ClientError::Remote {
        kind: resp.error_kind.unwrap_or(ErrorKind::Internal),
        message: resp.error.unwrap_or_else(|| "remote error".into()),
    })
}

async fn read_limited_line<R: AsyncBufRead + Unpin>(
    reader: &mut R,
    max_bytes: usize,
) -> std::io::Result<Option<String>> {
    let mut line = Vec::with_capacity(256);
    loop {
        let available = reader.fill_buf().await?;
        if available.is_empty() {
            if line.is_empty() {
                return Ok(None);
            }
            return utf8_line(line).map(Some);
        }

        let (chunk_len, complete) = match available.iter().position(|b| *b == b'\n') {
            Some(pos) => (pos + 1, true),
            None => (available.len(), false),
        };
        if line.len() + chunk_len > max_bytes {
            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                format!("line exceeds maximum size of {max_bytes} bytes"),
            ));
        }
        line.extend_from_slice(&available[..chunk_len]);
        reader.consume(chunk_len);
        if complete {
            return utf8_line(line).map(Some);
        }
    }
}

fn utf8_line(line: Vec<u8>) -> std::io::Result<String> {
    String::from_utf8(line).map_err(|e| {
        std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            format!("line is not valid UTF-8: {e}"),
        )
    })
}

pub fn parse_remote_url(url: &str) -> Result<RemoteEndpoint, String> {
    let trimmed = url.trim();
    if trimmed.is_empty() {
        return Err("remote url is empty".into());
    }

    let addr = trimmed.strip_prefix("tcp://").unwrap_or(trimmed);
    parse_host_port(addr)
}

fn parse_host_port(input: &str) -> Result<RemoteEndpoint, String> {
    if let Some(rest) = input.strip_prefix('[') {
        let closing = rest
            .find(']')
            .ok_or("invalid remote url: missing closing ']' for IPv6 host")?;
        let host = &rest[..closing];
        let remainder = &rest[closing + 1..];
        if host.is_empty() {
            return Err("invalid remote url: host is empty".into());
        }
        let port = if remainder.is_empty() {
            DEFAULT_REMOTE_PORT
        } else if let Some(port_str) = remainder.strip_prefix(':') {
            parse_port(port_str)?
        } else {
            return Err("invalid remote url: expected ':<port>' after ']'".into());
        };
        return Ok(RemoteEndpoint {
            host: host.to_string(),
            port,
        });
    }

    if input.contains(':') {
        if input.matches(':').count() > 1 {
            return Err(format!(
                "invalid remote url: IPv6 host must be bracketed like [::1]:{}",
                DEFAULT_REMOTE_PORT
            ));
        }
        let (host, port_str) = input
            .rsplit_once(':')
            .ok_or("invalid remote url: expected host:port")?;
        if host.is_empty() {
            return Err("invalid remote url: host is empty".into());
        }
        return Ok(RemoteEndpoint {
            host: host.to_string(),
            port: parse_port(port_str)?,
        });
    }

    Ok(RemoteEndpoint {
        host: input.to_string(),
        port: DEFAULT_REMOTE_PORT,
    })
}

fn parse_port(port_str: &str) -> Result<u16, String> {
    let port: u16 = port_str
        .parse()
        .map_err(|_| format!("invalid remote port: '{port_str}'"))?;
    if port == 0 {
        return Err("invalid remote port: 0".into());
    }
    Ok(port)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    use ddc_protocol::codec::parse_command;

    #[test]
    fn parse_host_default_port() {
        let parsed = parse_remote_url("localhost").expect("must parse");
        assert_eq!(
            parsed,
            RemoteEndpoint {
                host: "localhost".to_string(),
                port: 4590
            }
        );
    }

    #[test]
    fn parse_ipv4_with_port() {
        let parsed = parse_remote_url("tcp://127.0.0.1:9000").expect("must parse");
        assert_eq!(parsed.connect_addr(), "127.0.0.1:9000");
    }

    #[test]
    fn parse_bracketed_ipv6() {
        let parsed = parse_remote_url("[::1]:7000").expect("must parse");
        assert_eq!(parsed.host, "::1");
        assert_eq!(parsed.connect_addr(), "[::1]:7000");
    }

    #[test]
    fn reject_bad_urls() {
        assert!(parse_remote_url("").is_err());
        assert!(parse_remote_url("::1:7000")
            .unwrap_err()
            .contains("must be bracketed"));
        assert!(parse_remote_url("host:0").is_err());
        assert!(parse_remote_url("host:http").is_err());
    }

    #[test]
    fn ipv6_hint_uses_default_port() {
        let err = parse_remote_url("fe80::1").unwrap_err();
        assert!(err.ends_with(&format!("[::1]:{}", DEFAULT_REMOTE_PORT)));
    }

    #[tokio::test]
    async fn read_limited_line_rejects_oversized() {
        let data = vec![b'a'; 64];
        let mut reader = BufReader::new(&data[..]);
        assert!(read_limited_line(&mut reader, 16).await.is_err());
    }

    #[tokio::test]
    async fn read_limited_line_splits_lines() {
        let data = b"first\nsecond";
        let mut reader = BufReader::new(&data[..]);
        assert_eq!(
            read_limited_line(&mut reader, 64).await.unwrap().as_deref(),
            Some("first\n")
        );
        assert_eq!(
            read_limited_line(&mut reader, 64).await.unwrap().as_deref(),
            Some("second")
        );
        assert_eq!(read_limited_line(&mut reader, 64).await.unwrap(), None);
    }

    async fn connected_pair() -> (Connection, TcpStream) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let client = TcpStream::connect(addr).await.unwrap();
        let (server, _) = listener.accept().await.unwrap();
        (
            Connection::from_stream(client, Duration::from_secs(5)),
            server,
        )
    }

    #[tokio::test]
    async fn request_skips_notifications() {
        let (mut conn, server) = connected_pair().await;
        let peer = tokio::spawn(async move {
            let (reader, mut writer) = server.into_split();
            let mut lines = BufReader::new(reader).lines();
            let line = lines.next_line().await.unwrap().unwrap();
            let cmd = parse_command(&line).unwrap();
            writer
                .write_all(
                    concat!(
                        r#"{"event":"control_changed","device":"dev:/dev/i2c-1","control":16,"value":1}"#,
                        "\n",
                        r#"{"success":true,"result":{"kind":"control","value":50,"maximum":100}}"#,
                        "\n"
                    )
                    .as_bytes(),
                )
                .await
                .unwrap();
            cmd
        });

        let cmd = ServiceCommand::GetControl {
            device: "dev:/dev/i2c-1".into(),
            control: 0x10,
        };
        let result = conn.request(&cmd).await.unwrap();
        assert_eq!(
            result,
            ServiceResult::Control {
                value: 50,
                maximum: 100
            }
        );
        assert_eq!(peer.await.unwrap(), cmd);
    }

    #[tokio::test]
    async fn request_maps_remote_errors() {
        let (mut conn, server) = connected_pair().await;
        tokio::spawn(async move {
            let (reader, mut writer) = server.into_split();
            let mut lines = BufReader::new(reader).lines();
            let _ = lines.next_line().await;
            writer
                .write_all(
                    b"{\"success\":false,\"error\":\"control 0x10 is not supported by the display\",\"error_kind\":\"unsupported\"}\n",
                )
                .await
                .unwrap();
        });

        let err = conn
            .request(&ServiceCommand::GetMonitors)
            .await
            .unwrap_err();
        match err {
            ClientError::Remote { kind, message } => {
                assert_eq!(kind, ErrorKind::Unsupported);
                assert!(message.contains("not supported"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn closed_connection_is_reported() {
        let (mut conn, server) = connected_pair().await;
        drop(server);
        assert!(matches!(
            conn.next_event().await,
            Err(ClientError::Closed) | Err(ClientError::Io(_))
        ));
    }
}
