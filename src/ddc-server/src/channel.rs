// SPDX-FileCopyrightText: 2025 Stanislaw Grams <stanislawgrams@gmail.com>
//
// SPDX-License-Identifier: BSD-2-Clause

//! Record channel to the privileged helper.

use std::future::Future;
use std::io::ErrorKind;
use std::pin::Pin;
use std::process::Stdio;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tracing::{debug, info};

use ddc_core::{DdcError, DdcResult};
use ddc_protocol::wire::{decode_answer, encode_query, Answer, Query, ANSWER_SIZE};

use crate::config::HelperProcessConfig;

pub type ChannelFuture<'a, T> = Pin<Box<dyn Future<Output = DdcResult<T>> + Send + 'a>>;

/// Lock-step transport of fixed-size records.
///
/// Callers must not send a query before the answers to the previous one
/// were received.
pub trait HelperChannel: Send {
    fn send<'a>(&'a mut self, record: &'a [u8]) -> ChannelFuture<'a, ()>;

    /// Receive one answer record of exactly `ANSWER_SIZE` bytes.
    fn recv<'a>(&'a mut self) -> ChannelFuture<'a, Vec<u8>>;
}

/// Channel over any byte stream pair.
pub struct StreamChannel<R, W> {
    reader: R,
    writer: W,
}

impl<R, W> StreamChannel<R, W> {
    pub fn new(reader: R, writer: W) -> Self {
        Self { reader, writer }
    }
}

impl<R, W> HelperChannel for StreamChannel<R, W>
where
    R: AsyncRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    fn send<'a>(&'a mut self, record: &'a [u8]) -> ChannelFuture<'a, ()> {
        Box::pin(async move {
            self.writer.write_all(record).await?;
            self.writer.flush().await?;
            Ok(())
        })
    }

    fn recv<'a>(&'a mut self) -> ChannelFuture<'a, Vec<u8>> {
        Box::pin(async move {
            let mut record = vec![0u8; ANSWER_SIZE];
            match self.reader.read_exact(&mut record).await {
                Ok(_) => Ok(record),
                Err(e) if e.kind() == ErrorKind::UnexpectedEof => {
                    Err(DdcError::channel("helper closed the channel"))
                }
                Err(e) => Err(e.into()),
            }
        })
    }
}

/// Helper spawned as a child process, speaking over its stdin/stdout.
///
/// The child is killed when the channel is dropped.
pub struct ProcessChannel {
    child: Child,
    stream: StreamChannel<ChildStdout, ChildStdin>,
}

impl ProcessChannel {
    pub fn spawn(config: &HelperProcessConfig) -> DdcResult<Self> {
        let args = config.command_args();
        info!("Starting helper: {} {}", config.path, args.join(" "));
        let mut child = Command::new(&config.path)
            .args(&args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| DdcError::channel(format!("failed to start {}: {}", config.path, e)))?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| DdcError::channel("helper stdin is not piped"))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| DdcError::channel("helper stdout is not piped"))?;
        debug!("Helper running with pid {:?}", child.id());

        Ok(Self {
            child,
            stream: StreamChannel::new(stdout, stdin),
        })
    }

    pub fn pid(&self) -> Option<u32> {
        self.child.id()
    }
}

impl HelperChannel for ProcessChannel {
    fn send<'a>(&'a mut self, record: &'a [u8]) -> ChannelFuture<'a, ()> {
        self.stream.send(record)
    }

    fn recv<'a>(&'a mut self) -> ChannelFuture<'a, Vec<u8>> {
        self.stream.recv()
    }
}

/// Send one query and decode the first answer.
pub async fn exchange(channel: &mut dyn HelperChannel, query: &Query) -> DdcResult<Answer> {
    let record = encode_query(query)?;
    channel.send(&record).await?;
    receive(channel).await
}

/// Decode the next answer of a multi-answer reply.
pub async fn receive(channel: &mut dyn HelperChannel) -> DdcResult<Answer> {
    let record = channel.recv().await?;
    decode_answer(&record)
}
