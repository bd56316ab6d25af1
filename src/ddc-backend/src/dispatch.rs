// SPDX-FileCopyrightText: 2025 Stanislaw Grams <stanislawgrams@gmail.com>
//
// SPDX-License-Identifier: BSD-2-Clause

//! Helper side of the query/answer protocol.

use std::io::ErrorKind;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{debug, info, warn};

use ddc_core::{BusDescriptor, DdcResult, Direction};
use ddc_protocol::wire::{decode_query, encode_answer, Answer, Query, QUERY_SIZE};

use crate::BusBackend;

/// Turns queries into answers against one backend.
pub struct Dispatcher {
    backend: Box<dyn BusBackend>,
    open: Option<BusDescriptor>,
}

impl Dispatcher {
    pub fn new(backend: Box<dyn BusBackend>) -> Self {
        Self {
            backend,
            open: None,
        }
    }

    pub fn open_bus(&self) -> Option<BusDescriptor> {
        self.open
    }

    /// Handle one query; enumeration yields several answers, everything
    /// else exactly one.
    pub async fn handle(&mut self, query: Query) -> Vec<Answer> {
        match query {
            Query::Enumerate => {
                let mut answers = match self.backend.enumerate().await {
                    Ok(buses) => buses.into_iter().map(Answer::bus_entry).collect(),
                    Err(e) => {
                        warn!("Bus enumeration failed: {}", e);
                        Vec::new()
                    }
                };
                answers.push(Answer::end_of_list());
                answers
            }
            Query::Open { bus } => {
                self.release().await;
                match self.backend.open(bus).await {
                    Ok(()) => {
                        debug!("Opened bus {:?}", bus);
                        self.open = Some(bus);
                        vec![Answer::ok(0)]
                    }
                    Err(e) => {
                        warn!("Open failed: {}", e);
                        vec![Answer::failed()]
                    }
                }
            }
            Query::Transfer(request) => {
                if self.open.is_none() {
                    warn!("Transfer without an open bus");
                    return vec![Answer::failed()];
                }
                let direction = request.direction;
                let written = request.payload.len() as u32;
                match self.backend.transfer(request).await {
                    Ok(data) => match direction {
                        Direction::Write => vec![Answer::ok(written)],
                        Direction::Read => vec![Answer::data(data)],
                    },
                    Err(e) => {
                        debug!("Transfer failed: {}", e);
                        vec![Answer::failed()]
                    }
                }
            }
            Query::Close => {
                self.release().await;
                vec![Answer::ok(0)]
            }
        }
    }

    async fn release(&mut self) {
        if self.open.take().is_some() {
            if let Err(e) = self.backend.close().await {
                warn!("Close failed: {}", e);
            }
        }
    }

    /// Serve fixed-size query records until the reader reaches end of file.
    ///
    /// A record that does not decode is answered with a failure so the
    /// peer stays in lock-step.
    pub async fn serve<R, W>(&mut self, mut reader: R, mut writer: W) -> DdcResult<()>
    where
        R: AsyncRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        info!("Serving queries with {} backend", self.backend.name());
        let mut record = vec![0u8; QUERY_SIZE];
        loop {
            match reader.read_exact(&mut record).await {
                Ok(_) => {}
                Err(e) if e.kind() == ErrorKind::UnexpectedEof => break,
                Err(e) => return Err(e.into()),
            }

            let answers = match decode_query(&record) {
                Ok(query) => self.handle(query).await,
                Err(e) => {
                    warn!("Rejecting query: {}", e);
                    vec![Answer::failed()]
                }
            };

            for answer in &answers {
                writer.write_all(&encode_answer(answer)?).await?;
            }
            writer.flush().await?;
        }

        self.release().await;
        info!("Query channel closed");
        Ok(())
    }
}
