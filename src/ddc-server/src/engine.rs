// SPDX-FileCopyrightText: 2025 Stanislaw Grams <stanislawgrams@gmail.com>
//
// SPDX-License-Identifier: BSD-2-Clause

//! Control reads and writes over an open session.
//!
//! Reads are retried within the policy's attempt budget; writes are sent
//! exactly once. The engine never sleeps for a control's write delay, it
//! reports it in the [`WriteAck`] instead.

use std::time::Duration;

use tracing::{debug, info, warn};

use ddc_core::retry::{retry_bounded, FixedAttempts, RetryOutcome, RetryPolicy};
use ddc_core::vcp::{self, DDCCI_ADDR, GET_VCP_REPLY_LEN};
use ddc_core::{ControlId, ControlReading, DdcError, DdcResult, MonitorDb, WriteAck};

use crate::session::BusSession;

pub struct ControlEngine {
    policy: Box<dyn RetryPolicy>,
    reply_delay: Duration,
}

impl Default for ControlEngine {
    fn default() -> Self {
        Self::new(Box::new(FixedAttempts::default_ddc()), Duration::ZERO)
    }
}

impl ControlEngine {
    /// `reply_delay` is the pause between a Get VCP request and its reply.
    pub fn new(policy: Box<dyn RetryPolicy>, reply_delay: Duration) -> Self {
        Self {
            policy,
            reply_delay,
        }
    }

    pub fn max_attempts(&self) -> u32 {
        self.policy.max_attempts()
    }

    pub async fn read_control(
        &self,
        session: &mut BusSession<'_>,
        control: ControlId,
    ) -> DdcResult<ControlReading> {
        let reply_delay = self.reply_delay;
        let outcome = retry_bounded::<_, ControlReading, _>(self.policy.as_ref(), session, |s| {
            Box::pin(read_attempt(s, control, reply_delay))
        })
        .await;

        match outcome {
            RetryOutcome::Success { value, attempts } => {
                if attempts > 1 {
                    debug!("Read {} succeeded after {} attempts", control, attempts);
                }
                Ok(value)
            }
            RetryOutcome::Exhausted { attempts, last } => {
                warn!(
                    "Reading {} failed after {} attempts, last error: {}",
                    control, attempts, last
                );
                Err(DdcError::ReadExhausted {
                    control: control.0,
                    attempts,
                })
            }
            RetryOutcome::Aborted { error, .. } => Err(error),
        }
    }

    pub async fn write_control(
        &self,
        session: &mut BusSession<'_>,
        control: ControlId,
        value: u16,
        metadata: Option<&MonitorDb>,
    ) -> DdcResult<WriteAck> {
        let settle = metadata.and_then(|db| db.write_delay(control));
        match settle {
            Some(delay) => info!(
                "Writing {} = 0x{:04x} ({}) on {} ({}ms delay)",
                control,
                value,
                value,
                session.device(),
                delay.as_millis()
            ),
            None => info!(
                "Writing {} = 0x{:04x} ({}) on {}",
                control,
                value,
                value,
                session.device()
            ),
        }

        match session
            .write(DDCCI_ADDR, vcp::set_vcp_request(control, value))
            .await
        {
            Ok(()) => Ok(WriteAck { settle }),
            Err(e) if e.is_fatal_to_channel() => Err(e),
            Err(e) => Err(DdcError::Write {
                control: control.0,
                reason: e.to_string(),
            }),
        }
    }
}

async fn read_attempt(
    session: &mut BusSession<'_>,
    control: ControlId,
    reply_delay: Duration,
) -> DdcResult<ControlReading> {
    session
        .write(DDCCI_ADDR, vcp::get_vcp_request(control))
        .await?;
    if !reply_delay.is_zero() {
        tokio::time::sleep(reply_delay).await;
    }
    let reply = session.read(DDCCI_ADDR, GET_VCP_REPLY_LEN).await?;
    vcp::parse_get_vcp_reply(control, &reply)
}
