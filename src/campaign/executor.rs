use std::time::Duration;

use async_trait::async_trait;

use crate::domain::{RunContext, RunTally};
use crate::errors::Error;

use super::message_builder::OutgoingEmail;

/// Abstraction over message delivery.
#[async_trait]
pub trait Transport: Send {
    /// Opens and authenticates a session.
    async fn connect(&mut self) -> Result<(), Error>;

    /// Delivers one message over the open session.
    async fn send(&mut self, email: &OutgoingEmail) -> Result<(), Error>;

    /// Closes the session. Never fails; problems are only logged.
    async fn disconnect(&mut self);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connected,
}

/// Sends delivery units one after another over a single transport session
/// and keeps the tally.
pub struct DispatchExecutor<'a, T: ?Sized> {
    transport: &'a mut T,
    ctx: &'a RunContext,
    state: ConnectionState,
    delay: Duration,
    tally: RunTally,
}

impl<'a, T> DispatchExecutor<'a, T>
where
    T: Transport + ?Sized,
{
    pub fn new(transport: &'a mut T, ctx: &'a RunContext, delay: Duration) -> Self {
        Self {
            transport,
            ctx,
            state: ConnectionState::Disconnected,
            delay,
            tally: RunTally::default(),
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn tally(&self) -> RunTally {
        self.tally
    }

    /// Connects unless a session is already open.
    pub async fn open(&mut self) -> Result<(), Error> {
        if self.state == ConnectionState::Connected {
            return Ok(());
        }
        match self.transport.connect().await {
            Ok(()) => {
                self.state = ConnectionState::Connected;
                log::info!("{}: connected to mail server", self.ctx);
                Ok(())
            }
            Err(e) => {
                log::error!("{}: connection error: {}", self.ctx, e);
                Err(e)
            }
        }
    }

    /// Closes the session if one is open.
    pub async fn close(&mut self) {
        if self.state == ConnectionState::Connected {
            self.transport.disconnect().await;
            self.state = ConnectionState::Disconnected;
            log::info!("{}: disconnected from mail server", self.ctx);
        }
    }

    /// Adds recipients removed before dispatch to the tally.
    pub fn record_skipped(&mut self, count: usize) {
        self.tally.skipped += count;
    }

    /// Sends one unit accounting for `weight` recipients.
    ///
    /// A failed send is counted and followed by a single reconnect attempt;
    /// the unit itself is not retried.
    pub async fn dispatch(&mut self, email: &OutgoingEmail, weight: usize) -> bool {
        if self.open().await.is_err() {
            self.tally.failed += weight;
            return false;
        }

        match self.transport.send(email).await {
            Ok(()) => {
                log::info!(
                    "{}: email sent to {} (with {} BCC recipients)",
                    self.ctx,
                    email.to,
                    email.bcc.len()
                );
                self.tally.success += weight;
                true
            }
            Err(e) => {
                log::error!("{}: error sending email to {}: {}", self.ctx, email.to, e);
                self.tally.failed += weight;
                self.reconnect().await;
                false
            }
        }
    }

    async fn reconnect(&mut self) {
        self.transport.disconnect().await;
        self.state = ConnectionState::Disconnected;
        if self.open().await.is_err() {
            log::warn!("{}: reconnect failed, will retry on next unit", self.ctx);
        }
    }

    /// Sends every unit in order, pausing between units, then disconnects.
    pub async fn run<I>(mut self, units: I) -> RunTally
    where
        I: IntoIterator<Item = (OutgoingEmail, usize)>,
        I::IntoIter: ExactSizeIterator,
    {
        let units = units.into_iter();
        let total = units.len();

        for (index, (email, weight)) in units.enumerate() {
            self.dispatch(&email, weight).await;

            if !self.delay.is_zero() && index + 1 < total {
                tokio::time::sleep(self.delay).await;
            }
        }

        self.close().await;
        self.tally
    }
}
