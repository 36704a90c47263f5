// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2025 Daniel Negri
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

//! Live stream supervision.
//!
//! ```text
//! Stopped ──run──► Starting ──subscribed──► Streaming
//!                     ▲                         │
//!                     └──── error / closed ─────┘  (after a fixed backoff)
//!
//! any state ──shutdown──► Stopped
//! ```
//!
//! Every (re)subscription starts from "now"; history is the backfill
//! scanner's job. Tagged payments are handed to the engine on spawned tasks,
//! bounded by a semaphore, so a slow submission never stalls the feed.
//!
//! A supervisor follows one [`Feed`]. The account feed delivers payments
//! with their transactions joined. The network feed delivers bare
//! transactions; tagged ones are expanded into their payments before
//! reaching the engine, which catches tagged transfers that never touch the
//! watched account.

use crate::base::AccountId;
use crate::engine::IssuanceEngine;
use crate::error::{LedgerError, MonitorError, StoreError};
use crate::ledger::{LedgerClient, ObservedPayment};
use crate::memo::MemoDecoder;
use crate::transaction::LedgerTransaction;
use futures::StreamExt;
use futures::stream::BoxStream;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Semaphore, watch};
use tokio::task::{JoinError, JoinSet};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SupervisorState {
    Stopped,
    Starting,
    Streaming,
}

/// Which live subscription a supervisor follows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Feed {
    /// Payments involving the watched account.
    #[default]
    AccountPayments,
    /// Every transaction on the network.
    NetworkTransactions,
}

impl fmt::Display for Feed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AccountPayments => write!(f, "payment stream"),
            Self::NetworkTransactions => write!(f, "transaction stream"),
        }
    }
}

enum FeedEvent {
    Payment(ObservedPayment),
    Transaction(LedgerTransaction),
}

type FeedStream = BoxStream<'static, Result<FeedEvent, LedgerError>>;

type HandleResult = Result<(), StoreError>;

/// Owns the live payment subscription and restarts it on failure.
pub struct StreamSupervisor<L> {
    ledger: Arc<L>,
    engine: Arc<IssuanceEngine<L>>,
    decoder: MemoDecoder,
    account: AccountId,
    restart_backoff: Duration,
    workers: Arc<Semaphore>,
    feed: Feed,
    state: watch::Sender<SupervisorState>,
}

impl<L: LedgerClient> StreamSupervisor<L> {
    pub fn new(
        ledger: Arc<L>,
        engine: Arc<IssuanceEngine<L>>,
        decoder: MemoDecoder,
        account: AccountId,
        restart_backoff: Duration,
        workers: usize,
    ) -> Self {
        let (state, _) = watch::channel(SupervisorState::Stopped);
        Self {
            ledger,
            engine,
            decoder,
            account,
            restart_backoff,
            workers: Arc::new(Semaphore::new(workers.max(1))),
            feed: Feed::default(),
            state,
        }
    }

    /// Follows `feed` instead of the account payment stream.
    pub fn with_feed(mut self, feed: Feed) -> Self {
        self.feed = feed;
        self
    }

    pub fn feed(&self) -> Feed {
        self.feed
    }

    pub fn state(&self) -> SupervisorState {
        *self.state.borrow()
    }

    /// Receiver notified on every state transition.
    pub fn watch_state(&self) -> watch::Receiver<SupervisorState> {
        self.state.subscribe()
    }

    fn set_state(&self, state: SupervisorState) {
        let previous = self.state.send_replace(state);
        if previous != state {
            debug!(feed = %self.feed, ?previous, ?state, "stream supervisor state changed");
        }
    }

    /// Runs until `shutdown` is cancelled or a handler hits a fatal error.
    ///
    /// In-flight handlers are awaited before returning.
    pub async fn run(&self, shutdown: CancellationToken) -> Result<(), MonitorError> {
        let mut tasks = JoinSet::new();
        let result = self.supervise(&shutdown, &mut tasks).await;
        if result.is_err() {
            shutdown.cancel();
        }

        if !tasks.is_empty() {
            info!(in_flight = tasks.len(), "waiting for in-flight remittances");
        }
        let mut drained = Ok(());
        while let Some(joined) = tasks.join_next().await {
            if let Err(e) = check_handler(joined) {
                error!(error = %e, "remittance handler failed during shutdown");
                if drained.is_ok() {
                    drained = Err(e);
                }
            }
        }

        self.set_state(SupervisorState::Stopped);
        info!(feed = %self.feed, "stream stopped");
        result.and(drained)
    }

    async fn supervise(
        &self,
        shutdown: &CancellationToken,
        tasks: &mut JoinSet<HandleResult>,
    ) -> Result<(), MonitorError> {
        loop {
            self.set_state(SupervisorState::Starting);
            let subscription = tokio::select! {
                _ = shutdown.cancelled() => return Ok(()),
                result = self.subscribe() => result,
            };

            match subscription {
                Ok(mut stream) => {
                    self.set_state(SupervisorState::Streaming);
                    info!(feed = %self.feed, account = %self.account, prefix = self.decoder.prefix(), "monitoring for tagged payments");
                    loop {
                        tokio::select! {
                            _ = shutdown.cancelled() => return Ok(()),
                            Some(joined) = tasks.join_next() => check_handler(joined)?,
                            event = stream.next() => match event {
                                Some(Ok(FeedEvent::Payment(observed))) => self.dispatch(observed, tasks),
                                Some(Ok(FeedEvent::Transaction(transaction))) => {
                                    self.dispatch_transaction(transaction, tasks)
                                }
                                Some(Err(e)) => {
                                    warn!(feed = %self.feed, error = %e, "error in stream");
                                    break;
                                }
                                None => {
                                    warn!(feed = %self.feed, "stream closed");
                                    break;
                                }
                            },
                        }
                    }
                }
                Err(e) => warn!(feed = %self.feed, account = %self.account, error = %e, "could not subscribe"),
            }

            self.set_state(SupervisorState::Starting);
            info!(feed = %self.feed, backoff = ?self.restart_backoff, "restarting stream");
            tokio::select! {
                _ = shutdown.cancelled() => return Ok(()),
                _ = tokio::time::sleep(self.restart_backoff) => {}
            }
        }
    }

    async fn subscribe(&self) -> Result<FeedStream, LedgerError> {
        Ok(match self.feed {
            Feed::AccountPayments => self
                .ledger
                .subscribe_payments(&self.account)
                .await?
                .map(|event| event.map(FeedEvent::Payment))
                .boxed(),
            Feed::NetworkTransactions => self
                .ledger
                .subscribe_transactions()
                .await?
                .map(|event| event.map(FeedEvent::Transaction))
                .boxed(),
        })
    }

    fn dispatch(&self, observed: ObservedPayment, tasks: &mut JoinSet<HandleResult>) {
        let Some(tagged) = self.decoder.decode(&observed.transaction, &observed.payment) else {
            debug!(hash = %observed.payment.transaction_hash, "untagged payment");
            return;
        };
        if self.engine.store().is_processed(&tagged.hash) {
            debug!(hash = %tagged.hash, "already processed, skipping");
            return;
        }
        info!(
            hash = %tagged.hash,
            from = %tagged.source,
            to = %tagged.destination,
            amount = %tagged.amount,
            asset = %tagged.asset,
            "found tagged payment"
        );

        let engine = Arc::clone(&self.engine);
        let workers = Arc::clone(&self.workers);
        tasks.spawn(async move {
            let Ok(_permit) = workers.acquire_owned().await else {
                return Ok(());
            };
            engine.handle(tagged).await.map(|_| ())
        });
    }

    fn dispatch_transaction(&self, transaction: LedgerTransaction, tasks: &mut JoinSet<HandleResult>) {
        if !self.decoder.matches(&transaction) {
            return;
        }
        if self.engine.store().is_processed(&transaction.hash) {
            debug!(hash = %transaction.hash, "already processed, skipping");
            return;
        }
        info!(hash = %transaction.hash, "found tagged transaction");

        let ledger = Arc::clone(&self.ledger);
        let engine = Arc::clone(&self.engine);
        let workers = Arc::clone(&self.workers);
        let decoder = self.decoder.clone();
        tasks.spawn(async move {
            let Ok(_permit) = workers.acquire_owned().await else {
                return Ok(());
            };
            let payments = match ledger.transaction_payments(&transaction.hash).await {
                Ok(payments) => payments,
                Err(e) => {
                    warn!(hash = %transaction.hash, error = %e, "could not load operations");
                    return Ok(());
                }
            };
            for payment in &payments {
                if let Some(tagged) = decoder.decode(&transaction, payment) {
                    engine.handle(tagged).await?;
                }
            }
            Ok(())
        });
    }
}

fn check_handler(joined: Result<HandleResult, JoinError>) -> Result<(), MonitorError> {
    match joined {
        Ok(Ok(())) => Ok(()),
        Ok(Err(e)) => Err(MonitorError::Store(e)),
        Err(e) if e.is_cancelled() => Ok(()),
        Err(e) => Err(MonitorError::Worker(e.to_string())),
    }
}
