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

//! Monitor wiring.
//!
//! A [`Monitor`] owns one engine shared by its feeders: the one-shot
//! [`BackfillScanner`], a [`StreamSupervisor`] on the account's payments
//! and, when enabled, a second one on the network-wide transaction stream.
//! All run concurrently from startup, so payments that arrive while history
//! is still being scanned are not missed. The store's reservations make sure
//! each transaction is issued at most once whichever feeder sees it first.

use crate::backfill::{BackfillReport, BackfillScanner};
use crate::base::AccountId;
use crate::config::MonitorConfig;
use crate::engine::IssuanceEngine;
use crate::error::{MonitorError, StoreError};
use crate::ledger::LedgerClient;
use crate::memo::MemoDecoder;
use crate::store::ProcessedStore;
use crate::supervisor::{Feed, StreamSupervisor, SupervisorState};
use std::sync::Arc;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

pub struct Monitor<L> {
    ledger: Arc<L>,
    store: Arc<ProcessedStore>,
    issuer: AccountId,
    backfill: BackfillScanner<L>,
    supervisor: StreamSupervisor<L>,
    network: Option<StreamSupervisor<L>>,
}

impl<L: LedgerClient> Monitor<L> {
    pub fn new(ledger: Arc<L>, store: Arc<ProcessedStore>, config: &MonitorConfig) -> Self {
        let engine = Arc::new(IssuanceEngine::new(
            Arc::clone(&ledger),
            Arc::clone(&store),
            config.converter,
            config.source_asset.clone(),
            config.target_asset.clone(),
        ));
        let decoder = MemoDecoder::new(config.memo_prefix.clone());

        let backfill = BackfillScanner::new(
            Arc::clone(&ledger),
            Arc::clone(&engine),
            decoder.clone(),
            config.account.clone(),
            config.backfill_limit,
        );
        let supervisor = |feed: Feed| {
            StreamSupervisor::new(
                Arc::clone(&ledger),
                Arc::clone(&engine),
                decoder.clone(),
                config.account.clone(),
                config.restart_backoff,
                config.workers,
            )
            .with_feed(feed)
        };
        let network = config
            .network_stream
            .then(|| supervisor(Feed::NetworkTransactions));
        let supervisor = supervisor(Feed::AccountPayments);

        Self {
            ledger,
            store,
            issuer: config.issuer.account_id().clone(),
            backfill,
            supervisor,
            network,
        }
    }

    pub fn store(&self) -> &Arc<ProcessedStore> {
        &self.store
    }

    /// State of the account payment stream.
    pub fn watch_state(&self) -> watch::Receiver<SupervisorState> {
        self.supervisor.watch_state()
    }

    /// Runs backfill and the live streams until `shutdown` is cancelled.
    ///
    /// # Errors
    ///
    /// A [`MonitorError`] from any feeder. The others are stopped through
    /// `shutdown` before this returns.
    pub async fn run(&self, shutdown: CancellationToken) -> Result<(), MonitorError> {
        match self.ledger.load_account(&self.issuer).await {
            Ok(account) => info!(issuer = %account.id, sequence = account.sequence, "issuer account found"),
            Err(e) => warn!(issuer = %self.issuer, error = %e, "could not load issuer account, submissions may fail"),
        }
        info!(
            records = self.store.len(),
            capacity = self.store.capacity(),
            "loaded transaction history"
        );

        let backfill = async {
            let result = self.backfill.run(&shutdown).await;
            if let Err(e) = &result {
                error!(error = %e, "backfill could not record an outcome, stopping");
                shutdown.cancel();
            }
            result
        };
        let network = async {
            match &self.network {
                Some(network) => network.run(shutdown.clone()).await,
                None => Ok(()),
            }
        };
        let (backfill, streamed, watched) =
            tokio::join!(backfill, self.supervisor.run(shutdown.clone()), network);

        let store = Arc::clone(&self.store);
        let persisted = tokio::task::spawn_blocking(move || store.persist())
            .await
            .map_err(|e| StoreError::Background(e.to_string()))
            .and_then(|persisted| persisted);
        if let Err(e) = &persisted {
            error!(error = %e, "could not save transaction history");
        }

        let report: BackfillReport = backfill?;
        streamed?;
        watched?;
        persisted?;
        info!(issued = report.issued, records = self.store.len(), "monitor stopped");
        Ok(())
    }
}
