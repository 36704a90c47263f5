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

//! Startup backfill.
//!
//! Covers the gap between monitor restarts: lists the watched account's most
//! recent transactions, newest first, and replays tagged ones that are not in
//! the store through the same engine the live stream uses. Runs once per
//! process start.

use crate::base::AccountId;
use crate::engine::{IssuanceEngine, Outcome};
use crate::error::StoreError;
use crate::ledger::LedgerClient;
use crate::memo::MemoDecoder;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// Counters from one backfill pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BackfillReport {
    pub scanned: usize,
    pub already_processed: usize,
    pub tagged: usize,
    pub issued: usize,
    pub failed: usize,
    pub deferred: usize,
    pub unsupported: usize,
    pub errors: usize,
}

impl BackfillReport {
    fn count(&mut self, outcome: &Outcome) {
        match outcome {
            Outcome::AlreadyProcessed => self.already_processed += 1,
            Outcome::UnsupportedAsset => self.unsupported += 1,
            Outcome::Issued { .. } => self.issued += 1,
            Outcome::Failed => self.failed += 1,
            Outcome::Deferred => self.deferred += 1,
        }
    }
}

pub struct BackfillScanner<L> {
    ledger: Arc<L>,
    engine: Arc<IssuanceEngine<L>>,
    decoder: MemoDecoder,
    account: AccountId,
    limit: usize,
}

impl<L: LedgerClient> BackfillScanner<L> {
    pub fn new(
        ledger: Arc<L>,
        engine: Arc<IssuanceEngine<L>>,
        decoder: MemoDecoder,
        account: AccountId,
        limit: usize,
    ) -> Self {
        Self {
            ledger,
            engine,
            decoder,
            account,
            limit,
        }
    }

    /// Scans recent history once, stopping early on shutdown.
    ///
    /// Ledger failures are logged and counted; only a [`StoreError`] aborts
    /// the pass.
    pub async fn run(&self, shutdown: &CancellationToken) -> Result<BackfillReport, StoreError> {
        let mut report = BackfillReport::default();
        info!(account = %self.account, limit = self.limit, "checking recent transactions");

        let transactions = match self
            .ledger
            .recent_transactions(&self.account, self.limit)
            .await
        {
            Ok(transactions) => transactions,
            Err(e) => {
                error!(account = %self.account, error = %e, "could not list recent transactions");
                report.errors += 1;
                return Ok(report);
            }
        };
        info!(count = transactions.len(), "found recent transactions");

        for transaction in transactions {
            if shutdown.is_cancelled() {
                info!("shutdown requested, stopping backfill");
                break;
            }
            report.scanned += 1;
            if self.engine.store().is_processed(&transaction.hash) {
                report.already_processed += 1;
                continue;
            }
            if !self.decoder.matches(&transaction) {
                continue;
            }
            report.tagged += 1;
            info!(hash = %transaction.hash, "processing recent tagged transaction");

            let payments = match self.ledger.transaction_payments(&transaction.hash).await {
                Ok(payments) => payments,
                Err(e) => {
                    warn!(hash = %transaction.hash, error = %e, "could not load operations");
                    report.errors += 1;
                    continue;
                }
            };

            for payment in &payments {
                let Some(tagged) = self.decoder.decode(&transaction, payment) else {
                    continue;
                };
                let outcome = self.engine.handle(tagged).await?;
                report.count(&outcome);
            }
        }

        info!(
            scanned = report.scanned,
            tagged = report.tagged,
            issued = report.issued,
            failed = report.failed,
            deferred = report.deferred,
            "recent transaction check completed"
        );
        Ok(report)
    }
}
