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

//! Conversion and issuance engine.
//!
//! The [`IssuanceEngine`] is the central component: it takes a tagged
//! transaction, converts its amount at the configured rate, and pays the
//! result in the target asset from the issuer account.
//!
//! # Handling
//!
//! | Situation | Outcome | Recorded |
//! |-----------|---------|----------|
//! | Hash already recorded or in flight | [`Outcome::AlreadyProcessed`] | no |
//! | Asset is not the source asset | [`Outcome::UnsupportedAsset`] | no |
//! | Submission accepted | [`Outcome::Issued`] | `completed` |
//! | Conversion fails, destination ineligible, ledger rejects | [`Outcome::Failed`] | `failed` |
//! | Submission may have landed but is unconfirmed | [`Outcome::Failed`] | `failed` |
//! | Transient failure that never reached the ledger | [`Outcome::Deferred`] | no |
//!
//! Deferred transactions stay eligible for the next backfill pass. Failed
//! ones are never retried, so an unconfirmed submission is never paid twice.
//! Outcomes are committed on the blocking pool.

use crate::base::TransactionHash;
use crate::conversion::Converter;
use crate::error::{ConversionError, LedgerError, StoreError};
use crate::ledger::{LedgerClient, PaymentRequest};
use crate::store::ProcessedStore;
use crate::transaction::{Asset, IssuanceIntent, ProcessedRecord, ProcessingStatus, TaggedTransaction};
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// What [`IssuanceEngine::handle`] did with a transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    AlreadyProcessed,
    UnsupportedAsset,
    Issued {
        issuance_hash: TransactionHash,
        amount: Decimal,
    },
    Failed,
    Deferred,
}

/// Converts tagged transactions and issues the target asset exactly once.
///
/// # Invariants
///
/// - At most one submission attempt is in flight per transaction hash.
/// - Every submission that the ledger accepts is recorded before `handle`
///   returns, or `handle` returns a [`StoreError`].
pub struct IssuanceEngine<L> {
    ledger: Arc<L>,
    store: Arc<ProcessedStore>,
    converter: Converter,
    source_asset: Asset,
    target_asset: Asset,
}

impl<L: LedgerClient> IssuanceEngine<L> {
    pub fn new(
        ledger: Arc<L>,
        store: Arc<ProcessedStore>,
        converter: Converter,
        source_asset: Asset,
        target_asset: Asset,
    ) -> Self {
        Self {
            ledger,
            store,
            converter,
            source_asset,
            target_asset,
        }
    }

    pub fn store(&self) -> &Arc<ProcessedStore> {
        &self.store
    }

    /// Computes the issuance for a transaction.
    pub fn intent(&self, transaction: &TaggedTransaction) -> Result<IssuanceIntent, ConversionError> {
        Ok(IssuanceIntent {
            destination: transaction.destination.clone(),
            asset: self.target_asset.clone(),
            amount: self.converter.convert(transaction.amount)?,
            source_hash: transaction.hash.clone(),
        })
    }

    /// Handles one tagged transaction.
    ///
    /// # Errors
    ///
    /// Only [`StoreError`]: the outcome could not be made durable. Ledger and
    /// conversion failures are logged and reported through [`Outcome`].
    pub async fn handle(&self, transaction: TaggedTransaction) -> Result<Outcome, StoreError> {
        let Some(reservation) = self.store.reserve(&transaction.hash) else {
            debug!(hash = %transaction.hash, "already processed, skipping");
            return Ok(Outcome::AlreadyProcessed);
        };

        if transaction.asset != self.source_asset {
            info!(
                hash = %transaction.hash,
                asset = %transaction.asset,
                "skipping payment in unsupported asset"
            );
            return Ok(Outcome::UnsupportedAsset);
        }

        let intent = match self.intent(&transaction) {
            Ok(intent) => intent,
            Err(e) => {
                error!(hash = %transaction.hash, amount = %transaction.amount, error = %e, "conversion failed");
                reservation
                    .commit_in_background(ProcessedRecord::new(&transaction, ProcessingStatus::Failed))
                    .await?;
                return Ok(Outcome::Failed);
            }
        };

        info!(
            hash = %transaction.hash,
            from = %transaction.source,
            to = %intent.destination,
            source_amount = %transaction.amount,
            amount = %intent.amount,
            asset = intent.asset.code(),
            rate = %self.converter.rate(),
            "issuing remittance"
        );

        match self.ledger.submit_payment(&PaymentRequest::from(&intent)).await {
            Ok(receipt) => {
                reservation
                    .commit_in_background(ProcessedRecord::new(&transaction, ProcessingStatus::Completed))
                    .await?;
                info!(hash = %transaction.hash, issuance = %receipt.hash, "remittance completed");
                Ok(Outcome::Issued {
                    issuance_hash: receipt.hash,
                    amount: intent.amount,
                })
            }
            Err(e) if e.is_transient() => {
                warn!(
                    hash = %transaction.hash,
                    error = %e,
                    "issuance deferred, left eligible for the next backfill"
                );
                Ok(Outcome::Deferred)
            }
            Err(e) => {
                if let LedgerError::Unconfirmed { hash } = &e {
                    error!(
                        hash = %transaction.hash,
                        issuance = %hash,
                        "issuance unconfirmed, recorded as failed; check the issuer account before paying manually"
                    );
                } else {
                    error!(hash = %transaction.hash, to = %intent.destination, error = %e, "issuance failed");
                }
                reservation
                    .commit_in_background(ProcessedRecord::new(&transaction, ProcessingStatus::Failed))
                    .await?;
                Ok(Outcome::Failed)
            }
        }
    }
}
