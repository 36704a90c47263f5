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

//! Ledger client surface.
//!
//! The monitor only needs a handful of things from the ledger: load an
//! account, follow live payments or transactions, list recent history, and
//! submit a payment. Live subscriptions always start from "now".
//! [`LedgerClient`] captures exactly that so the engine, supervisor and
//! scanner can run against Horizon in production and an in-memory fake in
//! tests.

pub mod horizon;
pub mod sse;
pub mod xdr;

use crate::base::{AccountId, TransactionHash};
use crate::error::LedgerError;
use crate::transaction::{Asset, IssuanceIntent, LedgerTransaction, PaymentOperation};
use async_trait::async_trait;
use futures::stream::BoxStream;
use rust_decimal::Decimal;

pub use horizon::{HorizonClient, HorizonConfig};

/// Account state needed to build transactions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountState {
    pub id: AccountId,
    pub sequence: i64,
}

/// A payment observed on the live feed, with its enclosing transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObservedPayment {
    pub transaction: LedgerTransaction,
    pub payment: PaymentOperation,
}

/// Live payment feed. Ends or yields an error when the connection drops.
pub type PaymentStream = BoxStream<'static, Result<ObservedPayment, LedgerError>>;

/// Live network-wide transaction feed.
pub type TransactionStream = BoxStream<'static, Result<LedgerTransaction, LedgerError>>;

/// Payment to be submitted from the issuer account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentRequest {
    pub destination: AccountId,
    pub asset: Asset,
    pub amount: Decimal,
    pub memo: String,
}

impl From<&IssuanceIntent> for PaymentRequest {
    fn from(intent: &IssuanceIntent) -> Self {
        Self {
            destination: intent.destination.clone(),
            asset: intent.asset.clone(),
            amount: intent.amount,
            memo: intent.memo(),
        }
    }
}

/// Ledger acknowledgement of a submitted payment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmitReceipt {
    pub hash: TransactionHash,
}

#[async_trait]
pub trait LedgerClient: Send + Sync + 'static {
    async fn load_account(&self, account: &AccountId) -> Result<AccountState, LedgerError>;

    /// Payments involving `account` from now on.
    async fn subscribe_payments(&self, account: &AccountId) -> Result<PaymentStream, LedgerError>;

    /// Every transaction on the network from now on.
    async fn subscribe_transactions(&self) -> Result<TransactionStream, LedgerError>;

    /// Most recent transactions involving `account`, newest first.
    async fn recent_transactions(
        &self,
        account: &AccountId,
        limit: usize,
    ) -> Result<Vec<LedgerTransaction>, LedgerError>;

    /// Payment operations contained in a transaction.
    async fn transaction_payments(
        &self,
        hash: &TransactionHash,
    ) -> Result<Vec<PaymentOperation>, LedgerError>;

    /// Builds, signs and submits a payment from the issuer account.
    async fn submit_payment(&self, request: &PaymentRequest) -> Result<SubmitReceipt, LedgerError>;
}
