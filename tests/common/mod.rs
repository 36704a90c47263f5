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

//! Shared fixtures: an in-memory ledger and payment builders.

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use futures::StreamExt;
use futures::channel::mpsc;
use parking_lot::Mutex;
use remit_monitor::keys::encode_account_id;
use remit_monitor::ledger::{
    AccountState, LedgerClient, ObservedPayment, PaymentRequest, PaymentStream, SubmitReceipt,
    TransactionStream,
};
use remit_monitor::{
    AccountId, Asset, Converter, Keypair, LedgerError, LedgerTransaction, Memo, MonitorConfig,
    Network, PaymentOperation, TaggedTransaction, TransactionHash,
};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

pub type StreamSender = mpsc::UnboundedSender<Result<ObservedPayment, LedgerError>>;
pub type TransactionSender = mpsc::UnboundedSender<Result<LedgerTransaction, LedgerError>>;

pub const PREFIX: &str = "EazeFi:";

pub fn account(n: u8) -> AccountId {
    encode_account_id(&[n; 32])
}

pub fn issuer() -> Keypair {
    Keypair::from_seed(&[42; 32])
}

pub fn target_asset() -> Asset {
    Asset::credit("TSHT", issuer().account_id().clone())
}

pub fn hash(n: u32) -> TransactionHash {
    TransactionHash::new(format!("{n:08x}{}", "ab".repeat(28)))
}

pub fn transaction(hash: &TransactionHash, memo: &str) -> LedgerTransaction {
    LedgerTransaction {
        hash: hash.clone(),
        source_account: account(1),
        memo: Memo::Text(memo.to_string()),
        successful: true,
        created_at: Utc.with_ymd_and_hms(2025, 3, 14, 9, 30, 0).unwrap(),
    }
}

pub fn payment(hash: &TransactionHash, amount: Decimal, asset: Asset) -> PaymentOperation {
    PaymentOperation {
        transaction_hash: hash.clone(),
        from: account(1),
        to: account(2),
        amount,
        asset,
    }
}

pub fn observed(n: u32, amount: Decimal) -> ObservedPayment {
    let hash = hash(n);
    ObservedPayment {
        transaction: transaction(&hash, &format!("{PREFIX}transfer-{n}")),
        payment: payment(&hash, amount, Asset::Native),
    }
}

pub fn tagged(n: u32, amount: Decimal) -> TaggedTransaction {
    let observed = observed(n, amount);
    TaggedTransaction {
        hash: observed.transaction.hash.clone(),
        source: observed.payment.from,
        destination: observed.payment.to,
        amount,
        asset: observed.payment.asset,
        memo: format!("{PREFIX}transfer-{n}"),
        created_at: observed.transaction.created_at,
    }
}

pub fn config(history_file: PathBuf) -> MonitorConfig {
    let issuer = issuer();
    MonitorConfig {
        network: Network::Testnet,
        endpoints: vec!["http://127.0.0.1:1".to_string()],
        account: issuer.account_id().clone(),
        target_asset: target_asset(),
        issuer,
        source_asset: Asset::Native,
        converter: Converter::new(dec!(248.73)).unwrap(),
        memo_prefix: PREFIX.to_string(),
        history_file,
        history_cap: 1000,
        backfill_limit: 50,
        restart_backoff: Duration::from_millis(20),
        request_timeout: Duration::from_secs(1),
        max_retries: 0,
        workers: 4,
        stream_idle_timeout: Duration::from_secs(60),
        network_stream: false,
    }
}

/// Scriptable ledger.
///
/// Live subscriptions are fed through channels opened with
/// [`MockLedger::open_stream`] and [`MockLedger::open_transaction_stream`];
/// with none queued a subscription fails.
/// Submission failures queued with [`MockLedger::fail_next`] are returned in
/// order before submissions start succeeding.
#[derive(Default)]
pub struct MockLedger {
    history: Mutex<Vec<(LedgerTransaction, Vec<PaymentOperation>)>>,
    streams: Mutex<VecDeque<mpsc::UnboundedReceiver<Result<ObservedPayment, LedgerError>>>>,
    failures: Mutex<VecDeque<LedgerError>>,
    submissions: Mutex<Vec<PaymentRequest>>,
    transaction_streams: Mutex<VecDeque<mpsc::UnboundedReceiver<Result<LedgerTransaction, LedgerError>>>>,
    subscriptions: AtomicUsize,
    transaction_subscriptions: AtomicUsize,
    submit_delay: Mutex<Option<Duration>>,
}

impl MockLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a transaction to history. Later calls are newer.
    pub fn push_history(&self, transaction: LedgerTransaction, payments: Vec<PaymentOperation>) {
        self.history.lock().insert(0, (transaction, payments));
    }

    pub fn push_observed(&self, observed: &ObservedPayment) {
        self.push_history(observed.transaction.clone(), vec![observed.payment.clone()]);
    }

    pub fn open_stream(&self) -> StreamSender {
        let (tx, rx) = mpsc::unbounded();
        self.streams.lock().push_back(rx);
        tx
    }

    pub fn open_transaction_stream(&self) -> TransactionSender {
        let (tx, rx) = mpsc::unbounded();
        self.transaction_streams.lock().push_back(rx);
        tx
    }

    pub fn fail_next(&self, error: LedgerError) {
        self.failures.lock().push_back(error);
    }

    pub fn set_submit_delay(&self, delay: Duration) {
        *self.submit_delay.lock() = Some(delay);
    }

    pub fn submissions(&self) -> Vec<PaymentRequest> {
        self.submissions.lock().clone()
    }

    pub fn subscriptions(&self) -> usize {
        self.subscriptions.load(Ordering::SeqCst)
    }

    pub fn transaction_subscriptions(&self) -> usize {
        self.transaction_subscriptions.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LedgerClient for MockLedger {
    async fn load_account(&self, account: &AccountId) -> Result<AccountState, LedgerError> {
        Ok(AccountState {
            id: account.clone(),
            sequence: 1,
        })
    }

    async fn subscribe_payments(&self, _account: &AccountId) -> Result<PaymentStream, LedgerError> {
        self.subscriptions.fetch_add(1, Ordering::SeqCst);
        match self.streams.lock().pop_front() {
            Some(rx) => Ok(rx.boxed()),
            None => Err(LedgerError::Network("no stream scripted".to_string())),
        }
    }

    async fn subscribe_transactions(&self) -> Result<TransactionStream, LedgerError> {
        self.transaction_subscriptions.fetch_add(1, Ordering::SeqCst);
        match self.transaction_streams.lock().pop_front() {
            Some(rx) => Ok(rx.boxed()),
            None => Err(LedgerError::Network("no stream scripted".to_string())),
        }
    }

    async fn recent_transactions(
        &self,
        _account: &AccountId,
        limit: usize,
    ) -> Result<Vec<LedgerTransaction>, LedgerError> {
        Ok(self
            .history
            .lock()
            .iter()
            .take(limit)
            .map(|(transaction, _)| transaction.clone())
            .collect())
    }

    async fn transaction_payments(
        &self,
        hash: &TransactionHash,
    ) -> Result<Vec<PaymentOperation>, LedgerError> {
        self.history
            .lock()
            .iter()
            .find(|(transaction, _)| &transaction.hash == hash)
            .map(|(_, payments)| payments.clone())
            .ok_or_else(|| LedgerError::NotFound(hash.to_string()))
    }

    async fn submit_payment(&self, request: &PaymentRequest) -> Result<SubmitReceipt, LedgerError> {
        let delay = *self.submit_delay.lock();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        let n = {
            let mut submissions = self.submissions.lock();
            submissions.push(request.clone());
            submissions.len()
        };
        if let Some(error) = self.failures.lock().pop_front() {
            return Err(error);
        }
        Ok(SubmitReceipt {
            hash: TransactionHash::new(format!("issued-{n}")),
        })
    }
}
