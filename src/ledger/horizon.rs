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

//! Horizon adapter.
//!
//! Every call runs under a bounded timeout. Transient failures are retried a
//! small number of times with linear backoff, rotating through the
//! configured endpoints so the first retry goes to the alternate endpoint
//! when one exists.
//!
//! Submissions from the issuer account are serialized, since each one
//! consumes the next sequence number. Before retrying a submission whose
//! outcome is unknown (timeout, 5xx) the adapter asks the ledger whether the
//! previous envelope landed, so a retry never pays twice. When retries run
//! out with such an envelope still unaccounted for, the submission is
//! reported as [`LedgerError::Unconfirmed`] rather than as a retryable
//! failure.
//!
//! Live streams have no overall timeout, but a stream that stays silent for
//! longer than `stream_idle_timeout` ends with [`LedgerError::Timeout`].

use crate::base::{AccountId, TransactionHash};
use crate::conversion::to_stroops;
use crate::error::LedgerError;
use crate::keys::{Keypair, decode_account_id};
use crate::ledger::sse::{SseDecoder, SseEvent};
use crate::ledger::xdr::{PaymentTransaction, XdrAsset, sign_payment};
use crate::ledger::{
    AccountState, LedgerClient, ObservedPayment, PaymentRequest, PaymentStream, SubmitReceipt,
    TransactionStream,
};
use crate::transaction::{Asset, LedgerTransaction, Memo, PaymentOperation};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::StreamExt;
use futures::stream::BoxStream;
use reqwest::{RequestBuilder, Response, StatusCode};
use rust_decimal::Decimal;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::collections::VecDeque;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

/// Horizon connection settings.
#[derive(Debug, Clone)]
pub struct HorizonConfig {
    /// Primary endpoint first, alternates after it.
    pub endpoints: Vec<String>,
    pub network_passphrase: String,
    pub request_timeout: Duration,
    pub max_retries: u32,
    pub retry_backoff: Duration,
    /// Fee per operation, in stroops.
    pub base_fee: u32,
    /// Validity window of submitted transactions.
    pub transaction_ttl: Duration,
    /// Longest silence tolerated on a live stream.
    pub stream_idle_timeout: Duration,
}

impl HorizonConfig {
    pub fn new(endpoints: Vec<String>, network_passphrase: impl Into<String>) -> Self {
        Self {
            endpoints: endpoints
                .into_iter()
                .map(|e| e.trim_end_matches('/').to_string())
                .collect(),
            network_passphrase: network_passphrase.into(),
            request_timeout: Duration::from_secs(20),
            max_retries: 2,
            retry_backoff: Duration::from_millis(500),
            base_fee: 100,
            transaction_ttl: Duration::from_secs(180),
            stream_idle_timeout: Duration::from_secs(60),
        }
    }
}

/// [`LedgerClient`] backed by a Horizon server.
pub struct HorizonClient {
    http: reqwest::Client,
    config: HorizonConfig,
    keypair: Keypair,
    submit_lock: Mutex<()>,
}

impl HorizonClient {
    pub fn new(config: HorizonConfig, keypair: Keypair) -> Result<Self, LedgerError> {
        if config.endpoints.is_empty() {
            return Err(LedgerError::InvalidRequest(
                "no horizon endpoint configured".to_string(),
            ));
        }
        let http = reqwest::Client::builder()
            .connect_timeout(config.request_timeout)
            .user_agent(concat!("remit-monitor/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| LedgerError::Network(e.to_string()))?;

        Ok(Self {
            http,
            config,
            keypair,
            submit_lock: Mutex::new(()),
        })
    }

    pub fn issuer(&self) -> &AccountId {
        self.keypair.account_id()
    }

    fn attempts(&self) -> u32 {
        self.config.max_retries + 1
    }

    fn endpoint(&self, attempt: u32) -> &str {
        &self.config.endpoints[attempt as usize % self.config.endpoints.len()]
    }

    async fn backoff(&self, attempt: u32) {
        if attempt > 0 {
            tokio::time::sleep(self.config.retry_backoff * attempt).await;
        }
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, LedgerError> {
        let mut last_error = LedgerError::StreamClosed;
        for attempt in 0..self.attempts() {
            self.backoff(attempt).await;
            let endpoint = self.endpoint(attempt);
            let request = self
                .http
                .get(format!("{endpoint}{path}"))
                .query(query)
                .timeout(self.config.request_timeout);

            let result = match send(endpoint, request).await {
                Ok(response) => response
                    .json::<T>()
                    .await
                    .map_err(|e| classify_reqwest(endpoint, e)),
                Err(e) => Err(e),
            };

            match result {
                Ok(value) => return Ok(value),
                Err(e) if e.is_transient() => {
                    warn!(endpoint, path, attempt, error = %e, "horizon request failed, retrying");
                    last_error = e;
                }
                Err(e) => return Err(e),
            }
        }
        Err(last_error)
    }

    /// Opens an event stream, retrying transient failures like [`Self::get_json`].
    async fn open_stream(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<(Response, String), LedgerError> {
        let mut last_error = LedgerError::StreamClosed;
        for attempt in 0..self.attempts() {
            self.backoff(attempt).await;
            let endpoint = self.endpoint(attempt);
            let request = self
                .http
                .get(format!("{endpoint}{path}"))
                .query(query)
                .header(reqwest::header::ACCEPT, "text/event-stream");

            // Only waiting for headers is bounded here; the body is bounded by idle time.
            let response =
                match tokio::time::timeout(self.config.request_timeout, send(endpoint, request))
                    .await
                {
                    Ok(result) => result,
                    Err(_) => Err(LedgerError::Timeout {
                        endpoint: endpoint.to_string(),
                    }),
                };

            match response {
                Ok(response) => return Ok((response, endpoint.to_string())),
                Err(e) if e.is_transient() => {
                    warn!(endpoint, path, attempt, error = %e, "could not open stream");
                    last_error = e;
                }
                Err(e) => return Err(e),
            }
        }
        Err(last_error)
    }

    /// Whether a transaction with this hash is on the ledger and succeeded.
    async fn transaction_landed(&self, hash: &TransactionHash) -> Result<bool, LedgerError> {
        match self
            .get_json::<RawTransaction>(&format!("/transactions/{hash}"), &[])
            .await
        {
            Ok(raw) => Ok(raw.successful),
            Err(LedgerError::NotFound(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }

    async fn any_landed(&self, hashes: &[TransactionHash]) -> Option<TransactionHash> {
        for hash in hashes {
            match self.transaction_landed(hash).await {
                Ok(true) => return Some(hash.clone()),
                Ok(false) => {}
                Err(e) => warn!(%hash, error = %e, "could not check earlier submission"),
            }
        }
        None
    }

    fn build_transaction(
        &self,
        request: &PaymentRequest,
        sequence: i64,
    ) -> Result<PaymentTransaction, LedgerError> {
        let destination = decode_account_id(request.destination.as_str()).map_err(|e| {
            LedgerError::InvalidRequest(format!("destination {}: {e}", request.destination))
        })?;
        let asset = match &request.asset {
            Asset::Native => XdrAsset::Native,
            Asset::Credit { code, issuer } => XdrAsset::Credit {
                code: code.clone(),
                issuer: decode_account_id(issuer.as_str()).map_err(|e| {
                    LedgerError::InvalidRequest(format!("asset issuer {issuer}: {e}"))
                })?,
            },
        };
        let amount = to_stroops(request.amount)
            .map_err(|e| LedgerError::InvalidRequest(format!("amount {}: {e}", request.amount)))?;
        let now = Utc::now().timestamp().max(0) as u64;

        Ok(PaymentTransaction {
            source: self.keypair.public_key(),
            fee: self.config.base_fee,
            sequence: sequence + 1,
            min_time: 0,
            max_time: now + self.config.transaction_ttl.as_secs(),
            memo: request.memo.clone(),
            destination,
            asset,
            amount,
        })
    }

    async fn post_envelope(&self, endpoint: &str, envelope: &str) -> Result<(), LedgerError> {
        let request = self
            .http
            .post(format!("{endpoint}/transactions"))
            .form(&[("tx", envelope)])
            .timeout(self.config.request_timeout);
        let response = request
            .send()
            .await
            .map_err(|e| classify_reqwest(endpoint, e))?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        if status == StatusCode::BAD_REQUEST {
            let problem: SubmitProblem = response
                .json()
                .await
                .map_err(|e| LedgerError::Decode(e.to_string()))?;
            return Err(problem.extras.map(|e| e.result_codes).unwrap_or_default().classify());
        }
        Err(classify_status(status, endpoint))
    }
}

#[async_trait]
impl LedgerClient for HorizonClient {
    async fn load_account(&self, account: &AccountId) -> Result<AccountState, LedgerError> {
        let raw: RawAccount = self.get_json(&format!("/accounts/{account}"), &[]).await?;
        let sequence = raw
            .sequence
            .parse::<i64>()
            .map_err(|e| LedgerError::Decode(format!("sequence {:?}: {e}", raw.sequence)))?;
        Ok(AccountState {
            id: AccountId::new(raw.account_id),
            sequence,
        })
    }

    async fn subscribe_payments(&self, account: &AccountId) -> Result<PaymentStream, LedgerError> {
        let path = format!("/accounts/{account}/payments");
        let (response, endpoint) = self
            .open_stream(&path, &[("cursor", "now"), ("join", "transactions")])
            .await?;
        info!(%endpoint, %account, "payment stream connected");
        Ok(sse_stream(
            response,
            endpoint,
            self.config.stream_idle_timeout,
            parse_payment_event,
        ))
    }

    async fn subscribe_transactions(&self) -> Result<TransactionStream, LedgerError> {
        let (response, endpoint) = self
            .open_stream("/transactions", &[("cursor", "now")])
            .await?;
        info!(%endpoint, "transaction stream connected");
        Ok(sse_stream(
            response,
            endpoint,
            self.config.stream_idle_timeout,
            parse_transaction_event,
        ))
    }

    async fn recent_transactions(
        &self,
        account: &AccountId,
        limit: usize,
    ) -> Result<Vec<LedgerTransaction>, LedgerError> {
        let page: Page<RawTransaction> = self
            .get_json(
                &format!("/accounts/{account}/transactions"),
                &[("limit", limit.to_string()), ("order", "desc".to_string())],
            )
            .await?;
        Ok(page
            .embedded
            .records
            .into_iter()
            .map(RawTransaction::into_transaction)
            .collect())
    }

    async fn transaction_payments(
        &self,
        hash: &TransactionHash,
    ) -> Result<Vec<PaymentOperation>, LedgerError> {
        let page: Page<RawOperation> = self
            .get_json(
                &format!("/transactions/{hash}/operations"),
                &[("limit", "200".to_string())],
            )
            .await?;
        Ok(page
            .embedded
            .records
            .into_iter()
            .filter_map(|raw| raw.into_payment().map(|(payment, _)| payment))
            .collect())
    }

    async fn submit_payment(&self, request: &PaymentRequest) -> Result<SubmitReceipt, LedgerError> {
        let _guard = self.submit_lock.lock().await;

        let mut unknown_outcome: Vec<TransactionHash> = Vec::new();
        let error = match self.submit_attempts(request, &mut unknown_outcome).await {
            Ok(receipt) => return Ok(receipt),
            Err(e) => e,
        };

        if let Some(hash) = self.any_landed(&unknown_outcome).await {
            info!(%hash, "earlier submission landed");
            return Ok(SubmitReceipt { hash });
        }
        match unknown_outcome.pop() {
            Some(hash) => {
                error!(%hash, error = %error, "submission may have reached the ledger, not retrying");
                Err(LedgerError::Unconfirmed { hash: hash.0 })
            }
            None => Err(error),
        }
    }
}

impl HorizonClient {
    /// Submission loop. Hashes of envelopes whose fate is unknown are pushed
    /// to `unknown_outcome` for the caller to settle.
    async fn submit_attempts(
        &self,
        request: &PaymentRequest,
        unknown_outcome: &mut Vec<TransactionHash>,
    ) -> Result<SubmitReceipt, LedgerError> {
        let issuer = self.keypair.account_id().clone();
        let mut last_error = LedgerError::StreamClosed;

        for attempt in 0..self.attempts() {
            self.backoff(attempt).await;
            if let Some(hash) = self.any_landed(unknown_outcome).await {
                info!(%hash, "earlier submission landed");
                return Ok(SubmitReceipt { hash });
            }

            let account = self.load_account(&issuer).await?;
            let tx = self.build_transaction(request, account.sequence)?;
            let envelope = sign_payment(&tx, &self.keypair, &self.config.network_passphrase)?;
            let hash = TransactionHash::new(envelope.hash_hex());
            let endpoint = self.endpoint(attempt);
            debug!(%hash, endpoint, sequence = tx.sequence, "submitting payment");

            match self.post_envelope(endpoint, &envelope.to_base64()).await {
                Ok(()) => return Ok(SubmitReceipt { hash }),
                Err(e) if e.is_transient() => {
                    warn!(%hash, endpoint, attempt, error = %e, "submission failed, retrying");
                    if e.is_ambiguous() {
                        unknown_outcome.push(hash);
                    }
                    last_error = e;
                }
                Err(e) => return Err(e),
            }
        }
        Err(last_error)
    }
}

async fn send(endpoint: &str, request: RequestBuilder) -> Result<Response, LedgerError> {
    let response = request
        .send()
        .await
        .map_err(|e| classify_reqwest(endpoint, e))?;
    let status = response.status();
    if status.is_success() {
        Ok(response)
    } else {
        Err(classify_status(status, response.url().path()))
    }
}

fn classify_status(status: StatusCode, resource: &str) -> LedgerError {
    match status {
        StatusCode::NOT_FOUND => LedgerError::NotFound(resource.to_string()),
        StatusCode::TOO_MANY_REQUESTS => LedgerError::RateLimited,
        s if s.is_server_error() => LedgerError::Server { status: s.as_u16() },
        s => LedgerError::Rejected {
            codes: format!("http {}", s.as_u16()),
        },
    }
}

fn classify_reqwest(endpoint: &str, error: reqwest::Error) -> LedgerError {
    if error.is_timeout() {
        LedgerError::Timeout {
            endpoint: endpoint.to_string(),
        }
    } else if error.is_decode() {
        LedgerError::Decode(error.to_string())
    } else {
        LedgerError::Network(error.to_string())
    }
}

/// Decodes an event-stream body into items. Ends with
/// [`LedgerError::Timeout`] when no bytes arrive for `idle`.
fn sse_stream<T: Send + 'static>(
    response: Response,
    endpoint: String,
    idle: Duration,
    parse: fn(SseEvent) -> Option<T>,
) -> BoxStream<'static, Result<T, LedgerError>> {
    let bytes = Box::pin(response.bytes_stream());
    let state = (bytes, SseDecoder::new(), VecDeque::<T>::new(), false);

    futures::stream::unfold(state, move |(mut bytes, mut decoder, mut pending, done)| {
        let endpoint = endpoint.clone();
        async move {
            if done {
                return None;
            }
            loop {
                if let Some(item) = pending.pop_front() {
                    return Some((Ok(item), (bytes, decoder, pending, false)));
                }
                match tokio::time::timeout(idle, bytes.next()).await {
                    Ok(Some(Ok(chunk))) => {
                        pending.extend(decoder.push(&chunk).into_iter().filter_map(parse))
                    }
                    Ok(Some(Err(e))) => {
                        let error = LedgerError::Network(e.to_string());
                        return Some((Err(error), (bytes, decoder, pending, true)));
                    }
                    Ok(None) => return None,
                    Err(_) => {
                        let error = LedgerError::Timeout { endpoint };
                        return Some((Err(error), (bytes, decoder, pending, true)));
                    }
                }
            }
        }
    })
    .boxed()
}

/// Turns one SSE event into a payment. Anything else is dropped.
fn parse_payment_event(event: SseEvent) -> Option<ObservedPayment> {
    if !event.data.starts_with('{') {
        return None;
    }
    let raw: RawOperation = match serde_json::from_str(&event.data) {
        Ok(raw) => raw,
        Err(e) => {
            debug!(id = ?event.id, error = %e, "skipping undecodable stream event");
            return None;
        }
    };
    let (payment, transaction) = raw.into_payment()?;
    match transaction {
        Some(transaction) => Some(ObservedPayment {
            transaction: transaction.into_transaction(),
            payment,
        }),
        None => {
            warn!(hash = %payment.transaction_hash, "payment without joined transaction, skipping");
            None
        }
    }
}

/// Turns one SSE event into a transaction. Anything else is dropped.
fn parse_transaction_event(event: SseEvent) -> Option<LedgerTransaction> {
    if !event.data.starts_with('{') {
        return None;
    }
    match serde_json::from_str::<RawTransaction>(&event.data) {
        Ok(raw) => Some(raw.into_transaction()),
        Err(e) => {
            debug!(id = ?event.id, error = %e, "skipping undecodable stream event");
            None
        }
    }
}

// === Horizon resources ===

#[derive(Debug, Deserialize)]
struct Page<T> {
    #[serde(rename = "_embedded")]
    embedded: Records<T>,
}

#[derive(Debug, Deserialize)]
struct Records<T> {
    records: Vec<T>,
}

#[derive(Debug, Deserialize)]
struct RawAccount {
    account_id: String,
    sequence: String,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Deserialize)]
struct RawTransaction {
    hash: String,
    #[serde(default = "default_true")]
    successful: bool,
    source_account: String,
    #[serde(default)]
    memo_type: Option<String>,
    #[serde(default)]
    memo: Option<String>,
    created_at: DateTime<Utc>,
}

impl RawTransaction {
    fn into_transaction(self) -> LedgerTransaction {
        let memo = match (self.memo_type.as_deref(), self.memo) {
            (Some("text"), Some(text)) => Memo::Text(text),
            (Some("id"), Some(id)) => id.parse().map(Memo::Id).unwrap_or(Memo::None),
            (Some("hash"), Some(hash)) => Memo::Hash(hash),
            (Some("return"), Some(hash)) => Memo::Return(hash),
            _ => Memo::None,
        };
        LedgerTransaction {
            hash: TransactionHash::new(self.hash),
            source_account: AccountId::new(self.source_account),
            memo,
            successful: self.successful,
            created_at: self.created_at,
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawOperation {
    #[serde(rename = "type")]
    kind: String,
    transaction_hash: String,
    from: Option<String>,
    to: Option<String>,
    amount: Option<Decimal>,
    asset_type: Option<String>,
    asset_code: Option<String>,
    asset_issuer: Option<String>,
    transaction: Option<RawTransaction>,
}

impl RawOperation {
    /// Only plain payments with every required field survive.
    fn into_payment(self) -> Option<(PaymentOperation, Option<RawTransaction>)> {
        if self.kind != "payment" {
            return None;
        }
        let asset = match self.asset_type.as_deref()? {
            "native" => Asset::Native,
            "credit_alphanum4" | "credit_alphanum12" => {
                Asset::credit(self.asset_code?, AccountId::new(self.asset_issuer?))
            }
            _ => return None,
        };
        let payment = PaymentOperation {
            transaction_hash: TransactionHash::new(self.transaction_hash),
            from: AccountId::new(self.from?),
            to: AccountId::new(self.to?),
            amount: self.amount?,
            asset,
        };
        Some((payment, self.transaction))
    }
}

#[derive(Debug, Deserialize)]
struct SubmitProblem {
    extras: Option<SubmitExtras>,
}

#[derive(Debug, Deserialize)]
struct SubmitExtras {
    #[serde(default)]
    result_codes: ResultCodes,
}

#[derive(Debug, Default, Deserialize)]
struct ResultCodes {
    #[serde(default)]
    transaction: String,
    #[serde(default)]
    operations: Vec<String>,
}

impl ResultCodes {
    fn classify(self) -> LedgerError {
        if self.transaction == "tx_bad_seq" {
            return LedgerError::BadSequence;
        }
        if let Some(code) = self.operations.iter().find(|code| {
            matches!(
                code.as_str(),
                "op_no_trust" | "op_not_authorized" | "op_no_destination" | "op_line_full"
            )
        }) {
            return LedgerError::DestinationIneligible { code: code.clone() };
        }
        let codes = if self.operations.is_empty() {
            self.transaction
        } else {
            format!("{} [{}]", self.transaction, self.operations.join(", "))
        };
        LedgerError::Rejected { codes }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn payment_event_is_parsed_with_joined_transaction() {
        let event = SseEvent {
            event: None,
            id: Some("12884905985-1".into()),
            data: r#"{"type":"payment","transaction_hash":"abcd","from":"GFROM","to":"GTO",
                "amount":"10.0000000","asset_type":"native",
                "transaction":{"hash":"abcd","successful":true,"source_account":"GFROM",
                "memo_type":"text","memo":"EazeFi:CDRZT","created_at":"2025-03-01T10:00:00Z"}}"#
                .into(),
        };
        let observed = parse_payment_event(event).unwrap();
        assert_eq!(observed.payment.amount, dec!(10));
        assert_eq!(observed.payment.asset, Asset::Native);
        assert_eq!(observed.transaction.memo, Memo::Text("EazeFi:CDRZT".into()));
    }

    #[test]
    fn non_payment_operations_are_dropped() {
        let event = SseEvent {
            event: None,
            id: None,
            data: r#"{"type":"create_account","transaction_hash":"abcd","starting_balance":"5"}"#
                .into(),
        };
        assert!(parse_payment_event(event).is_none());
    }

    #[test]
    fn hello_frame_is_dropped() {
        let event = SseEvent {
            event: Some("open".into()),
            id: None,
            data: "\"hello\"".into(),
        };
        assert!(parse_payment_event(event).is_none());
    }

    #[test]
    fn transaction_event_is_parsed() {
        let event = SseEvent {
            event: None,
            id: Some("12884905985".into()),
            data: r#"{"hash":"abcd","successful":true,"source_account":"GFROM",
                "memo_type":"text","memo":"EazeFi:CDRZT","created_at":"2025-03-01T10:00:00Z"}"#
                .into(),
        };
        let transaction = parse_transaction_event(event).unwrap();
        assert_eq!(transaction.hash, TransactionHash::new("abcd"));
        assert_eq!(transaction.memo, Memo::Text("EazeFi:CDRZT".into()));

        let hello = SseEvent {
            event: Some("open".into()),
            id: None,
            data: "\"hello\"".into(),
        };
        assert!(parse_transaction_event(hello).is_none());
    }

    #[test]
    fn credit_payment_requires_code_and_issuer() {
        let raw: RawOperation = serde_json::from_str(
            r#"{"type":"payment","transaction_hash":"a","from":"G1","to":"G2",
                "amount":"1.5","asset_type":"credit_alphanum4","asset_code":"USDC"}"#,
        )
        .unwrap();
        assert!(raw.into_payment().is_none());
    }

    #[test]
    fn memo_types_are_mapped() {
        let raw: RawTransaction = serde_json::from_str(
            r#"{"hash":"a","source_account":"G1","memo_type":"id","memo":"77",
                "created_at":"2025-03-01T10:00:00Z"}"#,
        )
        .unwrap();
        let tx = raw.into_transaction();
        assert_eq!(tx.memo, Memo::Id(77));
        assert!(tx.successful);

        let raw: RawTransaction = serde_json::from_str(
            r#"{"hash":"a","source_account":"G1","memo_type":"none",
                "created_at":"2025-03-01T10:00:00Z"}"#,
        )
        .unwrap();
        assert_eq!(raw.into_transaction().memo, Memo::None);
    }

    #[test]
    fn result_codes_are_classified() {
        let codes = |tx: &str, ops: &[&str]| ResultCodes {
            transaction: tx.to_string(),
            operations: ops.iter().map(|s| s.to_string()).collect(),
        };
        assert_eq!(codes("tx_bad_seq", &[]).classify(), LedgerError::BadSequence);
        assert_eq!(
            codes("tx_failed", &["op_no_trust"]).classify(),
            LedgerError::DestinationIneligible {
                code: "op_no_trust".into()
            }
        );
        assert_eq!(
            codes("tx_failed", &["op_underfunded"]).classify(),
            LedgerError::Rejected {
                codes: "tx_failed [op_underfunded]".into()
            }
        );
    }

    #[test]
    fn statuses_are_classified() {
        assert_eq!(
            classify_status(StatusCode::TOO_MANY_REQUESTS, "/x"),
            LedgerError::RateLimited
        );
        assert_eq!(
            classify_status(StatusCode::BAD_GATEWAY, "/x"),
            LedgerError::Server { status: 502 }
        );
        assert_eq!(
            classify_status(StatusCode::NOT_FOUND, "/x"),
            LedgerError::NotFound("/x".into())
        );
    }
}
