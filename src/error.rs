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

//! Error types for the remittance monitor.
//!
//! Per-transaction failures ([`LedgerError`], [`ConversionError`]) are
//! contained by the engine and logged. A [`MonitorError`] stops the process:
//! issuing tokens that cannot be recorded reopens the double-issuance window.

use std::path::PathBuf;
use thiserror::Error;

/// Failures talking to the ledger.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    /// Request did not complete within the configured timeout
    #[error("request to {endpoint} timed out")]
    Timeout { endpoint: String },

    /// Connection-level failure
    #[error("network error: {0}")]
    Network(String),

    /// Ledger endpoint asked us to slow down
    #[error("rate limited by ledger endpoint")]
    RateLimited,

    /// Ledger endpoint returned a 5xx status
    #[error("ledger endpoint returned status {status}")]
    Server { status: u16 },

    /// Issuer sequence number was stale at submission time
    #[error("issuer sequence number out of date")]
    BadSequence,

    /// Recipient cannot hold the target asset (missing or unauthorized trustline)
    #[error("destination cannot receive asset ({code})")]
    DestinationIneligible { code: String },

    /// Ledger rejected the transaction for any other reason
    #[error("transaction rejected: {codes}")]
    Rejected { codes: String },

    /// Request could not be built (malformed account or asset)
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Requested resource does not exist
    #[error("resource not found: {0}")]
    NotFound(String),

    /// Response body could not be decoded
    #[error("could not decode ledger response: {0}")]
    Decode(String),

    /// Live subscription ended
    #[error("event stream closed")]
    StreamClosed,

    /// Submission may have reached the ledger but could not be confirmed
    #[error("submission of {hash} could not be confirmed")]
    Unconfirmed { hash: String },
}

impl LedgerError {
    /// Whether the failure may succeed when retried later.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::Timeout { .. }
                | Self::Network(_)
                | Self::RateLimited
                | Self::Server { .. }
                | Self::BadSequence
                | Self::StreamClosed
        )
    }

    /// Whether a submission failing this way may still have reached the ledger.
    pub fn is_ambiguous(&self) -> bool {
        matches!(self, Self::Timeout { .. } | Self::Server { .. } | Self::Network(_))
    }
}

/// Failures of the processed-transaction store. Always fatal.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("history file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("history file {path} is corrupt: {source}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("could not serialize history: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("history write task failed: {0}")]
    Background(String),
}

/// Amount conversion failures.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConversionError {
    #[error("exchange rate must be positive")]
    NonPositiveRate,

    #[error("source amount must be positive")]
    NonPositiveAmount,

    #[error("converted amount overflows")]
    Overflow,

    #[error("converted amount rounds below the smallest unit")]
    BelowMinimum,
}

/// Malformed account or seed strkeys.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum KeyError {
    #[error("not a valid account id")]
    InvalidAccountId,

    #[error("not a valid secret seed")]
    InvalidSecretSeed,
}

/// Invalid monitor configuration.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid exchange rate: {0}")]
    InvalidRate(String),

    #[error("invalid asset: {0}")]
    InvalidAsset(String),

    #[error("invalid key for {field}: {source}")]
    InvalidKey {
        field: &'static str,
        #[source]
        source: KeyError,
    },

    #[error("{0} must be greater than zero")]
    ZeroLimit(&'static str),

    #[error("backfill limit {0} exceeds the ledger page size of 200")]
    BackfillTooLarge(usize),

    #[error("history cap {cap} is smaller than the backfill limit {limit}")]
    HistoryBelowBackfill { cap: usize, limit: usize },
}

/// Failures that stop the long-running monitor tasks.
#[derive(Error, Debug)]
pub enum MonitorError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("worker task failed: {0}")]
    Worker(String),
}
