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

//! Transaction data model.
//!
//! Raw ledger shapes ([`LedgerTransaction`], [`PaymentOperation`]) are turned
//! into a [`TaggedTransaction`] by the memo decoder. The engine derives an
//! [`IssuanceIntent`] from it and persists the outcome as a
//! [`ProcessedRecord`]:
//!
//! - [`TaggedTransaction`] → [`IssuanceIntent`] (conversion)
//! - [`IssuanceIntent`] → [`ProcessedRecord`] (`Completed` or `Failed`)

use crate::base::{AccountId, TransactionHash};
use crate::error::ConfigError;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Maximum size in bytes of a ledger text memo.
pub const MEMO_TEXT_LIMIT: usize = 28;

/// Asset a payment is denominated in.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Asset {
    /// The ledger's native unit (XLM).
    Native,
    /// An issued asset, identified by code and issuing account.
    Credit { code: String, issuer: AccountId },
}

impl Asset {
    pub fn credit(code: impl Into<String>, issuer: AccountId) -> Self {
        Self::Credit {
            code: code.into(),
            issuer,
        }
    }

    /// Parses `native` or `CODE:ISSUER`.
    pub fn parse(value: &str) -> Result<Self, ConfigError> {
        let value = value.trim();
        if value.eq_ignore_ascii_case("native") || value.eq_ignore_ascii_case("xlm") {
            return Ok(Self::Native);
        }
        let (code, issuer) = value
            .split_once(':')
            .ok_or_else(|| ConfigError::InvalidAsset(value.to_string()))?;
        Self::validate_code(code)?;
        if issuer.is_empty() {
            return Err(ConfigError::InvalidAsset(value.to_string()));
        }
        Ok(Self::credit(code, AccountId::new(issuer)))
    }

    /// Asset codes are 1 to 12 ASCII alphanumerics.
    pub fn validate_code(code: &str) -> Result<(), ConfigError> {
        let valid = (1..=12).contains(&code.len()) && code.bytes().all(|b| b.is_ascii_alphanumeric());
        if valid {
            Ok(())
        } else {
            Err(ConfigError::InvalidAsset(code.to_string()))
        }
    }

    /// Short code for display and memos.
    pub fn code(&self) -> &str {
        match self {
            Self::Native => "XLM",
            Self::Credit { code, .. } => code,
        }
    }
}

impl fmt::Display for Asset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Native => f.write_str("native"),
            Self::Credit { code, issuer } => write!(f, "{code}:{issuer}"),
        }
    }
}

/// Transaction memo as reported by the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Memo {
    #[default]
    None,
    Text(String),
    Id(u64),
    Hash(String),
    Return(String),
}

impl Memo {
    /// Returns the memo text, only for text memos.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            _ => None,
        }
    }
}

/// A transaction as listed by the ledger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerTransaction {
    pub hash: TransactionHash,
    pub source_account: AccountId,
    pub memo: Memo,
    pub successful: bool,
    pub created_at: DateTime<Utc>,
}

/// A payment operation contained in a ledger transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentOperation {
    pub transaction_hash: TransactionHash,
    pub from: AccountId,
    pub to: AccountId,
    pub amount: Decimal,
    pub asset: Asset,
}

/// A payment recognized as an application transfer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaggedTransaction {
    pub hash: TransactionHash,
    pub source: AccountId,
    pub destination: AccountId,
    pub amount: Decimal,
    pub asset: Asset,
    pub memo: String,
    pub created_at: DateTime<Utc>,
}

/// Issuance computed for one tagged transaction. Never persisted on its own.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuanceIntent {
    pub destination: AccountId,
    pub asset: Asset,
    pub amount: Decimal,
    pub source_hash: TransactionHash,
}

impl IssuanceIntent {
    /// Traceability memo pointing back at the source transaction.
    ///
    /// Long asset codes drop the fixed wording, never the hash fragment, to
    /// stay within [`MEMO_TEXT_LIMIT`] bytes.
    pub fn memo(&self) -> String {
        let code = self.asset.code();
        let fragment = self.source_hash.short(8);
        let full = format!("{code} Remittance for {fragment}");
        if full.len() <= MEMO_TEXT_LIMIT {
            return full;
        }
        let compact = format!("{code} for {fragment}");
        truncate_to_bytes(&compact, MEMO_TEXT_LIMIT).to_string()
    }
}

fn truncate_to_bytes(text: &str, limit: usize) -> &str {
    if text.len() <= limit {
        return text;
    }
    let mut end = limit;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}

/// Outcome of handling a tagged transaction.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ProcessingStatus {
    Completed,
    Failed,
}

/// Persisted record of one handled tagged transaction. Never mutated.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProcessedRecord {
    pub hash: TransactionHash,
    pub timestamp: DateTime<Utc>,
    pub from: AccountId,
    pub to: AccountId,
    pub amount: Decimal,
    pub memo: String,
    pub status: ProcessingStatus,
}

impl ProcessedRecord {
    pub fn new(transaction: &TaggedTransaction, status: ProcessingStatus) -> Self {
        Self {
            hash: transaction.hash.clone(),
            timestamp: Utc::now(),
            from: transaction.source.clone(),
            to: transaction.destination.clone(),
            amount: transaction.amount,
            memo: transaction.memo.clone(),
            status,
        }
    }
}
