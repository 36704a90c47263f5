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

//! # Remittance Monitor
//!
//! Watches a ledger account for payments tagged with an application memo,
//! converts each amount at a fixed exchange rate, and issues the converted
//! amount of a derivative asset to the recipient, exactly once per source
//! transaction.
//!
//! ## Core Components
//!
//! - [`MemoDecoder`]: recognizes tagged transactions by memo prefix
//! - [`Converter`]: fixed-rate conversion rounded to ledger precision
//! - [`ProcessedStore`]: bounded, persisted history with atomic reservations
//! - [`IssuanceEngine`]: converts and issues, recording every final outcome
//! - [`StreamSupervisor`]: live account or network feed, restarted on failure
//! - [`BackfillScanner`]: startup scan of recent history
//! - [`HorizonClient`]: [`LedgerClient`] backed by a Horizon server
//!
//! ## Example
//!
//! ```
//! use remit_monitor::{ProcessedStore, TransactionHash};
//! use std::sync::Arc;
//!
//! let store = Arc::new(ProcessedStore::in_memory(1000));
//! let hash = TransactionHash::new("9f2c41d0");
//!
//! // The first claim wins; a second feeder seeing the same hash backs off.
//! let claim = store.reserve(&hash);
//! assert!(claim.is_some());
//! assert!(store.reserve(&hash).is_none());
//!
//! // An uncommitted claim is released when dropped.
//! drop(claim);
//! assert!(store.reserve(&hash).is_some());
//! ```
//!
//! ## Concurrency
//!
//! The live streams and the backfill share one engine. Handlers run on
//! separate tasks; the store's per-hash reservation is the only thing that
//! decides who issues a given transaction.

pub mod backfill;
mod base;
pub mod config;
mod conversion;
pub mod engine;
pub mod error;
pub mod keys;
pub mod ledger;
mod memo;
pub mod monitor;
pub mod store;
pub mod supervisor;
mod transaction;

pub use backfill::{BackfillReport, BackfillScanner};
pub use base::{AccountId, TransactionHash};
pub use config::{MonitorConfig, Network, Settings};
pub use conversion::Converter;
pub use engine::{IssuanceEngine, Outcome};
pub use error::{ConfigError, ConversionError, LedgerError, MonitorError, StoreError};
pub use keys::Keypair;
pub use ledger::{HorizonClient, HorizonConfig, LedgerClient};
pub use memo::MemoDecoder;
pub use monitor::Monitor;
pub use store::ProcessedStore;
pub use supervisor::{Feed, StreamSupervisor, SupervisorState};
pub use transaction::{
    Asset, IssuanceIntent, LedgerTransaction, Memo, PaymentOperation, ProcessedRecord,
    ProcessingStatus, TaggedTransaction,
};
