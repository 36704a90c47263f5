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

//! Memo/marker decoding.
//!
//! Recognizes application transfers among arbitrary ledger traffic. The
//! decoder never fails: anything malformed or unexpected is "no match".

use crate::transaction::{LedgerTransaction, PaymentOperation, TaggedTransaction};
use tracing::debug;

/// Matches transactions whose text memo starts with a fixed prefix.
#[derive(Debug, Clone)]
pub struct MemoDecoder {
    prefix: String,
}

impl MemoDecoder {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Whether the transaction carries the application marker.
    ///
    /// Only successful transactions with a text memo starting with the prefix
    /// match. A prefix appearing elsewhere in the memo does not count.
    pub fn matches(&self, transaction: &LedgerTransaction) -> bool {
        if !transaction.successful {
            return false;
        }
        transaction
            .memo
            .as_text()
            .is_some_and(|text| !self.prefix.is_empty() && text.starts_with(&self.prefix))
    }

    /// Combines a tagged transaction with one of its payments.
    ///
    /// Returns `None` when the transaction is not tagged or the payment does
    /// not belong to it.
    pub fn decode(
        &self,
        transaction: &LedgerTransaction,
        payment: &PaymentOperation,
    ) -> Option<TaggedTransaction> {
        if !self.matches(transaction) {
            return None;
        }
        if payment.transaction_hash != transaction.hash {
            debug!(
                hash = %transaction.hash,
                payment_hash = %payment.transaction_hash,
                "payment does not belong to transaction, ignoring"
            );
            return None;
        }
        let memo = transaction.memo.as_text()?.to_string();

        Some(TaggedTransaction {
            hash: transaction.hash.clone(),
            source: payment.from.clone(),
            destination: payment.to.clone(),
            amount: payment.amount,
            asset: payment.asset.clone(),
            memo,
            created_at: transaction.created_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::base::{AccountId, TransactionHash};
    use crate::transaction::{Asset, Memo};
    use chrono::Utc;
    use rust_decimal_macros::dec;

    fn transaction(memo: Memo) -> LedgerTransaction {
        LedgerTransaction {
            hash: TransactionHash::new("aaaa"),
            source_account: AccountId::new("GSENDER"),
            memo,
            successful: true,
            created_at: Utc::now(),
        }
    }

    fn payment(hash: &str) -> PaymentOperation {
        PaymentOperation {
            transaction_hash: TransactionHash::new(hash),
            from: AccountId::new("GSENDER"),
            to: AccountId::new("GRECIPIENT"),
            amount: dec!(10.0000000),
            asset: Asset::Native,
        }
    }

    #[test]
    fn matches_prefixed_text_memo() {
        let decoder = MemoDecoder::new("EazeFi:");
        assert!(decoder.matches(&transaction(Memo::Text("EazeFi:CDRZT".into()))));
    }

    #[test]
    fn rejects_prefix_as_substring() {
        let decoder = MemoDecoder::new("EazeFi:");
        assert!(!decoder.matches(&transaction(Memo::Text("Re EazeFi:CDRZT".into()))));
        assert!(!decoder.matches(&transaction(Memo::Text("eazefi:CDRZT".into()))));
    }

    #[test]
    fn rejects_non_text_memos() {
        let decoder = MemoDecoder::new("EazeFi:");
        assert!(!decoder.matches(&transaction(Memo::None)));
        assert!(!decoder.matches(&transaction(Memo::Id(42))));
        assert!(!decoder.matches(&transaction(Memo::Hash("EazeFi:".into()))));
    }

    #[test]
    fn rejects_failed_transactions() {
        let decoder = MemoDecoder::new("EazeFi:");
        let mut tx = transaction(Memo::Text("EazeFi:CDRZT".into()));
        tx.successful = false;
        assert!(!decoder.matches(&tx));
    }

    #[test]
    fn empty_prefix_matches_nothing() {
        let decoder = MemoDecoder::new("");
        assert!(!decoder.matches(&transaction(Memo::Text("anything".into()))));
    }

    #[test]
    fn decode_builds_tagged_transaction() {
        let decoder = MemoDecoder::new("EazeFi:");
        let tx = transaction(Memo::Text("EazeFi:CDRZT".into()));
        let tagged = decoder.decode(&tx, &payment("aaaa")).unwrap();

        assert_eq!(tagged.hash, tx.hash);
        assert_eq!(tagged.destination, AccountId::new("GRECIPIENT"));
        assert_eq!(tagged.amount, dec!(10));
        assert_eq!(tagged.memo, "EazeFi:CDRZT");
    }

    #[test]
    fn decode_rejects_foreign_payment() {
        let decoder = MemoDecoder::new("EazeFi:");
        let tx = transaction(Memo::Text("EazeFi:CDRZT".into()));
        assert!(decoder.decode(&tx, &payment("bbbb")).is_none());
    }
}
