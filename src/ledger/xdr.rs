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

//! Transaction envelope encoding.
//!
//! Builds a single-payment transaction with a text memo and time bounds out
//! of `stellar-xdr` types, hashes its signature payload and wraps it in a
//! signed v1 envelope.

use crate::error::LedgerError;
use crate::keys::Keypair;
use sha2::{Digest, Sha256};
use stellar_xdr::curr::{
    AccountId, AlphaNum4, AlphaNum12, Asset, AssetCode4, AssetCode12, BytesM, DecoratedSignature,
    Hash, Limits, Memo, MuxedAccount, Operation, OperationBody, PaymentOp, Preconditions,
    PublicKey, SequenceNumber, Signature, SignatureHint, StringM, TimeBounds, TimePoint,
    Transaction, TransactionEnvelope, TransactionExt, TransactionSignaturePayload,
    TransactionSignaturePayloadTaggedTransaction, TransactionV1Envelope, Uint256, VecM, WriteXdr,
};

/// Asset in its wire form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum XdrAsset {
    Native,
    Credit { code: String, issuer: [u8; 32] },
}

/// A single-payment transaction ready to be signed.
#[derive(Debug, Clone)]
pub struct PaymentTransaction {
    pub source: [u8; 32],
    pub fee: u32,
    pub sequence: i64,
    pub min_time: u64,
    pub max_time: u64,
    pub memo: String,
    pub destination: [u8; 32],
    pub asset: XdrAsset,
    pub amount: i64,
}

/// Signed envelope plus the transaction hash the ledger will assign to it.
#[derive(Debug, Clone)]
pub struct SignedEnvelope {
    pub hash: [u8; 32],
    pub bytes: Vec<u8>,
}

impl SignedEnvelope {
    pub fn hash_hex(&self) -> String {
        self.hash.iter().map(|b| format!("{b:02x}")).collect()
    }

    pub fn to_base64(&self) -> String {
        use base64::Engine;
        base64::engine::general_purpose::STANDARD.encode(&self.bytes)
    }
}

fn invalid(what: &str, e: impl std::fmt::Display) -> LedgerError {
    LedgerError::InvalidRequest(format!("{what}: {e}"))
}

fn account_id(key: &[u8; 32]) -> AccountId {
    AccountId(PublicKey::PublicKeyTypeEd25519(Uint256(*key)))
}

fn wire_asset(asset: &XdrAsset) -> Result<Asset, LedgerError> {
    match asset {
        XdrAsset::Native => Ok(Asset::Native),
        XdrAsset::Credit { code, issuer } => {
            let bytes = code.as_bytes();
            match bytes.len() {
                1..=4 => {
                    let mut padded = [0u8; 4];
                    padded[..bytes.len()].copy_from_slice(bytes);
                    Ok(Asset::CreditAlphanum4(AlphaNum4 {
                        asset_code: AssetCode4(padded),
                        issuer: account_id(issuer),
                    }))
                }
                5..=12 => {
                    let mut padded = [0u8; 12];
                    padded[..bytes.len()].copy_from_slice(bytes);
                    Ok(Asset::CreditAlphanum12(AlphaNum12 {
                        asset_code: AssetCode12(padded),
                        issuer: account_id(issuer),
                    }))
                }
                _ => Err(invalid("asset code", code)),
            }
        }
    }
}

/// Network id: SHA-256 of the network passphrase.
pub fn network_id(passphrase: &str) -> [u8; 32] {
    Sha256::digest(passphrase.as_bytes()).into()
}

/// Builds the wire transaction.
pub fn build_transaction(tx: &PaymentTransaction) -> Result<Transaction, LedgerError> {
    let memo: StringM<28> = tx
        .memo
        .as_bytes()
        .to_vec()
        .try_into()
        .map_err(|e| invalid("memo", e))?;
    let payment = Operation {
        source_account: None,
        body: OperationBody::Payment(PaymentOp {
            destination: MuxedAccount::Ed25519(Uint256(tx.destination)),
            asset: wire_asset(&tx.asset)?,
            amount: tx.amount,
        }),
    };

    let operations: VecM<Operation, 100> = vec![payment]
        .try_into()
        .map_err(|e| invalid("operations", e))?;

    Ok(Transaction {
        source_account: MuxedAccount::Ed25519(Uint256(tx.source)),
        fee: tx.fee,
        seq_num: SequenceNumber(tx.sequence),
        cond: Preconditions::Time(TimeBounds {
            min_time: TimePoint(tx.min_time),
            max_time: TimePoint(tx.max_time),
        }),
        memo: Memo::Text(memo),
        operations,
        ext: TransactionExt::V0,
    })
}

/// Hash that is signed and that identifies the transaction on the ledger.
pub fn transaction_hash(network_id: &[u8; 32], tx: &Transaction) -> Result<[u8; 32], LedgerError> {
    let payload = TransactionSignaturePayload {
        network_id: Hash(*network_id),
        tagged_transaction: TransactionSignaturePayloadTaggedTransaction::Tx(tx.clone()),
    };
    let bytes = payload
        .to_xdr(Limits::none())
        .map_err(|e| invalid("signature payload", e))?;
    Ok(Sha256::digest(&bytes).into())
}

/// Builds, hashes and signs the transaction into a v1 envelope.
pub fn sign_payment(
    tx: &PaymentTransaction,
    keypair: &Keypair,
    passphrase: &str,
) -> Result<SignedEnvelope, LedgerError> {
    let transaction = build_transaction(tx)?;
    let hash = transaction_hash(&network_id(passphrase), &transaction)?;
    let signed: BytesM<64> = keypair
        .sign(&hash)
        .to_vec()
        .try_into()
        .map_err(|e| invalid("signature", e))?;
    let signatures: VecM<DecoratedSignature, 20> = vec![DecoratedSignature {
        hint: SignatureHint(keypair.signature_hint()),
        signature: Signature(signed),
    }]
    .try_into()
    .map_err(|e| invalid("signatures", e))?;

    let envelope = TransactionEnvelope::Tx(TransactionV1Envelope {
        tx: transaction,
        signatures,
    });
    let bytes = envelope
        .to_xdr(Limits::none())
        .map_err(|e| invalid("envelope", e))?;

    Ok(SignedEnvelope { hash, bytes })
}

#[cfg(test)]
mod tests {
    use super::*;
    use ed25519_dalek::{Signature as DalekSignature, Verifier, VerifyingKey};
    use stellar_xdr::curr::ReadXdr;

    const TESTNET: &str = "Test SDF Network ; September 2015";
    const PUBLIC: &str = "Public Global Stellar Network ; September 2015";

    fn sample(asset: XdrAsset, memo: &str) -> PaymentTransaction {
        PaymentTransaction {
            source: [1u8; 32],
            fee: 100,
            sequence: 42,
            min_time: 0,
            max_time: 180,
            memo: memo.to_string(),
            destination: [2u8; 32],
            asset,
            amount: 24_873_000_000,
        }
    }

    fn hex(bytes: &[u8]) -> String {
        bytes.iter().map(|b| format!("{b:02x}")).collect()
    }

    #[test]
    fn testnet_network_id_matches_published_value() {
        assert_eq!(
            hex(&network_id(TESTNET)),
            "cee0302d59844d32bdca915c8203dd44b33fbb7edc19051ea37abedf28ecd472"
        );
    }

    #[test]
    fn hash_covers_network_envelope_type_and_body() {
        let tx = build_transaction(&sample(XdrAsset::Native, "abc")).unwrap();
        let body = tx.to_xdr(Limits::none()).unwrap();

        let mut hasher = Sha256::new();
        hasher.update(network_id(TESTNET));
        hasher.update([0, 0, 0, 2]);
        hasher.update(&body);
        let expected: [u8; 32] = hasher.finalize().into();

        assert_eq!(transaction_hash(&network_id(TESTNET), &tx).unwrap(), expected);
    }

    #[test]
    fn credit_asset_width_follows_code_length() {
        let short = build_transaction(&sample(
            XdrAsset::Credit {
                code: "TSHT".into(),
                issuer: [3u8; 32],
            },
            "",
        ))
        .unwrap();
        let long = build_transaction(&sample(
            XdrAsset::Credit {
                code: "TSHTX".into(),
                issuer: [3u8; 32],
            },
            "",
        ))
        .unwrap();

        let OperationBody::Payment(ref op) = short.operations[0].body else {
            panic!("expected a payment");
        };
        assert!(matches!(op.asset, Asset::CreditAlphanum4(ref a) if &a.asset_code.0 == b"TSHT"));
        let OperationBody::Payment(ref op) = long.operations[0].body else {
            panic!("expected a payment");
        };
        assert!(
            matches!(op.asset, Asset::CreditAlphanum12(ref a) if &a.asset_code.0[..6] == b"TSHTX\0")
        );
    }

    #[test]
    fn oversized_fields_are_rejected() {
        let memo = "x".repeat(29);
        assert!(matches!(
            build_transaction(&sample(XdrAsset::Native, &memo)),
            Err(LedgerError::InvalidRequest(_))
        ));
        let asset = XdrAsset::Credit {
            code: "ABCDEFGHIJKLM".into(),
            issuer: [3u8; 32],
        };
        assert!(matches!(
            build_transaction(&sample(asset, "")),
            Err(LedgerError::InvalidRequest(_))
        ));
    }

    #[test]
    fn envelope_decodes_and_signature_covers_hash() {
        let keypair = Keypair::from_seed(&[9u8; 32]);
        let tx = PaymentTransaction {
            source: keypair.public_key(),
            ..sample(XdrAsset::Native, "TSHT Remittance for 3389e9f0")
        };
        let envelope = sign_payment(&tx, &keypair, TESTNET).unwrap();
        assert_eq!(&envelope.bytes[..4], &[0, 0, 0, 2]);
        assert_eq!(envelope.hash_hex().len(), 64);

        let decoded = TransactionEnvelope::from_xdr(&envelope.bytes, Limits::none()).unwrap();
        let TransactionEnvelope::Tx(v1) = decoded else {
            panic!("expected a v1 envelope");
        };
        assert_eq!(v1.tx.seq_num, SequenceNumber(42));
        assert_eq!(v1.tx.fee, 100);
        let Memo::Text(ref memo) = v1.tx.memo else {
            panic!("expected a text memo");
        };
        assert_eq!(memo.to_vec(), b"TSHT Remittance for 3389e9f0".to_vec());
        assert_eq!(
            transaction_hash(&network_id(TESTNET), &v1.tx).unwrap(),
            envelope.hash
        );

        assert_eq!(v1.signatures.len(), 1);
        let decorated = &v1.signatures[0];
        assert_eq!(decorated.hint.0, keypair.signature_hint());
        let signature: [u8; 64] = decorated.signature.0.to_vec().try_into().unwrap();
        let verifying = VerifyingKey::from_bytes(&keypair.public_key()).unwrap();
        assert!(verifying
            .verify(&envelope.hash, &DalekSignature::from_bytes(&signature))
            .is_ok());
    }

    #[test]
    fn hash_depends_on_network() {
        let tx = build_transaction(&sample(XdrAsset::Native, "")).unwrap();
        assert_ne!(
            transaction_hash(&network_id(TESTNET), &tx).unwrap(),
            transaction_hash(&network_id(PUBLIC), &tx).unwrap()
        );
    }
}
