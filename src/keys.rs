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

//! Issuer identity.
//!
//! Stellar keys travel as "strkeys": account ids start with `G`, secret
//! seeds with `S`. Encoding and checksums are left to `stellar-strkey`.

use crate::base::AccountId;
use crate::error::KeyError;
use ed25519_dalek::{Signer, SigningKey};
use std::fmt;
use stellar_strkey::ed25519::{PrivateKey, PublicKey};

/// Decodes an account id (`G...`) into its ed25519 public key.
pub fn decode_account_id(account: &str) -> Result<[u8; 32], KeyError> {
    PublicKey::from_string(account)
        .map(|key| key.0)
        .map_err(|_| KeyError::InvalidAccountId)
}

/// Encodes an ed25519 public key as an account id.
pub fn encode_account_id(key: &[u8; 32]) -> AccountId {
    AccountId(PublicKey(*key).to_string())
}

/// Encodes a raw ed25519 seed as a secret strkey.
pub fn encode_secret_seed(seed: &[u8; 32]) -> String {
    PrivateKey(*seed).to_string()
}

/// The issuer's signing identity.
#[derive(Clone)]
pub struct Keypair {
    signing: SigningKey,
    account: AccountId,
}

impl Keypair {
    /// Parses a secret seed (`S...`).
    pub fn from_secret(secret: &str) -> Result<Self, KeyError> {
        let seed = PrivateKey::from_string(secret.trim()).map_err(|_| KeyError::InvalidSecretSeed)?;
        Ok(Self::from_seed(&seed.0))
    }

    pub fn from_seed(seed: &[u8; 32]) -> Self {
        let signing = SigningKey::from_bytes(seed);
        let account = encode_account_id(&signing.verifying_key().to_bytes());
        Self { signing, account }
    }

    pub fn account_id(&self) -> &AccountId {
        &self.account
    }

    pub fn public_key(&self) -> [u8; 32] {
        self.signing.verifying_key().to_bytes()
    }

    /// Last four bytes of the public key, used to decorate signatures.
    pub fn signature_hint(&self) -> [u8; 4] {
        let key = self.public_key();
        [key[28], key[29], key[30], key[31]]
    }

    pub fn sign(&self, message: &[u8]) -> [u8; 64] {
        self.signing.sign(message).to_bytes()
    }
}

impl fmt::Debug for Keypair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Keypair")
            .field("account", &self.account)
            .finish_non_exhaustive()
    }
}
