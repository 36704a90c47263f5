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

//! Monitor configuration.
//!
//! Every setting is a command-line flag that can also come from the
//! environment. [`Settings::into_config`] validates the raw values into a
//! [`MonitorConfig`].

use crate::base::AccountId;
use crate::conversion::Converter;
use crate::error::ConfigError;
use crate::keys::{Keypair, decode_account_id};
use crate::ledger::HorizonConfig;
use crate::transaction::Asset;
use clap::{ArgAction, Parser, ValueEnum};
use rust_decimal::Decimal;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Largest page the ledger API serves.
pub const MAX_BACKFILL_LIMIT: usize = 200;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Network {
    Testnet,
    Public,
}

impl Network {
    pub fn horizon_url(&self) -> &'static str {
        match self {
            Self::Testnet => "https://horizon-testnet.stellar.org",
            Self::Public => "https://horizon.stellar.org",
        }
    }

    pub fn passphrase(&self) -> &'static str {
        match self {
            Self::Testnet => "Test SDF Network ; September 2015",
            Self::Public => "Public Global Stellar Network ; September 2015",
        }
    }
}

/// Remittance monitor - issue a derivative asset for tagged payments
///
/// Watches an account for payments whose memo starts with the configured
/// prefix and pays the converted amount in the target asset to each
/// recipient, exactly once per source transaction.
#[derive(Parser)]
#[command(name = "remit-monitor", version)]
pub struct Settings {
    /// Ledger network
    #[arg(long, env = "REMIT_NETWORK", value_enum, default_value_t = Network::Testnet)]
    pub network: Network,

    /// Horizon endpoint (defaults to the network's public endpoint)
    #[arg(long, env = "REMIT_HORIZON_URL")]
    pub horizon_url: Option<String>,

    /// Alternate Horizon endpoint used when retrying
    #[arg(long, env = "REMIT_FALLBACK_HORIZON_URL")]
    pub fallback_horizon_url: Option<String>,

    /// Secret seed (S...) of the issuing account
    #[arg(long, env = "ISSUER_SECRET", hide_env_values = true)]
    pub issuer_secret: String,

    /// Code of the asset to issue
    #[arg(long, env = "REMIT_ASSET_CODE", default_value = "TSHT")]
    pub asset_code: String,

    /// Issuer of the asset to issue (defaults to the issuing account)
    #[arg(long, env = "REMIT_ASSET_ISSUER")]
    pub asset_issuer: Option<String>,

    /// Asset accepted for conversion: `native` or `CODE:ISSUER`
    #[arg(long, env = "REMIT_SOURCE_ASSET", default_value = "native")]
    pub source_asset: String,

    /// Target units issued per source unit
    #[arg(long, env = "REMIT_EXCHANGE_RATE")]
    pub exchange_rate: String,

    /// Memo prefix that marks application transfers
    #[arg(long, env = "REMIT_MEMO_PREFIX", default_value = "EazeFi:")]
    pub memo_prefix: String,

    /// Account to watch (defaults to the issuing account)
    #[arg(long, env = "REMIT_ACCOUNT")]
    pub account: Option<String>,

    /// File holding processed transactions
    #[arg(long, env = "REMIT_HISTORY_FILE", default_value = "transaction-history.json")]
    pub history_file: PathBuf,

    /// Processed transactions kept in history
    #[arg(long, env = "REMIT_HISTORY_CAP", default_value_t = 1000)]
    pub history_cap: usize,

    /// Recent transactions checked at startup
    #[arg(long, env = "REMIT_BACKFILL_LIMIT", default_value_t = 50)]
    pub backfill_limit: usize,

    /// Delay before restarting a failed stream, in seconds
    #[arg(long, env = "REMIT_RESTART_BACKOFF_SECS", default_value_t = 5)]
    pub restart_backoff_secs: u64,

    /// Timeout for each ledger request, in seconds
    #[arg(long, env = "REMIT_REQUEST_TIMEOUT_SECS", default_value_t = 20)]
    pub request_timeout_secs: u64,

    /// Retries for transient ledger failures
    #[arg(long, env = "REMIT_MAX_RETRIES", default_value_t = 2)]
    pub max_retries: u32,

    /// Remittances handled concurrently
    #[arg(long, env = "REMIT_WORKERS", default_value_t = 8)]
    pub workers: usize,

    /// Longest silence tolerated on a live stream before reconnecting, in seconds
    #[arg(long, env = "REMIT_STREAM_IDLE_TIMEOUT_SECS", default_value_t = 60)]
    pub stream_idle_timeout_secs: u64,

    /// Also follow the network-wide transaction stream for tagged transfers
    #[arg(long, env = "REMIT_NETWORK_STREAM", default_value_t = true, action = ArgAction::Set)]
    pub network_stream: bool,
}

/// Validated monitor configuration.
#[derive(Debug)]
pub struct MonitorConfig {
    pub network: Network,
    pub endpoints: Vec<String>,
    pub issuer: Keypair,
    pub account: AccountId,
    pub source_asset: Asset,
    pub target_asset: Asset,
    pub converter: Converter,
    pub memo_prefix: String,
    pub history_file: PathBuf,
    pub history_cap: usize,
    pub backfill_limit: usize,
    pub restart_backoff: Duration,
    pub request_timeout: Duration,
    pub max_retries: u32,
    pub workers: usize,
    pub stream_idle_timeout: Duration,
    pub network_stream: bool,
}

impl MonitorConfig {
    /// Horizon adapter settings derived from this configuration.
    pub fn horizon(&self) -> HorizonConfig {
        let mut config = HorizonConfig::new(self.endpoints.clone(), self.network.passphrase());
        config.request_timeout = self.request_timeout;
        config.max_retries = self.max_retries;
        config.stream_idle_timeout = self.stream_idle_timeout;
        config
    }
}

impl Settings {
    /// Validates raw settings.
    ///
    /// # Errors
    ///
    /// - [`ConfigError::InvalidKey`] - secret or an account id is malformed.
    /// - [`ConfigError::InvalidAsset`] - asset code or source asset is malformed.
    /// - [`ConfigError::InvalidRate`] - rate is not a positive decimal.
    /// - [`ConfigError::ZeroLimit`] / [`ConfigError::BackfillTooLarge`] - bad limits.
    /// - [`ConfigError::HistoryBelowBackfill`] - the history could evict hashes
    ///   the startup scan is about to revisit.
    pub fn into_config(self) -> Result<MonitorConfig, ConfigError> {
        let issuer = Keypair::from_secret(&self.issuer_secret).map_err(|source| {
            ConfigError::InvalidKey {
                field: "issuer secret",
                source,
            }
        })?;

        let account = match self.account {
            Some(account) => validated_account("account", account)?,
            None => issuer.account_id().clone(),
        };

        Asset::validate_code(&self.asset_code)?;
        let asset_issuer = match self.asset_issuer {
            Some(asset_issuer) => validated_account("asset issuer", asset_issuer)?,
            None => issuer.account_id().clone(),
        };
        let target_asset = Asset::credit(self.asset_code, asset_issuer);

        let source_asset = match Asset::parse(&self.source_asset)? {
            Asset::Credit { code, issuer } => {
                Asset::credit(code, validated_account("source asset issuer", issuer.0)?)
            }
            Asset::Native => Asset::Native,
        };
        if source_asset == target_asset {
            return Err(ConfigError::InvalidAsset(
                "source and target asset are the same".to_string(),
            ));
        }

        let rate = Decimal::from_str(self.exchange_rate.trim())
            .map_err(|e| ConfigError::InvalidRate(format!("{}: {e}", self.exchange_rate)))?;
        let converter =
            Converter::new(rate).map_err(|e| ConfigError::InvalidRate(format!("{rate}: {e}")))?;

        for (name, value) in [
            ("history cap", self.history_cap),
            ("backfill limit", self.backfill_limit),
            ("workers", self.workers),
            ("request timeout", self.request_timeout_secs as usize),
            ("stream idle timeout", self.stream_idle_timeout_secs as usize),
        ] {
            if value == 0 {
                return Err(ConfigError::ZeroLimit(name));
            }
        }
        if self.backfill_limit > MAX_BACKFILL_LIMIT {
            return Err(ConfigError::BackfillTooLarge(self.backfill_limit));
        }
        if self.history_cap < self.backfill_limit {
            return Err(ConfigError::HistoryBelowBackfill {
                cap: self.history_cap,
                limit: self.backfill_limit,
            });
        }

        let mut endpoints = vec![
            self.horizon_url
                .unwrap_or_else(|| self.network.horizon_url().to_string()),
        ];
        endpoints.extend(self.fallback_horizon_url);

        Ok(MonitorConfig {
            network: self.network,
            endpoints,
            issuer,
            account,
            source_asset,
            target_asset,
            converter,
            memo_prefix: self.memo_prefix,
            history_file: self.history_file,
            history_cap: self.history_cap,
            backfill_limit: self.backfill_limit,
            restart_backoff: Duration::from_secs(self.restart_backoff_secs),
            request_timeout: Duration::from_secs(self.request_timeout_secs),
            max_retries: self.max_retries,
            workers: self.workers,
            stream_idle_timeout: Duration::from_secs(self.stream_idle_timeout_secs),
            network_stream: self.network_stream,
        })
    }
}

fn validated_account(field: &'static str, account: String) -> Result<AccountId, ConfigError> {
    decode_account_id(account.trim())
        .map_err(|source| ConfigError::InvalidKey { field, source })?;
    Ok(AccountId::new(account.trim()))
}
