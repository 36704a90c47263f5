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

use clap::Parser;
use remit_monitor::{HorizonClient, Monitor, ProcessedStore, Settings};
use std::process;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = match Settings::parse().into_config() {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "invalid configuration");
            process::exit(1);
        }
    };

    // A history that cannot be read must not be replaced by an empty one.
    let store = match ProcessedStore::load(&config.history_file, config.history_cap) {
        Ok(store) => Arc::new(store),
        Err(e) => {
            error!(error = %e, "could not load transaction history");
            process::exit(1);
        }
    };

    let ledger = match HorizonClient::new(config.horizon(), config.issuer.clone()) {
        Ok(ledger) => Arc::new(ledger),
        Err(e) => {
            error!(error = %e, "could not create ledger client");
            process::exit(1);
        }
    };

    info!(
        network = ?config.network,
        account = %config.account,
        source = %config.source_asset,
        target = %config.target_asset,
        rate = %config.converter.rate(),
        network_stream = config.network_stream,
        "starting remittance monitor"
    );

    let monitor = Monitor::new(ledger, store, &config);
    let shutdown = CancellationToken::new();
    tokio::spawn({
        let shutdown = shutdown.clone();
        async move {
            match tokio::signal::ctrl_c().await {
                Ok(()) => {
                    info!("shutdown requested");
                    shutdown.cancel();
                }
                Err(e) => error!(error = %e, "could not listen for shutdown signal"),
            }
        }
    });

    if let Err(e) = monitor.run(shutdown).await {
        error!(error = %e, "monitor stopped with an error");
        process::exit(1);
    }
}
