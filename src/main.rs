// src/main.rs

//! # DID Wallet - Command Line Entry Point
//!
//! Runs one scanned link through the wallet core, the way a QR scan or deep
//! link would inside the browser wallet.
//!
//! ```text
//! did-wallet '<scanned url>'
//! ```
//!
//! Credentials live in memory for the duration of the run and no passkey
//! authenticator is attached, so verifier-requested ceremonies end as
//! cancelled. Configuration is read from `wallet.toml` and `WALLET_*`
//! variables (see [`did_wallet::config`]); `RUST_LOG` controls logging.

use std::sync::Arc;

use anyhow::Context;
use dotenv::dotenv;

use did_wallet::config::WalletConfig;
use did_wallet::services::presentation::PresentationOutcome;
use did_wallet::services::scanner::{ScanOutcome, Scanner};
use did_wallet::wallet::authenticator::UnavailableAuthenticator;
use did_wallet::wallet::context::WalletContext;
use did_wallet::wallet::credential_storage::MemoryStore;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    env_logger::init();

    let url = std::env::args()
        .nth(1)
        .context("usage: did-wallet <scanned url>")?;

    let config = WalletConfig::load().context("failed to load wallet configuration")?;
    let ctx = WalletContext::new(
        config,
        Arc::new(MemoryStore::new()),
        Arc::new(UnavailableAuthenticator),
    )?;

    match Scanner::new(&ctx).handle(&url).await {
        Ok(ScanOutcome::Issued(ids)) => {
            for id in ids {
                println!("stored credential {}", id);
            }
        }
        Ok(ScanOutcome::Presented(outcome)) => match outcome {
            PresentationOutcome::NothingToSend => println!("no credentials to present"),
            PresentationOutcome::Submitted => println!("presentation submitted"),
            PresentationOutcome::Registered { username } => {
                println!("passkey registered for {}", username)
            }
            PresentationOutcome::Authenticated { username } => {
                println!("authenticated as {}", username)
            }
        },
        Err(e) => {
            eprintln!("{}: {}", e.title(), e.message());
            std::process::exit(1);
        }
    }
    Ok(())
}
