use clap::Parser;
use dotenvy::dotenv;
use std::fs;
use std::io::Read;
use tracing_subscriber::EnvFilter;

use nft_checkout::checkout::{Checkout, CheckoutEvent};
use nft_checkout::config::{CheckoutConfig, CliArgs};
use nft_checkout::payload::parse_purchase_payload;
use nft_checkout::session::{RpcWalletSession, WalletSession};
use nft_checkout::store::OnchainStoreClient;
use nft_checkout::util::format::truncate_address;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = CliArgs::parse();
    let config = CheckoutConfig::from_args(&args)?;

    let raw = match &args.payload {
        Some(path) => fs::read_to_string(path)?,
        None => {
            let mut buffer = String::new();
            std::io::stdin().read_to_string(&mut buffer)?;
            buffer
        }
    };
    let payload = parse_purchase_payload(&raw)?;

    let mut session = RpcWalletSession::new(&config);
    let address = session.connect().await?;
    eprintln!(
        "Connected as {} on {}",
        truncate_address(&address.to_string()),
        config.network
    );
    if session.is_wrong_chain() {
        session.switch_to_expected_chain().await?;
    }

    let provider = session.provider()?.clone();
    let store = OnchainStoreClient::new(provider, &config);
    let (checkout, mut events) = Checkout::new(store, config);

    let printer = tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            match event {
                CheckoutEvent::Status(message) => eprintln!("{message}"),
                CheckoutEvent::Step(step) => tracing::debug!(step = %step, "step changed"),
                CheckoutEvent::Completed { .. } | CheckoutEvent::Failed { .. } => {}
            }
        }
    });

    let result = checkout.execute(&session, &payload).await;
    drop(checkout); // closes the event channel
    printer.await?;

    let transaction = result?;
    println!("{transaction}");
    Ok(())
}
