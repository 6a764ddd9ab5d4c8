use std::{sync::Arc, time::Duration};
use tracing::info;

use crate::{
    chains::{
        models::Chain, AccountChainClient, BnbConfig, BnbRestClient, DualChainClient, KavaConfig,
        KavaRestClient,
    },
    config::Config,
    error::AppResult,
    refund::{
        cursor::CursorStore,
        observer::{RefundObserver, TracingObserver},
        orchestrator::RefundOrchestrator,
        scanner::ScanSettings,
        submitter::SubmitSettings,
    },
    wallet::{
        keyring::{Keyring, RemoteKeyring},
        verifier::AddressVerifier,
    },
};

/// Upper bound for broadcast and account requests; listing calls carry their own timeout
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

pub async fn initialize_orchestrator(config: &Config) -> AppResult<Arc<RefundOrchestrator>> {
    info!("Initializing refunder components ...");

    let keyring: Arc<dyn Keyring> = Arc::new(RemoteKeyring::new(&config.signer_url, REQUEST_TIMEOUT)?);

    // Identities come from the signer; a bad mnemonic stops startup here
    let bnb_identity = keyring
        .import(Chain::Bnb, &config.bnb.mnemonic, config.bnb.network)
        .await?;
    AddressVerifier::validate(Chain::Bnb, config.bnb.network, &bnb_identity.address)?;

    let kava_identity = keyring
        .import(Chain::Kava, &config.kava.mnemonic, config.kava.network)
        .await?;
    AddressVerifier::validate(Chain::Kava, config.kava.network, &kava_identity.address)?;

    info!("⚙️  Initializing chain clients...");

    let bnb: Arc<dyn AccountChainClient> = Arc::new(BnbRestClient::new(
        BnbConfig {
            api_url: config.bnb.endpoint.clone(),
            network: config.bnb.network,
            request_timeout: REQUEST_TIMEOUT,
        },
        bnb_identity,
        keyring.clone(),
    )?);
    info!("✅ BNB client ready: {} ({})", config.bnb.endpoint, config.bnb.network);

    let kava: Arc<dyn DualChainClient> = Arc::new(KavaRestClient::new(
        KavaConfig {
            api_url: config.kava.endpoint.clone(),
            network: config.kava.network,
            request_timeout: REQUEST_TIMEOUT,
            query_timeout: config.query_timeout,
        },
        kava_identity,
        keyring,
    )?);
    info!("✅ Kava client ready: {} ({})", config.kava.endpoint, config.kava.network);

    let cursors = Arc::new(CursorStore::with_offsets(config.initial_offsets.iter().copied()));
    let observer: Arc<dyn RefundObserver> = Arc::new(TracingObserver);

    let orchestrator = RefundOrchestrator::new(
        bnb,
        kava,
        config.deputy_addresses.clone(),
        cursors,
        ScanSettings {
            limit: config.query_limit,
            timeout: config.query_timeout,
        },
        SubmitSettings {
            bnb_pacing: config.bnb.pacing,
            kava_pacing: config.kava.pacing,
            bnb_fee: config.bnb_refund_fee,
        },
        observer,
    )?;

    info!(
        "✅ Refund orchestrator ready ({} Kava deputies)",
        config.deputy_addresses.len()
    );

    Ok(Arc::new(orchestrator))
}
