// Keyring - the boundary to the wallet subsystem
//
// Key derivation and signing live in a signing sidecar. This process only
// hands it the configured mnemonic once at startup and asks it to sign
// unsigned refund transactions afterwards.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info};

use crate::chains::models::Chain;
use crate::error::{AppError, AppResult};
use crate::wallet::models::{Mnemonic, Network, SigningIdentity};

#[async_trait]
pub trait Keyring: Send + Sync {
    /// Derive (or look up) the signing identity for a mnemonic on a chain
    async fn import(
        &self,
        chain: Chain,
        mnemonic: &Mnemonic,
        network: Network,
    ) -> AppResult<SigningIdentity>;

    /// Sign an unsigned transaction document, returning the encoded signed tx
    async fn sign(
        &self,
        identity: &SigningIdentity,
        unsigned_tx: serde_json::Value,
    ) -> AppResult<String>;
}

#[derive(Serialize)]
struct ImportRequest<'a> {
    chain: Chain,
    mnemonic: &'a str,
    prefix: &'a str,
    network: Network,
}

#[derive(Deserialize)]
struct ImportResponse {
    address: String,
}

#[derive(Serialize)]
struct SignRequest<'a> {
    chain: Chain,
    address: &'a str,
    tx: serde_json::Value,
}

#[derive(Deserialize)]
struct SignResponse {
    signed_tx: String,
}

/// HTTP keyring backed by a local signing sidecar
pub struct RemoteKeyring {
    base_url: String,
    client: reqwest::Client,
}

impl RemoteKeyring {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> AppResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::Keyring(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client,
        })
    }
}

#[async_trait]
impl Keyring for RemoteKeyring {
    async fn import(
        &self,
        chain: Chain,
        mnemonic: &Mnemonic,
        network: Network,
    ) -> AppResult<SigningIdentity> {
        let url = format!("{}/keys", self.base_url);
        let request = ImportRequest {
            chain,
            mnemonic: mnemonic.expose(),
            prefix: network.address_prefix(chain),
            network,
        };

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| AppError::Keyring(format!("Failed to reach signer: {}", e)))?;

        if !response.status().is_success() {
            return Err(AppError::Keyring(format!(
                "Signer refused key import for {}: HTTP {}",
                chain,
                response.status()
            )));
        }

        let body: ImportResponse = response
            .json()
            .await
            .map_err(|e| AppError::Keyring(format!("Malformed import response: {}", e)))?;

        info!("🔑 Signing identity ready for {}: {}", chain, body.address);

        Ok(SigningIdentity {
            chain,
            address: body.address,
        })
    }

    async fn sign(
        &self,
        identity: &SigningIdentity,
        unsigned_tx: serde_json::Value,
    ) -> AppResult<String> {
        let url = format!("{}/sign", self.base_url);
        let request = SignRequest {
            chain: identity.chain,
            address: &identity.address,
            tx: unsigned_tx,
        };

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| AppError::Keyring(format!("Failed to reach signer: {}", e)))?;

        if !response.status().is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(AppError::Keyring(format!("Signing failed: {}", error_text)));
        }

        let body: SignResponse = response
            .json()
            .await
            .map_err(|e| AppError::Keyring(format!("Malformed sign response: {}", e)))?;

        debug!("Signed {} tx for {}", identity.chain, identity.address);
        Ok(body.signed_tx)
    }
}

/// In-process keyring for tests: addresses are fixed, signing echoes the document.
#[cfg(test)]
pub struct StaticKeyring {
    pub address: String,
}

#[cfg(test)]
#[async_trait]
impl Keyring for StaticKeyring {
    async fn import(
        &self,
        chain: Chain,
        _mnemonic: &Mnemonic,
        _network: Network,
    ) -> AppResult<SigningIdentity> {
        Ok(SigningIdentity {
            chain,
            address: self.address.clone(),
        })
    }

    async fn sign(
        &self,
        _identity: &SigningIdentity,
        unsigned_tx: serde_json::Value,
    ) -> AppResult<String> {
        Ok(unsigned_tx.to_string())
    }
}
