use crate::chains::models::Chain;
use crate::error::{AppError, AppResult};
use crate::wallet::models::Network;

/// Account addresses on both chains are 20 bytes
const ACCOUNT_ADDRESS_LEN: usize = 20;

pub struct AddressVerifier;

impl AddressVerifier {
    /// Bech32 check for a deputy or signer address: checksum, prefix for the
    /// chain and network, and a 20-byte payload.
    pub fn validate(chain: Chain, network: Network, address: &str) -> AppResult<()> {
        let prefix = network.address_prefix(chain);
        let invalid = |reason: &str| {
            AppError::Config(format!("Invalid {} address {:?}: {}", chain, address, reason))
        };

        let (hrp, data) = bech32::decode(address).map_err(|e| invalid(&e.to_string()))?;

        if hrp.to_lowercase() != prefix {
            return Err(invalid(&format!("expected prefix {}", prefix)));
        }

        if data.len() != ACCOUNT_ADDRESS_LEN {
            return Err(invalid(&format!("expected {} bytes, got {}", ACCOUNT_ADDRESS_LEN, data.len())));
        }

        Ok(())
    }
}
