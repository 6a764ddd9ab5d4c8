use serde::de::DeserializeOwned;
use std::time::Duration;

use crate::chains::models::{Chain, SwapDirection};
use crate::error::{AppError, AppResult};
use crate::refund::cursor::CursorKey;
use crate::refund::scheduler::RefundSchedule;
use crate::wallet::models::{Mnemonic, Network};
use crate::wallet::verifier::AddressVerifier;

const ENV_PREFIX: &str = "REFUNDER";

/// Endpoint and credentials for one chain
#[derive(Debug, Clone)]
pub struct ChainSettings {
    pub endpoint: String,
    pub mnemonic: Mnemonic,
    pub network: Network,
    /// Sleep between two refund broadcasts
    pub pacing: Duration,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub bnb: ChainSettings,
    pub bnb_refund_fee: u64,
    pub kava: ChainSettings,
    pub deputy_addresses: Vec<String>,
    pub signer_url: String,
    pub query_limit: u64,
    pub query_timeout: Duration,
    pub refund_schedule: RefundSchedule,
    pub offset_report_schedule: RefundSchedule,
    pub initial_offsets: Vec<(CursorKey, u64)>,
}

impl Config {
    /// Load from `REFUNDER_*` environment variables
    pub fn from_env() -> AppResult<Self> {
        let settings = config::Config::builder()
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("deputy_addresses"),
            )
            .build()?;

        Self::from_settings(&settings)
    }

    pub fn from_settings(settings: &config::Config) -> AppResult<Self> {
        let bnb = ChainSettings {
            endpoint: required(settings, "bnb_endpoint")?,
            mnemonic: Mnemonic::new(required(settings, "bnb_mnemonic")?),
            network: network(settings, "bnb_network")?,
            pacing: Duration::from_secs(optional(settings, "bnb_pacing_secs", 25u64)?),
        };

        let kava = ChainSettings {
            endpoint: required(settings, "kava_endpoint")?,
            mnemonic: Mnemonic::new(required(settings, "kava_mnemonic")?),
            network: network(settings, "kava_network")?,
            pacing: Duration::from_secs(optional(settings, "kava_pacing_secs", 5u64)?),
        };

        let deputy_addresses: Vec<String> =
            optional::<Vec<String>>(settings, "deputy_addresses", Vec::new())?
                .into_iter()
                .map(|address| address.trim().to_string())
                .filter(|address| !address.is_empty())
                .collect();

        if deputy_addresses.is_empty() {
            return Err(AppError::Config(format!(
                "{}_DEPUTY_ADDRESSES must list at least one Kava deputy address",
                ENV_PREFIX
            )));
        }

        for address in &deputy_addresses {
            AddressVerifier::validate(Chain::Kava, kava.network, address)?;
        }

        let query_limit = optional(settings, "query_limit", 100u64)?;
        if query_limit == 0 {
            return Err(AppError::Config(format!("{}_QUERY_LIMIT must be positive", ENV_PREFIX)));
        }

        let refund_schedule = optional(settings, "refund_schedule", "every 5m".to_string())?.parse()?;
        let offset_report_schedule =
            optional(settings, "offset_report_schedule", "every 30m".to_string())?.parse()?;

        let initial_offsets = vec![
            (CursorKey::bnb(), optional(settings, "bnb_offset", 0u64)?),
            (
                CursorKey::kava(SwapDirection::Incoming),
                optional(settings, "kava_incoming_offset", 0u64)?,
            ),
            (
                CursorKey::kava(SwapDirection::Outgoing),
                optional(settings, "kava_outgoing_offset", 0u64)?,
            ),
        ];

        Ok(Self {
            bnb,
            bnb_refund_fee: optional(settings, "bnb_refund_fee", 0u64)?,
            kava,
            deputy_addresses,
            signer_url: optional(settings, "signer_url", "http://127.0.0.1:9010".to_string())?,
            query_limit,
            query_timeout: Duration::from_secs(optional(settings, "query_timeout_secs", 5u64)?),
            refund_schedule,
            offset_report_schedule,
            initial_offsets,
        })
    }
}

fn env_name(key: &str) -> String {
    format!("{}_{}", ENV_PREFIX, key.to_uppercase())
}

fn required(settings: &config::Config, key: &str) -> AppResult<String> {
    match settings.get_string(key) {
        Ok(value) if !value.trim().is_empty() => Ok(value.trim().to_string()),
        _ => Err(AppError::Config(format!("{} must be set", env_name(key)))),
    }
}

fn optional<T: DeserializeOwned>(settings: &config::Config, key: &str, default: T) -> AppResult<T> {
    match settings.get::<T>(key) {
        Ok(value) => Ok(value),
        Err(config::ConfigError::NotFound(_)) => Ok(default),
        Err(e) => Err(AppError::Config(format!("{}: {}", env_name(key), e))),
    }
}

fn network(settings: &config::Config, key: &str) -> AppResult<Network> {
    let value = optional(settings, key, "testnet".to_string())?;
    Network::parse(&value)
        .ok_or_else(|| AppError::Config(format!("{}: unknown network {:?}", env_name(key), value)))
}

#[cfg(test)]
mod tests {
    use super::*;

    const DEPUTY: &str = "kava1agcvt07tcw0tglu0hmwdecsnuxp2yd45f3avgm";

    fn builder() -> config::ConfigBuilder<config::builder::DefaultState> {
        config::Config::builder()
            .set_override("bnb_endpoint", "https://testnet-dex.binance.org")
            .unwrap()
            .set_override("bnb_mnemonic", "bnb words")
            .unwrap()
            .set_override("kava_endpoint", "https://api.testnet.kava.io")
            .unwrap()
            .set_override("kava_mnemonic", "kava words")
            .unwrap()
    }

    #[test]
    fn test_defaults() {
        let settings = builder()
            .set_override("deputy_addresses", vec![DEPUTY])
            .unwrap()
            .build()
            .unwrap();

        let config = Config::from_settings(&settings).unwrap();

        assert_eq!(config.query_limit, 100);
        assert_eq!(config.query_timeout, Duration::from_secs(5));
        assert_eq!(config.bnb.pacing, Duration::from_secs(25));
        assert_eq!(config.kava.pacing, Duration::from_secs(5));
        assert_eq!(config.bnb.network, Network::Testnet);
        assert_eq!(config.refund_schedule, RefundSchedule::Every(Duration::from_secs(300)));
        assert!(config.initial_offsets.iter().all(|(_, offset)| *offset == 0));
        assert_eq!(config.deputy_addresses, vec![DEPUTY.to_string()]);
    }

    #[test]
    fn test_missing_deputies_is_config_error() {
        let settings = builder().build().unwrap();
        let err = Config::from_settings(&settings).unwrap_err();
        assert!(err.is_fatal());
        assert!(err.to_string().contains("DEPUTY_ADDRESSES"));
    }

    #[test]
    fn test_missing_endpoint_is_config_error() {
        let settings = config::Config::builder()
            .set_override("deputy_addresses", vec![DEPUTY])
            .unwrap()
            .build()
            .unwrap();
        let err = Config::from_settings(&settings).unwrap_err();
        assert!(err.to_string().contains("REFUNDER_BNB_ENDPOINT"));
    }

    #[test]
    fn test_invalid_deputy_rejected() {
        let settings = builder()
            .set_override("deputy_addresses", vec!["bnb1notkava"])
            .unwrap()
            .build()
            .unwrap();
        assert!(Config::from_settings(&settings).is_err());
    }

    #[test]
    fn test_overrides() {
        let settings = builder()
            .set_override("deputy_addresses", vec![DEPUTY])
            .unwrap()
            .set_override("query_limit", 50)
            .unwrap()
            .set_override("kava_outgoing_offset", 300)
            .unwrap()
            .set_override("refund_schedule", "daily@03")
            .unwrap()
            .set_override("bnb_network", "mainnet")
            .unwrap()
            .build()
            .unwrap();

        let config = Config::from_settings(&settings).unwrap();

        assert_eq!(config.query_limit, 50);
        assert_eq!(config.refund_schedule, RefundSchedule::Daily(3));
        assert_eq!(config.bnb.network, Network::Mainnet);
        assert!(config
            .initial_offsets
            .contains(&(CursorKey::kava(SwapDirection::Outgoing), 300)));
    }

    #[test]
    fn test_zero_limit_rejected() {
        let settings = builder()
            .set_override("deputy_addresses", vec![DEPUTY])
            .unwrap()
            .set_override("query_limit", 0)
            .unwrap()
            .build()
            .unwrap();
        assert!(Config::from_settings(&settings).is_err());
    }
}
