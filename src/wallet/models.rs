use serde::{Deserialize, Serialize};
use std::fmt;

use crate::chains::models::Chain;

/// Deputy mnemonic. Never printed.
#[derive(Clone, PartialEq, Eq)]
pub struct Mnemonic(String);

impl Mnemonic {
    pub fn new(phrase: impl Into<String>) -> Self {
        Self(phrase.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }

    pub fn word_count(&self) -> usize {
        self.0.split_whitespace().count()
    }
}

impl fmt::Debug for Mnemonic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Mnemonic(<{} words>)", self.word_count())
    }
}

/// Address derived for a chain by the wallet subsystem
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct SigningIdentity {
    pub chain: Chain,
    pub address: String,
}

/// Network flavour, drives the bech32 prefix of derived addresses
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    Mainnet,
    Testnet,
}

impl Network {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "mainnet" | "main" | "prod" => Some(Network::Mainnet),
            "testnet" | "test" => Some(Network::Testnet),
            _ => None,
        }
    }

    pub fn address_prefix(&self, chain: Chain) -> &'static str {
        match (chain, self) {
            (Chain::Bnb, Network::Mainnet) => "bnb",
            (Chain::Bnb, Network::Testnet) => "tbnb",
            (Chain::Kava, _) => "kava",
        }
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Network::Mainnet => f.write_str("mainnet"),
            Network::Testnet => f.write_str("testnet"),
        }
    }
}
