use serde::{Deserialize, Serialize};
use std::fmt;

/// Chains the refunder watches
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Chain {
    /// Account-model chain: swaps are refunded with an explicit account sequence
    Bnb,
    /// Dual-direction chain: deputy swaps are listed as creator and as recipient
    Kava,
}

impl fmt::Display for Chain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl Chain {
    pub fn as_str(&self) -> &'static str {
        match self {
            Chain::Bnb => "bnb",
            Chain::Kava => "kava",
        }
    }

    /// Return all supported chains, in the order a cycle processes them
    pub fn all() -> Vec<Chain> {
        vec![Chain::Bnb, Chain::Kava]
    }
}

/// Opaque swap identifier (hex encoded)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SwapId(pub String);

impl SwapId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into().to_lowercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SwapId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SwapStatus {
    Open,
    Expired,
    Completed,
}

impl SwapStatus {
    /// Numeric status code used by the BNB explorer API
    pub fn bnb_code(&self) -> u8 {
        match self {
            SwapStatus::Open => 1,
            SwapStatus::Completed => 2,
            SwapStatus::Expired => 3,
        }
    }

    pub fn from_bnb_code(code: u8) -> Option<Self> {
        match code {
            1 => Some(SwapStatus::Open),
            2 => Some(SwapStatus::Completed),
            3 => Some(SwapStatus::Expired),
            _ => None,
        }
    }
}

/// Direction of a swap relative to the watched deputy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum SwapDirection {
    /// Deputy is the recipient
    Incoming,
    /// Deputy is the creator
    Outgoing,
}

impl SwapDirection {
    pub fn all() -> [SwapDirection; 2] {
        [SwapDirection::Incoming, SwapDirection::Outgoing]
    }
}

impl fmt::Display for SwapDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SwapDirection::Incoming => f.write_str("incoming"),
            SwapDirection::Outgoing => f.write_str("outgoing"),
        }
    }
}

/// Minimal view of a swap needed to decide whether to refund it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwapRecord {
    pub swap_id: SwapId,
    pub status: SwapStatus,
    pub expire_height: u64,
    pub direction: SwapDirection,
}

impl SwapRecord {
    /// Kava flips a swap to `Expired` some time after its expiry height, so an
    /// `Open` swap at or past that height is refundable as well.
    pub fn is_refundable_at(&self, height: u64) -> bool {
        match self.status {
            SwapStatus::Expired => true,
            SwapStatus::Open => self.expire_height <= height,
            SwapStatus::Completed => false,
        }
    }
}

/// BNB listing entry. The payload carries no swap id; it is derived from
/// `(random_number_hash, sender, sender_other_chain)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HtltRecord {
    pub random_number_hash: String,
    pub sender: String,
    pub sender_other_chain: String,
    pub status: SwapStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccountMetadata {
    pub account_number: u64,
    pub sequence: u64,
}

/// Result of broadcasting a refund
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefundReceipt {
    pub status: u16,
    pub tx_hash: String,
}

impl RefundReceipt {
    /// The node took the transaction (HTTP 2xx)
    pub fn accepted(&self) -> bool {
        (200..300).contains(&self.status)
    }
}
