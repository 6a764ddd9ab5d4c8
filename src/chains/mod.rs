pub mod bnb;
pub mod kava;
#[cfg(test)]
pub mod mock;
pub mod models;
pub mod traits;

pub use bnb::{BnbConfig, BnbRestClient};
pub use kava::{KavaConfig, KavaRestClient};
pub use traits::{AccountChainClient, DualChainClient};
