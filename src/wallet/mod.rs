pub mod keyring;
pub mod models;
pub mod verifier;
