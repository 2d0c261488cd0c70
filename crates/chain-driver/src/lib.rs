#![doc = include_str!("../README.md")]
//!
//! # Module Structure
//!
//! - [`error`]: Domain error types (`ChainDriverError`, `BatchTransferError`, `RpcCallError`)
//! - [`config`]: Driver configuration (`DriverConfig`)
//! - [`rpc`]: JSON-RPC 2.0 client used by the Solana backend
//! - [`driver`]: The chain-agnostic `ChainDriver` trait
//! - [`evm`]: Ethereum-style backend (`EvmDriver`) over an alloy provider
//! - [`message`]: Solana legacy transaction encoding
//! - [`solana`]: Solana-style backend (`SolanaDriver`)
//! - [`backend`]: Runtime backend selection (`AnyDriver`)

pub mod backend;
pub mod config;
pub mod driver;
pub mod error;
pub mod evm;
pub mod message;
pub mod rpc;
pub mod solana;

// --- Public API Re-exports ---

pub use backend::AnyDriver;
pub use config::DriverConfig;
pub use driver::ChainDriver;
pub use error::{BatchTransferError, ChainDriverError, RpcCallError};
pub use evm::EvmDriver;
pub use rpc::JsonRpcClient;
pub use solana::SolanaDriver;
