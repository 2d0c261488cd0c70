#![doc = include_str!("../README.md")]

pub mod config;
pub mod error;
pub mod metrics;
pub mod types;

// --- 주요 타입 re-export ---

// 에러
pub use error::{
    ConfigError, ConnectivityError, HarnessError, InvariantViolation, ServiceControlError,
    TransferError,
};

// 설정
pub use config::{HarnessConfig, RecipientMode, ScenarioKind};

// 도메인 타입
pub use types::{
    Chain, ExpectationSet, LifecycleState, NormalizedHash, ObservedEvent, PollOutcome,
    ServiceHandle, TokenInfo, TransactionRecord, normalize,
};
