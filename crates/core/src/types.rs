//! 도메인 타입 — 하네스 전역에서 사용되는 공통 타입
//!
//! 체인 드라이버가 만든 [`TransactionRecord`], 오라클이 관측한 [`ObservedEvent`],
//! 그리고 둘을 비교하는 기준인 [`NormalizedHash`]를 정의합니다.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// 접두어 없는 Ethereum 트랜잭션 해시의 16진수 길이
const ETH_HASH_HEX_LEN: usize = 64;

/// 트랜잭션 식별자를 정규형으로 변환합니다.
///
/// - `0x`/`0X` 접두어가 있고 나머지가 16진수이면 접두어를 떼고 소문자로 바꿉니다.
/// - 접두어가 없어도 64자리 16진수이면 소문자로 바꿉니다.
/// - 그 밖의 입력(예: Solana base58 서명)은 앞뒤 공백만 제거하고 그대로 둡니다.
///
/// 모든 문자열에 대해 정의되며 멱등입니다: `normalize(normalize(s)) == normalize(s)`.
pub fn normalize(raw: &str) -> String {
    let trimmed = raw.trim();
    let (body, prefixed) = match trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
    {
        Some(rest) => (rest, true),
        None => (trimmed, false),
    };

    let is_hex = !body.is_empty() && body.bytes().all(|b| b.is_ascii_hexdigit());
    if is_hex && (prefixed || body.len() == ETH_HASH_HEX_LEN) {
        body.to_ascii_lowercase()
    } else {
        trimmed.to_owned()
    }
}

/// 정규화된 트랜잭션 식별자
///
/// 두 식별자는 정규형이 같을 때에만 같은 이벤트를 가리킵니다.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NormalizedHash(String);

impl NormalizedHash {
    /// 원본 식별자를 정규화합니다.
    pub fn new(raw: &str) -> Self {
        Self(normalize(raw))
    }

    /// 정규형 문자열을 반환합니다.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NormalizedHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for NormalizedHash {
    fn from(raw: &str) -> Self {
        Self::new(raw)
    }
}

/// 테스트 대상 체인
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Chain {
    /// Ethereum 호환 네트워크 (Anvil 등)
    Ethereum,
    /// Solana 호환 네트워크 (solana-test-validator 등)
    Solana,
}

impl Chain {
    /// 파이프라인이 보고하는 체인 이름을 반환합니다.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ethereum => "ethereum",
            Self::Solana => "solana",
        }
    }
}

impl fmt::Display for Chain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Chain {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "ethereum" | "eth" | "evm" => Ok(Self::Ethereum),
            "solana" | "sol" => Ok(Self::Solana),
            other => Err(format!("unknown chain '{other}'")),
        }
    }
}

/// 토큰 메타데이터
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenInfo {
    /// 토큰 컨트랙트 주소
    #[serde(default)]
    pub address: String,
    /// 토큰 심볼
    #[serde(default)]
    pub symbol: String,
    /// 소수 자릿수
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub decimals: Option<u8>,
}

/// 체인에 제출되고 확정된 전송 기록
///
/// 체인 드라이버가 생성하며 이후 하네스가 수정하지 않습니다.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionRecord {
    /// 체인
    pub chain: Chain,
    /// 체인이 돌려준 원본 식별자 (해시 또는 서명)
    pub tx_id: String,
    /// 송신자 주소
    pub from: String,
    /// 수신자 주소
    pub to: String,
    /// 전송량 (최소 단위, 10진수 문자열)
    pub value: String,
    /// 토큰 전송이면 토큰 정보
    pub token: Option<TokenInfo>,
}

impl TransactionRecord {
    /// 정규화된 식별자를 반환합니다.
    pub fn normalized_hash(&self) -> NormalizedHash {
        NormalizedHash::new(&self.tx_id)
    }

    /// 파이프라인이 이 전송에 부여해야 하는 이벤트 타입을 반환합니다.
    pub fn expected_event_type(&self) -> &'static str {
        match (self.chain, &self.token) {
            (Chain::Ethereum, Some(_)) => "erc20_transfer",
            (Chain::Ethereum, None) => "transfer",
            (Chain::Solana, _) => "solana_tx",
        }
    }
}

/// 파이프라인 질의 API가 보고한 이벤트
///
/// 폴링 시점의 파이프라인 상태에 대한 읽기 전용 스냅샷입니다.
/// 필드가 누락되어도 디코딩은 성공하며, 누락 여부는 [`ObservedEvent::missing_fields`]로
/// 확인합니다.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObservedEvent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_id: Option<String>,
    #[serde(default)]
    pub chain: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub network: Option<String>,
    #[serde(default)]
    pub tx_hash: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
    #[serde(default)]
    pub event_type: String,
    #[serde(default)]
    pub from: String,
    #[serde(default)]
    pub to: String,
    #[serde(default)]
    pub value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slot: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<TokenInfo>,
}

impl ObservedEvent {
    /// 정규화된 식별자를 반환합니다.
    pub fn normalized_hash(&self) -> NormalizedHash {
        NormalizedHash::new(&self.tx_hash)
    }

    /// 값이 비어 있는 필수 필드 이름을 반환합니다.
    pub fn missing_fields(&self) -> Vec<&'static str> {
        let required = [
            ("chain", &self.chain),
            ("tx_hash", &self.tx_hash),
            ("event_type", &self.event_type),
            ("from", &self.from),
            ("to", &self.to),
            ("value", &self.value),
        ];
        required
            .into_iter()
            .filter(|(_, v)| v.trim().is_empty())
            .map(|(name, _)| name)
            .collect()
    }

    /// 이벤트가 주어진 체인에서 온 것인지 확인합니다.
    pub fn is_on(&self, chain: Chain) -> bool {
        self.chain.eq_ignore_ascii_case(chain.as_str())
    }
}

/// 한 지갑에서 관측되어야 하는 식별자 집합
///
/// 트랜잭션 제출 직후 만들어지며 생성 이후 변경되지 않습니다.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpectationSet {
    wallet: String,
    chain: Chain,
    hashes: BTreeSet<NormalizedHash>,
}

impl ExpectationSet {
    /// 지갑과 전송 기록으로 기대 집합을 만듭니다.
    pub fn new<'a>(
        wallet: impl Into<String>,
        chain: Chain,
        records: impl IntoIterator<Item = &'a TransactionRecord>,
    ) -> Self {
        Self {
            wallet: wallet.into(),
            chain,
            hashes: records.into_iter().map(|r| r.normalized_hash()).collect(),
        }
    }

    /// 수신자별로 기대 집합을 나눕니다. 수신자 순서는 처음 등장한 순서를 따릅니다.
    pub fn by_recipient(records: &[TransactionRecord]) -> Vec<Self> {
        let mut sets: Vec<Self> = Vec::new();
        for record in records {
            match sets.iter().position(|s| s.wallet == record.to) {
                Some(idx) => {
                    sets[idx].hashes.insert(record.normalized_hash());
                }
                None => sets.push(Self::new(
                    record.to.clone(),
                    record.chain,
                    std::iter::once(record),
                )),
            }
        }
        sets
    }

    pub fn wallet(&self) -> &str {
        &self.wallet
    }

    pub fn chain(&self) -> Chain {
        self.chain
    }

    pub fn hashes(&self) -> &BTreeSet<NormalizedHash> {
        &self.hashes
    }

    pub fn len(&self) -> usize {
        self.hashes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hashes.is_empty()
    }

    /// `observed`에 없는 기대 식별자를 반환합니다 (`expected - observed`).
    pub fn missing_from(&self, observed: &BTreeSet<NormalizedHash>) -> Vec<NormalizedHash> {
        self.hashes.difference(observed).cloned().collect()
    }
}

/// 오라클 폴링 결과
///
/// `latest`는 마지막으로 성공한 샘플의 전체 스냅샷이고,
/// `seen`은 모든 성공 샘플에서 관측된 식별자의 합집합입니다.
#[derive(Debug, Clone, Default)]
pub struct PollOutcome {
    pub wallet: String,
    pub latest: Vec<ObservedEvent>,
    pub seen: BTreeSet<NormalizedHash>,
    pub elapsed: Duration,
    pub deadline_reached: bool,
    pub samples: u32,
    pub failed_samples: u32,
}

impl PollOutcome {
    /// 관측되지 않은 기대 식별자를 반환합니다.
    pub fn missing(&self, expected: &ExpectationSet) -> Vec<NormalizedHash> {
        expected.missing_from(&self.seen)
    }

    /// 기대 집합이 모두 관측되었는지 확인합니다.
    pub fn is_satisfied(&self, expected: &ExpectationSet) -> bool {
        expected.hashes().is_subset(&self.seen)
    }

    /// 마지막 스냅샷에서 식별자가 등장한 횟수를 반환합니다.
    pub fn multiplicity(&self, hash: &NormalizedHash) -> usize {
        self.latest
            .iter()
            .filter(|e| &e.normalized_hash() == hash)
            .count()
    }

    /// 마지막 스냅샷에서 식별자에 해당하는 첫 이벤트를 찾습니다.
    pub fn find(&self, hash: &NormalizedHash) -> Option<&ObservedEvent> {
        self.latest.iter().find(|e| &e.normalized_hash() == hash)
    }
}

/// 외부 서비스의 생명주기 상태
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LifecycleState {
    Running,
    Stopped,
    #[default]
    Unknown,
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Running => write!(f, "running"),
            Self::Stopped => write!(f, "stopped"),
            Self::Unknown => write!(f, "unknown"),
        }
    }
}

/// 이름으로 식별되는 외부 서비스 핸들
///
/// 처음 참조될 때 `Unknown` 상태로 생성되며 서비스 컨트롤러만 상태를 바꿉니다.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceHandle {
    pub name: String,
    pub state: LifecycleState,
}

impl ServiceHandle {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            state: LifecycleState::Unknown,
        }
    }
}
