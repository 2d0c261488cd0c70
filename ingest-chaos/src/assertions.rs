//! 전달 불변식 판정
//!
//! 오라클 결과를 [`InvariantViolation`]으로 바꿉니다. 위반은 항상 구체적인
//! 식별자를 담습니다.

use ingest_chaos_core::error::InvariantViolation;
use ingest_chaos_core::types::{ExpectationSet, NormalizedHash, PollOutcome};

/// 기대 집합이 모두 관측되었는지 확인합니다 (무손실).
pub fn assert_all_visible(
    expected: &ExpectationSet,
    outcome: &PollOutcome,
) -> Result<(), InvariantViolation> {
    let missing = outcome.missing(expected);
    if missing.is_empty() {
        return Ok(());
    }
    Err(InvariantViolation::Missing {
        wallet: expected.wallet().to_owned(),
        identifiers: missing.iter().map(ToString::to_string).collect(),
        elapsed: outcome.elapsed,
    })
}

/// 마지막 스냅샷에서 기대 식별자가 두 번 이상 보고되지 않았는지 확인합니다.
pub fn assert_no_duplicates(
    expected: &ExpectationSet,
    outcome: &PollOutcome,
) -> Result<(), InvariantViolation> {
    for hash in expected.hashes() {
        let count = outcome.multiplicity(hash);
        if count > 1 {
            return Err(InvariantViolation::Duplicated {
                wallet: expected.wallet().to_owned(),
                identifier: hash.to_string(),
                count,
            });
        }
    }
    Ok(())
}

/// 식별자가 정확히 한 번 보고되었는지 확인합니다.
pub fn assert_exactly_once(
    wallet: &str,
    hash: &NormalizedHash,
    count: usize,
) -> Result<(), InvariantViolation> {
    match count {
        1 => Ok(()),
        0 => Err(InvariantViolation::Missing {
            wallet: wallet.to_owned(),
            identifiers: vec![hash.to_string()],
            elapsed: std::time::Duration::ZERO,
        }),
        count => Err(InvariantViolation::Duplicated {
            wallet: wallet.to_owned(),
            identifier: hash.to_string(),
            count,
        }),
    }
}
