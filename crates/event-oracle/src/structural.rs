//! 관측 이벤트의 구조 검증
//!
//! 파이프라인이 보고한 [`ObservedEvent`]를 그 이벤트를 만든 [`TransactionRecord`]와
//! 필드 단위로 비교합니다. 다르거나 비어 있는 필드는 모두 이름으로 보고됩니다.
//!
//! | 필드 | 비교 |
//! |---|---|
//! | `tx_hash` | 정규화 후 일치 |
//! | `chain` | 대소문자 무시 |
//! | `event_type` | `transfer` / `erc20_transfer` / `solana_tx` |
//! | `from`, `to` | hex 주소는 대소문자 무시, 그 외는 그대로 |
//! | `value` | 10진 정수로 비교 |
//! | `token.address`, `token.symbol` | 토큰 전송일 때만 |
//!
//! Solana 이벤트는 파이프라인이 `from`/`to`/`value`를 비워 보낼 수 있으므로
//! 값이 있을 때만 비교합니다.

use ingest_chaos_core::error::InvariantViolation;
use ingest_chaos_core::types::{Chain, ObservedEvent, TransactionRecord};

/// 전송 기록 하나에 대한 구조 검증기
#[derive(Debug, Clone, Copy)]
pub struct StructuralCheck<'a> {
    record: &'a TransactionRecord,
}

impl<'a> StructuralCheck<'a> {
    pub fn new(record: &'a TransactionRecord) -> Self {
        Self { record }
    }

    /// 기대와 다르거나 비어 있는 필드 이름을 반환합니다.
    pub fn mismatches(&self, event: &ObservedEvent) -> Vec<&'static str> {
        let record = self.record;
        let mut fields = Vec::new();

        if event.normalized_hash() != record.normalized_hash() {
            fields.push("tx_hash");
        }
        if !event.is_on(record.chain) {
            fields.push("chain");
        }
        if event.event_type != record.expected_event_type() {
            fields.push("event_type");
        }

        let optional = record.chain == Chain::Solana;
        let parties = [
            ("from", event.from.as_str(), record.from.as_str()),
            ("to", event.to.as_str(), record.to.as_str()),
        ];
        for (name, observed, expected) in parties {
            if observed.trim().is_empty() {
                if !optional {
                    fields.push(name);
                }
            } else if !address_eq(observed, expected) {
                fields.push(name);
            }
        }

        if event.value.trim().is_empty() {
            if !optional {
                fields.push("value");
            }
        } else if !value_eq(&event.value, &record.value) {
            fields.push("value");
        }

        if let Some(expected) = &record.token {
            match &event.token {
                None => fields.push("token"),
                Some(observed) => {
                    if !address_eq(&observed.address, &expected.address) {
                        fields.push("token.address");
                    }
                    if !expected.symbol.is_empty() && observed.symbol != expected.symbol {
                        fields.push("token.symbol");
                    }
                }
            }
        }

        fields
    }

    /// 불일치가 있으면 [`InvariantViolation::Structural`]을 반환합니다.
    pub fn verify(&self, event: &ObservedEvent) -> Result<(), InvariantViolation> {
        let fields = self.mismatches(event);
        if fields.is_empty() {
            Ok(())
        } else {
            Err(InvariantViolation::Structural {
                identifier: self.record.normalized_hash().to_string(),
                fields: fields.into_iter().map(str::to_owned).collect(),
            })
        }
    }
}

/// hex 주소는 `0x` 접두사와 대소문자를 무시하고 비교합니다.
fn address_eq(observed: &str, expected: &str) -> bool {
    let (observed, expected) = (observed.trim(), expected.trim());
    match (hex_body(observed), hex_body(expected)) {
        (Some(a), Some(b)) => a.eq_ignore_ascii_case(b),
        _ => observed == expected,
    }
}

fn hex_body(raw: &str) -> Option<&str> {
    let body = raw.strip_prefix("0x").or_else(|| raw.strip_prefix("0X"))?;
    (!body.is_empty() && body.chars().all(|c| c.is_ascii_hexdigit())).then_some(body)
}

fn value_eq(observed: &str, expected: &str) -> bool {
    let (observed, expected) = (observed.trim(), expected.trim());
    match (observed.parse::<u128>(), expected.parse::<u128>()) {
        (Ok(a), Ok(b)) => a == b,
        _ => observed == expected,
    }
}
