#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;

use ingest_chaos_core::types::{Chain, ObservedEvent, TransactionRecord};
use ingest_chaos_event_oracle::StructuralCheck;

/// 퍼저용 전송 기록 입력
#[derive(Arbitrary, Debug)]
struct FuzzTransfer {
    solana: bool,
    tx_id: String,
    from: String,
    to: String,
    value: String,
}

fuzz_target!(|input: FuzzTransfer| {
    let record = TransactionRecord {
        chain: if input.solana { Chain::Solana } else { Chain::Ethereum },
        tx_id: input.tx_id,
        from: input.from,
        to: input.to,
        value: input.value,
        token: None,
    };
    // 기록에서 그대로 만든 이벤트
    let event = ObservedEvent {
        chain: record.chain.as_str().to_owned(),
        tx_hash: record.tx_id.clone(),
        event_type: record.expected_event_type().to_owned(),
        from: record.from.clone(),
        to: record.to.clone(),
        value: record.value.clone(),
        ..ObservedEvent::default()
    };

    let mismatches = StructuralCheck::new(&record).mismatches(&event);
    let blank = [&record.from, &record.to, &record.value]
        .iter()
        .any(|f| f.trim().is_empty());
    if !blank {
        assert!(mismatches.is_empty(), "self-comparison mismatched: {mismatches:?}");
    }
});
