//! 식별자 정규화 및 이벤트 디코딩 벤치마크
//!
//! 오라클은 폴링마다 응답 전체를 정규화하므로 이 경로의 비용을 측정합니다.

use criterion::{Criterion, Throughput, black_box, criterion_group, criterion_main};
use ingest_chaos_core::types::{Chain, ExpectationSet, ObservedEvent, TransactionRecord, normalize};

const ETH_HASH: &str = "0xAbCdEf0123456789abcdef0123456789ABCDEF0123456789abcdef0123456789";
const SOL_SIG: &str =
    "5VERv8NMvzbJMEkV8xnrLkEaWRtSz9CosKDYjCJjBRnbJLgp8uirBgmQpjKhoR4tjF3ZpRzrFmBV6UjKdiSZkQUW";

fn wallet_page(n: usize) -> String {
    let events: Vec<String> = (0..n)
        .map(|i| {
            format!(
                r#"{{"event_id":"ethereum-{i}","chain":"ethereum","network":"anvil","tx_hash":"0x{i:064x}","from":"0x01","to":"0x02","value":"1000000000000000000","event_type":"transfer"}}"#
            )
        })
        .collect();
    format!("[{}]", events.join(","))
}

fn bench_normalize(c: &mut Criterion) {
    let mut group = c.benchmark_group("normalize");
    group.throughput(Throughput::Elements(1));

    group.bench_function("eth_hash", |b| b.iter(|| normalize(black_box(ETH_HASH))));
    group.bench_function("solana_signature", |b| {
        b.iter(|| normalize(black_box(SOL_SIG)))
    });

    group.finish();
}

fn bench_page_decode(c: &mut Criterion) {
    let page = wallet_page(100);
    let records: Vec<TransactionRecord> = (0..100)
        .map(|i| TransactionRecord {
            chain: Chain::Ethereum,
            tx_id: format!("0x{i:064x}"),
            from: "0x01".to_owned(),
            to: "0x02".to_owned(),
            value: "1".to_owned(),
            token: None,
        })
        .collect();
    let expected = ExpectationSet::new("0x02", Chain::Ethereum, &records);

    let mut group = c.benchmark_group("wallet_page");
    group.throughput(Throughput::Elements(100));

    group.bench_function("decode_and_match_100", |b| {
        b.iter(|| {
            let events: Vec<ObservedEvent> =
                serde_json::from_str(black_box(&page)).unwrap_or_default();
            let seen = events.iter().map(|e| e.normalized_hash()).collect();
            expected.missing_from(&seen).len()
        })
    });

    group.finish();
}

criterion_group!(benches, bench_normalize, bench_page_decode);
criterion_main!(benches);
