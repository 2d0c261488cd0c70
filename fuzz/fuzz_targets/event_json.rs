#![no_main]

use libfuzzer_sys::fuzz_target;
use ingest_chaos_core::types::ObservedEvent;

fuzz_target!(|data: &[u8]| {
    // 질의 API 응답 형식: 배열 또는 null
    if let Ok(Some(events)) = serde_json::from_slice::<Option<Vec<ObservedEvent>>>(data) {
        for event in &events {
            let _ = event.normalized_hash();
            let _ = event.missing_fields();
        }
    }
});
