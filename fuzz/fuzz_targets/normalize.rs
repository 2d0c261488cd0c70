#![no_main]

use libfuzzer_sys::fuzz_target;
use ingest_chaos_core::types::{normalize, NormalizedHash};

fuzz_target!(|data: &str| {
    let once = normalize(data);
    // 멱등성
    assert_eq!(normalize(&once), once);
    assert_eq!(NormalizedHash::new(data), NormalizedHash::new(&once));
});
