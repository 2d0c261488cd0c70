#![no_main]

use libfuzzer_sys::fuzz_target;
use ingest_chaos_chain_driver::evm::erc20_transfer_calldata;

fuzz_target!(|input: (&str, u64)| {
    let (to, amount) = input;
    if let Ok(calldata) = erc20_transfer_calldata(to, amount) {
        // selector(4) + address(32) + amount(32)
        assert_eq!(calldata.len(), 4 + 32 + 32);
        assert_eq!(&calldata[..4], &[0xa9, 0x05, 0x9c, 0xbb]);
        assert_eq!(u64::from_be_bytes(calldata[60..].try_into().unwrap()), amount);
    }
});
