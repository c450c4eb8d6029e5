#![no_main]
use libfuzzer_sys::fuzz_target;

use stubresolv_core::resolv::dns::read_name;
use stubresolv_core::resolv::parse_response_detailed;

fuzz_target!(|data: &[u8]| {
    // Must terminate and never panic, whatever the pointers do.
    if let Ok(res) = parse_response_detailed(data) {
        assert!(data.len() >= 12);
        assert_eq!(res.id, u16::from_be_bytes([data[0], data[1]]));
    }

    if data.len() > 12
        && let Ok((name, end)) = read_name(data, 12)
    {
        assert!(name.len() <= 255);
        assert!(end <= data.len());
    }
});
