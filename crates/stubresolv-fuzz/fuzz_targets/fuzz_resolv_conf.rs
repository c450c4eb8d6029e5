#![no_main]
use libfuzzer_sys::fuzz_target;

use stubresolv_core::resolv::{ResolverConfig, nameservers_from_bytes};

fuzz_target!(|data: &[u8]| {
    let max = data.first().map_or(3, |&b| (b % 8) as usize);

    let servers = nameservers_from_bytes(data, max);
    assert!(servers.len() <= max);
    assert!(
        servers
            .iter()
            .all(|s| !s.is_empty() && !s.iter().any(u8::is_ascii_whitespace))
    );

    let config = ResolverConfig::parse_bytes(data);
    assert!(config.nameservers.len() <= 3);
    assert!((1..=30).contains(&config.timeout));
    assert!((1..=5).contains(&config.attempts));
    let _ = config.candidates("host");
});
