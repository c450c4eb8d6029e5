#![no_main]
use libfuzzer_sys::fuzz_target;

use stubresolv_core::resolv::{build_query, encoded_query_len, parse_response};

fuzz_target!(|data: &[u8]| {
    if data.len() < 3 {
        return;
    }
    let id = u16::from_le_bytes([data[0], data[1]]);
    let hostname = &data[2..];

    let mut buf = [0u8; 600];
    match build_query(hostname, id, &mut buf) {
        Ok(len) => {
            assert_eq!(Ok(len), encoded_query_len(hostname));
            assert!(len <= 12 + 255 + 4);
            assert_eq!(&buf[0..2], &id.to_be_bytes());
            // A query is never mistaken for a response.
            assert!(parse_response(&buf[..len]).is_err());
        }
        // Nothing is written on failure.
        Err(_) => assert!(buf.iter().all(|&b| b == 0)),
    }
});
