//! Transaction ID generation.
//!
//! IDs only need to be unpredictable enough to tell concurrent queries apart
//! and to make blind spoofing harder; they are not a cryptographic defense.

use std::sync::OnceLock;
use std::sync::atomic::{AtomicU64, Ordering};

const GOLDEN_GAMMA: u64 = 0x9E37_79B9_7F4A_7C15;

#[inline]
fn splitmix64_next(state: &mut u64) -> u64 {
    *state = state.wrapping_add(GOLDEN_GAMMA);
    let mut z = *state;
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

#[inline]
fn splitmix64(mut x: u64) -> u64 {
    splitmix64_next(&mut x)
}

/// Deterministic transaction ID stream.
#[derive(Debug, Clone)]
pub struct TxidSequence {
    state: u64,
}

impl TxidSequence {
    /// Stream that yields the same IDs for the same seed.
    #[must_use]
    pub const fn seeded(seed: u64) -> Self {
        Self { state: seed }
    }

    /// Next transaction ID.
    pub fn next_id(&mut self) -> u16 {
        (splitmix64_next(&mut self.state) >> 48) as u16
    }
}

impl Iterator for TxidSequence {
    type Item = u16;

    fn next(&mut self) -> Option<u16> {
        Some(self.next_id())
    }
}

static BOOT_NONCE: OnceLock<u64> = OnceLock::new();
static COUNTER: AtomicU64 = AtomicU64::new(0);

fn boot_nonce() -> u64 {
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or_default();
    let marker = 0u8;
    let stack = &marker as *const u8 as u64;
    splitmix64(nanos ^ ((std::process::id() as u64) << 32) ^ stack.rotate_left(17))
}

/// Process-wide transaction ID.
///
/// Lock-free: the nonce is drawn once, then each call mixes it with a
/// monotonically increasing counter.
pub fn next_txid() -> u16 {
    let nonce = *BOOT_NONCE.get_or_init(boot_nonce);
    let n = COUNTER.fetch_add(1, Ordering::Relaxed);
    (splitmix64(nonce ^ n.wrapping_mul(GOLDEN_GAMMA)) >> 48) as u16
}
