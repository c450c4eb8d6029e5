//! Shared internal utilities for ABI adapters.

use std::ffi::{CStr, c_char, c_int};

/// Borrow a C string, or `None` for a null pointer.
///
/// # Safety
///
/// A non-null `ptr` must point to a NUL-terminated string valid for `'a`.
pub unsafe fn opt_cstr<'a>(ptr: *const c_char) -> Option<&'a CStr> {
    if ptr.is_null() {
        return None;
    }
    // SAFETY: caller-provided C string pointer.
    Some(unsafe { CStr::from_ptr(ptr) })
}

/// Convert a C length argument, rejecting negatives.
#[inline]
pub fn c_len(len: c_int) -> Option<usize> {
    usize::try_from(len).ok()
}

/// Copy `bytes` into a fixed C string slot, truncating to leave room for NUL.
pub fn write_c_slot<const N: usize>(slot: &mut [c_char; N], bytes: &[u8]) {
    if N == 0 {
        return;
    }
    let copy_len = bytes.len().min(N - 1);
    for (dst, &src) in slot.iter_mut().zip(&bytes[..copy_len]) {
        *dst = src as c_char;
    }
    slot[copy_len] = 0;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn c_len_rejects_negative() {
        assert_eq!(c_len(-1), None);
        assert_eq!(c_len(0), Some(0));
        assert_eq!(c_len(512), Some(512));
    }

    #[test]
    fn write_c_slot_terminates() {
        let mut slot = [0x7f as c_char; 8];
        write_c_slot(&mut slot, b"1.1.1.1");
        assert_eq!(slot[7], 0);
        let text: Vec<u8> = slot[..7].iter().map(|&c| c as u8).collect();
        assert_eq!(text, b"1.1.1.1");
    }

    #[test]
    fn write_c_slot_truncates() {
        let mut slot = [0 as c_char; 4];
        write_c_slot(&mut slot, b"10.0.0.1");
        let text: Vec<u8> = slot.iter().map(|&c| c as u8).collect();
        assert_eq!(text, b"10.\0");
    }

    #[test]
    fn write_c_slot_keeps_high_bytes() {
        let mut slot = [0 as c_char; 8];
        write_c_slot(&mut slot, b"10.\xff");
        let text: Vec<u8> = slot[..5].iter().map(|&c| c as u8).collect();
        assert_eq!(text, b"10.\xff\0");
    }
}
