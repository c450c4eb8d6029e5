//! ABI layer for the DNS stub resolver.
//!
//! Exports:
//! - `dns_resolv_build_query` / `dns_resolv_build_query_with_id`
//! - `dns_resolv_parse_response`
//! - `dns_resolv_get_nameservers_from` / `dns_resolv_get_nameservers`
//!
//! Return conventions: byte count or `-1` for the builder, `0` or `-1` for the
//! parser, number of filled slots for the nameserver readers.

use std::ffi::{OsStr, c_char, c_int};
use std::os::unix::ffi::OsStrExt;
use std::path::Path;

use stubresolv_core::resolv::{
    MAX_NAMESERVERS, NAMESERVER_LEN, build_query, nameservers_from_path, next_txid,
    parse_response, resolv_conf_path,
};

use crate::util::{c_len, opt_cstr, write_c_slot};

/// Default slot count callers should allocate.
pub const DNS_RESOLV_MAX_NAMESERVERS: c_int = MAX_NAMESERVERS as c_int;

/// Width of one nameserver slot, NUL included.
pub const DNS_RESOLV_NAMESERVER_LEN: usize = NAMESERVER_LEN;

/// One caller-provided nameserver string slot.
pub type NameserverSlot = [c_char; DNS_RESOLV_NAMESERVER_LEN];

unsafe fn build_query_into(
    hostname: *const c_char,
    id: u16,
    buf: *mut u8,
    buflen: c_int,
) -> c_int {
    // SAFETY: hostname is a caller-provided C string or null.
    let Some(host) = (unsafe { opt_cstr(hostname) }) else {
        return -1;
    };
    let Some(capacity) = c_len(buflen) else {
        return -1;
    };
    if buf.is_null() {
        return -1;
    }
    // SAFETY: caller guarantees `buf` is writable for `buflen` bytes.
    let out = unsafe { std::slice::from_raw_parts_mut(buf, capacity) };
    match build_query(host.to_bytes(), id, out) {
        Ok(len) => c_int::try_from(len).unwrap_or(-1),
        Err(_) => -1,
    }
}

/// Encode an A/IN query for `hostname` into `buf`.
///
/// The transaction ID (bytes 0-1) is drawn from a process-wide sequence.
/// Returns the number of bytes written, or -1.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn dns_resolv_build_query(
    hostname: *const c_char,
    buf: *mut u8,
    buflen: c_int,
) -> c_int {
    // SAFETY: arguments forwarded unchanged from the C caller.
    unsafe { build_query_into(hostname, next_txid(), buf, buflen) }
}

/// Like `dns_resolv_build_query` with a caller-chosen transaction ID.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn dns_resolv_build_query_with_id(
    hostname: *const c_char,
    id: u16,
    buf: *mut u8,
    buflen: c_int,
) -> c_int {
    // SAFETY: arguments forwarded unchanged from the C caller.
    unsafe { build_query_into(hostname, id, buf, buflen) }
}

/// Extract the first IPv4 address from a DNS response.
///
/// On success stores the address (network byte order) in `*addr` and
/// returns 0; otherwise returns -1 and leaves `*addr` untouched.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn dns_resolv_parse_response(
    buf: *const u8,
    len: c_int,
    addr: *mut libc::in_addr,
) -> c_int {
    if buf.is_null() || addr.is_null() {
        return -1;
    }
    let Some(len) = c_len(len) else {
        return -1;
    };
    // SAFETY: caller guarantees `buf` is readable for `len` bytes.
    let msg = unsafe { std::slice::from_raw_parts(buf, len) };
    match parse_response(msg) {
        Ok(ip) => {
            // SAFETY: `addr` is non-null and points to caller storage.
            unsafe {
                addr.write(libc::in_addr {
                    s_addr: u32::from_ne_bytes(ip.octets()),
                })
            };
            0
        }
        Err(_) => -1,
    }
}

unsafe fn fill_slots(path: &Path, out: *mut NameserverSlot, max: c_int) -> c_int {
    if out.is_null() {
        return 0;
    }
    let Some(max) = c_len(max).filter(|&m| m > 0) else {
        return 0;
    };
    let servers = nameservers_from_path(path, max);
    // SAFETY: caller guarantees `out` holds `max` slots.
    let slots = unsafe { std::slice::from_raw_parts_mut(out, max) };
    for (slot, server) in slots.iter_mut().zip(&servers) {
        write_c_slot(slot, server);
    }
    servers.len() as c_int
}

/// Read up to `max` `nameserver` entries from the resolv.conf at `path`.
///
/// A null path, null output, or missing file yields 0. Entries longer than
/// `DNS_RESOLV_NAMESERVER_LEN - 1` bytes are truncated.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn dns_resolv_get_nameservers_from(
    path: *const c_char,
    out: *mut NameserverSlot,
    max: c_int,
) -> c_int {
    // SAFETY: path is a caller-provided C string or null.
    let Some(path) = (unsafe { opt_cstr(path) }) else {
        return 0;
    };
    let path = Path::new(OsStr::from_bytes(path.to_bytes()));
    // SAFETY: output slots forwarded unchanged from the C caller.
    unsafe { fill_slots(path, out, max) }
}

/// Read nameservers from the default resolv.conf (`STUBRESOLV_RESOLV_CONF`
/// or `/etc/resolv.conf`).
#[unsafe(no_mangle)]
pub unsafe extern "C" fn dns_resolv_get_nameservers(out: *mut NameserverSlot, max: c_int) -> c_int {
    let path = resolv_conf_path();
    // SAFETY: output slots forwarded unchanged from the C caller.
    unsafe { fill_slots(&path, out, max) }
}
