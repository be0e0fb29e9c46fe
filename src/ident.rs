//! Content-addressed identifier derivation.
//!
//! Favorites and "is this new" both key off an item's id across independent
//! fetch cycles, so the id must be a pure function of the item's URL (or of
//! its title when the URL is empty): same input, same id, on every run and
//! every platform.
//!
//! The hash is a 32-bit wrapping multiply-by-31 accumulation over the UTF-16
//! code units of the key, seeded at zero. Fixed-width wrapping arithmetic
//! keeps the value identical regardless of the host's native integer size,
//! and hashing code units rather than bytes keeps ids stable for non-ASCII
//! titles no matter how the text was encoded upstream.

/// Namespace prefix carried by every derived id.
pub const ID_NAMESPACE: &str = "news";

/// Derive a stable short identifier for a key, e.g. `news-1a2b3c`.
///
/// Pure and deterministic: `derive_id(k) == derive_id(k)` across calls,
/// processes, and architectures.
pub fn derive_id(key: &str) -> String {
    let mut h: i32 = 0;
    for unit in key.encode_utf16() {
        // h * 31 + unit, expressed as (h << 5) - h + unit with wraparound.
        h = h
            .wrapping_shl(5)
            .wrapping_sub(h)
            .wrapping_add(i32::from(unit));
    }
    format!("{}-{}", ID_NAMESPACE, to_base36(u64::from(h.unsigned_abs())))
}

fn to_base36(mut n: u64) -> String {
    const DIGITS: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    if n == 0 {
        return "0".to_string();
    }
    let mut buf = Vec::new();
    while n > 0 {
        buf.push(DIGITS[(n % 36) as usize]);
        n /= 36;
    }
    buf.reverse();
    // Digits are ASCII by construction.
    String::from_utf8(buf).unwrap_or_default()
}
