//! Helpers for the eight-byte lump / texture names used everywhere in the
//! WAD format.
//!
//! Names are **not** NUL-terminated on disk when they are exactly eight
//! characters long, so every helper here stops at the first NUL *or* after
//! eight bytes, whichever comes first.

/// Raw on-disk name.
pub type Name8 = [u8; 8];

/// Significant bytes of a name (stops at first NUL, max 8).
#[inline]
pub fn trimmed(raw: &[u8]) -> &[u8] {
    let raw = &raw[..raw.len().min(8)];
    let end = raw.iter().position(|&b| b == 0).unwrap_or(raw.len());
    &raw[..end]
}

/// Printable view of a raw name.
pub fn name_str(raw: &[u8]) -> &str {
    std::str::from_utf8(trimmed(raw)).unwrap_or("?")
}

/// Pack a `&str` into a NUL-padded eight-byte name, truncating if longer.
pub fn to_name8(name: &str) -> Name8 {
    let mut out = [0u8; 8];
    for (dst, src) in out.iter_mut().zip(trimmed(name.as_bytes())) {
        *dst = *src;
    }
    out
}

/// `strncasecmp(a, b, 8) == 0`.
pub fn eq_ignore_case(a: &[u8], b: &[u8]) -> bool {
    trimmed(a).eq_ignore_ascii_case(trimmed(b))
}

/// djb2 string hash, xor variant, limited to eight upper-cased characters.
///
/// Same hash the classic engines use for their lump and texture tables,
/// so bucket chains come out in the same order.
pub fn name_hash(name: &[u8]) -> u32 {
    trimmed(name).iter().fold(5381u32, |h, &c| {
        ((h << 5) ^ h) ^ u32::from(c.to_ascii_uppercase())
    })
}
