//! BLAKE3 checksums.

/// Full lower-case hex digest.
pub fn checksum(data: impl AsRef<[u8]>) -> String {
    blake3::hash(data.as_ref()).to_hex().to_string()
}

/// First `len` hex characters of the digest, upper-cased for human copying.
pub fn short_checksum(data: impl AsRef<[u8]>, len: usize) -> String {
    let mut digest = checksum(data);
    digest.truncate(len);
    digest.to_ascii_uppercase()
}
