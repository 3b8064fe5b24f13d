//! SHA256SUMS verification.

use sha2::{Digest, Sha256};

use crate::error::{Result, TervError};

/// Verify `data` against the digest recorded for `file_name` in a
/// SHA256SUMS body (`<hex digest>  <file name>` lines, `*` binary
/// markers tolerated).
pub fn check(data: &[u8], sums: &[u8], file_name: &str) -> Result<()> {
    let expected = extract(sums, file_name)
        .ok_or_else(|| TervError::ChecksumNotFound(file_name.to_string()))?;

    let actual = hex::encode(Sha256::digest(data));
    if actual != expected {
        return Err(TervError::ChecksumMismatch {
            file_name: file_name.to_string(),
            expected,
            actual,
        });
    }
    Ok(())
}

fn extract(sums: &[u8], file_name: &str) -> Option<String> {
    let sums = String::from_utf8_lossy(sums);
    for line in sums.lines() {
        let mut parts = line.split_whitespace();
        let digest = parts.next()?;
        let Some(name) = parts.next() else { continue };
        if name.trim_start_matches('*') == file_name {
            return Some(digest.to_ascii_lowercase());
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    // digest of b"hello world\n"
    const SUMS: &str = "a948904f2f0f479b8f8197694b30184b0d2ed1c1cd2a1ec0fb85d299a192a447  greeting.txt\n\
                        0000000000000000000000000000000000000000000000000000000000000000  other.zip\n";

    #[test]
    fn accepts_matching_digest() {
        assert!(check(b"hello world\n", SUMS.as_bytes(), "greeting.txt").is_ok());
    }

    #[test]
    fn rejects_mismatch() {
        let err = check(b"tampered\n", SUMS.as_bytes(), "greeting.txt").unwrap_err();
        assert!(matches!(err, TervError::ChecksumMismatch { .. }));
    }

    #[test]
    fn missing_entry_is_distinct_error() {
        let err = check(b"hello world\n", SUMS.as_bytes(), "absent.zip").unwrap_err();
        assert!(matches!(err, TervError::ChecksumNotFound(_)));
    }

    #[test]
    fn binary_marker_is_tolerated() {
        let sums = "a948904f2f0f479b8f8197694b30184b0d2ed1c1cd2a1ec0fb85d299a192a447 *greeting.txt\n";
        assert!(check(b"hello world\n", sums.as_bytes(), "greeting.txt").is_ok());
    }
}
