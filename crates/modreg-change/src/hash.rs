//! Content hashes for text snapshots
//!
//! [`ContentHash`] identifies the exact text a session parsed and the text a
//! commit wrote, so the store and the session can detect foreign writes.

/// Blake3 hash of file content
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContentHash(blake3::Hash);

impl ContentHash {
    /// Hash arbitrary data
    #[inline]
    #[must_use]
    pub fn compute(data: &[u8]) -> Self {
        Self(blake3::hash(data))
    }

    /// First 16 hex characters, for log lines and error messages
    #[must_use]
    pub fn short(&self) -> String {
        self.0.to_hex()[..16].to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compute_is_deterministic() {
        assert_eq!(
            ContentHash::compute(b"export class AppModule {}"),
            ContentHash::compute(b"export class AppModule {}")
        );
        assert_ne!(ContentHash::compute(b"a"), ContentHash::compute(b"b"));
    }

    #[test]
    fn short_is_hex_prefix() {
        let short = ContentHash::compute(b"module").short();
        assert_eq!(short.len(), 16);
        assert!(short.chars().all(|c| c.is_ascii_hexdigit()));
    }
}
