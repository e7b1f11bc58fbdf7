use sha2::{Digest, Sha256};
use std::fmt;
use std::sync::Arc;

use crate::types::Signature;

/// Cache key: the full source text plus the (context, result) type pair
///
/// The same snippet compiled for different types gets different entries.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    source: Arc<str>,
    signature: Signature,
}

impl CacheKey {
    pub fn new(source: impl Into<Arc<str>>, signature: Signature) -> Self {
        Self {
            source: source.into(),
            signature,
        }
    }

    /// Key for `source` bound to context `C` and result `R`
    pub fn for_types<C: ?Sized + 'static, R: ?Sized + 'static>(source: &str) -> Self {
        Self::new(source, Signature::of::<C, R>())
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub(crate) fn shared_source(&self) -> Arc<str> {
        Arc::clone(&self.source)
    }

    pub fn signature(&self) -> Signature {
        self.signature
    }

    /// Short SHA-256 fingerprint of source and type names, for log lines
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.source.as_bytes());
        hasher.update([0]);
        hasher.update(self.signature.context.name().as_bytes());
        hasher.update([0]);
        hasher.update(self.signature.result.name().as_bytes());
        let digest = format!("{:x}", hasher.finalize());
        digest[..12].to_string()
    }
}

impl fmt::Debug for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheKey")
            .field("fingerprint", &self.fingerprint())
            .field("signature", &self.signature)
            .finish()
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.fingerprint(), self.signature)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_source_different_types_are_distinct() {
        let a = CacheKey::for_types::<(), i64>("1 + 1");
        let b = CacheKey::for_types::<(), f64>("1 + 1");
        assert_ne!(a, b);
        assert_ne!(a.fingerprint(), b.fingerprint());
    }

    #[test]
    fn test_same_source_same_types_are_equal() {
        let a = CacheKey::for_types::<(), i64>("1 + 1");
        let b = CacheKey::for_types::<(), i64>(&String::from("1 + 1"));
        assert_eq!(a, b);
        assert_eq!(a.fingerprint(), b.fingerprint());
        assert_eq!(a.fingerprint().len(), 12);
    }
}
