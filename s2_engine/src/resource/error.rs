use s2_formats::ResourceKey;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ResourceError {
    /// No registered source provides the key. Callers pick a fallback.
    #[error("resource {0} not found")]
    NotFound(ResourceKey),
    /// Header, checksum or compressed payload did not validate. Treated as
    /// if the resource were absent.
    #[error("resource {key} is corrupt: {reason}")]
    Corrupt { key: ResourceKey, reason: String },
    #[error("reading resource {key}: {source}")]
    Io {
        key: ResourceKey,
        #[source]
        source: std::io::Error,
    },
}

impl ResourceError {
    pub fn corrupt(key: ResourceKey, reason: impl std::fmt::Display) -> Self {
        ResourceError::Corrupt {
            key,
            reason: reason.to_string(),
        }
    }

    pub fn key(&self) -> ResourceKey {
        match self {
            ResourceError::NotFound(key) => *key,
            ResourceError::Corrupt { key, .. } => *key,
            ResourceError::Io { key, .. } => *key,
        }
    }

    /// True for conditions the caller should treat as "resource absent".
    pub fn is_absent(&self) -> bool {
        matches!(self, ResourceError::NotFound(_) | ResourceError::Corrupt { .. })
    }
}
