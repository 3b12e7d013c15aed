//! Host identity (IP/FQDN) cache fed by IpFqdn messages.

use anyhow::{anyhow, Result};
use parking_lot::RwLock;

/// Receives the FQDN the engine announces for this host.
#[async_trait::async_trait]
pub trait IdentityCache: Send + Sync {
    async fn update_fqdn(&self, fqdn: &str) -> Result<()>;
}

/// In-memory cache holding the last announced FQDN.
#[derive(Debug, Default)]
pub struct FqdnCache {
    fqdn: RwLock<Option<String>>,
}

impl FqdnCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fqdn(&self) -> Option<String> {
        self.fqdn.read().clone()
    }
}

#[async_trait::async_trait]
impl IdentityCache for FqdnCache {
    /// An empty FQDN clears the cache. Names with whitespace or control
    /// characters are refused.
    async fn update_fqdn(&self, fqdn: &str) -> Result<()> {
        if fqdn.chars().any(|c| c.is_whitespace() || c.is_control()) {
            return Err(anyhow!("FQDN {:?} contains invalid characters", fqdn));
        }

        let mut slot = self.fqdn.write();
        if fqdn.is_empty() {
            *slot = None;
        } else {
            *slot = Some(fqdn.to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_update_and_clear() {
        let cache = FqdnCache::new();
        assert_eq!(cache.fqdn(), None);

        cache.update_fqdn("amt-host.example.com").await.unwrap();
        assert_eq!(cache.fqdn().as_deref(), Some("amt-host.example.com"));

        cache.update_fqdn("").await.unwrap();
        assert_eq!(cache.fqdn(), None);
    }

    #[tokio::test]
    async fn test_invalid_fqdn_keeps_previous_value() {
        let cache = FqdnCache::new();
        cache.update_fqdn("good.example").await.unwrap();
        assert!(cache.update_fqdn("bad name").await.is_err());
        assert_eq!(cache.fqdn().as_deref(), Some("good.example"));
    }
}
