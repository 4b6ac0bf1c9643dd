//! Per-tenant public key cache
//!
//! Keys are fetched lazily on first use and kept for the life of the process.
//! The map is sharded, and no lock is held while a fetch is in flight, so a
//! slow lookup for one tenant never stalls another. Concurrent first lookups
//! for the same tenant may each fetch; the results are identical and the
//! last insert wins.

use crate::error::{IngestError, Result};
use crate::kms::{key_alias, KeyService};
use dashmap::DashMap;
use rsa::pkcs8::DecodePublicKey;
use rsa::traits::PublicKeyParts;
use rsa::RsaPublicKey;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Modulus size tenant keys are provisioned with
pub const EXPECTED_KEY_BITS: usize = 4096;

pub struct PublicKeyCache {
    service: Arc<dyn KeyService>,
    keys: DashMap<String, Arc<RsaPublicKey>>,
}

impl PublicKeyCache {
    pub fn new(service: Arc<dyn KeyService>) -> Self {
        Self {
            service,
            keys: DashMap::new(),
        }
    }

    /// Returns the tenant's public key, fetching it on first use
    pub async fn resolve_key(&self, tenant_id: &str) -> Result<Arc<RsaPublicKey>> {
        if let Some(key) = self.keys.get(tenant_id) {
            return Ok(Arc::clone(key.value()));
        }

        debug!(tenant_id = %tenant_id, "Public key cache miss");

        let der = self
            .service
            .get_public_key(&key_alias(tenant_id))
            .await?
            .ok_or_else(|| IngestError::KeyResolution {
                tenant_id: tenant_id.to_string(),
                reason: "No key published for tenant".to_string(),
            })?;

        let key = RsaPublicKey::from_public_key_der(&der).map_err(|e| {
            IngestError::KeyResolution {
                tenant_id: tenant_id.to_string(),
                reason: format!("Unable to parse public key: {}", e),
            }
        })?;

        let bits = key.size() * 8;
        if bits != EXPECTED_KEY_BITS {
            warn!(tenant_id = %tenant_id, bits, "Tenant key has unexpected modulus size");
        }

        let key = Arc::new(key);
        self.keys.insert(tenant_id.to_string(), Arc::clone(&key));
        info!(tenant_id = %tenant_id, bits, "Cached tenant public key");

        Ok(key)
    }

    /// Number of tenants with a cached key
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}
