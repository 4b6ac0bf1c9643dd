//! KMS-backed public key lookup
//!
//! Every tenant owns an asymmetric RSA key in KMS published under the alias
//! `alias/<tenantId>`. Only the public half is ever fetched; ciphertexts can
//! be opened only by whoever holds the KMS decrypt grant for that key.
//!
//! ## Reference
//!
//! - [AWS KMS GetPublicKey](https://docs.aws.amazon.com/kms/latest/APIReference/API_GetPublicKey.html)

use crate::error::{IngestError, Result};
use async_trait::async_trait;
use aws_sdk_kms::Client as KmsClient;
use tracing::{debug, info};

/// Source of raw public key material by alias name
#[async_trait]
pub trait KeyService: Send + Sync {
    /// Returns the DER-encoded SubjectPublicKeyInfo published under `alias`,
    /// or `None` when no such key exists
    async fn get_public_key(&self, alias: &str) -> Result<Option<Vec<u8>>>;
}

/// KMS alias under which a tenant's key is published
pub fn key_alias(tenant_id: &str) -> String {
    format!("alias/{}", tenant_id)
}

/// KMS implementation of [`KeyService`]
pub struct KmsKeyService {
    client: KmsClient,
}

impl KmsKeyService {
    pub fn new(client: KmsClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl KeyService for KmsKeyService {
    async fn get_public_key(&self, alias: &str) -> Result<Option<Vec<u8>>> {
        info!(alias = %alias, "Fetching public key from KMS");

        let response = match self.client.get_public_key().key_id(alias).send().await {
            Ok(response) => response,
            Err(e) => {
                if e.as_service_error()
                    .is_some_and(|service| service.is_not_found_exception())
                {
                    debug!(alias = %alias, "KMS has no key for alias");
                    return Ok(None);
                }
                return Err(IngestError::KeyResolution {
                    tenant_id: alias.trim_start_matches("alias/").to_string(),
                    reason: format!("GetPublicKey failed: {}", e),
                });
            }
        };

        let public_key = response.public_key().ok_or_else(|| IngestError::KeyResolution {
            tenant_id: alias.trim_start_matches("alias/").to_string(),
            reason: "No public key in response".to_string(),
        })?;

        debug!(
            alias = %alias,
            key_spec = ?response.key_spec(),
            key_len = public_key.as_ref().len(),
            "Public key fetched"
        );
        Ok(Some(public_key.as_ref().to_vec()))
    }
}
