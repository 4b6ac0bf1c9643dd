//! Ingestion pipeline
//!
//! Each request moves strictly forward through [`Stage`]:
//! decoded, tenant assigned, encrypted, routed, persisted, responded.
//! Any failure rejects the request. Nothing durable happens before the single
//! put in the persist step, so a rejected or cancelled request leaves no trace.

use crate::dynamodb::KycWriter;
use crate::encrypt::FieldEncryptor;
use crate::error::Result;
use crate::model::CanonicalRecord;
use crate::shard::shard_id;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, info, warn};

/// Steps of a single ingestion
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Decoded,
    TenantAssigned,
    Encrypted,
    Routed,
    Persisted,
    Responded,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Decoded => "decoded",
            Stage::TenantAssigned => "tenant_assigned",
            Stage::Encrypted => "encrypted",
            Stage::Routed => "routed",
            Stage::Persisted => "persisted",
            Stage::Responded => "responded",
        };
        f.write_str(name)
    }
}

/// Response body of a successful ingestion
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestReceipt {
    pub request_id: String,
    pub user_id: String,
}

/// Encrypts, routes and persists decoded KYC records
pub struct IngestPipeline {
    encryptor: FieldEncryptor,
    writer: KycWriter,
}

impl IngestPipeline {
    pub fn new(encryptor: FieldEncryptor, writer: KycWriter) -> Self {
        Self { encryptor, writer }
    }

    /// Ingests a decoded record for `tenant_id`
    ///
    /// The tenant from the path always replaces whatever the payload carried.
    pub async fn ingest(
        &self,
        tenant_id: &str,
        record: CanonicalRecord,
        request_id: &str,
    ) -> Result<IngestReceipt> {
        let mut stage = Stage::Decoded;
        let result = self.run(tenant_id, record, request_id, &mut stage).await;

        if let Err(e) = &result {
            warn!(
                request_id = %request_id,
                tenant_id = %tenant_id,
                stage = %stage,
                error = %e,
                "Ingestion rejected"
            );
        }
        result
    }

    async fn run(
        &self,
        tenant_id: &str,
        record: CanonicalRecord,
        request_id: &str,
        stage: &mut Stage,
    ) -> Result<IngestReceipt> {
        let record = record.with_tenant(tenant_id);
        *stage = Stage::TenantAssigned;
        debug!(request_id = %request_id, user_id = %record.user_id, "Tenant assigned");

        let encrypted = self.encryptor.encrypt(&record).await?;
        *stage = Stage::Encrypted;

        let shard = shard_id(&encrypted.tenant_id, &encrypted.user_id);
        *stage = Stage::Routed;

        self.writer.persist(&encrypted, &shard).await?;
        *stage = Stage::Persisted;

        info!(
            request_id = %request_id,
            tenant_id = %tenant_id,
            shard_id = %shard,
            "KYC record ingested"
        );

        *stage = Stage::Responded;
        Ok(IngestReceipt {
            request_id: request_id.to_string(),
            user_id: encrypted.user_id,
        })
    }
}

/// Fresh random request id for response and log correlation
pub fn new_request_id() -> String {
    uuid::Uuid::new_v4().to_string()
}
