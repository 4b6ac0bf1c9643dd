//! AWS client initialization
//!
//! Builds the KMS and DynamoDB clients once at startup and wires them into an
//! [`IngestPipeline`]. Credentials and, unless overridden, the region come
//! from the SDK default provider chain.

use crate::config::IngestConfig;
use crate::dynamodb::{DynamoItemStore, KycWriter};
use crate::encrypt::FieldEncryptor;
use crate::ingest::IngestPipeline;
use crate::keycache::PublicKeyCache;
use crate::kms::KmsKeyService;
use aws_config::{BehaviorVersion, Region};
use aws_sdk_dynamodb::Client as DynamoClient;
use aws_sdk_kms::Client as KmsClient;
use std::sync::Arc;
use tracing::info;

/// AWS clients shared by every request
pub struct AwsClients {
    /// KMS client for tenant public key lookup
    pub kms: KmsClient,
    /// DynamoDB client for KYC item writes
    pub dynamodb: DynamoClient,
}

impl AwsClients {
    /// Loads the SDK configuration and creates the clients
    pub async fn new(config: &IngestConfig) -> Self {
        info!(
            region = ?config.region,
            table = %config.kyc_table,
            "Initializing AWS clients"
        );

        let mut loader = aws_config::defaults(BehaviorVersion::latest());
        if let Some(region) = &config.region {
            loader = loader.region(Region::new(region.clone()));
        }
        let sdk_config = loader.load().await;

        let kms = KmsClient::new(&sdk_config);
        let dynamodb = DynamoClient::new(&sdk_config);

        info!(region = ?sdk_config.region(), "AWS clients initialized successfully");

        Self { kms, dynamodb }
    }

    /// Assembles the ingestion pipeline on top of these clients
    pub fn pipeline(&self, config: &IngestConfig) -> IngestPipeline {
        let keys = PublicKeyCache::new(Arc::new(KmsKeyService::new(self.kms.clone())));
        let store = DynamoItemStore::new(self.dynamodb.clone());

        IngestPipeline::new(
            FieldEncryptor::new(Arc::new(keys)),
            KycWriter::new(Arc::new(store), config.kyc_table.clone()),
        )
    }
}
