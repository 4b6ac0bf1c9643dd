//! DynamoDB persistence for encrypted KYC records
//!
//! ## Table Schema
//!
//! Single-table layout, one item per (tenant, user):
//! - `ShardId` (String): partition key, `<tenantId>-<crc32(userId) % 200>`
//! - `EntityId` (String): sort key, `A#<userId>#U`
//! - `TenantId`, `UserId`, `RecordType`, `KycStatus` (String)
//! - `FirstName`, `LastName`, `DOB` (Binary): RSA-OAEP ciphertexts
//! - `Id` (Map): `Type` (S), `Value` (B), `CountryCode` (S); binary protocol only
//! - `Address` (Map): `Address1`..`Address4` (B), `CityLocality`,
//!   `StateProvinceRegion`, `PostalCode`, `CountryCode` (S)
//!
//! Absent address lines 2-4 are stored as zero-length binaries, never omitted.
//! Writes are unconditional puts, so a repeat ingestion replaces the item.

use crate::error::{IngestError, Result};
use crate::model::{Ciphertext, EncryptedAddress, EncryptedIdentifier, EncryptedRecord};
use async_trait::async_trait;
use aws_sdk_dynamodb::primitives::Blob;
use aws_sdk_dynamodb::types::AttributeValue;
use aws_sdk_dynamodb::Client as DynamoClient;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};

/// Attribute map handed to the storage engine
pub type Item = HashMap<String, AttributeValue>;

/// Storage engine accepting unconditional put-item writes
#[async_trait]
pub trait ItemStore: Send + Sync {
    async fn put_item(&self, table: &str, item: Item) -> Result<()>;
}

/// DynamoDB implementation of [`ItemStore`]
pub struct DynamoItemStore {
    client: DynamoClient,
}

impl DynamoItemStore {
    pub fn new(client: DynamoClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ItemStore for DynamoItemStore {
    async fn put_item(&self, table: &str, item: Item) -> Result<()> {
        self.client
            .put_item()
            .table_name(table)
            .set_item(Some(item))
            .send()
            .await
            .map_err(|e| IngestError::Persistence(format!("PutItem failed: {}", e)))?;
        Ok(())
    }
}

/// Sort key for a user's KYC item
pub fn entity_id(user_id: &str) -> String {
    format!("A#{}#U", user_id)
}

/// Builds the storage item for `record` placed on `shard_id`
pub fn build_item(record: &EncryptedRecord, shard_id: &str) -> Item {
    let mut item = HashMap::new();
    item.insert("ShardId".to_string(), string(shard_id));
    item.insert("EntityId".to_string(), string(&entity_id(&record.user_id)));
    item.insert("TenantId".to_string(), string(&record.tenant_id));
    item.insert("UserId".to_string(), string(&record.user_id));
    item.insert("FirstName".to_string(), binary(&record.first_name));
    item.insert("LastName".to_string(), binary(&record.last_name));
    item.insert("DOB".to_string(), binary(&record.date_of_birth));
    item.insert("RecordType".to_string(), string(&record.record_type));
    item.insert("KycStatus".to_string(), string(&record.kyc_status));

    if let Some(identifier) = &record.identifier {
        item.insert("Id".to_string(), identifier_map(identifier));
    }
    item.insert("Address".to_string(), address_map(&record.address));

    item
}

fn identifier_map(identifier: &EncryptedIdentifier) -> AttributeValue {
    let mut map = HashMap::new();
    map.insert("Type".to_string(), string(&identifier.id_type));
    map.insert("Value".to_string(), binary(&identifier.value));
    map.insert("CountryCode".to_string(), string(&identifier.country_code));
    AttributeValue::M(map)
}

fn address_map(address: &EncryptedAddress) -> AttributeValue {
    let mut map = HashMap::new();
    map.insert("Address1".to_string(), binary(&address.address1));
    map.insert("Address2".to_string(), binary(&address.address2));
    map.insert("Address3".to_string(), binary(&address.address3));
    map.insert("Address4".to_string(), binary(&address.address4));
    map.insert("CityLocality".to_string(), string(&address.city_locality));
    map.insert(
        "StateProvinceRegion".to_string(),
        string(&address.state_province_region),
    );
    map.insert("PostalCode".to_string(), string(&address.postal_code));
    map.insert("CountryCode".to_string(), string(&address.country_code));
    AttributeValue::M(map)
}

fn string(value: &str) -> AttributeValue {
    AttributeValue::S(value.to_string())
}

fn binary(value: &Ciphertext) -> AttributeValue {
    AttributeValue::B(Blob::new(value.as_bytes()))
}

/// Writes encrypted KYC records to the configured table
pub struct KycWriter {
    store: Arc<dyn ItemStore>,
    table_name: String,
}

impl KycWriter {
    pub fn new(store: Arc<dyn ItemStore>, table_name: impl Into<String>) -> Self {
        Self {
            store,
            table_name: table_name.into(),
        }
    }

    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    /// Issues one unconditional put of `record` keyed by `shard_id`
    pub async fn persist(&self, record: &EncryptedRecord, shard_id: &str) -> Result<()> {
        let item = build_item(record, shard_id);

        info!(
            table = %self.table_name,
            tenant_id = %record.tenant_id,
            shard_id = %shard_id,
            attributes = item.len(),
            "Storing KYC item"
        );

        self.store.put_item(&self.table_name, item).await?;

        debug!(tenant_id = %record.tenant_id, shard_id = %shard_id, "KYC item stored");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MemoryStore;

    fn encrypted_record(identifier: bool) -> EncryptedRecord {
        EncryptedRecord {
            tenant_id: "acme".into(),
            user_id: "u1".into(),
            first_name: Ciphertext::new(vec![1; 4]),
            last_name: Ciphertext::new(vec![2; 4]),
            date_of_birth: Ciphertext::new(vec![3; 4]),
            record_type: "KYC".into(),
            kyc_status: "VERIFIED".into(),
            address: EncryptedAddress {
                address1: Ciphertext::new(vec![4; 4]),
                address2: Ciphertext::absent(),
                address3: Ciphertext::absent(),
                address4: Ciphertext::absent(),
                city_locality: "New York".into(),
                state_province_region: "NY".into(),
                postal_code: "10004".into(),
                country_code: "USA".into(),
            },
            identifier: identifier.then(|| EncryptedIdentifier {
                id_type: "SSN".into(),
                value: Ciphertext::new(vec![5; 4]),
                country_code: "USA".into(),
            }),
        }
    }

    fn get_string<'a>(item: &'a Item, key: &str) -> &'a str {
        match item.get(key) {
            Some(AttributeValue::S(s)) => s,
            other => panic!("Missing or invalid string attribute {}: {:?}", key, other),
        }
    }

    fn get_binary<'a>(item: &'a Item, key: &str) -> &'a [u8] {
        match item.get(key) {
            Some(AttributeValue::B(b)) => b.as_ref(),
            other => panic!("Missing or invalid binary attribute {}: {:?}", key, other),
        }
    }

    fn get_map<'a>(item: &'a Item, key: &str) -> &'a Item {
        match item.get(key) {
            Some(AttributeValue::M(m)) => m,
            other => panic!("Missing or invalid map attribute {}: {:?}", key, other),
        }
    }

    #[test]
    fn test_entity_id() {
        assert_eq!(entity_id("u1"), "A#u1#U");
    }

    #[test]
    fn test_build_item_schema() {
        let item = build_item(&encrypted_record(true), "acme-22");

        assert_eq!(get_string(&item, "ShardId"), "acme-22");
        assert_eq!(get_string(&item, "EntityId"), "A#u1#U");
        assert_eq!(get_string(&item, "TenantId"), "acme");
        assert_eq!(get_string(&item, "UserId"), "u1");
        assert_eq!(get_string(&item, "RecordType"), "KYC");
        assert_eq!(get_string(&item, "KycStatus"), "VERIFIED");
        assert_eq!(get_binary(&item, "FirstName"), &[1; 4]);
        assert_eq!(get_binary(&item, "LastName"), &[2; 4]);
        assert_eq!(get_binary(&item, "DOB"), &[3; 4]);

        let id = get_map(&item, "Id");
        assert_eq!(get_string(id, "Type"), "SSN");
        assert_eq!(get_binary(id, "Value"), &[5; 4]);
        assert_eq!(get_string(id, "CountryCode"), "USA");

        let address = get_map(&item, "Address");
        assert_eq!(address.len(), 8);
        assert_eq!(get_binary(address, "Address1"), &[4; 4]);
        assert_eq!(get_string(address, "CityLocality"), "New York");
        assert_eq!(get_string(address, "StateProvinceRegion"), "NY");
        assert_eq!(get_string(address, "PostalCode"), "10004");
        assert_eq!(get_string(address, "CountryCode"), "USA");
    }

    #[test]
    fn test_absent_lines_are_empty_binaries() {
        let item = build_item(&encrypted_record(false), "acme-22");
        let address = get_map(&item, "Address");
        for line in ["Address2", "Address3", "Address4"] {
            assert!(get_binary(address, line).is_empty(), "{} not empty", line);
        }
    }

    #[test]
    fn test_identifier_omitted_when_absent() {
        let item = build_item(&encrypted_record(false), "acme-22");
        assert!(!item.contains_key("Id"));
    }

    #[tokio::test]
    async fn test_persist_overwrites() {
        let store = Arc::new(MemoryStore::new());
        let writer = KycWriter::new(store.clone(), "kyc-test");

        let first = encrypted_record(false);
        let mut second = encrypted_record(false);
        second.kyc_status = "REJECTED".into();

        writer.persist(&first, "acme-22").await.unwrap();
        writer.persist(&second, "acme-22").await.unwrap();

        assert_eq!(store.put_count(), 2);
        assert_eq!(store.len(), 1);
        let stored = store.get("acme-22", "A#u1#U").unwrap();
        assert_eq!(get_string(&stored, "KycStatus"), "REJECTED");
        assert_eq!(store.tables(), vec!["kyc-test".to_string()]);
    }

    #[tokio::test]
    async fn test_persist_surfaces_store_failure() {
        let store = Arc::new(MemoryStore::failing());
        let writer = KycWriter::new(store.clone(), "kyc-test");
        let err = writer
            .persist(&encrypted_record(false), "acme-22")
            .await
            .unwrap_err();
        assert!(matches!(err, IngestError::Persistence(_)));
        assert!(store.is_empty());
    }
}
