//! In-memory collaborators and fixtures shared by unit tests

use crate::dynamodb::{Item, ItemStore};
use crate::error::{IngestError, Result};
use crate::kms::{key_alias, KeyService};
use crate::model::{Address, CanonicalRecord, Ciphertext, Identifier};
use async_trait::async_trait;
use aws_sdk_dynamodb::types::AttributeValue;
use rsa::pkcs8::{DecodePrivateKey, EncodePublicKey};
use rsa::{Oaep, RsaPrivateKey, RsaPublicKey};
use sha2::Sha256;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use tokio::sync::watch;

pub const ACME_KEY_PEM: &str = include_str!("../testdata/acme_key.pem");
pub const GLOBEX_KEY_PEM: &str = include_str!("../testdata/globex_key.pem");

pub fn private_key(pem: &str) -> RsaPrivateKey {
    RsaPrivateKey::from_pkcs8_pem(pem).expect("fixture key")
}

pub fn public_key_der(pem: &str) -> Vec<u8> {
    RsaPublicKey::from(&private_key(pem))
        .to_public_key_der()
        .expect("encode public key")
        .as_bytes()
        .to_vec()
}

pub fn decrypt(pem: &str, ciphertext: &[u8]) -> String {
    let plaintext = private_key(pem)
        .decrypt(Oaep::new_with_label::<Sha256, _>(crate::encrypt::OAEP_LABEL), ciphertext)
        .expect("decrypt");
    String::from_utf8(plaintext).expect("utf8 plaintext")
}

pub fn open(pem: &str, ciphertext: &Ciphertext) -> String {
    decrypt(pem, ciphertext.as_bytes())
}

/// The example record used throughout the docs: user `u1` in New York
pub fn sample_record() -> CanonicalRecord {
    CanonicalRecord {
        tenant_id: String::new(),
        user_id: "u1".into(),
        first_name: "First".into(),
        last_name: "Last".into(),
        date_of_birth: "2020-01-10".into(),
        record_type: "KYC".into(),
        kyc_status: "VERIFIED".into(),
        address: Address {
            address1: "111 Here".into(),
            city_locality: "New York".into(),
            state_province_region: "NY".into(),
            postal_code: "10004".into(),
            country_code: "USA".into(),
            ..Default::default()
        },
        identifier: None,
    }
}

pub fn sample_identifier() -> Identifier {
    Identifier {
        id_type: "SSN".into(),
        value: "111-11-1111".into(),
        country_code: "USA".into(),
    }
}

/// Key service answering from a fixed table, counting fetches per alias
#[derive(Default)]
pub struct StaticKeyService {
    keys: HashMap<String, Vec<u8>>,
    gates: HashMap<String, watch::Receiver<bool>>,
    fetches: Mutex<HashMap<String, usize>>,
}

impl StaticKeyService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_key(mut self, tenant_id: &str, der: Vec<u8>) -> Self {
        self.keys.insert(key_alias(tenant_id), der);
        self
    }

    /// Holds lookups for `tenant_id` until `true` is sent on the returned sender
    pub fn gated(mut self, tenant_id: &str) -> (watch::Sender<bool>, Self) {
        let (tx, rx) = watch::channel(false);
        self.gates.insert(key_alias(tenant_id), rx);
        (tx, self)
    }

    pub fn fetches(&self, tenant_id: &str) -> usize {
        let fetches = self.fetches.lock().unwrap();
        fetches.get(&key_alias(tenant_id)).copied().unwrap_or(0)
    }
}

#[async_trait]
impl KeyService for StaticKeyService {
    async fn get_public_key(&self, alias: &str) -> Result<Option<Vec<u8>>> {
        {
            let mut fetches = self.fetches.lock().unwrap();
            *fetches.entry(alias.to_string()).or_default() += 1;
        }

        if let Some(gate) = self.gates.get(alias) {
            let mut gate = gate.clone();
            let opened = gate.wait_for(|open| *open).await.is_ok();
            if !opened {
                return Err(IngestError::KeyResolution {
                    tenant_id: alias.to_string(),
                    reason: "gate dropped".to_string(),
                });
            }
        }

        Ok(self.keys.get(alias).cloned())
    }
}

/// Item store keyed by (`ShardId`, `EntityId`) with put-overwrite semantics
#[derive(Default)]
pub struct MemoryStore {
    items: Mutex<HashMap<(String, String), Item>>,
    tables: Mutex<Vec<String>>,
    puts: AtomicUsize,
    fail: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store that rejects every write
    pub fn failing() -> Self {
        let store = Self::default();
        store.fail.store(true, Ordering::SeqCst);
        store
    }

    pub fn put_count(&self) -> usize {
        self.puts.load(Ordering::SeqCst)
    }

    pub fn len(&self) -> usize {
        self.items.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, shard_id: &str, entity_id: &str) -> Option<Item> {
        self.items
            .lock()
            .unwrap()
            .get(&(shard_id.to_string(), entity_id.to_string()))
            .cloned()
    }

    /// Distinct tables written to, in first-write order
    pub fn tables(&self) -> Vec<String> {
        self.tables.lock().unwrap().clone()
    }
}

#[async_trait]
impl ItemStore for MemoryStore {
    async fn put_item(&self, table: &str, item: Item) -> Result<()> {
        self.puts.fetch_add(1, Ordering::SeqCst);
        if self.fail.load(Ordering::SeqCst) {
            return Err(IngestError::Persistence(
                "PutItem failed: ProvisionedThroughputExceededException".to_string(),
            ));
        }

        let key = match (item.get("ShardId"), item.get("EntityId")) {
            (Some(AttributeValue::S(shard)), Some(AttributeValue::S(entity))) => {
                (shard.clone(), entity.clone())
            }
            _ => {
                return Err(IngestError::Persistence(
                    "Item is missing its key attributes".to_string(),
                ))
            }
        };

        {
            let mut tables = self.tables.lock().unwrap();
            if !tables.iter().any(|t| t == table) {
                tables.push(table.to_string());
            }
        }
        self.items.lock().unwrap().insert(key, item);
        Ok(())
    }
}
