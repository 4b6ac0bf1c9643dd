//! Field-level encryption of KYC records
//!
//! PII attributes are sealed one by one with RSA-OAEP (SHA-256 for both the
//! digest and MGF1) under the tenant's public key, using a fixed label shared
//! by all tenants and fields. First name, last name, date of birth, identifier
//! value and address line 1 are always sealed, even when empty. Address lines
//! 2-4 are sealed only when supplied; otherwise they become
//! [`Ciphertext::absent`]. Any single failure aborts the whole record.

use crate::error::{IngestError, Result};
use crate::keycache::PublicKeyCache;
use crate::model::{
    CanonicalRecord, Ciphertext, EncryptedAddress, EncryptedIdentifier, EncryptedRecord,
};
use rand::rngs::OsRng;
use rsa::{Oaep, RsaPublicKey};
use sha2::Sha256;
use std::sync::Arc;
use tracing::debug;

/// OAEP label applied to every field
pub const OAEP_LABEL: &str = "kyc";

/// Encrypts records under their tenant's key
pub struct FieldEncryptor {
    keys: Arc<PublicKeyCache>,
}

impl FieldEncryptor {
    pub fn new(keys: Arc<PublicKeyCache>) -> Self {
        Self { keys }
    }

    /// Resolves the key for `record.tenant_id` and seals every PII field
    pub async fn encrypt(&self, record: &CanonicalRecord) -> Result<EncryptedRecord> {
        let key = self.keys.resolve_key(&record.tenant_id).await?;
        let sealed = seal_record(&key, record)?;

        debug!(
            tenant_id = %record.tenant_id,
            first_name_len = sealed.first_name.as_bytes().len(),
            has_identifier = sealed.identifier.is_some(),
            "Record encrypted"
        );
        Ok(sealed)
    }
}

/// Seals `record` under `key`
pub fn seal_record(key: &RsaPublicKey, record: &CanonicalRecord) -> Result<EncryptedRecord> {
    let mut sealer = Sealer {
        key,
        tenant_id: &record.tenant_id,
        rng: OsRng,
    };

    let first_name = sealer.seal("firstName", &record.first_name)?;
    let last_name = sealer.seal("lastName", &record.last_name)?;
    let date_of_birth = sealer.seal("dateOfBirth", &record.date_of_birth)?;

    let identifier = match &record.identifier {
        Some(id) => Some(EncryptedIdentifier {
            id_type: id.id_type.clone(),
            value: sealer.seal("id.value", &id.value)?,
            country_code: id.country_code.clone(),
        }),
        None => None,
    };

    let address = &record.address;
    let address = EncryptedAddress {
        address1: sealer.seal("address.address1", &address.address1)?,
        address2: sealer.seal_optional("address.address2", &address.address2)?,
        address3: sealer.seal_optional("address.address3", &address.address3)?,
        address4: sealer.seal_optional("address.address4", &address.address4)?,
        city_locality: address.city_locality.clone(),
        state_province_region: address.state_province_region.clone(),
        postal_code: address.postal_code.clone(),
        country_code: address.country_code.clone(),
    };

    Ok(EncryptedRecord {
        tenant_id: record.tenant_id.clone(),
        user_id: record.user_id.clone(),
        first_name,
        last_name,
        date_of_birth,
        record_type: record.record_type.clone(),
        kyc_status: record.kyc_status.clone(),
        address,
        identifier,
    })
}

struct Sealer<'a> {
    key: &'a RsaPublicKey,
    tenant_id: &'a str,
    rng: OsRng,
}

impl Sealer<'_> {
    fn seal(&mut self, field: &'static str, plaintext: &str) -> Result<Ciphertext> {
        self.key
            .encrypt(
                &mut self.rng,
                Oaep::new_with_label::<Sha256, _>(OAEP_LABEL),
                plaintext.as_bytes(),
            )
            .map(Ciphertext::new)
            .map_err(|e| IngestError::Encryption {
                tenant_id: self.tenant_id.to_string(),
                field,
                reason: e.to_string(),
            })
    }

    fn seal_optional(&mut self, field: &'static str, plaintext: &str) -> Result<Ciphertext> {
        if plaintext.is_empty() {
            Ok(Ciphertext::absent())
        } else {
            self.seal(field, plaintext)
        }
    }
}
