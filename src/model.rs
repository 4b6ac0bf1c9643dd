//! KYC record types
//!
//! [`CanonicalRecord`] is the plaintext form produced by the wire adapters.
//! [`EncryptedRecord`] is the same record after every PII attribute has been
//! sealed under the tenant's public key. The two never share storage, so no
//! value is ever observable half-encrypted.

use std::fmt;

/// Wire-independent plaintext KYC record
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CanonicalRecord {
    /// Assigned by the ingestion path, never taken from the payload
    pub tenant_id: String,
    pub user_id: String,
    pub first_name: String,
    /// Empty when the payload omitted it
    pub last_name: String,
    /// ISO-8601 date, not validated beyond presence
    pub date_of_birth: String,
    pub record_type: String,
    pub kyc_status: String,
    pub address: Address,
    /// Only the binary protocol carries an identifier
    pub identifier: Option<Identifier>,
}

impl CanonicalRecord {
    /// Returns the record bound to `tenant_id`, replacing any prior value
    pub fn with_tenant(mut self, tenant_id: impl Into<String>) -> Self {
        self.tenant_id = tenant_id.into();
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Address {
    pub address1: String,
    /// Lines 2-4 are empty when absent
    pub address2: String,
    pub address3: String,
    pub address4: String,
    pub city_locality: String,
    pub state_province_region: String,
    pub postal_code: String,
    /// ISO 3166 alpha-3
    pub country_code: String,
}

/// Government or national identifier attached to a record
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Identifier {
    /// e.g. `SSN`
    pub id_type: String,
    pub value: String,
    pub country_code: String,
}

/// Opaque RSA-OAEP ciphertext of a single field
///
/// An absent optional field is an empty byte sequence. That is distinct from
/// the ciphertext of an empty string, which is always a full RSA block.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Ciphertext(Vec<u8>);

impl Ciphertext {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    /// Marker for an optional field that was not supplied
    pub fn absent() -> Self {
        Self(Vec::new())
    }

    pub fn is_absent(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.0
    }
}

impl fmt::Debug for Ciphertext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Ciphertext({} bytes)", self.0.len())
    }
}

/// KYC record with every PII attribute sealed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncryptedRecord {
    pub tenant_id: String,
    pub user_id: String,
    pub first_name: Ciphertext,
    pub last_name: Ciphertext,
    pub date_of_birth: Ciphertext,
    pub record_type: String,
    pub kyc_status: String,
    pub address: EncryptedAddress,
    pub identifier: Option<EncryptedIdentifier>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncryptedAddress {
    pub address1: Ciphertext,
    pub address2: Ciphertext,
    pub address3: Ciphertext,
    pub address4: Ciphertext,
    pub city_locality: String,
    pub state_province_region: String,
    pub postal_code: String,
    pub country_code: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncryptedIdentifier {
    pub id_type: String,
    pub value: Ciphertext,
    pub country_code: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_with_tenant_overrides() {
        let record = CanonicalRecord {
            tenant_id: "spoofed".into(),
            user_id: "u1".into(),
            ..Default::default()
        }
        .with_tenant("acme");
        assert_eq!(record.tenant_id, "acme");
        assert_eq!(record.user_id, "u1");
    }

    #[test]
    fn test_ciphertext_debug_hides_bytes() {
        let ct = Ciphertext::new(vec![0xde, 0xad, 0xbe, 0xef]);
        assert_eq!(format!("{:?}", ct), "Ciphertext(4 bytes)");
        assert!(Ciphertext::absent().is_absent());
        assert!(!ct.is_absent());
    }
}
