//! Inbound payload decoding
//!
//! Two adapters produce the same [`CanonicalRecord`]:
//! - **v1 JSON**: camelCase document without an identifier
//! - **v2 protobuf**: [`proto::Kyc`], which may carry an [`proto::Id`]
//!
//! Neither adapter sets the tenant id; the caller assigns it from the path.

use crate::error::{IngestError, Result};
use crate::model::{Address, CanonicalRecord, Identifier};
use prost::Message;
use serde::Deserialize;

/// Protobuf messages for the v2 endpoint
pub mod proto {
    /// A KYC record
    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct Kyc {
        #[prost(string, tag = "1")]
        pub user_id: ::prost::alloc::string::String,
        #[prost(string, tag = "2")]
        pub first_name: ::prost::alloc::string::String,
        #[prost(string, optional, tag = "3")]
        pub last_name: ::core::option::Option<::prost::alloc::string::String>,
        /// ISO 8601
        #[prost(string, tag = "4")]
        pub date_of_birth: ::prost::alloc::string::String,
        #[prost(string, tag = "5")]
        pub record_type: ::prost::alloc::string::String,
        #[prost(string, tag = "6")]
        pub kyc_status: ::prost::alloc::string::String,
        #[prost(message, optional, tag = "7")]
        pub address: ::core::option::Option<Address>,
        #[prost(message, optional, tag = "8")]
        pub id: ::core::option::Option<Id>,
    }

    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct Address {
        #[prost(string, tag = "1")]
        pub address1: ::prost::alloc::string::String,
        #[prost(string, optional, tag = "2")]
        pub address2: ::core::option::Option<::prost::alloc::string::String>,
        #[prost(string, optional, tag = "3")]
        pub address3: ::core::option::Option<::prost::alloc::string::String>,
        #[prost(string, optional, tag = "4")]
        pub address4: ::core::option::Option<::prost::alloc::string::String>,
        #[prost(string, tag = "5")]
        pub city_locality: ::prost::alloc::string::String,
        #[prost(string, tag = "6")]
        pub state_province_region: ::prost::alloc::string::String,
        #[prost(string, tag = "7")]
        pub postal_code: ::prost::alloc::string::String,
        /// ISO 3166 alpha-3
        #[prost(string, tag = "8")]
        pub country_code: ::prost::alloc::string::String,
    }

    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct Id {
        /// e.g. `SSN`
        #[prost(string, tag = "1")]
        pub r#type: ::prost::alloc::string::String,
        #[prost(string, tag = "2")]
        pub value: ::prost::alloc::string::String,
        /// ISO 3166 alpha-3
        #[prost(string, tag = "3")]
        pub country_code: ::prost::alloc::string::String,
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct JsonKyc {
    user_id: String,
    #[serde(default)]
    first_name: Option<String>,
    #[serde(default)]
    last_name: Option<String>,
    #[serde(default)]
    date_of_birth: Option<String>,
    #[serde(default)]
    record_type: Option<String>,
    #[serde(default)]
    kyc_status: Option<String>,
    address: JsonAddress,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct JsonAddress {
    address1: String,
    #[serde(default)]
    address2: Option<String>,
    #[serde(default)]
    address3: Option<String>,
    #[serde(default)]
    address4: Option<String>,
    #[serde(default)]
    city_locality: Option<String>,
    #[serde(default)]
    state_province_region: Option<String>,
    #[serde(default)]
    postal_code: Option<String>,
    #[serde(default)]
    country_code: Option<String>,
}

/// Decodes a v1 JSON body
pub fn decode_json(body: &[u8]) -> Result<CanonicalRecord> {
    // serde_json messages can quote the rejected value, so only its position is kept
    let kyc: JsonKyc = serde_json::from_slice(body).map_err(|e| {
        IngestError::Decode(format!(
            "Invalid JSON ({:?}) at line {} column {}",
            e.classify(),
            e.line(),
            e.column()
        ))
    })?;

    let record = CanonicalRecord {
        tenant_id: String::new(),
        user_id: kyc.user_id,
        first_name: kyc.first_name.unwrap_or_default(),
        last_name: kyc.last_name.unwrap_or_default(),
        date_of_birth: kyc.date_of_birth.unwrap_or_default(),
        record_type: kyc.record_type.unwrap_or_default(),
        kyc_status: kyc.kyc_status.unwrap_or_default(),
        address: Address {
            address1: kyc.address.address1,
            address2: kyc.address.address2.unwrap_or_default(),
            address3: kyc.address.address3.unwrap_or_default(),
            address4: kyc.address.address4.unwrap_or_default(),
            city_locality: kyc.address.city_locality.unwrap_or_default(),
            state_province_region: kyc.address.state_province_region.unwrap_or_default(),
            postal_code: kyc.address.postal_code.unwrap_or_default(),
            country_code: kyc.address.country_code.unwrap_or_default(),
        },
        identifier: None,
    };

    validate(record)
}

/// Decodes a v2 protobuf body
pub fn decode_protobuf(body: &[u8]) -> Result<CanonicalRecord> {
    let kyc = proto::Kyc::decode(body)
        .map_err(|e| IngestError::Decode(format!("Invalid protobuf: {}", e)))?;

    let address = kyc
        .address
        .ok_or_else(|| IngestError::Decode("Missing address".to_string()))?;

    let record = CanonicalRecord {
        tenant_id: String::new(),
        user_id: kyc.user_id,
        first_name: kyc.first_name,
        last_name: kyc.last_name.unwrap_or_default(),
        date_of_birth: kyc.date_of_birth,
        record_type: kyc.record_type,
        kyc_status: kyc.kyc_status,
        address: Address {
            address1: address.address1,
            address2: address.address2.unwrap_or_default(),
            address3: address.address3.unwrap_or_default(),
            address4: address.address4.unwrap_or_default(),
            city_locality: address.city_locality,
            state_province_region: address.state_province_region,
            postal_code: address.postal_code,
            country_code: address.country_code,
        },
        identifier: kyc.id.map(|id| Identifier {
            id_type: id.r#type,
            value: id.value,
            country_code: id.country_code,
        }),
    };

    validate(record)
}

fn validate(record: CanonicalRecord) -> Result<CanonicalRecord> {
    if record.user_id.is_empty() {
        return Err(IngestError::Decode("Missing userId".to_string()));
    }
    if record.address.address1.is_empty() {
        return Err(IngestError::Decode("Missing address.address1".to_string()));
    }
    Ok(record)
}
