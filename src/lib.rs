//! KYC Ingestion - per-tenant field encryption and sharded DynamoDB writes
//!
//! This library provides the ingestion pipeline behind the HTTP service:
//! - Per-tenant RSA public key resolution from KMS, cached for the process lifetime
//! - RSA-OAEP encryption of the PII fields of each KYC record
//! - Deterministic CRC-32 shard routing by user id
//! - DynamoDB item assembly and unconditional writes
//! - JSON (v1) and protobuf (v2) payload adapters and the hyper HTTP surface

pub mod aws;
pub mod config;
pub mod dynamodb;
pub mod encrypt;
pub mod error;
pub mod http;
pub mod ingest;
pub mod keycache;
pub mod kms;
pub mod model;
pub mod shard;
pub mod wire;

#[cfg(test)]
mod testing;
