//! Shard routing
//!
//! The shard id is part of the storage contract: items already written were
//! placed with CRC-32/IEEE of the user id modulo [`SHARD_COUNT`]. Changing
//! either makes existing items unreachable.

/// Number of shards per tenant
pub const SHARD_COUNT: u32 = 200;

/// Computes the partition key for a user, formatted `<tenantId>-<shard>`
///
/// Only the user id is hashed; the tenant id is a prefix.
pub fn shard_id(tenant_id: &str, user_id: &str) -> String {
    format!("{}-{}", tenant_id, shard_index(user_id))
}

/// Shard index in `0..SHARD_COUNT` for a user id
pub fn shard_index(user_id: &str) -> u32 {
    crc32fast::hash(user_id.as_bytes()) % SHARD_COUNT
}
