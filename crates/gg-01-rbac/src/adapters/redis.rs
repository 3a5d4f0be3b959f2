#![cfg(feature = "redis")]

use crate::domain::StoreError;
use crate::ports::PermissionStore;
use async_trait::async_trait;
use redis::aio::ConnectionManager;

/// Permission store backed by Redis hashes.
///
/// One `HMGET` per target: the grant exists if any requested field is
/// non-nil. Field values are never decoded, any bytes count as a grant.
#[derive(Clone)]
pub struct RedisPermissionStore {
    manager: ConnectionManager,
}

impl RedisPermissionStore {
    pub async fn connect(url: &str) -> Result<Self, StoreError> {
        let client = redis::Client::open(url)
            .map_err(|err| StoreError::Unavailable(format!("redis client: {err}")))?;
        let manager = ConnectionManager::new(client)
            .await
            .map_err(|err| StoreError::Unavailable(format!("redis connect: {err}")))?;
        Ok(Self { manager })
    }
}

#[async_trait]
impl PermissionStore for RedisPermissionStore {
    async fn has_any_field(&self, key: &str, fields: &[String]) -> Result<bool, StoreError> {
        if fields.is_empty() {
            return Ok(false);
        }
        let mut conn = self.manager.clone();
        let values: Vec<Option<Vec<u8>>> = redis::cmd("HMGET")
            .arg(key)
            .arg(fields)
            .query_async(&mut conn)
            .await
            .map_err(|err| StoreError::Backend(format!("redis hmget: {err}")))?;
        Ok(any_present(&values))
    }
}

fn any_present(values: &[Option<Vec<u8>>]) -> bool {
    values.iter().any(Option::is_some)
}
