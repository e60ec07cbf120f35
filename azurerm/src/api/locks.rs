//! Management locks (`Microsoft.Authorization/locks`)

use super::{ApiError, Client};
use crate::ids::ScopedLockId;
use serde::{Deserialize, Serialize};
use tfplug::Context;

pub const API_VERSION: &str = "2020-05-01";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManagementLock {
    #[serde(default, skip_serializing)]
    pub id: String,
    #[serde(default, skip_serializing)]
    pub name: String,
    pub properties: LockProperties,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LockProperties {
    pub level: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

pub struct LocksApi<'a> {
    client: &'a Client,
}

impl<'a> LocksApi<'a> {
    pub fn new(client: &'a Client) -> Self {
        Self { client }
    }

    pub async fn get(&self, ctx: &Context, id: &ScopedLockId) -> Result<ManagementLock, ApiError> {
        self.client.get(ctx, &id.to_string(), API_VERSION).await
    }

    pub async fn create_or_update(
        &self,
        ctx: &Context,
        id: &ScopedLockId,
        lock: &ManagementLock,
    ) -> Result<ManagementLock, ApiError> {
        self.client
            .put(ctx, &id.to_string(), API_VERSION, lock)
            .await
    }

    pub async fn delete(&self, ctx: &Context, id: &ScopedLockId) -> Result<(), ApiError> {
        self.client.delete(ctx, &id.to_string(), API_VERSION).await
    }
}
