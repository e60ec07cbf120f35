//! Operations on arbitrary resource IDs

use super::{ApiError, Client};
use tfplug::Context;

pub struct ResourcesApi<'a> {
    client: &'a Client,
}

impl<'a> ResourcesApi<'a> {
    pub fn new(client: &'a Client) -> Self {
        Self { client }
    }

    /// Deletes any resource, given an API version its provider accepts
    pub async fn delete_by_id(
        &self,
        ctx: &Context,
        id: &str,
        api_version: &str,
    ) -> Result<(), ApiError> {
        tracing::debug!("Deleting {} (api-version {})", id, api_version);
        self.client.delete(ctx, id, api_version).await
    }
}
