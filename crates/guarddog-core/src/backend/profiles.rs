use async_trait::async_trait;

use super::client::{eq, PREFER_REPRESENTATION};
use super::{BackendClient, BackendError};
use crate::auth::ProfileStore;
use crate::models::{NewProfile, Profile, ProfileUpdate};

const PROFILES_TABLE: &str = "profiles";

/// `ProfileStore` over the hosted `profiles` table.
#[derive(Clone)]
pub struct RestProfileStore {
    client: BackendClient,
}

impl RestProfileStore {
    pub fn new(client: BackendClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ProfileStore for RestProfileStore {
    async fn fetch_by_user_id(&self, user_id: &str) -> Result<Option<Profile>, BackendError> {
        let url = self.client.rest_url(PROFILES_TABLE);
        let rows: Vec<Profile> = self
            .client
            .get(
                &url,
                &[
                    ("select", "*".to_string()),
                    ("user_id", eq(user_id)),
                    ("limit", "1".to_string()),
                ],
            )
            .await?;
        Ok(rows.into_iter().next())
    }

    async fn insert(&self, profile: &NewProfile) -> Result<Profile, BackendError> {
        let url = self.client.rest_url(PROFILES_TABLE);
        let rows: Vec<Profile> = self
            .client
            .post(&url, &[], profile, Some(PREFER_REPRESENTATION))
            .await?;
        rows.into_iter()
            .next()
            .ok_or_else(|| BackendError::InvalidResponse("Insert returned no profile row".to_string()))
    }

    async fn update(&self, profile_id: &str, update: &ProfileUpdate) -> Result<(), BackendError> {
        let url = self.client.rest_url(PROFILES_TABLE);
        self.client.patch(&url, &[("id", eq(profile_id))], update).await
    }
}
