//! REST implementation of [`StateStore`].

use crate::error::StateStoreError;
use crate::http::ResilientHttpClient;
use crate::store::StateStore;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use gramflow_core_types::{ProfileId, ProfileRecord, ProfileStatus, TargetAccount, TargetStatus};
use serde::Deserialize;
use serde_json::{json, Value};

#[derive(Deserialize)]
struct SessionsTodayBody {
    sessions_today: u32,
}

#[derive(Deserialize)]
struct LastMessageBody {
    #[serde(default)]
    last_message_sent_at: Option<DateTime<Utc>>,
}

/// Typed REST surface over the resilient HTTP core.
pub struct HttpStateStore {
    client: ResilientHttpClient,
}

impl HttpStateStore {
    pub fn new(client: ResilientHttpClient) -> Self {
        Self { client }
    }

    fn decode<T: serde::de::DeserializeOwned>(value: Value) -> Result<T, StateStoreError> {
        serde_json::from_value(value).map_err(|err| StateStoreError::Decode(err.to_string()))
    }
}

#[async_trait]
impl StateStore for HttpStateStore {
    async fn get_profile_by_name(
        &self,
        name: &str,
    ) -> Result<Option<ProfileRecord>, StateStoreError> {
        match self.client.get(&format!("profiles/by-name/{name}")).await {
            Ok(value) => Ok(Some(Self::decode(value)?)),
            Err(err) if err.is_not_found() => Ok(None),
            Err(err) => Err(err),
        }
    }

    async fn is_profile_busy(&self, name: &str) -> Result<bool, StateStoreError> {
        let profile = self.get_profile_by_name(name).await?;
        Ok(profile.map(|p| p.is_busy()).unwrap_or(false))
    }

    async fn sync_profile_status(
        &self,
        name: &str,
        status: ProfileStatus,
        using: bool,
    ) -> Result<(), StateStoreError> {
        self.client
            .patch(
                &format!("profiles/by-name/{name}/status"),
                json!({ "status": status, "using": using }),
            )
            .await?;
        Ok(())
    }

    async fn increment_sessions_today(
        &self,
        profile_id: &ProfileId,
    ) -> Result<u32, StateStoreError> {
        let value = self
            .client
            .post(
                &format!("profiles/{profile_id}/sessions-today/increment"),
                json!({}),
            )
            .await?;
        let body: SessionsTodayBody = Self::decode(value)?;
        Ok(body.sessions_today)
    }

    async fn get_accounts_for_profile(
        &self,
        profile_id: &ProfileId,
        status: Option<TargetStatus>,
    ) -> Result<Vec<TargetAccount>, StateStoreError> {
        let path = match status {
            Some(status) => format!("profiles/{profile_id}/accounts?status={}", status.as_str()),
            None => format!("profiles/{profile_id}/accounts"),
        };
        Self::decode(self.client.get(&path).await?)
    }

    async fn get_accounts_to_message(
        &self,
        profile_id: &ProfileId,
    ) -> Result<Vec<TargetAccount>, StateStoreError> {
        Self::decode(
            self.client
                .get(&format!("profiles/{profile_id}/accounts/to-message"))
                .await?,
        )
    }

    async fn update_account_status(
        &self,
        account_id: &str,
        status: TargetStatus,
        assigned_to: Option<&ProfileId>,
    ) -> Result<(), StateStoreError> {
        self.client
            .patch(
                &format!("accounts/{account_id}/status"),
                json!({ "status": status, "assigned_to": assigned_to }),
            )
            .await?;
        Ok(())
    }

    async fn get_last_message_sent_at(
        &self,
        target_id: &str,
    ) -> Result<Option<DateTime<Utc>>, StateStoreError> {
        match self
            .client
            .get(&format!("accounts/{target_id}/last-message"))
            .await
        {
            Ok(value) => {
                let body: LastMessageBody = Self::decode(value)?;
                Ok(body.last_message_sent_at)
            }
            Err(err) if err.is_not_found() => Ok(None),
            Err(err) => Err(err),
        }
    }

    async fn set_last_message_sent_now(&self, target_id: &str) -> Result<(), StateStoreError> {
        self.client
            .post(&format!("accounts/{target_id}/last-message"), json!({}))
            .await?;
        Ok(())
    }
}
