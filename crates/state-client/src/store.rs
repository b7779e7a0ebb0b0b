//! The operations the engine needs from the remote store.

use crate::error::StateStoreError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use gramflow_core_types::{ProfileId, ProfileRecord, ProfileStatus, TargetAccount, TargetStatus};

/// Remote profile/account state, as seen by the runner.
///
/// All operations are network-backed. Callers catch and degrade: "can't
/// confirm the profile is busy" may be treated as "assume not busy" in
/// non-critical paths, while "can't fetch the profile" is a hard skip.
#[async_trait]
pub trait StateStore: Send + Sync {
    async fn get_profile_by_name(
        &self,
        name: &str,
    ) -> Result<Option<ProfileRecord>, StateStoreError>;

    async fn is_profile_busy(&self, name: &str) -> Result<bool, StateStoreError>;

    /// Flip the status/busy pair. Read-check-then-write, not a lease: two
    /// runners racing on the same profile can both get through.
    async fn sync_profile_status(
        &self,
        name: &str,
        status: ProfileStatus,
        using: bool,
    ) -> Result<(), StateStoreError>;

    /// Bump the daily session counter, returning the new value.
    async fn increment_sessions_today(
        &self,
        profile_id: &ProfileId,
    ) -> Result<u32, StateStoreError>;

    async fn get_accounts_for_profile(
        &self,
        profile_id: &ProfileId,
        status: Option<TargetStatus>,
    ) -> Result<Vec<TargetAccount>, StateStoreError>;

    async fn get_accounts_to_message(
        &self,
        profile_id: &ProfileId,
    ) -> Result<Vec<TargetAccount>, StateStoreError>;

    async fn update_account_status(
        &self,
        account_id: &str,
        status: TargetStatus,
        assigned_to: Option<&ProfileId>,
    ) -> Result<(), StateStoreError>;

    async fn get_last_message_sent_at(
        &self,
        target_id: &str,
    ) -> Result<Option<DateTime<Utc>>, StateStoreError>;

    async fn set_last_message_sent_now(&self, target_id: &str) -> Result<(), StateStoreError>;
}
