//! In-memory store for tests and dry runs.

use crate::error::StateStoreError;
use crate::store::StateStore;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use gramflow_core_types::{ProfileId, ProfileRecord, ProfileStatus, TargetAccount, TargetStatus};
use parking_lot::Mutex;
use std::collections::HashMap;

#[derive(Default)]
struct Inner {
    profiles: HashMap<String, ProfileRecord>,
    targets: HashMap<String, Vec<TargetAccount>>,
    last_messages: HashMap<String, DateTime<Utc>>,
    status_updates: Vec<(String, ProfileStatus, bool)>,
    fail_get_profile: bool,
    fail_busy_check: bool,
}

/// [`StateStore`] backed by process memory. Mirrors the remote semantics
/// the engine relies on: `sync_profile_status` to running stamps
/// `last_opened_at`, increments are visible to later reads.
#[derive(Default)]
pub struct InMemoryStateStore {
    inner: Mutex<Inner>,
}

impl InMemoryStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_profile(&self, record: ProfileRecord) {
        self.inner
            .lock()
            .profiles
            .insert(record.name.clone(), record);
    }

    pub fn assign_targets(&self, profile_id: &ProfileId, targets: Vec<TargetAccount>) {
        self.inner.lock().targets.insert(profile_id.0.clone(), targets);
    }

    pub fn set_last_message(&self, target_id: &str, at: DateTime<Utc>) {
        self.inner
            .lock()
            .last_messages
            .insert(target_id.to_string(), at);
    }

    /// Make profile lookups fail, for exercising degraded paths.
    pub fn fail_get_profile(&self, fail: bool) {
        self.inner.lock().fail_get_profile = fail;
    }

    /// Make busy checks fail while lookups still work.
    pub fn fail_busy_check(&self, fail: bool) {
        self.inner.lock().fail_busy_check = fail;
    }

    /// Snapshot of a profile as the store sees it now.
    pub fn profile(&self, name: &str) -> Option<ProfileRecord> {
        self.inner.lock().profiles.get(name).cloned()
    }

    /// Every `sync_profile_status` call, in order.
    pub fn status_updates(&self) -> Vec<(String, ProfileStatus, bool)> {
        self.inner.lock().status_updates.clone()
    }

    /// `sync_profile_status` calls that set the profile idle.
    pub fn idle_updates_for(&self, name: &str) -> usize {
        self.inner
            .lock()
            .status_updates
            .iter()
            .filter(|(n, status, using)| n == name && *status == ProfileStatus::Idle && !using)
            .count()
    }
}

#[async_trait]
impl StateStore for InMemoryStateStore {
    async fn get_profile_by_name(
        &self,
        name: &str,
    ) -> Result<Option<ProfileRecord>, StateStoreError> {
        let inner = self.inner.lock();
        if inner.fail_get_profile {
            return Err(StateStoreError::Unavailable("injected failure".into()));
        }
        Ok(inner.profiles.get(name).cloned())
    }

    async fn is_profile_busy(&self, name: &str) -> Result<bool, StateStoreError> {
        let inner = self.inner.lock();
        if inner.fail_busy_check {
            return Err(StateStoreError::Unavailable("injected failure".into()));
        }
        Ok(inner
            .profiles
            .get(name)
            .map(|p| p.is_busy())
            .unwrap_or(false))
    }

    async fn sync_profile_status(
        &self,
        name: &str,
        status: ProfileStatus,
        using: bool,
    ) -> Result<(), StateStoreError> {
        let mut inner = self.inner.lock();
        inner
            .status_updates
            .push((name.to_string(), status, using));
        if let Some(profile) = inner.profiles.get_mut(name) {
            profile.status = status;
            profile.using = using;
            if status == ProfileStatus::Running {
                profile.last_opened_at = Some(Utc::now());
            }
        }
        Ok(())
    }

    async fn increment_sessions_today(
        &self,
        profile_id: &ProfileId,
    ) -> Result<u32, StateStoreError> {
        let mut inner = self.inner.lock();
        let profile = inner
            .profiles
            .values_mut()
            .find(|p| p.profile_id == *profile_id)
            .ok_or(StateStoreError::Status { code: 404 })?;
        profile.sessions_today += 1;
        Ok(profile.sessions_today)
    }

    async fn get_accounts_for_profile(
        &self,
        profile_id: &ProfileId,
        status: Option<TargetStatus>,
    ) -> Result<Vec<TargetAccount>, StateStoreError> {
        let inner = self.inner.lock();
        let targets = inner
            .targets
            .get(&profile_id.0)
            .cloned()
            .unwrap_or_default();
        Ok(match status {
            Some(status) => targets.into_iter().filter(|t| t.status == status).collect(),
            None => targets,
        })
    }

    async fn get_accounts_to_message(
        &self,
        profile_id: &ProfileId,
    ) -> Result<Vec<TargetAccount>, StateStoreError> {
        let inner = self.inner.lock();
        Ok(inner
            .targets
            .get(&profile_id.0)
            .cloned()
            .unwrap_or_default()
            .into_iter()
            .filter(|t| t.status != TargetStatus::Done && t.status != TargetStatus::Failed)
            .collect())
    }

    async fn update_account_status(
        &self,
        account_id: &str,
        status: TargetStatus,
        _assigned_to: Option<&ProfileId>,
    ) -> Result<(), StateStoreError> {
        let mut inner = self.inner.lock();
        for targets in inner.targets.values_mut() {
            if let Some(target) = targets.iter_mut().find(|t| t.id == account_id) {
                target.status = status;
            }
        }
        Ok(())
    }

    async fn get_last_message_sent_at(
        &self,
        target_id: &str,
    ) -> Result<Option<DateTime<Utc>>, StateStoreError> {
        Ok(self.inner.lock().last_messages.get(target_id).copied())
    }

    async fn set_last_message_sent_now(&self, target_id: &str) -> Result<(), StateStoreError> {
        self.inner
            .lock()
            .last_messages
            .insert(target_id.to_string(), Utc::now());
        Ok(())
    }
}
