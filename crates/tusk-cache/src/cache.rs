// SPDX-FileCopyrightText: 2026 Tusk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Read-through entity cache.
//!
//! Invalidation cascades: dropping an account also drops its conversation
//! list. A load that races an invalidation is not written back, so a stale
//! row can never overwrite an eviction.

use std::hash::Hash;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use dashmap::DashMap;
use tracing::{debug, trace};

use tusk_config::model::CacheConfig;
use tusk_core::{
    Account, AccountId, AdapterType, Conversation, HealthStatus, PluginAdapter, Status, StatusId,
    StorageAdapter, TuskError,
};

pub struct EntityCache {
    max_entries: usize,
    /// Bumped on every invalidation.
    epoch: AtomicU64,
    accounts: DashMap<AccountId, Account>,
    statuses: DashMap<StatusId, Status>,
    conversations: DashMap<AccountId, Vec<Conversation>>,
}

impl EntityCache {
    pub fn new(config: &CacheConfig) -> Self {
        Self {
            max_entries: config.max_entries.max(1),
            epoch: AtomicU64::new(0),
            accounts: DashMap::new(),
            statuses: DashMap::new(),
            conversations: DashMap::new(),
        }
    }

    fn epoch(&self) -> u64 {
        self.epoch.load(Ordering::Acquire)
    }

    fn bump(&self) {
        self.epoch.fetch_add(1, Ordering::AcqRel);
    }

    fn store<K, V>(&self, map: &DashMap<K, V>, loaded_at: u64, key: K, value: V)
    where
        K: Eq + Hash + Clone,
    {
        if self.epoch() != loaded_at {
            trace!("invalidated during load, not caching");
            return;
        }
        if map.len() >= self.max_entries && !map.contains_key(&key) {
            let victim = map.iter().next().map(|entry| entry.key().clone());
            if let Some(victim) = victim {
                map.remove(&victim);
            }
        }
        map.insert(key, value);
    }

    pub async fn account(
        &self,
        storage: &dyn StorageAdapter,
        id: &AccountId,
    ) -> Result<Option<Account>, TuskError> {
        if let Some(hit) = self.accounts.get(id) {
            return Ok(Some(hit.clone()));
        }
        let loaded_at = self.epoch();
        let account = storage.get_account(id).await?;
        if let Some(account) = &account {
            self.store(&self.accounts, loaded_at, id.clone(), account.clone());
        }
        Ok(account)
    }

    pub async fn status(
        &self,
        storage: &dyn StorageAdapter,
        id: &StatusId,
    ) -> Result<Option<Status>, TuskError> {
        if let Some(hit) = self.statuses.get(id) {
            return Ok(Some(hit.clone()));
        }
        let loaded_at = self.epoch();
        let status = storage.get_status(id).await?;
        if let Some(status) = &status {
            self.store(&self.statuses, loaded_at, id.clone(), status.clone());
        }
        Ok(status)
    }

    /// `owner`'s conversations, most recently active first.
    pub async fn conversations(
        &self,
        storage: &dyn StorageAdapter,
        owner: &AccountId,
    ) -> Result<Vec<Conversation>, TuskError> {
        if let Some(hit) = self.conversations.get(owner) {
            return Ok(hit.clone());
        }
        let loaded_at = self.epoch();
        let conversations = storage.conversations_for(owner).await?;
        self.store(&self.conversations, loaded_at, owner.clone(), conversations.clone());
        Ok(conversations)
    }

    /// Drop an account and everything cached on its behalf.
    pub fn invalidate_account(&self, id: &AccountId) {
        self.bump();
        self.accounts.remove(id);
        self.conversations.remove(id);
        debug!(account_id = %id, "account invalidated");
    }

    pub fn invalidate_status(&self, id: &StatusId) {
        self.bump();
        self.statuses.remove(id);
        debug!(status_id = %id, "status invalidated");
    }

    pub fn invalidate_conversations(&self, owner: &AccountId) {
        self.bump();
        self.conversations.remove(owner);
        debug!(account_id = %owner, "conversation list invalidated");
    }

    pub fn clear(&self) {
        self.bump();
        self.accounts.clear();
        self.statuses.clear();
        self.conversations.clear();
    }

    /// Cached entries across all kinds.
    pub fn len(&self) -> usize {
        self.accounts.len() + self.statuses.len() + self.conversations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl PluginAdapter for EntityCache {
    fn name(&self) -> &str {
        "entity-cache"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Cache
    }

    async fn health_check(&self) -> Result<HealthStatus, TuskError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), TuskError> {
        self.clear();
        Ok(())
    }
}
