use std::collections::{HashMap, VecDeque};
use std::hash::{BuildHasher, RandomState};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::{RwLock, broadcast};
use tokio::time::Instant;

use crate::code;
use crate::error::StoreError;

/// Reserved key written and read back by [`Store::probe`]. Mirrors the
/// health-check round-trip the HTTP layer performs before reporting the
/// store as connected.
const PROBE_KEY: &str = "health-check";
const PROBE_TTL: Duration = Duration::from_secs(5);

#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Shared deadline for a clip's content and metadata. Default 24 hours.
    pub entry_ttl: Duration,
    /// Sliding deadline for a client's whole history list, reset on every
    /// append. Default 30 days.
    pub history_ttl: Duration,
    /// Sliding deadline for one presence record, refreshed on every
    /// announcement. Default 1 hour.
    pub presence_ttl: Duration,
    /// Maximum codes kept per client history; oldest are trimmed on append.
    pub history_cap: usize,
    /// Number of lock shards per table.
    pub shards: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            entry_ttl: Duration::from_secs(24 * 3600),
            history_ttl: Duration::from_secs(30 * 24 * 3600),
            presence_ttl: Duration::from_secs(3600),
            history_cap: 100,
            shards: 16,
        }
    }
}

/// Point-in-time view of one clip, taken under the entry's shard lock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClipSnapshot {
    pub content: String,
    pub retrieval_count: u64,
    pub created_at: DateTime<Utc>,
    pub owner_id: Option<String>,
}

/// Raw store-level mutation, published on every content write regardless
/// of which command produced it. Consumers treat the feed as best-effort;
/// lagging receivers drop records.
#[derive(Debug, Clone)]
pub enum Mutation {
    ContentWritten { code: String },
}

struct EntryRecord {
    content: String,
    retrieval_count: u64,
    created_at: DateTime<Utc>,
    owner_id: Option<String>,
    expires_at: Instant,
}

impl EntryRecord {
    fn expired(&self, now: Instant) -> bool {
        self.expires_at <= now
    }

    fn snapshot(&self) -> ClipSnapshot {
        ClipSnapshot {
            content: self.content.clone(),
            retrieval_count: self.retrieval_count,
            created_at: self.created_at,
            owner_id: self.owner_id.clone(),
        }
    }
}

struct HistoryRecord {
    codes: VecDeque<String>,
    expires_at: Instant,
}

/// Expiring clip store: entries, per-client history lists, and per-clip
/// presence records, all lazily expired.
///
/// Each table is sharded by key hash so operations on different codes never
/// serialize on each other; operations on the same code serialize on one
/// shard lock, which is what makes the retrieval-count increment atomic and
/// lets an update carry the stored deadline forward without a read-then-write
/// race. Locks are never held across an await point.
#[derive(Clone)]
pub struct Store {
    inner: Arc<StoreInner>,
}

struct StoreInner {
    config: StoreConfig,
    entries: Vec<RwLock<HashMap<String, EntryRecord>>>,
    histories: Vec<RwLock<HashMap<String, HistoryRecord>>>,
    presence: Vec<RwLock<HashMap<String, HashMap<String, Instant>>>>,
    mutations: broadcast::Sender<Mutation>,
    hasher: RandomState,
}

impl Store {
    pub fn new(config: StoreConfig) -> Self {
        let shards = config.shards.max(1);
        let (mutations, _) = broadcast::channel(256);
        Self {
            inner: Arc::new(StoreInner {
                config: StoreConfig { shards, ..config },
                entries: (0..shards).map(|_| RwLock::new(HashMap::new())).collect(),
                histories: (0..shards).map(|_| RwLock::new(HashMap::new())).collect(),
                presence: (0..shards).map(|_| RwLock::new(HashMap::new())).collect(),
                mutations,
                hasher: RandomState::new(),
            }),
        }
    }

    pub fn config(&self) -> &StoreConfig {
        &self.inner.config
    }

    /// Subscribe to the raw mutation feed.
    pub fn mutations(&self) -> broadcast::Receiver<Mutation> {
        self.inner.mutations.subscribe()
    }

    fn shard_for(&self, key: &str) -> usize {
        (self.inner.hasher.hash_one(key) as usize) % self.inner.config.shards
    }

    fn publish(&self, code: &str) {
        let _ = self.inner.mutations.send(Mutation::ContentWritten {
            code: code.to_string(),
        });
    }

    // -- Entries --

    /// Store new content under a fresh code and return it. When an owner is
    /// supplied it is registered with the same deadline as the content.
    ///
    /// An existing live entry is never overwritten: on the (negligible)
    /// chance of a code collision a new code is drawn and the insert retried.
    pub async fn create(
        &self,
        content: &str,
        owner_id: Option<&str>,
    ) -> Result<String, StoreError> {
        if content.is_empty() {
            return Err(StoreError::EmptyContent);
        }

        loop {
            let candidate = code::generate(code::CODE_LEN);
            let now = Instant::now();
            let mut entries = self.inner.entries[self.shard_for(&candidate)].write().await;
            if entries
                .get(&candidate)
                .is_some_and(|existing| !existing.expired(now))
            {
                continue;
            }
            entries.insert(
                candidate.clone(),
                EntryRecord {
                    content: content.to_string(),
                    retrieval_count: 0,
                    created_at: Utc::now(),
                    owner_id: owner_id.map(str::to_string),
                    expires_at: now + self.inner.config.entry_ttl,
                },
            );
            drop(entries);
            self.publish(&candidate);
            return Ok(candidate);
        }
    }

    /// Fetch a clip, atomically incrementing its retrieval count. The
    /// returned snapshot carries the post-increment value. Expired entries
    /// behave exactly like entries that were never created.
    pub async fn get(&self, code: &str) -> Result<ClipSnapshot, StoreError> {
        let now = Instant::now();
        let mut entries = self.inner.entries[self.shard_for(code)].write().await;
        if entries.get(code).is_some_and(|record| record.expired(now)) {
            entries.remove(code);
        }
        match entries.get_mut(code) {
            None => Err(StoreError::NotFound),
            Some(record) => {
                record.retrieval_count += 1;
                Ok(record.snapshot())
            }
        }
    }

    /// Read a clip without counting the read. Used by history resolution.
    pub async fn peek(&self, code: &str) -> Option<ClipSnapshot> {
        let now = Instant::now();
        let entries = self.inner.entries[self.shard_for(code)].read().await;
        entries
            .get(code)
            .filter(|record| !record.expired(now))
            .map(EntryRecord::snapshot)
    }

    /// Replace a clip's content. Only the registered owner may update; a
    /// clip with no owner has no edit rights at all.
    ///
    /// The stored deadline is left untouched, so the remaining time-to-live
    /// carries forward instead of resetting to the default. Count, creation
    /// time, and owner are preserved.
    pub async fn update(
        &self,
        code: &str,
        content: &str,
        requester_id: &str,
    ) -> Result<(), StoreError> {
        if content.is_empty() {
            return Err(StoreError::EmptyContent);
        }

        let now = Instant::now();
        let mut entries = self.inner.entries[self.shard_for(code)].write().await;
        if entries.get(code).is_some_and(|record| record.expired(now)) {
            entries.remove(code);
        }
        let Some(record) = entries.get_mut(code) else {
            return Err(StoreError::NotFound);
        };
        match record.owner_id.as_deref() {
            Some(owner) if owner == requester_id => {}
            _ => return Err(StoreError::Forbidden),
        }
        record.content = content.to_string();
        drop(entries);
        self.publish(code);
        Ok(())
    }

    // -- History --

    /// Prepend a code to a client's history. The whole list's deadline
    /// slides forward to the full history TTL, and the list is trimmed to
    /// the configured cap from the tail.
    pub async fn append_history(&self, client_id: &str, code: &str) {
        let now = Instant::now();
        let mut histories = self.inner.histories[self.shard_for(client_id)].write().await;
        let record = histories
            .entry(client_id.to_string())
            .or_insert_with(|| HistoryRecord {
                codes: VecDeque::new(),
                expires_at: now,
            });
        if record.expires_at <= now {
            record.codes.clear();
        }
        record.codes.push_front(code.to_string());
        record.codes.truncate(self.inner.config.history_cap);
        record.expires_at = now + self.inner.config.history_ttl;
    }

    /// Codes this client has created, most recent first. The references are
    /// weak: entries may have expired since, and callers filter those out
    /// at resolution time.
    pub async fn list_history(&self, client_id: &str) -> Vec<String> {
        let now = Instant::now();
        let histories = self.inner.histories[self.shard_for(client_id)].read().await;
        match histories.get(client_id) {
            Some(record) if record.expires_at > now => record.codes.iter().cloned().collect(),
            _ => Vec::new(),
        }
    }

    // -- Presence --

    /// Record a client as an active viewer of a clip, refreshing its
    /// presence deadline, and return the distinct count of live viewers.
    pub async fn announce(&self, code: &str, client_id: &str) -> usize {
        let now = Instant::now();
        let mut presence = self.inner.presence[self.shard_for(code)].write().await;
        let viewers = presence.entry(code.to_string()).or_default();
        viewers.retain(|_, deadline| *deadline > now);
        viewers.insert(client_id.to_string(), now + self.inner.config.presence_ttl);
        viewers.len()
    }

    /// Distinct live viewers of a clip.
    pub async fn viewer_count(&self, code: &str) -> usize {
        let now = Instant::now();
        let presence = self.inner.presence[self.shard_for(code)].read().await;
        presence
            .get(code)
            .map(|viewers| viewers.values().filter(|deadline| **deadline > now).count())
            .unwrap_or(0)
    }

    // -- Availability --

    /// Round-trip a short-lived record through the entry table. Returns
    /// false if the written value does not read back — the in-process
    /// equivalent of the external store's connectivity check.
    pub async fn probe(&self) -> bool {
        let now = Instant::now();
        let shard = self.shard_for(PROBE_KEY);
        {
            let mut entries = self.inner.entries[shard].write().await;
            entries.insert(
                PROBE_KEY.to_string(),
                EntryRecord {
                    content: "ok".to_string(),
                    retrieval_count: 0,
                    created_at: Utc::now(),
                    owner_id: None,
                    expires_at: now + PROBE_TTL,
                },
            );
        }
        let entries = self.inner.entries[shard].read().await;
        entries
            .get(PROBE_KEY)
            .is_some_and(|record| record.content == "ok" && !record.expired(now))
    }

    // -- Expiry --

    /// Drop every expired entry, history list, and presence record. Reads
    /// already treat expired records as absent; this pass reclaims the
    /// memory of records nobody touches again. Returns how many were pruned.
    pub async fn sweep(&self) -> usize {
        let mut pruned = 0;

        for shard in &self.inner.entries {
            let now = Instant::now();
            let mut entries = shard.write().await;
            let before = entries.len();
            entries.retain(|_, record| !record.expired(now));
            pruned += before - entries.len();
        }

        for shard in &self.inner.histories {
            let now = Instant::now();
            let mut histories = shard.write().await;
            let before = histories.len();
            histories.retain(|_, record| record.expires_at > now);
            pruned += before - histories.len();
        }

        for shard in &self.inner.presence {
            let now = Instant::now();
            let mut presence = shard.write().await;
            for viewers in presence.values_mut() {
                let before = viewers.len();
                viewers.retain(|_, deadline| *deadline > now);
                pruned += before - viewers.len();
            }
            presence.retain(|_, viewers| !viewers.is_empty());
        }

        pruned
    }
}
