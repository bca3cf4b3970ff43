use crate::ports::store::{Page, StoreError, SubscriptionStore};
use crate::types::push::{PushSubscription, StoredSubscription, SubscriptionId};

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::ops::Bound;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct Snapshot {
    next_id: u64,
    subscriptions: Vec<StoredSubscription>,
}

#[derive(Debug, Clone, Default)]
struct Records {
    next_id: u64,
    by_id: BTreeMap<SubscriptionId, StoredSubscription>,
    by_endpoint: HashMap<String, SubscriptionId>,
}

impl Records {
    fn from_snapshot(snapshot: Snapshot) -> Self {
        let mut records = Records {
            next_id: snapshot.next_id,
            ..Default::default()
        };
        for stored in snapshot.subscriptions {
            if records
                .by_endpoint
                .contains_key(&stored.subscription.endpoint)
            {
                tracing::warn!(
                    endpoint = %stored.subscription.endpoint,
                    "dropping duplicate subscription from snapshot"
                );
                continue;
            }
            records.next_id = records.next_id.max(stored.id.0 + 1);
            records
                .by_endpoint
                .insert(stored.subscription.endpoint.clone(), stored.id);
            records.by_id.insert(stored.id, stored);
        }
        records
    }

    fn snapshot(&self) -> Snapshot {
        Snapshot {
            next_id: self.next_id,
            subscriptions: self.by_id.values().cloned().collect(),
        }
    }
}

/// In-memory subscription store, optionally persisted to a JSON file after
/// every mutation.
#[derive(Debug, Default)]
pub struct MemorySubscriptionStore {
    records: Mutex<Records>,
    path: Option<PathBuf>,
}

impl MemorySubscriptionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Opens the store backed by `path`. A missing file starts empty.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        let records = match std::fs::read(path) {
            Ok(bytes) => Records::from_snapshot(serde_json::from_slice(&bytes)?),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Records::default(),
            Err(err) => return Err(err.into()),
        };
        tracing::info!(
            path = %path.display(),
            subscriptions = records.by_id.len(),
            "opened subscription store"
        );
        Ok(Self {
            records: Mutex::new(records),
            path: Some(path.to_path_buf()),
        })
    }

    fn persist(&self, records: &Records) -> Result<(), StoreError> {
        let Some(path) = self.path.as_ref() else {
            return Ok(());
        };
        let bytes = serde_json::to_vec_pretty(&records.snapshot())?;
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, bytes)?;
        std::fs::rename(&tmp, path)?;
        Ok(())
    }

    /// Applies `change` and persists the result, restoring the previous
    /// records when the write fails.
    fn mutate<T>(&self, change: impl FnOnce(&mut Records) -> (T, bool)) -> Result<T, StoreError> {
        let mut guard = self.records.lock().expect("subscription store lock");
        let previous = self.path.is_some().then(|| guard.clone());
        let (value, changed) = change(&mut guard);
        if changed && let Err(err) = self.persist(&guard) {
            if let Some(previous) = previous {
                *guard = previous;
            }
            return Err(err);
        }
        Ok(value)
    }
}

impl SubscriptionStore for MemorySubscriptionStore {
    fn upsert(&self, subscription: &PushSubscription) -> Result<SubscriptionId, StoreError> {
        self.mutate(|records| {
            if let Some(id) = records.by_endpoint.get(&subscription.endpoint) {
                return (*id, false);
            }
            let id = SubscriptionId(records.next_id);
            records.next_id += 1;
            records
                .by_endpoint
                .insert(subscription.endpoint.clone(), id);
            records.by_id.insert(
                id,
                StoredSubscription {
                    id,
                    subscription: subscription.clone(),
                },
            );
            (id, true)
        })
    }

    fn find_by_endpoint(&self, endpoint: &str) -> Result<Option<StoredSubscription>, StoreError> {
        let records = self.records.lock().expect("subscription store lock");
        Ok(records
            .by_endpoint
            .get(endpoint)
            .and_then(|id| records.by_id.get(id))
            .cloned())
    }

    fn delete_by_endpoint(&self, endpoint: &str) -> Result<bool, StoreError> {
        self.mutate(|records| match records.by_endpoint.remove(endpoint) {
            Some(id) => {
                records.by_id.remove(&id);
                (true, true)
            }
            None => (false, false),
        })
    }

    fn count(&self) -> Result<usize, StoreError> {
        Ok(self.records.lock().expect("subscription store lock").by_id.len())
    }

    fn list_page(&self, cursor: Option<&str>, page_size: usize) -> Result<Page, StoreError> {
        if page_size == 0 {
            return Err(StoreError::InvalidPageSize);
        }
        let after = cursor.map(parse_cursor).transpose()?;

        let records = self.records.lock().expect("subscription store lock");
        let lower = match after {
            Some(after) => Bound::Excluded(after),
            None => Bound::Unbounded,
        };
        let mut remaining = records
            .by_id
            .range((lower, Bound::Unbounded))
            .map(|(_, stored)| stored);

        let items: Vec<StoredSubscription> =
            remaining.by_ref().take(page_size).cloned().collect();
        let is_done = remaining.next().is_none();
        let next_cursor = items
            .last()
            .map(|stored| stored.id.to_string())
            .or_else(|| cursor.map(str::to_string));

        Ok(Page {
            items,
            next_cursor,
            is_done,
        })
    }
}

fn parse_cursor(cursor: &str) -> Result<SubscriptionId, StoreError> {
    cursor
        .parse()
        .map(SubscriptionId)
        .map_err(|_| StoreError::InvalidCursor(cursor.to_string()))
}
