use std::collections::HashSet;

use serde::Serialize;
use tracing::{debug, warn};

use super::port::KeyValueStore;
use super::PreferenceKind;
use crate::core::storage::StorageError;

/// What a mutation did, for whoever decides what to tell the reader.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct PreferenceChange {
    pub kind: PreferenceKind,
    pub id: String,
    /// Membership after the call.
    pub member: bool,
    pub changed: bool,
    /// False when the write failed, or when the stored set could not be read
    /// and the mutation was refused.
    pub persisted: bool,
}

/// One liked/saved id set, loaded once and written through on every change.
///
/// A set whose stored value could not be read stays unloaded: it is re-read
/// before the first mutation and never written over blind.
#[derive(Debug)]
pub struct PreferenceStore<S> {
    kind: PreferenceKind,
    store: S,
    ids: Vec<String>,
    loaded: bool,
    synced: bool,
}

impl<S: KeyValueStore> PreferenceStore<S> {
    pub async fn load(kind: PreferenceKind, store: S) -> Self {
        let mut preferences = Self {
            kind,
            store,
            ids: Vec::new(),
            loaded: false,
            synced: true,
        };
        preferences.read_stored().await;
        preferences
    }

    pub fn kind(&self) -> PreferenceKind {
        self.kind
    }

    pub fn contains(&self, id: &str) -> bool {
        let id = id.trim();
        self.ids.iter().any(|existing| existing == id)
    }

    /// False while the stored value is unreadable; mutations are refused then.
    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    /// False after a write failed, until a later write succeeds.
    pub fn is_synced(&self) -> bool {
        self.synced
    }

    /// Ids in the order they were first added.
    pub fn ids(&self) -> &[String] {
        &self.ids
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Ids are trimmed; a blank id is never stored and reports `changed = false`.
    pub async fn add(&mut self, id: &str) -> PreferenceChange {
        let id = id.trim();
        if !self.ensure_loaded().await {
            return self.refused(id);
        }
        if id.is_empty() || self.contains(id) {
            return self.unchanged(id);
        }
        self.ids.push(id.to_string());
        let persisted = self.persist().await;
        self.change(id, true, persisted)
    }

    pub async fn remove(&mut self, id: &str) -> PreferenceChange {
        let id = id.trim();
        if !self.ensure_loaded().await {
            return self.refused(id);
        }
        let before = self.ids.len();
        self.ids.retain(|existing| existing != id);
        if self.ids.len() == before {
            return self.unchanged(id);
        }
        let persisted = self.persist().await;
        self.change(id, false, persisted)
    }

    pub async fn toggle(&mut self, id: &str) -> PreferenceChange {
        if !self.ensure_loaded().await {
            return self.refused(id.trim());
        }
        if self.contains(id) {
            self.remove(id).await
        } else {
            self.add(id).await
        }
    }

    async fn ensure_loaded(&mut self) -> bool {
        self.loaded || self.read_stored().await
    }

    async fn read_stored(&mut self) -> bool {
        match self.store.get(self.kind.storage_key()).await {
            Ok(Some(raw)) => {
                self.ids = parse_ids(self.kind, &raw);
                self.loaded = true;
            }
            Ok(None) => {
                self.ids.clear();
                self.loaded = true;
            }
            Err(error) => {
                warn!(key = self.kind.storage_key(), %error, "failed to read preference set");
            }
        }
        self.loaded
    }

    async fn persist(&mut self) -> bool {
        let result = match serde_json::to_string(&self.ids) {
            Ok(serialized) => self.store.set(self.kind.storage_key(), &serialized).await,
            Err(error) => Err(StorageError::from(error)),
        };
        self.synced = match result {
            Ok(()) => true,
            Err(error) => {
                warn!(key = self.kind.storage_key(), %error, "failed to persist preference set");
                false
            }
        };
        self.synced
    }

    fn change(&self, id: &str, member: bool, persisted: bool) -> PreferenceChange {
        PreferenceChange {
            kind: self.kind,
            id: id.to_string(),
            member,
            changed: true,
            persisted,
        }
    }

    fn refused(&self, id: &str) -> PreferenceChange {
        PreferenceChange {
            kind: self.kind,
            id: id.to_string(),
            member: self.contains(id),
            changed: false,
            persisted: false,
        }
    }

    fn unchanged(&self, id: &str) -> PreferenceChange {
        PreferenceChange {
            kind: self.kind,
            id: id.to_string(),
            member: self.contains(id),
            changed: false,
            persisted: true,
        }
    }
}

fn parse_ids(kind: PreferenceKind, raw: &str) -> Vec<String> {
    match serde_json::from_str::<Vec<String>>(raw) {
        Ok(ids) => {
            let mut seen = HashSet::new();
            ids.into_iter()
                .map(|id| id.trim().to_string())
                .filter(|id| !id.is_empty() && seen.insert(id.clone()))
                .collect()
        }
        Err(error) => {
            warn!(key = kind.storage_key(), %error, "stored preference set is corrupt, resetting");
            debug!(raw, "discarded preference payload");
            Vec::new()
        }
    }
}
