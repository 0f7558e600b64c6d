use std::collections::BTreeSet;

use crate::db::{BlobStore, SUBSCRIBERS_KEY};
use crate::error::StoreError;
use crate::models::ChatId;

/// Chats that receive reminders and notices.
pub struct SubscriberRegistry {
    store: BlobStore,
    ids: BTreeSet<ChatId>,
}

impl SubscriberRegistry {
    pub fn load(store: BlobStore) -> Result<Self, StoreError> {
        let ids: BTreeSet<ChatId> = store.load(SUBSCRIBERS_KEY)?;
        tracing::info!(subscribers = ids.len(), "subscriber registry loaded");
        Ok(Self { store, ids })
    }

    fn commit(&mut self, ids: BTreeSet<ChatId>) -> Result<(), StoreError> {
        self.store.save(SUBSCRIBERS_KEY, &ids)?;
        self.ids = ids;
        Ok(())
    }

    /// Returns `true` on first registration. Known ids do not touch the blob.
    pub fn register(&mut self, id: ChatId) -> Result<bool, StoreError> {
        if self.ids.contains(&id) {
            return Ok(false);
        }
        let mut ids = self.ids.clone();
        ids.insert(id);
        self.commit(ids)?;
        tracing::info!(chat_id = id, "subscriber registered");
        Ok(true)
    }

    pub fn unregister(&mut self, id: ChatId) -> Result<bool, StoreError> {
        if !self.ids.contains(&id) {
            return Ok(false);
        }
        let mut ids = self.ids.clone();
        ids.remove(&id);
        self.commit(ids)?;
        tracing::info!(chat_id = id, "subscriber removed");
        Ok(true)
    }

    pub fn remap(&mut self, old: ChatId, new: ChatId) -> Result<bool, StoreError> {
        if !self.ids.contains(&old) {
            return Ok(false);
        }
        let mut ids = self.ids.clone();
        ids.remove(&old);
        ids.insert(new);
        self.commit(ids)?;
        tracing::info!(from = old, to = new, "subscriber remapped");
        Ok(true)
    }

    pub fn contains(&self, id: ChatId) -> bool {
        self.ids.contains(&id)
    }

    pub fn all(&self) -> Vec<ChatId> {
        self.ids.iter().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}
