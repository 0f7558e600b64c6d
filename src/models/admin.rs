use serde::{Deserialize, Serialize};

use crate::db::{ADMINS_KEY, BlobStore};
use crate::error::{AdminError, StoreError};
use crate::models::ChatId;

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Admin {
    pub name: String,
    pub chat_id: ChatId,
}

/// Chats allowed to run gated commands. Curated by hand, never pruned automatically.
pub struct AdminRegistry {
    store: BlobStore,
    admins: Vec<Admin>,
}

impl AdminRegistry {
    pub fn load(store: BlobStore) -> Result<Self, StoreError> {
        let admins: Vec<Admin> = store.load(ADMINS_KEY)?;
        tracing::info!(admins = admins.len(), "admin registry loaded");
        Ok(Self { store, admins })
    }

    fn commit(&mut self, admins: Vec<Admin>) -> Result<(), StoreError> {
        self.store.save(ADMINS_KEY, &admins)?;
        self.admins = admins;
        Ok(())
    }

    pub fn is_admin(&self, id: ChatId) -> bool {
        self.admins.iter().any(|admin| admin.chat_id == id)
    }

    /// Returns `false` when the chat is already an admin.
    pub fn register(&mut self, name: &str, id: ChatId) -> Result<bool, StoreError> {
        if self.is_admin(id) {
            return Ok(false);
        }
        let mut admins = self.admins.clone();
        admins.push(Admin {
            name: name.to_string(),
            chat_id: id,
        });
        self.commit(admins)?;
        tracing::info!(chat_id = id, name, "admin registered");
        Ok(true)
    }

    pub fn remove(&mut self, ordinal: usize) -> Result<Admin, AdminError> {
        let idx = ordinal
            .checked_sub(1)
            .filter(|idx| *idx < self.admins.len())
            .ok_or(AdminError::InvalidOrdinal(ordinal))?;
        let mut admins = self.admins.clone();
        let removed = admins.remove(idx);
        self.commit(admins)?;
        tracing::info!(chat_id = removed.chat_id, name = %removed.name, "admin removed");
        Ok(removed)
    }

    pub fn remap(&mut self, old: ChatId, new: ChatId) -> Result<bool, StoreError> {
        if !self.is_admin(old) {
            return Ok(false);
        }
        let admins = self
            .admins
            .iter()
            .cloned()
            .map(|mut admin| {
                if admin.chat_id == old {
                    admin.chat_id = new;
                }
                admin
            })
            .collect();
        self.commit(admins)?;
        tracing::info!(from = old, to = new, "admin remapped");
        Ok(true)
    }

    pub fn list(&self) -> &[Admin] {
        &self.admins
    }

    pub fn ids(&self) -> Vec<ChatId> {
        self.admins.iter().map(|admin| admin.chat_id).collect()
    }

    pub fn flush(&self) -> Result<(), StoreError> {
        self.store.save(ADMINS_KEY, &self.admins)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;

    fn temp_registry() -> AdminRegistry {
        let dir = env::temp_dir().join(format!("schedulebot_admin_{}", uuid::Uuid::new_v4()));
        AdminRegistry::load(BlobStore::new(dir)).unwrap()
    }

    #[test]
    fn register_rejects_duplicates() {
        let mut admins = temp_registry();
        assert!(admins.register("kim", 10).unwrap());
        assert!(!admins.register("kim again", 10).unwrap());
        assert!(admins.is_admin(10));
        assert!(!admins.is_admin(11));
    }

    #[test]
    fn remove_by_ordinal() {
        let mut admins = temp_registry();
        admins.register("a", 1).unwrap();
        admins.register("b", 2).unwrap();
        assert!(matches!(admins.remove(3), Err(AdminError::InvalidOrdinal(3))));
        assert!(matches!(admins.remove(0), Err(AdminError::InvalidOrdinal(0))));
        let removed = admins.remove(1).unwrap();
        assert_eq!(removed.name, "a");
        assert_eq!(admins.ids(), vec![2]);
    }

    #[test]
    fn remap_keeps_name() {
        let mut admins = temp_registry();
        admins.register("room(group)", -5).unwrap();
        assert!(admins.remap(-5, -1005).unwrap());
        assert_eq!(
            admins.list(),
            &[Admin {
                name: "room(group)".to_string(),
                chat_id: -1005
            }]
        );
    }
}
