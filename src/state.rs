use std::sync::Arc;

use chrono_tz::Tz;
use tokio::sync::Mutex;

use crate::db::BlobStore;
use crate::error::StoreError;
use crate::models::admin::AdminRegistry;
use crate::models::calendar::Calendar;
use crate::models::subscriber::SubscriberRegistry;

/// Shared handles to every persisted store. Cloning shares the same stores.
#[derive(Clone)]
pub struct AppState {
    pub calendar: Arc<Mutex<Calendar>>,
    pub subscribers: Arc<Mutex<SubscriberRegistry>>,
    pub admins: Arc<Mutex<AdminRegistry>>,
}

impl AppState {
    pub fn load(store: BlobStore, tz: Tz) -> Result<Self, StoreError> {
        Ok(Self {
            calendar: Arc::new(Mutex::new(Calendar::load(store.clone(), tz)?)),
            subscribers: Arc::new(Mutex::new(SubscriberRegistry::load(store.clone())?)),
            admins: Arc::new(Mutex::new(AdminRegistry::load(store)?)),
        })
    }

    /// Writes the blobs that are not saved on every change path.
    pub async fn flush(&self) -> Result<(), StoreError> {
        self.calendar.lock().await.flush_mutes()?;
        self.admins.lock().await.flush()?;
        Ok(())
    }
}
