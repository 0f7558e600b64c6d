use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use tokio::time::sleep;

use crate::error::StoreError;
use crate::models::calendar::Calendar;

pub async fn run_sweeper_loop(calendar: Arc<Mutex<Calendar>>, interval: Duration) {
    loop {
        match sweep_tick(&calendar, Utc::now()).await {
            Ok(0) => {}
            Ok(moved) => tracing::info!(moved, "elapsed events moved to history"),
            Err(err) => tracing::error!(error = %err, "history sweep failed, retrying next cycle"),
        }
        sleep(interval).await;
    }
}

pub async fn sweep_tick(calendar: &Mutex<Calendar>, now: DateTime<Utc>) -> Result<usize, StoreError> {
    let moved = calendar.lock().await.sweep(now)?;
    for event in &moved {
        tracing::debug!(event = %event.identity(), "event archived");
    }
    Ok(moved.len())
}
