use std::collections::BTreeSet;

use chrono::{DateTime, Duration, NaiveDateTime, Utc};
use chrono_tz::Tz;

use crate::db::{BlobStore, EVENTS_KEY, HISTORY_KEY, MUTES_KEY};
use crate::error::{CalendarError, StoreError};
use crate::models::event::{Event, localize};

/// Scheduled events, their history and mute markers.
///
/// Every mutation writes the affected blobs before touching memory, so a failed
/// write leaves the in-memory state as it was.
pub struct Calendar {
    store: BlobStore,
    tz: Tz,
    events: Vec<Event>,
    history: Vec<Event>,
    mutes: BTreeSet<String>,
}

impl Calendar {
    pub fn load(store: BlobStore, tz: Tz) -> Result<Self, StoreError> {
        let events: Vec<Event> = store.load(EVENTS_KEY)?;
        let history: Vec<Event> = store.load(HISTORY_KEY)?;
        let mutes: BTreeSet<String> = store.load(MUTES_KEY)?;
        tracing::info!(
            events = events.len(),
            history = history.len(),
            mutes = mutes.len(),
            "calendar loaded"
        );
        Ok(Self {
            store,
            tz,
            events,
            history,
            mutes,
        })
    }

    pub fn timezone(&self) -> Tz {
        self.tz
    }

    pub fn instant(&self, time: NaiveDateTime) -> DateTime<Utc> {
        localize(&self.tz, time).with_timezone(&Utc)
    }

    /// Scheduled events ascending by time; ties keep insertion order.
    pub fn list(&self) -> Vec<Event> {
        let mut events = self.events.clone();
        events.sort_by_key(|event| event.time);
        events
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn is_muted(&self, identity: &str) -> bool {
        self.mutes.contains(identity)
    }

    /// Maps a 1-based ordinal of the sorted view to an index into `events`.
    fn position(&self, ordinal: usize) -> Result<usize, CalendarError> {
        let mut order: Vec<usize> = (0..self.events.len()).collect();
        order.sort_by_key(|&idx| self.events[idx].time);
        ordinal
            .checked_sub(1)
            .and_then(|idx| order.get(idx).copied())
            .ok_or(CalendarError::InvalidOrdinal(ordinal))
    }

    fn ensure_future(&self, time: NaiveDateTime, now: DateTime<Utc>) -> Result<(), CalendarError> {
        if self.instant(time) <= now {
            return Err(CalendarError::PastTimestamp);
        }
        Ok(())
    }

    fn commit_events(&mut self, events: Vec<Event>) -> Result<(), StoreError> {
        self.store.save(EVENTS_KEY, &events)?;
        self.events = events;
        Ok(())
    }

    fn commit_history(&mut self, history: Vec<Event>) -> Result<(), StoreError> {
        self.store.save(HISTORY_KEY, &history)?;
        self.history = history;
        Ok(())
    }

    fn commit_mutes(&mut self, mutes: BTreeSet<String>) -> Result<(), StoreError> {
        self.store.save(MUTES_KEY, &mutes)?;
        self.mutes = mutes;
        Ok(())
    }

    /// Drops markers that no longer name any scheduled event. A failed write keeps
    /// the stale markers; they match no event and are retried on the next prune.
    fn prune_mutes(&mut self) {
        let live: BTreeSet<String> = self.events.iter().map(Event::identity).collect();
        if self.mutes.iter().all(|id| live.contains(id)) {
            return;
        }
        let mutes = self.mutes.intersection(&live).cloned().collect();
        if let Err(err) = self.commit_mutes(mutes) {
            tracing::warn!(error = %err, "stale mute markers kept");
        }
    }

    /// Puts a blob back after a later write in the same change failed.
    fn restore<T: serde::Serialize + ?Sized>(&self, key: &str, previous: &T) {
        if let Err(err) = self.store.save(key, previous) {
            tracing::error!(key, error = %err, "could not restore blob after failed write");
        }
    }

    pub fn add(
        &mut self,
        time: NaiveDateTime,
        description: &str,
        now: DateTime<Utc>,
    ) -> Result<Event, CalendarError> {
        self.ensure_future(time, now)?;
        let event = Event::new(time, description);
        let mut events = self.events.clone();
        events.push(event.clone());
        self.commit_events(events)?;
        tracing::info!(event = %event.identity(), "event added");
        Ok(event)
    }

    /// Replaces the event at `ordinal`; a mute marker follows the event to its new identity.
    /// Returns the previous and the updated event.
    pub fn edit(
        &mut self,
        ordinal: usize,
        time: NaiveDateTime,
        description: &str,
        now: DateTime<Utc>,
    ) -> Result<(Event, Event), CalendarError> {
        self.ensure_future(time, now)?;
        let idx = self.position(ordinal)?;
        let previous = self.events[idx].clone();
        let updated = Event::new(time, description);

        let mut events = self.events.clone();
        events[idx] = updated.clone();

        let old_id = previous.identity();
        let new_id = updated.identity();
        if old_id != new_id && self.mutes.contains(&old_id) {
            let mut mutes = self.mutes.clone();
            mutes.remove(&old_id);
            mutes.insert(new_id.clone());
            self.store.save(MUTES_KEY, &mutes)?;
            if let Err(err) = self.store.save(EVENTS_KEY, &events) {
                self.restore(MUTES_KEY, &self.mutes);
                return Err(err.into());
            }
            self.mutes = mutes;
            self.events = events;
            tracing::debug!(from = %old_id, to = %new_id, "mute marker re-keyed");
        } else {
            self.commit_events(events)?;
        }
        tracing::info!(from = %old_id, to = %new_id, "event edited");
        Ok((previous, updated))
    }

    pub fn delete(&mut self, ordinal: usize) -> Result<Event, CalendarError> {
        let idx = self.position(ordinal)?;
        let mut events = self.events.clone();
        let removed = events.remove(idx);
        self.commit_events(events)?;
        self.prune_mutes();
        tracing::info!(event = %removed.identity(), "event deleted");
        Ok(removed)
    }

    pub fn clear(&mut self) -> Result<usize, CalendarError> {
        let count = self.events.len();
        self.commit_events(Vec::new())?;
        self.prune_mutes();
        tracing::warn!(count, "all scheduled events cleared");
        Ok(count)
    }

    pub fn mute(&mut self, ordinal: usize) -> Result<Event, CalendarError> {
        let event = self.events[self.position(ordinal)?].clone();
        let mut mutes = self.mutes.clone();
        if mutes.insert(event.identity()) {
            self.commit_mutes(mutes)?;
        }
        Ok(event)
    }

    /// Fails with `NotMuted` when the event carried no marker.
    pub fn unmute(&mut self, ordinal: usize) -> Result<Event, CalendarError> {
        let event = self.events[self.position(ordinal)?].clone();
        let mut mutes = self.mutes.clone();
        if !mutes.remove(&event.identity()) {
            return Err(CalendarError::NotMuted);
        }
        self.commit_mutes(mutes)?;
        Ok(event)
    }

    pub fn flush_mutes(&self) -> Result<(), StoreError> {
        self.store.save(MUTES_KEY, &self.mutes)
    }

    /// History entries with time in `[now - window, now)`, ascending.
    pub fn history_within(&self, window: Duration, now: DateTime<Utc>) -> Vec<Event> {
        let since = now - window;
        let mut events: Vec<Event> = self
            .history
            .iter()
            .filter(|event| {
                let at = self.instant(event.time);
                since <= at && at < now
            })
            .cloned()
            .collect();
        events.sort_by_key(|event| event.time);
        events
    }

    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    pub fn clear_history(&mut self) -> Result<usize, CalendarError> {
        let count = self.history.len();
        self.commit_history(Vec::new())?;
        tracing::warn!(count, "history cleared");
        Ok(count)
    }

    /// Moves every event with time before `now` into history.
    pub fn sweep(&mut self, now: DateTime<Utc>) -> Result<Vec<Event>, StoreError> {
        let (past, future): (Vec<Event>, Vec<Event>) = self
            .events
            .iter()
            .cloned()
            .partition(|event| self.instant(event.time) < now);
        if past.is_empty() {
            return Ok(past);
        }

        let mut history = self.history.clone();
        history.extend(past.iter().cloned());
        self.store.save(HISTORY_KEY, &history)?;
        if let Err(err) = self.store.save(EVENTS_KEY, &future) {
            self.restore(HISTORY_KEY, &self.history);
            return Err(err);
        }
        self.history = history;
        self.events = future;
        self.prune_mutes();
        Ok(past)
    }

    /// Scheduled events that are not muted, with their absolute instants.
    pub fn audible(&self) -> Vec<(Event, DateTime<Utc>)> {
        self.events
            .iter()
            .filter(|event| !self.mutes.contains(&event.identity()))
            .map(|event| (event.clone(), self.instant(event.time)))
            .collect()
    }
}
