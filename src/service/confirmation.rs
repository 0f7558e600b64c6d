use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use crate::models::ChatId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PendingAction {
    ClearEvents,
    ClearHistory,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateError {
    AlreadyPending,
    NothingPending,
    /// The window closed before the confirmation arrived; the slot is cleared.
    Expired(PendingAction),
}

#[derive(Debug, Clone)]
struct Pending {
    action: PendingAction,
    token: Uuid,
    expires_at: DateTime<Utc>,
}

/// Two-step confirmation for destructive commands, one slot per chat.
///
/// `arm` opens a slot and returns a token for its expiry timer; `confirm` or
/// `expire` closes it. A timer whose token no longer matches is ignored.
#[derive(Debug)]
pub struct ConfirmationGate {
    ttl: Duration,
    pending: HashMap<ChatId, Pending>,
}

impl ConfirmationGate {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            pending: HashMap::new(),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn arm(
        &mut self,
        chat_id: ChatId,
        action: PendingAction,
        now: DateTime<Utc>,
    ) -> Result<Uuid, GateError> {
        if let Some(existing) = self.pending.get(&chat_id) {
            if existing.expires_at >= now {
                return Err(GateError::AlreadyPending);
            }
        }
        let token = Uuid::new_v4();
        self.pending.insert(
            chat_id,
            Pending {
                action,
                token,
                expires_at: now + self.ttl,
            },
        );
        Ok(token)
    }

    /// Takes the pending action if it is still inside its window.
    pub fn confirm(&mut self, chat_id: ChatId, now: DateTime<Utc>) -> Result<PendingAction, GateError> {
        let pending = self
            .pending
            .remove(&chat_id)
            .ok_or(GateError::NothingPending)?;
        if now > pending.expires_at {
            return Err(GateError::Expired(pending.action));
        }
        Ok(pending.action)
    }

    pub fn expire(&mut self, chat_id: ChatId, token: Uuid) -> Option<PendingAction> {
        match self.pending.get(&chat_id) {
            Some(pending) if pending.token == token => {
                self.pending.remove(&chat_id).map(|pending| pending.action)
            }
            _ => None,
        }
    }

    pub fn is_pending(&self, chat_id: ChatId) -> bool {
        self.pending.contains_key(&chat_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap()
    }

    #[test]
    fn confirm_within_window_executes_once() {
        let mut gate = ConfirmationGate::new(Duration::seconds(30));
        gate.arm(1, PendingAction::ClearEvents, t0()).unwrap();
        assert_eq!(gate.confirm(1, t0() + Duration::seconds(29)), Ok(PendingAction::ClearEvents));
        assert_eq!(gate.confirm(1, t0() + Duration::seconds(29)), Err(GateError::NothingPending));
    }

    #[test]
    fn confirm_after_window_does_nothing() {
        let mut gate = ConfirmationGate::new(Duration::seconds(30));
        gate.arm(1, PendingAction::ClearEvents, t0()).unwrap();
        assert_eq!(
            gate.confirm(1, t0() + Duration::seconds(31)),
            Err(GateError::Expired(PendingAction::ClearEvents))
        );
        assert!(!gate.is_pending(1));
        assert_eq!(gate.confirm(1, t0() + Duration::seconds(32)), Err(GateError::NothingPending));
    }

    #[test]
    fn second_arm_is_rejected_while_pending() {
        let mut gate = ConfirmationGate::new(Duration::seconds(30));
        gate.arm(1, PendingAction::ClearEvents, t0()).unwrap();
        assert_eq!(
            gate.arm(1, PendingAction::ClearHistory, t0() + Duration::seconds(5)),
            Err(GateError::AlreadyPending)
        );
        assert!(gate.arm(2, PendingAction::ClearHistory, t0()).is_ok());
    }

    #[test]
    fn stale_timer_does_not_disarm_newer_request() {
        let mut gate = ConfirmationGate::new(Duration::seconds(30));
        let first = gate.arm(1, PendingAction::ClearEvents, t0()).unwrap();
        gate.confirm(1, t0() + Duration::seconds(1)).unwrap();
        let second = gate.arm(1, PendingAction::ClearHistory, t0() + Duration::seconds(2)).unwrap();

        assert_eq!(gate.expire(1, first), None);
        assert!(gate.is_pending(1));
        assert_eq!(gate.expire(1, second), Some(PendingAction::ClearHistory));
    }
}
