use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::Mutex;

use crate::wizard::Conversation;

/// Per-user conversation slot. The mutex makes each user's state
/// transitions strictly sequential: a second inbound event for the same
/// user queues on it until the first transition, awaits included, is done.
/// Independent users lock independently.
#[derive(Default)]
pub struct UserSession {
    pub conversation: Option<Conversation>,
}

/// Creation-on-first-access session store. Sessions are never evicted.
#[derive(Default)]
pub struct SessionStore {
    sessions: DashMap<i64, Arc<Mutex<UserSession>>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn session(&self, user_id: i64) -> Arc<Mutex<UserSession>> {
        self.sessions.entry(user_id).or_default().clone()
    }
}

/// Chosen purchase quantity per (user, event). Lives only for the process
/// lifetime; the default of 1 appears on first access.
#[derive(Default)]
pub struct TicketSelections {
    quantities: DashMap<(i64, i64), i64>,
}

impl TicketSelections {
    pub const MIN: i64 = 1;
    pub const MAX: i64 = 10;

    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, user_id: i64, event_id: i64) -> i64 {
        *self
            .quantities
            .entry((user_id, event_id))
            .or_insert(Self::MIN)
    }

    /// Clamped adjustment; pushing past either bound is a no-op that
    /// returns the unchanged value.
    pub fn adjust(&self, user_id: i64, event_id: i64, delta: i64) -> i64 {
        let mut quantity = self
            .quantities
            .entry((user_id, event_id))
            .or_insert(Self::MIN);
        *quantity = (*quantity + delta).clamp(Self::MIN, Self::MAX);
        *quantity
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_selection_defaults_to_one() {
        let selections = TicketSelections::new();
        assert_eq!(selections.get(1, 7), 1);
    }

    #[test]
    fn test_adjust_stays_within_bounds() {
        let selections = TicketSelections::new();

        for _ in 0..15 {
            let q = selections.adjust(1, 7, 1);
            assert!((TicketSelections::MIN..=TicketSelections::MAX).contains(&q));
        }
        assert_eq!(selections.get(1, 7), 10);
        assert_eq!(selections.adjust(1, 7, 1), 10);

        for _ in 0..15 {
            selections.adjust(1, 7, -1);
        }
        assert_eq!(selections.get(1, 7), 1);
        assert_eq!(selections.adjust(1, 7, -1), 1);
    }

    #[test]
    fn test_selections_are_keyed_by_user_and_event() {
        let selections = TicketSelections::new();
        selections.adjust(1, 7, 1);

        assert_eq!(selections.get(1, 7), 2);
        assert_eq!(selections.get(1, 8), 1);
        assert_eq!(selections.get(2, 7), 1);
    }
}
