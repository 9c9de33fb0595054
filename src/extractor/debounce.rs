use std::time::{Duration, Instant};

/// What caused a re-extraction attempt on a page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    PageLoad,
    Scroll,
    /// `on_listing` is true when the click landed on a listing card.
    Click { on_listing: bool },
}

impl Trigger {
    /// Clicks on a listing are explicit interest and skip the cooldown.
    pub fn bypasses_cooldown(&self) -> bool {
        matches!(self, Trigger::Click { on_listing: true })
    }
}

/// Monotonic last-fired guard: at most one extraction per `cooldown`.
#[derive(Debug, Clone)]
pub struct Debouncer {
    cooldown: Duration,
    last_fired: Option<Instant>,
}

impl Debouncer {
    pub fn new(cooldown: Duration) -> Self {
        Self {
            cooldown,
            last_fired: None,
        }
    }

    /// Returns true (and records `now`) if the trigger may fire.
    pub fn should_fire(&mut self, trigger: Trigger, now: Instant) -> bool {
        let cooled = match self.last_fired {
            None => true,
            Some(last) => now.saturating_duration_since(last) >= self.cooldown,
        };
        if cooled || trigger.bypasses_cooldown() {
            self.last_fired = Some(now);
            true
        } else {
            false
        }
    }
}
