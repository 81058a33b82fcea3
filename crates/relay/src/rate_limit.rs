//! Per-channel cooldown between successful forwards.
//!
//! A send first takes a [`Reservation`] on its (guild, channel) slot. While
//! the reservation is held no other send for the same slot is admitted, so
//! two messages arriving together cannot both pass the cooldown check while
//! the first one is still waiting on the network. Only
//! [`Reservation::commit_at`] records a send time; dropping the reservation
//! releases the slot and leaves the previous timestamp untouched.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
    time::{Duration, Instant},
};

use hookrelay_common::{ChannelId, GuildId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RateLimitKey {
    pub guild_id: GuildId,
    pub channel_id: ChannelId,
}

impl RateLimitKey {
    pub fn new(guild_id: GuildId, channel_id: ChannelId) -> Self {
        Self {
            guild_id,
            channel_id,
        }
    }
}

#[derive(Debug, Default)]
struct Slot {
    last_sent: Option<Instant>,
    in_flight: bool,
}

impl Slot {
    fn remaining(&self, cooldown: Duration, now: Instant) -> Option<Duration> {
        let elapsed = now.saturating_duration_since(self.last_sent?);
        (elapsed < cooldown).then(|| cooldown - elapsed)
    }
}

type Slots = Arc<Mutex<HashMap<RateLimitKey, Slot>>>;

/// In-memory registry of last successful sends.
///
/// The mutex is never held across an `.await`. Entries are not evicted.
#[derive(Debug, Clone, Default)]
pub struct RateLimiter {
    slots: Slots,
}

impl RateLimiter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a send for `key` would be admitted at `now`. Does not reserve.
    pub fn check_at(&self, key: RateLimitKey, cooldown: Duration, now: Instant) -> bool {
        let slots = self.slots.lock().unwrap_or_else(|e| e.into_inner());
        slots
            .get(&key)
            .is_none_or(|slot| !slot.in_flight && slot.remaining(cooldown, now).is_none())
    }

    pub fn try_reserve(
        &self,
        key: RateLimitKey,
        cooldown: Duration,
    ) -> Result<Reservation, Duration> {
        self.try_reserve_at(key, cooldown, Instant::now())
    }

    /// Claim the slot for `key`, or return how long the caller should wait.
    ///
    /// A slot with a send already in flight reports the full cooldown.
    pub fn try_reserve_at(
        &self,
        key: RateLimitKey,
        cooldown: Duration,
        now: Instant,
    ) -> Result<Reservation, Duration> {
        let mut slots = self.slots.lock().unwrap_or_else(|e| e.into_inner());
        let slot = slots.entry(key).or_default();
        if slot.in_flight {
            return Err(cooldown);
        }
        if let Some(remaining) = slot.remaining(cooldown, now) {
            return Err(remaining);
        }
        slot.in_flight = true;
        Ok(Reservation {
            key,
            slots: Arc::clone(&self.slots),
            settled: false,
        })
    }

    /// Time of the last committed send for `key`.
    pub fn last_sent(&self, key: RateLimitKey) -> Option<Instant> {
        let slots = self.slots.lock().unwrap_or_else(|e| e.into_inner());
        slots.get(&key).and_then(|slot| slot.last_sent)
    }

    /// Number of (guild, channel) pairs with a recorded send.
    pub fn tracked(&self) -> usize {
        let slots = self.slots.lock().unwrap_or_else(|e| e.into_inner());
        slots.values().filter(|slot| slot.last_sent.is_some()).count()
    }
}

/// In-flight claim on a rate-limit slot.
#[derive(Debug)]
#[must_use = "dropping a reservation releases the slot without recording a send"]
pub struct Reservation {
    key: RateLimitKey,
    slots: Slots,
    settled: bool,
}

impl Reservation {
    pub fn commit(self) {
        self.commit_at(Instant::now());
    }

    /// Record a successful send at `at` and release the slot.
    pub fn commit_at(mut self, at: Instant) {
        let mut slots = self.slots.lock().unwrap_or_else(|e| e.into_inner());
        let slot = slots.entry(self.key).or_default();
        slot.last_sent = Some(at);
        slot.in_flight = false;
        self.settled = true;
    }
}

impl Drop for Reservation {
    fn drop(&mut self) {
        if self.settled {
            return;
        }
        let mut slots = self.slots.lock().unwrap_or_else(|e| e.into_inner());
        let never_sent = match slots.get_mut(&self.key) {
            Some(slot) => {
                slot.in_flight = false;
                slot.last_sent.is_none()
            },
            None => false,
        };
        if never_sent {
            slots.remove(&self.key);
        }
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    const COOLDOWN: Duration = Duration::from_secs(30);

    fn key(channel: u64) -> RateLimitKey {
        RateLimitKey::new(GuildId(1), ChannelId(channel))
    }

    #[test]
    fn first_send_is_allowed() {
        let limiter = RateLimiter::new();
        assert!(limiter.check_at(key(1), COOLDOWN, Instant::now()));
    }

    #[test]
    fn cooldown_boundaries() {
        let limiter = RateLimiter::new();
        let t = Instant::now();
        limiter
            .try_reserve_at(key(1), COOLDOWN, t)
            .unwrap()
            .commit_at(t);

        let just_before = t + COOLDOWN - Duration::from_secs(1);
        let just_after = t + COOLDOWN + Duration::from_secs(1);
        assert!(!limiter.check_at(key(1), COOLDOWN, just_before));
        assert_eq!(
            limiter
                .try_reserve_at(key(1), COOLDOWN, just_before)
                .unwrap_err(),
            Duration::from_secs(1)
        );
        assert!(limiter.check_at(key(1), COOLDOWN, just_after));
        assert!(limiter.try_reserve_at(key(1), COOLDOWN, just_after).is_ok());
    }

    #[test]
    fn in_flight_send_blocks_a_second_reservation() {
        let limiter = RateLimiter::new();
        let t = Instant::now();
        let first = limiter.try_reserve_at(key(1), COOLDOWN, t).unwrap();

        assert!(!limiter.check_at(key(1), COOLDOWN, t));
        assert_eq!(
            limiter.try_reserve_at(key(1), COOLDOWN, t).unwrap_err(),
            COOLDOWN
        );

        first.commit_at(t);
        assert_eq!(limiter.last_sent(key(1)), Some(t));
    }

    #[test]
    fn dropped_reservation_records_nothing() {
        let limiter = RateLimiter::new();
        let t = Instant::now();
        drop(limiter.try_reserve_at(key(1), COOLDOWN, t).unwrap());

        assert_eq!(limiter.last_sent(key(1)), None);
        assert_eq!(limiter.tracked(), 0);
        assert!(limiter.try_reserve_at(key(1), COOLDOWN, t).is_ok());
    }

    #[test]
    fn failed_retry_keeps_previous_timestamp() {
        let limiter = RateLimiter::new();
        let t = Instant::now();
        limiter
            .try_reserve_at(key(1), COOLDOWN, t)
            .unwrap()
            .commit_at(t);

        let later = t + COOLDOWN * 2;
        drop(limiter.try_reserve_at(key(1), COOLDOWN, later).unwrap());

        assert_eq!(limiter.last_sent(key(1)), Some(t));
        assert!(limiter.check_at(key(1), COOLDOWN, later));
    }

    #[test]
    fn keys_are_independent() {
        let limiter = RateLimiter::new();
        let t = Instant::now();
        limiter
            .try_reserve_at(key(1), COOLDOWN, t)
            .unwrap()
            .commit_at(t);

        assert!(limiter.check_at(key(2), COOLDOWN, t));
        let other_guild = RateLimitKey::new(GuildId(2), ChannelId(1));
        assert!(limiter.check_at(other_guild, COOLDOWN, t));
        assert_eq!(limiter.tracked(), 1);
    }
}
