//! Authoritative seat occupancy state, one arena per schedule.
//!
//! Every mutation is an all-or-nothing batch transition: it commits only if
//! every requested seat is in the expected prior state, otherwise nothing
//! changes. Conflicting batches on the same schedule serialize on the
//! schedule's lock, so two buyers racing for an overlapping seat set can
//! never both succeed. Reads work on a cloned view and may go stale; the
//! transition check at commit time is what settles races.
//!
//! A HELD seat whose expiry has passed counts as AVAILABLE everywhere
//! (lazy expiry). The background sweep only exists to keep seat maps fresh.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard};
use uuid::Uuid;

use crate::models::{Gender, HoldToken};
use crate::services::error::BookingError;

/// Occupancy of a single seat. Legal orderings per seat are
/// AVAILABLE -> HELD -> SOLD and AVAILABLE -> HELD -> AVAILABLE; SOLD is
/// terminal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SeatState {
    Available,
    Held {
        token: HoldToken,
        expires_at: DateTime<Utc>,
    },
    Sold {
        booking_id: Uuid,
        gender: Option<Gender>,
    },
}

impl SeatState {
    fn is_available_at(&self, now: DateTime<Utc>) -> bool {
        match self {
            SeatState::Available => true,
            SeatState::Held { expires_at, .. } => *expires_at <= now,
            SeatState::Sold { .. } => false,
        }
    }

    fn held_by(&self, token: HoldToken, now: DateTime<Utc>) -> bool {
        matches!(self, SeatState::Held { token: t, expires_at } if *t == token && *expires_at > now)
    }
}

/// Consistent read of one schedule's occupancy.
#[derive(Debug, Clone)]
pub struct SeatSnapshot {
    pub seats: BTreeMap<String, SeatState>,
    /// Bumped once per committed batch transition; lets clients detect a
    /// stale seat map without re-diffing it.
    pub version: u64,
}

struct ScheduleSeats {
    seats: HashMap<String, SeatState>,
    version: u64,
}

pub struct SeatInventory {
    schedules: DashMap<Uuid, Arc<Mutex<ScheduleSeats>>>,
}

impl SeatInventory {
    pub fn new() -> Self {
        Self {
            schedules: DashMap::new(),
        }
    }

    /// Seed the arena for a new schedule; every label starts AVAILABLE.
    pub fn register_schedule(&self, schedule_id: Uuid, labels: &[String]) {
        let seats = labels
            .iter()
            .map(|l| (l.clone(), SeatState::Available))
            .collect();
        self.schedules.insert(
            schedule_id,
            Arc::new(Mutex::new(ScheduleSeats { seats, version: 0 })),
        );
    }

    /// Current occupancy of every seat, expired holds already folded back to
    /// AVAILABLE.
    pub fn snapshot(&self, schedule_id: Uuid) -> Result<SeatSnapshot, BookingError> {
        let arena = self.arena(schedule_id)?;
        let guard = lock(&arena);
        let now = Utc::now();
        let seats = guard
            .seats
            .iter()
            .map(|(label, state)| {
                let effective = match state {
                    SeatState::Held { expires_at, .. } if *expires_at <= now => {
                        SeatState::Available
                    }
                    other => other.clone(),
                };
                (label.clone(), effective)
            })
            .collect();
        Ok(SeatSnapshot {
            seats,
            version: guard.version,
        })
    }

    /// AVAILABLE -> HELD for the whole batch, or nothing. Fails with
    /// `SeatUnavailable` listing every conflicting label.
    pub fn try_hold(
        &self,
        schedule_id: Uuid,
        labels: &[String],
        token: HoldToken,
        expires_at: DateTime<Utc>,
    ) -> Result<(), BookingError> {
        let arena = self.arena(schedule_id)?;
        let mut guard = lock(&arena);
        let now = Utc::now();

        let mut conflicts: Vec<String> = labels
            .iter()
            .filter(|label| {
                !matches!(guard.seats.get(label.as_str()), Some(state) if state.is_available_at(now))
            })
            .cloned()
            .collect();
        if !conflicts.is_empty() {
            conflicts.sort();
            return Err(BookingError::SeatUnavailable { labels: conflicts });
        }

        for label in labels {
            guard
                .seats
                .insert(label.clone(), SeatState::Held { token, expires_at });
        }
        guard.version += 1;
        Ok(())
    }

    /// HELD(token) -> AVAILABLE. Seats no longer held under this token are
    /// skipped, not errors, so releasing twice is harmless. Returns how many
    /// seats actually went back to the pool.
    pub fn release(&self, schedule_id: Uuid, labels: &[String], token: HoldToken) -> usize {
        let Ok(arena) = self.arena(schedule_id) else {
            return 0;
        };
        let mut guard = lock(&arena);
        let mut released = 0;
        for label in labels {
            if let Some(state) = guard.seats.get_mut(label.as_str()) {
                if matches!(state, SeatState::Held { token: t, .. } if *t == token) {
                    *state = SeatState::Available;
                    released += 1;
                }
            }
        }
        if released > 0 {
            guard.version += 1;
        }
        released
    }

    /// HELD(token) -> SOLD for the whole batch. Fails with `HoldExpired` if
    /// any seat is no longer held under this token or the expiry has passed.
    pub fn confirm_sold(
        &self,
        schedule_id: Uuid,
        labels: &[String],
        token: HoldToken,
        booking_id: Uuid,
        genders: &HashMap<String, Gender>,
    ) -> Result<(), BookingError> {
        let arena = self.arena(schedule_id)?;
        let mut guard = lock(&arena);
        let now = Utc::now();

        let all_held = labels.iter().all(|label| {
            matches!(guard.seats.get(label.as_str()), Some(state) if state.held_by(token, now))
        });
        if !all_held {
            return Err(BookingError::HoldExpired);
        }

        for label in labels {
            guard.seats.insert(
                label.clone(),
                SeatState::Sold {
                    booking_id,
                    gender: genders.get(label).copied(),
                },
            );
        }
        guard.version += 1;
        Ok(())
    }

    /// Eagerly fold expired holds back to AVAILABLE across all schedules.
    /// Purely a freshness aid; correctness comes from lazy expiry.
    pub fn sweep_expired(&self) -> usize {
        let now = Utc::now();
        let mut swept = 0;
        for entry in self.schedules.iter() {
            let mut guard = lock(entry.value());
            let mut changed = false;
            for state in guard.seats.values_mut() {
                if matches!(state, SeatState::Held { expires_at, .. } if *expires_at <= now) {
                    *state = SeatState::Available;
                    swept += 1;
                    changed = true;
                }
            }
            if changed {
                guard.version += 1;
            }
        }
        swept
    }

    fn arena(&self, schedule_id: Uuid) -> Result<Arc<Mutex<ScheduleSeats>>, BookingError> {
        self.schedules
            .get(&schedule_id)
            .map(|e| Arc::clone(e.value()))
            .ok_or(BookingError::ScheduleNotFound(schedule_id))
    }
}

impl Default for SeatInventory {
    fn default() -> Self {
        Self::new()
    }
}

fn lock(arena: &Mutex<ScheduleSeats>) -> MutexGuard<'_, ScheduleSeats> {
    // A poisoned lock means a panic mid-transition; the state itself is
    // still a consistent prior-or-committed batch, so keep serving.
    arena.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
