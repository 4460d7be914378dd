//! Power-ups and the daily spin wheel that hands them out.
//!
//! Each power-up flag moves `Unset -> Armed -> Consumed`. A spin arms at most
//! one flag; the next successful vote consumes whatever it applied. A later
//! spin may arm a consumed flag again.

use std::fmt::{Display, Formatter};

use chrono::{DateTime, TimeDelta, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::storage::{
    KeyValueStore, LocalRecord, StorageError, POWERUPS_KEY, SPIN_KEY, VISITED_KEY,
};

pub fn spin_cooldown() -> TimeDelta {
    TimeDelta::hours(24)
}

/// Full turns the wheel makes before it settles.
const WHEEL_TURNS: u32 = 5;

#[derive(Debug, Serialize, Deserialize, Copy, Clone, PartialEq, Eq)]
pub enum PowerUp {
    DoubleVote,
    VoteAgain,
}

#[derive(Debug, Serialize, Deserialize, Copy, Clone, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum FlagState {
    #[default]
    Unset,
    Armed,
    Consumed,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct PowerUpFlags {
    #[serde(default)]
    pub double_vote: FlagState,
    #[serde(default)]
    pub vote_again: FlagState,
}

impl PowerUpFlags {
    fn slot(&mut self, power_up: PowerUp) -> &mut FlagState {
        match power_up {
            PowerUp::DoubleVote => &mut self.double_vote,
            PowerUp::VoteAgain => &mut self.vote_again,
        }
    }

    pub fn state(&self, power_up: PowerUp) -> FlagState {
        match power_up {
            PowerUp::DoubleVote => self.double_vote,
            PowerUp::VoteAgain => self.vote_again,
        }
    }
}

pub struct PowerUps<'a, S: ?Sized> {
    flags: LocalRecord<'a, S, PowerUpFlags>,
}

impl<'a, S: KeyValueStore + ?Sized> PowerUps<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self {
            flags: LocalRecord::new(store, POWERUPS_KEY),
        }
    }

    pub fn state(&self, power_up: PowerUp) -> FlagState {
        self.flags.get_or_default().state(power_up)
    }

    pub fn is_armed(&self, power_up: PowerUp) -> bool {
        self.state(power_up) == FlagState::Armed
    }

    pub fn arm(&self, power_up: PowerUp) -> Result<(), StorageError> {
        self.flags.update(|flags| *flags.slot(power_up) = FlagState::Armed)
    }

    /// Moves an armed flag to consumed. Returns whether it was armed.
    pub fn consume(&self, power_up: PowerUp) -> Result<bool, StorageError> {
        self.flags.update(|flags| {
            let slot = flags.slot(power_up);
            if *slot == FlagState::Armed {
                *slot = FlagState::Consumed;
                true
            } else {
                false
            }
        })
    }
}

#[derive(Debug, Serialize, Deserialize, Copy, Clone, PartialEq, Eq)]
pub enum Prize {
    VoteAgain,
    BonusSpin,
    Luck404,
    DoubleVote,
    TryAgain,
    Zzz,
    SoClose,
    NotToday,
}

/// Wheel segments, clockwise from the pointer.
pub const WHEEL: [Prize; 8] = [
    Prize::VoteAgain,
    Prize::BonusSpin,
    Prize::Luck404,
    Prize::DoubleVote,
    Prize::TryAgain,
    Prize::Zzz,
    Prize::SoClose,
    Prize::NotToday,
];

impl Prize {
    pub fn power_up(self) -> Option<PowerUp> {
        match self {
            Prize::VoteAgain => Some(PowerUp::VoteAgain),
            Prize::DoubleVote => Some(PowerUp::DoubleVote),
            _ => None,
        }
    }
}

impl Display for Prize {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Prize::VoteAgain => "Vote Again!",
            Prize::BonusSpin => "Bonus Spin!",
            Prize::Luck404 => "LUCK 404",
            Prize::DoubleVote => "Double Vote!",
            Prize::TryAgain => "Try Again",
            Prize::Zzz => "Zzz...",
            Prize::SoClose => "So Close",
            Prize::NotToday => "Not Today",
        })
    }
}

/// Segment under the pointer after the wheel turned `rotation` degrees.
pub fn prize_at(rotation: u32) -> Prize {
    let segment = 360 / WHEEL.len() as u32;
    let winning_angle = (360 - rotation % 360) % 360;

    WHEEL[(winning_angle / segment) as usize]
}

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
struct SpinRecord {
    #[serde(default)]
    last_spin: Option<DateTime<Utc>>,
    #[serde(default)]
    bonus_spin: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SpinAvailability {
    Ready,
    /// A bonus spin is pending; it ignores the cooldown and is not timed.
    Bonus,
    CoolingDown { remaining: TimeDelta },
}

#[derive(Error, Debug)]
pub enum SpinError {
    #[error("Come back tomorrow! Next spin in {} minutes", .remaining.num_minutes())]
    CoolingDown { remaining: TimeDelta },

    #[error(transparent)]
    Storage(#[from] StorageError),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpinOutcome {
    pub prize: Prize,
    pub rotation: u32,
    pub armed: Option<PowerUp>,
    pub bonus: bool,
}

pub struct SpinWheel<'a, S: ?Sized> {
    spins: LocalRecord<'a, S, SpinRecord>,
    power_ups: PowerUps<'a, S>,
}

impl<'a, S: KeyValueStore + ?Sized> SpinWheel<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self {
            spins: LocalRecord::new(store, SPIN_KEY),
            power_ups: PowerUps::new(store),
        }
    }

    pub fn availability(&self, now: DateTime<Utc>) -> SpinAvailability {
        let record = self.spins.get_or_default();

        if record.bonus_spin {
            return SpinAvailability::Bonus;
        }

        match record.last_spin {
            Some(last) if now - last < spin_cooldown() => SpinAvailability::CoolingDown {
                remaining: spin_cooldown() - (now - last),
            },
            _ => SpinAvailability::Ready,
        }
    }

    pub fn spin<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
        now: DateTime<Utc>,
    ) -> Result<SpinOutcome, SpinError> {
        self.spin_from(0, rng, now)
    }

    /// Spins onward from a wheel already turned `current` degrees, so the
    /// returned rotation only ever grows.
    pub fn spin_from<R: Rng + ?Sized>(
        &self,
        current: u32,
        rng: &mut R,
        now: DateTime<Utc>,
    ) -> Result<SpinOutcome, SpinError> {
        let rotation = current.saturating_add(WHEEL_TURNS * 360 + rng.gen_range(0..360));
        self.spin_to(rotation, now)
    }

    /// Settles the wheel at `rotation` degrees and applies the prize.
    pub fn spin_to(&self, rotation: u32, now: DateTime<Utc>) -> Result<SpinOutcome, SpinError> {
        let availability = self.availability(now);
        if let SpinAvailability::CoolingDown { remaining } = availability {
            return Err(SpinError::CoolingDown { remaining });
        }

        let mut record = self.spins.get_or_default();
        let bonus = availability == SpinAvailability::Bonus;
        if bonus {
            record.bonus_spin = false;
        } else {
            record.last_spin = Some(now);
        }

        let prize = prize_at(rotation);
        if prize == Prize::BonusSpin {
            record.bonus_spin = true;
        }
        self.spins.set(&record)?;

        let armed = prize.power_up();
        if let Some(power_up) = armed {
            self.power_ups.arm(power_up)?;
        }

        tracing::info!(?prize, bonus, "wheel spun");

        Ok(SpinOutcome {
            prize,
            rotation,
            armed,
            bonus,
        })
    }
}

/// Remembers whether the wheel was already shown on this device.
pub struct FirstVisit<'a, S: ?Sized> {
    visited: LocalRecord<'a, S, bool>,
}

impl<'a, S: KeyValueStore + ?Sized> FirstVisit<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self {
            visited: LocalRecord::new(store, VISITED_KEY),
        }
    }

    /// True exactly once per device; marks the visit as seen.
    pub fn take(&self) -> bool {
        if self.visited.get().unwrap_or(false) {
            return false;
        }

        if let Err(err) = self.visited.set(&true) {
            tracing::warn!(%err, "can't persist first visit flag");
        }

        true
    }
}
