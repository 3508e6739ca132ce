//! # Turns Module
//!
//! Initiative order, the turn/round state machine, and death saving throws.
//!
//! Combat is either not running or running with a [`TurnOrder`]. The only
//! transitions are rolling initiative (start), advancing the turn, removing a
//! fallen creature from the order, and ending combat.

use crate::config::{DEATH_SAVE_DC, DEATH_SAVE_FAILURES, DEATH_SAVE_SUCCESSES};
use crate::{CreatureId, SkirmishError, SkirmishResult};
use serde::{Deserialize, Serialize};

/// One creature's place in the initiative order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct InitiativeEntry {
    pub creature_id: CreatureId,
    /// The kept d20
    pub rolled: u32,
    pub modifier: i32,
    pub total: i32,
}

/// Sorts highest total first, then highest modifier. Remaining ties keep
/// their incoming order.
pub fn sort_initiative(entries: &mut [InitiativeEntry]) {
    entries.sort_by(|a, b| b.total.cmp(&a.total).then(b.modifier.cmp(&a.modifier)));
}

/// Result of advancing the turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TurnAdvance {
    pub creature_id: CreatureId,
    pub round: u32,
    /// Whether this advance wrapped into a new round
    pub new_round: bool,
}

/// The running initiative order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TurnOrder {
    entries: Vec<InitiativeEntry>,
    current: usize,
    round: u32,
    /// The turn holder left the order; `current` already names the follower
    #[serde(default)]
    holder_removed: bool,
}

impl TurnOrder {
    /// Sorts the entries and starts at the top of round 1.
    pub fn new(mut entries: Vec<InitiativeEntry>) -> Self {
        sort_initiative(&mut entries);
        Self {
            entries,
            current: 0,
            round: 1,
            holder_removed: false,
        }
    }

    pub fn entries(&self) -> &[InitiativeEntry] {
        &self.entries
    }

    /// Creature ids in turn order.
    pub fn creature_ids(&self) -> Vec<CreatureId> {
        self.entries.iter().map(|entry| entry.creature_id).collect()
    }

    pub fn current_index(&self) -> usize {
        self.current
    }

    pub fn round(&self) -> u32 {
        self.round
    }

    /// The creature whose turn it is, or `None` while the turn holder has
    /// been removed and the next turn has not started yet.
    pub fn current_creature(&self) -> Option<CreatureId> {
        if self.holder_removed {
            return None;
        }
        self.entries.get(self.current).map(|entry| entry.creature_id)
    }

    pub fn contains(&self, creature_id: CreatureId) -> bool {
        self.entries.iter().any(|entry| entry.creature_id == creature_id)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Moves to the next creature, wrapping into a new round after the last.
    pub fn advance(&mut self) -> SkirmishResult<TurnAdvance> {
        if self.entries.is_empty() {
            return Err(SkirmishError::InvalidState(
                "initiative order is empty".to_string(),
            ));
        }
        if !std::mem::take(&mut self.holder_removed) {
            self.current += 1;
        }
        let new_round = self.current >= self.entries.len();
        if new_round {
            self.current = 0;
            self.round += 1;
        }
        Ok(TurnAdvance {
            creature_id: self.entries[self.current].creature_id,
            round: self.round,
            new_round,
        })
    }

    /// Removes a creature from the order.
    ///
    /// Entries before the current turn shift the index back. Removing the
    /// turn holder leaves the turn vacant until the next advance, which then
    /// starts the follower's turn.
    pub fn remove(&mut self, creature_id: CreatureId) -> bool {
        let Some(index) = self
            .entries
            .iter()
            .position(|entry| entry.creature_id == creature_id)
        else {
            return false;
        };
        self.entries.remove(index);
        if self.entries.is_empty() {
            self.current = 0;
            self.holder_removed = false;
        } else if index < self.current {
            self.current -= 1;
        } else if index == self.current && !self.holder_removed {
            self.holder_removed = true;
        }
        true
    }
}

/// Whether a fight is running.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum CombatPhase {
    #[default]
    OutOfCombat,
    InCombat(TurnOrder),
}

impl CombatPhase {
    pub fn is_active(&self) -> bool {
        matches!(self, CombatPhase::InCombat(_))
    }

    pub fn turn_order(&self) -> Option<&TurnOrder> {
        match self {
            CombatPhase::InCombat(order) => Some(order),
            CombatPhase::OutOfCombat => None,
        }
    }

    /// Enters combat with a fresh order, replacing any running one.
    pub fn start(&mut self, entries: Vec<InitiativeEntry>) -> &TurnOrder {
        *self = CombatPhase::InCombat(TurnOrder::new(entries));
        match self {
            CombatPhase::InCombat(order) => order,
            CombatPhase::OutOfCombat => unreachable!("combat was just started"),
        }
    }

    pub fn advance(&mut self) -> SkirmishResult<TurnAdvance> {
        match self {
            CombatPhase::InCombat(order) => order.advance(),
            CombatPhase::OutOfCombat => Err(SkirmishError::InvalidState(
                "no combat in progress".to_string(),
            )),
        }
    }

    /// Drops a creature from the order if combat is running.
    pub fn remove_creature(&mut self, creature_id: CreatureId) -> bool {
        match self {
            CombatPhase::InCombat(order) => order.remove(creature_id),
            CombatPhase::OutOfCombat => false,
        }
    }

    /// Leaves combat, returning the rounds fought.
    pub fn end(&mut self) -> Option<u32> {
        match std::mem::take(self) {
            CombatPhase::InCombat(order) => Some(order.round()),
            CombatPhase::OutOfCombat => None,
        }
    }
}

/// Death saving throw tally for a creature at 0 HP.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DeathSaves {
    pub successes: u8,
    pub failures: u8,
}

/// Where a death save leaves the creature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeathSaveOutcome {
    /// Natural 20: back up with 1 HP
    Revived,
    /// Three successes
    Stabilized,
    /// Three failures
    Died,
    /// Still dying with the updated tally
    Pending(DeathSaves),
}

impl DeathSaves {
    /// Applies a death save d20.
    ///
    /// # Examples
    ///
    /// ```
    /// use skirmish::{DeathSaveOutcome, DeathSaves};
    ///
    /// let saves = DeathSaves { successes: 0, failures: 1 };
    /// assert_eq!(saves.record(1), DeathSaveOutcome::Died);
    /// assert_eq!(saves.record(20), DeathSaveOutcome::Revived);
    /// ```
    pub fn record(self, roll: u32) -> DeathSaveOutcome {
        match roll {
            20 => DeathSaveOutcome::Revived,
            1 => self.fail(2),
            r if r >= DEATH_SAVE_DC => DeathSaves {
                successes: self.successes + 1,
                ..self
            }
            .settle(),
            _ => self.fail(1),
        }
    }

    /// Adds failures, as when taking damage while dying.
    pub fn fail(self, count: u8) -> DeathSaveOutcome {
        DeathSaves {
            failures: self.failures.saturating_add(count),
            ..self
        }
        .settle()
    }

    fn settle(self) -> DeathSaveOutcome {
        if self.failures >= DEATH_SAVE_FAILURES {
            DeathSaveOutcome::Died
        } else if self.successes >= DEATH_SAVE_SUCCESSES {
            DeathSaveOutcome::Stabilized
        } else {
            DeathSaveOutcome::Pending(self)
        }
    }
}
