//! # Events Module
//!
//! Combat events and the listener registry that delivers them.
//!
//! Each orchestrator owns one [`EventBus`]. Listeners are called in
//! subscription order, synchronously, before the operation that raised the
//! event returns.

use super::turns::{DeathSaves, InitiativeEntry};
use crate::rules::{AttackRoll, CheckResult, D20Roll, DamageModifier, RollResult};
use crate::{CreatureId, DamageType, HitPoints};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Something that happened during combat.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CombatEvent {
    DiceRolled {
        formula: String,
        total: i32,
        rolls: Vec<u32>,
        modifier: i32,
        natural_20: bool,
        natural_1: bool,
    },
    AttackResolved {
        attacker_id: CreatureId,
        target_id: CreatureId,
        attack: AttackRoll,
    },
    DamageApplied {
        creature_id: CreatureId,
        /// Damage after resistances, before temporary HP
        amount: u32,
        damage_type: Option<DamageType>,
        modifier: DamageModifier,
        critical: bool,
        absorbed_by_temporary: u32,
        hit_points: HitPoints,
    },
    HealingApplied {
        creature_id: CreatureId,
        amount: u32,
        hit_points: HitPoints,
    },
    Death {
        creature_id: CreatureId,
        was_instant_death: bool,
    },
    InitiativeRolled {
        order: Vec<InitiativeEntry>,
    },
    ConcentrationChecked {
        creature_id: CreatureId,
        damage: u32,
        check: CheckResult,
        maintained: bool,
    },
    TurnStarted {
        creature_id: CreatureId,
        round: u32,
    },
    CombatEnded {
        rounds: u32,
    },
    DeathSaveRolled {
        creature_id: CreatureId,
        roll: u32,
        /// Tally after the roll; cleared once the save resolves
        saves: DeathSaves,
    },
    Stabilized {
        creature_id: CreatureId,
    },
}

impl CombatEvent {
    /// Builds a `DiceRolled` event from a formula roll.
    pub fn from_roll(roll: &RollResult) -> Self {
        CombatEvent::DiceRolled {
            formula: roll.formula.clone(),
            total: roll.total,
            rolls: roll.rolls.clone(),
            modifier: roll.modifier,
            natural_20: false,
            natural_1: false,
        }
    }

    /// Builds a `DiceRolled` event from a d20 roll.
    pub fn from_d20(roll: &D20Roll) -> Self {
        CombatEvent::DiceRolled {
            formula: roll.formula(),
            total: roll.total,
            rolls: roll.rolls.clone(),
            modifier: roll.modifier,
            natural_20: roll.natural_20,
            natural_1: roll.natural_1,
        }
    }

    /// Short name of the event kind, for logs.
    pub fn name(&self) -> &'static str {
        match self {
            CombatEvent::DiceRolled { .. } => "dice_rolled",
            CombatEvent::AttackResolved { .. } => "attack_resolved",
            CombatEvent::DamageApplied { .. } => "damage_applied",
            CombatEvent::HealingApplied { .. } => "healing_applied",
            CombatEvent::Death { .. } => "death",
            CombatEvent::InitiativeRolled { .. } => "initiative_rolled",
            CombatEvent::ConcentrationChecked { .. } => "concentration_checked",
            CombatEvent::TurnStarted { .. } => "turn_started",
            CombatEvent::CombatEnded { .. } => "combat_ended",
            CombatEvent::DeathSaveRolled { .. } => "death_save_rolled",
            CombatEvent::Stabilized { .. } => "stabilized",
        }
    }
}

/// Token returned by [`EventBus::subscribe`], used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SubscriptionId(u64);

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sub#{}", self.0)
    }
}

type Listener = Box<dyn FnMut(&CombatEvent)>;

/// Ordered listener registry.
#[derive(Default)]
pub struct EventBus {
    next_id: u64,
    listeners: Vec<(SubscriptionId, Listener)>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a listener after every existing one.
    ///
    /// # Examples
    ///
    /// ```
    /// use skirmish::{CombatEvent, EventBus};
    /// use std::cell::Cell;
    /// use std::rc::Rc;
    ///
    /// let seen = Rc::new(Cell::new(0));
    /// let counter = Rc::clone(&seen);
    /// let mut bus = EventBus::new();
    /// let id = bus.subscribe(move |_| counter.set(counter.get() + 1));
    ///
    /// bus.publish(&CombatEvent::CombatEnded { rounds: 3 });
    /// assert!(bus.unsubscribe(id));
    /// bus.publish(&CombatEvent::CombatEnded { rounds: 3 });
    /// assert_eq!(seen.get(), 1);
    /// ```
    pub fn subscribe<F>(&mut self, listener: F) -> SubscriptionId
    where
        F: FnMut(&CombatEvent) + 'static,
    {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        self.listeners.push((id, Box::new(listener)));
        id
    }

    /// Removes a listener. Returns false if it was already gone.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(existing, _)| *existing != id);
        self.listeners.len() != before
    }

    /// Delivers an event to every listener in subscription order.
    pub fn publish(&mut self, event: &CombatEvent) {
        log::trace!(
            "Publishing {} to {} listener(s)",
            event.name(),
            self.listeners.len()
        );
        for (_, listener) in self.listeners.iter_mut() {
            listener(event);
        }
    }

    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn test_listeners_called_in_subscription_order() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut bus = EventBus::new();
        for tag in ["first", "second", "third"] {
            let log = Rc::clone(&log);
            bus.subscribe(move |event| log.borrow_mut().push((tag, event.name())));
        }

        bus.publish(&CombatEvent::CombatEnded { rounds: 1 });
        assert_eq!(
            *log.borrow(),
            vec![
                ("first", "combat_ended"),
                ("second", "combat_ended"),
                ("third", "combat_ended")
            ]
        );
    }

    #[test]
    fn test_unsubscribe_only_removes_target() {
        let hits = Rc::new(RefCell::new(Vec::new()));
        let mut bus = EventBus::new();
        let a = {
            let hits = Rc::clone(&hits);
            bus.subscribe(move |_| hits.borrow_mut().push('a'))
        };
        {
            let hits = Rc::clone(&hits);
            bus.subscribe(move |_| hits.borrow_mut().push('b'));
        }

        assert!(bus.unsubscribe(a));
        assert!(!bus.unsubscribe(a));
        assert_eq!(bus.len(), 1);

        bus.publish(&CombatEvent::Stabilized {
            creature_id: crate::new_creature_id(),
        });
        assert_eq!(*hits.borrow(), vec!['b']);
    }

    #[test]
    fn test_d20_event_carries_flags() {
        let roll = crate::roll_d20(&mut crate::ScriptedDice::new(vec![20]), 3, Default::default());
        match CombatEvent::from_d20(&roll) {
            CombatEvent::DiceRolled {
                formula,
                total,
                natural_20,
                natural_1,
                ..
            } => {
                assert_eq!(formula, "1d20+3");
                assert_eq!(total, 23);
                assert!(natural_20);
                assert!(!natural_1);
            }
            other => panic!("unexpected {other:?}"),
        }
    }
}
