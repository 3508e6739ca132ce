//! # Rendering Module
//!
//! The presentation side of combat: optional hooks the orchestrator calls
//! after visible changes, and a text battle map for terminals and logs.
//!
//! Nothing in here feeds back into combat state. A missing presenter is the
//! same as one that ignores every call.

pub mod display;

pub use display::*;

use crate::{Creature, CreatureId};
use std::cell::RefCell;
use std::rc::Rc;

/// Callbacks a renderer can implement to follow combat.
///
/// Every method defaults to doing nothing.
pub trait PresentationHooks {
    /// Damage landed; show floating numbers or a hit flash.
    fn on_damage(&mut self, _creature: &Creature, _amount: u32, _critical: bool) {}

    /// Hit points were restored.
    fn on_heal(&mut self, _creature: &Creature, _amount: u32) {}

    /// The creature died.
    ///
    /// This starts the death animation and returns immediately. Combat
    /// bookkeeping continues without waiting for it.
    fn on_death(&mut self, _creature: &Creature) {}

    /// Token data (conditions, HP, position) changed and visuals should resync.
    fn on_token_changed(&mut self, _creature: &Creature) {}
}

impl<T: PresentationHooks + ?Sized> PresentationHooks for Rc<RefCell<T>> {
    fn on_damage(&mut self, creature: &Creature, amount: u32, critical: bool) {
        self.borrow_mut().on_damage(creature, amount, critical);
    }

    fn on_heal(&mut self, creature: &Creature, amount: u32) {
        self.borrow_mut().on_heal(creature, amount);
    }

    fn on_death(&mut self, creature: &Creature) {
        self.borrow_mut().on_death(creature);
    }

    fn on_token_changed(&mut self, creature: &Creature) {
        self.borrow_mut().on_token_changed(creature);
    }
}

/// One call received by a [`PresentationLog`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PresentationCall {
    Damage {
        creature_id: CreatureId,
        amount: u32,
        critical: bool,
    },
    Heal {
        creature_id: CreatureId,
        amount: u32,
    },
    Death {
        creature_id: CreatureId,
    },
    TokenChanged {
        creature_id: CreatureId,
    },
}

/// Presenter that records every call, for headless runs.
#[derive(Debug, Clone, Default)]
pub struct PresentationLog {
    pub calls: Vec<PresentationCall>,
}

impl PresentationLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Death animations started, in order.
    pub fn deaths(&self) -> Vec<CreatureId> {
        self.calls
            .iter()
            .filter_map(|call| match call {
                PresentationCall::Death { creature_id } => Some(*creature_id),
                _ => None,
            })
            .collect()
    }
}

impl PresentationHooks for PresentationLog {
    fn on_damage(&mut self, creature: &Creature, amount: u32, critical: bool) {
        self.calls.push(PresentationCall::Damage {
            creature_id: creature.id,
            amount,
            critical,
        });
    }

    fn on_heal(&mut self, creature: &Creature, amount: u32) {
        self.calls.push(PresentationCall::Heal {
            creature_id: creature.id,
            amount,
        });
    }

    fn on_death(&mut self, creature: &Creature) {
        self.calls.push(PresentationCall::Death {
            creature_id: creature.id,
        });
    }

    fn on_token_changed(&mut self, creature: &Creature) {
        self.calls.push(PresentationCall::TokenChanged {
            creature_id: creature.id,
        });
    }
}
