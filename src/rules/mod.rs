//! # Rules Module
//!
//! Dice and 5e rule primitives.
//!
//! Everything here is a pure function of its arguments and the dice it is
//! handed. The orchestrator calls into this module; nothing here touches
//! combat state.

pub mod checks;
pub mod dice;

pub use checks::*;
pub use dice::*;

use crate::area::{AoeShape, AreaOfEffect};
use crate::{CombatantStats, Condition, DamageType, GridPosition, HitPoints};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};

/// Mechanical effects a condition imposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ConditionEffects {
    /// The affected creature's attack rolls have advantage
    pub attacks_with_advantage: bool,
    /// The affected creature's attack rolls have disadvantage
    pub attacks_with_disadvantage: bool,
    /// Attacks against the affected creature have advantage
    pub attacked_with_advantage: bool,
    /// Attacks against the affected creature have disadvantage
    pub attacked_with_disadvantage: bool,
    /// Melee hits from within 5 feet are critical
    pub melee_hits_are_critical: bool,
    /// Strength and Dexterity saves fail automatically
    pub fails_str_dex_saves: bool,
    /// Cannot take actions or reactions
    pub incapacitated: bool,
    /// Speed becomes 0
    pub immobile: bool,
}

/// Looks up what a condition does in combat.
///
/// Prone is listed as granting advantage to attackers; the orchestrator turns
/// that into disadvantage for ranged attacks.
pub fn condition_effects(condition: Condition) -> ConditionEffects {
    let none = ConditionEffects::default();
    match condition {
        Condition::Blinded => ConditionEffects {
            attacks_with_disadvantage: true,
            attacked_with_advantage: true,
            ..none
        },
        Condition::Invisible => ConditionEffects {
            attacks_with_advantage: true,
            attacked_with_disadvantage: true,
            ..none
        },
        Condition::Frightened | Condition::Poisoned | Condition::Exhaustion => ConditionEffects {
            attacks_with_disadvantage: true,
            ..none
        },
        Condition::Prone => ConditionEffects {
            attacks_with_disadvantage: true,
            attacked_with_advantage: true,
            ..none
        },
        Condition::Restrained => ConditionEffects {
            attacks_with_disadvantage: true,
            attacked_with_advantage: true,
            immobile: true,
            ..none
        },
        Condition::Grappled => ConditionEffects {
            immobile: true,
            ..none
        },
        Condition::Incapacitated => ConditionEffects {
            incapacitated: true,
            ..none
        },
        Condition::Stunned => ConditionEffects {
            attacked_with_advantage: true,
            fails_str_dex_saves: true,
            incapacitated: true,
            immobile: true,
            ..none
        },
        Condition::Paralyzed | Condition::Unconscious => ConditionEffects {
            attacked_with_advantage: true,
            melee_hits_are_critical: true,
            fails_str_dex_saves: true,
            incapacitated: true,
            immobile: true,
            ..none
        },
        Condition::Petrified => ConditionEffects {
            attacked_with_advantage: true,
            fails_str_dex_saves: true,
            incapacitated: true,
            immobile: true,
            ..none
        },
        Condition::Charmed | Condition::Deafened => none,
    }
}

/// Numbers an attack roll needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AttackInput {
    pub attack_bonus: i32,
    pub target_ac: i32,
    pub advantage: bool,
    pub disadvantage: bool,
}

/// A resolved attack roll.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttackRoll {
    pub roll: D20Roll,
    pub target_ac: i32,
    pub hit: bool,
    pub critical: bool,
}

/// Resolves an attack roll, folding in advantage and disadvantage from both
/// creatures' conditions.
///
/// A natural 20 always hits and is critical; a natural 1 always misses.
pub fn resolve_attack(
    dice: &mut (impl DiceRoller + ?Sized),
    input: &AttackInput,
    attacker_conditions: &BTreeSet<Condition>,
    target_conditions: &BTreeSet<Condition>,
    melee: bool,
) -> AttackRoll {
    let mut advantage = input.advantage;
    let mut disadvantage = input.disadvantage;
    let mut auto_critical = false;

    for effects in attacker_conditions.iter().copied().map(condition_effects) {
        advantage |= effects.attacks_with_advantage;
        disadvantage |= effects.attacks_with_disadvantage;
    }
    for &condition in target_conditions {
        let effects = condition_effects(condition);
        if condition == Condition::Prone && !melee {
            disadvantage = true;
            continue;
        }
        advantage |= effects.attacked_with_advantage;
        disadvantage |= effects.attacked_with_disadvantage;
        auto_critical |= melee && effects.melee_hits_are_critical;
    }

    let roll = roll_d20(dice, input.attack_bonus, RollMode::from_flags(advantage, disadvantage));
    let hit = !roll.natural_1 && (roll.natural_20 || roll.total >= input.target_ac);
    let critical = hit && (roll.natural_20 || auto_critical);
    AttackRoll {
        roll,
        target_ac: input.target_ac,
        hit,
        critical,
    }
}

/// How the target's defenses changed incoming damage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DamageModifier {
    Normal,
    Resisted,
    Vulnerable,
    Immune,
}

/// Rolled damage before defenses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DamageRoll {
    pub roll: RollResult,
    pub critical: bool,
    /// Rolled total, floored at zero
    pub amount: u32,
}

/// Rolls damage dice. A critical hit rolls every damage die twice.
pub fn calculate_damage(
    dice: &mut (impl DiceRoller + ?Sized),
    formula: &DiceFormula,
    critical: bool,
) -> DamageRoll {
    let roll = if critical {
        formula.doubled().roll(dice)
    } else {
        formula.roll(dice)
    };
    let amount = roll.total.max(0) as u32;
    DamageRoll {
        roll,
        critical,
        amount,
    }
}

/// Applies immunity (zero), resistance (halve, rounding down) and
/// vulnerability (double) for one damage type.
///
/// # Examples
///
/// ```
/// use skirmish::{apply_damage_modifiers, CombatantStats, DamageModifier, DamageType};
///
/// let stats = CombatantStats::default().with_resistance(DamageType::Fire);
/// assert_eq!(apply_damage_modifiers(9, DamageType::Fire, &stats), (4, DamageModifier::Resisted));
/// assert_eq!(apply_damage_modifiers(9, DamageType::Cold, &stats), (9, DamageModifier::Normal));
/// ```
pub fn apply_damage_modifiers(
    amount: u32,
    damage_type: DamageType,
    stats: &CombatantStats,
) -> (u32, DamageModifier) {
    if stats.immunities.contains(&damage_type) {
        return (0, DamageModifier::Immune);
    }
    let resisted = stats.resistances.contains(&damage_type);
    let vulnerable = stats.vulnerabilities.contains(&damage_type);
    match (resisted, vulnerable) {
        (true, false) => (amount / 2, DamageModifier::Resisted),
        (false, true) => (amount * 2, DamageModifier::Vulnerable),
        (true, true) => ((amount / 2) * 2, DamageModifier::Normal),
        (false, false) => (amount, DamageModifier::Normal),
    }
}

/// Result of taking damage against a hit point pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HpChange {
    pub hit_points: HitPoints,
    pub absorbed_by_temporary: u32,
    pub hp_lost: u32,
    /// Damage left over after current HP reached 0
    pub excess: u32,
}

/// Takes damage from temporary hit points first, then current hit points.
pub fn apply_damage_to_hp(hit_points: HitPoints, amount: u32) -> HpChange {
    let absorbed_by_temporary = amount.min(hit_points.temporary);
    let remaining = amount - absorbed_by_temporary;
    let hp_lost = remaining.min(hit_points.current);
    HpChange {
        hit_points: HitPoints {
            current: hit_points.current - hp_lost,
            max: hit_points.max,
            temporary: hit_points.temporary - absorbed_by_temporary,
        },
        absorbed_by_temporary,
        hp_lost,
        excess: remaining - hp_lost,
    }
}

/// Heals up to max HP, returning the new pool and the healing actually delivered.
pub fn apply_healing_to_hp(hit_points: HitPoints, amount: u32) -> (HitPoints, u32) {
    let current = hit_points.current.saturating_add(amount).min(hit_points.max);
    let healed = current.saturating_sub(hit_points.current);
    (
        HitPoints {
            current,
            ..hit_points
        },
        healed,
    )
}

/// Massive damage: left-over damage of at least max HP kills outright.
pub fn check_instant_death(max_hp: u32, excess_damage: u32) -> bool {
    excess_damage > 0 && excess_damage >= max_hp
}

/// Rolls initiative: d20 + Dexterity modifier + any flat bonus.
pub fn roll_initiative(
    dice: &mut (impl DiceRoller + ?Sized),
    dexterity_modifier: i32,
    bonus: i32,
    advantage: bool,
) -> D20Roll {
    let mode = if advantage {
        RollMode::Advantage
    } else {
        RollMode::Normal
    };
    roll_d20(dice, dexterity_modifier + bonus, mode)
}

/// Tiles covered by an area effect given bare shape parameters.
pub fn aoe_tiles(
    shape: AoeShape,
    origin: GridPosition,
    size_feet: u32,
    direction: Option<f64>,
) -> HashSet<GridPosition> {
    let mut aoe = AreaOfEffect::new(shape, origin, size_feet);
    aoe.direction = direction;
    aoe.affected_tiles()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn conditions(list: &[Condition]) -> BTreeSet<Condition> {
        list.iter().copied().collect()
    }

    fn input(bonus: i32, ac: i32) -> AttackInput {
        AttackInput {
            attack_bonus: bonus,
            target_ac: ac,
            ..AttackInput::default()
        }
    }

    #[test]
    fn test_attack_hits_on_meeting_ac() {
        let mut dice = ScriptedDice::new(vec![10]);
        let result = resolve_attack(
            &mut dice,
            &input(5, 15),
            &conditions(&[]),
            &conditions(&[]),
            true,
        );
        assert!(result.hit);
        assert!(!result.critical);
    }

    #[test]
    fn test_natural_one_always_misses() {
        let mut dice = ScriptedDice::new(vec![1]);
        let result = resolve_attack(
            &mut dice,
            &input(30, 5),
            &conditions(&[]),
            &conditions(&[]),
            true,
        );
        assert!(!result.hit);
    }

    #[test]
    fn test_natural_twenty_always_crits() {
        let mut dice = ScriptedDice::new(vec![20]);
        let result = resolve_attack(
            &mut dice,
            &input(0, 30),
            &conditions(&[]),
            &conditions(&[]),
            false,
        );
        assert!(result.hit);
        assert!(result.critical);
    }

    #[test]
    fn test_invisible_attacker_gets_advantage() {
        let mut dice = ScriptedDice::new(vec![3, 17]);
        let result = resolve_attack(
            &mut dice,
            &input(0, 15),
            &conditions(&[Condition::Invisible]),
            &conditions(&[]),
            true,
        );
        assert_eq!(result.roll.mode, RollMode::Advantage);
        assert!(result.hit);
    }

    #[test]
    fn test_restrained_target_cancels_poisoned_attacker() {
        let mut dice = ScriptedDice::new(vec![12]);
        let result = resolve_attack(
            &mut dice,
            &input(0, 10),
            &conditions(&[Condition::Poisoned]),
            &conditions(&[Condition::Restrained]),
            true,
        );
        assert_eq!(result.roll.mode, RollMode::Normal);
        assert_eq!(result.roll.rolls.len(), 1);
    }

    #[test]
    fn test_prone_target_depends_on_range() {
        let prone = conditions(&[Condition::Prone]);
        let mut dice = ScriptedDice::new(vec![10, 10]);
        let melee = resolve_attack(&mut dice, &input(0, 10), &conditions(&[]), &prone, true);
        assert_eq!(melee.roll.mode, RollMode::Advantage);
        let ranged = resolve_attack(&mut dice, &input(0, 10), &conditions(&[]), &prone, false);
        assert_eq!(ranged.roll.mode, RollMode::Disadvantage);
    }

    #[test]
    fn test_melee_hit_on_unconscious_is_critical() {
        let mut dice = ScriptedDice::new(vec![12, 14]);
        let result = resolve_attack(
            &mut dice,
            &input(2, 12),
            &conditions(&[]),
            &conditions(&[Condition::Unconscious]),
            true,
        );
        assert!(result.hit);
        assert!(result.critical);
    }

    #[test]
    fn test_critical_damage_doubles_dice() {
        let mut dice = ScriptedDice::new(vec![3]);
        let result = calculate_damage(&mut dice, &DiceFormula::new(1, 8, 2), true);
        assert_eq!(result.roll.rolls.len(), 2);
        assert_eq!(result.amount, 8);
    }

    #[test]
    fn test_damage_modifiers() {
        let stats = CombatantStats::default()
            .with_vulnerability(DamageType::Radiant)
            .with_immunity(DamageType::Poison);
        assert_eq!(
            apply_damage_modifiers(7, DamageType::Radiant, &stats),
            (14, DamageModifier::Vulnerable)
        );
        assert_eq!(
            apply_damage_modifiers(7, DamageType::Poison, &stats),
            (0, DamageModifier::Immune)
        );
    }

    #[test]
    fn test_temporary_hp_absorbs_first() {
        let hp = HitPoints {
            current: 10,
            max: 10,
            temporary: 5,
        };
        let change = apply_damage_to_hp(hp, 8);
        assert_eq!(change.absorbed_by_temporary, 5);
        assert_eq!(change.hit_points.temporary, 0);
        assert_eq!(change.hit_points.current, 7);
        assert_eq!(change.excess, 0);
    }

    #[test]
    fn test_excess_damage_reported() {
        let change = apply_damage_to_hp(HitPoints::full(10), 25);
        assert_eq!(change.hit_points.current, 0);
        assert_eq!(change.hp_lost, 10);
        assert_eq!(change.excess, 15);
        assert!(check_instant_death(10, change.excess));
        assert!(!check_instant_death(20, change.excess));
    }

    #[test]
    fn test_healing_clamps_to_max() {
        let hp = HitPoints {
            current: 30,
            max: 50,
            temporary: 0,
        };
        let (healed, actual) = apply_healing_to_hp(hp, 100);
        assert_eq!(healed.current, 50);
        assert_eq!(actual, 20);
    }

    #[test]
    fn test_initiative_adds_dex_and_bonus() {
        let mut dice = ScriptedDice::new(vec![11]);
        let roll = roll_initiative(&mut dice, 3, 1, false);
        assert_eq!(roll.total, 15);
    }
}
