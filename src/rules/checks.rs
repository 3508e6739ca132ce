//! # Checks
//!
//! Ability checks, saving throws, and the derived numbers spellcasting and
//! concentration depend on.

use super::dice::{roll_d20, D20Roll, DiceRoller, RollMode};
use crate::config::MIN_CONCENTRATION_DC;
use crate::{Ability, DeathSaveOutcome, DeathSaves};
use serde::{Deserialize, Serialize};

/// Outcome of an ability check or saving throw against a DC.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckResult {
    pub ability: Ability,
    pub roll: D20Roll,
    pub dc: i32,
    pub proficient: bool,
    pub success: bool,
}

/// Resolves a d20 check: ability modifier, plus proficiency when proficient.
///
/// # Examples
///
/// ```
/// use skirmish::{resolve_check, Ability, RollMode, ScriptedDice};
///
/// let mut dice = ScriptedDice::new(vec![10]);
/// let result = resolve_check(&mut dice, Ability::Wisdom, 1, 15, Some(3), RollMode::Normal);
/// assert_eq!(result.roll.total, 14);
/// assert!(!result.success);
/// ```
pub fn resolve_check(
    dice: &mut (impl DiceRoller + ?Sized),
    ability: Ability,
    ability_modifier: i32,
    dc: i32,
    proficiency: Option<i32>,
    mode: RollMode,
) -> CheckResult {
    let modifier = ability_modifier + proficiency.unwrap_or(0);
    let roll = roll_d20(dice, modifier, mode);
    let success = roll.total >= dc;
    CheckResult {
        ability,
        roll,
        dc,
        proficient: proficiency.is_some(),
        success,
    }
}

/// Converts an ability score into its modifier.
///
/// # Examples
///
/// ```
/// use skirmish::ability_modifier;
///
/// assert_eq!(ability_modifier(10), 0);
/// assert_eq!(ability_modifier(8), -1);
/// assert_eq!(ability_modifier(17), 3);
/// ```
pub fn ability_modifier(score: i32) -> i32 {
    (score - 10).div_euclid(2)
}

/// Spell save DC: 8 + proficiency + spellcasting modifier.
pub fn spell_save_dc(proficiency_bonus: i32, spellcasting_modifier: i32) -> i32 {
    8 + proficiency_bonus + spellcasting_modifier
}

/// Spell attack bonus: proficiency + spellcasting modifier.
pub fn spell_attack_bonus(proficiency_bonus: i32, spellcasting_modifier: i32) -> i32 {
    proficiency_bonus + spellcasting_modifier
}

/// Concentration save DC after taking damage: the larger of 10 and half the damage.
pub fn concentration_dc(damage: u32) -> i32 {
    ((damage / 2) as i32).max(MIN_CONCENTRATION_DC)
}

/// Number of damage dice a cantrip rolls at a given character level.
pub fn cantrip_dice_count(character_level: u32) -> u32 {
    match character_level {
        0..=4 => 1,
        5..=10 => 2,
        11..=16 => 3,
        _ => 4,
    }
}

/// Passive score: 10 + modifier, plus proficiency when proficient.
pub fn passive_score(ability_modifier: i32, proficiency: Option<i32>) -> i32 {
    10 + ability_modifier + proficiency.unwrap_or(0)
}

/// Rolls the raw d20 for a death saving throw.
pub fn roll_death_save(dice: &mut (impl DiceRoller + ?Sized)) -> D20Roll {
    roll_d20(dice, 0, RollMode::Normal)
}

/// Folds a death save into the running tally.
pub fn process_death_save(saves: DeathSaves, roll: &D20Roll) -> DeathSaveOutcome {
    saves.record(roll.kept)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ScriptedDice;

    #[test]
    fn test_check_meets_dc() {
        let mut dice = ScriptedDice::new(vec![12]);
        let result = resolve_check(&mut dice, Ability::Dexterity, 1, 15, Some(2), RollMode::Normal);
        assert!(result.success);
        assert!(result.proficient);
        assert_eq!(result.roll.total, 15);
    }

    #[test]
    fn test_check_passes_mode_through() {
        let mut dice = ScriptedDice::new(vec![3, 18]);
        let result = resolve_check(&mut dice, Ability::Strength, 0, 10, None, RollMode::Advantage);
        assert_eq!(result.roll.kept, 18);
        assert!(result.success);
    }

    #[test]
    fn test_ability_modifier_rounds_down() {
        assert_eq!(ability_modifier(1), -5);
        assert_eq!(ability_modifier(9), -1);
        assert_eq!(ability_modifier(11), 0);
        assert_eq!(ability_modifier(20), 5);
    }

    #[test]
    fn test_spell_numbers() {
        assert_eq!(spell_save_dc(3, 4), 15);
        assert_eq!(spell_attack_bonus(3, 4), 7);
    }

    #[test]
    fn test_concentration_dc_floor() {
        assert_eq!(concentration_dc(4), 10);
        assert_eq!(concentration_dc(21), 10);
        assert_eq!(concentration_dc(22), 11);
        assert_eq!(concentration_dc(50), 25);
    }

    #[test]
    fn test_cantrip_scaling() {
        assert_eq!(cantrip_dice_count(1), 1);
        assert_eq!(cantrip_dice_count(5), 2);
        assert_eq!(cantrip_dice_count(11), 3);
        assert_eq!(cantrip_dice_count(17), 4);
        assert_eq!(cantrip_dice_count(20), 4);
    }

    #[test]
    fn test_passive_score() {
        assert_eq!(passive_score(2, Some(3)), 15);
        assert_eq!(passive_score(-1, None), 9);
    }

    #[test]
    fn test_death_save_uses_kept_die() {
        let roll = roll_death_save(&mut ScriptedDice::new(vec![1]));
        let outcome = process_death_save(DeathSaves { successes: 0, failures: 1 }, &roll);
        assert_eq!(outcome, DeathSaveOutcome::Died);
    }
}
