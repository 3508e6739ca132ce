//! # Combat State Module
//!
//! The combat orchestrator: registry of combatants, dice-driven resolution of
//! attacks, damage, healing, checks and death, and initiative/turn progression.
//!
//! The orchestrator exclusively owns the creature and stats registries. Every
//! operation validates its inputs before touching state, so a returned error
//! means nothing changed. Events go to subscribers synchronously, in emission
//! order, before the operation returns.

use super::events::{CombatEvent, EventBus, SubscriptionId};
use super::turns::{
    CombatPhase, DeathSaveOutcome, DeathSaves, InitiativeEntry, TurnAdvance, TurnOrder,
};
use crate::config::DEFAULT_SEED;
use crate::rendering::PresentationHooks;
use crate::rules::{
    self, apply_damage_modifiers, apply_damage_to_hp, apply_healing_to_hp, calculate_damage,
    check_instant_death, concentration_dc, condition_effects, passive_score, process_death_save,
    resolve_check, roll_death_save, AttackInput, AttackRoll, CheckResult, D20Roll, DamageModifier,
    DiceFormula, DiceRoller, HpChange, RandomDice, RollMode, RollResult,
};
use crate::utils::{
    calculate_reachable_tiles, check_opportunity_attacks, find_path, occupied_squares, PathResult,
    ReachableTiles,
};
use crate::{
    Ability, CombatantStats, Condition, Creature, CreatureId, CreatureKind, DamageType,
    GridBounds, GridPosition, LifeState, Skill, SkirmishError, SkirmishResult, TerrainMap,
};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Tunable combat rules.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CombatConfig {
    /// Seed for the default dice
    pub seed: u64,
    /// Whether left-over damage of at least max HP kills outright
    pub massive_damage: bool,
    /// Whether monsters and non-player characters die at 0 HP instead of dying
    pub non_player_death_at_zero: bool,
    /// Whether damage taken while dying adds death save failures
    pub damage_while_dying_fails_saves: bool,
    /// Size of one square in world units, for template outlines
    pub tile_size: f64,
}

impl CombatConfig {
    /// Standard rules with the given dice seed.
    ///
    /// # Examples
    ///
    /// ```
    /// use skirmish::CombatConfig;
    ///
    /// let config = CombatConfig::new(7);
    /// assert_eq!(config.seed, 7);
    /// assert!(config.massive_damage);
    /// ```
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            massive_damage: true,
            non_player_death_at_zero: true,
            damage_while_dying_fails_saves: true,
            tile_size: crate::config::DEFAULT_TILE_SIZE,
        }
    }

    /// Standard rules with a fixed seed and small tiles.
    pub fn for_testing() -> Self {
        Self {
            tile_size: 10.0,
            ..Self::new(42)
        }
    }

    pub fn to_json(&self) -> SkirmishResult<String> {
        serde_json::to_string_pretty(self).map_err(SkirmishError::from)
    }

    pub fn from_json(json: &str) -> SkirmishResult<Self> {
        serde_json::from_str(json).map_err(SkirmishError::from)
    }
}

impl Default for CombatConfig {
    fn default() -> Self {
        Self::new(DEFAULT_SEED)
    }
}

/// Situational inputs to an attack.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttackOptions {
    pub advantage: bool,
    pub disadvantage: bool,
    /// Added on top of the attacker's own attack bonus
    pub bonus: i32,
    /// Whether the attacker is within melee reach
    pub melee: bool,
}

impl AttackOptions {
    pub fn melee() -> Self {
        Self {
            advantage: false,
            disadvantage: false,
            bonus: 0,
            melee: true,
        }
    }

    pub fn ranged() -> Self {
        Self {
            melee: false,
            ..Self::melee()
        }
    }

    pub fn with_advantage(mut self) -> Self {
        self.advantage = true;
        self
    }

    pub fn with_disadvantage(mut self) -> Self {
        self.disadvantage = true;
        self
    }

    pub fn with_bonus(mut self, bonus: i32) -> Self {
        self.bonus = bonus;
        self
    }
}

impl Default for AttackOptions {
    fn default() -> Self {
        Self::melee()
    }
}

/// What a damage application did to its target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DamageOutcome {
    /// Damage before resistances
    pub rolled: u32,
    /// Damage after resistances
    pub amount: u32,
    pub modifier: DamageModifier,
    pub hp_change: HpChange,
    /// The target began dying
    pub fell_unconscious: bool,
    pub killed: bool,
    pub instant_death: bool,
}

/// Result of moving a creature along a path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MoveOutcome {
    pub path: PathResult,
    /// Creatures whose reach the mover left
    pub provoked: Vec<CreatureId>,
}

#[derive(Serialize)]
struct RosterEntry<'a> {
    creature: &'a Creature,
    stats: &'a CombatantStats,
}

/// Owns combat state for one encounter.
///
/// # Examples
///
/// ```
/// use skirmish::{
///     AbilityModifiers, CombatConfig, CombatOrchestrator, CombatantStats, Creature, CreatureKind,
///     GridPosition,
/// };
///
/// let mut combat = CombatOrchestrator::new(CombatConfig::default());
/// let hero = Creature::new("Aria", CreatureKind::PlayerCharacter, GridPosition::new(0, 0), 20);
/// let id = combat.register(hero, CombatantStats::new(AbilityModifiers::default(), 2));
///
/// assert_eq!(combat.heal(id, 5).unwrap(), 0);
/// assert_eq!(combat.creature(id).unwrap().hit_points.current, 20);
/// ```
pub struct CombatOrchestrator<D = RandomDice> {
    config: CombatConfig,
    dice: D,
    creatures: HashMap<CreatureId, Creature>,
    stats: HashMap<CreatureId, CombatantStats>,
    /// Registration order, used as the stable tie-break for initiative
    roster: Vec<CreatureId>,
    phase: CombatPhase,
    death_saves: HashMap<CreatureId, DeathSaves>,
    events: EventBus,
    presenter: Option<Box<dyn PresentationHooks>>,
}

impl CombatOrchestrator<RandomDice> {
    /// Creates an orchestrator with seeded random dice.
    pub fn new(config: CombatConfig) -> Self {
        let dice = RandomDice::seeded(config.seed);
        Self::with_dice(config, dice)
    }
}

impl<D: DiceRoller> CombatOrchestrator<D> {
    /// Creates an orchestrator drawing from the given dice.
    pub fn with_dice(config: CombatConfig, dice: D) -> Self {
        Self {
            config,
            dice,
            creatures: HashMap::new(),
            stats: HashMap::new(),
            roster: Vec::new(),
            phase: CombatPhase::default(),
            death_saves: HashMap::new(),
            events: EventBus::new(),
            presenter: None,
        }
    }

    pub fn config(&self) -> &CombatConfig {
        &self.config
    }

    pub fn dice_mut(&mut self) -> &mut D {
        &mut self.dice
    }

    // Events and presentation

    /// Adds an event listener.
    pub fn subscribe<F>(&mut self, listener: F) -> SubscriptionId
    where
        F: FnMut(&CombatEvent) + 'static,
    {
        self.events.subscribe(listener)
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.events.unsubscribe(id)
    }

    /// Attaches a presenter, replacing any previous one.
    pub fn set_presenter(&mut self, presenter: impl PresentationHooks + 'static) {
        self.presenter = Some(Box::new(presenter));
    }

    pub fn clear_presenter(&mut self) {
        self.presenter = None;
    }

    fn emit(&mut self, event: CombatEvent) {
        self.events.publish(&event);
    }

    fn present(
        &mut self,
        id: CreatureId,
        call: impl FnOnce(&mut dyn PresentationHooks, &Creature),
    ) {
        if let (Some(presenter), Some(creature)) =
            (self.presenter.as_mut(), self.creatures.get(&id))
        {
            call(&mut **presenter, creature);
        }
    }

    // Registry

    /// Registers a creature with its stats, overwriting any earlier
    /// registration under the same id. Current hit points above the maximum
    /// are capped.
    pub fn register(&mut self, mut creature: Creature, stats: CombatantStats) -> CreatureId {
        let id = creature.id;
        creature.hit_points = creature.hit_points.clamped();
        if self.creatures.insert(id, creature).is_some() {
            debug!("Re-registered creature {id}");
            self.death_saves.remove(&id);
        } else {
            self.roster.push(id);
            info!("Registered creature {id}");
        }
        self.stats.insert(id, stats);
        id
    }

    /// Removes a creature and everything tracked for it.
    pub fn unregister(&mut self, id: CreatureId) -> SkirmishResult<Creature> {
        let creature = self
            .creatures
            .remove(&id)
            .ok_or_else(|| SkirmishError::creature_not_found(id))?;
        self.stats.remove(&id);
        self.death_saves.remove(&id);
        self.roster.retain(|existing| *existing != id);
        self.phase.remove_creature(id);
        info!("Unregistered {} ({id})", creature.name);
        Ok(creature)
    }

    /// Replaces the stored snapshot of a registered creature, capping current
    /// hit points at the maximum.
    pub fn update_creature(&mut self, mut creature: Creature) -> SkirmishResult<()> {
        let id = creature.id;
        let slot = self
            .creatures
            .get_mut(&id)
            .ok_or_else(|| SkirmishError::creature_not_found(id))?;
        creature.hit_points = creature.hit_points.clamped();
        *slot = creature;
        self.present(id, |p, c| p.on_token_changed(c));
        Ok(())
    }

    /// Replaces the stats of a registered creature.
    pub fn update_stats(&mut self, id: CreatureId, stats: CombatantStats) -> SkirmishResult<()> {
        if !self.creatures.contains_key(&id) {
            return Err(SkirmishError::creature_not_found(id));
        }
        self.stats.insert(id, stats);
        Ok(())
    }

    pub fn creature(&self, id: CreatureId) -> Option<&Creature> {
        self.creatures.get(&id)
    }

    pub fn stats(&self, id: CreatureId) -> Option<&CombatantStats> {
        self.stats.get(&id)
    }

    /// Registered creatures in registration order.
    pub fn creatures(&self) -> impl Iterator<Item = &Creature> + '_ {
        self.roster.iter().filter_map(|id| self.creatures.get(id))
    }

    pub fn len(&self) -> usize {
        self.creatures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.creatures.is_empty()
    }

    fn creature_ref(&self, id: CreatureId) -> SkirmishResult<&Creature> {
        self.creatures
            .get(&id)
            .ok_or_else(|| SkirmishError::creature_not_found(id))
    }

    fn creature_mut(&mut self, id: CreatureId) -> SkirmishResult<&mut Creature> {
        self.creatures
            .get_mut(&id)
            .ok_or_else(|| SkirmishError::creature_not_found(id))
    }

    fn stats_ref(&self, id: CreatureId) -> SkirmishResult<&CombatantStats> {
        self.creature_ref(id)?;
        self.stats
            .get(&id)
            .ok_or_else(|| SkirmishError::stats_not_found(id))
    }

    // Dice

    /// Rolls a dice formula such as `2d6+3`.
    pub fn roll_formula(&mut self, formula: &str) -> SkirmishResult<RollResult> {
        let formula: DiceFormula = formula.parse()?;
        Ok(self.roll(&formula))
    }

    pub fn roll(&mut self, formula: &DiceFormula) -> RollResult {
        let result = formula.roll(&mut self.dice);
        self.emit(CombatEvent::from_roll(&result));
        result
    }

    /// Rolls a d20 plus modifier, flagging natural 20 and natural 1.
    pub fn roll_d20(&mut self, modifier: i32, mode: RollMode) -> D20Roll {
        let roll = rules::roll_d20(&mut self.dice, modifier, mode);
        self.emit(CombatEvent::from_d20(&roll));
        roll
    }

    // Attacks and damage

    /// Resolves an attack roll from one creature against another.
    ///
    /// Conditions on both creatures add advantage or disadvantage on top of
    /// the options given.
    pub fn attack(
        &mut self,
        attacker_id: CreatureId,
        target_id: CreatureId,
        options: AttackOptions,
    ) -> SkirmishResult<AttackRoll> {
        let attack_bonus = self.stats_ref(attacker_id)?.attack_bonus;
        let attacker_conditions = self.creature_ref(attacker_id)?.conditions.clone();
        let target = self.creature_ref(target_id)?;
        let target_conditions = target.conditions.clone();
        let input = AttackInput {
            attack_bonus: attack_bonus + options.bonus,
            target_ac: target.armor_class,
            advantage: options.advantage,
            disadvantage: options.disadvantage,
        };

        let attack = rules::resolve_attack(
            &mut self.dice,
            &input,
            &attacker_conditions,
            &target_conditions,
            options.melee,
        );
        debug!(
            "{attacker_id} attacks {target_id}: {} vs AC {} ({})",
            attack.roll.total,
            attack.target_ac,
            if attack.critical {
                "critical"
            } else if attack.hit {
                "hit"
            } else {
                "miss"
            }
        );
        self.emit(CombatEvent::from_d20(&attack.roll));
        self.emit(CombatEvent::AttackResolved {
            attacker_id,
            target_id,
            attack: attack.clone(),
        });
        Ok(attack)
    }

    /// Rolls damage and applies it to a creature.
    ///
    /// A critical hit rolls every damage die twice.
    pub fn apply_damage(
        &mut self,
        target_id: CreatureId,
        formula: &DiceFormula,
        damage_type: Option<DamageType>,
        critical: bool,
    ) -> SkirmishResult<DamageOutcome> {
        self.check_damageable(target_id)?;
        let damage = calculate_damage(&mut self.dice, formula, critical);
        self.emit(CombatEvent::from_roll(&damage.roll));
        self.apply_raw_damage(target_id, damage.amount, damage_type, critical)
    }

    /// Applies a fixed amount of damage to a creature.
    pub fn apply_raw_damage(
        &mut self,
        target_id: CreatureId,
        rolled: u32,
        damage_type: Option<DamageType>,
        critical: bool,
    ) -> SkirmishResult<DamageOutcome> {
        self.check_damageable(target_id)?;
        let (amount, modifier) = match (damage_type, self.stats.get(&target_id)) {
            (Some(damage_type), Some(stats)) => apply_damage_modifiers(rolled, damage_type, stats),
            _ => (rolled, DamageModifier::Normal),
        };

        let target = self.creature_mut(target_id)?;
        let prior_life = target.life;
        let kind = target.kind;
        let hp_change = apply_damage_to_hp(target.hit_points, amount);
        target.hit_points = hp_change.hit_points;
        let reached_hp = amount > hp_change.absorbed_by_temporary;

        self.emit(CombatEvent::DamageApplied {
            creature_id: target_id,
            amount,
            damage_type,
            modifier,
            critical,
            absorbed_by_temporary: hp_change.absorbed_by_temporary,
            hit_points: hp_change.hit_points,
        });
        self.present(target_id, |p, c| p.on_damage(c, amount, critical));

        let mut outcome = DamageOutcome {
            rolled,
            amount,
            modifier,
            hp_change,
            fell_unconscious: false,
            killed: false,
            instant_death: false,
        };
        if !reached_hp || hp_change.hit_points.current > 0 {
            return Ok(outcome);
        }

        let max_hp = hp_change.hit_points.max;
        if self.config.massive_damage && check_instant_death(max_hp, hp_change.excess) {
            self.handle_death(target_id, true);
            outcome.killed = true;
            outcome.instant_death = true;
            return Ok(outcome);
        }

        match prior_life {
            LifeState::Dying | LifeState::Stable => {
                if self.config.damage_while_dying_fails_saves {
                    let failures = if critical { 2 } else { 1 };
                    outcome.killed = self.fail_death_saves(target_id, failures);
                }
            }
            _ if kind != CreatureKind::PlayerCharacter && self.config.non_player_death_at_zero => {
                self.handle_death(target_id, false);
                outcome.killed = true;
            }
            _ => {
                self.fall_unconscious(target_id);
                outcome.fell_unconscious = true;
            }
        }
        Ok(outcome)
    }

    fn check_damageable(&self, id: CreatureId) -> SkirmishResult<()> {
        if self.creature_ref(id)?.life == LifeState::Dead {
            return Err(SkirmishError::InvalidState(format!(
                "creature {id} is already dead"
            )));
        }
        Ok(())
    }

    fn fall_unconscious(&mut self, id: CreatureId) {
        if let Some(creature) = self.creatures.get_mut(&id) {
            creature.life = LifeState::Dying;
            creature.conditions.insert(Condition::Unconscious);
            creature.end_concentration();
            info!("{} falls unconscious and is dying", creature.name);
        }
        self.death_saves.insert(id, DeathSaves::default());
        self.present(id, |p, c| p.on_token_changed(c));
    }

    /// Adds failures for damage taken at 0 HP. Returns whether the creature died.
    fn fail_death_saves(&mut self, id: CreatureId, failures: u8) -> bool {
        let saves = self.death_saves.get(&id).copied().unwrap_or_default();
        match saves.fail(failures) {
            DeathSaveOutcome::Died => {
                self.handle_death(id, false);
                true
            }
            DeathSaveOutcome::Pending(saves) => {
                self.death_saves.insert(id, saves);
                if let Some(creature) = self.creatures.get_mut(&id) {
                    creature.life = LifeState::Dying;
                }
                debug!("Creature {id} takes damage while dying: {saves:?}");
                false
            }
            DeathSaveOutcome::Revived | DeathSaveOutcome::Stabilized => false,
        }
    }

    /// Shared death path for damage and failed death saves.
    fn handle_death(&mut self, id: CreatureId, was_instant_death: bool) {
        if let Some(creature) = self.creatures.get_mut(&id) {
            creature.life = LifeState::Dead;
            creature.hit_points.current = 0;
            creature.end_concentration();
            info!(
                "{} dies{}",
                creature.name,
                if was_instant_death { " instantly" } else { "" }
            );
        }
        self.death_saves.remove(&id);
        self.phase.remove_creature(id);
        self.emit(CombatEvent::Death {
            creature_id: id,
            was_instant_death,
        });
        self.present(id, |p, c| p.on_death(c));
    }

    /// Restores hit points, up to max. Returns the healing actually delivered.
    ///
    /// Healing a dying or stable creature brings it back to consciousness.
    pub fn heal(&mut self, target_id: CreatureId, amount: u32) -> SkirmishResult<u32> {
        let target = self
            .creatures
            .get_mut(&target_id)
            .ok_or_else(|| SkirmishError::creature_not_found(target_id))?;
        if target.life == LifeState::Dead {
            return Err(SkirmishError::InvalidState(format!(
                "creature {target_id} is dead and cannot be healed"
            )));
        }
        let (hit_points, healed) = apply_healing_to_hp(target.hit_points, amount);
        if healed == 0 {
            return Ok(0);
        }
        target.hit_points = hit_points;
        if matches!(target.life, LifeState::Dying | LifeState::Stable) {
            target.life = LifeState::Conscious;
            target.conditions.remove(&Condition::Unconscious);
            self.death_saves.remove(&target_id);
            info!("{} regains consciousness", target.name);
        }

        self.emit(CombatEvent::HealingApplied {
            creature_id: target_id,
            amount: healed,
            hit_points,
        });
        self.present(target_id, |p, c| p.on_heal(c, healed));
        Ok(healed)
    }

    // Initiative and turns

    /// Rolls initiative for every living registered creature and starts
    /// combat, replacing any order already running.
    pub fn roll_initiative_for_all(
        &mut self,
        advantage: bool,
    ) -> SkirmishResult<Vec<InitiativeEntry>> {
        let contenders: Vec<(CreatureId, i32)> = self
            .roster
            .iter()
            .filter(|id| self.creatures.get(*id).is_some_and(Creature::is_alive))
            .map(|id| {
                let dexterity = self
                    .stats
                    .get(id)
                    .map(|stats| stats.modifier(Ability::Dexterity))
                    .unwrap_or(0);
                (*id, dexterity)
            })
            .collect();
        if contenders.is_empty() {
            return Err(SkirmishError::InvalidState(
                "no living creatures to roll initiative for".to_string(),
            ));
        }

        let mut entries = Vec::with_capacity(contenders.len());
        for (id, dexterity) in contenders {
            let roll = rules::roll_initiative(&mut self.dice, dexterity, 0, advantage);
            self.emit(CombatEvent::from_d20(&roll));
            if let Some(creature) = self.creatures.get_mut(&id) {
                creature.initiative = Some(roll.total);
            }
            entries.push(InitiativeEntry {
                creature_id: id,
                rolled: roll.kept,
                modifier: dexterity,
                total: roll.total,
            });
        }

        let order = self.phase.start(entries).entries().to_vec();
        info!("Combat started with {} combatants", order.len());
        self.emit(CombatEvent::InitiativeRolled {
            order: order.clone(),
        });
        if let Some(first) = order.first() {
            self.emit(CombatEvent::TurnStarted {
                creature_id: first.creature_id,
                round: 1,
            });
        }
        Ok(order)
    }

    /// Advances to the next creature's turn.
    pub fn next_turn(&mut self) -> SkirmishResult<TurnAdvance> {
        let advance = self.phase.advance()?;
        if advance.new_round {
            info!("Round {} begins", advance.round);
        }
        debug!("Turn passes to {}", advance.creature_id);
        self.emit(CombatEvent::TurnStarted {
            creature_id: advance.creature_id,
            round: advance.round,
        });
        Ok(advance)
    }

    /// Leaves combat. Returns the rounds fought, or `None` if no combat was
    /// running.
    pub fn end_combat(&mut self) -> Option<u32> {
        let rounds = self.phase.end()?;
        info!("Combat ended after {rounds} round(s)");
        self.emit(CombatEvent::CombatEnded { rounds });
        Some(rounds)
    }

    pub fn is_in_combat(&self) -> bool {
        self.phase.is_active()
    }

    pub fn turn_order(&self) -> Option<&TurnOrder> {
        self.phase.turn_order()
    }

    pub fn current_creature(&self) -> Option<CreatureId> {
        self.phase.turn_order().and_then(TurnOrder::current_creature)
    }

    pub fn round(&self) -> Option<u32> {
        self.phase.turn_order().map(TurnOrder::round)
    }

    // Checks and saves

    /// Rolls a saving throw. Proficiency applies when the creature is
    /// proficient in that save.
    ///
    /// Conditions that fail Strength and Dexterity saves still roll but
    /// never succeed.
    pub fn saving_throw(
        &mut self,
        id: CreatureId,
        ability: Ability,
        dc: i32,
        mode: RollMode,
    ) -> SkirmishResult<CheckResult> {
        let stats = self.stats_ref(id)?;
        let modifier = stats.modifier(ability);
        let proficiency = stats
            .is_proficient_in_save(ability)
            .then_some(stats.proficiency_bonus);
        let auto_fail = matches!(ability, Ability::Strength | Ability::Dexterity)
            && self
                .creature_ref(id)?
                .conditions
                .iter()
                .any(|c| condition_effects(*c).fails_str_dex_saves);

        let mut result = resolve_check(&mut self.dice, ability, modifier, dc, proficiency, mode);
        if auto_fail {
            result.success = false;
        }
        self.emit(CombatEvent::from_d20(&result.roll));
        Ok(result)
    }

    /// Rolls a raw ability check.
    pub fn ability_check(
        &mut self,
        id: CreatureId,
        ability: Ability,
        dc: i32,
        mode: RollMode,
    ) -> SkirmishResult<CheckResult> {
        let modifier = self.stats_ref(id)?.modifier(ability);
        let result = resolve_check(&mut self.dice, ability, modifier, dc, None, mode);
        self.emit(CombatEvent::from_d20(&result.roll));
        Ok(result)
    }

    /// Rolls a skill check using the skill's governing ability.
    pub fn skill_check(
        &mut self,
        id: CreatureId,
        skill: Skill,
        dc: i32,
        mode: RollMode,
    ) -> SkirmishResult<CheckResult> {
        let stats = self.stats_ref(id)?;
        let ability = skill.ability();
        let modifier = stats.modifier(ability);
        let proficiency = stats
            .is_proficient_in_skill(skill)
            .then_some(stats.proficiency_bonus);
        let result = resolve_check(&mut self.dice, ability, modifier, dc, proficiency, mode);
        self.emit(CombatEvent::from_d20(&result.roll));
        Ok(result)
    }

    /// Passive score for a skill, e.g. passive Perception.
    pub fn passive_score(&self, id: CreatureId, skill: Skill) -> SkirmishResult<i32> {
        let stats = self.stats_ref(id)?;
        let proficiency = stats
            .is_proficient_in_skill(skill)
            .then_some(stats.proficiency_bonus);
        Ok(passive_score(stats.modifier(skill.ability()), proficiency))
    }

    /// Starts concentrating on an effect.
    pub fn begin_concentration(
        &mut self,
        id: CreatureId,
        target: Option<CreatureId>,
    ) -> SkirmishResult<()> {
        let creature = self.creature_mut(id)?;
        creature.begin_concentration(target);
        debug!("{} begins concentrating", creature.name);
        self.present(id, |p, c| p.on_token_changed(c));
        Ok(())
    }

    /// Constitution save to keep concentrating after taking damage.
    ///
    /// Failure ends concentration. The check event is raised either way.
    pub fn concentration_check(
        &mut self,
        id: CreatureId,
        damage: u32,
    ) -> SkirmishResult<CheckResult> {
        let stats = self.stats_ref(id)?;
        let modifier = stats.modifier(Ability::Constitution);
        let proficiency = stats
            .is_proficient_in_save(Ability::Constitution)
            .then_some(stats.proficiency_bonus);
        if !self.creature_ref(id)?.concentrating {
            return Err(SkirmishError::InvalidState(format!(
                "creature {id} is not concentrating"
            )));
        }

        let dc = concentration_dc(damage);
        let check = resolve_check(
            &mut self.dice,
            Ability::Constitution,
            modifier,
            dc,
            proficiency,
            RollMode::Normal,
        );
        self.emit(CombatEvent::from_d20(&check.roll));

        let maintained = check.success;
        if !maintained {
            if let Some(creature) = self.creatures.get_mut(&id) {
                creature.end_concentration();
                info!("{} loses concentration", creature.name);
            }
        }
        self.emit(CombatEvent::ConcentrationChecked {
            creature_id: id,
            damage,
            check: check.clone(),
            maintained,
        });
        if !maintained {
            self.present(id, |p, c| p.on_token_changed(c));
        }
        Ok(check)
    }

    // Death saves

    /// Rolls a death saving throw for a dying creature.
    pub fn death_save(&mut self, id: CreatureId) -> SkirmishResult<DeathSaveOutcome> {
        if self.creature_ref(id)?.life != LifeState::Dying {
            return Err(SkirmishError::InvalidState(format!(
                "creature {id} is not dying"
            )));
        }

        let roll = roll_death_save(&mut self.dice);
        self.emit(CombatEvent::from_d20(&roll));
        let saves = self.death_saves.get(&id).copied().unwrap_or_default();
        let outcome = process_death_save(saves, &roll);
        let tally = match outcome {
            DeathSaveOutcome::Pending(saves) => saves,
            _ => DeathSaves::default(),
        };
        self.emit(CombatEvent::DeathSaveRolled {
            creature_id: id,
            roll: roll.kept,
            saves: tally,
        });

        match outcome {
            DeathSaveOutcome::Pending(saves) => {
                self.death_saves.insert(id, saves);
            }
            DeathSaveOutcome::Revived => {
                self.death_saves.remove(&id);
                let mut hit_points = None;
                if let Some(creature) = self.creatures.get_mut(&id) {
                    creature.hit_points.current = 1;
                    creature.life = LifeState::Conscious;
                    creature.conditions.remove(&Condition::Unconscious);
                    hit_points = Some(creature.hit_points);
                    info!("{} rolls a natural 20 and regains 1 HP", creature.name);
                }
                if let Some(hit_points) = hit_points {
                    self.emit(CombatEvent::HealingApplied {
                        creature_id: id,
                        amount: 1,
                        hit_points,
                    });
                }
                self.present(id, |p, c| p.on_heal(c, 1));
            }
            DeathSaveOutcome::Stabilized => {
                self.death_saves.remove(&id);
                if let Some(creature) = self.creatures.get_mut(&id) {
                    creature.life = LifeState::Stable;
                    info!("{} is stable", creature.name);
                }
                self.emit(CombatEvent::Stabilized { creature_id: id });
                self.present(id, |p, c| p.on_token_changed(c));
            }
            DeathSaveOutcome::Died => self.handle_death(id, false),
        }
        Ok(outcome)
    }

    /// Current death save tally, if the creature has rolled any.
    pub fn death_saves(&self, id: CreatureId) -> Option<DeathSaves> {
        self.death_saves.get(&id).copied()
    }

    // Conditions

    /// Adds a condition. Returns false if it was already present.
    pub fn add_condition(&mut self, id: CreatureId, condition: Condition) -> SkirmishResult<bool> {
        let added = self.creature_mut(id)?.conditions.insert(condition);
        if added {
            debug!("Creature {id} gains {condition:?}");
            self.present(id, |p, c| p.on_token_changed(c));
        }
        Ok(added)
    }

    /// Removes a condition. Returns false if it was not present.
    pub fn remove_condition(
        &mut self,
        id: CreatureId,
        condition: Condition,
    ) -> SkirmishResult<bool> {
        let removed = self.creature_mut(id)?.conditions.remove(&condition);
        if removed {
            debug!("Creature {id} loses {condition:?}");
            self.present(id, |p, c| p.on_token_changed(c));
        }
        Ok(removed)
    }

    // Movement

    /// Squares a creature can reach this turn with its walking speed.
    ///
    /// Conditions that leave a creature immobile reduce its reach to nothing.
    pub fn reachable_for(
        &self,
        id: CreatureId,
        terrain: &TerrainMap,
        bounds: GridBounds,
    ) -> SkirmishResult<ReachableTiles> {
        let mover = self.creature_ref(id)?;
        let others = self.others(id);
        Ok(calculate_reachable_tiles(
            mover.position,
            self.movement_budget(mover),
            terrain,
            &others,
            bounds,
        ))
    }

    /// Moves a creature along the cheapest path within its speed.
    ///
    /// Returns the path taken and every hostile creature whose reach the
    /// mover left along the way.
    pub fn move_creature(
        &mut self,
        id: CreatureId,
        destination: GridPosition,
        terrain: &TerrainMap,
        bounds: GridBounds,
    ) -> SkirmishResult<MoveOutcome> {
        let mover = self.creature_ref(id)?;
        if !mover.is_conscious() {
            return Err(SkirmishError::InvalidState(format!(
                "creature {id} cannot move while {:?}",
                mover.life
            )));
        }
        let others = self.others(id);
        if occupied_squares(&others).contains(&destination) {
            return Err(SkirmishError::InvalidState(format!(
                "{destination} is occupied"
            )));
        }
        let path = find_path(
            mover.position,
            destination,
            terrain,
            &others,
            bounds,
            Some(self.movement_budget(mover)),
        );
        if !path.is_valid {
            return Err(SkirmishError::InvalidState(format!(
                "creature {id} cannot reach {destination}"
            )));
        }
        let provoked = check_opportunity_attacks(&path.path, &others, id, mover.kind)
            .into_iter()
            .map(|creature| creature.id)
            .collect();

        let creature = self.creature_mut(id)?;
        creature.position = destination;
        debug!("{} moves to {destination} for {} ft", creature.name, path.total_cost);
        self.present(id, |p, c| p.on_token_changed(c));
        Ok(MoveOutcome { path, provoked })
    }

    fn others(&self, id: CreatureId) -> Vec<Creature> {
        self.creatures()
            .filter(|creature| creature.id != id)
            .cloned()
            .collect()
    }

    fn movement_budget(&self, creature: &Creature) -> u32 {
        let immobile = creature
            .conditions
            .iter()
            .any(|condition| condition_effects(*condition).immobile);
        if immobile {
            0
        } else {
            creature.speed
        }
    }

    // Cleanup and snapshots

    /// Unregisters every dead creature, returning them in registration order.
    pub fn remove_dead(&mut self) -> Vec<Creature> {
        let dead: Vec<CreatureId> = self
            .creatures()
            .filter(|creature| creature.life == LifeState::Dead)
            .map(|creature| creature.id)
            .collect();
        let mut removed = Vec::with_capacity(dead.len());
        for id in dead {
            match self.unregister(id) {
                Ok(creature) => removed.push(creature),
                Err(error) => warn!("Failed to remove dead creature: {error}"),
            }
        }
        removed
    }

    /// JSON snapshot of every creature and its stats in registration order.
    pub fn roster_json(&self) -> SkirmishResult<String> {
        let roster: Vec<RosterEntry<'_>> = self
            .roster
            .iter()
            .filter_map(|id| {
                Some(RosterEntry {
                    creature: self.creatures.get(id)?,
                    stats: self.stats.get(id)?,
                })
            })
            .collect();
        serde_json::to_string_pretty(&roster).map_err(SkirmishError::from)
    }
}

impl<D> fmt::Debug for CombatOrchestrator<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CombatOrchestrator")
            .field("config", &self.config)
            .field("creatures", &self.creatures.len())
            .field("phase", &self.phase)
            .field("events", &self.events)
            .field("presenter", &self.presenter.is_some())
            .finish()
    }
}
