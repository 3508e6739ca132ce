//! # Entities Module
//!
//! Creatures on the combat grid and the secondary statistics combat math
//! reads from.
//!
//! A [`Creature`] is the presentation-facing snapshot (name, token position,
//! hit points, conditions). Its [`CombatantStats`] are kept in a separate store
//! by the orchestrator so that attack and save math never depends on display
//! data.

use crate::{new_creature_id, CreatureId, GridPosition};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// The six ability scores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Ability {
    Strength,
    Dexterity,
    Constitution,
    Intelligence,
    Wisdom,
    Charisma,
}

impl Ability {
    /// Three-letter abbreviation used in rolls and logs.
    pub fn abbreviation(self) -> &'static str {
        match self {
            Ability::Strength => "STR",
            Ability::Dexterity => "DEX",
            Ability::Constitution => "CON",
            Ability::Intelligence => "INT",
            Ability::Wisdom => "WIS",
            Ability::Charisma => "CHA",
        }
    }

    /// All abilities in sheet order.
    pub fn all() -> [Ability; 6] {
        [
            Ability::Strength,
            Ability::Dexterity,
            Ability::Constitution,
            Ability::Intelligence,
            Ability::Wisdom,
            Ability::Charisma,
        ]
    }
}

/// Skills, each governed by exactly one ability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Skill {
    Athletics,
    Acrobatics,
    SleightOfHand,
    Stealth,
    Arcana,
    History,
    Investigation,
    Nature,
    Religion,
    AnimalHandling,
    Insight,
    Medicine,
    Perception,
    Survival,
    Deception,
    Intimidation,
    Performance,
    Persuasion,
}

impl Skill {
    /// The ability a check with this skill uses.
    ///
    /// # Examples
    ///
    /// ```
    /// use skirmish::{Ability, Skill};
    ///
    /// assert_eq!(Skill::Stealth.ability(), Ability::Dexterity);
    /// assert_eq!(Skill::Perception.ability(), Ability::Wisdom);
    /// ```
    pub fn ability(self) -> Ability {
        match self {
            Skill::Athletics => Ability::Strength,
            Skill::Acrobatics | Skill::SleightOfHand | Skill::Stealth => Ability::Dexterity,
            Skill::Arcana
            | Skill::History
            | Skill::Investigation
            | Skill::Nature
            | Skill::Religion => Ability::Intelligence,
            Skill::AnimalHandling
            | Skill::Insight
            | Skill::Medicine
            | Skill::Perception
            | Skill::Survival => Ability::Wisdom,
            Skill::Deception | Skill::Intimidation | Skill::Performance | Skill::Persuasion => {
                Ability::Charisma
            }
        }
    }
}

/// The standard 5e conditions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Condition {
    Blinded,
    Charmed,
    Deafened,
    Exhaustion,
    Frightened,
    Grappled,
    Incapacitated,
    Invisible,
    Paralyzed,
    Petrified,
    Poisoned,
    Prone,
    Restrained,
    Stunned,
    Unconscious,
}

/// Damage types, used for resistance, vulnerability and immunity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum DamageType {
    Acid,
    Bludgeoning,
    Cold,
    Fire,
    Force,
    Lightning,
    Necrotic,
    Piercing,
    Poison,
    Psychic,
    Radiant,
    Slashing,
    Thunder,
}

/// Which side of the table a creature belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CreatureKind {
    PlayerCharacter,
    Monster,
    NonPlayerCharacter,
}

impl CreatureKind {
    /// Monsters oppose player characters and NPCs, and vice versa.
    pub fn is_hostile_to(self, other: CreatureKind) -> bool {
        (self == CreatureKind::Monster) != (other == CreatureKind::Monster)
    }
}

/// Creature size class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum SizeClass {
    Tiny,
    Small,
    #[default]
    Medium,
    Large,
    Huge,
    Gargantuan,
}

impl SizeClass {
    /// Footprint edge length in grid squares.
    pub fn footprint(self) -> f64 {
        match self {
            SizeClass::Tiny => 0.5,
            SizeClass::Small | SizeClass::Medium => 1.0,
            SizeClass::Large => 2.0,
            SizeClass::Huge => 3.0,
            SizeClass::Gargantuan => 4.0,
        }
    }

    /// Number of whole squares along one edge of the occupied block.
    pub fn squares_per_side(self) -> i32 {
        self.footprint().ceil().max(1.0) as i32
    }
}

/// Hit point pool. `current` never exceeds `max`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HitPoints {
    pub current: u32,
    pub max: u32,
    pub temporary: u32,
}

impl HitPoints {
    /// A full pool with no temporary hit points.
    pub fn full(max: u32) -> Self {
        Self {
            current: max,
            max,
            temporary: 0,
        }
    }

    /// The same pool with `current` capped at `max`.
    pub fn clamped(self) -> Self {
        Self {
            current: self.current.min(self.max),
            ..self
        }
    }
}

/// Where a creature stands between life and death.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum LifeState {
    #[default]
    Conscious,
    /// At 0 HP and making death saves.
    Dying,
    /// At 0 HP, no longer making death saves.
    Stable,
    Dead,
}

/// A combatant on the grid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Creature {
    pub id: CreatureId,
    pub name: String,
    pub kind: CreatureKind,
    pub position: GridPosition,
    pub size: SizeClass,
    pub hit_points: HitPoints,
    pub armor_class: i32,
    /// Walking speed in feet
    pub speed: u32,
    /// Initiative total, once rolled
    pub initiative: Option<i32>,
    pub conditions: BTreeSet<Condition>,
    pub concentrating: bool,
    pub concentration_target: Option<CreatureId>,
    pub life: LifeState,
}

impl Creature {
    /// Creates a medium creature with full hit points and AC 10.
    ///
    /// # Examples
    ///
    /// ```
    /// use skirmish::{Creature, CreatureKind, GridPosition};
    ///
    /// let goblin = Creature::new("Goblin", CreatureKind::Monster, GridPosition::new(3, 4), 7);
    /// assert_eq!(goblin.hit_points.current, 7);
    /// assert!(goblin.is_alive());
    /// ```
    pub fn new(
        name: impl Into<String>,
        kind: CreatureKind,
        position: GridPosition,
        max_hp: u32,
    ) -> Self {
        Self {
            id: new_creature_id(),
            name: name.into(),
            kind,
            position,
            size: SizeClass::Medium,
            hit_points: HitPoints::full(max_hp),
            armor_class: 10,
            speed: 30,
            initiative: None,
            conditions: BTreeSet::new(),
            concentrating: false,
            concentration_target: None,
            life: LifeState::Conscious,
        }
    }

    /// Sets the armor class.
    pub fn with_armor_class(mut self, armor_class: i32) -> Self {
        self.armor_class = armor_class;
        self
    }

    /// Sets the walking speed in feet.
    pub fn with_speed(mut self, speed: u32) -> Self {
        self.speed = speed;
        self
    }

    /// Sets the size class.
    pub fn with_size(mut self, size: SizeClass) -> Self {
        self.size = size;
        self
    }

    /// Whether the creature still counts for occupancy and threat.
    pub fn is_alive(&self) -> bool {
        self.life != LifeState::Dead
    }

    /// Whether the creature is up and acting.
    pub fn is_conscious(&self) -> bool {
        self.life == LifeState::Conscious
    }

    pub fn has_condition(&self, condition: Condition) -> bool {
        self.conditions.contains(&condition)
    }

    /// Squares covered by this creature's token.
    pub fn occupied_squares(&self) -> Vec<GridPosition> {
        let side = self.size.squares_per_side();
        let mut squares = Vec::with_capacity((side * side) as usize);
        for dy in 0..side {
            for dx in 0..side {
                squares.push(GridPosition::new(self.position.x + dx, self.position.y + dy));
            }
        }
        squares
    }

    /// Starts concentrating, optionally on an effect tied to another creature.
    pub fn begin_concentration(&mut self, target: Option<CreatureId>) {
        self.concentrating = true;
        self.concentration_target = target;
    }

    pub fn end_concentration(&mut self) {
        self.concentrating = false;
        self.concentration_target = None;
    }
}

/// Ability modifiers, one per ability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AbilityModifiers {
    pub strength: i32,
    pub dexterity: i32,
    pub constitution: i32,
    pub intelligence: i32,
    pub wisdom: i32,
    pub charisma: i32,
}

impl AbilityModifiers {
    /// Builds modifiers from `[STR, DEX, CON, INT, WIS, CHA]`.
    pub fn new(values: [i32; 6]) -> Self {
        let [strength, dexterity, constitution, intelligence, wisdom, charisma] = values;
        Self {
            strength,
            dexterity,
            constitution,
            intelligence,
            wisdom,
            charisma,
        }
    }

    pub fn get(&self, ability: Ability) -> i32 {
        match ability {
            Ability::Strength => self.strength,
            Ability::Dexterity => self.dexterity,
            Ability::Constitution => self.constitution,
            Ability::Intelligence => self.intelligence,
            Ability::Wisdom => self.wisdom,
            Ability::Charisma => self.charisma,
        }
    }
}

/// Secondary combat data for one creature.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CombatantStats {
    pub modifiers: AbilityModifiers,
    pub proficiency_bonus: i32,
    /// Total to-hit bonus of the creature's main attack
    pub attack_bonus: i32,
    pub spellcasting_ability: Option<Ability>,
    pub saving_throw_proficiencies: BTreeSet<Ability>,
    pub skill_proficiencies: BTreeSet<Skill>,
    pub resistances: BTreeSet<DamageType>,
    pub vulnerabilities: BTreeSet<DamageType>,
    pub immunities: BTreeSet<DamageType>,
}

impl CombatantStats {
    /// Creates stats from ability modifiers and a proficiency bonus.
    ///
    /// The attack bonus defaults to proficiency plus the better of STR and DEX.
    pub fn new(modifiers: AbilityModifiers, proficiency_bonus: i32) -> Self {
        Self {
            modifiers,
            proficiency_bonus,
            attack_bonus: proficiency_bonus + modifiers.strength.max(modifiers.dexterity),
            ..Self::default()
        }
    }

    pub fn with_attack_bonus(mut self, attack_bonus: i32) -> Self {
        self.attack_bonus = attack_bonus;
        self
    }

    pub fn with_spellcasting(mut self, ability: Ability) -> Self {
        self.spellcasting_ability = Some(ability);
        self
    }

    pub fn with_save_proficiency(mut self, ability: Ability) -> Self {
        self.saving_throw_proficiencies.insert(ability);
        self
    }

    pub fn with_skill_proficiency(mut self, skill: Skill) -> Self {
        self.skill_proficiencies.insert(skill);
        self
    }

    pub fn with_resistance(mut self, damage_type: DamageType) -> Self {
        self.resistances.insert(damage_type);
        self
    }

    pub fn with_vulnerability(mut self, damage_type: DamageType) -> Self {
        self.vulnerabilities.insert(damage_type);
        self
    }

    pub fn with_immunity(mut self, damage_type: DamageType) -> Self {
        self.immunities.insert(damage_type);
        self
    }

    pub fn modifier(&self, ability: Ability) -> i32 {
        self.modifiers.get(ability)
    }

    /// Modifier of the spellcasting ability, if the creature casts.
    pub fn spellcasting_modifier(&self) -> Option<i32> {
        self.spellcasting_ability.map(|ability| self.modifier(ability))
    }

    pub fn is_proficient_in_save(&self, ability: Ability) -> bool {
        self.saving_throw_proficiencies.contains(&ability)
    }

    pub fn is_proficient_in_skill(&self, skill: Skill) -> bool {
        self.skill_proficiencies.contains(&skill)
    }
}
