//! # Dice
//!
//! Dice formulas, d20 rolls with advantage, and the [`DiceRoller`] seam every
//! random outcome in Skirmish flows through.

use crate::config::{MAX_DIE_SIDES, MAX_FORMULA_DICE};
use crate::{SkirmishError, SkirmishResult};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Source of individual die results.
pub trait DiceRoller {
    /// Rolls one die with the given number of sides, returning `1..=sides`.
    fn roll_die(&mut self, sides: u32) -> u32;
}

/// Dice backed by a random number generator.
#[derive(Debug, Clone)]
pub struct RandomDice<R = StdRng> {
    rng: R,
}

impl RandomDice<StdRng> {
    /// Creates reproducible dice from a seed.
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl<R: Rng> RandomDice<R> {
    /// Wraps an existing generator.
    pub fn from_rng(rng: R) -> Self {
        Self { rng }
    }
}

impl<R: Rng> DiceRoller for RandomDice<R> {
    fn roll_die(&mut self, sides: u32) -> u32 {
        if sides <= 1 {
            return 1;
        }
        self.rng.gen_range(1..=sides)
    }
}

/// Dice that replay a fixed script of results, cycling when exhausted.
///
/// Values are clamped into the range of the die being rolled.
///
/// # Examples
///
/// ```
/// use skirmish::{DiceRoller, ScriptedDice};
///
/// let mut dice = ScriptedDice::new(vec![20, 3]);
/// assert_eq!(dice.roll_die(20), 20);
/// assert_eq!(dice.roll_die(6), 3);
/// assert_eq!(dice.roll_die(6), 6); // 20 clamped to a d6
/// ```
#[derive(Debug, Clone, Default)]
pub struct ScriptedDice {
    values: Vec<u32>,
    cursor: usize,
}

impl ScriptedDice {
    pub fn new(values: Vec<u32>) -> Self {
        Self { values, cursor: 0 }
    }

    /// Appends more results to the script.
    pub fn push(&mut self, values: impl IntoIterator<Item = u32>) {
        self.values.extend(values);
    }
}

impl DiceRoller for ScriptedDice {
    fn roll_die(&mut self, sides: u32) -> u32 {
        if self.values.is_empty() {
            return 1;
        }
        let value = self.values[self.cursor % self.values.len()];
        self.cursor += 1;
        value.clamp(1, sides.max(1))
    }
}

/// One `NdS` group inside a formula.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiceTerm {
    pub count: u32,
    pub sides: u32,
    pub negative: bool,
}

/// A parsed dice expression such as `2d6+3` or `1d8+1d6-1`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiceFormula {
    pub terms: Vec<DiceTerm>,
    pub modifier: i32,
}

impl DiceFormula {
    /// A formula of `count` dice with `sides` sides plus a flat modifier.
    pub fn new(count: u32, sides: u32, modifier: i32) -> Self {
        Self {
            terms: vec![DiceTerm {
                count,
                sides,
                negative: false,
            }],
            modifier,
        }
    }

    /// A flat amount with no dice.
    pub fn flat(amount: i32) -> Self {
        Self {
            terms: Vec::new(),
            modifier: amount,
        }
    }

    /// The same formula with every dice group doubled, as on a critical hit.
    pub fn doubled(&self) -> Self {
        Self {
            terms: self
                .terms
                .iter()
                .map(|term| DiceTerm {
                    count: term.count.saturating_mul(2),
                    ..*term
                })
                .collect(),
            modifier: self.modifier,
        }
    }

    /// Rolls every die and sums with the modifier.
    pub fn roll(&self, dice: &mut (impl DiceRoller + ?Sized)) -> RollResult {
        let mut rolls = Vec::new();
        let mut total = self.modifier;
        for term in &self.terms {
            for _ in 0..term.count {
                let value = dice.roll_die(term.sides);
                rolls.push(value);
                let signed = i32::try_from(value).unwrap_or(i32::MAX);
                total = if term.negative {
                    total.saturating_sub(signed)
                } else {
                    total.saturating_add(signed)
                };
            }
        }
        RollResult {
            formula: self.to_string(),
            rolls,
            modifier: self.modifier,
            total,
        }
    }
}

impl FromStr for DiceFormula {
    type Err = SkirmishError;

    fn from_str(input: &str) -> SkirmishResult<Self> {
        let compact: String = input.chars().filter(|c| !c.is_whitespace()).collect();
        if compact.is_empty() {
            return Err(SkirmishError::InvalidFormula(input.to_string()));
        }

        let mut terms = Vec::new();
        let mut modifier = 0i32;
        let mut dice_count = 0u32;
        let mut negative = false;
        let mut token = String::new();

        let mut flush = |token: &str, negative: bool| -> SkirmishResult<()> {
            let invalid = || SkirmishError::InvalidFormula(input.to_string());
            if token.is_empty() {
                return Err(invalid());
            }
            match token.split_once(['d', 'D']) {
                Some((count, sides)) => {
                    let count = if count.is_empty() {
                        1
                    } else {
                        count.parse::<u32>().map_err(|_| invalid())?
                    };
                    let sides = sides.parse::<u32>().map_err(|_| invalid())?;
                    if sides == 0 || sides > MAX_DIE_SIDES {
                        return Err(invalid());
                    }
                    dice_count = dice_count
                        .checked_add(count)
                        .filter(|total| *total <= MAX_FORMULA_DICE)
                        .ok_or_else(invalid)?;
                    terms.push(DiceTerm {
                        count,
                        sides,
                        negative,
                    });
                }
                None => {
                    let value = token.parse::<i32>().map_err(|_| invalid())?;
                    let signed = if negative { -value } else { value };
                    modifier = modifier.checked_add(signed).ok_or_else(invalid)?;
                }
            }
            Ok(())
        };

        for c in compact.chars() {
            if c == '+' || c == '-' {
                if !token.is_empty() {
                    flush(&token, negative)?;
                    token.clear();
                } else if c == '+' || negative {
                    // Only a single leading minus may precede a term
                    return Err(SkirmishError::InvalidFormula(input.to_string()));
                }
                negative = c == '-';
            } else {
                token.push(c);
            }
        }
        flush(&token, negative)?;

        Ok(Self { terms, modifier })
    }
}

impl fmt::Display for DiceFormula {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for term in &self.terms {
            if term.negative {
                write!(f, "-")?;
            } else if !first {
                write!(f, "+")?;
            }
            write!(f, "{}d{}", term.count, term.sides)?;
            first = false;
        }
        if first {
            write!(f, "{}", self.modifier)
        } else if self.modifier > 0 {
            write!(f, "+{}", self.modifier)
        } else if self.modifier < 0 {
            write!(f, "{}", self.modifier)
        } else {
            Ok(())
        }
    }
}

/// Outcome of rolling a formula.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RollResult {
    pub formula: String,
    /// Individual die values in roll order
    pub rolls: Vec<u32>,
    pub modifier: i32,
    pub total: i32,
}

/// How a d20 is rolled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum RollMode {
    #[default]
    Normal,
    Advantage,
    Disadvantage,
}

impl RollMode {
    /// Combines advantage and disadvantage sources. Having both cancels out.
    pub fn from_flags(advantage: bool, disadvantage: bool) -> Self {
        match (advantage, disadvantage) {
            (true, false) => RollMode::Advantage,
            (false, true) => RollMode::Disadvantage,
            _ => RollMode::Normal,
        }
    }
}

/// A resolved d20 roll.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct D20Roll {
    /// Every d20 thrown (two with advantage or disadvantage)
    pub rolls: Vec<u32>,
    /// The die that counts
    pub kept: u32,
    pub modifier: i32,
    pub total: i32,
    pub mode: RollMode,
    pub natural_20: bool,
    pub natural_1: bool,
}

impl D20Roll {
    /// Formula text for logs and events, e.g. `2d20kh1+5`.
    pub fn formula(&self) -> String {
        let dice = match self.mode {
            RollMode::Normal => "1d20",
            RollMode::Advantage => "2d20kh1",
            RollMode::Disadvantage => "2d20kl1",
        };
        match self.modifier {
            0 => dice.to_string(),
            m if m > 0 => format!("{dice}+{m}"),
            m => format!("{dice}{m}"),
        }
    }
}

/// Rolls a d20 plus modifier in the given mode.
///
/// Natural 20 and natural 1 are flagged on the kept die only.
///
/// # Examples
///
/// ```
/// use skirmish::{roll_d20, RollMode, ScriptedDice};
///
/// let mut dice = ScriptedDice::new(vec![20, 4]);
/// let roll = roll_d20(&mut dice, 2, RollMode::Disadvantage);
/// assert_eq!(roll.kept, 4);
/// assert_eq!(roll.total, 6);
/// assert!(!roll.natural_20);
/// ```
pub fn roll_d20(dice: &mut (impl DiceRoller + ?Sized), modifier: i32, mode: RollMode) -> D20Roll {
    let first = dice.roll_die(20);
    let (rolls, kept) = match mode {
        RollMode::Normal => (vec![first], first),
        RollMode::Advantage => {
            let second = dice.roll_die(20);
            (vec![first, second], first.max(second))
        }
        RollMode::Disadvantage => {
            let second = dice.roll_die(20);
            (vec![first, second], first.min(second))
        }
    };
    D20Roll {
        rolls,
        kept,
        modifier,
        total: (kept as i32).saturating_add(modifier),
        mode,
        natural_20: kept == 20,
        natural_1: kept == 1,
    }
}
