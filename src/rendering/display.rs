//! # Battle Map Display
//!
//! Plain-text rendering of the combat grid: terrain glyphs, creature tokens
//! and highlighted squares (movement range, spell templates).

use crate::{Creature, CreatureKind, GridBounds, GridPosition, LifeState, TerrainMap, TerrainType};
use std::collections::{HashMap, HashSet};

/// Glyph drawn for a terrain type.
pub fn terrain_glyph(terrain: TerrainType) -> char {
    match terrain {
        TerrainType::Normal => '.',
        TerrainType::Difficult => ':',
        TerrainType::Water => '~',
        TerrainType::Lava => '^',
        TerrainType::Pit => 'O',
        TerrainType::Wall => '#',
        TerrainType::Door => '+',
        TerrainType::Stairs => '>',
    }
}

/// Glyph drawn for a creature token.
///
/// Player characters use `@`, monsters the first letter of their name in
/// lower case, other characters in upper case. Fallen creatures show `%`.
pub fn creature_glyph(creature: &Creature) -> char {
    if creature.life != LifeState::Conscious {
        return '%';
    }
    let initial = creature.name.chars().next().unwrap_or('?');
    match creature.kind {
        CreatureKind::PlayerCharacter => '@',
        CreatureKind::Monster => initial.to_ascii_lowercase(),
        CreatureKind::NonPlayerCharacter => initial.to_ascii_uppercase(),
    }
}

/// Text battle map renderer.
#[derive(Debug, Clone)]
pub struct BattleMap {
    bounds: GridBounds,
    highlight_glyph: char,
}

impl BattleMap {
    pub fn new(bounds: GridBounds) -> Self {
        Self {
            bounds,
            highlight_glyph: '*',
        }
    }

    /// Uses a different glyph for highlighted empty squares.
    pub fn with_highlight_glyph(mut self, glyph: char) -> Self {
        self.highlight_glyph = glyph;
        self
    }

    /// Renders the map as newline-separated rows.
    ///
    /// Creature tokens draw over highlights, highlights draw over passable
    /// terrain, and walls always show.
    ///
    /// # Examples
    ///
    /// ```
    /// use skirmish::{BattleMap, GridBounds, GridPosition, TerrainMap, TerrainType};
    /// use std::collections::HashSet;
    ///
    /// let mut terrain = TerrainMap::new();
    /// terrain.set(GridPosition::new(1, 0), TerrainType::Wall);
    /// let highlight: HashSet<_> = [GridPosition::new(2, 0)].into_iter().collect();
    ///
    /// let text = BattleMap::new(GridBounds::new(3, 1)).render(&terrain, &[], &highlight);
    /// assert_eq!(text, ".#*");
    /// ```
    pub fn render(
        &self,
        terrain: &TerrainMap,
        creatures: &[Creature],
        highlight: &HashSet<GridPosition>,
    ) -> String {
        let mut tokens: HashMap<GridPosition, char> = HashMap::new();
        // Living tokens take precedence over fallen ones on the same square
        let mut ordered: Vec<&Creature> = creatures.iter().collect();
        ordered.sort_by_key(|creature| creature.life == LifeState::Conscious);
        for creature in ordered {
            let glyph = creature_glyph(creature);
            for square in creature.occupied_squares() {
                tokens.insert(square, glyph);
            }
        }

        let mut rows = Vec::with_capacity(self.bounds.height as usize);
        for y in 0..self.bounds.height as i32 {
            let row: String = (0..self.bounds.width as i32)
                .map(|x| {
                    let position = GridPosition::new(x, y);
                    let ground = terrain.terrain_at(position);
                    if let Some(&glyph) = tokens.get(&position) {
                        glyph
                    } else if ground == TerrainType::Wall {
                        terrain_glyph(ground)
                    } else if highlight.contains(&position) {
                        self.highlight_glyph
                    } else {
                        terrain_glyph(ground)
                    }
                })
                .collect();
            rows.push(row);
        }
        rows.join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokens_override_terrain_and_highlights() {
        let hero =
            Creature::new("Aria", CreatureKind::PlayerCharacter, GridPosition::new(0, 0), 10);
        let ogre = Creature::new("Ogre", CreatureKind::Monster, GridPosition::new(2, 0), 59)
            .with_size(crate::SizeClass::Large);
        let highlight: HashSet<GridPosition> = (0..4).map(|x| GridPosition::new(x, 1)).collect();

        let text = BattleMap::new(GridBounds::new(4, 2)).render(
            &TerrainMap::new(),
            &[hero, ogre],
            &highlight,
        );
        assert_eq!(text, "@.oo\n**oo");
    }

    #[test]
    fn test_fallen_creatures_drawn_as_remains() {
        let mut goblin = Creature::new("Goblin", CreatureKind::Monster, GridPosition::new(0, 0), 7);
        goblin.life = LifeState::Dead;
        let text = BattleMap::new(GridBounds::new(2, 1)).render(
            &TerrainMap::new(),
            &[goblin],
            &HashSet::new(),
        );
        assert_eq!(text, "%.");
    }

    #[test]
    fn test_terrain_glyphs_distinct() {
        let glyphs: HashSet<char> = [
            TerrainType::Normal,
            TerrainType::Difficult,
            TerrainType::Water,
            TerrainType::Lava,
            TerrainType::Pit,
            TerrainType::Wall,
            TerrainType::Door,
            TerrainType::Stairs,
        ]
        .into_iter()
        .map(terrain_glyph)
        .collect();
        assert_eq!(glyphs.len(), 8);
    }
}
