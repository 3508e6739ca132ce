//! # Spell Presets
//!
//! Default templates for common area spells.

use super::AoeShape;
use serde::Serialize;

/// Default shape and size of a named spell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SpellPreset {
    pub name: &'static str,
    pub shape: AoeShape,
    pub size_feet: u32,
}

const fn preset(name: &'static str, shape: AoeShape, size_feet: u32) -> SpellPreset {
    SpellPreset {
        name,
        shape,
        size_feet,
    }
}

/// Known area spells.
pub const SPELL_PRESETS: &[SpellPreset] = &[
    preset("Burning Hands", AoeShape::Cone, 15),
    preset("Color Spray", AoeShape::Cone, 15),
    preset("Cone of Cold", AoeShape::Cone, 60),
    preset("Thunderwave", AoeShape::Cube, 15),
    preset("Entangle", AoeShape::Cube, 20),
    preset("Faerie Fire", AoeShape::Cube, 20),
    preset("Grease", AoeShape::Cube, 10),
    preset("Web", AoeShape::Cube, 20),
    preset("Hypnotic Pattern", AoeShape::Cube, 30),
    preset("Fireball", AoeShape::Sphere, 20),
    preset("Shatter", AoeShape::Sphere, 10),
    preset("Darkness", AoeShape::Sphere, 15),
    preset("Fog Cloud", AoeShape::Sphere, 20),
    preset("Stinking Cloud", AoeShape::Sphere, 20),
    preset("Spirit Guardians", AoeShape::Sphere, 15),
    preset("Cloudkill", AoeShape::Sphere, 20),
    preset("Circle of Death", AoeShape::Sphere, 60),
    preset("Lightning Bolt", AoeShape::Line, 100),
    preset("Gust of Wind", AoeShape::Line, 60),
    preset("Moonbeam", AoeShape::Cylinder, 5),
    preset("Flame Strike", AoeShape::Cylinder, 10),
    preset("Ice Storm", AoeShape::Cylinder, 20),
    preset("Sleet Storm", AoeShape::Cylinder, 40),
];

/// Looks up a preset by spell name, ignoring case.
///
/// # Examples
///
/// ```
/// use skirmish::{spell_preset, AoeShape};
///
/// let fireball = spell_preset("fireball").unwrap();
/// assert_eq!(fireball.shape, AoeShape::Sphere);
/// assert_eq!(fireball.size_feet, 20);
/// ```
pub fn spell_preset(name: &str) -> Option<&'static SpellPreset> {
    SPELL_PRESETS
        .iter()
        .find(|preset| preset.name.eq_ignore_ascii_case(name.trim()))
}
