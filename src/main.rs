//! # Skirmish Demo Entry Point
//!
//! Runs a seeded sample encounter on a small map and prints the event log.

use clap::Parser;
use skirmish::{
    spell_preset, Ability, AbilityModifiers, AreaOfEffect, AttackOptions, BattleMap, CombatConfig,
    CombatEvent, CombatOrchestrator, CombatantStats, Creature, CreatureId, CreatureKind,
    DamageType, DiceFormula, GridBounds, GridPosition, LifeState, PresentationLog, RollMode,
    SizeClass, Skill, SkirmishError, SkirmishResult, TerrainMap, TerrainType,
};
use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::rc::Rc;

/// Command line arguments for the Skirmish demo.
#[derive(Parser, Debug)]
#[command(name = "skirmish")]
#[command(about = "Runs a sample tactical combat encounter")]
#[command(version)]
struct Args {
    /// Random seed for the dice
    #[arg(short, long)]
    seed: Option<u64>,

    /// Maximum number of rounds to fight
    #[arg(short, long, default_value_t = 5)]
    rounds: u32,

    /// Load combat rules from a JSON file
    #[arg(long)]
    config: Option<String>,

    /// Print the final roster as JSON
    #[arg(long)]
    json: bool,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, default_value = "info")]
    log_level: String,
}

fn main() -> SkirmishResult<()> {
    let args = Args::parse();

    initialize_logging(&args.log_level)?;
    log::info!("Starting Skirmish v{}", skirmish::VERSION);

    let mut config = match &args.config {
        Some(path) => {
            let json = std::fs::read_to_string(path).map_err(|error| {
                SkirmishError::InvalidState(format!("cannot read config {path}: {error}"))
            })?;
            CombatConfig::from_json(&json)?
        }
        None => CombatConfig::default(),
    };
    if let Some(seed) = args.seed {
        config.seed = seed;
    }

    run_encounter(config, &args)
}

/// Initializes the logging system based on the specified log level.
fn initialize_logging(log_level: &str) -> SkirmishResult<()> {
    #[cfg(feature = "dev-tools")]
    {
        use tracing::Level;

        let level = match log_level.to_lowercase().as_str() {
            "error" => Level::ERROR,
            "warn" => Level::WARN,
            "info" => Level::INFO,
            "debug" => Level::DEBUG,
            "trace" => Level::TRACE,
            _ => Level::INFO,
        };

        tracing_subscriber::fmt()
            .with_max_level(level)
            .with_target(false)
            .init();
    }

    #[cfg(not(feature = "dev-tools"))]
    {
        let level = log_level
            .parse::<log::LevelFilter>()
            .unwrap_or(log::LevelFilter::Info);
        env_logger::Builder::new()
            .filter_level(level)
            .format_target(false)
            .try_init()
            .map_err(|error| SkirmishError::InvalidState(error.to_string()))?;
    }

    Ok(())
}

fn build_map() -> (TerrainMap, GridBounds) {
    let bounds = GridBounds::new(14, 8);
    let mut terrain = TerrainMap::new();
    for y in 1..=3 {
        terrain.set(GridPosition::new(6, y), TerrainType::Wall);
    }
    for x in 8..=9 {
        terrain.set(GridPosition::new(x, 5), TerrainType::Difficult);
    }
    terrain.set(GridPosition::new(3, 6), TerrainType::Water);
    (terrain, bounds)
}

struct Party {
    fighter: CreatureId,
    wizard: CreatureId,
}

fn populate(combat: &mut CombatOrchestrator) -> Party {
    let fighter = combat.register(
        Creature::new("Aria", CreatureKind::PlayerCharacter, GridPosition::new(2, 3), 28)
            .with_armor_class(17),
        CombatantStats::new(AbilityModifiers::new([3, 1, 2, 0, 1, -1]), 2)
            .with_save_proficiency(Ability::Strength)
            .with_save_proficiency(Ability::Constitution)
            .with_skill_proficiency(Skill::Athletics),
    );
    let wizard = combat.register(
        Creature::new("Brin", CreatureKind::PlayerCharacter, GridPosition::new(1, 5), 16)
            .with_armor_class(12),
        CombatantStats::new(AbilityModifiers::new([-1, 2, 1, 3, 1, 0]), 2)
            .with_spellcasting(Ability::Intelligence)
            .with_save_proficiency(Ability::Intelligence)
            .with_skill_proficiency(Skill::Perception),
    );
    for (index, y) in [2, 4, 6].into_iter().enumerate() {
        combat.register(
            Creature::new(
                format!("Goblin {}", index + 1),
                CreatureKind::Monster,
                GridPosition::new(10, y),
                7,
            )
            .with_armor_class(15),
            CombatantStats::new(AbilityModifiers::new([-1, 2, 0, 0, -1, -1]), 2),
        );
    }
    combat.register(
        Creature::new("Ogre", CreatureKind::Monster, GridPosition::new(11, 3), 59)
            .with_armor_class(11)
            .with_size(SizeClass::Large)
            .with_speed(40),
        CombatantStats::new(AbilityModifiers::new([4, -1, 3, -3, -2, -2]), 2)
            .with_vulnerability(DamageType::Fire),
    );
    Party { fighter, wizard }
}

fn run_encounter(config: CombatConfig, args: &Args) -> SkirmishResult<()> {
    let (terrain, bounds) = build_map();
    let tile_size = config.tile_size;
    let mut combat = CombatOrchestrator::new(config);
    let party = populate(&mut combat);

    let names: Rc<RefCell<HashMap<CreatureId, String>>> = Rc::new(RefCell::new(
        combat
            .creatures()
            .map(|creature| (creature.id, creature.name.clone()))
            .collect(),
    ));
    let event_names = Rc::clone(&names);
    combat.subscribe(move |event| println!("  {}", describe(event, &event_names.borrow())));
    let presentation = Rc::new(RefCell::new(PresentationLog::new()));
    combat.set_presenter(Rc::clone(&presentation));

    let map = BattleMap::new(bounds);
    let reach = combat.reachable_for(party.fighter, &terrain, bounds)?;
    println!("Aria's movement this turn:");
    println!("{}\n", map.render(&terrain, &snapshot(&combat), &reach.tiles));

    println!("Rolling initiative");
    combat.roll_initiative_for_all(false)?;

    for _ in 0..args.rounds * combat.len() as u32 {
        // Vacant when the last actor fell during its own turn
        if let Some(actor) = combat.current_creature() {
            take_turn(&mut combat, actor, &party, &terrain, bounds, tile_size)?;
        }
        if side_defeated(&combat, CreatureKind::Monster)
            || side_defeated(&combat, CreatureKind::PlayerCharacter)
        {
            break;
        }
        let advance = combat.next_turn()?;
        if advance.new_round && advance.round > args.rounds {
            break;
        }
    }

    combat.end_combat();
    println!("\n{}\n", map.render(&terrain, &snapshot(&combat), &HashSet::new()));

    let fallen = combat.remove_dead();
    println!(
        "{} creature(s) fell; {} death animation(s) played",
        fallen.len(),
        presentation.borrow().deaths().len()
    );
    if args.json {
        println!("{}", combat.roster_json()?);
    }
    Ok(())
}

fn snapshot(combat: &CombatOrchestrator) -> Vec<Creature> {
    combat.creatures().cloned().collect()
}

fn side_defeated(combat: &CombatOrchestrator, kind: CreatureKind) -> bool {
    !combat
        .creatures()
        .any(|creature| creature.kind == kind && creature.is_conscious())
}

fn nearest_enemy(combat: &CombatOrchestrator, actor: &Creature) -> Option<Creature> {
    combat
        .creatures()
        .filter(|other| other.kind.is_hostile_to(actor.kind) && other.is_alive())
        .min_by_key(|other| other.position.chebyshev_distance(actor.position))
        .cloned()
}

fn take_turn(
    combat: &mut CombatOrchestrator,
    actor_id: CreatureId,
    party: &Party,
    terrain: &TerrainMap,
    bounds: GridBounds,
    tile_size: f64,
) -> SkirmishResult<()> {
    let actor = combat
        .creature(actor_id)
        .cloned()
        .ok_or_else(|| SkirmishError::creature_not_found(actor_id))?;

    match actor.life {
        LifeState::Dying => {
            combat.death_save(actor_id)?;
            return Ok(());
        }
        LifeState::Stable | LifeState::Dead => return Ok(()),
        LifeState::Conscious => {}
    }

    if actor_id == party.wizard && !actor.concentrating {
        return cast_fireball(combat, actor_id, tile_size);
    }

    let Some(target) = nearest_enemy(combat, &actor) else {
        return Ok(());
    };
    if actor.position.chebyshev_distance(target.position) > 1 {
        approach(combat, actor_id, target.position, terrain, bounds)?;
    }

    let actor = combat
        .creature(actor_id)
        .cloned()
        .ok_or_else(|| SkirmishError::creature_not_found(actor_id))?;
    if actor.position.chebyshev_distance(target.position) <= 1 {
        strike(combat, actor_id, target.id, &DiceFormula::new(1, 8, 3))?;
    }
    Ok(())
}

fn approach(
    combat: &mut CombatOrchestrator,
    actor_id: CreatureId,
    goal: GridPosition,
    terrain: &TerrainMap,
    bounds: GridBounds,
) -> SkirmishResult<()> {
    let reach = combat.reachable_for(actor_id, terrain, bounds)?;
    let best = reach
        .tiles
        .iter()
        .copied()
        .min_by_key(|tile| {
            let cost = reach.cost_to(*tile).unwrap_or(u32::MAX);
            (tile.chebyshev_distance(goal), cost, *tile)
        });
    let Some(destination) = best else {
        return Ok(());
    };

    let outcome = combat.move_creature(actor_id, destination, terrain, bounds)?;
    for provoker in outcome.provoked {
        if combat.creature(provoker).is_some_and(Creature::is_conscious) {
            strike(combat, provoker, actor_id, &DiceFormula::new(1, 6, 2))?;
        }
    }
    Ok(())
}

fn strike(
    combat: &mut CombatOrchestrator,
    attacker: CreatureId,
    target: CreatureId,
    damage: &DiceFormula,
) -> SkirmishResult<()> {
    if !combat.creature(target).is_some_and(Creature::is_alive) {
        return Ok(());
    }
    let attack = combat.attack(attacker, target, AttackOptions::melee())?;
    if !attack.hit {
        return Ok(());
    }
    let outcome = combat.apply_damage(target, damage, Some(DamageType::Slashing), attack.critical)?;
    let concentrating = combat.creature(target).is_some_and(|creature| creature.concentrating);
    if concentrating && outcome.amount > 0 {
        combat.concentration_check(target, outcome.amount)?;
    }
    Ok(())
}

fn cast_fireball(
    combat: &mut CombatOrchestrator,
    caster: CreatureId,
    tile_size: f64,
) -> SkirmishResult<()> {
    let Some(preset) = spell_preset("Fireball") else {
        return Ok(());
    };
    let Some(target) = combat
        .creatures()
        .filter(|creature| creature.kind == CreatureKind::Monster && creature.is_alive())
        .map(|creature| creature.position)
        .next()
    else {
        return Ok(());
    };

    let aoe = AreaOfEffect::from_preset(preset, target, None);
    log::debug!("Fireball outline: {}", aoe.outline(tile_size).svg_path());
    let tiles = aoe.affected_tiles();
    let victims: Vec<CreatureId> = combat
        .creatures()
        .filter(|creature| creature.is_alive() && creature.id != caster)
        .filter(|creature| creature.occupied_squares().iter().any(|square| tiles.contains(square)))
        .map(|creature| creature.id)
        .collect();

    let dc = combat
        .stats(caster)
        .map(|stats| {
            let modifier = stats.spellcasting_modifier().unwrap_or(0);
            skirmish::spell_save_dc(stats.proficiency_bonus, modifier)
        })
        .unwrap_or(10);
    let damage = combat.roll(&DiceFormula::new(8, 6, 0));
    let full = damage.total.max(0) as u32;

    for victim in victims {
        let save = combat.saving_throw(victim, Ability::Dexterity, dc, RollMode::Normal)?;
        let amount = if save.success { full / 2 } else { full };
        combat.apply_raw_damage(victim, amount, Some(DamageType::Fire), false)?;
    }
    combat.begin_concentration(caster, None)?;
    Ok(())
}

fn describe(event: &CombatEvent, names: &HashMap<CreatureId, String>) -> String {
    let name = |id: &CreatureId| names.get(id).cloned().unwrap_or_else(|| id.to_string());
    match event {
        CombatEvent::DiceRolled { formula, total, rolls, .. } => {
            format!("rolled {formula}: {rolls:?} = {total}")
        }
        CombatEvent::AttackResolved { attacker_id, target_id, attack } => format!(
            "{} attacks {}: {} vs AC {} -> {}",
            name(attacker_id),
            name(target_id),
            attack.roll.total,
            attack.target_ac,
            if attack.critical {
                "critical hit"
            } else if attack.hit {
                "hit"
            } else {
                "miss"
            }
        ),
        CombatEvent::DamageApplied { creature_id, amount, hit_points, .. } => format!(
            "{} takes {amount} damage ({}/{} HP)",
            name(creature_id),
            hit_points.current,
            hit_points.max
        ),
        CombatEvent::HealingApplied { creature_id, amount, .. } => {
            format!("{} regains {amount} HP", name(creature_id))
        }
        CombatEvent::Death { creature_id, was_instant_death } => format!(
            "{} dies{}",
            name(creature_id),
            if *was_instant_death { " instantly" } else { "" }
        ),
        CombatEvent::InitiativeRolled { order } => {
            let listing: Vec<String> = order
                .iter()
                .map(|entry| format!("{} ({})", name(&entry.creature_id), entry.total))
                .collect();
            format!("initiative: {}", listing.join(", "))
        }
        CombatEvent::ConcentrationChecked { creature_id, check, maintained, .. } => format!(
            "{} concentration DC {}: {}",
            name(creature_id),
            check.dc,
            if *maintained { "holds" } else { "broken" }
        ),
        CombatEvent::TurnStarted { creature_id, round } => {
            format!("-- round {round}: {}'s turn", name(creature_id))
        }
        CombatEvent::CombatEnded { rounds } => format!("combat over after {rounds} round(s)"),
        CombatEvent::DeathSaveRolled { creature_id, roll, saves } => format!(
            "{} death save {roll} ({} successes, {} failures)",
            name(creature_id),
            saves.successes,
            saves.failures
        ),
        CombatEvent::Stabilized { creature_id } => format!("{} is stable", name(creature_id)),
    }
}
