//! Integration tests for the combat orchestrator: damage and death, death
//! saves, healing, initiative and turn order, conditions and events.

use skirmish::{
    AbilityModifiers, CombatConfig, CombatEvent, CombatOrchestrator, CombatantStats, Condition,
    Creature, CreatureId, CreatureKind, DeathSaveOutcome, DiceFormula, GridPosition, LifeState,
    PresentationLog, ScriptedDice, SkirmishError, SkirmishResult,
};
use std::cell::RefCell;
use std::rc::Rc;

type Combat = CombatOrchestrator<ScriptedDice>;
type EventLog = Rc<RefCell<Vec<CombatEvent>>>;

fn combat(script: Vec<u32>) -> (Combat, EventLog) {
    let mut combat =
        CombatOrchestrator::with_dice(CombatConfig::for_testing(), ScriptedDice::new(script));
    let log: EventLog = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&log);
    combat.subscribe(move |event| sink.borrow_mut().push(event.clone()));
    (combat, log)
}

fn stats_with_dex(dexterity: i32) -> CombatantStats {
    CombatantStats::new(AbilityModifiers::new([1, dexterity, 1, 0, 0, 0]), 2)
}

fn add(
    combat: &mut Combat,
    name: &str,
    kind: CreatureKind,
    max_hp: u32,
    dexterity: i32,
) -> CreatureId {
    combat.register(
        Creature::new(name, kind, GridPosition::new(0, 0), max_hp),
        stats_with_dex(dexterity),
    )
}

fn event_names(log: &EventLog) -> Vec<&'static str> {
    log.borrow().iter().map(CombatEvent::name).collect()
}

#[test]
fn test_healing_clamps_to_max() -> SkirmishResult<()> {
    let (mut combat, log) = combat(vec![10]);
    let id = add(&mut combat, "Aria", CreatureKind::PlayerCharacter, 50, 0);
    combat.apply_raw_damage(id, 30, None, false)?;
    log.borrow_mut().clear();

    let healed = combat.heal(id, 100)?;
    assert_eq!(healed, 30);
    assert_eq!(combat.creature(id).unwrap().hit_points.current, 50);
    assert!(matches!(
        log.borrow().as_slice(),
        [CombatEvent::HealingApplied { amount: 30, .. }]
    ));

    // Already full: nothing delivered, nothing raised
    assert_eq!(combat.heal(id, 5)?, 0);
    assert_eq!(log.borrow().len(), 1);
    Ok(())
}

#[test]
fn test_massive_damage_kills_outright() -> SkirmishResult<()> {
    let (mut combat, log) = combat(vec![10]);
    let id = add(&mut combat, "Aria", CreatureKind::PlayerCharacter, 10, 0);

    let outcome = combat.apply_raw_damage(id, 20, None, false)?;
    assert!(outcome.killed);
    assert!(outcome.instant_death);
    assert_eq!(combat.creature(id).unwrap().life, LifeState::Dead);
    assert!(log.borrow().iter().any(|event| matches!(
        event,
        CombatEvent::Death { creature_id, was_instant_death: true } if *creature_id == id
    )));
    Ok(())
}

#[test]
fn test_one_short_of_massive_damage_leaves_player_dying() -> SkirmishResult<()> {
    let (mut combat, _) = combat(vec![10]);
    let id = add(&mut combat, "Aria", CreatureKind::PlayerCharacter, 10, 0);

    let outcome = combat.apply_raw_damage(id, 19, None, false)?;
    assert!(!outcome.killed);
    assert!(outcome.fell_unconscious);
    assert_eq!(combat.creature(id).unwrap().life, LifeState::Dying);
    Ok(())
}

#[test]
fn test_monster_at_zero_dies_without_instant_flag() -> SkirmishResult<()> {
    let (mut combat, log) = combat(vec![10]);
    let id = add(&mut combat, "Goblin", CreatureKind::Monster, 7, 0);

    combat.apply_raw_damage(id, 7, None, false)?;
    assert_eq!(event_names(&log), vec!["damage_applied", "death"]);
    assert!(matches!(
        log.borrow().last(),
        Some(CombatEvent::Death { was_instant_death: false, .. })
    ));
    Ok(())
}

#[test]
fn test_rolled_damage_raises_dice_event_first() -> SkirmishResult<()> {
    let (mut combat, log) = combat(vec![4, 5]);
    let id = add(&mut combat, "Ogre", CreatureKind::Monster, 59, 0);

    let outcome = combat.apply_damage(id, &DiceFormula::new(2, 6, 1), None, false)?;
    assert_eq!(outcome.rolled, 10);
    assert_eq!(event_names(&log), vec!["dice_rolled", "damage_applied"]);

    let critical = combat.apply_damage(id, &DiceFormula::new(1, 6, 0), None, true)?;
    // Doubled dice: two d6 rolled
    assert_eq!(critical.rolled, 9);
    Ok(())
}

#[test]
fn test_three_successes_stabilize() -> SkirmishResult<()> {
    let (mut combat, log) = combat(vec![12, 15, 10]);
    let id = add(&mut combat, "Aria", CreatureKind::PlayerCharacter, 10, 0);
    combat.apply_raw_damage(id, 10, None, false)?;

    assert!(matches!(combat.death_save(id)?, DeathSaveOutcome::Pending(_)));
    assert!(matches!(combat.death_save(id)?, DeathSaveOutcome::Pending(_)));
    assert_eq!(combat.death_save(id)?, DeathSaveOutcome::Stabilized);

    let aria = combat.creature(id).unwrap();
    assert_eq!(aria.life, LifeState::Stable);
    assert!(aria.is_alive());
    assert!(!aria.is_conscious());
    assert_eq!(aria.hit_points.current, 0);
    assert!(combat.death_saves(id).is_none());
    assert!(matches!(log.borrow().last(), Some(CombatEvent::Stabilized { .. })));

    // Stable creatures no longer roll
    assert!(matches!(combat.death_save(id), Err(SkirmishError::InvalidState(_))));
    Ok(())
}

#[test]
fn test_natural_one_and_a_failure_kill() -> SkirmishResult<()> {
    let (mut combat, log) = combat(vec![1, 5]);
    let id = add(&mut combat, "Aria", CreatureKind::PlayerCharacter, 10, 0);
    combat.apply_raw_damage(id, 10, None, false)?;

    match combat.death_save(id)? {
        DeathSaveOutcome::Pending(saves) => assert_eq!(saves.failures, 2),
        other => panic!("unexpected {other:?}"),
    }
    assert_eq!(combat.death_save(id)?, DeathSaveOutcome::Died);
    assert_eq!(combat.creature(id).unwrap().life, LifeState::Dead);
    assert!(matches!(
        log.borrow().last(),
        Some(CombatEvent::Death { was_instant_death: false, .. })
    ));
    Ok(())
}

#[test]
fn test_natural_twenty_revives_at_one_hp() -> SkirmishResult<()> {
    let (mut combat, _) = combat(vec![20]);
    let id = add(&mut combat, "Aria", CreatureKind::PlayerCharacter, 10, 0);
    combat.apply_raw_damage(id, 10, None, false)?;

    assert_eq!(combat.death_save(id)?, DeathSaveOutcome::Revived);
    let aria = combat.creature(id).unwrap();
    assert_eq!(aria.hit_points.current, 1);
    assert_eq!(aria.life, LifeState::Conscious);
    assert!(!aria.has_condition(Condition::Unconscious));
    Ok(())
}

#[test]
fn test_death_save_requires_dying_creature() {
    let (mut combat, log) = combat(vec![10]);
    let id = add(&mut combat, "Aria", CreatureKind::PlayerCharacter, 10, 0);
    assert!(matches!(combat.death_save(id), Err(SkirmishError::InvalidState(_))));
    assert!(log.borrow().is_empty());
}

#[test]
fn test_initiative_then_two_turns_starts_round_two() -> SkirmishResult<()> {
    let (mut combat, _) = combat(vec![15, 8]);
    let first = add(&mut combat, "Aria", CreatureKind::PlayerCharacter, 10, 2);
    let second = add(&mut combat, "Goblin", CreatureKind::Monster, 7, 0);

    let order = combat.roll_initiative_for_all(false)?;
    assert_eq!(order[0].creature_id, first);
    assert_eq!(order[0].total, 17);
    assert_eq!(combat.round(), Some(1));
    assert_eq!(combat.creature(first).unwrap().initiative, Some(17));

    assert_eq!(combat.next_turn()?.creature_id, second);
    let wrapped = combat.next_turn()?;
    assert_eq!(wrapped.creature_id, first);
    assert_eq!(wrapped.round, 2);
    assert_eq!(combat.current_creature(), Some(first));
    Ok(())
}

#[test]
fn test_initiative_ties_prefer_higher_dexterity() -> SkirmishResult<()> {
    let (mut combat, log) = combat(vec![12, 10]);
    let clumsy = add(&mut combat, "Ogre", CreatureKind::Monster, 59, 0);
    let nimble = add(&mut combat, "Aria", CreatureKind::PlayerCharacter, 10, 2);

    let order = combat.roll_initiative_for_all(false)?;
    assert_eq!(order[0].total, order[1].total);
    assert_eq!(order[0].creature_id, nimble);
    assert_eq!(order[1].creature_id, clumsy);
    assert_eq!(
        event_names(&log),
        vec!["dice_rolled", "dice_rolled", "initiative_rolled", "turn_started"]
    );
    Ok(())
}

#[test]
fn test_death_before_current_turn_keeps_turn_holder() -> SkirmishResult<()> {
    let (mut combat, _) = combat(vec![18, 12, 6]);
    let goblin = add(&mut combat, "Goblin", CreatureKind::Monster, 7, 0);
    let aria = add(&mut combat, "Aria", CreatureKind::PlayerCharacter, 10, 0);
    let brin = add(&mut combat, "Brin", CreatureKind::PlayerCharacter, 10, 0);
    combat.roll_initiative_for_all(false)?;
    combat.next_turn()?;
    combat.next_turn()?;
    assert_eq!(combat.current_creature(), Some(brin));

    combat.apply_raw_damage(goblin, 7, None, false)?;
    let order = combat.turn_order().unwrap().creature_ids();
    assert_eq!(order, vec![aria, brin]);
    assert_eq!(combat.current_creature(), Some(brin));

    let next = combat.next_turn()?;
    assert_eq!(next.creature_id, aria);
    assert_eq!(next.round, 2);
    Ok(())
}

#[test]
fn test_first_creature_dying_on_its_turn_passes_turn_on() -> SkirmishResult<()> {
    let (mut combat, log) = combat(vec![18, 12, 6]);
    let goblin = add(&mut combat, "Goblin", CreatureKind::Monster, 7, 0);
    let aria = add(&mut combat, "Aria", CreatureKind::PlayerCharacter, 10, 0);
    let brin = add(&mut combat, "Brin", CreatureKind::PlayerCharacter, 10, 0);
    combat.roll_initiative_for_all(false)?;
    assert_eq!(combat.current_creature(), Some(goblin));

    combat.apply_raw_damage(goblin, 7, None, false)?;
    assert_eq!(combat.current_creature(), None);

    let next = combat.next_turn()?;
    assert_eq!(next.creature_id, aria);
    assert_eq!(next.round, 1);
    assert!(matches!(
        log.borrow().last(),
        Some(CombatEvent::TurnStarted { creature_id, round: 1 }) if *creature_id == aria
    ));
    assert_eq!(combat.next_turn()?.creature_id, brin);
    Ok(())
}

#[test]
fn test_turns_outside_combat_are_invalid() {
    let (mut combat, log) = combat(vec![10]);
    add(&mut combat, "Aria", CreatureKind::PlayerCharacter, 10, 0);
    assert!(matches!(combat.next_turn(), Err(SkirmishError::InvalidState(_))));
    assert_eq!(combat.end_combat(), None);
    assert!(log.borrow().is_empty());
}

#[test]
fn test_end_combat_resets_phase() -> SkirmishResult<()> {
    let (mut combat, log) = combat(vec![10]);
    add(&mut combat, "Aria", CreatureKind::PlayerCharacter, 10, 0);
    combat.roll_initiative_for_all(false)?;
    combat.next_turn()?;

    assert_eq!(combat.end_combat(), Some(2));
    assert!(!combat.is_in_combat());
    assert_eq!(combat.round(), None);
    assert!(matches!(log.borrow().last(), Some(CombatEvent::CombatEnded { rounds: 2 })));
    Ok(())
}

#[test]
fn test_initiative_skips_the_dead() -> SkirmishResult<()> {
    let (mut combat, _) = combat(vec![10]);
    let goblin = add(&mut combat, "Goblin", CreatureKind::Monster, 7, 0);
    let aria = add(&mut combat, "Aria", CreatureKind::PlayerCharacter, 10, 0);
    combat.apply_raw_damage(goblin, 7, None, false)?;

    let order = combat.roll_initiative_for_all(false)?;
    assert_eq!(order.len(), 1);
    assert_eq!(order[0].creature_id, aria);
    Ok(())
}

#[test]
fn test_conditions_behave_as_a_set() -> SkirmishResult<()> {
    let (mut combat, log) = combat(vec![10]);
    let id = add(&mut combat, "Aria", CreatureKind::PlayerCharacter, 10, 0);

    assert!(combat.add_condition(id, Condition::Prone)?);
    assert!(!combat.add_condition(id, Condition::Prone)?);
    assert_eq!(combat.creature(id).unwrap().conditions.len(), 1);
    assert!(combat.remove_condition(id, Condition::Prone)?);
    assert!(!combat.remove_condition(id, Condition::Prone)?);
    assert!(log.borrow().is_empty());
    Ok(())
}

#[test]
fn test_failed_operation_changes_nothing() {
    let (mut combat, log) = combat(vec![20]);
    let aria = add(&mut combat, "Aria", CreatureKind::PlayerCharacter, 10, 0);
    let ghost = skirmish::new_creature_id();

    let result = combat.attack(aria, ghost, Default::default());
    assert!(matches!(result, Err(SkirmishError::NotFound { id, .. }) if id == ghost));
    assert!(log.borrow().is_empty());
}

#[test]
fn test_unsubscribed_listener_hears_nothing() -> SkirmishResult<()> {
    let (mut combat, log) = combat(vec![10]);
    let second: EventLog = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&second);
    let token = combat.subscribe(move |event| sink.borrow_mut().push(event.clone()));

    combat.roll_formula("1d6")?;
    assert!(combat.unsubscribe(token));
    combat.roll_formula("1d6")?;

    assert_eq!(log.borrow().len(), 2);
    assert_eq!(second.borrow().len(), 1);
    Ok(())
}

#[test]
fn test_bad_formula_is_rejected() {
    let (mut combat, log) = combat(vec![10]);
    assert!(matches!(combat.roll_formula("2d"), Err(SkirmishError::InvalidFormula(_))));
    assert!(log.borrow().is_empty());
}

#[test]
fn test_death_hook_then_cleanup() -> SkirmishResult<()> {
    let (mut combat, _) = combat(vec![10]);
    let presentation = Rc::new(RefCell::new(PresentationLog::new()));
    combat.set_presenter(Rc::clone(&presentation));
    let goblin = add(&mut combat, "Goblin", CreatureKind::Monster, 7, 0);
    let aria = add(&mut combat, "Aria", CreatureKind::PlayerCharacter, 10, 0);

    combat.apply_raw_damage(goblin, 9, None, false)?;
    assert_eq!(presentation.borrow().deaths(), vec![goblin]);
    assert!(combat.creature(goblin).is_some());

    let removed = combat.remove_dead();
    assert_eq!(removed.len(), 1);
    assert!(combat.creature(goblin).is_none());
    assert!(combat.creature(aria).is_some());
    Ok(())
}
