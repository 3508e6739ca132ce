//! # Pathfinding Algorithms
//!
//! Movement searches over the combat grid.
//!
//! Movement is 8-directional. Entering a square costs that square's terrain
//! cost; a diagonal step costs no more than an orthogonal one. Squares held by
//! any other living creature, impassable terrain and squares outside the grid
//! are never entered.

use crate::config::FEET_PER_SQUARE;
use crate::rules::condition_effects;
use crate::{Creature, CreatureId, CreatureKind, GridBounds, GridPosition, TerrainMap};
use ::pathfinding::prelude::astar;
use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap, HashSet};

/// Everything a creature can reach with its remaining movement.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReachableTiles {
    /// Reachable squares, never including the start square
    pub tiles: HashSet<GridPosition>,
    /// Minimal movement cost to each reachable square
    pub costs: HashMap<GridPosition, u32>,
    /// Cheapest path to each reachable square, start first
    pub paths: HashMap<GridPosition, Vec<GridPosition>>,
}

impl ReachableTiles {
    pub fn contains(&self, position: GridPosition) -> bool {
        self.tiles.contains(&position)
    }

    pub fn cost_to(&self, position: GridPosition) -> Option<u32> {
        self.costs.get(&position).copied()
    }

    pub fn path_to(&self, position: GridPosition) -> Option<&[GridPosition]> {
        self.paths.get(&position).map(Vec::as_slice)
    }
}

/// A single start-to-goal route.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathResult {
    /// Squares from start to goal inclusive; empty when invalid
    pub path: Vec<GridPosition>,
    pub total_cost: u32,
    pub is_valid: bool,
}

impl PathResult {
    fn invalid() -> Self {
        Self {
            path: Vec::new(),
            total_cost: 0,
            is_valid: false,
        }
    }
}

/// Squares covered by living creatures.
pub fn occupied_squares(creatures: &[Creature]) -> HashSet<GridPosition> {
    creatures
        .iter()
        .filter(|creature| creature.is_alive())
        .flat_map(|creature| creature.occupied_squares())
        .collect()
}

/// Cost of stepping from `from` onto the neighbouring square `to`.
///
/// Diagonals cost `max(terrain, 5)`, never the alternating 5-10-5 rule.
pub fn step_cost(terrain: &TerrainMap, from: GridPosition, to: GridPosition) -> Option<u32> {
    let cost = terrain.movement_cost(to)?;
    if from.is_diagonal_to(to) {
        Some(cost.max(FEET_PER_SQUARE))
    } else {
        Some(cost)
    }
}

/// Legal single steps out of `from`.
///
/// `exempt` is a square allowed even when occupied.
fn legal_steps(
    from: GridPosition,
    terrain: &TerrainMap,
    blocked: &HashSet<GridPosition>,
    bounds: GridBounds,
    exempt: Option<GridPosition>,
) -> Vec<(GridPosition, u32)> {
    from.adjacent_positions()
        .into_iter()
        .filter(|&next| bounds.contains(next))
        .filter(|next| Some(*next) == exempt || !blocked.contains(next))
        .filter_map(|next| step_cost(terrain, from, next).map(|cost| (next, cost)))
        .collect()
}

/// Frontier entry for the budgeted Dijkstra expansion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct FrontierNode {
    cost: u32,
    position: GridPosition,
}

impl PartialOrd for FrontierNode {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for FrontierNode {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reverse ordering for min-heap behavior in BinaryHeap
        other
            .cost
            .cmp(&self.cost)
            .then_with(|| other.position.cmp(&self.position))
    }
}

/// Every square reachable from `start` within `movement_budget` feet.
///
/// # Examples
///
/// ```
/// use skirmish::{calculate_reachable_tiles, GridBounds, GridPosition, TerrainMap};
///
/// let reach = calculate_reachable_tiles(
///     GridPosition::new(5, 5),
///     10,
///     &TerrainMap::new(),
///     &[],
///     GridBounds::new(20, 20),
/// );
/// assert_eq!(reach.tiles.len(), 24); // a 5x5 block minus the start
/// assert_eq!(reach.cost_to(GridPosition::new(7, 7)), Some(10));
/// ```
pub fn calculate_reachable_tiles(
    start: GridPosition,
    movement_budget: u32,
    terrain: &TerrainMap,
    other_creatures: &[Creature],
    bounds: GridBounds,
) -> ReachableTiles {
    let blocked = occupied_squares(other_creatures);

    let mut best: HashMap<GridPosition, u32> = HashMap::new();
    let mut came_from: HashMap<GridPosition, GridPosition> = HashMap::new();
    let mut finalized: HashSet<GridPosition> = HashSet::new();
    let mut frontier = BinaryHeap::new();

    best.insert(start, 0);
    frontier.push(FrontierNode {
        cost: 0,
        position: start,
    });

    while let Some(FrontierNode { cost, position }) = frontier.pop() {
        if !finalized.insert(position) {
            continue;
        }

        for (next, step) in legal_steps(position, terrain, &blocked, bounds, None) {
            if finalized.contains(&next) {
                continue;
            }
            let total = cost + step;
            if total > movement_budget {
                continue;
            }
            if total < best.get(&next).copied().unwrap_or(u32::MAX) {
                best.insert(next, total);
                came_from.insert(next, position);
                frontier.push(FrontierNode {
                    cost: total,
                    position: next,
                });
            }
        }
    }

    finalized.remove(&start);
    best.remove(&start);

    let paths = finalized
        .iter()
        .map(|&tile| (tile, rebuild_path(&came_from, start, tile)))
        .collect();

    ReachableTiles {
        tiles: finalized,
        costs: best,
        paths,
    }
}

fn rebuild_path(
    came_from: &HashMap<GridPosition, GridPosition>,
    start: GridPosition,
    goal: GridPosition,
) -> Vec<GridPosition> {
    let mut path = vec![goal];
    let mut current = goal;
    while current != start {
        match came_from.get(&current) {
            Some(&previous) => {
                path.push(previous);
                current = previous;
            }
            None => break,
        }
    }
    path.reverse();
    path
}

/// Cheapest route from `start` to `end` using A*.
///
/// The destination may be occupied, so a melee approach onto a target square
/// can be costed. `movement_budget` of `None` means unlimited.
pub fn find_path(
    start: GridPosition,
    end: GridPosition,
    terrain: &TerrainMap,
    other_creatures: &[Creature],
    bounds: GridBounds,
    movement_budget: Option<u32>,
) -> PathResult {
    if !bounds.contains(end) {
        return PathResult::invalid();
    }
    if start == end {
        return PathResult {
            path: vec![start],
            total_cost: 0,
            is_valid: true,
        };
    }

    let blocked = occupied_squares(other_creatures);
    let found = astar(
        &start,
        |&position| legal_steps(position, terrain, &blocked, bounds, Some(end)),
        |&position| position.chebyshev_distance(end) * FEET_PER_SQUARE,
        |&position| position == end,
    );

    match found {
        Some((path, total_cost)) if movement_budget.map_or(true, |budget| total_cost <= budget) => {
            PathResult {
                path,
                total_cost,
                is_valid: true,
            }
        }
        _ => PathResult::invalid(),
    }
}

/// Living creatures, other than `exclude`, adjacent to `position`.
pub fn get_threatened_by<'a>(
    position: GridPosition,
    creatures: &'a [Creature],
    exclude: Option<CreatureId>,
) -> Vec<&'a Creature> {
    creatures
        .iter()
        .filter(|creature| creature.is_alive())
        .filter(|creature| Some(creature.id) != exclude)
        .filter(|creature| creature.position.chebyshev_distance(position) <= 1)
        .collect()
}

/// Whether a creature can spend its reaction: conscious and not incapacitated.
fn can_react(creature: &Creature) -> bool {
    creature.is_conscious()
        && !creature
            .conditions
            .iter()
            .any(|condition| condition_effects(*condition).incapacitated)
}

/// Enemies that get an opportunity attack as a creature walks `path`.
///
/// An enemy provokes when the mover leaves a square it threatens for one it
/// does not. Each enemy provokes at most once per path. Unconscious or
/// incapacitated enemies still threaten but cannot make the attack.
pub fn check_opportunity_attacks<'a>(
    path: &[GridPosition],
    creatures: &'a [Creature],
    moving_id: CreatureId,
    moving_kind: CreatureKind,
) -> Vec<&'a Creature> {
    let mut provoked: Vec<&Creature> = Vec::new();
    let mut seen = HashSet::new();

    for segment in path.windows(2) {
        let (from, to) = (segment[0], segment[1]);
        for threat in get_threatened_by(from, creatures, Some(moving_id)) {
            if !threat.kind.is_hostile_to(moving_kind) || !can_react(threat) {
                continue;
            }
            if threat.position.chebyshev_distance(to) <= 1 {
                continue;
            }
            if seen.insert(threat.id) {
                provoked.push(threat);
            }
        }
    }

    provoked
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Creature, CreatureKind, TerrainType, Tile};

    fn bounds() -> GridBounds {
        GridBounds::new(10, 10)
    }

    fn monster_at(x: i32, y: i32) -> Creature {
        Creature::new("Goblin", CreatureKind::Monster, GridPosition::new(x, y), 7)
    }

    #[test]
    fn test_reachable_excludes_start_and_respects_budget() {
        let start = GridPosition::new(5, 5);
        let reach = calculate_reachable_tiles(start, 5, &TerrainMap::new(), &[], bounds());
        assert_eq!(reach.tiles.len(), 8);
        assert!(!reach.contains(start));
        assert!(reach.costs.values().all(|&cost| cost <= 5));
        assert_eq!(
            reach.path_to(GridPosition::new(6, 6)),
            Some(&[start, GridPosition::new(6, 6)][..])
        );
    }

    #[test]
    fn test_difficult_terrain_doubles_cost() {
        let terrain = TerrainMap::from_tiles(vec![Tile::new(
            GridPosition::new(1, 0),
            TerrainType::Difficult,
        )]);
        let reach = calculate_reachable_tiles(GridPosition::new(0, 0), 10, &terrain, &[], bounds());
        assert_eq!(reach.cost_to(GridPosition::new(1, 0)), Some(10));
        assert_eq!(reach.cost_to(GridPosition::new(1, 1)), Some(5));
    }

    #[test]
    fn test_walls_and_bounds_pruned() {
        let terrain = TerrainMap::from_tiles(vec![
            Tile::new(GridPosition::new(1, 0), TerrainType::Wall),
            Tile::new(GridPosition::new(1, 1), TerrainType::Pit),
        ]);
        let reach = calculate_reachable_tiles(GridPosition::new(0, 0), 5, &terrain, &[], bounds());
        assert_eq!(reach.tiles, HashSet::from([GridPosition::new(0, 1)]));
    }

    #[test]
    fn test_occupied_squares_block_movement() {
        let others = vec![monster_at(6, 5)];
        let reach = calculate_reachable_tiles(
            GridPosition::new(5, 5),
            10,
            &TerrainMap::new(),
            &others,
            bounds(),
        );
        assert!(!reach.contains(GridPosition::new(6, 5)));
        // Still reachable around the blocker
        assert_eq!(reach.cost_to(GridPosition::new(7, 5)), Some(10));
    }

    #[test]
    fn test_dead_creatures_do_not_block() {
        let mut corpse = monster_at(6, 5);
        corpse.life = crate::LifeState::Dead;
        let reach = calculate_reachable_tiles(
            GridPosition::new(5, 5),
            5,
            &TerrainMap::new(),
            &[corpse],
            bounds(),
        );
        assert!(reach.contains(GridPosition::new(6, 5)));
    }

    #[test]
    fn test_find_path_open_ground_cost() {
        let result = find_path(
            GridPosition::new(0, 0),
            GridPosition::new(4, 2),
            &TerrainMap::new(),
            &[],
            bounds(),
            None,
        );
        assert!(result.is_valid);
        assert_eq!(result.total_cost, 20);
        assert_eq!(result.path.first(), Some(&GridPosition::new(0, 0)));
        assert_eq!(result.path.last(), Some(&GridPosition::new(4, 2)));
        assert_eq!(result.path.len(), 5);
    }

    #[test]
    fn test_find_path_may_end_on_occupied_square() {
        let target = monster_at(3, 0);
        let result = find_path(
            GridPosition::new(0, 0),
            GridPosition::new(3, 0),
            &TerrainMap::new(),
            &[target],
            bounds(),
            None,
        );
        assert!(result.is_valid);
        assert_eq!(result.total_cost, 15);
    }

    #[test]
    fn test_find_path_respects_budget_and_walls() {
        let over_budget = find_path(
            GridPosition::new(0, 0),
            GridPosition::new(6, 0),
            &TerrainMap::new(),
            &[],
            bounds(),
            Some(25),
        );
        assert!(!over_budget.is_valid);
        assert!(over_budget.path.is_empty());

        let wall: Vec<Tile> = (0..10)
            .map(|y| Tile::new(GridPosition::new(5, y), TerrainType::Wall))
            .collect();
        let sealed = find_path(
            GridPosition::new(0, 0),
            GridPosition::new(9, 0),
            &TerrainMap::from_tiles(wall),
            &[],
            bounds(),
            None,
        );
        assert!(!sealed.is_valid);
    }

    #[test]
    fn test_threatened_by_adjacent_living_creatures() {
        let creatures = vec![monster_at(4, 4), monster_at(7, 7)];
        let threats = get_threatened_by(GridPosition::new(5, 5), &creatures, None);
        assert_eq!(threats.len(), 1);
        assert_eq!(threats[0].position, GridPosition::new(4, 4));

        let excluded =
            get_threatened_by(GridPosition::new(5, 5), &creatures, Some(creatures[0].id));
        assert!(excluded.is_empty());
    }

    #[test]
    fn test_opportunity_attack_provoked_once() {
        let hero =
            Creature::new("Hero", CreatureKind::PlayerCharacter, GridPosition::new(1, 1), 20);
        let goblin = monster_at(0, 0);
        let creatures = vec![hero.clone(), goblin.clone()];
        // Leave reach, come back, leave again
        let path = [
            GridPosition::new(1, 1),
            GridPosition::new(2, 2),
            GridPosition::new(1, 1),
            GridPosition::new(2, 2),
        ];
        let provoked = check_opportunity_attacks(&path, &creatures, hero.id, hero.kind);
        assert_eq!(provoked.len(), 1);
        assert_eq!(provoked[0].id, goblin.id);
    }

    #[test]
    fn test_allies_do_not_provoke() {
        let hero =
            Creature::new("Hero", CreatureKind::PlayerCharacter, GridPosition::new(1, 1), 20);
        let ally =
            Creature::new("Guard", CreatureKind::NonPlayerCharacter, GridPosition::new(0, 0), 11);
        let creatures = vec![hero.clone(), ally];
        let path = [GridPosition::new(1, 1), GridPosition::new(2, 2)];
        assert!(check_opportunity_attacks(&path, &creatures, hero.id, hero.kind).is_empty());
    }

    #[test]
    fn test_fallen_or_stunned_enemies_do_not_provoke() {
        let hero =
            Creature::new("Hero", CreatureKind::PlayerCharacter, GridPosition::new(1, 1), 20);
        let mut dying = monster_at(0, 0);
        dying.life = crate::LifeState::Dying;
        let mut stunned = monster_at(0, 1);
        stunned.conditions.insert(crate::Condition::Stunned);
        let creatures = vec![hero.clone(), dying, stunned];

        assert_eq!(get_threatened_by(GridPosition::new(1, 1), &creatures, Some(hero.id)).len(), 2);
        let path = [GridPosition::new(1, 1), GridPosition::new(2, 2), GridPosition::new(3, 3)];
        assert!(check_opportunity_attacks(&path, &creatures, hero.id, hero.kind).is_empty());
    }

    #[test]
    fn test_large_creature_footprint_blocks_whole_block() {
        let ogre = monster_at(4, 4).with_size(crate::SizeClass::Large);
        let start = GridPosition::new(3, 4);
        let reach = calculate_reachable_tiles(start, 30, &TerrainMap::new(), &[ogre], bounds());
        for square in [(4, 4), (5, 4), (4, 5), (5, 5)] {
            assert!(!reach.contains(GridPosition::new(square.0, square.1)));
        }

        let beyond = GridPosition::new(6, 5);
        assert_eq!(reach.cost_to(beyond), Some(20));
        let path = reach.path_to(beyond).unwrap();
        assert!(path.iter().all(|square| !matches!((square.x, square.y), (4..=5, 4..=5))));

        let medium = monster_at(4, 4);
        let open = calculate_reachable_tiles(start, 30, &TerrainMap::new(), &[medium], bounds());
        assert_eq!(open.cost_to(beyond), Some(15));
    }

    #[test]
    fn test_moving_within_reach_does_not_provoke() {
        let hero =
            Creature::new("Hero", CreatureKind::PlayerCharacter, GridPosition::new(1, 0), 20);
        let goblin = monster_at(1, 1);
        let creatures = vec![hero.clone(), goblin];
        let path = [GridPosition::new(1, 0), GridPosition::new(2, 0)];
        assert!(check_opportunity_attacks(&path, &creatures, hero.id, hero.kind).is_empty());
    }
}
