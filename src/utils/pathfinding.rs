//! # Pathfinding Algorithms
//!
//! Grid searches over a [`Level`], built on the `pathfinding` crate's
//! breadth-first search. Every step costs the same, so BFS yields shortest
//! paths; neighbours are expanded in [`Direction::all`] order, which keeps
//! tie-breaking deterministic.

use crate::{Direction, EntityRegistry, Level, Position};
use ::pathfinding::prelude::{bfs, bfs_reach};
use std::collections::HashSet;

/// Every passable tile reachable from `start` using cardinal steps.
///
/// Level connectivity is defined with cardinal moves, which is stricter than
/// the 8-way movement actors use.
pub fn reachable_from(level: &Level, start: Position) -> HashSet<Position> {
    if !level.is_passable(start) {
        return HashSet::new();
    }
    bfs_reach(start, |pos| {
        pos.cardinal_adjacent_positions()
            .into_iter()
            .filter(|next| level.is_passable(*next))
            .collect::<Vec<_>>()
    })
    .collect()
}

/// Shortest 8-way path from `start` to `goal`, excluding `start`.
///
/// Tiles held by a living actor block the path, except the goal itself.
/// Returns `None` when the goal cannot be reached.
pub fn find_path(
    level: &Level,
    registry: &EntityRegistry,
    start: Position,
    goal: Position,
) -> Option<Vec<Position>> {
    let path = bfs(
        &start,
        |pos| {
            Direction::all()
                .into_iter()
                .map(|direction| pos.step(direction))
                .filter(|next| {
                    level.is_passable(*next)
                        && (*next == goal || registry.living_actor_at(*next).is_none())
                })
                .collect::<Vec<_>>()
        },
        |pos| *pos == goal,
    )?;
    Some(path.into_iter().skip(1).collect())
}

/// The first step of a shortest path from `from` toward `goal`.
pub fn next_step_towards(
    level: &Level,
    registry: &EntityRegistry,
    from: Position,
    goal: Position,
) -> Option<Direction> {
    let path = find_path(level, registry, from, goal)?;
    let next = path.first()?;
    Direction::from_delta(*next - from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Entity, EntityStats, MonsterKind};

    fn corridor_level() -> Level {
        Level::from_rows(&[
            "#########",
            "#@......#",
            "#.#####.#",
            "#......>#",
            "#########",
        ])
        .unwrap()
    }

    #[test]
    fn test_reachable_from_covers_connected_floor() {
        let level = corridor_level();
        let reachable = reachable_from(&level, level.player_spawn);
        let passable = level
            .tiles
            .iter()
            .flatten()
            .filter(|tile| tile.is_passable())
            .count();
        assert_eq!(reachable.len(), passable);
        assert!(reachable_from(&level, Position::new(0, 0)).is_empty());
    }

    #[test]
    fn test_find_path_is_shortest() {
        let level = corridor_level();
        let registry = EntityRegistry::new();
        let path = find_path(&level, &registry, Position::new(1, 1), Position::new(7, 3)).unwrap();
        // Diagonal moves through the corridor corners
        assert_eq!(path.len(), 7);
        assert_eq!(path.last(), Some(&Position::new(7, 3)));
    }

    #[test]
    fn test_living_actors_block_but_goal_does_not() {
        let level = Level::from_rows(&[
            "#######",
            "#@...>#",
            "#######",
        ])
        .unwrap();
        let mut registry = EntityRegistry::new();
        registry.spawn(Entity::monster(MonsterKind::Goblin, Position::new(3, 1), 6));

        assert!(find_path(&level, &registry, Position::new(1, 1), Position::new(5, 1)).is_none());
        assert_eq!(
            next_step_towards(&level, &registry, Position::new(2, 1), Position::new(3, 1)),
            Some(Direction::East)
        );
    }

    #[test]
    fn test_next_step_prefers_direction_order() {
        let level = Level::single_room(8, 8).unwrap();
        let mut registry = EntityRegistry::new();
        registry.spawn(Entity::player(Position::new(5, 5), 10, EntityStats::new(5, 0)));
        let step = next_step_towards(&level, &registry, Position::new(2, 2), Position::new(5, 5));
        assert_eq!(step, Some(Direction::Southeast));
    }
}
