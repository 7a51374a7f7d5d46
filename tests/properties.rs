//! Property tests over generated sessions: connectivity, determinism and the
//! invariants that must survive arbitrary player input.

use dungeon::{
    reachable_from, Action, Direction, Entity, EntityId, EntityRegistry, EntityStats, GameEvent,
    GameSession, Level, Position, SessionConfig, SessionState, TileType,
};
use proptest::prelude::*;
use std::collections::HashSet;

fn action_strategy() -> impl Strategy<Value = Action> {
    prop_oneof![
        4 => (0..8usize).prop_map(|i| Action::Move(Direction::all()[i])),
        1 => Just(Action::Wait),
        1 => (1..40u64).prop_map(|id| Action::Attack(EntityId(id))),
        1 => (1..40u64).prop_map(|id| Action::UseItem(EntityId(id))),
    ]
}

fn play(seed: u64, actions: &[Action]) -> (GameSession, Vec<Vec<GameEvent>>) {
    let mut session =
        GameSession::new(SessionConfig::for_testing(seed)).expect("test config is valid");
    let turns = actions
        .iter()
        .map(|&action| session.submit_player_action(action))
        .collect();
    (session, turns)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn every_walkable_tile_is_reachable_from_spawn(seed in any::<u64>()) {
        let session = GameSession::new(SessionConfig::for_testing(seed)).unwrap();
        let level = session.level();
        let reachable = reachable_from(level, level.player_spawn);

        for tile_type in [TileType::Floor, TileType::Door, TileType::Stairs] {
            for pos in level.positions_of(tile_type) {
                prop_assert!(reachable.contains(&pos), "{} at {} is cut off", tile_type.symbol(), pos);
            }
        }
        let stairs = level.stairs_position.unwrap();
        prop_assert!(reachable.contains(&stairs));
        prop_assert_ne!(stairs, level.player_spawn);
    }

    #[test]
    fn same_seed_same_actions_same_game(
        seed in 0..1_000u64,
        actions in prop::collection::vec(action_strategy(), 0..40),
    ) {
        let (first, first_events) = play(seed, &actions);
        let (second, second_events) = play(seed, &actions);

        prop_assert_eq!(first_events, second_events);
        prop_assert_eq!(first.level(), second.level());
        prop_assert_eq!(first.registry(), second.registry());
        prop_assert_eq!(first.save_to_json().unwrap(), second.save_to_json().unwrap());
    }

    #[test]
    fn invariants_hold_after_every_step(
        seed in 0..1_000u64,
        actions in prop::collection::vec(action_strategy(), 1..60),
    ) {
        let mut session = GameSession::new(SessionConfig::for_testing(seed)).unwrap();
        let mut dead: HashSet<EntityId> = HashSet::new();

        for action in actions {
            let terminal_before = session.state().is_terminal();
            let turn_before = session.turn_number();
            let events = session.submit_player_action(action);

            prop_assert!(session.check_invariants().is_ok(), "{:?}", session.check_invariants());
            if terminal_before {
                prop_assert!(events.is_empty());
                prop_assert_eq!(session.turn_number(), turn_before);
                continue;
            }
            prop_assert_eq!(session.turn_number(), turn_before + 1);

            for event in &events {
                match *event {
                    GameEvent::Attacked { attacker, target, amount, .. } => {
                        prop_assert!(amount >= 1);
                        prop_assert!(!dead.contains(&attacker));
                        prop_assert!(!dead.contains(&target));
                    }
                    GameEvent::EntityDied { entity, .. } => {
                        prop_assert!(dead.insert(entity));
                    }
                    GameEvent::Moved { entity, from, to } => {
                        prop_assert!(!dead.contains(&entity));
                        prop_assert!(from.is_adjacent(to));
                    }
                    _ => {}
                }
            }
        }
    }

    #[test]
    fn rejected_moves_are_idempotent(
        width in 5..20u32,
        height in 5..15u32,
        row in any::<prop::sample::Index>(),
        blocked in prop::sample::select(vec![Direction::West, Direction::Northwest, Direction::Southwest]),
        repeats in 1..5u64,
    ) {
        // The player stands against the west wall, so every westward step is blocked
        let level = Level::single_room(width, height).unwrap();
        let y = 1 + row.index(height as usize - 2) as i32;
        let start = Position::new(1, y);
        let mut registry = EntityRegistry::new();
        registry.spawn(Entity::player(start, 10, EntityStats::new(5, 0)));
        let mut session = GameSession::from_parts(SessionConfig::for_testing(3), level, registry).unwrap();

        let level_before = session.level().clone();
        let registry_before = session.registry().clone();
        let streams_before = session.streams().clone();

        for turn in 1..=repeats {
            let events = session.submit_player_action(Action::Move(blocked));
            prop_assert!(events.is_empty());
            prop_assert_eq!(session.turn_number(), turn);
            prop_assert_eq!(session.state(), SessionState::Active);
            prop_assert_eq!(session.level(), &level_before);
            prop_assert_eq!(session.registry(), &registry_before);
            prop_assert_eq!(session.streams(), &streams_before);
        }
    }
}
