//! # Actions
//!
//! The four things an actor can do on its turn and the resolver that
//! validates and applies them.
//!
//! Resolution is two-phase: every precondition is checked against the current
//! state first, and only a fully valid action mutates anything. A rejected
//! action leaves level, registry and random stream untouched.

use crate::{
    Direction, DungeonResult, EntityId, EntityRegistry, GameEvent, ItemKind, Level, Position,
    RandomStream, RulesConfig,
};
use log::{debug, trace};
use serde::{Deserialize, Serialize};
use std::fmt;

/// An intended action for one actor's turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Action {
    /// Step one tile in a direction
    Move(Direction),
    /// Strike an adjacent actor
    Attack(EntityId),
    /// Consume an item from the actor's inventory
    UseItem(EntityId),
    /// Do nothing this turn
    Wait,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Move(direction) => write!(f, "move {:?}", direction),
            Action::Attack(target) => write!(f, "attack {}", target),
            Action::UseItem(item) => write!(f, "use {}", item),
            Action::Wait => write!(f, "wait"),
        }
    }
}

/// Why an action was not applied.
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Rejection {
    #[error("actor does not exist")]
    UnknownActor,
    #[error("actor is dead")]
    DeadActor,
    #[error("{0} is outside the level")]
    OutOfBounds(Position),
    #[error("{0} is not passable")]
    Blocked(Position),
    #[error("{0} is occupied by {1}")]
    Occupied(Position, EntityId),
    #[error("{0} is not a living target")]
    InvalidTarget(EntityId),
    #[error("{0} is out of reach")]
    OutOfReach(EntityId),
    #[error("{0} is not in the inventory")]
    NotCarried(EntityId),
    #[error("{0} cannot be used")]
    NotUsable(EntityId),
}

/// Result of resolving one action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionOutcome {
    /// Whether the action changed anything
    pub applied: bool,
    /// Events produced, in order; empty when rejected
    pub events: Vec<GameEvent>,
    /// Reason for a rejection
    pub rejection: Option<Rejection>,
}

impl ActionOutcome {
    fn applied(events: Vec<GameEvent>) -> Self {
        Self {
            applied: true,
            events,
            rejection: None,
        }
    }

    fn rejected(reason: Rejection) -> Self {
        Self {
            applied: false,
            events: Vec::new(),
            rejection: Some(reason),
        }
    }
}

/// A validated action, carrying everything the apply phase needs.
enum Plan {
    Move { to: Position, pick_up: bool },
    Attack { target: EntityId },
    UseItem { item: EntityId, kind: ItemKind },
    Wait,
}

/// Validates and applies single actions against the session state.
#[derive(Debug, Clone)]
pub struct ActionResolver {
    rules: RulesConfig,
}

impl ActionResolver {
    pub fn new(rules: RulesConfig) -> Self {
        Self { rules }
    }

    /// Resolves `action` for `actor`.
    ///
    /// Combat variance is drawn from `combat` only once an attack has been
    /// validated.
    ///
    /// # Panics
    ///
    /// Panics if the registry refuses a mutation that validation already
    /// approved, which means its internal state is corrupt.
    pub fn resolve(
        &self,
        actor: EntityId,
        action: &Action,
        level: &mut Level,
        registry: &mut EntityRegistry,
        combat: &mut RandomStream,
    ) -> ActionOutcome {
        let plan = match self.validate(actor, action, level, registry) {
            Ok(plan) => plan,
            Err(reason) => {
                debug!("Rejected {} for {}: {}", action, actor, reason);
                return ActionOutcome::rejected(reason);
            }
        };

        match self.apply(actor, plan, level, registry, combat) {
            Ok(events) => {
                trace!("{} performed {} ({} events)", actor, action, events.len());
                ActionOutcome::applied(events)
            }
            Err(err) => panic!("validated {} for {} failed to apply: {}", action, actor, err),
        }
    }

    /// Damage an attack deals after the defender's defense is reduced by the
    /// variance roll. Always at least 1.
    pub fn damage(attack: u32, defense: u32, variance_roll: u32) -> u32 {
        attack.saturating_sub(defense.saturating_sub(variance_roll)).max(1)
    }

    fn validate(
        &self,
        actor: EntityId,
        action: &Action,
        level: &Level,
        registry: &EntityRegistry,
    ) -> Result<Plan, Rejection> {
        let entity = registry.get(actor).ok_or(Rejection::UnknownActor)?;
        if !entity.is_alive() {
            return Err(Rejection::DeadActor);
        }

        match *action {
            Action::Move(direction) => {
                let to = entity.position().step(direction);
                if !level.is_valid_position(to) {
                    return Err(Rejection::OutOfBounds(to));
                }
                if !level.is_passable(to) {
                    return Err(Rejection::Blocked(to));
                }
                if let Some(occupant) = registry.living_actor_at(to) {
                    return Err(Rejection::Occupied(to, occupant));
                }
                Ok(Plan::Move {
                    to,
                    pick_up: entity.is_player(),
                })
            }
            Action::Attack(target) => {
                let victim = registry
                    .get(target)
                    .filter(|victim| victim.is_alive() && victim.id() != actor)
                    .ok_or(Rejection::InvalidTarget(target))?;
                if !entity.position().is_adjacent(victim.position()) {
                    return Err(Rejection::OutOfReach(target));
                }
                Ok(Plan::Attack { target })
            }
            Action::UseItem(item) => {
                if !entity.inventory().contains(&item) {
                    return Err(Rejection::NotCarried(item));
                }
                let kind = registry
                    .get(item)
                    .and_then(|carried| carried.item_kind())
                    .ok_or(Rejection::NotCarried(item))?;
                if !kind.is_usable() {
                    return Err(Rejection::NotUsable(item));
                }
                Ok(Plan::UseItem { item, kind })
            }
            Action::Wait => Ok(Plan::Wait),
        }
    }

    fn apply(
        &self,
        actor: EntityId,
        plan: Plan,
        level: &mut Level,
        registry: &mut EntityRegistry,
        combat: &mut RandomStream,
    ) -> DungeonResult<Vec<GameEvent>> {
        let mut events = Vec::new();
        match plan {
            Plan::Move { to, pick_up } => {
                let from = registry.move_entity(actor, to)?;
                events.push(GameEvent::Moved {
                    entity: actor,
                    from,
                    to,
                });
                if pick_up {
                    for item in registry.items_at(to) {
                        let kind = registry.get(item).and_then(|entity| entity.item_kind());
                        registry.pick_up(actor, item)?;
                        events.push(GameEvent::ItemPickedUp {
                            entity: actor,
                            item,
                        });
                        if let Some(ItemKind::Treasure { id }) = kind {
                            debug!("{} found treasure {}", actor, id);
                            events.push(GameEvent::TreasureFound {
                                entity: actor,
                                item,
                                treasure: id,
                            });
                        }
                    }
                }
            }
            Plan::Attack { target } => {
                let attack = registry
                    .get(actor)
                    .map(|entity| entity.stats.attack)
                    .unwrap_or_default();
                let defense = registry
                    .get(target)
                    .map(|entity| entity.stats.defense)
                    .unwrap_or_default();
                let variance = combat.next(self.rules.combat_variance.saturating_add(1));
                let amount = Self::damage(attack, defense, variance);
                let remaining_health = registry.apply_damage(target, amount)?;
                events.push(GameEvent::Attacked {
                    attacker: actor,
                    target,
                    amount,
                    remaining_health,
                });

                if remaining_health == 0 {
                    let dropped = registry.drop_inventory(target)?;
                    registry.remove(target);
                    debug!("{} killed {}, dropping {} items", actor, target, dropped.len());
                    events.push(GameEvent::EntityDied {
                        entity: target,
                        killer: Some(actor),
                    });
                }
            }
            Plan::UseItem { item, kind } => {
                registry.take_from_inventory(actor, item);
                match kind {
                    ItemKind::HealingPotion { amount } => {
                        registry.heal(actor, amount)?;
                    }
                    ItemKind::StrengthPotion { bonus } => {
                        registry.boost_attack(actor, bonus)?;
                    }
                    ItemKind::Flare { radius } => {
                        if let Some(entity) = registry.get(actor) {
                            level.reveal_around(entity.position(), radius);
                        }
                    }
                    // Never planned: validation rejects unusable items
                    ItemKind::Treasure { .. } => {}
                }
                events.push(GameEvent::ItemUsed {
                    entity: actor,
                    item,
                    kind,
                });
            }
            Plan::Wait => events.push(GameEvent::Waited { entity: actor }),
        }
        Ok(events)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Entity, EntityStats, MonsterKind};

    struct Arena {
        level: Level,
        registry: EntityRegistry,
        combat: RandomStream,
        resolver: ActionResolver,
        player: EntityId,
    }

    impl Arena {
        fn new() -> Self {
            let level = Level::single_room(10, 8).unwrap();
            let mut registry = EntityRegistry::new();
            let player = registry.spawn(Entity::player(
                Position::new(3, 3),
                10,
                EntityStats::new(5, 0),
            ));
            Self {
                level,
                registry,
                combat: RandomStream::new(42),
                resolver: ActionResolver::new(RulesConfig::default()),
                player,
            }
        }

        fn resolve(&mut self, actor: EntityId, action: Action) -> ActionOutcome {
            self.resolver.resolve(
                actor,
                &action,
                &mut self.level,
                &mut self.registry,
                &mut self.combat,
            )
        }
    }

    #[test]
    fn test_damage_formula() {
        assert_eq!(ActionResolver::damage(3, 0, 0), 3);
        assert_eq!(ActionResolver::damage(5, 2, 1), 4);
        assert_eq!(ActionResolver::damage(5, 2, 5), 5);
        assert_eq!(ActionResolver::damage(1, 9, 0), 1);
        assert_eq!(ActionResolver::damage(0, 0, 0), 1);
    }

    #[test]
    fn test_move_applies_and_emits_event() {
        let mut arena = Arena::new();
        let player = arena.player;
        let outcome = arena.resolve(player, Action::Move(Direction::East));

        assert!(outcome.applied);
        assert_eq!(
            outcome.events,
            vec![GameEvent::Moved {
                entity: player,
                from: Position::new(3, 3),
                to: Position::new(4, 3),
            }]
        );
    }

    #[test]
    fn test_move_into_wall_is_rejected_without_side_effects() {
        let mut arena = Arena::new();
        let player = arena.player;
        arena.registry.move_entity(player, Position::new(1, 1)).unwrap();
        let before = (arena.registry.clone(), arena.combat.clone());

        for _ in 0..3 {
            let outcome = arena.resolve(player, Action::Move(Direction::Northwest));
            assert!(!outcome.applied);
            assert!(outcome.events.is_empty());
            assert_eq!(outcome.rejection, Some(Rejection::Blocked(Position::new(0, 0))));
        }
        assert_eq!((arena.registry, arena.combat), before);
    }

    #[test]
    fn test_move_onto_actor_is_rejected() {
        let mut arena = Arena::new();
        let player = arena.player;
        let goblin = arena
            .registry
            .spawn(Entity::monster(MonsterKind::Goblin, Position::new(4, 3), 6));
        let outcome = arena.resolve(player, Action::Move(Direction::East));
        assert_eq!(
            outcome.rejection,
            Some(Rejection::Occupied(Position::new(4, 3), goblin))
        );
    }

    #[test]
    fn test_player_picks_up_items_on_arrival() {
        let mut arena = Arena::new();
        let player = arena.player;
        let flare = arena
            .registry
            .spawn(Entity::item(ItemKind::Flare { radius: 3 }, Position::new(3, 4)));
        let outcome = arena.resolve(player, Action::Move(Direction::South));

        assert_eq!(outcome.events.len(), 2);
        assert_eq!(
            outcome.events[1],
            GameEvent::ItemPickedUp {
                entity: player,
                item: flare
            }
        );
        assert_eq!(arena.registry.get(player).unwrap().inventory(), &[flare]);
    }

    #[test]
    fn test_treasure_is_found_but_not_usable() {
        let mut arena = Arena::new();
        let player = arena.player;
        let ring = arena
            .registry
            .spawn(Entity::item(ItemKind::Treasure { id: 3 }, Position::new(4, 3)));
        let outcome = arena.resolve(player, Action::Move(Direction::East));
        assert_eq!(
            outcome.events[1..].to_vec(),
            vec![
                GameEvent::ItemPickedUp {
                    entity: player,
                    item: ring
                },
                GameEvent::TreasureFound {
                    entity: player,
                    item: ring,
                    treasure: 3
                },
            ]
        );

        let before = arena.registry.clone();
        let outcome = arena.resolve(player, Action::UseItem(ring));
        assert_eq!(outcome.rejection, Some(Rejection::NotUsable(ring)));
        assert_eq!(arena.registry, before);
    }

    #[test]
    fn test_monsters_walk_over_items() {
        let mut arena = Arena::new();
        let goblin = arena
            .registry
            .spawn(Entity::monster(MonsterKind::Goblin, Position::new(6, 3), 6));
        let flare = arena
            .registry
            .spawn(Entity::item(ItemKind::Flare { radius: 3 }, Position::new(7, 3)));
        let outcome = arena.resolve(goblin, Action::Move(Direction::East));

        assert_eq!(outcome.events.len(), 1);
        assert_eq!(arena.registry.items_at(Position::new(7, 3)), vec![flare]);
    }

    #[test]
    fn test_monster_attack_on_player() {
        let mut arena = Arena::new();
        let player = arena.player;
        let monster = arena.registry.spawn(Entity::monster_with_stats(
            MonsterKind::Orc,
            Position::new(4, 4),
            12,
            EntityStats::new(3, 0),
        ));
        let outcome = arena.resolve(monster, Action::Attack(player));

        assert!(outcome.applied);
        assert_eq!(
            outcome.events,
            vec![GameEvent::Attacked {
                attacker: monster,
                target: player,
                amount: 3,
                remaining_health: 7,
            }]
        );
        assert_eq!(arena.registry.get(player).unwrap().health(), 7);
    }

    #[test]
    fn test_attack_out_of_reach_or_self_is_rejected() {
        let mut arena = Arena::new();
        let player = arena.player;
        let goblin = arena
            .registry
            .spawn(Entity::monster(MonsterKind::Goblin, Position::new(6, 3), 6));
        let before = arena.combat.clone();

        let far = arena.resolve(player, Action::Attack(goblin));
        assert_eq!(far.rejection, Some(Rejection::OutOfReach(goblin)));
        let own = arena.resolve(player, Action::Attack(player));
        assert_eq!(own.rejection, Some(Rejection::InvalidTarget(player)));
        let ghost = arena.resolve(player, Action::Attack(EntityId(77)));
        assert_eq!(ghost.rejection, Some(Rejection::InvalidTarget(EntityId(77))));

        assert_eq!(arena.combat, before);
    }

    #[test]
    fn test_kill_removes_victim_and_drops_loot() {
        let mut arena = Arena::new();
        let player = arena.player;
        let skeleton = arena
            .registry
            .spawn(Entity::monster(MonsterKind::Skeleton, Position::new(4, 3), 2));
        let potion = arena.registry.spawn(Entity::item(
            ItemKind::HealingPotion { amount: 4 },
            Position::new(4, 3),
        ));
        arena.registry.pick_up(skeleton, potion).unwrap();

        let outcome = arena.resolve(player, Action::Attack(skeleton));
        assert_eq!(
            outcome.events.last(),
            Some(&GameEvent::EntityDied {
                entity: skeleton,
                killer: Some(player)
            })
        );
        assert!(!arena.registry.contains(skeleton));
        assert_eq!(arena.registry.items_at(Position::new(4, 3)), vec![potion]);

        // The corpse is gone; attacking again is rejected
        let again = arena.resolve(player, Action::Attack(skeleton));
        assert!(!again.applied);
    }

    #[test]
    fn test_use_items() {
        let mut arena = Arena::new();
        let player = arena.player;
        arena.registry.apply_damage(player, 6).unwrap();

        let potion = arena.registry.spawn(Entity::item(
            ItemKind::HealingPotion { amount: 10 },
            Position::new(3, 3),
        ));
        let strength = arena.registry.spawn(Entity::item(
            ItemKind::StrengthPotion { bonus: 2 },
            Position::new(3, 3),
        ));
        let flare = arena
            .registry
            .spawn(Entity::item(ItemKind::Flare { radius: 20 }, Position::new(3, 3)));
        for item in [potion, strength, flare] {
            arena.registry.pick_up(player, item).unwrap();
        }

        assert!(arena.resolve(player, Action::UseItem(potion)).applied);
        assert_eq!(arena.registry.get(player).unwrap().health(), 10);

        assert!(arena.resolve(player, Action::UseItem(strength)).applied);
        assert_eq!(arena.registry.get(player).unwrap().stats.attack, 7);

        let outcome = arena.resolve(player, Action::UseItem(flare));
        assert_eq!(
            outcome.events,
            vec![GameEvent::ItemUsed {
                entity: player,
                item: flare,
                kind: ItemKind::Flare { radius: 20 },
            }]
        );
        assert!(arena.level.tiles.iter().flatten().all(|tile| tile.discovered));

        // Consumed items are gone
        let again = arena.resolve(player, Action::UseItem(potion));
        assert_eq!(again.rejection, Some(Rejection::NotCarried(potion)));
        assert!(arena.registry.get(player).unwrap().inventory().is_empty());
    }

    #[test]
    fn test_wait_and_dead_actors() {
        let mut arena = Arena::new();
        let player = arena.player;
        let outcome = arena.resolve(player, Action::Wait);
        assert_eq!(outcome.events, vec![GameEvent::Waited { entity: player }]);

        let corpse = arena
            .registry
            .spawn(Entity::monster(MonsterKind::Orc, Position::new(5, 5), 0));
        let dead = arena.resolve(corpse, Action::Wait);
        assert_eq!(dead.rejection, Some(Rejection::DeadActor));
        let unknown = arena.resolve(EntityId(99), Action::Wait);
        assert_eq!(unknown.rejection, Some(Rejection::UnknownActor));
    }
}
