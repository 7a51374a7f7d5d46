//! # Game Events
//!
//! Immutable records of what happened during a turn, in the order it happened.
//! Events are reported to the presentation layer and folded into statistics;
//! they are never replayed into game state.

use crate::{EntityId, ItemKind, Position};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Something that happened during a turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameEvent {
    /// An actor stepped to an adjacent tile
    Moved {
        entity: EntityId,
        from: Position,
        to: Position,
    },
    /// An actor hit another actor
    Attacked {
        attacker: EntityId,
        target: EntityId,
        amount: u32,
        remaining_health: u32,
    },
    /// An actor consumed an item from its inventory
    ItemUsed {
        entity: EntityId,
        item: EntityId,
        kind: ItemKind,
    },
    /// An actor collected a floor item
    ItemPickedUp { entity: EntityId, item: EntityId },
    /// The item just picked up was a named treasure
    TreasureFound {
        entity: EntityId,
        item: EntityId,
        treasure: u32,
    },
    /// An actor's health reached zero
    EntityDied {
        entity: EntityId,
        killer: Option<EntityId>,
    },
    /// The player reached the stairs
    LevelCompleted { entity: EntityId },
    /// An actor passed its turn
    Waited { entity: EntityId },
}

impl GameEvent {
    /// The entity that caused the event.
    pub fn actor(&self) -> EntityId {
        match self {
            GameEvent::Moved { entity, .. }
            | GameEvent::ItemUsed { entity, .. }
            | GameEvent::ItemPickedUp { entity, .. }
            | GameEvent::TreasureFound { entity, .. }
            | GameEvent::LevelCompleted { entity }
            | GameEvent::Waited { entity } => *entity,
            GameEvent::Attacked { attacker, .. } => *attacker,
            GameEvent::EntityDied { entity, killer } => killer.unwrap_or(*entity),
        }
    }
}

impl fmt::Display for GameEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GameEvent::Moved { entity, from, to } => {
                write!(f, "{} moved {} -> {}", entity, from, to)
            }
            GameEvent::Attacked {
                attacker,
                target,
                amount,
                remaining_health,
            } => write!(
                f,
                "{} hit {} for {} ({} left)",
                attacker, target, amount, remaining_health
            ),
            GameEvent::ItemUsed { entity, item, kind } => {
                write!(f, "{} used {} {}", entity, kind.name(), item)
            }
            GameEvent::ItemPickedUp { entity, item } => {
                write!(f, "{} picked up {}", entity, item)
            }
            GameEvent::TreasureFound { entity, treasure, .. } => write!(
                f,
                "{} found the {}",
                entity,
                ItemKind::Treasure { id: *treasure }.name()
            ),
            GameEvent::EntityDied {
                entity,
                killer: Some(killer),
            } => write!(f, "{} was slain by {}", entity, killer),
            GameEvent::EntityDied { entity, killer: None } => write!(f, "{} died", entity),
            GameEvent::LevelCompleted { entity } => {
                write!(f, "{} descended the stairs", entity)
            }
            GameEvent::Waited { entity } => write!(f, "{} waited", entity),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_display() {
        let event = GameEvent::Attacked {
            attacker: EntityId(2),
            target: EntityId(1),
            amount: 3,
            remaining_health: 7,
        };
        assert_eq!(event.to_string(), "#2 hit #1 for 3 (7 left)");
        assert_eq!(event.actor(), EntityId(2));
    }

    #[test]
    fn test_death_actor_is_killer() {
        let event = GameEvent::EntityDied {
            entity: EntityId(3),
            killer: Some(EntityId(1)),
        };
        assert_eq!(event.actor(), EntityId(1));
        assert_eq!(event.to_string(), "#3 was slain by #1");
    }

    #[test]
    fn test_treasure_event_names_the_treasure() {
        let event = GameEvent::TreasureFound {
            entity: EntityId(1),
            item: EntityId(6),
            treasure: 10,
        };
        assert_eq!(event.to_string(), "#1 found the Silmaril");
        assert_eq!(event.actor(), EntityId(1));
    }

    #[test]
    fn test_event_json_shape() {
        let event = GameEvent::Waited { entity: EntityId(4) };
        let json = serde_json::to_string(&event).unwrap();
        assert_eq!(json, r#"{"Waited":{"entity":4}}"#);
    }
}
