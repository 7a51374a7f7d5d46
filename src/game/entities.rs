//! # Entities
//!
//! Actors (the player and monsters) and the items they find and carry.
//!
//! Entities are plain data. They are owned by the [`EntityRegistry`], which is
//! the only place their position, health and inventory change.

use crate::{AiPolicy, EntityId, Position};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Combat statistics of an actor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityStats {
    pub attack: u32,
    pub defense: u32,
}

impl EntityStats {
    pub fn new(attack: u32, defense: u32) -> Self {
        Self { attack, defense }
    }
}

/// The fixed monster roster, weakest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MonsterKind {
    Skeleton,
    Goblin,
    Kobold,
    Orc,
    Troll,
    Werewolf,
    Banshee,
    Hellhound,
    Chimaera,
    Dragon,
}

impl MonsterKind {
    /// Every kind, ordered by level.
    pub fn all() -> [MonsterKind; 10] {
        [
            MonsterKind::Skeleton,
            MonsterKind::Goblin,
            MonsterKind::Kobold,
            MonsterKind::Orc,
            MonsterKind::Troll,
            MonsterKind::Werewolf,
            MonsterKind::Banshee,
            MonsterKind::Hellhound,
            MonsterKind::Chimaera,
            MonsterKind::Dragon,
        ]
    }

    /// Monster level, 1 (Skeleton) through 10 (Dragon).
    pub fn level(self) -> u32 {
        match self {
            MonsterKind::Skeleton => 1,
            MonsterKind::Goblin => 2,
            MonsterKind::Kobold => 3,
            MonsterKind::Orc => 4,
            MonsterKind::Troll => 5,
            MonsterKind::Werewolf => 6,
            MonsterKind::Banshee => 7,
            MonsterKind::Hellhound => 8,
            MonsterKind::Chimaera => 9,
            MonsterKind::Dragon => 10,
        }
    }

    /// Looks a kind up by level.
    ///
    /// # Examples
    ///
    /// ```
    /// use dungeon::MonsterKind;
    ///
    /// assert_eq!(MonsterKind::from_level(1), Some(MonsterKind::Skeleton));
    /// assert_eq!(MonsterKind::from_level(10), Some(MonsterKind::Dragon));
    /// assert_eq!(MonsterKind::from_level(11), None);
    /// ```
    pub fn from_level(level: u32) -> Option<MonsterKind> {
        MonsterKind::all()
            .into_iter()
            .find(|kind| kind.level() == level)
    }

    pub fn name(self) -> &'static str {
        match self {
            MonsterKind::Skeleton => "Skeleton",
            MonsterKind::Goblin => "Goblin",
            MonsterKind::Kobold => "Kobold",
            MonsterKind::Orc => "Orc",
            MonsterKind::Troll => "Troll",
            MonsterKind::Werewolf => "Werewolf",
            MonsterKind::Banshee => "Banshee",
            MonsterKind::Hellhound => "Hellhound",
            MonsterKind::Chimaera => "Chimaera",
            MonsterKind::Dragon => "Dragon",
        }
    }

    /// Base health before the spawn roll of `0..=3` is added.
    pub fn base_health(self) -> u32 {
        3 * self.level()
    }

    pub fn base_stats(self) -> EntityStats {
        EntityStats::new(2 + self.level(), self.level() / 3)
    }

    /// The behaviour this kind follows on its turn.
    pub fn ai_policy(self) -> AiPolicy {
        match self {
            MonsterKind::Kobold | MonsterKind::Banshee => AiPolicy::Wander,
            MonsterKind::Chimaera | MonsterKind::Dragon => AiPolicy::Stationary,
            _ => AiPolicy::Chase,
        }
    }
}

/// The named treasures; `ItemKind::Treasure { id }` refers to entry `id - 1`.
pub const TREASURE_NAMES: [&str; 10] = [
    "Gold Fleece",
    "Black Pearl",
    "Ruby Ring",
    "Diamond Clasp",
    "Silver Medallion",
    "Precious Spices",
    "Sapphire",
    "Golden Circlet",
    "Jeweled Cross",
    "Silmaril",
];

/// Items that can lie on the floor or be carried.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ItemKind {
    /// Restores health, capped at the user's maximum
    HealingPotion { amount: u32 },
    /// Permanently raises attack
    StrengthPotion { bonus: u32 },
    /// Reveals every tile within `radius` of the user
    Flare { radius: u32 },
    /// One of the named treasures. Collected, never consumed.
    Treasure { id: u32 },
}

impl ItemKind {
    pub fn name(self) -> &'static str {
        match self {
            ItemKind::HealingPotion { .. } => "healing potion",
            ItemKind::StrengthPotion { .. } => "strength potion",
            ItemKind::Flare { .. } => "flare",
            ItemKind::Treasure { id } => id
                .checked_sub(1)
                .and_then(|index| TREASURE_NAMES.get(index as usize))
                .copied()
                .unwrap_or("treasure"),
        }
    }

    /// Whether `UseItem` can consume this item.
    pub fn is_usable(self) -> bool {
        !matches!(self, ItemKind::Treasure { .. })
    }
}

/// What an entity is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EntityKind {
    Player,
    Monster(MonsterKind),
    Item(ItemKind),
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityKind::Player => write!(f, "player"),
            EntityKind::Monster(kind) => write!(f, "{}", kind.name()),
            EntityKind::Item(kind) => write!(f, "{}", kind.name()),
        }
    }
}

/// A player, monster or item.
///
/// Fields that must stay consistent with the registry's position index are
/// crate-private; read them through the accessors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    pub(crate) id: EntityId,
    pub kind: EntityKind,
    pub stats: EntityStats,
    pub(crate) position: Position,
    pub(crate) health: u32,
    pub(crate) max_health: u32,
    /// Carried item ids, in pick-up order
    pub(crate) inventory: Vec<EntityId>,
    /// The actor carrying this item; `None` while it lies on the floor
    pub(crate) holder: Option<EntityId>,
}

impl Entity {
    fn new(kind: EntityKind, position: Position, health: u32, stats: EntityStats) -> Self {
        Self {
            // Assigned by EntityRegistry::spawn
            id: EntityId(0),
            kind,
            stats,
            position,
            health,
            max_health: health,
            inventory: Vec::new(),
            holder: None,
        }
    }

    /// Creates the player character.
    ///
    /// # Examples
    ///
    /// ```
    /// use dungeon::{Entity, EntityStats, Position};
    ///
    /// let player = Entity::player(Position::new(3, 4), 10, EntityStats::new(5, 0));
    /// assert!(player.is_player());
    /// assert!(player.is_alive());
    /// assert_eq!(player.health(), 10);
    /// ```
    pub fn player(position: Position, health: u32, stats: EntityStats) -> Self {
        Self::new(EntityKind::Player, position, health, stats)
    }

    /// Creates a monster with its kind's base stats.
    pub fn monster(kind: MonsterKind, position: Position, health: u32) -> Self {
        Self::new(EntityKind::Monster(kind), position, health, kind.base_stats())
    }

    /// Creates a monster with explicit stats.
    pub fn monster_with_stats(
        kind: MonsterKind,
        position: Position,
        health: u32,
        stats: EntityStats,
    ) -> Self {
        Self::new(EntityKind::Monster(kind), position, health, stats)
    }

    /// Creates an item lying on the floor.
    pub fn item(kind: ItemKind, position: Position) -> Self {
        Self::new(EntityKind::Item(kind), position, 0, EntityStats::new(0, 0))
    }

    pub fn id(&self) -> EntityId {
        self.id
    }

    /// Current position. Carried items report their holder's last known tile.
    pub fn position(&self) -> Position {
        self.position
    }

    pub fn health(&self) -> u32 {
        self.health
    }

    pub fn max_health(&self) -> u32 {
        self.max_health
    }

    pub fn inventory(&self) -> &[EntityId] {
        &self.inventory
    }

    pub fn holder(&self) -> Option<EntityId> {
        self.holder
    }

    pub fn is_player(&self) -> bool {
        self.kind == EntityKind::Player
    }

    /// Players and monsters take turns; items do not.
    pub fn is_actor(&self) -> bool {
        matches!(self.kind, EntityKind::Player | EntityKind::Monster(_))
    }

    /// An actor with health left. Items are never alive.
    pub fn is_alive(&self) -> bool {
        self.is_actor() && self.health > 0
    }

    /// Whether the entity occupies a tile (items in an inventory do not).
    pub fn is_on_map(&self) -> bool {
        self.holder.is_none()
    }

    pub fn item_kind(&self) -> Option<ItemKind> {
        match self.kind {
            EntityKind::Item(kind) => Some(kind),
            _ => None,
        }
    }

    pub fn monster_kind(&self) -> Option<MonsterKind> {
        match self.kind {
            EntityKind::Monster(kind) => Some(kind),
            _ => None,
        }
    }

    /// Display name used in logs.
    pub fn name(&self) -> String {
        self.kind.to_string()
    }
}
