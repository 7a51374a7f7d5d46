//! # Session View
//!
//! Copy-out snapshot of a session for presentation layers. A view owns its
//! data, so holding one never borrows the session.

use crate::{
    EntityId, EntityKind, EntityRegistry, ItemKind, Level, Position, SessionState, TileType,
};
use serde::{Deserialize, Serialize};

/// One grid cell as the presentation layer sees it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TileView {
    pub tile_type: TileType,
    pub discovered: bool,
}

/// A carried item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryEntry {
    pub id: EntityId,
    pub kind: ItemKind,
}

/// An entity on the map.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityView {
    pub id: EntityId,
    pub kind: EntityKind,
    pub position: Position,
    pub health: u32,
    pub max_health: u32,
    pub attack: u32,
    pub defense: u32,
    pub inventory: Vec<InventoryEntry>,
}

impl EntityView {
    /// Map symbol: `@` for the player, the kind's initial for monsters,
    /// `!` for potions and `*` for flares.
    pub fn symbol(&self) -> char {
        match self.kind {
            EntityKind::Player => '@',
            EntityKind::Monster(kind) => kind.name().chars().next().unwrap_or('M'),
            EntityKind::Item(ItemKind::Flare { .. }) => '*',
            EntityKind::Item(ItemKind::Treasure { .. }) => '$',
            EntityKind::Item(_) => '!',
        }
    }
}

/// Everything a renderer needs for one frame.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionView {
    pub width: u32,
    pub height: u32,
    /// Row-major, indexed `tiles[y][x]`
    pub tiles: Vec<Vec<TileView>>,
    /// Entities on the map in id order
    pub entities: Vec<EntityView>,
    pub player: Option<EntityId>,
    pub state: SessionState,
    pub turn: u64,
}

impl SessionView {
    /// Copies the presentation-relevant parts of a session.
    pub fn capture(
        level: &Level,
        registry: &EntityRegistry,
        state: SessionState,
        turn: u64,
    ) -> Self {
        let tiles = level
            .tiles
            .iter()
            .map(|row| {
                row.iter()
                    .map(|tile| TileView {
                        tile_type: tile.tile_type,
                        discovered: tile.discovered,
                    })
                    .collect()
            })
            .collect();

        let entities = registry
            .iter()
            .filter(|entity| entity.is_on_map())
            .map(|entity| EntityView {
                id: entity.id(),
                kind: entity.kind,
                position: entity.position(),
                health: entity.health(),
                max_health: entity.max_health(),
                attack: entity.stats.attack,
                defense: entity.stats.defense,
                inventory: entity
                    .inventory()
                    .iter()
                    .filter_map(|&id| {
                        registry
                            .get(id)
                            .and_then(|item| item.item_kind())
                            .map(|kind| InventoryEntry { id, kind })
                    })
                    .collect(),
            })
            .collect();

        Self {
            width: level.width,
            height: level.height,
            tiles,
            entities,
            player: registry.player().map(|player| player.id()),
            state,
            turn,
        }
    }

    pub fn tile(&self, pos: Position) -> Option<&TileView> {
        if pos.x < 0 || pos.y < 0 {
            return None;
        }
        self.tiles
            .get(pos.y as usize)
            .and_then(|row| row.get(pos.x as usize))
    }

    pub fn entity(&self, id: EntityId) -> Option<&EntityView> {
        self.entities.iter().find(|entity| entity.id == id)
    }

    pub fn player(&self) -> Option<&EntityView> {
        self.player.and_then(|id| self.entity(id))
    }

    /// Renders the view as text rows.
    ///
    /// Undiscovered tiles and whatever stands on them are blank unless
    /// `reveal_all` is set. Actors are drawn over items.
    pub fn to_ascii_rows(&self, reveal_all: bool) -> Vec<String> {
        let mut grid: Vec<Vec<char>> = self
            .tiles
            .iter()
            .map(|row| {
                row.iter()
                    .map(|tile| {
                        if reveal_all || tile.discovered {
                            tile.tile_type.symbol()
                        } else {
                            ' '
                        }
                    })
                    .collect()
            })
            .collect();

        let items = self
            .entities
            .iter()
            .filter(|entity| matches!(entity.kind, EntityKind::Item(_)));
        let actors = self
            .entities
            .iter()
            .filter(|entity| !matches!(entity.kind, EntityKind::Item(_)));
        for entity in items.chain(actors) {
            let visible = self
                .tile(entity.position)
                .map(|tile| reveal_all || tile.discovered)
                .unwrap_or(false);
            if !visible {
                continue;
            }
            if let Some(cell) = grid
                .get_mut(entity.position.y as usize)
                .and_then(|row| row.get_mut(entity.position.x as usize))
            {
                *cell = entity.symbol();
            }
        }

        grid.into_iter().map(|row| row.into_iter().collect()).collect()
    }
}
