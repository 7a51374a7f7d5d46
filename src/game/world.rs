//! # World Representation
//!
//! Tiles and the single-floor [`Level`] grid the simulation runs on.

use crate::utils::reachable_from;
use crate::{config, DungeonError, DungeonResult, Position, Room, RoomType};
use serde::{Deserialize, Serialize};

/// The kind of terrain occupying a grid cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TileType {
    /// Solid rock; blocks movement
    Wall,
    /// Open ground inside rooms and corridors
    Floor,
    /// Opening where a corridor meets a room wall; always open
    Door,
    /// The way down; reaching it completes the level
    Stairs,
}

impl TileType {
    /// Whether actors can stand on this terrain.
    pub fn is_passable(self) -> bool {
        !matches!(self, TileType::Wall)
    }

    /// Single-character map symbol.
    pub fn symbol(self) -> char {
        match self {
            TileType::Wall => '#',
            TileType::Floor => '.',
            TileType::Door => '+',
            TileType::Stairs => '>',
        }
    }
}

/// A single grid cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tile {
    pub tile_type: TileType,
    /// Set once the player has seen the cell; never cleared
    pub discovered: bool,
}

impl Tile {
    /// Creates an undiscovered tile of the given type.
    pub fn new(tile_type: TileType) -> Self {
        Self {
            tile_type,
            discovered: false,
        }
    }

    pub fn wall() -> Self {
        Self::new(TileType::Wall)
    }

    pub fn floor() -> Self {
        Self::new(TileType::Floor)
    }

    pub fn is_passable(&self) -> bool {
        self.tile_type.is_passable()
    }
}

/// A corridor link between two rooms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Corridor {
    pub from_room: u32,
    pub to_room: u32,
}

/// One dungeon floor: the tile grid, its rooms and their corridor graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Level {
    pub width: u32,
    pub height: u32,
    /// Row-major tiles, indexed `tiles[y][x]`
    pub tiles: Vec<Vec<Tile>>,
    pub rooms: Vec<Room>,
    pub corridors: Vec<Corridor>,
    /// Where the player enters the level
    pub player_spawn: Position,
    /// The single stairs tile
    pub stairs_position: Option<Position>,
}

impl Level {
    /// Creates a level of solid wall.
    ///
    /// # Examples
    ///
    /// ```
    /// use dungeon::{Level, Position, TileType};
    ///
    /// let level = Level::new(10, 8);
    /// assert_eq!(level.get_tile(Position::new(3, 3)).unwrap().tile_type, TileType::Wall);
    /// assert!(level.get_tile(Position::new(10, 0)).is_none());
    /// ```
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            tiles: vec![vec![Tile::wall(); width as usize]; height as usize],
            rooms: Vec::new(),
            corridors: Vec::new(),
            player_spawn: Position::new(0, 0),
            stairs_position: None,
        }
    }

    /// Creates a walled single-room level.
    ///
    /// The player spawns at the room centre. The stairs take the last floor
    /// tile in row order that is not the spawn, which is the bottom-right
    /// floor corner unless the room is too small to keep them apart.
    pub fn single_room(width: u32, height: u32) -> DungeonResult<Self> {
        if width < 4 || height < 4 {
            return Err(DungeonError::invalid_config(
                "width/height",
                format!("a single room needs at least 4x4 tiles, got {}x{}", width, height),
            ));
        }
        if width > config::MAX_DUNGEON_DIMENSION || height > config::MAX_DUNGEON_DIMENSION {
            return Err(DungeonError::invalid_config(
                "width/height",
                format!(
                    "at most {0}x{0} tiles, got {1}x{2}",
                    config::MAX_DUNGEON_DIMENSION,
                    width,
                    height
                ),
            ));
        }

        let mut level = Level::new(width, height);
        let room = Room::new(0, Position::new(0, 0), width, height, RoomType::Entrance);
        let floor = room.floor_positions();
        for &pos in &floor {
            level.set_tile(pos, Tile::floor())?;
        }
        let spawn = room.center();
        let stairs = floor
            .iter()
            .rev()
            .copied()
            .find(|&pos| pos != spawn)
            .ok_or_else(|| {
                DungeonError::GenerationFailed("single room has no tile for the stairs".to_string())
            })?;
        level.set_tile(stairs, Tile::new(TileType::Stairs))?;
        level.stairs_position = Some(stairs);
        level.player_spawn = spawn;
        level.rooms.push(room);
        Ok(level)
    }

    /// Parses a level from rows of map symbols.
    ///
    /// `#` wall, `.` floor, `+` door, `>` stairs, `@` floor marking the
    /// player spawn. Rows must share one width and exactly one `>` must exist.
    ///
    /// # Examples
    ///
    /// ```
    /// use dungeon::{Level, Position, TileType};
    ///
    /// let level = Level::from_rows(&[
    ///     "#####",
    ///     "#@.>#",
    ///     "#####",
    /// ]).unwrap();
    /// assert_eq!(level.player_spawn, Position::new(1, 1));
    /// assert_eq!(level.stairs_position, Some(Position::new(3, 1)));
    /// ```
    pub fn from_rows(rows: &[&str]) -> DungeonResult<Self> {
        let height = rows.len() as u32;
        let width = rows.first().map(|row| row.chars().count()).unwrap_or(0) as u32;
        if width == 0 || height == 0 {
            return Err(DungeonError::invalid_config("rows", "level map is empty"));
        }

        let mut level = Level::new(width, height);
        let mut spawn = None;
        for (y, row) in rows.iter().enumerate() {
            if row.chars().count() as u32 != width {
                return Err(DungeonError::invalid_config(
                    "rows",
                    format!("row {} has a different width", y),
                ));
            }
            for (x, symbol) in row.chars().enumerate() {
                let pos = Position::new(x as i32, y as i32);
                let tile_type = match symbol {
                    '#' => TileType::Wall,
                    '.' => TileType::Floor,
                    '+' => TileType::Door,
                    '>' => {
                        if level.stairs_position.is_some() {
                            return Err(DungeonError::invalid_config(
                                "rows",
                                "level map has more than one stairs tile",
                            ));
                        }
                        level.stairs_position = Some(pos);
                        TileType::Stairs
                    }
                    '@' => {
                        spawn = Some(pos);
                        TileType::Floor
                    }
                    other => {
                        return Err(DungeonError::invalid_config(
                            "rows",
                            format!("unknown map symbol '{}' at {}", other, pos),
                        ))
                    }
                };
                level.set_tile(pos, Tile::new(tile_type))?;
            }
        }

        if level.stairs_position.is_none() {
            return Err(DungeonError::invalid_config(
                "rows",
                "level map has no stairs tile",
            ));
        }
        let fallback = level
            .positions_of(TileType::Floor)
            .next()
            .unwrap_or(Position::new(0, 0));
        level.player_spawn = spawn.unwrap_or(fallback);
        Ok(level)
    }

    /// Checks if a position lies within the level bounds.
    pub fn is_valid_position(&self, pos: Position) -> bool {
        pos.x >= 0 && pos.y >= 0 && (pos.x as u32) < self.width && (pos.y as u32) < self.height
    }

    /// Gets the tile at a position.
    pub fn get_tile(&self, pos: Position) -> Option<&Tile> {
        if !self.is_valid_position(pos) {
            return None;
        }
        self.tiles
            .get(pos.y as usize)
            .and_then(|row| row.get(pos.x as usize))
    }

    /// Gets the tile at a position mutably.
    pub fn get_tile_mut(&mut self, pos: Position) -> Option<&mut Tile> {
        if !self.is_valid_position(pos) {
            return None;
        }
        self.tiles
            .get_mut(pos.y as usize)
            .and_then(|row| row.get_mut(pos.x as usize))
    }

    /// Replaces the tile at a position.
    pub fn set_tile(&mut self, pos: Position, tile: Tile) -> DungeonResult<()> {
        let slot = self.get_tile_mut(pos).ok_or_else(|| {
            DungeonError::InvalidState(format!("Position {} is outside the level", pos))
        })?;
        *slot = tile;
        Ok(())
    }

    /// Terrain type at a position, `None` when out of bounds.
    pub fn tile_type(&self, pos: Position) -> Option<TileType> {
        self.get_tile(pos).map(|tile| tile.tile_type)
    }

    /// Whether an actor could stand at this position (ignoring occupants).
    pub fn is_passable(&self, pos: Position) -> bool {
        self.get_tile(pos).map(Tile::is_passable).unwrap_or(false)
    }

    /// Whether the position is the stairs tile.
    pub fn is_stairs(&self, pos: Position) -> bool {
        self.tile_type(pos) == Some(TileType::Stairs)
    }

    /// All positions holding the given terrain, in row-major order.
    pub fn positions_of(&self, tile_type: TileType) -> impl Iterator<Item = Position> + '_ {
        self.tiles.iter().enumerate().flat_map(move |(y, row)| {
            row.iter().enumerate().filter_map(move |(x, tile)| {
                (tile.tile_type == tile_type).then(|| Position::new(x as i32, y as i32))
            })
        })
    }

    /// Number of tiles of the given terrain.
    pub fn count_tiles(&self, tile_type: TileType) -> usize {
        self.positions_of(tile_type).count()
    }

    /// The room the player enters in, if the level has rooms.
    pub fn entry_room(&self) -> Option<&Room> {
        self.rooms.first()
    }

    /// Marks every tile within `radius` (Euclidean) of `center` as discovered.
    ///
    /// Returns how many tiles were newly discovered.
    pub fn reveal_around(&mut self, center: Position, radius: u32) -> usize {
        let reach = radius as i32;
        let mut revealed = 0;
        for dy in -reach..=reach {
            for dx in -reach..=reach {
                let pos = Position::new(center.x + dx, center.y + dy);
                if center.euclidean_distance(pos) > radius as f64 {
                    continue;
                }
                if let Some(tile) = self.get_tile_mut(pos) {
                    if !tile.discovered {
                        tile.discovered = true;
                        revealed += 1;
                    }
                }
            }
        }
        revealed
    }

    /// Checks the structural invariants of a level.
    ///
    /// Exactly one stairs tile away from the spawn, no overlapping rooms, a
    /// passable spawn, and every passable tile reachable from the spawn.
    pub fn validate(&self) -> DungeonResult<()> {
        let stairs = self.count_tiles(TileType::Stairs);
        if stairs != 1 {
            return Err(DungeonError::GenerationFailed(format!(
                "Level has {} stairs tiles, expected exactly one",
                stairs
            )));
        }
        if self.stairs_position.map(|pos| self.is_stairs(pos)) != Some(true) {
            return Err(DungeonError::GenerationFailed(
                "Recorded stairs position does not hold the stairs".to_string(),
            ));
        }
        if self.stairs_position == Some(self.player_spawn) {
            return Err(DungeonError::GenerationFailed(format!(
                "Player spawn {} is on the stairs",
                self.player_spawn
            )));
        }

        for (i, room) in self.rooms.iter().enumerate() {
            if let Some(other) = self.rooms[i + 1..].iter().find(|other| room.overlaps(other)) {
                return Err(DungeonError::GenerationFailed(format!(
                    "Rooms {} and {} overlap",
                    room.id, other.id
                )));
            }
        }

        if !self.is_passable(self.player_spawn) {
            return Err(DungeonError::GenerationFailed(format!(
                "Player spawn {} is not passable",
                self.player_spawn
            )));
        }

        let reachable = reachable_from(self, self.player_spawn);
        let unreachable = self
            .tiles
            .iter()
            .enumerate()
            .flat_map(|(y, row)| {
                row.iter()
                    .enumerate()
                    .filter(|(_, tile)| tile.is_passable())
                    .map(move |(x, _)| Position::new(x as i32, y as i32))
            })
            .find(|pos| !reachable.contains(pos));
        if let Some(pos) = unreachable {
            return Err(DungeonError::GenerationFailed(format!(
                "Tile {} is not reachable from the entry room",
                pos
            )));
        }

        Ok(())
    }
}
