//! # Generation Module
//!
//! Procedural content generation for dungeon levels, monsters and items.
//!
//! Layout and population draw from separate random streams: the room layout
//! comes from the `layout` stream and every placement from the `population`
//! stream, so changing a density never reshapes the map.

pub mod encounters;
pub mod items;
pub mod layout;

pub use encounters::*;
pub use items::*;
pub use layout::*;

use crate::game::{Level, Position};
use crate::{config, DungeonError, DungeonResult, RandomStream, RandomStreams, TREASURE_NAMES};
use log::debug;
use serde::{Deserialize, Serialize};

/// Configuration for procedural generation.
///
/// Controls the level size, the room layout and how densely monsters and
/// items are scattered. Densities are per 100 floor tiles.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    /// Random seed for reproducible generation
    pub seed: u64,
    /// Level width in tiles
    pub width: u32,
    /// Level height in tiles
    pub height: u32,
    /// Minimum room size, walls included
    pub min_room_size: u32,
    /// Maximum room size, walls included
    pub max_room_size: u32,
    /// Minimum number of rooms per level
    pub min_rooms: u32,
    /// Maximum number of rooms per level
    pub max_rooms: u32,
    /// Room candidates tried before settling for the rooms placed so far
    pub placement_attempts: u32,
    /// Monsters per 100 floor tiles
    pub monster_density: f64,
    /// Items per 100 floor tiles
    pub item_density: f64,
    /// Strongest monster level that may spawn (1..=10)
    pub max_monster_level: u32,
    /// Named treasures placed on the level, each one distinct
    pub treasure_count: u32,
}

impl GenerationConfig {
    /// Creates the standard configuration.
    ///
    /// # Examples
    ///
    /// ```
    /// use dungeon::GenerationConfig;
    ///
    /// let config = GenerationConfig::new(7);
    /// assert_eq!(config.seed, 7);
    /// assert!(config.max_room_size >= config.min_room_size);
    /// assert!(config.validate().is_ok());
    /// ```
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            width: config::DEFAULT_DUNGEON_WIDTH,
            height: config::DEFAULT_DUNGEON_HEIGHT,
            min_room_size: 5,
            max_room_size: 12,
            min_rooms: 6,
            max_rooms: 12,
            placement_attempts: config::DEFAULT_PLACEMENT_ATTEMPTS,
            monster_density: 2.0,
            item_density: 1.5,
            max_monster_level: config::DEFAULT_MAX_MONSTER_LEVEL,
            treasure_count: config::DEFAULT_TREASURE_COUNT,
        }
    }

    /// Creates a configuration for testing with smaller, simpler levels.
    pub fn for_testing(seed: u64) -> Self {
        Self {
            seed,
            width: 40,
            height: 24,
            min_room_size: 4,
            max_room_size: 8,
            min_rooms: 3,
            max_rooms: 6,
            placement_attempts: 100,
            monster_density: 2.0,
            item_density: 1.5,
            max_monster_level: 3,
            treasure_count: 2,
        }
    }

    /// Rejects configurations generation cannot honour.
    pub fn validate(&self) -> DungeonResult<()> {
        if self.width == 0 || self.height == 0 {
            return Err(DungeonError::invalid_config(
                "width/height",
                format!("dimensions must be non-zero, got {}x{}", self.width, self.height),
            ));
        }
        if self.width > config::MAX_DUNGEON_DIMENSION || self.height > config::MAX_DUNGEON_DIMENSION {
            return Err(DungeonError::invalid_config(
                "width/height",
                format!(
                    "dimensions are capped at {0}x{0}, got {1}x{2}",
                    config::MAX_DUNGEON_DIMENSION,
                    self.width,
                    self.height
                ),
            ));
        }
        if self.min_room_size < 4 {
            return Err(DungeonError::invalid_config(
                "min_room_size",
                format!("rooms need at least 4 tiles per side, got {}", self.min_room_size),
            ));
        }
        if self.min_room_size > self.max_room_size {
            return Err(DungeonError::invalid_config(
                "max_room_size",
                format!(
                    "{} is smaller than min_room_size {}",
                    self.max_room_size, self.min_room_size
                ),
            ));
        }
        if self.min_room_size + 2 > self.width.min(self.height) {
            return Err(DungeonError::invalid_config(
                "min_room_size",
                format!(
                    "a {0}x{0} room does not fit in a {1}x{2} level",
                    self.min_room_size, self.width, self.height
                ),
            ));
        }
        if self.min_rooms == 0 || self.min_rooms > self.max_rooms {
            return Err(DungeonError::invalid_config(
                "min_rooms/max_rooms",
                format!(
                    "need 1 <= min_rooms <= max_rooms, got {}..={}",
                    self.min_rooms, self.max_rooms
                ),
            ));
        }
        if self.placement_attempts == 0 {
            return Err(DungeonError::invalid_config(
                "placement_attempts",
                "at least one placement attempt is required",
            ));
        }
        for (parameter, density) in [
            ("monster_density", self.monster_density),
            ("item_density", self.item_density),
        ] {
            if !density.is_finite() || !(0.0..=100.0).contains(&density) {
                return Err(DungeonError::invalid_config(
                    parameter,
                    format!("must be between 0 and 100, got {}", density),
                ));
            }
        }
        if !(1..=10).contains(&self.max_monster_level) {
            return Err(DungeonError::invalid_config(
                "max_monster_level",
                format!("must be between 1 and 10, got {}", self.max_monster_level),
            ));
        }
        if self.treasure_count as usize > TREASURE_NAMES.len() {
            return Err(DungeonError::invalid_config(
                "treasure_count",
                format!(
                    "at most {} distinct treasures exist, got {}",
                    TREASURE_NAMES.len(),
                    self.treasure_count
                ),
            ));
        }
        Ok(())
    }
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self::new(config::DEFAULT_SEED)
    }
}

/// A rectangular room in the dungeon.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Room {
    /// Placement order; room 0 is the entry room
    pub id: u32,
    /// Top-left corner of the room
    pub top_left: Position,
    /// Width of the room (including walls)
    pub width: u32,
    /// Height of the room (including walls)
    pub height: u32,
    pub room_type: RoomType,
    /// Ids of rooms joined to this one by a corridor
    pub connections: Vec<u32>,
}

/// The role a room plays in the level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RoomType {
    /// Where the player starts
    Entrance,
    /// Any room between the entrance and the exit
    Chamber,
    /// Holds the stairs
    Exit,
}

impl Room {
    /// Creates a new room with the given parameters.
    ///
    /// # Examples
    ///
    /// ```
    /// use dungeon::{Room, Position, RoomType};
    ///
    /// let room = Room::new(1, Position::new(5, 5), 10, 8, RoomType::Chamber);
    /// assert_eq!(room.id, 1);
    /// assert_eq!(room.width, 10);
    /// assert_eq!(room.height, 8);
    /// ```
    pub fn new(id: u32, top_left: Position, width: u32, height: u32, room_type: RoomType) -> Self {
        Self {
            id,
            top_left,
            width,
            height,
            room_type,
            connections: Vec::new(),
        }
    }

    /// Gets the bottom-right corner of the room.
    pub fn bottom_right(&self) -> Position {
        Position::new(
            self.top_left.x + self.width as i32 - 1,
            self.top_left.y + self.height as i32 - 1,
        )
    }

    /// Gets the center position of the room; always an interior tile.
    pub fn center(&self) -> Position {
        Position::new(
            self.top_left.x + self.width as i32 / 2,
            self.top_left.y + self.height as i32 / 2,
        )
    }

    /// Checks if a position is inside this room, walls included.
    ///
    /// # Examples
    ///
    /// ```
    /// use dungeon::{Room, Position, RoomType};
    ///
    /// let room = Room::new(1, Position::new(5, 5), 10, 8, RoomType::Chamber);
    /// assert!(room.contains(Position::new(7, 7)));
    /// assert!(!room.contains(Position::new(20, 20)));
    /// ```
    pub fn contains(&self, pos: Position) -> bool {
        pos.x >= self.top_left.x
            && pos.y >= self.top_left.y
            && pos.x < self.top_left.x + self.width as i32
            && pos.y < self.top_left.y + self.height as i32
    }

    /// Checks if a position is on the border of this room.
    pub fn is_border(&self, pos: Position) -> bool {
        if !self.contains(pos) {
            return false;
        }

        let bottom_right = self.bottom_right();
        pos.x == self.top_left.x
            || pos.y == self.top_left.y
            || pos.x == bottom_right.x
            || pos.y == bottom_right.y
    }

    /// Whether a position is inside the walls.
    pub fn is_interior(&self, pos: Position) -> bool {
        self.contains(pos) && !self.is_border(pos)
    }

    /// Checks if this room overlaps with another room.
    pub fn overlaps(&self, other: &Room) -> bool {
        !(self.top_left.x >= other.top_left.x + other.width as i32
            || other.top_left.x >= self.top_left.x + self.width as i32
            || self.top_left.y >= other.top_left.y + other.height as i32
            || other.top_left.y >= self.top_left.y + self.height as i32)
    }

    /// Gets all floor positions within this room, row by row.
    pub fn floor_positions(&self) -> Vec<Position> {
        let mut positions = Vec::new();

        for y in (self.top_left.y + 1)..(self.top_left.y + self.height as i32 - 1) {
            for x in (self.top_left.x + 1)..(self.top_left.x + self.width as i32 - 1) {
                positions.push(Position::new(x, y));
            }
        }

        positions
    }

    /// Gets all wall positions of this room.
    pub fn wall_positions(&self) -> Vec<Position> {
        let mut positions = Vec::new();

        // Top and bottom walls
        for x in self.top_left.x..(self.top_left.x + self.width as i32) {
            positions.push(Position::new(x, self.top_left.y));
            positions.push(Position::new(x, self.top_left.y + self.height as i32 - 1));
        }

        // Left and right walls (excluding corners already added)
        for y in (self.top_left.y + 1)..(self.top_left.y + self.height as i32 - 1) {
            positions.push(Position::new(self.top_left.x, y));
            positions.push(Position::new(self.top_left.x + self.width as i32 - 1, y));
        }

        positions
    }

    /// Adds a connection to another room.
    pub fn add_connection(&mut self, room_id: u32) {
        if !self.connections.contains(&room_id) {
            self.connections.push(room_id);
        }
    }
}

/// Trait for procedural generators.
///
/// Generators are pure functions of their configuration and the random
/// stream they are handed.
pub trait Generator<T> {
    /// Generates content using the provided configuration and random stream.
    fn generate(&self, config: &GenerationConfig, rng: &mut RandomStream) -> DungeonResult<T>;

    /// Validates that the generated content meets requirements.
    fn validate(&self, content: &T, config: &GenerationConfig) -> DungeonResult<()>;

    /// Gets the generator type name for logging and debugging.
    fn generator_type(&self) -> &'static str;
}

/// A generated level with its initial placements, ready to be populated.
#[derive(Debug, Clone, PartialEq)]
pub struct DungeonBlueprint {
    pub level: Level,
    pub monsters: Vec<MonsterPlacement>,
    pub items: Vec<ItemPlacement>,
}

impl DungeonBlueprint {
    /// Builds a level from `streams.layout` and scatters monsters and items
    /// over it from `streams.population`.
    ///
    /// # Examples
    ///
    /// ```
    /// use dungeon::{DungeonBlueprint, GenerationConfig, RandomStreams};
    ///
    /// let config = GenerationConfig::for_testing(42);
    /// let mut streams = RandomStreams::new(config.seed);
    /// let blueprint = DungeonBlueprint::generate(&config, &mut streams, 12).unwrap();
    /// assert!(blueprint.level.validate().is_ok());
    /// assert!(!blueprint.level.rooms.is_empty());
    /// ```
    pub fn generate(
        config: &GenerationConfig,
        streams: &mut RandomStreams,
        flare_radius: u32,
    ) -> DungeonResult<Self> {
        config.validate()?;

        let layout = RoomCorridorGenerator::new();
        let level = layout.generate(config, &mut streams.layout)?;
        layout.validate(&level, config)?;

        let encounters = EncounterGenerator::new(&level);
        let monsters = encounters.generate(config, &mut streams.population)?;
        encounters.validate(&monsters, config)?;

        let reserved: Vec<Position> = monsters.iter().map(|monster| monster.position).collect();
        let loot = ItemGenerator::new(&level, &reserved, flare_radius);
        let items = loot.generate(config, &mut streams.population)?;
        loot.validate(&items, config)?;

        debug!(
            "Generated {}x{} level: {} rooms, {} monsters, {} items",
            level.width,
            level.height,
            level.rooms.len(),
            monsters.len(),
            items.len()
        );

        Ok(Self {
            level,
            monsters,
            items,
        })
    }
}

/// Utility functions for generation algorithms.
pub mod utils {
    use super::*;
    use log::warn;
    use std::collections::HashSet;

    /// How many things to place over `floor_tiles` at `density` per 100 tiles.
    pub fn placement_count(floor_tiles: usize, density: f64) -> usize {
        (floor_tiles as f64 * density / 100.0).floor() as usize
    }

    /// The earlier room whose centre is closest to `room`'s centre.
    ///
    /// Ties go to the lowest id.
    pub fn nearest_room<'a>(room: &Room, earlier: &'a [Room]) -> Option<&'a Room> {
        earlier
            .iter()
            .min_by_key(|other| (room.center().manhattan_distance(other.center()), other.id))
    }

    /// Draws up to `count` distinct positions from `candidates`.
    ///
    /// Draws landing on `reserved` or on an already chosen position are
    /// rejected; gives up after `attempts` draws.
    pub fn scatter_positions(
        candidates: &[Position],
        count: usize,
        reserved: &HashSet<Position>,
        attempts: u32,
        rng: &mut RandomStream,
    ) -> Vec<Position> {
        let mut chosen = Vec::with_capacity(count);
        let mut taken: HashSet<Position> = HashSet::new();
        if candidates.is_empty() {
            return chosen;
        }

        let mut remaining = attempts;
        while chosen.len() < count && remaining > 0 {
            remaining -= 1;
            let pos = candidates[rng.next_index(candidates.len())];
            if reserved.contains(&pos) || !taken.insert(pos) {
                continue;
            }
            chosen.push(pos);
        }

        if chosen.len() < count {
            warn!(
                "Placement budget exhausted: placed {} of {}",
                chosen.len(),
                count
            );
        }
        chosen
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_generation_config_creation() {
        let config = GenerationConfig::new(12345);
        assert_eq!(config.seed, 12345);
        assert!(config.min_room_size >= 4);
        assert!(config.max_room_size >= config.min_room_size);
        assert!(config.min_rooms <= config.max_rooms);
        assert!(config.validate().is_ok());
        assert!(GenerationConfig::for_testing(1).validate().is_ok());
    }

    #[test]
    fn test_invalid_configs_name_the_parameter() {
        let cases: Vec<(&str, GenerationConfig)> = vec![
            ("width/height", GenerationConfig { width: 0, ..GenerationConfig::default() }),
            ("min_room_size", GenerationConfig { min_room_size: 3, ..GenerationConfig::default() }),
            ("max_room_size", GenerationConfig { max_room_size: 4, ..GenerationConfig::default() }),
            ("min_room_size", GenerationConfig { width: 6, ..GenerationConfig::default() }),
            ("min_rooms/max_rooms", GenerationConfig { max_rooms: 0, ..GenerationConfig::default() }),
            ("placement_attempts", GenerationConfig { placement_attempts: 0, ..GenerationConfig::default() }),
            ("monster_density", GenerationConfig { monster_density: -1.0, ..GenerationConfig::default() }),
            ("item_density", GenerationConfig { item_density: f64::NAN, ..GenerationConfig::default() }),
            ("max_monster_level", GenerationConfig { max_monster_level: 11, ..GenerationConfig::default() }),
            ("width/height", GenerationConfig { width: 3_000_000_000, ..GenerationConfig::default() }),
            ("width/height", GenerationConfig { height: config::MAX_DUNGEON_DIMENSION + 1, ..GenerationConfig::default() }),
            ("treasure_count", GenerationConfig { treasure_count: 11, ..GenerationConfig::default() }),
        ];

        for (expected, config) in cases {
            match config.validate() {
                Err(DungeonError::InvalidConfig { parameter, .. }) => assert_eq!(parameter, expected),
                other => panic!("expected InvalidConfig for {}, got {:?}", expected, other),
            }
        }
    }

    #[test]
    fn test_room_geometry() {
        let room = Room::new(1, Position::new(5, 5), 10, 8, RoomType::Chamber);

        assert_eq!(room.bottom_right(), Position::new(14, 12));
        assert_eq!(room.center(), Position::new(10, 9));
        assert!(room.is_interior(room.center()));

        assert!(room.contains(Position::new(5, 5)));
        assert!(room.contains(Position::new(14, 12)));
        assert!(!room.contains(Position::new(15, 12)));

        assert!(room.is_border(Position::new(5, 5)));
        assert!(room.is_border(Position::new(10, 5)));
        assert!(!room.is_border(Position::new(7, 7)));
    }

    #[test]
    fn test_smallest_room_center_is_interior() {
        let room = Room::new(0, Position::new(1, 1), 4, 4, RoomType::Entrance);
        assert!(room.is_interior(room.center()));
        assert_eq!(room.floor_positions().len(), 4);
    }

    #[test]
    fn test_room_overlap() {
        let room1 = Room::new(1, Position::new(5, 5), 10, 8, RoomType::Chamber);
        let room2 = Room::new(2, Position::new(10, 8), 6, 6, RoomType::Chamber);
        let room3 = Room::new(3, Position::new(20, 20), 5, 5, RoomType::Chamber);

        assert!(room1.overlaps(&room2));
        assert!(room2.overlaps(&room1));
        assert!(!room1.overlaps(&room3));
        assert!(!room3.overlaps(&room1));
    }

    #[test]
    fn test_room_positions() {
        let room = Room::new(1, Position::new(5, 5), 4, 4, RoomType::Chamber);

        let floor_set: HashSet<_> = room.floor_positions().into_iter().collect();
        let wall_set: HashSet<_> = room.wall_positions().into_iter().collect();

        assert_eq!(floor_set.len(), 4);
        assert_eq!(wall_set.len(), 12);
        assert!(floor_set.is_disjoint(&wall_set));
    }

    #[test]
    fn test_room_connections_are_unique() {
        let mut room = Room::new(1, Position::new(5, 5), 10, 8, RoomType::Chamber);
        room.add_connection(2);
        room.add_connection(3);
        room.add_connection(2);
        assert_eq!(room.connections, vec![2, 3]);
    }

    #[test]
    fn test_nearest_room_breaks_ties_by_id() {
        let room = Room::new(2, Position::new(10, 0), 5, 5, RoomType::Chamber);
        let earlier = vec![
            Room::new(0, Position::new(0, 0), 5, 5, RoomType::Entrance),
            Room::new(1, Position::new(20, 0), 5, 5, RoomType::Chamber),
        ];
        assert_eq!(utils::nearest_room(&room, &earlier).map(|r| r.id), Some(0));
        assert!(utils::nearest_room(&room, &[]).is_none());
    }

    #[test]
    fn test_placement_count() {
        assert_eq!(utils::placement_count(250, 2.0), 5);
        assert_eq!(utils::placement_count(49, 2.0), 0);
        assert_eq!(utils::placement_count(100, 0.0), 0);
    }

    #[test]
    fn test_scatter_respects_reserved_and_budget() {
        let candidates: Vec<Position> = (0..10).map(|x| Position::new(x, 0)).collect();
        let reserved: HashSet<Position> = [Position::new(0, 0), Position::new(1, 0)].into();
        let mut rng = RandomStream::new(5);

        let chosen = utils::scatter_positions(&candidates, 8, &reserved, 10_000, &mut rng);
        assert_eq!(chosen.len(), 8);
        assert!(chosen.iter().all(|pos| !reserved.contains(pos)));
        let unique: HashSet<_> = chosen.iter().collect();
        assert_eq!(unique.len(), 8);

        // Only eight free candidates exist
        let mut rng = RandomStream::new(5);
        let capped = utils::scatter_positions(&candidates, 9, &reserved, 10_000, &mut rng);
        assert_eq!(capped.len(), 8);
    }
}
