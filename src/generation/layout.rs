//! # Dungeon Layout
//!
//! Room-and-corridor level layout.
//!
//! Rooms are placed at random without overlapping, then each room is joined
//! to the nearest room placed before it. Every room therefore hangs off the
//! entry room through a chain of corridors, which makes the level connected
//! by construction rather than by a repair pass.

use crate::generation::utils;
use crate::{
    Corridor, DungeonError, DungeonResult, GenerationConfig, Generator, Level, Position,
    RandomStream, Room, RoomType, Tile, TileType,
};
use log::{debug, warn};

/// Room-and-corridor level generator.
#[derive(Debug, Clone, Default)]
pub struct RoomCorridorGenerator;

/// Which leg of an L-shaped corridor is dug first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CorridorBend {
    HorizontalFirst,
    VerticalFirst,
}

impl RoomCorridorGenerator {
    /// Creates a new dungeon generator.
    ///
    /// # Examples
    ///
    /// ```
    /// use dungeon::{GenerationConfig, Generator, RandomStream, RoomCorridorGenerator};
    ///
    /// let generator = RoomCorridorGenerator::new();
    /// let config = GenerationConfig::for_testing(3);
    /// let level = generator.generate(&config, &mut RandomStream::new(3)).unwrap();
    /// assert!(level.validate().is_ok());
    /// ```
    pub fn new() -> Self {
        Self
    }

    /// Places rooms until the drawn target is met or the attempt budget runs out.
    fn place_rooms(
        &self,
        level: &Level,
        config: &GenerationConfig,
        rng: &mut RandomStream,
    ) -> Vec<Room> {
        let target = rng.range_inclusive(config.min_rooms, config.max_rooms) as usize;
        let mut rooms: Vec<Room> = Vec::with_capacity(target);
        let mut attempts = 0;

        while rooms.len() < target && attempts < config.placement_attempts {
            attempts += 1;
            let room = self.generate_room_candidate(level, config, rng, rooms.len() as u32);
            if !self.room_fits_in_level(level, &room) {
                continue;
            }
            if rooms.iter().any(|existing| room.overlaps(existing)) {
                continue;
            }
            rooms.push(room);
        }

        if rooms.len() < target {
            warn!(
                "Placed {} of {} rooms before the placement budget of {} ran out",
                rooms.len(),
                target,
                config.placement_attempts
            );
        } else {
            debug!("Placed {} rooms in {} attempts", rooms.len(), attempts);
        }
        rooms
    }

    /// Draws a room that always lies inside the level's outer wall.
    fn generate_room_candidate(
        &self,
        level: &Level,
        config: &GenerationConfig,
        rng: &mut RandomStream,
        room_id: u32,
    ) -> Room {
        let width = rng
            .range_inclusive(config.min_room_size, config.max_room_size)
            .min(level.width - 2);
        let height = rng
            .range_inclusive(config.min_room_size, config.max_room_size)
            .min(level.height - 2);
        let x = rng.range_inclusive(1, level.width - 1 - width) as i32;
        let y = rng.range_inclusive(1, level.height - 1 - height) as i32;

        let room_type = if room_id == 0 {
            RoomType::Entrance
        } else {
            RoomType::Chamber
        };
        Room::new(room_id, Position::new(x, y), width, height, room_type)
    }

    /// Checks if a room fits within level boundaries, leaving the outer wall.
    fn room_fits_in_level(&self, level: &Level, room: &Room) -> bool {
        room.top_left.x >= 1
            && room.top_left.y >= 1
            && room.top_left.x + room.width as i32 <= level.width as i32 - 1
            && room.top_left.y + room.height as i32 <= level.height as i32 - 1
    }

    /// Carves out a room in the level by setting its interior to floor.
    fn carve_room(&self, level: &mut Level, room: &Room) -> DungeonResult<()> {
        for pos in room.floor_positions() {
            level.set_tile(pos, Tile::floor())?;
        }
        Ok(())
    }

    /// Joins every room to the nearest room placed before it.
    fn connect_rooms(
        &self,
        level: &mut Level,
        rooms: &mut [Room],
        rng: &mut RandomStream,
    ) -> DungeonResult<()> {
        let mut links = Vec::new();
        for index in 1..rooms.len() {
            let room = &rooms[index];
            let Some(nearest) = utils::nearest_room(room, &rooms[..index]) else {
                continue;
            };

            let start = room.center();
            let end = nearest.center();
            let bend = if start.x == end.x || start.y == end.y {
                CorridorBend::HorizontalFirst
            } else if rng.chance(1, 2) {
                CorridorBend::HorizontalFirst
            } else {
                CorridorBend::VerticalFirst
            };

            let cells = l_corridor_cells(start, end, bend);
            self.carve_corridor(level, &cells, rooms)?;
            links.push((nearest.id, room.id));
        }

        for (from_room, to_room) in links {
            rooms[from_room as usize].add_connection(to_room);
            rooms[to_room as usize].add_connection(from_room);
            level.corridors.push(Corridor { from_room, to_room });
        }
        Ok(())
    }

    /// Digs corridor cells. Cells on any room wall become doors.
    fn carve_corridor(
        &self,
        level: &mut Level,
        cells: &[Position],
        rooms: &[Room],
    ) -> DungeonResult<()> {
        for &pos in cells {
            if rooms.iter().any(|room| room.is_border(pos)) {
                level.set_tile(pos, Tile::new(TileType::Door))?;
            } else if level.tile_type(pos) == Some(TileType::Wall) {
                level.set_tile(pos, Tile::floor())?;
            }
        }
        Ok(())
    }

    /// Puts the stairs on a random floor tile of the last room.
    fn add_stairs(
        &self,
        level: &mut Level,
        rooms: &[Room],
        rng: &mut RandomStream,
    ) -> DungeonResult<()> {
        let last = rooms
            .last()
            .ok_or_else(|| DungeonError::GenerationFailed("No rooms were placed".to_string()))?;
        let spawn = level.player_spawn;
        let candidates: Vec<Position> = last
            .floor_positions()
            .into_iter()
            .filter(|&pos| pos != spawn)
            .collect();
        if candidates.is_empty() {
            return Err(DungeonError::GenerationFailed(format!(
                "Room {} has no floor tile for the stairs",
                last.id
            )));
        }

        let stairs = candidates[rng.next_index(candidates.len())];
        level.set_tile(stairs, Tile::new(TileType::Stairs))?;
        level.stairs_position = Some(stairs);
        Ok(())
    }
}

/// Cells of an L-shaped corridor from `start` to `end`, both included.
///
/// Aligned endpoints give a straight corridor whatever the bend.
pub fn l_corridor_cells(start: Position, end: Position, bend: CorridorBend) -> Vec<Position> {
    let corner = match bend {
        CorridorBend::HorizontalFirst => Position::new(end.x, start.y),
        CorridorBend::VerticalFirst => Position::new(start.x, end.y),
    };

    let mut cells = vec![start];
    for (from, to) in [(start, corner), (corner, end)] {
        let mut pos = from;
        while pos != to {
            pos = Position::new(pos.x + (to.x - pos.x).signum(), pos.y + (to.y - pos.y).signum());
            cells.push(pos);
        }
    }
    cells
}

impl Generator<Level> for RoomCorridorGenerator {
    fn generate(&self, config: &GenerationConfig, rng: &mut RandomStream) -> DungeonResult<Level> {
        config.validate()?;
        let mut level = Level::new(config.width, config.height);

        let mut rooms = self.place_rooms(&level, config, rng);
        for room in &rooms {
            self.carve_room(&mut level, room)?;
        }
        self.connect_rooms(&mut level, &mut rooms, rng)?;

        let room_count = rooms.len();
        if room_count > 1 {
            if let Some(last) = rooms.last_mut() {
                last.room_type = RoomType::Exit;
            }
        }

        level.player_spawn = rooms
            .first()
            .map(Room::center)
            .ok_or_else(|| DungeonError::GenerationFailed("No rooms were placed".to_string()))?;
        self.add_stairs(&mut level, &rooms, rng)?;
        level.rooms = rooms;

        debug!(
            "{} built {} rooms and {} corridors",
            self.generator_type(),
            room_count,
            level.corridors.len()
        );
        Ok(level)
    }

    fn validate(&self, level: &Level, _config: &GenerationConfig) -> DungeonResult<()> {
        level.validate()
    }

    fn generator_type(&self) -> &'static str {
        "RoomCorridorGenerator"
    }
}
