//! # Encounter Generation
//!
//! Scatters monsters over a generated level.

use crate::generation::utils;
use crate::{
    DungeonError, DungeonResult, GenerationConfig, Generator, Level, MonsterKind, Position,
    RandomStream, TileType,
};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// A monster to spawn when the session starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonsterPlacement {
    pub kind: MonsterKind,
    pub position: Position,
    /// Rolled starting health
    pub health: u32,
}

/// Places monsters on floor tiles of a level.
///
/// Monsters keep out of the entry room whenever the level has other rooms,
/// so the player never starts next to one.
pub struct EncounterGenerator<'a> {
    level: &'a Level,
}

impl<'a> EncounterGenerator<'a> {
    pub fn new(level: &'a Level) -> Self {
        Self { level }
    }

    fn candidates(&self) -> Vec<Position> {
        let entry = self.level.entry_room().filter(|_| self.level.rooms.len() > 1);
        self.level
            .positions_of(TileType::Floor)
            .filter(|&pos| entry.map(|room| !room.contains(pos)).unwrap_or(true))
            .collect()
    }

    /// Rolls a kind up to the level cap and its starting health.
    fn roll_monster(&self, config: &GenerationConfig, rng: &mut RandomStream) -> (MonsterKind, u32) {
        let level = rng.range_inclusive(1, config.max_monster_level);
        let kind = MonsterKind::from_level(level).unwrap_or(MonsterKind::Skeleton);
        let health = kind.base_health() + rng.next(4);
        (kind, health)
    }
}

impl Generator<Vec<MonsterPlacement>> for EncounterGenerator<'_> {
    fn generate(
        &self,
        config: &GenerationConfig,
        rng: &mut RandomStream,
    ) -> DungeonResult<Vec<MonsterPlacement>> {
        let count = utils::placement_count(
            self.level.count_tiles(TileType::Floor),
            config.monster_density,
        );
        let reserved: HashSet<Position> = [self.level.player_spawn].into();
        let positions = utils::scatter_positions(
            &self.candidates(),
            count,
            &reserved,
            config.placement_attempts.max(count as u32 * 4),
            rng,
        );

        Ok(positions
            .into_iter()
            .map(|position| {
                let (kind, health) = self.roll_monster(config, rng);
                MonsterPlacement {
                    kind,
                    position,
                    health,
                }
            })
            .collect())
    }

    fn validate(&self, content: &Vec<MonsterPlacement>, config: &GenerationConfig) -> DungeonResult<()> {
        let mut seen = HashSet::new();
        for monster in content {
            if self.level.tile_type(monster.position) != Some(TileType::Floor)
                || monster.position == self.level.player_spawn
                || !seen.insert(monster.position)
            {
                return Err(DungeonError::GenerationFailed(format!(
                    "{} placed on unusable tile {}",
                    monster.kind.name(),
                    monster.position
                )));
            }
            if monster.kind.level() > config.max_monster_level {
                return Err(DungeonError::GenerationFailed(format!(
                    "{} exceeds the monster level cap {}",
                    monster.kind.name(),
                    config.max_monster_level
                )));
            }
        }
        Ok(())
    }

    fn generator_type(&self) -> &'static str {
        "EncounterGenerator"
    }
}
