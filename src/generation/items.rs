//! # Item Generation
//!
//! Scatters potions and flares over a generated level, then hides a few
//! distinct named treasures on the floor tiles that are left.

use crate::generation::utils;
use crate::{
    DungeonError, DungeonResult, GenerationConfig, Generator, ItemKind, Level, Position,
    RandomStream, TileType, TREASURE_NAMES,
};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// An item lying on the floor when the session starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemPlacement {
    pub kind: ItemKind,
    pub position: Position,
}

/// Places items on floor tiles not already taken by a monster or the player.
pub struct ItemGenerator<'a> {
    level: &'a Level,
    reserved: &'a [Position],
    flare_radius: u32,
}

impl<'a> ItemGenerator<'a> {
    pub fn new(level: &'a Level, reserved: &'a [Position], flare_radius: u32) -> Self {
        Self {
            level,
            reserved,
            flare_radius,
        }
    }

    /// Half healing potions, a fifth strength potions, the rest flares.
    pub fn roll_item(&self, rng: &mut RandomStream) -> ItemKind {
        match rng.next(10) {
            0..=4 => ItemKind::HealingPotion {
                amount: 5 + rng.range_inclusive(1, 10),
            },
            5..=6 => ItemKind::StrengthPotion {
                bonus: rng.range_inclusive(1, 2),
            },
            _ => ItemKind::Flare {
                radius: self.flare_radius,
            },
        }
    }

    /// Draws `count` distinct treasure ids by partially shuffling `1..=10`.
    pub fn roll_treasures(count: usize, rng: &mut RandomStream) -> Vec<u32> {
        let mut ids: Vec<u32> = (1..=TREASURE_NAMES.len() as u32).collect();
        let count = count.min(ids.len());
        for i in 0..count {
            let j = i + rng.next_index(ids.len() - i);
            ids.swap(i, j);
        }
        ids.truncate(count);
        ids
    }
}

impl Generator<Vec<ItemPlacement>> for ItemGenerator<'_> {
    fn generate(
        &self,
        config: &GenerationConfig,
        rng: &mut RandomStream,
    ) -> DungeonResult<Vec<ItemPlacement>> {
        let candidates: Vec<Position> = self.level.positions_of(TileType::Floor).collect();
        let count = utils::placement_count(candidates.len(), config.item_density);
        let mut reserved: HashSet<Position> = self.reserved.iter().copied().collect();
        reserved.insert(self.level.player_spawn);

        let positions = utils::scatter_positions(
            &candidates,
            count,
            &reserved,
            config.placement_attempts.max(count as u32 * 4),
            rng,
        );

        let mut placements: Vec<ItemPlacement> = positions
            .into_iter()
            .map(|position| ItemPlacement {
                kind: self.roll_item(rng),
                position,
            })
            .collect();

        let treasures = Self::roll_treasures(config.treasure_count as usize, rng);
        reserved.extend(placements.iter().map(|item| item.position));
        let spots = utils::scatter_positions(
            &candidates,
            treasures.len(),
            &reserved,
            config.placement_attempts.max(treasures.len() as u32 * 4),
            rng,
        );
        placements.extend(spots.into_iter().zip(treasures).map(|(position, id)| ItemPlacement {
            kind: ItemKind::Treasure { id },
            position,
        }));
        Ok(placements)
    }

    fn validate(&self, content: &Vec<ItemPlacement>, config: &GenerationConfig) -> DungeonResult<()> {
        let mut seen: HashSet<Position> = self.reserved.iter().copied().collect();
        seen.insert(self.level.player_spawn);
        let mut treasures = HashSet::new();
        for item in content {
            if let ItemKind::Treasure { id } = item.kind {
                if !(1..=TREASURE_NAMES.len() as u32).contains(&id) || !treasures.insert(id) {
                    return Err(DungeonError::GenerationFailed(format!(
                        "treasure {} is unknown or placed twice",
                        id
                    )));
                }
            }
            if self.level.tile_type(item.position) != Some(TileType::Floor)
                || !seen.insert(item.position)
            {
                return Err(DungeonError::GenerationFailed(format!(
                    "{} placed on unusable tile {}",
                    item.kind.name(),
                    item.position
                )));
            }
        }
        if treasures.len() > config.treasure_count as usize {
            return Err(DungeonError::GenerationFailed(format!(
                "{} treasures placed, at most {} allowed",
                treasures.len(),
                config.treasure_count
            )));
        }
        Ok(())
    }

    fn generator_type(&self) -> &'static str {
        "ItemGenerator"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::RoomCorridorGenerator;

    #[test]
    fn test_items_avoid_reserved_tiles() {
        let config = GenerationConfig {
            item_density: 8.0,
            ..GenerationConfig::for_testing(8)
        };
        let level = RoomCorridorGenerator::new()
            .generate(&config, &mut RandomStream::new(8))
            .unwrap();
        let reserved: Vec<Position> = level.positions_of(TileType::Floor).take(5).collect();

        let generator = ItemGenerator::new(&level, &reserved, 12);
        let items = generator.generate(&config, &mut RandomStream::new(2)).unwrap();
        assert!(!items.is_empty());
        assert!(generator.validate(&items, &config).is_ok());
        assert!(items.iter().all(|item| !reserved.contains(&item.position)));
        assert!(items.iter().all(|item| item.position != level.player_spawn));
    }

    #[test]
    fn test_item_rolls_stay_in_range() {
        let level = Level::single_room(6, 6).unwrap();
        let generator = ItemGenerator::new(&level, &[], 9);
        let mut rng = RandomStream::new(31);
        let mut kinds = HashSet::new();

        for _ in 0..300 {
            let kind = generator.roll_item(&mut rng);
            match kind {
                ItemKind::HealingPotion { amount } => assert!((6..=15).contains(&amount)),
                ItemKind::StrengthPotion { bonus } => assert!((1..=2).contains(&bonus)),
                ItemKind::Flare { radius } => assert_eq!(radius, 9),
                ItemKind::Treasure { .. } => panic!("treasures are placed separately"),
            }
            kinds.insert(std::mem::discriminant(&kind));
        }
        assert_eq!(kinds.len(), 3);
    }

    #[test]
    fn test_treasures_are_distinct_and_kept_apart() {
        let config = GenerationConfig {
            item_density: 6.0,
            treasure_count: 10,
            ..GenerationConfig::for_testing(5)
        };
        let level = RoomCorridorGenerator::new()
            .generate(&config, &mut RandomStream::new(5))
            .unwrap();
        let generator = ItemGenerator::new(&level, &[], 12);
        let items = generator.generate(&config, &mut RandomStream::new(17)).unwrap();
        assert!(generator.validate(&items, &config).is_ok());

        let mut ids: Vec<u32> = items
            .iter()
            .filter_map(|item| match item.kind {
                ItemKind::Treasure { id } => Some(id),
                _ => None,
            })
            .collect();
        ids.sort_unstable();
        assert_eq!(ids, (1..=10).collect::<Vec<u32>>());

        let positions: HashSet<Position> = items.iter().map(|item| item.position).collect();
        assert_eq!(positions.len(), items.len());
    }

    #[test]
    fn test_no_treasures_when_count_is_zero() {
        let config = GenerationConfig {
            treasure_count: 0,
            ..GenerationConfig::for_testing(3)
        };
        let level = Level::single_room(12, 10).unwrap();
        let generator = ItemGenerator::new(&level, &[], 12);
        let items = generator.generate(&config, &mut RandomStream::new(3)).unwrap();
        assert!(items.iter().all(|item| item.kind.is_usable()));

        let duplicate = vec![
            ItemPlacement { kind: ItemKind::Treasure { id: 4 }, position: Position::new(1, 1) },
            ItemPlacement { kind: ItemKind::Treasure { id: 4 }, position: Position::new(2, 1) },
        ];
        let config = GenerationConfig { treasure_count: 2, ..config };
        assert!(generator.validate(&duplicate, &config).is_err());
    }
}
