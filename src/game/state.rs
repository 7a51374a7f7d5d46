//! # Game State Module
//!
//! The [`GameSession`] and the configuration it is built from.
//!
//! A session owns the level, the entity registry, the scheduler, the random
//! streams and the statistics. It is the only type a presentation layer needs
//! to talk to: submit one action per turn, read back the events and a
//! [`SessionView`].

use crate::{
    config, Action, DungeonBlueprint, DungeonError, DungeonResult, Entity, EntityId,
    EntityRegistry, EntityStats, GameEvent, GenerationConfig, Level, RandomStreams, SessionState,
    SessionView, TurnContext, TurnScheduler,
};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

/// Rules the turn loop plays by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RulesConfig {
    /// Player starting (and maximum) health
    pub player_health: u32,
    pub player_attack: u32,
    pub player_defense: u32,
    /// Largest roll subtracted from the defender's defense
    pub combat_variance: u32,
    /// Chebyshev distance at which chasing monsters notice the player
    pub detection_radius: u32,
    /// Euclidean radius of the player's field of view
    pub sight_radius: u32,
    /// Radius revealed by generated flares
    pub flare_radius: u32,
}

impl Default for RulesConfig {
    fn default() -> Self {
        Self {
            player_health: config::DEFAULT_PLAYER_HEALTH,
            player_attack: config::DEFAULT_PLAYER_ATTACK,
            player_defense: config::DEFAULT_PLAYER_DEFENSE,
            combat_variance: config::DEFAULT_COMBAT_VARIANCE,
            detection_radius: config::DEFAULT_DETECTION_RADIUS,
            sight_radius: config::DEFAULT_SIGHT_RADIUS,
            flare_radius: config::DEFAULT_FLARE_RADIUS,
        }
    }
}

impl RulesConfig {
    pub fn validate(&self) -> DungeonResult<()> {
        if self.player_health == 0 {
            return Err(DungeonError::invalid_config(
                "player_health",
                "the player must start alive",
            ));
        }
        Ok(())
    }
}

/// Everything needed to start a session.
///
/// Missing fields in JSON fall back to their defaults.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub generation: GenerationConfig,
    pub rules: RulesConfig,
}

impl SessionConfig {
    /// Standard configuration for a seed.
    pub fn new(seed: u64) -> Self {
        Self {
            generation: GenerationConfig::new(seed),
            rules: RulesConfig::default(),
        }
    }

    /// Small levels for tests.
    pub fn for_testing(seed: u64) -> Self {
        Self {
            generation: GenerationConfig::for_testing(seed),
            rules: RulesConfig::default(),
        }
    }

    pub fn validate(&self) -> DungeonResult<()> {
        self.generation.validate()?;
        self.rules.validate()
    }

    /// Parses and validates a JSON configuration.
    ///
    /// # Examples
    ///
    /// ```
    /// use dungeon::SessionConfig;
    ///
    /// let config = SessionConfig::from_json_str(r#"{"generation": {"seed": 9}}"#).unwrap();
    /// assert_eq!(config.generation.seed, 9);
    /// assert_eq!(config.rules.player_health, dungeon::config::DEFAULT_PLAYER_HEALTH);
    /// ```
    pub fn from_json_str(json: &str) -> DungeonResult<Self> {
        let config: SessionConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> DungeonResult<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }
}

/// Running totals of what the player has done.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameStatistics {
    /// Tiles the player has walked
    pub steps_taken: u64,
    /// Total damage dealt by the player
    pub damage_dealt: u64,
    /// Total damage taken by the player
    pub damage_taken: u64,
    /// Monsters killed by the player
    pub enemies_defeated: u32,
    pub items_collected: u32,
    pub items_used: u32,
    /// Named treasures the player has picked up
    #[serde(default)]
    pub treasures_found: u32,
}

impl GameStatistics {
    /// Creates new empty statistics.
    pub fn new() -> Self {
        Self::default()
    }

    /// Folds one event into the totals.
    pub fn update_from_event(&mut self, event: &GameEvent, player: EntityId) {
        match event {
            GameEvent::Moved { entity, .. } if *entity == player => {
                self.steps_taken += 1;
            }
            GameEvent::Attacked {
                attacker,
                target,
                amount,
                ..
            } => {
                if *attacker == player {
                    self.damage_dealt += u64::from(*amount);
                }
                if *target == player {
                    self.damage_taken += u64::from(*amount);
                }
            }
            GameEvent::EntityDied {
                killer: Some(killer),
                ..
            } if *killer == player => {
                self.enemies_defeated += 1;
            }
            GameEvent::ItemPickedUp { entity, .. } if *entity == player => {
                self.items_collected += 1;
            }
            GameEvent::ItemUsed { entity, .. } if *entity == player => {
                self.items_used += 1;
            }
            GameEvent::TreasureFound { entity, .. } if *entity == player => {
                self.treasures_found += 1;
            }
            _ => {}
        }
    }
}

/// A single-level game: the top-level owner of all simulation state.
///
/// Two sessions built from the same [`SessionConfig`] are identical, and
/// feeding them the same actions produces the same events.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameSession {
    config: SessionConfig,
    level: Level,
    registry: EntityRegistry,
    scheduler: TurnScheduler,
    streams: RandomStreams,
    statistics: GameStatistics,
    player_id: EntityId,
    /// Events of the most recent step
    #[serde(skip)]
    last_events: Vec<GameEvent>,
}

impl GameSession {
    /// Generates a level from the configuration and populates it.
    ///
    /// The player is spawned first and so always has the lowest id.
    ///
    /// # Examples
    ///
    /// ```
    /// use dungeon::{Action, GameSession, SessionConfig, SessionState};
    ///
    /// let mut session = GameSession::new(SessionConfig::for_testing(42)).unwrap();
    /// assert_eq!(session.state(), SessionState::Active);
    ///
    /// let events = session.submit_player_action(Action::Wait);
    /// assert!(!events.is_empty());
    /// assert_eq!(session.turn_number(), 1);
    /// ```
    pub fn new(config: SessionConfig) -> DungeonResult<Self> {
        config.validate()?;
        let mut streams = RandomStreams::new(config.generation.seed);
        let blueprint =
            DungeonBlueprint::generate(&config.generation, &mut streams, config.rules.flare_radius)?;

        let mut registry = EntityRegistry::new();
        let rules = config.rules;
        let player_id = registry.spawn(Entity::player(
            blueprint.level.player_spawn,
            rules.player_health,
            EntityStats::new(rules.player_attack, rules.player_defense),
        ));
        for monster in &blueprint.monsters {
            registry.spawn(Entity::monster(monster.kind, monster.position, monster.health));
        }
        for item in &blueprint.items {
            registry.spawn(Entity::item(item.kind, item.position));
        }

        let mut session = Self {
            config,
            level: blueprint.level,
            registry,
            scheduler: TurnScheduler::new(),
            streams,
            statistics: GameStatistics::new(),
            player_id,
            last_events: Vec::new(),
        };
        session.update_player_visibility();

        info!(
            "Started session with seed {}: {} rooms, {} entities",
            session.config.generation.seed,
            session.level.rooms.len(),
            session.registry.len()
        );
        Ok(session)
    }

    /// Builds a session around a hand-made level and registry.
    ///
    /// The registry must hold exactly one living player. Random streams are
    /// derived from the configured seed as usual.
    pub fn from_parts(
        config: SessionConfig,
        level: Level,
        registry: EntityRegistry,
    ) -> DungeonResult<Self> {
        config.rules.validate()?;
        level.validate()?;
        let player_id = registry
            .player()
            .map(Entity::id)
            .ok_or_else(|| DungeonError::InvalidState("No player in registry".to_string()))?;

        let mut session = Self {
            streams: RandomStreams::new(config.generation.seed),
            config,
            level,
            registry,
            scheduler: TurnScheduler::new(),
            statistics: GameStatistics::new(),
            player_id,
            last_events: Vec::new(),
        };
        session.check_invariants()?;
        session.update_player_visibility();
        Ok(session)
    }

    /// Plays one turn: the player's action, then every monster's.
    ///
    /// Returns the turn's events in order. Once the session is terminal this
    /// does nothing and returns no events.
    pub fn submit_player_action(&mut self, action: Action) -> Vec<GameEvent> {
        let ctx = TurnContext {
            level: &mut self.level,
            registry: &mut self.registry,
            streams: &mut self.streams,
            rules: &self.config.rules,
        };
        let events = self.scheduler.step(self.player_id, &action, ctx);

        for event in &events {
            self.statistics.update_from_event(event, self.player_id);
        }
        let revealed = self.update_player_visibility();
        debug!(
            "Turn {}: {} events, {} tiles revealed",
            self.scheduler.turn_number(),
            events.len(),
            revealed
        );
        debug_assert!(
            self.check_invariants().is_ok(),
            "invariants broken after turn {}: {:?}",
            self.scheduler.turn_number(),
            self.check_invariants()
        );

        self.last_events = events.clone();
        events
    }

    /// Copies out everything a renderer needs.
    pub fn current_view(&self) -> SessionView {
        SessionView::capture(
            &self.level,
            &self.registry,
            self.scheduler.state(),
            self.scheduler.turn_number(),
        )
    }

    pub fn state(&self) -> SessionState {
        self.scheduler.state()
    }

    pub fn turn_number(&self) -> u64 {
        self.scheduler.turn_number()
    }

    pub fn player_id(&self) -> EntityId {
        self.player_id
    }

    /// The player, while alive.
    pub fn player(&self) -> Option<&Entity> {
        self.registry.get(self.player_id)
    }

    pub fn level(&self) -> &Level {
        &self.level
    }

    pub fn registry(&self) -> &EntityRegistry {
        &self.registry
    }

    pub fn statistics(&self) -> &GameStatistics {
        &self.statistics
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn streams(&self) -> &RandomStreams {
        &self.streams
    }

    /// Events of the most recent step. Empty after loading.
    pub fn last_events(&self) -> &[GameEvent] {
        &self.last_events
    }

    /// Marks tiles around the player as discovered. Returns how many were new.
    pub fn update_player_visibility(&mut self) -> usize {
        match self.registry.get(self.player_id) {
            Some(player) => {
                let position = player.position();
                self.level
                    .reveal_around(position, self.config.rules.sight_radius)
            }
            None => 0,
        }
    }

    /// Verifies the state invariants that must hold between turns.
    pub fn check_invariants(&self) -> DungeonResult<()> {
        let players: Vec<&Entity> = self.registry.iter().filter(|e| e.is_player()).collect();
        let player_ok = match self.state() {
            SessionState::Active => {
                players.len() == 1
                    && players[0].id() == self.player_id
                    && players[0].is_alive()
            }
            _ => players.len() <= 1,
        };
        if !player_ok {
            return Err(DungeonError::InvalidState(format!(
                "{} player entities while {}",
                players.len(),
                self.state()
            )));
        }

        let mut occupied = HashSet::new();
        for entity in self.registry.iter() {
            let id = entity.id();
            let position = entity.position();

            if entity.is_actor() && !entity.is_alive() {
                return Err(DungeonError::InvalidState(format!(
                    "Dead {} {} is still registered",
                    entity.name(),
                    id
                )));
            }
            if entity.is_alive() {
                if !self.level.is_passable(position) {
                    return Err(DungeonError::InvalidState(format!(
                        "{} {} stands on impassable {}",
                        entity.name(),
                        id,
                        position
                    )));
                }
                if !occupied.insert(position) {
                    return Err(DungeonError::InvalidState(format!(
                        "Two living actors share {}",
                        position
                    )));
                }
            }

            match entity.holder() {
                None => {
                    if !self.level.is_valid_position(position) {
                        return Err(DungeonError::InvalidState(format!(
                            "{} is outside the level at {}",
                            id, position
                        )));
                    }
                    if !self.registry.entities_at(position).any(|e| e.id() == id) {
                        return Err(DungeonError::InvalidState(format!(
                            "{} is missing from the position index",
                            id
                        )));
                    }
                }
                Some(holder) => {
                    let carried = self
                        .registry
                        .get(holder)
                        .map(|h| h.inventory().contains(&id))
                        .unwrap_or(false);
                    if !carried {
                        return Err(DungeonError::InvalidState(format!(
                            "{} claims to be carried by {}",
                            id, holder
                        )));
                    }
                }
            }

            for &item in entity.inventory() {
                if self.registry.get(item).and_then(Entity::holder) != Some(id) {
                    return Err(DungeonError::InvalidState(format!(
                        "{} lists {} but does not hold it",
                        id, item
                    )));
                }
            }
        }
        Ok(())
    }

    /// Serializes the complete session, random streams included.
    pub fn save_to_json(&self) -> DungeonResult<String> {
        serde_json::to_string_pretty(self).map_err(DungeonError::from)
    }

    /// Restores a session saved by [`GameSession::save_to_json`].
    ///
    /// The restored session continues exactly where the saved one left off.
    pub fn load_from_json(json: &str) -> DungeonResult<Self> {
        let session: GameSession = serde_json::from_str(json)?;
        session.check_invariants()?;
        info!(
            "Loaded session with seed {} at turn {}",
            session.config.generation.seed,
            session.turn_number()
        );
        Ok(session)
    }

    pub fn save_to_file(&self, path: impl AsRef<Path>) -> DungeonResult<()> {
        std::fs::write(path, self.save_to_json()?)?;
        Ok(())
    }

    pub fn load_from_file(path: impl AsRef<Path>) -> DungeonResult<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::load_from_json(&json)
    }
}
