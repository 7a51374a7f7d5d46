//! # Turn Scheduler
//!
//! Advances the session one discrete step: the player acts, then every
//! living monster acts in registry order. The scheduler also owns the
//! session's terminal states.

use crate::{
    choose_monster_action, Action, ActionResolver, EntityId, EntityRegistry, GameEvent, Level,
    RandomStreams, RulesConfig,
};
use log::info;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Where the session stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionState {
    /// Turns are being played
    Active,
    /// The player was killed
    PlayerDead,
    /// The player reached the stairs
    LevelComplete,
}

impl SessionState {
    /// Terminal states accept no further turns.
    pub fn is_terminal(self) -> bool {
        !matches!(self, SessionState::Active)
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionState::Active => write!(f, "active"),
            SessionState::PlayerDead => write!(f, "player dead"),
            SessionState::LevelComplete => write!(f, "level complete"),
        }
    }
}

/// Mutable session parts a step works on.
pub struct TurnContext<'a> {
    pub level: &'a mut Level,
    pub registry: &'a mut EntityRegistry,
    pub streams: &'a mut RandomStreams,
    pub rules: &'a RulesConfig,
}

/// State machine over [`SessionState`] plus the turn counter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TurnScheduler {
    state: SessionState,
    turn_number: u64,
}

impl Default for TurnScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl TurnScheduler {
    pub fn new() -> Self {
        Self {
            state: SessionState::Active,
            turn_number: 0,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Number of steps played so far.
    pub fn turn_number(&self) -> u64 {
        self.turn_number
    }

    /// Plays one step and returns its events in order.
    ///
    /// The player's action is resolved first; a rejected action still uses up
    /// the turn. Reaching the stairs ends the level before any monster moves.
    /// The player's death ends the step immediately, skipping the monsters
    /// that have not acted yet. Once terminal, steps do nothing.
    pub fn step(
        &mut self,
        player: EntityId,
        action: &Action,
        ctx: TurnContext<'_>,
    ) -> Vec<GameEvent> {
        if self.state.is_terminal() {
            return Vec::new();
        }

        self.turn_number += 1;
        let resolver = ActionResolver::new(*ctx.rules);
        let mut events = resolver
            .resolve(player, action, ctx.level, ctx.registry, &mut ctx.streams.combat)
            .events;

        if !Self::player_alive(ctx.registry, player) {
            self.transition(SessionState::PlayerDead);
            return events;
        }
        if self.check_stairs(player, ctx.level, ctx.registry, &mut events) {
            return events;
        }

        let monsters: Vec<EntityId> = ctx
            .registry
            .all_living()
            .filter(|entity| !entity.is_player())
            .map(|entity| entity.id())
            .collect();

        for id in monsters {
            // Killed earlier this step
            let Some(monster) = ctx.registry.get(id).filter(|entity| entity.is_alive()) else {
                continue;
            };
            let intent = choose_monster_action(
                monster,
                ctx.level,
                ctx.registry,
                ctx.rules,
                &mut ctx.streams.ai,
            );
            let outcome =
                resolver.resolve(id, &intent, ctx.level, ctx.registry, &mut ctx.streams.combat);
            events.extend(outcome.events);

            if !Self::player_alive(ctx.registry, player) {
                self.transition(SessionState::PlayerDead);
                return events;
            }
        }

        self.check_stairs(player, ctx.level, ctx.registry, &mut events);
        events
    }

    fn player_alive(registry: &EntityRegistry, player: EntityId) -> bool {
        registry
            .get(player)
            .map(|entity| entity.is_alive())
            .unwrap_or(false)
    }

    fn check_stairs(
        &mut self,
        player: EntityId,
        level: &Level,
        registry: &EntityRegistry,
        events: &mut Vec<GameEvent>,
    ) -> bool {
        let on_stairs = registry
            .get(player)
            .map(|entity| level.is_stairs(entity.position()))
            .unwrap_or(false);
        if on_stairs {
            self.transition(SessionState::LevelComplete);
            events.push(GameEvent::LevelCompleted { entity: player });
        }
        on_stairs
    }

    fn transition(&mut self, next: SessionState) {
        info!(
            "Session {} -> {} on turn {}",
            self.state, next, self.turn_number
        );
        self.state = next;
    }
}
