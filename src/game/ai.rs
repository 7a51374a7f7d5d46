//! # Monster AI
//!
//! A closed set of behaviours, one per monster kind. Each policy turns the
//! current state into a single [`Action`]; the scheduler then resolves it
//! through the same resolver the player uses, so monsters obey exactly the
//! same rules.

use crate::{
    next_step_towards, Action, Direction, Entity, EntityRegistry, Level, RandomStream,
    RulesConfig,
};
use serde::{Deserialize, Serialize};

/// How a monster decides what to do on its turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AiPolicy {
    /// Attack when adjacent, otherwise close in on a nearby player and
    /// wander when the player is out of range
    Chase,
    /// Attack when adjacent, otherwise step in a random direction or pause
    Wander,
    /// Attack when adjacent, otherwise hold position
    Stationary,
}

impl AiPolicy {
    /// Picks the action for `monster` this turn.
    ///
    /// Only the `Wander` fallback draws from `ai`; attacks and chase steps
    /// are fully determined by the state.
    pub fn choose_action(
        self,
        monster: &Entity,
        level: &Level,
        registry: &EntityRegistry,
        rules: &RulesConfig,
        ai: &mut RandomStream,
    ) -> Action {
        let Some(player) = registry.player().filter(|player| player.is_alive()) else {
            return Action::Wait;
        };
        let here = monster.position();
        let target = player.position();

        if here.is_adjacent(target) {
            return Action::Attack(player.id());
        }

        match self {
            AiPolicy::Chase => {
                if here.chebyshev_distance(target) <= rules.detection_radius {
                    if let Some(direction) = next_step_towards(level, registry, here, target) {
                        return Action::Move(direction);
                    }
                }
                wander(ai)
            }
            AiPolicy::Wander => wander(ai),
            AiPolicy::Stationary => Action::Wait,
        }
    }
}

/// One of the eight directions, or a pause, uniformly.
fn wander(ai: &mut RandomStream) -> Action {
    let directions = Direction::all();
    let roll = ai.next_index(directions.len() + 1);
    directions
        .get(roll)
        .map(|&direction| Action::Move(direction))
        .unwrap_or(Action::Wait)
}

/// Picks the action for a monster according to its kind's policy.
///
/// Non-monsters always wait.
pub fn choose_monster_action(
    monster: &Entity,
    level: &Level,
    registry: &EntityRegistry,
    rules: &RulesConfig,
    ai: &mut RandomStream,
) -> Action {
    match monster.monster_kind() {
        Some(kind) => kind
            .ai_policy()
            .choose_action(monster, level, registry, rules, ai),
        None => Action::Wait,
    }
}
