//! # Input Module
//!
//! Text command parsing for headless play. Parsing produces a
//! [`PlayerInput`]; [`InputHandler::input_to_action`] turns the inputs that
//! cost a turn into an [`Action`] against the current session.

pub mod commands;

pub use commands::*;

use crate::{Action, Direction, DungeonError, DungeonResult, GameSession};

/// A parsed player command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerInput {
    /// Step one tile
    Move(Direction),
    /// Attack whatever stands in that direction
    Attack(Direction),
    /// Use the item in a 1-based inventory slot
    Use(usize),
    Wait,
    ShowMap,
    ShowInventory,
    Help,
    Quit,
}

impl PlayerInput {
    /// Whether this input is a game action rather than a driver command.
    pub fn takes_turn(self) -> bool {
        matches!(
            self,
            PlayerInput::Move(_) | PlayerInput::Attack(_) | PlayerInput::Use(_) | PlayerInput::Wait
        )
    }
}

/// Converts text commands into player inputs and actions.
#[derive(Debug, Clone, Copy, Default)]
pub struct InputHandler;

impl InputHandler {
    /// Creates a new input handler.
    ///
    /// # Examples
    ///
    /// ```
    /// use dungeon::{Direction, InputHandler, PlayerInput};
    ///
    /// let handler = InputHandler::new();
    /// let input = handler.parse("ne").unwrap();
    /// assert_eq!(input, Some(PlayerInput::Move(Direction::Northeast)));
    /// ```
    pub fn new() -> Self {
        Self
    }

    /// Parses one command line.
    ///
    /// Blank lines yield `None`. Keywords are case-insensitive.
    pub fn parse(&self, line: &str) -> DungeonResult<Option<PlayerInput>> {
        let lowered = line.trim().to_lowercase();
        let mut words = lowered.split_whitespace();
        let Some(command) = words.next() else {
            return Ok(None);
        };
        let argument = words.next();
        if let Some(extra) = words.next() {
            return Err(DungeonError::InvalidInput(format!(
                "unexpected `{}` after `{} {}`",
                extra,
                command,
                argument.unwrap_or_default()
            )));
        }

        let input = match (command, argument) {
            ("." | "wait", None) => PlayerInput::Wait,
            ("map", None) => PlayerInput::ShowMap,
            ("inv" | "i", None) => PlayerInput::ShowInventory,
            ("help" | "?", None) => PlayerInput::Help,
            ("q" | "quit", None) => PlayerInput::Quit,
            ("a" | "attack", Some(word)) => {
                PlayerInput::Attack(parse_direction(word).ok_or_else(|| {
                    DungeonError::InvalidInput(format!("unknown direction `{}`", word))
                })?)
            }
            ("u" | "use", Some(word)) => match word.parse::<usize>() {
                Ok(slot) if slot > 0 => PlayerInput::Use(slot),
                _ => {
                    return Err(DungeonError::InvalidInput(format!(
                        "`{}` is not an inventory slot",
                        word
                    )))
                }
            },
            (word, None) => match parse_direction(word) {
                Some(direction) => PlayerInput::Move(direction),
                None => {
                    return Err(DungeonError::InvalidInput(format!(
                        "unknown command `{}`",
                        word
                    )))
                }
            },
            (word, Some(_)) => {
                return Err(DungeonError::InvalidInput(format!(
                    "`{}` takes no argument",
                    word
                )))
            }
        };
        Ok(Some(input))
    }

    /// Converts an input into the action it requests from the session.
    ///
    /// Driver commands such as [`PlayerInput::ShowMap`] return `None`.
    /// Attacking an empty tile or using an empty slot is an input error, so
    /// the turn is not spent.
    pub fn input_to_action(
        &self,
        input: PlayerInput,
        session: &GameSession,
    ) -> DungeonResult<Option<Action>> {
        let action = match input {
            PlayerInput::Move(direction) => Action::Move(direction),
            PlayerInput::Wait => Action::Wait,
            PlayerInput::Attack(direction) => {
                let player = session.player().ok_or_else(|| {
                    DungeonError::InvalidState("the player is no longer on the map".to_string())
                })?;
                let target = player.position().step(direction);
                let victim = session
                    .registry()
                    .living_actor_at(target)
                    .ok_or_else(|| {
                        DungeonError::InvalidInput(format!(
                            "nothing to attack to the {}",
                            direction_keyword(direction)
                        ))
                    })?;
                Action::Attack(victim)
            }
            PlayerInput::Use(slot) => {
                let player = session.player().ok_or_else(|| {
                    DungeonError::InvalidState("the player is no longer on the map".to_string())
                })?;
                let item = slot
                    .checked_sub(1)
                    .and_then(|index| player.inventory().get(index))
                    .copied()
                    .ok_or_else(|| {
                        DungeonError::InvalidInput(format!("inventory slot {} is empty", slot))
                    })?;
                if let Some(kind) = session
                    .registry()
                    .get(item)
                    .and_then(|entity| entity.item_kind())
                    .filter(|kind| !kind.is_usable())
                {
                    return Err(DungeonError::InvalidInput(format!(
                        "the {} cannot be used",
                        kind.name()
                    )));
                }
                Action::UseItem(item)
            }
            PlayerInput::ShowMap
            | PlayerInput::ShowInventory
            | PlayerInput::Help
            | PlayerInput::Quit => return Ok(None),
        };
        Ok(Some(action))
    }
}
