//! # Command Vocabulary
//!
//! Keyword tables for the text command language.

use crate::Direction;

/// Help text listing every command the parser understands.
pub const HELP_TEXT: &str = "\
Commands:
  n s e w ne nw se sw   move one tile (long names like `north` work too)
  a <dir>               attack the creature in that direction
  u <slot>              use the inventory item in that slot (from 1)
  . | wait              wait a turn
  map                   show the map
  inv                   show the inventory
  help | ?              show this help
  q | quit              quit";

/// Maps a direction keyword to a [`Direction`].
pub fn parse_direction(word: &str) -> Option<Direction> {
    let direction = match word {
        "n" | "north" => Direction::North,
        "s" | "south" => Direction::South,
        "e" | "east" => Direction::East,
        "w" | "west" => Direction::West,
        "ne" | "northeast" => Direction::Northeast,
        "nw" | "northwest" => Direction::Northwest,
        "se" | "southeast" => Direction::Southeast,
        "sw" | "southwest" => Direction::Southwest,
        _ => return None,
    };
    Some(direction)
}

/// Short keyword for a direction, the inverse of [`parse_direction`].
pub fn direction_keyword(direction: Direction) -> &'static str {
    match direction {
        Direction::North => "n",
        Direction::South => "s",
        Direction::East => "e",
        Direction::West => "w",
        Direction::Northeast => "ne",
        Direction::Northwest => "nw",
        Direction::Southeast => "se",
        Direction::Southwest => "sw",
    }
}

/// Splits a script into commands. Both newlines and `;` separate commands.
pub fn split_script(script: &str) -> impl Iterator<Item = &str> + '_ {
    script
        .split(|c| c == '\n' || c == ';')
        .map(str::trim)
        .filter(|line| !line.is_empty())
}
