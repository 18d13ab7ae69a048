use std::ops::Neg;

use crate::utils::prelude::*;

/// Width of the bounding grid the hex footprint is embedded in.
pub const BOARD_WIDTH: usize = 11;
/// Height of the bounding grid.
pub const BOARD_HEIGHT: usize = 5;
/// Number of accessible fields on the board.
pub const NUM_FIELDS: usize = 49;
/// Number of neutral Dvonn pieces placed at the start of the game.
pub const NUM_DVONNS: usize = 3;
/// Upper bound on the number of stacking moves available to one player.
pub const MAX_MOVES: usize = (NUM_FIELDS - NUM_DVONNS) / 2 * 6;

/// Hard cap on iterative-deepening depth.
pub const AI_MAX_DEPTH: u16 = 32;

/// Type of values used to evaluate game positions.
pub type Val = i32;

pub const VAL_MIN: Val = -1_000_000_000;
pub const VAL_MAX: Val = 1_000_000_000;
pub const VAL_EPS: Val = 1;
/// Scale factor for end-of-game scores; dwarfs any heuristic value.
pub const VAL_BIG: Val = 1_000_000;

/// The colour of the top piece of a stack.
#[repr(u8)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Player {
    White = 0,
    Black = 1,
}

impl Player {
    /// Notates the player.
    pub fn notate(&self) -> String {
        match self {
            Player::White => "W",
            Player::Black => "B",
        }
        .into()
    }

    /// The given player's scoring factor.
    /// Choosing 1 and -1 allows for branchless negamax.
    pub fn perspective(&self) -> Val {
        match self {
            Player::White => 1,
            Player::Black => -1,
        }
    }

    /// Index into per-player accumulator arrays.
    pub fn index(&self) -> usize {
        *self as usize
    }

    /// Parses into a player.
    pub fn parse(s: &str) -> Result<Option<Player>> {
        match s {
            "w" | "W" => Ok(Some(Player::White)),
            "b" | "B" => Ok(Some(Player::Black)),
            "_" | "-" | "." => Ok(None),
            _ => Err(anyhow!("invalid notation {s} for player")),
        }
    }
}

impl Neg for Player {
    type Output = Player;
    fn neg(self) -> Self::Output {
        match self {
            Player::White => Player::Black,
            Player::Black => Player::White,
        }
    }
}

impl From<u8> for Player {
    fn from(value: u8) -> Self {
        match value {
            0 => Player::White,
            1 => Player::Black,
            _ => panic!("expected player code of 0-1, received {value}"),
        }
    }
}

/// The two phases of a game, plus the finished marker used by the state codec.
#[repr(u8)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    Placing = 0,
    Stacking = 1,
    Finished = 2,
}
