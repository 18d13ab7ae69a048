/*
 *  An implementation of the board game Dvonn in Rust.
 */

pub(crate) mod board;
pub(crate) mod consts;
pub mod notation;

pub mod prelude {
    pub(crate) use crate::utils::prelude::*;

    pub use super::{
        board::{Board, Cell, Field, Move, Undo},
        consts::*,
        notation::StateString,
    };
}

#[cfg(test)]
pub(crate) mod testkit {
    use rand::rngs::StdRng;
    use rand::Rng;

    use super::prelude::*;

    /// A uniformly random legal move, if the game is not over.
    pub(crate) fn random_move(rng: &mut StdRng, board: &Board) -> Option<Move> {
        let moves = board.legal_moves();
        if moves.is_empty() {
            None
        } else {
            Some(moves[rng.random_range(0..moves.len())])
        }
    }

    /// Plays up to `plies` random legal moves from the empty board.
    pub(crate) fn random_board(rng: &mut StdRng, plies: usize) -> Board {
        let mut board = Board::new();
        for _ in 0..plies {
            if board.game_over() {
                break;
            }
            let Some(m) = random_move(rng, &board) else { break };
            board.do_move(m);
        }
        board
    }
}
