use rand::rngs::StdRng;
use rand::Rng;

use crate::dvonn::prelude::*;

use super::evaluator::Evaluator;

/// How much work to spend sorting children before descending.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MoveOrderMode {
    Off,
    /// Partition by destination owner; no evaluation.
    Heuristic,
    /// Execute every move and sort by static evaluation.
    Evaluated,
}

/// In-place Fisher-Yates shuffle; breaks first-move ties between
/// otherwise identical root searches.
pub(crate) fn shuffle(moves: &mut [Move], rng: &mut StdRng) {
    let mut n = moves.len();
    while n > 1 {
        let m = rng.random_range(0..n);
        n -= 1;
        moves.swap(m, n);
    }
}

/// Heuristic rank of a stacking move: onto the opponent is good, onto a
/// Dvonn stack is medium, onto your own colour is bad.
fn rank(board: &Board, m: Move) -> u8 {
    let Move::Stack(src, dst) = m else { return 1 };
    let to = board.field(dst).player;
    if to.is_none() {
        1
    } else if to == board.field(src).player {
        2
    } else {
        0
    }
}

/// Three-way partition of the move list, good first and bad last; the
/// middle stays unordered. Placement lists carry no owner information
/// and are left untouched.
pub(crate) fn order_heuristic(board: &Board, moves: &mut [Move]) {
    if moves.iter().any(|m| !matches!(m, Move::Stack(..))) {
        return;
    }
    let (mut lo, mut i, mut hi) = (0usize, 0usize, moves.len());
    while i < hi {
        match rank(board, moves[i]) {
            0 => {
                moves.swap(i, lo);
                lo += 1;
                i += 1;
            }
            1 => i += 1,
            _ => {
                hi -= 1;
                moves.swap(i, hi);
            }
        }
    }
}

/// Orders moves by executing each and evaluating the result. Successor
/// values are relative to the opponent, so sorting ascending puts the
/// mover's best move first. The sort is stable, preserving any earlier
/// heuristic order between equal evaluations.
pub(crate) fn order_evaluated(board: &mut Board, evaluator: &mut Evaluator, moves: &mut [Move]) {
    let mut scored: Vec<(Val, Move)> = moves
        .iter()
        .map(|&m| {
            let undo = board.do_move(m);
            let mut exact = false;
            let v = evaluator.evaluate(board, &mut exact);
            board.undo_move(m, undo);
            (v, m)
        })
        .collect();
    scored.sort_by_key(|&(v, _)| v);
    for (slot, (_, m)) in moves.iter_mut().zip(scored) {
        *slot = m;
    }
}

/// Moves the killer to the front (if present) and leaves every other
/// move in the same relative order.
pub(crate) fn move_to_front(moves: &mut [Move], killer: Move) {
    if let Some(pos) = moves.iter().position(|&m| m == killer) {
        moves[..=pos].rotate_right(1);
    }
}
