pub(crate) mod geometry;
pub(crate) mod movegen;
pub(crate) mod moves;
pub(crate) mod pretty;
pub(crate) mod validate;
pub(crate) mod zobrist;

use crate::dvonn::prelude::*;

use geometry::geometry;

/// An accessible field of the board.
///
/// See [`Board::validate`] for the invariants that tie these fields
/// together.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Field {
    /// Colour of the controlling player; `None` while the stack is empty
    /// or contains only Dvonn pieces.
    pub player: Option<Player>,
    /// Number of pieces on this field.
    pub pieces: u8,
    /// Number of Dvonn pieces buried in the stack.
    pub dvonns: u8,
    /// 0 while the field is live; otherwise the move on which it was
    /// removed from play.
    pub removed: u16,
    /// Number of directions whose neighbour is currently unoccupied
    /// (placing) or dead (stacking). A stack may only move while this
    /// is positive.
    pub mobile: u8,
}

impl Default for Field {
    fn default() -> Self {
        Field { player: None, pieces: 0, dvonns: 0, removed: 0, mobile: 6 }
    }
}

impl Field {
    /// Whether the field is still part of the game.
    pub fn live(&self) -> bool {
        self.removed == 0
    }
}

/// A field index on the board, bounded to the 49-cell footprint.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Cell(pub u8);

impl Cell {
    pub fn new(n: usize) -> Cell {
        debug_assert!(n < NUM_FIELDS);
        Cell(n as u8)
    }

    pub fn index(self) -> usize {
        self.0 as usize
    }

    /// Grid row of the cell.
    pub fn row(self) -> u8 {
        geometry().row(self.index())
    }

    /// Grid column of the cell.
    pub fn col(self) -> u8 {
        geometry().col(self.index())
    }
}

/// A game move: a placement, the shifting of a whole stack, or a pass
/// (legal only when no stacking move exists).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Move {
    Place(Cell),
    Stack(Cell, Cell),
    Pass,
}

/// The state a [`Board::do_move`] consumed that cannot be recovered from
/// the position itself; feed it back to [`Board::undo_move`].
#[derive(Clone, Copy, Debug, Default)]
pub struct Undo {
    pub(crate) dst_player: Option<Player>,
}

/// The full game state: a packed field array plus the incremental
/// bookkeeping (Dvonn bitmask, Zobrist hash, per-field mobility) that the
/// search relies on.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Board {
    /// Number of moves played, counting both phases and passes.
    pub(crate) moves: u16,
    pub(crate) fields: [Field; NUM_FIELDS],
    /// Bit n set iff field n currently holds at least one Dvonn piece.
    pub(crate) dvonn_bits: u64,
    /// Incrementally maintained Zobrist hash.
    pub(crate) hash: u64,
}

impl Default for Board {
    fn default() -> Self {
        Board::new()
    }
}

impl Board {
    /// An empty board, ready for the first Dvonn placement.
    pub fn new() -> Board {
        let mut board = Board {
            moves: 0,
            fields: [Field::default(); NUM_FIELDS],
            dvonn_bits: 0,
            hash: 0,
        };
        board.hash = board.zobrist_from_scratch();
        board
    }

    /// Resets to the empty board.
    pub fn clear(&mut self) {
        *self = Board::new();
    }

    pub fn moves(&self) -> u16 {
        self.moves
    }

    pub fn field(&self, cell: Cell) -> &Field {
        &self.fields[cell.index()]
    }

    pub fn dvonn_bits(&self) -> u64 {
        self.dvonn_bits
    }

    pub fn hash(&self) -> u64 {
        self.hash
    }

    /// The phase the game is in; never returns [`Phase::Finished`] (see
    /// [`Board::game_over`]).
    pub fn phase(&self) -> Phase {
        if (self.moves as usize) < NUM_FIELDS {
            Phase::Placing
        } else {
            Phase::Stacking
        }
    }

    /// The player to move after `moves` plies. White opens both phases;
    /// the last placement does not flip the turn (see the move counter
    /// arithmetic: move `N-1` and move `N` are both White's).
    pub(crate) fn player_at(moves: u16) -> Player {
        let m = moves as usize;
        let parity = if m < NUM_FIELDS { m % 2 } else { (m - NUM_FIELDS) % 2 };
        if parity == 0 { Player::White } else { Player::Black }
    }

    /// The player whose turn it is.
    pub fn next_player(&self) -> Player {
        Board::player_at(self.moves)
    }

    /// Final-score count: pieces sitting on live stacks controlled by the
    /// given player.
    pub fn score_for(&self, player: Player) -> Val {
        self.fields
            .iter()
            .filter(|f| f.live() && f.player == Some(player))
            .map(|f| f.pieces as Val)
            .sum()
    }

    /// Whether the game has ended: the stacking phase with no legal
    /// stacking move left for either player.
    pub fn game_over(&self) -> bool {
        self.phase() == Phase::Stacking
            && !self.has_stack_move(Player::White)
            && !self.has_stack_move(Player::Black)
    }
}
