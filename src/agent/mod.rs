mod evaluator;
mod ordering;
mod searcher;
mod table;
mod timer;

pub use evaluator::{EvalWeights, Evaluator, FieldWeights};
pub use ordering::MoveOrderMode;
pub use searcher::{AiLimit, AiResult, Searcher};
pub use table::{TranspositionTable, TtEntry};
pub use timer::{Alarm, GameClock};

use crate::dvonn::prelude::*;

/// Iterative-deepening step width; the budget projection changes shape
/// with it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DeepeningStep {
    One = 1,
    Two = 2,
}

/// Immutable search parameters, fixed once at startup and passed down the
/// call stack instead of living in mutable globals.
#[derive(Clone, Copy, Debug)]
pub struct SearchConfig {
    /// Table holds `2^tt_bits` entries; 0 disables it.
    pub tt_bits: u32,
    /// Linear probe cap; 0 keeps the table direct-mapped.
    pub tt_probe: usize,
    pub mo: MoveOrderMode,
    /// 0 off, 1 table killers, 2 adds per-ply killer slots.
    pub killer: u8,
    pub use_pvs: bool,
    pub use_mtdf: bool,
    pub deepening: DeepeningStep,
    pub weights: EvalWeights,
    pub wfields: Option<FieldWeights>,
    pub seed: u64,
}

impl Default for SearchConfig {
    fn default() -> Self {
        SearchConfig {
            tt_bits: 21,
            tt_probe: 0,
            mo: MoveOrderMode::Heuristic,
            killer: 1,
            use_pvs: true,
            use_mtdf: false,
            deepening: DeepeningStep::One,
            weights: EvalWeights::default(),
            wfields: None,
            seed: 1,
        }
    }
}

/// The playing engine: one board, one searcher, one configuration.
pub struct DvonnAgent {
    board: Board,
    searcher: Searcher,
}

impl DvonnAgent {
    pub fn new(config: SearchConfig) -> Result<DvonnAgent> {
        Ok(DvonnAgent { board: Board::new(), searcher: Searcher::new(config)? })
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    /// Replaces the game state, e.g. when analysing a loaded position.
    pub fn set_board(&mut self, board: Board) {
        self.board = board;
    }

    /// Executes a move after validating it against the current position.
    pub fn play(&mut self, m: Move) -> Result<()> {
        self.board.play(m)?;
        #[cfg(debug_assertions)]
        self.board.validate();
        Ok(())
    }

    /// Searches for the best move under the given limits.
    pub fn select_move(&mut self, limit: &AiLimit) -> Result<AiResult> {
        self.searcher.select_move(&mut self.board, limit)
    }

    /// Static evaluation of the current position.
    pub fn evaluate(&mut self) -> (Val, bool) {
        self.searcher.evaluate(&self.board)
    }

    /// The principal variation stored in the table, up to `limit` plies.
    pub fn principal_variation(&mut self, limit: usize) -> Vec<Move> {
        self.searcher.extract_pv(&mut self.board, limit)
    }

    /// Raises the abort flag of a running search.
    pub fn interrupt(&self) {
        self.searcher.interrupt();
    }

    /// Time the engine has spent thinking so far.
    pub fn time_used(&self) -> std::time::Duration {
        self.searcher.clock.used()
    }

    /// Pauses the game clock while waiting on external input.
    pub fn pause_clock(&mut self) {
        self.searcher.clock.stop();
    }

    /// Resumes the game clock before thinking.
    pub fn resume_clock(&mut self) {
        self.searcher.clock.start();
    }
}
