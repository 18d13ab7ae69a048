use std::time::Duration;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::dvonn::prelude::*;

use super::evaluator::Evaluator;
use super::ordering::{self, MoveOrderMode};
use super::table::{TranspositionTable, EXACT_DEPTH};
use super::timer::{Alarm, GameClock};
use super::{DeepeningStep, SearchConfig};

/// Headroom over the deepening cap for the forced move at the phase seam.
const MAX_PLY: usize = AI_MAX_DEPTH as usize + 16;

/// Stop conditions for one move selection; whichever positive field
/// triggers first ends the search.
#[derive(Clone, Copy, Debug, Default)]
pub struct AiLimit {
    pub depth: Option<u16>,
    pub eval: Option<u64>,
    pub time: Option<Duration>,
}

/// Outcome of one move selection.
#[derive(Clone, Copy, Debug, Default)]
pub struct AiResult {
    /// The selected move; always present for a playable position.
    pub mv: Option<Move>,
    /// Value of the last completed iteration, for the side to move.
    pub value: Val,
    /// Depth of the last completed iteration.
    pub depth: u16,
    /// Heuristic evaluations spent.
    pub evaluated: u64,
    /// Wall time consumed.
    pub time: Duration,
    /// Whether a stop condition cut the final iteration short.
    pub aborted: bool,
    /// Whether the value derives from game-over leaves only.
    pub exact: bool,
}

/// Fail-soft negamax alpha-beta searcher with iterative deepening,
/// transposition table, optional PVS and MTD(f), and cooperative abort.
pub struct Searcher {
    config: SearchConfig,
    tt: Option<TranspositionTable>,
    evaluator: Evaluator,
    pub(crate) clock: GameClock,
    alarm: Alarm,
    rng: StdRng,
    /// Persistent iterative-deepening start depth across calls.
    start_depth: u16,
    /// Per-ply killer slots, used at killer level 2.
    killers: [Option<Move>; MAX_PLY],
    eval_limit: Option<u64>,
}

impl Searcher {
    pub fn new(config: SearchConfig) -> Result<Searcher> {
        let tt = match config.tt_bits {
            0 => None,
            bits => Some(TranspositionTable::new(bits, config.tt_probe)?),
        };
        let evaluator = Evaluator::new(config.weights, config.wfields);
        let rng = StdRng::seed_from_u64(config.seed);
        Ok(Searcher {
            config,
            tt,
            evaluator,
            clock: GameClock::new(),
            alarm: Alarm::new(),
            rng,
            start_depth: 1,
            killers: [None; MAX_PLY],
            eval_limit: None,
        })
    }

    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    /// Raises the abort flag, as an external interrupt would.
    pub fn interrupt(&self) {
        self.alarm.trigger_now();
    }

    fn aborted(&self) -> bool {
        self.alarm.aborted()
    }

    /// One-off static evaluation of a position, for analysis output.
    pub fn evaluate(&mut self, board: &Board) -> (Val, bool) {
        let mut exact = false;
        let v = self.evaluator.evaluate(board, &mut exact);
        (v, exact)
    }

    /// Selects a move for the side to move under the given limits.
    pub fn select_move(&mut self, board: &mut Board, limit: &AiLimit) -> Result<AiResult> {
        self.alarm.reset();
        self.evaluator.reset_counter();
        self.eval_limit = limit.eval;
        let t0 = self.clock.used();

        if (board.moves() as usize) <= NUM_DVONNS {
            return Ok(self.select_opening_place(board, t0));
        }

        let max_depth = limit.depth.unwrap_or(AI_MAX_DEPTH).clamp(1, AI_MAX_DEPTH);
        let mut start = self.start_depth.clamp(1, max_depth);
        // Keep killer references one ply fresh instead of two.
        if self.tt.is_some() && self.config.killer > 0 && start > 1 {
            start -= 1;
        }

        let mut result = AiResult::default();
        let mut prev_iter: Option<Duration> = None;
        let mut armed = false;
        let step = self.config.deepening as u16;

        let mut depth = start;
        while depth <= max_depth {
            let iter_t0 = self.clock.used();
            let mut exact = true;
            let (val, best) = if self.config.use_mtdf {
                self.mtdf(board, depth, result.value, &mut exact)
            } else {
                self.search(board, depth, 0, VAL_MIN, VAL_MAX, true, &mut exact)
            };
            if self.aborted() {
                // Roll back to the last completed iteration.
                result.aborted = true;
                break;
            }

            result.mv = best;
            result.value = val;
            result.depth = depth;
            result.exact = exact;
            log::debug!(
                "depth {depth}: value {val} ({} positions evaluated)",
                self.evaluator.evaluated()
            );
            if exact {
                break;
            }

            let iter = self.clock.used() - iter_t0;
            if let Some(budget) = limit.time {
                let used = self.clock.used() - t0;
                if used >= budget {
                    break;
                }
                if let Some(prev) = prev_iter.filter(|p| !p.is_zero()) {
                    let ratio = iter.as_secs_f64() / prev.as_secs_f64();
                    let projected = used.as_secs_f64()
                        * match self.config.deepening {
                            DeepeningStep::One => ratio * ratio,
                            DeepeningStep::Two => {
                                if depth % 2 == 0 {
                                    2.0 * ratio
                                } else {
                                    ratio / 2.0
                                }
                            }
                        };
                    if projected > budget.as_secs_f64() {
                        if armed {
                            break;
                        }
                        // The next iteration probably does not fit; let it
                        // run against a hard deadline so whatever it
                        // explores still lands in the table.
                        self.alarm.set(budget - used);
                        armed = true;
                    }
                }
            }
            prev_iter = Some(iter);
            depth += step;
        }
        self.alarm.clear();

        if result.mv.is_none() {
            log::warn!("search yielded no move, falling back to the first legal one");
            result.mv = board.legal_moves().first().copied();
        }
        result.evaluated = self.evaluator.evaluated();
        result.time = self.clock.used() - t0;
        self.start_depth = if result.aborted {
            result.depth.saturating_sub(1).max(1)
        } else {
            result.depth.max(1)
        };
        if result.mv.is_none() {
            return Err(anyhow!("no move selected"));
        }
        Ok(result)
    }

    /// The first `D + 1` placements bypass alpha-beta entirely: searching
    /// them is uninformative. The first Dvonn goes anywhere, the second
    /// and third minimize the Dvonn spread, and the first real piece is
    /// chosen by one-ply greedy evaluation.
    fn select_opening_place(&mut self, board: &mut Board, t0: Duration) -> AiResult {
        let places = board.legal_moves();
        let mv = match board.moves() {
            0 => places[self.rng.random_range(0..places.len())],
            1 | 2 => self.pick_minimal(board, &places, |board, _| {
                Evaluator::dvonn_spread(board)
            }),
            _ => self.pick_minimal(board, &places, |board, evaluator| {
                // Successor values are relative to the opponent.
                let mut exact = false;
                evaluator.evaluate(board, &mut exact)
            }),
        };
        AiResult {
            mv: Some(mv),
            value: 0,
            depth: 0,
            evaluated: self.evaluator.evaluated(),
            time: self.clock.used() - t0,
            aborted: false,
            exact: false,
        }
    }

    /// Applies each candidate, scores the successor, undoes, and keeps a
    /// uniformly random move among the minimal scores.
    fn pick_minimal(
        &mut self,
        board: &mut Board,
        moves: &[Move],
        score: impl Fn(&Board, &mut Evaluator) -> Val,
    ) -> Move {
        let mut best_val = VAL_MAX;
        let mut count = 0u32;
        let mut pick = moves[0];
        for &m in moves {
            let undo = board.do_move(m);
            let v = score(board, &mut self.evaluator);
            board.undo_move(m, undo);
            if v < best_val {
                best_val = v;
                count = 0;
            }
            if v == best_val {
                count += 1;
                if self.rng.random_range(0..count) == 0 {
                    pick = m;
                }
            }
        }
        pick
    }

    /// Fail-soft negamax. The return value is exact when strictly inside
    /// the window, an upper bound at or below alpha, and a lower bound at
    /// or above beta. Callers must check the abort flag before using it.
    fn search(
        &mut self,
        board: &mut Board,
        depth: u16,
        ply: usize,
        alpha: Val,
        beta: Val,
        want_best: bool,
        exact: &mut bool,
    ) -> (Val, Option<Move>) {
        if self.aborted() {
            return (0, None);
        }
        if let Some(max) = self.eval_limit {
            if self.evaluator.evaluated() >= max {
                self.alarm.trigger_now();
                return (0, None);
            }
        }

        // Finished games score themselves; without this the generator
        // would hand out passes forever.
        if board.phase() == Phase::Stacking && board.game_over() {
            let me = board.next_player();
            return (VAL_BIG * (board.score_for(me) - board.score_for(-me)), None);
        }
        if depth == 0 {
            let mut leaf_exact = false;
            let v = self.evaluator.evaluate(board, &mut leaf_exact);
            if !leaf_exact {
                *exact = false;
            }
            return (v, None);
        }

        let hash = board.hash();
        let (mut alpha, mut beta) = (alpha, beta);
        let mut killer: Option<Move> = None;

        if let Some(tt) = &self.tt {
            if let Some(entry) = tt.lookup(hash) {
                killer = entry.killer;
                if entry.depth == depth as i16 || entry.depth == EXACT_DEPTH {
                    let from_endgame = entry.depth == EXACT_DEPTH;
                    // At the root the stored move doubles as the answer,
                    // so it must survive a legality check first.
                    let root_killer_ok =
                        !want_best || killer.is_some_and(|k| board.valid_move(k));
                    if root_killer_ok {
                        if entry.lo == entry.hi || entry.lo >= beta {
                            if !from_endgame {
                                *exact = false;
                            }
                            return (entry.lo, killer);
                        }
                        if entry.hi <= alpha {
                            if !from_endgame {
                                *exact = false;
                            }
                            return (entry.hi, killer);
                        }
                    }
                    if entry.lo > alpha || entry.hi < beta {
                        if !from_endgame {
                            *exact = false;
                        }
                        alpha = alpha.max(entry.lo);
                        beta = beta.min(entry.hi);
                    }
                }
            }
        }

        // At the placement/stacking seam the single forced placement does
        // not flip the side to move: same perspective, same depth.
        if board.moves() as usize == NUM_FIELDS - 1 {
            let moves = board.legal_moves();
            debug_assert_eq!(moves.len(), 1);
            let m = moves[0];
            let mut node_exact = true;
            let undo = board.do_move(m);
            let (v, _) = self.search(board, depth, ply + 1, alpha, beta, false, &mut node_exact);
            board.undo_move(m, undo);
            if self.aborted() {
                return (0, None);
            }
            if let Some(tt) = &mut self.tt {
                tt.update(board.moves(), hash, depth as i16, node_exact, alpha, beta, v, Some(m));
            }
            if !node_exact {
                *exact = false;
            }
            return (v, Some(m));
        }

        let mut moves = board.legal_moves();
        debug_assert!(!moves.is_empty());
        if moves.len() > 1 {
            if want_best {
                ordering::shuffle(&mut moves, &mut self.rng);
            }
            match self.config.mo {
                MoveOrderMode::Off => {}
                MoveOrderMode::Heuristic => ordering::order_heuristic(board, &mut moves),
                MoveOrderMode::Evaluated => {
                    ordering::order_evaluated(board, &mut self.evaluator, &mut moves)
                }
            }
            if self.config.killer >= 2 {
                if let Some(k) = self.killers[ply] {
                    ordering::move_to_front(&mut moves, k);
                }
            }
            if self.config.killer >= 1 {
                if let Some(k) = killer {
                    ordering::move_to_front(&mut moves, k);
                }
            }
        }

        let mut res = VAL_MIN;
        let mut best: Option<Move> = None;
        let mut node_exact = true;

        for (i, &m) in moves.iter().enumerate() {
            let undo = board.do_move(m);
            let a = alpha.max(res);
            let v = if i == 0 || !self.config.use_pvs || res <= alpha {
                -self.search(board, depth - 1, ply + 1, -beta, -a, false, &mut node_exact).0
            } else {
                // Null-window probe first; only a value inside the window
                // is worth the full re-search.
                let probe = -self
                    .search(board, depth - 1, ply + 1, -a - VAL_EPS, -a, false, &mut node_exact)
                    .0;
                if probe > a && probe < beta && !self.aborted() {
                    -self
                        .search(board, depth - 1, ply + 1, -beta, -probe, false, &mut node_exact)
                        .0
                } else {
                    probe
                }
            };
            board.undo_move(m, undo);
            if self.aborted() {
                return (0, None);
            }
            if v > res {
                res = v;
                best = Some(m);
            }
            if res >= beta {
                if self.config.killer >= 2 {
                    self.killers[ply] = Some(m);
                }
                break;
            }
        }

        if let Some(tt) = &mut self.tt {
            tt.update(board.moves(), hash, depth as i16, node_exact, alpha, beta, res, best);
        }
        if !node_exact {
            *exact = false;
        }
        (res, best)
    }

    /// MTD(f): a run of null-window searches converging on the minimax
    /// value, leaning on the table to avoid re-expanding the tree.
    fn mtdf(
        &mut self,
        board: &mut Board,
        depth: u16,
        first_guess: Val,
        exact: &mut bool,
    ) -> (Val, Option<Move>) {
        let mut guess = first_guess;
        let (mut lo, mut hi) = (VAL_MIN, VAL_MAX);
        let mut best: Option<Move> = None;

        while lo < hi {
            let beta = if guess == lo { guess + VAL_EPS } else { guess };
            let mut probe_exact = true;
            let (v, b) = self.search(board, depth, 0, beta - VAL_EPS, beta, true, &mut probe_exact);
            if self.aborted() {
                return (0, best);
            }
            if b.is_some() {
                best = b;
            }
            if !probe_exact {
                *exact = false;
            }
            if v < beta {
                hi = v;
            } else {
                lo = v;
            }
            guess = v;
        }
        (guess, best)
    }

    /// Walks the principal variation out of the table: follow stored
    /// killers while they stay legal, then undo everything.
    pub fn extract_pv(&mut self, board: &mut Board, limit: usize) -> Vec<Move> {
        let mut pv = Vec::new();
        let mut undos = Vec::new();
        while pv.len() < limit {
            let Some(tt) = &self.tt else { break };
            let Some(entry) = tt.lookup(board.hash()) else { break };
            if entry.hash != board.hash() {
                break;
            }
            let Some(k) = entry.killer else { break };
            if !board.valid_move(k) {
                break;
            }
            undos.push((k, board.do_move(k)));
            pv.push(k);
        }
        while let Some((m, undo)) = undos.pop() {
            board.undo_move(m, undo);
        }
        pv
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::evaluator::EvalWeights;
    use crate::dvonn::testkit;

    fn config(seed: u64) -> SearchConfig {
        SearchConfig { seed, ..SearchConfig::default() }
    }

    /// Plain negamax without table or ordering, as a trusted reference.
    fn reference(board: &mut Board, evaluator: &mut Evaluator, depth: u16) -> Val {
        if board.phase() == Phase::Stacking && board.game_over() {
            let me = board.next_player();
            return VAL_BIG * (board.score_for(me) - board.score_for(-me));
        }
        if depth == 0 {
            let mut exact = false;
            return evaluator.evaluate(board, &mut exact);
        }
        let seam = board.moves() as usize == NUM_FIELDS - 1;
        let mut best = VAL_MIN;
        for m in board.legal_moves() {
            let undo = board.do_move(m);
            let v = if seam {
                reference(board, evaluator, depth)
            } else {
                -reference(board, evaluator, depth - 1)
            };
            board.undo_move(m, undo);
            best = best.max(v);
        }
        best
    }

    #[test]
    fn fail_soft_bounds_hold_against_brute_force() {
        let mut rng = rand::rngs::StdRng::seed_from_u64(73);
        for (plies, window) in [
            (NUM_FIELDS + 2, (VAL_MIN, VAL_MAX)),
            (NUM_FIELDS + 8, (-50, 50)),
            (NUM_FIELDS + 14, (0, VAL_EPS)),
            (20, (-100, 100)),
        ] {
            let mut board = testkit::random_board(&mut rng, plies);
            if board.game_over() {
                continue;
            }
            let mut evaluator = Evaluator::new(EvalWeights::default(), None);
            let truth = reference(&mut board, &mut evaluator, 2);

            let mut searcher = Searcher::new(config(99)).unwrap();
            let mut exact = true;
            let (alpha, beta) = window;
            let (v, _) = searcher.search(&mut board, 2, 0, alpha, beta, true, &mut exact);
            if v <= alpha {
                assert!(truth <= v, "fail-low {v} must bound {truth} from above");
            } else if v >= beta {
                assert!(truth >= v, "fail-high {v} must bound {truth} from below");
            } else {
                assert_eq!(truth, v, "in-window values must be exact");
            }
        }
    }

    #[test]
    fn equal_seeds_select_equal_moves() {
        let mut rng = rand::rngs::StdRng::seed_from_u64(79);
        let board = testkit::random_board(&mut rng, NUM_FIELDS + 6);
        if board.game_over() {
            return;
        }
        let limit = AiLimit { depth: Some(3), ..AiLimit::default() };
        let mut first = board.clone();
        let mut second = board.clone();
        let a = Searcher::new(config(5)).unwrap().select_move(&mut first, &limit).unwrap();
        let b = Searcher::new(config(5)).unwrap().select_move(&mut second, &limit).unwrap();
        assert_eq!(a.mv, b.mv);
        assert_eq!(a.value, b.value);
        assert_eq!(first, board, "search must leave the board unchanged");
    }

    #[test]
    fn principal_variation_replays_legally() {
        let mut rng = rand::rngs::StdRng::seed_from_u64(83);
        let mut board = testkit::random_board(&mut rng, NUM_FIELDS + 4);
        if board.game_over() {
            return;
        }
        let mut searcher = Searcher::new(config(7)).unwrap();
        let limit = AiLimit { depth: Some(4), ..AiLimit::default() };
        searcher.select_move(&mut board, &limit).unwrap();

        let before = board.clone();
        let pv = searcher.extract_pv(&mut board, 8);
        assert_eq!(board, before, "extraction must restore the board");
        assert!(!pv.is_empty(), "a completed search leaves a root killer");
        let mut replay = board.clone();
        for m in pv {
            assert!(replay.valid_move(m), "PV move {m} is illegal");
            replay.do_move(m);
        }
    }

    #[test]
    fn the_forced_seam_placement_is_found() {
        let mut rng = rand::rngs::StdRng::seed_from_u64(89);
        let mut board = testkit::random_board(&mut rng, NUM_FIELDS - 1);
        assert_eq!(board.moves() as usize, NUM_FIELDS - 1);
        let mut searcher = Searcher::new(config(11)).unwrap();
        let limit = AiLimit { depth: Some(3), ..AiLimit::default() };
        let result = searcher.select_move(&mut board, &limit).unwrap();
        let forced = board.legal_moves()[0];
        assert_eq!(result.mv, Some(forced));
    }

    #[test]
    fn eval_budget_exhaustion_reports_aborted() {
        let mut rng = rand::rngs::StdRng::seed_from_u64(97);
        let mut board = testkit::random_board(&mut rng, NUM_FIELDS + 6);
        if board.game_over() {
            return;
        }
        let mut searcher = Searcher::new(config(13)).unwrap();
        let limit = AiLimit { depth: Some(12), eval: Some(5), ..AiLimit::default() };
        let result = searcher.select_move(&mut board, &limit).unwrap();
        assert!(result.aborted);
        assert!(result.mv.is_some(), "an aborted search still answers");
    }

    #[test]
    fn mtdf_agrees_with_alpha_beta() {
        let mut rng = rand::rngs::StdRng::seed_from_u64(101);
        let board = testkit::random_board(&mut rng, NUM_FIELDS + 10);
        if board.game_over() {
            return;
        }
        let limit = AiLimit { depth: Some(3), ..AiLimit::default() };

        let mut plain_board = board.clone();
        let plain = Searcher::new(config(17)).unwrap()
            .select_move(&mut plain_board, &limit)
            .unwrap();

        let mtdf_config = SearchConfig { use_mtdf: true, seed: 17, ..SearchConfig::default() };
        let mut mtdf_board = board.clone();
        let mtdf = Searcher::new(mtdf_config).unwrap()
            .select_move(&mut mtdf_board, &limit)
            .unwrap();

        assert_eq!(plain.value, mtdf.value);
    }

    #[test]
    fn opening_dvonns_bypass_the_tree() {
        let mut board = Board::new();
        let mut searcher = Searcher::new(config(19)).unwrap();
        let limit = AiLimit::default();
        for expected in 1..=(NUM_DVONNS as u16 + 1) {
            let result = searcher.select_move(&mut board, &limit).unwrap();
            let m = result.mv.unwrap();
            assert!(matches!(m, Move::Place(_)));
            assert_eq!(result.depth, 0);
            board.play(m).unwrap();
            assert_eq!(board.moves(), expected);
        }
    }
}
