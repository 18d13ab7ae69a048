use crate::dvonn::board::geometry::geometry;
use crate::dvonn::prelude::*;

/// Weights of the stacking-phase evaluation terms.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EvalWeights {
    /// Controlled live stacks, mobile or not.
    pub stacks: Val,
    /// Outgoing steps onto live stacks, including those of immobile stacks.
    pub moves: Val,
    /// Steps from mobile stacks onto Dvonn-bearing stacks.
    pub to_life: Val,
    /// Steps from mobile stacks onto enemy stacks.
    pub to_enemy: Val,
}

impl Default for EvalWeights {
    fn default() -> Self {
        EvalWeights { stacks: 100, moves: 25, to_life: 20, to_enemy: 20 }
    }
}

/// Parameters of the optional per-field value table; fields near the
/// Dvonns are worth `base + (bonus >> (shift * distance))`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FieldWeights {
    pub base: Val,
    pub bonus: Val,
    pub shift: u32,
}

/// Phase-gated static evaluator with memoized Dvonn distance tables.
pub struct Evaluator {
    weights: EvalWeights,
    wfields: Option<FieldWeights>,
    evaluated: u64,
    /// The `dvonn_bits` value the caches below were computed for; any
    /// placement or move of a Dvonn invalidates them lazily.
    cache_bits: Option<u64>,
    min_dist: [Val; NUM_FIELDS],
    tot_dist: [Val; NUM_FIELDS],
    field_value: [Val; NUM_FIELDS],
}

impl Evaluator {
    pub fn new(weights: EvalWeights, wfields: Option<FieldWeights>) -> Evaluator {
        Evaluator {
            weights,
            wfields,
            evaluated: 0,
            cache_bits: None,
            min_dist: [0; NUM_FIELDS],
            tot_dist: [0; NUM_FIELDS],
            field_value: [0; NUM_FIELDS],
        }
    }

    /// Number of heuristic evaluations performed since the last reset.
    pub fn evaluated(&self) -> u64 {
        self.evaluated
    }

    pub fn reset_counter(&mut self) {
        self.evaluated = 0;
    }

    /// Evaluates the position for the side to move. `exact` becomes true
    /// exactly when the value is a real game result rather than a
    /// heuristic estimate.
    pub fn evaluate(&mut self, board: &Board, exact: &mut bool) -> Val {
        *exact = false;
        if (board.moves() as usize) < NUM_DVONNS {
            // No meaningful material before the Dvonns are down.
            self.evaluated += 1;
            return 0;
        }
        match board.phase() {
            Phase::Placing => {
                self.evaluated += 1;
                self.eval_placing(board)
            }
            _ => self.eval_stacking(board, exact),
        }
    }

    /// Placement-phase heuristic: stay close to the Dvonns, hold the rim,
    /// avoid clumping with friendly pieces.
    fn eval_placing(&mut self, board: &Board) -> Val {
        self.refresh_caches(board);
        let geo = geometry();
        let mut score: [Val; 2] = [0, 0];
        let mut edge_pieces: [Val; 2] = [0, 0];

        for n in 0..NUM_FIELDS {
            let f = board.field(Cell::new(n));
            let Some(owner) = f.player else { continue };
            if f.pieces == 0 {
                continue;
            }
            let i = owner.index();

            // Neighbouring fields not occupied by a friendly piece.
            let loose = geo
                .neighbours(n)
                .iter()
                .filter(|&&nb| board.field(Cell(nb)).player != f.player)
                .count() as Val;

            if self.min_dist[n] == 1 {
                score[i] += 10;
            }
            if geo.is_edge(n) {
                edge_pieces[i] += 1;
                score[i] += 2;
            }
            score[i] -= self.tot_dist[n];
            if loose < 2 {
                score[i] -= 5 * (2 - loose);
            }
        }

        // Penalty when one player occupies too few edge fields.
        if edge_pieces[1] - edge_pieces[0] > 3 {
            score[0] -= edge_pieces[1] - edge_pieces[0] - 3;
        }
        if edge_pieces[0] - edge_pieces[1] > 3 {
            score[1] -= edge_pieces[0] - edge_pieces[1] - 3;
        }

        let me = board.next_player().index();
        score[me] - score[1 - me]
    }

    /// Stacking-phase heuristic: one scan accumulating the four weighted
    /// terms for the side to move minus the opponent. Doubles as the
    /// game-over detector.
    fn eval_stacking(&mut self, board: &Board, exact: &mut bool) -> Val {
        self.refresh_caches(board);
        let geo = geometry();
        let me = board.next_player();
        let mut game_over = true;
        let mut stacks: Val = 0;
        let mut score: Val = 0;
        let mut moves: Val = 0;
        let mut to_life: Val = 0;
        let mut to_enemy: Val = 0;

        for n in 0..NUM_FIELDS {
            let f = board.field(Cell::new(n));
            if !f.live() || f.player.is_none() {
                continue;
            }
            let sign: Val = if f.player == Some(me) { 1 } else { -1 };
            stacks += sign * self.field_value[n];
            score += sign * f.pieces as Val;
            for &dst in geo.steps(f.pieces as usize, n) {
                let g = board.field(Cell(dst));
                if !g.live() {
                    continue;
                }
                if f.mobile > 0 {
                    game_over = false;
                    if g.dvonns > 0 {
                        to_life += sign;
                    }
                    if g.player.is_some() && g.player != f.player {
                        to_enemy += sign;
                    }
                }
                moves += sign;
            }
        }

        if game_over {
            *exact = true;
            return VAL_BIG * score;
        }

        self.evaluated += 1;
        stacks
            + moves * self.weights.moves
            + to_life * self.weights.to_life
            + to_enemy * self.weights.to_enemy
    }

    /// Rebuilds the distance and field-value tables when the Dvonn set
    /// has changed since they were last computed.
    fn refresh_caches(&mut self, board: &Board) {
        if self.cache_bits == Some(board.dvonn_bits()) {
            return;
        }
        let geo = geometry();
        self.min_dist = [NUM_FIELDS as Val; NUM_FIELDS];
        self.tot_dist = [0; NUM_FIELDS];

        let mut bits = board.dvonn_bits();
        while bits != 0 {
            let d = bits.trailing_zeros() as usize;
            bits &= bits - 1;
            for n in 0..NUM_FIELDS {
                let dist = geo.distance(d, n);
                self.tot_dist[n] += dist;
                self.min_dist[n] = self.min_dist[n].min(dist);
            }
        }

        for n in 0..NUM_FIELDS {
            self.field_value[n] = match self.wfields {
                Some(w) => {
                    let steps = (w.shift as u64).saturating_mul(self.min_dist[n].max(0) as u64);
                    w.base + if steps < Val::BITS as u64 { w.bonus >> steps } else { 0 }
                }
                None => self.weights.stacks,
            };
        }
        self.cache_bits = Some(board.dvonn_bits());
    }

    /// Sum over all fields of the squared distance to the nearest Dvonn;
    /// the opening heuristic places the second and third Dvonn to keep
    /// this small.
    pub fn dvonn_spread(board: &Board) -> Val {
        let geo = geometry();
        let dvonns: Vec<usize> = (0..NUM_FIELDS)
            .filter(|&n| board.dvonn_bits() & (1 << n) != 0)
            .collect();
        if dvonns.is_empty() {
            return 0;
        }
        (0..NUM_FIELDS)
            .map(|n| {
                let min = dvonns.iter().map(|&d| geo.distance(d, n)).min().unwrap();
                min * min
            })
            .sum()
    }
}
