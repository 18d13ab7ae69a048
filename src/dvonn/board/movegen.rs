use crate::dvonn::prelude::*;

use super::geometry::geometry;

impl Board {
    /// Enumerates the legal placements: every empty live field.
    pub fn generate_places(&self, out: &mut Vec<Move>) {
        for (n, f) in self.fields.iter().enumerate() {
            if f.pieces == 0 && f.live() {
                out.push(Move::Place(Cell::new(n)));
            }
        }
    }

    /// Enumerates the legal stacking moves for one player: from every
    /// mobile stack they control, exactly `pieces` steps onto a live
    /// stack. The step table makes this constant work per move.
    pub fn generate_stacks(&self, player: Player, out: &mut Vec<Move>) {
        let geo = geometry();
        for (n, f) in self.fields.iter().enumerate() {
            if f.live() && f.mobile > 0 && f.player == Some(player) {
                for &dst in geo.steps(f.pieces as usize, n) {
                    if self.fields[dst as usize].live() {
                        out.push(Move::Stack(Cell::new(n), Cell(dst)));
                    }
                }
            }
        }
    }

    /// Enumerates the legal moves for the player to move. During the
    /// stacking phase a single pass is emitted when the player is stuck.
    pub fn generate_moves(&self, out: &mut Vec<Move>) {
        match self.phase() {
            Phase::Placing => self.generate_places(out),
            _ => {
                let before = out.len();
                self.generate_stacks(self.next_player(), out);
                if out.len() == before {
                    out.push(Move::Pass);
                }
            }
        }
    }

    /// Enumerates the stacking moves of both players, passes excluded.
    pub fn generate_all_moves(&self, out: &mut Vec<Move>) {
        self.generate_stacks(Player::White, out);
        self.generate_stacks(Player::Black, out);
    }

    /// Convenience wrapper over [`Board::generate_moves`].
    pub fn legal_moves(&self) -> Vec<Move> {
        let mut out = Vec::with_capacity(MAX_MOVES);
        self.generate_moves(&mut out);
        out
    }

    /// Whether the move is legal in the current position.
    pub fn valid_move(&self, m: Move) -> bool {
        self.legal_moves().contains(&m)
    }

    /// Whether the player has at least one stacking move.
    pub(crate) fn has_stack_move(&self, player: Player) -> bool {
        let geo = geometry();
        for (n, f) in self.fields.iter().enumerate() {
            if f.live() && f.mobile > 0 && f.player == Some(player) {
                for &dst in geo.steps(f.pieces as usize, n) {
                    if self.fields[dst as usize].live() {
                        return true;
                    }
                }
            }
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use crate::dvonn::prelude::*;
    use crate::dvonn::testkit;

    #[test]
    fn empty_board_has_a_placement_per_field() {
        let board = Board::new();
        let moves = board.legal_moves();
        assert_eq!(moves.len(), NUM_FIELDS);
        assert!(moves.iter().all(|m| matches!(m, Move::Place(_))));
    }

    #[test]
    fn all_moves_is_the_union_of_both_players_stacks() {
        let mut rng = StdRng::seed_from_u64(41);
        for extra in [0, 5, 20, 60] {
            let board = testkit::random_board(&mut rng, NUM_FIELDS + extra);
            if board.phase() != Phase::Stacking {
                continue;
            }
            let mut all = Vec::new();
            board.generate_all_moves(&mut all);
            let mut white = Vec::new();
            let mut black = Vec::new();
            board.generate_stacks(Player::White, &mut white);
            board.generate_stacks(Player::Black, &mut black);
            assert_eq!(all.len(), white.len() + black.len());
            assert!(white.iter().chain(black.iter()).all(|m| all.contains(m)));
        }
    }

    #[test]
    fn pass_is_emitted_exactly_when_stuck() {
        let mut rng = StdRng::seed_from_u64(5);
        let mut passes_seen = 0;
        for _ in 0..30 {
            let mut board = Board::new();
            while !board.game_over() {
                let moves = board.legal_moves();
                if moves == vec![Move::Pass] {
                    passes_seen += 1;
                    assert!(!board.has_stack_move(board.next_player()));
                } else {
                    assert!(!moves.contains(&Move::Pass));
                }
                let Some(m) = testkit::random_move(&mut rng, &board) else { break };
                board.do_move(m);
            }
        }
        assert!(passes_seen > 0, "random games never produced a stuck player");
    }

    #[test]
    fn stack_moves_span_exactly_the_stack_height() {
        let mut rng = StdRng::seed_from_u64(17);
        let board = testkit::random_board(&mut rng, NUM_FIELDS + 12);
        for m in board.legal_moves() {
            if let Move::Stack(src, dst) = m {
                let f = board.field(src);
                assert!(f.mobile > 0);
                assert_eq!(
                    super::geometry().distance(src.index(), dst.index()),
                    f.pieces as i32
                );
                assert!(board.field(dst).live());
            }
        }
    }
}
