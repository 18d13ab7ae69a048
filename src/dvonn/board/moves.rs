use crate::dvonn::prelude::*;

use super::geometry::geometry;
use super::zobrist;

impl Board {
    /// Plays a move on this board, if valid.
    pub fn play(&mut self, m: Move) -> Result<Undo> {
        if self.valid_move(m) {
            Ok(self.do_move(m))
        } else {
            Err(anyhow!("move {m} is not valid in this position"))
        }
    }

    /// Applies a move with no validity checks; engine use only.
    ///
    /// Returns the token [`Board::undo_move`] needs to reverse it. The
    /// pair is an exact inverse: after do and undo the board is
    /// bit-identical, hash, mobility and Dvonn mask included.
    pub fn do_move(&mut self, m: Move) -> Undo {
        let undo = match m {
            Move::Place(cell) => {
                self.do_place(cell);
                Undo::default()
            }
            Move::Stack(src, dst) => self.do_stack(src, dst),
            Move::Pass => Undo::default(),
        };
        self.hash ^= zobrist::turn_toggles(self.moves);
        self.moves += 1;
        undo
    }

    /// Reverses a move previously applied with [`Board::do_move`].
    pub fn undo_move(&mut self, m: Move, undo: Undo) {
        self.moves -= 1;
        self.hash ^= zobrist::turn_toggles(self.moves);
        match m {
            Move::Place(cell) => self.undo_place(cell),
            Move::Stack(src, dst) => self.undo_stack(src, dst, undo),
            Move::Pass => {}
        }
    }

    fn do_place(&mut self, cell: Cell) {
        let n = cell.index();
        let dvonn = (self.moves as usize) < NUM_DVONNS;
        let f = &mut self.fields[n];
        f.pieces = 1;
        if dvonn {
            f.dvonns = 1;
        } else {
            f.player = Some(Board::player_at(self.moves));
        }
        if dvonn {
            self.dvonn_bits |= 1 << n;
        }
        self.hash ^= self.cell_key(n);
        self.update_neighbour_mobility(n, -1);
    }

    fn undo_place(&mut self, cell: Cell) {
        let n = cell.index();
        self.hash ^= self.cell_key(n);
        let f = &mut self.fields[n];
        f.player = None;
        f.pieces = 0;
        f.dvonns = 0;
        self.dvonn_bits &= !(1 << n);
        self.update_neighbour_mobility(n, 1);
    }

    fn do_stack(&mut self, src: Cell, dst: Cell) -> Undo {
        let (ns, nd) = (src.index(), dst.index());
        let undo = Undo { dst_player: self.fields[nd].player };

        // A source without Dvonns whose live neighbours hang together
        // cannot disconnect anything, so the sweep is skipped.
        let sweep = self.fields[ns].dvonns > 0
            || geometry().may_be_bridge(self.live_neighbour_mask(ns));

        self.hash ^= self.cell_key(ns) ^ self.cell_key(nd);

        let moved = self.fields[ns];
        {
            let g = &mut self.fields[nd];
            g.player = moved.player;
            g.pieces += moved.pieces;
            g.dvonns += moved.dvonns;
        }
        self.fields[ns].removed = self.moves;
        if moved.dvonns > 0 {
            self.dvonn_bits &= !(1 << ns);
            self.dvonn_bits |= 1 << nd;
        }

        self.hash ^= self.cell_key(nd);
        self.update_neighbour_mobility(ns, 1);

        if sweep {
            self.remove_unreachable();
        }
        undo
    }

    fn undo_stack(&mut self, src: Cell, dst: Cell, undo: Undo) {
        let (ns, nd) = (src.index(), dst.index());
        let moved = self.fields[ns];

        self.hash ^= self.cell_key(nd);
        {
            let g = &mut self.fields[nd];
            g.player = undo.dst_player;
            g.pieces -= moved.pieces;
            g.dvonns -= moved.dvonns;
        }
        if moved.dvonns > 0 {
            self.dvonn_bits |= 1 << ns;
            if self.fields[nd].dvonns == 0 {
                self.dvonn_bits &= !(1 << nd);
            }
        }
        self.hash ^= self.cell_key(nd);

        self.restore_unreachable(ns);
    }

    /// Removes every live field that is no longer connected to a Dvonn.
    /// Fields removed here carry the current move index so the matching
    /// undo can find them again.
    fn remove_unreachable(&mut self) {
        let mut reached: u64 = 0;
        let mut stack = [0u8; NUM_FIELDS];
        let mut top = 0;

        let mut bits = self.dvonn_bits;
        while bits != 0 {
            let seed = bits.trailing_zeros() as usize;
            bits &= bits - 1;
            if reached & (1 << seed) != 0 {
                continue;
            }
            reached |= 1 << seed;
            stack[top] = seed as u8;
            top += 1;
            while top > 0 {
                top -= 1;
                let cur = stack[top] as usize;
                for &nb in geometry().neighbours(cur) {
                    let nb = nb as usize;
                    if self.fields[nb].live() && reached & (1 << nb) == 0 {
                        reached |= 1 << nb;
                        stack[top] = nb as u8;
                        top += 1;
                    }
                }
            }
        }

        for n in 0..NUM_FIELDS {
            if self.fields[n].live() && reached & (1 << n) == 0 {
                self.hash ^= self.cell_key(n);
                self.fields[n].removed = self.moves;
                self.update_neighbour_mobility(n, 1);
            }
        }
    }

    /// Revives the fields removed on the current move, flooding outward
    /// from the move's source. Every swept component borders the source,
    /// so the bounded flood finds all of them.
    fn restore_unreachable(&mut self, start: usize) {
        let marker = self.moves;
        let mut stack = [0u8; NUM_FIELDS];
        let mut top = 0;

        self.fields[start].removed = 0;
        self.hash ^= self.cell_key(start);
        self.update_neighbour_mobility(start, -1);
        stack[top] = start as u8;
        top += 1;

        while top > 0 {
            top -= 1;
            let cur = stack[top] as usize;
            for &nb in geometry().neighbours(cur) {
                let nb = nb as usize;
                if self.fields[nb].removed == marker {
                    self.fields[nb].removed = 0;
                    self.hash ^= self.cell_key(nb);
                    self.update_neighbour_mobility(nb, -1);
                    stack[top] = nb as u8;
                    top += 1;
                }
            }
        }
    }

    /// Adjusts the mobility counters of all six neighbours when field `n`
    /// changes between occupied/live and empty/dead.
    pub(crate) fn update_neighbour_mobility(&mut self, n: usize, diff: i8) {
        for &nb in geometry().neighbours(n) {
            let f = &mut self.fields[nb as usize];
            f.mobile = (f.mobile as i8 + diff) as u8;
        }
    }

    /// 6-bit mask of the directions whose neighbour is currently live.
    fn live_neighbour_mask(&self, n: usize) -> u8 {
        let mut mask = 0;
        for d in 0..6 {
            if let Some(nb) = geometry().neighbour_in_dir(n, d) {
                if self.fields[nb as usize].live() {
                    mask |= 1 << d;
                }
            }
        }
        mask
    }
}

#[cfg(test)]
mod tests {
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use crate::dvonn::board::geometry::geometry;
    use crate::dvonn::prelude::*;
    use crate::dvonn::testkit;

    #[test]
    fn do_undo_is_bit_exact_over_random_games() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..20 {
            let mut board = Board::new();
            while !board.game_over() {
                let Some(m) = testkit::random_move(&mut rng, &board) else { break };
                let before = board.clone();
                let undo = board.do_move(m);
                board.undo_move(m, undo);
                assert_eq!(board, before, "do/undo of {m} is not an inverse");
                board.do_move(m);
            }
        }
    }

    #[test]
    fn board_validates_after_every_step() {
        let mut rng = StdRng::seed_from_u64(11);
        let mut board = Board::new();
        board.validate();
        while !board.game_over() {
            let Some(m) = testkit::random_move(&mut rng, &board) else { break };
            let undo = board.do_move(m);
            board.validate();
            board.undo_move(m, undo);
            board.validate();
            board.do_move(m);
        }
        board.validate();
    }

    #[test]
    fn every_live_field_stays_connected_to_a_dvonn() {
        let mut rng = StdRng::seed_from_u64(23);
        for seed_game in 0..10 {
            let mut board = testkit::random_board(&mut rng, NUM_FIELDS + seed_game);
            while !board.game_over() {
                let Some(m) = testkit::random_move(&mut rng, &board) else { break };
                board.do_move(m);

                // Brute-force reachability from every Dvonn field.
                let mut reached = [false; NUM_FIELDS];
                let mut stack: Vec<usize> = (0..NUM_FIELDS)
                    .filter(|&n| board.field(Cell::new(n)).live()
                        && board.field(Cell::new(n)).dvonns > 0)
                    .collect();
                for &n in &stack {
                    reached[n] = true;
                }
                while let Some(cur) = stack.pop() {
                    for &nb in geometry().neighbours(cur) {
                        let nb = nb as usize;
                        if board.field(Cell::new(nb)).live() && !reached[nb] {
                            reached[nb] = true;
                            stack.push(nb);
                        }
                    }
                }
                for n in 0..NUM_FIELDS {
                    assert!(
                        !board.field(Cell::new(n)).live() || reached[n],
                        "live field {n} is cut off after {m}"
                    );
                }
            }
        }
    }

    #[test]
    fn white_moves_twice_across_the_placement_seam() {
        let mut rng = StdRng::seed_from_u64(3);
        let mut board = Board::new();
        while (board.moves() as usize) < NUM_FIELDS - 1 {
            let m = testkit::random_move(&mut rng, &board).unwrap();
            board.do_move(m);
        }
        assert_eq!(board.next_player(), Player::White);
        let m = testkit::random_move(&mut rng, &board).unwrap();
        assert!(matches!(m, Move::Place(_)));
        board.do_move(m);
        assert_eq!(board.phase(), Phase::Stacking);
        assert_eq!(board.next_player(), Player::White);
    }

    #[test]
    fn play_rejects_illegal_moves() {
        let mut board = Board::new();
        let m = Move::Stack(Cell::new(0), Cell::new(1));
        assert!(board.play(m).is_err());
        assert_eq!(board.moves(), 0);
    }
}
