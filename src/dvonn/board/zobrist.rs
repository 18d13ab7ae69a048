use std::hash::{DefaultHasher, Hasher};
use std::sync::OnceLock;

use crate::dvonn::prelude::*;

/// Number of distinct observable stack contents per field:
/// `4 * pieces + 2 * (player is Black) + (stack holds a Dvonn)`.
const NUM_CODES: usize = 4 * NUM_FIELDS + 4;

const FNV64_OFFSET_BASIS: u64 = 14695981039346656037;
const FNV64_PRIME: u64 = 1099511628211;

/// Independent 64-bit keys for every hashable feature of a position.
struct ZobristKeys {
    init: u64,
    side: u64,
    phase: u64,
    cells: Vec<u64>,
}

static KEYS: OnceLock<ZobristKeys> = OnceLock::new();

fn keys() -> &'static ZobristKeys {
    KEYS.get_or_init(|| {
        let mut hasher = DefaultHasher::new();
        let mut next = |i: usize| {
            hasher.write_usize(i);
            hasher.finish()
        };
        let init = next(0);
        let side = next(1);
        let phase = next(2);
        let cells = (0..NUM_FIELDS * NUM_CODES).map(|i| next(3 + i)).collect();
        ZobristKeys { init, side, phase, cells }
    })
}

/// Hash difference caused by advancing the move counter by one:
/// the side-to-move toggle whenever the turn flips (it does not at the
/// placement/stacking seam) and the phase toggle when crossing it.
pub(crate) fn turn_toggles(moves_before: u16) -> u64 {
    let k = keys();
    let mut delta = 0;
    if Board::player_at(moves_before) != Board::player_at(moves_before + 1) {
        delta ^= k.side;
    }
    if moves_before as usize + 1 == NUM_FIELDS {
        delta ^= k.phase;
    }
    delta
}

impl Board {
    /// Code uniquely identifying the observable content of a field.
    pub(crate) fn cell_code(f: &Field) -> usize {
        4 * f.pieces as usize
            + 2 * (f.player == Some(Player::Black)) as usize
            + (f.dvonns > 0) as usize
    }

    /// The Zobrist key of one field's current content; zero while the
    /// field is empty or dead, so removed fields drop out of the hash.
    pub(crate) fn cell_key(&self, n: usize) -> u64 {
        let f = &self.fields[n];
        if !f.live() || f.pieces == 0 {
            0
        } else {
            keys().cells[n * NUM_CODES + Board::cell_code(f)]
        }
    }

    /// Recomputes the hash from nothing; the incremental value must
    /// always match this.
    pub fn zobrist_from_scratch(&self) -> u64 {
        let k = keys();
        let mut hash = k.init;
        if self.next_player() == Player::Black {
            hash ^= k.side;
        }
        if self.phase() != Phase::Placing {
            hash ^= k.phase;
        }
        for n in 0..NUM_FIELDS {
            hash ^= self.cell_key(n);
        }
        hash
    }

    /// Serializes the position into its canonical 50-byte descriptor.
    pub fn serialize(&self) -> [u8; NUM_FIELDS + 1] {
        let mut out = [0u8; NUM_FIELDS + 1];
        let phase_bit: u8 = if (self.moves as usize) < NUM_FIELDS { 0 } else { 2 };
        out[0] = phase_bit + (self.moves % 2) as u8;
        for (n, f) in self.fields.iter().enumerate() {
            out[n + 1] = if f.live() && f.pieces > 0 {
                Board::cell_code(f) as u8
            } else {
                0
            };
        }
        out
    }

    /// FNV-1 hash of the canonical descriptor. Strictly slower than the
    /// incremental hash; kept for debugging and collision checks.
    pub fn fnv1_hash(&self) -> u64 {
        let mut res = FNV64_OFFSET_BASIS;
        for byte in self.serialize() {
            res = res.wrapping_mul(FNV64_PRIME);
            res ^= byte as u64;
        }
        res
    }
}

#[cfg(test)]
mod tests {
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use crate::dvonn::prelude::*;
    use crate::dvonn::testkit;

    #[test]
    fn incremental_hash_matches_recomputation() {
        let mut rng = StdRng::seed_from_u64(2);
        for _ in 0..10 {
            let mut board = Board::new();
            while !board.game_over() {
                let Some(m) = testkit::random_move(&mut rng, &board) else { break };
                let undo = board.do_move(m);
                assert_eq!(board.hash(), board.zobrist_from_scratch());
                board.undo_move(m, undo);
                assert_eq!(board.hash(), board.zobrist_from_scratch());
                board.do_move(m);
            }
        }
    }

    #[test]
    fn transposed_placements_hash_identically() {
        let (a, b) = (Cell::new(10), Cell::new(30));
        let mut first = Board::new();
        first.do_move(Move::Place(a));
        first.do_move(Move::Place(b));
        let mut second = Board::new();
        second.do_move(Move::Place(b));
        second.do_move(Move::Place(a));
        assert_eq!(first.hash(), second.hash());
        assert_eq!(first.fnv1_hash(), second.fnv1_hash());
    }

    #[test]
    fn fnv_distinguishes_successive_positions() {
        let mut rng = StdRng::seed_from_u64(13);
        let mut board = Board::new();
        let mut seen = std::collections::HashSet::new();
        for _ in 0..NUM_FIELDS {
            assert!(seen.insert(board.fnv1_hash()));
            let Some(m) = testkit::random_move(&mut rng, &board) else { break };
            board.do_move(m);
        }
    }

    #[test]
    fn serialization_is_fifty_bytes_with_phase_header() {
        let mut rng = StdRng::seed_from_u64(19);
        let board = testkit::random_board(&mut rng, NUM_FIELDS + 4);
        let data = board.serialize();
        assert_eq!(data.len(), 50);
        assert!(data[0] >= 2, "stacking-phase header must carry the phase bit");
    }
}
