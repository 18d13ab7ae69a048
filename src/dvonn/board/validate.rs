use crate::dvonn::prelude::*;

use super::geometry::geometry;

impl Board {
    /// Asserts every structural invariant of the position. Called from
    /// debug paths and tests; the mutators themselves stay assertion-free
    /// on the hot path.
    pub fn validate(&self) {
        let placing = self.phase() == Phase::Placing;

        for (n, f) in self.fields.iter().enumerate() {
            assert!(f.pieces as usize <= NUM_FIELDS, "field {n}: piece count overflow");
            assert!(f.dvonns as usize <= NUM_DVONNS, "field {n}: dvonn count overflow");
            assert!(f.dvonns <= f.pieces, "field {n}: more dvonns than pieces");
            if f.dvonns == f.pieces {
                assert!(f.player.is_none(), "field {n}: neutral stack with an owner");
            } else {
                assert!(f.player.is_some(), "field {n}: owned stack without an owner");
            }
            if placing {
                assert!(f.pieces <= 1, "field {n}: stack during placement");
                assert_eq!(f.removed, 0, "field {n}: removal during placement");
            } else {
                assert!(f.pieces >= 1, "field {n}: empty field during stacking");
                assert!(f.removed < self.moves, "field {n}: removed in the future");
            }

            // Mobility counts unoccupied (placing) or dead (stacking)
            // directions, off-board directions included.
            let blocked = geometry()
                .neighbours(n)
                .iter()
                .filter(|&&nb| {
                    let g = &self.fields[nb as usize];
                    if placing { g.pieces > 0 } else { g.live() }
                })
                .count();
            assert_eq!(
                f.mobile as usize + blocked,
                6,
                "field {n}: mobility counter out of sync"
            );

            let expect_bit = f.live() && f.dvonns > 0;
            assert_eq!(
                self.dvonn_bits & (1 << n) != 0,
                expect_bit,
                "field {n}: dvonn mask out of sync"
            );
        }

        assert_eq!(self.hash, self.zobrist_from_scratch(), "hash out of sync");
    }
}
