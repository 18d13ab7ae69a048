use crate::dvonn::prelude::*;

/// Sentinel depth for entries whose value derives from game-over leaves
/// only; such values hold at any depth.
pub(crate) const EXACT_DEPTH: i16 = AI_MAX_DEPTH as i16 + 1;

/// One transposition-table record.
#[derive(Clone, Copy, Debug)]
pub struct TtEntry {
    pub hash: u64,
    /// Fail-soft lower bound on the true value.
    pub lo: Val,
    /// Fail-soft upper bound on the true value.
    pub hi: Val,
    pub depth: i16,
    /// Replacement key: `moves played + 2 * effective depth`. Higher
    /// means the entry describes a later, deeper-searched position.
    pub relevance: i16,
    /// Best move found for this position, if any.
    pub killer: Option<Move>,
}

impl TtEntry {
    fn empty() -> TtEntry {
        TtEntry { hash: 0, lo: VAL_MIN, hi: VAL_MAX, depth: 0, relevance: 0, killer: None }
    }

    fn is_empty(&self) -> bool {
        self.hash == 0 && self.relevance == 0
    }
}

/// Fixed-size transposition table with bounded-relevance replacement.
///
/// Direct-mapped by default; a small linear probe chain can be enabled to
/// trade lookup cost against collisions. Either shape preserves the rule
/// that an equal-or-higher relevance wins.
pub struct TranspositionTable {
    entries: Vec<TtEntry>,
    mask: u64,
    probe_cap: usize,
}

impl TranspositionTable {
    /// Allocates `2^bits` entries, halving on allocation failure down to
    /// a 1024-entry floor. `probe_cap` of zero means direct-mapped.
    pub fn new(bits: u32, probe_cap: usize) -> Result<TranspositionTable> {
        let mut size = 1usize << bits;
        let entries = loop {
            let mut entries: Vec<TtEntry> = Vec::new();
            if entries.try_reserve_exact(size).is_ok() {
                entries.resize(size, TtEntry::empty());
                break entries;
            }
            if size <= 1024 {
                return Err(anyhow!(
                    "failed to allocate {} bytes for the transposition table",
                    size * std::mem::size_of::<TtEntry>()
                ));
            }
            log::warn!("transposition table of {size} entries does not fit, halving");
            size /= 2;
        };
        Ok(TranspositionTable { entries, mask: (size - 1) as u64, probe_cap })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn bucket(&self, hash: u64) -> usize {
        ((hash ^ (hash >> 32)) & self.mask) as usize
    }

    /// The entry stored for this hash, if any. Probing never steps over
    /// an empty slot: an empty slot proves the hash was never stored.
    pub fn lookup(&self, hash: u64) -> Option<&TtEntry> {
        let base = self.bucket(hash);
        for i in 0..=self.probe_cap {
            let entry = &self.entries[(base + i) & self.mask as usize];
            if entry.is_empty() {
                return None;
            }
            if entry.hash == hash {
                return Some(entry);
            }
        }
        None
    }

    /// Considers the outcome of a node search for storage.
    ///
    /// `res` is the fail-soft search result for the window `(alpha,
    /// beta)`: below the window it narrows the upper bound, above it the
    /// lower bound, inside it pins both. Entries of lower relevance than
    /// the incumbent are discarded; a surviving write to a different
    /// position or depth resets the bounds before narrowing.
    #[allow(clippy::too_many_arguments)]
    pub fn update(
        &mut self,
        moves: u16,
        hash: u64,
        depth: i16,
        exact_end: bool,
        alpha: Val,
        beta: Val,
        res: Val,
        best: Option<Move>,
    ) {
        let stored_depth = if exact_end { EXACT_DEPTH } else { depth };
        let effective_depth = if exact_end { EXACT_DEPTH + 1 } else { depth };
        let relevance = moves as i16 + 2 * effective_depth;

        let slot = self.write_slot(hash);
        let entry = &mut self.entries[slot];
        if !entry.is_empty() && relevance < entry.relevance {
            return;
        }
        if entry.hash != hash || entry.depth != stored_depth {
            entry.hash = hash;
            entry.depth = stored_depth;
            entry.lo = VAL_MIN;
            entry.hi = VAL_MAX;
        }
        if res <= alpha {
            entry.hi = entry.hi.min(res);
        } else if res >= beta {
            entry.lo = entry.lo.max(res);
        } else {
            entry.lo = res;
            entry.hi = res;
        }
        if best.is_some() {
            entry.killer = best;
        }
        entry.relevance = relevance;
    }

    /// Picks the slot a write for this hash goes to: the entry already
    /// holding the hash, else the first empty slot, else the least
    /// relevant entry of the probe chain.
    fn write_slot(&self, hash: u64) -> usize {
        let base = self.bucket(hash);
        let mut victim = base;
        for i in 0..=self.probe_cap {
            let idx = (base + i) & self.mask as usize;
            let entry = &self.entries[idx];
            if entry.is_empty() || entry.hash == hash {
                return idx;
            }
            if entry.relevance < self.entries[victim].relevance {
                victim = idx;
            }
        }
        victim
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stack(a: usize, b: usize) -> Option<Move> {
        Some(Move::Stack(Cell::new(a), Cell::new(b)))
    }

    #[test]
    fn stores_and_finds_an_entry() {
        let mut tt = TranspositionTable::new(10, 0).unwrap();
        tt.update(60, 0xABCD, 3, false, VAL_MIN, VAL_MAX, 17, stack(0, 1));
        let e = tt.lookup(0xABCD).unwrap();
        assert_eq!((e.lo, e.hi), (17, 17));
        assert_eq!(e.depth, 3);
        assert_eq!(e.killer, stack(0, 1));
        assert!(tt.lookup(0xDCBA).is_none());
    }

    #[test]
    fn fail_soft_results_narrow_one_bound() {
        let mut tt = TranspositionTable::new(10, 0).unwrap();
        // Result at or below alpha: an upper bound.
        tt.update(60, 1, 2, false, 10, 20, 5, None);
        let e = tt.lookup(1).unwrap();
        assert_eq!((e.lo, e.hi), (VAL_MIN, 5));
        // Same position and depth again, now failing high: a lower bound.
        tt.update(60, 1, 2, false, 10, 20, 25, stack(2, 3));
        let e = tt.lookup(1).unwrap();
        assert_eq!(e.lo, 25);
        assert_eq!(e.hi, 5);
        assert_eq!(e.killer, stack(2, 3));
    }

    #[test]
    fn lower_relevance_updates_are_discarded() {
        let mut tt = TranspositionTable::new(10, 0).unwrap();
        tt.update(80, 7, 6, false, VAL_MIN, VAL_MAX, 42, stack(4, 5));
        // Earlier position, shallower depth: must not replace.
        tt.update(50, 7, 2, false, VAL_MIN, VAL_MAX, -3, stack(6, 7));
        let e = tt.lookup(7).unwrap();
        assert_eq!(e.lo, 42);
        assert_eq!(e.killer, stack(4, 5));
    }

    #[test]
    fn different_depth_resets_the_bounds() {
        let mut tt = TranspositionTable::new(10, 0).unwrap();
        tt.update(60, 9, 2, false, 0, 10, 4, None);
        tt.update(62, 9, 4, false, 0, 10, 15, None);
        let e = tt.lookup(9).unwrap();
        assert_eq!(e.depth, 4);
        assert_eq!((e.lo, e.hi), (15, VAL_MAX));
    }

    #[test]
    fn exact_endgame_entries_outrank_everything() {
        let mut tt = TranspositionTable::new(10, 0).unwrap();
        tt.update(60, 11, 2, true, VAL_MIN, VAL_MAX, 3 * VAL_BIG, None);
        let e = tt.lookup(11).unwrap();
        assert_eq!(e.depth, EXACT_DEPTH);
        // A deep heuristic result later in the game still loses.
        tt.update(100, 11, AI_MAX_DEPTH as i16, false, VAL_MIN, VAL_MAX, 1, None);
        let e = tt.lookup(11).unwrap();
        assert_eq!(e.lo, 3 * VAL_BIG);
    }

    #[test]
    fn probing_finds_colliding_hashes() {
        let mut tt = TranspositionTable::new(10, 4).unwrap();
        // Two hashes with the same bucket index.
        let (a, b) = (0x1_0000_0001u64, 0x2_0000_0002u64);
        tt.update(60, a, 3, false, VAL_MIN, VAL_MAX, 1, None);
        tt.update(60, b, 3, false, VAL_MIN, VAL_MAX, 2, None);
        assert_eq!(tt.lookup(a).unwrap().lo, 1);
        assert_eq!(tt.lookup(b).unwrap().lo, 2);
    }
}
