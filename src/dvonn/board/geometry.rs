use std::sync::OnceLock;

use crate::dvonn::prelude::*;

/// Row offsets for the six hexagonal directions.
pub(crate) const DIR_ROW: [i32; 6] = [-1, -1, 0, 0, 1, 1];
/// Column offsets for the six hexagonal directions.
pub(crate) const DIR_COL: [i32; 6] = [-1, 0, -1, 1, 0, 1];

/// Mask value of a field whose six neighbours all exist.
pub(crate) const FULL_NEIGHBOUR_MASK: u8 = (1 << 6) - 1;

static GEOMETRY: OnceLock<Geometry> = OnceLock::new();

/// Precomputed board geometry: the embedding of the 49-field hex footprint
/// in the bounding grid, adjacency in each direction, and the step tables
/// used by the move generator.
///
/// Everything here is a pure function of the board shape, so it is built
/// exactly once and shared for the lifetime of the process.
pub(crate) struct Geometry {
    row: [u8; NUM_FIELDS],
    col: [u8; NUM_FIELDS],
    index: [[i8; BOARD_WIDTH]; BOARD_HEIGHT],
    neighbour_mask: [u8; NUM_FIELDS],
    neighbour_dirs: [[i8; 6]; NUM_FIELDS],
    neighbours: Vec<Vec<u8>>,
    steps: Vec<Vec<Vec<u8>>>,
    may_be_bridge: [bool; 64],
}

/// Distance between two grid positions under the hexagonal metric.
pub(crate) fn hex_distance(r1: i32, c1: i32, r2: i32, c2: i32) -> i32 {
    let dx = c2 - c1;
    let dy = r2 - r1;
    let dz = dx - dy;
    dx.abs().max(dy.abs()).max(dz.abs())
}

/// Whether a grid position lies inside the hex footprint.
fn in_footprint(r: i32, c: i32) -> bool {
    r >= 0
        && r < BOARD_HEIGHT as i32
        && c >= 0
        && c < BOARD_WIDTH as i32
        && hex_distance(r, c, BOARD_HEIGHT as i32 / 2, BOARD_WIDTH as i32 / 2)
            <= BOARD_WIDTH as i32 / 2
}

/// Number of adjacency components among the set directions of a
/// live-neighbour mask. Two directions are connected when the neighbour
/// fields they denote are themselves hex-adjacent.
fn neighbour_components(mask: u8) -> usize {
    let dirs: Vec<usize> = (0..6).filter(|d| mask & (1 << d) != 0).collect();
    let mut seen = [false; 6];
    let mut components = 0;
    for &start in &dirs {
        if seen[start] {
            continue;
        }
        components += 1;
        let mut stack = vec![start];
        seen[start] = true;
        while let Some(a) = stack.pop() {
            for &b in &dirs {
                if !seen[b]
                    && hex_distance(DIR_ROW[a], DIR_COL[a], DIR_ROW[b], DIR_COL[b]) == 1
                {
                    seen[b] = true;
                    stack.push(b);
                }
            }
        }
    }
    components
}

impl Geometry {
    fn build() -> Geometry {
        let mut row = [0u8; NUM_FIELDS];
        let mut col = [0u8; NUM_FIELDS];
        let mut index = [[-1i8; BOARD_WIDTH]; BOARD_HEIGHT];

        let mut n = 0;
        for r in 0..BOARD_HEIGHT {
            for c in 0..BOARD_WIDTH {
                if in_footprint(r as i32, c as i32) {
                    row[n] = r as u8;
                    col[n] = c as u8;
                    index[r][c] = n as i8;
                    n += 1;
                }
            }
        }
        assert_eq!(n, NUM_FIELDS);

        let at = |r: i32, c: i32| -> i8 {
            if in_footprint(r, c) {
                index[r as usize][c as usize]
            } else {
                -1
            }
        };

        let mut neighbour_mask = [0u8; NUM_FIELDS];
        let mut neighbour_dirs = [[-1i8; 6]; NUM_FIELDS];
        let mut neighbours = vec![Vec::new(); NUM_FIELDS];
        for n in 0..NUM_FIELDS {
            for d in 0..6 {
                let m = at(row[n] as i32 + DIR_ROW[d], col[n] as i32 + DIR_COL[d]);
                if m >= 0 {
                    neighbour_mask[n] |= 1 << d;
                    neighbour_dirs[n][d] = m;
                    neighbours[n].push(m as u8);
                }
            }
        }

        // steps[k][n] lists the fields exactly k hexagonal steps from n in
        // one of the six directions, pre-filtered to the footprint so the
        // move generator never bounds-checks.
        let mut steps = vec![vec![Vec::new(); NUM_FIELDS]; NUM_FIELDS + 1];
        for k in 1..=NUM_FIELDS {
            for n in 0..NUM_FIELDS {
                for d in 0..6 {
                    let m = at(
                        row[n] as i32 + k as i32 * DIR_ROW[d],
                        col[n] as i32 + k as i32 * DIR_COL[d],
                    );
                    if m >= 0 {
                        steps[k][n].push(m as u8);
                    }
                }
            }
        }

        // A field whose live neighbours fall apart into two or more
        // adjacency components may be the only connection between them.
        let mut may_be_bridge = [false; 64];
        for (mask, slot) in may_be_bridge.iter_mut().enumerate() {
            *slot = neighbour_components(mask as u8) >= 2;
        }

        Geometry {
            row,
            col,
            index,
            neighbour_mask,
            neighbour_dirs,
            neighbours,
            steps,
            may_be_bridge,
        }
    }

    pub fn row(&self, n: usize) -> u8 {
        self.row[n]
    }

    pub fn col(&self, n: usize) -> u8 {
        self.col[n]
    }

    /// Field index of a grid position, if it is on the board.
    pub fn index_of(&self, r: usize, c: usize) -> Option<u8> {
        if r < BOARD_HEIGHT && c < BOARD_WIDTH && self.index[r][c] >= 0 {
            Some(self.index[r][c] as u8)
        } else {
            None
        }
    }

    /// The existing neighbours of a field.
    pub fn neighbours(&self, n: usize) -> &[u8] {
        &self.neighbours[n]
    }

    /// 6-bit mask of the directions in which a neighbour exists.
    pub fn neighbour_mask(&self, n: usize) -> u8 {
        self.neighbour_mask[n]
    }

    /// The neighbour of a field in one direction, if it exists.
    pub fn neighbour_in_dir(&self, n: usize, d: usize) -> Option<u8> {
        let m = self.neighbour_dirs[n][d];
        (m >= 0).then_some(m as u8)
    }

    /// Destinations reachable by moving a stack of the given height.
    pub fn steps(&self, height: usize, n: usize) -> &[u8] {
        &self.steps[height][n]
    }

    /// Whether the field sits on the rim of the board.
    pub fn is_edge(&self, n: usize) -> bool {
        self.neighbour_mask[n] != FULL_NEIGHBOUR_MASK
    }

    /// Hexagonal distance between two fields.
    pub fn distance(&self, a: usize, b: usize) -> i32 {
        hex_distance(
            self.row[a] as i32,
            self.col[a] as i32,
            self.row[b] as i32,
            self.col[b] as i32,
        )
    }

    /// Whether removing a field with this live-neighbour mask can
    /// disconnect part of the board.
    pub fn may_be_bridge(&self, mask: u8) -> bool {
        self.may_be_bridge[mask as usize]
    }
}

/// The process-wide geometry tables.
pub(crate) fn geometry() -> &'static Geometry {
    GEOMETRY.get_or_init(Geometry::build)
}
