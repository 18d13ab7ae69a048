use crate::dvonn::prelude::*;

use super::geometry::geometry;

impl Board {
    /// Pretty-prints the board as five staggered rows, one token per
    /// field: `.` empty, `x` removed, `D` a neutral Dvonn stack, or the
    /// stack height followed by the owner's letter (with `*` marking a
    /// Dvonn buried inside).
    pub fn pretty(&self) -> String {
        let geo = geometry();
        let mut rows = vec![String::new(); BOARD_HEIGHT];
        for (r, row) in rows.iter_mut().enumerate() {
            // Stagger so that hexagonal neighbours line up diagonally.
            row.push_str(&" ".repeat(2 * (BOARD_HEIGHT - 1 - r)));
            for c in 0..BOARD_WIDTH {
                let Some(n) = geo.index_of(r, c) else { continue };
                let f = self.field(Cell(n));
                let token = if !f.live() {
                    "  x ".into()
                } else if f.pieces == 0 {
                    "  . ".into()
                } else if f.player.is_none() {
                    "  D ".into()
                } else {
                    format!(
                        "{:>3}{}",
                        format!("{}{}", f.pieces, if f.dvonns > 0 { "*" } else { "" }),
                        f.player.unwrap().notate().to_lowercase()
                    )
                };
                row.push_str(&token);
            }
        }
        rows.join("\n")
    }
}

#[cfg(test)]
mod tests {
    use crate::dvonn::prelude::*;

    #[test]
    fn pretty_marks_each_kind_of_field() {
        let mut board = Board::new();
        board.do_move(Move::Place("F3".parse().unwrap()));
        let text = board.pretty();
        assert_eq!(text.lines().count(), BOARD_HEIGHT);
        assert!(text.contains('D'));
        assert!(text.contains('.'));
    }
}
