use std::fmt;

use crate::dvonn::board::geometry::geometry;
use crate::dvonn::prelude::*;

/// Base-62 alphabet of the state string; note that `A` encodes zero.
const DIGITS: &[u8; 62] =
    b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", (b'A' + self.col()) as char, (b'1' + self.row()) as char)
    }
}

impl std::str::FromStr for Cell {
    type Err = Error;
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let bytes = s.as_bytes();
        if bytes.len() != 2
            || !(b'A'..=b'K').contains(&bytes[0])
            || !(b'1'..=b'5').contains(&bytes[1])
        {
            return Err(anyhow!("expected a coordinate like F3, received {s}"));
        }
        let (row, col) = ((bytes[1] - b'1') as usize, (bytes[0] - b'A') as usize);
        geometry()
            .index_of(row, col)
            .map(Cell)
            .ok_or_else(|| anyhow!("coordinate {s} lies outside the board"))
    }
}

impl fmt::Display for Move {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Move::Pass => write!(f, "PASS"),
            Move::Place(cell) => write!(f, "{cell}"),
            Move::Stack(src, dst) => write!(f, "{src}{dst}"),
        }
    }
}

impl std::str::FromStr for Move {
    type Err = Error;
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.len() {
            4 if s == "PASS" => Ok(Move::Pass),
            2 => Ok(Move::Place(s.parse()?)),
            4 => Ok(Move::Stack(s[..2].parse()?, s[2..].parse()?)),
            _ => Err(anyhow!("could not parse move {s}")),
        }
    }
}

impl Board {
    /// The 50-character state string: one phase/side digit followed by
    /// the fields in row-major order. Stacks above height 15 fall outside
    /// the encoding and come out as `*` (irreversibly).
    pub fn notate(&self) -> String {
        let mut out = String::with_capacity(NUM_FIELDS + 1);
        let header = if (self.moves as usize) < NUM_FIELDS {
            self.moves % 2
        } else {
            2 + (self.moves - NUM_FIELDS as u16) % 2
        };
        out.push(DIGITS[header as usize] as char);
        for n in 0..NUM_FIELDS {
            let f = self.field(Cell::new(n));
            out.push(if f.pieces > 15 {
                '*'
            } else if !f.live() || f.pieces == 0 {
                DIGITS[0] as char
            } else if f.player.is_none() {
                DIGITS[1] as char
            } else {
                let digit = 4 * f.pieces as usize
                    + if f.dvonns > 0 { 2 } else { 0 }
                    + f.player.unwrap().index()
                    - 2;
                DIGITS[digit] as char
            });
        }
        out
    }
}

/// A parsed state descriptor: the reconstructed board plus the side to
/// move, `None` when the described game is already finished.
#[derive(Clone, Debug)]
pub struct StateString {
    pub repr: String,
    pub board: Board,
    pub next_player: Option<Player>,
}

impl std::str::FromStr for StateString {
    type Err = Error;
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        if s.len() != NUM_FIELDS + 1 {
            return Err(anyhow!(
                "expected a {}-character state string, received {} characters",
                NUM_FIELDS + 1,
                s.len()
            ));
        }
        let mut vals = [0usize; NUM_FIELDS + 1];
        for (i, ch) in s.bytes().enumerate() {
            vals[i] = DIGITS
                .iter()
                .position(|&d| d == ch)
                .ok_or_else(|| anyhow!("invalid digit {} in state string", ch as char))?;
        }

        let mut board = Board::new();

        // The leading digit fixes the phase and the side to move.
        let mut next_player = Some(Player::from((vals[0] % 2) as u8));
        match vals[0] / 2 % 3 {
            0 => {}
            1 => board.moves = NUM_FIELDS as u16,
            _ => {
                next_player = None;
                board.moves = NUM_FIELDS as u16;
            }
        }

        // The field digits rebuild the stacks; the move counter is
        // reconstructed from the number of occupied (placing) or removed
        // (stacking) fields.
        for n in 0..NUM_FIELDS {
            let v = vals[n + 1];
            let f = &mut board.fields[n];
            if v == 0 {
                if board.moves as usize >= NUM_FIELDS {
                    f.removed = NUM_FIELDS as u16;
                    f.pieces = 1;
                    f.player = Some(Player::White);
                    board.moves += 1;
                }
            } else {
                if v == 1 {
                    f.dvonns = 1;
                    f.pieces = 1;
                } else {
                    f.player = Some(Player::from(((v + 2) % 2) as u8));
                    f.dvonns = ((v + 2) / 2 % 2) as u8;
                    f.pieces = ((v + 2) / 4) as u8;
                }
                if (board.moves as usize) < NUM_FIELDS {
                    board.moves += 1;
                }
            }
            if board.fields[n].dvonns > 0 {
                board.dvonn_bits |= 1 << n;
            }
            if v != 0 {
                board.update_neighbour_mobility(n, -1);
            }
        }

        // The disconnection rule may have removed an odd number of stacks,
        // in which case the reconstructed move counter is off by one.
        if let Some(player) = next_player {
            if board.next_player() != player {
                if (board.moves as usize) < NUM_FIELDS + 2 {
                    return Err(anyhow!("inconsistent side to move in state string"));
                }
                board.moves -= 1;
            }
        }

        board.hash = board.zobrist_from_scratch();
        Ok(StateString { repr: s.to_owned(), board, next_player })
    }
}

#[cfg(test)]
mod tests {
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use crate::dvonn::prelude::*;
    use crate::dvonn::testkit;

    #[test]
    fn center_cell_is_f3() {
        let cell: Cell = "F3".parse().unwrap();
        assert_eq!(cell.row(), 2);
        assert_eq!(cell.col(), 5);
        assert_eq!(cell.to_string(), "F3");
    }

    #[test]
    fn corner_coordinates_outside_the_footprint_are_rejected() {
        for s in ["J1", "K1", "A4", "B5", "K9", "F6", "", "f3"] {
            assert!(s.parse::<Cell>().is_err(), "{s} should not parse");
        }
    }

    #[test]
    fn moves_round_trip_through_notation() {
        let mut rng = StdRng::seed_from_u64(29);
        let mut board = Board::new();
        while !board.game_over() {
            let Some(m) = testkit::random_move(&mut rng, &board) else { break };
            let text = m.to_string();
            assert_eq!(text.parse::<Move>().unwrap(), m);
            board.do_move(m);
        }
        assert_eq!("PASS".parse::<Move>().unwrap(), Move::Pass);
    }

    #[test]
    fn state_strings_round_trip() {
        let mut rng = StdRng::seed_from_u64(31);
        for plies in [0, 1, 10, NUM_FIELDS, NUM_FIELDS + 9, NUM_FIELDS + 40] {
            let board = testkit::random_board(&mut rng, plies);
            let text = board.notate();
            assert_eq!(text.len(), NUM_FIELDS + 1);
            if text.contains('*') {
                continue; // towers above height 15 do not round-trip
            }
            let state: StateString = text.parse().unwrap();
            state.board.validate();
            assert_eq!(state.board.notate(), text);
            if !board.game_over() {
                assert_eq!(state.next_player, Some(board.next_player()));
            }
        }
    }

    #[test]
    fn malformed_state_strings_are_rejected() {
        assert!("".parse::<StateString>().is_err());
        assert!("*".repeat(NUM_FIELDS + 1).parse::<StateString>().is_err());
        assert!("A".repeat(NUM_FIELDS).parse::<StateString>().is_err());
    }
}
