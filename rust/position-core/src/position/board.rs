// rust/position-core/src/position/board.rs

//! Canonical enumeration of sides, piece kinds and squares.
//!
//! The order of every `ALL` array here is part of the feature layout: the
//! encoder walks them in declaration order, so reordering a variant changes
//! the meaning of every encoded vector. Bump `LAYOUT_VERSION` if that ever
//! happens.

use std::fmt;

/// Version of the side/piece/square ordering used by the encoder.
pub const LAYOUT_VERSION: u32 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Color {
    White,
    Black,
}

impl Color {
    pub const ALL: [Color; 2] = [Color::White, Color::Black];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn opposite(self) -> Color {
        match self {
            Color::White => Color::Black,
            Color::Black => Color::White,
        }
    }

    /// Rank (0-based) holding this side's king and rooks at the start.
    pub fn back_rank(self) -> u8 {
        match self {
            Color::White => 0,
            Color::Black => 7,
        }
    }

    /// Short prefix used in canonical column names.
    pub fn prefix(self) -> &'static str {
        match self {
            Color::White => "w",
            Color::Black => "b",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PieceKind {
    Pawn,
    Knight,
    Bishop,
    Rook,
    Queen,
    King,
}

impl PieceKind {
    pub const ALL: [PieceKind; 6] = [
        PieceKind::Pawn,
        PieceKind::Knight,
        PieceKind::Bishop,
        PieceKind::Rook,
        PieceKind::Queen,
        PieceKind::King,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn name(self) -> &'static str {
        match self {
            PieceKind::Pawn => "pawn",
            PieceKind::Knight => "knight",
            PieceKind::Bishop => "bishop",
            PieceKind::Rook => "rook",
            PieceKind::Queen => "queen",
            PieceKind::King => "king",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Piece {
    pub color: Color,
    pub kind: PieceKind,
}

impl Piece {
    pub fn new(color: Color, kind: PieceKind) -> Self {
        Self { color, kind }
    }

    /// Parses a FEN piece letter; uppercase is White.
    pub fn from_fen_char(c: char) -> Option<Piece> {
        let kind = match c.to_ascii_lowercase() {
            'p' => PieceKind::Pawn,
            'n' => PieceKind::Knight,
            'b' => PieceKind::Bishop,
            'r' => PieceKind::Rook,
            'q' => PieceKind::Queen,
            'k' => PieceKind::King,
            _ => return None,
        };
        let color = if c.is_ascii_uppercase() {
            Color::White
        } else {
            Color::Black
        };
        Some(Piece { color, kind })
    }
}

/// A board square, `0 = a1`, `1 = b1`, …, `63 = h8`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Square(u8);

impl Square {
    pub const COUNT: usize = 64;

    /// Builds a square from 0-based file and rank.
    pub fn new(file: u8, rank: u8) -> Square {
        debug_assert!(file < 8 && rank < 8);
        Square(rank * 8 + file)
    }

    /// Square from 0-based file and rank given as signed offsets, or `None`
    /// when off the board.
    pub fn try_new(file: i8, rank: i8) -> Option<Square> {
        if (0..8).contains(&file) && (0..8).contains(&rank) {
            Some(Square::new(file as u8, rank as u8))
        } else {
            None
        }
    }

    pub fn from_index(index: usize) -> Option<Square> {
        (index < Self::COUNT).then(|| Square(index as u8))
    }

    /// Parses algebraic notation such as `e3`.
    pub fn from_name(name: &str) -> Option<Square> {
        let mut chars = name.chars();
        let file = chars.next()?;
        let rank = chars.next()?;
        if chars.next().is_some() || !('a'..='h').contains(&file) || !('1'..='8').contains(&rank) {
            return None;
        }
        Some(Square::new(file as u8 - b'a', rank as u8 - b'1'))
    }

    /// All squares in canonical order.
    pub fn all() -> impl Iterator<Item = Square> {
        (0..Self::COUNT as u8).map(Square)
    }

    pub fn index(self) -> usize {
        self.0 as usize
    }

    pub fn file(self) -> u8 {
        self.0 % 8
    }

    pub fn rank(self) -> u8 {
        self.0 / 8
    }
}

impl fmt::Display for Square {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{}",
            (b'a' + self.file()) as char,
            (b'1' + self.rank()) as char
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_square_order_is_rank_major_from_a1() {
        let names: Vec<String> = Square::all().take(10).map(|s| s.to_string()).collect();
        assert_eq!(
            names,
            vec!["a1", "b1", "c1", "d1", "e1", "f1", "g1", "h1", "a2", "b2"]
        );
        assert_eq!(Square::all().last().unwrap().to_string(), "h8");
    }

    #[test]
    fn test_square_from_name() {
        assert_eq!(Square::from_name("a1"), Some(Square::new(0, 0)));
        assert_eq!(Square::from_name("e3").unwrap().index(), 20);
        assert_eq!(Square::from_name("h8").unwrap().index(), 63);
        assert_eq!(Square::from_name("i1"), None);
        assert_eq!(Square::from_name("a9"), None);
        assert_eq!(Square::from_name("a10"), None);
        assert_eq!(Square::from_name(""), None);
    }

    #[test]
    fn test_try_new_bounds() {
        assert!(Square::try_new(-1, 0).is_none());
        assert!(Square::try_new(0, 8).is_none());
        assert_eq!(Square::try_new(7, 7).unwrap().index(), 63);
    }

    #[test]
    fn test_piece_from_fen_char() {
        assert_eq!(
            Piece::from_fen_char('N'),
            Some(Piece::new(Color::White, PieceKind::Knight))
        );
        assert_eq!(
            Piece::from_fen_char('q'),
            Some(Piece::new(Color::Black, PieceKind::Queen))
        );
        assert_eq!(Piece::from_fen_char('x'), None);
        assert_eq!(Piece::from_fen_char('3'), None);
    }

    #[test]
    fn test_enumeration_order() {
        assert_eq!(Color::ALL.map(Color::index), [0, 1]);
        assert_eq!(PieceKind::ALL.map(PieceKind::index), [0, 1, 2, 3, 4, 5]);
        assert_eq!(PieceKind::ALL[0].name(), "pawn");
        assert_eq!(PieceKind::ALL[5].name(), "king");
    }
}
