// rust/position-core/src/position/fen.rs

//! Self-contained FEN parser.
//!
//! Accepts the four-field EPD form (`placement side castling en-passant`) or
//! the full six-field form with half-move and full-move clocks, and rejects
//! positions that are syntactically valid but cannot occur in a game.

use std::str::FromStr;

use super::board::{Color, Piece, PieceKind, Square};
use crate::error::{DataError, Result};

const KNIGHT_OFFSETS: [(i8, i8); 8] = [
    (1, 2),
    (2, 1),
    (2, -1),
    (1, -2),
    (-1, -2),
    (-2, -1),
    (-2, 1),
    (-1, 2),
];

const KING_OFFSETS: [(i8, i8); 8] = [
    (0, 1),
    (1, 1),
    (1, 0),
    (1, -1),
    (0, -1),
    (-1, -1),
    (-1, 0),
    (-1, 1),
];

const ROOK_DIRECTIONS: [(i8, i8); 4] = [(0, 1), (1, 0), (0, -1), (-1, 0)];
const BISHOP_DIRECTIONS: [(i8, i8); 4] = [(1, 1), (1, -1), (-1, -1), (-1, 1)];

/// Castling rights as written in the FEN castling field.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CastlingRights {
    pub white_kingside: bool,
    pub white_queenside: bool,
    pub black_kingside: bool,
    pub black_queenside: bool,
}

impl CastlingRights {
    pub fn kingside(&self, color: Color) -> bool {
        match color {
            Color::White => self.white_kingside,
            Color::Black => self.black_kingside,
        }
    }

    pub fn queenside(&self, color: Color) -> bool {
        match color {
            Color::White => self.white_queenside,
            Color::Black => self.black_queenside,
        }
    }
}

/// A parsed, validated chess position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Position {
    squares: [Option<Piece>; Square::COUNT],
    side_to_move: Color,
    castling: CastlingRights,
    en_passant: Option<Square>,
    halfmove_clock: u32,
    fullmove_number: u32,
}

impl Position {
    /// Parses and validates a FEN string.
    ///
    /// # Errors
    ///
    /// Returns `InvalidPosition` if any field is malformed or the described
    /// position is illegal.
    pub fn from_fen(fen: &str) -> Result<Self> {
        let position = parse_fields(fen).map_err(|message| DataError::invalid_position(fen, message))?;
        position
            .check_legal()
            .map_err(|message| DataError::invalid_position(fen, message))?;
        Ok(position)
    }

    pub fn piece_at(&self, square: Square) -> Option<Piece> {
        self.squares[square.index()]
    }

    pub fn side_to_move(&self) -> Color {
        self.side_to_move
    }

    pub fn en_passant(&self) -> Option<Square> {
        self.en_passant
    }

    pub fn halfmove_clock(&self) -> u32 {
        self.halfmove_clock
    }

    pub fn fullmove_number(&self) -> u32 {
        self.fullmove_number
    }

    /// Castling letters exactly as given in the FEN.
    pub fn declared_castling_rights(&self) -> CastlingRights {
        self.castling
    }

    /// Kingside right backed by king on the e-file and rook on the h-file of
    /// the back rank.
    pub fn has_kingside_castling_rights(&self, color: Color) -> bool {
        self.castling.kingside(color) && self.king_and_rook_home(color, 7)
    }

    /// Queenside right backed by king on the e-file and rook on the a-file of
    /// the back rank.
    pub fn has_queenside_castling_rights(&self, color: Color) -> bool {
        self.castling.queenside(color) && self.king_and_rook_home(color, 0)
    }

    pub fn has_castling_rights(&self, color: Color) -> bool {
        self.has_kingside_castling_rights(color) || self.has_queenside_castling_rights(color)
    }

    /// True when `color` has a piece of `kind` on `square`.
    pub fn is_occupied_by(&self, square: Square, color: Color, kind: PieceKind) -> bool {
        self.piece_at(square) == Some(Piece::new(color, kind))
    }

    /// True when any piece of `by` attacks `target`.
    pub fn is_attacked(&self, target: Square, by: Color) -> bool {
        let file = target.file() as i8;
        let rank = target.rank() as i8;

        // A pawn attacks diagonally forward, so look one rank behind the target.
        let pawn_rank = match by {
            Color::White => rank - 1,
            Color::Black => rank + 1,
        };
        for df in [-1, 1] {
            if self.has_at(file + df, pawn_rank, by, PieceKind::Pawn) {
                return true;
            }
        }

        if KNIGHT_OFFSETS
            .iter()
            .any(|&(df, dr)| self.has_at(file + df, rank + dr, by, PieceKind::Knight))
        {
            return true;
        }

        if KING_OFFSETS
            .iter()
            .any(|&(df, dr)| self.has_at(file + df, rank + dr, by, PieceKind::King))
        {
            return true;
        }

        let slider_hits = |directions: &[(i8, i8)], kind: PieceKind| {
            directions.iter().any(|&(df, dr)| {
                let (mut f, mut r) = (file + df, rank + dr);
                while let Some(square) = Square::try_new(f, r) {
                    if let Some(piece) = self.piece_at(square) {
                        return piece.color == by
                            && (piece.kind == kind || piece.kind == PieceKind::Queen);
                    }
                    f += df;
                    r += dr;
                }
                false
            })
        };

        slider_hits(&ROOK_DIRECTIONS, PieceKind::Rook)
            || slider_hits(&BISHOP_DIRECTIONS, PieceKind::Bishop)
    }

    fn has_at(&self, file: i8, rank: i8, color: Color, kind: PieceKind) -> bool {
        Square::try_new(file, rank).is_some_and(|sq| self.is_occupied_by(sq, color, kind))
    }

    fn king_and_rook_home(&self, color: Color, rook_file: u8) -> bool {
        let back_rank = color.back_rank();
        self.is_occupied_by(Square::new(4, back_rank), color, PieceKind::King)
            && self.is_occupied_by(Square::new(rook_file, back_rank), color, PieceKind::Rook)
    }

    fn king_square(&self, color: Color) -> Option<Square> {
        Square::all().find(|&sq| self.is_occupied_by(sq, color, PieceKind::King))
    }

    fn check_legal(&self) -> std::result::Result<(), String> {
        for color in Color::ALL {
            let pieces: Vec<Piece> = self.squares.iter().flatten().filter(|p| p.color == color).copied().collect();
            let kings = pieces.iter().filter(|p| p.kind == PieceKind::King).count();
            let pawns = pieces.iter().filter(|p| p.kind == PieceKind::Pawn).count();
            let side = side_name(color);

            if kings != 1 {
                return Err(format!("{side} has {kings} kings, expected exactly 1"));
            }
            if pawns > 8 {
                return Err(format!("{side} has {pawns} pawns"));
            }
            if pieces.len() > 16 {
                return Err(format!("{side} has {} pieces", pieces.len()));
            }
        }

        for file in 0..8 {
            for rank in [0, 7] {
                if let Some(Piece {
                    kind: PieceKind::Pawn,
                    ..
                }) = self.piece_at(Square::new(file, rank))
                {
                    return Err(format!("pawn on back rank at {}", Square::new(file, rank)));
                }
            }
        }

        let waiting = self.side_to_move.opposite();
        if let Some(king) = self.king_square(waiting) {
            if self.is_attacked(king, self.side_to_move) {
                return Err(format!(
                    "{} king is in check but it is {} to move",
                    side_name(waiting),
                    side_name(self.side_to_move)
                ));
            }
        }

        Ok(())
    }
}

impl FromStr for Position {
    type Err = DataError;

    fn from_str(s: &str) -> Result<Self> {
        Position::from_fen(s)
    }
}

fn side_name(color: Color) -> &'static str {
    match color {
        Color::White => "white",
        Color::Black => "black",
    }
}

fn parse_fields(fen: &str) -> std::result::Result<Position, String> {
    let fields: Vec<&str> = fen.split_whitespace().collect();
    if fields.len() != 4 && fields.len() != 6 {
        return Err(format!("expected 4 or 6 fields, found {}", fields.len()));
    }

    let squares = parse_placement(fields[0])?;

    let side_to_move = match fields[1] {
        "w" => Color::White,
        "b" => Color::Black,
        other => return Err(format!("invalid side to move '{other}'")),
    };

    let castling = parse_castling(fields[2])?;
    let en_passant = parse_en_passant(fields[3], side_to_move)?;

    let (halfmove_clock, fullmove_number) = if fields.len() == 6 {
        let halfmove = fields[4]
            .parse::<u32>()
            .map_err(|_| format!("invalid half-move clock '{}'", fields[4]))?;
        let fullmove = fields[5]
            .parse::<u32>()
            .map_err(|_| format!("invalid full-move number '{}'", fields[5]))?;
        (halfmove, fullmove)
    } else {
        (0, 1)
    };

    Ok(Position {
        squares,
        side_to_move,
        castling,
        en_passant,
        halfmove_clock,
        fullmove_number,
    })
}

fn parse_placement(field: &str) -> std::result::Result<[Option<Piece>; Square::COUNT], String> {
    let ranks: Vec<&str> = field.split('/').collect();
    if ranks.len() != 8 {
        return Err(format!("placement has {} ranks, expected 8", ranks.len()));
    }

    let mut squares = [None; Square::COUNT];

    // FEN lists rank 8 first.
    for (row, rank_field) in ranks.iter().enumerate() {
        let rank = 7 - row as u8;
        let mut file: u8 = 0;
        let mut previous_was_digit = false;

        for c in rank_field.chars() {
            if let Some(run) = c.to_digit(10) {
                if run == 0 || run > 8 {
                    return Err(format!("invalid empty-square count '{c}'"));
                }
                if previous_was_digit {
                    return Err("two consecutive empty-square counts".to_string());
                }
                file += run as u8;
                previous_was_digit = true;
            } else {
                let piece = Piece::from_fen_char(c)
                    .ok_or_else(|| format!("invalid piece character '{c}'"))?;
                if file >= 8 {
                    return Err(format!("rank {} has more than 8 files", rank + 1));
                }
                squares[Square::new(file, rank).index()] = Some(piece);
                file += 1;
                previous_was_digit = false;
            }

            if file > 8 {
                return Err(format!("rank {} has more than 8 files", rank + 1));
            }
        }

        if file != 8 {
            return Err(format!("rank {} covers {file} files, expected 8", rank + 1));
        }
    }

    Ok(squares)
}

fn parse_castling(field: &str) -> std::result::Result<CastlingRights, String> {
    let mut rights = CastlingRights::default();
    if field == "-" {
        return Ok(rights);
    }

    for c in field.chars() {
        let slot = match c {
            'K' => &mut rights.white_kingside,
            'Q' => &mut rights.white_queenside,
            'k' => &mut rights.black_kingside,
            'q' => &mut rights.black_queenside,
            other => return Err(format!("invalid castling character '{other}'")),
        };
        if *slot {
            return Err(format!("castling right '{c}' listed twice"));
        }
        *slot = true;
    }

    Ok(rights)
}

fn parse_en_passant(field: &str, side_to_move: Color) -> std::result::Result<Option<Square>, String> {
    if field == "-" {
        return Ok(None);
    }

    let square =
        Square::from_name(field).ok_or_else(|| format!("invalid en-passant square '{field}'"))?;

    // The capturing side is to move, so the target lies behind the pawn that
    // just advanced two squares.
    let expected_rank = match side_to_move {
        Color::White => 5,
        Color::Black => 2,
    };
    if square.rank() != expected_rank {
        return Err(format!(
            "en-passant square {square} is not on rank {}",
            expected_rank + 1
        ));
    }

    Ok(Some(square))
}

#[cfg(test)]
mod tests {
    use super::*;

    const START: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

    fn assert_invalid(fen: &str) {
        let result = Position::from_fen(fen);
        assert!(
            matches!(result, Err(DataError::InvalidPosition { .. })),
            "expected '{fen}' to be rejected, got {result:?}"
        );
    }

    #[test]
    fn test_parse_start_position() {
        let position = Position::from_fen(START).unwrap();
        assert_eq!(position.side_to_move(), Color::White);
        assert_eq!(position.halfmove_clock(), 0);
        assert_eq!(position.fullmove_number(), 1);
        assert_eq!(position.en_passant(), None);
        assert_eq!(
            position.piece_at(Square::from_name("e1").unwrap()),
            Some(Piece::new(Color::White, PieceKind::King))
        );
        assert_eq!(
            position.piece_at(Square::from_name("d8").unwrap()),
            Some(Piece::new(Color::Black, PieceKind::Queen))
        );
        assert_eq!(position.piece_at(Square::from_name("e4").unwrap()), None);
        for color in Color::ALL {
            assert!(position.has_castling_rights(color));
            assert!(position.has_queenside_castling_rights(color));
            assert!(position.has_kingside_castling_rights(color));
        }
    }

    #[test]
    fn test_parse_four_field_form() {
        let position =
            Position::from_fen("rnbqkbnr/pppppppp/8/8/4P3/8/PPPP1PPP/RNBQKBNR b KQkq e3").unwrap();
        assert_eq!(position.side_to_move(), Color::Black);
        assert_eq!(position.en_passant(), Square::from_name("e3"));
        assert_eq!(position.fullmove_number(), 1);
    }

    #[test]
    fn test_from_str() {
        let position: Position = START.parse().unwrap();
        assert_eq!(position, Position::from_fen(START).unwrap());
    }

    #[test]
    fn test_stale_castling_letters_are_not_effective() {
        // White king has left e1, black h8 rook is gone.
        let position =
            Position::from_fen("rnbqkbn1/pppppppp/8/8/8/8/PPPPPPPP/RNBQ1KNR w KQkq - 0 1").unwrap();
        assert!(position.declared_castling_rights().white_kingside);
        assert!(!position.has_castling_rights(Color::White));
        assert!(!position.has_queenside_castling_rights(Color::White));
        assert!(position.has_castling_rights(Color::Black));
        assert!(!position.has_kingside_castling_rights(Color::Black));
        assert!(position.has_queenside_castling_rights(Color::Black));
    }

    #[test]
    fn test_rejects_malformed_fields() {
        assert_invalid("");
        assert_invalid("rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq");
        assert_invalid("rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0");
        assert_invalid("rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP w KQkq - 0 1");
        assert_invalid("rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR x KQkq - 0 1");
        assert_invalid("rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkx - 0 1");
        assert_invalid("rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KKqk - 0 1");
        assert_invalid("rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq z9 0 1");
        assert_invalid("rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - a 1");
        assert_invalid("rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 -1");
    }

    #[test]
    fn test_rejects_bad_placement() {
        // Nine files on a rank.
        assert_invalid("rnbqkbnrp/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1");
        // Seven files on a rank.
        assert_invalid("rnbqkbn/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1");
        // Consecutive digits.
        assert_invalid("rnbqkbnr/pppppppp/44/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1");
        // Zero run.
        assert_invalid("rnbqkbnr/pppppppp/08/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1");
        // Unknown piece.
        assert_invalid("rnbqkbnr/pppppppp/8/8/3X4/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1");
    }

    #[test]
    fn test_rejects_illegal_positions() {
        // No white king.
        assert_invalid("rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQ1BNR w kq - 0 1");
        // Two black kings.
        assert_invalid("rnbqkbnr/pppppppp/8/8/3k4/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1");
        // Pawn on the eighth rank.
        assert_invalid("rnbqkbnP/pppppppp/8/8/8/8/PPPPPPP1/RNBQKBNR w KQq - 0 1");
        // Nine white pawns.
        assert_invalid("rnbqkbnr/pppppppp/8/8/8/P7/PPPPPPPP/RNBQKBNR w KQkq - 0 1");
        // Black to move while the white king is attacked by the black rook.
        assert_invalid("4k3/8/8/8/8/8/8/r3K3 b - - 0 1");
        // En-passant square on the wrong rank for the side to move.
        assert_invalid("rnbqkbnr/pppppppp/8/8/4P3/8/PPPP1PPP/RNBQKBNR b KQkq e6 0 1");
    }

    #[test]
    fn test_side_to_move_may_be_in_check() {
        // White to move and in check from the rook is legal.
        let position = Position::from_fen("4k3/8/8/8/8/8/8/r3K3 w - - 0 1").unwrap();
        assert!(position.is_attacked(Square::from_name("e1").unwrap(), Color::Black));
    }

    #[test]
    fn test_attack_detection() {
        let position = Position::from_fen("4k3/8/8/3n4/8/8/2P5/4K2B w - - 0 1").unwrap();
        // Knight on d5 attacks c3, e3, f4, f6 …
        assert!(position.is_attacked(Square::from_name("c3").unwrap(), Color::Black));
        assert!(position.is_attacked(Square::from_name("f6").unwrap(), Color::Black));
        // White pawn on c2 attacks b3 and d3 but not c3.
        assert!(position.is_attacked(Square::from_name("d3").unwrap(), Color::White));
        assert!(!position.is_attacked(Square::from_name("c3").unwrap(), Color::White));
        // Bishop on h1 sees along the long diagonal up to the knight on d5.
        assert!(position.is_attacked(Square::from_name("d5").unwrap(), Color::White));
        assert!(!position.is_attacked(Square::from_name("c6").unwrap(), Color::White));
    }
}
