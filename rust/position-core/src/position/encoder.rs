// rust/position-core/src/position/encoder.rs

//! Position → feature vector encoding.
//!
//! Layout, per side (White then Black): six 64-square planes in piece order
//! pawn, knight, bishop, rook, queen, king, followed by "has any castling
//! right" and "has queenside castling right". Squares run a1, b1, …, h8.

use super::board::{Color, PieceKind, Square, LAYOUT_VERSION};
use super::evaluation::{strip_mate_evaluations, Evaluation};
use super::fen::Position;
use super::schema::FeatureSchema;
use crate::error::{DataError, Result};
use crate::table::{ColumnData, Table};

/// Booleans per side: six piece planes plus two castling flags.
pub const SIDE_BLOCK: usize = PieceKind::ALL.len() * Square::COUNT + 2;

/// Total encoded width.
pub const FEATURE_COUNT: usize = Color::ALL.len() * SIDE_BLOCK;

/// A fixed-length boolean encoding of one position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeatureVector {
    bits: [bool; FEATURE_COUNT],
}

impl FeatureVector {
    pub fn as_slice(&self) -> &[bool] {
        &self.bits
    }

    pub fn get(&self, index: usize) -> Option<bool> {
        self.bits.get(index).copied()
    }

    pub fn count_ones(&self) -> usize {
        self.bits.iter().filter(|&&b| b).count()
    }

    pub fn len(&self) -> usize {
        FEATURE_COUNT
    }

    pub fn is_empty(&self) -> bool {
        false
    }
}

/// Feature slot of `kind` belonging to `color` on `square`.
pub fn feature_index(color: Color, kind: PieceKind, square: Square) -> usize {
    color.index() * SIDE_BLOCK + kind.index() * Square::COUNT + square.index()
}

/// Slot of the "any castling right" flag (`queenside = false`) or the
/// queenside flag.
pub fn castling_index(color: Color, queenside: bool) -> usize {
    color.index() * SIDE_BLOCK + PieceKind::ALL.len() * Square::COUNT + usize::from(queenside)
}

/// Encodes an already parsed position.
pub fn encode_position(position: &Position) -> FeatureVector {
    let mut bits = [false; FEATURE_COUNT];
    for square in Square::all() {
        if let Some(piece) = position.piece_at(square) {
            bits[feature_index(piece.color, piece.kind, square)] = true;
        }
    }
    for color in Color::ALL {
        bits[castling_index(color, false)] = position.has_castling_rights(color);
        bits[castling_index(color, true)] = position.has_queenside_castling_rights(color);
    }
    FeatureVector { bits }
}

/// Parses `fen` and encodes it.
///
/// # Errors
///
/// `InvalidPosition` for an unparseable or illegal FEN, `Config` if the
/// schema was written for a different layout version.
pub fn encode(fen: &str, schema: &FeatureSchema) -> Result<FeatureVector> {
    check_schema_version(schema)?;
    let position = Position::from_fen(fen)?;
    Ok(encode_position(&position))
}

fn check_schema_version(schema: &FeatureSchema) -> Result<()> {
    if schema.version() != LAYOUT_VERSION {
        return Err(DataError::config(format!(
            "feature schema version {} does not match encoder layout version {LAYOUT_VERSION}",
            schema.version()
        )));
    }
    Ok(())
}

/// One unencoded input row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawPosition {
    pub key: i64,
    pub fen: String,
    pub evaluation: String,
}

/// One encoded row, ready for storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedPosition {
    pub key: i64,
    pub features: FeatureVector,
    pub evaluation: i32,
}

impl RawPosition {
    /// Encodes the position and parses its evaluation. Mate markers are
    /// rejected with `InvalidEvaluation`.
    pub fn encode(&self, schema: &FeatureSchema) -> Result<EncodedPosition> {
        let features = encode(&self.fen, schema)?;
        let evaluation = self.evaluation.parse::<Evaluation>()?.centipawns()?;
        Ok(EncodedPosition {
            key: self.key,
            features,
            evaluation,
        })
    }
}

/// Encodes `fens` into a table of the schema's Bool columns indexed by
/// `keys`.
pub fn encode_fens(keys: &[i64], fens: &[String], schema: &FeatureSchema) -> Result<Table> {
    if keys.len() != fens.len() {
        return Err(DataError::config(format!(
            "{} keys for {} positions",
            keys.len(),
            fens.len()
        )));
    }
    check_schema_version(schema)?;

    let vectors = fens
        .iter()
        .map(|fen| Position::from_fen(fen).map(|p| encode_position(&p)))
        .collect::<Result<Vec<_>>>()?;

    feature_table(keys.to_vec(), &vectors, schema)
}

/// Encodes a raw table holding a FEN text column and an evaluation text
/// column. The result has the schema's Bool columns followed by an Int
/// column named after `eval_column`, with the original row labels.
pub fn encode_table(
    raw: &Table,
    fen_column: &str,
    eval_column: &str,
    schema: &FeatureSchema,
) -> Result<Table> {
    check_schema_version(schema)?;
    let fens = raw.column(fen_column)?.as_text()?;
    let evaluations = raw.column(eval_column)?.as_text()?;

    let mut vectors = Vec::with_capacity(raw.len());
    let mut scores = Vec::with_capacity(raw.len());
    for (fen, evaluation) in fens.iter().zip(evaluations) {
        vectors.push(encode_position(&Position::from_fen(fen)?));
        scores.push(i64::from(evaluation.parse::<Evaluation>()?.centipawns()?));
    }

    let mut table = feature_table(raw.index().to_vec(), &vectors, schema)?;
    table.push_column(eval_column, ColumnData::Int(scores))?;
    Ok(table)
}

/// Column bindings for turning raw tables into encoded ones.
#[derive(Debug, Clone)]
pub struct TableEncoder {
    pub schema: FeatureSchema,
    pub fen_column: String,
    pub evaluation_column: String,
    /// Drop forced-mate rows instead of failing on them.
    pub strip_mates: bool,
}

impl TableEncoder {
    pub fn new(
        schema: FeatureSchema,
        fen_column: impl Into<String>,
        evaluation_column: impl Into<String>,
    ) -> Self {
        Self {
            schema,
            fen_column: fen_column.into(),
            evaluation_column: evaluation_column.into(),
            strip_mates: false,
        }
    }

    #[must_use]
    pub fn strip_mates(mut self, strip: bool) -> Self {
        self.strip_mates = strip;
        self
    }

    pub fn encode(&self, raw: &Table) -> Result<Table> {
        if self.strip_mates {
            let stripped = strip_mate_evaluations(raw, &self.evaluation_column)?;
            encode_table(&stripped, &self.fen_column, &self.evaluation_column, &self.schema)
        } else {
            encode_table(raw, &self.fen_column, &self.evaluation_column, &self.schema)
        }
    }
}

fn feature_table(
    index: Vec<i64>,
    vectors: &[FeatureVector],
    schema: &FeatureSchema,
) -> Result<Table> {
    let mut table = Table::new(index);
    for (slot, name) in schema.columns().iter().enumerate() {
        let column: Vec<bool> = vectors.iter().map(|v| v.bits[slot]).collect();
        table.push_column(name.clone(), ColumnData::Bool(column))?;
    }
    Ok(table)
}
