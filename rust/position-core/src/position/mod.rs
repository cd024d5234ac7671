// rust/position-core/src/position/mod.rs

//! Chess position parsing and feature encoding.

mod board;
mod encoder;
mod evaluation;
mod fen;
mod schema;

pub use board::{Color, Piece, PieceKind, Square, LAYOUT_VERSION};
pub use encoder::{
    castling_index, encode, encode_fens, encode_position, encode_table, feature_index,
    EncodedPosition, FeatureVector, RawPosition, TableEncoder, FEATURE_COUNT, SIDE_BLOCK,
};
pub use evaluation::{strip_mate_evaluations, Evaluation};
pub use fen::{CastlingRights, Position};
pub use schema::FeatureSchema;

pub(crate) use schema::is_identifier;
