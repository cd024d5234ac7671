// rust/position-core/src/position/evaluation.rs

//! Engine evaluation strings.

use std::fmt;
use std::str::FromStr;

use tracing::debug;

use crate::error::{DataError, Result};
use crate::table::Table;

/// A parsed evaluation: centipawns from White's point of view, or a forced
/// mate in N moves (positive when White mates).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Evaluation {
    Centipawns(i32),
    Mate(i32),
}

impl Evaluation {
    pub fn is_mate(&self) -> bool {
        matches!(self, Evaluation::Mate(_))
    }

    /// The centipawn score, or `InvalidEvaluation` for a mate marker.
    pub fn centipawns(&self) -> Result<i32> {
        match self {
            Evaluation::Centipawns(cp) => Ok(*cp),
            Evaluation::Mate(_) => Err(DataError::invalid_evaluation(
                self.to_string(),
                "forced-mate evaluations have no centipawn value",
            )),
        }
    }
}

impl FromStr for Evaluation {
    type Err = DataError;

    /// Accepts `+56`, `-120`, `0`, and mate markers `#+3` / `#-2`.
    fn from_str(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        if let Some(moves) = trimmed.strip_prefix('#') {
            return moves
                .parse::<i32>()
                .map(Evaluation::Mate)
                .map_err(|_| DataError::invalid_evaluation(s, "malformed mate marker"));
        }
        trimmed
            .parse::<i32>()
            .map(Evaluation::Centipawns)
            .map_err(|_| DataError::invalid_evaluation(s, "not an integer centipawn score"))
    }
}

impl fmt::Display for Evaluation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Evaluation::Centipawns(cp) => write!(f, "{cp:+}"),
            Evaluation::Mate(n) => write!(f, "#{n:+}"),
        }
    }
}

/// Drops every row whose `column` text contains a mate marker.
///
/// Rows with ordinary scores are kept as they are, unparsed; malformed scores
/// surface later when the table is encoded.
pub fn strip_mate_evaluations(table: &Table, column: &str) -> Result<Table> {
    let values = table.column(column)?.as_text()?;
    let mask: Vec<bool> = values.iter().map(|v| !v.contains('#')).collect();
    let stripped = table.filter(&mask)?;
    debug!(
        column,
        removed = table.len() - stripped.len(),
        kept = stripped.len(),
        "Stripped mate evaluations"
    );
    Ok(stripped)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::ColumnData;

    #[test]
    fn test_parse_centipawns() {
        assert_eq!("+56".parse::<Evaluation>().unwrap(), Evaluation::Centipawns(56));
        assert_eq!("-120".parse::<Evaluation>().unwrap(), Evaluation::Centipawns(-120));
        assert_eq!("0".parse::<Evaluation>().unwrap(), Evaluation::Centipawns(0));
        assert_eq!(" 17 ".parse::<Evaluation>().unwrap(), Evaluation::Centipawns(17));
    }

    #[test]
    fn test_parse_mate() {
        let mate: Evaluation = "#+3".parse().unwrap();
        assert_eq!(mate, Evaluation::Mate(3));
        assert!(mate.is_mate());
        assert_eq!("#-1".parse::<Evaluation>().unwrap(), Evaluation::Mate(-1));
        assert!(matches!(
            mate.centipawns(),
            Err(DataError::InvalidEvaluation { .. })
        ));
    }

    #[test]
    fn test_parse_rejects_garbage() {
        for bad in ["", "abc", "#", "#x", "1.5", "+"] {
            assert!(
                matches!(bad.parse::<Evaluation>(), Err(DataError::InvalidEvaluation { .. })),
                "'{bad}' should be rejected"
            );
        }
    }

    #[test]
    fn test_display() {
        assert_eq!(Evaluation::Centipawns(56).to_string(), "+56");
        assert_eq!(Evaluation::Centipawns(-3).to_string(), "-3");
        assert_eq!(Evaluation::Mate(2).to_string(), "#+2");
    }

    #[test]
    fn test_strip_mate_evaluations() {
        let table = Table::new(vec![0, 1, 2, 3])
            .with_column(
                "Evaluation",
                ColumnData::Text(vec!["+5".into(), "#+2".into(), "-30".into(), "#-1".into()]),
            )
            .unwrap();
        let stripped = strip_mate_evaluations(&table, "Evaluation").unwrap();
        assert_eq!(stripped.index(), &[0, 2]);

        assert!(matches!(
            strip_mate_evaluations(&table, "Missing"),
            Err(DataError::ColumnNotFound { .. })
        ));
    }
}
