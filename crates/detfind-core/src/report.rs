use serde::Serialize;
use std::fmt;

/// Determinant computed for one matrix found in the stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MatrixOutcome {
    /// 1-based position of the matrix in the stream.
    pub index: usize,
    pub size: usize,
    /// Line on which the header digit appeared.
    pub line: usize,
    pub determinant: i128,
}

impl fmt::Display for MatrixOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "#{} ({}x{}, line {}): {}",
            self.index, self.size, self.size, self.line, self.determinant
        )
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Report {
    pub matrices: Vec<MatrixOutcome>,
}

impl Report {
    pub fn len(&self) -> usize {
        self.matrices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.matrices.is_empty()
    }

    pub fn determinants(&self) -> Vec<i128> {
        self.matrices.iter().map(|m| m.determinant).collect()
    }
}
