use thiserror::Error;

#[derive(Debug, Error)]
pub enum DetError {
    #[error("matrix size {found} not supported: only 1x1 up to 8x8 matrices can be evaluated")]
    Size { found: u32 },

    #[error("row mismatch: {filled} elements is not a multiple of matrix size {size}")]
    RowMismatch { filled: usize, size: usize },

    #[error("element count mismatch: too many elements for a {size}x{size} matrix")]
    ElementCount { size: usize },

    #[error("insert location ({column}, {row}) outside of {size}x{size} matrix bounds")]
    Bounds {
        column: usize,
        row: usize,
        size: usize,
    },

    #[error("cell ({column}, {row}) already holds a number")]
    Occupied { column: usize, row: usize },

    #[error("matrix is already full ({size}x{size})")]
    MatrixFull { size: usize },

    #[error("matrix is not completely filled: {filled} of {expected} elements")]
    NotFull { filled: usize, expected: usize },

    #[error("input ended with an incomplete matrix: {filled} of {expected} elements")]
    IncompleteMatrix { filled: usize, expected: usize },

    #[error("minus sign not followed by a digit")]
    DanglingMinus,

    #[error("parser halted after an earlier error")]
    Halted,

    #[error("integer overflow: value does not fit in the supported range")]
    Overflow,

    #[error("line {line}, column {column}: {source}")]
    At {
        line: usize,
        column: usize,
        #[source]
        source: Box<DetError>,
    },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl DetError {
    /// The underlying rule violation, with any position wrapper removed.
    pub fn kind(&self) -> &DetError {
        match self {
            Self::At { source, .. } => source.kind(),
            other => other,
        }
    }
}

pub type DetResult<T> = Result<T, DetError>;
