pub mod error;
pub mod matrix;
pub mod parser;
pub mod report;
pub mod source;

pub use error::{DetError, DetResult};
pub use matrix::{Cell, MatrixBuffer, Symbol, MAX_SIZE};
pub use parser::{annotate, annotate_str, ParserOptions, StreamParser, DETERMINANT_PREFIX};
pub use report::{MatrixOutcome, Report};
pub use source::{CharSource, ReaderSource, StrSource};
