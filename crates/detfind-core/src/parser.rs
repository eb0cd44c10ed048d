//! Single-pass state machine that finds matrices in free-form text.
//!
//! Every input character is echoed. Once a matrix is complete, the line
//! `The determinant is: <n>` and a blank line are written after the newline
//! that closed its last row. Text between that point and the next header
//! digit is written after the block.

use std::io::Write;

use tracing::{debug, trace, warn};

use crate::error::{DetError, DetResult};
use crate::matrix::{MatrixBuffer, Symbol, MAX_SIZE};
use crate::report::{MatrixOutcome, Report};
use crate::source::{CharSource, StrSource};

pub const DETERMINANT_PREFIX: &str = "The determinant is: ";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParserOptions {
    /// Largest header digit accepted, capped at [`MAX_SIZE`].
    pub max_size: usize,
}

impl Default for ParserOptions {
    fn default() -> Self {
        Self { max_size: MAX_SIZE }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CharClass {
    Digit(u8),
    Minus,
    Newline,
    Other,
}

impl CharClass {
    fn of(c: char) -> Self {
        match c {
            '0'..='9' => Self::Digit(c as u8 - b'0'),
            '-' => Self::Minus,
            '\n' => Self::Newline,
            _ => Self::Other,
        }
    }
}

/// What the last character inside a matrix body was.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Run {
    Separator,
    Digits,
    Minus,
}

enum State {
    AwaitingHeader,
    Filling { matrix: MatrixBuffer, run: Run },
    /// Full matrix whose last row has been closed by a newline.
    Ready { matrix: MatrixBuffer },
    Halted,
}

pub struct StreamParser<W: Write> {
    sink: W,
    options: ParserOptions,
    state: State,
    /// Echoed text of the current matrix, up to the point it became ready.
    span: String,
    /// Text seen after the current matrix became ready.
    trailer: String,
    outcomes: Vec<MatrixOutcome>,
    header_line: usize,
    line: usize,
    column: usize,
}

impl<W: Write> StreamParser<W> {
    pub fn new(sink: W) -> Self {
        Self::with_options(sink, ParserOptions::default())
    }

    pub fn with_options(sink: W, options: ParserOptions) -> Self {
        Self {
            sink,
            options,
            state: State::AwaitingHeader,
            span: String::new(),
            trailer: String::new(),
            outcomes: Vec::new(),
            header_line: 0,
            line: 1,
            column: 0,
        }
    }

    /// Consume the whole source, then finish.
    pub fn run(mut self, source: &mut impl CharSource) -> DetResult<Report> {
        while let Some(c) = source.next_char()? {
            self.feed(c)?;
        }
        self.finish()
    }

    /// Consume one character. Any error halts the parser.
    pub fn feed(&mut self, c: char) -> DetResult<()> {
        let (line, column) = (self.line, self.column + 1);
        if c == '\n' {
            self.line += 1;
            self.column = 0;
        } else {
            self.column += 1;
        }

        let state = std::mem::replace(&mut self.state, State::Halted);
        match self.step(state, c) {
            Ok(next) => {
                self.state = next;
                Ok(())
            }
            Err(e) => Err(at(line, column, e)),
        }
    }

    /// End of input: finalize the last matrix and flush everything.
    pub fn finish(mut self) -> DetResult<Report> {
        let state = std::mem::replace(&mut self.state, State::Halted);
        let (line, column) = (self.line, self.column + 1);

        match state {
            State::Halted => return Err(DetError::Halted),
            State::AwaitingHeader => {
                warn!("no matrix found in input");
                let text = std::mem::take(&mut self.span);
                self.sink.write_all(text.as_bytes())?;
                self.sink.flush()?;
            }
            State::Filling { matrix, run } => {
                if run == Run::Minus {
                    return Err(at(line, column, DetError::DanglingMinus));
                }
                if !matrix.is_full() {
                    return Err(at(
                        line,
                        column,
                        DetError::IncompleteMatrix {
                            filled: matrix.filled(),
                            expected: matrix.capacity(),
                        },
                    ));
                }
                self.finalize(matrix).map_err(|e| at(line, column, e))?;
            }
            State::Ready { matrix } => {
                self.finalize(matrix).map_err(|e| at(line, column, e))?;
            }
        }

        Ok(Report {
            matrices: self.outcomes,
        })
    }

    fn step(&mut self, state: State, c: char) -> DetResult<State> {
        let class = CharClass::of(c);
        trace!(?class, "step");

        match (state, class) {
            (State::Halted, _) => Err(DetError::Halted),

            (State::AwaitingHeader, CharClass::Digit(d)) => self.start_matrix(d, c),
            (State::AwaitingHeader, _) => {
                self.span.push(c);
                Ok(State::AwaitingHeader)
            }

            (State::Filling { matrix, run }, CharClass::Newline) => {
                if run == Run::Minus {
                    return Err(DetError::DanglingMinus);
                }
                self.span.push(c);
                if matrix.filled() % matrix.size() != 0 {
                    return Err(DetError::RowMismatch {
                        filled: matrix.filled(),
                        size: matrix.size(),
                    });
                }
                if matrix.is_full() {
                    Ok(State::Ready { matrix })
                } else {
                    Ok(State::Filling {
                        matrix,
                        run: Run::Separator,
                    })
                }
            }
            (State::Filling { matrix, run }, CharClass::Other) => {
                if run == Run::Minus {
                    return Err(DetError::DanglingMinus);
                }
                self.span.push(c);
                Ok(State::Filling {
                    matrix,
                    run: Run::Separator,
                })
            }
            (State::Filling { mut matrix, run }, CharClass::Minus) => {
                if run == Run::Minus {
                    return Err(DetError::DanglingMinus);
                }
                if matrix.is_full() {
                    return Err(DetError::ElementCount {
                        size: matrix.size(),
                    });
                }
                self.span.push(c);
                matrix.insert_sequentially(Symbol::Minus)?;
                Ok(State::Filling {
                    matrix,
                    run: Run::Minus,
                })
            }
            (State::Filling { mut matrix, run }, CharClass::Digit(d)) => {
                self.span.push(c);
                if run == Run::Digits {
                    matrix.step_back()?;
                } else if matrix.is_full() {
                    return Err(DetError::ElementCount {
                        size: matrix.size(),
                    });
                }
                matrix.insert_sequentially(Symbol::Digit(d))?;
                Ok(State::Filling {
                    matrix,
                    run: Run::Digits,
                })
            }

            (State::Ready { matrix }, CharClass::Digit(d)) => {
                self.check_header(d)?;
                self.finalize(matrix)?;
                self.start_matrix(d, c)
            }
            (State::Ready { matrix }, CharClass::Minus) => Err(DetError::ElementCount {
                size: matrix.size(),
            }),
            (State::Ready { matrix }, CharClass::Newline | CharClass::Other) => {
                self.trailer.push(c);
                Ok(State::Ready { matrix })
            }
        }
    }

    fn check_header(&self, digit: u8) -> DetResult<usize> {
        let size = usize::from(digit);
        if size == 0 || size > self.options.max_size.min(MAX_SIZE) {
            return Err(DetError::Size {
                found: u32::from(digit),
            });
        }
        Ok(size)
    }

    fn start_matrix(&mut self, digit: u8, c: char) -> DetResult<State> {
        let size = self.check_header(digit)?;
        let matrix = MatrixBuffer::create(size)?;
        self.header_line = self.line;
        self.span.push(c);
        debug!(size, line = self.line, "matrix started");
        Ok(State::Filling {
            matrix,
            run: Run::Separator,
        })
    }

    fn finalize(&mut self, mut matrix: MatrixBuffer) -> DetResult<()> {
        let determinant = matrix.calc_determinant()?;

        let mut block = std::mem::take(&mut self.span);
        if !block.ends_with('\n') {
            block.push('\n');
        }
        block.push_str(DETERMINANT_PREFIX);
        block.push_str(&determinant.to_string());
        block.push_str("\n\n");
        block.push_str(&std::mem::take(&mut self.trailer));

        self.sink.write_all(block.as_bytes())?;
        self.sink.flush()?;

        let outcome = MatrixOutcome {
            index: self.outcomes.len() + 1,
            size: matrix.size(),
            line: self.header_line,
            determinant,
        };
        debug!(%outcome, "matrix finalized");
        self.outcomes.push(outcome);
        Ok(())
    }
}

fn at(line: usize, column: usize, error: DetError) -> DetError {
    match error {
        // Source and sink failures are not tied to a position in the text.
        DetError::Io(_) | DetError::Halted => error,
        other => DetError::At {
            line,
            column,
            source: Box::new(other),
        },
    }
}

/// Annotate everything `source` yields into `sink`.
pub fn annotate<W: Write>(source: &mut impl CharSource, sink: W) -> DetResult<Report> {
    StreamParser::new(sink).run(source)
}

/// Annotate an in-memory string, returning the output text with the report.
pub fn annotate_str(text: &str) -> DetResult<(String, Report)> {
    let mut out = Vec::new();
    let report = annotate(&mut StrSource::new(text), &mut out)?;
    let out = String::from_utf8(out)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
    Ok((out, report))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn determinants(text: &str) -> Vec<i128> {
        annotate_str(text).unwrap().1.determinants()
    }

    fn error_for(text: &str) -> DetError {
        annotate_str(text).unwrap_err()
    }

    fn block(det: i128) -> String {
        format!("{DETERMINANT_PREFIX}{det}\n\n")
    }

    // === Determinants ===

    #[test]
    fn test_two_by_two() {
        assert_eq!(determinants("2\n1 2\n3 4\n"), vec![-2]);
    }

    #[test]
    fn test_negative_entry() {
        assert_eq!(determinants("2\n-1 2\n3 4\n"), vec![-10]);
    }

    #[test]
    fn test_one_by_one() {
        assert_eq!(determinants("1\n5\n"), vec![5]);
    }

    #[test]
    fn test_identity_3x3() {
        assert_eq!(determinants("3\n1 0 0\n0 1 0\n0 0 1\n"), vec![1]);
    }

    #[test]
    fn test_multi_digit_entry() {
        assert_eq!(determinants("2\n10 2\n3 4\n"), vec![34]);
    }

    #[test]
    fn test_negative_multi_digit_entry() {
        assert_eq!(determinants("2\n-12 0\n0 -3\n"), vec![36]);
    }

    #[test]
    fn test_arbitrary_separators() {
        assert_eq!(determinants("size 2\n1, 2;\n3 | 4\n"), vec![-2]);
    }

    #[test]
    fn test_single_line_matrix_at_end() {
        assert_eq!(determinants("2 1 2 3 4"), vec![-2]);
    }

    #[test]
    fn test_minus_ends_digit_run() {
        assert_eq!(determinants("2\n1-2\n3 4\n"), vec![10]);
    }

    // === Output layout ===

    #[test]
    fn test_output_single_matrix() {
        let (out, _) = annotate_str("2\n1 2\n3 4\n").unwrap();
        assert_eq!(out, format!("2\n1 2\n3 4\n{}", block(-2)));
    }

    #[test]
    fn test_output_two_matrices_in_order() {
        let (out, report) = annotate_str("1\n5\n2\n1 2\n3 4\n").unwrap();
        assert_eq!(out, format!("1\n5\n{}2\n1 2\n3 4\n{}", block(5), block(-2)));
        assert_eq!(report.determinants(), vec![5, -2]);
        assert_eq!(report.matrices[0].line, 1);
        assert_eq!(report.matrices[1].line, 3);
        assert_eq!(report.matrices[1].index, 2);
    }

    #[test]
    fn test_output_keeps_prose_after_block() {
        let input = "Matrix A: 1\n7\nthen some notes\n\n2\n1 0\n0 1\n";
        let (out, _) = annotate_str(input).unwrap();
        assert_eq!(
            out,
            format!(
                "Matrix A: 1\n7\n{}then some notes\n\n2\n1 0\n0 1\n{}",
                block(7),
                block(1)
            )
        );
    }

    #[test]
    fn test_output_without_trailing_newline() {
        let (out, _) = annotate_str("1\n5").unwrap();
        assert_eq!(out, format!("1\n5\n{}", block(5)));
    }

    #[test]
    fn test_output_is_deterministic() {
        let input = "3\n2 -1 0\n-1 2 -1\n0 -1 2\n1\n-9\n";
        let first = annotate_str(input).unwrap();
        let second = annotate_str(input).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.1.determinants(), vec![4, -9]);
    }

    #[test]
    fn test_prose_only_input_passes_through() {
        let (out, report) = annotate_str("no matrices here - sorry\n").unwrap();
        assert_eq!(out, "no matrices here - sorry\n");
        assert!(report.is_empty());
    }

    // === Errors ===

    #[test]
    fn test_header_nine_rejected() {
        let err = error_for("9\n1\n");
        assert!(matches!(err.kind(), DetError::Size { found: 9 }));
        assert!(matches!(err, DetError::At { line: 1, column: 1, .. }));
    }

    #[test]
    fn test_header_zero_rejected() {
        assert!(matches!(error_for("0\n").kind(), DetError::Size { found: 0 }));
    }

    #[test]
    fn test_second_header_nine_flushes_nothing() {
        let mut out = Vec::new();
        let result = annotate(&mut StrSource::new("1\n5\n9\n"), &mut out);
        assert!(matches!(result.unwrap_err().kind(), DetError::Size { found: 9 }));
        assert!(out.is_empty());
    }

    #[test]
    fn test_error_keeps_flushed_output() {
        let mut out = Vec::new();
        let result = annotate(&mut StrSource::new("1\n5\n2\n1 2 3\n"), &mut out);
        assert!(matches!(
            result.unwrap_err().kind(),
            DetError::RowMismatch { filled: 3, size: 2 }
        ));
        assert_eq!(String::from_utf8(out).unwrap(), format!("1\n5\n{}", block(5)));
    }

    #[test]
    fn test_row_mismatch() {
        let err = error_for("2\n1 2 3\n4\n");
        assert!(matches!(err.kind(), DetError::RowMismatch { filled: 3, size: 2 }));
        assert!(matches!(err, DetError::At { line: 2, column: 6, .. }));
    }

    #[test]
    fn test_too_many_elements_on_last_row() {
        let err = error_for("2\n1 2\n3 4 5\n");
        assert!(matches!(err.kind(), DetError::ElementCount { size: 2 }));
    }

    #[test]
    fn test_minus_after_complete_matrix() {
        let err = error_for("1\n5\n-\n");
        assert!(matches!(err.kind(), DetError::ElementCount { size: 1 }));
    }

    #[test]
    fn test_incomplete_final_matrix() {
        let err = error_for("3\n1 2 3\n4 5 6\n");
        assert!(matches!(
            err.kind(),
            DetError::IncompleteMatrix {
                filled: 6,
                expected: 9
            }
        ));
    }

    #[test]
    fn test_dangling_minus() {
        assert!(matches!(error_for("2\n1 - 2\n3 4\n").kind(), DetError::DanglingMinus));
        assert!(matches!(error_for("2\n1 --2\n3 4\n").kind(), DetError::DanglingMinus));
        assert!(matches!(error_for("2\n1 2\n3 -").kind(), DetError::DanglingMinus));
    }

    #[test]
    fn test_configured_max_size() {
        let options = ParserOptions { max_size: 2 };
        let mut out = Vec::new();
        let parser = StreamParser::with_options(&mut out, options);
        let result = parser.run(&mut StrSource::new("3\n1 0 0\n0 1 0\n0 0 1\n"));
        assert!(matches!(result.unwrap_err().kind(), DetError::Size { found: 3 }));
    }

    #[test]
    fn test_feed_after_error_is_halted() {
        let mut out = Vec::new();
        let mut parser = StreamParser::new(&mut out);
        assert!(parser.feed('9').is_err());
        assert!(matches!(parser.feed('1'), Err(DetError::Halted)));
        assert!(matches!(parser.finish(), Err(DetError::Halted)));
    }

    // === Reference comparison ===

    struct XorShift(u64);

    impl XorShift {
        fn next(&mut self) -> u64 {
            self.0 ^= self.0 << 13;
            self.0 ^= self.0 >> 7;
            self.0 ^= self.0 << 17;
            self.0
        }

        fn entry(&mut self) -> i64 {
            (self.next() % 201) as i64 - 100
        }
    }

    /// Fraction-free Gaussian elimination.
    fn bareiss(n: usize, values: &[i64]) -> i128 {
        let mut a: Vec<Vec<i128>> = (0..n)
            .map(|r| (0..n).map(|c| i128::from(values[r * n + c])).collect())
            .collect();
        let mut sign = 1;
        let mut prev = 1;
        for k in 0..n - 1 {
            if a[k][k] == 0 {
                match (k + 1..n).find(|&r| a[r][k] != 0) {
                    Some(r) => {
                        a.swap(k, r);
                        sign = -sign;
                    }
                    None => return 0,
                }
            }
            for i in k + 1..n {
                for j in k + 1..n {
                    a[i][j] = (a[i][j] * a[k][k] - a[i][k] * a[k][j]) / prev;
                }
            }
            prev = a[k][k];
        }
        sign * a[n - 1][n - 1]
    }

    fn render(n: usize, values: &[i64]) -> String {
        let mut text = format!("{n}\n");
        for row in values.chunks(n) {
            let cells: Vec<String> = row.iter().map(|v| v.to_string()).collect();
            text.push_str(&cells.join(" "));
            text.push('\n');
        }
        text
    }

    #[test]
    fn test_matches_reference_determinant() {
        let mut rng = XorShift(0x9E37_79B9_7F4A_7C15);
        for n in 1..=8 {
            let rounds = if n >= 7 { 2 } else { 10 };
            for _ in 0..rounds {
                let values: Vec<i64> = (0..n * n).map(|_| rng.entry()).collect();
                let text = render(n, &values);
                let (out, report) = annotate_str(&text).unwrap();
                let expected = bareiss(n, &values);
                assert_eq!(report.determinants(), vec![expected], "input:\n{text}");
                assert_eq!(out, format!("{text}{}", block(expected)));
            }
        }
    }

    #[test]
    fn test_reference_on_concatenated_stream() {
        let mut rng = XorShift(42);
        let mut text = String::new();
        let mut expected = Vec::new();
        for n in [3, 1, 4, 2] {
            let values: Vec<i64> = (0..n * n).map(|_| rng.entry()).collect();
            text.push_str(&render(n, &values));
            expected.push(bareiss(n, &values));
        }
        assert_eq!(determinants(&text), expected);
    }
}
