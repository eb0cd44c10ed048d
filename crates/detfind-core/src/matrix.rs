use tracing::debug;

use crate::error::{DetError, DetResult};

/// Largest side length a matrix header may declare.
pub const MAX_SIZE: usize = 8;

// ---------------------------------------------------------------------------
// Cell
// ---------------------------------------------------------------------------

/// One slot of a [`MatrixBuffer`] grid.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Cell {
    #[default]
    Empty,
    /// A minus sign waiting for the digit that follows it.
    Negative,
    /// Sign and magnitude are kept apart so `-0` followed by more digits
    /// still ends up negative.
    Number { magnitude: u64, negative: bool },
}

impl Cell {
    pub fn value(&self) -> Option<i64> {
        match *self {
            Self::Number {
                magnitude,
                negative,
            } => {
                let v = magnitude as i64;
                Some(if negative { -v } else { v })
            }
            _ => None,
        }
    }
}

/// What the parser hands to a buffer: a minus sign or a single decimal digit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Symbol {
    Minus,
    Digit(u8),
}

// ---------------------------------------------------------------------------
// MatrixBuffer
// ---------------------------------------------------------------------------

/// Fixed-size square grid filled in row-major order.
///
/// Cells are addressed by `(column, row)`. `filled` counts completed
/// numbers; a pending minus sign does not count until its digit arrives.
#[derive(Debug, Clone)]
pub struct MatrixBuffer {
    size: usize,
    cells: Vec<Cell>,
    filled: usize,
    minors: Vec<MatrixBuffer>,
}

impl MatrixBuffer {
    pub fn create(size: usize) -> DetResult<Self> {
        if size == 0 || size > MAX_SIZE {
            return Err(DetError::Size {
                found: u32::try_from(size).unwrap_or(u32::MAX),
            });
        }
        Ok(Self {
            size,
            cells: vec![Cell::Empty; size * size],
            filled: 0,
            minors: Vec::new(),
        })
    }

    /// Build a full buffer from row-major values.
    pub fn from_values(size: usize, values: &[i64]) -> DetResult<Self> {
        let mut buffer = Self::create(size)?;
        if values.len() != size * size {
            return Err(DetError::NotFull {
                filled: values.len(),
                expected: size * size,
            });
        }
        for &v in values {
            if v == i64::MIN {
                return Err(DetError::Overflow);
            }
            buffer.push(Cell::Number {
                magnitude: v.unsigned_abs(),
                negative: v < 0,
            })?;
        }
        Ok(buffer)
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn filled(&self) -> usize {
        self.filled
    }

    pub fn capacity(&self) -> usize {
        self.size * self.size
    }

    pub fn is_full(&self) -> bool {
        debug_assert!(self.filled <= self.capacity());
        self.filled == self.capacity()
    }

    /// Next row-major slot as `(column, row)`.
    pub fn cursor(&self) -> (usize, usize) {
        (self.filled % self.size, self.filled / self.size)
    }

    pub fn cell(&self, column: usize, row: usize) -> DetResult<Cell> {
        self.check_bounds(column, row)?;
        Ok(self.cells[row * self.size + column])
    }

    /// Integer value at `(column, row)`; fails if the cell holds no number yet.
    pub fn value(&self, column: usize, row: usize) -> DetResult<i64> {
        self.cell(column, row)?.value().ok_or(DetError::NotFull {
            filled: self.filled,
            expected: self.capacity(),
        })
    }

    pub fn minors(&self) -> &[MatrixBuffer] {
        &self.minors
    }

    pub fn insert_at(&mut self, column: usize, row: usize, symbol: Symbol) -> DetResult<()> {
        self.check_bounds(column, row)?;
        let idx = row * self.size + column;
        let current = self.cells[idx];

        let digit = match symbol {
            Symbol::Minus => {
                return match current {
                    Cell::Empty => {
                        self.cells[idx] = Cell::Negative;
                        Ok(())
                    }
                    Cell::Negative => Err(DetError::DanglingMinus),
                    Cell::Number { .. } => Err(DetError::Occupied { column, row }),
                };
            }
            Symbol::Digit(d) => u64::from(d),
        };

        if self.is_full() {
            return Err(DetError::MatrixFull { size: self.size });
        }

        self.cells[idx] = match current {
            Cell::Empty => Cell::Number {
                magnitude: digit,
                negative: false,
            },
            Cell::Negative => Cell::Number {
                magnitude: digit,
                negative: true,
            },
            Cell::Number {
                magnitude,
                negative,
            } => {
                let magnitude = magnitude
                    .checked_mul(10)
                    .and_then(|m| m.checked_add(digit))
                    .filter(|&m| m <= i64::MAX as u64)
                    .ok_or(DetError::Overflow)?;
                Cell::Number {
                    magnitude,
                    negative,
                }
            }
        };
        self.filled += 1;
        Ok(())
    }

    pub fn insert_sequentially(&mut self, symbol: Symbol) -> DetResult<()> {
        if self.is_full() {
            return Err(DetError::MatrixFull { size: self.size });
        }
        let (column, row) = self.cursor();
        self.insert_at(column, row, symbol)
    }

    /// Move the cursor back onto the last completed number so the next
    /// digit extends it.
    pub fn step_back(&mut self) -> DetResult<()> {
        if self.filled == 0 {
            return Err(DetError::Bounds {
                column: 0,
                row: 0,
                size: self.size,
            });
        }
        self.filled -= 1;
        Ok(())
    }

    pub fn generate_minors(&mut self) -> DetResult<()> {
        self.ensure_full()?;
        if !self.minors.is_empty() || self.size == 1 {
            return Ok(());
        }

        let n = self.size;
        let mut minors = Vec::with_capacity(n);
        for excluded in 0..n {
            let mut minor = MatrixBuffer::create(n - 1)?;
            for row in 1..n {
                for column in (0..n).filter(|&c| c != excluded) {
                    minor.push(self.cells[row * n + column])?;
                }
            }
            minors.push(minor);
        }
        debug!(size = n, count = minors.len(), "generated minors");
        self.minors = minors;
        Ok(())
    }

    /// Laplace expansion along the first row. Minors are cached on the
    /// buffer, so repeated calls reuse them.
    pub fn calc_determinant(&mut self) -> DetResult<i128> {
        self.ensure_full()?;
        match self.size {
            1 => Ok(i128::from(self.value(0, 0)?)),
            2 => {
                let a = i128::from(self.value(0, 0)?);
                let b = i128::from(self.value(1, 0)?);
                let c = i128::from(self.value(0, 1)?);
                let d = i128::from(self.value(1, 1)?);
                let ad = a.checked_mul(d).ok_or(DetError::Overflow)?;
                let bc = b.checked_mul(c).ok_or(DetError::Overflow)?;
                ad.checked_sub(bc).ok_or(DetError::Overflow)
            }
            n => {
                self.generate_minors()?;
                let top = (0..n)
                    .map(|column| self.value(column, 0))
                    .collect::<DetResult<Vec<_>>>()?;

                let mut det: i128 = 0;
                for (i, minor) in self.minors.iter_mut().enumerate() {
                    let sign: i128 = if i % 2 == 0 { 1 } else { -1 };
                    let term = (sign * i128::from(top[i]))
                        .checked_mul(minor.calc_determinant()?)
                        .ok_or(DetError::Overflow)?;
                    det = det.checked_add(term).ok_or(DetError::Overflow)?;
                }
                Ok(det)
            }
        }
    }

    fn push(&mut self, cell: Cell) -> DetResult<()> {
        if self.is_full() {
            return Err(DetError::MatrixFull { size: self.size });
        }
        self.cells[self.filled] = cell;
        self.filled += 1;
        Ok(())
    }

    fn ensure_full(&self) -> DetResult<()> {
        if self.is_full() {
            Ok(())
        } else {
            Err(DetError::NotFull {
                filled: self.filled,
                expected: self.capacity(),
            })
        }
    }

    fn check_bounds(&self, column: usize, row: usize) -> DetResult<()> {
        if column >= self.size || row >= self.size {
            return Err(DetError::Bounds {
                column,
                row,
                size: self.size,
            });
        }
        Ok(())
    }
}
