use std::fmt;
use std::str::FromStr;

use common_types::ActiveSet;

/// Digits in a scanned code: two per waypoint.
pub const BARCODE_LEN: usize = 6;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BarcodeError {
    WrongLength(usize),
    NonDigit { index: usize, ch: char },
}

impl fmt::Display for BarcodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BarcodeError::WrongLength(n) => {
                write!(f, "invalid input: expected {BARCODE_LEN} digits, got {n}")
            }
            BarcodeError::NonDigit { index, ch } => {
                write!(f, "invalid input: '{ch}' at position {index} is not a digit")
            }
        }
    }
}

impl std::error::Error for BarcodeError {}

/// A validated 6-digit product code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Barcode([u8; BARCODE_LEN]);

impl Barcode {
    pub fn parse(code: &str) -> Result<Self, BarcodeError> {
        let n = code.chars().count();
        if n != BARCODE_LEN {
            return Err(BarcodeError::WrongLength(n));
        }
        let mut digits = [0u8; BARCODE_LEN];
        for (index, ch) in code.chars().enumerate() {
            let d = ch.to_digit(10).ok_or(BarcodeError::NonDigit { index, ch })?;
            digits[index] = d as u8;
        }
        Ok(Self(digits))
    }

    /// Two-digit segment `k` (0..3) read as an integer.
    pub fn segment(&self, k: usize) -> u8 {
        self.0[2 * k] * 10 + self.0[2 * k + 1]
    }

    /// A waypoint is active iff its segment is nonzero.
    pub fn active_set(&self) -> ActiveSet {
        ActiveSet::new(self.segment(0) != 0, self.segment(1) != 0, self.segment(2) != 0)
    }
}

impl FromStr for Barcode {
    type Err = BarcodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for Barcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for d in self.0 {
            write!(f, "{d}")?;
        }
        Ok(())
    }
}

/// Validate `code` and derive the waypoint flags from it.
pub fn process_barcode(code: &str) -> Result<ActiveSet, BarcodeError> {
    Barcode::parse(code).map(|b| b.active_set())
}
