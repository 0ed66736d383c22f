use serde::{Deserialize, Serialize};
use std::fmt;

/// A grid cell (row=i, col=j)
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Cell {
    pub i: i32,
    pub j: i32,
}

impl Cell {
    pub const fn new(i: i32, j: i32) -> Self {
        Self { i, j }
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.i, self.j)
    }
}

/// Pixel point handed to a renderer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pt {
    pub x: i32,
    pub y: i32,
}

/// Which of the three product waypoints must be visited.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct ActiveSet {
    pub p1: bool,
    pub p2: bool,
    pub p3: bool,
}

impl ActiveSet {
    pub const NONE: ActiveSet = ActiveSet { p1: false, p2: false, p3: false };

    pub const fn new(p1: bool, p2: bool, p3: bool) -> Self {
        Self { p1, p2, p3 }
    }

    pub fn as_array(&self) -> [bool; 3] {
        [self.p1, self.p2, self.p3]
    }

    pub fn is_empty(&self) -> bool {
        !(self.p1 || self.p2 || self.p3)
    }

    /// All eight combinations, in binary counting order.
    pub fn all() -> impl Iterator<Item = ActiveSet> {
        (0u8..8).map(|b| ActiveSet::new(b & 1 != 0, b & 2 != 0, b & 4 != 0))
    }
}

impl From<(bool, bool, bool)> for ActiveSet {
    fn from((p1, p2, p3): (bool, bool, bool)) -> Self {
        Self { p1, p2, p3 }
    }
}

/// Problems with a store layout or grid matrix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LayoutError {
    Empty,
    Ragged { row: usize, expected: usize, found: usize },
    BadValue { row: usize, col: usize, value: u8 },
    NodeOutside { name: &'static str, cell: Cell },
    NodeBlocked { name: &'static str, cell: Cell },
    ZeroCellSize,
}

impl fmt::Display for LayoutError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LayoutError::Empty => write!(f, "layout matrix is empty"),
            LayoutError::Ragged { row, expected, found } => write!(
                f,
                "layout row {row} has {found} columns, expected {expected}"
            ),
            LayoutError::BadValue { row, col, value } => write!(
                f,
                "layout value {value} at ({row}, {col}) is not 0 or 1"
            ),
            LayoutError::NodeOutside { name, cell } => {
                write!(f, "{name} {cell} lies outside the grid")
            }
            LayoutError::NodeBlocked { name, cell } => {
                write!(f, "{name} {cell} is on a blocked cell")
            }
            LayoutError::ZeroCellSize => write!(f, "cell_px must be greater than zero"),
        }
    }
}

impl std::error::Error for LayoutError {}

/// Store floor plus the fixed nodes a route can pass through.
/// matrix[i][j]: 1 = walkable, 0 = blocked
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreLayout {
    pub matrix: Vec<Vec<u8>>,
    pub start: Cell,
    pub end: Cell,
    pub waypoints: [Cell; 3],
    pub connect8: bool, // 8-connected vs 4-connected
    pub cell_px: i32,   // pixel size of one cell on the display
}

impl Default for StoreLayout {
    /// The FreshChoice floor: 10x10 with two blocked aisles at columns 3 and 6.
    fn default() -> Self {
        let mut matrix = vec![vec![1u8; 10]; 10];
        for row in matrix.iter_mut().take(7).skip(2) {
            row[3] = 0;
            row[6] = 0;
        }
        Self {
            matrix,
            start: Cell::new(0, 0),
            end: Cell::new(0, 9),
            waypoints: [Cell::new(5, 2), Cell::new(3, 4), Cell::new(5, 7)],
            connect8: false,
            cell_px: 100,
        }
    }
}

impl StoreLayout {
    pub fn height(&self) -> usize {
        self.matrix.len()
    }

    pub fn width(&self) -> usize {
        self.matrix.first().map_or(0, |r| r.len())
    }

    /// Named fixed nodes in route order: start, P1, P2, P3, end.
    pub fn nodes(&self) -> [(&'static str, Cell); 5] {
        [
            ("start", self.start),
            ("P1", self.waypoints[0]),
            ("P2", self.waypoints[1]),
            ("P3", self.waypoints[2]),
            ("end", self.end),
        ]
    }

    /// Check the matrix shape and that every fixed node sits on a walkable cell.
    pub fn validate(&self) -> Result<(), LayoutError> {
        if self.cell_px <= 0 {
            return Err(LayoutError::ZeroCellSize);
        }
        let w = self.width();
        if w == 0 {
            return Err(LayoutError::Empty);
        }
        for (row, r) in self.matrix.iter().enumerate() {
            if r.len() != w {
                return Err(LayoutError::Ragged { row, expected: w, found: r.len() });
            }
            if let Some((col, &value)) = r.iter().enumerate().find(|&(_, &v)| v > 1) {
                return Err(LayoutError::BadValue { row, col, value });
            }
        }
        for (name, cell) in self.nodes() {
            let inside = cell.i >= 0
                && cell.j >= 0
                && (cell.i as usize) < self.height()
                && (cell.j as usize) < w;
            if !inside {
                return Err(LayoutError::NodeOutside { name, cell });
            }
            if self.matrix[cell.i as usize][cell.j as usize] == 0 {
                return Err(LayoutError::NodeBlocked { name, cell });
            }
        }
        Ok(())
    }
}
