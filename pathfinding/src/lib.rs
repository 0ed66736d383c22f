use std::cmp::Ordering;
use std::collections::BinaryHeap;

use log::trace;

pub use common_types::{ActiveSet, Cell, LayoutError, Pt, StoreLayout};

pub mod route;

pub use route::{compose_route, Route, RouteCache, RouteError, RoutePlanner, SegmentTable, Stop};

const DIRS4: [(i32, i32); 4] = [(-1, 0), (0, -1), (0, 1), (1, 0)];
const DIRS8: [(i32, i32); 8] = [
    (-1, -1),
    (-1, 0),
    (-1, 1),
    (0, -1),
    (0, 1),
    (1, -1),
    (1, 0),
    (1, 1),
];

#[inline]
fn hypot(a: f32, b: f32) -> f32 {
    (a * a + b * b).sqrt()
}

/// Immutable traversability map. cells[i*w + j]: 1 = walkable, 0 = blocked
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Grid {
    w: i32,
    h: i32,
    cells: Vec<u8>,
    connect8: bool,
}

impl Grid {
    /// Build a grid from row-major rows. Every row must have the same width.
    pub fn new(matrix: &[Vec<u8>], connect8: bool) -> Result<Self, LayoutError> {
        let w = matrix.first().map_or(0, |r| r.len());
        if w == 0 {
            return Err(LayoutError::Empty);
        }
        let mut cells = Vec::with_capacity(w * matrix.len());
        for (row, r) in matrix.iter().enumerate() {
            if r.len() != w {
                return Err(LayoutError::Ragged { row, expected: w, found: r.len() });
            }
            for (col, &value) in r.iter().enumerate() {
                if value > 1 {
                    return Err(LayoutError::BadValue { row, col, value });
                }
                cells.push(value);
            }
        }
        Ok(Self {
            w: w as i32,
            h: matrix.len() as i32,
            cells,
            connect8,
        })
    }

    pub fn from_layout(layout: &StoreLayout) -> Result<Self, LayoutError> {
        layout.validate()?;
        Self::new(&layout.matrix, layout.connect8)
    }

    pub fn width(&self) -> i32 {
        self.w
    }

    pub fn height(&self) -> i32 {
        self.h
    }

    pub fn connect8(&self) -> bool {
        self.connect8
    }

    #[inline]
    pub fn contains(&self, c: Cell) -> bool {
        c.i >= 0 && c.i < self.h && c.j >= 0 && c.j < self.w
    }

    #[inline]
    pub fn is_walkable(&self, c: Cell) -> bool {
        self.contains(c) && self.cells[(c.i * self.w + c.j) as usize] == 1
    }

    /// Walkable neighbours of `c` with their step cost, in a fixed order.
    pub fn neighbors(&self, c: Cell) -> Vec<(Cell, f32)> {
        let dirs = if self.connect8 { &DIRS8[..] } else { &DIRS4[..] };
        let diag = std::f32::consts::SQRT_2;
        dirs.iter()
            .map(|&(di, dj)| (Cell { i: c.i + di, j: c.j + dj }, di != 0 && dj != 0))
            .filter(|(n, _)| self.is_walkable(*n))
            .map(|(n, is_diag)| (n, if is_diag { diag } else { 1.0 }))
            .collect()
    }

    /// True if `b` is one step away from `a` under this grid's adjacency rule.
    pub fn are_adjacent(&self, a: Cell, b: Cell) -> bool {
        let (di, dj) = ((a.i - b.i).abs(), (a.j - b.j).abs());
        if self.connect8 {
            di.max(dj) == 1
        } else {
            di + dj == 1
        }
    }

    /// True if every consecutive pair in `path` is adjacent.
    pub fn is_continuous(&self, path: &[Cell]) -> bool {
        path.windows(2).all(|w| self.are_adjacent(w[0], w[1]))
    }

    /// Shortest walkable path from `from` to `to`, both endpoints included.
    /// Empty when no path exists.
    pub fn shortest_path(&self, from: Cell, to: Cell) -> Vec<Cell> {
        astar_path(&self.cells, self.w, self.h, self.connect8, from, to).unwrap_or_default()
    }

    /// Cell under a pixel on a display where each cell is `cell_px` wide.
    pub fn cell_at_pixel(&self, pt: Pt, cell_px: i32) -> Option<Cell> {
        if cell_px <= 0 || pt.x < 0 || pt.y < 0 {
            return None;
        }
        let c = Cell { i: pt.y / cell_px, j: pt.x / cell_px };
        self.contains(c).then_some(c)
    }
}

/// Open-list entry. Ordered so the heap pops the lowest f first, then the
/// deepest g, then the lowest (row, col), which keeps results reproducible.
#[derive(Clone, Copy, Debug)]
struct Node {
    f: f32,
    g: f32,
    cell: Cell,
    parent: Option<usize>,
}

impl PartialEq for Node {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Node {}

impl PartialOrd for Node {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Node {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .f
            .total_cmp(&self.f)
            .then_with(|| self.g.total_cmp(&other.g))
            .then_with(|| other.cell.cmp(&self.cell))
    }
}

/// A* on a row-major occupancy slice (returns cells from start to goal).
///
/// All search bookkeeping lives in this call and is dropped on return, so
/// consecutive queries never see each other's markings.
pub fn astar_path(
    occupancy: &[u8],
    w: i32,
    h: i32,
    connect8: bool,
    start: Cell,
    goal: Cell,
) -> Option<Vec<Cell>> {
    let idx = |c: Cell| (c.i * w + c.j) as usize;
    let inside = |c: Cell| -> bool {
        c.i >= 0 && c.i < h && c.j >= 0 && c.j < w && occupancy.get(idx(c)) == Some(&1)
    };

    if !inside(start) || !inside(goal) {
        return None;
    }

    // Manhattan is exact for 4-connected moves, octile for 8-connected.
    let hfun = |a: Cell| -> f32 {
        let di = (a.i - goal.i).abs() as f32;
        let dj = (a.j - goal.j).abs() as f32;
        if connect8 {
            di.max(dj) + (std::f32::consts::SQRT_2 - 1.0) * di.min(dj)
        } else {
            di + dj
        }
    };

    let dirs = if connect8 { &DIRS8[..] } else { &DIRS4[..] };
    let n = (w * h) as usize;
    let mut came: Vec<Option<usize>> = vec![None; n];
    let mut bestg: Vec<f32> = vec![f32::INFINITY; n];
    let mut closed: Vec<bool> = vec![false; n];
    let mut open = BinaryHeap::new();

    bestg[idx(start)] = 0.0;
    open.push(Node { f: hfun(start), g: 0.0, cell: start, parent: None });

    let mut expanded = 0usize;
    while let Some(Node { g, cell, parent, .. }) = open.pop() {
        let key = idx(cell);
        if closed[key] {
            continue;
        }
        came[key] = parent;
        if cell == goal {
            trace!("astar {start} -> {goal}: expanded {expanded} nodes");
            let mut path = vec![cell];
            let mut cur = key;
            while let Some(p) = came[cur] {
                path.push(Cell { i: p as i32 / w, j: p as i32 % w });
                cur = p;
            }
            path.reverse();
            return Some(path);
        }
        closed[key] = true;
        expanded += 1;

        for &(di, dj) in dirs {
            let next = Cell { i: cell.i + di, j: cell.j + dj };
            if !inside(next) || closed[idx(next)] {
                continue;
            }
            let cost = if di != 0 && dj != 0 { std::f32::consts::SQRT_2 } else { 1.0 };
            let ng = g + cost;
            if ng < bestg[idx(next)] {
                bestg[idx(next)] = ng;
                open.push(Node { f: ng + hfun(next), g: ng, cell: next, parent: Some(key) });
            }
        }
    }
    None
}

/// Walking cost of a cell path (1 per orthogonal step, sqrt(2) per diagonal).
pub fn path_cost(path: &[Cell]) -> f32 {
    path.windows(2)
        .map(|w| hypot((w[1].i - w[0].i) as f32, (w[1].j - w[0].j) as f32))
        .sum()
}

/// Map cells to pixel centers
pub fn cell_centers(path: &[Cell], cell_px: i32) -> Vec<Pt> {
    path.iter()
        .map(|c| Pt {
            y: c.i * cell_px + cell_px / 2,
            x: c.j * cell_px + cell_px / 2,
        })
        .collect()
}

/// Convert a polyline to an SVG-compatible "points" string ("x,y x,y ...").
pub fn polyline_to_svg_points(pts: &[Pt]) -> String {
    pts.iter()
        .map(|p| format!("{},{}", p.x, p.y))
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::collections::VecDeque;

    fn store_grid() -> Grid {
        Grid::from_layout(&StoreLayout::default()).unwrap()
    }

    /// Plain BFS step count, the baseline A* must match on unit-cost grids.
    fn bfs_distance(grid: &Grid, from: Cell, to: Cell) -> Option<usize> {
        if !grid.is_walkable(from) || !grid.is_walkable(to) {
            return None;
        }
        let mut dist = vec![usize::MAX; (grid.width() * grid.height()) as usize];
        let key = |c: Cell| (c.i * grid.width() + c.j) as usize;
        let mut q = VecDeque::new();
        dist[key(from)] = 0;
        q.push_back(from);
        while let Some(c) = q.pop_front() {
            if c == to {
                return Some(dist[key(c)]);
            }
            for (n, _) in grid.neighbors(c) {
                if dist[key(n)] == usize::MAX {
                    dist[key(n)] = dist[key(c)] + 1;
                    q.push_back(n);
                }
            }
        }
        None
    }

    #[test]
    fn new_rejects_ragged_rows() {
        let err = Grid::new(&[vec![1, 1, 1], vec![1, 1]], false).unwrap_err();
        assert_eq!(err, LayoutError::Ragged { row: 1, expected: 3, found: 2 });
        assert_eq!(Grid::new(&[], false).unwrap_err(), LayoutError::Empty);
    }

    #[test]
    fn path_to_self_is_single_cell() {
        let grid = store_grid();
        let c = Cell::new(5, 2);
        assert_eq!(grid.shortest_path(c, c), vec![c]);
    }

    #[test]
    fn blocked_or_outside_endpoints_give_empty_path() {
        let grid = store_grid();
        assert!(grid.shortest_path(Cell::new(0, 0), Cell::new(3, 3)).is_empty());
        assert!(grid.shortest_path(Cell::new(2, 6), Cell::new(0, 0)).is_empty());
        assert!(grid.shortest_path(Cell::new(0, 0), Cell::new(10, 0)).is_empty());
        assert!(grid.shortest_path(Cell::new(-1, 0), Cell::new(0, 0)).is_empty());
    }

    #[test]
    fn walled_in_cell_is_unreachable() {
        let grid = Grid::new(
            &[
                vec![1, 1, 1, 1],
                vec![1, 1, 0, 0],
                vec![1, 1, 0, 1],
            ],
            false,
        )
        .unwrap();
        assert!(grid.shortest_path(Cell::new(0, 0), Cell::new(2, 3)).is_empty());
        // a diagonal gap is enough once corners can be cut
        let grid8 = Grid::new(
            &[
                vec![1, 1, 1, 1],
                vec![1, 1, 1, 0],
                vec![1, 1, 0, 1],
            ],
            true,
        )
        .unwrap();
        let path = grid8.shortest_path(Cell::new(0, 0), Cell::new(2, 3));
        assert_eq!(path.last(), Some(&Cell::new(2, 3)));
        assert!(grid8.is_continuous(&path));
    }

    #[test]
    fn store_paths_go_around_the_aisles() {
        let grid = store_grid();
        // P1 -> end has to leave the aisle gap at the top
        let path = grid.shortest_path(Cell::new(5, 2), Cell::new(0, 9));
        assert_eq!(path.len(), 13);
        assert_eq!(path.first(), Some(&Cell::new(5, 2)));
        assert_eq!(path.last(), Some(&Cell::new(0, 9)));
        assert!(path.iter().all(|&c| grid.is_walkable(c)));
        assert!(grid.is_continuous(&path));

        // P2 sits between the aisles; reaching P3 means going over or under one
        let path = grid.shortest_path(Cell::new(3, 4), Cell::new(5, 7));
        assert_eq!(path.len() - 1, bfs_distance(&grid, Cell::new(3, 4), Cell::new(5, 7)).unwrap());
        assert_eq!(path.len(), 10);
    }

    #[test]
    fn diagonal_moves_shorten_open_floor() {
        let open = vec![vec![1u8; 5]; 5];
        let grid4 = Grid::new(&open, false).unwrap();
        let grid8 = Grid::new(&open, true).unwrap();
        let (a, b) = (Cell::new(0, 0), Cell::new(4, 4));
        assert_eq!(grid4.shortest_path(a, b).len(), 9);
        let diag = grid8.shortest_path(a, b);
        assert_eq!(diag.len(), 5);
        assert!((path_cost(&diag) - 4.0 * std::f32::consts::SQRT_2).abs() < 1e-4);
    }

    #[test]
    fn repeated_queries_are_identical() {
        let grid = store_grid();
        let nodes = StoreLayout::default().nodes();
        for (_, a) in nodes {
            for (_, b) in nodes {
                assert_eq!(grid.shortest_path(a, b), grid.shortest_path(a, b));
            }
        }
    }

    #[test]
    fn pixel_helpers_use_cell_centers() {
        let grid = store_grid();
        let pts = cell_centers(&[Cell::new(0, 0), Cell::new(0, 1), Cell::new(2, 1)], 100);
        assert_eq!(pts, vec![Pt { x: 50, y: 50 }, Pt { x: 150, y: 50 }, Pt { x: 150, y: 250 }]);
        assert_eq!(polyline_to_svg_points(&pts), "50,50 150,50 150,250");
        assert_eq!(polyline_to_svg_points(&[]), "");

        assert_eq!(grid.cell_at_pixel(Pt { x: 199, y: 0 }, 100), Some(Cell::new(0, 1)));
        assert_eq!(grid.cell_at_pixel(Pt { x: 999, y: 999 }, 100), Some(Cell::new(9, 9)));
        assert_eq!(grid.cell_at_pixel(Pt { x: 1000, y: 5 }, 100), None);
        assert_eq!(grid.cell_at_pixel(Pt { x: -1, y: 5 }, 100), None);
    }

    fn arb_grid() -> impl Strategy<Value = (Grid, Cell, Cell)> {
        (
            prop::collection::vec(prop::bool::weighted(0.7), 64),
            0i32..8,
            0i32..8,
            0i32..8,
            0i32..8,
        )
            .prop_map(|(bits, si, sj, gi, gj)| {
                let matrix: Vec<Vec<u8>> =
                    bits.chunks(8).map(|r| r.iter().map(|&b| b as u8).collect()).collect();
                (Grid::new(&matrix, false).unwrap(), Cell::new(si, sj), Cell::new(gi, gj))
            })
    }

    proptest! {
        #[test]
        fn astar_matches_bfs_distance((grid, from, to) in arb_grid()) {
            let path = grid.shortest_path(from, to);
            match bfs_distance(&grid, from, to) {
                None => prop_assert!(path.is_empty()),
                Some(d) => {
                    prop_assert_eq!(path.len(), d + 1);
                    prop_assert_eq!(path.first(), Some(&from));
                    prop_assert_eq!(path.last(), Some(&to));
                    prop_assert!(grid.is_continuous(&path));
                    prop_assert!(path.iter().all(|&c| grid.is_walkable(c)));
                }
            }
        }

        #[test]
        fn astar_is_deterministic((grid, from, to) in arb_grid()) {
            prop_assert_eq!(grid.shortest_path(from, to), grid.shortest_path(from, to));
        }
    }
}
