//! Multi-waypoint route composition over the fixed store nodes.
//!
//! A route always runs start -> (active waypoints in P1, P2, P3 order) -> end.
//! Every leg is one precomputed shortest-path segment; legs are stitched so
//! the joint cell between two segments appears once.

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use log::{debug, warn};

use crate::{path_cost, ActiveSet, Cell, Grid, LayoutError, StoreLayout};

pub type Route = Vec<Cell>;

/// One of the five fixed nodes a route can pass through.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Stop {
    Start,
    P1,
    P2,
    P3,
    End,
}

impl fmt::Display for Stop {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Stop::Start => "start",
            Stop::P1 => "P1",
            Stop::P2 => "P2",
            Stop::P3 => "P3",
            Stop::End => "end",
        };
        f.write_str(s)
    }
}

/// Every leg any combination of active waypoints can need.
pub const CANDIDATE_LEGS: [(Stop, Stop); 10] = [
    (Stop::Start, Stop::P1),
    (Stop::Start, Stop::P2),
    (Stop::Start, Stop::P3),
    (Stop::P1, Stop::P2),
    (Stop::P1, Stop::P3),
    (Stop::P2, Stop::P3),
    (Stop::P1, Stop::End),
    (Stop::P2, Stop::End),
    (Stop::P3, Stop::End),
    (Stop::Start, Stop::End),
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteError {
    /// No walkable path joins two stops the active set requires.
    Unreachable { from: Cell, to: Cell },
    /// A leg outside `CANDIDATE_LEGS` was asked for.
    UnknownLeg { from: Stop, to: Stop },
}

impl fmt::Display for RouteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RouteError::Unreachable { from, to } => {
                write!(f, "no walkable path from {from} to {to}")
            }
            RouteError::UnknownLeg { from, to } => {
                write!(f, "leg {from} -> {to} was never computed")
            }
        }
    }
}

impl std::error::Error for RouteError {}

/// Shortest paths for every candidate leg, computed once per grid.
#[derive(Debug, Clone)]
pub struct SegmentTable {
    nodes: [Cell; 5],
    paths: BTreeMap<(Stop, Stop), Option<Vec<Cell>>>,
}

impl SegmentTable {
    pub fn compute(grid: &Grid, layout: &StoreLayout) -> Self {
        let nodes = [
            layout.start,
            layout.waypoints[0],
            layout.waypoints[1],
            layout.waypoints[2],
            layout.end,
        ];
        let mut table = Self { nodes, paths: BTreeMap::new() };
        for (a, b) in CANDIDATE_LEGS {
            let path = grid.shortest_path(table.cell(a), table.cell(b));
            if path.is_empty() {
                warn!("no path for leg {a} {} -> {b} {}", table.cell(a), table.cell(b));
                table.paths.insert((a, b), None);
            } else {
                debug!("leg {a} -> {b}: {} cells, cost {:.2}", path.len(), path_cost(&path));
                table.paths.insert((a, b), Some(path));
            }
        }
        table
    }

    pub fn cell(&self, stop: Stop) -> Cell {
        self.nodes[stop as usize]
    }

    pub fn segment(&self, from: Stop, to: Stop) -> Result<&[Cell], RouteError> {
        match self.paths.get(&(from, to)) {
            Some(Some(path)) => Ok(path.as_slice()),
            Some(None) => Err(RouteError::Unreachable { from: self.cell(from), to: self.cell(to) }),
            None => Err(RouteError::UnknownLeg { from, to }),
        }
    }
}

/// Stops visited for an active set: start, the active waypoints in order, end.
pub fn stops_for(active: ActiveSet) -> Vec<Stop> {
    let mut stops = vec![Stop::Start];
    for (on, stop) in active.as_array().into_iter().zip([Stop::P1, Stop::P2, Stop::P3]) {
        if on {
            stops.push(stop);
        }
    }
    stops.push(Stop::End);
    stops
}

/// Consecutive legs for an active set.
///
/// With nothing active this is the single direct leg start -> end.
pub fn legs_for(active: ActiveSet) -> Vec<(Stop, Stop)> {
    stops_for(active).windows(2).map(|w| (w[0], w[1])).collect()
}

/// Stitch the legs for `active` into one route.
///
/// Fails with the first leg that has no path instead of leaving a gap.
pub fn compose_route(table: &SegmentTable, active: ActiveSet) -> Result<Route, RouteError> {
    let mut full: Route = Vec::new();
    for (a, b) in legs_for(active) {
        let seg = table.segment(a, b)?;
        if full.is_empty() {
            full.extend_from_slice(seg);
        } else {
            // skip duplicate join point at seg[0]
            full.extend_from_slice(&seg[1..]);
        }
    }
    Ok(full)
}

/// Composed routes keyed on the active set.
#[derive(Debug, Default)]
pub struct RouteCache {
    cache: HashMap<ActiveSet, Result<Route, RouteError>>,
}

impl RouteCache {
    pub fn new() -> Self {
        Self { cache: HashMap::new() }
    }

    pub fn get(&self, active: ActiveSet) -> Option<&Result<Route, RouteError>> {
        self.cache.get(&active)
    }

    pub fn get_or_insert_with<F>(&mut self, active: ActiveSet, f: F) -> &Result<Route, RouteError>
    where
        F: FnOnce() -> Result<Route, RouteError>,
    {
        self.cache.entry(active).or_insert_with(f)
    }

    pub fn clear(&mut self) {
        self.cache.clear();
    }

    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }
}

/// Grid, precomputed segments and the route cache for one store layout.
#[derive(Debug)]
pub struct RoutePlanner {
    grid: Grid,
    table: SegmentTable,
    cache: RouteCache,
}

impl RoutePlanner {
    pub fn new(layout: &StoreLayout) -> Result<Self, LayoutError> {
        let grid = Grid::from_layout(layout)?;
        let table = SegmentTable::compute(&grid, layout);
        Ok(Self { grid, table, cache: RouteCache::new() })
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn segments(&self) -> &SegmentTable {
        &self.table
    }

    pub fn cache(&self) -> &RouteCache {
        &self.cache
    }

    /// Route for `active`, composed on first request and served from the cache after.
    pub fn route(&mut self, active: ActiveSet) -> Result<&[Cell], RouteError> {
        let table = &self.table;
        match self.cache.get_or_insert_with(active, || compose_route(table, active)) {
            Ok(route) => Ok(route.as_slice()),
            Err(e) => Err(e.clone()),
        }
    }

    /// Drop cached routes, e.g. after a new barcode was scanned.
    pub fn invalidate(&mut self) {
        self.cache.clear();
    }
}
