//! Scan-then-guide application state, driven one event at a time.

use std::mem;

use log::{info, warn};
use pathfinding::{cell_centers, ActiveSet, Cell, LayoutError, Pt, RouteError, RoutePlanner, StoreLayout};

use crate::barcode::{Barcode, BARCODE_LEN};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Screen {
    /// Collecting barcode digits.
    Input { buffer: String },
    /// Showing the route for a scanned code.
    Path { barcode: Barcode, active: ActiveSet },
    Closed,
}

impl Default for Screen {
    fn default() -> Self {
        Screen::Input { buffer: String::new() }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    /// A keystroke from the keyboard or scanner.
    Key(char),
    /// Start over with an empty code.
    Rescan,
    Quit,
}

/// Next screen after `event`. Non-digit keys are ignored while scanning.
pub fn transition(screen: Screen, event: &Event) -> Screen {
    match (screen, event) {
        (_, Event::Quit) | (Screen::Closed, _) => Screen::Closed,
        (Screen::Input { mut buffer }, Event::Key(ch)) if ch.is_ascii_digit() => {
            buffer.push(*ch);
            if buffer.len() < BARCODE_LEN {
                return Screen::Input { buffer };
            }
            match Barcode::parse(&buffer) {
                Ok(barcode) => Screen::Path { barcode, active: barcode.active_set() },
                Err(e) => {
                    warn!("discarding scanned code {buffer:?}: {e}");
                    Screen::default()
                }
            }
        }
        (Screen::Input { .. } | Screen::Path { .. }, Event::Rescan) => Screen::default(),
        (screen, _) => screen,
    }
}

/// Current screen plus the planner serving routes for it.
#[derive(Debug)]
pub struct App {
    screen: Screen,
    planner: RoutePlanner,
    cell_px: i32,
}

impl App {
    pub fn new(layout: &StoreLayout) -> Result<Self, LayoutError> {
        Ok(Self {
            screen: Screen::default(),
            planner: RoutePlanner::new(layout)?,
            cell_px: layout.cell_px,
        })
    }

    pub fn screen(&self) -> &Screen {
        &self.screen
    }

    pub fn planner(&self) -> &RoutePlanner {
        &self.planner
    }

    pub fn is_closed(&self) -> bool {
        self.screen == Screen::Closed
    }

    pub fn handle(&mut self, event: Event) {
        let prev = mem::take(&mut self.screen);
        let was_path = matches!(prev, Screen::Path { .. });
        self.screen = transition(prev, &event);
        match &self.screen {
            Screen::Path { barcode, active } if !was_path => {
                info!("scanned {barcode}: active waypoints {:?}", active.as_array());
                self.planner.invalidate();
            }
            Screen::Input { .. } if was_path => info!("waiting for a new barcode"),
            Screen::Closed if event == Event::Quit => info!("closing"),
            _ => {}
        }
    }

    /// Route to draw this frame; `None` until a barcode has been scanned.
    pub fn frame(&mut self) -> Option<Result<&[Cell], RouteError>> {
        let active = match &self.screen {
            Screen::Path { active, .. } => *active,
            _ => return None,
        };
        Some(self.planner.route(active))
    }

    /// This frame's route as pixel centers for a line renderer.
    pub fn frame_polyline(&mut self) -> Option<Result<Vec<Pt>, RouteError>> {
        let cell_px = self.cell_px;
        self.frame().map(|r| r.map(|route| cell_centers(route, cell_px)))
    }

    /// Cell under the pointer, for highlighting.
    pub fn hovered_cell(&self, pt: Pt) -> Option<Cell> {
        self.planner.grid().cell_at_pixel(pt, self.cell_px)
    }
}
