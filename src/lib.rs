use std::error::Error;

use wasm_bindgen::prelude::*;
use serde_json::Value;
use web_sys::console;
use pathfinding::{cell_centers, polyline_to_svg_points, ActiveSet, Cell, RoutePlanner, StoreLayout};

pub mod app;
pub mod barcode;

pub use app::{transition, App, Event, Screen};
pub use barcode::{process_barcode, Barcode, BarcodeError, BARCODE_LEN};

#[wasm_bindgen(start)]
pub fn start() {
    // Better panic messages in dev builds
    #[cfg(debug_assertions)]
    console_error_panic_hook::set_once();
    console::log_1(&"freshchoice_scout wasm loaded".into());
}

/// Entry point you call from JS:
/// - `barcode` = the 6 scanned digits
/// - `layout` = optional store layout JSON; the FreshChoice floor when absent
/// Returns the JSON produced by [`route_json`].
#[wasm_bindgen]
pub fn route_entry(barcode: String, layout: Option<String>) -> Result<String, JsValue> {
    let layout = match layout {
        Some(json) => parse_layout(&json)
            .map_err(|e| JsValue::from_str(&format!("invalid layout: {e}")))?,
        None => StoreLayout::default(),
    };
    route_json(&barcode, &layout).map_err(|e| JsValue::from_str(&format!("route failed: {e}")))
}

/// Parse and validate a store layout; missing fields fall back to the FreshChoice floor.
pub fn parse_layout(json: &str) -> Result<StoreLayout, Box<dyn Error>> {
    let layout: StoreLayout = serde_json::from_str(json)?;
    layout.validate()?;
    Ok(layout)
}

/// `{ barcode, active: [b,b,b], cells: [[i,j],...], polyline: "x,y x,y ..." }`
pub fn route_report(barcode: &Barcode, active: ActiveSet, route: &[Cell], cell_px: i32) -> Value {
    let cells: Vec<[i32; 2]> = route.iter().map(|c| [c.i, c.j]).collect();
    let polyline = polyline_to_svg_points(&cell_centers(route, cell_px));
    serde_json::json!({
        "barcode": barcode.to_string(),
        "active": active.as_array(),
        "cells": cells,
        "polyline": polyline,
    })
}

/// Validate `barcode`, compose the route on `layout` and serialize it.
pub fn route_json(barcode: &str, layout: &StoreLayout) -> Result<String, Box<dyn Error>> {
    let code = Barcode::parse(barcode)?;
    let active = code.active_set();
    let mut planner = RoutePlanner::new(layout)?;
    let route = planner.route(active)?;
    Ok(route_report(&code, active, route, layout.cell_px).to_string())
}
