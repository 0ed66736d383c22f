use std::error::Error;
use std::io::{self, BufRead};
use std::path::PathBuf;

use clap::Parser;
use log::{debug, info};
use simplelog::{Config, LevelFilter, SimpleLogger};

use freshchoice_scout::{parse_layout, route_report, App, Barcode, Event, Screen};
use pathfinding::{cell_centers, polyline_to_svg_points, StoreLayout};

/// Guide a shopper from the entrance to the scanned products and out again.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// 6-digit product code; read from stdin when omitted
    #[arg(long)]
    barcode: Option<String>,
    /// Store layout JSON (defaults to the FreshChoice floor)
    #[arg(long)]
    layout: Option<PathBuf>,
    /// Log every computed segment
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();
    let level = if args.verbose { LevelFilter::Debug } else { LevelFilter::Info };
    SimpleLogger::init(level, Config::default())?;

    //LOAD LAYOUT ======================================================
    let layout = match &args.layout {
        Some(path) => {
            info!("Reading store layout from {}", path.display());
            parse_layout(&std::fs::read_to_string(path)?)?
        }
        None => {
            info!("Using the built-in FreshChoice layout");
            StoreLayout::default()
        }
    };
    debug!("Layout is {}x{}, connect8={}", layout.height(), layout.width(), layout.connect8);

    //PLANNER =========================================================
    info!("Computing segments between the fixed store nodes");
    let mut app = App::new(&layout)?;

    //SCAN ============================================================
    match &args.barcode {
        Some(code) => {
            if let Err(e) = Barcode::parse(code) {
                println!("Invalid barcode: {e}");
                return Ok(());
            }
            for ch in code.chars() {
                app.handle(Event::Key(ch));
            }
        }
        None => {
            println!("Please scan the barcode");
            for line in io::stdin().lock().lines() {
                for ch in line?.chars() {
                    app.handle(Event::Key(ch));
                }
                if !matches!(app.screen(), Screen::Input { .. }) {
                    break;
                }
            }
        }
    }

    let (barcode, active) = match app.screen() {
        Screen::Path { barcode, active } => (*barcode, *active),
        _ => {
            println!("No barcode scanned.");
            return Ok(());
        }
    };

    //ROUTE ===========================================================
    info!("Composing route for {barcode}");
    let route = match app.frame() {
        Some(Ok(route)) => route.to_vec(),
        Some(Err(e)) => {
            println!("No route: {e}");
            return Ok(());
        }
        None => return Ok(()),
    };

    println!("Polyline: {}", polyline_to_svg_points(&cell_centers(&route, layout.cell_px)));
    println!("{}", route_report(&barcode, active, &route, layout.cell_px));

    app.handle(Event::Quit);
    Ok(())
}
