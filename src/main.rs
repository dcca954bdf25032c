use clap::Parser;
use serde::Serialize;
use std::path::PathBuf;
use tzgrid::encoder::{SHORTCUT_ADDRESSES_SIZE, SHORTCUT_COUNTS_SIZE};
use tzgrid::zones::ZoneNameTable;
use tzgrid::{Cell, TimezoneData};

/// Inspects a compiled timezone shortcut asset.
#[derive(Parser, Debug)]
#[command(name = "tzgrid", version, about)]
struct Args {
    /// Asset file
    #[arg(default_value = "timezone_data.bin")]
    asset: PathBuf,

    /// Zone catalog, for printing zone names
    #[arg(long)]
    names: Option<PathBuf>,

    /// Print one polygon
    #[arg(long)]
    polygon: Option<usize>,

    /// Print the polygons registered in a cell, given as COLUMN,ROW
    #[arg(long, value_parser = parse_pair::<u16>)]
    cell: Option<(u16, u16)>,

    /// Print the candidate polygons of the cell containing LNG,LAT
    #[arg(long, value_parser = parse_pair::<f64>, allow_hyphen_values = true)]
    at: Option<(f64, f64)>,

    /// Print polygons as JSON
    #[arg(long)]
    json: bool,
}

#[derive(Serialize)]
struct PolygonSummary<'a> {
    id: usize,
    zone_id: u16,
    zone: Option<&'a str>,
    points: usize,
    boundary: tzgrid::types::Boundary,
}

fn parse_pair<T: std::str::FromStr>(value: &str) -> Result<(T, T), String> {
    let (a, b) = value
        .split_once(',')
        .ok_or_else(|| format!("expected two comma separated values, got {:?}", value))?;
    let parse = |s: &str| {
        s.trim()
            .parse::<T>()
            .map_err(|_| format!("invalid number {:?}", s))
    };
    Ok((parse(a)?, parse(b)?))
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    tzgrid::init_tracing(0);

    let size = std::fs::metadata(&args.asset)?.len();
    let data = TimezoneData::open(&args.asset)?;
    let zones = args.names.as_ref().map(ZoneNameTable::read_from).transpose()?;
    let zone_name = |id: u16| zones.as_ref().and_then(|z| z.name(id));

    println!("{}", args.asset.display());
    println!("  Polygons: {}", data.polygon_count());
    println!("  Size: {} bytes", size);
    println!("  Polygon Section: {} bytes", data.shortcut_start());
    println!(
        "  Shortcut Tables: {} bytes",
        SHORTCUT_COUNTS_SIZE + SHORTCUT_ADDRESSES_SIZE
    );
    println!("  Id Lists: {} bytes", 2 * data.total_entries());
    println!("  Filled Cells: {}", data.filled_cells());
    println!("  Shortcut Entries: {}", data.total_entries());
    if let Some(zones) = &zones {
        println!("  Zones: {}", zones.len());
    }

    if let Some(id) = args.polygon {
        let (Some(zone_id), Some(boundary)) = (data.zone_id(id), data.boundary(id)) else {
            println!("No polygon {}", id);
            return Ok(());
        };
        let summary = PolygonSummary {
            id,
            zone_id,
            zone: zone_name(zone_id),
            points: data.coordinates(id).map_or(0, |(xs, _)| xs.len()),
            boundary,
        };
        if args.json {
            println!("{}", serde_json::to_string_pretty(&summary)?);
        } else {
            println!("Polygon {}", summary.id);
            println!("  Zone: {} ({})", summary.zone.unwrap_or("?"), summary.zone_id);
            println!("  Points: {}", summary.points);
            println!(
                "  Bounds: lng {} .. {}, lat {} .. {}",
                tzgrid::types::int_to_coord(boundary.xmin),
                tzgrid::types::int_to_coord(boundary.xmax),
                tzgrid::types::int_to_coord(boundary.ymin),
                tzgrid::types::int_to_coord(boundary.ymax)
            );
        }
    }

    let cell = match (args.cell, args.at) {
        (Some((column, row)), _) => Some(Cell::clamped(column as i64, row as i64)),
        (None, Some((lng, lat))) => Some(Cell::containing(lng, lat)),
        (None, None) => None,
    };
    if let Some(cell) = cell {
        let ids = data.shortcut(cell);
        println!("Cell ({}, {}): {} polygons", cell.column, cell.row, ids.len());
        for &id in ids {
            let zone_id = data.zone_id(id as usize).unwrap_or_default();
            println!("  {} -> {} ({})", id, zone_name(zone_id).unwrap_or("?"), zone_id);
        }
    }

    Ok(())
}
