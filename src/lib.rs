//! Compiles timezone boundary polygons into a compact binary shortcut asset.
//!
//! `tzgrid` turns a catalog of timezone polygons (a GeoJSON export such as tz_world or
//! timezone-boundary-builder) into a single fixed-layout binary file. A lookup engine reads
//! that file and answers "which timezone contains (lng, lat)?" by testing only the few
//! polygons registered in the grid cell of the query point.
//!
//! # Features
//!
//! - **Fixed-Point Coordinates** - degrees × 10^7 stored as `i32` (~1 cm at the equator)
//! - **Shortcut Grid** - 360 × 360 cells, one column per degree of longitude, two rows per
//!   degree of latitude
//! - **Exact Cells for Large Zones** - big polygons are cut along grid lines so they are
//!   only registered where they actually are, not in their whole bounding box
//! - **Checked Layout** - every address is computed up front and compared with the real
//!   write position; any mismatch aborts the build
//! - **Parallel** - per-polygon shortcut computation runs on a rayon pool, output stays
//!   byte-identical
//!
//! # Quick Start
//!
//! ```no_run
//! # fn main() -> Result<(), tzgrid::Error> {
//! let summary = tzgrid::compile_file("combined.json", "timezone_data.bin")?;
//! println!("{} polygons in {} bytes", summary.polygons, summary.bytes);
//! # Ok(())
//! # }
//! ```
//!
//! Or from the command line:
//!
//! ```text
//! cargo run --release --bin build-database -- combined.json -o timezone_data.bin --verify
//! cargo run --release -- timezone_data.bin --names timezone_names.bin --at 13.40,52.52
//! ```
//!
//! # In-Memory Builds
//!
//! ```
//! use tzgrid::source::SourceRecord;
//!
//! let records = vec![SourceRecord {
//!     zone: "Europe/Berlin".to_string(),
//!     coords: vec![13.0, 52.0, 14.0, 52.0, 14.0, 53.0],
//! }];
//! let compiled = tzgrid::compile(records, None).unwrap();
//! compiled.verify().unwrap();
//!
//! let data = tzgrid::TimezoneData::from_bytes(&compiled.bytes).unwrap();
//! let cell = tzgrid::Cell::containing(13.5, 52.4);
//! assert_eq!(data.shortcut(cell), &[0]);
//! assert_eq!(compiled.zones.name(data.zone_id(0).unwrap()), Some("Europe/Berlin"));
//! ```
//!
//! # Build Phases
//!
//! 1. Parse source rings into a [`store::PolygonStore`]
//! 2. Sort and deduplicate zone names, assign zone ids ([`zones::ZoneNameTable`])
//! 3. Compute the shortcut cells of every polygon ([`ShortcutIndex`])
//! 4. Encode the asset ([`encoder`]) and optionally decode it again for verification
//!
//! Each phase consumes the output of the previous one; there is no way to add polygons
//! after zone ids are assigned.
//!
//! # Errors
//!
//! Every error is fatal and the asset file is only written once encoding has succeeded.
//! See [`Error`] for the kinds.
//!
//! # Modules
//!
//! - [`types`] - Fixed-point coordinates, grid constants, [`Cell`], [`PolygonRecord`]
//! - [`geometry`] - Point-in-polygon and grid-line intersections
//! - [`shortcuts`] - Shortcut index construction
//! - [`encoder`] - Binary layout and writer
//! - [`reader`] - Decoder for compiled assets
//! - [`source`] - GeoJSON / zip / download loading

#![warn(missing_docs)]

mod builder;
pub mod encoder;
mod error;
pub mod geometry;
pub mod reader;
pub mod shortcuts;
pub mod source;
pub mod store;
pub mod types;
pub mod zones;

pub use builder::{compile, BuildOptions, BuildSummary, Builder, CompiledAsset};
pub use error::{Error, Result};
pub use reader::TimezoneData;
pub use shortcuts::ShortcutIndex;
pub use types::{Cell, PolygonRecord};

/// Compiles a source file into an asset file with default options.
///
/// Equivalent to [`Builder::build`] with [`BuildOptions::new`]; no zone catalog is written.
pub fn compile_file(
    input: impl Into<String>,
    output: impl Into<std::path::PathBuf>,
) -> Result<BuildSummary> {
    Builder::new(BuildOptions::new(input, output)).build()
}

/// Installs the `tracing` subscriber used by the binaries.
///
/// `RUST_LOG` wins over `verbosity` (0 = info, 1 = debug, more = trace).
pub fn init_tracing(verbosity: u8) {
    let default = match verbosity {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}
