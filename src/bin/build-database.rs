use clap::Parser;
use std::path::PathBuf;
use tzgrid::{BuildOptions, Builder};

/// Compiles timezone polygons into the binary shortcut asset.
#[derive(Parser, Debug)]
#[command(name = "build-database", version, about)]
struct Args {
    /// GeoJSON source: .json/.geojson file, .zip archive, or an http(s) URL when built with
    /// the `download` feature
    #[arg(env = "TZGRID_INPUT")]
    input: String,

    /// Asset file to write
    #[arg(short, long, env = "TZGRID_OUTPUT", default_value = "timezone_data.bin")]
    output: PathBuf,

    /// Zone catalog file to write next to the asset
    #[arg(long, default_value = "timezone_names.bin")]
    names: PathBuf,

    /// Do not write a zone catalog
    #[arg(long, conflicts_with = "names")]
    no_names: bool,

    /// Worker threads for the shortcut computation
    #[arg(long, env = "TZGRID_THREADS")]
    threads: Option<usize>,

    /// Decode the asset again and compare it with the build before writing
    #[arg(long)]
    verify: bool,

    /// More log output (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    tzgrid::init_tracing(args.verbose);

    println!("Building database to: {}", args.output.display());

    let options = BuildOptions {
        input: args.input,
        output: args.output,
        catalog: (!args.no_names).then_some(args.names),
        threads: args.threads,
        verify: args.verify,
    };
    let summary = Builder::new(options).build()?;

    println!(
        "Database built successfully! {} polygons, {} zones, {} filled cells, {} bytes",
        summary.polygons, summary.zones, summary.stats.filled_cells, summary.bytes
    );
    Ok(())
}
