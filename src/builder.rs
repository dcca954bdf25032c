//! Build pipeline: options, in-memory compilation and the file-writing driver.

use crate::encoder::encode_to_vec;
use crate::error::{Error, Result};
use crate::reader::TimezoneData;
use crate::shortcuts::{IndexStats, ShortcutIndex};
use crate::source::{self, SourceRecord};
use crate::store::PolygonStore;
use crate::types::{Cell, PolygonRecord, CELL_COUNT};
use crate::zones::ZoneNameTable;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tempfile::NamedTempFile;
use tracing::info;

/// Settings of one build.
#[derive(Debug, Clone)]
pub struct BuildOptions {
    /// Source path (`.json`, `.geojson`, `.zip`) or URL
    pub input: String,
    /// Asset file to write
    pub output: PathBuf,
    /// Where to write the zone catalog; `None` skips it
    pub catalog: Option<PathBuf>,
    /// Worker threads for the shortcut computation; `None` uses rayon's default
    pub threads: Option<usize>,
    /// Decode the encoded asset and compare it with the in-memory build before writing
    pub verify: bool,
}

impl BuildOptions {
    /// Options with no catalog, default threads and no verification.
    pub fn new(input: impl Into<String>, output: impl Into<PathBuf>) -> Self {
        Self {
            input: input.into(),
            output: output.into(),
            catalog: None,
            threads: None,
            verify: false,
        }
    }
}

/// What a finished build produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildSummary {
    /// Polygons in the asset
    pub polygons: usize,
    /// Distinct zone names
    pub zones: usize,
    /// Asset size in bytes
    pub bytes: u64,
    /// Shortcut index numbers
    pub stats: IndexStats,
}

/// A fully encoded build, still in memory.
#[derive(Debug, Clone)]
pub struct CompiledAsset {
    /// Sorted zone names referenced by the polygons
    pub zones: ZoneNameTable,
    /// Polygons in asset order
    pub polygons: Vec<PolygonRecord>,
    /// Cell to polygon-id mapping
    pub index: ShortcutIndex,
    /// Encoded asset
    pub bytes: Vec<u8>,
}

impl CompiledAsset {
    /// Counts describing the asset.
    pub fn summary(&self) -> BuildSummary {
        BuildSummary {
            polygons: self.polygons.len(),
            zones: self.zones.len(),
            bytes: self.bytes.len() as u64,
            stats: self.index.stats(),
        }
    }

    /// Decodes the encoded bytes and compares them with the in-memory build.
    pub fn verify(&self) -> Result<()> {
        let decoded = TimezoneData::from_bytes(&self.bytes)?;
        if decoded.polygon_count() != self.polygons.len() {
            return Err(Error::corrupt(format!(
                "decoded {} polygons, built {}",
                decoded.polygon_count(),
                self.polygons.len()
            )));
        }
        for (i, polygon) in self.polygons.iter().enumerate() {
            let same = decoded.zone_id(i) == Some(polygon.zone_id)
                && decoded.boundary(i) == Some(polygon.boundary)
                && decoded.coordinates(i) == Some((&polygon.xs[..], &polygon.ys[..]));
            if !same {
                return Err(Error::corrupt(format!("polygon {} differs after decoding", i)));
            }
        }
        for idx in 0..CELL_COUNT {
            let cell = Cell::from_index(idx);
            if decoded.shortcut(cell) != self.index.get(cell) {
                return Err(Error::corrupt(format!(
                    "cell ({}, {}) differs after decoding",
                    cell.column, cell.row
                )));
            }
        }
        info!("verified {} polygons and {} cells", self.polygons.len(), CELL_COUNT);
        Ok(())
    }
}

/// Runs the build phases in order: parse, assign zone ids, build the index, encode.
///
/// Nothing is written to disk; see [`Builder::build`] for the file-writing variant.
pub fn compile<I>(records: I, threads: Option<usize>) -> Result<CompiledAsset>
where
    I: IntoIterator<Item = SourceRecord>,
{
    let mut store = PolygonStore::new();
    for record in records {
        store.push_flat(&record.zone, &record.coords)?;
    }

    let zoned = store.assign_zone_ids()?;
    zoned.zones.warn_unknown();

    let start = Instant::now();
    let index = build_index(&zoned.polygons, threads)?;
    info!("computing the shortcuts took {:?}", start.elapsed());

    let bytes = encode_to_vec(&zoned.polygons, &index)?;
    Ok(CompiledAsset {
        zones: zoned.zones,
        polygons: zoned.polygons,
        index,
        bytes,
    })
}

fn build_index(polygons: &[PolygonRecord], threads: Option<usize>) -> Result<ShortcutIndex> {
    match threads {
        Some(threads) => rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build()
            .map_err(|e| Error::config(format!("cannot start {} worker threads: {}", threads, e)))?
            .install(|| ShortcutIndex::build(polygons)),
        None => ShortcutIndex::build(polygons),
    }
}

/// Writes `bytes` to a temporary file in the directory of `path`.
///
/// Dropping the handle removes the file; [`NamedTempFile::persist`] renames it into place.
fn stage(path: &Path, bytes: &[u8]) -> Result<NamedTempFile> {
    let dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    let mut file = NamedTempFile::new_in(dir)?;
    file.write_all(bytes)?;
    file.flush()?;
    Ok(file)
}

/// File-to-file build driver.
pub struct Builder {
    options: BuildOptions,
}

impl Builder {
    /// Constructs a builder for the given options.
    pub fn new(options: BuildOptions) -> Self {
        Self { options }
    }

    /// Loads the source, compiles it and writes the asset (and catalog).
    ///
    /// Both files are encoded in memory and staged next to their targets before either is
    /// renamed into place, so a failed build leaves no output file behind.
    pub fn build(&self) -> Result<BuildSummary> {
        info!("loading polygons from {}", self.options.input);
        let records = source::load(&self.options.input)?;

        let compiled = compile(records, self.options.threads)?;
        if self.options.verify {
            compiled.verify()?;
        }

        let output = &self.options.output;
        let asset = stage(output, &compiled.bytes)?;
        let catalog = match &self.options.catalog {
            Some(path) => Some((path, stage(path, &compiled.zones.encode()?)?)),
            None => None,
        };

        info!("writing {}", output.display());
        asset.persist(output).map_err(|e| e.error)?;
        if let Some((path, file)) = catalog {
            info!("writing zone catalog {}", path.display());
            if let Err(err) = file.persist(path) {
                // an asset without its matching catalog must not stay behind
                let _ = std::fs::remove_file(output);
                return Err(err.error.into());
            }
        }

        let summary = compiled.summary();
        info!(
            "done: {} polygons, {} zones, {} bytes",
            summary.polygons, summary.zones, summary.bytes
        );
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(zone: &str, coords: &[f64]) -> SourceRecord {
        SourceRecord {
            zone: zone.to_string(),
            coords: coords.to_vec(),
        }
    }

    #[test]
    fn compiled_asset_verifies() {
        let records = vec![
            record("Zone/A", &[0.1, 0.1, 0.2, 0.1, 0.2, 0.2]),
            record("Zone/B", &[5.0, 5.0, 12.0, 5.0, 12.0, 9.0, 5.0, 9.0]),
        ];
        let compiled = compile(records, Some(2)).unwrap();
        compiled.verify().unwrap();
        let summary = compiled.summary();
        assert_eq!(summary.polygons, 2);
        assert_eq!(summary.zones, 2);
        assert_eq!(summary.stats.large_polygons, 1);
    }

    #[test]
    fn zero_threads_falls_back_to_the_default_pool() {
        // rayon treats 0 as "pick automatically"
        let compiled = compile(vec![record("a", &[0.1, 0.1, 0.2, 0.1, 0.2, 0.2])], Some(0));
        assert!(compiled.is_ok());
    }

    #[test]
    fn parse_errors_stop_the_pipeline() {
        let err = compile(vec![record("a", &[0.1, 0.1, 0.2])], None).unwrap_err();
        assert!(matches!(err, Error::Parse(_)));
    }
}
