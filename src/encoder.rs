//! Binary asset encoder.
//!
//! # Layout
//!
//! All integers are big-endian. `N` is the polygon count.
//!
//! ```text
//! u16            N
//! u32            shortcut section start
//! u16 × N        zone id per polygon
//! u16 × N        point count per polygon
//! u32 × N        polygon data address; address[i+1] = address[i] + 8 × count[i]
//! i32 × 4 × N    xmax, xmin, ymax, ymin per polygon
//! [6 + 24 N]     per polygon: all x values, then all y values (i32)
//! [shortcut section start]
//! u16 × 129600   polygons per cell, column-major (col 0 rows 0..360, col 1, ...)
//! u32 × 129600   address of the cell's id list, 0 for empty cells
//! u16 × ...      id lists of the non-empty cells, in table order
//! ```
//!
//! Every address is derived from counts before anything is written, and the writer position
//! is compared against it whenever a section begins.

use crate::error::{Error, Result};
use crate::shortcuts::ShortcutIndex;
use crate::types::{Cell, PolygonRecord, CELL_COUNT, MAX_CELL_ENTRIES};
use byteorder::{BigEndian, WriteBytesExt};
use std::io::Write;
use tracing::info;

/// Size of the polygon count and shortcut address fields.
pub const HEADER_SIZE: u64 = 6;

/// Bytes of per-polygon metadata: zone id, point count, data address, boundary.
pub const POLYGON_META_SIZE: u64 = 2 + 2 + 4 + 16;

/// Size of the shortcut count table.
pub const SHORTCUT_COUNTS_SIZE: u64 = 2 * CELL_COUNT as u64;

/// Size of the shortcut address table.
pub const SHORTCUT_ADDRESSES_SIZE: u64 = 4 * CELL_COUNT as u64;

/// Section addresses of an asset, computed from counts alone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layout {
    /// Start of the coordinate data, `6 + 24 N`
    pub polygon_data_start: u64,
    /// Absolute address of each polygon's coordinates
    pub polygon_addresses: Vec<u32>,
    /// Start of the shortcut count table
    pub shortcut_start: u64,
    /// Start of the shortcut id lists
    pub id_lists_start: u64,
    /// Polygons per cell in table order
    pub cell_counts: Vec<u16>,
    /// Total file size
    pub total_size: u64,
}

impl Layout {
    /// Computes every address of the asset.
    ///
    /// Fails with a capacity error when a cell holds more than 300 polygons, when there are
    /// more polygons or points than the 16-bit fields hold, or when an address exceeds 32 bits.
    pub fn compute(polygons: &[PolygonRecord], index: &ShortcutIndex) -> Result<Self> {
        let n = polygons.len() as u64;
        if polygons.len() > u16::MAX as usize {
            return Err(Error::capacity(format!("{} polygons do not fit a u16 count", n)));
        }

        let polygon_data_start = HEADER_SIZE + POLYGON_META_SIZE * n;
        let mut polygon_addresses = Vec::with_capacity(polygons.len());
        let mut address = polygon_data_start;
        let mut value_count = 0u64;
        for polygon in polygons {
            if polygon.len() > u16::MAX as usize {
                return Err(Error::capacity(format!(
                    "polygon {} has {} points",
                    polygon.id,
                    polygon.len()
                )));
            }
            polygon_addresses.push(to_address(address)?);
            // two i32 per point
            address += 8 * polygon.len() as u64;
            value_count += 2 * polygon.len() as u64;
        }

        let shortcut_start = polygon_data_start + 4 * value_count;
        if shortcut_start != address {
            return Err(Error::AddressMismatch {
                section: "polygon address table",
                expected: shortcut_start,
                actual: address,
            });
        }

        let mut cell_counts = Vec::with_capacity(CELL_COUNT);
        let mut id_count = 0u64;
        for idx in 0..CELL_COUNT {
            let cell = Cell::from_index(idx);
            let count = index.count(cell);
            if count > MAX_CELL_ENTRIES {
                return Err(Error::capacity(format!(
                    "cell ({}, {}) holds {} polygons, at most {} fit",
                    cell.column, cell.row, count, MAX_CELL_ENTRIES
                )));
            }
            cell_counts.push(count as u16);
            id_count += count as u64;
        }

        let id_lists_start = shortcut_start + SHORTCUT_COUNTS_SIZE + SHORTCUT_ADDRESSES_SIZE;
        let total_size = id_lists_start + 2 * id_count;
        to_address(total_size)?;

        Ok(Self {
            polygon_data_start,
            polygon_addresses,
            shortcut_start,
            id_lists_start,
            cell_counts,
            total_size,
        })
    }
}

fn to_address(value: u64) -> Result<u32> {
    u32::try_from(value)
        .map_err(|_| Error::capacity(format!("address {} does not fit 32 bits", value)))
}

/// Writer wrapper that counts the bytes passed through.
struct PositionWriter<W> {
    inner: W,
    position: u64,
}

impl<W: Write> PositionWriter<W> {
    fn new(inner: W) -> Self {
        Self { inner, position: 0 }
    }

    fn expect_position(&self, section: &'static str, expected: u64) -> Result<()> {
        if self.position != expected {
            return Err(Error::AddressMismatch {
                section,
                expected,
                actual: self.position,
            });
        }
        Ok(())
    }
}

impl<W: Write> Write for PositionWriter<W> {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        let written = self.inner.write(buf)?;
        self.position += written as u64;
        Ok(written)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.inner.flush()
    }
}

/// Writes the asset and returns the number of bytes written.
pub fn encode<W: Write>(
    polygons: &[PolygonRecord],
    index: &ShortcutIndex,
    writer: W,
) -> Result<u64> {
    let layout = Layout::compute(polygons, index)?;
    let mut out = PositionWriter::new(writer);

    out.write_u16::<BigEndian>(polygons.len() as u16)?;
    out.write_u32::<BigEndian>(to_address(layout.shortcut_start)?)?;
    for polygon in polygons {
        out.write_u16::<BigEndian>(polygon.zone_id)?;
    }
    for polygon in polygons {
        out.write_u16::<BigEndian>(polygon.len() as u16)?;
    }
    for &address in &layout.polygon_addresses {
        out.write_u32::<BigEndian>(address)?;
    }
    for polygon in polygons {
        for value in polygon.boundary.to_array() {
            out.write_i32::<BigEndian>(value)?;
        }
    }

    out.expect_position("polygon data", layout.polygon_data_start)?;
    for (polygon, &address) in polygons.iter().zip(&layout.polygon_addresses) {
        out.expect_position("polygon coordinates", address as u64)?;
        for &x in &polygon.xs {
            out.write_i32::<BigEndian>(x)?;
        }
        for &y in &polygon.ys {
            out.write_i32::<BigEndian>(y)?;
        }
    }

    out.expect_position("shortcut section", layout.shortcut_start)?;
    for &count in &layout.cell_counts {
        out.write_u16::<BigEndian>(count)?;
    }
    let mut address = layout.id_lists_start;
    for &count in &layout.cell_counts {
        if count == 0 {
            out.write_u32::<BigEndian>(0)?;
        } else {
            out.write_u32::<BigEndian>(to_address(address)?)?;
            address += 2 * count as u64;
        }
    }

    out.expect_position("shortcut id lists", layout.id_lists_start)?;
    for (idx, &count) in layout.cell_counts.iter().enumerate() {
        if count == 0 {
            continue;
        }
        for &id in index.get(Cell::from_index(idx)) {
            out.write_u16::<BigEndian>(id)?;
        }
    }
    out.expect_position("end of file", layout.total_size)?;
    out.flush()?;

    let total = layout.total_size as f64;
    let shortcut_bytes = (layout.total_size - layout.shortcut_start) as f64;
    let polygon_bytes = (layout.shortcut_start - layout.polygon_data_start) as f64;
    info!(
        "encoded {} bytes: shortcuts {:.2}%, polygon data {:.2}%",
        layout.total_size,
        100.0 * shortcut_bytes / total,
        100.0 * polygon_bytes / total
    );
    Ok(layout.total_size)
}

/// Encodes the asset into memory.
pub fn encode_to_vec(polygons: &[PolygonRecord], index: &ShortcutIndex) -> Result<Vec<u8>> {
    let mut buffer = Vec::new();
    encode(polygons, index, &mut buffer)?;
    Ok(buffer)
}
