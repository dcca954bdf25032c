//! Decoder for compiled assets.
//!
//! Reads the layout written by [`crate::encoder`] back into memory and checks every address
//! field against the layout while doing so. Used to verify a fresh build and to inspect
//! existing assets; it does not answer point queries.

use crate::encoder::{HEADER_SIZE, POLYGON_META_SIZE, SHORTCUT_ADDRESSES_SIZE, SHORTCUT_COUNTS_SIZE};
use crate::error::{Error, Result};
use crate::types::{
    int_to_coord, Boundary, Cell, CELL_COUNT, GRID_COLUMNS, GRID_ROWS, MAX_CELL_ENTRIES,
};
use byteorder::{BigEndian, ReadBytesExt};
use std::io::Cursor;

fn truncated(err: std::io::Error) -> Error {
    Error::corrupt(format!("unexpected end of data: {}", err))
}

/// A decoded asset.
#[derive(Debug, Clone)]
pub struct TimezoneData {
    shortcut_start: u32,
    zone_ids: Vec<u16>,
    boundaries: Vec<Boundary>,
    coordinates: Vec<(Vec<i32>, Vec<i32>)>,
    cell_counts: Vec<u16>,
    cell_offsets: Vec<u32>,
    ids: Vec<u16>,
}

impl TimezoneData {
    /// Decodes an asset.
    ///
    /// Fails with [`Error::CorruptAsset`] when the data is truncated, has trailing bytes, or
    /// contains an address that disagrees with the layout.
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        let mut cursor = Cursor::new(data);
        let n = cursor.read_u16::<BigEndian>().map_err(truncated)? as usize;
        let shortcut_start = cursor.read_u32::<BigEndian>().map_err(truncated)?;

        let zone_ids = read_u16s(&mut cursor, n)?;
        let counts = read_u16s(&mut cursor, n)?;
        let mut addresses = Vec::with_capacity(n);
        for _ in 0..n {
            addresses.push(cursor.read_u32::<BigEndian>().map_err(truncated)?);
        }
        let mut boundaries = Vec::with_capacity(n);
        for _ in 0..n {
            let mut values = [0i32; 4];
            for value in &mut values {
                *value = cursor.read_i32::<BigEndian>().map_err(truncated)?;
            }
            boundaries.push(Boundary {
                xmax: values[0],
                xmin: values[1],
                ymax: values[2],
                ymin: values[3],
            });
        }

        let mut expected = HEADER_SIZE + POLYGON_META_SIZE * n as u64;
        let mut coordinates = Vec::with_capacity(n);
        for (i, (&count, &address)) in counts.iter().zip(&addresses).enumerate() {
            if address as u64 != expected || cursor.position() != expected {
                return Err(Error::corrupt(format!(
                    "polygon {} data at {}, layout expects {}",
                    i, address, expected
                )));
            }
            let xs = read_i32s(&mut cursor, count as usize)?;
            let ys = read_i32s(&mut cursor, count as usize)?;
            coordinates.push((xs, ys));
            expected += 8 * count as u64;
        }
        if shortcut_start as u64 != expected {
            return Err(Error::corrupt(format!(
                "shortcut section at {}, layout expects {}",
                shortcut_start, expected
            )));
        }

        let cell_counts = read_u16s(&mut cursor, CELL_COUNT)?;
        let id_lists_start = expected + SHORTCUT_COUNTS_SIZE + SHORTCUT_ADDRESSES_SIZE;
        let mut next_address = id_lists_start;
        let mut cell_offsets = Vec::with_capacity(CELL_COUNT);
        let mut total_ids = 0u32;
        for (idx, &count) in cell_counts.iter().enumerate() {
            let address = cursor.read_u32::<BigEndian>().map_err(truncated)?;
            if count as usize > MAX_CELL_ENTRIES {
                return Err(Error::corrupt(format!("cell {} holds {} polygons", idx, count)));
            }
            let expected_address = if count == 0 { 0 } else { next_address };
            if address as u64 != expected_address {
                return Err(Error::corrupt(format!(
                    "cell {} id list at {}, layout expects {}",
                    idx, address, expected_address
                )));
            }
            cell_offsets.push(total_ids);
            total_ids += count as u32;
            if count > 0 {
                next_address += 2 * count as u64;
            }
        }

        let ids = read_u16s(&mut cursor, total_ids as usize)?;
        if let Some(&id) = ids.iter().find(|&&id| id as usize >= n) {
            return Err(Error::corrupt(format!("shortcut refers to polygon {} of {}", id, n)));
        }
        if cursor.position() != data.len() as u64 {
            return Err(Error::corrupt(format!(
                "{} trailing bytes after the id lists",
                data.len() as u64 - cursor.position()
            )));
        }

        Ok(Self {
            shortcut_start,
            zone_ids,
            boundaries,
            coordinates,
            cell_counts,
            cell_offsets,
            ids,
        })
    }

    /// Reads and decodes an asset file.
    pub fn open(path: impl AsRef<std::path::Path>) -> Result<Self> {
        Self::from_bytes(&std::fs::read(path)?)
    }

    /// Number of polygons.
    pub fn polygon_count(&self) -> usize {
        self.zone_ids.len()
    }

    /// Absolute address of the shortcut section.
    pub fn shortcut_start(&self) -> u32 {
        self.shortcut_start
    }

    /// Zone id of a polygon.
    pub fn zone_id(&self, polygon: usize) -> Option<u16> {
        self.zone_ids.get(polygon).copied()
    }

    /// Bounding box of a polygon.
    pub fn boundary(&self, polygon: usize) -> Option<Boundary> {
        self.boundaries.get(polygon).copied()
    }

    /// Fixed-point coordinates of a polygon as `(xs, ys)`.
    pub fn coordinates(&self, polygon: usize) -> Option<(&[i32], &[i32])> {
        self.coordinates
            .get(polygon)
            .map(|(xs, ys)| (xs.as_slice(), ys.as_slice()))
    }

    /// Coordinates of a polygon as `(lng, lat)` degrees.
    pub fn coordinates_degrees(&self, polygon: usize) -> Option<Vec<(f64, f64)>> {
        let (xs, ys) = self.coordinates(polygon)?;
        Some(
            xs.iter()
                .zip(ys)
                .map(|(&x, &y)| (int_to_coord(x), int_to_coord(y)))
                .collect(),
        )
    }

    /// Polygon ids registered in a cell. Cells outside the grid are empty.
    pub fn shortcut(&self, cell: Cell) -> &[u16] {
        if cell.column as usize >= GRID_COLUMNS || cell.row as usize >= GRID_ROWS {
            return &[];
        }
        let idx = cell.index();
        let start = self.cell_offsets[idx] as usize;
        let count = self.cell_counts[idx] as usize;
        &self.ids[start..start + count]
    }

    /// Number of cells with at least one polygon.
    pub fn filled_cells(&self) -> usize {
        self.cell_counts.iter().filter(|&&c| c > 0).count()
    }

    /// Total number of shortcut entries.
    pub fn total_entries(&self) -> usize {
        self.ids.len()
    }
}

fn read_u16s(cursor: &mut Cursor<&[u8]>, count: usize) -> Result<Vec<u16>> {
    let mut values = vec![0u16; count];
    cursor
        .read_u16_into::<BigEndian>(&mut values)
        .map_err(truncated)?;
    Ok(values)
}

fn read_i32s(cursor: &mut Cursor<&[u8]>, count: usize) -> Result<Vec<i32>> {
    let mut values = vec![0i32; count];
    cursor
        .read_i32_into::<BigEndian>(&mut values)
        .map_err(truncated)?;
    Ok(values)
}
