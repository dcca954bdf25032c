//! Core data structures shared by every build phase.
//!
//! This module defines the fixed-point coordinate representation, the shortcut grid
//! constants and the polygon records that flow from the store into the index and encoder:
//!
//! - [`Boundary`] - Bounding box of a polygon in fixed-point units
//! - [`Cell`] - One entry of the 360 × 360 shortcut grid
//! - [`PolygonRecord`] - A parsed polygon with its zone id and boundary

use serde::Serialize;
use std::ops::RangeInclusive;

/// Multiplier between degrees and the fixed-point integer representation.
pub const COORD_FACTOR: f64 = 10_000_000.0;

/// One degree in fixed-point units.
pub const COORD_UNIT: i64 = 10_000_000;

/// Shortcut columns per degree of longitude.
///
/// Baked into the binary format: the shortcut section size and every address in it
/// depend on this value.
pub const NR_SHORTCUTS_PER_LNG: i64 = 1;

/// Shortcut rows per degree of latitude. Baked into the binary format.
pub const NR_SHORTCUTS_PER_LAT: i64 = 2;

/// Number of grid columns (360 degrees of longitude).
pub const GRID_COLUMNS: usize = (360 * NR_SHORTCUTS_PER_LNG) as usize;

/// Number of grid rows (180 degrees of latitude).
pub const GRID_ROWS: usize = (180 * NR_SHORTCUTS_PER_LAT) as usize;

/// Total number of shortcut cells.
pub const CELL_COUNT: usize = GRID_COLUMNS * GRID_ROWS;

/// Maximum number of polygon ids a single cell may hold.
pub const MAX_CELL_ENTRIES: usize = 300;

/// Width of one grid column in fixed-point units.
pub const COLUMN_WIDTH: i64 = COORD_UNIT / NR_SHORTCUTS_PER_LNG;

/// Height of one grid row in fixed-point units.
pub const ROW_HEIGHT: i64 = COORD_UNIT / NR_SHORTCUTS_PER_LAT;

/// Converts a degree value to its fixed-point representation.
///
/// # Examples
///
/// ```
/// use tzgrid::types::{coord_to_int, int_to_coord};
///
/// assert_eq!(coord_to_int(13.4050), 134_050_000);
/// assert_eq!(coord_to_int(-0.00000004), 0);
/// assert!((int_to_coord(coord_to_int(52.5200066)) - 52.5200066).abs() < 0.5e-7);
/// ```
pub fn coord_to_int(degree: f64) -> i32 {
    (degree * COORD_FACTOR).round() as i32
}

/// Converts a fixed-point value back to degrees.
pub fn int_to_coord(value: i32) -> f64 {
    value as f64 / COORD_FACTOR
}

/// Raw column index of a fixed-point longitude: `floor((lng + 180) * 1)`.
///
/// Not clamped, so grid lines at +180 yield 360 and `column - 1` may go negative.
pub fn column_of(x: i64) -> i64 {
    (x + 180 * COORD_UNIT).div_euclid(COLUMN_WIDTH)
}

/// Raw row index of a fixed-point latitude: `floor((90 - lat) * 2)`. Not clamped.
pub fn row_of(y: i64) -> i64 {
    (90 * COORD_UNIT - y).div_euclid(ROW_HEIGHT)
}

/// A cell of the shortcut grid.
///
/// Columns run west to east starting at -180°, rows run north to south starting at +90°.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Cell {
    /// Column index, 0..360
    pub column: u16,
    /// Row index, 0..360
    pub row: u16,
}

impl Cell {
    /// Constructs a cell from raw indices, clamping them into the grid.
    pub fn clamped(column: i64, row: i64) -> Self {
        Self {
            column: column.clamp(0, GRID_COLUMNS as i64 - 1) as u16,
            row: row.clamp(0, GRID_ROWS as i64 - 1) as u16,
        }
    }

    /// Returns the cell containing a coordinate given in degrees.
    ///
    /// # Examples
    ///
    /// ```
    /// use tzgrid::types::Cell;
    ///
    /// let cell = Cell::containing(13.4050, 52.5200);
    /// assert_eq!((cell.column, cell.row), (193, 74));
    ///
    /// // The antimeridian and the south pole fall into the last column/row.
    /// assert_eq!(Cell::containing(180.0, -90.0), Cell { column: 359, row: 359 });
    /// ```
    pub fn containing(longitude: f64, latitude: f64) -> Self {
        Self::clamped(
            column_of(coord_to_int(longitude) as i64),
            row_of(coord_to_int(latitude) as i64),
        )
    }

    /// Position of the cell in the encoded shortcut tables (column-major).
    pub fn index(&self) -> usize {
        self.column as usize * GRID_ROWS + self.row as usize
    }

    /// Inverse of [`Cell::index`].
    pub fn from_index(index: usize) -> Self {
        Self {
            column: (index / GRID_ROWS) as u16,
            row: (index % GRID_ROWS) as u16,
        }
    }
}

/// Bounding box of a polygon, stored in the same field order as the binary format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Boundary {
    /// Easternmost longitude (fixed-point)
    pub xmax: i32,
    /// Westernmost longitude (fixed-point)
    pub xmin: i32,
    /// Northernmost latitude (fixed-point)
    pub ymax: i32,
    /// Southernmost latitude (fixed-point)
    pub ymin: i32,
}

impl Boundary {
    /// Computes the bounding box of a ring. Returns `None` for an empty ring.
    pub fn of_ring(xs: &[i32], ys: &[i32]) -> Option<Self> {
        let (xmin, xmax) = min_max(xs)?;
        let (ymin, ymax) = min_max(ys)?;
        Some(Self {
            xmax,
            xmin,
            ymax,
            ymin,
        })
    }

    /// Width in fixed-point units.
    pub fn width(&self) -> i64 {
        self.xmax as i64 - self.xmin as i64
    }

    /// Height in fixed-point units.
    pub fn height(&self) -> i64 {
        self.ymax as i64 - self.ymin as i64
    }

    /// Grid columns spanned by the box, west to east.
    pub fn column_range(&self) -> RangeInclusive<i64> {
        let first = Cell::clamped(column_of(self.xmin as i64), 0).column as i64;
        let last = Cell::clamped(column_of(self.xmax as i64), 0).column as i64;
        first..=last
    }

    /// Grid rows spanned by the box, north to south.
    pub fn row_range(&self) -> RangeInclusive<i64> {
        let first = Cell::clamped(0, row_of(self.ymax as i64)).row as i64;
        let last = Cell::clamped(0, row_of(self.ymin as i64)).row as i64;
        first..=last
    }

    /// Values in file order: xmax, xmin, ymax, ymin.
    pub fn to_array(&self) -> [i32; 4] {
        [self.xmax, self.xmin, self.ymax, self.ymin]
    }
}

fn min_max(values: &[i32]) -> Option<(i32, i32)> {
    let first = *values.first()?;
    Some(
        values
            .iter()
            .fold((first, first), |(lo, hi), &v| (lo.min(v), hi.max(v))),
    )
}

/// A polygon ready for indexing and encoding.
///
/// Coordinates are fixed-point integers (degrees × 10^7). The ring is implicitly closed:
/// the last point connects back to the first.
#[derive(Debug, Clone, PartialEq)]
pub struct PolygonRecord {
    /// Position in the input, also the id written into shortcut lists
    pub id: u16,
    /// Index into the sorted zone-name table
    pub zone_id: u16,
    /// Longitudes of the ring
    pub xs: Vec<i32>,
    /// Latitudes of the ring, same length as `xs`
    pub ys: Vec<i32>,
    /// Bounding box of the ring
    pub boundary: Boundary,
}

impl PolygonRecord {
    /// Number of coordinate pairs.
    pub fn len(&self) -> usize {
        self.xs.len()
    }

    /// Whether the ring has no points.
    pub fn is_empty(&self) -> bool {
        self.xs.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_point_round_trip_stays_within_half_unit() {
        for degree in [0.0, 179.9999999, -179.99999, 89.12345678, -45.000000049] {
            let back = int_to_coord(coord_to_int(degree));
            assert!((back - degree).abs() <= 0.5e-7 + f64::EPSILON, "{degree} -> {back}");
        }
    }

    #[test]
    fn grid_indices_follow_floor_semantics() {
        assert_eq!(column_of(coord_to_int(-180.0) as i64), 0);
        assert_eq!(column_of(coord_to_int(-0.5) as i64), 179);
        assert_eq!(column_of(0), 180);
        assert_eq!(row_of(coord_to_int(90.0) as i64), 0);
        assert_eq!(row_of(coord_to_int(89.75) as i64), 0);
        assert_eq!(row_of(coord_to_int(89.5) as i64), 1);
        assert_eq!(row_of(0), 180);
        assert_eq!(row_of(-1), 180);
    }

    #[test]
    fn cell_index_is_column_major() {
        let cell = Cell { column: 2, row: 5 };
        assert_eq!(cell.index(), 2 * 360 + 5);
        assert_eq!(Cell::from_index(cell.index()), cell);
        assert_eq!(Cell::from_index(CELL_COUNT - 1), Cell { column: 359, row: 359 });
    }

    #[test]
    fn boundary_ranges_are_clamped_to_the_grid() {
        let xs = [coord_to_int(179.5), coord_to_int(180.0)];
        let ys = [coord_to_int(-89.9), coord_to_int(-90.0)];
        let boundary = Boundary::of_ring(&xs, &ys).unwrap();
        assert_eq!(boundary.column_range(), 359..=359);
        assert_eq!(boundary.row_range(), 359..=359);
        assert!(Boundary::of_ring(&[], &[]).is_none());
    }
}
