//! Shortcut index construction.
//!
//! The world is divided into 360 × 360 cells (one column per degree of longitude, two rows
//! per degree of latitude). Every polygon is registered in each cell where a point of the
//! polygon could lie, so the runtime reader only has to test the polygons of one cell.
//!
//! Small polygons are registered in every cell of their bounding box. Polygons spanning
//! more than two cells in both directions go through the exact path: the polygon is cut
//! along every grid line inside its bounding box, and only the cells touched by the
//! interior spans on those lines are kept.

use crate::error::{Error, Result};
use crate::geometry::{horizontal_intersections, point_in_polygon, vertical_intersections};
use crate::types::{
    column_of, row_of, Boundary, Cell, PolygonRecord, COLUMN_WIDTH, ROW_HEIGHT,
};
use rayon::prelude::*;
use rustc_hash::{FxHashMap, FxHashSet};
use tracing::{debug, info};

/// Whether a polygon is big enough for the exact shortcut computation.
pub fn is_large(boundary: &Boundary) -> bool {
    boundary.width() > 2 * COLUMN_WIDTH && boundary.height() > 2 * ROW_HEIGHT
}

/// Number of cells in the bounding box product.
pub fn bbox_cell_count(boundary: &Boundary) -> usize {
    let columns = boundary.column_range();
    let rows = boundary.row_range();
    (columns.end() - columns.start() + 1) as usize * (rows.end() - rows.start() + 1) as usize
}

/// Every cell of the bounding box, column by column.
pub fn bbox_cells(boundary: &Boundary) -> Vec<Cell> {
    let rows = boundary.row_range();
    boundary
        .column_range()
        .flat_map(|column| rows.clone().map(move |row| Cell::clamped(column, row)))
        .collect()
}

/// Grid lines from `ceil(min)` to `floor(max)` on a lattice of `step`, both inclusive.
///
/// The last line is always present, even when it lies below the first one (no grid line
/// strictly inside the range).
pub fn grid_lines(min: i64, max: i64, step: i64) -> Vec<i64> {
    let mut current = -(-min).div_euclid(step) * step;
    let last = max.div_euclid(step) * step;
    let mut lines = Vec::new();
    while current < last {
        lines.push(current);
        current += step;
    }
    lines.push(last);
    lines
}

/// Sample positions of a span: `entry`, `entry + step`, ... while below `exit`, then `exit`.
fn span_samples(entry: i64, exit: i64, step: i64) -> impl Iterator<Item = i64> {
    (0..)
        .map(move |i| entry + i * step)
        .take_while(move |&v| v < exit)
        .chain(std::iter::once(exit))
}

/// Raw (column, row) pairs tagged by cutting the polygon along latitude grid lines.
fn scan_latitudes(polygon: &PolygonRecord, cells: &mut FxHashSet<(i64, i64)>) -> Result<()> {
    let (xs, ys) = (&polygon.xs, &polygon.ys);
    let b = &polygon.boundary;
    for lat in grid_lines(b.ymin as i64, b.ymax as i64, ROW_HEIGHT) {
        let row = row_of(lat);
        let crossings = horizontal_intersections(lat, xs, ys)?;
        for span in crossings.chunks_exact(2) {
            let (entry, exit) = (span[0], span[1]);
            if entry == exit {
                // polygon only touches the line; the row above counts if it continues north
                let column = column_of(entry);
                cells.insert((column, row));
                if point_in_polygon(entry, lat + 1, xs, ys) {
                    cells.insert((column, row - 1));
                }
                continue;
            }

            let middle = entry + (exit - entry) / 2;
            let straddles = point_in_polygon(middle, lat + 1, xs, ys);
            for x in span_samples(entry, exit, COLUMN_WIDTH) {
                let column = column_of(x);
                cells.insert((column, row));
                if straddles {
                    cells.insert((column, row - 1));
                }
            }
        }
    }
    Ok(())
}

/// Same as [`scan_latitudes`] along longitude grid lines; "above" becomes "west".
fn scan_longitudes(polygon: &PolygonRecord, cells: &mut FxHashSet<(i64, i64)>) -> Result<()> {
    let (xs, ys) = (&polygon.xs, &polygon.ys);
    let b = &polygon.boundary;
    for lng in grid_lines(b.xmin as i64, b.xmax as i64, COLUMN_WIDTH) {
        let column = column_of(lng);
        let crossings = vertical_intersections(lng, xs, ys)?;
        for span in crossings.chunks_exact(2) {
            let (entry, exit) = (span[0], span[1]);
            if entry == exit {
                let row = row_of(entry);
                cells.insert((column, row));
                if point_in_polygon(lng - 1, entry, xs, ys) {
                    cells.insert((column - 1, row));
                }
                continue;
            }

            let middle = entry + (exit - entry) / 2;
            let straddles = point_in_polygon(lng - 1, middle, xs, ys);
            for y in span_samples(entry, exit, ROW_HEIGHT) {
                let row = row_of(y);
                cells.insert((column, row));
                if straddles {
                    cells.insert((column - 1, row));
                }
            }
        }
    }
    Ok(())
}

/// Exact shortcut cells of a large polygon, sorted.
///
/// Fails with a geometry invariant error on an odd crossing count, and with an index
/// invariant error when fewer than 3 cells remain or when more cells than the bounding
/// box product were found.
pub fn exact_cells(polygon: &PolygonRecord) -> Result<Vec<Cell>> {
    let mut raw = FxHashSet::default();
    scan_latitudes(polygon, &mut raw)?;
    scan_longitudes(polygon, &mut raw)?;

    let boundary = &polygon.boundary;
    let (columns, rows) = (boundary.column_range(), boundary.row_range());
    let mut cells: Vec<Cell> = raw
        .into_iter()
        .filter(|(column, row)| columns.contains(column) && rows.contains(row))
        .map(|(column, row)| Cell::clamped(column, row))
        .collect();
    cells.sort_unstable();

    check_exact_count(polygon.id, cells.len(), bbox_cell_count(boundary))?;
    Ok(cells)
}

/// An exact cell set has at least 3 cells and never more than the bounding box product.
fn check_exact_count(id: u16, found: usize, brute_force: usize) -> Result<()> {
    if found > brute_force {
        return Err(Error::IndexInvariant(format!(
            "polygon {} got {} exact cells but its bounding box only has {}",
            id, found, brute_force
        )));
    }
    if found < 3 {
        return Err(Error::IndexInvariant(format!(
            "polygon {} got only {} exact cells",
            id, found
        )));
    }
    Ok(())
}

/// Cells a polygon has to be registered in.
pub fn cells_of(polygon: &PolygonRecord) -> Result<Vec<Cell>> {
    if is_large(&polygon.boundary) {
        let cells = exact_cells(polygon)?;
        debug!(
            "polygon {} is large: {} of {} bounding box cells",
            polygon.id,
            cells.len(),
            bbox_cell_count(&polygon.boundary)
        );
        Ok(cells)
    } else {
        Ok(bbox_cells(&polygon.boundary))
    }
}

/// Summary numbers of a built index, for logging.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IndexStats {
    /// Polygons that went through the exact path
    pub large_polygons: usize,
    /// Cells with at least one polygon
    pub filled_cells: usize,
    /// Sum of all cell list lengths
    pub total_entries: usize,
    /// Longest cell list
    pub max_entries: usize,
}

/// Mapping from grid cell to the ascending ids of the polygons registered there.
///
/// Cells missing from the map are empty.
#[derive(Debug, Clone, Default)]
pub struct ShortcutIndex {
    cells: FxHashMap<Cell, Vec<u16>>,
    stats: IndexStats,
}

impl ShortcutIndex {
    /// Computes the shortcut cells of every polygon and merges them in polygon order.
    ///
    /// The per-polygon work runs on the current rayon pool. `polygons[i].id` must be `i`,
    /// which [`crate::store::PolygonStore::assign_zone_ids`] guarantees.
    pub fn build(polygons: &[PolygonRecord]) -> Result<Self> {
        info!("building shortcuts for {} polygons", polygons.len());
        let per_polygon: Vec<Vec<Cell>> = polygons
            .par_iter()
            .map(cells_of)
            .collect::<Result<Vec<_>>>()?;

        let mut index = Self::default();
        for (polygon, cells) in polygons.iter().zip(per_polygon) {
            if is_large(&polygon.boundary) {
                index.stats.large_polygons += 1;
            }
            for cell in cells {
                index.insert(cell, polygon.id);
            }
        }

        index.stats.filled_cells = index.cells.len();
        index.stats.total_entries = index.cells.values().map(Vec::len).sum();
        index.stats.max_entries = index.cells.values().map(Vec::len).max().unwrap_or(0);
        info!(
            "{} large polygons, {} filled cells, {} entries, at most {} per cell",
            index.stats.large_polygons,
            index.stats.filled_cells,
            index.stats.total_entries,
            index.stats.max_entries
        );
        Ok(index)
    }

    fn insert(&mut self, cell: Cell, id: u16) {
        let ids = self.cells.entry(cell).or_default();
        if ids.last() != Some(&id) {
            ids.push(id);
        }
    }

    /// Polygon ids registered in a cell, ascending. Empty for unused cells.
    pub fn get(&self, cell: Cell) -> &[u16] {
        self.cells.get(&cell).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Number of polygons in a cell.
    pub fn count(&self, cell: Cell) -> usize {
        self.get(cell).len()
    }

    /// Non-empty cells, in no particular order.
    pub fn filled(&self) -> impl Iterator<Item = (Cell, &[u16])> {
        self.cells.iter().map(|(cell, ids)| (*cell, ids.as_slice()))
    }

    /// Build statistics.
    pub fn stats(&self) -> IndexStats {
        self.stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::coord_to_int;

    fn polygon(id: u16, points: &[(f64, f64)]) -> PolygonRecord {
        let xs: Vec<i32> = points.iter().map(|p| coord_to_int(p.0)).collect();
        let ys: Vec<i32> = points.iter().map(|p| coord_to_int(p.1)).collect();
        let boundary = Boundary::of_ring(&xs, &ys).unwrap();
        PolygonRecord {
            id,
            zone_id: 0,
            xs,
            ys,
            boundary,
        }
    }

    fn cell(column: u16, row: u16) -> Cell {
        Cell { column, row }
    }

    #[test]
    fn implausible_exact_counts_break_the_index_invariant() {
        assert!(check_exact_count(7, 3, 3).is_ok());
        assert!(matches!(
            check_exact_count(7, 2, 60),
            Err(Error::IndexInvariant(_))
        ));
        assert!(matches!(
            check_exact_count(7, 61, 60),
            Err(Error::IndexInvariant(_))
        ));
    }

    #[test]
    fn grid_lines_include_both_clipped_ends() {
        assert_eq!(
            grid_lines(coord_to_int(20.1) as i64, coord_to_int(21.7) as i64, ROW_HEIGHT),
            vec![205_000_000, 210_000_000, 215_000_000]
        );
        assert_eq!(
            grid_lines(coord_to_int(-3.5) as i64, coord_to_int(-1.2) as i64, COLUMN_WIDTH),
            vec![-30_000_000, -20_000_000]
        );
        // a range without an inner grid line still yields its floor line
        assert_eq!(grid_lines(12, 15, 10), vec![10]);
    }

    #[test]
    fn span_samples_end_on_exit() {
        let samples: Vec<i64> = span_samples(5, 32, 10).collect();
        assert_eq!(samples, vec![5, 15, 25, 32]);
        let samples: Vec<i64> = span_samples(0, 20, 10).collect();
        assert_eq!(samples, vec![0, 10, 20]);
    }

    #[test]
    fn large_means_more_than_two_cells_both_ways() {
        let wide_flat = polygon(0, &[(0.0, 0.0), (5.0, 0.0), (5.0, 0.9), (0.0, 0.9)]);
        assert!(!is_large(&wide_flat.boundary));
        let big = polygon(0, &[(0.0, 0.0), (2.5, 0.0), (2.5, 1.5), (0.0, 1.5)]);
        assert!(is_large(&big.boundary));
        let exactly_two = polygon(0, &[(0.0, 0.0), (2.0, 0.0), (2.0, 1.0), (0.0, 1.0)]);
        assert!(!is_large(&exactly_two.boundary));
    }

    #[test]
    fn small_polygon_gets_exactly_its_bbox_cells() {
        let p = polygon(0, &[(10.5, 20.3), (11.5, 20.3), (11.5, 20.7), (10.5, 20.7)]);
        assert!(!is_large(&p.boundary));
        let cells = cells_of(&p).unwrap();
        assert_eq!(
            cells,
            vec![cell(190, 138), cell(190, 139), cell(191, 138), cell(191, 139)]
        );
    }

    #[test]
    fn rectangle_keeps_every_bbox_cell() {
        let p = polygon(0, &[(10.25, 20.1), (15.75, 20.1), (15.75, 24.9), (10.25, 24.9)]);
        assert!(is_large(&p.boundary));
        let cells = exact_cells(&p).unwrap();
        assert_eq!(cells, bbox_cells(&p.boundary));
        assert_eq!(cells.len(), 60);
    }

    #[test]
    fn triangle_drops_cells_beyond_its_hypotenuse() {
        let p = polygon(0, &[(0.0, 0.0), (10.0, 0.0), (0.0, 10.0)]);
        let brute = bbox_cells(&p.boundary);
        assert_eq!(brute.len(), 11 * 21);

        let cells = exact_cells(&p).unwrap();
        assert!(cells.len() >= 3);
        assert!(cells.len() < brute.len());
        assert!(cells.iter().all(|c| brute.contains(c)));
        assert!(!cells.contains(&cell(189, 161)));

        // the union of cells still spans the whole bounding box
        let min_col = cells.iter().map(|c| c.column).min().unwrap();
        let max_col = cells.iter().map(|c| c.column).max().unwrap();
        let min_row = cells.iter().map(|c| c.row).min().unwrap();
        let max_row = cells.iter().map(|c| c.row).max().unwrap();
        assert_eq!((min_col, max_col, min_row, max_row), (180, 190, 160, 180));
    }

    #[test]
    fn cell_lists_are_ascending_polygon_ids() {
        let polygons: Vec<PolygonRecord> = (0..50u16)
            .map(|id| {
                let lng = 10.1 + id as f64 * 0.01;
                polygon(id, &[(lng, 20.1), (lng + 0.005, 20.1), (lng, 20.2)])
            })
            .collect();
        let index = ShortcutIndex::build(&polygons).unwrap();
        let ids = index.get(cell(190, 139));
        assert_eq!(ids.len(), 50);
        assert!(ids.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(index.count(cell(0, 0)), 0);
        assert_eq!(index.stats().filled_cells, 1);
        assert_eq!(index.stats().max_entries, 50);
    }
}
