//! Stateless geometry over fixed-point polygon rings.
//!
//! All functions take the ring as two parallel coordinate slices and treat it as closed:
//! the segment from the last point back to the first is always an edge. A ring that
//! already repeats its first point only adds a zero-length edge, which never crosses
//! anything, so both input styles classify identically.

use crate::error::{Error, Result};

/// Iterates the edges of a closed ring as `(x1, y1, x2, y2)`.
fn edges<'a>(xs: &'a [i32], ys: &'a [i32]) -> impl Iterator<Item = (i64, i64, i64, i64)> + 'a {
    let n = ys.len().min(xs.len());
    (0..n).map(move |i| {
        let j = if i + 1 == n { 0 } else { i + 1 };
        (xs[i] as i64, ys[i] as i64, xs[j] as i64, ys[j] as i64)
    })
}

/// Cross product of the edge direction with the vector to the point.
///
/// Positive when `(x, y)` lies left of the directed edge, negative when right.
fn is_left_of(x: i64, y: i64, x1: i64, y1: i64, x2: i64, y2: i64) -> i128 {
    (x2 - x1) as i128 * (y - y1) as i128 - (x - x1) as i128 * (y2 - y1) as i128
}

/// Winding-number point-in-polygon test.
///
/// Points exactly on an edge are classified by the sign of the cross product, which is
/// deterministic but not symmetric between left/bottom and right/top edges.
pub fn point_in_polygon(x: i64, y: i64, xs: &[i32], ys: &[i32]) -> bool {
    let mut winding = 0i32;
    for (x1, y1, x2, y2) in edges(xs, ys) {
        if y1 <= y {
            if y2 > y && is_left_of(x, y, x1, y1, x2, y2) > 0 {
                winding += 1;
            }
        } else if y2 <= y && is_left_of(x, y, x1, y1, x2, y2) < 0 {
            winding -= 1;
        }
    }
    winding != 0
}

/// X coordinate where the horizontal line at `y` crosses the segment.
pub fn x_intersection(y: i64, x1: i64, y1: i64, x2: i64, y2: i64) -> i64 {
    let delta_y = y2 - y1;
    if delta_y == 0 {
        return x1;
    }
    x1 + ((y - y1) as i128 * (x2 - x1) as i128 / delta_y as i128) as i64
}

/// Y coordinate where the vertical line at `x` crosses the segment.
pub fn y_intersection(x: i64, x1: i64, y1: i64, x2: i64, y2: i64) -> i64 {
    let delta_x = x2 - x1;
    if delta_x == 0 {
        return y1;
    }
    y1 + ((x - x1) as i128 * (y2 - y1) as i128 / delta_x as i128) as i64
}

/// Sorted x coordinates where the ring crosses the horizontal line at `y`.
///
/// An edge crosses when one end is `<= y` and the other `> y`, so a vertex lying exactly
/// on the line is counted once. The result pairs up into (entry, exit) spans.
pub fn horizontal_intersections(y: i64, xs: &[i32], ys: &[i32]) -> Result<Vec<i64>> {
    let mut crossings: Vec<i64> = edges(xs, ys)
        .filter(|&(_, y1, _, y2)| (y1 <= y && y2 > y) || (y1 > y && y2 <= y))
        .map(|(x1, y1, x2, y2)| x_intersection(y, x1, y1, x2, y2))
        .collect();
    if crossings.len() % 2 != 0 {
        return Err(Error::GeometryInvariant(format!(
            "{} crossings with latitude line {}",
            crossings.len(),
            y
        )));
    }
    crossings.sort_unstable();
    Ok(crossings)
}

/// Sorted y coordinates where the ring crosses the vertical line at `x`.
pub fn vertical_intersections(x: i64, xs: &[i32], ys: &[i32]) -> Result<Vec<i64>> {
    let mut crossings: Vec<i64> = edges(xs, ys)
        .filter(|&(x1, _, x2, _)| (x1 <= x && x2 > x) || (x1 > x && x2 <= x))
        .map(|(x1, y1, x2, y2)| y_intersection(x, x1, y1, x2, y2))
        .collect();
    if crossings.len() % 2 != 0 {
        return Err(Error::GeometryInvariant(format!(
            "{} crossings with longitude line {}",
            crossings.len(),
            x
        )));
    }
    crossings.sort_unstable();
    Ok(crossings)
}
