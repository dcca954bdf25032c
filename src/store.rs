//! Polygon accumulation and zone-id assignment.
//!
//! The store is the first two phases of a build: records are pushed in input order, then
//! [`PolygonStore::assign_zone_ids`] consumes the store, builds the zone-name table and
//! hands out immutable [`PolygonRecord`]s. Nothing can be added afterwards.

use crate::error::{Error, Result};
use crate::types::{coord_to_int, Boundary, PolygonRecord};
use crate::zones::ZoneNameTable;
use tracing::{debug, info};

#[derive(Debug)]
struct RawPolygon {
    zone: String,
    xs: Vec<i32>,
    ys: Vec<i32>,
    boundary: Boundary,
}

/// Parsed polygons waiting for their zone ids.
#[derive(Debug, Default)]
pub struct PolygonStore {
    polygons: Vec<RawPolygon>,
    total_points: usize,
}

impl PolygonStore {
    /// Constructs an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a ring given as flat `lng, lat, lng, lat, ...` degree values.
    ///
    /// Fails with a parse error on an odd value count, a ring with fewer than three points,
    /// or a coordinate outside the valid degree range.
    pub fn push_flat(&mut self, zone: &str, coords: &[f64]) -> Result<()> {
        if coords.len() % 2 != 0 {
            return Err(Error::parse(format!(
                "{} values found for zone {:?} in record {}, expected (lng, lat) pairs",
                coords.len(),
                zone,
                self.polygons.len()
            )));
        }
        let points: Vec<[f64; 2]> = coords.chunks_exact(2).map(|c| [c[0], c[1]]).collect();
        self.push_ring(zone, &points)
    }

    /// Adds a ring of `[lng, lat]` degree pairs.
    pub fn push_ring(&mut self, zone: &str, points: &[[f64; 2]]) -> Result<()> {
        let record = self.polygons.len();
        if points.len() < 3 {
            return Err(Error::parse(format!(
                "record {} ({:?}) has {} points, a ring needs at least 3",
                record,
                zone,
                points.len()
            )));
        }
        let mut xs = Vec::with_capacity(points.len());
        let mut ys = Vec::with_capacity(points.len());
        for &[lng, lat] in points {
            if !(-180.0..=180.0).contains(&lng) || !(-90.0..=90.0).contains(&lat) {
                return Err(Error::parse(format!(
                    "record {} ({:?}) has coordinate ({}, {}) outside the valid range",
                    record, zone, lng, lat
                )));
            }
            xs.push(coord_to_int(lng));
            ys.push(coord_to_int(lat));
        }
        let boundary = Boundary::of_ring(&xs, &ys)
            .ok_or_else(|| Error::parse(format!("record {} is empty", record)))?;

        if record % 1000 == 0 {
            debug!("parsed record {}", record);
        }
        self.total_points += xs.len();
        self.polygons.push(RawPolygon {
            zone: zone.to_string(),
            xs,
            ys,
            boundary,
        });
        Ok(())
    }

    /// Number of polygons pushed so far.
    pub fn len(&self) -> usize {
        self.polygons.len()
    }

    /// Whether nothing has been pushed.
    pub fn is_empty(&self) -> bool {
        self.polygons.is_empty()
    }

    /// Ends the parse phase: builds the zone-name table and numbers the polygons.
    ///
    /// Fails with a capacity error when the polygon count, a point count or a zone id does
    /// not fit the 16-bit fields of the binary format.
    pub fn assign_zone_ids(self) -> Result<ZonedPolygons> {
        if self.polygons.len() > u16::MAX as usize {
            return Err(Error::capacity(format!(
                "{} polygons, the format holds at most {}",
                self.polygons.len(),
                u16::MAX
            )));
        }

        let zones = ZoneNameTable::from_names(self.polygons.iter().map(|p| p.zone.as_str()));
        zones.check_capacity()?;
        info!(
            "{} polygons with {} points in {} zones",
            self.polygons.len(),
            self.total_points,
            zones.len()
        );

        let polygons = self
            .polygons
            .into_iter()
            .enumerate()
            .map(|(id, raw)| {
                if raw.xs.len() > u16::MAX as usize {
                    return Err(Error::capacity(format!(
                        "polygon {} has {} points, the format holds at most {}",
                        id,
                        raw.xs.len(),
                        u16::MAX
                    )));
                }
                let zone_id = zones.id_of(&raw.zone).ok_or_else(|| {
                    Error::capacity(format!("zone {:?} has no 16-bit zone id", raw.zone))
                })?;
                Ok(PolygonRecord {
                    id: id as u16,
                    zone_id,
                    xs: raw.xs,
                    ys: raw.ys,
                    boundary: raw.boundary,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(ZonedPolygons { zones, polygons })
    }
}

/// Polygons with final ids and zone ids, plus the zone table they refer to.
#[derive(Debug, Clone)]
pub struct ZonedPolygons {
    /// Sorted unique zone names
    pub zones: ZoneNameTable,
    /// Polygons in input order; `polygons[i].id == i`
    pub polygons: Vec<PolygonRecord>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn odd_coordinate_count_is_a_parse_error() {
        let mut store = PolygonStore::new();
        let err = store.push_flat("Europe/Paris", &[1.0, 2.0, 3.0]).unwrap_err();
        assert!(matches!(err, Error::Parse(_)));
        assert!(store.is_empty());
    }

    #[test]
    fn rejects_degenerate_and_out_of_range_rings() {
        let mut store = PolygonStore::new();
        assert!(matches!(
            store.push_flat("a", &[0.0, 0.0, 1.0, 1.0]),
            Err(Error::Parse(_))
        ));
        assert!(matches!(
            store.push_ring("a", &[[0.0, 0.0], [190.0, 0.0], [0.0, 1.0]]),
            Err(Error::Parse(_))
        ));
    }

    #[test]
    fn zone_ids_index_the_sorted_name_table() {
        let mut store = PolygonStore::new();
        store.push_flat("Europe/Paris", &[2.0, 48.0, 3.0, 48.0, 3.0, 49.0]).unwrap();
        store.push_flat("Asia/Tokyo", &[139.0, 35.0, 140.0, 35.0, 140.0, 36.0]).unwrap();
        store.push_flat("Europe/Paris", &[4.0, 48.0, 5.0, 48.0, 5.0, 49.0]).unwrap();

        let zoned = store.assign_zone_ids().unwrap();
        assert_eq!(zoned.zones.names(), ["Asia/Tokyo", "Europe/Paris"]);
        let ids: Vec<(u16, u16)> = zoned.polygons.iter().map(|p| (p.id, p.zone_id)).collect();
        assert_eq!(ids, vec![(0, 1), (1, 0), (2, 1)]);
    }

    #[test]
    fn boundary_is_computed_in_fixed_point() {
        let mut store = PolygonStore::new();
        store
            .push_flat("a", &[-1.5, 10.25, 2.0, 10.0, 0.5, 12.125])
            .unwrap();
        let zoned = store.assign_zone_ids().unwrap();
        let boundary = zoned.polygons[0].boundary;
        assert_eq!(boundary.to_array(), [20_000_000, -15_000_000, 121_250_000, 100_000_000]);
    }
}
