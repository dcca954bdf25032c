//! Loading polygon sources.
//!
//! Sources are GeoJSON `FeatureCollection`s whose features carry the zone name in
//! `properties.TZID` and a `Polygon` or `MultiPolygon` geometry, the shape of the
//! tz_world / timezone-boundary-builder exports. Each exterior ring becomes one record in
//! document order; holes are skipped because the asset format has no place for them.
//!
//! A `.zip` input is unpacked first. With the `download` feature, `http(s)://` inputs are
//! fetched before parsing.

use crate::error::{Error, Result};
use serde::Deserialize;
use std::io::Read;
use tracing::{debug, info};

/// One ring of a source document: a zone name and flat `lng, lat, ...` degree values.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceRecord {
    /// Zone name, e.g. `Europe/Berlin`
    pub zone: String,
    /// Longitude/latitude pairs, flattened
    pub coords: Vec<f64>,
}

#[derive(Deserialize)]
struct FeatureCollection {
    features: Vec<Feature>,
}

#[derive(Deserialize)]
struct Feature {
    properties: Properties,
    geometry: Option<Geometry>,
}

#[derive(Deserialize)]
struct Properties {
    #[serde(rename = "TZID", alias = "tzid", alias = "tz_name")]
    tzid: String,
}

type Ring = Vec<Vec<f64>>;

#[derive(Deserialize)]
#[serde(tag = "type", content = "coordinates")]
enum Geometry {
    Polygon(Vec<Ring>),
    MultiPolygon(Vec<Vec<Ring>>),
}

fn flatten_ring(zone: &str, ring: &Ring) -> Result<Vec<f64>> {
    let mut coords = Vec::with_capacity(ring.len() * 2);
    for position in ring {
        match position.as_slice() {
            [lng, lat, ..] => {
                coords.push(*lng);
                coords.push(*lat);
            }
            _ => {
                return Err(Error::parse(format!(
                    "position with {} values in zone {:?}",
                    position.len(),
                    zone
                )))
            }
        }
    }
    Ok(coords)
}

/// Parses a GeoJSON document into records.
///
/// # Examples
///
/// ```
/// let doc = r#"{"type": "FeatureCollection", "features": [{
///     "type": "Feature",
///     "properties": {"TZID": "Europe/Berlin"},
///     "geometry": {"type": "Polygon", "coordinates": [[[13.0, 52.0], [14.0, 52.0], [14.0, 53.0], [13.0, 52.0]]]}
/// }]}"#;
/// let records = tzgrid::source::parse_geojson(doc).unwrap();
/// assert_eq!(records[0].zone, "Europe/Berlin");
/// assert_eq!(records[0].coords.len(), 8);
/// ```
pub fn parse_geojson(text: &str) -> Result<Vec<SourceRecord>> {
    let collection: FeatureCollection = serde_json::from_str(text)?;
    let mut records = Vec::new();
    let mut holes = 0usize;
    for feature in &collection.features {
        let zone = &feature.properties.tzid;
        let polygons: Vec<&Vec<Ring>> = match &feature.geometry {
            Some(Geometry::Polygon(rings)) => vec![rings],
            Some(Geometry::MultiPolygon(polygons)) => polygons.iter().collect(),
            None => {
                debug!("feature {:?} has no geometry", zone);
                continue;
            }
        };
        for rings in polygons {
            let Some(exterior) = rings.first() else {
                continue;
            };
            holes += rings.len() - 1;
            records.push(SourceRecord {
                zone: zone.clone(),
                coords: flatten_ring(zone, exterior)?,
            });
        }
    }
    if holes > 0 {
        debug!("skipped {} interior rings", holes);
    }
    info!(
        "parsed {} rings from {} features",
        records.len(),
        collection.features.len()
    );
    Ok(records)
}

/// Returns the JSON text of a source, unpacking zip archives.
pub fn source_text(bytes: Vec<u8>, name: &str) -> Result<String> {
    if name.to_ascii_lowercase().ends_with(".zip") {
        return extract_json(&bytes);
    }
    String::from_utf8(bytes).map_err(|e| Error::parse(format!("{} is not UTF-8: {}", name, e)))
}

fn extract_json(bytes: &[u8]) -> Result<String> {
    let mut archive = zip::ZipArchive::new(std::io::Cursor::new(bytes))?;
    let name = archive
        .file_names()
        .filter(|n| n.ends_with(".json") || n.ends_with(".geojson"))
        .min()
        .map(str::to_string)
        .ok_or_else(|| Error::parse("archive contains no .json file"))?;
    debug!("reading {} from archive", name);
    let mut content = String::new();
    archive.by_name(&name)?.read_to_string(&mut content)?;
    Ok(content)
}

fn is_url(input: &str) -> bool {
    input.starts_with("http://") || input.starts_with("https://")
}

#[cfg(feature = "download")]
fn fetch(url: &str) -> Result<Vec<u8>> {
    info!("downloading {}", url);
    let response = reqwest::blocking::get(url)?.error_for_status()?;
    Ok(response.bytes()?.to_vec())
}

#[cfg(not(feature = "download"))]
fn fetch(url: &str) -> Result<Vec<u8>> {
    Err(Error::config(format!(
        "cannot fetch {}: built without the `download` feature",
        url
    )))
}

/// Loads records from a file path or, with the `download` feature, a URL.
pub fn load(input: &str) -> Result<Vec<SourceRecord>> {
    let bytes = if is_url(input) {
        fetch(input)?
    } else {
        std::fs::read(input)?
    };
    info!("read {} bytes from {}", bytes.len(), input);
    parse_geojson(&source_text(bytes, input)?)
}
