use std::io::Write;
use tzgrid::zones::ZoneNameTable;
use tzgrid::{BuildOptions, Builder, Cell, Error, TimezoneData};

fn feature(zone: &str, ring: &[(f64, f64)]) -> String {
    let positions: Vec<String> = ring.iter().map(|(x, y)| format!("[{}, {}]", x, y)).collect();
    format!(
        r#"{{"type": "Feature", "properties": {{"TZID": "{}"}},
            "geometry": {{"type": "Polygon", "coordinates": [[{}]]}}}}"#,
        zone,
        positions.join(", ")
    )
}

fn collection(features: &[String]) -> String {
    format!(
        r#"{{"type": "FeatureCollection", "features": [{}]}}"#,
        features.join(",\n")
    )
}

fn sample() -> String {
    collection(&[
        feature(
            "Europe/Berlin",
            &[(13.0883, 52.3382), (13.7611, 52.3382), (13.7611, 52.6755), (13.0883, 52.6755)],
        ),
        feature(
            "America/Sao_Paulo",
            &[(-53.1, -25.3), (-44.2, -25.3), (-44.2, -19.8), (-53.1, -19.8), (-53.1, -25.3)],
        ),
        feature("Europe/Berlin", &[(14.1, 53.9), (14.3, 53.9), (14.2, 54.05)]),
    ])
}

#[test]
fn geojson_round_trips_through_the_asset() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("combined.json");
    let output = dir.path().join("timezone_data.bin");
    std::fs::write(&input, sample()).unwrap();

    let mut options = BuildOptions::new(input.to_string_lossy(), &output);
    options.verify = true;
    let summary = Builder::new(options).build().unwrap();
    assert_eq!(summary.polygons, 3);
    assert_eq!(summary.zones, 2);
    assert_eq!(summary.stats.large_polygons, 1);
    assert_eq!(summary.bytes, std::fs::metadata(&output).unwrap().len());

    let data = TimezoneData::open(&output).unwrap();
    assert_eq!(data.polygon_count(), 3);
    // zones sorted by name: America/Sao_Paulo = 0, Europe/Berlin = 1
    assert_eq!(data.zone_id(0), Some(1));
    assert_eq!(data.zone_id(1), Some(0));
    assert_eq!(data.zone_id(2), Some(1));

    let points = data.coordinates_degrees(0).unwrap();
    let expected = [(13.0883, 52.3382), (13.7611, 52.3382), (13.7611, 52.6755), (13.0883, 52.6755)];
    assert_eq!(points.len(), expected.len());
    for ((x, y), (ex, ey)) in points.iter().zip(expected) {
        assert!((x - ex).abs() <= 1e-7, "{} vs {}", x, ex);
        assert!((y - ey).abs() <= 1e-7, "{} vs {}", y, ey);
    }

    assert_eq!(data.shortcut(Cell::containing(13.4, 52.5)), &[0]);
    assert_eq!(data.shortcut(Cell::containing(-47.9, -22.0)), &[1]);
    assert!(data.shortcut(Cell::containing(0.0, 0.0)).is_empty());
}

#[test]
fn repeated_builds_are_byte_identical() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("combined.json");
    std::fs::write(&input, sample()).unwrap();

    let mut outputs = Vec::new();
    for (i, threads) in [Some(1), Some(4), None].into_iter().enumerate() {
        let output = dir.path().join(format!("out{}.bin", i));
        let mut options = BuildOptions::new(input.to_string_lossy(), &output);
        options.threads = threads;
        Builder::new(options).build().unwrap();
        outputs.push(std::fs::read(&output).unwrap());
    }
    assert_eq!(outputs[0], outputs[1]);
    assert_eq!(outputs[0], outputs[2]);
}

#[test]
fn zip_input_and_catalog() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("timezones.zip");
    let output = dir.path().join("timezone_data.bin");
    let catalog = dir.path().join("timezone_names.bin");

    let file = std::fs::File::create(&input).unwrap();
    let mut writer = zip::ZipWriter::new(file);
    writer
        .start_file("combined.json", zip::write::SimpleFileOptions::default())
        .unwrap();
    writer.write_all(sample().as_bytes()).unwrap();
    writer.finish().unwrap();

    let mut options = BuildOptions::new(input.to_string_lossy(), &output);
    options.catalog = Some(catalog.clone());
    Builder::new(options).build().unwrap();

    let zones = ZoneNameTable::read_from(&catalog).unwrap();
    assert_eq!(zones.names(), ["America/Sao_Paulo", "Europe/Berlin"]);

    let data = TimezoneData::open(&output).unwrap();
    assert_eq!(zones.name(data.zone_id(0).unwrap()), Some("Europe/Berlin"));
}

#[test]
fn overfull_cell_fails_without_writing_output() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("crowded.json");
    let output = dir.path().join("timezone_data.bin");

    let features: Vec<String> = (0..301)
        .map(|i| {
            let x = 10.1 + i as f64 * 0.001;
            feature("Etc/UTC", &[(x, 20.1), (x + 0.0005, 20.1), (x, 20.2)])
        })
        .collect();
    std::fs::write(&input, collection(&features)).unwrap();

    let err = Builder::new(BuildOptions::new(input.to_string_lossy(), &output))
        .build()
        .unwrap_err();
    assert!(matches!(err, Error::Capacity(_)), "{:?}", err);
    assert!(!output.exists());
}

#[test]
fn failed_catalog_write_leaves_no_asset() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("combined.json");
    let output = dir.path().join("timezone_data.bin");
    std::fs::write(&input, sample()).unwrap();

    let mut options = BuildOptions::new(input.to_string_lossy(), &output);
    options.catalog = Some(dir.path().join("missing_dir").join("timezone_names.bin"));
    let err = Builder::new(options).build().unwrap_err();
    assert!(matches!(err, Error::Io(_)), "{:?}", err);
    assert!(!output.exists());
    // no staged temporary files either
    let leftovers: Vec<_> = std::fs::read_dir(dir.path())
        .unwrap()
        .map(|entry| entry.unwrap().file_name())
        .filter(|name| name != "combined.json")
        .collect();
    assert!(leftovers.is_empty(), "{:?}", leftovers);
}

#[test]
fn missing_input_is_an_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("timezone_data.bin");
    let err = tzgrid::compile_file(dir.path().join("nope.json").to_string_lossy(), &output)
        .unwrap_err();
    assert!(matches!(err, Error::Io(_)));
    assert!(!output.exists());
}
