use assert_fs::prelude::*;
use predicates::prelude::*;

use earthworks::geometry::{Point, Polyline};
use earthworks::io::json::{
    read_analysis_json, read_segments_json, write_analysis_json, write_segments_json,
    AnalysisDocument,
};
use earthworks::milestone::Milestone;
use earthworks::raster::ElevationGrid;
use earthworks::{detect_structures, AnalysisConfig, Classification, CorridorLine};

fn sample_output() -> earthworks::DetectionOutput {
    let grid = ElevationGrid::from_fn(400, 500, -100.0, 200.0, 1.0, |x, y| {
        if y.abs() <= 5.0 && (100.0..=150.0).contains(&x) {
            105.0
        } else {
            100.0
        }
    });
    let line = CorridorLine {
        geometry: Polyline::new(vec![Point::new(0.0, 0.0), Point::new(300.0, 0.0)]),
        lane_count: 2,
        pavement_width: 7.0,
        route: "A33".to_string(),
    };
    let milestones = vec![Milestone {
        position: Point::new(0.0, 2.0),
        code: "7".to_string(),
        label: "PR7".to_string(),
        side: "D".to_string(),
    }];
    detect_structures(&[line], &grid, &milestones, &[], &AnalysisConfig::default())
}

#[test]
fn analysis_document_roundtrip() {
    let output = sample_output();
    let station_count = output.stations.len();
    let segment_count = output.segments.len();
    let doc: AnalysisDocument = output.into();

    let dir = assert_fs::TempDir::new().unwrap();
    let file = dir.child("analysis.json");
    write_analysis_json(file.path().to_str().unwrap(), &doc).unwrap();
    file.assert(predicate::path::exists());
    file.assert(predicate::str::contains("Remblai"));
    file.assert(predicate::str::contains("A33"));

    let read = read_analysis_json(file.path().to_str().unwrap()).unwrap();
    assert_eq!(read.stations.len(), station_count);
    assert_eq!(read.segments.len(), segment_count);
    dir.close().unwrap();
}

#[test]
fn segments_roundtrip_preserves_attributes() {
    let output = sample_output();
    let dir = assert_fs::TempDir::new().unwrap();
    let file = dir.child("segments.json");
    write_segments_json(file.path().to_str().unwrap(), &output.segments).unwrap();
    file.assert(predicate::path::exists());

    let read = read_segments_json(file.path().to_str().unwrap()).unwrap();
    assert_eq!(read.len(), output.segments.len());
    let before = output
        .segments
        .iter()
        .find(|s| s.classification == Classification::Remblai)
        .unwrap();
    let after = read
        .iter()
        .find(|s| s.classification == Classification::Remblai)
        .unwrap();
    assert_eq!(after.name, before.name);
    assert_eq!(after.length, before.length);
    assert_eq!(after.max_height, before.max_height);
    assert_eq!(
        after.start_milestone.as_ref().map(|m| m.code),
        before.start_milestone.as_ref().map(|m| m.code)
    );
    dir.close().unwrap();
}

#[test]
fn invalid_json_maps_to_invalid_data() {
    let dir = assert_fs::TempDir::new().unwrap();
    let file = dir.child("broken.json");
    file.write_str("{not json").unwrap();
    let err = read_segments_json(file.path().to_str().unwrap()).unwrap_err();
    assert_eq!(err.kind(), std::io::ErrorKind::InvalidData);
    dir.close().unwrap();
}
