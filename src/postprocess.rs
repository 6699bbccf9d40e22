//! Segment cleanup: bridge exclusion, merging and length filtering.

use geo_types::{Geometry, LineString, Polygon};
use log::{debug, info, warn};

use crate::config::AnalysisConfig;
use crate::geometry::{point_in_polygon, point_segment_distance, Point, Polyline};
use crate::segments::StructureSegment;

/// Runs the full post-processing chain: bridge exclusion, merge of
/// near-adjacent segments, then the minimum-length filter.
pub fn postprocess(
    segments: Vec<StructureSegment>,
    bridges: &[Geometry<f64>],
    cfg: &AnalysisConfig,
) -> Vec<StructureSegment> {
    let segments = exclude_bridges(segments, bridges, cfg.bridge_exclusion_buffer);
    let segments = merge_close_segments(segments, cfg.merge_buffer);
    filter_by_length(segments, cfg.min_segment_length)
}

/// Removes the parts of every segment lying within `buffer` of a bridge
/// feature. Segments are split at the removed parts; pieces left with fewer
/// than two stations disappear. Never increases total geometric length.
pub fn exclude_bridges(
    segments: Vec<StructureSegment>,
    bridges: &[Geometry<f64>],
    buffer: f64,
) -> Vec<StructureSegment> {
    if bridges.is_empty() {
        return segments;
    }
    let mut result = Vec::new();
    for segment in segments {
        let mut piece: Vec<Point> = Vec::new();
        let mut pieces: Vec<Vec<Point>> = Vec::new();
        for &v in &segment.geometry.vertices {
            let clipped = bridges
                .iter()
                .any(|b| geometry_distance(v, b) <= buffer);
            if clipped {
                if !piece.is_empty() {
                    pieces.push(std::mem::take(&mut piece));
                }
            } else {
                piece.push(v);
            }
        }
        if !piece.is_empty() {
            pieces.push(piece);
        }
        let piece_count = pieces.iter().filter(|p| p.len() >= 2).count();
        if piece_count == 0 {
            debug!("segment fully covered by bridge buffer, dropped");
        }
        for piece in pieces {
            if piece.len() < 2 {
                continue;
            }
            let geometry = Polyline::new(piece);
            let length = geometry.length();
            result.push(StructureSegment {
                geometry,
                length,
                ..segment.clone()
            });
        }
    }
    result
}

/// Merges same-classification segments whose geometries come closer than
/// twice `buffer` (the distance at which their buffers would overlap).
///
/// Merged attributes follow the original rules: max of member maxima, mean
/// of member means, summed length, name and start milestone from the first
/// member in original order, end milestone from the last.
pub fn merge_close_segments(
    segments: Vec<StructureSegment>,
    buffer: f64,
) -> Vec<StructureSegment> {
    if segments.len() <= 1 {
        return segments;
    }
    let connect_distance = buffer * 2.0;
    let n = segments.len();
    let mut parent: Vec<usize> = (0..n).collect();

    fn find(parent: &mut Vec<usize>, i: usize) -> usize {
        if parent[i] != i {
            let root = find(parent, parent[i]);
            parent[i] = root;
        }
        parent[i]
    }

    for i in 0..n {
        for j in (i + 1)..n {
            if segments[i].classification != segments[j].classification {
                continue;
            }
            if polyline_distance(&segments[i].geometry, &segments[j].geometry)
                < connect_distance
            {
                let (ri, rj) = (find(&mut parent, i), find(&mut parent, j));
                if ri != rj {
                    parent[rj] = ri;
                }
            }
        }
    }

    let mut clusters: Vec<Vec<usize>> = vec![Vec::new(); n];
    for i in 0..n {
        let root = find(&mut parent, i);
        clusters[root].push(i);
    }

    let mut merged = Vec::new();
    for members in clusters.into_iter().filter(|c| !c.is_empty()) {
        if members.len() == 1 {
            merged.push(segments[members[0]].clone());
            continue;
        }
        info!("merging {} near-adjacent segments", members.len());
        let first = &segments[members[0]];
        let last = &segments[*members.last().unwrap()];
        let mut vertices = Vec::new();
        for &m in &members {
            vertices.extend(segments[m].geometry.vertices.iter().copied());
        }
        let length = members.iter().map(|&m| segments[m].length).sum();
        merged.push(StructureSegment {
            geometry: Polyline::new(vertices),
            length,
            classification: first.classification,
            max_height: aggregate_max(&segments, &members, |s| s.max_height),
            mean_height: aggregate_mean(&segments, &members, |s| s.mean_height),
            max_slope: aggregate_max(&segments, &members, |s| s.max_slope),
            mean_slope: aggregate_mean(&segments, &members, |s| s.mean_slope),
            start_milestone: first.start_milestone.clone(),
            end_milestone: last.end_milestone.clone(),
            name: first.name.clone(),
            route: first.route.clone(),
        });
    }
    merged
}

/// Drops segments whose geometric length is at or below `min_length`.
pub fn filter_by_length(
    segments: Vec<StructureSegment>,
    min_length: f64,
) -> Vec<StructureSegment> {
    segments
        .into_iter()
        .filter(|s| s.geometry.length() > min_length)
        .collect()
}

fn aggregate_max(
    segments: &[StructureSegment],
    members: &[usize],
    get: impl Fn(&StructureSegment) -> Option<f64>,
) -> Option<f64> {
    members
        .iter()
        .filter_map(|&m| get(&segments[m]))
        .reduce(f64::max)
}

fn aggregate_mean(
    segments: &[StructureSegment],
    members: &[usize],
    get: impl Fn(&StructureSegment) -> Option<f64>,
) -> Option<f64> {
    let values: Vec<f64> = members.iter().filter_map(|&m| get(&segments[m])).collect();
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

/// Minimum distance between two station polylines.
fn polyline_distance(a: &Polyline, b: &Polyline) -> f64 {
    let mut min = f64::INFINITY;
    for &p in &a.vertices {
        min = min.min(polyline_point_distance(b, p));
    }
    for &p in &b.vertices {
        min = min.min(polyline_point_distance(a, p));
    }
    min
}

fn polyline_point_distance(line: &Polyline, p: Point) -> f64 {
    if line.vertices.len() == 1 {
        return crate::geometry::distance(line.vertices[0], p);
    }
    line.vertices
        .windows(2)
        .map(|w| point_segment_distance(p, w[0], w[1]))
        .fold(f64::INFINITY, f64::min)
}

/// Distance from a point to a bridge feature. Unsupported geometry kinds are
/// ignored with a warning.
fn geometry_distance(p: Point, geometry: &Geometry<f64>) -> f64 {
    match geometry {
        Geometry::Polygon(poly) => polygon_distance(p, poly),
        Geometry::MultiPolygon(mp) => mp
            .iter()
            .map(|poly| polygon_distance(p, poly))
            .fold(f64::INFINITY, f64::min),
        Geometry::LineString(ls) => linestring_distance(p, ls),
        Geometry::MultiLineString(mls) => mls
            .iter()
            .map(|ls| linestring_distance(p, ls))
            .fold(f64::INFINITY, f64::min),
        other => {
            warn!("unsupported bridge geometry kind: {other:?}");
            f64::INFINITY
        }
    }
}

fn linestring_distance(p: Point, ls: &LineString<f64>) -> f64 {
    if ls.0.len() == 1 {
        let c = ls.0[0];
        return crate::geometry::distance(p, Point::new(c.x, c.y));
    }
    ls.0.windows(2)
        .map(|w| {
            point_segment_distance(p, Point::new(w[0].x, w[0].y), Point::new(w[1].x, w[1].y))
        })
        .fold(f64::INFINITY, f64::min)
}

fn polygon_distance(p: Point, poly: &Polygon<f64>) -> f64 {
    let ring: Vec<Point> = poly
        .exterior()
        .0
        .iter()
        .map(|c| Point::new(c.x, c.y))
        .collect();
    if point_in_polygon(p, &ring) {
        return 0.0;
    }
    linestring_distance(p, poly.exterior())
}
