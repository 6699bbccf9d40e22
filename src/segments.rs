//! Longitudinal assembly of classified stations into structure segments.

use std::time::Instant;

use log::{debug, info, warn};
use rstar::{PointDistance, RTree, RTreeObject, AABB};

use crate::config::AnalysisConfig;
use crate::geometry::{Point, Polyline};
use crate::milestone::{resolve_reference, MilestoneIndex, MilestoneRef};
use crate::profile::{Classification, ClassifiedStation, CorridorLine};

/// Hard cap on the number of stations appended to a single run.
const MAX_RUN_POINTS: usize = 1000;

/// Contiguous run of same-classification stations along the corridor.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct StructureSegment {
    /// Ordered 1 m stations making up the segment.
    pub geometry: Polyline,
    /// Longitudinal extent in metres.
    pub length: f64,
    pub classification: Classification,
    pub max_height: Option<f64>,
    pub mean_height: Option<f64>,
    pub max_slope: Option<f64>,
    pub mean_slope: Option<f64>,
    pub start_milestone: Option<MilestoneRef>,
    pub end_milestone: Option<MilestoneRef>,
    /// `route_PRcode-offset_side`, when a reference milestone was resolved.
    pub name: Option<String>,
    pub route: String,
}

#[derive(Debug, Clone)]
struct IndexedStation {
    position: [f64; 2],
    idx: usize,
}

impl RTreeObject for IndexedStation {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_point(self.position)
    }
}

impl PointDistance for IndexedStation {
    fn distance_2(&self, point: &[f64; 2]) -> f64 {
        let dx = self.position[0] - point[0];
        let dy = self.position[1] - point[1];
        dx * dx + dy * dy
    }
}

/// Read-only spatial index over classified stations. Built once before the
/// traversal; queries never mutate it.
#[derive(Debug)]
pub struct StationIndex {
    tree: RTree<IndexedStation>,
}

impl StationIndex {
    pub fn build(stations: &[ClassifiedStation]) -> Self {
        let tree = RTree::bulk_load(
            stations
                .iter()
                .enumerate()
                .map(|(idx, s)| IndexedStation {
                    position: [s.position.x, s.position.y],
                    idx,
                })
                .collect(),
        );
        Self { tree }
    }

    /// Index of the nearest station within `radius` of `p`, if any.
    pub fn nearest_within(&self, p: Point, radius: f64) -> Option<usize> {
        self.tree
            .nearest_neighbor_iter_with_distance_2(&[p.x, p.y])
            .next()
            .filter(|(_, d2)| *d2 <= radius * radius)
            .map(|(obj, _)| obj.idx)
    }
}

/// Walks corridor lines and assembles classified stations into
/// [`StructureSegment`]s.
pub struct SegmentBuilder<'a> {
    stations: &'a [ClassifiedStation],
    index: StationIndex,
    milestones: &'a MilestoneIndex,
    cfg: &'a AnalysisConfig,
}

impl<'a> SegmentBuilder<'a> {
    pub fn new(
        stations: &'a [ClassifiedStation],
        milestones: &'a MilestoneIndex,
        cfg: &'a AnalysisConfig,
    ) -> Self {
        Self {
            stations,
            index: StationIndex::build(stations),
            milestones,
            cfg,
        }
    }

    /// Traverses every line at the configured step and returns the segments
    /// found, in traversal order. A wall-clock timeout truncates the walk
    /// but keeps what was already built.
    pub fn build_segments(&self, lines: &[CorridorLine]) -> Vec<StructureSegment> {
        let mut segments = Vec::new();
        if self.stations.is_empty() {
            info!("no classified stations, no segments generated");
            return segments;
        }
        let started = Instant::now();
        for line in lines {
            if !self.walk_line(line, started, &mut segments) {
                break;
            }
        }
        info!("built {} structure segments", segments.len());
        segments
    }

    /// Returns `false` when the traversal timed out.
    fn walk_line(
        &self,
        line: &CorridorLine,
        started: Instant,
        segments: &mut Vec<StructureSegment>,
    ) -> bool {
        let length = line.geometry.length();
        let step = self.cfg.station_step;
        debug!("walking line of {:.0} m on route {}", length, line.route);
        let mut i = 0.0;
        while i < length {
            if started.elapsed() >= self.cfg.traversal_timeout {
                warn!(
                    "traversal timeout after {:.0} s, keeping {} segments",
                    started.elapsed().as_secs_f64(),
                    segments.len()
                );
                return false;
            }
            let Some(anchor) = line.geometry.point_at(i) else {
                break;
            };
            let Some(start_idx) = self
                .index
                .nearest_within(anchor, self.cfg.run_start_tolerance)
            else {
                i += step;
                continue;
            };
            let classification = self.stations[start_idx].classification;
            // Stations without a usable height difference carry no structure
            // information and never open a run.
            if classification == Classification::Unknown {
                i += step;
                continue;
            }

            let mut points = vec![anchor];
            let mut heights = Vec::new();
            let mut slopes = Vec::new();
            let mut j = i + step;
            while j < length && points.len() < MAX_RUN_POINTS {
                let Some(p) = line.geometry.point_at(j) else {
                    break;
                };
                let Some(idx) = self.index.nearest_within(p, self.cfg.run_continue_tolerance)
                else {
                    break;
                };
                let station = &self.stations[idx];
                if station.classification != classification {
                    break;
                }
                if let Some(h) = station.structure.height {
                    heights.push(h);
                }
                if let Some(s) = station
                    .structure
                    .slope_section
                    .or(station.structure.slope_total)
                {
                    slopes.push(s);
                }
                points.push(p);
                j += step;
            }

            if points.len() < 2 {
                i += step;
                continue;
            }

            segments.push(self.finish_run(
                line,
                classification,
                points,
                &heights,
                &slopes,
                j - i,
            ));
            i = j;
        }
        true
    }

    fn finish_run(
        &self,
        line: &CorridorLine,
        classification: Classification,
        points: Vec<Point>,
        heights: &[f64],
        slopes: &[f64],
        length: f64,
    ) -> StructureSegment {
        let start = points[0];
        let end = *points.last().unwrap();
        let start_milestone = resolve_reference(
            self.milestones,
            &line.geometry,
            start,
            self.cfg.milestone_search_radius,
        )
        .ok();
        let end_milestone = resolve_reference(
            self.milestones,
            &line.geometry,
            end,
            self.cfg.milestone_search_radius,
        )
        .ok();
        let name = start_milestone.as_ref().map(|m| {
            format!(
                "{}_PR{}-{}_{}",
                line.route, m.code, m.chainage_offset as i64, m.side
            )
        });
        if name.is_none() {
            debug!(
                "no reference milestone near ({:.0}, {:.0}), segment left unnamed",
                start.x, start.y
            );
        }
        StructureSegment {
            geometry: Polyline::new(points),
            length,
            classification,
            max_height: fold_max(heights),
            mean_height: mean(heights),
            max_slope: fold_max(slopes),
            mean_slope: mean(slopes),
            start_milestone,
            end_milestone,
            name,
            route: line.route.clone(),
        }
    }
}

fn fold_max(values: &[f64]) -> Option<f64> {
    values.iter().copied().reduce(f64::max)
}

fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::boundary::StructureAttributes;
    use crate::milestone::Milestone;

    fn station(x: f64, classification: Classification, height: Option<f64>) -> ClassifiedStation {
        ClassifiedStation {
            position: Point::new(x, 0.0),
            classification,
            roadway_elevation: Some(100.0),
            natural_elevation: Some(100.0),
            height_difference: Some(0.0),
            model_r_squared: Some(1.0),
            structure: StructureAttributes {
                height,
                slope_total: height.map(|h| h / 10.0),
                slope_section: None,
                slope_middle: None,
                failure: None,
            },
            lane_count: 2,
            road_width: 7.0,
            route: "A33".to_string(),
        }
    }

    fn test_line(length: f64) -> CorridorLine {
        CorridorLine {
            geometry: Polyline::new(vec![Point::new(0.0, 0.0), Point::new(length, 0.0)]),
            lane_count: 2,
            pavement_width: 7.0,
            route: "A33".to_string(),
        }
    }

    fn milestones() -> MilestoneIndex {
        MilestoneIndex::build(&[Milestone {
            position: Point::new(0.0, 2.0),
            code: "12".to_string(),
            label: "PR12".to_string(),
            side: "D".to_string(),
        }])
    }

    #[test]
    fn classification_change_splits_runs() {
        let mut stations = Vec::new();
        for x in 0..100 {
            let class = if (40..60).contains(&x) {
                Classification::Remblai
            } else {
                Classification::Rasant
            };
            let h = (class == Classification::Remblai).then_some(4.0);
            stations.push(station(x as f64, class, h));
        }
        let cfg = AnalysisConfig::default();
        let ms = milestones();
        let builder = SegmentBuilder::new(&stations, &ms, &cfg);
        let segments = builder.build_segments(&[test_line(100.0)]);
        assert_eq!(segments.len(), 3);
        assert_eq!(segments[0].classification, Classification::Rasant);
        assert_eq!(segments[1].classification, Classification::Remblai);
        assert_eq!(segments[2].classification, Classification::Rasant);
        let remblai = &segments[1];
        assert!((remblai.geometry.vertices[0].x - 40.0).abs() < 1e-9);
        assert_eq!(remblai.max_height, Some(4.0));
        assert_eq!(remblai.mean_height, Some(4.0));
        // Segments are uniform: every constituent station shares the run's
        // classification by construction of the walk.
        assert!(remblai.geometry.vertices.len() >= 2);
    }

    #[test]
    fn gap_in_coverage_ends_the_run() {
        // Stations only on [0, 30] and [50, 80].
        let mut stations = Vec::new();
        for x in 0..=30 {
            stations.push(station(x as f64, Classification::Remblai, Some(3.0)));
        }
        for x in 50..=80 {
            stations.push(station(x as f64, Classification::Remblai, Some(3.0)));
        }
        let cfg = AnalysisConfig::default();
        let ms = milestones();
        let builder = SegmentBuilder::new(&stations, &ms, &cfg);
        let segments = builder.build_segments(&[test_line(100.0)]);
        assert_eq!(segments.len(), 2);
        assert!(segments.iter().all(|s| s.length > 20.0));
    }

    #[test]
    fn segment_is_named_from_start_milestone() {
        let stations: Vec<ClassifiedStation> = (0..=50)
            .map(|x| station(x as f64, Classification::Deblai, Some(2.5)))
            .collect();
        let cfg = AnalysisConfig::default();
        let ms = milestones();
        let builder = SegmentBuilder::new(&stations, &ms, &cfg);
        let segments = builder.build_segments(&[test_line(50.0)]);
        assert_eq!(segments.len(), 1);
        let seg = &segments[0];
        assert_eq!(seg.name.as_deref(), Some("A33_PR12-0_D"));
        assert_eq!(seg.start_milestone.as_ref().unwrap().code, 12);
        assert!(seg.end_milestone.is_some());
    }

    #[test]
    fn without_milestones_segments_stay_unnamed() {
        let stations: Vec<ClassifiedStation> = (0..=50)
            .map(|x| station(x as f64, Classification::Remblai, Some(2.0)))
            .collect();
        let cfg = AnalysisConfig::default();
        let ms = MilestoneIndex::build(&[]);
        let builder = SegmentBuilder::new(&stations, &ms, &cfg);
        let segments = builder.build_segments(&[test_line(50.0)]);
        assert_eq!(segments.len(), 1);
        assert!(segments[0].name.is_none());
        assert!(segments[0].start_milestone.is_none());
    }

    #[test]
    fn unknown_stations_never_open_a_run() {
        let stations: Vec<ClassifiedStation> = (0..=50)
            .map(|x| station(x as f64, Classification::Unknown, None))
            .collect();
        let cfg = AnalysisConfig::default();
        let ms = milestones();
        let builder = SegmentBuilder::new(&stations, &ms, &cfg);
        assert!(builder.build_segments(&[test_line(50.0)]).is_empty());
    }

    #[test]
    fn empty_station_set_yields_no_segments() {
        let cfg = AnalysisConfig::default();
        let ms = milestones();
        let builder = SegmentBuilder::new(&[], &ms, &cfg);
        assert!(builder.build_segments(&[test_line(100.0)]).is_empty());
    }

    #[test]
    fn runs_shorter_than_two_points_are_discarded() {
        // One isolated station cannot form a segment.
        let stations = vec![station(10.0, Classification::Remblai, Some(3.0))];
        let cfg = AnalysisConfig::default();
        let ms = milestones();
        let builder = SegmentBuilder::new(&stations, &ms, &cfg);
        assert!(builder.build_segments(&[test_line(100.0)]).is_empty());
    }
}
