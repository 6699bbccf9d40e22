//! Descriptive statistics over detected segments.

use std::collections::BTreeMap;

use log::info;

use crate::profile::Classification;
use crate::segments::StructureSegment;

/// Five-number style summary of a value series.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ValueSummary {
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub median: f64,
}

impl ValueSummary {
    /// Summarises a series, ignoring nothing; returns `None` when empty.
    pub fn of(values: &[f64]) -> Option<Self> {
        if values.is_empty() {
            return None;
        }
        let mut sorted = values.to_vec();
        sorted.sort_by(f64::total_cmp);
        let n = sorted.len();
        let median = if n % 2 == 1 {
            sorted[n / 2]
        } else {
            (sorted[n / 2 - 1] + sorted[n / 2]) / 2.0
        };
        Some(Self {
            min: sorted[0],
            max: sorted[n - 1],
            mean: sorted.iter().sum::<f64>() / n as f64,
            median,
        })
    }
}

/// Segment counts bucketed by maximum height.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct HeightBands {
    /// Segments with max height of at least 10 m.
    pub high: usize,
    /// Segments with max height in 5 m up to 10 m.
    pub medium: usize,
    /// Segments with max height under 5 m.
    pub low: usize,
}

/// Segment counts bucketed by maximum slope.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct SlopeBands {
    /// Segments with max slope of at least 0.6.
    pub steep: usize,
    /// Segments with max slope in 0.3 up to 0.6.
    pub moderate: usize,
    /// Segments with max slope under 0.3.
    pub gentle: usize,
}

/// Aggregate figures for one classification.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ClassStatistics {
    pub segment_count: usize,
    pub total_length: f64,
    pub length: Option<ValueSummary>,
    /// Summary over per-segment max heights.
    pub max_height: Option<ValueSummary>,
    /// Summary over per-segment max slopes.
    pub max_slope: Option<ValueSummary>,
    pub height_bands: HeightBands,
    pub slope_bands: SlopeBands,
}

/// Computes per-classification statistics over a segment set.
pub fn class_statistics(
    segments: &[StructureSegment],
) -> BTreeMap<Classification, ClassStatistics> {
    let mut groups: BTreeMap<Classification, Vec<&StructureSegment>> = BTreeMap::new();
    for s in segments {
        groups.entry(s.classification).or_default().push(s);
    }
    let mut out = BTreeMap::new();
    for (classification, members) in groups {
        let lengths: Vec<f64> = members.iter().map(|s| s.length).collect();
        let heights: Vec<f64> = members.iter().filter_map(|s| s.max_height).collect();
        let slopes: Vec<f64> = members.iter().filter_map(|s| s.max_slope).collect();

        let mut height_bands = HeightBands::default();
        for &h in &heights {
            if h >= 10.0 {
                height_bands.high += 1;
            } else if h >= 5.0 {
                height_bands.medium += 1;
            } else {
                height_bands.low += 1;
            }
        }
        let mut slope_bands = SlopeBands::default();
        for &s in &slopes {
            if s >= 0.6 {
                slope_bands.steep += 1;
            } else if s >= 0.3 {
                slope_bands.moderate += 1;
            } else {
                slope_bands.gentle += 1;
            }
        }

        let stats = ClassStatistics {
            segment_count: members.len(),
            total_length: lengths.iter().sum(),
            length: ValueSummary::of(&lengths),
            max_height: ValueSummary::of(&heights),
            max_slope: ValueSummary::of(&slopes),
            height_bands,
            slope_bands,
        };
        info!(
            "{}: {} segments, {:.0} m total",
            classification, stats.segment_count, stats.total_length
        );
        out.insert(classification, stats);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{Point, Polyline};

    fn segment(
        classification: Classification,
        length: f64,
        max_height: Option<f64>,
        max_slope: Option<f64>,
    ) -> StructureSegment {
        let geometry = Polyline::new(vec![Point::new(0.0, 0.0), Point::new(length, 0.0)]);
        StructureSegment {
            geometry,
            length,
            classification,
            max_height,
            mean_height: max_height.map(|h| h / 2.0),
            max_slope,
            mean_slope: max_slope,
            start_milestone: None,
            end_milestone: None,
            name: None,
            route: "A33".to_string(),
        }
    }

    #[test]
    fn summary_of_odd_series() {
        let s = ValueSummary::of(&[3.0, 1.0, 2.0]).unwrap();
        assert_eq!(s.min, 1.0);
        assert_eq!(s.max, 3.0);
        assert_eq!(s.mean, 2.0);
        assert_eq!(s.median, 2.0);
    }

    #[test]
    fn summary_of_even_series_interpolates_median() {
        let s = ValueSummary::of(&[4.0, 1.0, 3.0, 2.0]).unwrap();
        assert_eq!(s.median, 2.5);
    }

    #[test]
    fn empty_series_has_no_summary() {
        assert!(ValueSummary::of(&[]).is_none());
    }

    #[test]
    fn statistics_group_by_classification() {
        let segments = vec![
            segment(Classification::Remblai, 100.0, Some(12.0), Some(0.7)),
            segment(Classification::Remblai, 50.0, Some(6.0), Some(0.4)),
            segment(Classification::Remblai, 30.0, Some(3.0), Some(0.1)),
            segment(Classification::Deblai, 80.0, Some(4.0), Some(0.5)),
        ];
        let stats = class_statistics(&segments);
        let remblai = &stats[&Classification::Remblai];
        assert_eq!(remblai.segment_count, 3);
        assert_eq!(remblai.total_length, 180.0);
        assert_eq!(remblai.height_bands.high, 1);
        assert_eq!(remblai.height_bands.medium, 1);
        assert_eq!(remblai.height_bands.low, 1);
        assert_eq!(remblai.slope_bands.steep, 1);
        assert_eq!(remblai.slope_bands.moderate, 1);
        assert_eq!(remblai.slope_bands.gentle, 1);
        assert_eq!(remblai.max_height.unwrap().max, 12.0);
        let deblai = &stats[&Classification::Deblai];
        assert_eq!(deblai.segment_count, 1);
    }

    #[test]
    fn missing_attributes_do_not_enter_summaries() {
        let segments = vec![
            segment(Classification::Remblai, 40.0, None, None),
            segment(Classification::Remblai, 60.0, Some(8.0), Some(0.2)),
        ];
        let stats = class_statistics(&segments);
        let remblai = &stats[&Classification::Remblai];
        assert_eq!(remblai.segment_count, 2);
        assert_eq!(remblai.max_height.unwrap().mean, 8.0);
        assert_eq!(remblai.height_bands.medium, 1);
        assert_eq!(remblai.height_bands.low, 0);
    }
}
