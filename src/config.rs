//! Analysis configuration and lane-count dependent offset bands.

use std::time::Duration;

/// Tunable parameters of the detection run. All distances are metres.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct AnalysisConfig {
    /// Minimum positive height difference classifying a station as embankment.
    pub threshold_remblai: f64,
    /// Maximum negative height difference classifying a station as cut.
    pub threshold_deblai: f64,
    /// Half-length of the perpendicular sampling transect.
    pub cross_section_half_length: f64,
    /// Longitudinal sampling resolution along the corridor.
    pub station_step: f64,
    /// Lateral step of the boundary search.
    pub boundary_scan_step: f64,
    /// Buffer radius used when merging near-adjacent segments.
    pub merge_buffer: f64,
    /// Buffer radius applied to bridge features before exclusion.
    pub bridge_exclusion_buffer: f64,
    /// Segments at or below this geometric length are dropped.
    pub min_segment_length: f64,
    /// Match tolerance when opening a new run.
    pub run_start_tolerance: f64,
    /// Match tolerance when extending an open run.
    pub run_continue_tolerance: f64,
    /// Search radius for candidate reference milestones.
    pub milestone_search_radius: f64,
    /// Wall-clock budget of the longitudinal traversal; expiry truncates the
    /// walk and keeps the segments already built.
    #[serde(with = "duration_secs")]
    pub traversal_timeout: Duration,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            threshold_remblai: 2.0,
            threshold_deblai: -2.0,
            cross_section_half_length: 60.0,
            station_step: 1.0,
            boundary_scan_step: 0.5,
            merge_buffer: 5.0,
            bridge_exclusion_buffer: 10.0,
            min_segment_length: 20.0,
            run_start_tolerance: 5.0,
            run_continue_tolerance: 1.5,
            milestone_search_radius: 1500.0,
            traversal_timeout: Duration::from_secs(3600),
        }
    }
}

/// Closed offset band `[start, end]` along a cross-section, in metres from the
/// zero end of the transect.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct OffsetBand {
    pub start: f64,
    pub end: f64,
}

impl OffsetBand {
    pub const fn new(start: f64, end: f64) -> Self {
        Self { start, end }
    }
}

/// Sampling offsets on a 120 m cross-section, keyed by lane count.
///
/// The roadway sits near the middle of the transect; the two terrain bands
/// lie outside the roadway footprint on either side and feed the natural
/// terrain regression.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct OffsetBands {
    /// Band averaged to obtain the roadway elevation.
    pub roadway: OffsetBand,
    /// Terrain band on the zero-offset side.
    pub terrain_low: OffsetBand,
    /// Terrain band on the far side.
    pub terrain_high: OffsetBand,
}

impl OffsetBands {
    /// Returns the sampling preset for the given lane count. Two-lane
    /// carriageways keep a narrower shoulder than wider configurations.
    pub fn for_lane_count(lanes: u32) -> Self {
        if lanes == 2 {
            Self {
                roadway: OffsetBand::new(57.0, 63.0),
                terrain_low: OffsetBand::new(0.0, 30.0),
                terrain_high: OffsetBand::new(90.0, 120.0),
            }
        } else {
            Self {
                roadway: OffsetBand::new(57.0, 63.0),
                terrain_low: OffsetBand::new(0.0, 25.0),
                terrain_high: OffsetBand::new(95.0, 120.0),
            }
        }
    }
}

mod duration_secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_secs(u64::deserialize(d)?))
    }
}
