//! Top-level detection pipeline.
//!
//! Chains per-station classification, longitudinal segment assembly and
//! segment post-processing into one call.

use geo_types::Geometry;
use log::info;

use crate::config::AnalysisConfig;
use crate::error::ProviderError;
use crate::milestone::{Milestone, MilestoneIndex};
use crate::postprocess::postprocess;
use crate::profile::{classify_lines, ClassifiedStation, CorridorLine};
use crate::providers::{BoundingBox, BridgeProvider, MilestoneProvider, RouteGeometryProvider};
use crate::raster::ElevationSource;
use crate::segments::{SegmentBuilder, StructureSegment};

/// Result of one detection run.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct DetectionOutput {
    /// Per-metre classification records, in traversal order.
    pub stations: Vec<ClassifiedStation>,
    /// Post-processed structure segments.
    pub segments: Vec<StructureSegment>,
}

/// Runs the full pipeline on lines and reference data already in memory.
///
/// An empty line set produces an empty output.
pub fn detect_structures(
    lines: &[CorridorLine],
    sampler: &dyn ElevationSource,
    milestones: &[Milestone],
    bridges: &[Geometry<f64>],
    cfg: &AnalysisConfig,
) -> DetectionOutput {
    if lines.is_empty() {
        info!("no corridor lines selected, nothing to analyse");
        return DetectionOutput {
            stations: Vec::new(),
            segments: Vec::new(),
        };
    }
    info!("analysing {} corridor lines", lines.len());
    let stations = classify_lines(lines, sampler, cfg);
    let milestone_index = MilestoneIndex::build(milestones);
    let builder = SegmentBuilder::new(&stations, &milestone_index, cfg);
    let raw = builder.build_segments(lines);
    let segments = postprocess(raw, bridges, cfg);
    info!(
        "detection finished: {} stations, {} segments",
        stations.len(),
        segments.len()
    );
    DetectionOutput { stations, segments }
}

/// Runs the pipeline against provider-backed data sources within a window.
pub fn detect_in_window(
    window: &BoundingBox,
    routes: &dyn RouteGeometryProvider,
    sampler: &dyn ElevationSource,
    milestones: &dyn MilestoneProvider,
    bridges: &dyn BridgeProvider,
    cfg: &AnalysisConfig,
) -> Result<DetectionOutput, ProviderError> {
    let lines = routes.route_lines(window)?;
    // Milestones and bridges near the window edge still matter; pull from a
    // window grown by the search radius.
    let reference_window = window.expanded(cfg.milestone_search_radius);
    let marks = milestones.milestones(&reference_window)?;
    let spans = bridges.bridges(&window.expanded(cfg.bridge_exclusion_buffer))?;
    Ok(detect_structures(&lines, sampler, &marks, &spans, cfg))
}
