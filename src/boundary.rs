//! Lateral boundary search deriving height and slope of a detected structure.
//!
//! Both scans start from an anchor near the roadway edge and step inward
//! (toward offset zero) until the real terrain reconverges with the natural
//! terrain model, detected as a sign change of `actual - modelled` between
//! consecutive steps.

use log::warn;

use crate::error::StationFailure;
use crate::raster::ElevationSource;
use crate::section::CrossSection;
use crate::terrain::TerrainModel;

/// Anchor search band for the cut scan.
const DEBLAI_ANCHOR_BAND: (f64, f64) = (45.0, 60.0);
/// Offset where the embankment anchor walk starts.
const REMBLAI_ANCHOR_START: f64 = 60.0;
/// Inner offset floor; scans reaching it stop unresolved.
const SCAN_FLOOR: f64 = 30.0;
/// Local slope below which the embankment anchor walk keeps moving inward.
const REMBLAI_SLOPE_THRESHOLD: f64 = 0.08;
/// Iteration cap of the embankment scan. The cut scan is deliberately
/// uncapped apart from the offset floor.
const REMBLAI_MAX_ITERATIONS: usize = 60;
/// Heights above this are treated as bad elevation data.
const MAX_PLAUSIBLE_HEIGHT: f64 = 50.0;
/// Margin trimmed from each end of the span for the section slope.
const SECTION_TRIM: f64 = 2.0;
/// Window length of the middle slope estimate.
const MIDDLE_SECTION_LENGTH: f64 = 3.0;

/// Height and slope attributes of one embankment or cut station.
///
/// Every field degrades independently to `None`; `failure` names the first
/// condition that prevented a complete result.
#[derive(Debug, Clone, Copy, PartialEq, Default, serde::Serialize, serde::Deserialize)]
pub struct StructureAttributes {
    /// Vertical extent between the anchor and the detected boundary.
    pub height: Option<f64>,
    /// Height over the full scanned span.
    pub slope_total: Option<f64>,
    /// Slope over the span trimmed by 2 m at each end, when the span allows.
    pub slope_section: Option<f64>,
    /// Slope over a centered 3 m window, when the span allows.
    pub slope_middle: Option<f64>,
    /// First recoverable condition hit during the scan, if any.
    pub failure: Option<StationFailure>,
}

impl StructureAttributes {
    /// All-null attributes tagged with a failure reason.
    pub fn failed(failure: StationFailure) -> Self {
        Self {
            failure: Some(failure),
            ..Self::default()
        }
    }
}

/// Derives cut attributes by scanning inward from the lowest point of the
/// ditch band. The scan has no iteration cap; it is bounded only by the
/// offset floor, and an unresolved boundary yields a partial result.
pub fn deblai_attributes(
    section: &CrossSection,
    sampler: &dyn ElevationSource,
    model: &TerrainModel,
    step: f64,
) -> StructureAttributes {
    // Local elevation minimum in the anchor band is the starting point.
    let mut anchor: Option<(f64, f64)> = None;
    let mut offset = DEBLAI_ANCHOR_BAND.1;
    while offset >= DEBLAI_ANCHOR_BAND.0 {
        if let Some(z) = section.elevation_at_offset(sampler, offset) {
            if anchor.map(|(_, az)| z < az).unwrap_or(true) {
                anchor = Some((offset, z));
            }
        }
        offset -= 1.0;
    }
    let Some((anchor_off, anchor_z)) = anchor else {
        return StructureAttributes::failed(StationFailure::NoData);
    };

    let scan = scan_inward(section, sampler, model, anchor_off, step, None);
    finalize(section, sampler, anchor_off, anchor_z, scan, false)
}

/// Derives embankment attributes. The anchor walk follows the engineered
/// face down from offset 60 until the local slope flattens; the inward scan
/// is capped at [`REMBLAI_MAX_ITERATIONS`] and an exceeded cap voids the
/// station entirely.
pub fn remblai_attributes(
    section: &CrossSection,
    sampler: &dyn ElevationSource,
    model: &TerrainModel,
    step: f64,
) -> StructureAttributes {
    let mut i = REMBLAI_ANCHOR_START;
    loop {
        // Slope over the window straddling the candidate anchor.
        let Some(slope) = section.slope_between(sampler, i - 0.5, i + 1.0) else {
            return StructureAttributes::failed(StationFailure::NoData);
        };
        if slope.abs() >= REMBLAI_SLOPE_THRESHOLD || i <= SCAN_FLOOR {
            break;
        }
        i -= step;
    }
    let anchor_off = i;
    // The crest-side edge of the slope window keeps the anchor elevation on
    // top of the fill.
    let Some(anchor_z) = section.elevation_at_offset(sampler, anchor_off + 1.0) else {
        return StructureAttributes::failed(StationFailure::NoData);
    };

    let scan = scan_inward(
        section,
        sampler,
        model,
        anchor_off,
        step,
        Some(REMBLAI_MAX_ITERATIONS),
    );
    if !scan.converged && scan.hit_iteration_cap {
        warn!(
            "embankment scan at station {:.1} exceeded {} iterations",
            section.station, REMBLAI_MAX_ITERATIONS
        );
        return StructureAttributes::failed(StationFailure::IterationLimitExceeded);
    }
    finalize(section, sampler, anchor_off, anchor_z, scan, true)
}

struct ScanOutcome {
    /// Offset and elevation of the last usable sample; the boundary when the
    /// scan converged.
    boundary: Option<(f64, f64)>,
    converged: bool,
    hit_iteration_cap: bool,
}

/// Steps inward from `start` looking for the first sign change of
/// `actual - modelled` between consecutive valid samples.
fn scan_inward(
    section: &CrossSection,
    sampler: &dyn ElevationSource,
    model: &TerrainModel,
    start: f64,
    step: f64,
    max_iterations: Option<usize>,
) -> ScanOutcome {
    let mut j = start;
    let mut prev_diff: Option<f64> = None;
    let mut last: Option<(f64, f64)> = None;
    let mut iterations = 0usize;

    while j > SCAN_FLOOR {
        if let Some(cap) = max_iterations {
            if iterations >= cap {
                return ScanOutcome {
                    boundary: last,
                    converged: false,
                    hit_iteration_cap: true,
                };
            }
            iterations += 1;
        }
        let Some(z) = section.elevation_at_offset(sampler, j) else {
            j -= step;
            continue;
        };
        let diff = z - model.predict(j);
        last = Some((j, z));
        if let Some(prev) = prev_diff {
            if prev * diff <= 0.0 {
                return ScanOutcome {
                    boundary: last,
                    converged: true,
                    hit_iteration_cap: false,
                };
            }
        }
        prev_diff = Some(diff);
        j -= step;
    }
    ScanOutcome {
        boundary: last,
        converged: false,
        hit_iteration_cap: false,
    }
}

/// Turns a scan outcome into attributes. `anchor_above` is true for
/// embankments where the anchor sits on top of the structure.
fn finalize(
    section: &CrossSection,
    sampler: &dyn ElevationSource,
    anchor_off: f64,
    anchor_z: f64,
    scan: ScanOutcome,
    anchor_above: bool,
) -> StructureAttributes {
    let Some((boundary_off, boundary_z)) = scan.boundary else {
        return StructureAttributes::failed(StationFailure::BoundaryNotFound);
    };
    let span = (anchor_off - boundary_off).abs();
    if span < f64::EPSILON {
        return StructureAttributes::failed(StationFailure::BoundaryNotFound);
    }

    let mut failure = if scan.converged {
        None
    } else {
        Some(StationFailure::BoundaryNotFound)
    };

    let mut height = Some(if anchor_above {
        anchor_z - boundary_z
    } else {
        boundary_z - anchor_z
    });
    if height.map(|h| h > MAX_PLAUSIBLE_HEIGHT).unwrap_or(false) {
        warn!(
            "discarding implausible height {:.1} m at station {:.1}",
            height.unwrap_or_default(),
            section.station
        );
        height = None;
        failure = failure.or(Some(StationFailure::ImplausibleHeight));
    }
    let slope_total = height.map(|h| h / span);

    // Slopes at the very top and bottom of a structure are unreliable, so
    // secondary estimates use trimmed windows inside the span.
    let span_lo = anchor_off.min(boundary_off);
    let span_hi = anchor_off.max(boundary_off);
    // The trimmed window collapses (or inverts) on spans of 4 m or less.
    let slope_section = if span > SECTION_TRIM * 2.0 {
        section
            .slope_between(sampler, span_lo + SECTION_TRIM, span_hi - SECTION_TRIM)
            .map(f64::abs)
    } else {
        None
    };
    let slope_middle = if span > MIDDLE_SECTION_LENGTH {
        let mid = span_lo + span / 2.0;
        section
            .slope_between(
                sampler,
                mid - MIDDLE_SECTION_LENGTH / 2.0,
                mid + MIDDLE_SECTION_LENGTH / 2.0,
            )
            .map(f64::abs)
    } else {
        None
    };

    StructureAttributes {
        height,
        slope_total,
        slope_section,
        slope_middle,
        failure,
    }
}
