//! Failure taxonomy of the detection run.
//!
//! Station-level conditions are recorded on the station record and never
//! abort the run; only provider failures surface as hard errors.

use thiserror::Error;

/// Recoverable condition encountered while analysing a single station.
///
/// These are data, not control flow: the affected attributes stay `None` and
/// processing continues with the next station.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error, serde::Serialize, serde::Deserialize)]
pub enum StationFailure {
    /// Elevation raster returned no data for a required coordinate.
    #[error("no elevation data at a required coordinate")]
    NoData,
    /// Fewer than two valid samples were available for the terrain regression.
    #[error("insufficient samples for the natural terrain model")]
    NoTerrainModel,
    /// The lateral scan exhausted its range without a sign change; partial
    /// attributes are kept.
    #[error("terrain did not reconverge with the natural model")]
    BoundaryNotFound,
    /// Detected structure height exceeded the plausibility guard.
    #[error("implausible structure height discarded")]
    ImplausibleHeight,
    /// The embankment scan hit its iteration cap.
    #[error("boundary scan iteration limit exceeded")]
    IterationLimitExceeded,
}

/// Condition encountered while naming a segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error, serde::Serialize, serde::Deserialize)]
#[error("no reference milestone within search radius")]
pub struct MilestoneNotFound;

/// Failures of the external collaborators feeding the run.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("elevation provider failed: {0}")]
    Elevation(String),
    #[error("route geometry provider failed: {0}")]
    RouteGeometry(String),
    #[error("milestone provider failed: {0}")]
    Milestone(String),
    #[error("bridge structure provider failed: {0}")]
    Bridge(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
