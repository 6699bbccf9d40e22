//! Data source abstractions for corridor geometry, milestones and bridges.
//!
//! The detection pipeline never talks to a concrete data store; callers hand
//! it implementations of these traits backed by whatever holds the corridor
//! data.

use geo_types::Geometry;

use crate::error::ProviderError;
use crate::milestone::Milestone;
use crate::profile::CorridorLine;

pub use crate::raster::ElevationSource;

/// Axis-aligned query window in the corridor's planar CRS.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct BoundingBox {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl BoundingBox {
    pub fn new(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        Self {
            min_x,
            min_y,
            max_x,
            max_y,
        }
    }

    pub fn contains(&self, x: f64, y: f64) -> bool {
        x >= self.min_x && x <= self.max_x && y >= self.min_y && y <= self.max_y
    }

    /// Grows the window by `margin` on every side.
    pub fn expanded(&self, margin: f64) -> Self {
        Self {
            min_x: self.min_x - margin,
            min_y: self.min_y - margin,
            max_x: self.max_x + margin,
            max_y: self.max_y + margin,
        }
    }
}

/// Source of corridor centreline geometry with roadway attributes.
pub trait RouteGeometryProvider {
    fn route_lines(&self, window: &BoundingBox) -> Result<Vec<CorridorLine>, ProviderError>;
}

/// Source of reference milestones.
pub trait MilestoneProvider {
    fn milestones(&self, window: &BoundingBox) -> Result<Vec<Milestone>, ProviderError>;
}

/// Source of bridge footprints used for segment exclusion.
pub trait BridgeProvider {
    fn bridges(&self, window: &BoundingBox) -> Result<Vec<Geometry<f64>>, ProviderError>;
}

/// In-memory providers, mainly for tests and small batch runs.
pub mod memory {
    use super::*;

    pub struct StaticRoutes(pub Vec<CorridorLine>);

    impl RouteGeometryProvider for StaticRoutes {
        fn route_lines(&self, _window: &BoundingBox) -> Result<Vec<CorridorLine>, ProviderError> {
            Ok(self.0.clone())
        }
    }

    pub struct StaticMilestones(pub Vec<Milestone>);

    impl MilestoneProvider for StaticMilestones {
        fn milestones(&self, _window: &BoundingBox) -> Result<Vec<Milestone>, ProviderError> {
            Ok(self.0.clone())
        }
    }

    pub struct StaticBridges(pub Vec<Geometry<f64>>);

    impl BridgeProvider for StaticBridges {
        fn bridges(&self, _window: &BoundingBox) -> Result<Vec<Geometry<f64>>, ProviderError> {
            Ok(self.0.clone())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bounding_box_contains_and_expands() {
        let b = BoundingBox::new(0.0, 0.0, 10.0, 10.0);
        assert!(b.contains(5.0, 5.0));
        assert!(!b.contains(11.0, 5.0));
        let e = b.expanded(2.0);
        assert!(e.contains(11.0, 5.0));
        assert!(e.contains(-1.5, -1.5));
    }
}
