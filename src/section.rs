//! Cross-section generation and lateral elevation sampling.

use crate::geometry::{Line, Point, Polyline};
use crate::raster::ElevationSource;

/// Spacing of the point pair used to estimate the local tangent.
const TANGENT_SPACING: f64 = 10.0;
/// Below this station the tangent is taken forward to avoid negative offsets.
const FORWARD_TANGENT_LIMIT: f64 = 15.0;

/// Transect perpendicular to the corridor at one station.
///
/// Offsets are measured in metres from the `offset 0` end of the transect;
/// the corridor station sits at the midpoint (offset equal to the configured
/// half-length).
#[derive(Debug, Clone, PartialEq)]
pub struct CrossSection {
    /// Station along the corridor line this section was generated at.
    pub station: f64,
    /// Full transect; `line.start` is the offset-0 end.
    pub line: Line,
}

impl CrossSection {
    /// Computes the cross-section at `station` along `line`.
    ///
    /// The local bearing is estimated from a point pair [`TANGENT_SPACING`]
    /// apart, forward of the station near the line start and backward
    /// otherwise, then rotated a quarter turn. Returns `None` when the line
    /// has no usable tangent.
    pub fn at_station(line: &Polyline, station: f64, half_length: f64) -> Option<Self> {
        let center = line.point_at(station)?;
        let (a, b) = if station <= FORWARD_TANGENT_LIMIT {
            (center, line.point_at(station + TANGENT_SPACING)?)
        } else {
            (line.point_at(station - TANGENT_SPACING)?, center)
        };
        let bearing = (b.y - a.y).atan2(b.x - a.x);
        let normal = bearing + std::f64::consts::FRAC_PI_2;
        let dx = half_length * normal.cos();
        let dy = half_length * normal.sin();
        let start = Point::new(center.x - dx, center.y - dy);
        let end = Point::new(center.x + dx, center.y + dy);
        if start == end {
            return None;
        }
        Some(Self {
            station,
            line: Line::new(start, end),
        })
    }

    /// Total transect length (twice the half-length).
    pub fn length(&self) -> f64 {
        self.line.length()
    }

    /// Planar point at the given lateral offset.
    pub fn point_at_offset(&self, offset: f64) -> Point {
        self.line.point_at(offset)
    }

    /// Elevation at the given lateral offset.
    pub fn elevation_at_offset(&self, sampler: &dyn ElevationSource, offset: f64) -> Option<f64> {
        sampler.elevation_at(self.point_at_offset(offset))
    }

    /// Mean elevation over `[start, end]` sampled every metre. Offsets without
    /// data are skipped; `None` when no sample is valid.
    pub fn mean_elevation(
        &self,
        sampler: &dyn ElevationSource,
        start: f64,
        end: f64,
    ) -> Option<f64> {
        let mut sum = 0.0;
        let mut count = 0usize;
        let mut offset = start;
        while offset <= end {
            if let Some(z) = self.elevation_at_offset(sampler, offset) {
                sum += z;
                count += 1;
            }
            offset += 1.0;
        }
        if count == 0 {
            None
        } else {
            Some(sum / count as f64)
        }
    }

    /// Slope of the real terrain between two lateral offsets, signed in the
    /// direction of increasing offset.
    pub fn slope_between(
        &self,
        sampler: &dyn ElevationSource,
        offset_a: f64,
        offset_b: f64,
    ) -> Option<f64> {
        let za = self.elevation_at_offset(sampler, offset_a)?;
        let zb = self.elevation_at_offset(sampler, offset_b)?;
        let run = offset_b - offset_a;
        if run.abs() < f64::EPSILON {
            return None;
        }
        Some((zb - za) / run)
    }

    /// Local terrain slope at `offset` over a one-metre straddling window.
    pub fn local_slope(&self, sampler: &dyn ElevationSource, offset: f64) -> Option<f64> {
        self.slope_between(sampler, offset - 0.5, offset + 0.5)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raster::ElevationGrid;

    fn straight_line() -> Polyline {
        Polyline::new(vec![Point::new(0.0, 0.0), Point::new(300.0, 0.0)])
    }

    #[test]
    fn section_is_perpendicular_and_centered() {
        let line = straight_line();
        let cs = CrossSection::at_station(&line, 100.0, 60.0).unwrap();
        assert!((cs.length() - 120.0).abs() < 1e-9);
        // Line runs along +x, so the transect runs along y.
        assert!((cs.line.start.x - 100.0).abs() < 1e-9);
        assert!((cs.line.end.x - 100.0).abs() < 1e-9);
        assert!((cs.line.end.y - cs.line.start.y).abs() - 120.0 < 1e-9);
        let mid = cs.point_at_offset(60.0);
        assert!((mid.x - 100.0).abs() < 1e-9);
        assert!(mid.y.abs() < 1e-9);
    }

    #[test]
    fn near_start_uses_forward_tangent() {
        let line = straight_line();
        let cs = CrossSection::at_station(&line, 5.0, 60.0).unwrap();
        assert!((cs.point_at_offset(60.0).x - 5.0).abs() < 1e-9);
    }

    #[test]
    fn mean_elevation_over_band() {
        let grid = ElevationGrid::from_fn(400, 400, -200.0, 200.0, 1.0, |_, _| 42.0);
        let line = straight_line();
        let cs = CrossSection::at_station(&line, 100.0, 60.0).unwrap();
        let mean = cs.mean_elevation(&grid, 57.0, 63.0).unwrap();
        assert!((mean - 42.0).abs() < 1e-9);
    }

    #[test]
    fn local_slope_on_tilted_plane() {
        // Elevation rises with y at 10%; the transect at a station along +x
        // runs parallel to y, so the lateral slope is 0.1.
        let grid = ElevationGrid::from_fn(400, 400, -200.0, 200.0, 1.0, |_, y| 0.1 * y);
        let line = straight_line();
        let cs = CrossSection::at_station(&line, 100.0, 60.0).unwrap();
        let slope = cs.local_slope(&grid, 40.0).unwrap();
        assert!((slope.abs() - 0.1).abs() < 0.02);
    }
}
