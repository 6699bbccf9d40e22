//! Natural terrain reconstruction by linear regression on lateral samples.

use log::debug;
use nalgebra::{DMatrix, DVector};

use crate::config::OffsetBands;
use crate::error::StationFailure;
use crate::raster::ElevationSource;
use crate::section::CrossSection;

/// Linear model of undisturbed terrain elevation against lateral offset.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct TerrainModel {
    /// Elevation change per metre of lateral offset.
    pub slope: f64,
    /// Modelled elevation at offset zero.
    pub intercept: f64,
    /// Coefficient of determination of the fit.
    pub r_squared: f64,
}

impl TerrainModel {
    /// Modelled elevation at the given offset, extrapolating freely beyond
    /// the sampled range.
    pub fn predict(&self, offset: f64) -> f64 {
        self.slope * offset + self.intercept
    }

    /// Fits an ordinary least squares line through `(offset, elevation)`
    /// pairs. Requires at least two samples.
    pub fn fit(samples: &[(f64, f64)]) -> Result<Self, StationFailure> {
        if samples.len() < 2 {
            return Err(StationFailure::NoTerrainModel);
        }
        let n = samples.len();
        let a = DMatrix::from_fn(n, 2, |i, j| if j == 0 { samples[i].0 } else { 1.0 });
        let l = DVector::from_fn(n, |i, _| samples[i].1);
        let at = a.transpose();
        let normal = &at * &a;
        let rhs = &at * &l;
        let sol = normal
            .lu()
            .solve(&rhs)
            .ok_or(StationFailure::NoTerrainModel)?;
        let slope = sol[0];
        let intercept = sol[1];

        let mean = l.iter().sum::<f64>() / n as f64;
        let ss_tot: f64 = l.iter().map(|z| (z - mean).powi(2)).sum();
        let ss_res: f64 = samples
            .iter()
            .map(|&(off, z)| (z - (slope * off + intercept)).powi(2))
            .sum();
        let r_squared = if ss_tot < f64::EPSILON {
            1.0
        } else {
            1.0 - ss_res / ss_tot
        };

        Ok(Self {
            slope,
            intercept,
            r_squared,
        })
    }

    /// Fits the natural terrain model for one cross-section by sampling both
    /// terrain bands every metre, skipping offsets without elevation data.
    pub fn from_section(
        section: &CrossSection,
        sampler: &dyn ElevationSource,
        bands: &OffsetBands,
    ) -> Result<Self, StationFailure> {
        let mut samples = Vec::new();
        for band in [bands.terrain_low, bands.terrain_high] {
            let mut offset = band.start;
            while offset <= band.end {
                if let Some(z) = section.elevation_at_offset(sampler, offset) {
                    samples.push((offset, z));
                }
                offset += 1.0;
            }
        }
        let model = Self::fit(&samples)?;
        debug!(
            "terrain model at station {:.1}: slope={:.4} intercept={:.2} r2={:.3} ({} samples)",
            section.station,
            model.slope,
            model.intercept,
            model.r_squared,
            samples.len()
        );
        Ok(model)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::OffsetBands;
    use crate::geometry::{Point, Polyline};
    use crate::raster::ElevationGrid;

    #[test]
    fn exact_line_is_recovered() {
        let samples: Vec<(f64, f64)> = (0..20).map(|i| (i as f64, 3.0 + 0.5 * i as f64)).collect();
        let model = TerrainModel::fit(&samples).unwrap();
        assert!((model.slope - 0.5).abs() < 1e-9);
        assert!((model.intercept - 3.0).abs() < 1e-9);
        assert!((model.r_squared - 1.0).abs() < 1e-9);
        assert!((model.predict(100.0) - 53.0).abs() < 1e-9);
    }

    #[test]
    fn flat_samples_yield_full_fit_quality() {
        let samples: Vec<(f64, f64)> = (0..10).map(|i| (i as f64, 7.0)).collect();
        let model = TerrainModel::fit(&samples).unwrap();
        assert!(model.slope.abs() < 1e-9);
        assert!((model.r_squared - 1.0).abs() < 1e-9);
    }

    #[test]
    fn too_few_samples_fail() {
        assert_eq!(
            TerrainModel::fit(&[(0.0, 1.0)]).unwrap_err(),
            StationFailure::NoTerrainModel
        );
        assert_eq!(
            TerrainModel::fit(&[]).unwrap_err(),
            StationFailure::NoTerrainModel
        );
    }

    #[test]
    fn section_fit_over_constant_surface() {
        let grid = ElevationGrid::from_fn(400, 400, -200.0, 200.0, 1.0, |_, _| 100.0);
        let line = Polyline::new(vec![Point::new(0.0, 0.0), Point::new(300.0, 0.0)]);
        let cs = CrossSection::at_station(&line, 150.0, 60.0).unwrap();
        let bands = OffsetBands::for_lane_count(2);
        let model = TerrainModel::from_section(&cs, &grid, &bands).unwrap();
        assert!((model.predict(60.0) - 100.0).abs() < 1e-9);
    }
}
