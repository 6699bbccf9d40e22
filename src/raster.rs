//! Read-only elevation sampling over an in-memory raster.

use crate::geometry::Point;

/// Read-only accessor over terrain elevation.
///
/// Implementations never fail: coordinates outside the covered extent or
/// falling on a no-data cell simply return `None`. Implementations must be
/// safe for concurrent reads.
pub trait ElevationSource {
    /// Elevation at the given planar coordinate, or `None` when unknown.
    fn elevation(&self, x: f64, y: f64) -> Option<f64>;

    /// Convenience sampling at a [`Point`].
    fn elevation_at(&self, p: Point) -> Option<f64> {
        self.elevation(p.x, p.y)
    }
}

/// In-memory elevation raster with a north-up affine placement.
///
/// Cell `(row, col)` covers the square whose upper-left corner is at
/// `(origin_x + col * resolution, origin_y - row * resolution)`.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ElevationGrid {
    data: Vec<f64>,
    rows: usize,
    cols: usize,
    origin_x: f64,
    origin_y: f64,
    resolution: f64,
    nodata: Option<f64>,
}

impl ElevationGrid {
    /// Creates a grid from row-major cell values.
    ///
    /// `origin_x`/`origin_y` locate the upper-left corner of the raster and
    /// `resolution` is the square cell size in metres. Returns `None` when
    /// the data length does not match `rows * cols` or the resolution is not
    /// strictly positive.
    pub fn new(
        data: Vec<f64>,
        rows: usize,
        cols: usize,
        origin_x: f64,
        origin_y: f64,
        resolution: f64,
        nodata: Option<f64>,
    ) -> Option<Self> {
        if data.len() != rows * cols || resolution <= 0.0 {
            return None;
        }
        Some(Self {
            data,
            rows,
            cols,
            origin_x,
            origin_y,
            resolution,
            nodata,
        })
    }

    /// Builds a grid by evaluating `f` at every cell center. Test helper and
    /// synthetic-surface constructor.
    pub fn from_fn(
        rows: usize,
        cols: usize,
        origin_x: f64,
        origin_y: f64,
        resolution: f64,
        f: impl Fn(f64, f64) -> f64,
    ) -> Self {
        let mut data = Vec::with_capacity(rows * cols);
        for row in 0..rows {
            for col in 0..cols {
                let x = origin_x + (col as f64 + 0.5) * resolution;
                let y = origin_y - (row as f64 + 0.5) * resolution;
                data.push(f(x, y));
            }
        }
        Self {
            data,
            rows,
            cols,
            origin_x,
            origin_y,
            resolution,
            nodata: None,
        }
    }

    /// Extent covered by the raster as `(min_x, min_y, max_x, max_y)`.
    pub fn bounds(&self) -> (f64, f64, f64, f64) {
        (
            self.origin_x,
            self.origin_y - self.rows as f64 * self.resolution,
            self.origin_x + self.cols as f64 * self.resolution,
            self.origin_y,
        )
    }

    /// Cell size in metres.
    pub fn resolution(&self) -> f64 {
        self.resolution
    }
}

impl ElevationSource for ElevationGrid {
    fn elevation(&self, x: f64, y: f64) -> Option<f64> {
        if !x.is_finite() || !y.is_finite() {
            return None;
        }
        let col = ((x - self.origin_x) / self.resolution).floor();
        let row = ((self.origin_y - y) / self.resolution).floor();
        if col < 0.0 || row < 0.0 {
            return None;
        }
        let (row, col) = (row as usize, col as usize);
        if row >= self.rows || col >= self.cols {
            return None;
        }
        let z = self.data[row * self.cols + col];
        if !z.is_finite() {
            return None;
        }
        if let Some(nd) = self.nodata {
            if (z - nd).abs() < f64::EPSILON {
                return None;
            }
        }
        Some(z)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn samples_inside_extent() {
        let grid = ElevationGrid::from_fn(10, 10, 0.0, 10.0, 1.0, |x, _| x);
        let z = grid.elevation(3.5, 5.0).unwrap();
        assert!((z - 3.5).abs() < 1e-9);
    }

    #[test]
    fn outside_extent_is_nodata() {
        let grid = ElevationGrid::from_fn(10, 10, 0.0, 10.0, 1.0, |_, _| 1.0);
        assert!(grid.elevation(-0.1, 5.0).is_none());
        assert!(grid.elevation(5.0, 10.1).is_none());
        assert!(grid.elevation(10.5, 5.0).is_none());
        assert!(grid.elevation(f64::NAN, 5.0).is_none());
    }

    #[test]
    fn nodata_value_is_masked() {
        let grid =
            ElevationGrid::new(vec![-9999.0, 2.0, 3.0, 4.0], 2, 2, 0.0, 2.0, 1.0, Some(-9999.0))
                .unwrap();
        assert!(grid.elevation(0.5, 1.5).is_none());
        assert_eq!(grid.elevation(1.5, 1.5), Some(2.0));
    }

    #[test]
    fn rejects_mismatched_dimensions() {
        assert!(ElevationGrid::new(vec![0.0; 3], 2, 2, 0.0, 0.0, 1.0, None).is_none());
        assert!(ElevationGrid::new(vec![0.0; 4], 2, 2, 0.0, 0.0, 0.0, None).is_none());
    }
}
