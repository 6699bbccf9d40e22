//! Planar geometry primitives shared by the analysis modules.
//!
//! All coordinates live in one fixed projected coordinate system with metric
//! units; no geodetic computations are performed.

/// Representation of a 2D point.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Calculates the Euclidean distance between two points.
pub fn distance(a: Point, b: Point) -> f64 {
    ((b.x - a.x).powi(2) + (b.y - a.y).powi(2)).sqrt()
}

/// Representation of a 2D line segment between two points.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Line {
    pub start: Point,
    pub end: Point,
}

impl Line {
    /// Creates a new line segment.
    pub fn new(start: Point, end: Point) -> Self {
        Self { start, end }
    }

    /// Returns the length of the line segment.
    pub fn length(&self) -> f64 {
        distance(self.start, self.end)
    }

    /// Returns the azimuth from the start point to the end point in radians.
    pub fn azimuth(&self) -> f64 {
        (self.end.y - self.start.y).atan2(self.end.x - self.start.x)
    }

    /// Returns the point at distance `s` from the start, measured along the
    /// segment. Values outside `[0, length]` extrapolate along the segment
    /// direction.
    pub fn point_at(&self, s: f64) -> Point {
        let len = self.length();
        if len < f64::EPSILON {
            return self.start;
        }
        let t = s / len;
        Point::new(
            self.start.x + t * (self.end.x - self.start.x),
            self.start.y + t * (self.end.y - self.start.y),
        )
    }
}

/// Representation of a series of connected line segments.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Polyline {
    pub vertices: Vec<Point>,
}

impl Polyline {
    /// Creates a new polyline from a list of vertices.
    pub fn new(vertices: Vec<Point>) -> Self {
        Self { vertices }
    }

    /// Returns the total length of all segments in the polyline.
    pub fn length(&self) -> f64 {
        self.vertices
            .windows(2)
            .map(|pair| distance(pair[0], pair[1]))
            .sum()
    }

    /// Returns the position at the given station along the polyline.
    ///
    /// Stations before the start clamp to the first vertex and stations past
    /// the end clamp to the last vertex.
    pub fn point_at(&self, station: f64) -> Option<Point> {
        if self.vertices.is_empty() {
            return None;
        }
        if station <= 0.0 {
            return self.vertices.first().copied();
        }
        let mut remaining = station;
        for pair in self.vertices.windows(2) {
            let len = distance(pair[0], pair[1]);
            if remaining <= len {
                let t = if len < f64::EPSILON {
                    0.0
                } else {
                    remaining / len
                };
                return Some(Point::new(
                    pair[0].x + t * (pair[1].x - pair[0].x),
                    pair[0].y + t * (pair[1].y - pair[0].y),
                ));
            }
            remaining -= len;
        }
        self.vertices.last().copied()
    }

    /// Returns a unit tangent vector at the given station.
    pub fn direction_at(&self, station: f64) -> Option<(f64, f64)> {
        if self.vertices.len() < 2 {
            return None;
        }
        let mut remaining = station.max(0.0);
        for pair in self.vertices.windows(2) {
            let len = distance(pair[0], pair[1]);
            if remaining <= len || pair[1] == *self.vertices.last().unwrap() {
                let dx = pair[1].x - pair[0].x;
                let dy = pair[1].y - pair[0].y;
                if len < f64::EPSILON {
                    return None;
                }
                return Some((dx / len, dy / len));
            }
            remaining -= len;
        }
        None
    }

    /// Projects `p` onto the polyline and returns the station of the closest
    /// point.
    pub fn project(&self, p: Point) -> Option<f64> {
        if self.vertices.len() < 2 {
            return None;
        }
        let mut best_station = 0.0;
        let mut best_dist = f64::INFINITY;
        let mut walked = 0.0;
        for pair in self.vertices.windows(2) {
            let len = distance(pair[0], pair[1]);
            let (s, d) = if len < f64::EPSILON {
                (0.0, distance(pair[0], p))
            } else {
                let dx = pair[1].x - pair[0].x;
                let dy = pair[1].y - pair[0].y;
                let t = (((p.x - pair[0].x) * dx + (p.y - pair[0].y) * dy) / (len * len))
                    .clamp(0.0, 1.0);
                let foot = Point::new(pair[0].x + t * dx, pair[0].y + t * dy);
                (t * len, distance(foot, p))
            };
            if d < best_dist {
                best_dist = d;
                best_station = walked + s;
            }
            walked += len;
        }
        Some(best_station)
    }
}

/// Returns `true` if point `p` is inside the polygon defined by `poly` using
/// the ray casting algorithm.
pub fn point_in_polygon(p: Point, poly: &[Point]) -> bool {
    let mut inside = false;
    if poly.is_empty() {
        return inside;
    }
    let mut j = poly.len() - 1;
    for i in 0..poly.len() {
        let pi = poly[i];
        let pj = poly[j];
        if ((pi.y > p.y) != (pj.y > p.y))
            && (p.x < (pj.x - pi.x) * (p.y - pi.y) / (pj.y - pi.y) + pi.x)
        {
            inside = !inside;
        }
        j = i;
    }
    inside
}

/// Distance from `p` to the segment `a`-`b`.
pub fn point_segment_distance(p: Point, a: Point, b: Point) -> f64 {
    let len = distance(a, b);
    if len < f64::EPSILON {
        return distance(p, a);
    }
    let dx = b.x - a.x;
    let dy = b.y - a.y;
    let t = (((p.x - a.x) * dx + (p.y - a.y) * dy) / (len * len)).clamp(0.0, 1.0);
    let foot = Point::new(a.x + t * dx, a.y + t * dy);
    distance(p, foot)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn line_length_and_azimuth() {
        let line = Line::new(Point::new(0.0, 0.0), Point::new(3.0, 4.0));
        assert_eq!(line.length(), 5.0);
        assert!((line.azimuth() - (4.0f64).atan2(3.0)).abs() < 1e-9);
    }

    #[test]
    fn line_point_at_interpolates_and_extrapolates() {
        let line = Line::new(Point::new(0.0, 0.0), Point::new(10.0, 0.0));
        let mid = line.point_at(5.0);
        assert!((mid.x - 5.0).abs() < 1e-9);
        let beyond = line.point_at(12.0);
        assert!((beyond.x - 12.0).abs() < 1e-9);
    }

    #[test]
    fn polyline_station_queries() {
        let pl = Polyline::new(vec![
            Point::new(0.0, 0.0),
            Point::new(10.0, 0.0),
            Point::new(10.0, 10.0),
        ]);
        assert!((pl.length() - 20.0).abs() < 1e-9);
        let p = pl.point_at(15.0).unwrap();
        assert!((p.x - 10.0).abs() < 1e-9);
        assert!((p.y - 5.0).abs() < 1e-9);
        let dir = pl.direction_at(15.0).unwrap();
        assert!((dir.0 - 0.0).abs() < 1e-9);
        assert!((dir.1 - 1.0).abs() < 1e-9);
        let s = pl.project(Point::new(11.0, 5.0)).unwrap();
        assert!((s - 15.0).abs() < 1e-9);
    }

    #[test]
    fn polyline_point_at_clamps() {
        let pl = Polyline::new(vec![Point::new(0.0, 0.0), Point::new(10.0, 0.0)]);
        assert_eq!(pl.point_at(-1.0).unwrap(), Point::new(0.0, 0.0));
        assert_eq!(pl.point_at(99.0).unwrap(), Point::new(10.0, 0.0));
    }

    #[test]
    fn point_in_polygon_square() {
        let square = vec![
            Point::new(0.0, 0.0),
            Point::new(2.0, 0.0),
            Point::new(2.0, 2.0),
            Point::new(0.0, 2.0),
        ];
        assert!(point_in_polygon(Point::new(1.0, 1.0), &square));
        assert!(!point_in_polygon(Point::new(3.0, 1.0), &square));
    }

    #[test]
    fn segment_distance() {
        let d = point_segment_distance(
            Point::new(5.0, 3.0),
            Point::new(0.0, 0.0),
            Point::new(10.0, 0.0),
        );
        assert!((d - 3.0).abs() < 1e-9);
    }
}
