//! Reference milestones and chainage resolution.

use rstar::{PointDistance, RTree, RTreeObject, AABB};

use crate::error::MilestoneNotFound;
use crate::geometry::{Point, Polyline};

/// Point marker along the corridor carrying a numeric code and a
/// carriageway-side tag.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Milestone {
    pub position: Point,
    /// Raw marker code; only codes parseable as integers are used for
    /// chainage.
    pub code: String,
    pub label: String,
    /// Carriageway side tag, e.g. `D` or `G`.
    pub side: String,
}

/// Milestone resolved for a segment endpoint.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct MilestoneRef {
    pub code: i64,
    pub label: String,
    pub side: String,
    /// Distance along the corridor from the milestone to the endpoint,
    /// rounded to the nearest 10 m.
    pub chainage_offset: f64,
}

#[derive(Debug, Clone)]
struct IndexedMilestone {
    position: [f64; 2],
    /// Index into the filtered milestone list.
    idx: usize,
}

impl RTreeObject for IndexedMilestone {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_point(self.position)
    }
}

impl PointDistance for IndexedMilestone {
    fn distance_2(&self, point: &[f64; 2]) -> f64 {
        let dx = self.position[0] - point[0];
        let dy = self.position[1] - point[1];
        dx * dx + dy * dy
    }
}

/// Read-only spatial index over milestones with integer-convertible codes.
#[derive(Debug)]
pub struct MilestoneIndex {
    tree: RTree<IndexedMilestone>,
    entries: Vec<(Milestone, i64)>,
}

/// Number of nearest candidates considered before picking the smallest code.
const CANDIDATE_COUNT: usize = 4;

impl MilestoneIndex {
    /// Builds the index, keeping only markers whose code parses as an
    /// integer.
    pub fn build(milestones: &[Milestone]) -> Self {
        let entries: Vec<(Milestone, i64)> = milestones
            .iter()
            .filter_map(|m| m.code.trim().parse::<i64>().ok().map(|n| (m.clone(), n)))
            .collect();
        let tree = RTree::bulk_load(
            entries
                .iter()
                .enumerate()
                .map(|(idx, (m, _))| IndexedMilestone {
                    position: [m.position.x, m.position.y],
                    idx,
                })
                .collect(),
        );
        Self { tree, entries }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Resolves the reference milestone for a point: among the candidates
    /// within `radius`, takes the nearest [`CANDIDATE_COUNT`] and returns the
    /// one with the smallest numeric code.
    pub fn reference_for(
        &self,
        point: Point,
        radius: f64,
    ) -> Result<(&Milestone, i64), MilestoneNotFound> {
        let mut candidates: Vec<&IndexedMilestone> = self
            .tree
            .locate_within_distance([point.x, point.y], radius * radius)
            .collect();
        candidates.sort_by(|a, b| {
            a.distance_2(&[point.x, point.y])
                .total_cmp(&b.distance_2(&[point.x, point.y]))
        });
        candidates
            .iter()
            .take(CANDIDATE_COUNT)
            .map(|c| &self.entries[c.idx])
            .min_by_key(|(_, code)| *code)
            .map(|(m, code)| (m, *code))
            .ok_or(MilestoneNotFound)
    }
}

/// Chainage offset from a milestone to a point, both projected onto the
/// corridor line, rounded to the nearest 10 m.
pub fn chainage_offset(line: &Polyline, milestone: &Milestone, point: Point) -> Option<f64> {
    let s_point = line.project(point)?;
    let s_milestone = line.project(milestone.position)?;
    Some(((s_point - s_milestone) / 10.0).round() * 10.0)
}

/// Resolves a full milestone reference for a segment endpoint.
pub fn resolve_reference(
    index: &MilestoneIndex,
    line: &Polyline,
    point: Point,
    radius: f64,
) -> Result<MilestoneRef, MilestoneNotFound> {
    let (milestone, code) = index.reference_for(point, radius)?;
    let chainage = chainage_offset(line, milestone, point).ok_or(MilestoneNotFound)?;
    Ok(MilestoneRef {
        code,
        label: milestone.label.clone(),
        side: milestone.side.clone(),
        chainage_offset: chainage,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pr(x: f64, code: &str) -> Milestone {
        Milestone {
            position: Point::new(x, 5.0),
            code: code.to_string(),
            label: format!("PR{code}"),
            side: "D".to_string(),
        }
    }

    #[test]
    fn non_numeric_codes_are_filtered() {
        let index = MilestoneIndex::build(&[pr(0.0, "12"), pr(10.0, "x7"), pr(20.0, "")]);
        let (m, code) = index.reference_for(Point::new(10.0, 0.0), 1500.0).unwrap();
        assert_eq!(code, 12);
        assert_eq!(m.code, "12");
    }

    #[test]
    fn smallest_code_wins_among_nearest_four() {
        // Five candidates; the farthest has the smallest code and must not be
        // considered, the smallest among the nearest four wins.
        let ms = vec![
            pr(100.0, "8"),
            pr(110.0, "9"),
            pr(120.0, "7"),
            pr(130.0, "10"),
            pr(900.0, "1"),
        ];
        let index = MilestoneIndex::build(&ms);
        let (_, code) = index.reference_for(Point::new(100.0, 0.0), 1500.0).unwrap();
        assert_eq!(code, 7);
    }

    #[test]
    fn out_of_radius_is_not_found() {
        let index = MilestoneIndex::build(&[pr(5000.0, "3")]);
        assert!(index.reference_for(Point::new(0.0, 0.0), 1500.0).is_err());
    }

    #[test]
    fn chainage_rounds_to_ten_metres() {
        let line = Polyline::new(vec![Point::new(0.0, 0.0), Point::new(1000.0, 0.0)]);
        let m = pr(100.0, "4");
        let off = chainage_offset(&line, &m, Point::new(347.0, 0.0)).unwrap();
        assert_eq!(off, 250.0);
    }
}
