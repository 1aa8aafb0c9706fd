//! Uniform-grid spatial hash for neighbor queries during Poisson-disk sampling.

use std::collections::HashMap;

use crate::geometry::Point3d;
use crate::sampling::{MeasurementPoint, SamplingError};

type CellKey = (i64, i64, i64);

/// Buckets points into cubic cells. Neighbor queries are conservative: every
/// stored point within `radius` of the query is returned, possibly along
/// with some farther ones.
#[derive(Debug, Clone)]
pub struct SpatialHashIndex {
    cell_size: f64,
    cells: HashMap<CellKey, Vec<MeasurementPoint>>,
    len: usize,
}

impl SpatialHashIndex {
    pub fn new(cell_size: f64) -> Result<Self, SamplingError> {
        if !(cell_size.is_finite() && cell_size > 0.0) {
            return Err(SamplingError::InvalidCellSize(cell_size));
        }
        Ok(Self {
            cell_size,
            cells: HashMap::new(),
            len: 0,
        })
    }

    /// Index sized so that a cell diagonal equals `min_distance`.
    pub fn for_min_distance(min_distance: f64) -> Result<Self, SamplingError> {
        Self::new(min_distance / 3f64.sqrt())
    }

    pub fn cell_size(&self) -> f64 {
        self.cell_size
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    fn key(&self, p: &Point3d) -> CellKey {
        (
            (p.x / self.cell_size).floor() as i64,
            (p.y / self.cell_size).floor() as i64,
            (p.z / self.cell_size).floor() as i64,
        )
    }

    pub fn insert(&mut self, point: MeasurementPoint) {
        let key = self.key(&point.position);
        self.cells.entry(key).or_default().push(point);
        self.len += 1;
    }

    /// Candidate points within `radius` of `query`.
    pub fn neighbors(&self, query: &Point3d, radius: f64) -> Vec<&MeasurementPoint> {
        let (cx, cy, cz) = self.key(query);
        let reach = (radius / self.cell_size).ceil().max(0.0) as i64;
        let mut found = Vec::new();
        for dx in -reach..=reach {
            for dy in -reach..=reach {
                for dz in -reach..=reach {
                    if let Some(bucket) = self.cells.get(&(cx + dx, cy + dy, cz + dz)) {
                        found.extend(bucket.iter());
                    }
                }
            }
        }
        found
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Vec3;

    fn mp(x: f64, y: f64, z: f64) -> MeasurementPoint {
        MeasurementPoint::new(Point3d::new(x, y, z), Vec3::Z)
    }

    #[test]
    fn test_rejects_bad_cell_size() {
        assert!(SpatialHashIndex::new(0.0).is_err());
        assert!(SpatialHashIndex::new(-1.0).is_err());
        assert!(SpatialHashIndex::new(f64::NAN).is_err());
        assert!(SpatialHashIndex::for_min_distance(2.0).is_ok());
    }

    #[test]
    fn test_neighbors_include_close_points() {
        let mut index = SpatialHashIndex::for_min_distance(1.0).unwrap();
        index.insert(mp(0.0, 0.0, 0.0));
        index.insert(mp(0.9, 0.0, 0.0));
        index.insert(mp(-0.5, -0.5, 0.2));
        index.insert(mp(50.0, 0.0, 0.0));
        assert_eq!(index.len(), 4);

        let near = index.neighbors(&Point3d::new(0.1, 0.0, 0.0), 1.0);
        assert_eq!(near.len(), 3);
        assert!(near.iter().all(|p| p.position.x < 10.0));
    }

    #[test]
    fn test_negative_coordinates_bucket_by_floor() {
        let mut index = SpatialHashIndex::new(1.0).unwrap();
        index.insert(mp(-0.1, -0.1, -0.1));
        let near = index.neighbors(&Point3d::new(0.05, 0.05, 0.05), 0.2);
        assert_eq!(near.len(), 1);
    }
}
