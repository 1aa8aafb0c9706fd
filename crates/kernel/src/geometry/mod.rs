pub mod intersection;
pub mod point;
pub mod ray;
pub mod transform;
pub mod vector;

pub use intersection::RayHit;
pub use point::{Point2d, Point3d};
pub use ray::Ray;
pub use transform::{BoundingBox, Transform};
pub use vector::Vec3;
