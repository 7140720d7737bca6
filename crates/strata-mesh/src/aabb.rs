//! Axis-aligned bounding box used as the bounding volume for LOD meshes.

use glam::Vec3;

/// Axis-aligned bounding box.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Aabb {
    /// Minimum corner.
    pub min: Vec3,
    /// Maximum corner.
    pub max: Vec3,
}

impl Aabb {
    /// An empty box: `min` at +infinity, `max` at -infinity.
    /// Unioning any point into it yields a box containing exactly that point.
    pub const EMPTY: Self = Self {
        min: Vec3::splat(f32::INFINITY),
        max: Vec3::splat(f32::NEG_INFINITY),
    };

    /// Compute the bounding box of a point set.
    /// Returns [`Aabb::EMPTY`] for an empty slice.
    #[must_use]
    pub fn from_points(points: &[Vec3]) -> Self {
        let mut aabb = Self::EMPTY;
        for &p in points {
            aabb.union_point(p);
        }
        aabb
    }

    /// Grow the box to contain `p`.
    pub fn union_point(&mut self, p: Vec3) {
        self.min = self.min.min(p);
        self.max = self.max.max(p);
    }

    /// Center of the box. Meaningless for an empty box.
    #[must_use]
    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    /// Whether the box contains no points.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.min.x > self.max.x
    }
}

impl Default for Aabb {
    fn default() -> Self {
        Self::EMPTY
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// An empty box should report empty and grow correctly from one point.
    #[test]
    fn test_empty_box_grows_from_point() {
        let mut aabb = Aabb::EMPTY;
        assert!(aabb.is_empty());
        aabb.union_point(Vec3::new(1.0, 2.0, 3.0));
        assert!(!aabb.is_empty());
        assert_eq!(aabb.min, Vec3::new(1.0, 2.0, 3.0));
        assert_eq!(aabb.max, Vec3::new(1.0, 2.0, 3.0));
    }

    /// `from_points` should produce the tight bounds of the set.
    #[test]
    fn test_from_points_tight_bounds() {
        let points = [
            Vec3::new(-1.0, 0.0, 2.0),
            Vec3::new(3.0, -2.0, 0.0),
            Vec3::new(0.0, 1.0, -4.0),
        ];
        let aabb = Aabb::from_points(&points);
        assert_eq!(aabb.min, Vec3::new(-1.0, -2.0, -4.0));
        assert_eq!(aabb.max, Vec3::new(3.0, 1.0, 2.0));
    }

    /// The center is the midpoint of min and max.
    #[test]
    fn test_center_is_midpoint() {
        let aabb = Aabb::from_points(&[Vec3::ZERO, Vec3::new(2.0, 4.0, 6.0)]);
        assert_eq!(aabb.center(), Vec3::new(1.0, 2.0, 3.0));
    }
}
