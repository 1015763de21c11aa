use glam::Vec3;
use shared::MeshId;

/// A ray in world space
#[derive(Clone, Copy, Debug)]
pub struct Ray {
    pub origin: Vec3,
    pub direction: Vec3,
}

/// Axis-aligned bounding box
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self {
            min: min.min(max),
            max: min.max(max),
        }
    }

    /// Box from a center point and full extents
    pub fn from_center_size(center: Vec3, size: Vec3) -> Self {
        let half = size.abs() * 0.5;
        Self {
            min: center - half,
            max: center + half,
        }
    }

    /// Center of the bounding box
    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    pub fn size(&self) -> Vec3 {
        self.max - self.min
    }

    /// Smallest box containing both
    pub fn union(&self, other: &Aabb) -> Aabb {
        Aabb {
            min: self.min.min(other.min),
            max: self.max.max(other.max),
        }
    }

    /// The 8 corners, in no particular winding
    pub fn corners(&self) -> [Vec3; 8] {
        let (a, b) = (self.min, self.max);
        [
            Vec3::new(a.x, a.y, a.z),
            Vec3::new(b.x, a.y, a.z),
            Vec3::new(a.x, b.y, a.z),
            Vec3::new(b.x, b.y, a.z),
            Vec3::new(a.x, a.y, b.z),
            Vec3::new(b.x, a.y, b.z),
            Vec3::new(a.x, b.y, b.z),
            Vec3::new(b.x, b.y, b.z),
        ]
    }

    /// Thin along Y relative to its horizontal footprint (floor plates, slabs).
    pub fn is_flat(&self, ratio: f32) -> bool {
        let size = self.size();
        let footprint = size.x.max(size.z);
        if footprint <= f32::EPSILON {
            return false;
        }
        size.y / footprint < ratio
    }
}

/// Ray-AABB intersection using the slab method.
/// Returns the distance along the ray to the nearest hit, or None.
pub fn ray_aabb(ray: &Ray, aabb: &Aabb) -> Option<f32> {
    let inv_dir = Vec3::new(
        1.0 / ray.direction.x,
        1.0 / ray.direction.y,
        1.0 / ray.direction.z,
    );

    let t1 = (aabb.min.x - ray.origin.x) * inv_dir.x;
    let t2 = (aabb.max.x - ray.origin.x) * inv_dir.x;
    let t3 = (aabb.min.y - ray.origin.y) * inv_dir.y;
    let t4 = (aabb.max.y - ray.origin.y) * inv_dir.y;
    let t5 = (aabb.min.z - ray.origin.z) * inv_dir.z;
    let t6 = (aabb.max.z - ray.origin.z) * inv_dir.z;

    let tmin = t1.min(t2).max(t3.min(t4)).max(t5.min(t6));
    let tmax = t1.max(t2).min(t3.max(t4)).min(t5.max(t6));

    if tmax.is_nan() || tmin.is_nan() || tmax < 0.0 || tmin > tmax {
        return None;
    }

    Some(if tmin < 0.0 { tmax } else { tmin })
}

/// Pick the nearest mesh whose AABB is intersected by the ray.
/// Ties keep the first candidate seen.
pub fn pick_nearest<'a>(
    ray: &Ray,
    boxes: impl IntoIterator<Item = (MeshId, &'a Aabb)>,
) -> Option<MeshId> {
    let mut best: Option<(MeshId, f32)> = None;

    for (id, aabb) in boxes {
        if let Some(dist) = ray_aabb(ray, aabb) {
            if best.as_ref().is_none_or(|(_, d)| dist < *d) {
                best = Some((id, dist));
            }
        }
    }

    best.map(|(id, _)| id)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn down_ray(x: f32, z: f32) -> Ray {
        Ray {
            origin: Vec3::new(x, 10.0, z),
            direction: Vec3::NEG_Y,
        }
    }

    #[test]
    fn test_ray_hits_box() {
        let b = Aabb::new(Vec3::ZERO, Vec3::ONE);
        let d = ray_aabb(&down_ray(0.5, 0.5), &b).unwrap();
        assert!((d - 9.0).abs() < 1e-5);
    }

    #[test]
    fn test_ray_misses_box() {
        let b = Aabb::new(Vec3::ZERO, Vec3::ONE);
        assert!(ray_aabb(&down_ray(2.0, 0.5), &b).is_none());
    }

    #[test]
    fn test_box_behind_ray() {
        let b = Aabb::new(Vec3::ZERO, Vec3::ONE);
        let ray = Ray {
            origin: Vec3::new(0.5, 10.0, 0.5),
            direction: Vec3::Y,
        };
        assert!(ray_aabb(&ray, &b).is_none());
    }

    #[test]
    fn test_pick_nearest_prefers_closest() {
        let low = Aabb::new(Vec3::ZERO, Vec3::new(1.0, 1.0, 1.0));
        let high = Aabb::new(Vec3::new(0.0, 2.0, 0.0), Vec3::new(1.0, 3.0, 1.0));
        let boxes = [(MeshId(1), &low), (MeshId(2), &high)];
        assert_eq!(pick_nearest(&down_ray(0.5, 0.5), boxes), Some(MeshId(2)));
    }

    #[test]
    fn test_corners_span_box() {
        let b = Aabb::new(Vec3::new(-1.0, -2.0, -3.0), Vec3::new(1.0, 2.0, 3.0));
        let corners = b.corners();
        let min = corners.iter().fold(Vec3::splat(f32::MAX), |m, c| m.min(*c));
        let max = corners.iter().fold(Vec3::splat(f32::MIN), |m, c| m.max(*c));
        assert_eq!(Aabb::new(min, max), b);
    }

    #[test]
    fn test_flat_detection() {
        let plate = Aabb::from_center_size(Vec3::ZERO, Vec3::new(4.0, 0.05, 3.0));
        let wall = Aabb::from_center_size(Vec3::ZERO, Vec3::new(4.0, 2.5, 0.2));
        assert!(plate.is_flat(0.05));
        assert!(!wall.is_flat(0.05));
    }
}
