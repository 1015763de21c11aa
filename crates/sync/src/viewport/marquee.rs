//! Screen-space rectangle (marquee) hit-testing

use glam::{Mat4, Vec2};
use serde::{Deserialize, Serialize};

use super::camera::Viewport;
use super::picking::Aabb;

/// How an object's screen rectangle is compared with the drag rectangle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarqueeMode {
    /// Any overlap selects
    #[default]
    Intersection,
    /// The object's rectangle must lie fully inside the drag rectangle
    Containment,
}

impl MarqueeMode {
    pub fn display_name(&self) -> &'static str {
        match self {
            MarqueeMode::Intersection => "Intersection",
            MarqueeMode::Containment => "Containment",
        }
    }
}

/// Axis-aligned rectangle in screen pixels
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScreenRect {
    pub min: Vec2,
    pub max: Vec2,
}

impl ScreenRect {
    /// Rectangle spanned by two arbitrary corners (drag start / current)
    pub fn from_corners(a: Vec2, b: Vec2) -> Self {
        Self {
            min: a.min(b),
            max: a.max(b),
        }
    }

    pub fn width(&self) -> f32 {
        self.max.x - self.min.x
    }

    pub fn height(&self) -> f32 {
        self.max.y - self.min.y
    }

    /// Inclusive overlap test
    pub fn intersects(&self, other: &ScreenRect) -> bool {
        self.min.x <= other.max.x
            && other.min.x <= self.max.x
            && self.min.y <= other.max.y
            && other.min.y <= self.max.y
    }

    /// `other` lies fully inside `self`
    pub fn contains_rect(&self, other: &ScreenRect) -> bool {
        self.min.x <= other.min.x
            && self.min.y <= other.min.y
            && other.max.x <= self.max.x
            && other.max.y <= self.max.y
    }

    pub fn matches(&self, object: &ScreenRect, mode: MarqueeMode) -> bool {
        match mode {
            MarqueeMode::Intersection => self.intersects(object),
            MarqueeMode::Containment => self.contains_rect(object),
        }
    }
}

/// Project a world AABB into a screen rectangle.
///
/// Corners behind the camera (`w <= 0`) or past the far plane (NDC `z > 1`)
/// are dropped before the rectangle is built. Returns None when no corner
/// survives.
pub fn project_aabb(aabb: &Aabb, view_projection: &Mat4, viewport: Viewport) -> Option<ScreenRect> {
    let mut min = Vec2::splat(f32::INFINITY);
    let mut max = Vec2::splat(f32::NEG_INFINITY);
    let mut visible = 0;

    for corner in aabb.corners() {
        let clip = *view_projection * corner.extend(1.0);
        if clip.w <= 0.0 {
            continue;
        }
        let ndc = clip.truncate() / clip.w;
        if ndc.z > 1.0 {
            continue;
        }
        let screen = viewport.ndc_to_screen(ndc.truncate());
        min = min.min(screen);
        max = max.max(screen);
        visible += 1;
    }

    (visible > 0).then_some(ScreenRect { min, max })
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;

    /// World x,y in [0, 20] maps onto a 200x200 viewport, 10 px per unit.
    fn plan_projection() -> (Mat4, Viewport) {
        (
            Mat4::orthographic_rh_gl(0.0, 20.0, 0.0, 20.0, -10.0, 10.0),
            Viewport::new(200.0, 200.0),
        )
    }

    #[test]
    fn test_project_box_to_pixels() {
        let (vp, viewport) = plan_projection();
        let b = Aabb::new(Vec3::new(2.0, 2.0, -0.1), Vec3::new(4.0, 5.0, 0.1));
        let r = project_aabb(&b, &vp, viewport).unwrap();
        assert!((r.min.x - 20.0).abs() < 1e-3);
        assert!((r.max.x - 40.0).abs() < 1e-3);
        assert!((r.min.y - 150.0).abs() < 1e-3);
        assert!((r.max.y - 180.0).abs() < 1e-3);
    }

    #[test]
    fn test_corners_past_far_plane_dropped() {
        let (vp, viewport) = plan_projection();
        // Entirely beyond the far plane (z < -10 in view space)
        let b = Aabb::new(Vec3::new(2.0, 2.0, -30.0), Vec3::new(4.0, 4.0, -20.0));
        assert!(project_aabb(&b, &vp, viewport).is_none());
    }

    #[test]
    fn test_perspective_behind_camera_dropped() {
        let vp = Mat4::perspective_rh_gl(1.0, 1.0, 0.1, 100.0);
        let viewport = Viewport::new(100.0, 100.0);
        // Straddles the camera: only the half in front (z < 0) projects
        let b = Aabb::new(Vec3::new(-1.0, -1.0, -5.0), Vec3::new(1.0, 1.0, 5.0));
        let r = project_aabb(&b, &vp, viewport).unwrap();
        assert!(r.min.x.is_finite() && r.max.x.is_finite());
        let behind = Aabb::new(Vec3::new(-1.0, -1.0, 1.0), Vec3::new(1.0, 1.0, 5.0));
        assert!(project_aabb(&behind, &vp, viewport).is_none());
    }

    #[test]
    fn test_modes() {
        let drag = ScreenRect::from_corners(Vec2::new(100.0, 100.0), Vec2::new(0.0, 0.0));
        let inside = ScreenRect::from_corners(Vec2::new(10.0, 10.0), Vec2::new(20.0, 20.0));
        let straddling = ScreenRect::from_corners(Vec2::new(90.0, 10.0), Vec2::new(120.0, 20.0));
        let outside = ScreenRect::from_corners(Vec2::new(110.0, 10.0), Vec2::new(120.0, 20.0));

        assert!(drag.matches(&inside, MarqueeMode::Containment));
        assert!(drag.matches(&inside, MarqueeMode::Intersection));
        assert!(!drag.matches(&straddling, MarqueeMode::Containment));
        assert!(drag.matches(&straddling, MarqueeMode::Intersection));
        assert!(!drag.matches(&outside, MarqueeMode::Intersection));
    }

    #[test]
    fn test_mode_serde() {
        let json = serde_json::to_string(&MarqueeMode::Containment).unwrap();
        assert_eq!(json, r#""containment""#);
    }
}
