use glam::{Mat4, Vec2, Vec3, Vec4};

use super::picking::Ray;

/// Closest and farthest orbit distance reachable by zooming
const MIN_DISTANCE: f32 = 0.5;
const MAX_DISTANCE: f32 = 500.0;

/// Size of the render surface in screen pixels (origin top-left, y down)
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Viewport {
    pub width: f32,
    pub height: f32,
}

impl Viewport {
    pub fn new(width: f32, height: f32) -> Self {
        Self {
            width: width.max(1.0),
            height: height.max(1.0),
        }
    }

    pub fn aspect(&self) -> f32 {
        self.width / self.height
    }

    /// NDC (x, y in [-1, 1], y up) → screen pixels
    pub fn ndc_to_screen(&self, ndc: Vec2) -> Vec2 {
        Vec2::new(
            (ndc.x + 1.0) * 0.5 * self.width,
            (1.0 - ndc.y) * 0.5 * self.height,
        )
    }

    /// Screen pixels → NDC
    pub fn screen_to_ndc(&self, screen: Vec2) -> Vec2 {
        Vec2::new(
            screen.x / (self.width * 0.5) - 1.0,
            1.0 - screen.y / (self.height * 0.5),
        )
    }
}

/// Arc-ball camera orbiting the floorplan
#[derive(Clone, Debug)]
pub struct ArcBallCamera {
    /// Heading around the vertical axis, radians
    pub yaw: f32,
    /// Elevation above the floor plane, radians; 1.5 looks straight down
    pub pitch: f32,
    /// Orbit radius
    pub distance: f32,
    /// Point the camera orbits and looks at
    pub target: Vec3,
    pub fov: f32,
}

impl Default for ArcBallCamera {
    fn default() -> Self {
        Self::new()
    }
}

impl ArcBallCamera {
    pub fn new() -> Self {
        Self {
            yaw: 0.6,
            pitch: 0.9,
            distance: 30.0,
            target: Vec3::ZERO,
            fov: 45.0_f32.to_radians(),
        }
    }

    /// Straight-down view of a floor, useful for plan-style picking
    pub fn top_down(target: Vec3, distance: f32) -> Self {
        Self {
            yaw: 0.0,
            pitch: 1.5,
            distance,
            target,
            fov: 45.0_f32.to_radians(),
        }
    }

    pub fn rotate(&mut self, dx: f32, dy: f32) {
        self.yaw += dx.to_radians();
        self.pitch = (self.pitch + dy.to_radians()).clamp(-1.5, 1.5);
    }

    /// Dolly toward the target; positive `delta` moves closer
    pub fn zoom(&mut self, delta: f32) {
        self.distance = (self.distance * (1.0 - delta)).clamp(MIN_DISTANCE, MAX_DISTANCE);
    }

    /// Eye on the orbit sphere around `target`
    pub fn eye_position(&self) -> Vec3 {
        let cy = self.yaw.cos();
        let sy = self.yaw.sin();
        let cp = self.pitch.cos();
        let sp = self.pitch.sin();

        self.target
            + Vec3::new(
                self.distance * cp * sy,
                self.distance * sp,
                self.distance * cp * cy,
            )
    }

    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.eye_position(), self.target, Vec3::Y)
    }

    pub fn projection_matrix(&self, aspect: f32) -> Mat4 {
        Mat4::perspective_rh_gl(self.fov, aspect, 0.1, 1000.0)
    }

    /// Clip-space transform shared by picking and marquee projection
    pub fn view_projection(&self, viewport: Viewport) -> Mat4 {
        self.projection_matrix(viewport.aspect()) * self.view_matrix()
    }

    /// Project a world point to screen pixels; None when behind the camera
    pub fn project(&self, point: Vec3, viewport: Viewport) -> Option<Vec2> {
        let vp = self.view_projection(viewport);
        let p = vp * point.extend(1.0);
        if p.w <= 0.0 {
            return None;
        }
        let ndc = p.truncate() / p.w;
        Some(viewport.ndc_to_screen(ndc.truncate()))
    }

    /// Pick ray from the eye through a screen pixel
    pub fn screen_ray(&self, screen_pos: Vec2, viewport: Viewport) -> Ray {
        let ndc = viewport.screen_to_ndc(screen_pos);
        let inverse = self.view_projection(viewport).inverse();
        let unproject = |depth: f32| {
            let p = inverse * Vec4::new(ndc.x, ndc.y, depth, 1.0);
            p.truncate() / p.w
        };
        Ray {
            origin: self.eye_position(),
            direction: (unproject(1.0) - unproject(-1.0)).normalize_or_zero(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_target_projects_to_center() {
        let cam = ArcBallCamera::new();
        let vp = Viewport::new(800.0, 600.0);
        let p = cam.project(cam.target, vp).unwrap();
        assert!((p.x - 400.0).abs() < 0.01);
        assert!((p.y - 300.0).abs() < 0.01);
    }

    #[test]
    fn test_point_behind_camera_not_projected() {
        let cam = ArcBallCamera::new();
        let vp = Viewport::new(800.0, 600.0);
        let behind = cam.eye_position() + (cam.eye_position() - cam.target);
        assert!(cam.project(behind, vp).is_none());
    }

    #[test]
    fn test_screen_ray_through_target() {
        let cam = ArcBallCamera::new();
        let vp = Viewport::new(640.0, 480.0);
        let ray = cam.screen_ray(Vec2::new(320.0, 240.0), vp);
        let to_target = (cam.target - ray.origin).normalize();
        assert!(ray.direction.dot(to_target) > 0.9999);
    }

    #[test]
    fn test_ndc_screen_roundtrip_corners() {
        let vp = Viewport::new(200.0, 100.0);
        assert_eq!(vp.ndc_to_screen(Vec2::new(-1.0, 1.0)), Vec2::ZERO);
        assert_eq!(vp.ndc_to_screen(Vec2::new(1.0, -1.0)), Vec2::new(200.0, 100.0));
        assert_eq!(vp.screen_to_ndc(Vec2::new(100.0, 50.0)), Vec2::ZERO);
    }

    #[test]
    fn test_zoom_is_clamped() {
        let mut cam = ArcBallCamera::top_down(Vec3::ZERO, 10.0);
        cam.zoom(0.5);
        assert_eq!(cam.distance, 5.0);
        for _ in 0..100 {
            cam.zoom(0.9);
        }
        assert_eq!(cam.distance, MIN_DISTANCE);
    }

    #[test]
    fn test_pitch_is_clamped() {
        let mut cam = ArcBallCamera::new();
        cam.rotate(0.0, 500.0);
        assert!(cam.pitch <= 1.5);
    }
}
