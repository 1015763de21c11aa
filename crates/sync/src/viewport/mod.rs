//! Camera, picking and marquee geometry for the 3D view

pub mod camera;
pub mod marquee;
pub mod picking;

pub use camera::{ArcBallCamera, Viewport};
pub use marquee::{MarqueeMode, ScreenRect};
pub use picking::{Aabb, Ray};
