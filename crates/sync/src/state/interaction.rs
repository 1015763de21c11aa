//! Pointer interaction state machine (platform input adapter side)
//!
//! idle → pointer-down → click-pending | camera-orbit
//! click-pending → (moved ≥ threshold) → marquee
//! release resolves to a click, a marquee rectangle, or nothing (orbit).

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::viewport::marquee::ScreenRect;

/// Movement (in pixels) that turns a pending click into a marquee drag
pub const DRAG_THRESHOLD: f32 = 5.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PointerButton {
    #[default]
    Primary,
    Secondary,
    Middle,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Modifiers {
    #[serde(default)]
    pub shift: bool,
    #[serde(default)]
    pub alt: bool,
    #[serde(default)]
    pub ctrl: bool,
}

impl Modifiers {
    pub const NONE: Modifiers = Modifiers {
        shift: false,
        alt: false,
        ctrl: false,
    };

    pub const SHIFT: Modifiers = Modifiers {
        shift: true,
        alt: false,
        ctrl: false,
    };

    pub const ALT: Modifiers = Modifiers {
        shift: false,
        alt: true,
        ctrl: false,
    };
}

/// Current interaction mode
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InteractionMode {
    Idle,
    ClickPending { origin: Vec2, modifiers: Modifiers },
    Marquee { origin: Vec2, current: Vec2, modifiers: Modifiers },
    CameraOrbit { last: Vec2 },
}

/// What a pointer event resolved to
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PointerOutcome {
    None,
    /// Released without dragging
    Click { position: Vec2, modifiers: Modifiers },
    /// Marquee overlay moved (for redraw)
    MarqueeUpdated(ScreenRect),
    /// Marquee released
    Marquee { rect: ScreenRect, modifiers: Modifiers },
    /// Orbit delta in pixels
    Orbit { delta: Vec2 },
}

/// Pointer state machine; knows nothing about the windowing system
#[derive(Debug, Clone)]
pub struct InteractionState {
    mode: InteractionMode,
}

impl Default for InteractionState {
    fn default() -> Self {
        Self {
            mode: InteractionMode::Idle,
        }
    }
}

impl InteractionState {
    pub fn mode(&self) -> InteractionMode {
        self.mode
    }

    /// Marquee rectangle to draw as an overlay, if dragging
    pub fn marquee_overlay(&self) -> Option<ScreenRect> {
        match self.mode {
            InteractionMode::Marquee { origin, current, .. } => {
                Some(ScreenRect::from_corners(origin, current))
            }
            _ => None,
        }
    }

    pub fn pointer_down(
        &mut self,
        position: Vec2,
        button: PointerButton,
        modifiers: Modifiers,
    ) -> PointerOutcome {
        self.mode = match button {
            PointerButton::Primary if !modifiers.alt => InteractionMode::ClickPending {
                origin: position,
                modifiers,
            },
            PointerButton::Primary | PointerButton::Secondary | PointerButton::Middle => {
                InteractionMode::CameraOrbit { last: position }
            }
        };
        PointerOutcome::None
    }

    pub fn pointer_move(&mut self, position: Vec2) -> PointerOutcome {
        match self.mode {
            InteractionMode::Idle => PointerOutcome::None,
            InteractionMode::ClickPending { origin, modifiers } => {
                if origin.distance(position) >= DRAG_THRESHOLD {
                    self.mode = InteractionMode::Marquee {
                        origin,
                        current: position,
                        modifiers,
                    };
                    PointerOutcome::MarqueeUpdated(ScreenRect::from_corners(origin, position))
                } else {
                    PointerOutcome::None
                }
            }
            InteractionMode::Marquee { origin, modifiers, .. } => {
                self.mode = InteractionMode::Marquee {
                    origin,
                    current: position,
                    modifiers,
                };
                PointerOutcome::MarqueeUpdated(ScreenRect::from_corners(origin, position))
            }
            InteractionMode::CameraOrbit { last } => {
                self.mode = InteractionMode::CameraOrbit { last: position };
                PointerOutcome::Orbit { delta: position - last }
            }
        }
    }

    pub fn pointer_up(&mut self, position: Vec2) -> PointerOutcome {
        let mode = std::mem::replace(&mut self.mode, InteractionMode::Idle);
        match mode {
            InteractionMode::Idle => PointerOutcome::None,
            InteractionMode::ClickPending { origin, modifiers } => {
                if origin.distance(position) >= DRAG_THRESHOLD {
                    // Moved past the threshold without an intermediate move event
                    PointerOutcome::Marquee {
                        rect: ScreenRect::from_corners(origin, position),
                        modifiers,
                    }
                } else {
                    PointerOutcome::Click {
                        position: origin,
                        modifiers,
                    }
                }
            }
            InteractionMode::Marquee { origin, modifiers, .. } => PointerOutcome::Marquee {
                rect: ScreenRect::from_corners(origin, position),
                modifiers,
            },
            InteractionMode::CameraOrbit { last } => PointerOutcome::Orbit {
                delta: position - last,
            },
        }
    }

    /// Abort whatever is in progress (focus loss, Escape)
    pub fn cancel(&mut self) {
        self.mode = InteractionMode::Idle;
    }
}
