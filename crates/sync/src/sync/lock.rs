use std::time::{Duration, Instant};

use serde::Serialize;

/// Which way a sync update is currently flowing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncDirection {
    #[default]
    None,
    SceneToEditor,
    EditorToScene,
}

/// Re-entrancy guard with a hard expiry.
///
/// Not a mutex: everything runs on one thread. The direction is set before a
/// cross-component call so the inverse path can recognise its own echo; the
/// TTL guarantees a forgotten release cannot wedge synchronization.
#[derive(Debug, Clone)]
pub struct SyncLock {
    direction: SyncDirection,
    expires_at: Option<Instant>,
    ttl: Duration,
}

impl SyncLock {
    pub fn new(ttl: Duration) -> Self {
        Self {
            direction: SyncDirection::None,
            expires_at: None,
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Set the direction; (re)starts the expiry
    pub fn acquire(&mut self, direction: SyncDirection, now: Instant) {
        self.direction = direction;
        self.expires_at = Some(now + self.ttl);
    }

    /// Early release; expiry makes this optional
    pub fn release(&mut self) {
        self.direction = SyncDirection::None;
        self.expires_at = None;
    }

    /// Effective direction at `now`
    pub fn direction(&self, now: Instant) -> SyncDirection {
        match self.expires_at {
            Some(deadline) if now < deadline => self.direction,
            _ => SyncDirection::None,
        }
    }

    /// True while the lock is held in `direction`
    pub fn is_held(&self, direction: SyncDirection, now: Instant) -> bool {
        direction != SyncDirection::None && self.direction(now) == direction
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lock_expires() {
        let t0 = Instant::now();
        let mut lock = SyncLock::new(Duration::from_millis(150));
        lock.acquire(SyncDirection::SceneToEditor, t0);

        assert!(lock.is_held(SyncDirection::SceneToEditor, t0 + Duration::from_millis(149)));
        assert!(!lock.is_held(SyncDirection::EditorToScene, t0));
        assert_eq!(lock.direction(t0 + Duration::from_millis(150)), SyncDirection::None);
    }

    #[test]
    fn test_release() {
        let t0 = Instant::now();
        let mut lock = SyncLock::new(Duration::from_millis(150));
        lock.acquire(SyncDirection::EditorToScene, t0);
        lock.release();
        assert_eq!(lock.direction(t0), SyncDirection::None);
    }

    #[test]
    fn test_reacquire_extends() {
        let t0 = Instant::now();
        let mut lock = SyncLock::new(Duration::from_millis(100));
        lock.acquire(SyncDirection::SceneToEditor, t0);
        lock.acquire(SyncDirection::SceneToEditor, t0 + Duration::from_millis(80));
        assert!(lock.is_held(SyncDirection::SceneToEditor, t0 + Duration::from_millis(150)));
    }

    #[test]
    fn test_none_is_never_held() {
        let lock = SyncLock::new(Duration::from_millis(100));
        assert!(!lock.is_held(SyncDirection::None, Instant::now()));
    }
}
