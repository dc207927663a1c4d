//! Hex Cascade - board-simulation core for a hex-grid bubble shooter
//!
//! Core modules:
//! - `sim`: Deterministic simulation (lattice, collisions, matching, cascades, scoring, session)
//! - `tuning`: Data-driven game balance
//! - `persistence`: Versioned snapshot save/load
//! - `net`: Multiplayer contract (attack inbox, board preview codec)

pub mod net;
pub mod persistence;
pub mod sim;
pub mod tuning;

pub use tuning::Tuning;

use glam::Vec2;

/// Game configuration constants
pub mod consts {
    /// Fixed simulation timestep (120 Hz)
    pub const SIM_DT: f32 = 1.0 / 120.0;
    /// Maximum substeps per tick for a fast projectile
    pub const MAX_SUBSTEPS: u32 = 8;

    /// Board width in lattice units
    pub const BOARD_WIDTH: f32 = 16.0;
    /// Launcher position (projectiles spawn here)
    pub const LAUNCHER_X: f32 = BOARD_WIDTH / 2.0;
    pub const LAUNCHER_Y: f32 = 22.0;

    /// Two tokens are neighbors within this many lattice spacings
    pub const ADJACENCY_FACTOR: f32 = 1.1;
    /// A lattice cell is occupied if a token sits closer than this many spacings
    pub const OCCUPIED_FACTOR: f32 = 0.9;

    /// Slack for float comparisons against lattice geometry
    pub const LATTICE_EPSILON: f32 = 1e-3;
}

/// True when two points are at most `dist` apart
#[inline]
pub fn within(a: Vec2, b: Vec2, dist: f32) -> bool {
    a.distance_squared(b) <= dist * dist
}

/// Unit direction from an angle above horizontal (y grows downward)
#[inline]
pub fn direction_from_elevation(angle: f32, rightward: bool) -> Vec2 {
    let x = angle.cos();
    Vec2::new(if rightward { x } else { -x }, -angle.sin())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_within() {
        assert!(within(Vec2::ZERO, Vec2::new(3.0, 4.0), 5.0));
        assert!(!within(Vec2::ZERO, Vec2::new(3.0, 4.0), 4.9));
    }

    #[test]
    fn test_direction_from_elevation_points_up() {
        let dir = direction_from_elevation(std::f32::consts::FRAC_PI_2, true);
        assert!(dir.x.abs() < 1e-6);
        assert!((dir.y + 1.0).abs() < 1e-6);
    }
}
