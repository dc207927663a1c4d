//! Collision detection and lattice snapping
//!
//! The projectile is integrated, reflected off the side walls, then tested
//! against the ceiling line and the resting tokens. A hit is snapped to a
//! free lattice cell next to whatever it struck.

use glam::Vec2;

use super::board::Board;
use super::token::{Projectile, TokenId};
use crate::consts::*;
use crate::direction_from_elevation;

/// What a moving projectile struck
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollisionTarget {
    /// Synthetic anchor standing in for the ceiling line
    Ceiling,
    Token(TokenId),
}

impl CollisionTarget {
    pub fn token(&self) -> Option<TokenId> {
        match self {
            CollisionTarget::Ceiling => None,
            CollisionTarget::Token(id) => Some(*id),
        }
    }
}

/// Reflect velocity off a surface
///
/// Standard reflection: v' = v - 2(v·n)n
#[inline]
pub fn reflect_velocity(velocity: Vec2, normal: Vec2) -> Vec2 {
    velocity - 2.0 * velocity.dot(normal) * normal
}

/// Bounce off the side walls, clamping the position inside the board.
/// Returns true if a wall was touched.
pub fn reflect_off_walls(projectile: &mut Projectile, width: f32) -> bool {
    let min_x = projectile.radius;
    let max_x = width - projectile.radius;

    if projectile.pos.x < min_x {
        projectile.pos.x = min_x;
        if projectile.vel.x < 0.0 {
            projectile.vel = reflect_velocity(projectile.vel, Vec2::X);
        }
        true
    } else if projectile.pos.x > max_x {
        projectile.pos.x = max_x;
        if projectile.vel.x > 0.0 {
            projectile.vel = reflect_velocity(projectile.vel, Vec2::NEG_X);
        }
        true
    } else {
        false
    }
}

/// Advance the projectile by `vel * dt`, then apply wall reflection
pub fn integrate(projectile: &mut Projectile, dt: f32, width: f32) {
    projectile.pos += projectile.vel * dt;
    reflect_off_walls(projectile, width);
}

/// Test the projectile against the ceiling and the resting tokens
pub fn detect(projectile: &Projectile, board: &Board) -> Option<CollisionTarget> {
    if projectile.pos.y - projectile.radius <= board.ceiling_offset {
        return Some(CollisionTarget::Ceiling);
    }

    let reach = board.spacing();
    board
        .tokens()
        .map(|t| (t.id, t.pos.distance_squared(projectile.pos)))
        .filter(|(_, d2)| *d2 < reach * reach)
        .min_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(id, _)| CollisionTarget::Token(id))
}

/// Pick the lattice cell a landing projectile settles into
///
/// With a struck token: the free hex neighbor of that token closest to the
/// landing point. Otherwise (ceiling, or no free neighbor): the nearest cell
/// of the row implied by the landing point. Always returns a point.
pub fn snap(board: &Board, landing: Vec2, struck: Option<CollisionTarget>) -> Vec2 {
    let anchor = struck
        .and_then(|target| target.token())
        .and_then(|id| board.get(id))
        .map(|t| t.pos);

    if let Some(center) = anchor {
        let mut best: Option<(Vec2, f32)> = None;
        for offset in board.hex_offsets() {
            let candidate = center + offset;
            if !board.in_bounds(candidate) || board.is_occupied(candidate) {
                continue;
            }
            let d2 = candidate.distance_squared(landing);
            // Strict compare keeps the first offset on ties
            if best.is_none_or(|(_, best_d2)| d2 < best_d2) {
                best = Some((candidate, d2));
            }
        }
        if let Some((cell, _)) = best {
            return cell;
        }
        log::debug!("No free neighbor around {:?}, falling back to row snap", center);
    }

    let row = board.row_at(landing.y);
    let col = board.column_at(row, landing.x);
    board.lattice_point(row, col)
}

/// Normalize an aim direction and keep it at least `min_angle` above
/// horizontal. A zero vector aims straight up.
pub fn clamp_aim(dir: Vec2, min_angle: f32) -> Vec2 {
    let dir = dir.normalize_or_zero();
    if dir == Vec2::ZERO {
        return Vec2::NEG_Y;
    }
    // Upward is -y
    if -dir.y < min_angle.sin() {
        return direction_from_elevation(min_angle, dir.x >= 0.0);
    }
    dir
}

/// Launch velocity for an aim direction
pub fn launch_velocity(aim: Vec2, speed: f32, min_angle: f32) -> Vec2 {
    clamp_aim(aim, min_angle) * speed
}

/// Substeps needed so a projectile moves at most half a radius per step
pub fn substeps_for(projectile: &Projectile, dt: f32) -> u32 {
    let travel = projectile.vel.length() * dt;
    let max_step = (projectile.radius * 0.5).max(LATTICE_EPSILON);
    ((travel / max_step).ceil() as u32).clamp(1, MAX_SUBSTEPS)
}
