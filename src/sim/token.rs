//! Token model
//!
//! A token is the atomic board unit. Its kind is a tagged enum so every
//! effect rule matches exhaustively; display color is derived from the kind
//! through a fixed lookup table (persistence relies on this).

use glam::Vec2;
use serde::{Deserialize, Serialize};

/// Display palette for colored tokens (0xRRGGBB)
pub const PALETTE: [u32; 6] = [
    0xE74C3C, // red
    0x3498DB, // blue
    0x2ECC71, // green
    0xF1C40F, // yellow
    0x9B59B6, // purple
    0xE67E22, // orange
];

/// Stable handle into the board arena (never reused)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TokenId(pub u32);

/// Token type tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TokenKind {
    /// Matchable token, palette index
    Colored(u8),
    /// Inert, never matches
    Blocked,
    /// Turns on the aiming helper line when popped
    PowerUp,
    /// Clears everything within the blast radius
    Bomb,
    /// Wildcard: clears every token of the color it meets
    Star,
    /// Recolors the neighbors of the collision site
    Paint,
    /// Adopts the color it meets
    Mirror,
    /// Inert, inserted by opponent attacks
    Garbage,
}

impl TokenKind {
    pub fn is_colored(&self) -> bool {
        matches!(self, TokenKind::Colored(_))
    }

    /// Palette index for colored tokens
    pub fn color_index(&self) -> Option<u8> {
        match self {
            TokenKind::Colored(c) => Some(*c),
            _ => None,
        }
    }

    /// Fixed kind -> display color table
    pub fn display_color(&self) -> u32 {
        match self {
            TokenKind::Colored(c) => PALETTE[*c as usize % PALETTE.len()],
            TokenKind::Blocked => 0x5D6D7E,
            TokenKind::PowerUp => 0xFFFFFF,
            TokenKind::Bomb => 0x1C1C1C,
            TokenKind::Star => 0xFFD700,
            TokenKind::Paint => 0xFF69B4,
            TokenKind::Mirror => 0xC0C0C0,
            TokenKind::Garbage => 0x7F8C8D,
        }
    }

    /// Compact one-byte encoding (colored = palette index, specials = 0xF0..)
    pub fn type_byte(&self) -> u8 {
        match self {
            TokenKind::Colored(c) => *c,
            TokenKind::Blocked => 0xF0,
            TokenKind::PowerUp => 0xF1,
            TokenKind::Bomb => 0xF2,
            TokenKind::Star => 0xF3,
            TokenKind::Paint => 0xF4,
            TokenKind::Mirror => 0xF5,
            TokenKind::Garbage => 0xF6,
        }
    }

    pub fn from_type_byte(byte: u8) -> Option<Self> {
        match byte {
            c if (c as usize) < PALETTE.len() => Some(TokenKind::Colored(c)),
            0xF0 => Some(TokenKind::Blocked),
            0xF1 => Some(TokenKind::PowerUp),
            0xF2 => Some(TokenKind::Bomb),
            0xF3 => Some(TokenKind::Star),
            0xF4 => Some(TokenKind::Paint),
            0xF5 => Some(TokenKind::Mirror),
            0xF6 => Some(TokenKind::Garbage),
            _ => None,
        }
    }
}

/// A resting token on the board
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Token {
    pub id: TokenId,
    pub pos: Vec2,
    pub radius: f32,
    /// Display color (opaque to the simulation)
    pub color: u32,
    pub kind: TokenKind,
}

impl Token {
    pub fn new(id: TokenId, pos: Vec2, radius: f32, kind: TokenKind) -> Self {
        Self {
            id,
            pos,
            radius,
            color: kind.display_color(),
            kind,
        }
    }

    /// Change type tag and display color together
    pub fn recolor(&mut self, kind: TokenKind) {
        self.kind = kind;
        self.color = kind.display_color();
    }

    /// Edge facing the ceiling (y grows downward)
    #[inline]
    pub fn top_edge(&self) -> f32 {
        self.pos.y - self.radius
    }

    /// Edge facing the launcher
    #[inline]
    pub fn bottom_edge(&self) -> f32 {
        self.pos.y + self.radius
    }
}

/// The single moving token, held outside the board until it lands
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Projectile {
    pub pos: Vec2,
    pub vel: Vec2,
    pub radius: f32,
    pub kind: TokenKind,
}

impl Projectile {
    pub fn new(pos: Vec2, vel: Vec2, radius: f32, kind: TokenKind) -> Self {
        Self {
            pos,
            vel,
            radius,
            kind,
        }
    }
}
