//! Board arena and hex lattice geometry
//!
//! Tokens live in a vector sorted by id (ids are allocated monotonically and
//! never reused). Removal marks a handle dead; `compact` drops dead entries
//! at the end of a resolution pass, so a token that takes part in several
//! effect sets in one pass is still removed exactly once.
//!
//! Coordinates are lattice units with y growing downward from the ceiling.

use std::collections::BTreeSet;

use glam::Vec2;
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::token::{Token, TokenId, TokenKind};
use crate::consts::*;
use crate::within;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Board {
    /// Resting tokens, sorted by id (dead ones linger until `compact`)
    tokens: Vec<Token>,
    /// Handles removed during the current pass
    dead: BTreeSet<TokenId>,
    /// Ceiling line; only ever grows
    pub ceiling_offset: f32,
    /// Board width in lattice units
    pub width: f32,
    /// Token radius (constant per board)
    pub radius: f32,
    /// Whether row 0 is the staggered (half-shifted) row
    top_row_offset: bool,
    /// Reachability sweeps performed on this board
    sweeps: u32,
    next_id: u32,
}

impl Board {
    pub fn new(width: f32, radius: f32) -> Self {
        Self::with_geometry(width, radius, 0.0, false)
    }

    /// Rebuild an empty board with explicit ceiling geometry (used by restore)
    pub fn with_geometry(width: f32, radius: f32, ceiling_offset: f32, top_row_offset: bool) -> Self {
        Self {
            tokens: Vec::new(),
            dead: BTreeSet::new(),
            ceiling_offset,
            width,
            radius,
            top_row_offset,
            sweeps: 0,
            next_id: 1,
        }
    }

    // --- Lattice geometry ---

    /// Center-to-center distance of neighbors
    #[inline]
    pub fn spacing(&self) -> f32 {
        self.radius * 2.0
    }

    #[inline]
    pub fn row_height(&self) -> f32 {
        self.spacing() * 3f32.sqrt() / 2.0
    }

    /// Cells in a non-staggered row
    pub fn columns(&self) -> u32 {
        ((self.width / self.spacing()) + LATTICE_EPSILON).floor().max(1.0) as u32
    }

    pub fn top_row_offset(&self) -> bool {
        self.top_row_offset
    }

    /// Whether a row is shifted by half a spacing
    pub fn is_offset_row(&self, row: u32) -> bool {
        (row % 2 == 1) ^ self.top_row_offset
    }

    pub fn row_columns(&self, row: u32) -> u32 {
        if self.is_offset_row(row) {
            self.columns().saturating_sub(1).max(1)
        } else {
            self.columns()
        }
    }

    /// Center of a lattice cell
    pub fn lattice_point(&self, row: u32, col: u32) -> Vec2 {
        let x0 = if self.is_offset_row(row) {
            self.spacing()
        } else {
            self.radius
        };
        Vec2::new(
            x0 + col as f32 * self.spacing(),
            self.ceiling_offset + self.radius + row as f32 * self.row_height(),
        )
    }

    /// Row implied by a y coordinate (clamped to the ceiling row)
    pub fn row_at(&self, y: f32) -> u32 {
        ((y - self.ceiling_offset - self.radius) / self.row_height())
            .round()
            .max(0.0) as u32
    }

    /// Nearest column in `row` for an x coordinate
    pub fn column_at(&self, row: u32, x: f32) -> u32 {
        let x0 = if self.is_offset_row(row) {
            self.spacing()
        } else {
            self.radius
        };
        let last = self.row_columns(row) - 1;
        ((x - x0) / self.spacing()).round().clamp(0.0, last as f32) as u32
    }

    /// The six hex-adjacency vectors, in a fixed order
    pub fn hex_offsets(&self) -> [Vec2; 6] {
        let s = self.spacing();
        let r = self.radius;
        let h = self.row_height();
        [
            Vec2::new(-r, -h),
            Vec2::new(r, -h),
            Vec2::new(-s, 0.0),
            Vec2::new(s, 0.0),
            Vec2::new(-r, h),
            Vec2::new(r, h),
        ]
    }

    /// True if a point fits between the walls and below the ceiling
    pub fn in_bounds(&self, pos: Vec2) -> bool {
        pos.x >= self.radius - LATTICE_EPSILON
            && pos.x <= self.width - self.radius + LATTICE_EPSILON
            && pos.y - self.radius >= self.ceiling_offset - LATTICE_EPSILON
    }

    // --- Arena ---

    /// Insert a resting token and return its handle
    pub fn insert(&mut self, pos: Vec2, kind: TokenKind) -> TokenId {
        let id = TokenId(self.next_id);
        self.next_id += 1;
        self.tokens.push(Token::new(id, pos, self.radius, kind));
        id
    }

    fn index_of(&self, id: TokenId) -> Option<usize> {
        self.tokens.binary_search_by_key(&id, |t| t.id).ok()
    }

    /// Look up a token, including ones marked dead this pass
    pub fn get(&self, id: TokenId) -> Option<&Token> {
        self.index_of(id).map(|i| &self.tokens[i])
    }

    pub fn get_mut(&mut self, id: TokenId) -> Option<&mut Token> {
        self.index_of(id).map(|i| &mut self.tokens[i])
    }

    pub fn is_alive(&self, id: TokenId) -> bool {
        self.index_of(id).is_some() && !self.dead.contains(&id)
    }

    /// Mark a handle dead; returns false if it was already dead or unknown
    pub fn mark_dead(&mut self, id: TokenId) -> bool {
        self.index_of(id).is_some() && self.dead.insert(id)
    }

    /// Drop every dead token
    pub fn compact(&mut self) {
        if self.dead.is_empty() {
            return;
        }
        let dead = std::mem::take(&mut self.dead);
        self.tokens.retain(|t| !dead.contains(&t.id));
    }

    /// Live tokens in id order
    pub fn tokens(&self) -> impl Iterator<Item = &Token> {
        self.tokens.iter().filter(|t| !self.dead.contains(&t.id))
    }

    pub fn len(&self) -> usize {
        self.tokens.len() - self.dead.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    // --- Spatial queries ---

    /// Live tokens adjacent to a point, excluding `exclude`
    pub fn neighbors_of_point(&self, pos: Vec2, exclude: Option<TokenId>) -> Vec<TokenId> {
        let reach = self.spacing() * ADJACENCY_FACTOR;
        self.tokens()
            .filter(|t| Some(t.id) != exclude && within(t.pos, pos, reach))
            .map(|t| t.id)
            .collect()
    }

    /// Live tokens adjacent to a token
    pub fn neighbors(&self, id: TokenId) -> Vec<TokenId> {
        match self.get(id) {
            Some(token) => self.neighbors_of_point(token.pos, Some(id)),
            None => Vec::new(),
        }
    }

    /// A cell is occupied when any live token sits closer than 0.9 spacings
    pub fn is_occupied(&self, pos: Vec2) -> bool {
        let min = self.spacing() * OCCUPIED_FACTOR;
        self.tokens().any(|t| t.pos.distance_squared(pos) < min * min)
    }

    /// Live tokens per palette index
    pub fn colored_counts(&self) -> [u32; super::token::PALETTE.len()] {
        let mut counts = [0u32; super::token::PALETTE.len()];
        for token in self.tokens() {
            if let Some(c) = token.kind.color_index() {
                counts[c as usize % counts.len()] += 1;
            }
        }
        counts
    }

    pub fn has_colored(&self) -> bool {
        self.tokens().any(|t| t.kind.is_colored())
    }

    /// Lowest (closest to the launcher) token edge
    pub fn lowest_edge(&self) -> Option<f32> {
        self.tokens().map(|t| t.bottom_edge()).reduce(f32::max)
    }

    // --- Whole-board moves ---

    /// Move every token down without touching the ceiling
    pub fn shift_down(&mut self, dy: f32) {
        for token in &mut self.tokens {
            token.pos.y += dy;
        }
    }

    /// Push everything down one row and move the ceiling with it.
    /// The caller owns the follow-up reachability sweep.
    pub fn advance_ceiling(&mut self) {
        let dy = self.row_height();
        self.shift_down(dy);
        self.ceiling_offset += dy;
    }

    /// Opponent attack: shift the board down and insert inert top rows.
    /// Each new cell is Garbage, or Mirror with `mirror_chance`.
    pub fn add_garbage_rows<R: Rng>(&mut self, count: u32, mirror_chance: f64, rng: &mut R) {
        for _ in 0..count {
            self.shift_down(self.row_height());
            // Old row 0 becomes row 1; keep its stagger
            self.top_row_offset = !self.top_row_offset;
            for col in 0..self.row_columns(0) {
                let kind = if rng.random_bool(mirror_chance.clamp(0.0, 1.0)) {
                    TokenKind::Mirror
                } else {
                    TokenKind::Garbage
                };
                let pos = self.lattice_point(0, col);
                self.insert(pos, kind);
            }
        }
    }

    pub fn sweep_count(&self) -> u32 {
        self.sweeps
    }

    pub(crate) fn record_sweep(&mut self) {
        self.sweeps += 1;
    }
}
