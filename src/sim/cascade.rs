//! Effect cascade resolver
//!
//! Turns a landing into every removal it causes: the primary effect (match,
//! blast, wildcard, paint, mirror), bystander triggers around a match, and
//! finally the ceiling sweep that drops whatever lost its anchor.
//!
//! Removal goes through `Board::mark_dead`, which refuses a handle it has
//! already seen, so overlapping effect sets pop each token exactly once.

use std::collections::BTreeSet;

use glam::Vec2;

use super::board::Board;
use super::collision::CollisionTarget;
use super::connectivity::{count_clusters, find_match, sweep_unanchored};
use super::state::ClearResult;
use super::token::{TokenId, TokenKind};
use crate::consts::LATTICE_EPSILON;
use crate::tuning::Tuning;

/// Bookkeeping for one resolution pass
struct Cascade<'a> {
    board: &'a mut Board,
    tuning: &'a Tuning,
    /// Popped handles in removal order
    popped: Vec<TokenId>,
    blasts: Vec<Vec2>,
    helper_line: bool,
}

impl<'a> Cascade<'a> {
    fn new(board: &'a mut Board, tuning: &'a Tuning) -> Self {
        Self {
            board,
            tuning,
            popped: Vec::new(),
            blasts: Vec::new(),
            helper_line: false,
        }
    }

    fn kind_of(&self, id: TokenId) -> Option<TokenKind> {
        self.board.get(id).map(|t| t.kind)
    }

    fn pos_of(&self, id: TokenId) -> Option<Vec2> {
        self.board.get(id).map(|t| t.pos)
    }

    fn pop(&mut self, id: TokenId) {
        if !self.board.mark_dead(id) {
            return;
        }
        if self.kind_of(id) == Some(TokenKind::PowerUp) {
            self.helper_line = true;
        }
        self.popped.push(id);
    }

    /// Remove every live token within the blast radius. Bombs caught in the
    /// blast are removed without detonating.
    fn detonate(&mut self, center: Vec2) {
        self.blasts.push(center);
        let reach = self.tuning.blast_radius * self.board.spacing() + LATTICE_EPSILON;
        let victims: Vec<TokenId> = self
            .board
            .tokens()
            .filter(|t| crate::within(t.pos, center, reach))
            .map(|t| t.id)
            .collect();
        for id in victims {
            self.pop(id);
        }
    }

    /// Pop a match set and trigger the Bomb / PowerUp tokens touching it
    fn apply_match(&mut self, members: &[TokenId]) {
        let set: BTreeSet<TokenId> = members.iter().copied().collect();
        let mut bombs = BTreeSet::new();
        let mut powerups = BTreeSet::new();
        for &id in members {
            for n in self.board.neighbors(id) {
                if set.contains(&n) {
                    continue;
                }
                match self.kind_of(n) {
                    Some(TokenKind::Bomb) => {
                        bombs.insert(n);
                    }
                    Some(TokenKind::PowerUp) => {
                        powerups.insert(n);
                    }
                    _ => {}
                }
            }
        }

        for &id in members {
            self.pop(id);
        }
        for id in powerups {
            self.pop(id);
        }
        // Every bomb touching the match goes off, even if an earlier blast
        // already swept it away
        for bomb in bombs {
            if let Some(center) = self.pos_of(bomb) {
                self.pop(bomb);
                self.detonate(center);
            }
        }
    }

    fn match_from(&mut self, start: TokenId) {
        let members = find_match(self.board, start);
        if !members.is_empty() {
            self.apply_match(&members);
        }
    }

    /// Clear every token of one color, anywhere on the board
    fn wildcard(&mut self, color: u8) {
        let targets: Vec<TokenId> = self
            .board
            .tokens()
            .filter(|t| t.kind == TokenKind::Colored(color))
            .map(|t| t.id)
            .collect();
        for id in targets {
            self.pop(id);
        }
    }

    /// Recolor the colored neighbors of the collision site, then remove both
    /// participants
    fn paint(&mut self, landed: TokenId, other: TokenId, color: u8) {
        let targets: Vec<TokenId> = self
            .board
            .neighbors(landed)
            .into_iter()
            .filter(|id| *id != other)
            .filter(|id| self.kind_of(*id).is_some_and(|k| k.is_colored()))
            .collect();
        for id in targets {
            if let Some(token) = self.board.get_mut(id) {
                token.recolor(TokenKind::Colored(color));
            }
        }
        self.pop(landed);
        self.pop(other);
    }

    /// The mirror takes on `color`, then matches as if it had just landed
    fn mirror(&mut self, mirror: TokenId, color: u8) {
        if let Some(token) = self.board.get_mut(mirror) {
            token.recolor(TokenKind::Colored(color));
        }
        self.match_from(mirror);
    }

    /// Sweep, collect the outcome and compact the board
    fn finish(self) -> ClearResult {
        let dropped_ids = sweep_unanchored(self.board, self.tuning.anchor_tolerance);
        let drop_clusters = count_clusters(self.board, &dropped_ids);
        for &id in &dropped_ids {
            self.board.mark_dead(id);
        }

        let collect = |ids: &[TokenId]| {
            ids.iter()
                .filter_map(|id| self.board.get(*id).cloned())
                .collect::<Vec<_>>()
        };
        let result = ClearResult {
            popped: collect(&self.popped),
            dropped: collect(&dropped_ids),
            blasts: self.blasts,
            drop_clusters,
            helper_line_activated: self.helper_line,
            ..Default::default()
        };
        self.board.compact();

        if !result.is_empty() {
            log::debug!(
                "Resolved: {} popped, {} dropped in {} clusters, {} blasts",
                result.popped.len(),
                result.dropped.len(),
                result.drop_clusters,
                result.blasts.len()
            );
        }
        result
    }
}

/// Resolve a projectile that has just been inserted at `landed`
///
/// The special rules apply to the (landed, struck) pair in either order;
/// a special token with no colored partner simply stays on the board.
pub fn resolve_landing(
    board: &mut Board,
    landed: TokenId,
    target: CollisionTarget,
    tuning: &Tuning,
) -> ClearResult {
    let Some(landed_token) = board.get(landed) else {
        return ClearResult::default();
    };
    let landed_kind = landed_token.kind;
    let landed_pos = landed_token.pos;
    let struck = target
        .token()
        .filter(|id| *id != landed && board.is_alive(*id))
        .and_then(|id| board.get(id).map(|t| (id, t.kind)));

    let mut cascade = Cascade::new(board, tuning);
    match (landed_kind, struck) {
        (TokenKind::Bomb, _) => {
            cascade.pop(landed);
            cascade.detonate(landed_pos);
        }
        (TokenKind::Star, Some((_, TokenKind::Colored(c)))) => {
            cascade.wildcard(c);
            cascade.pop(landed);
        }
        (TokenKind::Colored(c), Some((star, TokenKind::Star))) => {
            cascade.wildcard(c);
            cascade.pop(star);
        }
        (TokenKind::Paint, Some((other, TokenKind::Colored(c))))
        | (TokenKind::Colored(c), Some((other, TokenKind::Paint))) => {
            cascade.paint(landed, other, c);
        }
        (TokenKind::Mirror, Some((_, TokenKind::Colored(c)))) => {
            cascade.mirror(landed, c);
        }
        (TokenKind::Colored(c), Some((mirror, TokenKind::Mirror))) => {
            cascade.mirror(mirror, c);
        }
        (TokenKind::Colored(_), _) => {
            cascade.match_from(landed);
        }
        (
            TokenKind::Star
            | TokenKind::Paint
            | TokenKind::Mirror
            | TokenKind::PowerUp
            | TokenKind::Blocked
            | TokenKind::Garbage,
            _,
        ) => {}
    }
    cascade.finish()
}

/// Sweep-only pass (after a ceiling advance or an attack)
pub fn resolve_sweep(board: &mut Board, tuning: &Tuning) -> ClearResult {
    Cascade::new(board, tuning).finish()
}
