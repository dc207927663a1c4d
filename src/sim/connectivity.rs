//! Connectivity resolver
//!
//! Breadth-first searches over the adjacency relation (center distance within
//! 1.1 lattice spacings):
//! - match search: same-color flood fill from a landed token
//! - ceiling sweep: everything not reachable from the ceiling row falls

use std::collections::{BTreeSet, VecDeque};

use super::board::Board;
use super::token::{TokenId, TokenKind};

/// Minimum connected run that counts as a match
pub const MATCH_THRESHOLD: usize = 3;

/// Same-color flood fill from `start`
///
/// Returns the connected set when it reaches the match threshold, otherwise
/// an empty vec. Non-colored tokens never start or join a match.
pub fn find_match(board: &Board, start: TokenId) -> Vec<TokenId> {
    let kind = match board.get(start) {
        Some(t) if board.is_alive(start) && t.kind.is_colored() => t.kind,
        _ => return Vec::new(),
    };

    let group = flood(board, [start], |k| k == kind);
    if group.len() >= MATCH_THRESHOLD {
        group.into_iter().collect()
    } else {
        Vec::new()
    }
}

/// Find every live token with no adjacency path to the ceiling
///
/// Roots are tokens whose top edge lies within `tolerance` lattice spacings
/// of the ceiling line. Returns unreached ids in id order.
pub fn sweep_unanchored(board: &mut Board, tolerance: f32) -> Vec<TokenId> {
    board.record_sweep();

    let limit = board.ceiling_offset + tolerance * board.spacing();
    let roots: Vec<TokenId> = board
        .tokens()
        .filter(|t| t.top_edge() <= limit)
        .map(|t| t.id)
        .collect();

    let anchored = flood(board, roots, |_| true);
    let dropped: Vec<TokenId> = board
        .tokens()
        .filter(|t| !anchored.contains(&t.id))
        .map(|t| t.id)
        .collect();

    if !dropped.is_empty() {
        log::debug!("Sweep: {} of {} tokens unanchored", dropped.len(), board.len());
    }
    dropped
}

/// Number of connected components among `ids` (adjacency restricted to the set)
///
/// Works on tokens already marked dead, so it can be used on a drop set.
pub fn count_clusters(board: &Board, ids: &[TokenId]) -> u32 {
    let members: Vec<_> = ids.iter().filter_map(|id| board.get(*id)).collect();
    let reach = board.spacing() * crate::consts::ADJACENCY_FACTOR;

    let mut seen = vec![false; members.len()];
    let mut clusters = 0;
    for i in 0..members.len() {
        if seen[i] {
            continue;
        }
        clusters += 1;
        seen[i] = true;
        let mut queue = VecDeque::from([i]);
        while let Some(cur) = queue.pop_front() {
            for (j, other) in members.iter().enumerate() {
                if !seen[j] && crate::within(members[cur].pos, other.pos, reach) {
                    seen[j] = true;
                    queue.push_back(j);
                }
            }
        }
    }
    clusters
}

/// BFS over live tokens whose kind passes `accept`
fn flood<I, F>(board: &Board, starts: I, accept: F) -> BTreeSet<TokenId>
where
    I: IntoIterator<Item = TokenId>,
    F: Fn(TokenKind) -> bool,
{
    let mut visited = BTreeSet::new();
    let mut queue = VecDeque::new();
    for id in starts {
        if board.is_alive(id) && visited.insert(id) {
            queue.push_back(id);
        }
    }

    while let Some(id) = queue.pop_front() {
        for next in board.neighbors(id) {
            if visited.contains(&next) {
                continue;
            }
            let Some(token) = board.get(next) else { continue };
            if accept(token.kind) {
                visited.insert(next);
                queue.push_back(next);
            }
        }
    }
    visited
}
