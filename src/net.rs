//! Multiplayer contract
//!
//! Transport is someone else's job. The core only needs:
//! - a queue of inbound attacks, drained at the start of the next tick
//! - the rule that turns a drop count into outgoing garbage rows
//! - a compact board preview for periodic state broadcast
//!
//! Preview layout (little endian):
//! `ceiling_offset: f32, radius: f32, count: u32`, then per token
//! `x: f32, y: f32, type: u8`.

use std::collections::VecDeque;

use glam::Vec2;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::sim::board::Board;
use crate::sim::token::TokenKind;
use crate::tuning::Tuning;

const HEADER_LEN: usize = 12;
const RECORD_LEN: usize = 9;

/// Inbound attacks (garbage row counts) waiting for the next tick
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AttackInbox {
    pending: VecDeque<u32>,
}

impl AttackInbox {
    pub fn push(&mut self, rows: u32) {
        if rows > 0 {
            self.pending.push_back(rows);
        }
    }

    /// Take every pending attack in arrival order
    pub fn drain(&mut self) -> Vec<u32> {
        self.pending.drain(..).collect()
    }

    pub fn clear(&mut self) {
        self.pending.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }
}

/// Garbage rows earned by dropping `drops` tokens in one pass
pub fn attack_rows_for_drops(drops: usize, tuning: &Tuning) -> u32 {
    (drops as u32) / tuning.drops_per_attack_row.max(1)
}

#[derive(Debug, Error, PartialEq)]
pub enum PreviewError {
    #[error("preview truncated: need {needed} bytes, got {got}")]
    Truncated { needed: usize, got: usize },
    #[error("unknown token type byte {0:#04x}")]
    UnknownType(u8),
}

/// Decoded board preview
#[derive(Debug, Clone, PartialEq)]
pub struct BoardPreview {
    pub ceiling_offset: f32,
    pub radius: f32,
    pub tokens: Vec<(Vec2, TokenKind)>,
}

/// Encode live tokens as (position, type byte) records
pub fn encode_preview(board: &Board) -> Vec<u8> {
    let count = board.len();
    let mut out = Vec::with_capacity(HEADER_LEN + count * RECORD_LEN);
    out.extend_from_slice(&board.ceiling_offset.to_le_bytes());
    out.extend_from_slice(&board.radius.to_le_bytes());
    out.extend_from_slice(&(count as u32).to_le_bytes());
    for token in board.tokens() {
        out.extend_from_slice(&token.pos.x.to_le_bytes());
        out.extend_from_slice(&token.pos.y.to_le_bytes());
        out.push(token.kind.type_byte());
    }
    out
}

pub fn decode_preview(bytes: &[u8]) -> Result<BoardPreview, PreviewError> {
    if bytes.len() < HEADER_LEN {
        return Err(PreviewError::Truncated {
            needed: HEADER_LEN,
            got: bytes.len(),
        });
    }
    let ceiling_offset = read_f32(bytes, 0);
    let radius = read_f32(bytes, 4);
    let count = u32::from_le_bytes([bytes[8], bytes[9], bytes[10], bytes[11]]) as usize;

    // The count is untrusted; an overflowing size can never be satisfied
    let needed = count
        .checked_mul(RECORD_LEN)
        .and_then(|n| n.checked_add(HEADER_LEN))
        .unwrap_or(usize::MAX);
    if bytes.len() < needed {
        return Err(PreviewError::Truncated {
            needed,
            got: bytes.len(),
        });
    }

    let tokens = bytes[HEADER_LEN..needed]
        .chunks_exact(RECORD_LEN)
        .map(|rec| {
            let kind = TokenKind::from_type_byte(rec[8]).ok_or(PreviewError::UnknownType(rec[8]))?;
            Ok((Vec2::new(read_f32(rec, 0), read_f32(rec, 4)), kind))
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(BoardPreview {
        ceiling_offset,
        radius,
        tokens,
    })
}

fn read_f32(bytes: &[u8], at: usize) -> f32 {
    f32::from_le_bytes([bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]])
}
