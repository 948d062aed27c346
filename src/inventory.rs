use std::collections::BTreeMap;

use crate::error::EngineError;
use crate::types::{Group, Piece, UsedItem};

/// Arena of pieces addressed by index. Every quantity change in a run goes
/// through here.
#[derive(Debug, Clone)]
pub struct Inventory {
    pieces: Vec<Piece>,
}

impl Inventory {
    pub fn new(pieces: Vec<Piece>) -> Self {
        Self { pieces }
    }

    pub fn len(&self) -> usize {
        self.pieces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pieces.is_empty()
    }

    pub fn piece(&self, idx: usize) -> &Piece {
        &self.pieces[idx]
    }

    pub fn pieces(&self) -> &[Piece] {
        &self.pieces
    }

    pub fn remaining(&self, idx: usize) -> u32 {
        self.pieces[idx].remaining_qty
    }

    pub fn total_qty(&self) -> u64 {
        self.pieces.iter().map(|p| p.original_qty as u64).sum()
    }

    /// Remaining quantity of every piece, indexed like the arena.
    pub fn snapshot(&self) -> Vec<u32> {
        self.pieces.iter().map(|p| p.remaining_qty).collect()
    }

    /// Indices sorted by width, then length, then remaining quantity, all
    /// descending. Ties keep input order so runs are reproducible.
    pub fn order_by_size(&self) -> Vec<usize> {
        let mut order: Vec<usize> = (0..self.pieces.len()).collect();
        order.sort_by(|&a, &b| {
            let (pa, pb) = (&self.pieces[a], &self.pieces[b]);
            (pb.width, pb.length, pb.remaining_qty)
                .cmp(&(pa.width, pa.length, pa.remaining_qty))
                .then(a.cmp(&b))
        });
        order
    }

    pub fn consume(&mut self, idx: usize, n: u32) -> Result<(), EngineError> {
        self.pieces[idx].consume(n)
    }

    /// Consumes every `(index, qty)` pair as one group, or nothing at all.
    /// An index may appear more than once; the totals are checked together.
    pub fn commit(&mut self, group_id: u32, takes: &[(usize, u32)]) -> Result<Group, EngineError> {
        let takes: Vec<(usize, u32)> = takes.iter().copied().filter(|&(_, q)| q > 0).collect();
        if takes.is_empty() {
            return Err(EngineError::EmptyGroup);
        }

        let mut needed: BTreeMap<usize, u32> = BTreeMap::new();
        for &(idx, qty) in &takes {
            let piece = &self.pieces[idx];
            let total = needed.entry(idx).or_insert(0);
            *total = total.saturating_add(qty);
            if *total > piece.remaining_qty {
                return Err(EngineError::InsufficientQuantity {
                    piece_id: piece.id,
                    requested: *total,
                    remaining: piece.remaining_qty,
                });
            }
        }

        for (&idx, &qty) in &needed {
            self.consume(idx, qty)?;
        }

        let items = takes
            .iter()
            .map(|&(idx, qty)| {
                let p = &self.pieces[idx];
                UsedItem {
                    piece_id: p.id,
                    width: p.width,
                    length: p.length,
                    qty_used: qty,
                    qty_remaining_after: p.remaining_qty,
                    original_qty: p.original_qty,
                }
            })
            .collect();

        Ok(Group { group_id, items })
    }

    /// Pieces that still hold quantity, in input order.
    pub fn residual(&self) -> Vec<Piece> {
        self.pieces
            .iter()
            .filter(|p| p.remaining_qty > 0)
            .cloned()
            .collect()
    }
}
