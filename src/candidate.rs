use std::collections::BTreeMap;

use crate::inventory::Inventory;
use crate::ratio;

/// An anchor, its partners and the quantities the ratio solver picked for
/// them. Nothing is consumed until the candidate is committed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    /// `(inventory index, qty)` per member, anchor first.
    pub takes: Vec<(usize, u32)>,
    pub width: u64,
}

impl Candidate {
    pub fn total_qty(&self) -> u64 {
        self.takes.iter().map(|&(_, q)| q as u64).sum()
    }

    /// Same shape as [`crate::types::Group::signature`].
    pub fn signature(&self, inv: &Inventory) -> Vec<(u32, u32, u32, u32)> {
        signature_of(inv, &self.takes)
    }

    /// True when `self` should be preferred over `other`: more quantity,
    /// then more width.
    pub fn beats(&self, other: &Candidate) -> bool {
        (self.total_qty(), self.width) > (other.total_qty(), other.width)
    }
}

pub fn signature_of(inv: &Inventory, takes: &[(usize, u32)]) -> Vec<(u32, u32, u32, u32)> {
    let mut sig: Vec<_> = takes
        .iter()
        .map(|&(idx, q)| {
            let p = inv.piece(idx);
            (p.id, p.width, p.length, q)
        })
        .collect();
    sig.sort_unstable();
    sig
}

/// Runs the ratio solver over `anchor` plus `partners` against the
/// quantities in `remaining`. A piece listed `n` times may use at most
/// `remaining / n` per entry, so the result is always affordable.
pub fn evaluate(
    inv: &Inventory,
    remaining: &[u32],
    anchor: usize,
    partners: &[usize],
    tolerance: u64,
) -> Option<Candidate> {
    let members: Vec<usize> = std::iter::once(anchor).chain(partners.iter().copied()).collect();

    let mut counts: BTreeMap<usize, u32> = BTreeMap::new();
    for &m in &members {
        *counts.entry(m).or_insert(0) += 1;
    }

    let lengths: Vec<u32> = members.iter().map(|&m| inv.piece(m).length).collect();
    let limits: Vec<u32> = members
        .iter()
        .map(|m| remaining[*m] / counts[m])
        .collect();

    let xs = ratio::solve(&lengths, &limits, tolerance)?;
    if xs.contains(&0) {
        return None;
    }

    Some(Candidate {
        takes: members.iter().copied().zip(xs).collect(),
        width: members.iter().map(|&m| inv.piece(m).width as u64).sum(),
    })
}
