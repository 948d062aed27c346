//! Greedy group assembly: partner search, width filling, repetition and the
//! single-piece fallback, plus the final merge pass.

use std::collections::BTreeSet;

use tracing::warn;

use crate::candidate::{self, Candidate};
use crate::config::{EngineConfig, Limits};
use crate::error::EngineError;
use crate::inventory::Inventory;
use crate::observer::{GroupObserver, Phase};
use crate::partners::{SearchOptions, partner_sets};
use crate::ratio;
use crate::types::{Group, WidthWindow};

type Signature = Vec<(u32, u32, u32, u32)>;

pub struct Assembler<'a> {
    inv: Inventory,
    window: WidthWindow,
    tolerance: u64,
    limits: Limits,
    groups: Vec<Group>,
    next_id: u32,
    seen: BTreeSet<Signature>,
    observer: &'a mut dyn GroupObserver,
}

impl<'a> Assembler<'a> {
    pub fn new(inv: Inventory, config: &EngineConfig, observer: &'a mut dyn GroupObserver) -> Self {
        Self {
            inv,
            window: config.window(),
            tolerance: config.tolerance,
            limits: config.limits.clone(),
            groups: Vec::new(),
            next_id: 1,
            seen: BTreeSet::new(),
            observer,
        }
    }

    pub fn inventory(&self) -> &Inventory {
        &self.inv
    }

    pub fn groups(&self) -> &[Group] {
        &self.groups
    }

    pub fn into_parts(self) -> (Vec<Group>, Inventory) {
        (self.groups, self.inv)
    }

    /// A piece wider than the window can never be grouped.
    pub fn is_parked(&self, idx: usize) -> bool {
        self.inv.piece(idx).width > self.window.max
    }

    /// Commits `takes` as one group. `Ok(false)` means the group was not
    /// committed: it breaks the width or tolerance bound, or `dedup` is set
    /// and an identical group already exists.
    pub fn commit(
        &mut self,
        phase: Phase,
        takes: &[(usize, u32)],
        dedup: bool,
    ) -> Result<bool, EngineError> {
        let width: u64 = takes.iter().map(|&(i, _)| self.inv.piece(i).width as u64).sum();
        let lengths: Vec<u32> = takes.iter().map(|&(i, _)| self.inv.piece(i).length).collect();
        let qtys: Vec<u32> = takes.iter().map(|&(_, q)| q).collect();
        if !self.window.contains(width) || ratio::spread(&lengths, &qtys) > self.tolerance {
            warn!(%phase, width, "rejecting group outside width or tolerance bounds");
            return Ok(false);
        }

        let sig = candidate::signature_of(&self.inv, takes);
        if dedup && self.seen.contains(&sig) {
            return Ok(false);
        }

        let group = self.inv.commit(self.next_id, takes)?;
        self.next_id += 1;
        self.seen.insert(sig);
        self.observer.on_group_committed(phase, &group);
        self.groups.push(group);
        Ok(true)
    }

    pub fn finish_phase(&mut self, phase: Phase) {
        self.observer.on_phase_complete(phase, self.groups.len());
    }

    /// Best candidate with exactly `level` partners: plain sets first, then
    /// sets that repeat a piece or reuse the anchor. Sets are tried widest
    /// first; more quantity wins, then more width, then the earlier set.
    pub fn best_partner_candidate(&self, anchor: usize, level: usize) -> Option<Candidate> {
        let order = self.inv.order_by_size();
        let remaining = self.inv.snapshot();
        let mut best: Option<Candidate> = None;

        for with_repetition in [false, true] {
            let opts = SearchOptions {
                size: level,
                with_repetition,
                allow_anchor: with_repetition,
                max_sets: self.limits.max_sets_per_level,
            };
            let mut sets = partner_sets(&self.inv, &order, anchor, self.window, opts);
            if with_repetition {
                // the rest were already covered by the plain pass
                sets.retain(|s| s.has_repeats(anchor));
            }
            sets.sort_by(|a, b| b.width.cmp(&a.width));

            for set in sets {
                let Some(c) =
                    candidate::evaluate(&self.inv, &remaining, anchor, &set.members, self.tolerance)
                else {
                    continue;
                };
                if self.seen.contains(&c.signature(&self.inv)) {
                    continue;
                }
                if best.as_ref().is_none_or(|b| c.beats(b)) {
                    best = Some(c);
                }
            }
        }
        best
    }

    /// Chains partners onto `anchor`, widest first, until the width reaches
    /// `max_width` or nothing else fits. Each new partner re-solves the
    /// ratio with the anchor capped at its current usage.
    pub fn width_fill(&mut self, anchor: usize) -> Result<bool, EngineError> {
        if self.is_parked(anchor) || self.inv.remaining(anchor) == 0 {
            return Ok(false);
        }
        let order = self.inv.order_by_size();
        let max = self.window.max as u64;

        let mut members = vec![anchor];
        let mut xs = vec![self.inv.remaining(anchor)];
        let mut width = self.inv.piece(anchor).width as u64;

        while members.len() <= self.limits.max_fill_partners && width < max {
            let mut extended = false;
            for &p in &order {
                if members.contains(&p) || self.inv.remaining(p) == 0 {
                    continue;
                }
                let pw = self.inv.piece(p).width as u64;
                if width + pw > max {
                    continue;
                }

                let lengths: Vec<u32> = members
                    .iter()
                    .chain(std::iter::once(&p))
                    .map(|&m| self.inv.piece(m).length)
                    .collect();
                let mut limits = vec![xs[0]];
                limits.extend(members[1..].iter().map(|&m| self.inv.remaining(m)));
                limits.push(self.inv.remaining(p));

                if let Some(solved) = ratio::solve(&lengths, &limits, self.tolerance) {
                    members.push(p);
                    xs = solved;
                    width += pw;
                    extended = true;
                    break;
                }
            }
            if !extended {
                break;
            }
        }

        if members.len() < 2 || !self.window.contains(width) {
            return Ok(false);
        }
        let takes: Vec<(usize, u32)> = members.into_iter().zip(xs).collect();
        self.commit(Phase::WidthFill, &takes, true)
    }

    /// Places `r >= 2` copies of `anchor` side by side, largest `r` first,
    /// splitting its remaining quantity across the copies.
    pub fn repeat(&mut self, anchor: usize) -> Result<bool, EngineError> {
        let piece = self.inv.piece(anchor);
        let (width, length, qty) = (piece.width, piece.length, piece.remaining_qty());
        if qty < 2 || self.is_parked(anchor) {
            return Ok(false);
        }

        let max_r = ((self.window.max / width) as usize)
            .min(self.limits.max_repeats)
            .min(qty as usize);
        for r in (2..=max_r).rev() {
            if !self.window.contains(width as u64 * r as u64) {
                continue;
            }
            let Some(split) = even_split(qty, r as u32, length, self.tolerance) else {
                continue;
            };
            let takes: Vec<(usize, u32)> = split.into_iter().map(|q| (anchor, q)).collect();
            if self.commit(Phase::Repetition, &takes, true)? {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Last resort: the piece alone, when its own width is in the window.
    pub fn single(&mut self, anchor: usize) -> Result<bool, EngineError> {
        let piece = self.inv.piece(anchor);
        let qty = piece.remaining_qty();
        if qty == 0 || !self.window.contains(piece.width as u64) {
            return Ok(false);
        }
        self.commit(Phase::Fallback, &[(anchor, qty)], false)
    }

    /// Merges groups, then renumbers them `1..` in output order.
    pub fn merge(&mut self) {
        let groups = std::mem::take(&mut self.groups);
        self.groups = merge_groups(groups, self.tolerance);
        for (i, g) in self.groups.iter_mut().enumerate() {
            g.group_id = i as u32 + 1;
        }
        self.finish_phase(Phase::Merge);
    }
}

/// Splits `qty` over `r` entries as evenly as possible. Entries may differ
/// by one unit only if one `length` fits in the tolerance; otherwise the
/// odd units stay behind.
pub fn even_split(qty: u32, r: u32, length: u32, tolerance: u64) -> Option<Vec<u32>> {
    if r == 0 {
        return None;
    }
    let base = qty / r;
    if base == 0 {
        return None;
    }
    let mut extra = qty % r;
    if extra > 0 && length as u64 > tolerance {
        extra = 0;
    }
    Some((0..r).map(|i| base + u32::from(i < extra)).collect())
}

/// Folds groups with the same ordered piece ids into the earliest one by
/// summing quantities, as long as the result stays within `tolerance`.
pub fn merge_groups(groups: Vec<Group>, tolerance: u64) -> Vec<Group> {
    let mut merged: Vec<Group> = Vec::with_capacity(groups.len());
    for g in groups {
        let ids = g.piece_ids();
        let target = merged
            .iter_mut()
            .find(|m| m.piece_ids() == ids && merged_spread(m, &g) <= tolerance);
        match target {
            Some(m) => {
                for (a, b) in m.items.iter_mut().zip(&g.items) {
                    a.qty_used += b.qty_used;
                    a.qty_remaining_after = b.qty_remaining_after;
                }
            }
            None => merged.push(g),
        }
    }
    merged
}

fn merged_spread(a: &Group, b: &Group) -> u64 {
    let refs = a
        .items
        .iter()
        .zip(&b.items)
        .map(|(x, y)| x.length as u64 * (x.qty_used as u64 + y.qty_used as u64));
    match (refs.clone().max(), refs.min()) {
        (Some(max), Some(min)) => max - min,
        _ => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observer::RecordingObserver;
    use crate::types::{Piece, UsedItem};

    fn config(min: u32, max: u32, tolerance: u64) -> EngineConfig {
        EngineConfig::new(min, max, tolerance, 3)
    }

    #[test]
    fn test_best_pair() {
        let inv = Inventory::new(vec![Piece::new(1, 50, 100, 20), Piece::new(2, 30, 150, 15)]);
        let mut obs = RecordingObserver::default();
        let asm = Assembler::new(inv, &config(80, 150, 300), &mut obs);
        let c = asm.best_partner_candidate(0, 1).unwrap();
        assert_eq!(c.takes, vec![(0, 20), (1, 15)]);
    }

    #[test]
    fn test_commit_dedup() {
        let inv = Inventory::new(vec![Piece::new(1, 50, 100, 20), Piece::new(2, 30, 100, 15)]);
        let mut obs = RecordingObserver::default();
        let mut asm = Assembler::new(inv, &config(80, 150, 0), &mut obs);
        assert_eq!(asm.commit(Phase::Partner, &[(0, 1), (1, 1)], true), Ok(true));
        assert_eq!(asm.commit(Phase::Partner, &[(0, 1), (1, 1)], true), Ok(false));
        assert_eq!(asm.commit(Phase::Partner, &[(0, 1), (1, 1)], false), Ok(true));
        assert_eq!(asm.groups().len(), 2);
        assert_eq!(asm.groups()[1].group_id, 2);
        drop(asm);
        assert_eq!(obs.committed, vec![(Phase::Partner, 1), (Phase::Partner, 2)]);
    }

    #[test]
    fn test_commit_rejects_out_of_bounds() {
        let inv = Inventory::new(vec![Piece::new(1, 50, 100, 20), Piece::new(2, 30, 150, 15)]);
        let mut obs = RecordingObserver::default();
        let mut asm = Assembler::new(inv, &config(80, 150, 0), &mut obs);
        // 100 vs 150: spread above a zero tolerance
        assert_eq!(asm.commit(Phase::Partner, &[(0, 1), (1, 1)], true), Ok(false));
        // width 50 below the window
        assert_eq!(asm.commit(Phase::Fallback, &[(0, 1)], false), Ok(false));
        assert_eq!(asm.inventory().snapshot(), vec![20, 15]);
    }

    #[test]
    fn test_commit_surfaces_insufficient_quantity() {
        let inv = Inventory::new(vec![Piece::new(1, 50, 100, 2), Piece::new(2, 30, 100, 15)]);
        let mut obs = RecordingObserver::default();
        let mut asm = Assembler::new(inv, &config(80, 150, 0), &mut obs);
        let err = asm.commit(Phase::Partner, &[(0, 3), (1, 3)], true).unwrap_err();
        assert!(matches!(err, EngineError::InsufficientQuantity { piece_id: 1, .. }));
        assert!(asm.groups().is_empty());
    }

    #[test]
    fn test_width_fill_chains_partners() {
        let inv = Inventory::new(vec![
            Piece::new(1, 50, 100, 10),
            Piece::new(2, 30, 100, 10),
            Piece::new(3, 20, 100, 10),
        ]);
        let mut obs = RecordingObserver::default();
        let mut asm = Assembler::new(inv, &config(95, 100, 0), &mut obs);
        assert_eq!(asm.width_fill(0), Ok(true));
        let g = &asm.groups()[0];
        assert_eq!(g.piece_ids(), vec![1, 2, 3]);
        assert_eq!(g.total_width(), 100);
        assert_eq!(g.total_qty(), 30);
    }

    #[test]
    fn test_width_fill_lowers_anchor_usage() {
        let inv = Inventory::new(vec![Piece::new(1, 60, 100, 10), Piece::new(2, 40, 200, 3)]);
        let mut obs = RecordingObserver::default();
        let mut asm = Assembler::new(inv, &config(90, 100, 0), &mut obs);
        assert_eq!(asm.width_fill(0), Ok(true));
        let g = &asm.groups()[0];
        assert_eq!(g.items[0].qty_used, 6);
        assert_eq!(g.items[1].qty_used, 3);
        assert_eq!(asm.inventory().remaining(0), 4);
    }

    #[test]
    fn test_repeat_splits_evenly() {
        let inv = Inventory::new(vec![Piece::new(1, 40, 100, 7)]);
        let mut obs = RecordingObserver::default();
        let mut asm = Assembler::new(inv, &config(75, 125, 100), &mut obs);
        assert_eq!(asm.repeat(0), Ok(true));
        let g = &asm.groups()[0];
        let qtys: Vec<u32> = g.items.iter().map(|i| i.qty_used).collect();
        assert_eq!(qtys, vec![3, 2, 2]);
        assert_eq!(g.length_spread(), 100);
        assert_eq!(asm.inventory().remaining(0), 0);
    }

    #[test]
    fn test_repeat_leaves_odd_units_without_tolerance() {
        let inv = Inventory::new(vec![Piece::new(1, 40, 100, 7)]);
        let mut obs = RecordingObserver::default();
        let mut asm = Assembler::new(inv, &config(75, 125, 0), &mut obs);
        assert_eq!(asm.repeat(0), Ok(true));
        assert_eq!(asm.groups()[0].total_qty(), 6);
        assert_eq!(asm.inventory().remaining(0), 1);
    }

    #[test]
    fn test_single_and_parked() {
        let inv = Inventory::new(vec![Piece::new(1, 90, 100, 4), Piece::new(2, 200, 100, 4)]);
        let mut obs = RecordingObserver::default();
        let mut asm = Assembler::new(inv, &config(80, 150, 0), &mut obs);
        assert!(asm.is_parked(1));
        assert_eq!(asm.single(1), Ok(false));
        assert_eq!(asm.repeat(1), Ok(false));
        assert_eq!(asm.width_fill(1), Ok(false));
        assert_eq!(asm.single(0), Ok(true));
        assert_eq!(asm.groups()[0].total_qty(), 4);
        assert_eq!(asm.inventory().remaining(1), 4);
    }

    #[test]
    fn test_merge_renumbers_groups() {
        let inv = Inventory::new(vec![Piece::new(1, 50, 100, 20), Piece::new(2, 30, 100, 15)]);
        let mut obs = RecordingObserver::default();
        let mut asm = Assembler::new(inv, &config(80, 150, 0), &mut obs);
        assert_eq!(asm.commit(Phase::Partner, &[(0, 2), (1, 2)], false), Ok(true));
        assert_eq!(asm.commit(Phase::Partner, &[(0, 2), (1, 2)], false), Ok(true));
        assert_eq!(asm.commit(Phase::Partner, &[(1, 1), (0, 1)], false), Ok(true));
        asm.merge();
        let ids: Vec<u32> = asm.groups().iter().map(|g| g.group_id).collect();
        assert_eq!(ids, vec![1, 2]);
        assert_eq!(asm.groups()[0].total_qty(), 8);
        assert_eq!(asm.groups()[1].piece_ids(), vec![2, 1]);
    }

    #[test]
    fn test_even_split() {
        assert_eq!(even_split(7, 3, 100, 100), Some(vec![3, 2, 2]));
        assert_eq!(even_split(7, 3, 100, 99), Some(vec![2, 2, 2]));
        assert_eq!(even_split(6, 2, 100, 0), Some(vec![3, 3]));
        assert_eq!(even_split(1, 2, 100, 0), None);
        assert_eq!(even_split(5, 0, 100, 0), None);
    }

    fn group(id: u32, items: &[(u32, u32, u32)]) -> Group {
        Group {
            group_id: id,
            items: items
                .iter()
                .map(|&(piece_id, length, qty_used)| UsedItem {
                    piece_id,
                    width: 40,
                    length,
                    qty_used,
                    qty_remaining_after: 0,
                    original_qty: 100,
                })
                .collect(),
        }
    }

    #[test]
    fn test_merge_same_pieces() {
        let groups = vec![
            group(1, &[(1, 100, 2), (2, 100, 2)]),
            group(2, &[(3, 100, 1), (2, 100, 1)]),
            group(3, &[(1, 100, 3), (2, 100, 3)]),
        ];
        let merged = merge_groups(groups, 0);
        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].group_id, 1);
        assert_eq!(merged[0].total_qty(), 10);
        assert_eq!(merged[1].group_id, 2);
    }

    #[test]
    fn test_merge_keeps_tolerance() {
        let groups = vec![
            group(1, &[(1, 100, 1), (2, 110, 1)]),
            group(2, &[(1, 100, 1), (2, 110, 1)]),
        ];
        let merged = merge_groups(groups.clone(), 10);
        assert_eq!(merged.len(), 2);
        let merged = merge_groups(groups, 20);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].length_spread(), 20);
    }
}
