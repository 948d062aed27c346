//! Enumeration of partner sets that bring an anchor into the width window.

use crate::inventory::Inventory;
use crate::types::WidthWindow;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchOptions {
    /// Number of partners per set.
    pub size: usize,
    /// Whether one piece may appear more than once in a set.
    pub with_repetition: bool,
    /// Whether the anchor may also appear as its own partner.
    pub allow_anchor: bool,
    /// Stop after this many sets.
    pub max_sets: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartnerSet {
    /// Inventory indices, in search order. Repeated indices are adjacent.
    pub members: Vec<usize>,
    /// Anchor width plus every member's width.
    pub width: u64,
}

impl PartnerSet {
    pub fn has_repeats(&self, anchor: usize) -> bool {
        self.members.contains(&anchor) || self.members.windows(2).any(|w| w[0] == w[1])
    }
}

/// Sets of `opts.size` partners for `anchor` whose combined width with the
/// anchor lies in `window`. Only pieces with remaining quantity take part,
/// and a piece repeats only as often as its quantity can cover.
///
/// `order` fixes the generation order; every set lists its members in that
/// order, so no set is produced twice.
pub fn partner_sets(
    inv: &Inventory,
    order: &[usize],
    anchor: usize,
    window: WidthWindow,
    opts: SearchOptions,
) -> Vec<PartnerSet> {
    let anchor_width = inv.piece(anchor).width as u64;
    if opts.size == 0 || anchor_width > window.max as u64 {
        return Vec::new();
    }
    let budget = window.max as u64 - anchor_width;

    let pool: Vec<usize> = order
        .iter()
        .copied()
        .filter(|&i| inv.remaining(i) > 0)
        .filter(|&i| opts.allow_anchor || i != anchor)
        .filter(|&i| inv.piece(i).width as u64 <= budget)
        .collect();

    let mut search = Search {
        inv,
        pool: &pool,
        anchor,
        anchor_width,
        window,
        opts,
        current: Vec::with_capacity(opts.size),
        out: Vec::new(),
    };
    search.combine(0, 0);
    search.out
}

struct Search<'a> {
    inv: &'a Inventory,
    pool: &'a [usize],
    anchor: usize,
    anchor_width: u64,
    window: WidthWindow,
    opts: SearchOptions,
    current: Vec<usize>,
    out: Vec<PartnerSet>,
}

impl Search<'_> {
    fn combine(&mut self, start: usize, width: u64) {
        if self.out.len() >= self.opts.max_sets {
            return;
        }
        if self.current.len() == self.opts.size {
            let total = self.anchor_width + width;
            if self.window.contains(total) {
                self.out.push(PartnerSet {
                    members: self.current.clone(),
                    width: total,
                });
            }
            return;
        }

        let budget = self.window.max as u64 - self.anchor_width;
        for pos in start..self.pool.len() {
            let idx = self.pool[pos];
            let w = self.inv.piece(idx).width as u64;
            if width + w > budget {
                continue;
            }
            if !self.can_repeat(idx) {
                continue;
            }
            self.current.push(idx);
            let next = if self.opts.with_repetition { pos } else { pos + 1 };
            self.combine(next, width + w);
            self.current.pop();
        }
    }

    /// Every occurrence needs at least one unit, the anchor's own included.
    fn can_repeat(&self, idx: usize) -> bool {
        let mut uses = self.current.iter().filter(|&&i| i == idx).count() as u64 + 1;
        if idx == self.anchor {
            uses += 1;
        }
        uses <= self.inv.remaining(idx) as u64
    }
}
