use serde::{Deserialize, Deserializer, Serialize};

use crate::error::EngineError;

/// Inclusive range a group's summed width has to land in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WidthWindow {
    pub min: u32,
    pub max: u32,
}

impl WidthWindow {
    pub fn new(min: u32, max: u32) -> Self {
        Self { min, max }
    }

    pub fn contains(&self, width: u64) -> bool {
        width >= self.min as u64 && width <= self.max as u64
    }
}

impl std::fmt::Display for WidthWindow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}, {}]", self.min, self.max)
    }
}

/// One inventory record. `remaining_qty` only ever goes down, and only
/// through [`Piece::consume`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Piece {
    pub id: u32,
    pub width: u32,
    pub length: u32,
    pub original_qty: u32,
    pub(crate) remaining_qty: u32,
}

impl Piece {
    pub fn new(id: u32, width: u32, length: u32, qty: u32) -> Self {
        Self {
            id,
            width,
            length,
            original_qty: qty,
            remaining_qty: qty,
        }
    }

    pub fn remaining_qty(&self) -> u32 {
        self.remaining_qty
    }

    pub fn consumed_qty(&self) -> u32 {
        self.original_qty - self.remaining_qty
    }

    pub fn consume(&mut self, n: u32) -> Result<(), EngineError> {
        if n > self.remaining_qty {
            return Err(EngineError::InsufficientQuantity {
                piece_id: self.id,
                requested: n,
                remaining: self.remaining_qty,
            });
        }
        self.remaining_qty -= n;
        Ok(())
    }
}

impl std::fmt::Display for Piece {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{} {}x{}", self.id, self.width, self.length)
    }
}

/// How much of one piece went into one group. Holds copies of the piece's
/// scalars so it stays valid while the inventory keeps changing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UsedItem {
    pub piece_id: u32,
    pub width: u32,
    pub length: u32,
    pub qty_used: u32,
    pub qty_remaining_after: u32,
    pub original_qty: u32,
}

impl UsedItem {
    pub fn length_ref(&self) -> u64 {
        self.length as u64 * self.qty_used as u64
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Group {
    pub group_id: u32,
    pub items: Vec<UsedItem>,
}

impl Group {
    pub fn total_width(&self) -> u64 {
        self.items.iter().map(|i| i.width as u64).sum()
    }

    pub fn total_qty(&self) -> u64 {
        self.items.iter().map(|i| i.qty_used as u64).sum()
    }

    /// Difference between the largest and smallest `length_ref` in the group.
    pub fn length_spread(&self) -> u64 {
        let refs = self.items.iter().map(UsedItem::length_ref);
        match (refs.clone().max(), refs.min()) {
            (Some(max), Some(min)) => max - min,
            _ => 0,
        }
    }

    pub fn piece_ids(&self) -> Vec<u32> {
        self.items.iter().map(|i| i.piece_id).collect()
    }

    /// Order-independent identity of the group, quantities included.
    pub fn signature(&self) -> Vec<(u32, u32, u32, u32)> {
        let mut sig: Vec<_> = self
            .items
            .iter()
            .map(|i| (i.piece_id, i.width, i.length, i.qty_used))
            .collect();
        sig.sort_unstable();
        sig
    }

    pub fn is_valid(&self, window: WidthWindow, tolerance: u64) -> bool {
        !self.items.is_empty()
            && self.items.iter().all(|i| i.qty_used > 0)
            && window.contains(self.total_width())
            && self.length_spread() <= tolerance
    }
}

/// Flat export shape every report format reduces to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GroupRow {
    pub group_id: u32,
    pub piece_id: u32,
    pub width: u32,
    pub length: u32,
    pub qty_used: u32,
    pub qty_remaining: u32,
    pub original_qty: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct Solution {
    pub groups: Vec<Group>,
    pub residual: Vec<Piece>,
    pub total_qty: u64,
    pub cancelled: bool,
}

impl Solution {
    pub fn group_count(&self) -> usize {
        self.groups.len()
    }

    pub fn rows(&self) -> Vec<GroupRow> {
        self.groups
            .iter()
            .flat_map(|g| {
                g.items.iter().map(move |i| GroupRow {
                    group_id: g.group_id,
                    piece_id: i.piece_id,
                    width: i.width,
                    length: i.length,
                    qty_used: i.qty_used,
                    qty_remaining: i.qty_remaining_after,
                    original_qty: i.original_qty,
                })
            })
            .collect()
    }

    pub fn grouped_qty(&self) -> u64 {
        self.groups.iter().map(Group::total_qty).sum()
    }

    pub fn utilization_percent(&self) -> f64 {
        if self.total_qty == 0 {
            return 0.0;
        }
        self.grouped_qty() as f64 / self.total_qty as f64 * 100.0
    }

    /// Total quantity of `piece_id` committed across all groups.
    pub fn used_qty(&self, piece_id: u32) -> u64 {
        self.groups
            .iter()
            .flat_map(|g| &g.items)
            .filter(|i| i.piece_id == piece_id)
            .map(|i| i.qty_used as u64)
            .sum()
    }
}

/// Accepts `80` as well as `80.0` for integral fields coming from JSON
/// clients that send every number as a float.
pub fn deserialize_u32_from_number<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Number::deserialize(deserializer)?;
    if let Some(n) = value.as_u64() {
        return u32::try_from(n).map_err(serde::de::Error::custom);
    }
    match value.as_f64() {
        Some(f) if f >= 0.0 && f.fract() == 0.0 && f <= u32::MAX as f64 => Ok(f as u32),
        _ => Err(serde::de::Error::custom(format!(
            "expected a non-negative integer, got {value}"
        ))),
    }
}
