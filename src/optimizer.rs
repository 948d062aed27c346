//! Exhaustive alternative to the greedy assembler for small inventories.
//!
//! Every valid candidate found against the starting quantities becomes a
//! recipe. A state is the vector of remaining quantities; applying a recipe
//! subtracts its demand. States are relaxed round by round until nothing new
//! is reachable or a cap is hit, and the state with the most consumption
//! wins.

use std::cmp::Reverse;
use std::collections::{BTreeMap, BTreeSet};

use num_integer::Integer;

use crate::assembler::even_split;
use crate::candidate;
use crate::config::{EngineConfig, Limits};
use crate::inventory::Inventory;
use crate::partners::{SearchOptions, partner_sets};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Recipe {
    /// Entries of the group this recipe commits, in group order.
    pub takes: Vec<(usize, u32)>,
    /// Per-piece totals of `takes`.
    pub demand: Vec<(usize, u32)>,
    pub total: u64,
}

impl Recipe {
    pub fn new(takes: Vec<(usize, u32)>) -> Self {
        let mut demand: BTreeMap<usize, u32> = BTreeMap::new();
        for &(idx, q) in &takes {
            *demand.entry(idx).or_insert(0) += q;
        }
        let total = takes.iter().map(|&(_, q)| q as u64).sum();
        Self {
            takes,
            demand: demand.into_iter().collect(),
            total,
        }
    }

    pub fn fits(&self, state: &[u32]) -> bool {
        self.demand.iter().all(|&(idx, q)| q <= state[idx])
    }

    pub fn apply(&self, state: &[u32]) -> Vec<u32> {
        let mut next = state.to_vec();
        for &(idx, q) in &self.demand {
            next[idx] -= q;
        }
        next
    }

    /// The same group with quantities divided by their common factor, if
    /// there is one.
    fn primitive(&self) -> Option<Recipe> {
        let g = self.takes.iter().fold(0u32, |acc, &(_, q)| acc.gcd(&q));
        (g > 1).then(|| Recipe::new(self.takes.iter().map(|&(i, q)| (i, q / g)).collect()))
    }
}

/// Every distinct recipe available from the inventory's current quantities:
/// partner candidates at each level (and their primitive ratios) and even
/// repetitions of one piece. Single pieces are left to the fallback that
/// runs after the plan is committed.
pub fn collect_recipes(inv: &Inventory, config: &EngineConfig) -> Vec<Recipe> {
    let state = inv.snapshot();
    let order = inv.order_by_size();
    let window = config.window();
    let mut seen: BTreeSet<Vec<(usize, u32)>> = BTreeSet::new();
    let mut recipes = Vec::new();

    let mut push = |recipe: Recipe| {
        let mut key = recipe.takes.clone();
        key.sort_unstable();
        if seen.insert(key) {
            recipes.push(recipe);
        }
    };

    for &anchor in &order {
        let piece = inv.piece(anchor);
        if state[anchor] == 0 || piece.width > window.max {
            continue;
        }

        for level in 1..=config.effective_max_partner() {
            for with_repetition in [false, true] {
                let opts = SearchOptions {
                    size: level,
                    with_repetition,
                    allow_anchor: with_repetition,
                    max_sets: config.limits.max_sets_per_level,
                };
                let mut sets = partner_sets(inv, &order, anchor, window, opts);
                if with_repetition {
                    sets.retain(|s| s.has_repeats(anchor));
                }
                for set in sets {
                    let Some(c) =
                        candidate::evaluate(inv, &state, anchor, &set.members, config.tolerance)
                    else {
                        continue;
                    };
                    let recipe = Recipe::new(c.takes);
                    if let Some(p) = recipe.primitive() {
                        push(p);
                    }
                    push(recipe);
                }
            }
        }

        let max_r = ((window.max / piece.width) as usize)
            .min(config.limits.max_repeats)
            .min(state[anchor] as usize);
        for r in 2..=max_r {
            if !window.contains(piece.width as u64 * r as u64) {
                continue;
            }
            if let Some(split) = even_split(state[anchor], r as u32, piece.length, config.tolerance) {
                push(Recipe::new(split.into_iter().map(|q| (anchor, q)).collect()));
            }
        }
    }
    recipes
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Plan {
    /// Recipe indices in the order they should be committed.
    pub applications: Vec<usize>,
    pub consumed: u64,
    pub rounds: usize,
    pub states: usize,
    /// False when a cap or cancellation stopped the search early.
    pub complete: bool,
    pub cancelled: bool,
}

#[derive(Debug, Clone)]
struct Value {
    consumed: u64,
    path: Vec<usize>,
}

pub fn optimize(
    initial: &[u32],
    recipes: &[Recipe],
    limits: &Limits,
    cancelled: &dyn Fn() -> bool,
) -> Plan {
    let mut best: BTreeMap<Vec<u32>, Value> = BTreeMap::new();
    best.insert(
        initial.to_vec(),
        Value {
            consumed: 0,
            path: Vec::new(),
        },
    );
    let mut frontier = vec![initial.to_vec()];
    let mut rounds = 0;
    let mut was_cancelled = false;

    while !frontier.is_empty() && rounds < limits.dp_max_iterations {
        if cancelled() {
            was_cancelled = true;
            break;
        }
        rounds += 1;

        let mut next: BTreeSet<Vec<u32>> = BTreeSet::new();
        for state in &frontier {
            let Some(value) = best.get(state).cloned() else {
                continue;
            };
            for (ri, recipe) in recipes.iter().enumerate() {
                if !recipe.fits(state) {
                    continue;
                }
                let reached = recipe.apply(state);
                let consumed = value.consumed + recipe.total;
                let improves = match best.get(&reached) {
                    Some(v) => consumed > v.consumed,
                    None => best.len() < limits.dp_max_states,
                };
                if !improves {
                    continue;
                }
                let mut path = value.path.clone();
                path.push(ri);
                best.insert(reached.clone(), Value { consumed, path });
                next.insert(reached);
            }
        }
        frontier = next.into_iter().collect();
    }

    let mut winner: Option<&Value> = None;
    for v in best.values() {
        let better = winner.is_none_or(|w| {
            (v.consumed, Reverse(v.path.len())) > (w.consumed, Reverse(w.path.len()))
        });
        if better {
            winner = Some(v);
        }
    }

    let (applications, consumed) = match (was_cancelled, winner) {
        (false, Some(v)) => (v.path.clone(), v.consumed),
        _ => (Vec::new(), 0),
    };
    Plan {
        applications,
        consumed,
        rounds,
        states: best.len(),
        complete: frontier.is_empty() && !was_cancelled,
        cancelled: was_cancelled,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Piece;

    fn recipes() -> Vec<Recipe> {
        vec![
            Recipe::new(vec![(0, 3), (1, 3)]),
            Recipe::new(vec![(0, 2), (2, 2)]),
            Recipe::new(vec![(1, 2), (2, 2)]),
        ]
    }

    #[test]
    fn test_recipe_demand() {
        let r = Recipe::new(vec![(0, 2), (1, 1), (0, 3)]);
        assert_eq!(r.demand, vec![(0, 5), (1, 1)]);
        assert_eq!(r.total, 6);
        assert!(r.fits(&[5, 1]));
        assert!(!r.fits(&[4, 9]));
        assert_eq!(r.apply(&[6, 1]), vec![1, 0]);
    }

    #[test]
    fn test_primitive() {
        let r = Recipe::new(vec![(0, 20), (1, 15)]);
        assert_eq!(r.primitive().unwrap().takes, vec![(0, 4), (1, 3)]);
        assert_eq!(Recipe::new(vec![(0, 2), (1, 3)]).primitive(), None);
    }

    #[test]
    fn test_beats_first_choice() {
        let plan = optimize(&[3, 3, 4], &recipes(), &Limits::default(), &|| false);
        assert_eq!(plan.consumed, 8);
        let mut apps = plan.applications.clone();
        apps.sort_unstable();
        assert_eq!(apps, vec![1, 2]);
        assert!(plan.complete);
    }

    #[test]
    fn test_iteration_cap() {
        let limits = Limits {
            dp_max_iterations: 1,
            ..Limits::default()
        };
        let plan = optimize(&[3, 3, 4], &recipes(), &limits, &|| false);
        assert_eq!(plan.consumed, 6);
        assert_eq!(plan.applications, vec![0]);
        assert!(!plan.complete);
    }

    #[test]
    fn test_reuses_recipe() {
        let recipes = vec![Recipe::new(vec![(0, 1), (1, 1)])];
        let plan = optimize(&[4, 3], &recipes, &Limits::default(), &|| false);
        assert_eq!(plan.applications, vec![0, 0, 0]);
        assert_eq!(plan.consumed, 6);
    }

    #[test]
    fn test_cancelled() {
        let plan = optimize(&[3, 3, 4], &recipes(), &Limits::default(), &|| true);
        assert!(plan.cancelled);
        assert!(plan.applications.is_empty());
        assert_eq!(plan.rounds, 0);
    }

    #[test]
    fn test_collect_recipes() {
        let inv = Inventory::new(vec![Piece::new(1, 50, 100, 20), Piece::new(2, 30, 150, 15)]);
        let cfg = EngineConfig::new(80, 150, 300, 1);
        let recipes = collect_recipes(&inv, &cfg);
        assert!(recipes.iter().any(|r| r.takes == vec![(0, 20), (1, 15)]));
        assert!(recipes.iter().any(|r| r.takes == vec![(0, 4), (1, 3)]));
        // two or three side by side of piece 1
        assert!(recipes.iter().any(|r| r.takes.len() == 3 && r.takes.iter().all(|t| t.0 == 0)));
        assert!(recipes.iter().all(|r| r.takes.len() > 1));
    }

    #[test]
    fn test_collect_recipes_skips_single_pieces() {
        // both fit the window alone
        let inv = Inventory::new(vec![Piece::new(1, 150, 100, 10), Piece::new(2, 140, 150, 10)]);
        let cfg = EngineConfig::new(130, 295, 0, 3);
        let recipes = collect_recipes(&inv, &cfg);
        assert!(recipes.iter().any(|r| r.takes == vec![(0, 9), (1, 6)]));
        assert!(recipes.iter().any(|r| r.takes == vec![(1, 5), (1, 5)]));
        assert!(recipes.iter().all(|r| r.takes.len() > 1));
    }
}
