use std::collections::BTreeSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tracing::{debug, info, instrument, warn};

use crate::assembler::Assembler;
use crate::config::{EngineConfig, Strategy};
use crate::error::EngineError;
use crate::inventory::Inventory;
use crate::observer::{GroupObserver, Phase, TracingObserver};
use crate::optimizer;
use crate::types::{Group, Piece, Solution};

/// Entry point of the engine. Owns the input; every run works on its own
/// copy of the inventory.
pub struct Solver {
    config: EngineConfig,
    pieces: Vec<Piece>,
    cancelled: Arc<AtomicBool>,
}

impl Solver {
    pub fn new(config: EngineConfig, pieces: Vec<Piece>) -> Self {
        Self {
            config,
            pieces,
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Shares an existing cancellation flag with the caller.
    pub fn with_cancellation(mut self, cancelled: Arc<AtomicBool>) -> Self {
        self.cancelled = cancelled;
        self
    }

    /// Setting the returned flag stops a running solve at the next anchor
    /// or partner level; the groups committed so far are kept.
    pub fn cancel_handle(&self) -> Arc<AtomicBool> {
        self.cancelled.clone()
    }

    pub fn solve(&self) -> Solution {
        self.solve_with(&mut TracingObserver)
    }

    #[instrument(skip_all, fields(
        pieces = self.pieces.len(),
        strategy = ?self.config.strategy,
        window = %self.config.window(),
        tolerance = self.config.tolerance,
    ))]
    pub fn solve_with(&self, observer: &mut dyn GroupObserver) -> Solution {
        let inventory = Inventory::new(self.pieces.clone());
        let total_qty = inventory.total_qty();

        if self.is_cancelled() {
            info!("cancelled before start");
            return Solution {
                groups: Vec::new(),
                residual: inventory.residual(),
                total_qty,
                cancelled: true,
            };
        }

        let use_dp = match self.config.strategy {
            Strategy::Greedy => false,
            Strategy::Dp if inventory.len() > self.config.limits.dp_max_pieces => {
                warn!(
                    pieces = inventory.len(),
                    limit = self.config.limits.dp_max_pieces,
                    "too many pieces for the dp optimizer, using greedy"
                );
                false
            }
            Strategy::Dp => true,
        };

        let mut asm = Assembler::new(inventory, &self.config, observer);
        let cancelled = if use_dp {
            self.run_dp(&mut asm)
        } else {
            self.run_greedy(&mut asm)
        };
        if !cancelled {
            asm.merge();
        }

        let (groups, inventory) = asm.into_parts();
        let residual = inventory.residual();
        info!(
            groups = groups.len(),
            residual = residual.len(),
            cancelled,
            "run finished"
        );
        Solution {
            groups,
            residual,
            total_qty,
            cancelled,
        }
    }

    fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }

    /// Runs each greedy phase over the anchors, largest first. The anchor
    /// order is rebuilt after every commit since quantities moved. Returns
    /// true when cancelled.
    fn run_greedy(&self, asm: &mut Assembler<'_>) -> bool {
        let inv = asm.inventory();
        let parked: BTreeSet<usize> = (0..inv.len())
            .filter(|&i| inv.remaining(i) > 0 && asm.is_parked(i))
            .collect();
        for &i in &parked {
            let p = asm.inventory().piece(i);
            debug!(piece_id = p.id, width = p.width, "parked: wider than max_width");
        }
        let max_partner = self.config.effective_max_partner();

        for phase in Phase::GREEDY {
            let mut exhausted = parked.clone();
            loop {
                if self.is_cancelled() {
                    info!(%phase, "cancelled");
                    return true;
                }
                let inv = asm.inventory();
                let next = inv
                    .order_by_size()
                    .into_iter()
                    .find(|&i| inv.remaining(i) > 0 && !exhausted.contains(&i));
                let Some(anchor) = next else {
                    break;
                };

                let attempt = match phase {
                    Phase::Partner => self.escalate(asm, anchor, max_partner),
                    Phase::WidthFill => asm.width_fill(anchor),
                    Phase::Repetition => asm.repeat(anchor),
                    Phase::Fallback => asm.single(anchor),
                    Phase::Optimize | Phase::Merge => Ok(false),
                };
                let committed = attempt.unwrap_or_else(|e| {
                    self.skip_candidate(asm, anchor, &e);
                    false
                });
                if !committed {
                    exhausted.insert(anchor);
                }
            }
            asm.finish_phase(phase);
        }
        false
    }

    /// Tries partner levels `1..=max_partner` and commits the best candidate
    /// of the first level that has one.
    fn escalate(
        &self,
        asm: &mut Assembler<'_>,
        anchor: usize,
        max_partner: usize,
    ) -> Result<bool, EngineError> {
        for level in 1..=max_partner {
            if self.is_cancelled() {
                return Ok(false);
            }
            let Some(candidate) = asm.best_partner_candidate(anchor, level) else {
                continue;
            };
            match asm.commit(Phase::Partner, &candidate.takes, true) {
                Ok(true) => return Ok(true),
                Ok(false) => {}
                Err(e) => self.skip_candidate(asm, anchor, &e),
            }
        }
        Ok(false)
    }

    fn run_dp(&self, asm: &mut Assembler<'_>) -> bool {
        let recipes = optimizer::collect_recipes(asm.inventory(), &self.config);
        let initial = asm.inventory().snapshot();
        let plan = optimizer::optimize(&initial, &recipes, &self.config.limits, &|| {
            self.is_cancelled()
        });
        info!(
            recipes = recipes.len(),
            rounds = plan.rounds,
            states = plan.states,
            consumed = plan.consumed,
            complete = plan.complete,
            "dp search finished"
        );
        if plan.cancelled {
            return true;
        }

        for &ri in &plan.applications {
            if let Err(e) = asm.commit(Phase::Optimize, &recipes[ri].takes, false) {
                let anchor = recipes[ri].takes[0].0;
                self.skip_candidate(asm, anchor, &e);
            }
        }
        asm.finish_phase(Phase::Optimize);

        // single pieces only for what no recipe could place
        for anchor in asm.inventory().order_by_size() {
            if self.is_cancelled() {
                info!(phase = %Phase::Fallback, "cancelled");
                return true;
            }
            if asm.inventory().remaining(anchor) == 0 {
                continue;
            }
            if let Err(e) = asm.single(anchor) {
                self.skip_candidate(asm, anchor, &e);
            }
        }
        asm.finish_phase(Phase::Fallback);
        false
    }

    fn skip_candidate(&self, asm: &Assembler<'_>, anchor: usize, error: &EngineError) {
        warn!(
            anchor = asm.inventory().piece(anchor).id,
            %error,
            "skipping candidate"
        );
    }
}

/// One-shot helper: greedy run with default limits.
pub fn form_groups(
    pieces: Vec<Piece>,
    min_width: u32,
    max_width: u32,
    tolerance: u64,
    max_partner: usize,
) -> (Vec<Group>, Vec<Piece>) {
    let config = EngineConfig::new(min_width, max_width, tolerance, max_partner);
    let solution = Solver::new(config, pieces).solve();
    (solution.groups, solution.residual)
}
