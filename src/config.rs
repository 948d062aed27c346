use serde::{Deserialize, Serialize};

use crate::error::EngineError;
use crate::types::WidthWindow;

/// Which selection strategy commits the groups.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Strategy {
    /// Multi-phase greedy assembler.
    #[default]
    Greedy,
    /// Recipe search over remaining-quantity states. Only for small inventories.
    Dp,
}

/// Safety caps. None of them affect correctness, only how much work a run
/// is allowed to do.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Limits {
    /// Partners the width-fill phase may chain onto one anchor.
    pub max_fill_partners: usize,
    /// Copies of one piece the repetition phase may place side by side.
    pub max_repeats: usize,
    /// Partner sets generated per anchor, level and repetition mode.
    pub max_sets_per_level: usize,
    /// Relaxation rounds of the DP optimizer.
    pub dp_max_iterations: usize,
    /// Inventories with more pieces than this fall back to greedy.
    pub dp_max_pieces: usize,
    /// Distinct states the DP optimizer may remember.
    pub dp_max_states: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_fill_partners: 10,
            max_repeats: 10,
            max_sets_per_level: 50_000,
            dp_max_iterations: 1000,
            dp_max_pieces: 12,
            dp_max_states: 200_000,
        }
    }
}

/// Raises the partner level when `min_width` falls inside a machine band.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartnerLevelOverride {
    pub min_width_from: u32,
    pub min_width_to: u32,
    pub max_partner: usize,
}

/// Empirically tuned bands for the two wide machines.
pub const DEFAULT_PARTNER_OVERRIDES: [PartnerLevelOverride; 2] = [
    PartnerLevelOverride {
        min_width_from: 390,
        min_width_to: 410,
        max_partner: 6,
    },
    PartnerLevelOverride {
        min_width_from: 490,
        min_width_to: 510,
        max_partner: 8,
    },
];

fn default_overrides() -> Vec<PartnerLevelOverride> {
    DEFAULT_PARTNER_OVERRIDES.to_vec()
}

fn default_max_partner() -> usize {
    3
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    pub min_width: u32,
    pub max_width: u32,
    /// Largest allowed difference between two items' `length x qty`.
    #[serde(default)]
    pub tolerance: u64,
    #[serde(default = "default_max_partner")]
    pub max_partner: usize,
    #[serde(default)]
    pub strategy: Strategy,
    #[serde(default)]
    pub limits: Limits,
    #[serde(default = "default_overrides")]
    pub partner_overrides: Vec<PartnerLevelOverride>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            min_width: 0,
            max_width: 0,
            tolerance: 0,
            max_partner: default_max_partner(),
            strategy: Strategy::default(),
            limits: Limits::default(),
            partner_overrides: default_overrides(),
        }
    }
}

impl EngineConfig {
    pub fn new(min_width: u32, max_width: u32, tolerance: u64, max_partner: usize) -> Self {
        Self {
            min_width,
            max_width,
            tolerance,
            max_partner,
            ..Self::default()
        }
    }

    pub fn with_strategy(mut self, strategy: Strategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn with_limits(mut self, limits: Limits) -> Self {
        self.limits = limits;
        self
    }

    pub fn window(&self) -> WidthWindow {
        WidthWindow::new(self.min_width, self.max_width)
    }

    /// Partner level after applying every override whose band contains
    /// `min_width`.
    pub fn effective_max_partner(&self) -> usize {
        self.partner_overrides
            .iter()
            .filter(|o| (o.min_width_from..=o.min_width_to).contains(&self.min_width))
            .map(|o| o.max_partner)
            .fold(self.max_partner, usize::max)
    }

    /// Checked by front ends before a run; the engine trusts its config.
    pub fn validate(&self) -> Result<(), EngineError> {
        if self.min_width == 0 || self.max_width == 0 {
            return Err(EngineError::InvalidConfiguration(
                "width bounds must be positive".to_string(),
            ));
        }
        if self.min_width >= self.max_width {
            return Err(EngineError::InvalidConfiguration(format!(
                "min_width {} must be smaller than max_width {}",
                self.min_width, self.max_width
            )));
        }
        if self.max_partner == 0 {
            return Err(EngineError::InvalidConfiguration(
                "max_partner must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
