//! Groups rectangular stock pieces side by side so that each group's summed
//! width falls in a window and every member's `length x qty` agrees within a
//! tolerance, using up as much stock as possible.

pub mod assembler;
pub mod candidate;
pub mod config;
pub mod error;
pub mod inventory;
pub mod logging;
pub mod observer;
pub mod optimizer;
pub mod partners;
pub mod ratio;
pub mod render;
pub mod solver;
pub mod types;

pub use config::{EngineConfig, Limits, Strategy};
pub use error::EngineError;
pub use observer::{GroupObserver, Phase};
pub use solver::{Solver, form_groups};
pub use types::{Group, GroupRow, Piece, Solution, UsedItem, WidthWindow};
