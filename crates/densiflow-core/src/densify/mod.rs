//! Densification engine: scatter, accumulation orchestration and
//! normalization.
//!
//! A pass zeroes a [`FlowAccumulator`](crate::accumulator::FlowAccumulator),
//! scatters every valid patch into it concurrently, waits for all scatter
//! units to join and then normalizes every pixel once.

mod normalize;
mod orchestrator;
mod scatter;
mod types;

pub use normalize::{normalize, normalize_in_place, normalize_with};
pub use orchestrator::{accumulate_patches, accumulate_patches_with, densify, densify_with};
pub use scatter::{patch_weight, scatter_patch};
pub use types::{CancelFlag, NoOpReporter, PassStage, ProgressReporter};
