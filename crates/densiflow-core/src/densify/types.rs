use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::error::{FlowError, Result};

/// Phase of a densification pass, used for progress reporting.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PassStage {
    Validating,
    Scattering,
    Normalizing,
}

impl std::fmt::Display for PassStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validating => write!(f, "Validating patches"),
            Self::Scattering => write!(f, "Scattering patch votes"),
            Self::Normalizing => write!(f, "Normalizing flow"),
        }
    }
}

/// Thread-safe progress reporting for a densification pass.
///
/// Methods are called from Rayon workers, so implementors must be
/// `Send + Sync`. All methods default to no-ops.
pub trait ProgressReporter: Send + Sync {
    /// A new stage has started. `total_items` is the number of work items
    /// (patches or pixels) in this stage, if known.
    fn begin_stage(&self, _stage: PassStage, _total_items: Option<usize>) {}

    /// `items_done` work items of the current stage have completed.
    fn advance(&self, _items_done: usize) {}

    /// The current stage is finished.
    fn finish_stage(&self) {}
}

/// Reporter that ignores every event.
pub struct NoOpReporter;
impl ProgressReporter for NoOpReporter {}

/// Shared flag used to abort a pass from another thread.
///
/// Clones observe the same flag.
#[derive(Clone, Debug, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }

    /// `Err(Cancelled)` once [`CancelFlag::cancel`] has been called.
    pub fn check(&self) -> Result<()> {
        if self.is_cancelled() {
            Err(FlowError::Cancelled)
        } else {
            Ok(())
        }
    }
}
