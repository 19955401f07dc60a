//! Process-wide initialisation of the detection library.
//!
//! Must run once before any [`PlatePipeline`](crate::pipeline::plate_pipeline::PlatePipeline)
//! is built. Re-initialisation is a cheap no-op.

use std::sync::atomic::{AtomicBool, Ordering};

static INITIALIZED: AtomicBool = AtomicBool::new(false);

/// Initialises the library. Returns `true` only for the call that did the work.
pub fn init() -> bool {
    if INITIALIZED.swap(true, Ordering::AcqRel) {
        return false;
    }
    log::debug!(
        "plate-detect-core {} initialised",
        env!("CARGO_PKG_VERSION")
    );
    true
}

pub fn is_initialized() -> bool {
    INITIALIZED.load(Ordering::Acquire)
}
