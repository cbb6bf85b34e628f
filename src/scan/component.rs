//! Per-component mutable scan state shared by the encode and decode
//! drivers.

use crate::coding::context::ContextSet;
use crate::scan::config::ComponentParams;

/// Lines per MCU row group. Lossless coding is logically one-pixel
/// granular; grouping rows keeps the buffering uniform with the other
/// scan kinds.
pub(crate) const MCU_LINES: u32 = 8;

/// The adaptive state of one component: its context set and the two
/// differential buffers feeding context classification.
pub(crate) struct ComponentState {
    pub(crate) contexts: ContextSet,
    pub(crate) params: ComponentParams,
    /// Difference coded for the sample to the left, one slot per line of
    /// the current row group; each slot is reset at the start of its line.
    pub(crate) da: [i32; MCU_LINES as usize],
    /// Difference coded for the sample above, one slot per column.
    pub(crate) db: Vec<i32>,
}

impl ComponentState {
    pub(crate) fn new(params: ComponentParams, width: u32) -> Self {
        ComponentState {
            contexts: ContextSet::default(),
            params,
            da: [0; MCU_LINES as usize],
            db: vec![0; width as usize],
        }
    }

    /// Neutralize all adaptive state; scan start and restart boundaries.
    pub(crate) fn reset(&mut self) {
        self.contexts.reset();
        self.da = [0; MCU_LINES as usize];
        self.db.fill(0);
    }
}
