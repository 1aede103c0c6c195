use ironfront_protocol::TechTreeEvent;

use crate::techtree::PendingChanges;

/// Receiver for tech tree transitions.
///
/// Sinks are called while the tree is mid-pass and cannot reach back into
/// it. Register/unregister requests raised in response are queued on
/// `pending` and applied by [`crate::techtree::TechTree::apply_deferred`]
/// once the pass is over.
pub trait TechTreeSink {
    fn emit(&mut self, event: TechTreeEvent, pending: &mut PendingChanges);
}

#[derive(Debug, Default)]
pub struct NullSink;

impl TechTreeSink for NullSink {
    fn emit(&mut self, _event: TechTreeEvent, _pending: &mut PendingChanges) {}
}

#[derive(Debug, Default)]
pub struct VecSink {
    pub events: Vec<TechTreeEvent>,
}

impl VecSink {
    pub fn drain(&mut self) -> Vec<TechTreeEvent> {
        std::mem::take(&mut self.events)
    }
}

impl TechTreeSink for VecSink {
    fn emit(&mut self, event: TechTreeEvent, _pending: &mut PendingChanges) {
        self.events.push(event);
    }
}
