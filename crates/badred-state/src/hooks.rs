//! Hook registry: `HookKind -> ordered list of { callback_handle, scope }`.
//! Registration order is preserved so dispatch can fire callbacks FIFO per
//! kind, matching the scheduler's dispatch-order guarantee.

use std::collections::HashMap;

use badred_bridge::{CallbackHandle, HookKind};
use badred_ids::PaneId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HookEntry {
    pub callback: CallbackHandle,
    pub scope: Option<PaneId>,
}

#[derive(Debug, Default)]
pub struct HookRegistry {
    entries: HashMap<HookKind, Vec<HookEntry>>,
}

impl HookRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, kind: HookKind, callback: CallbackHandle, scope: Option<PaneId>) {
        self.entries
            .entry(kind)
            .or_default()
            .push(HookEntry { callback, scope });
    }

    /// Callbacks registered for `kind`, in FIFO order, filtered to those
    /// with no scope or a scope matching `scope` when one is given.
    pub fn matching(&self, kind: HookKind, scope: Option<PaneId>) -> Vec<HookEntry> {
        self.entries
            .get(&kind)
            .map(|entries| {
                entries
                    .iter()
                    .copied()
                    .filter(|entry| match entry.scope {
                        None => true,
                        Some(bound) => Some(bound) == scope,
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Drop every entry scoped to `scope` — called when the scoped pane
    /// closes, since a `pane_closed` callback fires exactly once.
    pub fn clear_scope(&mut self, scope: PaneId) {
        for entries in self.entries.values_mut() {
            entries.retain(|entry| entry.scope != Some(scope));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matching_preserves_registration_order() {
        let mut reg = HookRegistry::new();
        reg.register(HookKind::KeyEvent, CallbackHandle(1), None);
        reg.register(HookKind::KeyEvent, CallbackHandle(2), None);
        let hits = reg.matching(HookKind::KeyEvent, None);
        assert_eq!(hits[0].callback, CallbackHandle(1));
        assert_eq!(hits[1].callback, CallbackHandle(2));
    }

    #[test]
    fn scoped_hook_only_matches_its_pane() {
        let mut reg = HookRegistry::new();
        let p1 = PaneId::new(1);
        let p2 = PaneId::new(2);
        reg.register(HookKind::PaneClosed, CallbackHandle(1), Some(p1));
        assert_eq!(reg.matching(HookKind::PaneClosed, Some(p1)).len(), 1);
        assert_eq!(reg.matching(HookKind::PaneClosed, Some(p2)).len(), 0);
    }

    #[test]
    fn clear_scope_removes_only_that_scope() {
        let mut reg = HookRegistry::new();
        let p1 = PaneId::new(1);
        reg.register(HookKind::PaneClosed, CallbackHandle(1), Some(p1));
        reg.register(HookKind::PaneClosed, CallbackHandle(2), None);
        reg.clear_scope(p1);
        assert_eq!(reg.matching(HookKind::PaneClosed, None).len(), 1);
    }
}
