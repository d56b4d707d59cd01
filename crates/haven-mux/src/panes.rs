//! Two-slot pane assignment and the backfill rule.
//!
//! Everything here is a pure function of the tab list and the current slots,
//! so the rules can be checked without a display or a shell.

use serde::{Deserialize, Serialize};

use crate::TabId;

/// One of the two visible rendering slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaneSlot {
    A,
    B,
}

impl PaneSlot {
    pub fn other(self) -> Self {
        match self {
            PaneSlot::A => PaneSlot::B,
            PaneSlot::B => PaneSlot::A,
        }
    }
}

/// Which tab each slot shows. A tab may sit in both slots at once.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PaneAssignment {
    pub a: Option<TabId>,
    pub b: Option<TabId>,
}

impl PaneAssignment {
    pub fn get(&self, slot: PaneSlot) -> Option<TabId> {
        match slot {
            PaneSlot::A => self.a,
            PaneSlot::B => self.b,
        }
    }

    pub fn set(&mut self, slot: PaneSlot, tab: Option<TabId>) {
        match slot {
            PaneSlot::A => self.a = tab,
            PaneSlot::B => self.b = tab,
        }
    }

    pub fn clear(&mut self) {
        self.a = None;
        self.b = None;
    }

    /// Slots currently bound to `tab`, ignoring B unless `split` is on.
    pub fn slots_of(&self, tab: TabId, split: bool) -> Vec<PaneSlot> {
        let mut slots = Vec::with_capacity(2);
        if self.a == Some(tab) {
            slots.push(PaneSlot::A);
        }
        if split && self.b == Some(tab) {
            slots.push(PaneSlot::B);
        }
        slots
    }
}

/// Pick the tab for an empty slot.
///
/// Prefers the first tab in creation order that is not `other` (the tab in
/// the opposite slot). Falls back to `other` itself when it is the only tab,
/// and to `None` only when there are no tabs at all.
pub fn backfill(tabs: &[TabId], other: Option<TabId>) -> Option<TabId> {
    tabs.iter()
        .copied()
        .find(|&id| Some(id) != other)
        .or_else(|| tabs.first().copied())
}

/// Slots after `closed` was removed; `remaining` is the tab list without it.
///
/// Slots that showed the closed tab are refilled with [`backfill`]. Pane A is
/// refilled whenever tabs remain; pane B only while `split` is on.
pub fn after_close(
    remaining: &[TabId],
    panes: PaneAssignment,
    closed: TabId,
    split: bool,
) -> PaneAssignment {
    if remaining.is_empty() {
        return PaneAssignment::default();
    }

    let mut next = panes;
    if next.a == Some(closed) {
        next.a = None;
    }
    if next.b == Some(closed) {
        next.b = None;
    }

    if next.a.is_none() {
        next.a = backfill(remaining, next.b);
    }
    if split && next.b.is_none() {
        next.b = backfill(remaining, next.a);
    }
    next
}

#[cfg(test)]
mod tests {
    use super::*;

    fn panes(a: Option<TabId>, b: Option<TabId>) -> PaneAssignment {
        PaneAssignment { a, b }
    }

    #[test]
    fn test_backfill_prefers_first_other_tab() {
        assert_eq!(backfill(&[1, 2, 3], Some(1)), Some(2));
        assert_eq!(backfill(&[1, 2, 3], Some(2)), Some(1));
        assert_eq!(backfill(&[1, 2, 3], None), Some(1));
    }

    #[test]
    fn test_backfill_falls_back_to_same_tab() {
        assert_eq!(backfill(&[4], Some(4)), Some(4));
    }

    #[test]
    fn test_backfill_with_no_tabs() {
        assert_eq!(backfill(&[], None), None);
        assert_eq!(backfill(&[], Some(1)), None);
    }

    #[test]
    fn test_after_close_refills_pane_a_from_pane_b_when_alone() {
        // T1 in A, T2 in B, close T1: A falls back to T2.
        let next = after_close(&[2], panes(Some(1), Some(2)), 1, true);
        assert_eq!(next, panes(Some(2), Some(2)));
    }

    #[test]
    fn test_after_close_refills_both_slots_when_tab_was_in_both() {
        let next = after_close(&[1, 3], panes(Some(2), Some(2)), 2, true);
        assert_eq!(next, panes(Some(1), Some(3)));
    }

    #[test]
    fn test_after_close_leaves_unrelated_slots_alone() {
        let next = after_close(&[1, 2], panes(Some(1), Some(2)), 3, true);
        assert_eq!(next, panes(Some(1), Some(2)));
    }

    #[test]
    fn test_after_close_does_not_refill_b_without_split() {
        let next = after_close(&[1, 3], panes(Some(1), Some(2)), 2, false);
        assert_eq!(next, panes(Some(1), None));
    }

    #[test]
    fn test_after_close_last_tab_clears_everything() {
        let next = after_close(&[], panes(Some(1), Some(1)), 1, true);
        assert_eq!(next, PaneAssignment::default());
    }

    #[test]
    fn test_slots_of_respects_split() {
        let assignment = panes(Some(5), Some(5));
        assert_eq!(assignment.slots_of(5, true), vec![PaneSlot::A, PaneSlot::B]);
        assert_eq!(assignment.slots_of(5, false), vec![PaneSlot::A]);
        assert!(assignment.slots_of(6, true).is_empty());
    }

    #[test]
    fn test_slot_accessors() {
        let mut assignment = PaneAssignment::default();
        assignment.set(PaneSlot::B, Some(9));
        assert_eq!(assignment.get(PaneSlot::B), Some(9));
        assert_eq!(assignment.get(PaneSlot::B.other()), None);
        assignment.clear();
        assert_eq!(assignment, PaneAssignment::default());
    }
}
