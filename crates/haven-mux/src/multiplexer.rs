use serde::Serialize;

use crate::panes::{after_close, backfill, PaneAssignment, PaneSlot};
use crate::TabId;

/// Width and height of one character cell, in pixels.
pub const CELL_WIDTH_PX: u32 = 9;
pub const CELL_HEIGHT_PX: u32 = 18;

/// Smallest geometry sent for a pane; matches the session registry's clamp.
pub const MIN_COLS: u16 = 20;
pub const MIN_ROWS: u16 = 5;

/// Label given to the tab created for a freshly split view.
pub const SPLIT_TAB_LABEL: &str = "AUX";

/// Errors surfaced to the user from multiplexer operations.
#[derive(Debug, thiserror::Error)]
pub enum MuxError {
    #[error("could not open a terminal: {0}")]
    Spawn(String),
}

/// A session the backend just started.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendSession {
    pub id: TabId,
    pub shell: String,
}

/// The session operations the multiplexer needs.
///
/// In the console this is the boundary client; tests use an in-memory fake.
pub trait SessionBackend {
    type Error: std::fmt::Display;

    fn create_session(&mut self) -> Result<BackendSession, Self::Error>;
    fn close_session(&mut self, id: TabId);
    fn resize_session(&mut self, id: TabId, cols: u16, rows: u16);
}

/// A display-facing handle bound to one session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Tab {
    pub id: TabId,
    pub label: String,
    pub shell: String,
}

/// Snapshot of the multiplexer for the display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Layout {
    pub tabs: Vec<Tab>,
    pub active_tab: Option<TabId>,
    pub split: bool,
    pub pane_a: Option<TabId>,
    pub pane_b: Option<TabId>,
}

/// Convert a pane's pixel size to a terminal geometry.
///
/// Returns `None` for a pane with no visible area.
pub fn pane_geometry(width_px: u32, height_px: u32) -> Option<(u16, u16)> {
    if width_px == 0 || height_px == 0 {
        return None;
    }
    let cols = u16::try_from(width_px / CELL_WIDTH_PX).unwrap_or(u16::MAX);
    let rows = u16::try_from(height_px / CELL_HEIGHT_PX).unwrap_or(u16::MAX);
    Some((cols.max(MIN_COLS), rows.max(MIN_ROWS)))
}

/// Open tabs, the active tab, split mode, and which tab each pane shows.
///
/// Driven by one user's UI actions, so it is a plain single-owner state
/// machine. After every operation returns: pane A is set whenever tabs
/// exist, and pane B is set whenever split is on and tabs exist.
pub struct Multiplexer<B: SessionBackend> {
    backend: B,
    tabs: Vec<Tab>,
    active_tab: Option<TabId>,
    split: bool,
    panes: PaneAssignment,
}

impl<B: SessionBackend> Multiplexer<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            tabs: Vec::new(),
            active_tab: None,
            split: false,
            panes: PaneAssignment::default(),
        }
    }

    /// Open a new session in a new tab and make it active.
    ///
    /// The tab lands in pane A if A is empty, and in pane B if split is on
    /// and B is empty. On failure nothing changes.
    pub fn create_tab(&mut self, label: Option<&str>) -> Result<&Tab, MuxError> {
        let created = self
            .backend
            .create_session()
            .map_err(|e| MuxError::Spawn(e.to_string()))?;

        let id = created.id;
        let label = label.map_or_else(|| format!("TAB-{id}"), str::to_string);
        log::debug!("tab {id} ({label}) opened on {}", created.shell);

        self.tabs.push(Tab {
            id,
            label,
            shell: created.shell,
        });
        self.active_tab = Some(id);

        if self.panes.a.is_none() {
            self.panes.a = Some(id);
        }
        if self.split && self.panes.b.is_none() {
            self.panes.b = Some(id);
        }

        Ok(&self.tabs[self.tabs.len() - 1])
    }

    /// Make `id` active and show it in pane A. Unknown ids are ignored.
    pub fn select_tab(&mut self, id: TabId) -> bool {
        if !self.has_tab(id) {
            return false;
        }

        self.active_tab = Some(id);
        self.panes.a = Some(id);
        if self.split && self.panes.b.is_none() {
            self.panes.b = backfill(&self.tab_ids(), Some(id));
        }
        true
    }

    /// Turn split mode on or off.
    ///
    /// Turning it off keeps pane B's binding so turning it back on shows
    /// the same tab again. Turning it on with B empty fills B with the first
    /// tab other than A's, or with A's own tab when it is the only one.
    pub fn set_split(&mut self, enabled: bool) {
        self.split = enabled;
        if enabled && self.panes.b.is_none() {
            self.panes.b = backfill(&self.tab_ids(), self.panes.a);
        }
    }

    /// Give a split view with an empty pane B its own session.
    ///
    /// If that session cannot be started, pane B shows pane A's tab so the
    /// split view never points at nothing, and the error is returned.
    pub fn ensure_split_tab(&mut self) -> Result<(), MuxError> {
        if !self.split || self.panes.b.is_some() {
            return Ok(());
        }

        match self.create_tab(Some(SPLIT_TAB_LABEL)) {
            Ok(tab) => {
                let id = tab.id;
                self.panes.b = Some(id);
                Ok(())
            }
            Err(e) => {
                self.panes.b = backfill(&self.tab_ids(), self.panes.a);
                Err(e)
            }
        }
    }

    /// The split button.
    ///
    /// Splitting reuses a hidden pane B binding or another open tab when
    /// there is one, and otherwise opens an `AUX` tab for pane B.
    pub fn toggle_split(&mut self) -> Result<(), MuxError> {
        if self.split {
            self.set_split(false);
            return Ok(());
        }

        self.split = true;
        if self.panes.b.is_none() {
            let a = self.panes.a;
            self.panes.b = self.tabs.iter().map(|t| t.id).find(|&id| Some(id) != a);
        }
        self.ensure_split_tab()
    }

    /// Close the tab's session and remove the tab, refilling any pane it
    /// occupied. Unknown ids are ignored.
    pub fn close_tab(&mut self, id: TabId) -> bool {
        let Some(index) = self.tabs.iter().position(|t| t.id == id) else {
            return false;
        };

        self.backend.close_session(id);
        self.tabs.remove(index);
        self.panes = after_close(&self.tab_ids(), self.panes, id, self.split);

        if self.active_tab == Some(id) {
            self.active_tab = self.panes.a;
        }
        log::debug!("tab {id} closed, {} remaining", self.tabs.len());
        true
    }

    /// Close every tab's session; used when the window goes away.
    pub fn close_all(&mut self) {
        for tab in self.tabs.drain(..) {
            self.backend.close_session(tab.id);
        }
        self.active_tab = None;
        self.panes.clear();
    }

    /// Fit the session shown in `slot` to the pane's pixel size.
    ///
    /// Ignored for empty or zero-sized panes, and for pane B while split is
    /// off. Returns the geometry that was sent.
    pub fn resize_pane(&mut self, slot: PaneSlot, width_px: u32, height_px: u32) -> Option<(u16, u16)> {
        if slot == PaneSlot::B && !self.split {
            return None;
        }
        let id = self.panes.get(slot)?;
        let (cols, rows) = pane_geometry(width_px, height_px)?;
        self.backend.resize_session(id, cols, rows);
        Some((cols, rows))
    }

    /// Visible panes that render `session_id`'s output.
    pub fn panes_for(&self, session_id: TabId) -> Vec<PaneSlot> {
        self.panes.slots_of(session_id, self.split)
    }

    pub fn layout(&self) -> Layout {
        Layout {
            tabs: self.tabs.clone(),
            active_tab: self.active_tab,
            split: self.split,
            pane_a: self.panes.a,
            pane_b: self.panes.b,
        }
    }

    pub fn tabs(&self) -> &[Tab] {
        &self.tabs
    }

    pub fn active_tab(&self) -> Option<TabId> {
        self.active_tab
    }

    pub fn is_split(&self) -> bool {
        self.split
    }

    pub fn panes(&self) -> PaneAssignment {
        self.panes
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    fn has_tab(&self, id: TabId) -> bool {
        self.tabs.iter().any(|t| t.id == id)
    }

    fn tab_ids(&self) -> Vec<TabId> {
        self.tabs.iter().map(|t| t.id).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// In-memory backend that records every call.
    #[derive(Default)]
    struct FakeBackend {
        next_id: TabId,
        fail_next: bool,
        created: Vec<TabId>,
        closed: Vec<TabId>,
        resized: Vec<(TabId, u16, u16)>,
    }

    impl SessionBackend for FakeBackend {
        type Error = String;

        fn create_session(&mut self) -> Result<BackendSession, String> {
            if std::mem::take(&mut self.fail_next) {
                return Err("permission denied".to_string());
            }
            self.next_id += 1;
            self.created.push(self.next_id);
            Ok(BackendSession {
                id: self.next_id,
                shell: "/bin/sh".to_string(),
            })
        }

        fn close_session(&mut self, id: TabId) {
            self.closed.push(id);
        }

        fn resize_session(&mut self, id: TabId, cols: u16, rows: u16) {
            self.resized.push((id, cols, rows));
        }
    }

    fn mux() -> Multiplexer<FakeBackend> {
        Multiplexer::new(FakeBackend::default())
    }

    fn assert_invariants(m: &Multiplexer<FakeBackend>) {
        if !m.tabs().is_empty() {
            assert!(m.panes().a.is_some(), "pane A empty with tabs open");
            if m.is_split() {
                assert!(m.panes().b.is_some(), "pane B empty in split view");
            }
        }
        for slot in [m.panes().a, m.panes().b].into_iter().flatten() {
            assert!(m.tabs().iter().any(|t| t.id == slot), "pane points at closed tab {slot}");
        }
    }

    #[test]
    fn test_first_tab_fills_pane_a() {
        let mut m = mux();
        let tab = m.create_tab(None).unwrap().clone();

        assert_eq!(tab.id, 1);
        assert_eq!(tab.label, "TAB-1");
        assert_eq!(tab.shell, "/bin/sh");
        assert_eq!(m.panes(), PaneAssignment { a: Some(1), b: None });
        assert_eq!(m.active_tab(), Some(1));
        assert!(!m.is_split());
        assert_invariants(&m);
    }

    #[test]
    fn test_custom_label() {
        let mut m = mux();
        assert_eq!(m.create_tab(Some("MAIN")).unwrap().label, "MAIN");
    }

    #[test]
    fn test_new_tabs_become_active_but_keep_pane_a() {
        let mut m = mux();
        m.create_tab(None).unwrap();
        m.create_tab(None).unwrap();

        assert_eq!(m.active_tab(), Some(2));
        assert_eq!(m.panes().a, Some(1));
        assert_invariants(&m);
    }

    #[test]
    fn test_first_tab_in_split_mode_backs_both_panes() {
        let mut m = mux();
        m.set_split(true);
        m.create_tab(None).unwrap();

        assert_eq!(m.panes(), PaneAssignment { a: Some(1), b: Some(1) });
        assert_eq!(m.panes_for(1), vec![PaneSlot::A, PaneSlot::B]);
        assert_invariants(&m);
    }

    #[test]
    fn test_split_then_close_first_tab() {
        let mut m = mux();
        m.create_tab(None).unwrap();
        assert_eq!(m.panes(), PaneAssignment { a: Some(1), b: None });

        m.toggle_split().unwrap();
        assert!(m.is_split());
        assert_eq!(m.backend().created, vec![1, 2]);
        assert_eq!(m.tabs()[1].label, SPLIT_TAB_LABEL);
        assert_eq!(m.panes(), PaneAssignment { a: Some(1), b: Some(2) });
        assert_invariants(&m);

        assert!(m.close_tab(1));
        assert_eq!(m.backend().closed, vec![1]);
        assert_eq!(m.panes(), PaneAssignment { a: Some(2), b: Some(2) });
        assert_eq!(m.tabs().iter().map(|t| t.id).collect::<Vec<_>>(), vec![2]);
        assert_invariants(&m);
    }

    #[test]
    fn test_split_reuses_existing_tabs() {
        let mut m = mux();
        m.create_tab(None).unwrap();
        m.create_tab(None).unwrap();
        assert!(m.select_tab(1));

        m.toggle_split().unwrap();
        assert_eq!(m.panes(), PaneAssignment { a: Some(1), b: Some(2) });

        m.toggle_split().unwrap();
        assert!(!m.is_split());
        m.toggle_split().unwrap();
        assert!(m.is_split());

        assert_eq!(m.panes(), PaneAssignment { a: Some(1), b: Some(2) });
        assert_eq!(m.backend().created, vec![1, 2]);
        assert_invariants(&m);
    }

    #[test]
    fn test_select_tab_backfills_pane_b() {
        let mut m = mux();
        m.create_tab(None).unwrap();
        m.create_tab(None).unwrap();
        m.create_tab(None).unwrap();
        m.set_split(true);
        // Pane B was filled with the first tab other than A.
        assert_eq!(m.panes(), PaneAssignment { a: Some(1), b: Some(2) });

        m.close_tab(2);
        assert_eq!(m.panes().b, Some(3));

        assert!(m.select_tab(3));
        assert_eq!(m.active_tab(), Some(3));
        assert_eq!(m.panes(), PaneAssignment { a: Some(3), b: Some(3) });
        assert_invariants(&m);
    }

    #[test]
    fn test_select_unknown_tab_is_ignored() {
        let mut m = mux();
        m.create_tab(None).unwrap();
        assert!(!m.select_tab(42));
        assert_eq!(m.active_tab(), Some(1));
        assert_eq!(m.panes().a, Some(1));
    }

    #[test]
    fn test_failed_create_leaves_state_unchanged() {
        let mut m = mux();
        m.create_tab(None).unwrap();
        let before = m.layout();

        m.backend.fail_next = true;
        let err = m.create_tab(None).unwrap_err();
        assert!(err.to_string().contains("permission denied"));
        assert_eq!(m.layout(), before);
    }

    #[test]
    fn test_failed_split_tab_falls_back_to_pane_a() {
        let mut m = mux();
        m.create_tab(None).unwrap();
        m.backend.fail_next = true;

        assert!(m.toggle_split().is_err());
        assert!(m.is_split());
        assert_eq!(m.panes(), PaneAssignment { a: Some(1), b: Some(1) });
        assert_eq!(m.tabs().len(), 1);
        assert_invariants(&m);
    }

    #[test]
    fn test_set_split_with_one_tab_shows_it_in_both_panes() {
        let mut m = mux();
        m.create_tab(None).unwrap();

        m.set_split(true);
        assert_eq!(m.panes(), PaneAssignment { a: Some(1), b: Some(1) });
        assert_eq!(m.tabs().len(), 1);
        assert_invariants(&m);

        // Pane B is already bound, so nothing new is opened.
        m.ensure_split_tab().unwrap();
        assert_eq!(m.tabs().len(), 1);
    }

    #[test]
    fn test_ensure_split_tab_fills_empty_pane_b() {
        let mut m = mux();
        m.ensure_split_tab().unwrap();
        assert!(m.tabs().is_empty());

        m.set_split(true);
        assert_eq!(m.panes(), PaneAssignment::default());
        m.ensure_split_tab().unwrap();
        m.ensure_split_tab().unwrap();
        assert_eq!(m.tabs().len(), 1);
        assert_eq!(m.tabs()[0].label, SPLIT_TAB_LABEL);
        assert_eq!(m.panes(), PaneAssignment { a: Some(1), b: Some(1) });
        assert_invariants(&m);
    }

    #[test]
    fn test_close_last_tab_clears_panes() {
        let mut m = mux();
        m.create_tab(None).unwrap();
        m.toggle_split().unwrap();

        m.close_tab(1);
        m.close_tab(2);
        assert!(m.tabs().is_empty());
        assert_eq!(m.panes(), PaneAssignment::default());
        assert_eq!(m.active_tab(), None);
        assert!(!m.close_tab(2));
        assert_eq!(m.backend().closed, vec![1, 2]);
    }

    #[test]
    fn test_close_active_tab_moves_focus_to_pane_a() {
        let mut m = mux();
        m.create_tab(None).unwrap();
        m.create_tab(None).unwrap();
        m.close_tab(2);
        assert_eq!(m.active_tab(), Some(1));
    }

    #[test]
    fn test_close_all_closes_every_session() {
        let mut m = mux();
        for _ in 0..3 {
            m.create_tab(None).unwrap();
        }
        m.close_all();
        assert_eq!(m.backend().closed, vec![1, 2, 3]);
        assert!(m.tabs().is_empty());
        assert_eq!(m.panes(), PaneAssignment::default());
    }

    #[test]
    fn test_resize_pane_converts_pixels_and_clamps() {
        let mut m = mux();
        m.create_tab(None).unwrap();

        assert_eq!(m.resize_pane(PaneSlot::A, 900, 540), Some((100, 30)));
        assert_eq!(m.resize_pane(PaneSlot::A, 50, 20), Some((20, 5)));
        assert_eq!(m.resize_pane(PaneSlot::A, 0, 540), None);
        assert_eq!(m.backend().resized, vec![(1, 100, 30), (1, 20, 5)]);
    }

    #[test]
    fn test_resize_pane_b_only_in_split_view() {
        let mut m = mux();
        m.create_tab(None).unwrap();
        m.create_tab(None).unwrap();
        assert_eq!(m.resize_pane(PaneSlot::B, 900, 540), None);

        m.set_split(true);
        assert_eq!(m.resize_pane(PaneSlot::B, 450, 540), Some((50, 30)));
        assert_eq!(m.backend().resized, vec![(2, 50, 30)]);
    }

    #[test]
    fn test_resize_empty_pane_is_ignored() {
        let mut m = mux();
        assert_eq!(m.resize_pane(PaneSlot::A, 900, 540), None);
        assert!(m.backend().resized.is_empty());
    }

    #[test]
    fn test_hidden_pane_b_does_not_receive_output() {
        let mut m = mux();
        m.create_tab(None).unwrap();
        m.create_tab(None).unwrap();
        m.set_split(true);
        assert_eq!(m.panes_for(2), vec![PaneSlot::B]);

        m.set_split(false);
        assert!(m.panes_for(2).is_empty());
        assert_eq!(m.panes().b, Some(2));
    }

    #[test]
    fn test_layout_serializes_camel_case() {
        let mut m = mux();
        m.create_tab(Some("MAIN")).unwrap();
        let json = serde_json::to_value(m.layout()).unwrap();

        assert_eq!(json["activeTab"], 1);
        assert_eq!(json["paneA"], 1);
        assert!(json["paneB"].is_null());
        assert_eq!(json["split"], false);
        assert_eq!(json["tabs"][0]["label"], "MAIN");
    }

    #[test]
    fn test_pane_geometry() {
        assert_eq!(pane_geometry(1080, 720), Some((120, 40)));
        assert_eq!(pane_geometry(8, 17), Some((MIN_COLS, MIN_ROWS)));
        assert_eq!(pane_geometry(100, 0), None);
        assert_eq!(pane_geometry(u32::MAX, u32::MAX), Some((u16::MAX, u16::MAX)));
    }
}
