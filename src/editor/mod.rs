//! The editor session: document, view, selection, gesture and undo tape in
//! one place.
//!
//! The editor never calls into UI code. Whatever changed is queued as
//! [`EditorEvent`]s for the host to drain once per frame.

mod input;
mod load;
mod ops;

use std::time::Instant;

use egui::{Pos2, Vec2};
use tracing::{debug, warn};

use crate::{
    config::EditorConfig,
    error::Result,
    geometry::View,
    hit_test::HitTester,
    history::History,
    interaction::{Hover, Interaction, Mode},
    model::{Flowchart, Node},
    selection::Selection,
};

pub use load::strip_file_extensions;
pub use ops::sanitize_name;

pub const DEFAULT_FLOWCHART_NAME: &str = "flowchart";
pub const RESTORED_LABEL: &str = "State Before Edit (Restored)";

/// Change notifications for the presentation layer.
#[derive(Debug, Clone, PartialEq)]
pub enum EditorEvent {
    SelectionChanged,
    GraphChanged,
    ViewChanged,
    HistoryChanged,
    ModeChanged(Mode),
    /// A one-line message for a status bar.
    Status(String),
}

#[derive(Debug, Clone)]
struct Clipboard {
    nodes: Vec<Node>,
    /// Centre of the copied node positions.
    center: Pos2,
}

pub struct Editor {
    config: EditorConfig,
    flowchart: Flowchart,
    view: View,
    viewport: Vec2,
    mode: Mode,
    selection: Selection,
    interaction: Interaction,
    hover: Hover,
    history: History,
    clipboard: Option<Clipboard>,
    space_held: bool,
    last_pointer: Option<Pos2>,
    toolbar_adds: u32,
    /// Copy of the document taken when edit mode was entered.
    edit_backup: Option<Flowchart>,
    events: Vec<EditorEvent>,
}

impl Default for Editor {
    fn default() -> Self {
        Self::new(EditorConfig::default())
    }
}

impl Editor {
    pub fn new(config: EditorConfig) -> Self {
        let flowchart = Flowchart::new(DEFAULT_FLOWCHART_NAME);
        let history = History::new(&config.history, &flowchart);
        Self {
            view: View::new(config.zoom.initial),
            viewport: Vec2::new(1280.0, 720.0),
            config,
            flowchart,
            mode: Mode::View,
            selection: Selection::None,
            interaction: Interaction::Idle,
            hover: Hover::default(),
            history,
            clipboard: None,
            space_held: false,
            last_pointer: None,
            toolbar_adds: 0,
            edit_backup: None,
            events: Vec::new(),
        }
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    pub fn flowchart(&self) -> &Flowchart {
        &self.flowchart
    }

    pub fn view(&self) -> View {
        self.view
    }

    pub fn viewport(&self) -> Vec2 {
        self.viewport
    }

    /// Size of the canvas in screen pixels, used to fit the view and to
    /// place toolbar-created nodes.
    pub fn set_viewport(&mut self, size: Vec2) {
        self.viewport = size;
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn is_editing(&self) -> bool {
        self.mode == Mode::Edit
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn interaction(&self) -> &Interaction {
        &self.interaction
    }

    pub fn hover(&self) -> &Hover {
        &self.hover
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn has_clipboard(&self) -> bool {
        self.clipboard.is_some()
    }

    pub fn hit_tester(&self) -> HitTester<'_> {
        HitTester::new(&self.flowchart, self.view, &self.config)
    }

    pub fn drain_events(&mut self) -> Vec<EditorEvent> {
        std::mem::take(&mut self.events)
    }

    fn emit(&mut self, event: EditorEvent) {
        if !self.events.contains(&event) {
            self.events.push(event);
        }
    }

    fn status(&mut self, message: impl Into<String>) {
        self.events.push(EditorEvent::Status(message.into()));
    }

    /// Applies `f` to the selection and reports it if anything changed.
    fn update_selection(&mut self, f: impl FnOnce(&mut Selection)) {
        let before = self.selection.clone();
        f(&mut self.selection);
        if self.selection != before {
            self.emit(EditorEvent::SelectionChanged);
        }
    }

    /// Records the current document as the result of `label`.
    fn record(&mut self, label: impl Into<String>) {
        if self.history.execute(label, &self.flowchart) {
            self.emit(EditorEvent::HistoryChanged);
        }
    }

    fn record_debounced(&mut self, label: &str) {
        self.history.execute_debounced(label, Instant::now());
    }

    /// Commits a debounced edit once typing has paused. Hosts call this every
    /// frame.
    pub fn tick(&mut self) {
        self.tick_at(Instant::now());
    }

    pub fn tick_at(&mut self, now: Instant) {
        if self.history.poll(now, &self.flowchart) {
            self.emit(EditorEvent::HistoryChanged);
        }
    }

    fn flush_pending(&mut self) {
        if self.history.flush(&self.flowchart) {
            self.emit(EditorEvent::HistoryChanged);
        }
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo() || self.history.has_pending()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    pub fn undo(&mut self) -> bool {
        self.flush_pending();
        match self.history.undo() {
            Some(state) => {
                self.apply_snapshot(state);
                true
            }
            None => false,
        }
    }

    pub fn redo(&mut self) -> bool {
        self.flush_pending();
        match self.history.redo() {
            Some(state) => {
                self.apply_snapshot(state);
                true
            }
            None => false,
        }
    }

    /// Jumps to any history entry. A bad step is logged and leaves the live
    /// document untouched.
    pub fn restore_to_step(&mut self, index: usize) -> Result<()> {
        self.flush_pending();
        let state = self.history.restore_to_step(index).inspect_err(|e| {
            warn!(error = %e, "history restore abandoned");
        })?;
        self.apply_snapshot(state);
        Ok(())
    }

    fn apply_snapshot(&mut self, state: Flowchart) {
        self.history.begin_restore();
        self.interaction = Interaction::Idle;
        self.hover = Hover::default();
        self.flowchart = state;
        self.flowchart.rebuild_connectivity();
        let resolved = self.selection.resolve(&self.flowchart);
        self.update_selection(|s| *s = resolved);
        self.history.end_restore();
        debug!(
            index = self.history.index(),
            label = self.history.current_label(),
            "restored history entry"
        );
        self.emit(EditorEvent::GraphChanged);
        self.emit(EditorEvent::HistoryChanged);
        let label = self.history.current_label().to_string();
        self.status(format!("Restored: {label}"));
    }

    /// Switches mode. Entering edit mode stores a copy of the document for
    /// [`Editor::cancel_edit`]; leaving it drops any gesture and selection.
    pub fn set_mode(&mut self, mode: Mode) {
        if self.mode == mode {
            return;
        }
        match mode {
            Mode::Edit => {
                self.edit_backup = Some(self.flowchart.clone());
            }
            Mode::View => {
                self.cancel_gesture();
                self.hover = Hover::default();
                self.update_selection(Selection::clear);
            }
        }
        self.mode = mode;
        debug!(?mode, "mode changed");
        self.emit(EditorEvent::ModeChanged(mode));
    }

    pub fn toggle_mode(&mut self) {
        match self.mode {
            Mode::View => self.set_mode(Mode::Edit),
            Mode::Edit => self.save_and_exit(),
        }
    }

    /// Keeps the edits and returns to view mode.
    pub fn save_and_exit(&mut self) {
        self.flush_pending();
        self.flowchart.rebuild_connectivity();
        self.edit_backup = None;
        self.set_mode(Mode::View);
        self.emit(EditorEvent::GraphChanged);
    }

    /// Throws away every edit since edit mode was entered. The history is
    /// reset to a single entry holding the restored document.
    pub fn cancel_edit(&mut self) {
        let Some(backup) = self.edit_backup.take() else {
            self.set_mode(Mode::View);
            return;
        };
        self.cancel_gesture();
        self.flowchart = backup;
        self.flowchart.rebuild_connectivity();
        self.history.reset(RESTORED_LABEL, &self.flowchart);
        self.set_mode(Mode::View);
        self.emit(EditorEvent::GraphChanged);
        self.emit(EditorEvent::HistoryChanged);
        self.status("Edit session canceled. Changes reverted.");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::INITIAL_LABEL;
    use egui::pos2;

    fn editing() -> Editor {
        let mut editor = Editor::default();
        editor.set_mode(Mode::Edit);
        editor.drain_events();
        editor
    }

    #[test]
    fn test_starts_with_floor_entry() {
        let editor = Editor::default();
        assert_eq!(editor.history().len(), 1);
        assert_eq!(editor.history().current_label(), INITIAL_LABEL);
        assert_eq!(editor.mode(), Mode::View);
        assert!(!editor.can_undo());
    }

    #[test]
    fn test_undo_redo_restores_deep_copies() {
        let mut editor = editing();
        editor.add_node_at(pos2(100.0, 100.0)).unwrap();
        let after_add = editor.flowchart().clone();
        editor.add_node_at(pos2(400.0, 100.0)).unwrap();
        let after_second = editor.flowchart().clone();

        assert!(editor.undo());
        assert_eq!(editor.flowchart(), &after_add);
        assert!(editor.redo());
        assert_eq!(editor.flowchart(), &after_second);
    }

    #[test]
    fn test_selection_resolved_after_undo() {
        let mut editor = editing();
        let a = editor.add_node_at(pos2(100.0, 100.0)).unwrap();
        let b = editor.add_node_at(pos2(600.0, 100.0)).unwrap();
        assert_eq!(editor.selection(), &Selection::Nodes(vec![b]));
        editor.undo();
        assert_eq!(editor.selection(), &Selection::None);
        assert!(editor.flowchart().contains(a));
        assert!(!editor.flowchart().contains(b));
    }

    #[test]
    fn test_debounced_edit_commits_once() {
        let mut editor = editing();
        let id = editor.add_node_at(pos2(0.0, 0.0)).unwrap();
        let len = editor.history().len();
        editor.set_caption(id, "H");
        editor.set_caption(id, "He");
        editor.set_caption(id, "Hello");
        assert_eq!(editor.history().len(), len);
        editor.tick_at(Instant::now() + std::time::Duration::from_secs(2));
        assert_eq!(editor.history().len(), len + 1);
        assert_eq!(editor.history().current_label(), "Edit node property");
        assert_eq!(
            editor.history().current().state().node(id).unwrap().caption,
            "Hello"
        );
    }

    #[test]
    fn test_undo_flushes_pending_edit() {
        let mut editor = editing();
        let id = editor.add_node_at(pos2(0.0, 0.0)).unwrap();
        editor.set_caption(id, "Typed");
        assert!(editor.can_undo());
        editor.undo();
        assert_eq!(editor.flowchart().node(id).unwrap().caption, "New Node");
        editor.redo();
        assert_eq!(editor.flowchart().node(id).unwrap().caption, "Typed");
    }

    #[test]
    fn test_cancel_edit_restores_backup() {
        let mut editor = editing();
        editor.add_node_at(pos2(0.0, 0.0)).unwrap();
        editor.save_and_exit();
        let saved = editor.flowchart().clone();

        editor.set_mode(Mode::Edit);
        editor.add_node_at(pos2(500.0, 0.0)).unwrap();
        editor.cancel_edit();
        assert_eq!(editor.mode(), Mode::View);
        assert_eq!(editor.flowchart(), &saved);
        assert_eq!(editor.history().len(), 1);
        assert_eq!(editor.history().current_label(), RESTORED_LABEL);
    }

    #[test]
    fn test_bad_restore_step_keeps_state() {
        let mut editor = editing();
        editor.add_node_at(pos2(0.0, 0.0)).unwrap();
        let before = editor.flowchart().clone();
        assert!(editor.restore_to_step(42).is_err());
        assert_eq!(editor.flowchart(), &before);
        editor.restore_to_step(0).unwrap();
        assert!(editor.flowchart().is_empty());
    }

    #[test]
    fn test_events_are_queued_once() {
        let mut editor = editing();
        editor.add_node_at(pos2(0.0, 0.0)).unwrap();
        let events = editor.drain_events();
        assert!(events.contains(&EditorEvent::GraphChanged));
        assert!(events.contains(&EditorEvent::HistoryChanged));
        assert!(events.contains(&EditorEvent::SelectionChanged));
        assert_eq!(
            events.iter().filter(|e| **e == EditorEvent::GraphChanged).count(),
            1
        );
        assert!(editor.drain_events().is_empty());
    }
}
