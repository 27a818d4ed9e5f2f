//! Opening, importing and exporting documents.

use std::{collections::HashMap, path::Path};

use tracing::info;

use super::{Editor, EditorEvent, DEFAULT_FLOWCHART_NAME};
use crate::{
    error::Result,
    geometry::View,
    history::INITIAL_LABEL,
    ids::{next_node_id, next_output_id, NodeId},
    interaction::{Hover, Interaction},
    interchange::{
        engine::{self, EngineExport},
        miniflow, project, ExportFile,
    },
    model::Flowchart,
    selection::Selection,
};

const KNOWN_SUFFIXES: [&str; 4] = [".json", ".flowproj", ".uistate", ".miniflow"];

fn strip_suffix_ignore_case<'a>(name: &'a str, suffix: &str) -> Option<&'a str> {
    let cut = name.len().checked_sub(suffix.len())?;
    (name.is_char_boundary(cut) && name[cut..].eq_ignore_ascii_case(suffix)).then(|| &name[..cut])
}

/// Document name for a file: the last path component with every trailing
/// `.json`, `.flowproj`, `.uistate` and `.miniflow` removed, in any case.
pub fn strip_file_extensions(file_name: &str) -> String {
    let mut name = Path::new(file_name)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or(file_name);
    while let Some(stripped) = KNOWN_SUFFIXES
        .iter()
        .find_map(|suffix| strip_suffix_ignore_case(name, suffix))
    {
        name = stripped;
    }
    name.to_string()
}

impl Editor {
    /// Brings a parsed document into the editor.
    ///
    /// Opening, or importing into an empty canvas, replaces the flowchart.
    /// Importing into a populated canvas merges the incoming nodes below the
    /// existing ones with fresh ids; their start flags are dropped and links
    /// that leave the imported set are cleared. Either way exactly one
    /// history entry is recorded.
    pub fn load(&mut self, incoming: Flowchart, file_name: Option<&str>, is_import: bool) {
        self.cancel_gesture();
        self.flush_pending();
        self.history.begin_restore();

        let replace = !is_import || self.flowchart.is_empty();
        let count = incoming.len();
        if replace {
            self.flowchart = incoming;
        } else {
            self.merge_below(incoming);
        }
        if let Some(file_name) = file_name.filter(|_| !is_import) {
            let name = strip_file_extensions(file_name);
            self.flowchart.name = if name.is_empty() {
                DEFAULT_FLOWCHART_NAME.to_string()
            } else {
                name
            };
        }

        self.flowchart.rebuild_connectivity();
        self.interaction = Interaction::Idle;
        self.hover = Hover::default();
        let resolved = self.selection.resolve(&self.flowchart);
        self.update_selection(|s| *s = resolved);
        self.reset_view();
        self.history.end_restore();

        self.record(if is_import { "Import Project" } else { "Open File" });
        self.emit(EditorEvent::GraphChanged);
        info!(
            name = %self.flowchart.name,
            nodes = count,
            merged = !replace,
            "loaded flowchart"
        );
        if is_import {
            self.status(format!("Imported {count} nodes into project"));
        } else {
            self.status(format!(
                "Project \"{}\" loaded successfully.",
                self.flowchart.name
            ));
        }
    }

    fn merge_below(&mut self, incoming: Flowchart) {
        let dims = &self.config.dims;
        let shift = match (self.flowchart.bounds(dims), incoming.bounds(dims)) {
            (Some(current), Some(imported)) => {
                current.bottom() + self.config.layout.import_gap - imported.top()
            }
            _ => 0.0,
        };

        let mut nodes = incoming.into_nodes();
        let remap: HashMap<NodeId, NodeId> =
            nodes.iter().map(|n| (n.sid, next_node_id())).collect();
        for node in &mut nodes {
            node.sid = remap[&node.sid];
            node.pos.y += shift;
            node.set_start_flag(false);
            for output in &mut node.outputs {
                output.sid = next_output_id();
                output.next = output.next.and_then(|next| remap.get(&next).copied());
            }
        }
        self.flowchart.nodes_vec_mut().extend(nodes);
    }

    /// Opens a `.flowproj` document, replacing the current flowchart.
    pub fn open_project(&mut self, text: &str, file_name: Option<&str>) -> Result<()> {
        let flowchart = project::open(text)?;
        self.load(flowchart, file_name, false);
        Ok(())
    }

    /// Imports an engine logic file and its UI-state companion.
    pub fn import_engine(&mut self, logic: &str, ui_state: &str) -> Result<()> {
        let flowchart = engine::import(logic, ui_state)?;
        self.load(flowchart, None, true);
        Ok(())
    }

    /// Imports a MiniFlow document. On an empty canvas the root is framed at
    /// the layout anchor; a merge frames the whole graph instead.
    pub fn import_miniflow(&mut self, text: &str) -> Result<()> {
        let was_empty = self.flowchart.is_empty();
        let flowchart = miniflow::import(text, &self.config)?;
        let count = flowchart.len();
        self.load(flowchart, None, true);
        if was_empty {
            self.frame_root();
        }
        self.status(format!("Imported {count} nodes from MiniFlow"));
        Ok(())
    }

    pub fn export_miniflow(&mut self) -> Result<ExportFile> {
        self.flush_pending();
        let file = miniflow::export(&self.flowchart)?;
        self.status(format!("Exported {}", file.file_name));
        Ok(file)
    }

    pub fn export_engine(&mut self) -> Result<EngineExport> {
        self.flush_pending();
        self.flowchart.rebuild_connectivity();
        let files = engine::export(&self.flowchart)?;
        self.status("Exported as engine files (.json + .uistate.json)");
        Ok(files)
    }

    /// The current document as a `.flowproj` file.
    pub fn project_file(&mut self) -> Result<ExportFile> {
        self.flush_pending();
        self.flowchart.rebuild_connectivity();
        project::save(&self.flowchart)
    }

    /// Starts over with an empty document and a fresh history.
    pub fn new_flowchart(&mut self) {
        self.cancel_gesture();
        self.flowchart = Flowchart::new(DEFAULT_FLOWCHART_NAME);
        self.history.reset(INITIAL_LABEL, &self.flowchart);
        self.edit_backup = self.is_editing().then(|| self.flowchart.clone());
        self.update_selection(Selection::clear);
        self.view = View::new(self.config.zoom.initial);
        self.toolbar_adds = 0;
        self.emit(EditorEvent::GraphChanged);
        self.emit(EditorEvent::HistoryChanged);
        self.emit(EditorEvent::ViewChanged);
    }
}
