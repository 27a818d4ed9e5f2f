//! Discrete document operations: the toolbar, context menu, properties panel
//! and clipboard all land here. Every operation that changes the document
//! records exactly one history entry; a no-op records nothing.

use egui::{Pos2, Vec2};
use tracing::{debug, info};

use super::{Clipboard, Editor, EditorEvent, DEFAULT_FLOWCHART_NAME};
use crate::{
    geometry::View,
    ids::{next_node_id, next_output_id, NodeId, OutputId},
    interaction::Mode,
    model::{Node, Output, OutputRef},
    selection::{Selection, SelectionKind},
};

/// Replaces characters other than letters, digits, `_`, `-` and whitespace
/// with `_`. An empty result falls back to the default name.
pub fn sanitize_name(name: &str) -> String {
    let cleaned: String = name
        .trim()
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || c == '_' || c == '-' || c.is_whitespace() {
                c
            } else {
                '_'
            }
        })
        .collect();
    if cleaned.is_empty() {
        DEFAULT_FLOWCHART_NAME.to_string()
    } else {
        cleaned
    }
}

impl Editor {
    fn editable(&self) -> bool {
        self.mode == Mode::Edit
    }

    /// Adds a node centred under a screen point and selects it.
    pub fn add_node_at(&mut self, screen: Pos2) -> Option<NodeId> {
        if !self.editable() {
            return None;
        }
        let world = self.view.screen_to_world(screen);
        Some(self.insert_new_node(world))
    }

    /// Adds a node at the viewport centre. Repeated toolbar adds cascade down
    /// and to the right so they do not stack; panning restarts the cascade.
    pub fn add_node_from_toolbar(&mut self) -> Option<NodeId> {
        if !self.editable() {
            return None;
        }
        let toolbar = &self.config.toolbar;
        let wrap = toolbar.cascade_wrap.max(1);
        let step = (self.toolbar_adds % wrap) as f32 * toolbar.cascade_step;
        let group = (self.toolbar_adds / wrap) as f32 * toolbar.group_shift;
        self.toolbar_adds += 1;

        let centre = (self.viewport / 2.0).to_pos2();
        let world = self.view.screen_to_world(centre) + Vec2::new(step + group, step);
        Some(self.insert_new_node(world))
    }

    fn insert_new_node(&mut self, world: Pos2) -> NodeId {
        let node = Node::new(world, &self.config.dims);
        let id = node.sid;
        self.flowchart.push_node(node);
        self.update_selection(|s| s.select_node(Some(id)));
        self.record("Add Node");
        self.emit(EditorEvent::GraphChanged);
        id
    }

    /// Appends an output named after the first free `Option i`, growing the
    /// node by one row.
    pub fn add_output(&mut self, node: NodeId) -> Option<OutputId> {
        if !self.editable() {
            return None;
        }
        let row = self.config.dims.row_height;
        let target = self.flowchart.node_mut(node)?;
        let (name, value) = target.next_output_label();
        let output = Output::new(name, value);
        let id = output.sid;
        target.outputs.push(output);
        target.size.y += row;
        self.record("Add output");
        self.emit(EditorEvent::GraphChanged);
        Some(id)
    }

    /// Removes an output, shrinking the node by one row but never below its
    /// content height.
    pub fn remove_output(&mut self, node: NodeId, index: usize) -> bool {
        if !self.editable() {
            return false;
        }
        let dims = &self.config.dims;
        let Some(target) = self.flowchart.node_mut(node) else {
            return false;
        };
        if index >= target.outputs.len() {
            return false;
        }
        let removed = target.outputs.remove(index);
        target.size.y = (target.size.y - dims.row_height).max(target.min_size(dims).y);
        self.update_selection(|s| s.remove_connection(removed.sid));
        self.record("Delete output");
        self.emit(EditorEvent::GraphChanged);
        true
    }

    /// Flips `enabled` on every selected node. The new state is the inverse
    /// of the first selected node's.
    pub fn toggle_enabled(&mut self) -> bool {
        if !self.editable() {
            return false;
        }
        let ids: Vec<NodeId> = self
            .selection
            .nodes()
            .iter()
            .copied()
            .filter(|id| self.flowchart.contains(*id))
            .collect();
        let Some(first) = ids.first().and_then(|id| self.flowchart.node(*id)) else {
            self.update_selection(Selection::clear);
            return false;
        };
        let enabled = !first.enabled;
        for node in self.flowchart.nodes_mut().filter(|n| ids.contains(&n.sid)) {
            node.enabled = enabled;
        }
        let action = if enabled { "Enable" } else { "Disable" };
        let label = if ids.len() > 1 {
            format!("Toggle node option: {action} ({} nodes)", ids.len())
        } else {
            format!("Toggle node option: {action}")
        };
        self.record(label);
        self.emit(EditorEvent::GraphChanged);
        true
    }

    pub fn set_node_enabled(&mut self, node: NodeId, enabled: bool) -> bool {
        if !self.editable() {
            return false;
        }
        match self.flowchart.node_mut(node) {
            Some(n) if n.enabled != enabled => n.enabled = enabled,
            _ => return false,
        }
        let action = if enabled { "Enable" } else { "Disable" };
        self.record(format!("Toggle node option: {action}"));
        self.emit(EditorEvent::GraphChanged);
        true
    }

    /// Makes `node` the start node, clearing the flag everywhere else, or
    /// clears it from `node`.
    pub fn set_start(&mut self, node: NodeId, on: bool) -> bool {
        if !self.editable() {
            return false;
        }
        match self.flowchart.node(node) {
            Some(n) if n.is_start() != on => {}
            _ => return false,
        }
        if on {
            self.flowchart.set_start(Some(node));
            self.record("Toggle node option: Set start");
        } else {
            self.flowchart.unset_start(node);
            self.record("Toggle node option: Unset start");
        }
        self.emit(EditorEvent::GraphChanged);
        true
    }

    pub fn set_output_enabled(&mut self, at: OutputRef, enabled: bool) -> bool {
        if !self.editable() {
            return false;
        }
        match self.flowchart.output_mut(at) {
            Some(output) if output.enabled != enabled => output.enabled = enabled,
            _ => return false,
        }
        self.record(if enabled {
            "Enable Output"
        } else {
            "Disable Output"
        });
        self.emit(EditorEvent::GraphChanged);
        true
    }

    /// Sets or clears the default flag; at most one output per node keeps it.
    pub fn set_default_output(&mut self, at: OutputRef, on: bool) -> bool {
        if !self.editable() {
            return false;
        }
        let Some(node) = self.flowchart.node_mut(at.node) else {
            return false;
        };
        let Some(index) = node.output_index(at.output) else {
            return false;
        };
        if node.outputs[index].is_default() == on {
            return false;
        }
        node.set_default_output(index, on);
        self.record("Set Default Output");
        self.emit(EditorEvent::GraphChanged);
        true
    }

    pub fn set_caption(&mut self, node: NodeId, caption: impl Into<String>) -> bool {
        self.edit_node_text(node, |n| &mut n.caption, caption.into())
    }

    pub fn set_tag(&mut self, node: NodeId, tag: impl Into<String>) -> bool {
        self.edit_node_text(node, |n| &mut n.tag, tag.into())
    }

    pub fn set_output_name(&mut self, at: OutputRef, name: impl Into<String>) -> bool {
        self.edit_output_text(at, |o| &mut o.name, name.into())
    }

    pub fn set_output_value(&mut self, at: OutputRef, value: impl Into<String>) -> bool {
        self.edit_output_text(at, |o| &mut o.value, value.into())
    }

    // Text fields change on every keystroke, so they go through the debounced
    // history path.
    fn edit_node_text(
        &mut self,
        node: NodeId,
        field: impl FnOnce(&mut Node) -> &mut String,
        text: String,
    ) -> bool {
        if !self.editable() {
            return false;
        }
        let Some(node) = self.flowchart.node_mut(node) else {
            return false;
        };
        *field(node) = text;
        self.record_debounced("Edit node property");
        self.emit(EditorEvent::GraphChanged);
        true
    }

    fn edit_output_text(
        &mut self,
        at: OutputRef,
        field: impl FnOnce(&mut Output) -> &mut String,
        text: String,
    ) -> bool {
        if !self.editable() {
            return false;
        }
        let Some(output) = self.flowchart.output_mut(at) else {
            return false;
        };
        *field(output) = text;
        self.record_debounced("Edit output property");
        self.emit(EditorEvent::GraphChanged);
        true
    }

    /// Deletes the selected nodes (and every link into them) or clears the
    /// selected connections.
    pub fn delete_selection(&mut self) -> bool {
        if !self.editable() || self.selection.is_empty() {
            return false;
        }
        let label = match self.selection.kind() {
            SelectionKind::Nodes => {
                let ids = self.selection.nodes().to_vec();
                for id in &ids {
                    self.flowchart.remove_node(*id);
                }
                format!("Delete {} node(s)", ids.len())
            }
            SelectionKind::Connections => {
                for at in self.selection.connections().to_vec() {
                    if let Some(output) = self.flowchart.output_mut(at) {
                        output.next = None;
                    }
                }
                "Delete connection(s)".to_string()
            }
            SelectionKind::None => return false,
        };
        debug!(%label, "deleting selection");
        self.update_selection(Selection::clear);
        self.record(label);
        self.emit(EditorEvent::GraphChanged);
        true
    }

    /// Clears the target of one output, as from a connection's context menu.
    pub fn delete_connection(&mut self, at: OutputRef) -> bool {
        if !self.editable() {
            return false;
        }
        match self.flowchart.output_mut(at) {
            Some(output) if output.next.is_some() => output.next = None,
            _ => return false,
        }
        self.update_selection(|s| s.remove_connection(at.output));
        self.record("Delete Connection");
        self.emit(EditorEvent::GraphChanged);
        true
    }

    /// Copies the selected nodes. Returns how many were copied.
    pub fn copy_selection(&mut self) -> usize {
        if !self.editable() {
            return 0;
        }
        let nodes: Vec<Node> = self
            .selection
            .nodes()
            .iter()
            .filter_map(|id| self.flowchart.node(*id).cloned())
            .collect();
        let Some(first) = nodes.first() else {
            return 0;
        };
        let (min, max) = nodes.iter().fold((first.pos, first.pos), |(min, max), n| {
            (min.min(n.pos), max.max(n.pos))
        });
        let count = nodes.len();
        self.clipboard = Some(Clipboard {
            nodes,
            center: min + (max - min) / 2.0,
        });
        self.status(format!("Copied {count} node(s)"));
        count
    }

    /// Pastes the clipboard centred under `screen`. Pasted nodes get fresh
    /// ids, lose their outgoing links and their start flag, and become the
    /// selection.
    pub fn paste_at(&mut self, screen: Pos2) -> Vec<NodeId> {
        if !self.editable() {
            return Vec::new();
        }
        let Some(clipboard) = self.clipboard.as_ref() else {
            return Vec::new();
        };
        if clipboard.nodes.is_empty() {
            return Vec::new();
        }
        let world = self.view.screen_to_world(screen);
        let pasted: Vec<Node> = clipboard
            .nodes
            .iter()
            .map(|source| {
                let mut node = source.clone();
                node.sid = next_node_id();
                node.pos = world + (source.pos - clipboard.center);
                node.set_start_flag(false);
                for output in &mut node.outputs {
                    output.sid = next_output_id();
                    output.next = None;
                }
                node
            })
            .collect();

        let ids: Vec<NodeId> = pasted.iter().map(|n| n.sid).collect();
        for node in pasted {
            self.flowchart.push_node(node);
        }
        let selected = ids.clone();
        self.update_selection(|s| *s = Selection::Nodes(selected));
        self.record(format!("Paste {} node(s)", ids.len()));
        self.emit(EditorEvent::GraphChanged);
        ids
    }

    /// Pastes under the last known pointer position, else the viewport
    /// centre.
    pub fn paste(&mut self) -> Vec<NodeId> {
        let at = self
            .last_pointer
            .unwrap_or_else(|| (self.viewport / 2.0).to_pos2());
        self.paste_at(at)
    }

    pub fn rename(&mut self, name: &str) {
        let name = sanitize_name(name);
        if name != self.flowchart.name {
            info!(%name, "flowchart renamed");
            self.flowchart.name = name;
            self.emit(EditorEvent::GraphChanged);
        }
    }

    /// Frames every node inside the viewport, never zooming in past 1:1.
    /// An empty document gets the initial zoom and no pan.
    pub fn reset_view(&mut self) {
        let padding = self.config.layout.fit_padding;
        self.view = match self.flowchart.bounds(&self.config.dims) {
            None => View::new(self.config.zoom.initial),
            Some(bounds) => {
                let room = self.viewport - Vec2::splat(padding * 2.0);
                let zoom = (room.x / bounds.width())
                    .min(room.y / bounds.height())
                    .min(1.0)
                    .max(self.config.zoom.min);
                View {
                    zoom,
                    pan: self.viewport / 2.0 - bounds.center().to_vec2() * zoom,
                }
            }
        };
        self.emit(EditorEvent::ViewChanged);
    }

    /// Keeps the zoom and pans so the root node sits at the layout anchor.
    pub(super) fn frame_root(&mut self) {
        let [x, y] = self.config.layout.anchor;
        if let Some(root) = self.flowchart.root() {
            self.view.pan = Vec2::new(x, y) - root.pos.to_vec2() * self.view.zoom;
            self.emit(EditorEvent::ViewChanged);
        }
    }
}
