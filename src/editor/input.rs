//! Pointer and keyboard handling: the gesture state machine.

use egui::{CursorIcon, Pos2, Vec2};
use tracing::trace;

use super::{Editor, EditorEvent};
use crate::{
    config::Dims,
    geometry,
    hit_test::{HitTester, ResizeAxis},
    ids::NodeId,
    interaction::{resize_cursor, Hover, Interaction, Mode, Modifiers, NodeGeometry, PointerButton},
    model::{Flowchart, OutputRef},
    selection::{Selection, SelectionKind},
};

impl Editor {
    /// Starts a gesture. The first matching target wins: pan trigger, output
    /// socket, connection, resize band of a selected node, node body, then
    /// empty canvas.
    pub fn pointer_down(&mut self, pos: Pos2, button: PointerButton, modifiers: Modifiers) {
        self.last_pointer = Some(pos);
        if !self.interaction.is_idle() {
            return;
        }

        if button == PointerButton::Middle || (button == PointerButton::Primary && self.space_held) {
            self.interaction = Interaction::Panning { last: pos };
            return;
        }
        if button != PointerButton::Primary || self.mode != Mode::Edit {
            return;
        }

        let (output_hit, connection_hit, resize_hit, node_hit) = {
            let hit = self.hit_tester();
            (
                hit.output_at(pos),
                hit.connection_at(pos),
                hit.resize_at(pos),
                hit.node_at(pos),
            )
        };

        if let Some(output) = output_hit {
            trace!(node = %output.node, output = %output.output, "connection drag started");
            self.interaction = Interaction::Connecting {
                source: output.as_ref(),
                cursor: pos,
                target: None,
            };
            return;
        }

        if let Some(link) = connection_hit {
            self.update_selection(|s| {
                if modifiers.shift {
                    s.toggle_connection(link);
                } else if !s.contains_connection(link.output) {
                    *s = Selection::Connections(vec![link]);
                }
            });
            return;
        }

        if let Some(resize) = resize_hit.filter(|r| self.selection.contains_node(r.node)) {
            self.interaction = Interaction::Resizing {
                axis: resize.axis,
                last: pos,
                moved: false,
                origin: NodeGeometry::capture(&self.flowchart, self.selection.nodes()),
            };
            return;
        }

        if let Some(node) = node_hit {
            self.update_selection(|s| {
                if modifiers.shift {
                    s.toggle_node(node);
                } else if !s.contains_node(node) {
                    s.select_node(Some(node));
                }
            });
            // A shift-click that deselected the node does not drag.
            if self.selection.contains_node(node) {
                self.interaction = Interaction::DraggingNodes {
                    last_world: self.view.screen_to_world(pos),
                    moved: false,
                    origin: NodeGeometry::capture(&self.flowchart, self.selection.nodes()),
                };
            }
            return;
        }

        if !modifiers.shift {
            self.update_selection(Selection::clear);
        }
        self.interaction = Interaction::Marquee {
            start: pos,
            current: pos,
        };
    }

    pub fn pointer_move(&mut self, pos: Pos2) {
        self.last_pointer = Some(pos);
        let mut graph_changed = false;
        let mut view_changed = false;

        match &mut self.interaction {
            Interaction::Idle => {}
            Interaction::Panning { last } => {
                self.view.pan += pos - *last;
                *last = pos;
                self.toolbar_adds = 0;
                view_changed = true;
            }
            Interaction::Resizing {
                axis, last, moved, ..
            } => {
                let delta = (pos - *last) / self.view.zoom;
                *last = pos;
                if delta != Vec2::ZERO {
                    *moved = true;
                    resize_nodes(
                        &mut self.flowchart,
                        self.selection.nodes(),
                        *axis,
                        delta,
                        &self.config.dims,
                    );
                    graph_changed = true;
                }
            }
            Interaction::DraggingNodes {
                last_world, moved, ..
            } => {
                let world = self.view.screen_to_world(pos);
                let delta = world - *last_world;
                *last_world = world;
                if delta != Vec2::ZERO {
                    *moved = true;
                    translate_nodes(&mut self.flowchart, self.selection.nodes(), delta);
                    graph_changed = true;
                }
            }
            Interaction::Connecting {
                source,
                cursor,
                target,
            } => {
                *cursor = pos;
                let hit = HitTester::new(&self.flowchart, self.view, &self.config);
                *target = hit.node_at(pos).filter(|n| *n != source.node);
            }
            Interaction::Marquee { current, .. } => {
                *current = pos;
            }
        }

        if self.interaction.is_idle() {
            self.refresh_hover(pos);
        }
        if graph_changed {
            self.emit(EditorEvent::GraphChanged);
        }
        if view_changed {
            self.emit(EditorEvent::ViewChanged);
        }
    }

    /// Finishes the active gesture. Exactly one history entry is recorded per
    /// gesture that changed the document; plain clicks record nothing.
    pub fn pointer_up(&mut self, pos: Pos2, modifiers: Modifiers) {
        self.last_pointer = Some(pos);
        match std::mem::take(&mut self.interaction) {
            Interaction::Idle | Interaction::Panning { .. } => {}
            Interaction::DraggingNodes { moved, .. } => {
                if moved {
                    self.record("Move node(s)");
                }
            }
            Interaction::Resizing { moved, .. } => {
                if moved {
                    self.record("Resize node");
                }
            }
            Interaction::Connecting { source, .. } => {
                let target = {
                    let hit = self.hit_tester();
                    hit.node_at(pos)
                        .filter(|n| *n != source.node)
                        .or_else(|| hit.closest_node(pos, self.config.hit.snap_distance))
                        .filter(|n| *n != source.node)
                };
                match target {
                    Some(target) => {
                        self.connect(source, target);
                    }
                    None => trace!("connection dropped on empty canvas"),
                }
            }
            Interaction::Marquee { start, .. } => {
                self.apply_marquee(start, pos, modifiers.shift);
            }
        }
        if self.mode == Mode::Edit {
            self.refresh_hover(pos);
        }
    }

    /// The pointer left the canvas: the gesture ends where it was last seen.
    pub fn pointer_leave(&mut self) {
        if let Some(pos) = self.last_pointer {
            if !self.interaction.is_idle() {
                self.pointer_up(pos, Modifiers::NONE);
            }
        }
        self.hover = Hover::default();
    }

    /// Escape: abandons a gesture, restoring any node it moved or resized.
    /// Without a gesture it clears the selection in edit mode.
    pub fn escape(&mut self) {
        if !self.interaction.is_idle() {
            self.cancel_gesture();
        } else if self.mode == Mode::Edit {
            self.update_selection(Selection::clear);
        }
    }

    pub(super) fn cancel_gesture(&mut self) {
        match std::mem::take(&mut self.interaction) {
            Interaction::DraggingNodes {
                moved: true,
                origin,
                ..
            }
            | Interaction::Resizing {
                moved: true,
                origin,
                ..
            } => {
                NodeGeometry::restore(&origin, &mut self.flowchart);
                self.emit(EditorEvent::GraphChanged);
            }
            _ => {}
        }
    }

    pub fn set_space_held(&mut self, held: bool) {
        self.space_held = held;
        if !held && matches!(self.interaction, Interaction::Panning { .. }) {
            self.interaction = Interaction::Idle;
        }
    }

    pub fn space_held(&self) -> bool {
        self.space_held
    }

    /// Wheel zoom around the cursor, allowed in both modes.
    pub fn zoom_at(&mut self, anchor: Pos2, zoom_in: bool) {
        let zoom = &self.config.zoom;
        let factor = if zoom_in { zoom.step_in } else { zoom.step_out };
        self.view.zoom_around(anchor, factor, zoom.min, zoom.max);
        self.emit(EditorEvent::ViewChanged);
    }

    /// Cursor the host should show.
    pub fn cursor(&self) -> CursorIcon {
        if let Some(cursor) = self.interaction.cursor() {
            return cursor;
        }
        if self.space_held {
            return CursorIcon::Grab;
        }
        match self.mode {
            Mode::Edit => self.hover.cursor,
            Mode::View => CursorIcon::Default,
        }
    }

    fn refresh_hover(&mut self, pos: Pos2) {
        if self.mode != Mode::Edit {
            return;
        }
        let hover = {
            let hit = self.hit_tester();
            let output = hit.output_at(pos);
            let node = output.map(|o| o.node).or_else(|| hit.node_at(pos));
            let connection = match node {
                Some(_) => None,
                None => hit.connection_at(pos),
            };
            let cursor = if output.is_some() || connection.is_some() {
                CursorIcon::PointingHand
            } else if node.is_some() {
                hit.resize_at(pos)
                    .map(|r| resize_cursor(r.axis))
                    .unwrap_or(CursorIcon::Grab)
            } else {
                CursorIcon::Default
            };
            Hover {
                node,
                output,
                connection,
                cursor,
            }
        };
        self.hover = hover;
    }

    /// Resolves a released marquee. Nodes take priority: when any node is
    /// inside, connections are ignored for this release.
    fn apply_marquee(&mut self, start: Pos2, end: Pos2, shift: bool) {
        let rect = geometry::rect_from_corners(start, end);
        let min = self.config.hit.marquee_min;
        if rect.width() < min && rect.height() < min {
            return;
        }

        let (nodes, links) = {
            let hit = self.hit_tester();
            (hit.nodes_in_rect(rect), hit.connections_in_rect(rect))
        };
        trace!(nodes = nodes.len(), connections = links.len(), "marquee released");

        self.update_selection(|s| {
            if !nodes.is_empty() {
                if !(shift && s.kind() == SelectionKind::Nodes) {
                    s.clear();
                }
                for id in nodes {
                    s.add_node(id);
                }
            } else if !links.is_empty() {
                if !(shift && s.kind() == SelectionKind::Connections) {
                    s.clear();
                }
                for link in links {
                    s.add_connection(link);
                }
            } else if !shift {
                s.clear();
            }
        });
    }

    /// Points `source` at `target`, overwriting any previous target.
    /// Returns false when nothing changed.
    pub fn connect(&mut self, source: OutputRef, target: NodeId) -> bool {
        if !self.is_editing() || source.node == target || !self.flowchart.contains(target) {
            return false;
        }
        let Some(output) = self.flowchart.output_mut(source) else {
            return false;
        };
        if output.next == Some(target) {
            return false;
        }
        output.next = Some(target);
        self.record("Connect nodes");
        self.emit(EditorEvent::GraphChanged);
        true
    }
}

fn translate_nodes(flowchart: &mut Flowchart, ids: &[NodeId], delta: Vec2) {
    for node in flowchart.nodes_mut().filter(|n| ids.contains(&n.sid)) {
        node.pos += delta;
    }
}

/// Moves one edge of every node by `delta` while the opposite edge stays put.
fn resize_nodes(flowchart: &mut Flowchart, ids: &[NodeId], axis: ResizeAxis, delta: Vec2, dims: &Dims) {
    for node in flowchart.nodes_mut().filter(|n| ids.contains(&n.sid)) {
        let min = node.min_size(dims);
        match axis {
            ResizeAxis::Width => {
                let old = node.size.x;
                node.size.x = (old + delta.x).max(min.x);
                node.pos.x += (node.size.x - old) / 2.0;
            }
            ResizeAxis::Height => {
                let old = node.effective_height(dims);
                node.size.y = (old + delta.y).max(min.y);
                node.pos.y += (node.size.y - old) / 2.0;
            }
        }
    }
}
