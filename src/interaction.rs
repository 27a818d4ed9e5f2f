//! Pointer gesture state. One variant is active at a time, so combinations
//! such as resizing while marqueeing cannot be expressed.

use egui::{CursorIcon, Pos2, Rect, Vec2};

use crate::{
    geometry,
    hit_test::{OutputHit, ResizeAxis},
    ids::NodeId,
    model::{Flowchart, OutputRef},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    /// Pan and zoom only.
    #[default]
    View,
    Edit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerButton {
    Primary,
    Middle,
    Secondary,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Modifiers {
    pub shift: bool,
}

impl Modifiers {
    pub const NONE: Self = Self { shift: false };
    pub const SHIFT: Self = Self { shift: true };
}

/// Position and size of a node when a gesture started, used to revert it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NodeGeometry {
    pub node: NodeId,
    pub pos: Pos2,
    pub size: Vec2,
}

impl NodeGeometry {
    pub fn capture(flowchart: &Flowchart, ids: &[NodeId]) -> Vec<Self> {
        ids.iter()
            .filter_map(|id| flowchart.node(*id))
            .map(|n| Self {
                node: n.sid,
                pos: n.pos,
                size: n.size,
            })
            .collect()
    }

    pub fn restore(origin: &[Self], flowchart: &mut Flowchart) {
        for geometry in origin {
            if let Some(node) = flowchart.node_mut(geometry.node) {
                node.pos = geometry.pos;
                node.size = geometry.size;
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub enum Interaction {
    #[default]
    Idle,
    Panning {
        last: Pos2,
    },
    DraggingNodes {
        last_world: Pos2,
        moved: bool,
        origin: Vec<NodeGeometry>,
    },
    Resizing {
        axis: ResizeAxis,
        last: Pos2,
        moved: bool,
        origin: Vec<NodeGeometry>,
    },
    Connecting {
        source: OutputRef,
        cursor: Pos2,
        /// Node the preview currently snaps to.
        target: Option<NodeId>,
    },
    Marquee {
        start: Pos2,
        current: Pos2,
    },
}

impl Interaction {
    pub fn is_idle(&self) -> bool {
        matches!(self, Interaction::Idle)
    }

    /// Normalized marquee rectangle in screen space, if one is being drawn.
    pub fn marquee_rect(&self) -> Option<Rect> {
        match self {
            Interaction::Marquee { start, current } => {
                Some(geometry::rect_from_corners(*start, *current))
            }
            _ => None,
        }
    }

    pub fn cursor(&self) -> Option<CursorIcon> {
        match self {
            Interaction::Idle | Interaction::Marquee { .. } => None,
            Interaction::Panning { .. } | Interaction::DraggingNodes { .. } => {
                Some(CursorIcon::Grabbing)
            }
            Interaction::Resizing { axis, .. } => Some(resize_cursor(*axis)),
            Interaction::Connecting { .. } => Some(CursorIcon::Crosshair),
        }
    }
}

pub fn resize_cursor(axis: ResizeAxis) -> CursorIcon {
    match axis {
        ResizeAxis::Width => CursorIcon::ResizeHorizontal,
        ResizeAxis::Height => CursorIcon::ResizeVertical,
    }
}

/// What the pointer is over, recomputed on every move in edit mode.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Hover {
    pub node: Option<NodeId>,
    pub output: Option<OutputHit>,
    pub connection: Option<OutputRef>,
    pub cursor: CursorIcon,
}

impl Default for Hover {
    fn default() -> Self {
        Self {
            node: None,
            output: None,
            connection: None,
            cursor: CursorIcon::Default,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Dims;
    use crate::model::Node;
    use egui::pos2;

    #[test]
    fn test_marquee_rect_is_normalized() {
        let state = Interaction::Marquee {
            start: pos2(50.0, 40.0),
            current: pos2(10.0, 80.0),
        };
        let rect = state.marquee_rect().unwrap();
        assert_eq!(rect.min, pos2(10.0, 40.0));
        assert_eq!(rect.max, pos2(50.0, 80.0));
        assert!(Interaction::Idle.marquee_rect().is_none());
    }

    #[test]
    fn test_geometry_capture_and_restore() {
        let dims = Dims::default();
        let mut chart = Flowchart::new("g");
        let node = Node::new(pos2(1.0, 2.0), &dims);
        let id = node.sid;
        chart.push_node(node);
        let origin = NodeGeometry::capture(&chart, &[id, NodeId(0)]);
        assert_eq!(origin.len(), 1);
        chart.node_mut(id).unwrap().pos = pos2(100.0, 100.0);
        NodeGeometry::restore(&origin, &mut chart);
        assert_eq!(chart.node(id).unwrap().pos, pos2(1.0, 2.0));
    }
}
