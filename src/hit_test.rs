//! Maps screen points and rectangles to graph elements.
//!
//! Every position here is computed the same way the renderer draws it, so what
//! the user sees is exactly what they can grab. Nodes later in the list are
//! painted on top and are therefore tested first.

use egui::{pos2, Pos2, Rect};

use crate::{
    config::EditorConfig,
    geometry::{self, View},
    ids::{NodeId, OutputId},
    model::{Connection, Flowchart, Node, OutputRef},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResizeAxis {
    /// Right edge, changes the width.
    Width,
    /// Bottom edge, changes the height.
    Height,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutputHit {
    pub node: NodeId,
    pub output: OutputId,
    pub index: usize,
}

impl OutputHit {
    pub fn as_ref(&self) -> OutputRef {
        OutputRef {
            node: self.node,
            output: self.output,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResizeHit {
    pub node: NodeId,
    pub axis: ResizeAxis,
}

pub struct HitTester<'a> {
    flowchart: &'a Flowchart,
    view: View,
    config: &'a EditorConfig,
}

impl<'a> HitTester<'a> {
    pub fn new(flowchart: &'a Flowchart, view: View, config: &'a EditorConfig) -> Self {
        Self {
            flowchart,
            view,
            config,
        }
    }

    pub fn node_screen_rect(&self, node: &Node) -> Rect {
        self.view
            .world_rect_to_screen(node.world_rect(&self.config.dims))
    }

    /// Centre of an output's socket dot on the node's right edge.
    pub fn output_socket_pos(&self, node: &Node, index: usize) -> Pos2 {
        let dims = &self.config.dims;
        let top_left = node.world_rect(dims).min;
        let world = pos2(
            top_left.x + node.size.x,
            top_left.y
                + dims.header_height
                + dims.socket_top_padding
                + index as f32 * dims.row_height
                + dims.row_height / 2.0,
        );
        self.view.world_to_screen(world)
    }

    /// Where incoming connections end: the middle of the node's left edge.
    pub fn input_pos(&self, node: &Node) -> Pos2 {
        self.view
            .world_to_screen(pos2(node.pos.x - node.size.x / 2.0, node.pos.y))
    }

    /// Screen-space start and end of a resolved connection.
    pub fn connection_endpoints(&self, link: &Connection) -> Option<(Pos2, Pos2)> {
        let source = self.flowchart.node(link.source)?;
        let target = self.flowchart.node(link.target)?;
        Some((
            self.output_socket_pos(source, link.output_index),
            self.input_pos(target),
        ))
    }

    pub fn node_at(&self, point: Pos2) -> Option<NodeId> {
        let world = self.view.screen_to_world(point);
        self.flowchart
            .nodes()
            .iter()
            .rev()
            .find(|n| n.world_rect(&self.config.dims).contains(world))
            .map(|n| n.sid)
    }

    pub fn output_at(&self, point: Pos2) -> Option<OutputHit> {
        let radius = self.config.hit.socket_radius * self.view.zoom;
        self.flowchart.nodes().iter().rev().find_map(|node| {
            node.outputs.iter().enumerate().find_map(|(index, output)| {
                (self.output_socket_pos(node, index).distance(point) < radius).then_some(
                    OutputHit {
                        node: node.sid,
                        output: output.sid,
                        index,
                    },
                )
            })
        })
    }

    pub fn resize_at(&self, point: Pos2) -> Option<ResizeHit> {
        let margin = self.config.dims.resize_margin;
        self.flowchart.nodes().iter().rev().find_map(|node| {
            let rect = self.node_screen_rect(node);
            let on_right = point.y >= rect.top()
                && point.y <= rect.bottom()
                && point.x >= rect.right() - margin
                && point.x <= rect.right() + margin;
            let on_bottom = point.x >= rect.left()
                && point.x <= rect.right()
                && point.y >= rect.bottom() - margin
                && point.y <= rect.bottom() + margin;
            let axis = if on_right {
                ResizeAxis::Width
            } else if on_bottom {
                ResizeAxis::Height
            } else {
                return None;
            };
            Some(ResizeHit {
                node: node.sid,
                axis,
            })
        })
    }

    pub fn connection_at(&self, point: Pos2) -> Option<OutputRef> {
        let hit = &self.config.hit;
        self.flowchart.connections().find_map(|link| {
            let (start, end) = self.connection_endpoints(&link)?;
            geometry::is_point_near_connection(
                point,
                start,
                end,
                hit.connection_threshold,
                hit.bezier_samples,
            )
            .then_some(OutputRef {
                node: link.source,
                output: link.output,
            })
        })
    }

    /// Nodes whose screen bounds overlap `marquee`, in list order.
    pub fn nodes_in_rect(&self, marquee: Rect) -> Vec<NodeId> {
        self.flowchart
            .nodes()
            .iter()
            .filter(|n| geometry::rects_overlap(marquee, self.node_screen_rect(n)))
            .map(|n| n.sid)
            .collect()
    }

    /// Connections with at least one curve sample inside `marquee`.
    pub fn connections_in_rect(&self, marquee: Rect) -> Vec<OutputRef> {
        let samples = self.config.hit.bezier_samples;
        self.flowchart
            .connections()
            .filter(|link| {
                self.connection_endpoints(link)
                    .is_some_and(|(start, end)| {
                        geometry::connection_touches_rect(start, end, marquee, samples)
                    })
            })
            .map(|link| OutputRef {
                node: link.source,
                output: link.output,
            })
            .collect()
    }

    /// Node whose screen bounds are nearest to `point`, if within `max`
    /// pixels.
    pub fn closest_node(&self, point: Pos2, max: f32) -> Option<NodeId> {
        self.flowchart
            .nodes()
            .iter()
            .map(|n| (n.sid, geometry::distance_to_rect(point, self.node_screen_rect(n))))
            .filter(|(_, d)| *d < max)
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(id, _)| id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{config::Dims, model::Output};
    use egui::Vec2;

    fn two_nodes() -> (Flowchart, NodeId, NodeId) {
        let dims = Dims::default();
        let mut chart = Flowchart::new("hit");
        let mut a = Node::new(pos2(0.0, 0.0), &dims);
        let b = Node::new(pos2(800.0, 200.0), &dims);
        a.outputs[0].next = Some(b.sid);
        let (a_id, b_id) = (a.sid, b.sid);
        chart.push_node(a);
        chart.push_node(b);
        (chart, a_id, b_id)
    }

    #[test]
    fn test_centre_hits_node() {
        let config = EditorConfig::default();
        let (chart, a, b) = two_nodes();
        let view = View {
            zoom: 0.5,
            pan: Vec2::new(100.0, 50.0),
        };
        let hit = HitTester::new(&chart, view, &config);
        assert_eq!(hit.node_at(view.world_to_screen(pos2(0.0, 0.0))), Some(a));
        assert_eq!(hit.node_at(view.world_to_screen(pos2(800.0, 200.0))), Some(b));
    }

    #[test]
    fn test_topmost_node_wins() {
        let config = EditorConfig::default();
        let dims = Dims::default();
        let mut chart = Flowchart::new("stack");
        let under = Node::new(pos2(0.0, 0.0), &dims);
        let over = Node::new(pos2(10.0, 10.0), &dims);
        let over_id = over.sid;
        chart.push_node(under);
        chart.push_node(over);
        let hit = HitTester::new(&chart, View::new(1.0), &config);
        assert_eq!(hit.node_at(pos2(5.0, 5.0)), Some(over_id));
    }

    #[test]
    fn test_shrunk_height_still_covers_outputs() {
        let config = EditorConfig::default();
        let dims = Dims::default();
        let mut chart = Flowchart::new("short");
        let mut node = Node::new(pos2(0.0, 0.0), &dims);
        for i in 1..5 {
            node.outputs.push(Output::new(format!("Option {i}"), ""));
        }
        node.size.y = 10.0;
        let id = node.sid;
        chart.push_node(node);
        let hit = HitTester::new(&chart, View::new(1.0), &config);
        let half = dims.content_height(5) / 2.0;
        assert_eq!(hit.node_at(pos2(0.0, half - 1.0)), Some(id));
        assert_eq!(hit.node_at(pos2(0.0, half + 1.0)), None);
    }

    #[test]
    fn test_output_socket_hit() {
        let config = EditorConfig::default();
        let (chart, a, _) = two_nodes();
        let hit = HitTester::new(&chart, View::new(1.0), &config);
        let node = chart.node(a).unwrap();
        let socket = hit.output_socket_pos(node, 0);
        assert_eq!(socket.x, 210.0);
        let found = hit.output_at(socket + Vec2::new(10.0, 10.0)).unwrap();
        assert_eq!(found.node, a);
        assert_eq!(found.index, 0);
        assert!(hit.output_at(socket + Vec2::new(30.0, 0.0)).is_none());
    }

    #[test]
    fn test_resize_bands() {
        let config = EditorConfig::default();
        let (chart, a, _) = two_nodes();
        let hit = HitTester::new(&chart, View::new(1.0), &config);
        let rect = hit.node_screen_rect(chart.node(a).unwrap());
        assert_eq!(
            hit.resize_at(pos2(rect.right() + 4.0, rect.center().y)),
            Some(ResizeHit {
                node: a,
                axis: ResizeAxis::Width
            })
        );
        assert_eq!(
            hit.resize_at(pos2(rect.center().x, rect.bottom() - 4.0)),
            Some(ResizeHit {
                node: a,
                axis: ResizeAxis::Height
            })
        );
        assert_eq!(hit.resize_at(rect.center()), None);
    }

    #[test]
    fn test_connection_hit_and_marquee() {
        let config = EditorConfig::default();
        let (chart, a, b) = two_nodes();
        let hit = HitTester::new(&chart, View::new(1.0), &config);
        let start = hit.output_socket_pos(chart.node(a).unwrap(), 0);
        let end = hit.input_pos(chart.node(b).unwrap());
        let mid = geometry::compute_cubic_bezier_points(geometry::connection_curve(start, end), 2)[1];
        let found = hit.connection_at(mid).unwrap();
        assert_eq!(found.node, a);

        let marquee = Rect::from_center_size(mid, Vec2::splat(20.0));
        assert_eq!(hit.connections_in_rect(marquee).len(), 1);
        assert!(hit.nodes_in_rect(marquee).is_empty());
    }

    #[test]
    fn test_far_point_hits_nothing() {
        let config = EditorConfig::default();
        let (chart, _, _) = two_nodes();
        let hit = HitTester::new(&chart, View::new(1.0), &config);
        let far = pos2(5000.0, -5000.0);
        assert!(hit.node_at(far).is_none());
        assert!(hit.output_at(far).is_none());
        assert!(hit.connection_at(far).is_none());
        assert!(hit.resize_at(far).is_none());
        assert!(hit.closest_node(far, config.hit.snap_distance).is_none());
    }

    #[test]
    fn test_closest_node_within_snap() {
        let config = EditorConfig::default();
        let (chart, a, _) = two_nodes();
        let hit = HitTester::new(&chart, View::new(1.0), &config);
        let rect = hit.node_screen_rect(chart.node(a).unwrap());
        let near = pos2(rect.left() - 20.0, rect.center().y);
        assert_eq!(hit.closest_node(near, 50.0), Some(a));
        assert_eq!(hit.closest_node(near, 10.0), None);
    }
}
