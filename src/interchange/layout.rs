//! Breadth-first placement for graphs that arrive without coordinates.
//!
//! The root's component is laid out first: a node's column is its BFS depth
//! and nodes stack downwards inside their column in visiting order. Every
//! node the root cannot reach seeds another island, placed below everything
//! laid out so far.

use std::collections::{HashMap, HashSet, VecDeque};

use egui::pos2;
use tracing::debug;

use crate::{
    config::{Dims, LayoutConfig},
    ids::NodeId,
    model::Flowchart,
};

pub fn auto_layout(flowchart: &mut Flowchart, layout: &LayoutConfig, dims: &Dims) {
    let Some(root) = flowchart.root().map(|n| n.sid) else {
        return;
    };
    let order: Vec<NodeId> = flowchart.nodes().iter().map(|n| n.sid).collect();
    let mut visited = HashSet::new();

    let mut bottom = place_island(flowchart, root, layout.start_y, layout, dims, &mut visited);
    let mut islands = 1;
    for id in order {
        if !visited.contains(&id) {
            let top = bottom + layout.island_gap;
            bottom = place_island(flowchart, id, top, layout, dims, &mut visited);
            islands += 1;
        }
    }
    debug!(nodes = flowchart.len(), islands, "auto layout done");
}

/// Lays out everything reachable from `start` with its top edge at `top`.
/// Returns the lowest bottom edge placed.
fn place_island(
    flowchart: &mut Flowchart,
    start: NodeId,
    top: f32,
    layout: &LayoutConfig,
    dims: &Dims,
    visited: &mut HashSet<NodeId>,
) -> f32 {
    let mut queue = VecDeque::from([(start, 0usize)]);
    let mut column_offsets: HashMap<usize, f32> = HashMap::new();
    let mut bottom = top;

    while let Some((id, depth)) = queue.pop_front() {
        if !visited.insert(id) {
            continue;
        }
        let Some(node) = flowchart.node_mut(id) else {
            continue;
        };
        let offset = column_offsets.entry(depth).or_insert(top);
        let height = node.effective_height(dims);
        node.pos = pos2(
            layout.start_x + depth as f32 * layout.column_step,
            *offset + height / 2.0,
        );
        bottom = bottom.max(*offset + height);
        *offset += height + layout.row_gap;

        let children: Vec<NodeId> = node
            .outputs
            .iter()
            .filter_map(|o| o.next)
            .filter(|next| !visited.contains(next))
            .collect();
        queue.extend(children.into_iter().map(|next| (next, depth + 1)));
    }
    bottom
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Node, Output};

    fn chain(chart: &mut Flowchart, dims: &Dims, len: usize) -> Vec<NodeId> {
        let nodes: Vec<Node> = (0..len).map(|_| Node::new(pos2(0.0, 0.0), dims)).collect();
        let ids: Vec<NodeId> = nodes.iter().map(|n| n.sid).collect();
        for node in nodes {
            chart.push_node(node);
        }
        for pair in ids.windows(2) {
            chart.node_mut(pair[0]).unwrap().outputs[0].next = Some(pair[1]);
        }
        ids
    }

    #[test]
    fn test_columns_follow_depth() {
        let dims = Dims::default();
        let layout = LayoutConfig::default();
        let mut chart = Flowchart::new("t");
        let ids = chain(&mut chart, &dims, 2);
        let root = ids[0];
        let extra = Node::new(pos2(0.0, 0.0), &dims);
        let extra_id = extra.sid;
        chart.push_node(extra);
        let root_node = chart.node_mut(root).unwrap();
        let mut second = Output::new("Option 1", "Value 1");
        second.next = Some(extra_id);
        root_node.outputs.push(second);

        auto_layout(&mut chart, &layout, &dims);
        let root_node = chart.node(root).unwrap();
        let h_root = root_node.effective_height(&dims);
        assert_eq!(root_node.pos, pos2(300.0, 300.0 + h_root / 2.0));

        let first = chart.node(ids[1]).unwrap();
        let h = first.effective_height(&dims);
        assert_eq!(first.pos, pos2(800.0, 300.0 + h / 2.0));
        let stacked = chart.node(extra_id).unwrap();
        assert_eq!(stacked.pos.x, 800.0);
        assert_eq!(stacked.pos.y, 300.0 + h + 100.0 + h / 2.0);
    }

    #[test]
    fn test_islands_do_not_overlap() {
        let dims = Dims::default();
        let layout = LayoutConfig::default();
        let mut chart = Flowchart::new("t");
        chain(&mut chart, &dims, 3);
        chain(&mut chart, &dims, 2);
        chart.push_node(Node::new(pos2(0.0, 0.0), &dims));

        auto_layout(&mut chart, &layout, &dims);
        let rects: Vec<_> = chart.nodes().iter().map(|n| n.world_rect(&dims)).collect();
        for (i, a) in rects.iter().enumerate() {
            for b in &rects[i + 1..] {
                assert!(!a.intersects(*b), "{a:?} overlaps {b:?}");
            }
        }
        let first_island_bottom = rects[..3].iter().map(|r| r.bottom()).fold(f32::MIN, f32::max);
        assert_eq!(rects[3].top(), first_island_bottom + layout.island_gap);
    }

    #[test]
    fn test_cycles_terminate() {
        let dims = Dims::default();
        let mut chart = Flowchart::new("t");
        let ids = chain(&mut chart, &dims, 2);
        chart.node_mut(ids[1]).unwrap().outputs[0].next = Some(ids[0]);
        auto_layout(&mut chart, &LayoutConfig::default(), &dims);
        assert_eq!(chart.node(ids[1]).unwrap().pos.x, 800.0);
    }
}
