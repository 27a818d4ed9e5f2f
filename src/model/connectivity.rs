use std::collections::HashMap;

use crate::ids::{NodeId, OutputId};

use super::Flowchart;

/// A link that resolves to an existing node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Connection {
    pub source: NodeId,
    pub output: OutputId,
    pub output_index: usize,
    pub target: NodeId,
}

/// Back-references of one node.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Backrefs {
    /// Source node of every incoming link, one entry per link.
    pub incoming_nodes: Vec<NodeId>,
    /// Output of every incoming link, parallel to `incoming_nodes`.
    pub incoming_outputs: Vec<OutputId>,
    /// Distinct targets of this node's outputs.
    pub outgoing_nodes: Vec<NodeId>,
}

/// Back-reference index over a flowchart. Always derived from the links,
/// never edited by hand.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Connectivity {
    refs: HashMap<NodeId, Backrefs>,
}

impl Connectivity {
    pub fn build(flowchart: &Flowchart) -> Self {
        let mut refs: HashMap<NodeId, Backrefs> = flowchart
            .nodes()
            .iter()
            .map(|n| (n.sid, Backrefs::default()))
            .collect();

        for link in flowchart.connections() {
            if let Some(source) = refs.get_mut(&link.source) {
                if !source.outgoing_nodes.contains(&link.target) {
                    source.outgoing_nodes.push(link.target);
                }
            }
            if let Some(target) = refs.get_mut(&link.target) {
                target.incoming_nodes.push(link.source);
                target.incoming_outputs.push(link.output);
            }
        }

        Self { refs }
    }

    pub fn get(&self, node: NodeId) -> Option<&Backrefs> {
        self.refs.get(&node)
    }

    pub fn incoming_nodes(&self, node: NodeId) -> &[NodeId] {
        self.refs
            .get(&node)
            .map(|r| r.incoming_nodes.as_slice())
            .unwrap_or_default()
    }

    pub fn incoming_outputs(&self, node: NodeId) -> &[OutputId] {
        self.refs
            .get(&node)
            .map(|r| r.incoming_outputs.as_slice())
            .unwrap_or_default()
    }

    pub fn outgoing_nodes(&self, node: NodeId) -> &[NodeId] {
        self.refs
            .get(&node)
            .map(|r| r.outgoing_nodes.as_slice())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::Dims,
        model::{Node, Output},
    };
    use egui::pos2;

    #[test]
    fn test_fan_in_and_distinct_outgoing() {
        let dims = Dims::default();
        let mut chart = Flowchart::new("links");
        let mut a = Node::new(pos2(0.0, 0.0), &dims);
        a.outputs.push(Output::new("Option 1", "Value 1"));
        let b = Node::new(pos2(500.0, 0.0), &dims);
        let mut c = Node::new(pos2(500.0, 300.0), &dims);
        let (a_id, b_id, c_id) = (a.sid, b.sid, c.sid);
        a.outputs[0].next = Some(b_id);
        a.outputs[1].next = Some(b_id);
        c.outputs[0].next = Some(b_id);
        chart.push_node(a);
        chart.push_node(b);
        chart.push_node(c);

        let links = chart.rebuild_connectivity();
        assert_eq!(links.outgoing_nodes(a_id), &[b_id]);
        assert_eq!(links.incoming_nodes(b_id), &[a_id, a_id, c_id]);
        assert_eq!(links.incoming_outputs(b_id).len(), 3);
        assert!(links.incoming_nodes(a_id).is_empty());
    }

    #[test]
    fn test_rebuild_is_idempotent() {
        let dims = Dims::default();
        let mut chart = Flowchart::new("idem");
        let mut a = Node::new(pos2(0.0, 0.0), &dims);
        let b = Node::new(pos2(500.0, 0.0), &dims);
        a.outputs[0].next = Some(b.sid);
        chart.push_node(a);
        chart.push_node(b);
        let first = chart.rebuild_connectivity();
        let second = chart.rebuild_connectivity();
        assert_eq!(first, second);
    }
}
