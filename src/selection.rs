use crate::{
    ids::{NodeId, OutputId},
    model::{Flowchart, OutputRef},
};

/// Current selection. Holds ids, never references, so it survives a
/// wholesale replacement of the flowchart and can be re-resolved against it.
/// Nodes and connections are separate variants, so the two kinds never mix.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Selection {
    #[default]
    None,
    Nodes(Vec<NodeId>),
    Connections(Vec<OutputRef>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionKind {
    None,
    Nodes,
    Connections,
}

impl Selection {
    pub fn kind(&self) -> SelectionKind {
        match self {
            Selection::None => SelectionKind::None,
            Selection::Nodes(_) => SelectionKind::Nodes,
            Selection::Connections(_) => SelectionKind::Connections,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn len(&self) -> usize {
        match self {
            Selection::None => 0,
            Selection::Nodes(ids) => ids.len(),
            Selection::Connections(refs) => refs.len(),
        }
    }

    pub fn clear(&mut self) {
        *self = Selection::None;
    }

    pub fn nodes(&self) -> &[NodeId] {
        match self {
            Selection::Nodes(ids) => ids,
            _ => &[],
        }
    }

    pub fn connections(&self) -> &[OutputRef] {
        match self {
            Selection::Connections(refs) => refs,
            _ => &[],
        }
    }

    pub fn contains_node(&self, id: NodeId) -> bool {
        self.nodes().contains(&id)
    }

    pub fn contains_connection(&self, output: OutputId) -> bool {
        self.connections().iter().any(|r| r.output == output)
    }

    /// Replaces the selection with a single node, or clears it.
    pub fn select_node(&mut self, id: Option<NodeId>) {
        *self = match id {
            Some(id) => Selection::Nodes(vec![id]),
            None => Selection::None,
        };
    }

    /// Adds a node, dropping any connection selection first.
    pub fn add_node(&mut self, id: NodeId) {
        match self {
            Selection::Nodes(ids) => {
                if !ids.contains(&id) {
                    ids.push(id);
                }
            }
            _ => *self = Selection::Nodes(vec![id]),
        }
    }

    pub fn toggle_node(&mut self, id: NodeId) {
        if self.contains_node(id) {
            self.remove_node(id);
        } else {
            self.add_node(id);
        }
    }

    pub fn remove_node(&mut self, id: NodeId) {
        if let Selection::Nodes(ids) = self {
            ids.retain(|n| *n != id);
            if ids.is_empty() {
                *self = Selection::None;
            }
        }
    }

    /// Adds a connection, dropping any node selection first.
    pub fn add_connection(&mut self, at: OutputRef) {
        match self {
            Selection::Connections(refs) => {
                if !refs.iter().any(|r| r.output == at.output) {
                    refs.push(at);
                }
            }
            _ => *self = Selection::Connections(vec![at]),
        }
    }

    pub fn toggle_connection(&mut self, at: OutputRef) {
        if self.contains_connection(at.output) {
            self.remove_connection(at.output);
        } else {
            self.add_connection(at);
        }
    }

    pub fn remove_connection(&mut self, output: OutputId) {
        if let Selection::Connections(refs) = self {
            refs.retain(|r| r.output != output);
            if refs.is_empty() {
                *self = Selection::None;
            }
        }
    }

    /// Re-resolves the selection against `flowchart` by id. Nodes that no
    /// longer exist are dropped; a connection follows its output to whichever
    /// node owns it now. An empty result collapses to `None`.
    pub fn resolve(&self, flowchart: &Flowchart) -> Selection {
        let resolved = match self {
            Selection::None => Selection::None,
            Selection::Nodes(ids) => Selection::Nodes(
                flowchart
                    .nodes()
                    .iter()
                    .filter(|n| ids.contains(&n.sid))
                    .map(|n| n.sid)
                    .collect(),
            ),
            Selection::Connections(refs) => Selection::Connections(
                flowchart
                    .nodes()
                    .iter()
                    .flat_map(|n| {
                        n.outputs
                            .iter()
                            .filter(|o| refs.iter().any(|r| r.output == o.sid))
                            .map(move |o| OutputRef {
                                node: n.sid,
                                output: o.sid,
                            })
                    })
                    .collect(),
            ),
        };
        if resolved.is_empty() {
            Selection::None
        } else {
            resolved
        }
    }
}
