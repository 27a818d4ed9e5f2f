//! The flowchart: nodes, their outputs and the cosmetic data that travels
//! with them.
//!
//! Visual metadata is owned by the node and output it decorates, so the
//! node list and the visual list cannot drift apart. The engine files still
//! store them as two parallel arrays; `interchange::engine` splits and joins
//! them at the file boundary.

pub mod connectivity;

use std::collections::HashSet;

use egui::{Color32, Pos2, Rect, Vec2};
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::{
    config::Dims,
    ids::{next_node_id, next_output_id, NodeId, OutputId},
};

pub use connectivity::{Backrefs, Connection, Connectivity};

pub const DEFAULT_NODE_CAPTION: &str = "New Node";
pub const DEFAULT_BORDER_COLOR: Color32 = Color32::from_rgb(204, 204, 204);
pub const DEFAULT_OUTPUT_COLOR: Color32 = Color32::BLACK;
pub const DEFAULT_LINK_MODE: &str = "line";

/// Addresses one output of one node. A selected connection is stored this way.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OutputRef {
    pub node: NodeId,
    pub output: OutputId,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NodeVisual {
    pub border_color: Color32,
    /// Engine UI fields the editor does not interpret (`propertiesBar`, ...).
    pub extra: Map<String, Value>,
}

impl Default for NodeVisual {
    fn default() -> Self {
        let mut extra = Map::new();
        extra.insert("propertiesBar".into(), Value::Object(Map::new()));
        extra.insert("nodeTable".into(), Value::Object(Map::new()));
        Self {
            border_color: DEFAULT_BORDER_COLOR,
            extra,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct OutputVisual {
    pub color: Color32,
    pub link_mode: String,
    pub extra: Map<String, Value>,
}

impl Default for OutputVisual {
    fn default() -> Self {
        let mut extra = Map::new();
        extra.insert("propertiesBar".into(), Value::Object(Map::new()));
        Self {
            color: DEFAULT_OUTPUT_COLOR,
            link_mode: DEFAULT_LINK_MODE.to_string(),
            extra,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Output {
    pub sid: OutputId,
    pub name: String,
    pub value: String,
    pub enabled: bool,
    is_default: bool,
    /// Target node. Only meaningful while that node exists.
    pub next: Option<NodeId>,
    pub visual: OutputVisual,
    pub extra: Map<String, Value>,
}

impl Output {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self::with_id(next_output_id(), name, value)
    }

    pub fn with_id(sid: OutputId, name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            sid,
            name: name.into(),
            value: value.into(),
            enabled: true,
            is_default: false,
            next: None,
            visual: OutputVisual::default(),
            extra: Map::new(),
        }
    }

    pub fn is_default(&self) -> bool {
        self.is_default
    }

    /// Raw flag access for loaders; [`Flowchart::from_nodes`] repairs
    /// duplicates afterwards.
    pub(crate) fn set_default_flag(&mut self, on: bool) {
        self.is_default = on;
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub sid: NodeId,
    /// Centre of the node in world units.
    pub pos: Pos2,
    /// Stored width/height. The rendered height may be larger, see
    /// [`Dims::effective_height`].
    pub size: Vec2,
    pub caption: String,
    pub tag: String,
    pub enabled: bool,
    is_start: bool,
    pub outputs: Vec<Output>,
    pub visual: NodeVisual,
    /// Engine logic fields the editor does not interpret (`ty`, `pi`, ...).
    pub extra: Map<String, Value>,
}

impl Node {
    /// A fresh node with one output, sized to fit it.
    pub fn new(pos: Pos2, dims: &Dims) -> Self {
        let mut node = Self::empty(next_node_id(), pos, dims);
        let (name, value) = node.next_output_label();
        node.outputs.push(Output::new(name, value));
        node.size.y = dims.content_height(node.outputs.len());
        node
    }

    /// A node without outputs.
    pub fn empty(sid: NodeId, pos: Pos2, dims: &Dims) -> Self {
        Self {
            sid,
            pos,
            size: Vec2::new(dims.node_width, dims.content_height(0)),
            caption: DEFAULT_NODE_CAPTION.to_string(),
            tag: String::new(),
            enabled: true,
            is_start: false,
            outputs: Vec::new(),
            visual: NodeVisual::default(),
            extra: default_node_extra(),
        }
    }

    pub fn is_start(&self) -> bool {
        self.is_start
    }

    pub(crate) fn set_start_flag(&mut self, on: bool) {
        self.is_start = on;
    }

    pub fn output(&self, id: OutputId) -> Option<&Output> {
        self.outputs.iter().find(|o| o.sid == id)
    }

    pub fn output_mut(&mut self, id: OutputId) -> Option<&mut Output> {
        self.outputs.iter_mut().find(|o| o.sid == id)
    }

    pub fn output_index(&self, id: OutputId) -> Option<usize> {
        self.outputs.iter().position(|o| o.sid == id)
    }

    /// Sets or clears the default flag of one output; setting it clears every
    /// other output of this node.
    pub fn set_default_output(&mut self, index: usize, on: bool) {
        if index >= self.outputs.len() {
            return;
        }
        if on {
            for output in &mut self.outputs {
                output.is_default = false;
            }
        }
        self.outputs[index].is_default = on;
    }

    /// First free `Option i` / `Value i` pair.
    pub fn next_output_label(&self) -> (String, String) {
        let mut i = 0;
        while self.outputs.iter().any(|o| o.name == format!("Option {i}")) {
            i += 1;
        }
        (format!("Option {i}"), format!("Value {i}"))
    }

    pub fn effective_height(&self, dims: &Dims) -> f32 {
        dims.effective_height(self.size.y, self.outputs.len())
    }

    /// World-space bounds using the effective height.
    pub fn world_rect(&self, dims: &Dims) -> Rect {
        Rect::from_center_size(self.pos, Vec2::new(self.size.x, self.effective_height(dims)))
    }

    pub fn min_size(&self, dims: &Dims) -> Vec2 {
        dims.min_size(self.outputs.len())
    }
}

fn default_node_extra() -> Map<String, Value> {
    let mut extra = Map::new();
    extra.insert("pi".into(), Value::from(0));
    extra.insert("ty".into(), Value::from("dictionary"));
    extra.insert("pr".into(), Value::Bool(false));
    extra.insert("prfsid".into(), Value::Null);
    extra.insert("prfnsid".into(), Value::Null);
    extra
}

/// The whole document. Node order matters: it is the paint order and the
/// fallback root is the first node.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Flowchart {
    pub name: String,
    nodes: Vec<Node>,
    /// Engine logic fields on the flowchart itself (`sid`, `preset-nodes`, ...).
    pub extra: Map<String, Value>,
    /// Engine UI-state fields on the flowchart itself (`z`, `sx`, `sy`).
    pub ui_extra: Map<String, Value>,
}

impl Flowchart {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Builds a flowchart from loaded nodes, repairing flag invariants: only
    /// the first start node and the first default output of each node keep
    /// their flag.
    pub fn from_nodes(name: impl Into<String>, nodes: Vec<Node>) -> Self {
        let mut flowchart = Self::new(name);
        let mut seen_start = false;
        for mut node in nodes {
            if node.is_start {
                if seen_start {
                    warn!(node = %node.sid, "dropping duplicate start flag");
                    node.is_start = false;
                }
                seen_start = true;
            }
            let mut seen_default = false;
            for output in &mut node.outputs {
                if output.is_default {
                    if seen_default {
                        warn!(output = %output.sid, "dropping duplicate default flag");
                        output.is_default = false;
                    }
                    seen_default = true;
                }
            }
            flowchart.nodes.push(node);
        }
        flowchart
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn into_nodes(self) -> Vec<Node> {
        self.nodes
    }

    pub fn nodes_mut(&mut self) -> impl Iterator<Item = &mut Node> {
        self.nodes.iter_mut()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.iter().find(|n| n.sid == id)
    }

    pub fn node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.iter_mut().find(|n| n.sid == id)
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.node(id).is_some()
    }

    pub fn output(&self, at: OutputRef) -> Option<&Output> {
        self.node(at.node)?.output(at.output)
    }

    pub fn output_mut(&mut self, at: OutputRef) -> Option<&mut Output> {
        self.node_mut(at.node)?.output_mut(at.output)
    }

    /// Finds the node that owns an output.
    pub fn owner_of(&self, output: OutputId) -> Option<&Node> {
        self.nodes.iter().find(|n| n.output(output).is_some())
    }

    /// Appends a node; a start flag on it takes over from any other node.
    pub fn push_node(&mut self, node: Node) {
        let id = node.sid;
        let start = node.is_start;
        self.nodes.push(node);
        if start {
            self.set_start(Some(id));
        }
    }

    /// Removes a node together with every link that pointed at it.
    pub fn remove_node(&mut self, id: NodeId) -> Option<Node> {
        let index = self.nodes.iter().position(|n| n.sid == id)?;
        let removed = self.nodes.remove(index);
        for node in &mut self.nodes {
            for output in &mut node.outputs {
                if output.next == Some(id) {
                    output.next = None;
                }
            }
        }
        Some(removed)
    }

    /// Makes `id` the only start node, or clears the start flag everywhere.
    pub fn set_start(&mut self, id: Option<NodeId>) {
        for node in &mut self.nodes {
            node.is_start = Some(node.sid) == id;
        }
    }

    /// Clears the start flag of one node only.
    pub fn unset_start(&mut self, id: NodeId) {
        if let Some(node) = self.node_mut(id) {
            node.is_start = false;
        }
    }

    pub fn start_node(&self) -> Option<&Node> {
        self.nodes.iter().find(|n| n.is_start)
    }

    /// The flagged start node, else the first node.
    pub fn root(&self) -> Option<&Node> {
        self.start_node().or_else(|| self.nodes.first())
    }

    /// Every link whose target exists, in node and output order.
    pub fn connections(&self) -> impl Iterator<Item = Connection> + '_ {
        self.nodes.iter().flat_map(move |node| {
            node.outputs
                .iter()
                .enumerate()
                .filter_map(move |(index, output)| {
                    let target = output.next?;
                    self.contains(target).then_some(Connection {
                        source: node.sid,
                        output: output.sid,
                        output_index: index,
                        target,
                    })
                })
        })
    }

    /// Nulls links to missing nodes and returns the fresh back-reference
    /// index.
    pub fn rebuild_connectivity(&mut self) -> Connectivity {
        let ids: HashSet<NodeId> = self.nodes.iter().map(|n| n.sid).collect();
        for node in &mut self.nodes {
            for output in &mut node.outputs {
                if let Some(target) = output.next {
                    if !ids.contains(&target) {
                        debug!(output = %output.sid, %target, "healing dangling link");
                        output.next = None;
                    }
                }
            }
        }
        self.connectivity()
    }

    pub fn connectivity(&self) -> Connectivity {
        Connectivity::build(self)
    }

    /// World bounds of every node, using effective heights.
    pub fn bounds(&self, dims: &Dims) -> Option<Rect> {
        self.nodes
            .iter()
            .map(|n| n.world_rect(dims))
            .reduce(|a, b| a.union(b))
    }

    pub fn max_id(&self) -> u64 {
        self.nodes
            .iter()
            .flat_map(|n| std::iter::once(n.sid.0).chain(n.outputs.iter().map(|o| o.sid.0)))
            .max()
            .unwrap_or_default()
    }

    pub(crate) fn nodes_vec_mut(&mut self) -> &mut Vec<Node> {
        &mut self.nodes
    }
}
