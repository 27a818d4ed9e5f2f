//! The engine's native flowchart files.
//!
//! The logic document carries the graph with numeric ids and precomputed
//! back-reference arrays; the UI-state document carries one visual entry per
//! logic node, in the same order. Fields the editor does not interpret are
//! kept in `extra` maps and written back unchanged.

use egui::{Color32, Pos2, Vec2};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{info, warn};

use super::{to_tab_indented, ExportFile};
use crate::{
    config::Dims,
    editor::DEFAULT_FLOWCHART_NAME,
    error::Result,
    ids::{self, NodeId, OutputId},
    model::{
        Flowchart, Node, NodeVisual, Output, OutputVisual, DEFAULT_BORDER_COLOR,
        DEFAULT_LINK_MODE, DEFAULT_OUTPUT_COLOR,
    },
    ser_de,
};

pub const LOGIC_SUFFIX: &str = ".json";
pub const UI_STATE_SUFFIX: &str = ".uistate.json";

fn yes() -> bool {
    true
}

fn default_border_color() -> Color32 {
    DEFAULT_BORDER_COLOR
}

fn default_output_color() -> Color32 {
    DEFAULT_OUTPUT_COLOR
}

fn default_link_mode() -> String {
    DEFAULT_LINK_MODE.to_string()
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LogicFile {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub nodes: Vec<LogicNode>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogicNode {
    pub sid: NodeId,
    #[serde(rename = "pnSIDs", default)]
    pub incoming_nodes: Vec<NodeId>,
    #[serde(rename = "poSIDs", default)]
    pub incoming_outputs: Vec<OutputId>,
    #[serde(rename = "nodeSIDs", default)]
    pub outgoing_nodes: Vec<NodeId>,
    #[serde(default)]
    pub x: f32,
    #[serde(default)]
    pub y: f32,
    #[serde(default)]
    pub w: f32,
    #[serde(default)]
    pub h: f32,
    #[serde(rename = "t", default)]
    pub tag: String,
    #[serde(rename = "s", default)]
    pub start: bool,
    #[serde(rename = "e", default = "yes")]
    pub enabled: bool,
    #[serde(rename = "c", default)]
    pub caption: String,
    #[serde(default)]
    pub outputs: Vec<LogicOutput>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogicOutput {
    pub sid: OutputId,
    #[serde(rename = "cnSID", default)]
    pub next: Option<NodeId>,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub value: String,
    #[serde(rename = "enable", default = "yes")]
    pub enabled: bool,
    #[serde(default)]
    pub default: bool,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UiStateFile {
    /// Camera fields (`z`, `sx`, `sy`).
    #[serde(default)]
    pub flowchart: Map<String, Value>,
    #[serde(default)]
    pub nodes: Vec<UiNode>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UiNode {
    #[serde(default)]
    pub node: UiNodeVisual,
    #[serde(default)]
    pub outputs: Vec<UiOutputVisual>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UiNodeVisual {
    #[serde(
        default = "default_border_color",
        serialize_with = "ser_de::serialize_color",
        deserialize_with = "ser_de::deserialize_color"
    )]
    pub color: Color32,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Default for UiNodeVisual {
    fn default() -> Self {
        NodeVisual::default().into()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UiOutputVisual {
    #[serde(
        default = "default_output_color",
        serialize_with = "ser_de::serialize_color",
        deserialize_with = "ser_de::deserialize_color"
    )]
    pub color: Color32,
    #[serde(rename = "linkMode", default = "default_link_mode")]
    pub link_mode: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Default for UiOutputVisual {
    fn default() -> Self {
        OutputVisual::default().into()
    }
}

impl From<NodeVisual> for UiNodeVisual {
    fn from(visual: NodeVisual) -> Self {
        Self {
            color: visual.border_color,
            extra: visual.extra,
        }
    }
}

impl From<UiNodeVisual> for NodeVisual {
    fn from(visual: UiNodeVisual) -> Self {
        Self {
            border_color: visual.color,
            extra: visual.extra,
        }
    }
}

impl From<OutputVisual> for UiOutputVisual {
    fn from(visual: OutputVisual) -> Self {
        Self {
            color: visual.color,
            link_mode: visual.link_mode,
            extra: visual.extra,
        }
    }
}

impl From<UiOutputVisual> for OutputVisual {
    fn from(visual: UiOutputVisual) -> Self {
        Self {
            color: visual.color,
            link_mode: visual.link_mode,
            extra: visual.extra,
        }
    }
}

/// Both engine documents, still in their serde shape.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EngineDocuments {
    pub logic: LogicFile,
    pub ui_state: UiStateFile,
}

impl EngineDocuments {
    /// Splits a flowchart into the two documents. Back-reference arrays are
    /// derived from the current links; links to missing nodes are written as
    /// `null`.
    pub fn from_flowchart(flowchart: &Flowchart) -> Self {
        let links = flowchart.connectivity();
        let mut logic_nodes = Vec::with_capacity(flowchart.len());
        let mut ui_nodes = Vec::with_capacity(flowchart.len());

        for node in flowchart.nodes() {
            let outputs = node
                .outputs
                .iter()
                .map(|output| LogicOutput {
                    sid: output.sid,
                    next: output.next.filter(|target| flowchart.contains(*target)),
                    name: output.name.clone(),
                    value: output.value.clone(),
                    enabled: output.enabled,
                    default: output.is_default(),
                    extra: output.extra.clone(),
                })
                .collect();
            logic_nodes.push(LogicNode {
                sid: node.sid,
                incoming_nodes: links.incoming_nodes(node.sid).to_vec(),
                incoming_outputs: links.incoming_outputs(node.sid).to_vec(),
                outgoing_nodes: links.outgoing_nodes(node.sid).to_vec(),
                // Positions are written as whole world units.
                x: node.pos.x.round(),
                y: node.pos.y.round(),
                w: node.size.x,
                h: node.size.y,
                tag: node.tag.clone(),
                start: node.is_start(),
                enabled: node.enabled,
                caption: node.caption.clone(),
                outputs,
                extra: node.extra.clone(),
            });
            ui_nodes.push(UiNode {
                node: node.visual.clone().into(),
                outputs: node.outputs.iter().map(|o| o.visual.clone().into()).collect(),
            });
        }

        Self {
            logic: LogicFile {
                name: flowchart.name.clone(),
                nodes: logic_nodes,
                extra: flowchart.extra.clone(),
            },
            ui_state: UiStateFile {
                flowchart: flowchart.ui_extra.clone(),
                nodes: ui_nodes,
            },
        }
    }

    /// Joins the two documents into a flowchart.
    ///
    /// Visual entries are matched to logic nodes by position. Missing entries
    /// get default visuals and surplus entries are dropped. Duplicate start or
    /// default flags are repaired, dangling links are cleared and the id
    /// counter is moved past every loaded id.
    pub fn into_flowchart(self) -> Flowchart {
        let Self { logic, ui_state } = self;
        let mut visuals = ui_state.nodes;
        if visuals.len() != logic.nodes.len() {
            warn!(
                logic = logic.nodes.len(),
                ui_state = visuals.len(),
                "UI state does not match the logic nodes"
            );
        }
        visuals.resize_with(logic.nodes.len(), UiNode::default);

        let dims = Dims::default();
        let nodes = logic
            .nodes
            .into_iter()
            .zip(visuals)
            .map(|(node, visual)| node.into_node(visual, &dims))
            .collect();

        let mut flowchart = Flowchart::from_nodes(logic.name, nodes);
        flowchart.extra = logic.extra;
        flowchart.ui_extra = ui_state.flowchart;
        ids::reserve_above(flowchart.max_id());
        flowchart.rebuild_connectivity();
        flowchart
    }
}

impl LogicNode {
    fn into_node(self, visual: UiNode, dims: &Dims) -> Node {
        let mut output_visuals = visual.outputs;
        output_visuals.resize_with(self.outputs.len(), UiOutputVisual::default);

        let mut node = Node::empty(self.sid, Pos2::new(self.x, self.y), dims);
        node.size = Vec2::new(self.w, self.h);
        node.caption = self.caption;
        node.tag = self.tag;
        node.enabled = self.enabled;
        node.set_start_flag(self.start);
        node.visual = visual.node.into();
        node.extra = self.extra;
        node.outputs = self
            .outputs
            .into_iter()
            .zip(output_visuals)
            .map(|(output, visual)| {
                let mut out = Output::with_id(output.sid, output.name, output.value);
                out.enabled = output.enabled;
                out.set_default_flag(output.default);
                out.next = output.next;
                out.visual = visual.into();
                out.extra = output.extra;
                out
            })
            .collect();
        node
    }
}

/// The two files written by an engine export.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineExport {
    pub logic: ExportFile,
    pub ui_state: ExportFile,
}

pub fn export(flowchart: &Flowchart) -> Result<EngineExport> {
    let docs = EngineDocuments::from_flowchart(flowchart);
    let name = if flowchart.name.is_empty() {
        DEFAULT_FLOWCHART_NAME
    } else {
        flowchart.name.as_str()
    };
    let export = EngineExport {
        logic: ExportFile {
            file_name: format!("{name}{LOGIC_SUFFIX}"),
            contents: to_tab_indented(&docs.logic)?,
        },
        ui_state: ExportFile {
            file_name: format!("{name}{UI_STATE_SUFFIX}"),
            contents: to_tab_indented(&docs.ui_state)?,
        },
    };
    info!(nodes = flowchart.len(), %name, "exported engine files");
    Ok(export)
}

/// Parses a logic file and its UI-state companion. Both are required.
pub fn import(logic: &str, ui_state: &str) -> Result<Flowchart> {
    let docs = EngineDocuments {
        logic: serde_json::from_str(logic)?,
        ui_state: serde_json::from_str(ui_state)?,
    };
    Ok(docs.into_flowchart())
}
