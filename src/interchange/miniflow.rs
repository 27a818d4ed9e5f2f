//! MiniFlow: a topology-only format keyed by readable string ids.
//!
//! ```json
//! { "root": "intro",
//!   "nodes": { "intro": { "caption": "Intro", "tag": "intro",
//!                         "outputs": [{ "name": "Next", "value": "", "next": "end" }] } } }
//! ```

use std::collections::{HashMap, HashSet};

use egui::Pos2;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{json, Map, Value};
use tracing::info;

use super::{layout::auto_layout, ExportFile};
use crate::{
    config::EditorConfig,
    error::{EditorError, Result},
    ids::{next_node_id, NodeId},
    model::{Flowchart, Node, Output},
};

pub const IMPORTED_NAME: &str = "Imported_MiniFlow";
pub const EXTENSION: &str = ".miniflow.json";
const DEFAULT_OUTPUT_NAME: &str = "Next";
const TERMINAL_OUTPUT_NAME: &str = "End";
const FALLBACK_ID: &str = "node";
const CANVAS_SIZE: u32 = 30000;

// Node entries are read leniently: a field of the wrong type counts as
// missing rather than failing the whole import.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MiniNode {
    #[serde(default, deserialize_with = "lenient_text")]
    pub caption: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub tag: Option<String>,
    #[serde(default, deserialize_with = "lenient_outputs")]
    pub outputs: Vec<MiniOutput>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MiniOutput {
    #[serde(default, deserialize_with = "lenient_text")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub value: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub next: Option<String>,
}

fn lenient_text<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => Some(s),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    })
}

fn lenient_outputs<'de, D>(deserializer: D) -> std::result::Result<Vec<MiniOutput>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Array(items) => items
            .into_iter()
            .map(|item| serde_json::from_value(item).unwrap_or_default())
            .collect(),
        _ => Vec::new(),
    })
}

/// Lowercase readable id: runs of anything but `a-z0-9` collapse to `_`.
fn readable_id(node: &Node) -> String {
    let source = if !node.tag.is_empty() {
        &node.tag
    } else if !node.caption.is_empty() {
        &node.caption
    } else {
        FALLBACK_ID
    };
    let mut id = String::new();
    let mut gap = false;
    for c in source.trim().to_lowercase().chars() {
        if c.is_ascii_lowercase() || c.is_ascii_digit() {
            if gap && !id.is_empty() {
                id.push('_');
            }
            gap = false;
            id.push(c);
        } else {
            gap = true;
        }
    }
    if id.is_empty() {
        FALLBACK_ID.to_string()
    } else {
        id
    }
}

/// Builds the MiniFlow document. Node order follows the flowchart; the root
/// is the start node, else the first node.
pub fn to_value(flowchart: &Flowchart) -> Result<Value> {
    let root = flowchart.root().ok_or(EditorError::EmptyGraph)?.sid;

    let mut used = HashSet::new();
    let mut names: HashMap<NodeId, String> = HashMap::new();
    for node in flowchart.nodes() {
        let base = readable_id(node);
        let mut candidate = base.clone();
        let mut counter = 2;
        while used.contains(&candidate) {
            candidate = format!("{base}_{counter}");
            counter += 1;
        }
        used.insert(candidate.clone());
        names.insert(node.sid, candidate);
    }

    let mut nodes = Map::new();
    for node in flowchart.nodes() {
        let mut outputs: Vec<Value> = node
            .outputs
            .iter()
            .map(|o| {
                let name = if o.name.is_empty() {
                    DEFAULT_OUTPUT_NAME
                } else {
                    o.name.as_str()
                };
                let next = o.next.and_then(|t| names.get(&t)).cloned();
                json!({ "name": name, "value": o.value, "next": next })
            })
            .collect();
        if outputs.is_empty() {
            outputs.push(json!({ "name": TERMINAL_OUTPUT_NAME, "value": "", "next": null }));
        }
        nodes.insert(
            names[&node.sid].clone(),
            json!({ "caption": node.caption, "tag": node.tag, "outputs": outputs }),
        );
    }

    Ok(json!({ "root": names[&root], "nodes": nodes }))
}

/// Serializes as `<name>.miniflow.json` with two-space indentation.
pub fn export(flowchart: &Flowchart) -> Result<ExportFile> {
    let contents = serde_json::to_string_pretty(&to_value(flowchart)?)?;
    let name = if flowchart.name.is_empty() {
        "miniflow"
    } else {
        flowchart.name.as_str()
    };
    info!(nodes = flowchart.len(), "exported MiniFlow");
    Ok(ExportFile {
        file_name: format!("{name}{EXTENSION}"),
        contents,
    })
}

/// Parses a MiniFlow document into a laid-out flowchart. Every string id
/// gets a fresh numeric id; `next` references to undeclared ids become
/// empty links. Only the root carries the start flag.
pub fn import(text: &str, config: &EditorConfig) -> Result<Flowchart> {
    let doc: Value = serde_json::from_str(text)?;
    let root = match doc.get("root") {
        Some(Value::String(root)) if !root.is_empty() => root.clone(),
        _ => return Err(EditorError::InvalidFormat("missing `root`".into())),
    };
    let Some(Value::Object(entries)) = doc.get("nodes") else {
        return Err(EditorError::InvalidFormat("missing `nodes`".into()));
    };
    if !entries.contains_key(&root) {
        return Err(EditorError::RootNotFound(root));
    }

    let sids: HashMap<&str, NodeId> = entries
        .keys()
        .map(|key| (key.as_str(), next_node_id()))
        .collect();

    let dims = &config.dims;
    let mut nodes = Vec::with_capacity(entries.len());
    for (key, entry) in entries {
        let mini: MiniNode = serde_json::from_value(entry.clone()).unwrap_or_default();
        let mut node = Node::empty(sids[key.as_str()], Pos2::ZERO, dims);
        node.caption = mini.caption.filter(|c| !c.is_empty()).unwrap_or_else(|| key.clone());
        node.tag = mini.tag.unwrap_or_default();
        node.set_start_flag(*key == root);
        node.outputs = mini
            .outputs
            .into_iter()
            .map(|o| {
                let name = o.name.filter(|n| !n.is_empty());
                let mut output = Output::new(
                    name.unwrap_or_else(|| DEFAULT_OUTPUT_NAME.to_string()),
                    o.value.unwrap_or_default(),
                );
                output.next = o.next.and_then(|next| sids.get(next.as_str()).copied());
                output
            })
            .collect();
        node.size.y = dims.content_height(node.outputs.len());
        nodes.push(node);
    }

    let mut flowchart = Flowchart::from_nodes(IMPORTED_NAME, nodes);
    flowchart.extra.insert("sid".into(), Value::from(next_node_id().0));
    flowchart
        .extra
        .insert("preset-nodes".into(), json!({ "items": [], "subfolders": [] }));
    flowchart.extra.insert("w".into(), Value::from(CANVAS_SIZE));
    flowchart.extra.insert("h".into(), Value::from(CANVAS_SIZE));
    flowchart.ui_extra = json_object(json!({ "z": 1, "sx": 0, "sy": 0 }));

    auto_layout(&mut flowchart, &config.layout, dims);
    info!(nodes = flowchart.len(), %root, "imported MiniFlow");
    Ok(flowchart)
}

fn json_object(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Dims;
    use egui::pos2;

    fn node(chart: &mut Flowchart, caption: &str, tag: &str) -> NodeId {
        let mut n = Node::new(pos2(0.0, 0.0), &Dims::default());
        n.caption = caption.into();
        n.tag = tag.into();
        let id = n.sid;
        chart.push_node(n);
        id
    }

    #[test]
    fn test_readable_ids_and_collisions() {
        let mut chart = Flowchart::new("ids");
        node(&mut chart, "Hello, World!", "");
        node(&mut chart, "ignored", "  Hello World ");
        node(&mut chart, "", "");
        node(&mut chart, "???", "");
        let doc = to_value(&chart).unwrap();
        let keys: Vec<&String> = doc["nodes"].as_object().unwrap().keys().collect();
        assert_eq!(keys, ["hello_world", "hello_world_2", "node", "node_2"]);
        assert_eq!(doc["root"], "hello_world");
    }

    #[test]
    fn test_export_links_and_terminal_output() {
        let mut chart = Flowchart::new("story");
        let a = node(&mut chart, "A", "");
        let b = node(&mut chart, "B", "");
        chart.node_mut(a).unwrap().outputs[0].next = Some(b);
        chart.node_mut(b).unwrap().outputs.clear();
        chart.set_start(Some(b));

        let file = export(&chart).unwrap();
        assert_eq!(file.file_name, "story.miniflow.json");
        assert!(file.contents.contains("\n  \"root\": \"b\""));
        let doc: Value = serde_json::from_str(&file.contents).unwrap();
        assert_eq!(doc["nodes"]["a"]["outputs"][0]["next"], "b");
        assert_eq!(
            doc["nodes"]["b"]["outputs"],
            json!([{ "name": "End", "value": "", "next": null }])
        );
    }

    #[test]
    fn test_empty_graph_cannot_export() {
        assert!(matches!(
            export(&Flowchart::new("x")),
            Err(EditorError::EmptyGraph)
        ));
    }

    #[test]
    fn test_import_builds_nodes() {
        let text = r#"{
            "root": "start",
            "nodes": {
                "start": { "caption": "Start", "outputs": [
                    { "name": "Go", "value": "1", "next": "end" },
                    { "next": "nowhere" }
                ] },
                "end": { "tag": "fin" }
            }
        }"#;
        let config = EditorConfig::default();
        let chart = import(text, &config).unwrap();
        assert_eq!(chart.name, IMPORTED_NAME);
        assert_eq!(chart.len(), 2);

        let start = chart.start_node().unwrap();
        assert_eq!(start.caption, "Start");
        assert_eq!(start.outputs[1].name, "Next");
        assert_eq!(start.outputs[1].next, None);
        assert_eq!(start.size, egui::vec2(420.0, config.dims.content_height(2)));

        let end = chart.nodes().iter().find(|n| n.sid != start.sid).unwrap();
        assert_eq!(end.caption, "end");
        assert_eq!(end.tag, "fin");
        assert!(!end.is_start());
        assert_eq!(start.outputs[0].next, Some(end.sid));
        assert_eq!(end.pos.x, 800.0);
        assert_eq!(chart.extra["w"], json!(30000));
    }

    #[test]
    fn test_import_validation() {
        let config = EditorConfig::default();
        let missing_root = import(r#"{"nodes": {}}"#, &config).unwrap_err();
        assert!(matches!(missing_root, EditorError::InvalidFormat(_)));
        let missing_nodes = import(r#"{"root": "a"}"#, &config).unwrap_err();
        assert!(matches!(missing_nodes, EditorError::InvalidFormat(_)));
        let unknown_root = import(r#"{"root": "a", "nodes": {"b": {}}}"#, &config).unwrap_err();
        assert!(matches!(unknown_root, EditorError::RootNotFound(r) if r == "a"));
    }

    #[test]
    fn test_import_tolerates_loose_node_fields() {
        let text = r#"{
            "root": "a",
            "nodes": {
                "a": { "caption": "A", "outputs": null },
                "b": { "caption": 7, "tag": null, "outputs": [
                    { "name": null, "value": 42, "next": "a" },
                    5
                ] },
                "c": "not a node"
            }
        }"#;
        let chart = import(text, &EditorConfig::default()).unwrap();
        assert_eq!(chart.len(), 3);

        let a = chart.start_node().unwrap();
        assert_eq!(a.caption, "A");
        assert!(a.outputs.is_empty());

        let b = &chart.nodes()[1];
        assert_eq!(b.caption, "7");
        assert_eq!(b.tag, "");
        assert_eq!(b.outputs.len(), 2);
        assert_eq!(b.outputs[0].name, "Next");
        assert_eq!(b.outputs[0].value, "42");
        assert_eq!(b.outputs[0].next, Some(a.sid));
        assert_eq!(b.outputs[1].name, "Next");
        assert_eq!(b.outputs[1].next, None);

        let c = &chart.nodes()[2];
        assert_eq!(c.caption, "c");
        assert!(c.outputs.is_empty());
    }
}
