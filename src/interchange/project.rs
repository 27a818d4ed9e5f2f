//! The editor's own `.flowproj` document: both engine documents wrapped with
//! a format tag and a little metadata.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;

use super::{
    engine::{EngineDocuments, LogicFile, UiStateFile},
    to_tab_indented, ExportFile,
};
use crate::{
    error::{EditorError, Result},
    ids::now_millis,
    model::Flowchart,
};

pub const FORMAT: &str = "flowproj";
pub const VERSION: &str = "1.1.0";
pub const EXTENSION: &str = ".flowproj";
pub const UNTITLED: &str = "Untitled";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectFile {
    pub format: String,
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub meta: ProjectMeta,
    #[serde(rename = "projectData")]
    pub project_data: ProjectData,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProjectMeta {
    #[serde(default)]
    pub title: String,
    /// Epoch milliseconds.
    #[serde(default)]
    pub modified: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectData {
    pub logic: LogicFile,
    pub uistate: UiStateFile,
}

fn title_of(flowchart: &Flowchart) -> &str {
    if flowchart.name.is_empty() {
        UNTITLED
    } else {
        &flowchart.name
    }
}

impl ProjectFile {
    pub fn new(flowchart: &Flowchart) -> Self {
        let docs = EngineDocuments::from_flowchart(flowchart);
        Self {
            format: FORMAT.to_string(),
            version: VERSION.to_string(),
            meta: ProjectMeta {
                title: title_of(flowchart).to_string(),
                modified: now_millis(),
            },
            project_data: ProjectData {
                logic: docs.logic,
                uistate: docs.ui_state,
            },
        }
    }

    pub fn into_flowchart(self) -> Flowchart {
        EngineDocuments {
            logic: self.project_data.logic,
            ui_state: self.project_data.uistate,
        }
        .into_flowchart()
    }
}

/// Serializes the project as `<name>.flowproj`.
pub fn save(flowchart: &Flowchart) -> Result<ExportFile> {
    let contents = to_tab_indented(&ProjectFile::new(flowchart))?;
    Ok(ExportFile {
        file_name: format!("{}{EXTENSION}", title_of(flowchart)),
        contents,
    })
}

/// Parses a project file. Anything without the `flowproj` format tag is
/// rejected before the payload is looked at.
pub fn open(text: &str) -> Result<Flowchart> {
    let value: Value = serde_json::from_str(text)?;
    match value.get("format").and_then(Value::as_str) {
        Some(FORMAT) => {}
        Some(other) => {
            return Err(EditorError::NotAProject(format!(
                "unexpected format tag `{other}`"
            )))
        }
        None => return Err(EditorError::NotAProject("missing format tag".into())),
    }
    let project: ProjectFile = serde_json::from_value(value)?;
    info!(
        title = %project.meta.title,
        version = %project.version,
        "opened project"
    );
    Ok(project.into_flowchart())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{config::Dims, model::Node};
    use egui::pos2;
    use serde_json::json;

    #[test]
    fn test_save_then_open() {
        let dims = Dims::default();
        let mut chart = Flowchart::new("chapter one");
        chart.push_node(Node::new(pos2(10.0, 20.0), &dims));
        chart.push_node(Node::new(pos2(510.0, 20.0), &dims));
        let target = chart.nodes()[1].sid;
        chart.nodes_mut().next().unwrap().outputs[0].next = Some(target);

        let file = save(&chart).unwrap();
        assert_eq!(file.file_name, "chapter one.flowproj");
        let value: Value = serde_json::from_str(&file.contents).unwrap();
        assert_eq!(value["format"], json!("flowproj"));
        assert_eq!(value["version"], json!("1.1.0"));
        assert_eq!(value["meta"]["title"], json!("chapter one"));
        assert!(value["meta"]["modified"].as_u64().unwrap() > 0);
        assert!(value["projectData"]["uistate"]["nodes"].is_array());

        assert_eq!(open(&file.contents).unwrap(), chart);
    }

    #[test]
    fn test_unnamed_project_is_untitled() {
        let file = save(&Flowchart::default()).unwrap();
        assert_eq!(file.file_name, "Untitled.flowproj");
    }

    #[test]
    fn test_rejects_other_documents() {
        let err = open(r#"{"format": "miniflow", "projectData": {}}"#).unwrap_err();
        assert!(matches!(err, EditorError::NotAProject(_)));
        let err = open(r#"{"root": "a", "nodes": {}}"#).unwrap_err();
        assert!(matches!(err, EditorError::NotAProject(_)));
        let err = open("not json").unwrap_err();
        assert!(matches!(err, EditorError::Json(_)));
    }
}
