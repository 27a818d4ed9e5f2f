//! File formats the editor reads and writes.
//!
//! * [`engine`]: the game engine's two-file layout (`<name>.json` logic plus
//!   `<name>.uistate.json` visuals).
//! * [`project`]: the editor's own `.flowproj` wrapper around both engine
//!   documents.
//! * [`miniflow`]: a topology-only format keyed by readable string ids.
//! * [`layout`]: the breadth-first placement applied to miniflow imports.

pub mod engine;
pub mod layout;
pub mod miniflow;
pub mod project;

use serde::Serialize;
use serde_json::ser::PrettyFormatter;

use crate::error::Result;

/// A file produced by an export, ready to be handed to the file collaborator.
#[derive(Debug, Clone, PartialEq)]
pub struct ExportFile {
    pub file_name: String,
    pub contents: String,
}

/// Pretty-prints with tab indentation, the way the engine writes its files.
pub(crate) fn to_tab_indented<T: Serialize + ?Sized>(value: &T) -> Result<String> {
    let mut buf = Vec::new();
    let formatter = PrettyFormatter::with_indent(b"\t");
    let mut serializer = serde_json::Serializer::with_formatter(&mut buf, formatter);
    value.serialize(&mut serializer)?;
    // serde_json only ever writes valid UTF-8.
    Ok(String::from_utf8_lossy(&buf).into_owned())
}
