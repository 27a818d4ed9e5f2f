//! Editor core for branching dialog/quest flowcharts.
//!
//! The [`editor::Editor`] owns the document, the view transform, the
//! selection, the active pointer gesture and the undo tape. Hosts feed it
//! pointer and keyboard input, drain its [`editor::EditorEvent`]s and paint
//! it with [`render`].

pub mod config;
pub mod editor;
pub mod error;
pub mod geometry;
pub mod hit_test;
pub mod history;
pub mod ids;
pub mod interaction;
pub mod interchange;
pub mod model;
pub mod render;
mod ser_de;
pub mod selection;
pub mod storage;

pub use config::EditorConfig;
pub use editor::{Editor, EditorEvent};
pub use error::{EditorError, Result};
pub use geometry::View;
pub use interaction::{Mode, Modifiers, PointerButton};
pub use model::{Flowchart, Node, Output, OutputRef};
pub use selection::Selection;
