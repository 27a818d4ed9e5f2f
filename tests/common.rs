//! Shared fixtures for the integration tests.
use egui::Pos2;
use questflow::{ids::NodeId, Editor, EditorConfig, Mode, Modifiers, PointerButton};

/// Four nodes in two islands: `a -> b` and `c -> d`.
#[allow(dead_code)]
pub const TWO_ISLANDS: &str = r#"{
    "root": "a",
    "nodes": {
        "a": { "caption": "A", "outputs": [{ "name": "Go", "next": "b" }] },
        "b": { "caption": "B", "outputs": [] },
        "c": { "caption": "C", "outputs": [{ "next": "d" }] },
        "d": { "caption": "D", "outputs": [] }
    }
}"#;

/// Editor in edit mode at zoom 1 with no pan, so screen and world
/// coordinates agree.
#[allow(dead_code)]
pub fn editing() -> Editor {
    let mut config = EditorConfig::default();
    config.zoom.initial = 1.0;
    let mut editor = Editor::new(config);
    editor.set_mode(Mode::Edit);
    editor
}

#[allow(dead_code)]
pub fn click(editor: &mut Editor, pos: Pos2) {
    editor.pointer_down(pos, PointerButton::Primary, Modifiers::NONE);
    editor.pointer_up(pos, Modifiers::NONE);
}

#[allow(dead_code)]
pub fn drag(editor: &mut Editor, from: Pos2, to: Pos2) {
    editor.pointer_down(from, PointerButton::Primary, Modifiers::NONE);
    editor.pointer_move(to);
    editor.pointer_up(to, Modifiers::NONE);
}

/// Screen position of a node's output socket.
#[allow(dead_code)]
pub fn socket(editor: &Editor, node: NodeId, index: usize) -> Pos2 {
    let node = editor.flowchart().node(node).expect("node exists");
    editor.hit_tester().output_socket_pos(node, index)
}

/// `(caption, output index, target caption)` for every link, sorted.
#[allow(dead_code)]
pub fn links_by_caption(editor: &Editor) -> Vec<(String, usize, String)> {
    let chart = editor.flowchart();
    let mut links: Vec<_> = chart
        .connections()
        .map(|c| {
            (
                chart.node(c.source).unwrap().caption.clone(),
                c.output_index,
                chart.node(c.target).unwrap().caption.clone(),
            )
        })
        .collect();
    links.sort();
    links
}
