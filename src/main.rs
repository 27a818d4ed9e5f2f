use std::env;

use eframe::{App, Frame};
use egui::{Key, KeyboardShortcut, Pos2, Sense};
use questflow::{
    ids::NodeId,
    render::{self, Palette},
    storage::{DialogFileAccess, ProjectFiles, SaveOutcome, JSON_FILTER},
    Editor, EditorConfig, EditorEvent, Mode, Modifiers, OutputRef, PointerButton, Result,
};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

const DOWNLOAD_DIR: &str = "downloads";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Action {
    New,
    Open,
    Save,
    SaveAs,
    ImportEngine,
    ImportMiniflow,
    ExportEngine,
    ExportMiniflow,
    Undo,
    Redo,
    RestoreStep(usize),
    Edit,
    SaveAndExit,
    CancelEdit,
    ResetView,
    AddNode,
    Copy,
    Paste,
    Delete,
    Escape,
}

struct QuestflowApp {
    editor: Editor,
    files: ProjectFiles<DialogFileAccess>,
    palette: Palette,
    status: String,
    name_draft: Option<String>,
    show_history: bool,
}

impl QuestflowApp {
    fn new(config: EditorConfig) -> Self {
        let download_dir = env::current_dir()
            .map(|dir| dir.join(DOWNLOAD_DIR))
            .unwrap_or_else(|_| DOWNLOAD_DIR.into());
        Self {
            editor: Editor::new(config),
            files: ProjectFiles::new(DialogFileAccess, download_dir),
            palette: Palette::default(),
            status: String::from("Ready"),
            name_draft: None,
            show_history: false,
        }
    }

    fn apply(&mut self, action: Action) {
        let result = match action {
            Action::New => {
                self.editor.new_flowchart();
                self.files.forget();
                Ok(())
            }
            Action::Open => self.open(),
            Action::Save => self.save(false),
            Action::SaveAs => self.save(true),
            Action::ImportEngine => self.import_engine(),
            Action::ImportMiniflow => self.import_miniflow(),
            Action::ExportEngine => self.export_engine(),
            Action::ExportMiniflow => self.export_miniflow(),
            Action::Undo => {
                self.editor.undo();
                Ok(())
            }
            Action::Redo => {
                self.editor.redo();
                Ok(())
            }
            Action::RestoreStep(index) => self.editor.restore_to_step(index),
            Action::Edit => {
                self.editor.set_mode(Mode::Edit);
                Ok(())
            }
            Action::SaveAndExit => {
                self.editor.save_and_exit();
                Ok(())
            }
            Action::CancelEdit => {
                self.editor.cancel_edit();
                Ok(())
            }
            Action::ResetView => {
                self.editor.reset_view();
                Ok(())
            }
            Action::AddNode => {
                self.editor.add_node_from_toolbar();
                Ok(())
            }
            Action::Copy => {
                self.editor.copy_selection();
                Ok(())
            }
            Action::Paste => {
                self.editor.paste();
                Ok(())
            }
            Action::Delete => {
                self.editor.delete_selection();
                Ok(())
            }
            Action::Escape => {
                self.editor.escape();
                Ok(())
            }
        };
        if let Err(e) = result {
            error!(?action, error = %e, "action failed");
            self.status = format!("Error: {e}");
        }
    }

    fn open(&mut self) -> Result<()> {
        if let Some(file) = self.files.open()? {
            self.editor
                .open_project(&file.contents, Some(&file.file_name()))?;
        }
        Ok(())
    }

    fn save(&mut self, pick: bool) -> Result<()> {
        let file = self.editor.project_file()?;
        let outcome = if pick {
            self.files.save_as(&file)?
        } else {
            self.files.save(&file)?
        };
        self.report_saved(outcome);
        Ok(())
    }

    fn import_engine(&mut self) -> Result<()> {
        if let Some((logic, ui_state)) = self.files.pick_engine_pair()? {
            self.editor.import_engine(&logic.contents, &ui_state.contents)?;
        }
        Ok(())
    }

    fn import_miniflow(&mut self) -> Result<()> {
        if let Some(file) = self.files.pick_text("Import MiniFlow", JSON_FILTER)? {
            self.editor.import_miniflow(&file.contents)?;
        }
        Ok(())
    }

    fn export_engine(&mut self) -> Result<()> {
        let export = self.editor.export_engine()?;
        for file in [export.logic, export.ui_state] {
            let outcome = self.files.export(&file)?;
            if outcome == SaveOutcome::Cancelled {
                break;
            }
            self.report_saved(outcome);
        }
        Ok(())
    }

    fn export_miniflow(&mut self) -> Result<()> {
        let file = self.editor.export_miniflow()?;
        let outcome = self.files.export(&file)?;
        self.report_saved(outcome);
        Ok(())
    }

    fn report_saved(&mut self, outcome: SaveOutcome) {
        match outcome {
            SaveOutcome::Saved(path) => self.status = format!("Saved {}", path.display()),
            SaveOutcome::Downloaded(path) => {
                self.status = format!("Saved to {}", path.display());
            }
            SaveOutcome::Cancelled => {}
        }
    }

    fn shortcuts(ctx: &egui::Context, actions: &mut Vec<Action>) {
        let command = egui::Modifiers::COMMAND;
        let command_shift = egui::Modifiers::COMMAND | egui::Modifiers::SHIFT;
        // Shifted variants first, a plain shortcut also matches with shift held.
        let bindings = [
            (KeyboardShortcut::new(command_shift, Key::S), Action::SaveAs),
            (KeyboardShortcut::new(command_shift, Key::Z), Action::Redo),
            (KeyboardShortcut::new(command_shift, Key::E), Action::SaveAndExit),
            (KeyboardShortcut::new(command, Key::S), Action::Save),
            (KeyboardShortcut::new(command, Key::O), Action::Open),
            (KeyboardShortcut::new(command, Key::Z), Action::Undo),
            (KeyboardShortcut::new(command, Key::Y), Action::Redo),
            (KeyboardShortcut::new(command, Key::E), Action::Edit),
        ];
        ctx.input_mut(|i| {
            for (shortcut, action) in bindings {
                if i.consume_shortcut(&shortcut) {
                    actions.push(action);
                }
            }
        });

        if ctx.wants_keyboard_input() {
            return;
        }
        ctx.input(|i| {
            // The platform copy/paste shortcuts arrive as clipboard events.
            for event in &i.events {
                match event {
                    egui::Event::Copy => actions.push(Action::Copy),
                    egui::Event::Paste(_) => actions.push(Action::Paste),
                    _ => {}
                }
            }
            if i.key_pressed(Key::Delete) || i.key_pressed(Key::Backspace) {
                actions.push(Action::Delete);
            }
            if i.key_pressed(Key::Escape) {
                actions.push(Action::Escape);
            }
        });
    }

    fn menu_bar(&mut self, ui: &mut egui::Ui, actions: &mut Vec<Action>) {
        egui::menu::bar(ui, |ui| {
            ui.menu_button("File", |ui| {
                let items = [
                    ("New", Action::New),
                    ("Open…", Action::Open),
                    ("Save", Action::Save),
                    ("Save As…", Action::SaveAs),
                ];
                menu_items(ui, &items, actions);
                ui.separator();
                let items = [
                    ("Import Engine Files…", Action::ImportEngine),
                    ("Import MiniFlow…", Action::ImportMiniflow),
                    ("Export Engine Files", Action::ExportEngine),
                    ("Export MiniFlow", Action::ExportMiniflow),
                ];
                menu_items(ui, &items, actions);
            });

            ui.separator();
            if ui
                .add_enabled(self.editor.can_undo(), egui::Button::new("Undo"))
                .clicked()
            {
                actions.push(Action::Undo);
            }
            if ui
                .add_enabled(self.editor.can_redo(), egui::Button::new("Redo"))
                .clicked()
            {
                actions.push(Action::Redo);
            }
            ui.toggle_value(&mut self.show_history, "History");

            ui.separator();
            match self.editor.mode() {
                Mode::View => {
                    if ui.button("Edit").clicked() {
                        actions.push(Action::Edit);
                    }
                }
                Mode::Edit => {
                    if ui.button("Add Node").clicked() {
                        actions.push(Action::AddNode);
                    }
                    if ui.button("Save & Exit").clicked() {
                        actions.push(Action::SaveAndExit);
                    }
                    if ui.button("Cancel").clicked() {
                        actions.push(Action::CancelEdit);
                    }
                }
            }
            if ui.button("Reset View").clicked() {
                actions.push(Action::ResetView);
            }

            ui.separator();
            ui.label("Name:");
            let mut draft = self
                .name_draft
                .take()
                .unwrap_or_else(|| self.editor.flowchart().name.clone());
            let response = ui.add(egui::TextEdit::singleline(&mut draft).desired_width(160.0));
            if response.lost_focus() {
                self.editor.rename(&draft);
            } else if response.has_focus() {
                self.name_draft = Some(draft);
            }
        });
    }

    fn history_window(&mut self, ctx: &egui::Context, actions: &mut Vec<Action>) {
        let steps: Vec<(usize, String, bool)> = self
            .editor
            .history()
            .entries()
            .map(|(index, snapshot, active)| (index, snapshot.label().to_string(), active))
            .collect();
        egui::Window::new("History")
            .open(&mut self.show_history)
            .resizable(true)
            .show(ctx, |ui| {
                egui::ScrollArea::vertical().show(ui, |ui| {
                    for (index, label, active) in steps.iter().rev() {
                        if ui.selectable_label(*active, label.as_str()).clicked() && !active {
                            actions.push(Action::RestoreStep(*index));
                        }
                    }
                });
            });
    }

    fn properties(&mut self, ui: &mut egui::Ui, id: NodeId) {
        let Some(node) = self.editor.flowchart().node(id).cloned() else {
            return;
        };
        let editing = self.editor.is_editing();
        ui.add_enabled_ui(editing, |ui| {
            ui.heading("Node");
            let mut caption = node.caption.clone();
            ui.label("Caption");
            if ui.text_edit_singleline(&mut caption).changed() {
                self.editor.set_caption(id, caption);
            }
            let mut tag = node.tag.clone();
            ui.label("Tag");
            if ui.text_edit_singleline(&mut tag).changed() {
                self.editor.set_tag(id, tag);
            }
            let mut start = node.is_start();
            if ui.checkbox(&mut start, "Start node").changed() {
                self.editor.set_start(id, start);
            }
            let mut enabled = node.enabled;
            if ui.checkbox(&mut enabled, "Enabled").changed() {
                self.editor.set_node_enabled(id, enabled);
            }

            ui.separator();
            ui.heading("Outputs");
            for (index, output) in node.outputs.iter().enumerate() {
                let at = OutputRef {
                    node: id,
                    output: output.sid,
                };
                let mut removed = false;
                ui.push_id(output.sid.0, |ui| {
                    ui.horizontal(|ui| {
                        let mut name = output.name.clone();
                        if ui.text_edit_singleline(&mut name).changed() {
                            self.editor.set_output_name(at, name);
                        }
                        removed = ui.small_button("✕").clicked();
                    });
                    let mut value = output.value.clone();
                    if ui
                        .add(egui::TextEdit::multiline(&mut value).desired_rows(2))
                        .changed()
                    {
                        self.editor.set_output_value(at, value);
                    }
                    ui.horizontal(|ui| {
                        let mut enabled = output.enabled;
                        if ui.checkbox(&mut enabled, "Enabled").changed() {
                            self.editor.set_output_enabled(at, enabled);
                        }
                        let mut is_default = output.is_default();
                        if ui.checkbox(&mut is_default, "Default").changed() {
                            self.editor.set_default_output(at, is_default);
                        }
                        if output.next.is_some() && ui.small_button("Unlink").clicked() {
                            self.editor.delete_connection(at);
                        }
                    });
                });
                ui.separator();
                if removed {
                    self.editor.remove_output(id, index);
                    break;
                }
            }
            if ui.button("Add Output").clicked() {
                self.editor.add_output(id);
            }
        });
    }

    fn canvas(&mut self, ui: &mut egui::Ui) {
        let (rect, response) = ui.allocate_exact_size(ui.available_size(), Sense::click_and_drag());
        self.editor.set_viewport(rect.size());
        let local = |p: Pos2| Pos2::ZERO + (p - rect.min);
        let ctx = ui.ctx().clone();

        if !ctx.wants_keyboard_input() {
            let space = ctx.input(|i| i.key_down(Key::Space));
            if space != self.editor.space_held() {
                self.editor.set_space_held(space);
            }
        }

        let events = ctx.input(|i| i.events.clone());
        for event in events {
            match event {
                egui::Event::PointerMoved(pos) => self.editor.pointer_move(local(pos)),
                egui::Event::PointerButton {
                    pos,
                    button,
                    pressed,
                    modifiers,
                } => {
                    let modifiers = Modifiers {
                        shift: modifiers.shift,
                    };
                    if !pressed {
                        self.editor.pointer_up(local(pos), modifiers);
                        continue;
                    }
                    let button = match button {
                        egui::PointerButton::Primary => PointerButton::Primary,
                        egui::PointerButton::Middle => PointerButton::Middle,
                        egui::PointerButton::Secondary => PointerButton::Secondary,
                        _ => continue,
                    };
                    if response.contains_pointer() && rect.contains(pos) {
                        self.editor.pointer_down(local(pos), button, modifiers);
                    }
                }
                egui::Event::PointerGone => self.editor.pointer_leave(),
                _ => {}
            }
        }

        if response.hovered() {
            let scroll = ctx.input(|i| i.raw_scroll_delta.y);
            if scroll != 0.0 {
                if let Some(pos) = response.hover_pos() {
                    self.editor.zoom_at(local(pos), scroll > 0.0);
                }
            }
        }
        if response.hovered() || !self.editor.interaction().is_idle() {
            ctx.set_cursor_icon(self.editor.cursor());
        }

        render::paint(ui.painter(), rect, &self.editor, &self.palette);
    }

    fn drain_events(&mut self) {
        for event in self.editor.drain_events() {
            match event {
                EditorEvent::Status(message) => self.status = message,
                EditorEvent::ModeChanged(mode) => info!(?mode, "mode changed"),
                _ => {}
            }
        }
    }
}

fn menu_items(ui: &mut egui::Ui, items: &[(&str, Action)], actions: &mut Vec<Action>) {
    for (label, action) in items {
        if ui.button(*label).clicked() {
            actions.push(*action);
            ui.close_menu();
        }
    }
}

impl App for QuestflowApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut Frame) {
        ctx.set_visuals(egui::Visuals {
            panel_fill: egui::Color32::from_rgb(40, 40, 40),
            window_fill: egui::Color32::from_rgb(40, 40, 40),
            extreme_bg_color: egui::Color32::from_rgb(30, 30, 30),
            ..egui::Visuals::dark()
        });

        let mut actions = Vec::new();
        Self::shortcuts(ctx, &mut actions);

        egui::TopBottomPanel::top("menu").show(ctx, |ui| {
            self.menu_bar(ui, &mut actions);
        });

        egui::TopBottomPanel::bottom("status").show(ctx, |ui| {
            ui.horizontal(|ui| {
                ui.label(&self.status);
                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    let mode = match self.editor.mode() {
                        Mode::View => "View",
                        Mode::Edit => "Edit",
                    };
                    ui.monospace(format!(
                        "{} | {} nodes | zoom {:.0}% | {}",
                        mode,
                        self.editor.flowchart().len(),
                        self.editor.view().zoom * 100.0,
                        self.editor.history().current_label(),
                    ));
                });
            });
        });

        if let [id] = self.editor.selection().nodes() {
            let id = *id;
            egui::SidePanel::right("properties")
                .default_width(280.0)
                .show(ctx, |ui| {
                    egui::ScrollArea::vertical().show(ui, |ui| self.properties(ui, id));
                });
        }

        if self.show_history {
            self.history_window(ctx, &mut actions);
        }

        egui::CentralPanel::default()
            .frame(egui::Frame::NONE)
            .show(ctx, |ui| self.canvas(ui));

        for action in actions {
            self.apply(action);
        }

        self.editor.tick();
        self.drain_events();
        if self.editor.history().has_pending() {
            ctx.request_repaint_after(self.editor.config().history.debounce());
        }
    }
}

fn load_config() -> EditorConfig {
    let Some(path) = env::args().nth(1) else {
        return EditorConfig::default();
    };
    match EditorConfig::load(&path) {
        Ok(config) => {
            info!(%path, "loaded editor config");
            config
        }
        Err(e) => {
            warn!(%path, error = %e, "falling back to the default config");
            EditorConfig::default()
        }
    }
}

fn main() -> eframe::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("questflow=info")),
        )
        .init();

    let config = load_config();
    let options = eframe::NativeOptions::default();
    eframe::run_native(
        "Questflow",
        options,
        Box::new(|_cc| Ok(Box::new(QuestflowApp::new(config)))),
    )
}
