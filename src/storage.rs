//! Moving documents between the editor and the file system, with a download
//! directory fallback when no picker is available.

use std::{
    fs, io,
    path::{Path, PathBuf},
};

use tracing::{info, warn};

use crate::{
    error::{EditorError, Result},
    interchange::{engine, ExportFile},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileFilter {
    pub name: &'static str,
    pub extensions: &'static [&'static str],
}

pub const PROJECT_FILTER: FileFilter = FileFilter {
    name: "Flowchart Project",
    extensions: &["flowproj"],
};

pub const JSON_FILTER: FileFilter = FileFilter {
    name: "JSON",
    extensions: &["json"],
};

/// File pickers. `Ok(None)` means the user cancelled; an `Err` means no
/// picker could be shown at all.
pub trait FileAccess {
    fn pick_open(&mut self, title: &str, filter: FileFilter) -> io::Result<Option<PathBuf>>;
    fn pick_open_many(&mut self, title: &str, filter: FileFilter) -> io::Result<Vec<PathBuf>>;
    fn pick_save(
        &mut self,
        title: &str,
        file_name: &str,
        filter: FileFilter,
    ) -> io::Result<Option<PathBuf>>;
}

#[derive(Debug, Default)]
pub struct DialogFileAccess;

impl DialogFileAccess {
    fn dialog(title: &str, filter: FileFilter) -> rfd::FileDialog {
        rfd::FileDialog::new()
            .set_title(title)
            .add_filter(filter.name, filter.extensions)
    }
}

impl FileAccess for DialogFileAccess {
    fn pick_open(&mut self, title: &str, filter: FileFilter) -> io::Result<Option<PathBuf>> {
        Ok(Self::dialog(title, filter).pick_file())
    }

    fn pick_open_many(&mut self, title: &str, filter: FileFilter) -> io::Result<Vec<PathBuf>> {
        Ok(Self::dialog(title, filter).pick_files().unwrap_or_default())
    }

    fn pick_save(
        &mut self,
        title: &str,
        file_name: &str,
        filter: FileFilter,
    ) -> io::Result<Option<PathBuf>> {
        Ok(Self::dialog(title, filter).set_file_name(file_name).save_file())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LoadedFile {
    pub path: PathBuf,
    pub contents: String,
}

impl LoadedFile {
    fn read(path: PathBuf) -> Result<Self> {
        let contents = fs::read_to_string(&path)?;
        Ok(Self { path, contents })
    }

    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveOutcome {
    Saved(PathBuf),
    /// The picker or the target was unusable; the file went to the download
    /// directory instead.
    Downloaded(PathBuf),
    Cancelled,
}

pub struct ProjectFiles<F> {
    access: F,
    current: Option<PathBuf>,
    download_dir: PathBuf,
}

impl<F: FileAccess> ProjectFiles<F> {
    pub fn new(access: F, download_dir: impl Into<PathBuf>) -> Self {
        Self {
            access,
            current: None,
            download_dir: download_dir.into(),
        }
    }

    pub fn current_path(&self) -> Option<&Path> {
        self.current.as_deref()
    }

    pub fn forget(&mut self) {
        self.current = None;
    }

    /// Picks and reads a project file. The file is remembered for
    /// [`ProjectFiles::save`].
    pub fn open(&mut self) -> Result<Option<LoadedFile>> {
        let Some(path) = self.access.pick_open("Open Project", PROJECT_FILTER)? else {
            return Ok(None);
        };
        let file = LoadedFile::read(path)?;
        self.current = Some(file.path.clone());
        Ok(Some(file))
    }

    pub fn pick_text(&mut self, title: &str, filter: FileFilter) -> Result<Option<LoadedFile>> {
        match self.access.pick_open(title, filter)? {
            Some(path) => LoadedFile::read(path).map(Some),
            None => Ok(None),
        }
    }

    /// Picks the two engine files at once and returns `(logic, ui_state)`.
    pub fn pick_engine_pair(&mut self) -> Result<Option<(LoadedFile, LoadedFile)>> {
        let paths = self.access.pick_open_many("Import Engine Files", JSON_FILTER)?;
        if paths.is_empty() {
            return Ok(None);
        }
        let is_ui_state = |p: &PathBuf| {
            p.to_string_lossy()
                .to_lowercase()
                .ends_with(engine::UI_STATE_SUFFIX)
        };
        let ui_state = paths.iter().find(|p| is_ui_state(p));
        let logic = paths.iter().find(|p| {
            !is_ui_state(p)
                && p.extension()
                    .is_some_and(|e| e.eq_ignore_ascii_case("json"))
        });
        match (logic, ui_state) {
            (Some(logic), Some(ui_state)) => Ok(Some((
                LoadedFile::read(logic.clone())?,
                LoadedFile::read(ui_state.clone())?,
            ))),
            _ => Err(EditorError::MissingCompanion),
        }
    }

    /// Writes to the remembered file, or behaves like
    /// [`ProjectFiles::save_as`] when there is none or the write fails.
    pub fn save(&mut self, file: &ExportFile) -> Result<SaveOutcome> {
        if let Some(path) = self.current.clone() {
            match fs::write(&path, &file.contents) {
                Ok(()) => {
                    info!(path = %path.display(), "project saved");
                    return Ok(SaveOutcome::Saved(path));
                }
                Err(e) => warn!(path = %path.display(), error = %e, "save failed, asking for a new location"),
            }
        }
        self.save_as(file)
    }

    /// Asks for a location and remembers it on success.
    pub fn save_as(&mut self, file: &ExportFile) -> Result<SaveOutcome> {
        let outcome = self.write_picked("Save Project As", file, PROJECT_FILTER)?;
        if let SaveOutcome::Saved(path) = &outcome {
            self.current = Some(path.clone());
        }
        Ok(outcome)
    }

    /// Writes an export without touching the remembered project file.
    pub fn export(&mut self, file: &ExportFile) -> Result<SaveOutcome> {
        self.write_picked("Export", file, JSON_FILTER)
    }

    fn write_picked(
        &mut self,
        title: &str,
        file: &ExportFile,
        filter: FileFilter,
    ) -> Result<SaveOutcome> {
        match self.access.pick_save(title, &file.file_name, filter) {
            Ok(Some(path)) => match fs::write(&path, &file.contents) {
                Ok(()) => {
                    info!(path = %path.display(), "file written");
                    Ok(SaveOutcome::Saved(path))
                }
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "write failed, downloading instead");
                    self.download(file)
                }
            },
            Ok(None) => Ok(SaveOutcome::Cancelled),
            Err(e) => {
                warn!(error = %e, "file picker unavailable, downloading instead");
                self.download(file)
            }
        }
    }

    /// Writes into the download directory under the file's own name.
    pub fn download(&self, file: &ExportFile) -> Result<SaveOutcome> {
        fs::create_dir_all(&self.download_dir)?;
        let path = self.download_dir.join(&file.file_name);
        fs::write(&path, &file.contents)?;
        info!(path = %path.display(), "file downloaded");
        Ok(SaveOutcome::Downloaded(path))
    }
}
