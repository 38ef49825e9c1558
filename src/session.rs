use crate::codec::{self, DecodeError};
use crate::editor::Editor;
use anyhow::{Context, Result};
use log::{info, warn};
use std::fs;
use std::path::{Path, PathBuf};

/// Exported files always carry the `.lay` extension.
pub fn ensure_lay_extension(name: &str) -> String {
    if name.to_lowercase().ends_with(".lay") {
        name.to_string()
    } else {
        format!("{}.lay", name)
    }
}

fn with_lay_extension(path: &Path) -> PathBuf {
    match path.file_name() {
        Some(name) => path.with_file_name(ensure_lay_extension(&name.to_string_lossy())),
        None => path.to_path_buf(),
    }
}

/// One editing session: the editor plus the file it came from and where it
/// was last exported.
#[derive(Default)]
pub struct Session {
    editor: Editor,
    filename: Option<String>,
    export_path: Option<PathBuf>,
    saved_revision: u64,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn editor(&self) -> &Editor {
        &self.editor
    }

    pub fn editor_mut(&mut self) -> &mut Editor {
        &mut self.editor
    }

    pub fn filename(&self) -> Option<&str> {
        self.filename.as_deref()
    }

    pub fn export_path(&self) -> Option<&Path> {
        self.export_path.as_deref()
    }

    pub fn has_project(&self) -> bool {
        self.editor.project().is_some()
    }

    pub fn has_unsaved_changes(&self) -> bool {
        self.has_project() && self.editor.revision() != self.saved_revision
    }

    fn mark_saved(&mut self) {
        self.saved_revision = self.editor.revision();
    }

    pub fn new_project(&mut self) {
        self.editor.new_project();
        self.filename = None;
        self.export_path = None;
        self.mark_saved();
    }

    /// Decode `text` and make it the live project. On failure the current
    /// project is left untouched.
    pub fn open_text(&mut self, filename: &str, text: &str) -> Result<(), DecodeError> {
        let project = codec::decode(text).map_err(|e| {
            warn!("Failed to decode {}: {}", filename, e);
            e
        })?;
        info!("Opened {} ({} lamps)", filename, project.lamps.len());
        self.editor.load_project(project);
        self.filename = Some(filename.to_string());
        self.export_path = None;
        self.mark_saved();
        Ok(())
    }

    pub fn open_file(&mut self, path: &Path) -> Result<()> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        self.open_text(&filename, &text)
            .with_context(|| format!("Failed to open {}", filename))?;
        Ok(())
    }

    pub fn clear(&mut self) {
        self.editor.close_project();
        self.filename = None;
        self.export_path = None;
        self.mark_saved();
    }

    pub fn export_text(&self) -> Option<String> {
        self.editor.project().map(codec::encode)
    }

    pub fn suggested_export_name(&self) -> String {
        ensure_lay_extension(self.filename.as_deref().unwrap_or("layout.lay"))
    }

    /// Write the project to `path` (with `.lay` enforced) and remember it as
    /// the export target. Returns the path actually written.
    pub fn export_to(&mut self, path: &Path) -> Result<PathBuf> {
        let text = self.export_text().context("No project to export")?;
        let path = with_lay_extension(path);
        fs::write(&path, text).with_context(|| format!("Failed to write {}", path.display()))?;
        info!("Exported layout to {}", path.display());
        self.export_path = Some(path.clone());
        self.mark_saved();
        Ok(path)
    }

    /// Re-export to the remembered target, if there is one.
    pub fn export(&mut self) -> Option<Result<PathBuf>> {
        let path = self.export_path.clone()?;
        Some(self.export_to(&path))
    }
}
