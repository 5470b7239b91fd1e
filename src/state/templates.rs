//! Announcement template storage
//!
//! Templates live in a flat JSON array on disk. The whole file is read at
//! startup and rewritten after every change.

use crate::{AnnouncerError, Result};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// A named, reusable announcement script
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Template {
    pub title: String,
    pub script: String,
}

impl Template {
    pub fn new(title: impl Into<String>, script: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            script: script.into(),
        }
    }
}

/// Picker slot that stands for "nothing selected"
///
/// Slot `n > 0` refers to template `n - 1`.
pub const NO_SELECTION: usize = 0;

/// Ordered template list backed by a JSON file
pub struct TemplateStore {
    path: PathBuf,
    templates: Vec<Template>,
}

impl TemplateStore {
    /// Open the store at `path`, loading whatever is already there
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let templates = load(&path)?;
        info!("Loaded {} templates from {:?}", templates.len(), path);
        Ok(Self { path, templates })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn templates(&self) -> &[Template] {
        &self.templates
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }

    /// Template shown in picker `slot`, `None` for the sentinel slot
    pub fn get(&self, slot: usize) -> Option<&Template> {
        slot.checked_sub(1).and_then(|idx| self.templates.get(idx))
    }

    /// Add a template and persist the list
    ///
    /// Both fields are trimmed; an empty field rejects the save and leaves
    /// the list untouched. Returns the picker slot of the new template.
    pub fn append(&mut self, title: &str, script: &str) -> Result<usize> {
        let title = title.trim();
        let script = script.trim();

        if title.is_empty() || script.is_empty() {
            return Err(AnnouncerError::Validation(
                "Enter both a title and a script".to_string(),
            ));
        }

        self.templates.push(Template::new(title, script));
        if let Err(e) = save(&self.path, &self.templates) {
            self.templates.pop();
            return Err(e);
        }

        debug!("Saved template {:?}", title);
        Ok(self.templates.len())
    }

    /// Remove the template in picker `slot` and persist the list
    ///
    /// The sentinel slot is a no-op and returns `Ok(None)`.
    pub fn delete(&mut self, slot: usize) -> Result<Option<Template>> {
        if slot == NO_SELECTION {
            return Ok(None);
        }

        if slot > self.templates.len() {
            return Err(AnnouncerError::Validation(format!(
                "No template number {}",
                slot
            )));
        }

        let removed = self.templates.remove(slot - 1);
        if let Err(e) = save(&self.path, &self.templates) {
            self.templates.insert(slot - 1, removed);
            return Err(e);
        }

        debug!("Deleted template {:?}", removed.title);
        Ok(Some(removed))
    }
}

/// Read templates from `path`
///
/// A missing file is an empty list. Malformed JSON is an error.
pub fn load(path: &Path) -> Result<Vec<Template>> {
    if !path.exists() {
        debug!("Template file {:?} not found, starting empty", path);
        return Ok(Vec::new());
    }

    let contents = fs::read_to_string(path)?;
    serde_json::from_str(&contents).map_err(|e| {
        AnnouncerError::Template(format!("{} is not a valid template file: {}", path.display(), e))
    })
}

/// Overwrite `path` with `templates` as indented UTF-8 JSON
pub fn save(path: &Path, templates: &[Template]) -> Result<()> {
    let mut buf = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
    templates.serialize(&mut ser)?;
    buf.push(b'\n');

    fs::write(path, buf)?;
    Ok(())
}
