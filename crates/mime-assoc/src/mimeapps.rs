//! Reading and patching mimeapps.list.
//!
//! The file is parsed into a [`ConfigDocument`], patched as a pure function
//! over its lines and written back in one piece. Everything outside
//! `[Default Applications]` is carried through byte for byte, including
//! `\r` line endings and lines that are not valid UTF-8.
//!
//! There is no locking: a change made by another process between the read
//! and the write of [`DefaultsStore::write_update`] is overwritten.

use crate::error::{AssocError, Result};
use crate::mime::{MimeResolver, resolve_type_or_raw};
use log::{debug, info, warn};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

pub const DEFAULT_APPLICATIONS_GROUP: &str = "Default Applications";

/// One line of mimeapps.list. `raw` is the line exactly as read, without
/// the `\n`. Names, keys and values are decoded lossily; `raw` is what gets
/// written back.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Line {
    Verbatim(Vec<u8>),
    GroupHeader { name: String, raw: Vec<u8> },
    /// Only produced inside the target group.
    KeyValue { key: String, value: String, raw: Vec<u8> },
}

impl Line {
    fn group_header(name: &str) -> Self {
        Line::GroupHeader {
            name: name.to_string(),
            raw: format!("[{name}]").into_bytes(),
        }
    }

    fn association(mime: &str, desktop_file: &str) -> Self {
        Line::KeyValue {
            key: mime.to_string(),
            value: desktop_file.to_string(),
            raw: format!("{mime}={desktop_file}").into_bytes(),
        }
    }

    pub fn raw(&self) -> &[u8] {
        match self {
            Line::Verbatim(raw) | Line::GroupHeader { raw, .. } | Line::KeyValue { raw, .. } => raw,
        }
    }

    fn is_blank(&self) -> bool {
        matches!(self, Line::Verbatim(raw) if raw.trim_ascii().is_empty())
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ConfigDocument {
    lines: Vec<Line>,
}

impl ConfigDocument {
    pub fn parse(content: &str) -> Self {
        Self::from_bytes(content.as_bytes())
    }

    /// Split on `\n` only, so a `\r` before it stays part of the line.
    pub fn from_bytes(content: &[u8]) -> Self {
        let mut lines = Vec::new();
        let mut in_target = false;

        let content = content.strip_suffix(b"\n").unwrap_or(content);
        if content.is_empty() {
            return Self { lines };
        }

        for raw in content.split(|&b| b == b'\n') {
            let text = String::from_utf8_lossy(raw);
            let trimmed = text.trim();

            if trimmed.starts_with('[') && trimmed.ends_with(']') {
                let name = trimmed[1..trimmed.len() - 1].trim().to_string();
                in_target = name == DEFAULT_APPLICATIONS_GROUP;
                lines.push(Line::GroupHeader {
                    name,
                    raw: raw.to_vec(),
                });
                continue;
            }

            if in_target && !trimmed.starts_with('#') {
                if let Some((key, value)) = trimmed.split_once('=') {
                    lines.push(Line::KeyValue {
                        key: key.trim().to_string(),
                        value: value.trim().to_string(),
                        raw: raw.to_vec(),
                    });
                    continue;
                }
            }

            lines.push(Line::Verbatim(raw.to_vec()));
        }

        Self { lines }
    }

    pub fn lines(&self) -> &[Line] {
        &self.lines
    }

    /// `(key, value)` pairs of the target group, in file order.
    pub fn associations(&self) -> impl Iterator<Item = (&str, &str)> {
        self.lines.iter().filter_map(|line| match line {
            Line::KeyValue { key, value, .. } => Some((key.as_str(), value.as_str())),
            _ => None,
        })
    }

    /// The file content, one `\n`-terminated raw line after another.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::new();
        for line in &self.lines {
            out.extend_from_slice(line.raw());
            out.push(b'\n');
        }
        out
    }
}

impl fmt::Display for ConfigDocument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&String::from_utf8_lossy(&self.to_bytes()))
    }
}

/// The preferred desktop file of a value, which may be a `;` list.
pub fn preferred_desktop_file(value: &str) -> Option<&str> {
    value.split(';').map(str::trim).find(|v| !v.is_empty())
}

/// Changes for one application.
#[derive(Clone, Debug, Default)]
pub struct DefaultsUpdate {
    /// Type -> desktop file to write.
    pub selected: BTreeMap<String, String>,
    /// Type -> desktop file of the edited application that declares it. An
    /// existing line is only removed when its value is that file; `None`
    /// (no declaring descriptor) always keeps the line.
    pub unselected: BTreeMap<String, Option<String>>,
}

/// Apply an update to a parsed document.
///
/// The target group moves to the end of the file: other content first, a
/// blank separator, the header, surviving associations, then the new ones.
pub fn patch_document(
    document: &ConfigDocument,
    resolver: &dyn MimeResolver,
    update: &DefaultsUpdate,
) -> ConfigDocument {
    let mut other_content = Vec::new();
    let mut other_associations = Vec::new();
    let mut in_target = false;

    for line in document.lines() {
        match line {
            Line::GroupHeader { name, .. } => {
                in_target = name == DEFAULT_APPLICATIONS_GROUP;
                if !in_target {
                    other_content.push(line.clone());
                }
            }
            Line::Verbatim(_) if !in_target => other_content.push(line.clone()),
            Line::Verbatim(_) => other_associations.push(line.clone()),
            Line::KeyValue { key, value, .. } => {
                let mime = resolve_type_or_raw(resolver, key);
                if update.selected.contains_key(&mime) {
                    continue;
                }
                if let Some(Some(owned)) = update.unselected.get(&mime) {
                    if preferred_desktop_file(value) == Some(owned.as_str()) {
                        continue;
                    }
                }
                other_associations.push(line.clone());
            }
        }
    }

    trim_trailing_blanks(&mut other_content);
    trim_trailing_blanks(&mut other_associations);

    let mut lines = other_content;
    lines.push(Line::Verbatim(Vec::new()));
    lines.push(Line::group_header(DEFAULT_APPLICATIONS_GROUP));
    lines.extend(other_associations);
    lines.extend(
        update
            .selected
            .iter()
            .map(|(mime, desktop_file)| Line::association(mime, desktop_file)),
    );

    ConfigDocument { lines }
}

fn trim_trailing_blanks(lines: &mut Vec<Line>) {
    while lines.last().is_some_and(Line::is_blank) {
        lines.pop();
    }
}

/// Current defaults plus the file they live in.
#[derive(Debug)]
pub struct DefaultsStore {
    path: PathBuf,
    /// Type -> desktop file.
    defaults: BTreeMap<String, String>,
    /// Desktop file -> types it is the default for.
    by_file: HashMap<String, BTreeSet<String>>,
}

impl DefaultsStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            defaults: BTreeMap::new(),
            by_file: HashMap::new(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the defaults currently on disk. A missing or unreadable file
    /// means there are none.
    pub fn read_current_defaults(&mut self, resolver: &dyn MimeResolver) {
        let document = match self.read_document() {
            Ok(document) => document,
            Err(e) => {
                warn!("Unable to read {}: {}", self.path.display(), e);
                ConfigDocument::default()
            }
        };
        self.load_document(&document, resolver);
        info!("Loaded {} default associations from {}", self.defaults.len(), self.path.display());
    }

    /// Read, patch and rewrite the file, then refresh the in-memory state.
    ///
    /// Only a missing file is patched as empty. Any other read error is
    /// returned before anything is written. The new content goes to a
    /// temporary file next to the store which is then renamed over it, so
    /// the store is either fully old or fully new. On error nothing in
    /// memory changes.
    pub fn write_update(&mut self, resolver: &dyn MimeResolver, update: &DefaultsUpdate) -> Result<()> {
        let current = self.read_document()?;
        let patched = patch_document(&current, resolver, update);

        write_atomically(&self.path, &patched.to_bytes()).map_err(|source| AssocError::StoreWrite {
            path: self.path.clone(),
            source,
        })?;

        info!(
            "Wrote {} defaults to {}",
            update.selected.len(),
            self.path.display()
        );
        self.load_document(&patched, resolver);
        Ok(())
    }

    pub fn defaults(&self) -> &BTreeMap<String, String> {
        &self.defaults
    }

    pub fn default_for(&self, mime: &str) -> Option<&str> {
        self.defaults.get(mime).map(String::as_str)
    }

    /// Types a desktop file is currently the default for.
    pub fn types_for_file(&self, desktop_file: &str) -> Option<&BTreeSet<String>> {
        self.by_file.get(desktop_file)
    }

    fn read_document(&self) -> Result<ConfigDocument> {
        match fs::read(&self.path) {
            Ok(content) => Ok(ConfigDocument::from_bytes(&content)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!("{} does not exist yet", self.path.display());
                Ok(ConfigDocument::default())
            }
            Err(e) => Err(e.into()),
        }
    }

    fn load_document(&mut self, document: &ConfigDocument, resolver: &dyn MimeResolver) {
        self.defaults.clear();
        self.by_file.clear();

        for (key, value) in document.associations() {
            let Some(desktop_file) = preferred_desktop_file(value) else {
                continue;
            };
            let mime = resolve_type_or_raw(resolver, key);
            if self.defaults.contains_key(&mime) {
                continue;
            }

            self.by_file
                .entry(desktop_file.to_string())
                .or_default()
                .insert(mime.clone());
            self.defaults.insert(mime, desktop_file.to_string());
        }
    }
}

/// Replace `path` with `contents` through a sibling temporary file.
///
/// A symlinked store is resolved first so the link itself survives, and the
/// permissions of an existing file are carried over.
fn write_atomically(path: &Path, contents: &[u8]) -> io::Result<()> {
    let target = fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());
    let parent = match target.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(parent)?;

    let mut file = tempfile::NamedTempFile::new_in(parent)?;
    file.write_all(contents)?;
    if let Ok(metadata) = fs::metadata(&target) {
        file.as_file().set_permissions(metadata.permissions())?;
    }
    file.as_file().sync_all()?;
    file.persist(&target).map_err(|e| e.error)?;
    Ok(())
}
