//! Freedesktop shared-mime-info database.
//!
//! Reads the generated files `update-mime-database` leaves in every
//! `<data dir>/mime` directory. Directories are given highest priority
//! first; the first directory to define an alias, icon or comment wins.

use crate::mime::{MimeResolver, OCTET_STREAM, SCHEME_HANDLER_GROUP, split_type};
use log::{debug, info};
use std::collections::{HashMap, HashSet, VecDeque};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Clone, Debug, Default)]
pub struct SharedMimeDb {
    types: HashSet<String>,
    aliases: HashMap<String, String>,
    parents: HashMap<String, Vec<String>>,
    icons: HashMap<String, String>,
    generic_icons: HashMap<String, String>,
    globs: HashMap<String, Vec<String>>,
    comments: HashMap<String, String>,
    /// Searched for `<group>/<subtype>.xml` when a label is requested.
    mime_dirs: Vec<PathBuf>,
}

impl SharedMimeDb {
    /// Load every database found in `mime_dirs`. Missing files are skipped.
    pub fn load(mime_dirs: &[PathBuf]) -> Self {
        let mut db = Self::default();

        for dir in mime_dirs {
            if !dir.is_dir() {
                continue;
            }
            debug!("Loading MIME database from {}", dir.display());

            for_each_line(&dir.join("types"), |line| {
                db.types.insert(line.to_ascii_lowercase());
            });
            for_each_line(&dir.join("aliases"), |line| {
                if let Some((alias, canonical)) = line.split_once(' ') {
                    db.insert_alias(alias, canonical.trim());
                }
            });
            for_each_line(&dir.join("subclasses"), |line| {
                if let Some((child, parent)) = line.split_once(' ') {
                    db.insert_parent(child, parent.trim());
                }
            });
            for_each_line(&dir.join("icons"), |line| {
                if let Some((mime, icon)) = line.split_once(':') {
                    db.icons
                        .entry(mime.to_ascii_lowercase())
                        .or_insert_with(|| icon.trim().to_string());
                }
            });
            for_each_line(&dir.join("generic-icons"), |line| {
                if let Some((mime, icon)) = line.split_once(':') {
                    db.generic_icons
                        .entry(mime.to_ascii_lowercase())
                        .or_insert_with(|| icon.trim().to_string());
                }
            });
            // weight:type:glob[:flags]
            for_each_line(&dir.join("globs2"), |line| {
                let mut fields = line.splitn(4, ':');
                if let (Some(_), Some(mime), Some(glob)) = (fields.next(), fields.next(), fields.next()) {
                    db.insert_glob(mime, glob);
                }
            });

            db.mime_dirs.push(dir.clone());
        }

        info!(
            "MIME database: {} types, {} aliases, {} with parents",
            db.types.len(),
            db.aliases.len(),
            db.parents.len()
        );
        db
    }

    pub fn with_type(mut self, name: &str) -> Self {
        self.types.insert(name.to_ascii_lowercase());
        self
    }

    pub fn with_alias(mut self, alias: &str, canonical: &str) -> Self {
        self.insert_alias(alias, canonical);
        self
    }

    /// Registers both types and the `child -> parent` relation.
    pub fn with_parent(mut self, child: &str, parent: &str) -> Self {
        self.insert_parent(child, parent);
        self
    }

    pub fn with_icon(mut self, name: &str, icon: &str) -> Self {
        self.icons.insert(name.to_ascii_lowercase(), icon.to_string());
        self
    }

    pub fn with_generic_icon(mut self, name: &str, icon: &str) -> Self {
        self.generic_icons.insert(name.to_ascii_lowercase(), icon.to_string());
        self
    }

    pub fn with_glob(mut self, name: &str, glob: &str) -> Self {
        self.insert_glob(name, glob);
        self
    }

    pub fn with_comment(mut self, name: &str, comment: &str) -> Self {
        self.types.insert(name.to_ascii_lowercase());
        self.comments.insert(name.to_ascii_lowercase(), comment.to_string());
        self
    }

    fn insert_alias(&mut self, alias: &str, canonical: &str) {
        let canonical = canonical.to_ascii_lowercase();
        self.types.insert(canonical.clone());
        self.aliases
            .entry(alias.to_ascii_lowercase())
            .or_insert(canonical);
    }

    fn insert_parent(&mut self, child: &str, parent: &str) {
        let child = child.to_ascii_lowercase();
        let parent = parent.to_ascii_lowercase();
        self.types.insert(child.clone());
        self.types.insert(parent.clone());

        let parents = self.parents.entry(child).or_default();
        if !parents.contains(&parent) {
            parents.push(parent);
        }
    }

    fn insert_glob(&mut self, name: &str, glob: &str) {
        let globs = self.globs.entry(name.to_ascii_lowercase()).or_default();
        let glob = glob.trim().to_string();
        if !glob.is_empty() && glob != "__NOGLOBS__" && !globs.contains(&glob) {
            globs.push(glob);
        }
    }

    fn direct_parents(&self, canonical: &str) -> Vec<String> {
        if let Some(explicit) = self.parents.get(canonical) {
            return explicit
                .iter()
                .map(|p| self.canonicalize(p).unwrap_or_else(|| p.clone()))
                .collect();
        }

        // Every text/* type implicitly derives from text/plain.
        if canonical.starts_with("text/") && canonical != "text/plain" {
            return vec!["text/plain".to_string()];
        }

        Vec::new()
    }

    fn comment(&self, canonical: &str) -> Option<String> {
        if let Some(comment) = self.comments.get(canonical) {
            return Some(comment.clone());
        }

        let (group, subtype) = split_type(canonical)?;
        self.mime_dirs.iter().find_map(|dir| {
            let xml = fs::read_to_string(dir.join(group).join(format!("{subtype}.xml"))).ok()?;
            unlocalized_comment(&xml)
        })
    }
}

impl MimeResolver for SharedMimeDb {
    fn canonicalize(&self, raw: &str) -> Option<String> {
        let name = raw.trim().to_ascii_lowercase();
        if self.types.contains(&name) {
            return Some(name);
        }
        self.aliases.get(&name).cloned()
    }

    fn ancestors(&self, canonical: &str) -> Vec<String> {
        let mut result = Vec::new();
        let mut visited = HashSet::new();
        let mut queue = VecDeque::from(self.direct_parents(canonical));

        while let Some(parent) = queue.pop_front() {
            if parent == OCTET_STREAM || parent == canonical || !visited.insert(parent.clone()) {
                continue;
            }
            queue.extend(self.direct_parents(&parent));
            result.push(parent);
        }

        // The root goes last so callers can stop consuming at it.
        let rootless = matches!(
            split_type(canonical).map(|(group, _)| group),
            Some("inode") | Some("all") | Some(SCHEME_HANDLER_GROUP) | None
        );
        if canonical != OCTET_STREAM && !rootless {
            result.push(OCTET_STREAM.to_string());
        }

        result
    }

    fn icon_name(&self, canonical: &str) -> String {
        self.icons
            .get(canonical)
            .cloned()
            .unwrap_or_else(|| canonical.replace('/', "-"))
    }

    fn generic_icon_name(&self, canonical: &str) -> String {
        if let Some(icon) = self.generic_icons.get(canonical) {
            return icon.clone();
        }
        let group = canonical.split('/').next().unwrap_or(canonical);
        format!("{group}-x-generic")
    }

    fn display_label(&self, canonical: &str) -> String {
        let comment = self.comment(canonical).map(|c| c.trim().to_string());

        match self.globs.get(canonical) {
            Some(globs) if !globs.is_empty() => {
                let text = comment.unwrap_or_else(|| canonical.to_string());
                format!("{text} ({})", globs.join(" "))
            }
            _ => comment
                .filter(|c| !c.is_empty())
                .unwrap_or_else(|| canonical.to_string()),
        }
    }
}

/// Call `f` for every non-empty, non-comment line of a database file.
fn for_each_line(path: &Path, mut f: impl FnMut(&str)) {
    let Ok(content) = fs::read_to_string(path) else {
        return;
    };

    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        f(line);
    }
}

/// Extract the first `<comment>` without an `xml:lang` attribute.
fn unlocalized_comment(xml: &str) -> Option<String> {
    let start = xml.find("<comment>")? + "<comment>".len();
    let end = start + xml[start..].find("</comment>")?;
    let text = xml[start..end]
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&");
    Some(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_load_from_disk() {
        let temp_dir = TempDir::new().unwrap();
        let dir = temp_dir.path().join("mime");
        fs::create_dir_all(dir.join("image")).unwrap();
        fs::write(dir.join("types"), "image/png\ntext/plain\ntext/x-csrc\n").unwrap();
        fs::write(dir.join("aliases"), "image/x-png image/png\n").unwrap();
        fs::write(dir.join("subclasses"), "text/x-csrc text/plain\n").unwrap();
        fs::write(dir.join("generic-icons"), "image/png:image-x-generic\n").unwrap();
        fs::write(dir.join("globs2"), "# comment\n50:image/png:*.png\n").unwrap();
        fs::write(
            dir.join("image/png.xml"),
            "<?xml version=\"1.0\"?>\n<mime-type type=\"image/png\">\n  <comment>PNG image</comment>\n  <comment xml:lang=\"de\">PNG-Bild</comment>\n</mime-type>\n",
        )
        .unwrap();

        let db = SharedMimeDb::load(&[dir, temp_dir.path().join("missing")]);

        assert_eq!(db.canonicalize("image/x-png").as_deref(), Some("image/png"));
        assert_eq!(db.canonicalize("IMAGE/PNG").as_deref(), Some("image/png"));
        assert_eq!(db.ancestors("text/x-csrc"), vec!["text/plain", OCTET_STREAM]);
        assert_eq!(db.display_label("image/png"), "PNG image (*.png)");
        assert_eq!(db.display_label("text/plain"), "text/plain");
        assert_eq!(db.generic_icon_name("image/png"), "image-x-generic");
    }

    #[test]
    fn test_first_directory_wins() {
        let temp_dir = TempDir::new().unwrap();
        let high = temp_dir.path().join("high");
        let low = temp_dir.path().join("low");
        fs::create_dir_all(&high).unwrap();
        fs::create_dir_all(&low).unwrap();
        fs::write(high.join("icons"), "image/png:custom-png\n").unwrap();
        fs::write(low.join("icons"), "image/png:stock-png\n").unwrap();

        let db = SharedMimeDb::load(&[high, low]);
        assert_eq!(db.icon_name("image/png"), "custom-png");
    }

    #[test]
    fn test_implicit_text_plain_parent() {
        let db = SharedMimeDb::default().with_type("text/markdown").with_type("text/plain");
        assert_eq!(db.ancestors("text/markdown"), vec!["text/plain", OCTET_STREAM]);
        assert_eq!(db.ancestors("text/plain"), vec![OCTET_STREAM]);
    }

    #[test]
    fn test_ancestors_transitive_and_rootless() {
        let db = SharedMimeDb::default()
            .with_parent("application/x-shellscript", "application/x-executable")
            .with_parent("application/x-shellscript", "text/plain")
            .with_parent("application/x-executable", OCTET_STREAM);

        assert_eq!(
            db.ancestors("application/x-shellscript"),
            vec!["application/x-executable", "text/plain", OCTET_STREAM]
        );
        assert!(db.ancestors("inode/directory").is_empty());
        assert!(db.ancestors("x-scheme-handler/https").is_empty());
    }

    #[test]
    fn test_default_icon_names() {
        let db = SharedMimeDb::default().with_type("application/vnd.oasis.opendocument.text");
        assert_eq!(
            db.icon_name("application/vnd.oasis.opendocument.text"),
            "application-vnd.oasis.opendocument.text"
        );
        assert_eq!(
            db.generic_icon_name("application/vnd.oasis.opendocument.text"),
            "application-x-generic"
        );
    }
}
