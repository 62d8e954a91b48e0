//! Association index: which application handles which MIME types, and
//! which descriptor file said so.

use crate::desktop_entry::{DesktopEntry, load_desktop_file};
use crate::mime::{MimeResolver, ancestors_before_octet_stream, resolve_type, split_type};
use crate::mimeapps::DefaultsStore;
use log::{debug, info, warn};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet, VecDeque};
use std::path::{Path, PathBuf};

/// Everything known about one application, keyed by its display name.
#[derive(Clone, Debug, Default)]
pub struct AppRecord {
    pub name: String,
    pub icon_name: Option<String>,
    /// Type -> desktop file id that first declared it.
    pub mime_types: BTreeMap<String, String>,
    /// Desktop file ids carrying this name, in scan order.
    pub desktop_files: Vec<String>,
}

impl AppRecord {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Self::default()
        }
    }

    /// The first descriptor seen for this application.
    pub fn primary_file(&self) -> Option<&str> {
        self.desktop_files.first().map(String::as_str)
    }

    pub fn source_file(&self, mime: &str) -> Option<&str> {
        self.mime_types.get(mime).map(String::as_str)
    }

    /// The file written as default for `mime`: its declaring descriptor, or
    /// the primary one for types only supported through a parent type.
    pub fn desktop_file_for(&self, mime: &str) -> Option<&str> {
        self.source_file(mime).or_else(|| self.primary_file())
    }
}

/// Does `mime` belong to `group` (`None` matches everything)?
pub fn in_group(mime: &str, group: Option<&str>) -> bool {
    match group {
        Some(group) => mime
            .strip_prefix(group)
            .is_some_and(|rest| rest.starts_with('/')),
        None => true,
    }
}

/// The association and child-type indexes.
#[derive(Debug, Default)]
pub struct AppCatalog {
    apps: BTreeMap<String, AppRecord>,
    /// Parent type -> every child type encountered below it.
    child_types: HashMap<String, BTreeSet<String>>,
    /// Top-level groups of all accepted types.
    groups: BTreeSet<String>,
    /// Desktop file id -> application name.
    file_owners: HashMap<String, String>,
    /// Application name -> types it is currently the default for.
    app_defaults: HashMap<String, BTreeSet<String>>,
}

impl AppCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Scan application directories, highest priority first.
    ///
    /// A desktop file id already seen in an earlier directory shadows later
    /// ones with the same id.
    pub fn scan(&mut self, dirs: &[PathBuf], resolver: &dyn MimeResolver, store: &DefaultsStore) {
        info!("Scanning {} application directories...", dirs.len());
        let mut seen_ids = HashSet::new();

        for dir in dirs {
            if !dir.is_dir() {
                continue;
            }
            debug!("Loading applications from {}", dir.display());

            let walker = walkdir::WalkDir::new(dir)
                .follow_links(true)
                .max_depth(3)
                .sort_by_file_name();

            for entry in walker.into_iter().filter_map(|e| e.ok()) {
                let path = entry.path();
                if !entry.file_type().is_file()
                    || path.extension().and_then(|e| e.to_str()) != Some("desktop")
                {
                    continue;
                }

                let Some(file_id) = desktop_file_id(dir, path) else {
                    continue;
                };
                if !seen_ids.insert(file_id.clone()) {
                    debug!("{} is shadowed by an earlier directory", path.display());
                    continue;
                }

                self.add_desktop_file(path, &file_id, resolver, store);
            }
        }

        info!(
            "App catalog: {} applications, {} groups",
            self.apps.len(),
            self.groups.len()
        );
    }

    /// Load one descriptor from disk. Unreadable files are skipped.
    pub fn add_desktop_file(
        &mut self,
        path: &Path,
        file_id: &str,
        resolver: &dyn MimeResolver,
        store: &DefaultsStore,
    ) {
        match load_desktop_file(path) {
            Ok(entry) => self.add_entry(file_id, &entry, resolver, store),
            Err(e) => warn!("Failed to read {}: {}", path.display(), e),
        }
    }

    /// Merge a parsed descriptor. Existing `(application, type)` pairs are
    /// never overwritten.
    pub fn add_entry(
        &mut self,
        file_id: &str,
        entry: &DesktopEntry,
        resolver: &dyn MimeResolver,
        store: &DefaultsStore,
    ) {
        if entry.name.is_none() && entry.mime_types.is_empty() {
            debug!("{file_id}: nothing to index");
            return;
        }

        let app_name = match &entry.name {
            Some(name) => name.clone(),
            None => {
                warn!("Missing name in {file_id}");
                file_id.to_string()
            }
        };

        let record = self
            .apps
            .entry(app_name.clone())
            .or_insert_with(|| AppRecord::new(&app_name));

        if !record.desktop_files.iter().any(|f| f == file_id) {
            record.desktop_files.push(file_id.to_string());
        }
        self.file_owners
            .entry(file_id.to_string())
            .or_insert_with(|| app_name.clone());

        if record.icon_name.is_none() {
            record.icon_name = entry.icon_name.clone();
        }

        for token in &entry.mime_types {
            let Some(mime) = resolve_type(resolver, token) else {
                debug!("{file_id}: unknown MIME type {:?}", token.trim());
                continue;
            };

            let Some((group, _)) = split_type(&mime) else {
                warn!("{file_id}: malformed MIME type {mime:?}");
                continue;
            };

            self.groups.insert(group.to_string());
            record
                .mime_types
                .entry(mime.clone())
                .or_insert_with(|| file_id.to_string());

            for parent in ancestors_before_octet_stream(resolver, &mime) {
                self.child_types
                    .entry(parent)
                    .or_default()
                    .insert(mime.clone());
            }
        }

        self.bridge_defaults(&app_name, file_id, store);
    }

    /// Carry the defaults recorded for `file_id` over to `app_name`.
    fn bridge_defaults(&mut self, app_name: &str, file_id: &str, store: &DefaultsStore) {
        if let Some(types) = store.types_for_file(file_id) {
            self.app_defaults
                .entry(app_name.to_string())
                .or_default()
                .extend(types.iter().cloned());
        }
    }

    /// Recompute the per-application defaults after the store changed.
    pub fn rebridge_defaults(&mut self, store: &DefaultsStore) {
        self.app_defaults.clear();

        let files: Vec<(String, String)> = self
            .apps
            .values()
            .flat_map(|app| app.desktop_files.iter().map(|f| (app.name.clone(), f.clone())))
            .collect();
        for (app_name, file_id) in files {
            self.bridge_defaults(&app_name, &file_id, store);
        }
    }

    pub fn get_app(&self, name: &str) -> Option<&AppRecord> {
        self.apps.get(name)
    }

    /// All applications, sorted by name.
    pub fn apps(&self) -> impl Iterator<Item = &AppRecord> {
        self.apps.values()
    }

    /// Applications declaring at least one type in `group`.
    pub fn apps_in_group<'a>(&'a self, group: Option<&'a str>) -> impl Iterator<Item = &'a AppRecord> {
        self.apps
            .values()
            .filter(move |app| app.mime_types.keys().any(|m| in_group(m, group)))
    }

    pub fn groups(&self) -> &BTreeSet<String> {
        &self.groups
    }

    pub fn child_types(&self, parent: &str) -> Option<&BTreeSet<String>> {
        self.child_types.get(parent)
    }

    pub fn app_for_file(&self, file_id: &str) -> Option<&str> {
        self.file_owners.get(file_id).map(String::as_str)
    }

    /// Types the application itself declares.
    pub fn official_types(&self, app_name: &str, group: Option<&str>) -> BTreeSet<String> {
        self.apps
            .get(app_name)
            .map(|app| {
                app.mime_types
                    .keys()
                    .filter(|m| in_group(m, group))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Types supported only because a parent type is declared.
    pub fn implied_types(&self, app_name: &str, group: Option<&str>) -> BTreeSet<String> {
        let Some(app) = self.apps.get(app_name) else {
            return BTreeSet::new();
        };

        let mut reached = BTreeSet::new();
        let mut queue: VecDeque<&String> = app.mime_types.keys().collect();
        while let Some(mime) = queue.pop_front() {
            for child in self.child_types.get(mime).into_iter().flatten() {
                if reached.insert(child.clone()) {
                    queue.push_back(child);
                }
            }
        }

        reached
            .into_iter()
            .filter(|m| !app.mime_types.contains_key(m) && in_group(m, group))
            .collect()
    }

    /// Every type any application declares.
    pub fn all_types(&self) -> BTreeSet<&str> {
        self.apps
            .values()
            .flat_map(|app| app.mime_types.keys().map(String::as_str))
            .collect()
    }

    /// Types the application is currently the default for.
    pub fn default_types(&self, app_name: &str) -> Option<&BTreeSet<String>> {
        self.app_defaults.get(app_name)
    }
}

/// XDG desktop file id: the path below the applications directory with
/// separators replaced by `-`.
fn desktop_file_id(dir: &Path, path: &Path) -> Option<String> {
    let relative = path.strip_prefix(dir).ok()?;
    let parts: Vec<&str> = relative
        .components()
        .map(|c| c.as_os_str().to_str())
        .collect::<Option<_>>()?;
    Some(parts.join("-"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::desktop_entry::parse_desktop_entry;
    use crate::mime::OCTET_STREAM;
    use crate::mime_db::SharedMimeDb;

    fn db() -> SharedMimeDb {
        SharedMimeDb::default()
            .with_type("text/plain")
            .with_type("image/png")
            .with_type("application/x-foo")
            .with_parent("text/x-csrc", "text/plain")
            .with_parent("text/x-c++src", "text/x-csrc")
            .with_parent("text/plain", OCTET_STREAM)
            .with_parent("application/x-weird", OCTET_STREAM)
            .with_alias("text/x-c", "text/x-csrc")
    }

    fn add(catalog: &mut AppCatalog, file_id: &str, content: &str) {
        let store = DefaultsStore::new("/nonexistent/mimeapps.list");
        catalog.add_entry(file_id, &parse_desktop_entry(content), &db(), &store);
    }

    #[test]
    fn test_first_writer_wins() {
        let mut catalog = AppCatalog::new();
        add(&mut catalog, "d1.desktop", "[Desktop Entry]\nName=Foo\nMimeType=text/plain;\n");
        add(&mut catalog, "d2.desktop", "[Desktop Entry]\nName=Foo\nMimeType=text/plain;application/x-foo;\n");

        let foo = catalog.get_app("Foo").unwrap();
        assert_eq!(foo.source_file("text/plain"), Some("d1.desktop"));
        assert_eq!(foo.source_file("application/x-foo"), Some("d2.desktop"));
        assert_eq!(foo.desktop_files, vec!["d1.desktop", "d2.desktop"]);
        assert_eq!(foo.primary_file(), Some("d1.desktop"));
    }

    #[test]
    fn test_invalid_tokens_skipped() {
        let mut catalog = AppCatalog::new();
        add(
            &mut catalog,
            "app.desktop",
            "[Desktop Entry]\nName=App\nMimeType=bogus/nothing;text/x-c; image/png ;x-scheme-handler/mailto;application/pkcs12;\n",
        );

        let types = catalog.official_types("App", None);
        let expected: BTreeSet<String> = [
            "application/x-pkcs12",
            "image/png",
            "text/x-csrc",
            "x-scheme-handler/mailto",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect();
        assert_eq!(types, expected);

        let groups: Vec<&str> = catalog.groups().iter().map(String::as_str).collect();
        assert_eq!(groups, vec!["application", "image", "text", "x-scheme-handler"]);
    }

    #[test]
    fn test_child_types_stop_at_octet_stream() {
        let mut catalog = AppCatalog::new();
        add(&mut catalog, "c.desktop", "[Desktop Entry]\nName=C\nMimeType=text/x-c++src;application/x-weird;\n");

        assert!(catalog.child_types("text/x-csrc").unwrap().contains("text/x-c++src"));
        assert!(catalog.child_types("text/plain").unwrap().contains("text/x-c++src"));
        assert!(catalog.child_types(OCTET_STREAM).is_none());
    }

    #[test]
    fn test_implied_types() {
        let mut catalog = AppCatalog::new();
        add(&mut catalog, "editor.desktop", "[Desktop Entry]\nName=Editor\nMimeType=text/plain;text/x-csrc;\n");
        add(&mut catalog, "ide.desktop", "[Desktop Entry]\nName=IDE\nMimeType=text/x-c++src;image/png;\n");

        let implied: Vec<String> = catalog.implied_types("Editor", None).into_iter().collect();
        assert_eq!(implied, vec!["text/x-c++src"]);
        assert!(catalog.implied_types("Editor", Some("image")).is_empty());
        assert!(catalog.implied_types("Nobody", None).is_empty());

        assert_eq!(catalog.official_types("IDE", Some("image")).len(), 1);
        let in_text: Vec<&str> = catalog.apps_in_group(Some("text")).map(|a| a.name.as_str()).collect();
        assert_eq!(in_text, vec!["Editor", "IDE"]);
        assert_eq!(catalog.apps_in_group(Some("image")).count(), 1);
    }

    #[test]
    fn test_icon_and_missing_name() {
        let mut catalog = AppCatalog::new();
        add(&mut catalog, "a.desktop", "[Desktop Entry]\nName=A\nMimeType=text/plain;\n");
        add(&mut catalog, "a2.desktop", "[Desktop Entry]\nName=A\nIcon=a-icon\n");
        add(&mut catalog, "a3.desktop", "[Desktop Entry]\nName=A\nIcon=other\n");
        add(&mut catalog, "nameless.desktop", "[Desktop Entry]\nMimeType=image/png;\n");
        add(&mut catalog, "broken.desktop", "Name=Broken\n");

        assert_eq!(catalog.get_app("A").unwrap().icon_name.as_deref(), Some("a-icon"));
        assert!(catalog.get_app("nameless.desktop").is_some());
        assert!(catalog.get_app("Broken").is_none());
        assert_eq!(catalog.app_for_file("a2.desktop"), Some("A"));
    }

    #[test]
    fn test_in_group() {
        assert!(in_group("image/png", Some("image")));
        assert!(!in_group("image/png", Some("imag")));
        assert!(!in_group("imagex/png", Some("image")));
        assert!(in_group("image/png", None));
    }

    #[test]
    fn test_desktop_file_id() {
        let dir = Path::new("/usr/share/applications");
        assert_eq!(
            desktop_file_id(dir, &dir.join("kde4/okular.desktop")).as_deref(),
            Some("kde4-okular.desktop")
        );
        assert_eq!(desktop_file_id(dir, &dir.join("gimp.desktop")).as_deref(), Some("gimp.desktop"));
    }
}
