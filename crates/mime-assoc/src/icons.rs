//! Icon indexing and the per-type icon cascade.

use crate::mime::MimeResolver;
use log::debug;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

const ICON_EXTENSIONS: [&str; 5] = ["svg", "svgz", "png", "xpm", "webp"];

/// Index of icon name (lowercase, no ext) -> path.
#[derive(Debug, Default)]
pub struct IconIndex {
    index: HashMap<String, PathBuf>,
}

impl IconIndex {
    /// Walk the roots in order. The first file seen for a name wins, so
    /// theme directories must come before generic ones.
    pub fn build(roots: &[PathBuf]) -> Self {
        let mut index = HashMap::new();
        debug!("Scanning {} icon directories...", roots.len());

        for dir_path in roots {
            if !dir_path.is_dir() {
                continue;
            }

            let walker = walkdir::WalkDir::new(dir_path)
                .follow_links(true)
                .max_depth(10)
                .sort_by_file_name();

            for entry in walker.into_iter().filter_map(|e| e.ok()) {
                if !entry.file_type().is_file() {
                    continue;
                }

                let path = entry.path();
                let ext = match path.extension().and_then(|e| e.to_str()) {
                    Some(e) => e.to_lowercase(),
                    None => continue,
                };

                if !ICON_EXTENSIONS.contains(&ext.as_str()) {
                    continue;
                }

                let stem = match path.file_stem().and_then(|s| s.to_str()) {
                    Some(s) => s.to_lowercase(),
                    None => continue,
                };

                index.entry(stem).or_insert_with(|| path.to_path_buf());
            }
        }

        debug!("Indexed {} icons", index.len());
        Self { index }
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Exact lookup by icon name.
    pub fn lookup(&self, name: &str) -> Option<&Path> {
        self.index.get(&name.to_lowercase()).map(PathBuf::as_path)
    }

    /// Resolve an application's `Icon=` value, which may be an absolute path.
    pub fn resolve(&self, name: &str) -> Option<PathBuf> {
        if name.starts_with('/') {
            let path = PathBuf::from(name);
            return path.exists().then_some(path);
        }
        self.lookup(name).map(Path::to_path_buf)
    }
}

/// Icon resolved for a MIME type.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MimeIcon {
    File(PathBuf),
    Unknown,
}

static UNKNOWN_ICON: MimeIcon = MimeIcon::Unknown;

impl MimeIcon {
    pub fn path(&self) -> Option<&Path> {
        match self {
            MimeIcon::File(path) => Some(path),
            MimeIcon::Unknown => None,
        }
    }
}

/// Look a type's icon up with progressively less specific names.
pub fn resolve_mime_icon(resolver: &dyn MimeResolver, index: &IconIndex, canonical: &str) -> MimeIcon {
    let specific = resolver.icon_name(canonical);
    let generic = resolver.generic_icon_name(canonical);

    let mut candidates = vec![specific.clone(), generic.clone()];

    // "application-x-foo+xml" -> "application-x-foo" -> "application-x"
    let mut truncated = specific;
    if let Some(split) = truncated.rfind('+') {
        truncated.truncate(split);
        candidates.push(truncated.clone());
    }
    if let Some(split) = truncated.rfind('-') {
        truncated.truncate(split);
        candidates.push(truncated);
    }
    candidates.push(generic);

    candidates
        .iter()
        .find_map(|name| index.lookup(name))
        .map(|path| MimeIcon::File(path.to_path_buf()))
        .unwrap_or(MimeIcon::Unknown)
}

/// Resolved icons per type. Entries never change once computed.
#[derive(Debug, Default)]
pub struct MimeIconCache {
    icons: HashMap<String, MimeIcon>,
}

impl MimeIconCache {
    pub fn populate<'a>(
        &mut self,
        types: impl IntoIterator<Item = &'a str>,
        resolver: &dyn MimeResolver,
        index: &IconIndex,
    ) {
        for mime in types {
            if self.icons.contains_key(mime) {
                continue;
            }
            let icon = resolve_mime_icon(resolver, index, mime);
            self.icons.insert(mime.to_string(), icon);
        }
    }

    pub fn get(&self, mime: &str) -> &MimeIcon {
        self.icons.get(mime).unwrap_or(&UNKNOWN_ICON)
    }

    pub fn len(&self) -> usize {
        self.icons.len()
    }

    pub fn is_empty(&self) -> bool {
        self.icons.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mime_db::SharedMimeDb;
    use std::fs;
    use tempfile::TempDir;

    fn touch(path: &Path) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, b"").unwrap();
    }

    #[test]
    fn test_first_root_wins() {
        let temp_dir = TempDir::new().unwrap();
        let theme = temp_dir.path().join("theme");
        let generic = temp_dir.path().join("pixmaps");
        touch(&theme.join("48x48/image-png.svg"));
        touch(&generic.join("image-png.png"));
        touch(&generic.join("readme.txt"));

        let index = IconIndex::build(&[theme.clone(), generic.clone()]);

        assert_eq!(index.lookup("image-png"), Some(theme.join("48x48/image-png.svg").as_path()));
        assert_eq!(index.lookup("IMAGE-PNG"), Some(theme.join("48x48/image-png.svg").as_path()));
        assert_eq!(index.lookup("readme"), None);
        assert_eq!(index.len(), 1);
    }

    #[test]
    fn test_cascade_steps() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path().to_path_buf();
        touch(&root.join("image-png.svg"));
        touch(&root.join("text-x-generic.svg"));
        touch(&root.join("application-x-foo.svg"));
        touch(&root.join("application-vnd.oasis.svg"));

        let index = IconIndex::build(&[root.clone()]);
        let db = SharedMimeDb::default()
            .with_type("image/png")
            .with_type("text/markdown")
            .with_icon("application/x-foo+xml", "application-x-foo+xml")
            .with_icon("application/vnd.oasis-text", "application-vnd.oasis-text")
            .with_type("audio/x-nothing");

        // (a) specific
        assert_eq!(resolve_mime_icon(&db, &index, "image/png"), MimeIcon::File(root.join("image-png.svg")));
        // (b) generic
        assert_eq!(resolve_mime_icon(&db, &index, "text/markdown"), MimeIcon::File(root.join("text-x-generic.svg")));
        // (c) strip "+suffix"
        assert_eq!(
            resolve_mime_icon(&db, &index, "application/x-foo+xml"),
            MimeIcon::File(root.join("application-x-foo.svg"))
        );
        // (d) strip "-suffix"
        assert_eq!(
            resolve_mime_icon(&db, &index, "application/vnd.oasis-text"),
            MimeIcon::File(root.join("application-vnd.oasis.svg"))
        );
        assert_eq!(resolve_mime_icon(&db, &index, "audio/x-nothing"), MimeIcon::Unknown);
    }

    #[test]
    fn test_cache_defaults_to_unknown() {
        let index = IconIndex::default();
        let db = SharedMimeDb::default().with_type("image/png");
        let mut cache = MimeIconCache::default();
        cache.populate(["image/png"], &db, &index);

        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get("image/png"), &MimeIcon::Unknown);
        assert_eq!(cache.get("never/seen"), &MimeIcon::Unknown);
    }
}
