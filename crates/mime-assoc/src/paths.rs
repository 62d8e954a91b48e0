//! Path helpers for XDG directories and config files.

use std::collections::{HashSet, VecDeque};
use std::fs;
use std::path::{Path, PathBuf};

const MIMEAPPS_LIST: &str = "mimeapps.list";
const FALLBACK_ICON_THEME: &str = "hicolor";

fn home_dir() -> PathBuf {
    dirs::home_dir().unwrap_or_default()
}

fn data_home() -> PathBuf {
    dirs::data_dir().unwrap_or_else(|| home_dir().join(".local/share"))
}

fn config_home() -> PathBuf {
    dirs::config_dir().unwrap_or_else(|| home_dir().join(".config"))
}

/// `XDG_DATA_DIRS`, defaulting per the basedir spec.
fn data_dirs() -> Vec<PathBuf> {
    std::env::var("XDG_DATA_DIRS")
        .ok()
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| "/usr/local/share:/usr/share".to_string())
        .split(':')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(PathBuf::from)
        .collect()
}

/// Drop repeated entries while keeping the first (highest priority) one.
fn dedup_in_order(paths: Vec<PathBuf>) -> Vec<PathBuf> {
    let mut seen = HashSet::new();
    paths.into_iter().filter(|p| seen.insert(p.clone())).collect()
}

/// Application .desktop directories, highest priority first.
pub fn get_application_directories() -> Vec<PathBuf> {
    let home = home_dir();
    let mut dirs = vec![data_home().join("applications")];

    for data_dir in data_dirs() {
        dirs.push(data_dir.join("applications"));
    }

    dirs.push(home.join(".local/share/flatpak/exports/share/applications"));
    dirs.push(PathBuf::from("/var/lib/flatpak/exports/share/applications"));
    dirs.push(PathBuf::from("/var/lib/snapd/desktop/applications"));

    dedup_in_order(dirs)
}

/// Base icon directories (XDG + Flatpak + Snap).
pub fn get_icon_base_directories() -> Vec<PathBuf> {
    let home = home_dir();
    let mut dirs = vec![data_home().join("icons"), home.join(".icons")];

    for data_dir in data_dirs() {
        dirs.push(data_dir.join("icons"));
    }

    dirs.push(home.join(".local/share/flatpak/exports/share/icons"));
    dirs.push(PathBuf::from("/var/lib/flatpak/exports/share/icons"));
    dirs.push(PathBuf::from("/var/lib/snapd/desktop/icons"));

    for data_dir in data_dirs() {
        dirs.push(data_dir.join("pixmaps"));
    }
    dirs.push(PathBuf::from("/usr/share/pixmaps"));

    dedup_in_order(dirs)
}

/// shared-mime-info database directories, highest priority first.
pub fn get_mime_directories() -> Vec<PathBuf> {
    let mut dirs = vec![data_home().join("mime")];
    dirs.extend(data_dirs().into_iter().map(|d| d.join("mime")));
    dedup_in_order(dirs)
}

/// The per-user mimeapps.list.
pub fn get_mimeapps_path() -> PathBuf {
    config_home().join(MIMEAPPS_LIST)
}

/// Icon theme selected in the GTK settings, or hicolor.
pub fn get_icon_theme_name() -> String {
    let config_home = config_home();
    ["gtk-4.0", "gtk-3.0"]
        .iter()
        .find_map(|dir| {
            let settings = config_home.join(dir).join("settings.ini");
            read_ini_value(&settings, "Settings", "gtk-icon-theme-name")
        })
        .unwrap_or_else(|| FALLBACK_ICON_THEME.to_string())
}

fn read_ini_value(path: &Path, group: &str, key: &str) -> Option<String> {
    let content = fs::read_to_string(path).ok()?;
    let header = format!("[{group}]");
    let mut in_group = false;

    for line in content.lines() {
        let line = line.trim();
        if line.starts_with('[') {
            in_group = line == header;
            continue;
        }
        if !in_group {
            continue;
        }
        if let Some((k, v)) = line.split_once('=') {
            if k.trim() == key {
                let v = v.trim().trim_matches('"');
                return Some(v.to_string()).filter(|v| !v.is_empty());
            }
        }
    }

    None
}

/// Parsed index.theme content.
pub struct ParsedIconTheme {
    pub directories: Vec<String>,
    pub inherits: Vec<String>,
}

pub fn parse_icon_theme_index(theme_root: &Path) -> Option<ParsedIconTheme> {
    let content = fs::read_to_string(theme_root.join("index.theme")).ok()?;
    let mut directories = Vec::new();
    let mut inherits = Vec::new();
    let mut section = String::new();

    for line in content.lines() {
        let line = line.trim();
        if line.starts_with('[') {
            section = line.to_string();
            continue;
        }

        if section.eq_ignore_ascii_case("[Icon Theme]") {
            if let Some((k, v)) = line.split_once('=') {
                let values = v
                    .split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect();
                match k.trim() {
                    "Directories" => directories = values,
                    "Inherits" => inherits = values,
                    _ => {}
                }
            }
        }
    }

    Some(ParsedIconTheme {
        directories,
        inherits,
    })
}

/// Theme plus everything it inherits from, hicolor last.
pub fn get_icon_theme_order(theme: &str, base_dirs: &[PathBuf]) -> Vec<String> {
    let mut result = Vec::new();
    let mut visited = HashSet::new();
    let mut queue = VecDeque::from([theme.to_string()]);

    while let Some(theme) = queue.pop_front() {
        if !visited.insert(theme.clone()) {
            continue;
        }
        result.push(theme.clone());

        for base in base_dirs {
            if let Some(parsed) = parse_icon_theme_index(&base.join(&theme)) {
                queue.extend(parsed.inherits.into_iter().filter(|p| !visited.contains(p)));
                break; // Only parse first found theme instance
            }
        }
    }

    if !visited.contains(FALLBACK_ICON_THEME) {
        result.push(FALLBACK_ICON_THEME.to_string());
    }

    result
}

/// Icon search roots in preference order: theme directories first, then the
/// bare base directories as generic fallback.
pub fn get_icon_search_roots(theme: &str, base_dirs: &[PathBuf]) -> Vec<PathBuf> {
    let mut result = Vec::new();

    for theme in get_icon_theme_order(theme, base_dirs) {
        for base_dir in base_dirs {
            let theme_root = base_dir.join(&theme);
            if !theme_root.is_dir() {
                continue;
            }

            match parse_icon_theme_index(&theme_root) {
                Some(parsed) if !parsed.directories.is_empty() => {
                    result.extend(parsed.directories.iter().map(|d| theme_root.join(d)));
                }
                // Fallback for directories without index.theme
                _ => result.push(theme_root),
            }
        }
    }

    result.extend(base_dirs.iter().cloned());
    dedup_in_order(result)
}
