//! Desktop entry parsing.

use crate::error::Result;
use std::fs;
use std::path::Path;

const DESKTOP_ENTRY_GROUP: &str = "[Desktop Entry]";

/// The parts of a .desktop file the association index cares about.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DesktopEntry {
    pub name: Option<String>,
    pub icon_name: Option<String>,
    /// Raw `MimeType=` tokens, not yet resolved.
    pub mime_types: Vec<String>,
}

/// Parse the text of a .desktop file.
///
/// Only the leading `[Desktop Entry]` group is read. Anything before it, or a
/// different first group, yields an empty entry.
pub fn parse_desktop_entry(content: &str) -> DesktopEntry {
    let mut entry = DesktopEntry::default();
    let mut in_desktop_entry = false;

    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        if line.starts_with('[') {
            if !in_desktop_entry && line == DESKTOP_ENTRY_GROUP {
                in_desktop_entry = true;
                continue;
            }
            // [Desktop Entry] must be the first group and group names are unique.
            break;
        }

        if !in_desktop_entry {
            break;
        }

        let Some((key, value)) = line.split_once('=') else {
            continue;
        };
        let value = value.trim();

        match key.trim() {
            "Name" => entry.name = Some(value.to_string()).filter(|v| !v.is_empty()),
            "Icon" => entry.icon_name = Some(value.to_string()).filter(|v| !v.is_empty()),
            "MimeType" => {
                entry.mime_types = value
                    .split(';')
                    .filter(|t| !t.trim().is_empty())
                    .map(String::from)
                    .collect();
            }
            _ => {}
        }
    }

    entry
}

/// Read and parse a .desktop file from disk.
pub fn load_desktop_file(path: &Path) -> Result<DesktopEntry> {
    let content = fs::read_to_string(path)?;
    Ok(parse_desktop_entry(&content))
}
