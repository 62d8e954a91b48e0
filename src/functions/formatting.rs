use mime_assoc::{ApplicationSummary, DefaultEntry, TypeEntry};

#[inline]
pub fn application_row(app: &ApplicationSummary) -> String {
    let file = app.desktop_file.as_deref().unwrap_or("-");
    format!("{} ({file}, {} types)", app.name, app.type_count)
}

/// Label and type name on one line, implied types marked with `~` and the
/// current defaults with `*`.
pub fn type_row(entry: &TypeEntry) -> String {
    let marker = match (entry.is_default, entry.implied) {
        (true, _) => '*',
        (false, true) => '~',
        (false, false) => ' ',
    };

    if entry.label == entry.mime_type {
        format!("{marker} {}", entry.mime_type)
    } else {
        format!("{marker} {}\t{}", entry.mime_type, entry.label)
    }
}

pub fn default_row(entry: &DefaultEntry) -> String {
    match &entry.application {
        Some(app) => format!("{}={} ({app})", entry.mime_type, entry.desktop_file),
        None => format!("{}={}", entry.mime_type, entry.desktop_file),
    }
}
