//! Engine configuration: where descriptors, icons, the MIME database and
//! mimeapps.list live.

use crate::paths;
use std::path::PathBuf;

#[derive(Clone, Debug)]
pub struct EngineConfig {
    /// Scanned in order; earlier directories take precedence.
    pub application_dirs: Vec<PathBuf>,
    /// Icon search roots, theme-specific directories first.
    pub icon_roots: Vec<PathBuf>,
    /// shared-mime-info directories, highest priority first.
    pub mime_dirs: Vec<PathBuf>,
    /// The mimeapps.list being read and patched.
    pub mimeapps_path: PathBuf,
}

impl EngineConfig {
    /// Standard XDG locations for the current user.
    pub fn from_env() -> Self {
        let theme = paths::get_icon_theme_name();
        let icon_bases = paths::get_icon_base_directories();

        Self {
            application_dirs: paths::get_application_directories(),
            icon_roots: paths::get_icon_search_roots(&theme, &icon_bases),
            mime_dirs: paths::get_mime_directories(),
            mimeapps_path: paths::get_mimeapps_path(),
        }
    }
}
