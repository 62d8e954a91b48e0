//! mime-assoc: Application/MIME association index for Linux desktops.
//!
//! Provides:
//! - Desktop entry parsing and an index of which application handles which
//!   MIME types, with first-seen-wins precedence across directories
//! - MIME hierarchy lookups through the shared-mime-info database
//! - Icon lookup for MIME types with a fallback cascade
//! - Safe read-patch-write of the user's mimeapps.list

mod catalog;
mod config;
mod desktop_entry;
mod engine;
mod error;
mod icons;
mod mime;
mod mime_db;
mod mimeapps;
mod paths;

pub use catalog::{AppCatalog, AppRecord, in_group};
pub use config::EngineConfig;
pub use desktop_entry::{DesktopEntry, load_desktop_file, parse_desktop_entry};
pub use engine::{ApplicationSummary, DefaultEntry, Engine, TypeEntry};
pub use error::{AssocError, Result};
pub use icons::{IconIndex, MimeIcon, MimeIconCache, resolve_mime_icon};
pub use mime::{MimeResolver, OCTET_STREAM, resolve_type, split_type};
pub use mime_db::SharedMimeDb;
pub use mimeapps::{
    ConfigDocument, DEFAULT_APPLICATIONS_GROUP, DefaultsStore, DefaultsUpdate, Line,
    patch_document,
};
