//! The association engine: explicit load step, read queries and the single
//! write operation.

use crate::catalog::AppCatalog;
use crate::config::EngineConfig;
use crate::error::{AssocError, Result};
use crate::icons::{IconIndex, MimeIcon, MimeIconCache};
use crate::mime::{MimeResolver, resolve_type_or_raw};
use crate::mime_db::SharedMimeDb;
use crate::mimeapps::{DefaultsStore, DefaultsUpdate};
use log::{info, warn};
use serde::Serialize;
use std::collections::BTreeSet;
use std::path::PathBuf;

/// One row of the application list.
#[derive(Clone, Debug, Serialize)]
pub struct ApplicationSummary {
    pub name: String,
    pub icon_name: Option<String>,
    pub icon_path: Option<PathBuf>,
    pub desktop_file: Option<String>,
    pub type_count: usize,
}

/// One row of the type list for a selected application.
#[derive(Clone, Debug, Serialize)]
pub struct TypeEntry {
    pub mime_type: String,
    pub label: String,
    pub icon_path: Option<PathBuf>,
    /// Supported only through a parent type.
    pub implied: bool,
    /// The application is the current default for this type.
    pub is_default: bool,
}

#[derive(Clone, Debug, Serialize)]
pub struct DefaultEntry {
    pub mime_type: String,
    pub desktop_file: String,
    pub application: Option<String>,
}

pub struct Engine {
    resolver: Box<dyn MimeResolver>,
    catalog: AppCatalog,
    store: DefaultsStore,
    icon_index: IconIndex,
    mime_icons: MimeIconCache,
}

impl Engine {
    /// Build all indexes using the shared-mime-info database.
    pub fn load(config: &EngineConfig) -> Self {
        let resolver = SharedMimeDb::load(&config.mime_dirs);
        Self::load_with_resolver(config, Box::new(resolver))
    }

    /// Build all indexes. Current defaults are read before the scan so they
    /// can be attached to applications as descriptors are indexed.
    pub fn load_with_resolver(config: &EngineConfig, resolver: Box<dyn MimeResolver>) -> Self {
        let mut store = DefaultsStore::new(&config.mimeapps_path);
        store.read_current_defaults(resolver.as_ref());

        let mut catalog = AppCatalog::new();
        catalog.scan(&config.application_dirs, resolver.as_ref(), &store);

        let icon_index = IconIndex::build(&config.icon_roots);

        // Up front, so the first selection doesn't stall on icon lookups.
        let mut mime_icons = MimeIconCache::default();
        mime_icons.populate(catalog.all_types(), resolver.as_ref(), &icon_index);

        info!(
            "Engine ready: {} icons indexed, {} type icons cached",
            icon_index.len(),
            mime_icons.len()
        );

        Self {
            resolver,
            catalog,
            store,
            icon_index,
            mime_icons,
        }
    }

    pub fn catalog(&self) -> &AppCatalog {
        &self.catalog
    }

    pub fn store(&self) -> &DefaultsStore {
        &self.store
    }

    pub fn resolver(&self) -> &dyn MimeResolver {
        self.resolver.as_ref()
    }

    pub fn groups(&self) -> Vec<String> {
        self.catalog.groups().iter().cloned().collect()
    }

    pub fn mime_icon(&self, mime: &str) -> &MimeIcon {
        self.mime_icons.get(mime)
    }

    /// Applications with at least one type in `group`, sorted by name.
    pub fn applications(&self, group: Option<&str>) -> Vec<ApplicationSummary> {
        self.catalog
            .apps_in_group(group)
            .map(|app| ApplicationSummary {
                name: app.name.clone(),
                icon_name: app.icon_name.clone(),
                icon_path: app
                    .icon_name
                    .as_deref()
                    .and_then(|icon| self.icon_index.resolve(icon)),
                desktop_file: app.primary_file().map(String::from),
                type_count: app.mime_types.len(),
            })
            .collect()
    }

    /// Declared types first, then implied ones, each sorted by name.
    pub fn supported_types(&self, app_name: &str, group: Option<&str>) -> Result<Vec<TypeEntry>> {
        if self.catalog.get_app(app_name).is_none() {
            return Err(AssocError::UnknownApplication(app_name.to_string()));
        }

        let defaults = self.catalog.default_types(app_name);
        let official = self.catalog.official_types(app_name, group);
        let implied = self.catalog.implied_types(app_name, group);

        let entries = official
            .into_iter()
            .map(|mime| (mime, false))
            .chain(implied.into_iter().map(|mime| (mime, true)))
            .map(|(mime, implied)| TypeEntry {
                label: self.resolver.display_label(&mime),
                icon_path: self.mime_icons.get(&mime).path().map(PathBuf::from),
                is_default: defaults.is_some_and(|d| d.contains(&mime)),
                implied,
                mime_type: mime,
            })
            .collect();

        Ok(entries)
    }

    pub fn current_defaults(&self) -> Vec<DefaultEntry> {
        self.store
            .defaults()
            .iter()
            .map(|(mime, desktop_file)| DefaultEntry {
                mime_type: mime.clone(),
                desktop_file: desktop_file.clone(),
                application: self.catalog.app_for_file(desktop_file).map(String::from),
            })
            .collect()
    }

    /// Make `app_name` the default for `selected` and drop its defaults for
    /// `unselected`. Defaults held by other applications are left alone.
    pub fn set_default(
        &mut self,
        app_name: &str,
        selected: &BTreeSet<String>,
        unselected: &BTreeSet<String>,
    ) -> Result<()> {
        let app = self
            .catalog
            .get_app(app_name)
            .ok_or_else(|| AssocError::UnknownApplication(app_name.to_string()))?;

        let mut update = DefaultsUpdate::default();
        for mime in selected {
            let mime = resolve_type_or_raw(self.resolver.as_ref(), mime);
            match app.desktop_file_for(&mime) {
                Some(desktop_file) => {
                    update.selected.insert(mime, desktop_file.to_string());
                }
                None => warn!("{app_name} has no desktop file for {mime}"),
            }
        }
        for mime in unselected {
            let mime = resolve_type_or_raw(self.resolver.as_ref(), mime);
            if update.selected.contains_key(&mime) {
                continue;
            }
            // Implied types have no declaring descriptor and are never removed.
            let owned = app.source_file(&mime).map(String::from);
            update.unselected.insert(mime, owned);
        }

        self.store.write_update(self.resolver.as_ref(), &update)?;
        self.catalog.rebridge_defaults(&self.store);
        Ok(())
    }
}
