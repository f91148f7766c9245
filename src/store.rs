//! The settings store consumed by the UI.
//!
//! Each registered config pairs a generated [`Model`] with two instances:
//! the *internal* one (the template's defaults) and the *user* one (loaded
//! from `{config_name}.{extension}` on the search paths, or the defaults when
//! no file exists). Widgets read through [`ConfigStore::get_value`], write
//! through [`ConfigStore::set_value`], and stay in sync by subscribing to the
//! store's [`SignalBus`].

use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use toml::{Table, Value};
use tracing::{debug, warn};

use crate::error::InifigError;
use crate::file;
use crate::ini;
use crate::model::{Instance, Model};
use crate::registry::ModelRegistry;
use crate::template::Template;
use crate::types::SearchPath;

/// Where and how the store looks for config files.
#[derive(Debug, Clone, PartialEq)]
pub struct StoreOptions {
    app_name: String,
    extension: String,
    search_paths: Vec<SearchPath>,
}

impl StoreOptions {
    /// Options for `app_name`: `.ini` files in the platform config directory.
    pub fn new(app_name: &str) -> Self {
        Self {
            app_name: app_name.to_string(),
            extension: "ini".to_string(),
            search_paths: vec![SearchPath::Platform],
        }
    }

    /// Override the file extension (default: `"ini"`).
    pub fn extension(mut self, extension: &str) -> Self {
        self.extension = extension.trim_start_matches('.').to_string();
        self
    }

    /// Replace the search paths. The last entry has the highest priority.
    pub fn search_paths(mut self, paths: Vec<SearchPath>) -> Self {
        self.search_paths = paths;
        self
    }

    /// Append a search path with the highest priority so far.
    pub fn add_search_path(mut self, path: SearchPath) -> Self {
        self.search_paths.push(path);
        self
    }

    pub fn app_name(&self) -> &str {
        &self.app_name
    }

    fn file_name(&self, config_name: &str) -> String {
        format!("{config_name}.{}", self.extension)
    }
}

/// A notification carried by the [`SignalBus`].
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigEvent {
    /// A value changed in the store.
    ConfigUpdated {
        config: String,
        key: String,
        value: Value,
    },
    /// Every widget bound to `key` should reload `value`.
    UpdateConfigSettings {
        config: String,
        key: String,
        value: Value,
    },
}

impl ConfigEvent {
    pub fn key(&self) -> &str {
        match self {
            ConfigEvent::ConfigUpdated { key, .. } | ConfigEvent::UpdateConfigSettings { key, .. } => key,
        }
    }
}

pub type SubscriptionId = usize;

type Listener = Box<dyn FnMut(&ConfigEvent)>;

/// Synchronous publish/subscribe of [`ConfigEvent`]s.
///
/// Listeners run in subscription order, on the caller's thread, before
/// [`emit`](Self::emit) returns.
#[derive(Default)]
pub struct SignalBus {
    next_id: SubscriptionId,
    listeners: Vec<(SubscriptionId, Listener)>,
}

impl SignalBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&mut self, listener: impl FnMut(&ConfigEvent) + 'static) -> SubscriptionId {
        let id = self.next_id;
        self.next_id += 1;
        self.listeners.push((id, Box::new(listener)));
        id
    }

    /// Returns `false` if `id` was not subscribed.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(i, _)| *i != id);
        self.listeners.len() != before
    }

    pub fn emit(&mut self, event: &ConfigEvent) {
        for (_, listener) in &mut self.listeners {
            listener(event);
        }
    }

    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }
}

impl fmt::Debug for SignalBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SignalBus")
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

#[derive(Debug)]
struct ConfigEntry {
    model: Arc<Model>,
    internal: Instance,
    user: Instance,
    /// Values the user supplied, as given. Only these are re-validated and saved.
    explicit: Table,
    /// The file the user config was loaded from, if any.
    path: Option<PathBuf>,
}

/// Registered configs, their models, and the notification bus.
#[derive(Debug)]
pub struct ConfigStore {
    options: StoreOptions,
    registry: ModelRegistry,
    configs: HashMap<String, ConfigEntry>,
    bus: SignalBus,
}

impl ConfigStore {
    pub fn new(options: StoreOptions) -> Self {
        Self::with_registry(options, ModelRegistry::new())
    }

    /// Build a store around an existing model cache.
    pub fn with_registry(options: StoreOptions, registry: ModelRegistry) -> Self {
        Self {
            options,
            registry,
            configs: HashMap::new(),
            bus: SignalBus::new(),
        }
    }

    pub fn options(&self) -> &StoreOptions {
        &self.options
    }

    pub fn registry(&self) -> &ModelRegistry {
        &self.registry
    }

    pub fn bus_mut(&mut self) -> &mut SignalBus {
        &mut self.bus
    }

    /// Shorthand for `bus_mut().subscribe(listener)`.
    pub fn subscribe(&mut self, listener: impl FnMut(&ConfigEvent) + 'static) -> SubscriptionId {
        self.bus.subscribe(listener)
    }

    /// Register `config_name`, loading its user file from the search paths.
    ///
    /// A missing file leaves the user config at its defaults. A file that
    /// fails to parse or validate is an error.
    pub fn register(&mut self, config_name: &str, template: &Template) -> Result<(), InifigError> {
        let file_name = self.options.file_name(config_name);
        let found = file::find_config_file(
            &self.options.search_paths,
            &file_name,
            &self.options.app_name,
        )?;
        match found {
            Some((path, table)) => self.insert(config_name, template, Some(&table), Some(path)),
            None => {
                debug!(config = config_name, "no config file found, using defaults");
                self.insert(config_name, template, None, None)
            }
        }
    }

    /// Register `config_name` from INI text instead of a file.
    pub fn register_from_str(
        &mut self,
        config_name: &str,
        template: &Template,
        content: &str,
    ) -> Result<(), InifigError> {
        let table = ini::parse_str(content)?;
        self.insert(config_name, template, Some(&table), None)
    }

    fn insert(
        &mut self,
        config_name: &str,
        template: &Template,
        table: Option<&Table>,
        path: Option<PathBuf>,
    ) -> Result<(), InifigError> {
        let model = self.registry.get_model(config_name, template)?;
        let internal = model.defaults();
        let user = match table {
            Some(t) => model.validate(t)?,
            None => internal.clone(),
        };
        self.configs.insert(
            config_name.to_string(),
            ConfigEntry {
                model,
                internal,
                user,
                explicit: table.cloned().unwrap_or_default(),
                path,
            },
        );
        Ok(())
    }

    /// Names of every registered config, sorted.
    pub fn config_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.configs.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn model(&self, config_name: &str) -> Option<Arc<Model>> {
        self.configs.get(config_name).map(|e| Arc::clone(&e.model))
    }

    fn entry(&self, config_name: &str) -> Result<&ConfigEntry, InifigError> {
        self.configs
            .get(config_name)
            .ok_or_else(|| InifigError::UnknownConfig(config_name.to_string()))
    }

    /// Read `key` from the user config, or from the defaults when `use_internal` is set.
    pub fn get_value(
        &self,
        key: &str,
        config_name: &str,
        use_internal: bool,
    ) -> Result<Value, InifigError> {
        let entry = self.entry(config_name)?;
        let instance = if use_internal {
            &entry.internal
        } else {
            &entry.user
        };
        instance
            .get(key)
            .cloned()
            .ok_or_else(|| InifigError::KeyNotFound {
                key: key.to_string(),
                config: config_name.to_string(),
            })
    }

    /// Set `key` in the user config.
    ///
    /// Every value the user has set, plus the new one, is re-validated;
    /// defaults are not. On success the value is stored, a
    /// [`ConfigEvent::ConfigUpdated`] is emitted, and `true` is returned. A
    /// value the model rejects, or a string containing a line break, leaves
    /// the config untouched and returns `false`.
    pub fn set_value(
        &mut self,
        key: &str,
        value: impl Into<Value>,
        config_name: &str,
    ) -> Result<bool, InifigError> {
        let entry = self
            .configs
            .get_mut(config_name)
            .ok_or_else(|| InifigError::UnknownConfig(config_name.to_string()))?;
        if entry.model.field(key).is_none() {
            return Err(InifigError::KeyNotFound {
                key: key.to_string(),
                config: config_name.to_string(),
            });
        }

        let mut table = entry.explicit.clone();
        set_in_table(&mut table, key, value.into());

        let updated = match entry.model.validate(&table) {
            Ok(instance) => instance,
            Err(InifigError::Validation(errors)) => {
                warn!(config = config_name, key, "rejected value: {errors}");
                return Ok(false);
            }
            Err(e) => return Err(e),
        };
        let value = updated
            .get(key)
            .cloned()
            .ok_or_else(|| InifigError::KeyNotFound {
                key: key.to_string(),
                config: config_name.to_string(),
            })?;
        if let Value::String(s) = &value
            && s.contains(['\n', '\r'])
        {
            warn!(config = config_name, key, "rejected value: line breaks cannot be saved");
            return Ok(false);
        }
        entry.explicit = table;
        entry.user = updated;

        self.bus.emit(&ConfigEvent::ConfigUpdated {
            config: config_name.to_string(),
            key: key.to_string(),
            value,
        });
        Ok(true)
    }

    /// Restore `key` to its default and notify listeners.
    pub fn reset_value(&mut self, key: &str, config_name: &str) -> Result<(), InifigError> {
        let default = self.get_value(key, config_name, true)?;
        let entry = self
            .configs
            .get_mut(config_name)
            .ok_or_else(|| InifigError::UnknownConfig(config_name.to_string()))?;
        entry.user.set(key, default.clone());
        remove_from_table(&mut entry.explicit, key);
        self.bus.emit(&ConfigEvent::ConfigUpdated {
            config: config_name.to_string(),
            key: key.to_string(),
            value: default,
        });
        Ok(())
    }

    /// Ask every widget bound to `key` to reload its current value.
    pub fn request_update(&mut self, key: &str, config_name: &str) -> Result<(), InifigError> {
        let value = self.get_value(key, config_name, false)?;
        self.bus.emit(&ConfigEvent::UpdateConfigSettings {
            config: config_name.to_string(),
            key: key.to_string(),
            value,
        });
        Ok(())
    }

    /// Write the user config back to disk.
    ///
    /// Only values the user has set are written; everything else keeps
    /// following the template defaults. Writes to the file the config was
    /// loaded from, or else to the highest-priority search path. Returns the
    /// path written.
    pub fn save(&self, config_name: &str) -> Result<PathBuf, InifigError> {
        let entry = self.entry(config_name)?;
        let path = match &entry.path {
            Some(p) => p.clone(),
            None => file::resolve_write_path(
                &self.options.search_paths,
                &self.options.file_name(config_name),
                &self.options.app_name,
            )
            .ok_or_else(|| InifigError::NoWritePath(config_name.to_string()))?,
        };
        file::write_config_file(&path, &entry.persisted())?;
        Ok(path)
    }
}

impl ConfigEntry {
    /// The validated value of every field the user has set.
    fn persisted(&self) -> Table {
        let mut table = Table::new();
        for key in self.model.keys() {
            if get_in_table(&self.explicit, &key).is_some()
                && let Some(value) = self.user.get(&key)
            {
                set_in_table(&mut table, &key, value.clone());
            }
        }
        table
    }
}

fn get_in_table<'a>(table: &'a Table, key: &str) -> Option<&'a Value> {
    match key.split_once('.') {
        Some((section, field)) => table.get(section)?.as_table()?.get(field),
        None => table.get(key),
    }
}

/// Set a `"field"` or `"section.field"` key in a table, creating the section if needed.
fn set_in_table(table: &mut Table, key: &str, value: Value) {
    match key.split_once('.') {
        Some((section, field)) => {
            let slot = table
                .entry(section)
                .or_insert_with(|| Value::Table(Table::new()));
            if !slot.is_table() {
                *slot = Value::Table(Table::new());
            }
            if let Value::Table(section) = slot {
                section.insert(field.to_string(), value);
            }
        }
        None => {
            table.insert(key.to_string(), value);
        }
    }
}

fn remove_from_table(table: &mut Table, key: &str) {
    match key.split_once('.') {
        Some((section, field)) => {
            if let Some(Value::Table(section)) = table.get_mut(section) {
                section.remove(field);
            }
        }
        None => {
            table.remove(key);
        }
    }
}
