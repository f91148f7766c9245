//! INI settings for desktop applications: load them, describe them with a
//! template, validate them, and hand them to the UI.
//!
//! ```ignore
//! let template = Template::new()
//!     .section("general", |s| {
//!         s.field("theme", FieldType::String, "light")
//!             .validator("theme", &["theme"], one_of(&["light", "dark"]))
//!     });
//!
//! let mut store = ConfigStore::new(StoreOptions::new("myapp"));
//! store.register("settings", &template)?;
//! let theme = store.get_value("general.theme", "settings", false)?;
//! ```
//!
//! That call looks for `settings.ini` in the platform config directory,
//! parses it, validates it against a model generated from the template, and
//! falls back to the template's defaults for anything the file leaves out.
//!
//! # The INI format
//!
//! The [`ini`] module reads a deliberately small dialect:
//!
//! ```text
//! version=3            root-level pair
//! [general]            section header
//! theme = dark         one optional space around '='
//! autosave=TRUE        booleans are case-insensitive
//! ```
//!
//! Values are coerced bool → integer → string. There are no comments, no
//! quoting and no continuation lines; any line that is neither a header nor
//! a pair fails with its 1-based line number. Pairs before the first header
//! land at the root of the resulting table, each section becomes a nested
//! table. A section declared twice keeps only its last occurrence.
//!
//! # Templates and models
//!
//! A [`Template`] declares fields (name, [`FieldType`], default) and the
//! validators bound to them, either in named sections or, for small configs,
//! in the no-section scope. [`ModelRegistry::get_model`] turns a template
//! into a [`Model`]:
//!
//! - A template whose only scope is the no-section scope yields a **flat**
//!   model. Keys are plain field names (`"volume"`).
//! - Any named section yields a **nested** model, even when there is only
//!   one. Keys are `"section.field"`. The outer model has no validators;
//!   each section is a sub-schema whose default record is used when the
//!   input omits the section.
//!
//! Validators run after the standard type check and may transform the value
//! they accept. Validation collects every failing field into one
//! [`ValidationErrors`] instead of stopping at the first. A validator bound
//! to a field that does not exist in its section is a configuration error
//! raised when the model is generated, not when it is used.
//!
//! The registry caches models by name. Asking for the same name twice returns
//! the same `Arc<Model>` without looking at the template again; different
//! names never share a model. The registry is an ordinary value: a
//! [`ConfigStore`] owns one, tests create their own.
//!
//! # The store
//!
//! [`ConfigStore`] is the interface the settings widgets use:
//!
//! - [`get_value(key, config, use_internal)`](ConfigStore::get_value) reads
//!   the user value, or the template default when `use_internal` is set.
//! - [`set_value(key, value, config)`](ConfigStore::set_value) re-validates
//!   the values the user has set, plus the new one, and returns whether it
//!   was accepted.
//! - A [`SignalBus`] carries [`ConfigEvent`]s so several widgets bound to
//!   the same key stay in sync.
//!
//! Files are discovered on [`SearchPath`]s (priority-ascending, last wins)
//! and written back with [`save`](ConfigStore::save). Only values the user
//! has set are written; defaults stay in the template.
//!
//! # Language templates
//!
//! [`substitute`] fills `[...]]` placeholders of an XML language file with
//! translated lines, optionally restricted to one `<language id="...">`
//! region. It is independent of the rest of the crate.
//!
//! # Error handling
//!
//! All fallible operations return [`InifigError`]. Parse errors carry the
//! offending line and its number, validation errors list every failing
//! field, and file errors carry the path.
//!
//! # Logging
//!
//! The crate emits [`tracing`](https://docs.rs/tracing) events (`debug` for
//! model generation and file discovery, `warn` for repeated sections,
//! rejected values and exhausted translations) and never installs a
//! subscriber.

pub mod error;
pub mod ini;
pub mod model;
pub mod substitute;
pub mod template;
pub mod types;
pub mod validator;

mod file;
mod registry;
mod store;

#[cfg(test)]
mod fixtures;

pub use error::{FieldError, InifigError, ValidationErrors};
pub use model::{Instance, Model, ModelShape, NestedSection, Record, RecordSchema};
pub use registry::ModelRegistry;
pub use store::{ConfigEvent, ConfigStore, SignalBus, StoreOptions, SubscriptionId};
pub use substitute::SubstitutionReport;
pub use template::{FieldSpec, Template, TemplateSection, ValidationInfo};
pub use types::{FieldType, SearchPath, SectionKey};
pub use validator::{ValidationContext, ValidatorBinding, ValidatorFn};
