//! Declarative settings templates.
//!
//! A [`Template`] lists fields (name, type, default) grouped into sections,
//! plus the validators bound to them. [`ValidationInfo::extract`] checks the
//! template and partitions it by section; the [`model`](crate::model) module
//! turns that into a schema.
//!
//! ```ignore
//! let template = Template::new()
//!     .section("general", |s| {
//!         s.field("theme", FieldType::String, "light")
//!             .field("autosave", FieldType::Boolean, true)
//!             .validator("theme", &["theme"], one_of(&["light", "dark"]))
//!     })
//!     .section("network", |s| s.field("port", FieldType::Integer, 8080));
//! ```

use std::collections::HashSet;

use toml::{Table, Value};

use crate::error::InifigError;
use crate::ini;
use crate::types::{FieldType, SectionKey};
use crate::validator::{ValidationContext, ValidatorBinding};

/// One declared field.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldSpec {
    pub name: String,
    pub ty: FieldType,
    pub default: Value,
}

/// Fields and validators of one section (or the no-section scope).
#[derive(Debug, Clone)]
pub struct TemplateSection {
    pub key: SectionKey,
    pub fields: Vec<FieldSpec>,
    pub validators: Vec<ValidatorBinding>,
}

impl TemplateSection {
    fn new(key: SectionKey) -> Self {
        Self {
            key,
            fields: Vec::new(),
            validators: Vec::new(),
        }
    }

    /// Declare a field.
    pub fn field(mut self, name: &str, ty: FieldType, default: impl Into<Value>) -> Self {
        self.fields.push(FieldSpec {
            name: name.to_string(),
            ty,
            default: default.into(),
        });
        self
    }

    /// Bind a validator to one or more fields of this section.
    pub fn validator<F>(mut self, name: &str, fields: &[&str], validator: F) -> Self
    where
        F: Fn(&Value, &ValidationContext<'_>) -> Result<Value, String> + Send + Sync + 'static,
    {
        self.validators
            .push(ValidatorBinding::new(name, fields, validator));
        self
    }
}

/// A declarative description of a settings file.
#[derive(Debug, Clone, Default)]
pub struct Template {
    pub sections: Vec<TemplateSection>,
}

impl Template {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare fields outside any section. Produces a flat model when it is
    /// the only scope.
    pub fn flat(self, build: impl FnOnce(TemplateSection) -> TemplateSection) -> Self {
        self.push(build(TemplateSection::new(SectionKey::NoSection)))
    }

    /// Declare a named section.
    pub fn section(
        self,
        name: &str,
        build: impl FnOnce(TemplateSection) -> TemplateSection,
    ) -> Self {
        self.push(build(TemplateSection::new(SectionKey::named(name))))
    }

    fn push(mut self, section: TemplateSection) -> Self {
        self.sections.push(section);
        self
    }

    /// Build a validator-less template from a table of defaults.
    ///
    /// Root-level scalars become no-section fields, nested tables become
    /// sections. Field types are inferred from the default values. This is
    /// how an internal defaults file loaded with [`ini`](crate::ini) becomes a
    /// template.
    pub fn from_defaults(defaults: &Table) -> Self {
        let mut root = TemplateSection::new(SectionKey::NoSection);
        let mut sections = Vec::new();

        for (key, value) in defaults {
            match value {
                Value::Table(table) => {
                    let mut section = TemplateSection::new(SectionKey::named(key));
                    for (name, default) in table {
                        section = section.field(name, FieldType::of(default), default.clone());
                    }
                    sections.push(section);
                }
                scalar => root = root.field(key, FieldType::of(scalar), scalar.clone()),
            }
        }

        let mut template = Template::new();
        if !root.fields.is_empty() {
            template = template.push(root);
        }
        sections.into_iter().fold(template, Template::push)
    }
}

/// Fields and validators of a template, partitioned by section.
#[derive(Debug, Clone)]
pub struct ValidationInfo {
    /// `(section, fields)` in template order.
    pub fields: Vec<(SectionKey, Vec<FieldSpec>)>,
    /// `(section, validators)` for every section that declares any.
    pub validators: Vec<(SectionKey, Vec<ValidatorBinding>)>,
}

impl ValidationInfo {
    /// Check `template` and partition it by section.
    ///
    /// Fails on an empty template, duplicate sections or fields, defaults
    /// that do not match their declared type, validators in a section without
    /// fields, and templates mixing the no-section scope with named sections.
    /// Section and field names must be non-empty runs of letters, digits and
    /// underscores so they can be written to and read back from INI.
    pub fn extract(model: &str, template: &Template) -> Result<Self, InifigError> {
        let fail = |reason: String| InifigError::Template {
            model: model.to_string(),
            reason,
        };

        if template.sections.is_empty() {
            return Err(fail("template declares no sections".into()));
        }

        let has_root = template
            .sections
            .iter()
            .any(|s| s.key == SectionKey::NoSection);
        if has_root && template.sections.len() > 1 {
            return Err(fail(
                "fields outside a section cannot be mixed with named sections".into(),
            ));
        }

        let mut seen_sections = HashSet::new();
        let mut fields = Vec::new();
        let mut validators = Vec::new();

        for section in &template.sections {
            if let Some(name) = section.key.name()
                && !ini::is_name(name)
            {
                return Err(fail(format!("'{name}' is not a valid section name")));
            }
            if !seen_sections.insert(&section.key) {
                return Err(fail(format!("{} is declared twice", section.key)));
            }
            if section.fields.is_empty() && !section.validators.is_empty() {
                return Err(fail(format!("{} has validators but no fields", section.key)));
            }

            let mut seen_fields = HashSet::new();
            for field in &section.fields {
                if !ini::is_name(&field.name) {
                    return Err(fail(format!(
                        "'{}' in {} is not a valid field name",
                        field.name, section.key
                    )));
                }
                if !seen_fields.insert(field.name.as_str()) {
                    return Err(fail(format!(
                        "field '{}' is declared twice in {}",
                        field.name, section.key
                    )));
                }
                if let Err(reason) = field.ty.check(&field.default) {
                    return Err(fail(format!(
                        "default of '{}' does not match its type: {reason}",
                        section.key.field_path(&field.name)
                    )));
                }
            }

            fields.push((section.key.clone(), section.fields.clone()));
            if !section.validators.is_empty() {
                validators.push((section.key.clone(), section.validators.clone()));
            }
        }

        Ok(Self { fields, validators })
    }

    /// Validators declared for `section`, if any.
    pub fn validators_for(&self, section: &SectionKey) -> &[ValidatorBinding] {
        self.validators
            .iter()
            .find(|(key, _)| key == section)
            .map(|(_, v)| v.as_slice())
            .unwrap_or(&[])
    }

    /// A template is flat when its only partition is the no-section scope.
    pub fn is_flat(&self) -> bool {
        matches!(self.fields.as_slice(), [(SectionKey::NoSection, _)])
    }
}
