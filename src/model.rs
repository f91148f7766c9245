//! Generated schemas and the records they validate.
//!
//! A [`Model`] is built once from a [`ValidationInfo`] and then validates any
//! number of input tables. Its shape follows the template:
//!
//! - **Flat**: the template only has the no-section scope. The model is a
//!   single [`RecordSchema`] whose fields are addressed directly (`"port"`).
//! - **Nested**: one [`RecordSchema`] per named section, addressed as
//!   `"section.field"`. The outer model has no validators of its own; a
//!   missing section takes its sub-schema's default record.
//!
//! Validation never stops at the first failure: every failing field is
//! reported in one [`ValidationErrors`].

use serde::de::DeserializeOwned;
use toml::{Table, Value};

use crate::error::{InifigError, ValidationErrors};
use crate::template::{FieldSpec, ValidationInfo};
use crate::types::SectionKey;
use crate::validator::{BoundValidator, ValidationContext, ValidatorBinding, ValidatorMode};

/// The values of one validated (or default-constructed) record.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    values: Table,
}

impl Record {
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.values.get(field)
    }

    pub fn as_table(&self) -> &Table {
        &self.values
    }

    pub fn into_table(self) -> Table {
        self.values
    }
}

/// Fields and bound validators of one section.
#[derive(Debug, Clone)]
pub struct RecordSchema {
    name: String,
    section: SectionKey,
    fields: Vec<FieldSpec>,
    validators: Vec<BoundValidator>,
}

impl RecordSchema {
    /// Build a record schema of `model`, binding each validator to its fields.
    ///
    /// Validators run after the type check, and every field they name must
    /// exist in `fields`.
    pub fn new(
        model: &str,
        name: &str,
        section: SectionKey,
        fields: Vec<FieldSpec>,
        bindings: &[ValidatorBinding],
    ) -> Result<Self, InifigError> {
        let known: Vec<&str> = fields.iter().map(|f| f.name.as_str()).collect();
        let validators = bindings
            .iter()
            .map(|b| {
                BoundValidator::bind(b, model, &section, &known, ValidatorMode::After, true)
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            name: name.to_string(),
            section,
            fields,
            validators,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn section(&self) -> &SectionKey {
        &self.section
    }

    pub fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }

    pub fn validators(&self) -> &[BoundValidator] {
        &self.validators
    }

    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// A record holding every field's default. No validation runs.
    pub fn construct(&self) -> Record {
        let values = self
            .fields
            .iter()
            .map(|f| (f.name.clone(), f.default.clone()))
            .collect();
        Record { values }
    }

    /// Validate `input` against this schema, pushing failures into `errors`.
    ///
    /// Missing fields take their defaults without running validators.
    /// Keys in `input` that are not fields are ignored.
    fn validate_into(&self, model: &str, input: &Table, errors: &mut ValidationErrors) -> Record {
        let mut data = Table::new();

        for field in &self.fields {
            let Some(raw) = input.get(&field.name) else {
                data.insert(field.name.clone(), field.default.clone());
                continue;
            };
            let path = self.section.field_path(&field.name);

            let mut value = match field.ty.check(raw) {
                Ok(v) => v,
                Err(msg) => {
                    errors.push(path, msg);
                    continue;
                }
            };

            let mut rejected = false;
            for validator in self.validators.iter().filter(|v| v.applies_to(&field.name)) {
                let ctx = ValidationContext {
                    model,
                    section: &self.section,
                    field: &field.name,
                    data: &data,
                };
                match validator.run(&value, &ctx) {
                    Ok(next) => value = next,
                    Err(msg) => {
                        errors.push(path.clone(), msg);
                        rejected = true;
                        break;
                    }
                }
            }

            if !rejected {
                data.insert(field.name.clone(), value);
            }
        }

        Record { values: data }
    }

    /// Validate `input` as a standalone record.
    pub fn validate(&self, input: &Table) -> Result<Record, InifigError> {
        let mut errors = ValidationErrors::new(&self.name);
        let record = self.validate_into(&self.name, input, &mut errors);
        if errors.is_empty() {
            Ok(record)
        } else {
            Err(InifigError::Validation(errors))
        }
    }
}

/// A section of a nested model: its sub-schema and prototype default record.
#[derive(Debug, Clone)]
pub struct NestedSection {
    pub name: String,
    pub schema: RecordSchema,
    pub default: Record,
}

#[derive(Debug, Clone)]
pub enum ModelShape {
    Flat(RecordSchema),
    Nested(Vec<NestedSection>),
}

/// A generated schema for one template.
#[derive(Debug, Clone)]
pub struct Model {
    name: String,
    shape: ModelShape,
}

impl Model {
    /// Generate a model from extracted template information.
    pub fn from_info(name: &str, info: &ValidationInfo) -> Result<Self, InifigError> {
        if let Some((orphan, _)) = info
            .validators
            .iter()
            .find(|(key, _)| !info.fields.iter().any(|(k, _)| k == key))
        {
            return Err(InifigError::Template {
                model: name.to_string(),
                reason: format!("validators declared for {orphan}, which has no fields"),
            });
        }

        if info.is_flat() {
            let (key, fields) = &info.fields[0];
            let schema =
                RecordSchema::new(name, name, key.clone(), fields.clone(), info.validators_for(key))?;
            return Ok(Self {
                name: name.to_string(),
                shape: ModelShape::Flat(schema),
            });
        }

        let mut sections = Vec::with_capacity(info.fields.len());
        for (key, fields) in &info.fields {
            let Some(section_name) = key.name() else {
                return Err(InifigError::Template {
                    model: name.to_string(),
                    reason: "fields outside a section cannot be mixed with named sections".into(),
                });
            };
            let schema = RecordSchema::new(
                name,
                section_name,
                key.clone(),
                fields.clone(),
                info.validators_for(key),
            )?;
            let default = schema.construct();
            sections.push(NestedSection {
                name: section_name.to_string(),
                schema,
                default,
            });
        }

        Ok(Self {
            name: name.to_string(),
            shape: ModelShape::Nested(sections),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn shape(&self) -> &ModelShape {
        &self.shape
    }

    pub fn is_flat(&self) -> bool {
        matches!(self.shape, ModelShape::Flat(_))
    }

    /// Look up a field by key: `"field"` for flat models, `"section.field"` for nested ones.
    pub fn field(&self, key: &str) -> Option<&FieldSpec> {
        match &self.shape {
            ModelShape::Flat(schema) => schema.field(key),
            ModelShape::Nested(sections) => {
                let (section, field) = key.split_once('.')?;
                sections
                    .iter()
                    .find(|s| s.name == section)?
                    .schema
                    .field(field)
            }
        }
    }

    /// Every field key of the model, in declaration order.
    pub fn keys(&self) -> Vec<String> {
        match &self.shape {
            ModelShape::Flat(schema) => schema.fields.iter().map(|f| f.name.clone()).collect(),
            ModelShape::Nested(sections) => sections
                .iter()
                .flat_map(|s| s.schema.fields.iter().map(|f| format!("{}.{}", s.name, f.name)))
                .collect(),
        }
    }

    /// An instance holding every default. No validation runs.
    pub fn defaults(&self) -> Instance {
        let records = match &self.shape {
            ModelShape::Flat(schema) => vec![(SectionKey::NoSection, schema.construct())],
            ModelShape::Nested(sections) => sections
                .iter()
                .map(|s| (SectionKey::named(&s.name), s.default.clone()))
                .collect(),
        };
        Instance { records }
    }

    /// Validate an input table, typically the output of [`ini::parse_str`](crate::ini::parse_str).
    pub fn validate(&self, input: &Table) -> Result<Instance, InifigError> {
        let mut errors = ValidationErrors::new(&self.name);

        let records = match &self.shape {
            ModelShape::Flat(schema) => {
                vec![(SectionKey::NoSection, schema.validate_into(&self.name, input, &mut errors))]
            }
            ModelShape::Nested(sections) => {
                let mut records = Vec::with_capacity(sections.len());
                for section in sections {
                    let record = match input.get(&section.name) {
                        None => section.default.clone(),
                        Some(Value::Table(table)) => {
                            section.schema.validate_into(&self.name, table, &mut errors)
                        }
                        Some(other) => {
                            errors.push(
                                &section.name,
                                format!("expected a section, got {}", other.type_str()),
                            );
                            section.default.clone()
                        }
                    };
                    records.push((SectionKey::named(&section.name), record));
                }
                records
            }
        };

        if errors.is_empty() {
            Ok(Instance { records })
        } else {
            Err(InifigError::Validation(errors))
        }
    }
}

/// Validated values of a model.
#[derive(Debug, Clone, PartialEq)]
pub struct Instance {
    records: Vec<(SectionKey, Record)>,
}

impl Instance {
    /// Get a value by key: `"field"` for flat models, `"section.field"` for nested ones.
    pub fn get(&self, key: &str) -> Option<&Value> {
        match self.records.as_slice() {
            [(SectionKey::NoSection, record)] => record.get(key),
            _ => {
                let (section, field) = key.split_once('.')?;
                self.section(section)?.get(field)
            }
        }
    }

    /// Replace an existing value without validation. Returns `false` if `key`
    /// is not a field of this instance.
    pub(crate) fn set(&mut self, key: &str, value: Value) -> bool {
        let (record, field) = match self.records.as_mut_slice() {
            [(SectionKey::NoSection, record)] => (record, key),
            records => {
                let Some((section, field)) = key.split_once('.') else {
                    return false;
                };
                let Some((_, record)) = records
                    .iter_mut()
                    .find(|(k, _)| k.name() == Some(section))
                else {
                    return false;
                };
                (record, field)
            }
        };
        match record.values.get_mut(field) {
            Some(slot) => {
                *slot = value;
                true
            }
            None => false,
        }
    }

    /// The record of a named section (nested models only).
    pub fn section(&self, name: &str) -> Option<&Record> {
        self.records
            .iter()
            .find(|(key, _)| key.name() == Some(name))
            .map(|(_, record)| record)
    }

    /// The instance as a table: fields at the root for flat models, one
    /// nested table per section otherwise.
    pub fn to_table(&self) -> Table {
        match self.records.as_slice() {
            [(SectionKey::NoSection, record)] => record.as_table().clone(),
            records => records
                .iter()
                .filter_map(|(key, record)| {
                    key.name()
                        .map(|n| (n.to_string(), Value::Table(record.as_table().clone())))
                })
                .collect(),
        }
    }

    /// Project the validated values into a typed struct.
    pub fn try_into_struct<T: DeserializeOwned>(&self) -> Result<T, InifigError> {
        Ok(Value::Table(self.to_table()).try_into()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::test::{flat_template, sectioned_template, AppSettings};
    use crate::ini;
    use crate::template::Template;
    use crate::types::FieldType;

    fn flat_model() -> Model {
        let info = ValidationInfo::extract("Flat", &flat_template()).unwrap();
        Model::from_info("Flat", &info).unwrap()
    }

    fn nested_model() -> Model {
        let info = ValidationInfo::extract("App", &sectioned_template()).unwrap();
        Model::from_info("App", &info).unwrap()
    }

    fn validation_errors(err: InifigError) -> ValidationErrors {
        match err {
            InifigError::Validation(errors) => errors,
            other => panic!("Expected Validation, got: {other:?}"),
        }
    }

    #[test]
    fn flat_model_exposes_fields_directly() {
        let model = flat_model();
        assert!(model.is_flat());
        assert_eq!(model.keys(), vec!["name", "volume", "muted"]);
        let defaults = model.defaults();
        assert_eq!(defaults.get("volume"), Some(&Value::Integer(50)));
        assert!(defaults.section("name").is_none());
    }

    #[test]
    fn nested_model_exposes_sections() {
        let model = nested_model();
        assert!(!model.is_flat());
        let defaults = model.defaults();
        assert_eq!(defaults.get("network.port"), Some(&Value::Integer(8080)));
        assert_eq!(
            defaults.section("general").unwrap().get("theme"),
            Some(&Value::String("light".into()))
        );
        assert_eq!(defaults.get("port"), None);
    }

    #[test]
    fn single_named_section_stays_nested() {
        let template = Template::new().section("only", |s| s.field("a", FieldType::Integer, 1));
        let info = ValidationInfo::extract("One", &template).unwrap();
        let model = Model::from_info("One", &info).unwrap();
        assert!(!model.is_flat());
        assert_eq!(model.keys(), vec!["only.a"]);
        assert_eq!(model.defaults().get("only.a"), Some(&Value::Integer(1)));
        assert_eq!(model.defaults().get("a"), None);
    }

    #[test]
    fn nested_defaults_are_sub_schema_prototypes() {
        let model = nested_model();
        let ModelShape::Nested(sections) = model.shape() else {
            panic!("expected nested shape");
        };
        for section in sections {
            assert_eq!(section.default, section.schema.construct());
            assert_eq!(section.schema.name(), section.name);
        }
    }

    #[test]
    fn validate_accepts_good_input() {
        let model = nested_model();
        let input = ini::parse_lines(["[general]", "theme=dark", "[network]", "port=9000"]).unwrap();
        let instance = model.validate(&input).unwrap();
        assert_eq!(instance.get("general.theme"), Some(&Value::String("dark".into())));
        assert_eq!(instance.get("network.port"), Some(&Value::Integer(9000)));
        assert_eq!(instance.get("general.autosave"), Some(&Value::Boolean(true)));
    }

    #[test]
    fn missing_section_uses_prototype() {
        let model = nested_model();
        let input = ini::parse_lines(["[general]", "theme=dark"]).unwrap();
        let instance = model.validate(&input).unwrap();
        assert_eq!(instance.get("network.port"), Some(&Value::Integer(8080)));
    }

    #[test]
    fn validator_rejection_names_field() {
        let model = nested_model();
        let input = ini::parse_lines(["[network]", "port=70000"]).unwrap();
        let errors = validation_errors(model.validate(&input).unwrap_err());
        assert_eq!(errors.errors.len(), 1);
        assert_eq!(errors.errors[0].path, "network.port");
        assert!(errors.errors[0].message.contains("between"));
    }

    #[test]
    fn every_failing_field_is_reported() {
        let model = nested_model();
        let input = ini::parse_lines([
            "[general]",
            "theme=purple",
            "autosave=maybe",
            "[network]",
            "port=0",
        ])
        .unwrap();
        let errors = validation_errors(model.validate(&input).unwrap_err());
        assert_eq!(errors.errors.len(), 3);
        assert!(errors.contains("general.theme"));
        assert!(errors.contains("general.autosave"));
        assert!(errors.contains("network.port"));
    }

    #[test]
    fn type_error_skips_validators() {
        let model = flat_model();
        let input = ini::parse_lines(["volume=loud"]).unwrap();
        let errors = validation_errors(model.validate(&input).unwrap_err());
        assert_eq!(errors.errors.len(), 1);
        assert_eq!(errors.errors[0].message, "expected integer, got string");
    }

    #[test]
    fn validators_transform_values() {
        let model = flat_model();
        let input = ini::parse_lines(["name=  padded  "]).unwrap();
        let instance = model.validate(&input).unwrap();
        assert_eq!(instance.get("name"), Some(&Value::String("padded".into())));
    }

    #[test]
    fn defaults_are_not_validated() {
        let template = Template::new().flat(|s| {
            s.field("level", FieldType::Integer, 0)
                .validator("positive", &["level"], |v, _| match v.as_integer() {
                    Some(i) if i > 0 => Ok(v.clone()),
                    _ => Err("must be positive".into()),
                })
        });
        let info = ValidationInfo::extract("Levels", &template).unwrap();
        let model = Model::from_info("Levels", &info).unwrap();
        assert!(model.validate(&Table::new()).is_ok());
        assert!(model.validate(&ini::parse_lines(["level=0"]).unwrap()).is_err());
    }

    #[test]
    fn validator_sees_earlier_fields() {
        let template = Template::new().flat(|s| {
            s.field("min", FieldType::Integer, 0)
                .field("max", FieldType::Integer, 10)
                .validator("ordered", &["max"], |v, ctx| {
                    let min = ctx.data.get("min").and_then(Value::as_integer).unwrap_or(0);
                    match v.as_integer() {
                        Some(max) if max >= min => Ok(v.clone()),
                        _ => Err(format!("must be at least {min}")),
                    }
                })
        });
        let info = ValidationInfo::extract("Bounds", &template).unwrap();
        let model = Model::from_info("Bounds", &info).unwrap();
        assert!(model.validate(&ini::parse_lines(["min=5", "max=7"]).unwrap()).is_ok());
        let errors =
            validation_errors(model.validate(&ini::parse_lines(["min=5", "max=3"]).unwrap()).unwrap_err());
        assert!(errors.contains("max"));
    }

    #[test]
    fn one_validator_on_several_fields() {
        let template = Template::new().flat(|s| {
            s.field("width", FieldType::Integer, 800)
                .field("height", FieldType::Integer, 600)
                .validator("size", &["width", "height"], crate::validator::range(100, 4000))
        });
        let info = ValidationInfo::extract("Window", &template).unwrap();
        let model = Model::from_info("Window", &info).unwrap();
        let errors = validation_errors(
            model
                .validate(&ini::parse_lines(["width=50", "height=5000"]).unwrap())
                .unwrap_err(),
        );
        assert!(errors.contains("width"));
        assert!(errors.contains("height"));
    }

    #[test]
    fn validator_with_unknown_field_fails_at_generation() {
        let template = Template::new().section("net", |s| {
            s.field("port", FieldType::Integer, 80)
                .validator("check", &["prot"], |v, _| Ok(v.clone()))
        });
        let info = ValidationInfo::extract("Typo", &template).unwrap();
        let err = Model::from_info("Typo", &info).unwrap_err();
        assert!(matches!(err, InifigError::UnknownValidatorField { .. }));
    }

    #[test]
    fn validator_cannot_reach_other_section() {
        let template = Template::new()
            .section("a", |s| s.field("x", FieldType::Integer, 1))
            .section("b", |s| {
                s.field("y", FieldType::Integer, 2)
                    .validator("cross", &["x"], |v, _| Ok(v.clone()))
            });
        let info = ValidationInfo::extract("Cross", &template).unwrap();
        assert!(Model::from_info("Cross", &info).is_err());
    }

    #[test]
    fn scalar_in_place_of_section_is_error() {
        let model = nested_model();
        let input = ini::parse_lines(["network=5"]).unwrap();
        let errors = validation_errors(model.validate(&input).unwrap_err());
        assert!(errors.contains("network"));
    }

    #[test]
    fn unknown_keys_are_ignored() {
        let model = flat_model();
        let instance = model.validate(&ini::parse_lines(["extra=1"]).unwrap()).unwrap();
        assert_eq!(instance.get("extra"), None);
    }

    #[test]
    fn instance_projects_into_struct() {
        let model = nested_model();
        let input = ini::parse_lines(["[general]", "theme=dark", "[network]", "port=9000"]).unwrap();
        let settings: AppSettings = model.validate(&input).unwrap().try_into_struct().unwrap();
        assert_eq!(settings.general.theme, "dark");
        assert!(settings.general.autosave);
        assert_eq!(settings.network.port, 9000);
    }

    #[test]
    fn projection_into_wrong_shape_is_a_convert_error() {
        let instance = flat_model().defaults();
        let err = instance.try_into_struct::<AppSettings>().unwrap_err();
        assert!(matches!(err, InifigError::Convert(_)));
        assert!(err.to_string().contains("general"));
    }

    #[test]
    fn unbound_validator_error_names_the_model() {
        let template = Template::new().section("general", |s| {
            s.field("theme", FieldType::String, "light")
                .validator("theme", &[], |v, _| Ok(v.clone()))
        });
        let info = ValidationInfo::extract("Settings", &template).unwrap();
        match Model::from_info("Settings", &info).unwrap_err() {
            InifigError::Template { model, reason } => {
                assert_eq!(model, "Settings");
                assert!(reason.contains("section 'general'"));
            }
            other => panic!("Expected Template, got: {other:?}"),
        }
    }

    #[test]
    fn to_table_round_trips_through_validate() {
        let model = nested_model();
        let defaults = model.defaults();
        assert_eq!(model.validate(&defaults.to_table()).unwrap(), defaults);
    }
}
