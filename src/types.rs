use std::fmt;
use std::path::PathBuf;

use toml::Value;

/// Where to search for config files.
///
/// Lists of search paths are **priority-ascending**: the last entry that
/// resolves wins, both for reading and for writing.
#[derive(Debug, Clone, PartialEq)]
pub enum SearchPath {
    /// Platform config directory (XDG on Linux, ~/Library/Application Support on macOS).
    Platform,
    /// A subdirectory under the user's home directory, e.g. `Home(".myapp")`.
    Home(&'static str),
    /// Current working directory.
    Cwd,
    /// An explicit absolute path.
    Path(PathBuf),
}

/// The partition a field, validator or key/value pair belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SectionKey {
    /// The reserved scope for entries declared outside any `[section]`.
    NoSection,
    Named(String),
}

impl SectionKey {
    pub fn named(name: impl Into<String>) -> Self {
        SectionKey::Named(name.into())
    }

    pub fn name(&self) -> Option<&str> {
        match self {
            SectionKey::NoSection => None,
            SectionKey::Named(n) => Some(n),
        }
    }

    /// Dotted path of `field` within this scope.
    pub fn field_path(&self, field: &str) -> String {
        match self {
            SectionKey::NoSection => field.to_string(),
            SectionKey::Named(section) => format!("{section}.{field}"),
        }
    }
}

impl fmt::Display for SectionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SectionKey::NoSection => write!(f, "the no-section scope"),
            SectionKey::Named(n) => write!(f, "section '{n}'"),
        }
    }
}

/// The value type a template field accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    Boolean,
    Integer,
    /// Also accepts integers and numeric strings.
    Float,
    String,
    /// No type check; any value passes to the validators unchanged.
    Any,
}

impl FieldType {
    /// Infer the field type from a default value.
    pub fn of(value: &Value) -> Self {
        match value {
            Value::Boolean(_) => FieldType::Boolean,
            Value::Integer(_) => FieldType::Integer,
            Value::Float(_) => FieldType::Float,
            Value::String(_) => FieldType::String,
            _ => FieldType::Any,
        }
    }

    /// Standard type check applied before any validator runs.
    ///
    /// Returns the (possibly widened) value, or a message describing the mismatch.
    /// Booleans also accept the integers `0` and `1`.
    pub fn check(self, value: &Value) -> Result<Value, String> {
        match (self, value) {
            (FieldType::Any, v) => Ok(v.clone()),
            (FieldType::Boolean, Value::Boolean(_))
            | (FieldType::Integer, Value::Integer(_))
            | (FieldType::Float, Value::Float(_))
            | (FieldType::String, Value::String(_)) => Ok(value.clone()),
            (FieldType::Float, Value::Integer(i)) => Ok(Value::Float(*i as f64)),
            (FieldType::Boolean, Value::Integer(i @ (0 | 1))) => Ok(Value::Boolean(*i == 1)),
            // INI values are never quoted, so the loader may have coerced a
            // string-typed setting into a scalar. Undo that here.
            (FieldType::String, Value::Integer(i)) => Ok(Value::String(i.to_string())),
            (FieldType::String, Value::Boolean(b)) => Ok(Value::String(b.to_string())),
            (FieldType::Float, Value::String(s)) => s
                .trim()
                .parse::<f64>()
                .map(Value::Float)
                .map_err(|_| format!("expected float, got '{s}'")),
            (expected, other) => Err(format!(
                "expected {expected}, got {}",
                other.type_str()
            )),
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FieldType::Boolean => "boolean",
            FieldType::Integer => "integer",
            FieldType::Float => "float",
            FieldType::String => "string",
            FieldType::Any => "any",
        };
        f.write_str(s)
    }
}
