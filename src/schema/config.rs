//! JSON configuration for schema descriptors.
//!
//! A config document mirrors [`SchemaBuilder`]:
//!
//! ```json
//! {
//!   "sheet_names": ["Employees.*"],
//!   "fields": [
//!     { "key": "name",   "column": "(?i)name", "kind": { "scalar": "string" }, "required": true },
//!     { "key": "gender", "column": "Gender",   "kind": { "enum": ["MALE", "FEMALE"] },
//!       "pre_process": ["enum_name"] },
//!     { "key": "bonus",  "column": "Bonus \\d+", "kind": { "list": "double" },
//!       "min_matches": 1, "unbounded": true }
//!   ],
//!   "inject": [{ "key": "row", "kind": "row_number" }]
//! }
//! ```
//!
//! Pre-processors are referenced by builtin name (see [`PreProcessor::BUILTINS`]).

use std::path::Path;

use serde::Deserialize;

use super::{ColumnOptions, FieldSpec, InjectKind, PreProcessor, SchemaBuilder, SchemaDescriptor};
use crate::error::{ImportError, ImportResult};
use crate::types::{FieldKind, MapKeyKind, ScalarType};

/// Top-level schema configuration document.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SchemaConfig {
    #[serde(default = "default_true")]
    pub has_header: bool,
    #[serde(default = "default_true")]
    pub named: bool,
    #[serde(default)]
    pub sheet_names: Vec<String>,
    #[serde(default)]
    pub sheet_indices: Vec<usize>,
    pub fields: Vec<FieldConfig>,
    #[serde(default)]
    pub inject: Vec<InjectConfig>,
}

/// One declared field. Exactly one of `column` and `ordinal` must be set.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FieldConfig {
    pub key: String,
    #[serde(default)]
    pub column: Option<String>,
    #[serde(default)]
    pub ordinal: Option<usize>,
    pub kind: KindConfig,
    #[serde(default = "default_one")]
    pub min_matches: usize,
    #[serde(default)]
    pub max_matches: Option<usize>,
    /// Overrides `max_matches` with "no upper bound".
    #[serde(default)]
    pub unbounded: bool,
    #[serde(default)]
    pub required: bool,
    #[serde(default = "default_true")]
    pub trim: bool,
    #[serde(default = "default_true")]
    pub formula_allowed: bool,
    #[serde(default)]
    pub matches: Option<String>,
    #[serde(default)]
    pub pre_process: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KindConfig {
    Scalar(ScalarType),
    List(ScalarType),
    Map { key: MapKeyKind, value: ScalarType },
    Enum(Vec<String>),
    Custom,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct InjectConfig {
    pub key: String,
    pub kind: InjectKind,
}

fn default_true() -> bool {
    true
}

fn default_one() -> usize {
    1
}

impl From<KindConfig> for FieldKind {
    fn from(value: KindConfig) -> Self {
        match value {
            KindConfig::Scalar(ty) => FieldKind::Scalar(ty),
            KindConfig::List(ty) => FieldKind::List(ty),
            KindConfig::Map { key, value } => FieldKind::Map { key, value },
            KindConfig::Enum(allowed) => FieldKind::Enum { allowed },
            KindConfig::Custom => FieldKind::Custom,
        }
    }
}

impl FieldConfig {
    fn into_spec(self) -> ImportResult<FieldSpec> {
        let mut options = ColumnOptions {
            required: self.required,
            trim: self.trim,
            formula_allowed: self.formula_allowed,
            matches: self.matches,
            pre_process: Vec::with_capacity(self.pre_process.len()),
        };
        for name in &self.pre_process {
            let pre = PreProcessor::builtin(name).ok_or_else(|| {
                ImportError::schema(format!(
                    "field '{}': unknown pre-processor '{name}' (expected one of: {})",
                    self.key,
                    PreProcessor::BUILTINS.join(", ")
                ))
            })?;
            options.pre_process.push(pre);
        }

        let kind = FieldKind::from(self.kind);
        let spec = match (self.column, self.ordinal) {
            (Some(pattern), None) => FieldSpec::named(self.key, pattern, kind),
            (None, Some(index)) => FieldSpec::ordinal(self.key, index, kind),
            _ => {
                return Err(ImportError::schema(format!(
                    "field '{}': set exactly one of 'column' and 'ordinal'",
                    self.key
                )));
            }
        };
        let max = if self.unbounded {
            usize::MAX
        } else {
            self.max_matches.unwrap_or(self.min_matches)
        };
        Ok(spec.with_multiplicity(self.min_matches, max).with_options(options))
    }
}

impl SchemaConfig {
    /// Turn the configuration into a validated descriptor.
    pub fn into_descriptor(self) -> ImportResult<SchemaDescriptor> {
        let mut builder = SchemaBuilder::default()
            .has_header(self.has_header)
            .named(self.named)
            .sheet_names(self.sheet_names)
            .sheet_indices(self.sheet_indices);
        for field in self.fields {
            builder = builder.field(field.into_spec()?);
        }
        for inject in self.inject {
            builder = builder.inject(inject.key, inject.kind);
        }
        builder.build()
    }
}

impl SchemaDescriptor {
    /// Parse and validate a JSON schema configuration.
    pub fn from_json_str(json: &str) -> ImportResult<Self> {
        let config: SchemaConfig = serde_json::from_str(json)?;
        config.into_descriptor()
    }

    /// Read, parse and validate a JSON schema configuration file.
    pub fn from_json_path(path: impl AsRef<Path>) -> ImportResult<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loads_named_schema() {
        let schema = SchemaDescriptor::from_json_str(
            r#"{
                "sheet_names": ["Employees.*"],
                "fields": [
                    { "key": "name", "column": "Name", "kind": { "scalar": "string" }, "required": true },
                    { "key": "gender", "column": "Gender", "kind": { "enum": ["MALE", "FEMALE"] },
                      "pre_process": ["enum_name"] },
                    { "key": "bonus", "column": "Bonus \\d+", "kind": { "list": "double" }, "unbounded": true },
                    { "key": "misc", "column": "Misc.*", "kind": "custom" }
                ],
                "inject": [{ "key": "row", "kind": "row_number" }]
            }"#,
        )
        .unwrap();

        assert!(schema.field("name").unwrap().options().required);
        assert_eq!(schema.field("gender").unwrap().options().pre_process[0].name(), "enum_name");
        assert_eq!(schema.field("bonus").unwrap().max_matches(), usize::MAX);
        assert_eq!(*schema.field("misc").unwrap().kind(), FieldKind::Custom);
        assert_eq!(schema.injected()[0].1, InjectKind::RowNumber);
    }

    #[test]
    fn loads_schema_from_a_file() {
        let path = std::env::temp_dir().join(format!("sheet-import-schema-{}.json", std::process::id()));
        std::fs::write(
            &path,
            r#"{ "sheet_indices": [0], "fields": [{ "key": "qty", "column": "Qty", "kind": { "scalar": "int" } }] }"#,
        )
        .unwrap();
        let loaded = SchemaDescriptor::from_json_path(&path);
        let _ = std::fs::remove_file(&path);

        let schema = loaded.unwrap();
        assert_eq!(*schema.field("qty").unwrap().kind(), FieldKind::Scalar(ScalarType::Int));

        let missing = std::env::temp_dir().join("sheet-import-no-such-schema.json");
        assert!(matches!(SchemaDescriptor::from_json_path(missing), Err(ImportError::Io(_))));
    }

    #[test]
    fn loads_ordinal_schema() {
        let schema = SchemaDescriptor::from_json_str(
            r#"{
                "has_header": false,
                "named": false,
                "sheet_indices": [0, 2],
                "fields": [
                    { "key": "id", "ordinal": 0, "kind": { "scalar": "long" } },
                    { "key": "extra", "ordinal": 4, "kind": { "map": { "key": "index", "value": "int" } } }
                ]
            }"#,
        )
        .unwrap();
        assert!(!schema.is_named());
        assert_eq!(schema.fields().len(), 2);
    }

    #[test]
    fn rejects_unknown_pre_processor() {
        let err = SchemaDescriptor::from_json_str(
            r#"{ "sheet_indices": [0], "fields": [
                { "key": "a", "column": "A", "kind": { "scalar": "string" }, "pre_process": ["shout"] }
            ] }"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("unknown pre-processor 'shout'"));
    }

    #[test]
    fn rejects_ambiguous_locator() {
        let err = SchemaDescriptor::from_json_str(
            r#"{ "sheet_indices": [0], "fields": [
                { "key": "a", "column": "A", "ordinal": 1, "kind": { "scalar": "string" } }
            ] }"#,
        )
        .unwrap_err();
        assert!(matches!(err, ImportError::InvalidSchema { .. }));
    }

    #[test]
    fn malformed_json_is_a_config_error() {
        let err = SchemaDescriptor::from_json_str("{ not json").unwrap_err();
        assert!(matches!(err, ImportError::Config(_)));
    }
}
