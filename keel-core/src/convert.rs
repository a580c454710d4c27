//! Convert - Mapping between schema attributes and wire parameters
//!
//! A [`ConverterTable`] describes how declared attributes become request
//! parameters: renames, `Field.N` fan-out, nested `Field.N.Sub` lists,
//! joined strings and pure value transforms. [`build_params`] applies a
//! table to a [`ResourceData`] according to a [`ConvertMode`].
//!
//! The response side ([`convert_response`]) maps wire fields back onto
//! snake_case schema names.

use std::collections::BTreeMap;

use crate::case::{to_camel_case, to_snake_case};
use crate::resource::ResourceData;
use crate::schema::{AttributeSchema, ResourceSchema};
use crate::transport::ContentType;
use crate::value::{Value, ValueMap};

/// Pure value transform (no I/O), e.g. `"PrePaid"` -> `1`
pub type TransformFn = fn(&Value) -> Result<Value, String>;

/// Request converters keyed by schema attribute name
pub type ConverterTable = BTreeMap<String, ConverterEntry>;

/// Response converters keyed by wire field name
pub type ResponseConverterTable = BTreeMap<String, ResponseConverter>;

/// Which declared attributes take part in parameter building
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConvertMode {
    /// Every declared attribute, renamed by the table or to PascalCase
    #[default]
    All,
    /// Only attributes listed in the table
    InConvert,
    /// None; parameters come from the call's static `sdk_param` only
    Ignore,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub enum ConvertKind {
    /// Copy (optionally renamed)
    #[default]
    Default,
    /// List of scalars to `Field.1`, `Field.2`, ...
    ListN,
    /// List of objects to `Field.1.Sub`, `Field.2.Sub`, ...
    ListObjectN,
    /// List of scalars joined into one string
    Join(String),
    /// Nested object kept as a map (JSON bodies)
    JsonObject,
    /// List of objects kept as a list of maps (JSON bodies)
    JsonArray,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConvertError {
    #[error("transform of '{field}' failed: {message}")]
    Transform { field: String, message: String },

    #[error("'{field}' must be {expected}, got {got}")]
    Shape {
        field: String,
        expected: &'static str,
        got: &'static str,
    },
}

/// One request mapping rule
#[derive(Debug, Clone, Default)]
pub struct ConverterEntry {
    pub target_field: Option<String>,
    pub kind: ConvertKind,
    pub transform: Option<TransformFn>,
    /// Converters applied to the fields of each nested object
    pub next_level: Option<ConverterTable>,
    /// Send even when unset in the declaration, unchanged, or equal to the
    /// schema default
    pub force_get: bool,
    /// Never send
    pub ignore: bool,
}

impl ConverterEntry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rename(target: impl Into<String>) -> Self {
        Self {
            target_field: Some(target.into()),
            ..Self::default()
        }
    }

    pub fn list_n() -> Self {
        Self {
            kind: ConvertKind::ListN,
            ..Self::default()
        }
    }

    pub fn list_object_n(next_level: ConverterTable) -> Self {
        Self {
            kind: ConvertKind::ListObjectN,
            next_level: Some(next_level),
            ..Self::default()
        }
    }

    pub fn join(separator: impl Into<String>) -> Self {
        Self {
            kind: ConvertKind::Join(separator.into()),
            ..Self::default()
        }
    }

    pub fn json_object(next_level: ConverterTable) -> Self {
        Self {
            kind: ConvertKind::JsonObject,
            next_level: Some(next_level),
            ..Self::default()
        }
    }

    pub fn json_array(next_level: ConverterTable) -> Self {
        Self {
            kind: ConvertKind::JsonArray,
            next_level: Some(next_level),
            ..Self::default()
        }
    }

    pub fn ignored() -> Self {
        Self {
            ignore: true,
            ..Self::default()
        }
    }

    pub fn with_target(mut self, target: impl Into<String>) -> Self {
        self.target_field = Some(target.into());
        self
    }

    pub fn with_transform(mut self, transform: TransformFn) -> Self {
        self.transform = Some(transform);
        self
    }

    pub fn force_get(mut self) -> Self {
        self.force_get = true;
        self
    }
}

/// One response mapping rule
#[derive(Debug, Clone, Default)]
pub struct ResponseConverter {
    pub target_field: Option<String>,
    pub transform: Option<TransformFn>,
    pub ignore: bool,
}

impl ResponseConverter {
    pub fn rename(target: impl Into<String>) -> Self {
        Self {
            target_field: Some(target.into()),
            ..Self::default()
        }
    }

    pub fn transform(transform: TransformFn) -> Self {
        Self {
            transform: Some(transform),
            ..Self::default()
        }
    }

    pub fn ignored() -> Self {
        Self {
            ignore: true,
            ..Self::default()
        }
    }

    pub fn with_transform(mut self, transform: TransformFn) -> Self {
        self.transform = Some(transform);
        self
    }
}

/// Build wire parameters from declared configuration.
///
/// Pure: the same data, table, mode and content type always produce the same
/// map.
pub fn build_params(
    data: &ResourceData,
    schema: &ResourceSchema,
    table: &ConverterTable,
    mode: ConvertMode,
    content_type: ContentType,
) -> Result<ValueMap, ConvertError> {
    let mut params = ValueMap::new();

    match mode {
        ConvertMode::Ignore => {}
        ConvertMode::All => {
            for (name, value) in data.attributes() {
                if value.is_null() {
                    continue;
                }
                let attr = schema.get(name);
                if attr.is_some_and(AttributeSchema::is_computed_only) {
                    continue;
                }
                let entry = table.get(name);
                if entry.is_some_and(|e| e.ignore) {
                    continue;
                }
                emit(&mut params, "", name, value, entry, attr, content_type)?;
            }
        }
        ConvertMode::InConvert => {
            let updating = data.state().is_some();
            for (name, entry) in table {
                if entry.ignore {
                    continue;
                }
                let value = if entry.force_get {
                    data.get(name)
                } else {
                    data.attributes().get(name)
                };
                let Some(value) = value.filter(|v| !v.is_null()) else {
                    continue;
                };
                let attr = schema.get(name);
                if !entry.force_get {
                    let skip = if updating {
                        !data.has_change(name)
                    } else {
                        attr.and_then(|a| a.default.as_ref()) == Some(value)
                    };
                    if skip {
                        continue;
                    }
                }
                emit(&mut params, "", name, value, Some(entry), attr, content_type)?;
            }
        }
    }

    Ok(params)
}

fn target_name(name: &str, entry: Option<&ConverterEntry>, attr: Option<&AttributeSchema>) -> String {
    entry
        .and_then(|e| e.target_field.clone())
        .or_else(|| attr.and_then(|a| a.provider_name.clone()))
        .unwrap_or_else(|| to_camel_case(name))
}

fn emit(
    params: &mut ValueMap,
    prefix: &str,
    name: &str,
    value: &Value,
    entry: Option<&ConverterEntry>,
    attr: Option<&AttributeSchema>,
    content_type: ContentType,
) -> Result<(), ConvertError> {
    let key = format!("{}{}", prefix, target_name(name, entry, attr));

    let value = match entry.and_then(|e| e.transform) {
        Some(transform) => transform(value).map_err(|message| ConvertError::Transform {
            field: name.to_string(),
            message,
        })?,
        None => value.clone(),
    };

    let kind = entry.map(|e| &e.kind).unwrap_or(&ConvertKind::Default);
    let next_level = entry.and_then(|e| e.next_level.as_ref());

    match (kind, content_type) {
        (ConvertKind::Default, _) => {
            params.insert(key, value);
        }

        (ConvertKind::ListN, ContentType::Default) => {
            let items = expect_list(name, &value)?;
            for (i, item) in items.iter().enumerate() {
                params.insert(format!("{}.{}", key, i + 1), item.clone());
            }
        }

        (ConvertKind::ListObjectN, ContentType::Default) => {
            let items = expect_list(name, &value)?;
            let empty = ConverterTable::new();
            let table = next_level.unwrap_or(&empty);
            for (i, item) in items.iter().enumerate() {
                let Value::Map(fields) = item else {
                    return Err(shape_error(name, "a list of objects", item));
                };
                let nested_prefix = format!("{}.{}.", key, i + 1);
                for (child, child_value) in fields {
                    if child_value.is_null() {
                        continue;
                    }
                    let child_entry = table.get(child);
                    if child_entry.is_some_and(|e| e.ignore) {
                        continue;
                    }
                    emit(
                        params,
                        &nested_prefix,
                        child,
                        child_value,
                        child_entry,
                        None,
                        content_type,
                    )?;
                }
            }
        }

        (ConvertKind::ListN, ContentType::Json) => {
            expect_list(name, &value)?;
            params.insert(key, value);
        }

        (ConvertKind::Join(separator), _) => {
            let items = expect_list(name, &value)?;
            let parts = items
                .iter()
                .map(|item| {
                    item.to_param_string()
                        .ok_or_else(|| shape_error(name, "a list of scalars", item))
                })
                .collect::<Result<Vec<_>, _>>()?;
            params.insert(key, Value::String(parts.join(separator.as_str())));
        }

        (ConvertKind::JsonObject, _) => {
            let Value::Map(fields) = &value else {
                return Err(shape_error(name, "an object", &value));
            };
            params.insert(key, Value::Map(convert_nested(fields, next_level)?));
        }

        (ConvertKind::JsonArray | ConvertKind::ListObjectN, _) => {
            let items = expect_list(name, &value)?;
            let converted = items
                .iter()
                .map(|item| match item {
                    Value::Map(fields) => convert_nested(fields, next_level).map(Value::Map),
                    other => Err(shape_error(name, "a list of objects", other)),
                })
                .collect::<Result<Vec<_>, _>>()?;
            params.insert(key, Value::List(converted));
        }
    }

    Ok(())
}

/// Rename and transform the fields of a nested object for a JSON body
fn convert_nested(
    fields: &ValueMap,
    table: Option<&ConverterTable>,
) -> Result<ValueMap, ConvertError> {
    let mut out = ValueMap::new();
    for (name, value) in fields {
        if value.is_null() {
            continue;
        }
        let entry = table.and_then(|t| t.get(name));
        if entry.is_some_and(|e| e.ignore) {
            continue;
        }
        emit(&mut out, "", name, value, entry, None, ContentType::Json)?;
    }
    Ok(out)
}

fn expect_list<'a>(field: &str, value: &'a Value) -> Result<&'a [Value], ConvertError> {
    value
        .as_list()
        .ok_or_else(|| shape_error(field, "a list", value))
}

fn shape_error(field: &str, expected: &'static str, got: &Value) -> ConvertError {
    ConvertError::Shape {
        field: field.to_string(),
        expected,
        got: got.type_name(),
    }
}

/// Map a wire response item onto schema attribute names
pub fn convert_response(
    item: &ValueMap,
    converters: &ResponseConverterTable,
) -> Result<ValueMap, ConvertError> {
    let mut out = ValueMap::new();
    for (wire_name, value) in item {
        let converter = converters.get(wire_name);
        if converter.is_some_and(|c| c.ignore) {
            continue;
        }
        let target = converter
            .and_then(|c| c.target_field.clone())
            .unwrap_or_else(|| to_snake_case(wire_name));
        let value = match converter.and_then(|c| c.transform) {
            Some(transform) => transform(value).map_err(|message| ConvertError::Transform {
                field: wire_name.clone(),
                message,
            })?,
            None => snake_case_keys(value),
        };
        out.insert(target, value);
    }
    Ok(out)
}

fn snake_case_keys(value: &Value) -> Value {
    match value {
        Value::Map(map) => Value::Map(
            map.iter()
                .map(|(k, v)| (to_snake_case(k), snake_case_keys(v)))
                .collect(),
        ),
        Value::List(items) => Value::List(items.iter().map(snake_case_keys).collect()),
        other => other.clone(),
    }
}
