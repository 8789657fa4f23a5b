//! Maps configuration records onto the named values of a hive key.
//!
//! Each record type declares its fields once, as a static table of
//! `(external name, kind, getter, setter)` entries. The same external names
//! are used for the hive values and for the JSON representation.

use crate::error::{ConfigurationError, ConfigurationResult, HiveResult};
use crate::hive::{RegistryPath, RegistryStore, RegistryValue};
use crate::model::guid;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::fmt::{Display, Formatter};
use std::str::FromStr;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Uuid,
    Text,
    Enum,
    Scalar,
}

impl Display for FieldKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            FieldKind::Uuid => "GUID",
            FieldKind::Text => "string",
            FieldKind::Enum => "enum name",
            FieldKind::Scalar => "scalar",
        })
    }
}

pub struct Field<R> {
    pub name: &'static str,
    pub kind: FieldKind,
    /// `None` means "nothing to store" and skips the value on write.
    pub get: fn(&R) -> Option<String>,
    pub set: fn(&mut R, &str) -> Result<(), String>,
}

/// A record persisted as one hive key per instance, keyed by its id.
pub trait RegistryRecord: Default + Sized + 'static {
    const FIELDS: &'static [Field<Self>];

    fn id(&self) -> Uuid;
}

pub fn text_of_uuid(id: Uuid) -> Option<String> {
    Some(guid::format(id))
}

pub fn parse_uuid(text: &str) -> Result<Uuid, String> {
    guid::parse(text).map_err(|e| e.to_string())
}

pub fn parse_scalar<T>(text: &str) -> Result<T, String>
where
    T: FromStr,
    T::Err: Display,
{
    text.trim().parse().map_err(|e: T::Err| e.to_string())
}

#[tracing::instrument(level = "trace", skip(record, store))]
pub fn encode<R: RegistryRecord>(
    record: &R,
    store: &dyn RegistryStore,
    path: &RegistryPath,
) -> HiveResult<()> {
    for field in R::FIELDS {
        if let Some(value) = (field.get)(record) {
            store.set_value(path, field.name, RegistryValue::String(value))?;
        }
    }
    Ok(())
}

#[tracing::instrument(level = "trace", skip(store))]
pub fn decode<R: RegistryRecord>(
    store: &dyn RegistryStore,
    path: &RegistryPath,
) -> ConfigurationResult<R> {
    let mut record = R::default();
    for field in R::FIELDS {
        let Some(value) = store.get_value(path, field.name)? else {
            continue;
        };
        let text = value.to_string();
        (field.set)(&mut record, &text).map_err(|reason| ConfigurationError::Corrupt {
            path: path.to_string(),
            reason: format!(
                "value '{text}' of '{}' is not a valid {}: {reason}",
                field.name, field.kind
            ),
        })?;
    }
    Ok(record)
}

/// Parses a JSON document into a record, matching field names case-insensitively.
///
/// Blank input is an invalid argument; anything that is not a well-formed
/// document for `R` yields `Ok(None)`.
pub fn from_json<R>(text: &str) -> ConfigurationResult<Option<R>>
where
    R: RegistryRecord + DeserializeOwned,
{
    if text.trim().is_empty() {
        return Err(ConfigurationError::InvalidArgument(
            "JSON configuration cannot be null or empty.".to_string(),
        ));
    }
    let Ok(Value::Object(object)) = serde_json::from_str::<Value>(text) else {
        return Ok(None);
    };
    let mut normalized = Map::with_capacity(object.len());
    for (key, value) in object {
        let canonical = R::FIELDS
            .iter()
            .find(|f| f.name.eq_ignore_ascii_case(&key))
            .map(|f| f.name.to_string())
            .unwrap_or(key);
        normalized.insert(canonical, value);
    }
    Ok(serde_json::from_value(Value::Object(normalized)).ok())
}
