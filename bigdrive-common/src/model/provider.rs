use super::guid;
use crate::codec::{parse_uuid, text_of_uuid, Field, FieldKind, RegistryRecord};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A registered provider implementation, keyed by its class id.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfiguration {
    #[serde(with = "guid::braced")]
    pub id: Uuid,
    pub name: String,
}

impl RegistryRecord for ProviderConfiguration {
    const FIELDS: &'static [Field<Self>] = &[
        Field {
            name: "id",
            kind: FieldKind::Uuid,
            get: |p| text_of_uuid(p.id),
            set: |p, v| {
                p.id = parse_uuid(v)?;
                Ok(())
            },
        },
        Field {
            name: "name",
            kind: FieldKind::Text,
            get: |p| Some(p.name.clone()),
            set: |p, v| {
                p.name = v.to_string();
                Ok(())
            },
        },
    ];

    fn id(&self) -> Uuid {
        self.id
    }
}
