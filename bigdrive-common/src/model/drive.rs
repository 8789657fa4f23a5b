use super::guid;
use crate::codec::{parse_uuid, text_of_uuid, Field, FieldKind, RegistryRecord};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One virtual drive shown in the shell namespace.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct DriveConfiguration {
    #[serde(with = "guid::braced")]
    pub id: Uuid,
    /// Display name shown in the shell.
    pub name: String,
    /// Class id of the provider that backs this drive.
    #[serde(with = "guid::braced")]
    pub clsid: Uuid,
}

impl DriveConfiguration {
    /// Single-line JSON, as handed out by the service.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

impl RegistryRecord for DriveConfiguration {
    const FIELDS: &'static [Field<Self>] = &[
        Field {
            name: "id",
            kind: FieldKind::Uuid,
            get: |d| text_of_uuid(d.id),
            set: |d, v| {
                d.id = parse_uuid(v)?;
                Ok(())
            },
        },
        Field {
            name: "name",
            kind: FieldKind::Text,
            get: |d| Some(d.name.clone()),
            set: |d, v| {
                d.name = v.to_string();
                Ok(())
            },
        },
        Field {
            name: "clsid",
            kind: FieldKind::Uuid,
            get: |d| text_of_uuid(d.clsid),
            set: |d, v| {
                d.clsid = parse_uuid(v)?;
                Ok(())
            },
        },
    ];

    fn id(&self) -> Uuid {
        self.id
    }
}
