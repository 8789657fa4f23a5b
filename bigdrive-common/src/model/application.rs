use super::guid;
use crate::codec::{parse_scalar, parse_uuid, text_of_uuid, Field, FieldKind, RegistryRecord};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use std::str::FromStr;
use uuid::Uuid;

/// Account a service application runs under.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ApplicationIdentity {
    #[default]
    Interactive,
    ThisUser,
    LocalService,
}

impl Display for ApplicationIdentity {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            ApplicationIdentity::Interactive => "Interactive",
            ApplicationIdentity::ThisUser => "ThisUser",
            ApplicationIdentity::LocalService => "LocalService",
        })
    }
}

impl FromStr for ApplicationIdentity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        [
            ApplicationIdentity::Interactive,
            ApplicationIdentity::ThisUser,
            ApplicationIdentity::LocalService,
        ]
        .into_iter()
        .find(|identity| identity.to_string().eq_ignore_ascii_case(s.trim()))
        .ok_or_else(|| format!("unknown identity '{s}'"))
    }
}

pub const SERVICE_APPLICATION_ID: Uuid = Uuid::from_u128(0xE6F5A1B2_4C6E_4F8A_9D3E_1A2B3C4D5E7F);
pub const SERVICE_APPLICATION_NAME: &str = "BigDrive.Service";

/// The hosted service application and the identity it is activated with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApplicationConfiguration {
    #[serde(with = "guid::braced")]
    pub id: Uuid,
    pub name: String,
    pub identity: ApplicationIdentity,
    pub user: Option<String>,
    #[serde(rename = "shutdownAfter")]
    pub shutdown_after_minutes: u32,
}

impl Default for ApplicationConfiguration {
    fn default() -> Self {
        Self {
            id: Uuid::nil(),
            name: String::new(),
            identity: ApplicationIdentity::default(),
            user: None,
            shutdown_after_minutes: 3,
        }
    }
}

impl ApplicationConfiguration {
    /// The BigDrive service, activated as `user`.
    pub fn service(user: &str) -> Self {
        Self {
            id: SERVICE_APPLICATION_ID,
            name: SERVICE_APPLICATION_NAME.to_string(),
            identity: ApplicationIdentity::ThisUser,
            user: Some(user.to_string()),
            ..Self::default()
        }
    }
}

impl RegistryRecord for ApplicationConfiguration {
    const FIELDS: &'static [Field<Self>] = &[
        Field {
            name: "id",
            kind: FieldKind::Uuid,
            get: |a| text_of_uuid(a.id),
            set: |a, v| {
                a.id = parse_uuid(v)?;
                Ok(())
            },
        },
        Field {
            name: "name",
            kind: FieldKind::Text,
            get: |a| Some(a.name.clone()),
            set: |a, v| {
                a.name = v.to_string();
                Ok(())
            },
        },
        Field {
            name: "identity",
            kind: FieldKind::Enum,
            get: |a| Some(a.identity.to_string()),
            set: |a, v| {
                a.identity = v.parse()?;
                Ok(())
            },
        },
        Field {
            name: "user",
            kind: FieldKind::Text,
            get: |a| a.user.clone(),
            set: |a, v| {
                a.user = Some(v.to_string());
                Ok(())
            },
        },
        Field {
            name: "shutdownAfter",
            kind: FieldKind::Scalar,
            get: |a| Some(a.shutdown_after_minutes.to_string()),
            set: |a, v| {
                a.shutdown_after_minutes = parse_scalar(v)?;
                Ok(())
            },
        },
    ];

    fn id(&self) -> Uuid {
        self.id
    }
}
