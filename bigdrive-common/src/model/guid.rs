//! GUID formatting shared by the hive codec and the JSON representation.
//!
//! GUIDs are always written brace-enclosed and lower-case
//! (`{d3f5a1b2-4c6e-4f8a-9d3e-1a2b3c4d5e6f}`); parsing accepts any case, with
//! or without braces.

use serde::{Deserialize, Deserializer, Serializer};
use uuid::Uuid;

pub fn format(id: Uuid) -> String {
    id.braced().to_string()
}

pub fn parse(text: &str) -> Result<Uuid, uuid::Error> {
    Uuid::parse_str(text.trim())
}

/// `#[serde(with = "guid::braced")]`
pub mod braced {
    use super::*;

    pub fn serialize<S: Serializer>(id: &Uuid, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format(*id))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Uuid, D::Error> {
        let text = String::deserialize(deserializer)?;
        parse(&text).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_with_braces() {
        let id = Uuid::parse_str("D3F5A1B2-4C6E-4F8A-9D3E-1A2B3C4D5E6F").unwrap();
        assert_eq!(format(id), "{d3f5a1b2-4c6e-4f8a-9d3e-1a2b3c4d5e6f}");
    }

    #[test]
    fn parses_any_case_with_or_without_braces() {
        let expected = Uuid::parse_str("d3f5a1b2-4c6e-4f8a-9d3e-1a2b3c4d5e6f").unwrap();
        assert_eq!(parse("{D3F5A1B2-4C6E-4F8A-9D3E-1A2B3C4D5E6F}").unwrap(), expected);
        assert_eq!(parse("d3f5a1b2-4c6e-4f8a-9d3e-1a2b3c4d5e6f").unwrap(), expected);
        assert!(parse("not-a-guid").is_err());
    }
}
