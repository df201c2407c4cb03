use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};

macro_rules! id_newtype {
    ($name:ident) => {
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }
    };
}

id_newtype!(TemplateId);
id_newtype!(BoardId);
id_newtype!(ItemId);
id_newtype!(PlaceholderId);
id_newtype!(ColumnId);

/// Reserved mapping value meaning "use the item's display name".
pub const ITEM_NAME_SENTINEL: &str = "name";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Template {
    pub id: TemplateId,
    pub name: String,
    #[serde(default)]
    pub path: String,
    #[serde(default)]
    pub last_modified: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Placeholder {
    pub id: PlaceholderId,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggested_column_id: Option<ColumnId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggested_column_title: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    pub id: ColumnId,
    pub title: String,
    #[serde(rename = "type")]
    pub kind: String,
}

/// Where a placeholder takes its value from. Serialized as the plain string the
/// backend expects: `""`, `"name"` or a column id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum MappingTarget {
    #[default]
    Unmapped,
    ItemName,
    Column(ColumnId),
}

impl MappingTarget {
    pub fn is_unmapped(&self) -> bool {
        matches!(self, Self::Unmapped)
    }
}

impl From<String> for MappingTarget {
    fn from(value: String) -> Self {
        match value.as_str() {
            "" => Self::Unmapped,
            ITEM_NAME_SENTINEL => Self::ItemName,
            _ => Self::Column(ColumnId(value)),
        }
    }
}

impl From<&str> for MappingTarget {
    fn from(value: &str) -> Self {
        Self::from(value.to_string())
    }
}

impl From<MappingTarget> for String {
    fn from(value: MappingTarget) -> Self {
        match value {
            MappingTarget::Unmapped => String::new(),
            MappingTarget::ItemName => ITEM_NAME_SENTINEL.to_string(),
            MappingTarget::Column(column_id) => column_id.0,
        }
    }
}

/// Identity context pushed by the host platform.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HostContext {
    #[serde(default, deserialize_with = "lenient_id")]
    pub board_id: Option<BoardId>,
    #[serde(default, deserialize_with = "lenient_id")]
    pub item_id: Option<ItemId>,
    #[serde(default)]
    pub short_lived_token: Option<String>,
}

/// The host sends numeric ids; older payloads used strings.
fn lenient_id<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: From<String>,
{
    let raw = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match raw {
        Some(serde_json::Value::String(value)) if !value.is_empty() => Some(T::from(value)),
        Some(serde_json::Value::Number(value)) => Some(T::from(value.to_string())),
        _ => None,
    })
}
