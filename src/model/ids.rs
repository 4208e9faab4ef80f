//! Type-safe identifiers.
//!
//! The backend serializes ids as JSON numbers, but the engine never does arithmetic on them, so each
//! id is kept as an opaque string. Deserialization accepts both numbers and strings.

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt::Display;

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self(id.to_string())
            }
        }

        impl From<String> for $name {
            fn from(id: String) -> Self {
                Self(id)
            }
        }

        impl From<u64> for $name {
            fn from(id: u64) -> Self {
                Self(id.to_string())
            }
        }

        impl Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
            where
                D: Deserializer<'de>,
            {
                de_id(deserializer).map(Self)
            }
        }
    };
}

string_id!(
    /// Identifier of an order, assigned by the backend.
    OrderId
);

string_id!(
    /// Identifier of the authenticated user.
    UserId
);

string_id!(
    /// Identifier of a catalog product.
    ProductId
);

fn de_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    match value {
        serde_json::Value::String(s) if !s.trim().is_empty() => Ok(s),
        serde_json::Value::Number(num) => Ok(num.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "unexpected value for id: {other}"
        ))),
    }
}
