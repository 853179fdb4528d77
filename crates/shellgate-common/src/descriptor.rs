//! Connection descriptors handed to the bridge by the record store.

use std::fmt;

use serde::{de, Deserialize, Deserializer};

use crate::secret::Secret;

/// Where and as whom to open a remote shell.
///
/// Owned by the record store; the bridge only ever reads it. Records keep
/// numeric fields as text in some stores, so `id`, `port` and `owner_id`
/// accept either form.
#[derive(Debug, Clone, Deserialize)]
pub struct ConnectionDescriptor {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    #[serde(default)]
    pub name: String,
    pub host: String,
    #[serde(deserialize_with = "port_from_any")]
    pub port: u16,
    pub username: String,
    #[serde(alias = "password")]
    pub secret: Secret,
    #[serde(default, alias = "user_id", deserialize_with = "optional_string_or_number")]
    pub owner_id: Option<String>,
}

impl ConnectionDescriptor {
    pub fn new(
        id: impl Into<String>,
        host: impl Into<String>,
        port: u16,
        username: impl Into<String>,
        secret: impl Into<Secret>,
    ) -> Self {
        Self {
            id: id.into(),
            name: String::new(),
            host: host.into(),
            port,
            username: username.into(),
            secret: secret.into(),
            owner_id: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_owner(mut self, owner: impl Into<String>) -> Self {
        self.owner_id = Some(owner.into());
        self
    }

    /// `host:port`, suitable for dialing and logging.
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl fmt::Display for ConnectionDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}:{}", self.username, self.host, self.port)
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum StringOrNumber {
    String(String),
    Number(u64),
}

impl StringOrNumber {
    fn into_string(self) -> String {
        match self {
            Self::String(s) => s,
            Self::Number(n) => n.to_string(),
        }
    }
}

fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    StringOrNumber::deserialize(deserializer).map(StringOrNumber::into_string)
}

fn optional_string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<StringOrNumber>::deserialize(deserializer).map(|v| v.map(StringOrNumber::into_string))
}

fn port_from_any<'de, D>(deserializer: D) -> Result<u16, D::Error>
where
    D: Deserializer<'de>,
{
    let port = match StringOrNumber::deserialize(deserializer)? {
        StringOrNumber::Number(n) => u16::try_from(n)
            .map_err(|_| de::Error::custom(format!("port {n} is out of range")))?,
        StringOrNumber::String(s) => s
            .trim()
            .parse::<u16>()
            .map_err(|_| de::Error::custom(format!("invalid port '{s}'")))?,
    };
    if port == 0 {
        return Err(de::Error::custom("port must not be 0"));
    }
    Ok(port)
}
