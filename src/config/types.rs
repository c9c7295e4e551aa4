//! Raw resource configuration as read from JSON.

use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ResourceConfig {
    /// Registry name; resource-typed fields reference resources by this name.
    pub name: String,
    pub table: String,
    /// Derived-table SQL used in place of `table` in FROM/JOIN; `table` becomes its alias.
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub path_segment: Option<String>,
    #[serde(default)]
    pub primary_key: Option<String>,
    #[serde(default)]
    pub soft_delete: Option<SoftDeleteConfig>,
    #[serde(default)]
    pub ownership: Option<OwnershipConfig>,
    #[serde(default)]
    pub upsert_noop_column: Option<String>,
    /// Fields removed from every response envelope.
    #[serde(default)]
    pub hidden: Vec<String>,
    pub fields: IndexMap<String, FieldConfig>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SoftDeleteConfig {
    Column(String),
    Spec {
        column: String,
        #[serde(default = "default_live")]
        live: Value,
        #[serde(default = "default_deleted")]
        deleted: Value,
    },
}

pub(crate) fn default_live() -> Value {
    Value::Bool(false)
}

pub(crate) fn default_deleted() -> Value {
    Value::Bool(true)
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct OwnershipConfig {
    #[serde(alias = "me")]
    pub column: String,
    #[serde(alias = "user")]
    pub actor_field: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldTypeConfig {
    /// `int`, `bool`, `string` or `timestamp`.
    Simple(String),
    Enum { one_of: Vec<String> },
    Resource { resource: String },
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FieldConfig {
    #[serde(rename = "type")]
    pub type_: FieldTypeConfig,
    #[serde(default)]
    pub props: Vec<String>,
    #[serde(default)]
    pub initial: Option<InitialConfig>,
    #[serde(default)]
    pub rel: Option<String>,
    #[serde(default)]
    pub mapping: Option<String>,
    #[serde(default)]
    pub limit: Option<u32>,
    #[serde(default)]
    pub sort_by: Option<String>,
}

#[derive(Clone, Debug, Serialize)]
pub enum InitialConfig {
    Literal(Value),
    Generator { generator: String },
}

impl<'de> Deserialize<'de> for InitialConfig {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let v = Value::deserialize(deserializer)?;
        match v {
            Value::Object(mut obj) if obj.contains_key("generator") => match obj.remove("generator") {
                Some(Value::String(generator)) if obj.is_empty() => Ok(InitialConfig::Generator { generator }),
                _ => Err(serde::de::Error::custom(
                    "initial generator must be { \"generator\": \"<name>\" } with no other keys",
                )),
            },
            Value::Object(mut obj) if obj.len() == 1 && obj.contains_key("value") => {
                Ok(InitialConfig::Literal(obj.remove("value").unwrap_or(Value::Null)))
            }
            other => Ok(InitialConfig::Literal(other)),
        }
    }
}
