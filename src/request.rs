//! Request shapes handed to the CRUD service by the transport layer.

use indexmap::IndexMap;
use serde_json::{Map, Value};

/// Flat query-parameter map in request order. A repeated key keeps its first position and last value.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct QueryParams(IndexMap<String, String>);

impl QueryParams {
    pub fn parse(query: &str) -> Self {
        form_urlencoded::parse(query.as_bytes()).into_owned().collect()
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn as_map(&self) -> &IndexMap<String, String> {
        &self.0
    }

    pub fn set(&mut self, key: &str, value: impl Into<String>) {
        self.0.insert(key.to_string(), value.into());
    }

    pub fn remove(&mut self, key: &str) {
        self.0.shift_remove(key);
    }

    /// `a=1&b=2`, percent-encoded.
    pub fn encode(&self) -> String {
        form_urlencoded::Serializer::new(String::new())
            .extend_pairs(self.0.iter())
            .finish()
    }
}

impl FromIterator<(String, String)> for QueryParams {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        QueryParams(iter.into_iter().collect())
    }
}

/// The authenticated caller, as placed in request extensions by authentication middleware.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Actor {
    fields: Map<String, Value>,
}

impl Actor {
    pub fn new(fields: Map<String, Value>) -> Self {
        Actor { fields }
    }

    pub fn with_id(id: i64) -> Self {
        let mut fields = Map::new();
        fields.insert("id".into(), Value::from(id));
        Actor { fields }
    }

    pub fn field(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }
}

/// One inbound request: the path it arrived on, its query parameters and the caller.
#[derive(Clone, Debug, Default)]
pub struct ResourceRequest {
    /// Request path without query string, e.g. `/entries`.
    pub path: String,
    pub params: QueryParams,
    pub actor: Option<Actor>,
}

impl ResourceRequest {
    pub fn new(path: impl Into<String>, params: QueryParams) -> Self {
        ResourceRequest {
            path: path.into(),
            params,
            actor: None,
        }
    }

    pub fn with_actor(mut self, actor: Actor) -> Self {
        self.actor = Some(actor);
        self
    }
}
