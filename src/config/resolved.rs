//! Resolved registry: every parsed resource schema, looked up by name or path segment.

use crate::error::{AppError, SchemaError};
use crate::hooks::ResponseHook;
use crate::schema::{RelationDef, ResourceSchema};
use std::collections::HashMap;
use std::sync::Arc;

/// Built once at startup and shared read-only by every request.
#[derive(Clone, Default)]
pub struct Registry {
    resources: HashMap<String, ResourceSchema>,
    by_path: HashMap<String, String>,
    hooks: HashMap<String, Arc<dyn ResponseHook>>,
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("resources", &self.resources.keys().collect::<Vec<_>>())
            .field("hooks", &self.hooks.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl Registry {
    /// Registers schemas; names and path segments must be unique. Cross-resource references
    /// are checked by `config::validate_references`.
    pub fn from_schemas(schemas: Vec<ResourceSchema>) -> Result<Self, SchemaError> {
        let mut registry = Registry::default();
        for schema in schemas {
            if registry.resources.contains_key(&schema.name) {
                return Err(SchemaError::DuplicateResource(schema.name));
            }
            if registry.by_path.contains_key(&schema.path_segment) {
                return Err(SchemaError::DuplicatePathSegment(schema.path_segment));
            }
            registry
                .by_path
                .insert(schema.path_segment.clone(), schema.name.clone());
            registry.resources.insert(schema.name.clone(), schema);
        }
        Ok(registry)
    }

    pub fn get(&self, name: &str) -> Option<&ResourceSchema> {
        self.resources.get(name)
    }

    pub fn by_path(&self, path_segment: &str) -> Option<&ResourceSchema> {
        self.by_path
            .get(path_segment)
            .and_then(|name| self.resources.get(name))
    }

    pub fn resources(&self) -> impl Iterator<Item = &ResourceSchema> {
        self.resources.values()
    }

    /// Schema of the resource a relation points at.
    pub fn related(&self, rel: &RelationDef) -> Result<&ResourceSchema, AppError> {
        self.get(&rel.resource).ok_or_else(|| {
            AppError::Schema(SchemaError::MissingReference {
                kind: "resource",
                id: rel.resource.clone(),
            })
        })
    }

    pub fn register_hook(&mut self, resource: &str, hook: Arc<dyn ResponseHook>) -> Result<(), SchemaError> {
        if !self.resources.contains_key(resource) {
            return Err(SchemaError::MissingReference {
                kind: "resource",
                id: resource.to_string(),
            });
        }
        self.hooks.insert(resource.to_string(), hook);
        Ok(())
    }

    pub fn hook(&self, resource: &str) -> Option<&Arc<dyn ResponseHook>> {
        self.hooks.get(resource)
    }
}
