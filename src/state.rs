//! Shared application state for all routes. The registry is built once at startup and never mutated.

use crate::config::Registry;
use crate::service::CrudService;
use crate::store::Store;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub registry: Arc<Registry>,
    /// Prefix for `Link` headers and paging links.
    pub base_url: Arc<str>,
}

impl AppState {
    pub fn new(store: Arc<dyn Store>, registry: Registry, base_url: &str) -> Self {
        AppState {
            store,
            registry: Arc::new(registry),
            base_url: Arc::from(base_url),
        }
    }

    pub fn crud(&self) -> CrudService<'_> {
        CrudService::new(self.store.as_ref(), &self.registry, &self.base_url)
    }
}
